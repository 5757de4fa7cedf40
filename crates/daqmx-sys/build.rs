//! Build script for daqmx-sys.
//!
//! Emits link directives for the NI-DAQmx runtime when the `daqmx-sdk`
//! feature is enabled. Without the feature nothing is linked and only the
//! constant and type definitions are usable, which keeps the workspace
//! buildable on machines without the vendor driver.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=NIDAQMX_LIB_DIR");

    if env::var_os("CARGO_FEATURE_DAQMX_SDK").is_none() {
        return;
    }

    // Target OS, not the host running this script.
    let windows = env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "windows");

    if let Ok(dir) = env::var("NIDAQMX_LIB_DIR") {
        println!("cargo:rustc-link-search=native={}", dir);
    } else {
        let candidates: &[&str] = if windows {
            &[
                "C:\\Program Files (x86)\\National Instruments\\Shared\\ExternalCompilerSupport\\C\\lib64\\msvc",
                "C:\\Program Files\\National Instruments\\Shared\\ExternalCompilerSupport\\C\\lib64\\msvc",
            ]
        } else {
            &["/usr/lib/x86_64-linux-gnu", "/usr/lib64", "/usr/local/lib", "/usr/lib"]
        };

        for dir in candidates {
            let path = Path::new(dir);
            if path.join("libnidaqmx.so").exists() || path.join("NIDAQmx.lib").exists() {
                println!("cargo:rustc-link-search=native={}", dir);
                break;
            }
        }
    }

    if windows {
        println!("cargo:rustc-link-lib=dylib=NIDAQmx");
    } else {
        println!("cargo:rustc-link-lib=dylib=nidaqmx");
    }
}
