//! NI-DAQmx Hardware Loopback Suite
//!
//! Runs the analog and digital round trips against a real device through the
//! vendor library.
//!
//! # Hardware Setup
//!
//! Required loopback connections:
//! - AO0 → AI0
//! - port0/line0:7 → port1/line0:7
//!
//! # Environment Variables
//!
//! Required:
//! - `DAQMX_HARDWARE_TEST=1` - Enable the test suite
//!
//! Optional:
//! - `DAQMX_DEVICE` - Device name (default: "Dev1")
//!
//! # Running
//!
//! ```bash
//! export DAQMX_HARDWARE_TEST=1
//! cargo test --features hardware -p daqmx --test hardware
//! ```

#![cfg(feature = "hardware")]

use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use daqmx::driver::AiVoltageChan;
use daqmx::stream_readers::AnalogSingleChannelReader;
use daqmx::{
    AcquisitionType, Edge, LibraryDriver, NumSamples, ReadData, Sample, Task, TerminalConfiguration, DEFAULT_TIMEOUT,
};

/// Voltage tolerance for loopback tests (10 mV)
const VOLTAGE_TOLERANCE: f64 = 0.010;

/// Settling time after writing a voltage
const SETTLING_TIME: Duration = Duration::from_millis(50);

fn hardware_test_enabled() -> bool {
    env::var("DAQMX_HARDWARE_TEST")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn device() -> String {
    env::var("DAQMX_DEVICE").unwrap_or_else(|_| "Dev1".to_string())
}

macro_rules! skip_if_disabled {
    () => {
        if !hardware_test_enabled() {
            println!("DAQmx hardware test skipped (set DAQMX_HARDWARE_TEST=1 to enable)");
            return;
        }
    };
}

fn driver() -> Arc<LibraryDriver> {
    Arc::new(LibraryDriver::new())
}

#[test]
fn test_ao_to_ai_loopback() {
    skip_if_disabled!();
    let dev = device();
    let driver = driver();

    let ao = Task::new(driver.clone(), "hw_ao").unwrap();
    ao.ao_channels().add_ao_voltage_chan(format!("{dev}/ao0").as_str()).unwrap();
    let ai = Task::new(driver, "hw_ai").unwrap();
    ai.ai_channels()
        .add_ai_voltage_chan(AiVoltageChan {
            physical_channel: format!("{dev}/ai0"),
            terminal_config: TerminalConfiguration::Rse,
            min_val: -10.0,
            max_val: 10.0,
            ..Default::default()
        })
        .unwrap();

    for volts in [0.0, 2.5, -2.5, 5.0] {
        ao.write(volts, None, DEFAULT_TIMEOUT).unwrap();
        thread::sleep(SETTLING_TIME);
        let Some(Sample::F64(read)) = ai.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap().as_scalar() else {
            panic!("expected a scalar read");
        };
        println!("AO {volts:+.3} V -> AI {read:+.4} V");
        assert!((read - volts).abs() < VOLTAGE_TOLERANCE, "wrote {volts}, read {read}");
    }

    ao.write(0.0, None, DEFAULT_TIMEOUT).unwrap();
    ao.close().unwrap();
    ai.close().unwrap();
}

#[test]
fn test_clocked_acquisition_fills_reader_buffer() {
    skip_if_disabled!();
    let task = Task::new(driver(), "hw_scan").unwrap();
    task.ai_channels()
        .add_ai_voltage_chan(format!("{}/ai0", device()).as_str())
        .unwrap();
    task.timing()
        .cfg_samp_clk_timing(1000.0, "", Edge::Rising, AcquisitionType::Finite, 100)
        .unwrap();

    let reader = AnalogSingleChannelReader::new(&task);
    let mut data = vec![0.0; 100];
    task.start().unwrap();
    assert_eq!(reader.read_many_sample(&mut data, 100u32, DEFAULT_TIMEOUT).unwrap(), 100);
    task.wait_until_done(DEFAULT_TIMEOUT).unwrap();
    task.close().unwrap();
}

#[test]
fn test_digital_port_loopback() {
    skip_if_disabled!();
    let dev = device();
    let driver = driver();

    let out = Task::new(driver.clone(), "hw_do").unwrap();
    out.do_channels().add_do_chan(format!("{dev}/port0/line0:7").as_str()).unwrap();
    let input = Task::new(driver, "hw_di").unwrap();
    input.di_channels().add_di_chan(format!("{dev}/port1/line0:7").as_str()).unwrap();

    for pattern in [0x00u32, 0xA5, 0x5A, 0xFF] {
        out.write(pattern, None, DEFAULT_TIMEOUT).unwrap();
        thread::sleep(SETTLING_TIME);
        let data = input.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap();
        assert_eq!(data, ReadData::Scalar(Sample::U32(pattern)));
    }

    out.close().unwrap();
    input.close().unwrap();
}
