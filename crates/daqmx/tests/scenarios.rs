//! End-to-end task scenarios against the simulated driver.
//!
//! The simulated device `SimDev1` loops analog output `aoN` back to analog
//! input `aiN` and reads digital lines back as last written, so every
//! scenario checks real data flow without hardware.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use daqmx::driver::CoPulseChanTime;
use daqmx::driver::remote::{EventStream, RpcCode, RpcStatus};
use daqmx::{
    error_codes, AcquisitionType, CtrTime, Edge, GrpcOptions, NumSamples, ReadData, RemoteDriver, Sample,
    SessionTransport, SimulatedDriver, Task, DEFAULT_TIMEOUT,
};

/// A few 16-bit codes of the default ±5 V input range.
const ANALOG_TOLERANCE: f64 = 0.005;

fn sim() -> Arc<SimulatedDriver> {
    Arc::new(SimulatedDriver::default())
}

#[test]
fn test_analog_output_reads_back_on_input() {
    let driver = sim();
    let ao = Task::new(driver.clone(), "ao").unwrap();
    ao.ao_channels().add_ao_voltage_chan("SimDev1/ao0").unwrap();
    assert_eq!(ao.write(3.14, None, DEFAULT_TIMEOUT).unwrap(), 1);

    let ai = Task::new(driver, "ai").unwrap();
    ai.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
    let data = ai.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap();
    let Some(Sample::F64(value)) = data.as_scalar() else {
        panic!("expected a scalar f64, got {data:?}");
    };
    assert!((value - 3.14).abs() < ANALOG_TOLERANCE, "read {value}");

    ao.close().unwrap();
    ai.close().unwrap();
}

#[test]
fn test_continuous_pulse_train_keeps_running() {
    let task = Task::new(sim(), "pulse").unwrap();
    task.co_channels()
        .add_co_pulse_chan_time(CoPulseChanTime {
            counter: "SimDev1/ctr0".into(),
            ..Default::default()
        })
        .unwrap();
    task.timing()
        .cfg_implicit_timing(AcquisitionType::Continuous, 1000)
        .unwrap();
    task.start().unwrap();

    let pulse = CtrTime {
        high_time: 0.001,
        low_time: 0.002,
    };
    assert_eq!(task.write(pulse, None, DEFAULT_TIMEOUT).unwrap(), 1);
    assert!(!task.is_task_done().unwrap());

    task.stop().unwrap();
    task.close().unwrap();
}

#[test]
fn test_digital_lines_pack_into_port_value() {
    let driver = sim();
    let out = Task::new(driver.clone(), "do").unwrap();
    out.do_channels().add_do_chan("SimDev1/port1/line0:7").unwrap();
    let bits = vec![true, false, true, false, false, true, false, true];
    assert_eq!(out.write(bits, None, DEFAULT_TIMEOUT).unwrap(), 1);

    let input = Task::new(driver, "di").unwrap();
    input.di_channels().add_di_chan("SimDev1/port1/line0:7").unwrap();
    let data = input.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap();
    assert_eq!(data, ReadData::Scalar(Sample::U32(0xA5)));

    out.close().unwrap();
    input.close().unwrap();
}

#[test]
fn test_every_n_samples_callback_reads_whole_acquisition() {
    let task = Arc::new(Task::new(sim(), "scan").unwrap());
    task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
    task.timing()
        .cfg_samp_clk_timing(5000.0, "", Edge::Rising, AcquisitionType::Finite, 1000)
        .unwrap();

    let total = Arc::new(AtomicUsize::new(0));
    let weak: Weak<Task> = Arc::downgrade(&task);
    let seen = total.clone();
    task.register_every_n_samples_acquired_into_buffer_event(
        100,
        Some(Box::new(move |event| {
            let Some(task) = weak.upgrade() else { return };
            let data = task.read(event.samples, DEFAULT_TIMEOUT).unwrap();
            seen.fetch_add(data.len(), Ordering::SeqCst);
        })),
    )
    .unwrap();

    task.start().unwrap();
    task.wait_until_done(DEFAULT_TIMEOUT).unwrap();
    // The last callback may still be running when the clock reports done.
    thread::sleep(Duration::from_millis(200));
    assert_eq!(total.load(Ordering::SeqCst), 1000);

    task.close().unwrap();
}

#[derive(Debug)]
struct RefusingTransport;

impl SessionTransport for RefusingTransport {
    fn invoke(&self, method: &str, _request: serde_json::Value) -> Result<serde_json::Value, RpcStatus> {
        Err(RpcStatus::new(RpcCode::Unimplemented, format!("{method} should not be reached")))
    }

    fn subscribe(&self, method: &str, _request: serde_json::Value) -> Result<Box<dyn EventStream>, RpcStatus> {
        Err(RpcStatus::new(RpcCode::Unimplemented, format!("{method} should not be reached")))
    }
}

#[test]
fn test_mismatched_session_name_is_rejected_before_any_call() {
    let driver = RemoteDriver::new(
        Arc::new(RefusingTransport),
        GrpcOptions {
            session_name: "other".into(),
            ..Default::default()
        },
    );
    let err = Task::new(Arc::new(driver), "ai_task").unwrap_err();
    assert_eq!(err.code(), error_codes::UNKNOWN);
    assert!(err.message().contains("Unsupported session name"), "{err}");
}

#[test]
fn test_save_passes_option_bits() {
    let driver = sim();
    let task = Task::new(driver.clone(), "to_save").unwrap();
    task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
    task.save("saved", "me", true, false, true).unwrap();

    let options = driver.saved_task_options("saved").unwrap();
    assert_eq!(options.bits(), 0b101);
    assert_eq!(driver.saved_task_author("saved").as_deref(), Some("me"));
    task.close().unwrap();
}
