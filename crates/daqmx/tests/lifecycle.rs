//! Task lifetime: handle ownership, close semantics, resource warnings and
//! event registration pairing.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use daqmx::{
    error_codes, set_warning_handler, take_warning_handler, AcquisitionType, Driver, Edge, ErrorKind, EventKind, EveryNSamplesEventType,
    NumSamples, SimulatedDriver, Task, Warning, DEFAULT_TIMEOUT,
};

fn sim() -> Arc<SimulatedDriver> {
    Arc::new(SimulatedDriver::default())
}

fn finite_ai(driver: Arc<SimulatedDriver>, name: &str, samples: u64) -> Task {
    let task = Task::new(driver, name).unwrap();
    task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
    task.timing()
        .cfg_samp_clk_timing(10_000.0, "", Edge::Rising, AcquisitionType::Finite, samples)
        .unwrap();
    task
}

#[test]
fn test_close_and_drop_clear_exactly_once() {
    let driver = sim();
    let task = finite_ai(driver.clone(), "closed_twice", 10);
    task.close().unwrap();
    task.close().unwrap();
    drop(task);
    assert_eq!(driver.calls_to("DAQmxClearTask"), 1);
    assert_eq!(driver.live_tasks(), 0);
}

#[test]
fn test_closed_task_never_reaches_driver() {
    let driver = sim();
    let task = finite_ai(driver.clone(), "after_close", 10);
    let (_sink, _events) = task.done_events(4).unwrap();
    task.close().unwrap();
    driver.clear_calls();

    assert_eq!(task.start().unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(task.stop().unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(task.read(NumSamples::Unset, 1.0).unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(task.write(1.0, None, 1.0).unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(task.in_stream().avail_samp_per_chan().unwrap_err().kind(), ErrorKind::InvalidHandle);
    assert_eq!(
        task.register_done_event(None).unwrap_err().kind(),
        ErrorKind::InvalidHandle
    );
    assert!(task.handle().is_err());
    assert!(task.is_closed());
    assert!(driver.calls().is_empty());
    assert!(!task.is_event_registered(EventKind::Done));
}

#[test]
fn test_misuse_raises_resource_warnings() {
    let seen: Arc<Mutex<Vec<Warning>>> = Arc::default();
    let sink = seen.clone();
    set_warning_handler(move |warning| {
        if let Warning::Resource(w) = warning {
            if w.task_name.starts_with("warned_") {
                sink.lock().unwrap().push(warning.clone());
            }
        }
    });

    let driver = sim();
    let closed = Task::new(driver.clone(), "warned_close").unwrap();
    closed.close().unwrap();
    closed.close().unwrap();
    {
        let _leaked = Task::new(driver.clone(), "warned_drop").unwrap();
    }
    take_warning_handler();

    let seen = seen.lock().unwrap();
    let names: Vec<&str> = seen
        .iter()
        .filter_map(|w| match w {
            Warning::Resource(w) => Some(w.task_name.as_str()),
            Warning::Driver(_) => None,
        })
        .collect();
    assert_eq!(names, ["warned_close", "warned_drop"]);
    assert!(seen[0].to_string().contains("already closed"));
    // The dropped task was still cleared.
    assert_eq!(driver.live_tasks(), 0);
}

#[test]
fn test_event_registration_pairs_with_unregistration() {
    let driver = sim();
    let task = finite_ai(driver.clone(), "events", 100);

    task.register_done_event(Some(Box::new(|_| {}))).unwrap();
    assert!(task.is_event_registered(EventKind::Done));
    let err = task.register_done_event(Some(Box::new(|_| {}))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

    task.register_done_event(None).unwrap();
    assert!(!task.is_event_registered(EventKind::Done));
    // Unregistering with nothing registered is a no-op.
    task.register_done_event(None).unwrap();
    task.register_done_event(Some(Box::new(|_| {}))).unwrap();

    task.register_every_n_samples_acquired_into_buffer_event(10, Some(Box::new(|_| {})))
        .unwrap();
    assert!(task.is_event_registered(EventKind::EveryNSamplesAcquiredIntoBuffer));
    assert!(!task.is_event_registered(EventKind::EveryNSamplesTransferredFromBuffer));

    task.close().unwrap();
    assert!(!task.is_event_registered(EventKind::Done));
    assert!(!task.is_event_registered(EventKind::EveryNSamplesAcquiredIntoBuffer));
}

#[test]
fn test_failed_clear_still_releases_events() {
    let driver = sim();
    let task = finite_ai(driver.clone(), "clear_fails", 100);
    task.register_done_event(Some(Box::new(|_| {}))).unwrap();
    driver.clear_task(task.handle().unwrap()).unwrap();

    let err = task.close().unwrap_err();
    assert_eq!(err.code(), error_codes::INVALID_TASK);
    assert_eq!(err.task_name(), Some("clear_fails"));
    assert!(task.is_closed());
    assert!(!task.is_event_registered(EventKind::Done));
}

#[test]
fn test_close_from_another_thread_ends_waiting_read() {
    let task = Arc::new(Task::new(sim(), "close_during_read").unwrap());
    task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
    task.timing()
        .cfg_samp_clk_timing(10.0, "", Edge::Rising, AcquisitionType::Finite, 1000)
        .unwrap();
    task.start().unwrap();

    let reader = {
        let task = task.clone();
        thread::spawn(move || {
            let started = Instant::now();
            (task.read(1000u32, 30.0), started.elapsed())
        })
    };
    thread::sleep(Duration::from_millis(100));
    task.close().unwrap();

    let (result, elapsed) = reader.join().unwrap();
    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Read);
    assert_eq!(err.code(), error_codes::INVALID_TASK);
    assert!(elapsed < Duration::from_secs(5), "read waited {elapsed:?}");
}

#[tokio::test]
async fn test_done_event_reaches_async_receiver() {
    let task = finite_ai(sim(), "done_async", 200);
    let (sink, mut done) = task.done_events(4).unwrap();
    let (_, mut every_n) = task
        .every_n_samples_events(EveryNSamplesEventType::AcquiredIntoBuffer, 50, 16)
        .unwrap();
    task.start().unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), done.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event.status, 0);
    assert_eq!(event.task, task.handle().unwrap());

    let first = every_n.recv().await.unwrap();
    assert_eq!(first.samples, 50);
    assert_eq!(sink.dropped(), 0);

    task.wait_until_done(DEFAULT_TIMEOUT).unwrap();
    task.close().unwrap();
}
