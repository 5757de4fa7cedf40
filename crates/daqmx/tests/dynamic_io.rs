//! Shape inference of dynamic reads and writes, attribute round trips and
//! channel views.

use std::sync::Arc;

use daqmx::attributes::{channel as chan_attrs, read as read_attrs};
use daqmx::stream_readers::AnalogMultiChannelReader;
use daqmx::{
    error_codes, AcquisitionType, AttrTarget, AttributeValue, CtrFreq, Edge, ErrorKind, NumSamples, ReadData, Sample, SampleVec,
    SimulatedDriver, Task, DEFAULT_TIMEOUT,
};

fn sim() -> Arc<SimulatedDriver> {
    Arc::new(SimulatedDriver::default())
}

fn ai_task(driver: Arc<SimulatedDriver>, name: &str, physical: &str) -> Task {
    let task = Task::new(driver, name).unwrap();
    task.ai_channels().add_ai_voltage_chan(physical).unwrap();
    task
}

#[test]
fn test_read_shape_follows_channels_and_count() {
    let driver = sim();
    let one = ai_task(driver.clone(), "one", "SimDev1/ai0");
    assert!(matches!(one.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap(), ReadData::Scalar(Sample::F64(_))));
    let list = one.read(1u32, DEFAULT_TIMEOUT).unwrap();
    assert!(matches!(&list, ReadData::List(SampleVec::F64(v)) if v.len() == 1));

    let many = ai_task(driver, "many", "SimDev1/ai0:2");
    let flat = many.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap();
    assert_eq!(flat.as_list().map(SampleVec::len), Some(3));
    let rows = many.read(4u32, DEFAULT_TIMEOUT).unwrap();
    let rows = rows.as_matrix().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|row| row.len() == 4));

    one.close().unwrap();
    many.close().unwrap();
}

#[test]
fn test_short_finite_read_reports_samples_transferred() {
    let task = ai_task(sim(), "short", "SimDev1/ai0");
    task.timing()
        .cfg_samp_clk_timing(100.0, "", Edge::Rising, AcquisitionType::Finite, 1000)
        .unwrap();
    let err = task.read(1000u32, 0.05).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Read);
    assert!(err.is_timeout());
    assert!(err.samples_transferred().unwrap() < 1000);
    assert_eq!(err.task_name(), Some("short"));
    task.close().unwrap();
}

#[test]
fn test_write_rejects_mismatched_data() {
    let task = Task::new(sim(), "ao_pair").unwrap();
    task.ao_channels().add_ao_voltage_chan("SimDev1/ao0:1").unwrap();

    let err = task
        .write(vec![vec![1.0, 2.0], vec![1.0, 2.0], vec![1.0, 2.0]], None, DEFAULT_TIMEOUT)
        .unwrap_err();
    assert_eq!(err.code(), error_codes::WRITE_NUM_CHANS_MISMATCH);
    assert!(err.message().contains("Number of Channels in Task: 2"));

    let err = task.write(vec![true, false], None, DEFAULT_TIMEOUT).unwrap_err();
    assert_eq!(err.code(), error_codes::WRITE_CHAN_TYPE_MISMATCH);

    let pulses = vec![CtrFreq::default(), CtrFreq::default()];
    assert_eq!(
        task.write(pulses, None, DEFAULT_TIMEOUT).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    // One value per channel is a single sample and starts the task.
    assert_eq!(task.write(vec![0.5, -0.5], None, DEFAULT_TIMEOUT).unwrap(), 1);
    task.close().unwrap();
}

#[test]
fn test_many_samples_write_reads_back_last_value() {
    let driver = sim();
    let ao = Task::new(driver.clone(), "ao_many").unwrap();
    ao.ao_channels().add_ao_voltage_chan("SimDev1/ao1").unwrap();
    // Untimed, so the last sample is what the output holds.
    assert_eq!(ao.write(vec![0.0, 1.0, 2.0], Some(true), DEFAULT_TIMEOUT).unwrap(), 3);

    let ai = ai_task(driver, "ai_many", "SimDev1/ai1");
    let Some(Sample::F64(value)) = ai.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap().as_scalar() else {
        panic!("expected a scalar");
    };
    assert!((value - 2.0).abs() < 0.005);
    ao.close().unwrap();
    ai.close().unwrap();
}

#[test]
fn test_channel_attribute_set_and_reset() {
    let task = ai_task(sim(), "attrs", "SimDev1/ai0");
    let chan = task.ai_channels().get(0).unwrap();
    assert_eq!(chan.get(chan_attrs::AI_MAX).unwrap(), 5.0);

    chan.set(chan_attrs::AI_MAX, 2.0).unwrap();
    assert_eq!(chan.get(chan_attrs::AI_MAX).unwrap(), 2.0);
    assert_eq!(
        task.get(AttrTarget::Channel(chan.name()), chan_attrs::AI_MAX).unwrap(),
        2.0
    );

    chan.reset(chan_attrs::AI_MAX).unwrap();
    assert_eq!(chan.get(chan_attrs::AI_MAX).unwrap(), 5.0);

    chan.set_description("sensor A").unwrap();
    assert_eq!(chan.description().unwrap(), "sensor A");
    task.close().unwrap();
}

#[test]
fn test_channel_concatenation_is_associative() {
    let driver = sim();
    let task = ai_task(driver.clone(), "views", "SimDev1/ai0:2");
    let ai = task.ai_channels();
    let (a, b, c) = (ai.get(0).unwrap(), ai.get(1).unwrap(), ai.get(2).unwrap());

    let left = (&(&a + &b).unwrap() + &c).unwrap();
    let right = (&a + &(&b + &c).unwrap()).unwrap();
    assert_eq!(left, right);
    assert_eq!(left.channel_names(), ai.channel_names());
    assert_eq!(left, ai.all());

    let other = ai_task(driver, "elsewhere", "SimDev1/ai3");
    let foreign = other.ai_channels().get(0).unwrap();
    assert!((&a + &foreign).is_err());

    task.close().unwrap();
    other.close().unwrap();
}

#[test]
fn test_channels_to_read_limits_dynamic_read() {
    let task = ai_task(sim(), "subset", "SimDev1/ai0:3");
    let chans = task.ai_channels().channel_names();
    task.in_stream().set_channels_to_read(&chans[1]).unwrap();
    assert!(matches!(task.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap(), ReadData::Scalar(_)));

    task.in_stream().reset_channels_to_read().unwrap();
    assert_eq!(task.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap().len(), 4);
    task.close().unwrap();
}

#[test]
fn test_channels_to_read_set_as_attribute_limits_reads() {
    let task = ai_task(sim(), "subset_attr", "SimDev1/ai0:3");
    let chans = task.ai_channels().channel_names();
    task.set(AttrTarget::Read, read_attrs::CHANNELS_TO_READ, chans[1].clone())
        .unwrap();
    assert!(matches!(task.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap(), ReadData::Scalar(_)));
    assert!(matches!(task.read(2u32, DEFAULT_TIMEOUT).unwrap(), ReadData::List(v) if v.len() == 2));

    let reader = AnalogMultiChannelReader::new(&task);
    let mut one = [0.0; 1];
    reader.read_one_sample(&mut one, DEFAULT_TIMEOUT).unwrap();
    let mut four = [0.0; 4];
    assert_eq!(
        reader.read_one_sample(&mut four, DEFAULT_TIMEOUT).unwrap_err().kind(),
        ErrorKind::InvalidArgument
    );

    task.in_stream()
        .set_property("channels_to_read", AttributeValue::String(format!("{}, {}", chans[0], chans[3])))
        .unwrap();
    assert_eq!(task.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap().len(), 2);
    let rows = task.read(3u32, DEFAULT_TIMEOUT).unwrap();
    assert_eq!(rows.as_matrix().map(|m| m.len()), Some(2));

    task.in_stream().reset_property("channels_to_read").unwrap();
    assert_eq!(task.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap().len(), 4);
    task.close().unwrap();
}

#[test]
fn test_loaded_task_keeps_saved_channels_to_read() {
    let driver = sim();
    let task = ai_task(driver.clone(), "subset_saved", "SimDev1/ai0:2");
    task.in_stream().set_channels_to_read("SimDev1/ai2").unwrap();
    task.save("", "me", true, false, false).unwrap();
    task.close().unwrap();

    let loaded = Task::load(driver, "subset_saved").unwrap();
    assert_eq!(loaded.ai_channels().channel_names().len(), 3);
    assert!(matches!(loaded.read(NumSamples::Unset, DEFAULT_TIMEOUT).unwrap(), ReadData::Scalar(_)));
    loaded.close().unwrap();
}
