//! Safe Rust binding for NI-DAQmx data acquisition.
//!
//! The crate wraps the vendor driver behind a narrow [`Driver`] adapter and
//! builds the task model on top of it: tasks own a driver handle, channels
//! are added through typed collections, and samples move through either a
//! shape-inferring dynamic engine or preallocated stream readers/writers.
//!
//! # Adapters
//!
//! - [`SimulatedDriver`] - In-memory devices with internal loopbacks
//! - [`RemoteDriver`] - Forwards every call over a [`SessionTransport`]
//! - `LibraryDriver` - The vendor C library (feature `hardware`)
//!
//! # Tasks
//!
//! - [`Task`] - Handle owner, lifecycle and event registration
//! - [`Channel`] - View over one or more virtual channels of a task
//! - [`Timing`], [`Triggers`], [`ExportSignals`], [`InStream`], [`OutStream`]
//!   - Attribute façades borrowed from a task
//!
//! ## Streaming
//! - [`stream_readers`] - Typed readers filling caller-owned buffers
//! - [`stream_writers`] - Typed writers draining caller-owned buffers
//!
//! ## Safety
//! - [`WatchdogTask`] - Drives outputs to safe states when the host stops
//!   resetting the timer
//!
//! # Examples
//!
//! ## Analog loopback
//!
//! ```no_run
//! use std::sync::Arc;
//! use daqmx::{NumSamples, SimulatedDriver, Task, DEFAULT_TIMEOUT};
//!
//! # fn example() -> daqmx::Result<()> {
//! let driver = Arc::new(SimulatedDriver::default());
//!
//! let ao = Task::new(driver.clone(), "ao")?;
//! ao.ao_channels().add_ao_voltage_chan("SimDev1/ao0")?;
//! ao.write(3.14, None, DEFAULT_TIMEOUT)?;
//!
//! let ai = Task::new(driver, "ai")?;
//! ai.ai_channels().add_ai_voltage_chan("SimDev1/ai0")?;
//! let value = ai.read(NumSamples::Unset, DEFAULT_TIMEOUT)?;
//! println!("{value:?}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Hardware-timed acquisition into a reused buffer
//!
//! ```no_run
//! use std::sync::Arc;
//! use daqmx::stream_readers::AnalogMultiChannelReader;
//! use daqmx::{AcquisitionType, Edge, SimulatedDriver, Task};
//!
//! # fn example() -> daqmx::Result<()> {
//! let task = Task::new(Arc::new(SimulatedDriver::default()), "scan")?;
//! task.ai_channels().add_ai_voltage_chan("SimDev1/ai0:3")?;
//! task.timing().cfg_samp_clk_timing(10_000.0, "", Edge::Rising, AcquisitionType::Continuous, 1000)?;
//!
//! let reader = AnalogMultiChannelReader::new(&task);
//! let mut data = ndarray::Array2::<f64>::zeros((4, 1000));
//! task.start()?;
//! let n = reader.read_many_sample(&mut data, 1000u32, 10.0)?;
//! println!("read {n} samples per channel");
//! task.close()?;
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod channels;
pub mod config;
pub mod constants;
pub mod driver;
pub mod error;
pub mod events;
pub mod export_signals;
pub mod in_stream;
pub mod names;
pub mod out_stream;
mod read;
mod stream;
pub mod stream_readers;
pub mod stream_writers;
pub mod task;
pub mod timestamp;
pub mod timing;
pub mod triggering;
pub mod types;
pub mod warnings;
pub mod watchdog;
mod write;

pub use attributes::{AttrGroup, AttrTarget, Attribute, AttributeType, AttributeValue};
pub use channels::{
    AiChannelCollection, AoChannelCollection, Channel, CiChannelCollection, CoChannelCollection, DiChannelCollection,
    DoChannelCollection,
};
pub use config::{ConfigLoadError, DriverConfig, SimulatedDeviceConfig};
pub use constants::*;
pub use driver::{
    Driver, GrpcOptions, RemoteDriver, SessionInitializationBehavior, SessionTransport, SimulatedDriver, TaskHandle,
};
#[cfg(feature = "hardware")]
pub use driver::LibraryDriver;
pub use error::{error_codes, DaqError, ErrorKind, Result};
pub use events::{EventKind, EventSink};
pub use export_signals::ExportSignals;
pub use in_stream::InStream;
pub use names::{flatten_channel_string, unflatten_channel_string};
pub use out_stream::OutStream;
pub use task::Task;
pub use timestamp::Timestamp;
pub use timing::Timing;
pub use triggering::Triggers;
pub use types::{
    ChannelKind, CtrFreq, CtrTick, CtrTime, NumSamples, PowerMeasurement, ReadData, Sample, SampleVec, WriteData,
};
pub use warnings::{set_warning_handler, take_warning_handler, DaqResourceWarning, DaqWarning, Warning};
pub use watchdog::{ExpirationState, WatchdogTask};
