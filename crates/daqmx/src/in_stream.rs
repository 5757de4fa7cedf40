//! Input stream: read position, channel subset, raw reads and TDMS logging.

use tracing::{debug, info};

use crate::attributes::{buffer, facade_properties, facade_reflection, read as attrs, AttrGroup, AttrTarget};
use crate::constants::{LoggingMode, LoggingOperation};
use crate::error::{error_codes, DaqError, Result};
use crate::read;
use crate::task::Task;
use crate::types::NumSamples;

/// Input stream configuration of a task.
#[derive(Debug, Clone, Copy)]
pub struct InStream<'a> {
    task: &'a Task,
}

impl<'a> InStream<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self { task }
    }

    /// Channels reads address, as a flattened list.
    pub fn channels_to_read(&self) -> Result<String> {
        self.task.get(AttrTarget::Read, attrs::CHANNELS_TO_READ)
    }

    /// Restrict reads to a subset of the task's channels.
    pub fn set_channels_to_read(&self, channels: &str) -> Result<()> {
        self.task
            .set(AttrTarget::Read, attrs::CHANNELS_TO_READ, channels.to_string())
    }

    /// Read from every channel again.
    pub fn reset_channels_to_read(&self) -> Result<()> {
        self.task.reset(AttrTarget::Read, attrs::CHANNELS_TO_READ)
    }

    /// Configure TDMS logging.
    ///
    /// With [`LoggingMode::Log`] samples go only to disk and reads fail;
    /// [`LoggingMode::LogAndRead`] also returns them. An empty `group_name`
    /// uses the task name.
    pub fn configure_logging(
        &self,
        file_path: &str,
        logging_mode: LoggingMode,
        group_name: &str,
        operation: LoggingOperation,
    ) -> Result<()> {
        self.task.with_handle(|driver, handle| {
            driver.configure_logging(handle, file_path, logging_mode, group_name, operation)
        })?;
        info!(task = %self.task.name(), file_path, ?logging_mode, ?operation, "Logging configured");
        Ok(())
    }

    /// Switch logging to a new file while the task runs.
    pub fn start_new_file(&self, file_path: &str) -> Result<()> {
        self.task
            .with_handle(|driver, handle| driver.start_new_file(handle, file_path))?;
        info!(task = %self.task.name(), file_path, "Logging switched to new file");
        Ok(())
    }

    fn bytes_per_scan(&self) -> Result<usize> {
        let width = self.raw_data_width()? as usize;
        let channels = self.num_chans()? as usize;
        Ok(width * channels)
    }

    /// Read native-format samples into `buffer`, interleaved by scan.
    ///
    /// The buffer length decides how many samples per channel are read.
    /// Returns samples per channel read.
    pub fn read_raw_into(&self, buffer: &mut [u8], timeout: f64) -> Result<u32> {
        let scan = self.bytes_per_scan()?;
        let samples = if scan == 0 { 0 } else { buffer.len() / scan };
        if samples == 0 {
            return Err(DaqError::invalid_argument(
                error_codes::READ_BUFFER_TOO_SMALL,
                format!(
                    "The buffer of {} bytes cannot hold one scan of {scan} bytes.",
                    buffer.len()
                ),
            ));
        }
        let (read, _) = self
            .task
            .with_handle(|driver, handle| driver.read_raw(handle, samples as u32, timeout, buffer))?;
        debug!(task = %self.task.name(), read, "Raw samples read");
        Ok(read)
    }

    /// Read native-format samples into a new buffer trimmed to what was read.
    pub fn read_raw(&self, samples: impl Into<NumSamples>, timeout: f64) -> Result<Vec<u8>> {
        let samples = read::samples_to_read(self.task, samples.into())?;
        let scan = self.bytes_per_scan()?;
        let mut buffer = vec![0u8; samples as usize * scan];
        if buffer.is_empty() {
            return Ok(buffer);
        }
        let (read, _) = self
            .task
            .with_handle(|driver, handle| driver.read_raw(handle, samples, timeout, &mut buffer))?;
        buffer.truncate(read as usize * scan);
        Ok(buffer)
    }

    facade_properties! {
        AttrTarget::Read;
        /// Whether an all-available read of a finite task returns what is
        /// buffered now instead of waiting for every sample.
        read_all_avail_samp, set_read_all_avail_samp, reset_read_all_avail_samp
            => attrs::READ_ALL_AVAIL_SAMP: bool;
        avail_samp_per_chan => attrs::AVAIL_SAMP_PER_CHAN: u32;
        num_chans => attrs::NUM_CHANS: u32;
        di_num_booleans_per_chan => attrs::DI_NUM_BOOLEANS_PER_CHAN: u32;
        /// Bytes per raw sample.
        raw_data_width => attrs::RAW_DATA_WIDTH: u32;
        curr_read_pos => attrs::CURR_READ_POS: u64;
        total_samp_per_chan_acquired => attrs::TOTAL_SAMP_PER_CHAN_ACQUIRED: u64;
        logging_file_path, set_logging_file_path, reset_logging_file_path => attrs::LOGGING_FILE_PATH: String;
        logging_mode, set_logging_mode, reset_logging_mode => attrs::LOGGING_MODE: LoggingMode;
        logging_tdms_group_name, set_logging_tdms_group_name, reset_logging_tdms_group_name
            => attrs::LOGGING_TDMS_GROUP_NAME: String;
        logging_tdms_operation, set_logging_tdms_operation, reset_logging_tdms_operation
            => attrs::LOGGING_TDMS_OPERATION: LoggingOperation;
        /// Pausing and resuming starts a new group in the file.
        logging_pause, set_logging_pause, reset_logging_pause => attrs::LOGGING_PAUSE: bool;
        /// Samples per file before rolling to `<name>_0001.tdms`; 0 disables rolling.
        logging_samps_per_file, set_logging_samps_per_file, reset_logging_samps_per_file
            => attrs::LOGGING_SAMPS_PER_FILE: u64;
        /// Samples per write to disk; must be a multiple of the volume sector size.
        logging_file_write_size, set_logging_file_write_size, reset_logging_file_write_size
            => attrs::LOGGING_FILE_WRITE_SIZE: u32;
        logging_file_preallocation_size, set_logging_file_preallocation_size, reset_logging_file_preallocation_size
            => attrs::LOGGING_FILE_PREALLOCATION_SIZE: u64;
    }

    facade_properties! {
        AttrTarget::Buffer;
        /// Input buffer size in samples per channel.
        input_buf_size, set_input_buf_size, reset_input_buf_size => buffer::INPUT_BUF_SIZE: u32;
    }

    facade_reflection!(AttrTarget::Read, AttrGroup::Read);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::SimulatedDriver;

    #[test]
    fn test_configure_logging_sets_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.tdms");
        let path = path.to_str().unwrap();

        let task = Task::new(Arc::new(SimulatedDriver::default()), "log").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        let stream = task.in_stream();
        stream
            .configure_logging(path, LoggingMode::LogAndRead, "", LoggingOperation::CreateOrReplace)
            .unwrap();
        assert_eq!(stream.logging_file_path().unwrap(), path);
        assert_eq!(stream.logging_mode().unwrap(), LoggingMode::LogAndRead);
        assert_eq!(stream.logging_tdms_operation().unwrap(), LoggingOperation::CreateOrReplace);

        let next = dir.path().join("run2.tdms");
        stream.start_new_file(next.to_str().unwrap()).unwrap();
        assert_eq!(stream.logging_file_path().unwrap(), next.to_str().unwrap());
    }

    #[test]
    fn test_start_new_file_requires_logging() {
        let task = Task::new(Arc::new(SimulatedDriver::default()), "nolog").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        let err = task.in_stream().start_new_file("other.tdms").unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_TASK_STATE);
        assert_eq!(err.task_name(), Some("nolog"));
    }

    #[test]
    fn test_channels_to_read_round_trip() {
        let task = Task::new(Arc::new(SimulatedDriver::default()), "subset").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0:2").unwrap();
        let stream = task.in_stream();
        stream.set_channels_to_read("SimDev1/ai1").unwrap();
        assert_eq!(stream.channels_to_read().unwrap(), "SimDev1/ai1");
        assert_eq!(task.read_channels().unwrap().len(), 1);

        stream.reset_channels_to_read().unwrap();
        assert_eq!(task.read_channels().unwrap().len(), 3);
    }
}
