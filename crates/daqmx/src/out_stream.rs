//! Output stream: regeneration, buffer space and raw writes.

use tracing::debug;

use crate::attributes::{buffer, facade_properties, facade_reflection, write as attrs, AttrGroup, AttrTarget};
use crate::constants::RegenerationMode;
use crate::error::{error_codes, DaqError, Result};
use crate::task::Task;

/// Output stream configuration of a task.
#[derive(Debug, Clone, Copy)]
pub struct OutStream<'a> {
    task: &'a Task,
}

impl<'a> OutStream<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self { task }
    }

    /// Write native-format samples, interleaved by scan.
    ///
    /// The byte count must be a whole number of scans. Returns samples per
    /// channel written.
    pub fn write_raw(&self, data: &[u8], auto_start: bool, timeout: f64) -> Result<u32> {
        let scan = self.raw_data_width()? as usize * self.num_chans()? as usize;
        if scan == 0 || data.is_empty() || data.len() % scan != 0 {
            return Err(DaqError::invalid_argument(
                error_codes::NUM_SAMPS_WRONG,
                format!(
                    "Raw data of {} bytes is not a whole number of {scan}-byte scans.",
                    data.len()
                ),
            ));
        }
        let samples = (data.len() / scan) as u32;
        let written = self
            .task
            .with_handle(|driver, handle| driver.write_raw(handle, samples, auto_start, timeout, data))?;
        debug!(task = %self.task.name(), written, "Raw samples written");
        Ok(written)
    }

    facade_properties! {
        AttrTarget::Write;
        num_chans => attrs::NUM_CHANS: u32;
        do_num_booleans_per_chan => attrs::DO_NUM_BOOLEANS_PER_CHAN: u32;
        /// Whether the device may regenerate samples already in the buffer.
        regen_mode, set_regen_mode, reset_regen_mode => attrs::REGEN_MODE: RegenerationMode;
        /// Free space in the output buffer, in samples per channel.
        space_avail => attrs::SPACE_AVAIL: u32;
        raw_data_width => attrs::RAW_DATA_WIDTH: u32;
        total_samp_per_chan_generated => attrs::TOTAL_SAMP_PER_CHAN_GENERATED: u64;
    }

    facade_properties! {
        AttrTarget::Buffer;
        output_buf_size, set_output_buf_size, reset_output_buf_size => buffer::OUTPUT_BUF_SIZE: u32;
    }

    facade_reflection!(AttrTarget::Write, AttrGroup::Write);
}
