//! Exported signal routing.

use tracing::debug;

use crate::attributes::{export as attrs, facade_properties, facade_reflection, AttrGroup, AttrTarget};
use crate::constants::Signal;
use crate::error::Result;
use crate::task::Task;

/// Routes task signals to device terminals.
#[derive(Debug, Clone, Copy)]
pub struct ExportSignals<'a> {
    task: &'a Task,
}

impl<'a> ExportSignals<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self { task }
    }

    /// Route `signal` to `output_terminal`, such as `/Dev1/PFI4`.
    /// Several terminals may be given as a comma-separated list.
    pub fn export_signal(&self, signal: Signal, output_terminal: &str) -> Result<()> {
        self.task
            .with_handle(|driver, handle| driver.export_signal(handle, signal, output_terminal))?;
        debug!(task = %self.task.name(), ?signal, output_terminal, "Signal exported");
        Ok(())
    }

    facade_properties! {
        AttrTarget::ExportedSignal;
        samp_clk_output_term, set_samp_clk_output_term, reset_samp_clk_output_term
            => attrs::SAMP_CLK_OUTPUT_TERM: String;
        start_trig_output_term, set_start_trig_output_term, reset_start_trig_output_term
            => attrs::START_TRIG_OUTPUT_TERM: String;
        ref_trig_output_term, set_ref_trig_output_term, reset_ref_trig_output_term
            => attrs::REF_TRIG_OUTPUT_TERM: String;
        ctr_out_event_output_term, set_ctr_out_event_output_term, reset_ctr_out_event_output_term
            => attrs::CTR_OUT_EVENT_OUTPUT_TERM: String;
    }

    facade_reflection!(AttrTarget::ExportedSignal, AttrGroup::ExportedSignal);
}
