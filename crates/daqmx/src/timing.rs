//! Sample timing façade.
//!
//! The `cfg_*` entry points set a coherent group of timing attributes in one
//! driver call. Individual attributes are reachable through the typed
//! accessors or by property name.

use tracing::debug;

use crate::attributes::{facade_properties, facade_reflection, timing as attrs, AttrGroup, AttrTarget};
use crate::constants::{AcquisitionType, Edge, Level, Polarity, SampleTimingType};
use crate::driver::TimingConfig;
use crate::error::Result;
use crate::task::Task;

/// Timing configuration of a task.
#[derive(Debug, Clone, Copy)]
pub struct Timing<'a> {
    task: &'a Task,
}

impl<'a> Timing<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self { task }
    }

    fn configure(&self, config: TimingConfig) -> Result<()> {
        self.task
            .with_handle(|driver, handle| driver.configure_timing(handle, &config))?;
        debug!(task = %self.task.name(), ?config, "Timing configured");
        Ok(())
    }

    /// Time samples with a sample clock.
    ///
    /// An empty `source` selects the device's onboard clock. For finite
    /// acquisitions `samps_per_chan` is the total; for continuous ones it
    /// sizes the buffer.
    pub fn cfg_samp_clk_timing(
        &self,
        rate: f64,
        source: &str,
        active_edge: Edge,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    ) -> Result<()> {
        self.configure(TimingConfig::SampleClock {
            rate,
            source: source.to_string(),
            active_edge,
            sample_mode,
            samps_per_chan,
        })
    }

    /// Let the measurement itself pace the samples, as with counter
    /// period measurements and pulse generation.
    pub fn cfg_implicit_timing(&self, sample_mode: AcquisitionType, samps_per_chan: u64) -> Result<()> {
        self.configure(TimingConfig::Implicit {
            sample_mode,
            samps_per_chan,
        })
    }

    /// Transfer samples under handshake control.
    pub fn cfg_handshaking_timing(&self, sample_mode: AcquisitionType, samps_per_chan: u64) -> Result<()> {
        self.configure(TimingConfig::Handshaking {
            sample_mode,
            samps_per_chan,
        })
    }

    /// Burst handshaking with an imported sample clock.
    #[allow(clippy::too_many_arguments)]
    pub fn cfg_burst_handshaking_timing_import_clock(
        &self,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
        sample_clk_rate: f64,
        sample_clk_src: &str,
        sample_clk_active_edge: Edge,
        pause_when: Level,
        ready_event_active_level: Polarity,
    ) -> Result<()> {
        self.configure(TimingConfig::BurstHandshakingImportClock {
            sample_mode,
            samps_per_chan,
            sample_clk_rate,
            sample_clk_src: sample_clk_src.to_string(),
            sample_clk_active_edge,
            pause_when,
            ready_event_active_level,
        })
    }

    /// Burst handshaking with an exported sample clock.
    #[allow(clippy::too_many_arguments)]
    pub fn cfg_burst_handshaking_timing_export_clock(
        &self,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
        sample_clk_rate: f64,
        sample_clk_outp_term: &str,
        sample_clk_pulse_polarity: Polarity,
        pause_when: Level,
        ready_event_active_level: Polarity,
    ) -> Result<()> {
        self.configure(TimingConfig::BurstHandshakingExportClock {
            sample_mode,
            samps_per_chan,
            sample_clk_rate,
            sample_clk_outp_term: sample_clk_outp_term.to_string(),
            sample_clk_pulse_polarity,
            pause_when,
            ready_event_active_level,
        })
    }

    /// Acquire a sample whenever a line changes. Either line list may be empty.
    pub fn cfg_change_detection_timing(
        &self,
        rising_edge_chan: &str,
        falling_edge_chan: &str,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    ) -> Result<()> {
        self.configure(TimingConfig::ChangeDetection {
            rising_edge_chan: rising_edge_chan.to_string(),
            falling_edge_chan: falling_edge_chan.to_string(),
            sample_mode,
            samps_per_chan,
        })
    }

    /// Sample clock timing with pipelined acquisition.
    pub fn cfg_pipelined_samp_clk_timing(
        &self,
        rate: f64,
        source: &str,
        active_edge: Edge,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    ) -> Result<()> {
        self.configure(TimingConfig::PipelinedSampleClock {
            rate,
            source: source.to_string(),
            active_edge,
            sample_mode,
            samps_per_chan,
        })
    }

    facade_properties! {
        AttrTarget::Timing;
        /// Finite, continuous or hardware-timed single point.
        samp_quant_samp_mode, set_samp_quant_samp_mode, reset_samp_quant_samp_mode
            => attrs::SAMP_QUANT_SAMP_MODE: AcquisitionType;
        /// Samples per channel to acquire, or the buffer size when continuous.
        samp_quant_samp_per_chan, set_samp_quant_samp_per_chan, reset_samp_quant_samp_per_chan
            => attrs::SAMP_QUANT_SAMP_PER_CHAN: u64;
        samp_timing_type, set_samp_timing_type, reset_samp_timing_type
            => attrs::SAMP_TIMING_TYPE: SampleTimingType;
        /// Sample clock rate in samples per second per channel.
        samp_clk_rate, set_samp_clk_rate, reset_samp_clk_rate => attrs::SAMP_CLK_RATE: f64;
        samp_clk_src, set_samp_clk_src, reset_samp_clk_src => attrs::SAMP_CLK_SRC: String;
        samp_clk_active_edge, set_samp_clk_active_edge, reset_samp_clk_active_edge
            => attrs::SAMP_CLK_ACTIVE_EDGE: Edge;
        /// Highest rate the device supports with the current configuration.
        samp_clk_max_rate => attrs::SAMP_CLK_MAX_RATE: f64;
        change_detect_di_rising_edge_physical_chans,
            set_change_detect_di_rising_edge_physical_chans,
            reset_change_detect_di_rising_edge_physical_chans
            => attrs::CHANGE_DETECT_DI_RISING_EDGE_PHYSICAL_CHANS: String;
        change_detect_di_falling_edge_physical_chans,
            set_change_detect_di_falling_edge_physical_chans,
            reset_change_detect_di_falling_edge_physical_chans
            => attrs::CHANGE_DETECT_DI_FALLING_EDGE_PHYSICAL_CHANS: String;
    }

    facade_reflection!(AttrTarget::Timing, AttrGroup::Timing);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::attributes::AttributeValue;
    use crate::driver::SimulatedDriver;
    use crate::error::ErrorKind;

    fn ai_task() -> Task {
        let task = Task::new(Arc::new(SimulatedDriver::default()), "timing").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        task
    }

    #[test]
    fn test_samp_clk_sets_quantity() {
        let task = ai_task();
        let timing = task.timing();
        timing
            .cfg_samp_clk_timing(5000.0, "", Edge::Rising, AcquisitionType::Finite, 1000)
            .unwrap();
        assert_eq!(timing.samp_clk_rate().unwrap(), 5000.0);
        assert_eq!(timing.samp_quant_samp_mode().unwrap(), AcquisitionType::Finite);
        assert_eq!(timing.samp_quant_samp_per_chan().unwrap(), 1000);
        assert_eq!(timing.samp_timing_type().unwrap(), SampleTimingType::SampleClock);
    }

    #[test]
    fn test_set_then_reset_restores_default() {
        let task = ai_task();
        let timing = task.timing();
        let default = timing.samp_clk_rate().unwrap();
        timing.set_samp_clk_rate(2500.0).unwrap();
        assert_eq!(timing.samp_clk_rate().unwrap(), 2500.0);
        timing.reset_samp_clk_rate().unwrap();
        assert_eq!(timing.samp_clk_rate().unwrap(), default);
    }

    #[test]
    fn test_property_by_name() {
        let task = ai_task();
        let timing = task.timing();
        timing.set_property("samp_clk_rate", AttributeValue::F64(100.0)).unwrap();
        assert_eq!(timing.get_property("samp_clk_rate").unwrap(), AttributeValue::F64(100.0));

        let err = timing.set_property("samp_clk_speed", AttributeValue::F64(1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownProperty);
        let err = timing.set_property("samp_clk_rate", AttributeValue::Bool(true)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(timing.property_names().any(|n| n == "samp_clk_src"));
    }
}
