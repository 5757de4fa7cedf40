//! Trigger façade.

use tracing::debug;

use crate::attributes::{facade_properties, facade_reflection, trigger as attrs, AttrGroup, AttrTarget};
use crate::constants::{Edge, Slope, SoftwareTrigger, Timescale, TriggerType};
use crate::driver::TriggerConfig;
use crate::error::Result;
use crate::task::Task;
use crate::timestamp::Timestamp;

/// Trigger configuration of a task.
#[derive(Debug, Clone, Copy)]
pub struct Triggers<'a> {
    task: &'a Task,
}

impl<'a> Triggers<'a> {
    pub(crate) fn new(task: &'a Task) -> Self {
        Self { task }
    }

    /// Trigger that begins the acquisition or generation.
    pub fn start_trigger(&self) -> StartTrigger<'a> {
        StartTrigger { task: self.task }
    }

    /// Trigger that marks the point separating pretrigger and posttrigger samples.
    pub fn reference_trigger(&self) -> ReferenceTrigger<'a> {
        ReferenceTrigger { task: self.task }
    }

    /// Fire a trigger from software.
    pub fn send_software_trigger(&self, trigger: SoftwareTrigger) -> Result<()> {
        self.task
            .with_handle(|driver, handle| driver.send_software_trigger(handle, trigger))?;
        debug!(task = %self.task.name(), ?trigger, "Software trigger sent");
        Ok(())
    }

    facade_reflection!(AttrTarget::Trigger, AttrGroup::Trigger);
}

fn configure(task: &Task, config: TriggerConfig) -> Result<()> {
    task.with_handle(|driver, handle| driver.configure_trigger(handle, &config))?;
    debug!(task = %task.name(), ?config, "Trigger configured");
    Ok(())
}

/// Start trigger of a task.
#[derive(Debug, Clone, Copy)]
pub struct StartTrigger<'a> {
    task: &'a Task,
}

impl StartTrigger<'_> {
    /// Start on an edge of a digital signal.
    pub fn cfg_dig_edge_start_trig(&self, source: &str, edge: Edge) -> Result<()> {
        configure(
            self.task,
            TriggerConfig::DigEdgeStart {
                source: source.to_string(),
                edge,
            },
        )
    }

    /// Start when an analog signal crosses `level` with `slope`.
    pub fn cfg_anlg_edge_start_trig(&self, source: &str, slope: Slope, level: f64) -> Result<()> {
        configure(
            self.task,
            TriggerConfig::AnlgEdgeStart {
                source: source.to_string(),
                slope,
                level,
            },
        )
    }

    /// Start at an absolute time.
    pub fn cfg_time_start_trig(&self, when: Timestamp, timescale: Timescale) -> Result<()> {
        configure(self.task, TriggerConfig::TimeStart { when, timescale })
    }

    /// Start as soon as the task starts.
    pub fn disable_start_trig(&self) -> Result<()> {
        configure(self.task, TriggerConfig::DisableStart)
    }

    facade_properties! {
        AttrTarget::Trigger;
        trig_type, set_trig_type, reset_trig_type => attrs::START_TRIG_TYPE: TriggerType;
        dig_edge_src, set_dig_edge_src, reset_dig_edge_src => attrs::DIG_EDGE_START_TRIG_SRC: String;
        dig_edge_edge, set_dig_edge_edge, reset_dig_edge_edge => attrs::DIG_EDGE_START_TRIG_EDGE: Edge;
        anlg_edge_src, set_anlg_edge_src, reset_anlg_edge_src => attrs::ANLG_EDGE_START_TRIG_SRC: String;
        anlg_edge_slope, set_anlg_edge_slope, reset_anlg_edge_slope => attrs::ANLG_EDGE_START_TRIG_SLOPE: Slope;
        anlg_edge_lvl, set_anlg_edge_lvl, reset_anlg_edge_lvl => attrs::ANLG_EDGE_START_TRIG_LVL: f64;
        /// Whether each trigger after the first restarts a finite acquisition.
        retriggerable, set_retriggerable, reset_retriggerable => attrs::START_TRIG_RETRIGGERABLE: bool;
        /// Devices without timestamp support fail at runtime.
        timestamp_enable, set_timestamp_enable, reset_timestamp_enable
            => attrs::START_TRIG_TIMESTAMP_ENABLE: bool;
        /// Time the start trigger asserted; requires `timestamp_enable`.
        timestamp_val => attrs::START_TRIG_TIMESTAMP_VAL: Timestamp;
        trig_when, set_trig_when, reset_trig_when => attrs::TIME_START_TRIG_WHEN: Timestamp;
    }
}

/// Reference trigger of a task.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceTrigger<'a> {
    task: &'a Task,
}

impl ReferenceTrigger<'_> {
    /// Reference on a digital edge, keeping `pretrigger_samples` before it.
    pub fn cfg_dig_edge_ref_trig(&self, source: &str, pretrigger_samples: u32, edge: Edge) -> Result<()> {
        configure(
            self.task,
            TriggerConfig::DigEdgeRef {
                source: source.to_string(),
                edge,
                pretrigger_samples,
            },
        )
    }

    /// Reference on an analog level crossing.
    pub fn cfg_anlg_edge_ref_trig(&self, source: &str, pretrigger_samples: u32, slope: Slope, level: f64) -> Result<()> {
        configure(
            self.task,
            TriggerConfig::AnlgEdgeRef {
                source: source.to_string(),
                slope,
                level,
                pretrigger_samples,
            },
        )
    }

    /// Remove the reference trigger.
    pub fn disable_ref_trig(&self) -> Result<()> {
        configure(self.task, TriggerConfig::DisableRef)
    }

    facade_properties! {
        AttrTarget::Trigger;
        trig_type, set_trig_type, reset_trig_type => attrs::REF_TRIG_TYPE: TriggerType;
        pretrig_samples, set_pretrig_samples, reset_pretrig_samples => attrs::REF_TRIG_PRETRIG_SAMPLES: u32;
        dig_edge_src, set_dig_edge_src, reset_dig_edge_src => attrs::DIG_EDGE_REF_TRIG_SRC: String;
        dig_edge_edge, set_dig_edge_edge, reset_dig_edge_edge => attrs::DIG_EDGE_REF_TRIG_EDGE: Edge;
        anlg_edge_src, set_anlg_edge_src, reset_anlg_edge_src => attrs::ANLG_EDGE_REF_TRIG_SRC: String;
        anlg_edge_slope, set_anlg_edge_slope, reset_anlg_edge_slope => attrs::ANLG_EDGE_REF_TRIG_SLOPE: Slope;
        anlg_edge_lvl, set_anlg_edge_lvl, reset_anlg_edge_lvl => attrs::ANLG_EDGE_REF_TRIG_LVL: f64;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::SimulatedDriver;

    #[test]
    fn test_dig_edge_start_trigger() {
        let task = Task::new(Arc::new(SimulatedDriver::default()), "trig").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        let start = task.triggers().start_trigger();
        start.cfg_dig_edge_start_trig("/SimDev1/PFI0", Edge::Falling).unwrap();
        assert_eq!(start.trig_type().unwrap(), TriggerType::DigitalEdge);
        assert_eq!(start.dig_edge_src().unwrap(), "/SimDev1/PFI0");
        assert_eq!(start.dig_edge_edge().unwrap(), Edge::Falling);

        start.disable_start_trig().unwrap();
        assert_eq!(start.trig_type().unwrap(), TriggerType::None);
    }

    #[test]
    fn test_reference_trigger_pretrigger_samples() {
        let task = Task::new(Arc::new(SimulatedDriver::default()), "ref").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        let reference = task.triggers().reference_trigger();
        reference
            .cfg_anlg_edge_ref_trig("SimDev1/ai0", 100, Slope::Rising, 1.5)
            .unwrap();
        assert_eq!(reference.trig_type().unwrap(), TriggerType::AnalogEdge);
        assert_eq!(reference.pretrig_samples().unwrap(), 100);
        assert_eq!(reference.anlg_edge_lvl().unwrap(), 1.5);
    }
}
