//! Watchdog timer tasks.
//!
//! A watchdog task drives outputs to configured safe states when the host
//! stops resetting the timer in time. It has the lifecycle of a [`Task`]
//! without channels or a data path.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use daqmx::{DigitalLineState, SimulatedDriver};
//! # use daqmx::watchdog::{DoExpirationState, WatchdogTask};
//! # fn example() -> daqmx::Result<()> {
//! let wd = WatchdogTask::new(Arc::new(SimulatedDriver::default()), "SimDev1", "wd", 0.5)?;
//! wd.cfg_watchdog_do_expir_states(&[DoExpirationState::new("SimDev1/port1/line0", DigitalLineState::Low)])?;
//! wd.start()?;
//! loop {
//!     // ... control loop work ...
//!     wd.reset_timer()?;
//! #   break;
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::attributes::{self, watchdog as attrs, AttrTarget, AttributeKind};
use crate::constants::{DigitalLineState, TaskMode, WatchdogAOExpirState, WatchdogCOExpirState, WatchdogControlAction};
use crate::driver::{Driver, TaskHandle};
use crate::error::Result;
use crate::names::flatten_channel_string;
use crate::task::Task;

/// Timeout meaning the watchdog only expires through its trigger.
pub const EXPIRE_BY_TRIGGER_ONLY: f64 = -1.0;

/// Safe state for a digital output line or port.
#[derive(Debug, Clone, PartialEq)]
pub struct DoExpirationState {
    /// Output line, port or channel the state applies to.
    pub physical_channel: String,
    /// State the output takes when the watchdog expires.
    pub expiration_state: DigitalLineState,
}

impl DoExpirationState {
    /// Digital safe state for `physical_channel`.
    pub fn new(physical_channel: impl Into<String>, expiration_state: DigitalLineState) -> Self {
        Self {
            physical_channel: physical_channel.into(),
            expiration_state,
        }
    }
}

/// Safe level for an analog output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct AoExpirationState {
    /// Output line, port or channel the state applies to.
    pub physical_channel: String,
    /// Volts or amps, per `output_type`.
    pub expiration_state: f64,
    /// Whether `expiration_state` is volts or amps.
    pub output_type: WatchdogAOExpirState,
}

impl AoExpirationState {
    /// Analog safe level for `physical_channel`.
    pub fn new(physical_channel: impl Into<String>, expiration_state: f64, output_type: WatchdogAOExpirState) -> Self {
        Self {
            physical_channel: physical_channel.into(),
            expiration_state,
            output_type,
        }
    }
}

/// Safe state for a counter output.
#[derive(Debug, Clone, PartialEq)]
pub struct CoExpirationState {
    /// Output line, port or channel the state applies to.
    pub physical_channel: String,
    /// State the output takes when the watchdog expires.
    pub expiration_state: WatchdogCOExpirState,
}

impl CoExpirationState {
    /// Counter safe state for `physical_channel`.
    pub fn new(physical_channel: impl Into<String>, expiration_state: WatchdogCOExpirState) -> Self {
        Self {
            physical_channel: physical_channel.into(),
            expiration_state,
        }
    }
}

/// Expiration settings of one physical channel on a watchdog task.
#[derive(Debug, Clone)]
pub struct ExpirationState<'a> {
    task: &'a Task,
    physical_channel: String,
}

impl<'a> ExpirationState<'a> {
    fn new(task: &'a Task, physical_channel: String) -> Self {
        Self { task, physical_channel }
    }

    /// Physical channel these settings apply to.
    pub fn physical_channel(&self) -> &str {
        &self.physical_channel
    }

    fn target(&self) -> AttrTarget<'_> {
        AttrTarget::Watchdog(&self.physical_channel)
    }

    /// Digital expiration state.
    pub fn do_state(&self) -> Result<DigitalLineState> {
        self.task.get(self.target(), attrs::DO_EXPIR_STATE)
    }

    /// Set the digital expiration state.
    pub fn set_do_state(&self, state: DigitalLineState) -> Result<()> {
        self.task.set(self.target(), attrs::DO_EXPIR_STATE, state)
    }

    /// Analog expiration level.
    pub fn ao_state(&self) -> Result<f64> {
        self.task.get(self.target(), attrs::AO_EXPIR_STATE)
    }

    /// Set the analog expiration level.
    pub fn set_ao_state(&self, value: f64) -> Result<()> {
        self.task.set(self.target(), attrs::AO_EXPIR_STATE, value)
    }

    /// Whether the analog level is volts or amps.
    pub fn ao_output_type(&self) -> Result<WatchdogAOExpirState> {
        self.task.get(self.target(), attrs::AO_OUTPUT_TYPE)
    }

    /// Set whether the analog level is volts or amps.
    pub fn set_ao_output_type(&self, output_type: WatchdogAOExpirState) -> Result<()> {
        self.task.set(self.target(), attrs::AO_OUTPUT_TYPE, output_type)
    }

    /// Counter expiration state.
    pub fn co_state(&self) -> Result<WatchdogCOExpirState> {
        self.task.get(self.target(), attrs::CO_EXPIR_STATE)
    }

    /// Set the counter expiration state.
    pub fn set_co_state(&self, state: WatchdogCOExpirState) -> Result<()> {
        self.task.set(self.target(), attrs::CO_EXPIR_STATE, state)
    }
}

/// A watchdog timer task on one device.
#[derive(Debug)]
pub struct WatchdogTask {
    task: Task,
}

impl WatchdogTask {
    /// Create a watchdog on `device_name` expiring after `timeout` seconds
    /// without a reset. [`EXPIRE_BY_TRIGGER_ONLY`] disables the timer.
    pub fn new(driver: Arc<dyn Driver>, device_name: &str, task_name: &str, timeout: f64) -> Result<Self> {
        let (handle, owns_on_exit) = driver.create_watchdog_timer_task(device_name, task_name, timeout)?;
        let name = driver
            .get_attribute(handle, AttrTarget::Task, attributes::task::id::NAME, String::TYPE)
            .and_then(String::from_value)
            .unwrap_or_else(|_| task_name.to_string());
        info!(task = %name, device = device_name, timeout, "Watchdog task created");
        Ok(Self {
            task: Task::adopt(driver, handle, name, owns_on_exit),
        })
    }

    /// Name of the watchdog task.
    pub fn name(&self) -> &str {
        self.task.name()
    }

    /// Driver handle, or `InvalidHandle` once closed.
    pub fn handle(&self) -> Result<TaskHandle> {
        self.task.handle()
    }

    /// Expiration settings of one configured channel.
    pub fn expiration_state(&self, physical_channel: &str) -> ExpirationState<'_> {
        ExpirationState::new(&self.task, physical_channel.to_string())
    }

    /// Configure digital output safe states.
    pub fn cfg_watchdog_do_expir_states(&self, states: &[DoExpirationState]) -> Result<Vec<ExpirationState<'_>>> {
        let channels = self.channels(states.iter().map(|s| &s.physical_channel));
        let values: Vec<DigitalLineState> = states.iter().map(|s| s.expiration_state).collect();
        self.task
            .with_handle(|d, h| d.cfg_watchdog_do_expir_states(h, &channels, &values))?;
        Ok(self.configured(states.iter().map(|s| &s.physical_channel)))
    }

    /// Configure analog output safe levels.
    pub fn cfg_watchdog_ao_expir_states(&self, states: &[AoExpirationState]) -> Result<Vec<ExpirationState<'_>>> {
        let channels = self.channels(states.iter().map(|s| &s.physical_channel));
        let values: Vec<f64> = states.iter().map(|s| s.expiration_state).collect();
        let output_types: Vec<WatchdogAOExpirState> = states.iter().map(|s| s.output_type).collect();
        self.task
            .with_handle(|d, h| d.cfg_watchdog_ao_expir_states(h, &channels, &values, &output_types))?;
        Ok(self.configured(states.iter().map(|s| &s.physical_channel)))
    }

    /// Configure counter output safe states.
    pub fn cfg_watchdog_co_expir_states(&self, states: &[CoExpirationState]) -> Result<Vec<ExpirationState<'_>>> {
        let channels = self.channels(states.iter().map(|s| &s.physical_channel));
        let values: Vec<WatchdogCOExpirState> = states.iter().map(|s| s.expiration_state).collect();
        self.task
            .with_handle(|d, h| d.cfg_watchdog_co_expir_states(h, &channels, &values))?;
        Ok(self.configured(states.iter().map(|s| &s.physical_channel)))
    }

    fn channels<'s>(&self, names: impl Iterator<Item = &'s String>) -> String {
        let names: Vec<&str> = names.map(String::as_str).collect();
        let channels = flatten_channel_string(&names);
        debug!(task = %self.name(), channels = %channels, "Watchdog expiration states");
        channels
    }

    fn configured<'s>(&self, names: impl Iterator<Item = &'s String>) -> Vec<ExpirationState<'_>> {
        names.map(|n| ExpirationState::new(&self.task, n.clone())).collect()
    }

    /// Arm the watchdog timer.
    pub fn start(&self) -> Result<()> {
        self.task.start()
    }

    /// Disarm the watchdog timer.
    pub fn stop(&self) -> Result<()> {
        self.task.stop()
    }

    /// Apply a task-mode transition.
    pub fn control(&self, action: TaskMode) -> Result<()> {
        self.task.control(action)
    }

    /// Restart the countdown.
    pub fn reset_timer(&self) -> Result<()> {
        self.task
            .with_handle(|d, h| d.control_watchdog_task(h, WatchdogControlAction::ResetTimer))
    }

    /// Leave the expired state so outputs accept new values.
    pub fn clear_expiration(&self) -> Result<()> {
        self.task
            .with_handle(|d, h| d.control_watchdog_task(h, WatchdogControlAction::ClearExpiration))?;
        info!(task = %self.name(), "Watchdog expiration cleared");
        Ok(())
    }

    /// Clear the watchdog task.
    pub fn close(&self) -> Result<()> {
        self.task.close()
    }

    /// Seconds without a reset before expiring.
    pub fn timeout(&self) -> Result<f64> {
        self.task.get(AttrTarget::Watchdog(""), attrs::TIMEOUT)
    }

    /// Set the expiration timeout in seconds; `-1` expires only by trigger.
    pub fn set_timeout(&self, timeout: f64) -> Result<()> {
        self.task.set(AttrTarget::Watchdog(""), attrs::TIMEOUT, timeout)
    }

    /// Restore the default timeout.
    pub fn reset_timeout(&self) -> Result<()> {
        self.task.reset(AttrTarget::Watchdog(""), attrs::TIMEOUT)
    }

    /// Whether the watchdog has expired.
    pub fn expired(&self) -> Result<bool> {
        self.task.get(AttrTarget::Watchdog(""), attrs::HAS_EXPIRED)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::error::{error_codes, ErrorKind};

    fn sim() -> Arc<SimulatedDriver> {
        Arc::new(SimulatedDriver::default())
    }

    #[test]
    fn test_timeout_accepts_trigger_only() {
        let wd = WatchdogTask::new(sim(), "SimDev1", "wd", 1.0).unwrap();
        assert_eq!(wd.timeout().unwrap(), 1.0);
        wd.set_timeout(EXPIRE_BY_TRIGGER_ONLY).unwrap();
        assert_eq!(wd.timeout().unwrap(), -1.0);
        assert!(!wd.expired().unwrap());
    }

    #[test]
    fn test_unknown_device_rejected() {
        let err = WatchdogTask::new(sim(), "NoSuchDev", "wd", 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Driver);
    }

    #[test]
    fn test_expiry_and_clear() {
        let driver = sim();
        let wd = WatchdogTask::new(driver.clone(), "SimDev1", "wd", 0.05).unwrap();
        let states = wd
            .cfg_watchdog_do_expir_states(&[DoExpirationState::new("SimDev1/port1/line0", DigitalLineState::High)])
            .unwrap();
        assert_eq!(states[0].do_state().unwrap(), DigitalLineState::High);

        wd.start().unwrap();
        wd.reset_timer().unwrap();
        std::thread::sleep(Duration::from_millis(150));
        assert!(wd.expired().unwrap());
        let err = wd.reset_timer().unwrap_err();
        assert_eq!(err.code(), error_codes::WATCHDOG_EXPIRED);
        assert_eq!(err.task_name(), Some("wd"));

        wd.clear_expiration().unwrap();
        assert!(!wd.expired().unwrap());
        wd.stop().unwrap();
        wd.close().unwrap();
        assert_eq!(driver.calls_to("DAQmxClearTask"), 1);
    }

    #[test]
    fn test_expir_states_flatten_channels() {
        let driver = sim();
        let wd = WatchdogTask::new(driver.clone(), "SimDev1", "wd", 1.0).unwrap();
        let states = wd
            .cfg_watchdog_co_expir_states(&[
                CoExpirationState::new("SimDev1/ctr0", WatchdogCOExpirState::Low),
                CoExpirationState::new("SimDev1/ctr1", WatchdogCOExpirState::High),
            ])
            .unwrap();
        assert_eq!(states.len(), 2);
        assert_eq!(states[1].co_state().unwrap(), WatchdogCOExpirState::High);
        assert_eq!(driver.calls_to("DAQmxCfgWatchdogCOExpirStates"), 1);
    }
}
