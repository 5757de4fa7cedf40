use super::{collection_common, create, Channel};
use crate::constants::ChannelType;
use crate::driver::{AiCurrentChan, AiPowerChan, AiThrmcplChan, AiVoltageChan, AoCurrentChan, AoVoltageChan, ChannelSpec};
use crate::error::Result;
use crate::task::Task;

/// Analog input channels of a task.
#[derive(Debug, Clone, Copy)]
pub struct AiChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(AiChannelCollection, ChannelType::AnalogInput);

impl<'a> AiChannelCollection<'a> {
    /// Add voltage measurement channels.
    ///
    /// A bare physical string uses the default range of ±5 V referenced
    /// to the device default terminal configuration.
    pub fn add_ai_voltage_chan(&self, params: impl Into<AiVoltageChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AiVoltage(params.into()))
    }

    /// Add current measurement channels.
    pub fn add_ai_current_chan(&self, params: impl Into<AiCurrentChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AiCurrent(params.into()))
    }

    /// Add thermocouple channels.
    pub fn add_ai_thrmcpl_chan(&self, params: impl Into<AiThrmcplChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AiThermocouple(params.into()))
    }

    /// Add power channels; reads return paired voltage and current.
    pub fn add_ai_power_chan(&self, params: impl Into<AiPowerChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AiPower(params.into()))
    }
}

/// Analog output channels of a task.
#[derive(Debug, Clone, Copy)]
pub struct AoChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(AoChannelCollection, ChannelType::AnalogOutput);

impl<'a> AoChannelCollection<'a> {
    /// Add voltage generation channels.
    pub fn add_ao_voltage_chan(&self, params: impl Into<AoVoltageChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AoVoltage(params.into()))
    }

    /// Add current generation channels.
    pub fn add_ao_current_chan(&self, params: impl Into<AoCurrentChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::AoCurrent(params.into()))
    }
}
