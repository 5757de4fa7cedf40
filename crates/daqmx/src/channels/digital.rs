use super::{collection_common, create, Channel};
use crate::constants::ChannelType;
use crate::driver::{ChannelSpec, DigitalChan};
use crate::error::Result;
use crate::task::Task;

/// Digital input channels of a task.
///
/// A bare line string groups every line into one channel. Channels of one
/// line transfer as `bool`; channels of several lines as packed `u32` with
/// line N in bit N.
#[derive(Debug, Clone, Copy)]
pub struct DiChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(DiChannelCollection, ChannelType::DigitalInput);

impl<'a> DiChannelCollection<'a> {
    /// Add input lines.
    pub fn add_di_chan(&self, params: impl Into<DigitalChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::Di(params.into()))
    }
}

/// Digital output channels of a task.
#[derive(Debug, Clone, Copy)]
pub struct DoChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(DoChannelCollection, ChannelType::DigitalOutput);

impl<'a> DoChannelCollection<'a> {
    /// Add output lines.
    pub fn add_do_chan(&self, params: impl Into<DigitalChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::Do(params.into()))
    }
}
