use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;

use crate::attributes::{channel as attrs, AttrGroup, AttrTarget, Attribute, AttributeKind, AttributeValue};
use crate::constants::ChannelType;
use crate::error::{error_codes, DaqError, Result};
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::task::Task;

/// View over one or more virtual channels of a task.
///
/// Attribute reads go to every channel the view names and fail when they
/// disagree; writes apply to all of them.
///
/// Views on the same task concatenate with `+`:
///
/// ```no_run
/// # fn example(task: &daqmx::Task) -> daqmx::Result<()> {
/// let a = task.ai_channels().add_ai_voltage_chan("SimDev1/ai0")?;
/// let b = task.ai_channels().add_ai_voltage_chan("SimDev1/ai1")?;
/// let both = (&a + &b)?;
/// both.set(daqmx::attributes::channel::AI_MAX, 5.0)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Channel<'a> {
    task: &'a Task,
    name: String,
}

impl<'a> Channel<'a> {
    pub(crate) fn new(task: &'a Task, name: String) -> Self {
        Self { task, name }
    }

    /// Flattened virtual channel names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task the channels belong to.
    pub fn task(&self) -> &'a Task {
        self.task
    }

    /// Individual virtual channel names.
    pub fn channel_names(&self) -> Vec<String> {
        unflatten_channel_string(&self.name)
    }

    fn target(&self) -> AttrTarget<'_> {
        AttrTarget::Channel(&self.name)
    }

    /// Read a typed channel attribute.
    pub fn get<T: AttributeKind>(&self, attr: Attribute<T>) -> Result<T> {
        self.task.get(self.target(), attr)
    }

    /// Write a typed channel attribute on every channel of the view.
    pub fn set<T: AttributeKind>(&self, attr: Attribute<T>, value: T) -> Result<()> {
        self.task.set(self.target(), attr, value)
    }

    /// Reset a channel attribute on every channel of the view.
    pub fn reset<T: AttributeKind>(&self, attr: Attribute<T>) -> Result<()> {
        self.task.reset(self.target(), attr)
    }

    /// Read a channel attribute by property name.
    pub fn get_property(&self, name: &str) -> Result<AttributeValue> {
        self.task.get_property(self.target(), name)
    }

    /// Write a channel attribute by property name.
    pub fn set_property(&self, name: &str, value: AttributeValue) -> Result<()> {
        self.task.set_property(self.target(), name, value)
    }

    /// Reset a channel attribute by property name.
    pub fn reset_property(&self, name: &str) -> Result<()> {
        self.task.reset_property(self.target(), name)
    }

    /// Names accepted by the `*_property` methods.
    pub fn property_names() -> impl Iterator<Item = &'static str> {
        crate::attributes::property_names(AttrGroup::Channel)
    }

    /// Measurement or generation type of the channel.
    pub fn chan_type(&self) -> Result<ChannelType> {
        self.get(attrs::CHAN_TYPE)
    }

    /// Physical channel the virtual channel maps to.
    pub fn physical_channel(&self) -> Result<String> {
        self.get(attrs::PHYSICAL_CHANNEL)
    }

    /// User description of the channel.
    pub fn description(&self) -> Result<String> {
        self.get(attrs::DESCRIPTION)
    }

    /// Set the user description.
    pub fn set_description(&self, description: &str) -> Result<()> {
        self.set(attrs::DESCRIPTION, description.to_string())
    }

    /// View over the channels of both views, in order.
    ///
    /// Fails when the views belong to different tasks.
    pub fn concat(&self, other: &Channel<'a>) -> Result<Channel<'a>> {
        if !same_task(self.task, other.task) {
            return Err(DaqError::invalid_argument(
                error_codes::UNKNOWN,
                format!(
                    "Cannot concatenate channels on different tasks: '{}' belongs to task '{}', '{}' to task '{}'.",
                    self.name,
                    self.task.name(),
                    other.name,
                    other.task.name()
                ),
            ));
        }
        let mut names = self.channel_names();
        names.extend(other.channel_names());
        Ok(Channel::new(self.task, flatten_channel_string(&names)))
    }
}

fn same_task(a: &Task, b: &Task) -> bool {
    std::ptr::eq(a, b) || a == b
}

impl<'a> Add<&Channel<'a>> for &Channel<'a> {
    type Output = Result<Channel<'a>>;

    fn add(self, rhs: &Channel<'a>) -> Self::Output {
        self.concat(rhs)
    }
}

impl PartialEq for Channel<'_> {
    fn eq(&self, other: &Self) -> bool {
        same_task(self.task, other.task) && self.name == other.name
    }
}

impl Eq for Channel<'_> {}

impl Hash for Channel<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.task.handle().ok().hash(state);
        self.name.hash(state);
    }
}

impl fmt::Debug for Channel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("task", &self.task.name())
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for Channel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
