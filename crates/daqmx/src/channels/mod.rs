//! Channel collections and views.
//!
//! A collection adds virtual channels of one family to a task and lists the
//! ones already there. Every builder returns a [`Channel`] view over the
//! channels it created.
//!
//! The name of a new channel comes from the driver's "last created channel"
//! query. Drivers that lack it get a name reconstructed from the physical
//! string and line grouping; that reconstruction mirrors the driver's own
//! naming for common cases and can differ for exotic ones.

mod analog;
mod channel;
mod counter;
mod digital;

pub use analog::{AiChannelCollection, AoChannelCollection};
pub use channel::Channel;
pub use counter::{CiChannelCollection, CoChannelCollection};
pub use digital::{DiChannelCollection, DoChannelCollection};

use tracing::debug;

use crate::attributes::{channel as attrs, AttrTarget};
use crate::constants::{ChannelType, LineGrouping, UsageTypeAI, UsageTypeCI, UsageTypeCO};
use crate::driver::{
    AiCurrentChan, AiPowerChan, AiThrmcplChan, AiVoltageChan, AoCurrentChan, AoVoltageChan, ChannelSpec,
    CiCountEdgesChan, CiFreqChan, CiPeriodChan, CiPulseChanFreq, CiPulseChanTicks, CiPulseChanTime,
    CiPulseWidthChan, CiSemiPeriodChan, CiTwoEdgeSepChan, CoPulseChanFreq, CoPulseChanTicks, CoPulseChanTime,
    DigitalChan,
};
use crate::error::Result;
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::task::Task;
use crate::types::{ChannelKind, ResolvedChannel};

/// Parameter structs built from just the physical string.
macro_rules! from_physical {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl From<&str> for $ty {
                fn from(physical: &str) -> Self {
                    Self {
                        $field: physical.to_string(),
                        ..Self::default()
                    }
                }
            }
        )*
    };
}

from_physical! {
    AiVoltageChan => physical_channel,
    AiCurrentChan => physical_channel,
    AiThrmcplChan => physical_channel,
    AiPowerChan => physical_channel,
    AoVoltageChan => physical_channel,
    AoCurrentChan => physical_channel,
    DigitalChan => lines,
    CiCountEdgesChan => counter,
    CiFreqChan => counter,
    CiPeriodChan => counter,
    CiPulseWidthChan => counter,
    CiSemiPeriodChan => counter,
    CiTwoEdgeSepChan => counter,
    CiPulseChanFreq => counter,
    CiPulseChanTime => counter,
    CiPulseChanTicks => counter,
    CoPulseChanFreq => counter,
    CoPulseChanTime => counter,
    CoPulseChanTicks => counter,
}

/// Input families are read; the rest are written.
pub(crate) fn is_input(chan_type: ChannelType) -> bool {
    matches!(
        chan_type,
        ChannelType::AnalogInput | ChannelType::DigitalInput | ChannelType::CounterInput
    )
}

/// Create the channels described by `spec` and cache their kinds.
pub(crate) fn create<'a>(task: &'a Task, spec: ChannelSpec) -> Result<Channel<'a>> {
    task.with_handle(|driver, handle| driver.create_channel(handle, &spec))?;

    let name = match task.driver().last_created_channel() {
        Ok(name) if !name.is_empty() => name,
        _ => fallback_channel_name(&spec),
    };
    let chan_type = spec.chan_type();
    let resolved: Vec<ResolvedChannel> = if spec.line_grouping() == Some(LineGrouping::ChanForAllLines) {
        vec![ResolvedChannel {
            kind: grouped_digital_kind(task, &name, &spec),
            name: name.clone(),
            chan_type,
        }]
    } else {
        let kind = spec_kind(&spec);
        unflatten_channel_string(&name)
            .into_iter()
            .map(|name| ResolvedChannel { name, chan_type, kind })
            .collect()
    };

    debug!(
        task = %task.name(),
        function = spec.function_name(),
        physical = spec.physical(),
        channel = %name,
        count = resolved.len(),
        "Channel created"
    );
    task.push_channels(resolved);
    Ok(Channel::new(task, name))
}

/// Name the driver would give the channels of `spec`.
pub(crate) fn fallback_channel_name(spec: &ChannelSpec) -> String {
    let physical = spec.physical();
    let assigned = spec.assigned_name().trim();
    let tokens = unflatten_channel_string(physical);

    if spec.line_grouping() == Some(LineGrouping::ChanForAllLines) {
        return if !assigned.is_empty() {
            assigned.to_string()
        } else if tokens.len() > 1 {
            format!("{}...", tokens[0])
        } else {
            physical.trim().to_string()
        };
    }

    if assigned.is_empty() {
        flatten_channel_string(&tokens)
    } else if tokens.len() > 1 {
        format!("{assigned}0:{}", tokens.len() - 1)
    } else {
        assigned.to_string()
    }
}

/// Kind of a channel that is not a grouped digital channel.
fn spec_kind(spec: &ChannelSpec) -> ChannelKind {
    match spec {
        ChannelSpec::AiPower(_) => ChannelKind::AnalogPower,
        ChannelSpec::AiVoltage(_)
        | ChannelSpec::AiCurrent(_)
        | ChannelSpec::AiThermocouple(_)
        | ChannelSpec::AoVoltage(_)
        | ChannelSpec::AoCurrent(_) => ChannelKind::AnalogScaled,
        ChannelSpec::Di(_) | ChannelSpec::Do(_) => ChannelKind::DigitalLines(1),
        ChannelSpec::CiCountEdges(_) => ChannelKind::CounterEdges,
        ChannelSpec::CiPulseFreq(_) | ChannelSpec::CoPulseFreq(_) => ChannelKind::CounterPulseFreq,
        ChannelSpec::CiPulseTime(_) | ChannelSpec::CoPulseTime(_) => ChannelKind::CounterPulseTime,
        ChannelSpec::CiPulseTicks(_) | ChannelSpec::CoPulseTicks(_) => ChannelKind::CounterPulseTicks,
        ChannelSpec::CiFreq(_)
        | ChannelSpec::CiPeriod(_)
        | ChannelSpec::CiPulseWidth(_)
        | ChannelSpec::CiSemiPeriod(_)
        | ChannelSpec::CiTwoEdgeSep(_) => ChannelKind::CounterFloat,
    }
}

/// Line count of a channel grouping several lines, asked of the driver and
/// counted from the physical string when the driver cannot say.
fn grouped_digital_kind(task: &Task, name: &str, spec: &ChannelSpec) -> ChannelKind {
    let attr = if spec.chan_type() == ChannelType::DigitalInput {
        attrs::DI_NUM_LINES
    } else {
        attrs::DO_NUM_LINES
    };
    let lines = task
        .get(AttrTarget::Channel(name), attr)
        .unwrap_or_else(|_| unflatten_channel_string(spec.physical()).len() as u32);
    digital_kind(lines)
}

fn digital_kind(lines: u32) -> ChannelKind {
    if lines > 1 {
        ChannelKind::DigitalPorts(lines)
    } else {
        ChannelKind::DigitalLines(1)
    }
}

/// Resolve type and kind of a channel already in the task.
pub(crate) fn resolve_channel(task: &Task, name: &str) -> Result<ResolvedChannel> {
    let target = AttrTarget::Channel(name);
    let chan_type = task.get(target, attrs::CHAN_TYPE)?;
    let kind = match chan_type {
        ChannelType::AnalogInput => match task.get(target, attrs::AI_MEAS_TYPE)? {
            UsageTypeAI::Power => ChannelKind::AnalogPower,
            _ => ChannelKind::AnalogScaled,
        },
        ChannelType::AnalogOutput => ChannelKind::AnalogScaled,
        ChannelType::DigitalInput => digital_kind(task.get(target, attrs::DI_NUM_LINES)?),
        ChannelType::DigitalOutput => digital_kind(task.get(target, attrs::DO_NUM_LINES)?),
        ChannelType::CounterInput => match task.get(target, attrs::CI_MEAS_TYPE)? {
            UsageTypeCI::CountEdges => ChannelKind::CounterEdges,
            UsageTypeCI::PulseFrequency => ChannelKind::CounterPulseFreq,
            UsageTypeCI::PulseTime => ChannelKind::CounterPulseTime,
            UsageTypeCI::PulseTicks => ChannelKind::CounterPulseTicks,
            _ => ChannelKind::CounterFloat,
        },
        ChannelType::CounterOutput => match task.get(target, attrs::CO_OUTPUT_TYPE)? {
            UsageTypeCO::PulseFrequency => ChannelKind::CounterPulseFreq,
            UsageTypeCO::PulseTime => ChannelKind::CounterPulseTime,
            UsageTypeCO::PulseTicks => ChannelKind::CounterPulseTicks,
        },
    };
    Ok(ResolvedChannel {
        name: name.to_string(),
        chan_type,
        kind,
    })
}

/// Names of the cached channels of one family.
pub(crate) fn names_of(task: &Task, chan_type: ChannelType) -> Vec<String> {
    task.resolved_channels()
        .into_iter()
        .filter(|c| c.chan_type == chan_type)
        .map(|c| c.name)
        .collect()
}

/// Shared listing methods of the six collections.
macro_rules! collection_common {
    ($collection:ident, $chan_type:expr) => {
        impl<'a> $collection<'a> {
            pub(crate) fn new(task: &'a Task) -> Self {
                Self { task }
            }

            /// Names of the channels of this family, in task order.
            pub fn channel_names(&self) -> Vec<String> {
                $crate::channels::names_of(self.task, $chan_type)
            }

            /// Number of channels of this family.
            pub fn len(&self) -> usize {
                self.channel_names().len()
            }

            /// True when the task has no channel of this family.
            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// View over the channel at `index`.
            pub fn get(&self, index: usize) -> Option<Channel<'a>> {
                self.channel_names()
                    .into_iter()
                    .nth(index)
                    .map(|name| Channel::new(self.task, name))
            }

            /// View over every channel of this family.
            pub fn all(&self) -> Channel<'a> {
                Channel::new(
                    self.task,
                    $crate::names::flatten_channel_string(&self.channel_names()),
                )
            }
        }
    };
}

pub(crate) use collection_common;

#[cfg(test)]
mod tests {
    use super::*;

    fn di(lines: &str, name: &str, grouping: LineGrouping) -> ChannelSpec {
        ChannelSpec::Di(DigitalChan {
            lines: lines.into(),
            name_to_assign_to_lines: name.into(),
            line_grouping: grouping,
        })
    }

    #[test]
    fn test_fallback_single_line() {
        assert_eq!(fallback_channel_name(&di("Dev1/port0/line3", "", LineGrouping::ChanPerLine)), "Dev1/port0/line3");
        assert_eq!(fallback_channel_name(&di("Dev1/port0/line3", "en", LineGrouping::ChanPerLine)), "en");
        assert_eq!(
            fallback_channel_name(&di("Dev1/port0/line3", "", LineGrouping::ChanForAllLines)),
            "Dev1/port0/line3"
        );
    }

    #[test]
    fn test_fallback_grouped_lines() {
        assert_eq!(
            fallback_channel_name(&di("Dev1/port0/line0:7", "", LineGrouping::ChanForAllLines)),
            "Dev1/port0/line0..."
        );
        assert_eq!(
            fallback_channel_name(&di("Dev1/port0/line0:7", "port", LineGrouping::ChanForAllLines)),
            "port"
        );
    }

    #[test]
    fn test_fallback_per_line() {
        assert_eq!(
            fallback_channel_name(&di("Dev1/port0/line0:2", "bit", LineGrouping::ChanPerLine)),
            "bit0:2"
        );
        assert_eq!(
            fallback_channel_name(&di("Dev1/port0/line0:1", "", LineGrouping::ChanPerLine)),
            "Dev1/port0/line0, Dev1/port0/line1"
        );
        let ai = ChannelSpec::AiVoltage(AiVoltageChan::from("Dev1/ai0:3"));
        assert_eq!(fallback_channel_name(&ai), "Dev1/ai0, Dev1/ai1, Dev1/ai2, Dev1/ai3");
    }

    #[test]
    fn test_spec_kinds() {
        assert_eq!(spec_kind(&ChannelSpec::AiPower("Dev1/power".into())), ChannelKind::AnalogPower);
        assert_eq!(spec_kind(&ChannelSpec::CiCountEdges("Dev1/ctr0".into())), ChannelKind::CounterEdges);
        assert_eq!(spec_kind(&ChannelSpec::CiPeriod("Dev1/ctr0".into())), ChannelKind::CounterFloat);
        assert_eq!(spec_kind(&ChannelSpec::CoPulseTime("Dev1/ctr0".into())), ChannelKind::CounterPulseTime);
        assert_eq!(digital_kind(8), ChannelKind::DigitalPorts(8));
        assert_eq!(digital_kind(1), ChannelKind::DigitalLines(1));
    }

    #[test]
    fn test_input_families() {
        assert!(is_input(ChannelType::CounterInput));
        assert!(!is_input(ChannelType::DigitalOutput));
    }
}
