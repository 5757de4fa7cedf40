//! Mutable state behind the simulated driver.
//!
//! Everything here is accessed under the single state mutex of
//! [`SimulatedDriver`](super::SimulatedDriver). Attribute values are either
//! overrides stored per (group, id) or derived from the configured channels.

use std::collections::{HashMap, HashSet};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::devices::Resource;
use super::worker::EventSlots;
use crate::attributes::{
    buffer, channel, export, read, task as task_attr, timing, trigger, watchdog, write, AttrGroup, AttrTarget,
    Attribute, AttributeDef, AttributeKind, AttributeValue,
};
use crate::constants::*;
use crate::driver::{ChannelSpec, TaskHandle};
use crate::error::{error_codes, DaqError, Result};
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::timestamp::Timestamp;
use crate::types::{CtrFreq, CtrTick, CtrTime, PowerMeasurement};

/// Timebase of tick-based counter pulses.
pub(super) const TICKS_PER_SECOND: f64 = 20_000_000.0;

const MAX_SAMPLE_RATE: f64 = 2_000_000.0;
const MIN_CONTINUOUS_BUFFER: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum TaskState {
    Unverified,
    Verified,
    Reserved,
    Committed,
    Running,
    Done,
}

/// Hardware-timed acquisition or generation in progress.
#[derive(Debug, Clone, Copy)]
pub(super) struct RunClock {
    pub started_at: Instant,
    pub rate: f64,
    pub total: Option<u64>,
}

impl RunClock {
    /// Samples per channel clocked by `now`.
    pub fn produced(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started_at).as_secs_f64();
        let n = (elapsed * self.rate).floor() as u64;
        self.total.map_or(n, |total| n.min(total))
    }

    /// Time at which sample `n` is clocked.
    pub fn instant_of(&self, n: u64) -> Instant {
        self.started_at + Duration::from_secs_f64(n as f64 / self.rate)
    }
}

#[derive(Debug, Clone)]
pub(super) struct SimChannel {
    pub name: String,
    pub spec: ChannelSpec,
    pub device: String,
    pub physical: String,
    pub resources: Vec<Resource>,
    pub overrides: HashMap<i32, AttributeValue>,
}

impl SimChannel {
    pub fn chan_type(&self) -> ChannelType {
        self.spec.chan_type()
    }

    pub fn is_input(&self) -> bool {
        matches!(
            self.chan_type(),
            ChannelType::AnalogInput | ChannelType::DigitalInput | ChannelType::CounterInput
        )
    }

    fn setting<T: AttributeKind>(&self, attr: Attribute<T>, default: T) -> T {
        self.overrides
            .get(&attr.id)
            .cloned()
            .and_then(|v| T::from_value(v).ok())
            .unwrap_or(default)
    }

    /// Override or configured value; `None` when the attribute does not apply.
    pub fn value(&self, id: i32) -> Option<AttributeValue> {
        if let Some(v) = self.overrides.get(&id) {
            return Some(v.clone());
        }
        self.configured_value(id)
    }

    fn configured_value(&self, attr_id: i32) -> Option<AttributeValue> {
        use channel::id;
        use AttributeValue::{Bool, String as Str, F64, U32};
        use ChannelSpec as S;

        let value = match (&self.spec, attr_id) {
            (_, id::CHAN_TYPE) => self.chan_type().into_value(),
            (_, id::PHYSICAL_CHANNEL) => Str(self.physical.clone()),
            (_, id::DESCRIPTION) => Str(String::new()),

            (S::AiVoltage(_), id::AI_MEAS_TYPE) => UsageTypeAI::Voltage.into_value(),
            (S::AiCurrent(_), id::AI_MEAS_TYPE) => UsageTypeAI::Current.into_value(),
            (S::AiThermocouple(_), id::AI_MEAS_TYPE) => UsageTypeAI::TemperatureThermocouple.into_value(),
            (S::AiPower(_), id::AI_MEAS_TYPE) => UsageTypeAI::Power.into_value(),
            (S::AiVoltage(c), id::AI_MAX) => F64(c.max_val),
            (S::AiCurrent(c), id::AI_MAX) => F64(c.max_val),
            (S::AiThermocouple(c), id::AI_MAX) => F64(c.max_val),
            (S::AiVoltage(c), id::AI_MIN) => F64(c.min_val),
            (S::AiCurrent(c), id::AI_MIN) => F64(c.min_val),
            (S::AiThermocouple(c), id::AI_MIN) => F64(c.min_val),
            (S::AiVoltage(c), id::AI_TERM_CFG) => resolve_terminal(c.terminal_config).into_value(),
            (S::AiCurrent(c), id::AI_TERM_CFG) => resolve_terminal(c.terminal_config).into_value(),
            (S::AiPower(c), id::PWR_VOLTAGE_SETPOINT) => F64(c.voltage_setpoint),
            (S::AiPower(c), id::PWR_CURRENT_SETPOINT) => F64(c.current_setpoint),
            (S::AiPower(c), id::PWR_OUTPUT_ENABLE) => Bool(c.output_enable),

            (S::AoVoltage(_), id::AO_OUTPUT_TYPE) => UsageTypeAO::Voltage.into_value(),
            (S::AoCurrent(_), id::AO_OUTPUT_TYPE) => UsageTypeAO::Current.into_value(),
            (S::AoVoltage(c), id::AO_MAX) => F64(c.max_val),
            (S::AoCurrent(c), id::AO_MAX) => F64(c.max_val),
            (S::AoVoltage(c), id::AO_MIN) => F64(c.min_val),
            (S::AoCurrent(c), id::AO_MIN) => F64(c.min_val),

            (S::Di(_), id::DI_NUM_LINES) => U32(self.resources.len() as u32),
            (S::Di(_), id::DI_INVERT_LINES) => Bool(false),
            (S::Do(_), id::DO_NUM_LINES) => U32(self.resources.len() as u32),
            (S::Do(_), id::DO_INVERT_LINES) => Bool(false),

            (spec, id::CI_MEAS_TYPE) => ci_meas_type(spec)?.into_value(),
            (S::CiCountEdges(c), id::CI_COUNT_EDGES_INITIAL_CNT) => U32(c.initial_count),

            (spec, id::CO_OUTPUT_TYPE) => co_output_type(spec)?.into_value(),
            (S::CoPulseFreq(c), id::CO_PULSE_FREQ) => F64(c.freq),
            (S::CoPulseFreq(c), id::CO_PULSE_DUTY_CYC) => F64(c.duty_cycle),
            (S::CoPulseTime(c), id::CO_PULSE_HIGH_TIME) => F64(c.high_time),
            (S::CoPulseTime(c), id::CO_PULSE_LOW_TIME) => F64(c.low_time),
            (S::CoPulseTicks(c), id::CO_PULSE_HIGH_TICKS) => U32(c.high_ticks.max(0) as u32),
            (S::CoPulseTicks(c), id::CO_PULSE_LOW_TICKS) => U32(c.low_ticks.max(0) as u32),
            (S::CoPulseFreq(c), id::CO_PULSE_IDLE_STATE) => c.idle_state.into_value(),
            (S::CoPulseTime(c), id::CO_PULSE_IDLE_STATE) => c.idle_state.into_value(),
            (S::CoPulseTicks(c), id::CO_PULSE_IDLE_STATE) => c.idle_state.into_value(),
            _ => return None,
        };
        Some(value)
    }

    /// Pulse a counter output is generating, as high and low time.
    pub fn output_pulse(&self) -> Option<CtrTime> {
        let pulse = match &self.spec {
            ChannelSpec::CoPulseFreq(c) => {
                let freq = self.setting(channel::CO_PULSE_FREQ, c.freq);
                let duty = self.setting(channel::CO_PULSE_DUTY_CYC, c.duty_cycle);
                if freq <= 0.0 {
                    return None;
                }
                CtrTime {
                    high_time: duty / freq,
                    low_time: (1.0 - duty) / freq,
                }
            }
            ChannelSpec::CoPulseTime(c) => CtrTime {
                high_time: self.setting(channel::CO_PULSE_HIGH_TIME, c.high_time),
                low_time: self.setting(channel::CO_PULSE_LOW_TIME, c.low_time),
            },
            ChannelSpec::CoPulseTicks(c) => CtrTime {
                high_time: f64::from(self.setting(channel::CO_PULSE_HIGH_TICKS, c.high_ticks.max(0) as u32))
                    / TICKS_PER_SECOND,
                low_time: f64::from(self.setting(channel::CO_PULSE_LOW_TICKS, c.low_ticks.max(0) as u32))
                    / TICKS_PER_SECOND,
            },
            _ => return None,
        };
        Some(pulse)
    }

    fn counter(&self) -> Option<u32> {
        match self.resources.first() {
            Some(Resource::Ctr(k)) => Some(*k),
            _ => None,
        }
    }
}

fn resolve_terminal(config: TerminalConfiguration) -> TerminalConfiguration {
    match config {
        TerminalConfiguration::Default => TerminalConfiguration::Differential,
        other => other,
    }
}

pub(super) fn ci_meas_type(spec: &ChannelSpec) -> Option<UsageTypeCI> {
    let ty = match spec {
        ChannelSpec::CiCountEdges(_) => UsageTypeCI::CountEdges,
        ChannelSpec::CiFreq(_) => UsageTypeCI::Frequency,
        ChannelSpec::CiPeriod(_) => UsageTypeCI::Period,
        ChannelSpec::CiPulseWidth(_) => UsageTypeCI::PulseWidth,
        ChannelSpec::CiSemiPeriod(_) => UsageTypeCI::SemiPeriod,
        ChannelSpec::CiTwoEdgeSep(_) => UsageTypeCI::TwoEdgeSeparation,
        ChannelSpec::CiPulseFreq(_) => UsageTypeCI::PulseFrequency,
        ChannelSpec::CiPulseTime(_) => UsageTypeCI::PulseTime,
        ChannelSpec::CiPulseTicks(_) => UsageTypeCI::PulseTicks,
        _ => return None,
    };
    Some(ty)
}

pub(super) fn co_output_type(spec: &ChannelSpec) -> Option<UsageTypeCO> {
    match spec {
        ChannelSpec::CoPulseFreq(_) => Some(UsageTypeCO::PulseFrequency),
        ChannelSpec::CoPulseTime(_) => Some(UsageTypeCO::PulseTime),
        ChannelSpec::CoPulseTicks(_) => Some(UsageTypeCO::PulseTicks),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub(super) enum ExpirAction {
    Digital(DigitalLineState),
    Analog {
        value: f64,
        output_type: WatchdogAOExpirState,
    },
    Counter(WatchdogCOExpirState),
}

#[derive(Debug, Clone)]
pub(super) struct ExpirationEntry {
    pub physical: String,
    pub device: String,
    pub resources: Vec<Resource>,
    pub action: ExpirAction,
}

#[derive(Debug, Default)]
pub(super) struct WatchdogState {
    pub device: String,
    pub armed_at: Option<Instant>,
    pub expired: bool,
    pub entries: Vec<ExpirationEntry>,
}

impl WatchdogState {
    fn entries_for(&self, lines: &str) -> Vec<&ExpirationEntry> {
        let wanted: Vec<String> = unflatten_channel_string(lines)
            .into_iter()
            .map(|l| l.trim_start_matches('/').to_ascii_lowercase())
            .collect();
        self.entries
            .iter()
            .filter(|e| wanted.contains(&e.physical))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(super) struct SavedTask {
    pub channels: Vec<SimChannel>,
    pub overrides: HashMap<(AttrGroup, i32), AttributeValue>,
    pub author: String,
    pub options: SaveOptions,
}

pub(super) struct SimTask {
    pub name: String,
    pub channels: Vec<SimChannel>,
    pub state: TaskState,
    pub resting: TaskState,
    pub overrides: HashMap<(AttrGroup, i32), AttributeValue>,
    pub started_at: Option<Instant>,
    pub started_wall: Option<DateTime<Utc>>,
    pub clock: Option<RunClock>,
    pub read_pos: u64,
    pub written: u64,
    pub epoch: u64,
    pub worker: Option<JoinHandle<()>>,
    pub events: EventSlots,
    pub watchdog: Option<WatchdogState>,
}

impl SimTask {
    pub fn new(name: String) -> Self {
        Self {
            name,
            channels: Vec::new(),
            state: TaskState::Unverified,
            resting: TaskState::Unverified,
            overrides: HashMap::new(),
            started_at: None,
            started_wall: None,
            clock: None,
            read_pos: 0,
            written: 0,
            epoch: 0,
            worker: None,
            events: EventSlots::default(),
            watchdog: None,
        }
    }

    /// Override or static default of a task-level attribute.
    pub fn setting<T: AttributeKind>(&self, attr: Attribute<T>) -> Option<T> {
        self.overrides
            .get(&(attr.group, attr.id))
            .cloned()
            .or_else(|| static_default(attr.group, attr.id))
            .and_then(|v| T::from_value(v).ok())
    }

    pub fn timing_type(&self) -> SampleTimingType {
        self.setting(timing::SAMP_TIMING_TYPE)
            .unwrap_or(SampleTimingType::OnDemand)
    }

    /// True when samples are paced by a sample clock.
    pub fn is_clocked(&self) -> bool {
        matches!(
            self.timing_type(),
            SampleTimingType::SampleClock | SampleTimingType::PipelinedSampleClock | SampleTimingType::BurstHandshake
        )
    }

    pub fn sample_mode(&self) -> AcquisitionType {
        self.setting(timing::SAMP_QUANT_SAMP_MODE)
            .unwrap_or(AcquisitionType::Finite)
    }

    pub fn samps_per_chan(&self) -> u64 {
        self.setting(timing::SAMP_QUANT_SAMP_PER_CHAN).unwrap_or(0)
    }

    pub fn rate(&self) -> f64 {
        self.setting(timing::SAMP_CLK_RATE).unwrap_or(1000.0)
    }

    pub fn input_indices(&self) -> Vec<usize> {
        (0..self.channels.len())
            .filter(|&i| self.channels[i].is_input())
            .collect()
    }

    pub fn output_indices(&self) -> Vec<usize> {
        (0..self.channels.len())
            .filter(|&i| !self.channels[i].is_input())
            .collect()
    }

    /// Channels a read transfers: the configured subset, or every input.
    pub fn read_indices(&self) -> Vec<usize> {
        match self.overrides.get(&(AttrGroup::Read, read::CHANNELS_TO_READ.id)) {
            Some(AttributeValue::String(names)) => self.resolve_names(names).unwrap_or_default(),
            _ => self.input_indices(),
        }
    }

    /// Indices of the named channels, in the order given.
    pub fn resolve_names(&self, names: &str) -> Result<Vec<usize>> {
        let names = unflatten_channel_string(names);
        if names.is_empty() {
            return Ok((0..self.channels.len()).collect());
        }
        names
            .iter()
            .map(|name| {
                self.channels
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(name))
                    .ok_or_else(|| {
                        DaqError::driver(
                            error_codes::CHAN_NOT_IN_TASK,
                            format!("Specified channel is not in the task.\n\nChannel Name: {name}"),
                        )
                        .with_task_name(&self.name)
                    })
            })
            .collect()
    }

    /// Samples per channel clocked so far.
    pub fn produced(&self, now: Instant) -> u64 {
        self.clock.map_or(0, |clock| clock.produced(now))
    }

    /// Samples per channel a read can take without waiting.
    pub fn available(&self, now: Instant) -> u64 {
        if self.is_clocked() {
            self.produced(now).saturating_sub(self.read_pos)
        } else if self.input_indices().is_empty() {
            0
        } else {
            1
        }
    }

    fn buffer_size(&self) -> u64 {
        if !self.is_clocked() {
            return 0;
        }
        match self.sample_mode() {
            AcquisitionType::Continuous => self.samps_per_chan().max(MIN_CONTINUOUS_BUFFER),
            _ => self.samps_per_chan(),
        }
    }

    fn max_lines(&self, indices: &[usize], chan_type: ChannelType) -> u32 {
        indices
            .iter()
            .map(|&i| &self.channels[i])
            .filter(|c| c.chan_type() == chan_type)
            .map(|c| c.resources.len() as u32)
            .max()
            .unwrap_or(0)
    }

    fn raw_width(&self, indices: &[usize]) -> u32 {
        let analog = indices.iter().any(|&i| {
            matches!(
                self.channels[i].chan_type(),
                ChannelType::AnalogInput | ChannelType::AnalogOutput
            )
        });
        if analog {
            2
        } else {
            4
        }
    }
}

/// Default of a task-level attribute that does not depend on channels.
fn static_default(group: AttrGroup, attr_id: i32) -> Option<AttributeValue> {
    use AttributeValue::{Bool, String as Str, Timestamp as Ts, F64, U32, U64};

    let value = match group {
        AttrGroup::Timing => match attr_id {
            timing::id::SAMP_QUANT_SAMP_MODE => AcquisitionType::Finite.into_value(),
            timing::id::SAMP_QUANT_SAMP_PER_CHAN => U64(1000),
            timing::id::SAMP_TIMING_TYPE => SampleTimingType::OnDemand.into_value(),
            timing::id::SAMP_CLK_RATE => F64(1000.0),
            timing::id::SAMP_CLK_SRC => Str(String::new()),
            timing::id::SAMP_CLK_ACTIVE_EDGE => Edge::Rising.into_value(),
            timing::id::SAMP_CLK_MAX_RATE => F64(MAX_SAMPLE_RATE),
            timing::id::CHANGE_DETECT_DI_RISING_EDGE_PHYSICAL_CHANS
            | timing::id::CHANGE_DETECT_DI_FALLING_EDGE_PHYSICAL_CHANS => Str(String::new()),
            _ => return None,
        },
        AttrGroup::Trigger => match attr_id {
            trigger::id::START_TRIG_TYPE | trigger::id::REF_TRIG_TYPE => TriggerType::None.into_value(),
            trigger::id::DIG_EDGE_START_TRIG_SRC
            | trigger::id::ANLG_EDGE_START_TRIG_SRC
            | trigger::id::DIG_EDGE_REF_TRIG_SRC
            | trigger::id::ANLG_EDGE_REF_TRIG_SRC => Str(String::new()),
            trigger::id::DIG_EDGE_START_TRIG_EDGE | trigger::id::DIG_EDGE_REF_TRIG_EDGE => {
                Edge::Rising.into_value()
            }
            trigger::id::ANLG_EDGE_START_TRIG_SLOPE | trigger::id::ANLG_EDGE_REF_TRIG_SLOPE => {
                Slope::Rising.into_value()
            }
            trigger::id::ANLG_EDGE_START_TRIG_LVL | trigger::id::ANLG_EDGE_REF_TRIG_LVL => F64(0.0),
            trigger::id::START_TRIG_RETRIGGERABLE | trigger::id::START_TRIG_TIMESTAMP_ENABLE => Bool(false),
            trigger::id::TIME_START_TRIG_WHEN => Ts(Timestamp::default()),
            trigger::id::REF_TRIG_PRETRIG_SAMPLES => U32(0),
            _ => return None,
        },
        AttrGroup::Read => match attr_id {
            read::id::READ_ALL_AVAIL_SAMP | read::id::LOGGING_PAUSE => Bool(false),
            read::id::LOGGING_FILE_PATH | read::id::LOGGING_TDMS_GROUP_NAME => Str(String::new()),
            read::id::LOGGING_MODE => LoggingMode::Off.into_value(),
            read::id::LOGGING_TDMS_OPERATION => LoggingOperation::OpenOrCreate.into_value(),
            read::id::LOGGING_SAMPS_PER_FILE | read::id::LOGGING_FILE_PREALLOCATION_SIZE => U64(0),
            read::id::LOGGING_FILE_WRITE_SIZE => U32(4096),
            _ => return None,
        },
        AttrGroup::Write => match attr_id {
            write::id::REGEN_MODE => RegenerationMode::AllowRegeneration.into_value(),
            _ => return None,
        },
        AttrGroup::ExportedSignal => match attr_id {
            export::id::SAMP_CLK_OUTPUT_TERM
            | export::id::START_TRIG_OUTPUT_TERM
            | export::id::REF_TRIG_OUTPUT_TERM
            | export::id::CTR_OUT_EVENT_OUTPUT_TERM => Str(String::new()),
            _ => return None,
        },
        AttrGroup::Watchdog => match attr_id {
            watchdog::id::TIMEOUT => F64(-1.0),
            _ => return None,
        },
        _ => return None,
    };
    Some(value)
}

/// Attributes derived from driver state; setting or resetting them fails.
const READ_ONLY: &[(AttrGroup, i32)] = &[
    (AttrGroup::Channel, channel::id::CHAN_TYPE),
    (AttrGroup::Channel, channel::id::PHYSICAL_CHANNEL),
    (AttrGroup::Channel, channel::id::AI_MEAS_TYPE),
    (AttrGroup::Channel, channel::id::AO_OUTPUT_TYPE),
    (AttrGroup::Channel, channel::id::DI_NUM_LINES),
    (AttrGroup::Channel, channel::id::DO_NUM_LINES),
    (AttrGroup::Channel, channel::id::CI_MEAS_TYPE),
    (AttrGroup::Channel, channel::id::CI_COUNT),
    (AttrGroup::Channel, channel::id::CO_OUTPUT_TYPE),
    (AttrGroup::Timing, timing::id::SAMP_CLK_MAX_RATE),
    (AttrGroup::Trigger, trigger::id::START_TRIG_TIMESTAMP_VAL),
    (AttrGroup::Read, read::id::AVAIL_SAMP_PER_CHAN),
    (AttrGroup::Read, read::id::NUM_CHANS),
    (AttrGroup::Read, read::id::DI_NUM_BOOLEANS_PER_CHAN),
    (AttrGroup::Read, read::id::RAW_DATA_WIDTH),
    (AttrGroup::Read, read::id::TOTAL_SAMP_PER_CHAN_ACQUIRED),
    (AttrGroup::Write, write::id::NUM_CHANS),
    (AttrGroup::Write, write::id::DO_NUM_BOOLEANS_PER_CHAN),
    (AttrGroup::Write, write::id::SPACE_AVAIL),
    (AttrGroup::Write, write::id::RAW_DATA_WIDTH),
    (AttrGroup::Write, write::id::TOTAL_SAMP_PER_CHAN_GENERATED),
    (AttrGroup::Watchdog, watchdog::id::HAS_EXPIRED),
];

fn read_only(def: &AttributeDef) -> DaqError {
    DaqError::driver(
        error_codes::ATTRIBUTE_READ_ONLY,
        format!("Specified property is read-only.\n\nProperty: {}", def.name),
    )
}

fn not_applicable(def: &AttributeDef) -> DaqError {
    DaqError::driver(
        error_codes::ATTRIBUTE_NOT_SUPPORTED_IN_TASK_CONTEXT,
        format!(
            "Specified property is not supported by the device or is not applicable to the task.\n\nProperty: {}",
            def.name
        ),
    )
}

fn invalid_value(def: &AttributeDef, detail: &str) -> DaqError {
    DaqError::driver(
        error_codes::INVALID_ATTRIBUTE_VALUE,
        format!("Requested value is not a supported value for this property. {detail}\n\nProperty: {}", def.name),
    )
}

pub(super) fn invalid_task() -> DaqError {
    DaqError::driver(
        error_codes::INVALID_TASK,
        "Task specified is invalid or does not exist.",
    )
}

#[derive(Default)]
pub(super) struct SimState {
    pub tasks: HashMap<TaskHandle, SimTask>,
    pub saved: HashMap<String, SavedTask>,
    pub global_channels: HashMap<String, Vec<SimChannel>>,
    pub last_created: Option<String>,
    pub ao_levels: HashMap<(String, u32), f64>,
    pub lines: HashMap<(String, u32, u32), bool>,
    pub halted_counters: HashSet<(String, u32)>,
    pub next_handle: u64,
    pub unnamed: u64,
}

impl SimState {
    pub fn task(&self, handle: TaskHandle) -> Result<&SimTask> {
        self.tasks.get(&handle).ok_or_else(invalid_task)
    }

    pub fn task_mut(&mut self, handle: TaskHandle) -> Result<&mut SimTask> {
        self.tasks.get_mut(&handle).ok_or_else(invalid_task)
    }

    pub fn name_in_use(&self, name: &str) -> bool {
        self.tasks.values().any(|t| t.name.eq_ignore_ascii_case(name))
    }

    // Loopback sources

    pub fn analog_input(&self, chan: &SimChannel) -> f64 {
        match &chan.spec {
            ChannelSpec::AiThermocouple(c) => c.cjc_val,
            _ => match chan.resources.first() {
                Some(Resource::Ai(k)) => self
                    .ao_levels
                    .get(&(chan.device.clone(), *k))
                    .copied()
                    .unwrap_or(0.0),
                _ => 0.0,
            },
        }
    }

    pub fn power_input(&self, chan: &SimChannel) -> PowerMeasurement {
        let ChannelSpec::AiPower(spec) = &chan.spec else {
            return PowerMeasurement::default();
        };
        if !chan.setting(channel::PWR_OUTPUT_ENABLE, spec.output_enable) {
            return PowerMeasurement::default();
        }
        PowerMeasurement {
            voltage: chan.setting(channel::PWR_VOLTAGE_SETPOINT, spec.voltage_setpoint),
            current: chan.setting(channel::PWR_CURRENT_SETPOINT, spec.current_setpoint),
        }
    }

    pub fn line_inputs(&self, chan: &SimChannel) -> Vec<bool> {
        chan.resources
            .iter()
            .map(|r| match r {
                Resource::Line { port, line } => self
                    .lines
                    .get(&(chan.device.clone(), *port, *line))
                    .copied()
                    .unwrap_or(false),
                _ => false,
            })
            .collect()
    }

    /// Line states packed with bit N holding line N of the port.
    pub fn port_input(&self, chan: &SimChannel) -> u32 {
        chan.resources
            .iter()
            .zip(self.line_inputs(chan))
            .fold(0u32, |acc, (r, on)| match r {
                Resource::Line { line, .. } if on && *line < 32 => acc | (1 << line),
                _ => acc,
            })
    }

    pub fn set_line_outputs(&mut self, chan: &SimChannel, states: &[bool]) {
        for (r, on) in chan.resources.iter().zip(states) {
            if let Resource::Line { port, line } = r {
                self.lines.insert((chan.device.clone(), *port, *line), *on);
            }
        }
    }

    pub fn set_port_output(&mut self, chan: &SimChannel, value: u32) {
        let states: Vec<bool> = chan
            .resources
            .iter()
            .map(|r| match r {
                Resource::Line { line, .. } if *line < 32 => value & (1 << line) != 0,
                _ => false,
            })
            .collect();
        self.set_line_outputs(chan, &states);
    }

    pub fn set_analog_output(&mut self, chan: &SimChannel, value: f64) {
        if let Some(Resource::Ao(k)) = chan.resources.first() {
            self.ao_levels.insert((chan.device.clone(), *k), value);
        }
    }

    /// Pulse seen by a counter input: the output of the counter below it,
    /// while that output's task runs. Also returns the source's start time.
    fn counter_source(&self, chan: &SimChannel) -> Option<(CtrTime, Instant)> {
        let k = chan.counter()?.checked_sub(1)?;
        if self.halted_counters.contains(&(chan.device.clone(), k)) {
            return None;
        }
        self.tasks
            .values()
            .filter(|t| t.state == TaskState::Running)
            .find_map(|t| {
                t.channels
                    .iter()
                    .find(|c| c.device == chan.device && c.counter() == Some(k) && !c.is_input())
                    .and_then(|c| Some((c.output_pulse()?, t.started_at?)))
            })
    }

    pub fn counter_count(&self, chan: &SimChannel, now: Instant) -> u32 {
        let initial = match &chan.spec {
            ChannelSpec::CiCountEdges(c) => c.initial_count,
            _ => 0,
        };
        let Some((pulse, since)) = self.counter_source(chan) else {
            return initial;
        };
        let period = pulse.high_time + pulse.low_time;
        if period <= 0.0 {
            return initial;
        }
        let edges = (now.saturating_duration_since(since).as_secs_f64() / period).floor();
        initial.wrapping_add(edges as u32)
    }

    pub fn counter_pulse(&self, chan: &SimChannel) -> CtrTime {
        self.counter_source(chan).map(|(p, _)| p).unwrap_or_default()
    }

    pub fn counter_f64(&self, chan: &SimChannel, now: Instant) -> f64 {
        let pulse = self.counter_pulse(chan);
        let period = pulse.high_time + pulse.low_time;
        match &chan.spec {
            ChannelSpec::CiFreq(_) if period > 0.0 => 1.0 / period,
            ChannelSpec::CiPeriod(_) => period,
            ChannelSpec::CiPulseWidth(_) | ChannelSpec::CiSemiPeriod(_) | ChannelSpec::CiTwoEdgeSep(_) => {
                pulse.high_time
            }
            ChannelSpec::CiCountEdges(_) => f64::from(self.counter_count(chan, now)),
            _ => 0.0,
        }
    }

    pub fn counter_freq(&self, chan: &SimChannel) -> CtrFreq {
        let pulse = self.counter_pulse(chan);
        let period = pulse.high_time + pulse.low_time;
        if period <= 0.0 {
            return CtrFreq::default();
        }
        CtrFreq {
            freq: 1.0 / period,
            duty_cycle: pulse.high_time / period,
        }
    }

    pub fn counter_ticks(&self, chan: &SimChannel) -> CtrTick {
        let pulse = self.counter_pulse(chan);
        CtrTick {
            high_tick: (pulse.high_time * TICKS_PER_SECOND).round() as u32,
            low_tick: (pulse.low_time * TICKS_PER_SECOND).round() as u32,
        }
    }

    // Watchdog

    /// Expire every armed watchdog whose timeout has elapsed.
    pub fn poll_watchdogs(&mut self, now: Instant) {
        let mut fired = Vec::new();
        for task in self.tasks.values_mut() {
            let timeout = task.setting(watchdog::TIMEOUT).unwrap_or(-1.0);
            let Some(wd) = task.watchdog.as_mut() else {
                continue;
            };
            let Some(armed) = wd.armed_at else {
                continue;
            };
            if wd.expired || timeout <= 0.0 {
                continue;
            }
            if now.saturating_duration_since(armed).as_secs_f64() >= timeout {
                wd.expired = true;
                tracing::warn!(task = %task.name, "Simulated watchdog expired");
                fired.extend(wd.entries.iter().cloned());
            }
        }
        for entry in fired {
            self.apply_expiration(&entry);
        }
    }

    fn apply_expiration(&mut self, entry: &ExpirationEntry) {
        for r in &entry.resources {
            match (&entry.action, r) {
                (ExpirAction::Digital(state), Resource::Line { port, line }) => {
                    let key = (entry.device.clone(), *port, *line);
                    match state {
                        DigitalLineState::High => {
                            self.lines.insert(key, true);
                        }
                        DigitalLineState::Low => {
                            self.lines.insert(key, false);
                        }
                        DigitalLineState::Tristate => {
                            self.lines.remove(&key);
                        }
                        DigitalLineState::NoChange => {}
                    }
                }
                (ExpirAction::Analog { value, output_type }, Resource::Ao(k)) => {
                    if *output_type != WatchdogAOExpirState::NoChange {
                        self.ao_levels.insert((entry.device.clone(), *k), *value);
                    }
                }
                (ExpirAction::Counter(state), Resource::Ctr(k)) => {
                    if *state != WatchdogCOExpirState::NoChange {
                        self.halted_counters.insert((entry.device.clone(), *k));
                    }
                }
                _ => {}
            }
        }
    }

    pub fn release_halted(&mut self, entries: &[ExpirationEntry]) {
        for entry in entries {
            for r in &entry.resources {
                if let Resource::Ctr(k) = r {
                    self.halted_counters.remove(&(entry.device.clone(), *k));
                }
            }
        }
    }

    // Attributes

    pub fn get_attribute(
        &self,
        handle: TaskHandle,
        target: AttrTarget<'_>,
        def: &AttributeDef,
        now: Instant,
    ) -> Result<AttributeValue> {
        let task = self.task(handle)?;
        match target {
            AttrTarget::Task => Ok(self.task_attribute(task, def)),
            AttrTarget::Channel(names) => {
                let indices = task.resolve_names(names)?;
                let mut result: Option<AttributeValue> = None;
                for i in indices {
                    let chan = &task.channels[i];
                    let value = if def.id == channel::id::CI_COUNT && chan.chan_type() == ChannelType::CounterInput {
                        AttributeValue::U32(self.counter_count(chan, now))
                    } else {
                        chan.value(def.id).ok_or_else(|| not_applicable(def))?
                    };
                    match &result {
                        Some(prev) if *prev != value => {
                            return Err(DaqError::driver(
                                error_codes::ATTRIBUTE_INCONSISTENT_ACROSS_CHANNELS,
                                format!(
                                    "Requested property value is different for the channels in the list.\n\nProperty: {}",
                                    def.name
                                ),
                            ));
                        }
                        _ => result = Some(value),
                    }
                }
                result.ok_or_else(|| not_applicable(def))
            }
            AttrTarget::Watchdog(lines) if !lines.is_empty() => self.watchdog_line_attribute(task, lines, def),
            _ => {
                if let Some(v) = self.derived(task, def, now)? {
                    return Ok(v);
                }
                task.overrides
                    .get(&(def.group, def.id))
                    .cloned()
                    .or_else(|| static_default(def.group, def.id))
                    .ok_or_else(|| not_applicable(def))
            }
        }
    }

    fn task_attribute(&self, task: &SimTask, def: &AttributeDef) -> AttributeValue {
        let names: Vec<String> = task.channels.iter().map(|c| c.name.clone()).collect();
        let mut devices: Vec<String> = Vec::new();
        for c in &task.channels {
            if !devices.contains(&c.device) {
                devices.push(c.device.clone());
            }
        }
        match def.id {
            task_attr::id::NAME => AttributeValue::String(task.name.clone()),
            task_attr::id::CHANNEL_NAMES => AttributeValue::StringList(names),
            task_attr::id::NUMBER_OF_CHANNELS => AttributeValue::U32(names.len() as u32),
            task_attr::id::DEVICES => AttributeValue::StringList(devices),
            task_attr::id::NUMBER_OF_DEVICES => AttributeValue::U32(devices.len() as u32),
            task_attr::id::TASK_COMPLETE => AttributeValue::Bool(task.state != TaskState::Running),
            _ => AttributeValue::zero(def.ty),
        }
    }

    /// Values computed from channels and progress, `None` for stored ones.
    fn derived(&self, task: &SimTask, def: &AttributeDef, now: Instant) -> Result<Option<AttributeValue>> {
        use AttributeValue::{Bool, String as Str, U32, U64};

        let read_set = task.read_indices();
        let outputs = task.output_indices();
        let value = match (def.group, def.id) {
            (AttrGroup::Read, read::id::CHANNELS_TO_READ) => {
                let names: Vec<&str> = read_set.iter().map(|&i| task.channels[i].name.as_str()).collect();
                Str(flatten_channel_string(&names))
            }
            (AttrGroup::Read, read::id::AVAIL_SAMP_PER_CHAN) => U32(task.available(now).min(u64::from(u32::MAX)) as u32),
            (AttrGroup::Read, read::id::NUM_CHANS) => U32(read_set.len() as u32),
            (AttrGroup::Read, read::id::DI_NUM_BOOLEANS_PER_CHAN) => {
                U32(task.max_lines(&read_set, ChannelType::DigitalInput).max(1))
            }
            (AttrGroup::Read, read::id::RAW_DATA_WIDTH) => U32(task.raw_width(&read_set)),
            (AttrGroup::Read, read::id::CURR_READ_POS) => U64(task.read_pos),
            (AttrGroup::Read, read::id::TOTAL_SAMP_PER_CHAN_ACQUIRED) => {
                if task.is_clocked() {
                    U64(task.produced(now))
                } else {
                    U64(task.read_pos)
                }
            }
            (AttrGroup::Write, write::id::NUM_CHANS) => U32(outputs.len() as u32),
            (AttrGroup::Write, write::id::DO_NUM_BOOLEANS_PER_CHAN) => {
                U32(task.max_lines(&outputs, ChannelType::DigitalOutput).max(1))
            }
            (AttrGroup::Write, write::id::RAW_DATA_WIDTH) => U32(task.raw_width(&outputs)),
            (AttrGroup::Write, write::id::SPACE_AVAIL) => {
                let pending = task.written.saturating_sub(task.produced(now));
                U32(task.buffer_size().saturating_sub(pending).min(u64::from(u32::MAX)) as u32)
            }
            (AttrGroup::Write, write::id::TOTAL_SAMP_PER_CHAN_GENERATED) => {
                if task.is_clocked() {
                    U64(task.produced(now).min(task.written))
                } else {
                    U64(task.written)
                }
            }
            (AttrGroup::Buffer, buffer::id::INPUT_BUF_SIZE | buffer::id::OUTPUT_BUF_SIZE) => {
                match task.overrides.get(&(def.group, def.id)) {
                    Some(v) => v.clone(),
                    None => U32(task.buffer_size().min(u64::from(u32::MAX)) as u32),
                }
            }
            (AttrGroup::Trigger, trigger::id::START_TRIG_TIMESTAMP_VAL) => {
                if !task.setting(trigger::START_TRIG_TIMESTAMP_ENABLE).unwrap_or(false) {
                    return Err(timestamps_disabled());
                }
                let wall = task.started_wall.ok_or_else(|| {
                    DaqError::driver(
                        error_codes::INVALID_TASK_STATE,
                        "The start trigger has not occurred yet.",
                    )
                })?;
                AttributeValue::Timestamp(Timestamp::from(wall))
            }
            (AttrGroup::Watchdog, watchdog::id::HAS_EXPIRED) => {
                Bool(task.watchdog.as_ref().is_some_and(|wd| wd.expired))
            }
            (AttrGroup::Watchdog, _) if task.watchdog.is_none() => return Err(not_applicable(def)),
            _ => return Ok(None),
        };
        Ok(Some(value))
    }

    fn watchdog_line_attribute(&self, task: &SimTask, lines: &str, def: &AttributeDef) -> Result<AttributeValue> {
        let wd = task.watchdog.as_ref().ok_or_else(|| not_applicable(def))?;
        let mut result: Option<AttributeValue> = None;
        for entry in wd.entries_for(lines) {
            let value = match (&entry.action, def.id) {
                (ExpirAction::Digital(s), watchdog::id::DO_EXPIR_STATE) => s.into_value(),
                (ExpirAction::Analog { value, .. }, watchdog::id::AO_EXPIR_STATE) => AttributeValue::F64(*value),
                (ExpirAction::Analog { output_type, .. }, watchdog::id::AO_OUTPUT_TYPE) => output_type.into_value(),
                (ExpirAction::Counter(s), watchdog::id::CO_EXPIR_STATE) => s.into_value(),
                _ => return Err(not_applicable(def)),
            };
            match &result {
                Some(prev) if *prev != value => {
                    return Err(DaqError::driver(
                        error_codes::ATTRIBUTE_INCONSISTENT_ACROSS_CHANNELS,
                        format!("Expiration states differ across the listed lines.\n\nProperty: {}", def.name),
                    ))
                }
                _ => result = Some(value),
            }
        }
        result.ok_or_else(|| not_applicable(def))
    }

    pub fn set_attribute(
        &mut self,
        handle: TaskHandle,
        target: AttrTarget<'_>,
        def: &AttributeDef,
        value: &AttributeValue,
    ) -> Result<()> {
        if target == AttrTarget::Task || READ_ONLY.contains(&(def.group, def.id)) {
            return Err(read_only(def));
        }
        self.validate(handle, def, value)?;
        let task = self.task_mut(handle)?;
        match target {
            AttrTarget::Channel(names) => {
                let indices = task.resolve_names(names)?;
                for &i in &indices {
                    if task.channels[i].configured_value(def.id).is_none() {
                        return Err(not_applicable(def));
                    }
                }
                for i in indices {
                    task.channels[i].overrides.insert(def.id, value.clone());
                }
            }
            AttrTarget::Watchdog(lines) if !lines.is_empty() => {
                let wd = task.watchdog.as_mut().ok_or_else(|| not_applicable(def))?;
                let wanted: Vec<String> = unflatten_channel_string(lines)
                    .into_iter()
                    .map(|l| l.trim_start_matches('/').to_ascii_lowercase())
                    .collect();
                for entry in wd.entries.iter_mut().filter(|e| wanted.contains(&e.physical)) {
                    set_expiration(entry, def, value)?;
                }
            }
            AttrTarget::Read if def.id == read::id::CHANNELS_TO_READ => match value {
                AttributeValue::String(names) if names.trim().is_empty() => {
                    task.overrides.remove(&(def.group, def.id));
                }
                AttributeValue::String(names) => {
                    task.resolve_names(names)?;
                    task.overrides.insert((def.group, def.id), value.clone());
                }
                _ => return Err(invalid_value(def, "Expected a channel list.")),
            },
            _ => {
                if def.group == AttrGroup::Watchdog && task.watchdog.is_none() {
                    return Err(not_applicable(def));
                }
                task.overrides.insert((def.group, def.id), value.clone());
            }
        }
        Ok(())
    }

    fn validate(&self, handle: TaskHandle, def: &AttributeDef, value: &AttributeValue) -> Result<()> {
        let task = self.task(handle)?;
        match (def.group, def.id, value) {
            (AttrGroup::Timing, timing::id::SAMP_CLK_RATE, AttributeValue::F64(rate))
                if *rate <= 0.0 || *rate > MAX_SAMPLE_RATE =>
            {
                Err(invalid_value(def, &format!("Rate {rate} is outside (0, {MAX_SAMPLE_RATE}].")))
            }
            (AttrGroup::Watchdog, watchdog::id::TIMEOUT, AttributeValue::F64(t)) if *t != -1.0 && *t <= 0.0 => {
                Err(invalid_value(def, "Timeout must be positive or -1."))
            }
            (AttrGroup::Timing | AttrGroup::Buffer, _, _) if task.state == TaskState::Running => Err(DaqError::driver(
                error_codes::INVALID_TASK_STATE,
                "Specified property cannot be set while the task is running.",
            )),
            _ => Ok(()),
        }
    }

    pub fn reset_attribute(&mut self, handle: TaskHandle, target: AttrTarget<'_>, def: &AttributeDef) -> Result<()> {
        if target == AttrTarget::Task || READ_ONLY.contains(&(def.group, def.id)) {
            return Err(read_only(def));
        }
        let task = self.task_mut(handle)?;
        match target {
            AttrTarget::Channel(names) => {
                for i in task.resolve_names(names)? {
                    task.channels[i].overrides.remove(&def.id);
                }
            }
            AttrTarget::Watchdog(lines) if !lines.is_empty() => {
                // Expiration states have no stored default to return to.
                return Err(read_only(def));
            }
            _ => {
                task.overrides.remove(&(def.group, def.id));
            }
        }
        Ok(())
    }
}

fn set_expiration(entry: &mut ExpirationEntry, def: &AttributeDef, value: &AttributeValue) -> Result<()> {
    match (&mut entry.action, def.id) {
        (ExpirAction::Digital(state), watchdog::id::DO_EXPIR_STATE) => {
            *state = DigitalLineState::from_value(value.clone())?;
        }
        (ExpirAction::Analog { value: level, .. }, watchdog::id::AO_EXPIR_STATE) => {
            *level = f64::from_value(value.clone())?;
        }
        (ExpirAction::Analog { output_type, .. }, watchdog::id::AO_OUTPUT_TYPE) => {
            *output_type = WatchdogAOExpirState::from_value(value.clone())?;
        }
        (ExpirAction::Counter(state), watchdog::id::CO_EXPIR_STATE) => {
            *state = WatchdogCOExpirState::from_value(value.clone())?;
        }
        _ => return Err(not_applicable(def)),
    }
    Ok(())
}

pub(super) fn timestamps_disabled() -> DaqError {
    DaqError::driver(
        error_codes::TIMESTAMP_NOT_SUPPORTED,
        "Timestamps are not enabled for this event on the device.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{AiVoltageChan, CoPulseChanFreq};

    fn sim_channel(spec: ChannelSpec, resources: Vec<Resource>) -> SimChannel {
        SimChannel {
            name: "c".into(),
            spec,
            device: "SimDev1".into(),
            physical: "SimDev1/x".into(),
            resources,
            overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_run_clock_caps_finite() {
        let start = Instant::now();
        let clock = RunClock {
            started_at: start,
            rate: 1000.0,
            total: Some(100),
        };
        assert_eq!(clock.produced(start), 0);
        assert_eq!(clock.produced(start + Duration::from_millis(50)), 50);
        assert_eq!(clock.produced(start + Duration::from_secs(5)), 100);
    }

    #[test]
    fn test_channel_override_wins() {
        let mut chan = sim_channel(ChannelSpec::AiVoltage(AiVoltageChan::default()), vec![Resource::Ai(0)]);
        assert_eq!(chan.value(channel::id::AI_MAX), Some(AttributeValue::F64(5.0)));
        chan.overrides.insert(channel::id::AI_MAX, AttributeValue::F64(2.0));
        assert_eq!(chan.value(channel::id::AI_MAX), Some(AttributeValue::F64(2.0)));
        assert_eq!(chan.value(channel::id::AO_MAX), None);
    }

    #[test]
    fn test_frequency_pulse_as_time() {
        let chan = sim_channel(
            ChannelSpec::CoPulseFreq(CoPulseChanFreq {
                freq: 100.0,
                duty_cycle: 0.25,
                ..Default::default()
            }),
            vec![Resource::Ctr(0)],
        );
        let pulse = chan.output_pulse().unwrap();
        assert!((pulse.high_time - 0.0025).abs() < 1e-12);
        assert!((pulse.low_time - 0.0075).abs() < 1e-12);
    }

    #[test]
    fn test_port_packing_uses_line_numbers() {
        let mut state = SimState::default();
        let chan = sim_channel(
            ChannelSpec::Di(Default::default()),
            (0..8).map(|line| Resource::Line { port: 0, line }).collect(),
        );
        state.set_port_output(&chan, 0xA5);
        assert_eq!(state.port_input(&chan), 0xA5);
        assert_eq!(
            state.line_inputs(&chan),
            [true, false, true, false, false, true, false, true]
        );
    }
}
