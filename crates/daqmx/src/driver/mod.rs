//! Driver adapter boundary.
//!
//! Everything the binding does to hardware goes through [`Driver`]. Three
//! adapters implement it:
//!
//! - [`LibraryDriver`] calls the vendor C library (feature `hardware`)
//! - [`RemoteDriver`] forwards calls over a [`SessionTransport`]
//! - [`SimulatedDriver`] keeps devices, tasks and loopbacks in memory
//!
//! All methods are synchronous. Status handling follows one rule for every
//! adapter (see [`check_status`]): negative is an error, positive is
//! a warning, zero is success. Entry points an adapter lacks keep their
//! default body and fail with `FunctionNotSupported`.

use std::fmt;

use serde::Serialize;

use crate::attributes::{AttrTarget, AttributeType, AttributeValue};
use crate::constants::*;
use crate::error::{DaqError, Result};
use crate::timestamp::Timestamp;
use crate::types::{CtrFreq, CtrTick, CtrTime, PowerMeasurement};
use crate::warnings;

/// Vendor C library adapter.
#[cfg(feature = "hardware")]
pub mod library;
/// Session-server adapter.
pub mod remote;
/// In-process simulated devices.
pub mod simulated;

#[cfg(feature = "hardware")]
pub use library::LibraryDriver;
pub use remote::{GrpcOptions, RemoteDriver, SessionInitializationBehavior, SessionTransport};
pub use simulated::SimulatedDriver;

/// Opaque driver-issued task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    /// Wrap a raw handle value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw handle value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Interpret a driver status code.
///
/// `detail` is only evaluated for non-zero statuses, so adapters can defer
/// the extended-error lookup until it is needed.
pub fn check_status(status: i32, detail: impl FnOnce() -> String) -> Result<()> {
    if status < 0 {
        Err(DaqError::driver(status, detail()))
    } else {
        if status > 0 {
            warnings::driver_warning(status, detail());
        }
        Ok(())
    }
}

/// Parameters of `add_ai_voltage_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiVoltageChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Input terminal configuration.
    pub terminal_config: TerminalConfiguration,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: VoltageUnits,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for AiVoltageChan {
    fn default() -> Self {
        Self {
            physical_channel: String::new(),
            name_to_assign_to_channel: String::new(),
            terminal_config: TerminalConfiguration::Default,
            min_val: -5.0,
            max_val: 5.0,
            units: VoltageUnits::Volts,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ai_current_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiCurrentChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Input terminal configuration.
    pub terminal_config: TerminalConfiguration,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: CurrentUnits,
    /// Where the shunt resistor sits.
    pub shunt_resistor_loc: CurrentShuntResistorLocation,
    /// External shunt resistance in ohms.
    pub ext_shunt_resistor_val: f64,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for AiCurrentChan {
    fn default() -> Self {
        Self {
            physical_channel: String::new(),
            name_to_assign_to_channel: String::new(),
            terminal_config: TerminalConfiguration::Default,
            min_val: -0.01,
            max_val: 0.01,
            units: CurrentUnits::Amps,
            shunt_resistor_loc: CurrentShuntResistorLocation::LetDriverChoose,
            ext_shunt_resistor_val: 249.0,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ai_thrmcpl_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiThrmcplChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TemperatureUnits,
    /// Thermocouple type.
    pub thermocouple_type: ThermocoupleType,
    /// Cold-junction compensation source.
    pub cjc_source: CjcSource,
    /// Constant cold-junction temperature, when `cjc_source` is constant.
    pub cjc_val: f64,
    /// Cold-junction channel, when `cjc_source` is a channel.
    pub cjc_channel: String,
}

impl Default for AiThrmcplChan {
    fn default() -> Self {
        Self {
            physical_channel: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.0,
            max_val: 100.0,
            units: TemperatureUnits::DegC,
            thermocouple_type: ThermocoupleType::J,
            cjc_source: CjcSource::ConstantUserValue,
            cjc_val: 25.0,
            cjc_channel: String::new(),
        }
    }
}

/// Parameters of `add_ai_power_chan`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AiPowerChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Output voltage setpoint in volts.
    pub voltage_setpoint: f64,
    /// Output current limit in amps.
    pub current_setpoint: f64,
    /// Whether the output is enabled.
    pub output_enable: bool,
}

/// Parameters of `add_ao_voltage_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoVoltageChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: VoltageUnits,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for AoVoltageChan {
    fn default() -> Self {
        Self {
            physical_channel: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: -10.0,
            max_val: 10.0,
            units: VoltageUnits::Volts,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ao_current_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoCurrentChan {
    /// Physical channels, as one name or a range.
    pub physical_channel: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: CurrentUnits,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for AoCurrentChan {
    fn default() -> Self {
        Self {
            physical_channel: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.0,
            max_val: 0.02,
            units: CurrentUnits::Amps,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_di_chan` and `add_do_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitalChan {
    /// Digital lines or ports, such as `Dev1/port0/line0:7`.
    pub lines: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_lines: String,
    /// One channel for all lines or one per line.
    pub line_grouping: LineGrouping,
}

impl Default for DigitalChan {
    fn default() -> Self {
        Self {
            lines: String::new(),
            name_to_assign_to_lines: String::new(),
            line_grouping: LineGrouping::ChanForAllLines,
        }
    }
}

/// Parameters of `add_ci_count_edges_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiCountEdgesChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Active edge.
    pub edge: Edge,
    /// Count value at start.
    pub initial_count: u32,
    /// Count up, down or by an external line.
    pub count_direction: CountDirection,
}

impl Default for CiCountEdgesChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            edge: Edge::Rising,
            initial_count: 0,
            count_direction: CountDirection::CountUp,
        }
    }
}

/// Parameters of `add_ci_freq_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiFreqChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: FrequencyUnits,
    /// Active edge.
    pub edge: Edge,
    /// Measurement method.
    pub meas_method: CounterFrequencyMethod,
    /// Measurement time in seconds, for the high-frequency method.
    pub meas_time: f64,
    /// Divisor, for the large-range method.
    pub divisor: u32,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for CiFreqChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 2.0,
            max_val: 100.0,
            units: FrequencyUnits::Hz,
            edge: Edge::Rising,
            meas_method: CounterFrequencyMethod::LowFrequency1Counter,
            meas_time: 0.001,
            divisor: 4,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ci_period_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiPeriodChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
    /// Active edge.
    pub edge: Edge,
    /// Measurement method.
    pub meas_method: CounterFrequencyMethod,
    /// Measurement time in seconds, for the high-frequency method.
    pub meas_time: f64,
    /// Divisor, for the large-range method.
    pub divisor: u32,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for CiPeriodChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.000_001,
            max_val: 0.1,
            units: TimeUnits::Seconds,
            edge: Edge::Rising,
            meas_method: CounterFrequencyMethod::LowFrequency1Counter,
            meas_time: 0.001,
            divisor: 4,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ci_pulse_width_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiPulseWidthChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
    /// Edge the measurement starts on.
    pub starting_edge: Edge,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for CiPulseWidthChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.000_001,
            max_val: 0.1,
            units: TimeUnits::Seconds,
            starting_edge: Edge::Rising,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ci_semi_period_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiSemiPeriodChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for CiSemiPeriodChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.000_001,
            max_val: 0.1,
            units: TimeUnits::Seconds,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ci_two_edge_sep_chan`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiTwoEdgeSepChan {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
    /// Edge of the first signal.
    pub first_edge: Edge,
    /// Edge of the second signal.
    pub second_edge: Edge,
    /// Custom scale applied when `units` selects one.
    pub custom_scale_name: String,
}

impl Default for CiTwoEdgeSepChan {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.000_001,
            max_val: 1.0,
            units: TimeUnits::Seconds,
            first_edge: Edge::Rising,
            second_edge: Edge::Falling,
            custom_scale_name: String::new(),
        }
    }
}

/// Parameters of `add_ci_pulse_chan_freq`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiPulseChanFreq {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: FrequencyUnits,
}

impl Default for CiPulseChanFreq {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 1000.0,
            max_val: 1_000_000.0,
            units: FrequencyUnits::Hz,
        }
    }
}

/// Parameters of `add_ci_pulse_chan_time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiPulseChanTime {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
}

impl Default for CiPulseChanTime {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            min_val: 0.000_001,
            max_val: 0.001,
            units: TimeUnits::Seconds,
        }
    }
}

/// Parameters of `add_ci_pulse_chan_ticks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CiPulseChanTicks {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Timebase terminal the ticks count.
    pub source_terminal: String,
    /// Minimum expected value, in `units`.
    pub min_val: f64,
    /// Maximum expected value, in `units`.
    pub max_val: f64,
}

impl Default for CiPulseChanTicks {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            source_terminal: "OnboardClock".to_string(),
            min_val: 1000.0,
            max_val: 1_000_000.0,
        }
    }
}

/// Parameters of `add_co_pulse_chan_freq`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoPulseChanFreq {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: FrequencyUnits,
    /// Output level while idle.
    pub idle_state: Level,
    /// Delay before the first pulse.
    pub initial_delay: f64,
    /// Pulse frequency.
    pub freq: f64,
    /// High time over period, between 0 and 1.
    pub duty_cycle: f64,
}

impl Default for CoPulseChanFreq {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            units: FrequencyUnits::Hz,
            idle_state: Level::Low,
            initial_delay: 0.0,
            freq: 1.0,
            duty_cycle: 0.5,
        }
    }
}

/// Parameters of `add_co_pulse_chan_time`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoPulseChanTime {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Units of `min_val` and `max_val` and of scaled samples.
    pub units: TimeUnits,
    /// Output level while idle.
    pub idle_state: Level,
    /// Delay before the first pulse.
    pub initial_delay: f64,
    /// Low time of each pulse.
    pub low_time: f64,
    /// High time of each pulse.
    pub high_time: f64,
}

impl Default for CoPulseChanTime {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            units: TimeUnits::Seconds,
            idle_state: Level::Low,
            initial_delay: 0.0,
            low_time: 0.01,
            high_time: 0.01,
        }
    }
}

/// Parameters of `add_co_pulse_chan_ticks`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoPulseChanTicks {
    /// Counter, such as `Dev1/ctr0`.
    pub counter: String,
    /// Virtual channel name; empty uses the physical name.
    pub name_to_assign_to_channel: String,
    /// Timebase terminal the ticks count.
    pub source_terminal: String,
    /// Output level while idle.
    pub idle_state: Level,
    /// Delay before the first pulse.
    pub initial_delay: i32,
    /// Low ticks of each pulse.
    pub low_ticks: i32,
    /// High ticks of each pulse.
    pub high_ticks: i32,
}

impl Default for CoPulseChanTicks {
    fn default() -> Self {
        Self {
            counter: String::new(),
            name_to_assign_to_channel: String::new(),
            source_terminal: String::new(),
            idle_state: Level::Low,
            initial_delay: 0,
            low_ticks: 100,
            high_ticks: 100,
        }
    }
}

/// One virtual-channel creation call.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSpec {
    /// `add_ai_voltage_chan`.
    AiVoltage(AiVoltageChan),
    /// `add_ai_current_chan`.
    AiCurrent(AiCurrentChan),
    /// `add_ai_thrmcpl_chan`.
    AiThermocouple(AiThrmcplChan),
    /// `add_ai_power_chan`.
    AiPower(AiPowerChan),
    /// `add_ao_voltage_chan`.
    AoVoltage(AoVoltageChan),
    /// `add_ao_current_chan`.
    AoCurrent(AoCurrentChan),
    /// `add_di_chan`.
    Di(DigitalChan),
    /// `add_do_chan`.
    Do(DigitalChan),
    /// `add_ci_count_edges_chan`.
    CiCountEdges(CiCountEdgesChan),
    /// `add_ci_freq_chan`.
    CiFreq(CiFreqChan),
    /// `add_ci_period_chan`.
    CiPeriod(CiPeriodChan),
    /// `add_ci_pulse_width_chan`.
    CiPulseWidth(CiPulseWidthChan),
    /// `add_ci_semi_period_chan`.
    CiSemiPeriod(CiSemiPeriodChan),
    /// `add_ci_two_edge_sep_chan`.
    CiTwoEdgeSep(CiTwoEdgeSepChan),
    /// `add_ci_pulse_chan_freq`.
    CiPulseFreq(CiPulseChanFreq),
    /// `add_ci_pulse_chan_time`.
    CiPulseTime(CiPulseChanTime),
    /// `add_ci_pulse_chan_ticks`.
    CiPulseTicks(CiPulseChanTicks),
    /// `add_co_pulse_chan_freq`.
    CoPulseFreq(CoPulseChanFreq),
    /// `add_co_pulse_chan_time`.
    CoPulseTime(CoPulseChanTime),
    /// `add_co_pulse_chan_ticks`.
    CoPulseTicks(CoPulseChanTicks),
}

impl ChannelSpec {
    /// Physical channel, counter or line string the call addresses.
    pub fn physical(&self) -> &str {
        match self {
            Self::AiVoltage(c) => &c.physical_channel,
            Self::AiCurrent(c) => &c.physical_channel,
            Self::AiThermocouple(c) => &c.physical_channel,
            Self::AiPower(c) => &c.physical_channel,
            Self::AoVoltage(c) => &c.physical_channel,
            Self::AoCurrent(c) => &c.physical_channel,
            Self::Di(c) | Self::Do(c) => &c.lines,
            Self::CiCountEdges(c) => &c.counter,
            Self::CiFreq(c) => &c.counter,
            Self::CiPeriod(c) => &c.counter,
            Self::CiPulseWidth(c) => &c.counter,
            Self::CiSemiPeriod(c) => &c.counter,
            Self::CiTwoEdgeSep(c) => &c.counter,
            Self::CiPulseFreq(c) => &c.counter,
            Self::CiPulseTime(c) => &c.counter,
            Self::CiPulseTicks(c) => &c.counter,
            Self::CoPulseFreq(c) => &c.counter,
            Self::CoPulseTime(c) => &c.counter,
            Self::CoPulseTicks(c) => &c.counter,
        }
    }

    /// Name the caller asked for, possibly empty.
    pub fn assigned_name(&self) -> &str {
        match self {
            Self::AiVoltage(c) => &c.name_to_assign_to_channel,
            Self::AiCurrent(c) => &c.name_to_assign_to_channel,
            Self::AiThermocouple(c) => &c.name_to_assign_to_channel,
            Self::AiPower(c) => &c.name_to_assign_to_channel,
            Self::AoVoltage(c) => &c.name_to_assign_to_channel,
            Self::AoCurrent(c) => &c.name_to_assign_to_channel,
            Self::Di(c) | Self::Do(c) => &c.name_to_assign_to_lines,
            Self::CiCountEdges(c) => &c.name_to_assign_to_channel,
            Self::CiFreq(c) => &c.name_to_assign_to_channel,
            Self::CiPeriod(c) => &c.name_to_assign_to_channel,
            Self::CiPulseWidth(c) => &c.name_to_assign_to_channel,
            Self::CiSemiPeriod(c) => &c.name_to_assign_to_channel,
            Self::CiTwoEdgeSep(c) => &c.name_to_assign_to_channel,
            Self::CiPulseFreq(c) => &c.name_to_assign_to_channel,
            Self::CiPulseTime(c) => &c.name_to_assign_to_channel,
            Self::CiPulseTicks(c) => &c.name_to_assign_to_channel,
            Self::CoPulseFreq(c) => &c.name_to_assign_to_channel,
            Self::CoPulseTime(c) => &c.name_to_assign_to_channel,
            Self::CoPulseTicks(c) => &c.name_to_assign_to_channel,
        }
    }

    /// Line grouping for digital channels, `None` otherwise.
    pub fn line_grouping(&self) -> Option<LineGrouping> {
        match self {
            Self::Di(c) | Self::Do(c) => Some(c.line_grouping),
            _ => None,
        }
    }

    /// Channel family this call creates.
    pub fn chan_type(&self) -> ChannelType {
        match self {
            Self::AiVoltage(_) | Self::AiCurrent(_) | Self::AiThermocouple(_) | Self::AiPower(_) => {
                ChannelType::AnalogInput
            }
            Self::AoVoltage(_) | Self::AoCurrent(_) => ChannelType::AnalogOutput,
            Self::Di(_) => ChannelType::DigitalInput,
            Self::Do(_) => ChannelType::DigitalOutput,
            Self::CoPulseFreq(_) | Self::CoPulseTime(_) | Self::CoPulseTicks(_) => ChannelType::CounterOutput,
            _ => ChannelType::CounterInput,
        }
    }

    /// Vendor entry point name, for logs and call accounting.
    pub fn function_name(&self) -> &'static str {
        match self {
            Self::AiVoltage(_) => "DAQmxCreateAIVoltageChan",
            Self::AiCurrent(_) => "DAQmxCreateAICurrentChan",
            Self::AiThermocouple(_) => "DAQmxCreateAIThrmcplChan",
            Self::AiPower(_) => "DAQmxCreateAIPowerChan",
            Self::AoVoltage(_) => "DAQmxCreateAOVoltageChan",
            Self::AoCurrent(_) => "DAQmxCreateAOCurrentChan",
            Self::Di(_) => "DAQmxCreateDIChan",
            Self::Do(_) => "DAQmxCreateDOChan",
            Self::CiCountEdges(_) => "DAQmxCreateCICountEdgesChan",
            Self::CiFreq(_) => "DAQmxCreateCIFreqChan",
            Self::CiPeriod(_) => "DAQmxCreateCIPeriodChan",
            Self::CiPulseWidth(_) => "DAQmxCreateCIPulseWidthChan",
            Self::CiSemiPeriod(_) => "DAQmxCreateCISemiPeriodChan",
            Self::CiTwoEdgeSep(_) => "DAQmxCreateCITwoEdgeSepChan",
            Self::CiPulseFreq(_) => "DAQmxCreateCIPulseChanFreq",
            Self::CiPulseTime(_) => "DAQmxCreateCIPulseChanTime",
            Self::CiPulseTicks(_) => "DAQmxCreateCIPulseChanTicks",
            Self::CoPulseFreq(_) => "DAQmxCreateCOPulseChanFreq",
            Self::CoPulseTime(_) => "DAQmxCreateCOPulseChanTime",
            Self::CoPulseTicks(_) => "DAQmxCreateCOPulseChanTicks",
        }
    }
}

/// High-level timing configuration.
///
/// Each variant carries the arguments of the [`Timing`](crate::Timing)
/// call it names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
#[allow(missing_docs)]
pub enum TimingConfig {
    /// `cfg_samp_clk_timing`.
    SampleClock {
        rate: f64,
        source: String,
        active_edge: Edge,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    },
    /// `cfg_implicit_timing`.
    Implicit {
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    },
    /// `cfg_handshaking_timing`.
    Handshaking {
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    },
    /// `cfg_burst_handshaking_timing_import_clock`.
    BurstHandshakingImportClock {
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
        sample_clk_rate: f64,
        sample_clk_src: String,
        sample_clk_active_edge: Edge,
        pause_when: Level,
        ready_event_active_level: Polarity,
    },
    /// `cfg_burst_handshaking_timing_export_clock`.
    BurstHandshakingExportClock {
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
        sample_clk_rate: f64,
        sample_clk_outp_term: String,
        sample_clk_pulse_polarity: Polarity,
        pause_when: Level,
        ready_event_active_level: Polarity,
    },
    /// `cfg_change_detection_timing`.
    ChangeDetection {
        rising_edge_chan: String,
        falling_edge_chan: String,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    },
    /// `cfg_pipelined_samp_clk_timing`.
    PipelinedSampleClock {
        rate: f64,
        source: String,
        active_edge: Edge,
        sample_mode: AcquisitionType,
        samps_per_chan: u64,
    },
}

impl TimingConfig {
    /// Sample timing type this configuration selects.
    pub fn timing_type(&self) -> SampleTimingType {
        match self {
            Self::SampleClock { .. } => SampleTimingType::SampleClock,
            Self::Implicit { .. } => SampleTimingType::Implicit,
            Self::Handshaking { .. } => SampleTimingType::Handshake,
            Self::BurstHandshakingImportClock { .. } | Self::BurstHandshakingExportClock { .. } => {
                SampleTimingType::BurstHandshake
            }
            Self::ChangeDetection { .. } => SampleTimingType::ChangeDetection,
            Self::PipelinedSampleClock { .. } => SampleTimingType::PipelinedSampleClock,
        }
    }

    /// Sample mode and samples per channel.
    pub fn quantity(&self) -> (AcquisitionType, u64) {
        match self {
            Self::SampleClock { sample_mode, samps_per_chan, .. }
            | Self::Implicit { sample_mode, samps_per_chan }
            | Self::Handshaking { sample_mode, samps_per_chan }
            | Self::BurstHandshakingImportClock { sample_mode, samps_per_chan, .. }
            | Self::BurstHandshakingExportClock { sample_mode, samps_per_chan, .. }
            | Self::ChangeDetection { sample_mode, samps_per_chan, .. }
            | Self::PipelinedSampleClock { sample_mode, samps_per_chan, .. } => (*sample_mode, *samps_per_chan),
        }
    }

    /// Sample clock rate when the configuration has one.
    pub fn rate(&self) -> Option<f64> {
        match self {
            Self::SampleClock { rate, .. } | Self::PipelinedSampleClock { rate, .. } => Some(*rate),
            Self::BurstHandshakingImportClock { sample_clk_rate, .. }
            | Self::BurstHandshakingExportClock { sample_clk_rate, .. } => Some(*sample_clk_rate),
            _ => None,
        }
    }
}

/// Trigger configuration.
///
/// Each variant carries the arguments of its
/// [`Triggers`](crate::Triggers) call.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum TriggerConfig {
    /// Start on a digital edge.
    DigEdgeStart {
        source: String,
        edge: Edge,
    },
    /// Start when an analog signal crosses `level`.
    AnlgEdgeStart {
        source: String,
        slope: Slope,
        level: f64,
    },
    /// Start at an absolute time.
    TimeStart {
        when: Timestamp,
        timescale: Timescale,
    },
    /// No start trigger.
    DisableStart,
    /// Reference trigger on a digital edge.
    DigEdgeRef {
        source: String,
        edge: Edge,
        pretrigger_samples: u32,
    },
    /// Reference trigger on an analog level crossing.
    AnlgEdgeRef {
        source: String,
        slope: Slope,
        level: f64,
        pretrigger_samples: u32,
    },
    /// No reference trigger.
    DisableRef,
}

/// Every-N-samples notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EveryNSamplesEvent {
    /// Task the event belongs to.
    pub task: TaskHandle,
    /// Buffer side that triggered the event.
    pub event_type: EveryNSamplesEventType,
    /// Samples per channel between events.
    pub samples: u32,
}

/// Task-done notification; `status` is the task's final status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoneEvent {
    /// Task the event belongs to.
    pub task: TaskHandle,
    /// Final status code of the task.
    pub status: i32,
}

/// Hardware-signal notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalEvent {
    /// Task the event belongs to.
    pub task: TaskHandle,
    /// Signal that fired.
    pub signal: Signal,
}

/// Callback for every-N-samples events.
pub type EveryNSamplesCallback = Box<dyn FnMut(EveryNSamplesEvent) + Send>;
/// Callback for task-done events.
pub type DoneCallback = Box<dyn FnMut(DoneEvent) + Send>;
/// Callback for hardware-signal events.
pub type SignalCallback = Box<dyn FnMut(SignalEvent) + Send>;

/// Driver-side registration of one event callback.
///
/// The handler owns the callback. Dropping it without `unregister` leaks the
/// registration until the task is cleared.
pub trait EventHandler: Send {
    /// Remove the registration; returns once no invocation is in flight.
    fn unregister(&mut self) -> Result<()>;
}

fn unsupported<T>(function: &str) -> Result<T> {
    Err(DaqError::function_not_supported(function))
}

/// Capability boundary to the data-acquisition driver.
#[allow(clippy::too_many_arguments)]
pub trait Driver: Send + Sync + fmt::Debug {
    /// Create a task. Returns the handle and whether closing it on scope exit
    /// is this process's job.
    fn create_task(&self, name: &str) -> Result<(TaskHandle, bool)>;

    /// Load a task saved in the configuration store.
    fn load_task(&self, name: &str) -> Result<TaskHandle> {
        let _ = name;
        unsupported("DAQmxLoadTask")
    }

    /// Create a watchdog timer task on `device`.
    fn create_watchdog_timer_task(&self, device: &str, name: &str, timeout: f64) -> Result<(TaskHandle, bool)> {
        let _ = (device, name, timeout);
        unsupported("DAQmxCreateWatchdogTimerTaskEx")
    }

    /// Release the task and everything the driver reserved for it.
    fn clear_task(&self, task: TaskHandle) -> Result<()>;

    fn start_task(&self, task: TaskHandle) -> Result<()>;

    fn stop_task(&self, task: TaskHandle) -> Result<()>;

    fn task_control(&self, task: TaskHandle, action: TaskMode) -> Result<()>;

    fn wait_until_task_done(&self, task: TaskHandle, timeout: f64) -> Result<()>;

    fn is_task_done(&self, task: TaskHandle) -> Result<bool>;

    fn wait_for_valid_timestamp(&self, task: TaskHandle, event: TimestampEvent, timeout: f64) -> Result<Timestamp> {
        let _ = (task, event, timeout);
        unsupported("DAQmxWaitForValidTimestamp")
    }

    fn add_global_chans_to_task(&self, task: TaskHandle, channels: &str) -> Result<()> {
        let _ = (task, channels);
        unsupported("DAQmxAddGlobalChansToTask")
    }

    fn save_task(&self, task: TaskHandle, save_as: &str, author: &str, options: SaveOptions) -> Result<()> {
        let _ = (task, save_as, author, options);
        unsupported("DAQmxSaveTask")
    }

    /// Name of the virtual channel created by the most recent channel call.
    fn last_created_channel(&self) -> Result<String> {
        unsupported("DAQmxInternalGetLastCreatedChan")
    }

    fn create_channel(&self, task: TaskHandle, spec: &ChannelSpec) -> Result<()>;

    fn configure_timing(&self, task: TaskHandle, config: &TimingConfig) -> Result<()>;

    fn configure_trigger(&self, task: TaskHandle, config: &TriggerConfig) -> Result<()>;

    fn send_software_trigger(&self, task: TaskHandle, trigger: SoftwareTrigger) -> Result<()> {
        let _ = (task, trigger);
        unsupported("DAQmxSendSoftwareTrigger")
    }

    fn export_signal(&self, task: TaskHandle, signal: Signal, output_terminal: &str) -> Result<()> {
        let _ = (task, signal, output_terminal);
        unsupported("DAQmxExportSignal")
    }

    fn configure_logging(
        &self,
        task: TaskHandle,
        file_path: &str,
        mode: LoggingMode,
        group_name: &str,
        operation: LoggingOperation,
    ) -> Result<()> {
        let _ = (task, file_path, mode, group_name, operation);
        unsupported("DAQmxConfigureLogging")
    }

    fn start_new_file(&self, task: TaskHandle, file_path: &str) -> Result<()> {
        let _ = (task, file_path);
        unsupported("DAQmxStartNewFile")
    }

    // Reads return samples per channel read.

    fn read_analog_f64(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32>;

    fn read_analog_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64>;

    fn read_binary_i16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i16]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadBinaryI16")
    }

    fn read_binary_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadBinaryU16")
    }

    fn read_binary_i32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i32]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadBinaryI32")
    }

    fn read_binary_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadBinaryU32")
    }

    /// One byte per line; returns samples read and bytes per sample.
    fn read_digital_lines(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<(u32, u32)>;

    fn read_digital_u8(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadDigitalU8")
    }

    fn read_digital_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        let _ = (task, samps, timeout, fill, buf);
        unsupported("DAQmxReadDigitalU16")
    }

    fn read_digital_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32>;

    fn read_digital_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32>;

    fn read_counter_f64_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32>;

    fn read_counter_u32_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32>;

    fn read_counter_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64>;

    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32>;

    fn read_ctr_freq(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        freq: &mut [f64],
        duty_cycle: &mut [f64],
    ) -> Result<u32>;

    fn read_ctr_time(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        high_time: &mut [f64],
        low_time: &mut [f64],
    ) -> Result<u32>;

    fn read_ctr_ticks(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        high_ticks: &mut [u32],
        low_ticks: &mut [u32],
    ) -> Result<u32>;

    fn read_ctr_freq_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrFreq>;

    fn read_ctr_time_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTime>;

    fn read_ctr_ticks_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTick>;

    fn read_power_f64(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        voltage: &mut [f64],
        current: &mut [f64],
    ) -> Result<u32>;

    fn read_power_binary_i16(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        voltage: &mut [i16],
        current: &mut [i16],
    ) -> Result<u32> {
        let _ = (task, samps, timeout, fill, voltage, current);
        unsupported("DAQmxReadPowerBinaryI16")
    }

    fn read_power_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<PowerMeasurement>;

    /// Native-format bytes; returns samples read and bytes per sample.
    fn read_raw(&self, task: TaskHandle, samps: u32, timeout: f64, buf: &mut [u8]) -> Result<(u32, u32)> {
        let _ = (task, samps, timeout, buf);
        unsupported("DAQmxReadRaw")
    }

    // Writes return samples per channel written.

    fn write_analog_f64(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        data: &[f64],
    ) -> Result<u32>;

    fn write_analog_scalar_f64(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: f64) -> Result<()>;

    fn write_binary_i16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i16]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteBinaryI16")
    }

    fn write_binary_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteBinaryU16")
    }

    fn write_binary_i32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i32]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteBinaryI32")
    }

    fn write_binary_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteBinaryU32")
    }

    /// One byte per line.
    fn write_digital_lines(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32>;

    fn write_digital_u8(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteDigitalU8")
    }

    fn write_digital_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, fill, data);
        unsupported("DAQmxWriteDigitalU16")
    }

    fn write_digital_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32>;

    fn write_digital_scalar_u32(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: u32) -> Result<()>;

    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        freq: &[f64],
        duty_cycle: &[f64],
    ) -> Result<u32>;

    fn write_ctr_time(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        high_time: &[f64],
        low_time: &[f64],
    ) -> Result<u32>;

    fn write_ctr_ticks(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        high_ticks: &[u32],
        low_ticks: &[u32],
    ) -> Result<u32>;

    fn write_ctr_freq_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrFreq) -> Result<()>;

    fn write_ctr_time_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTime) -> Result<()>;

    fn write_ctr_ticks_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTick) -> Result<()>;

    fn write_raw(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, data: &[u8]) -> Result<u32> {
        let _ = (task, samps, auto_start, timeout, data);
        unsupported("DAQmxWriteRaw")
    }

    // Events

    fn register_every_n_samples_event(
        &self,
        task: TaskHandle,
        event_type: EveryNSamplesEventType,
        samples: u32,
        callback: EveryNSamplesCallback,
    ) -> Result<Box<dyn EventHandler>>;

    fn register_done_event(&self, task: TaskHandle, callback: DoneCallback) -> Result<Box<dyn EventHandler>>;

    fn register_signal_event(&self, task: TaskHandle, signal: Signal, callback: SignalCallback) -> Result<Box<dyn EventHandler>> {
        let _ = (task, signal, callback);
        unsupported("DAQmxRegisterSignalEvent")
    }

    // Watchdog

    fn control_watchdog_task(&self, task: TaskHandle, action: WatchdogControlAction) -> Result<()> {
        let _ = (task, action);
        unsupported("DAQmxControlWatchdogTask")
    }

    fn cfg_watchdog_ao_expir_states(
        &self,
        task: TaskHandle,
        channels: &str,
        states: &[f64],
        output_types: &[WatchdogAOExpirState],
    ) -> Result<()> {
        let _ = (task, channels, states, output_types);
        unsupported("DAQmxCfgWatchdogAOExpirStates")
    }

    fn cfg_watchdog_co_expir_states(&self, task: TaskHandle, channels: &str, states: &[WatchdogCOExpirState]) -> Result<()> {
        let _ = (task, channels, states);
        unsupported("DAQmxCfgWatchdogCOExpirStates")
    }

    fn cfg_watchdog_do_expir_states(&self, task: TaskHandle, channels: &str, states: &[DigitalLineState]) -> Result<()> {
        let _ = (task, channels, states);
        unsupported("DAQmxCfgWatchdogDOExpirStates")
    }

    // Attributes

    fn get_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, ty: AttributeType) -> Result<AttributeValue>;

    fn set_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, value: &AttributeValue) -> Result<()>;

    fn reset_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_check_status() {
        assert!(check_status(0, || unreachable!()).is_ok());
        assert!(check_status(200_015, || "clipped".to_string()).is_ok());

        let err = check_status(-200_088, || "invalid task".to_string()).unwrap_err();
        assert_eq!(err.code(), -200_088);
        assert_eq!(err.kind(), ErrorKind::Driver);
    }

    #[test]
    fn test_channel_spec_accessors() {
        let spec = ChannelSpec::Do(DigitalChan {
            lines: "Dev1/port0/line0:7".into(),
            line_grouping: LineGrouping::ChanForAllLines,
            ..Default::default()
        });
        assert_eq!(spec.physical(), "Dev1/port0/line0:7");
        assert_eq!(spec.assigned_name(), "");
        assert_eq!(spec.chan_type(), ChannelType::DigitalOutput);
        assert_eq!(spec.line_grouping(), Some(LineGrouping::ChanForAllLines));
    }

    #[test]
    fn test_timing_config_quantity() {
        let cfg = TimingConfig::SampleClock {
            rate: 1000.0,
            source: String::new(),
            active_edge: Edge::Rising,
            sample_mode: AcquisitionType::Finite,
            samps_per_chan: 100,
        };
        assert_eq!(cfg.timing_type(), SampleTimingType::SampleClock);
        assert_eq!(cfg.quantity(), (AcquisitionType::Finite, 100));
        assert_eq!(cfg.rate(), Some(1000.0));
    }

    #[test]
    fn test_task_handle_display() {
        assert_eq!(TaskHandle::from_raw(255).to_string(), "0xff");
    }
}
