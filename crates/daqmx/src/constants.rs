//! Enumerations and flag sets understood by the driver.
//!
//! Each enum carries the vendor's raw `int32` value as its discriminant and
//! converts back with `from_raw`, so it can travel through the attribute
//! protocol as an `int32` attribute.

use bitflags::bitflags;

use crate::attributes::{AttributeKind, AttributeType, AttributeValue};
use crate::error::{error_codes, DaqError, Result};

/// Timeout sentinel: block until the operation completes.
pub const WAIT_INFINITELY: f64 = -1.0;

/// Timeout used when the caller does not pass one.
pub const DEFAULT_TIMEOUT: f64 = 10.0;

macro_rules! daq_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(i32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $name {
            /// Convert from the raw driver value.
            pub fn from_raw(raw: i32) -> Option<Self> {
                match raw {
                    $(x if x == $value => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Raw driver value.
            pub fn raw(self) -> i32 {
                self as i32
            }
        }

        impl AttributeKind for $name {
            const TYPE: AttributeType = AttributeType::I32;

            fn into_value(self) -> AttributeValue {
                AttributeValue::I32(self.raw())
            }

            fn from_value(value: AttributeValue) -> Result<Self> {
                let raw = i32::from_value(value)?;
                Self::from_raw(raw).ok_or_else(|| {
                    DaqError::driver(
                        error_codes::INVALID_ATTRIBUTE_VALUE,
                        format!("{raw} is not a valid {} value.", stringify!($name)),
                    )
                })
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_i32(self.raw())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = i32::deserialize(deserializer)?;
                Self::from_raw(raw).ok_or_else(|| {
                    serde::de::Error::custom(format!("{raw} is not a valid {} value", stringify!($name)))
                })
            }
        }
    };
}

daq_enum! {
    /// Input terminal configuration of an analog channel.
    TerminalConfiguration {
        Default = -1,
        Rse = 10083,
        Nrse = 10078,
        Differential = 10106,
        PseudoDifferential = 12529,
    }
}

daq_enum! {
    /// Units of a voltage channel.
    VoltageUnits {
        Volts = 10348,
        FromCustomScale = 10065,
    }
}

daq_enum! {
    /// Units of a current channel.
    CurrentUnits {
        Amps = 10342,
        FromCustomScale = 10065,
    }
}

daq_enum! {
    /// Units of a temperature channel.
    TemperatureUnits {
        DegC = 10143,
        DegF = 10144,
        Kelvins = 10325,
        DegR = 10145,
    }
}

daq_enum! {
    /// Thermocouple type.
    ThermocoupleType {
        J = 10072,
        K = 10073,
        N = 10077,
        R = 10082,
        S = 10085,
        T = 10086,
        B = 10047,
        E = 10055,
    }
}

daq_enum! {
    /// Cold-junction compensation source.
    CjcSource {
        BuiltIn = 10200,
        ConstantUserValue = 10116,
        Channel = 10113,
    }
}

daq_enum! {
    /// Location of the shunt resistor on a current channel.
    CurrentShuntResistorLocation {
        LetDriverChoose = -1,
        Internal = 10200,
        External = 10167,
    }
}

daq_enum! {
    /// Units of a frequency measurement or generation.
    FrequencyUnits {
        Hz = 10373,
        Ticks = 10304,
        FromCustomScale = 10065,
    }
}

daq_enum! {
    /// Units of a time measurement or generation.
    TimeUnits {
        Seconds = 10364,
        Ticks = 10304,
        FromCustomScale = 10065,
    }
}

daq_enum! {
    /// Active edge of a digital signal.
    Edge {
        Rising = 10280,
        Falling = 10171,
    }
}

daq_enum! {
    /// Slope of an analog trigger.
    Slope {
        Rising = 10280,
        Falling = 10171,
    }
}

daq_enum! {
    /// Count direction of an edge counter.
    CountDirection {
        CountUp = 10128,
        CountDown = 10124,
        ExternalControl = 10326,
    }
}

daq_enum! {
    /// Frequency measurement method.
    CounterFrequencyMethod {
        LowFrequency1Counter = 10105,
        HighFrequency2Counters = 10157,
        LargeRange2Counters = 10205,
        DynamicAveraging = 16065,
    }
}

daq_enum! {
    /// Logic level.
    Level {
        High = 10192,
        Low = 10214,
    }
}

daq_enum! {
    /// Polarity of a handshake or exported signal.
    Polarity {
        ActiveHigh = 10095,
        ActiveLow = 10096,
    }
}

daq_enum! {
    /// How digital lines are grouped into virtual channels.
    LineGrouping {
        /// One virtual channel per line.
        ChanPerLine = 0,
        /// One virtual channel for all listed lines.
        ChanForAllLines = 1,
    }
}

daq_enum! {
    /// Sample quantity mode.
    AcquisitionType {
        Finite = 10178,
        Continuous = 10123,
        HwTimedSinglePoint = 12522,
    }
}

daq_enum! {
    /// Sample timing type.
    SampleTimingType {
        SampleClock = 10388,
        Handshake = 10389,
        Implicit = 10451,
        OnDemand = 10390,
        ChangeDetection = 12504,
        PipelinedSampleClock = 14668,
        BurstHandshake = 12548,
    }
}

daq_enum! {
    /// Trigger type.
    TriggerType {
        DigitalEdge = 10150,
        AnalogEdge = 10099,
        Time = 15996,
        None = 10230,
    }
}

daq_enum! {
    /// Virtual channel type.
    ChannelType {
        AnalogInput = 10100,
        AnalogOutput = 10102,
        DigitalInput = 10151,
        DigitalOutput = 10153,
        CounterInput = 10131,
        CounterOutput = 10132,
    }
}

daq_enum! {
    /// Measurement type of an analog input channel.
    UsageTypeAI {
        Voltage = 10322,
        Current = 10134,
        TemperatureThermocouple = 10303,
        Power = 16201,
    }
}

daq_enum! {
    /// Output type of an analog output channel.
    UsageTypeAO {
        Voltage = 10322,
        Current = 10134,
    }
}

daq_enum! {
    /// Measurement type of a counter input channel.
    UsageTypeCI {
        CountEdges = 10125,
        Frequency = 10179,
        Period = 10256,
        PulseWidth = 10359,
        SemiPeriod = 10289,
        TwoEdgeSeparation = 10267,
        PulseFrequency = 15864,
        PulseTime = 15865,
        PulseTicks = 15866,
        AngularEncoder = 10360,
        LinearEncoder = 10361,
    }
}

daq_enum! {
    /// Output type of a counter output channel.
    UsageTypeCO {
        PulseFrequency = 10119,
        PulseTicks = 10268,
        PulseTime = 10269,
    }
}

daq_enum! {
    /// Buffer layout of a multi-channel transfer.
    FillMode {
        /// All samples of channel 0, then channel 1, and so on.
        GroupByChannel = 0,
        /// One sample of every channel per scan.
        GroupByScanNumber = 1,
    }
}

daq_enum! {
    /// State transition requested through `control`.
    TaskMode {
        Start = 0,
        Stop = 1,
        Verify = 2,
        Commit = 3,
        Reserve = 4,
        Unreserve = 5,
        Abort = 6,
    }
}

daq_enum! {
    /// Direction of an every-N-samples event.
    EveryNSamplesEventType {
        AcquiredIntoBuffer = 1,
        TransferredFromBuffer = 2,
    }
}

daq_enum! {
    /// Hardware signal that can be exported or observed.
    Signal {
        SampleClock = 12487,
        AdvanceTrigger = 12488,
        ReferenceTrigger = 12490,
        StartTrigger = 12491,
        AiHoldCompleteEvent = 12493,
        CounterOutputEvent = 12494,
        ChangeDetectionEvent = 12511,
        SampleCompleteEvent = 12530,
    }
}

daq_enum! {
    /// Trigger that can be asserted from software.
    SoftwareTrigger {
        AdvanceTrigger = 12488,
    }
}

daq_enum! {
    /// Event whose timestamp `wait_for_valid_timestamp` waits for.
    TimestampEvent {
        StartTrigger = 12491,
        ReferenceTrigger = 12490,
        ArmStartTrigger = 14641,
        FirstSampleTimestamp = 16130,
    }
}

daq_enum! {
    /// Clock a time trigger is expressed in.
    Timescale {
        HostTime = 16126,
        IoDeviceTime = 16127,
    }
}

daq_enum! {
    /// TDMS logging mode.
    LoggingMode {
        Off = 10231,
        Log = 15844,
        LogAndRead = 15842,
    }
}

daq_enum! {
    /// How the TDMS file is opened.
    LoggingOperation {
        Open = 10437,
        OpenOrCreate = 15846,
        CreateOrReplace = 15847,
        Create = 15848,
    }
}

daq_enum! {
    /// Whether an output task may regenerate samples from its buffer.
    RegenerationMode {
        AllowRegeneration = 10097,
        DoNotAllowRegeneration = 10158,
    }
}

daq_enum! {
    /// Action performed on a running watchdog.
    WatchdogControlAction {
        ResetTimer = 0,
        ClearExpiration = 1,
    }
}

daq_enum! {
    /// State a digital line enters when the watchdog expires.
    DigitalLineState {
        High = 10192,
        Low = 10214,
        Tristate = 10310,
        NoChange = 10160,
    }
}

daq_enum! {
    /// Output type an analog channel uses after watchdog expiration.
    WatchdogAOExpirState {
        Voltage = 10322,
        Current = 10134,
        NoChange = 10160,
    }
}

daq_enum! {
    /// State a counter output enters when the watchdog expires.
    WatchdogCOExpirState {
        High = 10192,
        Low = 10214,
        NoChange = 10160,
    }
}

bitflags! {
    /// Options for saving a task to the configuration store.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SaveOptions: u32 {
        /// Replace a saved task of the same name.
        const OVERWRITE = daqmx_sys::DAQmx_Val_Save_Overwrite;
        /// Allow interactive editing of the saved task.
        const ALLOW_INTERACTIVE_EDITING = daqmx_sys::DAQmx_Val_Save_AllowInteractiveEditing;
        /// Allow interactive deletion of the saved task.
        const ALLOW_INTERACTIVE_DELETION = daqmx_sys::DAQmx_Val_Save_AllowInteractiveDeletion;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_round_trip() {
        assert_eq!(Edge::from_raw(10280), Some(Edge::Rising));
        assert_eq!(Edge::Falling.raw(), 10171);
        assert_eq!(TerminalConfiguration::from_raw(-1), Some(TerminalConfiguration::Default));
        assert_eq!(UsageTypeCI::from_raw(15865), Some(UsageTypeCI::PulseTime));
        assert_eq!(ChannelType::from_raw(42), None);
    }

    #[test]
    fn test_enum_through_attribute_value() {
        let value = AcquisitionType::Finite.into_value();
        assert_eq!(value, AttributeValue::I32(10178));
        assert_eq!(AcquisitionType::from_value(value).ok(), Some(AcquisitionType::Finite));

        let bad = AcquisitionType::from_value(AttributeValue::I32(7)).unwrap_err();
        assert_eq!(bad.code(), error_codes::INVALID_ATTRIBUTE_VALUE);
    }

    #[test]
    fn test_save_options_bits() {
        let options = SaveOptions::OVERWRITE | SaveOptions::ALLOW_INTERACTIVE_DELETION;
        assert_eq!(options.bits(), 0b101);
    }
}
