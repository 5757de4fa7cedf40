//! Attribute protocol.
//!
//! Every driver property is an integer ID in one of nine groups, accessed
//! with one of a handful of primitive types. The typed constants below and
//! the [`ATTRIBUTES`] reflection table are generated from one declaration,
//! so the façades and the by-name lookup can never disagree.

use std::fmt;
use std::marker::PhantomData;

use crate::constants::*;
use crate::error::{error_codes, DaqError, Result};
use crate::timestamp::Timestamp;

/// Primitive type of an attribute on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// `bool32` (0 or 1).
    Bool,
    /// `int32`, also used for enums.
    I32,
    /// `uInt32`.
    U32,
    /// `uInt64`.
    U64,
    /// `float64`.
    F64,
    /// String.
    String,
    /// Flattened channel list, unflattened on read.
    StringList,
    /// Array of `float64`.
    F64List,
    /// Absolute time.
    Timestamp,
}

/// Dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Boolean value.
    Bool(bool),
    /// Signed 32-bit value or enum.
    I32(i32),
    /// Unsigned 32-bit value.
    U32(u32),
    /// Unsigned 64-bit value.
    U64(u64),
    /// Double value.
    F64(f64),
    /// String value.
    String(String),
    /// List of names.
    StringList(Vec<String>),
    /// List of doubles.
    F64List(Vec<f64>),
    /// Absolute time.
    Timestamp(Timestamp),
}

impl AttributeValue {
    /// Wire type of this value.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            Self::Bool(_) => AttributeType::Bool,
            Self::I32(_) => AttributeType::I32,
            Self::U32(_) => AttributeType::U32,
            Self::U64(_) => AttributeType::U64,
            Self::F64(_) => AttributeType::F64,
            Self::String(_) => AttributeType::String,
            Self::StringList(_) => AttributeType::StringList,
            Self::F64List(_) => AttributeType::F64List,
            Self::Timestamp(_) => AttributeType::Timestamp,
        }
    }

    /// Zero value of a type; what a fresh attribute reads as.
    pub fn zero(ty: AttributeType) -> Self {
        match ty {
            AttributeType::Bool => Self::Bool(false),
            AttributeType::I32 => Self::I32(0),
            AttributeType::U32 => Self::U32(0),
            AttributeType::U64 => Self::U64(0),
            AttributeType::F64 => Self::F64(0.0),
            AttributeType::String => Self::String(String::new()),
            AttributeType::StringList => Self::StringList(Vec::new()),
            AttributeType::F64List => Self::F64List(Vec::new()),
            AttributeType::Timestamp => Self::Timestamp(Timestamp::default()),
        }
    }
}

/// Rust type carried by a typed attribute.
pub trait AttributeKind: Sized {
    /// Wire type.
    const TYPE: AttributeType;

    /// Wrap into a dynamic value.
    fn into_value(self) -> AttributeValue;

    /// Unwrap a dynamic value, failing on a type mismatch.
    fn from_value(value: AttributeValue) -> Result<Self>;
}

fn type_mismatch(expected: AttributeType, actual: &AttributeValue) -> DaqError {
    DaqError::invalid_argument(
        error_codes::INVALID_ATTRIBUTE_VALUE,
        format!(
            "Attribute value has type {:?}, expected {:?}.",
            actual.attribute_type(),
            expected
        ),
    )
}

macro_rules! attribute_kind {
    ($ty:ty, $variant:ident) => {
        impl AttributeKind for $ty {
            const TYPE: AttributeType = AttributeType::$variant;

            fn into_value(self) -> AttributeValue {
                AttributeValue::$variant(self)
            }

            fn from_value(value: AttributeValue) -> Result<Self> {
                match value {
                    AttributeValue::$variant(v) => Ok(v),
                    other => Err(type_mismatch(Self::TYPE, &other)),
                }
            }
        }
    };
}

attribute_kind!(bool, Bool);
attribute_kind!(i32, I32);
attribute_kind!(u32, U32);
attribute_kind!(u64, U64);
attribute_kind!(f64, F64);
attribute_kind!(String, String);
attribute_kind!(Vec<String>, StringList);
attribute_kind!(Vec<f64>, F64List);
attribute_kind!(Timestamp, Timestamp);

/// Attribute group; selects the driver's get/set/reset entry point family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrGroup {
    /// Task-level, read-only.
    Task,
    /// Per virtual channel.
    Channel,
    /// Sample timing.
    Timing,
    /// Triggering.
    Trigger,
    /// Input stream.
    Read,
    /// Output stream.
    Write,
    /// Exported signals.
    ExportedSignal,
    /// Buffer sizes.
    Buffer,
    /// Watchdog expiration and timer.
    Watchdog,
}

impl fmt::Display for AttrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Task => "Task",
            Self::Channel => "Channel",
            Self::Timing => "Timing",
            Self::Trigger => "Triggers",
            Self::Read => "InStream",
            Self::Write => "OutStream",
            Self::ExportedSignal => "ExportSignals",
            Self::Buffer => "Buffer",
            Self::Watchdog => "Watchdog",
        };
        f.write_str(label)
    }
}

/// Object an attribute call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrTarget<'a> {
    /// The task itself.
    Task,
    /// Flattened list of virtual channel names.
    Channel(&'a str),
    /// Timing group.
    Timing,
    /// Trigger group.
    Trigger,
    /// Read group.
    Read,
    /// Write group.
    Write,
    /// Exported signal group.
    ExportedSignal,
    /// Buffer group.
    Buffer,
    /// Watchdog group; the string selects expiration-state lines, empty for the timer.
    Watchdog(&'a str),
}

impl AttrTarget<'_> {
    /// Group this target belongs to.
    pub fn group(&self) -> AttrGroup {
        match self {
            Self::Task => AttrGroup::Task,
            Self::Channel(_) => AttrGroup::Channel,
            Self::Timing => AttrGroup::Timing,
            Self::Trigger => AttrGroup::Trigger,
            Self::Read => AttrGroup::Read,
            Self::Write => AttrGroup::Write,
            Self::ExportedSignal => AttrGroup::ExportedSignal,
            Self::Buffer => AttrGroup::Buffer,
            Self::Watchdog(_) => AttrGroup::Watchdog,
        }
    }
}

/// Reflection record of one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDef {
    /// Property name as exposed by the façade.
    pub name: &'static str,
    /// Group.
    pub group: AttrGroup,
    /// Stable driver ID.
    pub id: i32,
    /// Wire type.
    pub ty: AttributeType,
}

/// Typed handle to one attribute.
#[derive(Debug)]
pub struct Attribute<T> {
    /// Property name.
    pub name: &'static str,
    /// Group.
    pub group: AttrGroup,
    /// Driver ID.
    pub id: i32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Attribute<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Attribute<T> {}

impl<T: AttributeKind> Attribute<T> {
    /// Declare an attribute.
    pub const fn new(name: &'static str, group: AttrGroup, id: i32) -> Self {
        Self {
            name,
            group,
            id,
            _marker: PhantomData,
        }
    }

    /// Reflection record.
    pub fn def(&self) -> AttributeDef {
        AttributeDef {
            name: self.name,
            group: self.group,
            id: self.id,
            ty: T::TYPE,
        }
    }
}

macro_rules! attribute_table {
    ($(
        $(#[$mmeta:meta])*
        $module:ident => $group:ident {
            $($konst:ident($name:literal, $id:literal): $ty:ty;)*
        }
    )*) => {
        $(
            $(#[$mmeta])*
            #[allow(missing_docs)]
            pub mod $module {
                use super::*;
                $(pub const $konst: Attribute<$ty> = Attribute::new($name, AttrGroup::$group, $id);)*

                /// Raw IDs, usable as match patterns.
                pub mod id {
                    $(pub const $konst: i32 = $id;)*
                }
            }
        )*

        /// Every attribute the façades expose, by group.
        pub static ATTRIBUTES: &[AttributeDef] = &[
            $($(AttributeDef {
                name: $name,
                group: AttrGroup::$group,
                id: $id,
                ty: <$ty as AttributeKind>::TYPE,
            },)*)*
        ];
    };
}

attribute_table! {
    /// Task attributes.
    task => Task {
        NAME("name", 0x1276): String;
        CHANNEL_NAMES("channel_names", 0x1273): Vec<String>;
        NUMBER_OF_CHANNELS("number_of_channels", 0x2181): u32;
        DEVICES("devices", 0x230E): Vec<String>;
        NUMBER_OF_DEVICES("number_of_devices", 0x29BA): u32;
        TASK_COMPLETE("task_complete", 0x1274): bool;
    }

    /// Channel attributes shared by every channel type.
    channel => Channel {
        CHAN_TYPE("chan_type", 0x187F): ChannelType;
        PHYSICAL_CHANNEL("physical_channel", 0x18F5): String;
        DESCRIPTION("description", 0x1926): String;
        AI_MEAS_TYPE("ai_meas_type", 0x0695): UsageTypeAI;
        AI_MAX("ai_max", 0x17DD): f64;
        AI_MIN("ai_min", 0x17DE): f64;
        AI_TERM_CFG("ai_term_cfg", 0x1097): TerminalConfiguration;
        PWR_VOLTAGE_SETPOINT("pwr_voltage_setpoint", 0x31D4): f64;
        PWR_CURRENT_SETPOINT("pwr_current_setpoint", 0x31D5): f64;
        PWR_OUTPUT_ENABLE("pwr_output_enable", 0x31D6): bool;
        AO_OUTPUT_TYPE("ao_output_type", 0x1108): UsageTypeAO;
        AO_MAX("ao_max", 0x1186): f64;
        AO_MIN("ao_min", 0x1187): f64;
        DI_NUM_LINES("di_num_lines", 0x2178): u32;
        DI_INVERT_LINES("di_invert_lines", 0x0793): bool;
        DO_NUM_LINES("do_num_lines", 0x2179): u32;
        DO_INVERT_LINES("do_invert_lines", 0x1133): bool;
        CI_MEAS_TYPE("ci_meas_type", 0x18A0): UsageTypeCI;
        CI_COUNT("ci_count", 0x0148): u32;
        CI_COUNT_EDGES_INITIAL_CNT("ci_count_edges_initial_cnt", 0x0698): u32;
        CO_OUTPUT_TYPE("co_output_type", 0x18B5): UsageTypeCO;
        CO_PULSE_FREQ("co_pulse_freq", 0x1178): f64;
        CO_PULSE_DUTY_CYC("co_pulse_duty_cyc", 0x1176): f64;
        CO_PULSE_HIGH_TIME("co_pulse_high_time", 0x18BA): f64;
        CO_PULSE_LOW_TIME("co_pulse_low_time", 0x18BB): f64;
        CO_PULSE_HIGH_TICKS("co_pulse_high_ticks", 0x1169): u32;
        CO_PULSE_LOW_TICKS("co_pulse_low_ticks", 0x1171): u32;
        CO_PULSE_IDLE_STATE("co_pulse_idle_state", 0x1170): Level;
    }

    /// Timing attributes.
    timing => Timing {
        SAMP_QUANT_SAMP_MODE("samp_quant_samp_mode", 0x1300): AcquisitionType;
        SAMP_QUANT_SAMP_PER_CHAN("samp_quant_samp_per_chan", 0x1310): u64;
        SAMP_TIMING_TYPE("samp_timing_type", 0x1347): SampleTimingType;
        SAMP_CLK_RATE("samp_clk_rate", 0x1344): f64;
        SAMP_CLK_SRC("samp_clk_src", 0x1852): String;
        SAMP_CLK_ACTIVE_EDGE("samp_clk_active_edge", 0x1301): Edge;
        SAMP_CLK_MAX_RATE("samp_clk_max_rate", 0x22C8): f64;
        CHANGE_DETECT_DI_RISING_EDGE_PHYSICAL_CHANS("change_detect_di_rising_edge_physical_chans", 0x2195): String;
        CHANGE_DETECT_DI_FALLING_EDGE_PHYSICAL_CHANS("change_detect_di_falling_edge_physical_chans", 0x2196): String;
    }

    /// Trigger attributes.
    trigger => Trigger {
        START_TRIG_TYPE("start_trig_type", 0x1393): TriggerType;
        DIG_EDGE_START_TRIG_SRC("dig_edge_start_trig_src", 0x1407): String;
        DIG_EDGE_START_TRIG_EDGE("dig_edge_start_trig_edge", 0x1404): Edge;
        ANLG_EDGE_START_TRIG_SRC("anlg_edge_start_trig_src", 0x1398): String;
        ANLG_EDGE_START_TRIG_SLOPE("anlg_edge_start_trig_slope", 0x1397): Slope;
        ANLG_EDGE_START_TRIG_LVL("anlg_edge_start_trig_lvl", 0x1396): f64;
        START_TRIG_RETRIGGERABLE("start_trig_retriggerable", 0x190F): bool;
        START_TRIG_TIMESTAMP_ENABLE("start_trig_timestamp_enable", 0x3133): bool;
        START_TRIG_TIMESTAMP_VAL("start_trig_timestamp_val", 0x3134): Timestamp;
        TIME_START_TRIG_WHEN("time_start_trig_when", 0x304D): Timestamp;
        REF_TRIG_TYPE("ref_trig_type", 0x1419): TriggerType;
        REF_TRIG_PRETRIG_SAMPLES("ref_trig_pretrig_samples", 0x1445): u32;
        DIG_EDGE_REF_TRIG_SRC("dig_edge_ref_trig_src", 0x1434): String;
        DIG_EDGE_REF_TRIG_EDGE("dig_edge_ref_trig_edge", 0x1430): Edge;
        ANLG_EDGE_REF_TRIG_SRC("anlg_edge_ref_trig_src", 0x1424): String;
        ANLG_EDGE_REF_TRIG_SLOPE("anlg_edge_ref_trig_slope", 0x1423): Slope;
        ANLG_EDGE_REF_TRIG_LVL("anlg_edge_ref_trig_lvl", 0x1422): f64;
    }

    /// Input stream attributes.
    read => Read {
        CHANNELS_TO_READ("channels_to_read", 0x1823): String;
        READ_ALL_AVAIL_SAMP("read_all_avail_samp", 0x1215): bool;
        AVAIL_SAMP_PER_CHAN("avail_samp_per_chan", 0x1223): u32;
        NUM_CHANS("num_chans", 0x217B): u32;
        DI_NUM_BOOLEANS_PER_CHAN("di_num_booleans_per_chan", 0x217C): u32;
        RAW_DATA_WIDTH("raw_data_width", 0x217A): u32;
        CURR_READ_POS("curr_read_pos", 0x1221): u64;
        TOTAL_SAMP_PER_CHAN_ACQUIRED("total_samp_per_chan_acquired", 0x192A): u64;
        LOGGING_FILE_PATH("logging_file_path", 0x2EC4): String;
        LOGGING_MODE("logging_mode", 0x2EC5): LoggingMode;
        LOGGING_TDMS_GROUP_NAME("logging_tdms_group_name", 0x2EC6): String;
        LOGGING_TDMS_OPERATION("logging_tdms_operation", 0x2EC7): LoggingOperation;
        LOGGING_PAUSE("logging_pause", 0x2FE3): bool;
        LOGGING_SAMPS_PER_FILE("logging_samps_per_file", 0x2FE4): u64;
        LOGGING_FILE_WRITE_SIZE("logging_file_write_size", 0x2FC3): u32;
        LOGGING_FILE_PREALLOCATION_SIZE("logging_file_preallocation_size", 0x2FC6): u64;
    }

    /// Output stream attributes.
    write => Write {
        NUM_CHANS("num_chans", 0x217E): u32;
        DO_NUM_BOOLEANS_PER_CHAN("do_num_booleans_per_chan", 0x217F): u32;
        REGEN_MODE("regen_mode", 0x1453): RegenerationMode;
        SPACE_AVAIL("space_avail", 0x1460): u32;
        RAW_DATA_WIDTH("raw_data_width", 0x217D): u32;
        TOTAL_SAMP_PER_CHAN_GENERATED("total_samp_per_chan_generated", 0x192B): u64;
    }

    /// Exported signal attributes.
    export => ExportedSignal {
        SAMP_CLK_OUTPUT_TERM("samp_clk_output_term", 0x1663): String;
        START_TRIG_OUTPUT_TERM("start_trig_output_term", 0x0584): String;
        REF_TRIG_OUTPUT_TERM("ref_trig_output_term", 0x0590): String;
        CTR_OUT_EVENT_OUTPUT_TERM("ctr_out_event_output_term", 0x1717): String;
    }

    /// Buffer attributes.
    buffer => Buffer {
        INPUT_BUF_SIZE("input_buf_size", 0x186C): u32;
        OUTPUT_BUF_SIZE("output_buf_size", 0x186D): u32;
    }

    /// Watchdog attributes.
    watchdog => Watchdog {
        TIMEOUT("timeout", 0x21A9): f64;
        HAS_EXPIRED("expired", 0x21A8): bool;
        DO_EXPIR_STATE("expir_states_do_state", 0x21A7): DigitalLineState;
        AO_OUTPUT_TYPE("expir_states_ao_output_type", 0x305E): WatchdogAOExpirState;
        AO_EXPIR_STATE("expir_states_ao_state", 0x305F): f64;
        CO_EXPIR_STATE("expir_states_co_state", 0x3060): WatchdogCOExpirState;
    }
}

/// Look up an attribute by group and property name.
pub fn find(group: AttrGroup, name: &str) -> Option<&'static AttributeDef> {
    ATTRIBUTES.iter().find(|def| def.group == group && def.name == name)
}

/// Look up an attribute by group and ID.
pub fn find_by_id(group: AttrGroup, id: i32) -> Option<&'static AttributeDef> {
    ATTRIBUTES.iter().find(|def| def.group == group && def.id == id)
}

/// Property names of one group, in declaration order.
pub fn property_names(group: AttrGroup) -> impl Iterator<Item = &'static str> {
    ATTRIBUTES
        .iter()
        .filter(move |def| def.group == group)
        .map(|def| def.name)
}

pub(crate) fn lookup(group: AttrGroup, name: &str) -> Result<&'static AttributeDef> {
    find(group, name).ok_or_else(|| DaqError::unknown_property(&group.to_string(), name))
}

/// Reject a value whose type differs from the attribute's declared type.
pub(crate) fn check_type(def: &AttributeDef, value: &AttributeValue) -> Result<()> {
    if value.attribute_type() == def.ty {
        Ok(())
    } else {
        Err(type_mismatch(def.ty, value))
    }
}

/// Typed accessors of a façade over `self.task`.
///
/// `getter => ATTR: Type` yields a read-only accessor; adding `, setter,
/// resetter` yields the write and reset forms too.
macro_rules! facade_properties {
    ($target:expr; $($(#[$meta:meta])* $getter:ident $(, $setter:ident, $resetter:ident)? => $attr:path : $ty:ty;)*) => {
        $(
            $(#[$meta])*
            pub fn $getter(&self) -> $crate::error::Result<$ty> {
                self.task.get($target, $attr)
            }

            $(
                #[doc = concat!("Set `", stringify!($getter), "`.")]
                pub fn $setter(&self, value: $ty) -> $crate::error::Result<()> {
                    self.task.set($target, $attr, value)
                }

                #[doc = concat!("Reset `", stringify!($getter), "` to its default.")]
                pub fn $resetter(&self) -> $crate::error::Result<()> {
                    self.task.reset($target, $attr)
                }
            )?
        )*
    };
}

pub(crate) use facade_properties;

/// By-name property access of a façade over `self.task`.
macro_rules! facade_reflection {
    ($target:expr, $group:expr) => {
        /// Names accepted by the `*_property` methods.
        pub fn property_names(&self) -> impl Iterator<Item = &'static str> {
            $crate::attributes::property_names($group)
        }

        /// Read a property by name.
        pub fn get_property(&self, name: &str) -> $crate::error::Result<$crate::attributes::AttributeValue> {
            self.task.get_property($target, name)
        }

        /// Write a property by name; the value must have the property's type.
        pub fn set_property(&self, name: &str, value: $crate::attributes::AttributeValue) -> $crate::error::Result<()> {
            self.task.set_property($target, name, value)
        }

        /// Reset a property by name.
        pub fn reset_property(&self, name: &str) -> $crate::error::Result<()> {
            self.task.reset_property($target, name)
        }
    };
}

pub(crate) use facade_reflection;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_typed_constants() {
        let def = find(AttrGroup::Timing, "samp_clk_rate").unwrap();
        assert_eq!(*def, timing::SAMP_CLK_RATE.def());
        assert_eq!(def.ty, AttributeType::F64);
    }

    #[test]
    fn test_ids_unique_within_group() {
        for (i, a) in ATTRIBUTES.iter().enumerate() {
            for b in &ATTRIBUTES[i + 1..] {
                assert!(
                    !(a.group == b.group && (a.id == b.id || a.name == b.name)),
                    "duplicate {:?} / {:?}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_enum_attributes_are_int32() {
        assert_eq!(channel::CHAN_TYPE.def().ty, AttributeType::I32);
        assert_eq!(watchdog::DO_EXPIR_STATE.def().ty, AttributeType::I32);
    }

    #[test]
    fn test_unknown_property_lookup() {
        let err = lookup(AttrGroup::Trigger, "no_such_thing").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnknownProperty);
        assert!(err.message().contains("Triggers"));
    }

    #[test]
    fn test_value_from_wrong_type() {
        let err = f64::from_value(AttributeValue::U32(3)).unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_ATTRIBUTE_VALUE);
    }

    #[test]
    fn test_property_names_by_group() {
        let names: Vec<_> = property_names(AttrGroup::Buffer).collect();
        assert_eq!(names, ["input_buf_size", "output_buf_size"]);
    }
}
