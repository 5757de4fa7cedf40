//! Sample value types and transfer shapes.

use ndarray::Array2;

use crate::constants::ChannelType;

/// Counter pulse expressed as frequency and duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CtrFreq {
    /// Frequency in hertz.
    pub freq: f64,
    /// Fraction of the period the pulse is high.
    pub duty_cycle: f64,
}

/// Counter pulse expressed as high and low time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CtrTime {
    /// Seconds high.
    pub high_time: f64,
    /// Seconds low.
    pub low_time: f64,
}

/// Counter pulse expressed as high and low tick counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CtrTick {
    /// Timebase ticks high.
    pub high_tick: u32,
    /// Timebase ticks low.
    pub low_tick: u32,
}

/// One reading from a power channel.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PowerMeasurement {
    /// Volts.
    pub voltage: f64,
    /// Amps.
    pub current: f64,
}

/// Samples per channel requested by a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumSamples {
    /// One sample; the result is scalar per channel.
    #[default]
    Unset,
    /// Exactly this many samples; the result is a list per channel.
    Samples(u32),
    /// Whatever the acquisition policy says is available.
    AllAvailable,
}

impl From<u32> for NumSamples {
    fn from(n: u32) -> Self {
        NumSamples::Samples(n)
    }
}

/// How the dynamic engine transfers data for a virtual channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Scaled `f64` analog samples.
    AnalogScaled,
    /// Paired voltage and current.
    AnalogPower,
    /// Digital lines as booleans; carries the line count.
    DigitalLines(u32),
    /// Digital lines packed into `u32`; carries the line count.
    DigitalPorts(u32),
    /// Edge counts as `u32`.
    CounterEdges,
    /// Pulse as frequency and duty cycle.
    CounterPulseFreq,
    /// Pulse as high and low time.
    CounterPulseTime,
    /// Pulse as high and low ticks.
    CounterPulseTicks,
    /// Any other counter measurement, as `f64`.
    CounterFloat,
}

/// A virtual channel with its resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedChannel {
    /// Virtual channel name.
    pub name: String,
    /// Input or output family.
    pub chan_type: ChannelType,
    /// Transfer kind.
    pub kind: ChannelKind,
}

/// One sample of any supported type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// Analog or counter double.
    F64(f64),
    /// Single digital line.
    Bool(bool),
    /// Packed digital lines or edge count.
    U32(u32),
    /// Pulse frequency.
    CtrFreq(CtrFreq),
    /// Pulse time.
    CtrTime(CtrTime),
    /// Pulse ticks.
    CtrTick(CtrTick),
    /// Power reading.
    Power(PowerMeasurement),
}

impl Sample {
    /// Value as `f64`, if that is its type.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Sample::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Value as `bool`, if that is its type.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Sample::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Value as `u32`, if that is its type.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Sample::U32(v) => Some(*v),
            _ => None,
        }
    }
}

/// Samples of one type for one channel, or one sample per channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleVec {
    /// Doubles.
    F64(Vec<f64>),
    /// Booleans.
    Bool(Vec<bool>),
    /// Unsigned integers.
    U32(Vec<u32>),
    /// Pulse frequencies.
    CtrFreq(Vec<CtrFreq>),
    /// Pulse times.
    CtrTime(Vec<CtrTime>),
    /// Pulse ticks.
    CtrTick(Vec<CtrTick>),
    /// Power readings.
    Power(Vec<PowerMeasurement>),
}

macro_rules! sample_vec_dispatch {
    ($self:expr, $v:ident => $body:expr) => {
        match $self {
            SampleVec::F64($v) => $body,
            SampleVec::Bool($v) => $body,
            SampleVec::U32($v) => $body,
            SampleVec::CtrFreq($v) => $body,
            SampleVec::CtrTime($v) => $body,
            SampleVec::CtrTick($v) => $body,
            SampleVec::Power($v) => $body,
        }
    };
}

impl SampleVec {
    /// Number of samples.
    pub fn len(&self) -> usize {
        sample_vec_dispatch!(self, v => v.len())
    }

    /// True when empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample at `index`.
    pub fn get(&self, index: usize) -> Option<Sample> {
        match self {
            SampleVec::F64(v) => v.get(index).copied().map(Sample::F64),
            SampleVec::Bool(v) => v.get(index).copied().map(Sample::Bool),
            SampleVec::U32(v) => v.get(index).copied().map(Sample::U32),
            SampleVec::CtrFreq(v) => v.get(index).copied().map(Sample::CtrFreq),
            SampleVec::CtrTime(v) => v.get(index).copied().map(Sample::CtrTime),
            SampleVec::CtrTick(v) => v.get(index).copied().map(Sample::CtrTick),
            SampleVec::Power(v) => v.get(index).copied().map(Sample::Power),
        }
    }

    /// Shorten to `len` samples.
    pub fn truncate(&mut self, len: usize) {
        sample_vec_dispatch!(self, v => v.truncate(len))
    }

    /// Doubles, if that is the element type.
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            SampleVec::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Booleans, if that is the element type.
    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            SampleVec::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Unsigned integers, if that is the element type.
    pub fn as_u32(&self) -> Option<&[u32]> {
        match self {
            SampleVec::U32(v) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            SampleVec::F64(_) => "f64",
            SampleVec::Bool(_) => "bool",
            SampleVec::U32(_) => "u32",
            SampleVec::CtrFreq(_) => "CtrFreq",
            SampleVec::CtrTime(_) => "CtrTime",
            SampleVec::CtrTick(_) => "CtrTick",
            SampleVec::Power(_) => "PowerMeasurement",
        }
    }

    /// Row holding a single sample.
    fn from_sample(sample: Sample) -> Self {
        match sample {
            Sample::F64(v) => SampleVec::F64(vec![v]),
            Sample::Bool(v) => SampleVec::Bool(vec![v]),
            Sample::U32(v) => SampleVec::U32(vec![v]),
            Sample::CtrFreq(v) => SampleVec::CtrFreq(vec![v]),
            Sample::CtrTime(v) => SampleVec::CtrTime(vec![v]),
            Sample::CtrTick(v) => SampleVec::CtrTick(vec![v]),
            Sample::Power(v) => SampleVec::Power(vec![v]),
        }
    }

    /// Row of the given samples; those whose type differs from the first are skipped.
    pub(crate) fn from_samples(samples: &[Sample]) -> Self {
        let Some((first, rest)) = samples.split_first() else {
            return SampleVec::F64(Vec::new());
        };
        let mut row = SampleVec::from_sample(*first);
        for sample in rest {
            match (&mut row, *sample) {
                (SampleVec::F64(v), Sample::F64(x)) => v.push(x),
                (SampleVec::Bool(v), Sample::Bool(x)) => v.push(x),
                (SampleVec::U32(v), Sample::U32(x)) => v.push(x),
                (SampleVec::CtrFreq(v), Sample::CtrFreq(x)) => v.push(x),
                (SampleVec::CtrTime(v), Sample::CtrTime(x)) => v.push(x),
                (SampleVec::CtrTick(v), Sample::CtrTick(x)) => v.push(x),
                (SampleVec::Power(v), Sample::Power(x)) => v.push(x),
                _ => {}
            }
        }
        row
    }
}

/// Result of a dynamic read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadData {
    /// One channel, samples unset.
    Scalar(Sample),
    /// One channel with many samples, or one sample from each of many channels.
    List(SampleVec),
    /// One row per channel.
    Matrix(Vec<SampleVec>),
}

impl ReadData {
    /// The scalar, if this is a scalar result.
    pub fn as_scalar(&self) -> Option<Sample> {
        match self {
            ReadData::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// The list, if this is a list result.
    pub fn as_list(&self) -> Option<&SampleVec> {
        match self {
            ReadData::List(v) => Some(v),
            _ => None,
        }
    }

    /// The rows, if this is a matrix result.
    pub fn as_matrix(&self) -> Option<&[SampleVec]> {
        match self {
            ReadData::Matrix(rows) => Some(rows),
            _ => None,
        }
    }

    /// Length of the outer dimension (1 for a scalar).
    pub fn len(&self) -> usize {
        match self {
            ReadData::Scalar(_) => 1,
            ReadData::List(v) => v.len(),
            ReadData::Matrix(rows) => rows.len(),
        }
    }

    /// True for an empty list or matrix.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Data passed to a dynamic write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteData {
    /// One sample for a single-channel task.
    Scalar(Sample),
    /// Samples for one channel, or one sample per channel.
    List(SampleVec),
    /// One row per channel.
    Matrix(Vec<SampleVec>),
}

impl WriteData {
    /// Normalise to one row per channel given the task's channel count.
    ///
    /// A list means samples when the task has one channel and one sample per
    /// channel otherwise.
    pub(crate) fn into_rows(self, task_channels: usize) -> Vec<SampleVec> {
        match self {
            WriteData::Scalar(s) => vec![SampleVec::from_sample(s)],
            WriteData::List(v) if task_channels == 1 => vec![v],
            WriteData::List(v) => (0..v.len())
                .filter_map(|i| v.get(i))
                .map(SampleVec::from_sample)
                .collect(),
            WriteData::Matrix(rows) => rows,
        }
    }
}

macro_rules! write_data_from {
    ($ty:ty, $variant:ident) => {
        impl From<$ty> for WriteData {
            fn from(v: $ty) -> Self {
                WriteData::Scalar(Sample::$variant(v))
            }
        }

        impl From<Vec<$ty>> for WriteData {
            fn from(v: Vec<$ty>) -> Self {
                WriteData::List(SampleVec::$variant(v))
            }
        }

        impl From<&[$ty]> for WriteData {
            fn from(v: &[$ty]) -> Self {
                WriteData::List(SampleVec::$variant(v.to_vec()))
            }
        }

        impl From<Vec<Vec<$ty>>> for WriteData {
            fn from(rows: Vec<Vec<$ty>>) -> Self {
                WriteData::Matrix(rows.into_iter().map(SampleVec::$variant).collect())
            }
        }

        impl From<Array2<$ty>> for WriteData {
            fn from(array: Array2<$ty>) -> Self {
                WriteData::Matrix(
                    array
                        .outer_iter()
                        .map(|row| SampleVec::$variant(row.to_vec()))
                        .collect(),
                )
            }
        }
    };
}

write_data_from!(f64, F64);
write_data_from!(bool, Bool);
write_data_from!(u32, U32);
write_data_from!(CtrFreq, CtrFreq);
write_data_from!(CtrTime, CtrTime);
write_data_from!(CtrTick, CtrTick);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_list_is_samples_for_single_channel() {
        let rows = WriteData::from(vec![1.0, 2.0, 3.0]).into_rows(1);
        assert_eq!(rows, vec![SampleVec::F64(vec![1.0, 2.0, 3.0])]);
    }

    #[test]
    fn test_list_is_channels_for_multi_channel() {
        let rows = WriteData::from(vec![1.0, 2.0]).into_rows(2);
        assert_eq!(
            rows,
            vec![SampleVec::F64(vec![1.0]), SampleVec::F64(vec![2.0])]
        );
    }

    #[test]
    fn test_array2_rows_are_channels() {
        let data = WriteData::from(array![[1u32, 2, 3], [4, 5, 6]]);
        let rows = data.into_rows(2);
        assert_eq!(rows[1], SampleVec::U32(vec![4, 5, 6]));
    }

    #[test]
    fn test_truncate_and_get() {
        let mut v = SampleVec::CtrTick(vec![CtrTick::default(); 4]);
        v.truncate(2);
        assert_eq!(v.len(), 2);
        assert_eq!(v.get(1), Some(Sample::CtrTick(CtrTick::default())));
        assert_eq!(v.get(2), None);
    }
}
