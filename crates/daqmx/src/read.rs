//! Shape-inferring reads.
//!
//! The transfer function follows the kind of the first channel read; the
//! driver rejects tasks whose read channels mix incompatible kinds. Buffers
//! are laid out group-by-channel and reshaped to one row per channel.

use tracing::trace;

use crate::attributes::{read as read_attrs, timing as timing_attrs, AttrTarget};
use crate::constants::{AcquisitionType, FillMode};
use crate::driver::{Driver, TaskHandle};
use crate::error::{error_codes, DaqError, ErrorKind, Result};
use crate::task::Task;
use crate::types::{ChannelKind, CtrFreq, CtrTick, CtrTime, NumSamples, PowerMeasurement, ReadData, Sample, SampleVec};

const FILL: FillMode = FillMode::GroupByChannel;

/// Resolve a sample count to what the driver should be asked for.
pub(crate) fn samples_to_read(task: &Task, samples: NumSamples) -> Result<u32> {
    match samples {
        NumSamples::Unset => Ok(1),
        NumSamples::Samples(n) => Ok(n),
        NumSamples::AllAvailable => {
            let mode = task.get(AttrTarget::Timing, timing_attrs::SAMP_QUANT_SAMP_MODE)?;
            if mode == AcquisitionType::Finite && !task.get(AttrTarget::Read, read_attrs::READ_ALL_AVAIL_SAMP)? {
                let total = task.get(AttrTarget::Timing, timing_attrs::SAMP_QUANT_SAMP_PER_CHAN)?;
                Ok(u32::try_from(total).unwrap_or(u32::MAX))
            } else {
                task.get(AttrTarget::Read, read_attrs::AVAIL_SAMP_PER_CHAN)
            }
        }
    }
}

/// Read `samples` from every channel the task reads.
pub(crate) fn read(task: &Task, samples: NumSamples, timeout: f64) -> Result<ReadData> {
    task.handle()?;
    let channels = task.read_channels()?;
    let Some(first) = channels.first() else {
        return Err(task.annotate(DaqError::read(
            error_codes::NO_CHANS_IN_TASK,
            "The task contains no channels to read.",
            0,
        )));
    };
    let kind = if channels.iter().any(|c| matches!(c.kind, ChannelKind::DigitalPorts(_))) {
        ChannelKind::DigitalPorts(0)
    } else {
        first.kind
    };
    let nch = channels.len();
    let unset = samples == NumSamples::Unset;
    let n = samples_to_read(task, samples)?;
    trace!(task = %task.name(), ?kind, channels = nch, samples = n, "Dynamic read");

    let request = Request { task, nch, n, timeout };
    let scalar = unset && nch == 1;
    let result = match kind {
        ChannelKind::AnalogScaled if scalar => request.scalar(|d, h| d.read_analog_scalar_f64(h, timeout), Sample::F64),
        ChannelKind::AnalogScaled => request.many(
            |d, h, buf| d.read_analog_f64(h, n, timeout, FILL, buf),
            SampleVec::F64,
        ),
        ChannelKind::AnalogPower if scalar => {
            request.scalar(|d, h| d.read_power_scalar_f64(h, timeout), Sample::Power)
        }
        ChannelKind::AnalogPower => request.many_paired(
            |d, h, voltage: &mut [f64], current: &mut [f64]| d.read_power_f64(h, n, timeout, FILL, voltage, current),
            |voltage, current| PowerMeasurement { voltage, current },
            SampleVec::Power,
        ),
        ChannelKind::DigitalLines(_) => request.lines(),
        ChannelKind::DigitalPorts(_) if scalar => {
            request.scalar(|d, h| d.read_digital_scalar_u32(h, timeout), Sample::U32)
        }
        ChannelKind::DigitalPorts(_) => request.many(
            |d, h, buf| d.read_digital_u32(h, n, timeout, FILL, buf),
            SampleVec::U32,
        ),
        ChannelKind::CounterEdges if scalar => {
            request.scalar(|d, h| d.read_counter_scalar_u32(h, timeout), Sample::U32)
        }
        ChannelKind::CounterEdges => request.many(
            |d, h, buf| d.read_counter_u32_ex(h, n, timeout, FILL, buf),
            SampleVec::U32,
        ),
        ChannelKind::CounterFloat if scalar => {
            request.scalar(|d, h| d.read_counter_scalar_f64(h, timeout), Sample::F64)
        }
        ChannelKind::CounterFloat => request.many(
            |d, h, buf| d.read_counter_f64_ex(h, n, timeout, FILL, buf),
            SampleVec::F64,
        ),
        ChannelKind::CounterPulseFreq if scalar => {
            request.scalar(|d, h| d.read_ctr_freq_scalar(h, timeout), Sample::CtrFreq)
        }
        ChannelKind::CounterPulseFreq => request.many_paired(
            |d, h, freq: &mut [f64], duty: &mut [f64]| d.read_ctr_freq(h, n, timeout, FILL, freq, duty),
            |freq, duty_cycle| CtrFreq { freq, duty_cycle },
            SampleVec::CtrFreq,
        ),
        ChannelKind::CounterPulseTime if scalar => {
            request.scalar(|d, h| d.read_ctr_time_scalar(h, timeout), Sample::CtrTime)
        }
        ChannelKind::CounterPulseTime => request.many_paired(
            |d, h, high: &mut [f64], low: &mut [f64]| d.read_ctr_time(h, n, timeout, FILL, high, low),
            |high_time, low_time| CtrTime { high_time, low_time },
            SampleVec::CtrTime,
        ),
        ChannelKind::CounterPulseTicks if scalar => {
            request.scalar(|d, h| d.read_ctr_ticks_scalar(h, timeout), Sample::CtrTick)
        }
        ChannelKind::CounterPulseTicks => request.many_paired(
            |d, h, high: &mut [u32], low: &mut [u32]| d.read_ctr_ticks(h, n, timeout, FILL, high, low),
            |high_tick, low_tick| CtrTick { high_tick, low_tick },
            SampleVec::CtrTick,
        ),
    };
    result.and_then(|rows| shape(rows, unset, nch)).map_err(|e| task.annotate(e))
}

/// Rows of one read before shaping; `Scalar` came from a scalar entry point.
enum Rows {
    Scalar(Sample),
    Channels(Vec<SampleVec>),
}

struct Request<'t> {
    task: &'t Task,
    nch: usize,
    n: u32,
    timeout: f64,
}

impl Request<'_> {
    fn len(&self) -> usize {
        self.nch * self.n as usize
    }

    fn scalar<T>(
        &self,
        call: impl FnOnce(&dyn Driver, TaskHandle) -> Result<T>,
        wrap: fn(T) -> Sample,
    ) -> Result<Rows> {
        let value = self
            .task
            .with_handle(call)
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(Rows::Scalar(wrap(value)))
    }

    /// One buffer of `T`, split into rows trimmed to the samples read.
    fn many<T: Copy + Default>(
        &self,
        call: impl FnOnce(&dyn Driver, TaskHandle, &mut [T]) -> Result<u32>,
        wrap: fn(Vec<T>) -> SampleVec,
    ) -> Result<Rows> {
        let mut buf = vec![T::default(); self.len()];
        let read = self.transfer(|d, h| call(d, h, &mut buf))?;
        Ok(Rows::Channels(self.split(&buf, read, wrap)))
    }

    /// Two parallel buffers zipped into compound samples.
    fn many_paired<A: Copy + Default, B: Copy + Default, T: Copy>(
        &self,
        call: impl FnOnce(&dyn Driver, TaskHandle, &mut [A], &mut [B]) -> Result<u32>,
        zip: fn(A, B) -> T,
        wrap: fn(Vec<T>) -> SampleVec,
    ) -> Result<Rows> {
        let mut first = vec![A::default(); self.len()];
        let mut second = vec![B::default(); self.len()];
        let read = self.transfer(|d, h| call(d, h, &mut first, &mut second))?;
        let merged: Vec<T> = first.into_iter().zip(second).map(|(a, b)| zip(a, b)).collect();
        Ok(Rows::Channels(self.split(&merged, read, wrap)))
    }

    /// Single-line digital channels, one byte per line.
    fn lines(&self) -> Result<Rows> {
        let mut buf = vec![0u8; self.len()];
        let (timeout, n) = (self.timeout, self.n);
        let read = self.transfer(|d, h| d.read_digital_lines(h, n, timeout, FILL, &mut buf).map(|(read, _)| read))?;
        let states: Vec<bool> = buf.iter().map(|&line| line != 0).collect();
        Ok(Rows::Channels(self.split(&states, read, SampleVec::Bool)))
    }

    fn transfer(&self, call: impl FnOnce(&dyn Driver, TaskHandle) -> Result<u32>) -> Result<u32> {
        self.task
            .with_handle(call)
            .map_err(|e| e.into_kind(ErrorKind::Read))
    }

    fn split<T: Copy>(&self, buf: &[T], read: u32, wrap: fn(Vec<T>) -> SampleVec) -> Vec<SampleVec> {
        let stride = self.n as usize;
        let read = (read as usize).min(stride);
        (0..self.nch)
            .map(|c| wrap(buf[c * stride..c * stride + read].to_vec()))
            .collect()
    }
}

fn shape(rows: Rows, unset: bool, nch: usize) -> Result<ReadData> {
    let rows = match rows {
        Rows::Scalar(sample) => return Ok(ReadData::Scalar(sample)),
        Rows::Channels(rows) => rows,
    };
    if !unset {
        return Ok(if nch == 1 {
            rows.into_iter().next().map_or(ReadData::Matrix(Vec::new()), ReadData::List)
        } else {
            ReadData::Matrix(rows)
        });
    }
    let firsts: Vec<Sample> = rows.iter().filter_map(|row| row.get(0)).collect();
    if firsts.len() < nch {
        return Err(DaqError::read(
            error_codes::SAMPLES_NOT_YET_AVAILABLE,
            "The read returned no samples.",
            0,
        ));
    }
    if nch == 1 {
        return Ok(ReadData::Scalar(firsts[0]));
    }
    Ok(ReadData::List(SampleVec::from_samples(&firsts)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_explicit_single_channel_is_list() {
        let rows = Rows::Channels(vec![SampleVec::F64(vec![1.0])]);
        assert_eq!(shape(rows, false, 1).unwrap(), ReadData::List(SampleVec::F64(vec![1.0])));
    }

    #[test]
    fn test_shape_unset_multi_channel_is_flat_list() {
        let rows = Rows::Channels(vec![SampleVec::Bool(vec![true]), SampleVec::Bool(vec![false])]);
        assert_eq!(
            shape(rows, true, 2).unwrap(),
            ReadData::List(SampleVec::Bool(vec![true, false]))
        );
    }

    #[test]
    fn test_shape_unset_single_channel_is_scalar() {
        let rows = Rows::Channels(vec![SampleVec::Bool(vec![true])]);
        assert_eq!(shape(rows, true, 1).unwrap(), ReadData::Scalar(Sample::Bool(true)));
    }

    #[test]
    fn test_shape_unset_without_samples_fails() {
        let rows = Rows::Channels(vec![SampleVec::U32(Vec::new())]);
        let err = shape(rows, true, 1).unwrap_err();
        assert_eq!(err.samples_transferred(), Some(0));
    }
}
