//! Typed writers that drain caller-owned buffers.
//!
//! Multi-channel data is an [`Array2`] of shape `(channels, samples)`. Unless
//! the caller says otherwise, one-sample writes start the task and
//! many-sample writes leave it for an explicit `start()`.

use ndarray::Array2;
use tracing::trace;

use crate::error::Result;
use crate::stream::{rows, samples_of, stream_common, StreamBase, FILL};

impl StreamBase<'_> {
    /// Check `(channels, samples)` data and return samples per channel.
    fn columns<T>(&self, data: &[&Array2<T>]) -> Result<u32> {
        let nch = self.write_channels()?;
        let samples = data.first().map_or(0, |a| a.ncols());
        for array in data {
            self.verify("Write", array.shape(), &[nch, samples])?;
        }
        trace!(task = %self.task.name(), channels = nch, samples, "Stream write");
        samples_of(samples)
    }

    /// Check one-sample data holding one element per channel.
    fn one_per_output(&self, lens: &[usize]) -> Result<()> {
        let nch = self.write_channels()?;
        for &len in lens {
            self.verify("Write", &[len], &[nch])?;
        }
        Ok(())
    }

    /// Check parallel single-channel arrays and return their length.
    fn parallel(&self, lens: &[usize]) -> Result<u32> {
        let samples = lens.first().copied().unwrap_or(0);
        for &len in lens {
            self.verify("Write", &[len], &[samples])?;
        }
        samples_of(samples)
    }
}

/// Writes scaled samples to one analog output channel.
#[derive(Debug, Clone, Copy)]
pub struct AnalogSingleChannelWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogSingleChannelWriter);

impl AnalogSingleChannelWriter<'_> {
    /// Write every sample in `data`. `auto_start` defaults to false.
    pub fn write_many_sample(&self, data: &[f64], auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = samples_of(data.len())?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_analog_f64(h, n, auto_start, timeout, FILL, data))
    }

    /// Write one sample. `auto_start` defaults to true.
    pub fn write_one_sample(&self, value: f64, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_analog_scalar_f64(h, auto_start, timeout, value))
    }
}

/// Writes scaled samples to several analog output channels.
#[derive(Debug, Clone, Copy)]
pub struct AnalogMultiChannelWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogMultiChannelWriter);

impl AnalogMultiChannelWriter<'_> {
    /// Write `data` of shape `(channels, samples)`. `auto_start` defaults to false.
    pub fn write_many_sample(&self, data: &Array2<f64>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_analog_f64(h, n, auto_start, timeout, FILL, buf))
    }

    /// One value per channel.
    pub fn write_one_sample(&self, data: &[f64], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        self.base.one_per_output(&[data.len()])?;
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_analog_f64(h, 1, auto_start, timeout, FILL, data))
            .map(drop)
    }
}

/// Writes unscaled DAC codes.
#[derive(Debug, Clone, Copy)]
pub struct AnalogUnscaledWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogUnscaledWriter);

impl AnalogUnscaledWriter<'_> {
    /// Write unscaled `i16` codes of shape `(channels, samples)`.
    pub fn write_int16(&self, data: &Array2<i16>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_binary_i16(h, n, auto_start, timeout, FILL, buf))
    }

    /// Write unscaled `u16` codes of shape `(channels, samples)`.
    pub fn write_uint16(&self, data: &Array2<u16>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_binary_u16(h, n, auto_start, timeout, FILL, buf))
    }

    /// Write unscaled `i32` codes of shape `(channels, samples)`.
    pub fn write_int32(&self, data: &Array2<i32>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_binary_i32(h, n, auto_start, timeout, FILL, buf))
    }

    /// Write unscaled `u32` codes of shape `(channels, samples)`.
    pub fn write_uint32(&self, data: &Array2<u32>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_binary_u32(h, n, auto_start, timeout, FILL, buf))
    }
}

/// Writes pulse specifications to one counter output channel.
#[derive(Debug, Clone, Copy)]
pub struct CounterWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(CounterWriter);

impl CounterWriter<'_> {
    /// Write frequency and duty-cycle pairs; both slices must have equal length.
    pub fn write_many_sample_pulse_frequency(
        &self,
        frequencies: &[f64],
        duty_cycles: &[f64],
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.parallel(&[frequencies.len(), duty_cycles.len()])?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_ctr_freq(h, n, auto_start, timeout, FILL, frequencies, duty_cycles))
    }

    /// Write high and low time pairs; both slices must have equal length.
    pub fn write_many_sample_pulse_time(
        &self,
        high_times: &[f64],
        low_times: &[f64],
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.parallel(&[high_times.len(), low_times.len()])?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_ctr_time(h, n, auto_start, timeout, FILL, high_times, low_times))
    }

    /// Write high and low tick pairs; both slices must have equal length.
    pub fn write_many_sample_pulse_ticks(
        &self,
        high_ticks: &[u32],
        low_ticks: &[u32],
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.parallel(&[high_ticks.len(), low_ticks.len()])?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_ctr_ticks(h, n, auto_start, timeout, FILL, high_ticks, low_ticks))
    }

    /// Write one frequency and duty cycle.
    pub fn write_one_sample_pulse_frequency(
        &self,
        frequency: f64,
        duty_cycle: f64,
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<()> {
        let value = crate::types::CtrFreq { freq: frequency, duty_cycle };
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_ctr_freq_scalar(h, auto_start, timeout, value))
    }

    /// Write one pair of high and low times.
    pub fn write_one_sample_pulse_time(
        &self,
        high_time: f64,
        low_time: f64,
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<()> {
        let value = crate::types::CtrTime { high_time, low_time };
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_ctr_time_scalar(h, auto_start, timeout, value))
    }

    /// Write one pair of high and low ticks.
    pub fn write_one_sample_pulse_ticks(
        &self,
        high_tick: u32,
        low_tick: u32,
        auto_start: Option<bool>,
        timeout: f64,
    ) -> Result<()> {
        let value = crate::types::CtrTick { high_tick, low_tick };
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_ctr_ticks_scalar(h, auto_start, timeout, value))
    }
}

/// Writes one digital output channel.
#[derive(Debug, Clone, Copy)]
pub struct DigitalSingleChannelWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(DigitalSingleChannelWriter);

impl DigitalSingleChannelWriter<'_> {
    /// Drive a single-line channel.
    pub fn write_one_sample_one_line(&self, state: bool, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_lines(h, 1, auto_start, timeout, FILL, &[u8::from(state)]))
            .map(drop)
    }

    /// One state per line of the channel.
    pub fn write_one_sample_multi_line(&self, states: &[bool], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let lines = self.base.task.out_stream().do_num_booleans_per_chan()? as usize;
        self.base.verify("Write", &[states.len()], &[lines])?;
        let bytes: Vec<u8> = states.iter().map(|&s| u8::from(s)).collect();
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_lines(h, 1, auto_start, timeout, FILL, &bytes))
            .map(drop)
    }

    /// Write a port value as `u8`.
    pub fn write_one_sample_port_byte(&self, value: u8, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_u8(h, 1, auto_start, timeout, FILL, &[value]))
            .map(drop)
    }

    /// Write a port value as `u16`.
    pub fn write_one_sample_port_uint16(&self, value: u16, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_u16(h, 1, auto_start, timeout, FILL, &[value]))
            .map(drop)
    }

    /// Write a port value as `u32`.
    pub fn write_one_sample_port_uint32(&self, value: u32, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_scalar_u32(h, auto_start, timeout, value))
    }

    /// Write consecutive port values as `u8`.
    pub fn write_many_sample_port_byte(&self, data: &[u8], auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = samples_of(data.len())?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u8(h, n, auto_start, timeout, FILL, data))
    }

    /// Write consecutive port values as `u16`.
    pub fn write_many_sample_port_uint16(&self, data: &[u16], auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = samples_of(data.len())?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u16(h, n, auto_start, timeout, FILL, data))
    }

    /// Write consecutive port values as `u32`.
    pub fn write_many_sample_port_uint32(&self, data: &[u32], auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = samples_of(data.len())?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u32(h, n, auto_start, timeout, FILL, data))
    }
}

/// Writes several digital output channels.
#[derive(Debug, Clone, Copy)]
pub struct DigitalMultiChannelWriter<'a> {
    base: StreamBase<'a>,
}

stream_common!(DigitalMultiChannelWriter);

impl DigitalMultiChannelWriter<'_> {
    /// One state per single-line channel.
    pub fn write_one_sample_one_line(&self, states: &[bool], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        self.base.one_per_output(&[states.len()])?;
        let bytes: Vec<u8> = states.iter().map(|&s| u8::from(s)).collect();
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_lines(h, 1, auto_start, timeout, FILL, &bytes))
            .map(drop)
    }

    /// Line states from `data` of shape `(channels, lines)`.
    pub fn write_one_sample_multi_line(&self, data: &Array2<bool>, auto_start: Option<bool>, timeout: f64) -> Result<()> {
        let nch = self.base.write_channels()?;
        let lines = self.base.task.out_stream().do_num_booleans_per_chan()? as usize;
        self.base.verify("Write", data.shape(), &[nch, lines])?;
        let bytes: Vec<u8> = data.iter().map(|&s| u8::from(s)).collect();
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_lines(h, 1, auto_start, timeout, FILL, &bytes))
            .map(drop)
    }

    /// Write one `u8` port value per channel.
    pub fn write_one_sample_port_byte(&self, data: &[u8], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        self.base.one_per_output(&[data.len()])?;
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_u8(h, 1, auto_start, timeout, FILL, data))
            .map(drop)
    }

    /// Write one `u16` port value per channel.
    pub fn write_one_sample_port_uint16(&self, data: &[u16], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        self.base.one_per_output(&[data.len()])?;
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_u16(h, 1, auto_start, timeout, FILL, data))
            .map(drop)
    }

    /// Write one `u32` port value per channel.
    pub fn write_one_sample_port_uint32(&self, data: &[u32], auto_start: Option<bool>, timeout: f64) -> Result<()> {
        self.base.one_per_output(&[data.len()])?;
        let auto_start = auto_start.unwrap_or(true);
        self.base
            .write(|d, h| d.write_digital_u32(h, 1, auto_start, timeout, FILL, data))
            .map(drop)
    }

    /// Write `u8` port values of shape `(channels, samples)`.
    pub fn write_many_sample_port_byte(&self, data: &Array2<u8>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u8(h, n, auto_start, timeout, FILL, buf))
    }

    /// Write `u16` port values of shape `(channels, samples)`.
    pub fn write_many_sample_port_uint16(&self, data: &Array2<u16>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u16(h, n, auto_start, timeout, FILL, buf))
    }

    /// Write `u32` port values of shape `(channels, samples)`.
    pub fn write_many_sample_port_uint32(&self, data: &Array2<u32>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        let n = self.base.columns(&[data])?;
        let buf = rows(data)?;
        let auto_start = auto_start.unwrap_or(false);
        self.base
            .write(|d, h| d.write_digital_u32(h, n, auto_start, timeout, FILL, buf))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::error::ErrorKind;
    use crate::stream_readers::{AnalogSingleChannelReader, DigitalSingleChannelReader};
    use crate::task::Task;
    use crate::types::{NumSamples, ReadData, Sample};

    #[test]
    fn test_multi_channel_rows_must_match_channels() {
        let driver = Arc::new(SimulatedDriver::default());
        let task = Task::new(driver.clone(), "ao").unwrap();
        task.ao_channels().add_ao_voltage_chan("SimDev1/ao0:1").unwrap();
        let writer = AnalogMultiChannelWriter::new(&task);
        let data = Array2::<f64>::zeros((3, 4));
        let err = writer.write_many_sample(&data, None, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(driver.calls_to("DAQmxWriteAnalogF64"), 0);
    }

    #[test]
    fn test_one_sample_write_loops_back() {
        let driver = Arc::new(SimulatedDriver::default());
        let ao = Task::new(driver.clone(), "ao").unwrap();
        ao.ao_channels().add_ao_voltage_chan("SimDev1/ao0").unwrap();
        AnalogSingleChannelWriter::new(&ao).write_one_sample(1.25, None, 1.0).unwrap();

        let ai = Task::new(driver, "ai").unwrap();
        ai.ai_channels().add_ai_voltage_chan("SimDev1/ai0").unwrap();
        let value = AnalogSingleChannelReader::new(&ai).read_one_sample(1.0).unwrap();
        assert!((value - 1.25).abs() < 0.005);
    }

    #[test]
    fn test_port_byte_write_reads_back() {
        let driver = Arc::new(SimulatedDriver::default());
        let out = Task::new(driver.clone(), "do").unwrap();
        out.do_channels().add_do_chan("SimDev1/port0").unwrap();
        DigitalSingleChannelWriter::new(&out)
            .write_one_sample_port_byte(0x3C, None, 1.0)
            .unwrap();

        let input = Task::new(driver, "di").unwrap();
        input.di_channels().add_di_chan("SimDev1/port0").unwrap();
        let reader = DigitalSingleChannelReader::new(&input);
        assert_eq!(reader.read_one_sample_port_byte(1.0).unwrap(), 0x3C);
        assert_eq!(
            input.read(NumSamples::Unset, 1.0).unwrap(),
            ReadData::Scalar(Sample::U32(0x3C))
        );
    }

    #[test]
    fn test_parallel_pulse_arrays_must_agree() {
        let driver = Arc::new(SimulatedDriver::default());
        let task = Task::new(driver, "co").unwrap();
        task.co_channels().add_co_pulse_chan_freq("SimDev1/ctr0").unwrap();
        let err = CounterWriter::new(&task)
            .write_many_sample_pulse_frequency(&[100.0, 200.0], &[0.5], None, 1.0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
