//! Typed readers that fill caller-owned buffers.
//!
//! Each reader wraps one adapter transfer with no shape inference. Buffers
//! are reused across calls, so a steady-state acquisition loop allocates
//! nothing. Multi-channel buffers are [`Array2`] of shape
//! `(channels, samples)`; single-channel buffers are slices.
//!
//! When a read fails after transferring some samples, the buffer holds
//! those samples and the error carries the count
//! ([`DaqError::samples_transferred`](crate::DaqError::samples_transferred)).
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use daqmx::{stream_readers::CounterReader, SimulatedDriver, Task, DEFAULT_TIMEOUT};
//! # fn example() -> daqmx::Result<()> {
//! let task = Task::new(Arc::new(SimulatedDriver::default()), "edges")?;
//! task.ci_channels().add_ci_count_edges_chan("SimDev1/ctr1")?;
//! let reader = CounterReader::new(&task);
//! task.start()?;
//! let count = reader.read_one_sample_uint32(DEFAULT_TIMEOUT)?;
//! # let _ = count;
//! # Ok(())
//! # }
//! ```

use ndarray::Array2;
use tracing::trace;

use crate::error::Result;
use crate::read::samples_to_read;
use crate::stream::{rows_mut, stream_common, StreamBase, FILL};
use crate::types::{CtrFreq, CtrTick, CtrTime, NumSamples, PowerMeasurement};

impl StreamBase<'_> {
    fn samples(&self, samples: impl Into<NumSamples>) -> Result<u32> {
        samples_to_read(self.task, samples.into()).map_err(|e| self.task.annotate(e))
    }

    /// Resolve the count and check a single-channel buffer.
    fn single(&self, samples: impl Into<NumSamples>, buffers: &[usize]) -> Result<u32> {
        let n = self.samples(samples)?;
        for &len in buffers {
            self.verify("Read", &[len], &[n as usize])?;
        }
        Ok(n)
    }

    /// Resolve the count and check `(channels, samples)` buffers.
    fn multi(&self, samples: impl Into<NumSamples>, shapes: &[&[usize]]) -> Result<u32> {
        let nch = self.read_channels()?;
        let n = self.samples(samples)?;
        for shape in shapes {
            self.verify("Read", shape, &[nch, n as usize])?;
        }
        trace!(task = %self.task.name(), channels = nch, samples = n, "Stream read");
        Ok(n)
    }

    /// Check one-sample buffers holding one element per channel.
    fn one_per_input(&self, lens: &[usize]) -> Result<()> {
        let nch = self.read_channels()?;
        for &len in lens {
            self.verify("Read", &[len], &[nch])?;
        }
        Ok(())
    }
}

/// Reads scaled samples from one analog input channel.
#[derive(Debug, Clone, Copy)]
pub struct AnalogSingleChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogSingleChannelReader);

impl AnalogSingleChannelReader<'_> {
    /// Read into `data`, which must hold exactly the requested samples.
    pub fn read_many_sample(&self, data: &mut [f64], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_analog_f64(h, n, timeout, FILL, data))
    }

    /// Read one scaled sample.
    pub fn read_one_sample(&self, timeout: f64) -> Result<f64> {
        self.base.read(|d, h| d.read_analog_scalar_f64(h, timeout))
    }
}

/// Reads scaled samples from several analog input channels.
#[derive(Debug, Clone, Copy)]
pub struct AnalogMultiChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogMultiChannelReader);

impl AnalogMultiChannelReader<'_> {
    /// Read into `data` of shape `(channels, samples)`.
    pub fn read_many_sample(&self, data: &mut Array2<f64>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_analog_f64(h, n, timeout, FILL, buf))
    }

    /// Read one sample per channel into `data`.
    pub fn read_one_sample(&self, data: &mut [f64], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[data.len()])?;
        self.base.read(|d, h| d.read_analog_f64(h, 1, timeout, FILL, data)).map(drop)
    }
}

/// Reads unscaled ADC codes from analog input channels.
#[derive(Debug, Clone, Copy)]
pub struct AnalogUnscaledReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(AnalogUnscaledReader);

impl AnalogUnscaledReader<'_> {
    /// Read unscaled `i16` codes into `data` of shape `(channels, samples)`.
    pub fn read_int16(&self, data: &mut Array2<i16>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_binary_i16(h, n, timeout, FILL, buf))
    }

    /// Read unscaled `u16` codes into `data` of shape `(channels, samples)`.
    pub fn read_uint16(&self, data: &mut Array2<u16>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_binary_u16(h, n, timeout, FILL, buf))
    }

    /// Read unscaled `i32` codes into `data` of shape `(channels, samples)`.
    pub fn read_int32(&self, data: &mut Array2<i32>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_binary_i32(h, n, timeout, FILL, buf))
    }

    /// Read unscaled `u32` codes into `data` of shape `(channels, samples)`.
    pub fn read_uint32(&self, data: &mut Array2<u32>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_binary_u32(h, n, timeout, FILL, buf))
    }
}

/// Reads one counter input channel.
#[derive(Debug, Clone, Copy)]
pub struct CounterReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(CounterReader);

impl CounterReader<'_> {
    /// Frequency, period, pulse width and similar measurements.
    pub fn read_many_sample_double(&self, data: &mut [f64], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_counter_f64_ex(h, n, timeout, FILL, data))
    }

    /// Edge counts.
    pub fn read_many_sample_uint32(&self, data: &mut [u32], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_counter_u32_ex(h, n, timeout, FILL, data))
    }

    /// Read frequency and duty-cycle pairs into parallel buffers.
    pub fn read_many_sample_pulse_frequency(
        &self,
        frequencies: &mut [f64],
        duty_cycles: &mut [f64],
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.single(samples, &[frequencies.len(), duty_cycles.len()])?;
        self.base
            .read(|d, h| d.read_ctr_freq(h, n, timeout, FILL, frequencies, duty_cycles))
    }

    /// Read high and low time pairs into parallel buffers.
    pub fn read_many_sample_pulse_time(
        &self,
        high_times: &mut [f64],
        low_times: &mut [f64],
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.single(samples, &[high_times.len(), low_times.len()])?;
        self.base
            .read(|d, h| d.read_ctr_time(h, n, timeout, FILL, high_times, low_times))
    }

    /// Read high and low tick pairs into parallel buffers.
    pub fn read_many_sample_pulse_ticks(
        &self,
        high_ticks: &mut [u32],
        low_ticks: &mut [u32],
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.single(samples, &[high_ticks.len(), low_ticks.len()])?;
        self.base
            .read(|d, h| d.read_ctr_ticks(h, n, timeout, FILL, high_ticks, low_ticks))
    }

    /// Read one scaled counter value.
    pub fn read_one_sample_double(&self, timeout: f64) -> Result<f64> {
        self.base.read(|d, h| d.read_counter_scalar_f64(h, timeout))
    }

    /// Read one raw count.
    pub fn read_one_sample_uint32(&self, timeout: f64) -> Result<u32> {
        self.base.read(|d, h| d.read_counter_scalar_u32(h, timeout))
    }

    /// Read one frequency and duty cycle.
    pub fn read_one_sample_pulse_frequency(&self, timeout: f64) -> Result<CtrFreq> {
        self.base.read(|d, h| d.read_ctr_freq_scalar(h, timeout))
    }

    /// Read one pair of high and low times.
    pub fn read_one_sample_pulse_time(&self, timeout: f64) -> Result<CtrTime> {
        self.base.read(|d, h| d.read_ctr_time_scalar(h, timeout))
    }

    /// Read one pair of high and low ticks.
    pub fn read_one_sample_pulse_ticks(&self, timeout: f64) -> Result<CtrTick> {
        self.base.read(|d, h| d.read_ctr_ticks_scalar(h, timeout))
    }
}

/// Reads one digital input channel, as lines or as a packed port value.
#[derive(Debug, Clone, Copy)]
pub struct DigitalSingleChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(DigitalSingleChannelReader);

impl DigitalSingleChannelReader<'_> {
    /// State of a channel holding one line.
    pub fn read_one_sample_one_line(&self, timeout: f64) -> Result<bool> {
        let mut buf = [0u8; 1];
        self.base
            .read(|d, h| d.read_digital_lines(h, 1, timeout, FILL, &mut buf))?;
        Ok(buf[0] != 0)
    }

    /// States of every line of the channel, one element per line.
    pub fn read_one_sample_multi_line(&self, data: &mut [bool], timeout: f64) -> Result<()> {
        let lines = self.base.task.in_stream().di_num_booleans_per_chan()? as usize;
        self.base.verify("Read", &[data.len()], &[lines])?;
        let mut buf = vec![0u8; data.len().max(lines)];
        self.base
            .read(|d, h| d.read_digital_lines(h, 1, timeout, FILL, &mut buf))?;
        for (state, byte) in data.iter_mut().zip(&buf) {
            *state = *byte != 0;
        }
        Ok(())
    }

    /// Read the port as `u8`.
    pub fn read_one_sample_port_byte(&self, timeout: f64) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.base.read(|d, h| d.read_digital_u8(h, 1, timeout, FILL, &mut buf))?;
        Ok(buf[0])
    }

    /// Read the port as `u16`.
    pub fn read_one_sample_port_uint16(&self, timeout: f64) -> Result<u16> {
        let mut buf = [0u16; 1];
        self.base.read(|d, h| d.read_digital_u16(h, 1, timeout, FILL, &mut buf))?;
        Ok(buf[0])
    }

    /// Read the port as `u32`.
    pub fn read_one_sample_port_uint32(&self, timeout: f64) -> Result<u32> {
        self.base.read(|d, h| d.read_digital_scalar_u32(h, timeout))
    }

    /// Read consecutive port values as `u8`.
    pub fn read_many_sample_port_byte(&self, data: &mut [u8], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_digital_u8(h, n, timeout, FILL, data))
    }

    /// Read consecutive port values as `u16`.
    pub fn read_many_sample_port_uint16(&self, data: &mut [u16], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_digital_u16(h, n, timeout, FILL, data))
    }

    /// Read consecutive port values as `u32`.
    pub fn read_many_sample_port_uint32(&self, data: &mut [u32], samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.single(samples, &[data.len()])?;
        self.base.read(|d, h| d.read_digital_u32(h, n, timeout, FILL, data))
    }
}

/// Reads several digital input channels.
#[derive(Debug, Clone, Copy)]
pub struct DigitalMultiChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(DigitalMultiChannelReader);

impl DigitalMultiChannelReader<'_> {
    /// One state per single-line channel.
    pub fn read_one_sample_one_line(&self, data: &mut [bool], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[data.len()])?;
        let mut buf = vec![0u8; data.len()];
        self.base
            .read(|d, h| d.read_digital_lines(h, 1, timeout, FILL, &mut buf))?;
        for (state, byte) in data.iter_mut().zip(&buf) {
            *state = *byte != 0;
        }
        Ok(())
    }

    /// Line states into `data` of shape `(channels, lines)`.
    ///
    /// Channels with fewer lines than the widest one read `false` in the
    /// unused columns.
    pub fn read_one_sample_multi_line(&self, data: &mut Array2<bool>, timeout: f64) -> Result<()> {
        let nch = self.base.read_channels()?;
        let lines = self.base.task.in_stream().di_num_booleans_per_chan()? as usize;
        self.base.verify("Read", data.shape(), &[nch, lines])?;
        let mut buf = vec![0u8; nch * lines];
        let (_, bytes_per_chan) = self
            .base
            .read(|d, h| d.read_digital_lines(h, 1, timeout, FILL, &mut buf))?;
        let stride = (bytes_per_chan as usize).max(1);
        for ((c, l), state) in data.indexed_iter_mut() {
            *state = l < stride && buf.get(c * stride + l).is_some_and(|b| *b != 0);
        }
        Ok(())
    }

    /// Read one `u8` port value per channel.
    pub fn read_one_sample_port_byte(&self, data: &mut [u8], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[data.len()])?;
        self.base.read(|d, h| d.read_digital_u8(h, 1, timeout, FILL, data)).map(drop)
    }

    /// Read one `u16` port value per channel.
    pub fn read_one_sample_port_uint16(&self, data: &mut [u16], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[data.len()])?;
        self.base.read(|d, h| d.read_digital_u16(h, 1, timeout, FILL, data)).map(drop)
    }

    /// Read one `u32` port value per channel.
    pub fn read_one_sample_port_uint32(&self, data: &mut [u32], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[data.len()])?;
        self.base.read(|d, h| d.read_digital_u32(h, 1, timeout, FILL, data)).map(drop)
    }

    /// Read `u8` port values into `data` of shape `(channels, samples)`.
    pub fn read_many_sample_port_byte(&self, data: &mut Array2<u8>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_digital_u8(h, n, timeout, FILL, buf))
    }

    /// Read `u16` port values into `data` of shape `(channels, samples)`.
    pub fn read_many_sample_port_uint16(&self, data: &mut Array2<u16>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_digital_u16(h, n, timeout, FILL, buf))
    }

    /// Read `u32` port values into `data` of shape `(channels, samples)`.
    pub fn read_many_sample_port_uint32(&self, data: &mut Array2<u32>, samples: impl Into<NumSamples>, timeout: f64) -> Result<u32> {
        let n = self.base.multi(samples, &[data.shape()])?;
        let buf = rows_mut(data)?;
        self.base.read(|d, h| d.read_digital_u32(h, n, timeout, FILL, buf))
    }
}

/// Reads voltage and current from one power channel.
#[derive(Debug, Clone, Copy)]
pub struct PowerSingleChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(PowerSingleChannelReader);

impl PowerSingleChannelReader<'_> {
    /// Read voltage and current pairs into parallel buffers.
    pub fn read_many_sample(
        &self,
        voltages: &mut [f64],
        currents: &mut [f64],
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.single(samples, &[voltages.len(), currents.len()])?;
        self.base
            .read(|d, h| d.read_power_f64(h, n, timeout, FILL, voltages, currents))
    }

    /// Read one voltage and current pair.
    pub fn read_one_sample(&self, timeout: f64) -> Result<PowerMeasurement> {
        self.base.read(|d, h| d.read_power_scalar_f64(h, timeout))
    }
}

/// Reads voltage and current from several power channels.
#[derive(Debug, Clone, Copy)]
pub struct PowerMultiChannelReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(PowerMultiChannelReader);

impl PowerMultiChannelReader<'_> {
    /// Read into two `(channels, samples)` arrays.
    pub fn read_many_sample(
        &self,
        voltages: &mut Array2<f64>,
        currents: &mut Array2<f64>,
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.multi(samples, &[voltages.shape(), currents.shape()])?;
        let (voltages, currents) = (rows_mut(voltages)?, rows_mut(currents)?);
        self.base
            .read(|d, h| d.read_power_f64(h, n, timeout, FILL, voltages, currents))
    }

    /// Read one voltage and current per channel.
    pub fn read_one_sample(&self, voltages: &mut [f64], currents: &mut [f64], timeout: f64) -> Result<()> {
        self.base.one_per_input(&[voltages.len(), currents.len()])?;
        self.base
            .read(|d, h| d.read_power_f64(h, 1, timeout, FILL, voltages, currents))
            .map(drop)
    }
}

/// Reads unscaled voltage and current codes from power channels.
#[derive(Debug, Clone, Copy)]
pub struct PowerBinaryReader<'a> {
    base: StreamBase<'a>,
}

stream_common!(PowerBinaryReader);

impl PowerBinaryReader<'_> {
    /// Read voltage and current codes of shape `(channels, samples)`.
    pub fn read_many_sample(
        &self,
        voltages: &mut Array2<i16>,
        currents: &mut Array2<i16>,
        samples: impl Into<NumSamples>,
        timeout: f64,
    ) -> Result<u32> {
        let n = self.base.multi(samples, &[voltages.shape(), currents.shape()])?;
        let (voltages, currents) = (rows_mut(voltages)?, rows_mut(currents)?);
        self.base
            .read(|d, h| d.read_power_binary_i16(h, n, timeout, FILL, voltages, currents))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::error::{error_codes, ErrorKind};
    use crate::task::Task;

    fn ai_task(channels: &str) -> (Arc<SimulatedDriver>, Task) {
        let driver = Arc::new(SimulatedDriver::default());
        let task = Task::new(driver.clone(), "reader").unwrap();
        task.ai_channels().add_ai_voltage_chan(channels).unwrap();
        (driver, task)
    }

    #[test]
    fn test_multi_channel_shape_is_verified() {
        let (driver, task) = ai_task("SimDev1/ai0:1");
        let reader = AnalogMultiChannelReader::new(&task);
        let mut data = Array2::<f64>::zeros((3, 10));
        let err = reader.read_many_sample(&mut data, 10u32, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("[2, 10]"));
        assert_eq!(driver.calls_to("DAQmxReadAnalogF64"), 0);
    }

    #[test]
    fn test_unverified_buffer_still_reaches_driver() {
        let (_driver, task) = ai_task("SimDev1/ai0:1");
        let mut reader = AnalogMultiChannelReader::new(&task);
        reader.set_verify_array_shape(false);
        assert!(!reader.verify_array_shape());
        let mut data = Array2::<f64>::zeros((1, 10));
        let err = reader.read_many_sample(&mut data, 10u32, 1.0).unwrap_err();
        assert_eq!(err.code(), error_codes::READ_BUFFER_TOO_SMALL);
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn test_on_demand_multi_channel_read_fills_rows() {
        let driver = Arc::new(SimulatedDriver::default());
        let ao = Task::new(driver.clone(), "ao").unwrap();
        ao.ao_channels().add_ao_voltage_chan("SimDev1/ao1").unwrap();
        ao.write(2.5, None, 1.0).unwrap();

        let task = Task::new(driver, "ai").unwrap();
        task.ai_channels().add_ai_voltage_chan("SimDev1/ai0:1").unwrap();
        let reader = AnalogMultiChannelReader::new(&task);
        let mut data = Array2::<f64>::zeros((2, 4));
        assert_eq!(reader.read_many_sample(&mut data, 4u32, 1.0).unwrap(), 4);
        assert!(data.row(1).iter().all(|v| (v - 2.5).abs() < 0.005));

        let mut one = [0.0; 2];
        reader.read_one_sample(&mut one, 1.0).unwrap();
        assert!((one[1] - 2.5).abs() < 0.005);
    }

    #[test]
    fn test_single_channel_length_must_match_request() {
        let (_driver, task) = ai_task("SimDev1/ai0");
        let reader = AnalogSingleChannelReader::new(&task);
        let mut data = [0.0; 5];
        assert!(reader.read_many_sample(&mut data, 6u32, 1.0).is_err());
        assert_eq!(reader.read_many_sample(&mut data, 5u32, 1.0).unwrap(), 5);
    }

    #[test]
    fn test_scalar_read_rejects_multiple_channels() {
        let (_driver, task) = ai_task("SimDev1/ai0:1");
        let err = AnalogSingleChannelReader::new(&task).read_one_sample(1.0).unwrap_err();
        assert_eq!(err.code(), error_codes::READ_NUM_CHANS_MISMATCH);
    }
}
