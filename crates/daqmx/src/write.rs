//! Shape-inferring writes.
//!
//! Data is normalised to one row per output channel, checked against the
//! task's channels, and flattened group-by-channel for the driver.

use tracing::trace;

use crate::constants::FillMode;
use crate::error::{error_codes, DaqError, ErrorKind, Result};
use crate::task::Task;
use crate::types::{ChannelKind, ResolvedChannel, SampleVec, WriteData};

const FILL: FillMode = FillMode::GroupByChannel;

/// Write `data` to every output channel of the task.
pub(crate) fn write(task: &Task, data: WriteData, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
    task.handle()?;
    let channels = task.write_channels();
    if channels.is_empty() {
        return Err(task.annotate(DaqError::write(
            error_codes::NO_CHANS_IN_TASK,
            "The task contains no channels to write.",
            0,
        )));
    }
    let nch = channels.len();
    let rows = data.into_rows(nch);
    if rows.len() != nch {
        return Err(task.annotate(DaqError::invalid_argument(
            error_codes::WRITE_NUM_CHANS_MISMATCH,
            format!(
                "Write cannot be performed, because the number of channels in the data does not match the number of channels in the task.\n\nNumber of Channels in Task: {nch}\nNumber of Channels in Data: {}",
                rows.len()
            ),
        )));
    }
    let plan = plan(&channels, &rows).map_err(|e| task.annotate(e))?;
    let auto_start = auto_start.unwrap_or(plan.samples == 1);
    trace!(task = %task.name(), ?plan, auto_start, "Dynamic write");

    let n = plan.samples;
    let scalar = nch == 1 && n == 1;
    let result = task.with_handle(|driver, handle| match (plan.kind, rows.as_slice()) {
        (ChannelKind::AnalogScaled, _) => {
            let data = flatten(&rows, SampleVec::as_f64)?;
            driver.write_analog_f64(handle, n, auto_start, timeout, FILL, &data)
        }
        (ChannelKind::DigitalPorts(_), [SampleVec::U32(_), ..]) => {
            let data = flatten(&rows, SampleVec::as_u32)?;
            driver.write_digital_u32(handle, n, auto_start, timeout, FILL, &data)
        }
        (ChannelKind::DigitalLines(_) | ChannelKind::DigitalPorts(_), _) => {
            let data = line_bytes(&channels, &rows, n as usize)?;
            driver.write_digital_lines(handle, n, auto_start, timeout, FILL, &data)
        }
        (ChannelKind::CounterPulseFreq, [SampleVec::CtrFreq(v)]) if scalar => driver
            .write_ctr_freq_scalar(handle, auto_start, timeout, v[0])
            .map(|()| 1),
        (ChannelKind::CounterPulseFreq, _) => {
            let pulses = flatten(&rows, |row| match row {
                SampleVec::CtrFreq(v) => Some(v.as_slice()),
                _ => None,
            })?;
            let (freq, duty): (Vec<f64>, Vec<f64>) = pulses.iter().map(|p| (p.freq, p.duty_cycle)).unzip();
            driver.write_ctr_freq(handle, n, auto_start, timeout, FILL, &freq, &duty)
        }
        (ChannelKind::CounterPulseTime, [SampleVec::CtrTime(v)]) if scalar => driver
            .write_ctr_time_scalar(handle, auto_start, timeout, v[0])
            .map(|()| 1),
        (ChannelKind::CounterPulseTime, _) => {
            let pulses = flatten(&rows, |row| match row {
                SampleVec::CtrTime(v) => Some(v.as_slice()),
                _ => None,
            })?;
            let (high, low): (Vec<f64>, Vec<f64>) = pulses.iter().map(|p| (p.high_time, p.low_time)).unzip();
            driver.write_ctr_time(handle, n, auto_start, timeout, FILL, &high, &low)
        }
        (ChannelKind::CounterPulseTicks, [SampleVec::CtrTick(v)]) if scalar => driver
            .write_ctr_ticks_scalar(handle, auto_start, timeout, v[0])
            .map(|()| 1),
        (ChannelKind::CounterPulseTicks, _) => {
            let pulses = flatten(&rows, |row| match row {
                SampleVec::CtrTick(v) => Some(v.as_slice()),
                _ => None,
            })?;
            let (high, low): (Vec<u32>, Vec<u32>) = pulses.iter().map(|p| (p.high_tick, p.low_tick)).unzip();
            driver.write_ctr_ticks(handle, n, auto_start, timeout, FILL, &high, &low)
        }
        (kind, _) => Err(DaqError::invalid_argument(
            error_codes::WRITE_CHAN_TYPE_MISMATCH,
            format!("Channels of kind {kind:?} cannot be written."),
        )),
    });
    result.map_err(|e| task.annotate(e.into_kind(ErrorKind::Write)))
}

/// Transfer decided for one write.
#[derive(Debug, Clone, Copy)]
struct Plan {
    kind: ChannelKind,
    samples: u32,
}

/// Element type a channel kind accepts, and how many elements make one sample.
fn accepted(kind: ChannelKind, row: &SampleVec) -> Option<usize> {
    match (kind, row) {
        (ChannelKind::AnalogScaled, SampleVec::F64(_)) => Some(1),
        (ChannelKind::DigitalLines(_), SampleVec::Bool(_)) => Some(1),
        (ChannelKind::DigitalPorts(_), SampleVec::U32(_)) => Some(1),
        (ChannelKind::DigitalPorts(lines), SampleVec::Bool(_)) => Some(lines.max(1) as usize),
        (ChannelKind::CounterPulseFreq, SampleVec::CtrFreq(_)) => Some(1),
        (ChannelKind::CounterPulseTime, SampleVec::CtrTime(_)) => Some(1),
        (ChannelKind::CounterPulseTicks, SampleVec::CtrTick(_)) => Some(1),
        _ => None,
    }
}

fn expected_type(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::AnalogScaled | ChannelKind::AnalogPower | ChannelKind::CounterFloat => "f64",
        ChannelKind::DigitalLines(_) => "bool",
        ChannelKind::DigitalPorts(_) => "u32, or one bool per line",
        ChannelKind::CounterEdges => "u32",
        ChannelKind::CounterPulseFreq => "CtrFreq",
        ChannelKind::CounterPulseTime => "CtrTime",
        ChannelKind::CounterPulseTicks => "CtrTick",
    }
}

/// Check every row against its channel and derive the samples per channel.
fn plan(channels: &[ResolvedChannel], rows: &[SampleVec]) -> Result<Plan> {
    let kind = channels
        .iter()
        .map(|c| c.kind)
        .find(|k| matches!(k, ChannelKind::DigitalPorts(_)))
        .unwrap_or(channels[0].kind);
    let mut samples = None;
    for (chan, row) in channels.iter().zip(rows) {
        let Some(per_sample) = accepted(chan.kind, row) else {
            return Err(DaqError::invalid_argument(
                error_codes::WRITE_CHAN_TYPE_MISMATCH,
                format!(
                    "Write cannot be performed, because the data type {} does not match channel '{}', which expects {}.",
                    row.type_name(),
                    chan.name,
                    expected_type(chan.kind)
                ),
            ));
        };
        if row.len() % per_sample != 0 {
            return Err(DaqError::invalid_argument(
                error_codes::NUM_SAMPS_WRONG,
                format!(
                    "Channel '{}' has {per_sample} lines, but {} booleans were given.",
                    chan.name,
                    row.len()
                ),
            ));
        }
        let count = row.len() / per_sample;
        match samples {
            None => samples = Some(count),
            Some(expected) if expected != count => {
                return Err(DaqError::invalid_argument(
                    error_codes::NUM_SAMPS_WRONG,
                    format!(
                        "Every channel must receive the same number of samples; channel '{}' received {count}, expected {expected}.",
                        chan.name
                    ),
                ));
            }
            Some(_) => {}
        }
    }
    let samples = samples.unwrap_or(0);
    if samples == 0 {
        return Err(DaqError::invalid_argument(
            error_codes::NUM_SAMPS_WRONG,
            "Write cannot be performed, because the data contains no samples.",
        ));
    }
    let samples = u32::try_from(samples).map_err(|_| {
        DaqError::invalid_argument(error_codes::NUM_SAMPS_WRONG, "Too many samples for one write.")
    })?;
    Ok(Plan { kind, samples })
}

/// Concatenate rows of one element type.
fn flatten<T: Copy>(rows: &[SampleVec], view: impl Fn(&SampleVec) -> Option<&[T]>) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(rows.iter().map(SampleVec::len).sum());
    for row in rows {
        let values = view(row).ok_or_else(|| {
            DaqError::invalid_argument(
                error_codes::WRITE_CHAN_TYPE_MISMATCH,
                format!("Rows of a write must share one data type; found {}.", row.type_name()),
            )
        })?;
        out.extend_from_slice(values);
    }
    Ok(out)
}

/// One byte per line, `bytes_per_chan` bytes per sample, group-by-channel.
fn line_bytes(channels: &[ResolvedChannel], rows: &[SampleVec], samples: usize) -> Result<Vec<u8>> {
    let lines_of = |kind: ChannelKind| match kind {
        ChannelKind::DigitalPorts(lines) => lines.max(1) as usize,
        _ => 1,
    };
    let bytes_per_chan = channels.iter().map(|c| lines_of(c.kind)).max().unwrap_or(1);
    let mut out = vec![0u8; channels.len() * samples * bytes_per_chan];
    for (c, (chan, row)) in channels.iter().zip(rows).enumerate() {
        let SampleVec::Bool(states) = row else {
            return Err(DaqError::invalid_argument(
                error_codes::WRITE_CHAN_TYPE_MISMATCH,
                format!("Channel '{}' expects booleans.", chan.name),
            ));
        };
        let lines = lines_of(chan.kind);
        for s in 0..samples {
            let base = (c * samples + s) * bytes_per_chan;
            for l in 0..lines {
                out[base + l] = u8::from(states[s * lines + l]);
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ChannelType;

    fn chan(name: &str, kind: ChannelKind) -> ResolvedChannel {
        ResolvedChannel {
            name: name.into(),
            chan_type: ChannelType::DigitalOutput,
            kind,
        }
    }

    #[test]
    fn test_bool_list_fills_port_lines() {
        let channels = [chan("port", ChannelKind::DigitalPorts(8))];
        let rows = [SampleVec::Bool(vec![true, false, true, false, false, true, false, true])];
        let plan = plan(&channels, &rows).unwrap();
        assert_eq!(plan.samples, 1);
        assert_eq!(line_bytes(&channels, &rows, 1).unwrap(), vec![1, 0, 1, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn test_partial_port_sample_rejected() {
        let channels = [chan("port", ChannelKind::DigitalPorts(8))];
        let rows = [SampleVec::Bool(vec![true; 5])];
        let err = plan(&channels, &rows).unwrap_err();
        assert_eq!(err.code(), error_codes::NUM_SAMPS_WRONG);
    }

    #[test]
    fn test_single_line_needs_bool() {
        let channels = [chan("line", ChannelKind::DigitalLines(1))];
        let err = plan(&channels, &[SampleVec::U32(vec![1])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().contains("bool"));
    }

    #[test]
    fn test_pulse_kind_must_match() {
        let mut time = chan("ctr", ChannelKind::CounterPulseTime);
        time.chan_type = ChannelType::CounterOutput;
        let err = plan(&[time], &[SampleVec::CtrFreq(vec![Default::default()])]).unwrap_err();
        assert!(err.message().contains("CtrTime"));
    }

    #[test]
    fn test_uneven_rows_rejected() {
        let channels = [chan("a", ChannelKind::DigitalLines(1)), chan("b", ChannelKind::DigitalLines(1))];
        let rows = [SampleVec::Bool(vec![true, false]), SampleVec::Bool(vec![true])];
        assert!(plan(&channels, &rows).is_err());
    }
}
