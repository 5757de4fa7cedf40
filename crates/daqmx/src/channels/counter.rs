use super::{collection_common, create, Channel};
use crate::constants::ChannelType;
use crate::driver::{
    ChannelSpec, CiCountEdgesChan, CiFreqChan, CiPeriodChan, CiPulseChanFreq, CiPulseChanTicks, CiPulseChanTime,
    CiPulseWidthChan, CiSemiPeriodChan, CiTwoEdgeSepChan, CoPulseChanFreq, CoPulseChanTicks, CoPulseChanTime,
};
use crate::error::Result;
use crate::task::Task;

/// Counter input channels of a task.
#[derive(Debug, Clone, Copy)]
pub struct CiChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(CiChannelCollection, ChannelType::CounterInput);

impl<'a> CiChannelCollection<'a> {
    /// Count edges; reads return `u32`.
    pub fn add_ci_count_edges_chan(&self, params: impl Into<CiCountEdgesChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiCountEdges(params.into()))
    }

    /// Measure frequency.
    pub fn add_ci_freq_chan(&self, params: impl Into<CiFreqChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiFreq(params.into()))
    }

    /// Measure period.
    pub fn add_ci_period_chan(&self, params: impl Into<CiPeriodChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiPeriod(params.into()))
    }

    /// Measure pulse width.
    pub fn add_ci_pulse_width_chan(&self, params: impl Into<CiPulseWidthChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiPulseWidth(params.into()))
    }

    /// Measure the time between consecutive edges.
    pub fn add_ci_semi_period_chan(&self, params: impl Into<CiSemiPeriodChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiSemiPeriod(params.into()))
    }

    /// Measure the time between an edge on one input and an edge on another.
    pub fn add_ci_two_edge_sep_chan(&self, params: impl Into<CiTwoEdgeSepChan>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiTwoEdgeSep(params.into()))
    }

    /// Measure pulses as frequency and duty cycle.
    pub fn add_ci_pulse_chan_freq(&self, params: impl Into<CiPulseChanFreq>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiPulseFreq(params.into()))
    }

    /// Measure pulses as high and low time.
    pub fn add_ci_pulse_chan_time(&self, params: impl Into<CiPulseChanTime>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiPulseTime(params.into()))
    }

    /// Measure pulses as high and low ticks.
    pub fn add_ci_pulse_chan_ticks(&self, params: impl Into<CiPulseChanTicks>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CiPulseTicks(params.into()))
    }
}

/// Counter output channels of a task.
///
/// The builder picks how the pulse is specified; writes on the channel must
/// then use the matching pulse type.
#[derive(Debug, Clone, Copy)]
pub struct CoChannelCollection<'a> {
    task: &'a Task,
}

collection_common!(CoChannelCollection, ChannelType::CounterOutput);

impl<'a> CoChannelCollection<'a> {
    /// Add a pulse output defined by frequency and duty cycle.
    pub fn add_co_pulse_chan_freq(&self, params: impl Into<CoPulseChanFreq>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CoPulseFreq(params.into()))
    }

    /// Add a pulse output defined by high and low times.
    pub fn add_co_pulse_chan_time(&self, params: impl Into<CoPulseChanTime>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CoPulseTime(params.into()))
    }

    /// Add a pulse output defined by timebase ticks.
    pub fn add_co_pulse_chan_ticks(&self, params: impl Into<CoPulseChanTicks>) -> Result<Channel<'a>> {
        create(self.task, ChannelSpec::CoPulseTicks(params.into()))
    }
}
