//! In-memory driver with loopback devices.
//!
//! [`SimulatedDriver`] implements the whole [`Driver`] surface without
//! hardware. Analog outputs drive the analog input of the same index,
//! digital lines read back what was written, and counter `ctrK` measures
//! the pulse generated on `ctr(K-1)`. Sample-clocked tasks advance in real
//! time and fire their events from a worker thread.
//!
//! Every entry point is recorded, so tests can count calls:
//!
//! ```
//! use daqmx::driver::{Driver, SimulatedDriver};
//!
//! let driver = SimulatedDriver::default();
//! let (task, _) = driver.create_task("counted").unwrap();
//! driver.clear_task(task).unwrap();
//! assert_eq!(driver.calls_to("DAQmxClearTask"), 1);
//! ```

mod codes;
/// Simulated device catalog.
pub mod devices;
mod state;
mod worker;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::{Condvar, Mutex, MutexGuard};

use self::codes::{decode, encode, RawCode, POWER_CURRENT_RANGE, POWER_VOLTAGE_RANGE};
pub use self::devices::SimDevice;
use self::devices::{resolve_physical, Resource};
use self::state::{
    invalid_task, timestamps_disabled, ExpirAction, ExpirationEntry, RunClock, SavedTask, SimChannel, SimState,
    SimTask, TaskState, WatchdogState,
};
use self::worker::{new_slot, spawn_clock, EveryNSlot, SignalSlot, SimEventHandler};
use super::{
    ChannelSpec, DoneCallback, Driver, EventHandler, EveryNSamplesCallback, SignalCallback, TaskHandle, TimingConfig,
    TriggerConfig,
};
use crate::attributes::{self, export, read, timing, trigger, watchdog, AttrGroup, AttrTarget, Attribute};
use crate::attributes::{AttributeKind, AttributeType, AttributeValue};
use crate::constants::*;
use crate::error::{error_codes, DaqError, Result};
use crate::names::unflatten_channel_string;
use crate::timestamp::Timestamp;
use crate::types::{CtrFreq, CtrTick, CtrTime, PowerMeasurement};

const WAIT_SLICE: Duration = Duration::from_millis(5);

/// One recorded driver entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    /// Vendor function name, e.g. `DAQmxStartTask`.
    pub function: &'static str,
    /// Task the call addressed.
    pub task: Option<TaskHandle>,
}

pub(crate) struct SimInner {
    devices: Vec<SimDevice>,
    state: Mutex<SimState>,
    cond: Condvar,
    calls: Mutex<Vec<CallRecord>>,
    last_created_supported: AtomicBool,
}

impl SimInner {
    fn record(&self, function: &'static str, task: Option<TaskHandle>) {
        tracing::trace!(function, task = ?task, "Simulated driver call");
        self.calls.lock().push(CallRecord { function, task });
    }

    fn epoch_is(&self, handle: TaskHandle, epoch: u64) -> bool {
        self.state
            .lock()
            .tasks
            .get(&handle)
            .is_some_and(|t| t.epoch == epoch && t.state == TaskState::Running)
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        let mut state = self.state.lock();
        state.poll_watchdogs(Instant::now());
        state
    }

    /// Wait on the condition variable; false once `deadline` has passed.
    fn wait(&self, guard: &mut MutexGuard<'_, SimState>, deadline: Option<Instant>) -> bool {
        let now = Instant::now();
        let step = match deadline {
            Some(d) if d <= now => return false,
            Some(d) => (d - now).min(WAIT_SLICE),
            None => WAIT_SLICE,
        };
        self.cond.wait_for(guard, step);
        true
    }
}

/// Driver adapter backed by simulated devices.
#[derive(Clone)]
pub struct SimulatedDriver {
    inner: Arc<SimInner>,
}

impl fmt::Debug for SimulatedDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedDriver")
            .field("devices", &self.inner.devices)
            .field("tasks", &self.inner.state.lock().tasks.len())
            .finish()
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new(vec![SimDevice::new("SimDev1")])
    }
}

impl SimulatedDriver {
    /// Driver exposing the given devices.
    pub fn new(devices: Vec<SimDevice>) -> Self {
        tracing::info!(devices = devices.len(), "Simulated driver created");
        Self {
            inner: Arc::new(SimInner {
                devices,
                state: Mutex::new(SimState::default()),
                cond: Condvar::new(),
                calls: Mutex::new(Vec::new()),
                last_created_supported: AtomicBool::new(true),
            }),
        }
    }

    /// Simulated devices.
    pub fn devices(&self) -> &[SimDevice] {
        &self.inner.devices
    }

    /// Make `last_created_channel` fail as older driver versions do.
    pub fn set_last_created_channel_supported(&self, supported: bool) {
        self.inner
            .last_created_supported
            .store(supported, Ordering::Relaxed);
    }

    /// Store a global channel that `add_global_chans_to_task` can add.
    pub fn add_global_channel(&self, name: &str, spec: ChannelSpec) -> Result<()> {
        let channels = self.build_channels(&spec, Some(name))?;
        self.inner
            .lock()
            .global_channels
            .insert(name.to_ascii_lowercase(), channels);
        Ok(())
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        self.inner.calls.lock().clone()
    }

    /// Number of calls to `function`.
    pub fn calls_to(&self, function: &str) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|c| c.function == function)
            .count()
    }

    /// Number of calls addressing `task`.
    pub fn calls_on(&self, task: TaskHandle) -> usize {
        self.inner
            .calls
            .lock()
            .iter()
            .filter(|c| c.task == Some(task))
            .count()
    }

    /// Forget the recorded calls.
    pub fn clear_calls(&self) {
        self.inner.calls.lock().clear();
    }

    /// Tasks not yet cleared.
    pub fn live_tasks(&self) -> usize {
        self.inner.state.lock().tasks.len()
    }

    /// Options a task was saved with.
    pub fn saved_task_options(&self, name: &str) -> Option<SaveOptions> {
        self.inner
            .state
            .lock()
            .saved
            .get(&name.to_ascii_lowercase())
            .map(|t| t.options)
    }

    /// Author a task was saved with.
    pub fn saved_task_author(&self, name: &str) -> Option<String> {
        self.inner
            .state
            .lock()
            .saved
            .get(&name.to_ascii_lowercase())
            .map(|t| t.author.clone())
    }

    fn build_channels(&self, spec: &ChannelSpec, forced_name: Option<&str>) -> Result<Vec<SimChannel>> {
        validate_spec(spec)?;
        let physical = spec.physical().trim();
        let tokens = resolve_physical(&self.inner.devices, physical)?;
        for token in &tokens {
            if !token.resources.iter().all(|r| resource_fits(spec, r)) {
                return Err(DaqError::driver(
                    error_codes::PHYSICAL_CHAN_DOES_NOT_EXIST,
                    format!(
                        "Physical channel cannot be used for {}.\n\nPhysical Channel Name: {}",
                        spec.function_name(),
                        token.name
                    ),
                ));
            }
        }
        let assigned = forced_name.unwrap_or(spec.assigned_name()).trim();
        let channel = |name: String, device: &str, physical: String, resources: Vec<Resource>| SimChannel {
            name,
            spec: spec.clone(),
            device: device.to_string(),
            physical,
            resources,
            overrides: Default::default(),
        };

        let channels = match spec.line_grouping() {
            Some(LineGrouping::ChanForAllLines) => {
                let first = &tokens[0];
                if tokens.iter().any(|t| t.device != first.device) {
                    return Err(DaqError::driver(
                        error_codes::PHYSICAL_CHAN_DOES_NOT_EXIST,
                        "Lines grouped into one channel must belong to one device.",
                    ));
                }
                let name = if !assigned.is_empty() {
                    assigned.to_string()
                } else if tokens.len() > 1 {
                    format!("{}...", first.name)
                } else {
                    physical.to_string()
                };
                let resources = tokens.iter().flat_map(|t| t.resources.iter().copied()).collect();
                vec![channel(name, &first.device, physical.to_string(), resources)]
            }
            Some(LineGrouping::ChanPerLine) => {
                let lines: Vec<(String, String, Resource)> = tokens
                    .iter()
                    .flat_map(|t| {
                        let single = t.resources.len() == 1;
                        t.resources.iter().map(move |r| {
                            let name = match r {
                                Resource::Line { port, line } if !single => {
                                    format!("{}/port{port}/line{line}", t.device)
                                }
                                _ => t.name.clone(),
                            };
                            (name, t.device.clone(), *r)
                        })
                    })
                    .collect();
                let numbered = lines.len() > 1;
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, (line, device, r))| {
                        let name = match (assigned.is_empty(), numbered) {
                            (true, _) => line.clone(),
                            (false, true) => format!("{assigned}{i}"),
                            (false, false) => assigned.to_string(),
                        };
                        channel(name, &device, line, vec![r])
                    })
                    .collect()
            }
            None => {
                let numbered = tokens.len() > 1;
                tokens
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let name = match (assigned.is_empty(), numbered) {
                            (true, _) => t.name.clone(),
                            (false, true) => format!("{assigned}{i}"),
                            (false, false) => assigned.to_string(),
                        };
                        channel(name, &t.device, t.name.clone(), t.resources.clone())
                    })
                    .collect()
            }
        };
        Ok(channels)
    }

    fn insert_channels(&self, state: &mut SimState, handle: TaskHandle, channels: Vec<SimChannel>) -> Result<()> {
        let task = state.task_mut(handle)?;
        if task.state == TaskState::Running {
            return Err(running(&task.name));
        }
        for chan in &channels {
            if task.channels.iter().any(|c| c.name.eq_ignore_ascii_case(&chan.name)) {
                return Err(DaqError::driver(
                    error_codes::DUPLICATE_TASK,
                    format!("Virtual channel name is already used in the task.\n\nChannel Name: {}", chan.name),
                )
                .with_task_name(&task.name));
            }
        }
        let names: Vec<&str> = channels.iter().map(|c| c.name.as_str()).collect();
        let created = crate::names::flatten_channel_string(&names);
        tracing::debug!(task = %task.name, channels = %created, "Simulated channels created");
        task.channels.extend(channels);
        task.state = TaskState::Unverified;
        state.last_created = Some(created);
        Ok(())
    }

    fn new_task(&self, state: &mut SimState, name: &str) -> Result<TaskHandle> {
        let name = if name.trim().is_empty() {
            state.unnamed += 1;
            format!("_unnamedTask<{}>", state.unnamed - 1)
        } else {
            name.trim().to_string()
        };
        if state.name_in_use(&name) {
            return Err(DaqError::driver(
                error_codes::DUPLICATE_TASK,
                format!("Task cannot be created because a task with this name already exists.\n\nTask Name: {name}"),
            ));
        }
        state.next_handle += 1;
        let handle = TaskHandle::from_raw(state.next_handle);
        tracing::info!(task = %name, %handle, "Simulated task created");
        state.tasks.insert(handle, SimTask::new(name));
        Ok(handle)
    }

    fn start_locked(&self, state: &mut SimState, handle: TaskHandle) -> Result<()> {
        let task = state.task_mut(handle)?;
        if task.state == TaskState::Running {
            return Err(running(&task.name));
        }
        if task.channels.is_empty() && task.watchdog.is_none() {
            return Err(no_channels(&task.name));
        }
        if task.state != TaskState::Done {
            task.resting = task.state.max(TaskState::Verified);
        }
        let now = Instant::now();
        let delay = start_delay(task);
        task.state = TaskState::Running;
        task.epoch += 1;
        task.read_pos = 0;
        task.started_at = Some(now + delay);
        task.started_wall = Some(Utc::now() + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()));
        task.clock = None;
        if let Some(wd) = task.watchdog.as_mut() {
            wd.armed_at = Some(now);
        }
        if task.is_clocked() {
            let total = match task.sample_mode() {
                AcquisitionType::Finite => Some(task.samps_per_chan()),
                _ => None,
            };
            task.clock = Some(RunClock {
                started_at: now + delay,
                rate: task.rate(),
                total,
            });
            task.worker = Some(spawn_clock(self.inner.clone(), handle, task.epoch)?);
        }
        tracing::info!(task = %task.name, %handle, "Simulated task started");
        Ok(())
    }

    fn stop_locked(state: &mut SimState, handle: TaskHandle) -> Result<Option<JoinHandle<()>>> {
        let task = state.task_mut(handle)?;
        if matches!(task.state, TaskState::Running | TaskState::Done) {
            task.state = task.resting;
            tracing::info!(task = %task.name, %handle, "Simulated task stopped");
        }
        task.epoch += 1;
        task.clock = None;
        task.started_at = None;
        if let Some(wd) = task.watchdog.as_mut() {
            wd.armed_at = None;
        }
        Ok(task.worker.take())
    }

    fn join_worker(&self, worker: Option<JoinHandle<()>>) {
        self.inner.cond.notify_all();
        if let Some(worker) = worker {
            // A callback may stop or clear its own task from the worker thread.
            if worker.thread().id() != thread::current().id() && worker.join().is_err() {
                tracing::warn!("Simulated clock thread panicked");
            }
        }
    }

    fn acquire(&self, handle: TaskHandle, function: &'static str, request: ReadRequest) -> Result<Acquired> {
        self.inner.record(function, Some(handle));
        let deadline = deadline(request.timeout);
        let mut state = self.inner.lock();

        let task = state.task(handle)?;
        let indices = task.read_indices();
        let task_name = task.name.clone();
        if indices.is_empty() {
            return Err(DaqError::read(
                error_codes::READ_CHAN_TYPE_MISMATCH,
                "The task has no input channels to read.",
                0,
            )
            .with_task_name(&task_name));
        }
        if let Some(chan) = indices
            .iter()
            .map(|&i| &task.channels[i])
            .find(|c| !request.transfer.reads(c))
        {
            return Err(DaqError::read(
                error_codes::READ_CHAN_TYPE_MISMATCH,
                format!("{function} cannot read the channel type of the task.\n\nChannel Name: {}", chan.name),
                0,
            )
            .with_task_name(&task_name));
        }
        if request.scalar && indices.len() > 1 {
            return Err(DaqError::read(
                error_codes::READ_NUM_CHANS_MISMATCH,
                format!("{function} reads one channel, but the task reads {}.", indices.len()),
                0,
            )
            .with_task_name(&task_name));
        }
        let slot = match request.transfer {
            Transfer::Lines => indices
                .iter()
                .map(|&i| task.channels[i].resources.len())
                .max()
                .unwrap_or(1),
            Transfer::Raw => raw_width(&task.channels[indices[0]]),
            _ => 1,
        };
        let samps = request.samps as usize;
        if request.capacity < samps * indices.len() * slot {
            return Err(DaqError::read(
                error_codes::READ_BUFFER_TOO_SMALL,
                format!(
                    "Buffer holds {} elements; the read needs {}.",
                    request.capacity,
                    samps * indices.len() * slot
                ),
                0,
            )
            .with_task_name(&task_name));
        }

        let mut error = None;
        let taken = if task.is_clocked() {
            if !matches!(task.state, TaskState::Running | TaskState::Done) {
                self.start_locked(&mut state, handle)?;
            }
            let epoch = state.task(handle)?.epoch;
            loop {
                let task = state.task(handle)?;
                if task.epoch != epoch {
                    return Err(DaqError::read(
                        error_codes::INVALID_TASK_STATE,
                        "The task was stopped while the read was waiting.",
                        0,
                    )
                    .with_task_name(&task_name));
                }
                let available = task.available(Instant::now());
                if available >= u64::from(request.samps) {
                    break request.samps;
                }
                let finished = task.state == TaskState::Done
                    || task.clock.is_some_and(|c| c.total.is_some_and(|t| c.produced(Instant::now()) >= t));
                if finished {
                    let partial = available as u32;
                    error = Some(DaqError::read(
                        error_codes::SAMPLES_NOT_YET_AVAILABLE,
                        "Some or all of the samples requested are beyond the end of the finite acquisition.",
                        partial,
                    ));
                    break partial;
                }
                if !self.inner.wait(&mut state, deadline) {
                    let partial = state.task(handle)?.available(Instant::now()).min(u64::from(request.samps)) as u32;
                    error = Some(DaqError::read(
                        error_codes::OPERATION_TIMED_OUT,
                        format!("{function} timed out before the requested samples were acquired."),
                        partial,
                    ));
                    break partial;
                }
            }
        } else {
            request.samps
        };

        let now = Instant::now();
        let task = state.task(handle)?;
        let indices = task.read_indices();
        let mut values = Vec::with_capacity(indices.len());
        let mut ranges = Vec::with_capacity(indices.len());
        for &i in &indices {
            let chan = &task.channels[i];
            values.push(state.sample(chan, request.transfer, now));
            ranges.push(analog_range(chan));
        }
        state.task_mut(handle)?.read_pos += u64::from(taken);
        tracing::trace!(task = %task_name, samples = taken, "Simulated read");
        Ok(Acquired {
            values,
            ranges,
            requested: request.samps,
            taken,
            slot,
            error: error.map(|e| e.with_task_name(&task_name)),
        })
    }

    fn emit(
        &self,
        handle: TaskHandle,
        function: &'static str,
        transfer: Transfer,
        request: WriteRequest,
        apply: impl FnOnce(&mut SimState, &[(usize, SimChannel)]) -> Result<()>,
    ) -> Result<u32> {
        self.inner.record(function, Some(handle));
        let mut state = self.inner.lock();
        let task = state.task(handle)?;
        let task_name = task.name.clone();
        let outputs: Vec<(usize, SimChannel)> = task
            .output_indices()
            .into_iter()
            .map(|i| (i, task.channels[i].clone()))
            .collect();
        if outputs.is_empty() || outputs.iter().any(|(_, c)| !transfer.writes(c)) {
            return Err(DaqError::write(
                error_codes::WRITE_CHAN_TYPE_MISMATCH,
                format!("{function} cannot write the channel types of the task."),
                0,
            )
            .with_task_name(&task_name));
        }
        let slot = match transfer {
            Transfer::Lines => outputs.iter().map(|(_, c)| c.resources.len()).max().unwrap_or(1),
            Transfer::Raw => raw_width(&outputs[0].1),
            _ => 1,
        };
        let needed = request.samps as usize * outputs.len() * slot;
        if request.len < needed {
            return Err(DaqError::write(
                error_codes::WRITE_NUM_CHANS_MISMATCH,
                format!(
                    "Write data holds {} elements; {} samples for {} channels need {needed}.",
                    request.len,
                    request.samps,
                    outputs.len()
                ),
                0,
            )
            .with_task_name(&task_name));
        }
        if request.samps > 0 {
            apply(&mut *state, &outputs[..]).map_err(|e| e.with_task_name(&task_name))?;
        }

        let task = state.task_mut(handle)?;
        task.written += u64::from(request.samps);
        let start = request.auto_start && task.is_clocked() && task.state != TaskState::Running;
        if start {
            self.start_locked(&mut state, handle)?;
        }
        tracing::trace!(task = %task_name, samples = request.samps, "Simulated write");
        Ok(request.samps)
    }

    fn write_pulses(
        &self,
        handle: TaskHandle,
        function: &'static str,
        transfer: Transfer,
        request: WriteRequest,
        fill: FillMode,
        pulse: impl Fn(usize) -> [(i32, AttributeValue); 2],
    ) -> Result<u32> {
        let samps = request.samps as usize;
        self.emit(handle, function, transfer, request, |state, outputs| {
            let nch = outputs.len();
            for (c, (i, _)) in outputs.iter().enumerate() {
                let last = position(fill, c, samps - 1, nch, samps);
                let chan = &mut state.task_mut(handle)?.channels[*i];
                for (id, value) in pulse(last) {
                    chan.overrides.insert(id, value);
                }
            }
            Ok(())
        })
    }
}

fn running(task_name: &str) -> DaqError {
    DaqError::driver(
        error_codes::INVALID_TASK_STATE,
        "Specified operation cannot be performed while the task is running.",
    )
    .with_task_name(task_name)
}

fn no_channels(task_name: &str) -> DaqError {
    DaqError::driver(
        error_codes::NO_CHANS_IN_TASK,
        "Task contains no channels. Add a channel before starting the task.",
    )
    .with_task_name(task_name)
}

fn not_watchdog(task_name: &str) -> DaqError {
    DaqError::driver(
        error_codes::INVALID_TASK_STATE,
        "The operation is only valid on a watchdog timer task.",
    )
    .with_task_name(task_name)
}

fn validate_spec(spec: &ChannelSpec) -> Result<()> {
    let range = match spec {
        ChannelSpec::AiVoltage(c) => Some((c.min_val, c.max_val)),
        ChannelSpec::AiCurrent(c) => Some((c.min_val, c.max_val)),
        ChannelSpec::AiThermocouple(c) => Some((c.min_val, c.max_val)),
        ChannelSpec::AoVoltage(c) => Some((c.min_val, c.max_val)),
        ChannelSpec::AoCurrent(c) => Some((c.min_val, c.max_val)),
        ChannelSpec::CoPulseFreq(c) if c.freq <= 0.0 || !(0.0..=1.0).contains(&c.duty_cycle) => {
            return Err(DaqError::driver(
                error_codes::INVALID_ATTRIBUTE_VALUE,
                "Pulse frequency must be positive and duty cycle within [0, 1].",
            ))
        }
        _ => None,
    };
    match range {
        Some((min, max)) if min >= max => Err(DaqError::driver(
            error_codes::INVALID_ATTRIBUTE_VALUE,
            format!("Minimum value {min} must be less than maximum value {max}."),
        )),
        _ => Ok(()),
    }
}

fn resource_fits(spec: &ChannelSpec, resource: &Resource) -> bool {
    match (spec, resource) {
        (ChannelSpec::AiPower(_), Resource::Power(_)) => true,
        (ChannelSpec::AiPower(_), _) => false,
        (_, Resource::Ai(_)) => spec.chan_type() == ChannelType::AnalogInput,
        (_, Resource::Ao(_)) => spec.chan_type() == ChannelType::AnalogOutput,
        (_, Resource::Line { .. }) => spec.line_grouping().is_some(),
        (_, Resource::Ctr(_)) => matches!(
            spec.chan_type(),
            ChannelType::CounterInput | ChannelType::CounterOutput
        ),
        (_, Resource::Power(_)) => false,
    }
}

fn start_delay(task: &SimTask) -> Duration {
    if task.setting(trigger::START_TRIG_TYPE) != Some(TriggerType::Time) {
        return Duration::ZERO;
    }
    task.setting(trigger::TIME_START_TRIG_WHEN)
        .and_then(|when| when.to_datetime())
        .and_then(|when| (when - Utc::now()).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

fn deadline(timeout: f64) -> Option<Instant> {
    (timeout >= 0.0).then(|| Instant::now() + Duration::from_secs_f64(timeout))
}

/// Buffer index of sample `s` of channel `c`.
fn position(fill: FillMode, c: usize, s: usize, nch: usize, samps: usize) -> usize {
    match fill {
        FillMode::GroupByChannel => c * samps + s,
        FillMode::GroupByScanNumber => s * nch + c,
    }
}

fn raw_width(chan: &SimChannel) -> usize {
    match chan.chan_type() {
        ChannelType::AnalogInput | ChannelType::AnalogOutput => 2,
        _ => 4,
    }
}

fn analog_range(chan: &SimChannel) -> (f64, f64) {
    let bound = |id| match chan.value(id) {
        Some(AttributeValue::F64(v)) => Some(v),
        _ => None,
    };
    match chan.chan_type() {
        ChannelType::AnalogInput => (
            bound(attributes::channel::id::AI_MIN).unwrap_or(-10.0),
            bound(attributes::channel::id::AI_MAX).unwrap_or(10.0),
        ),
        ChannelType::AnalogOutput => (
            bound(attributes::channel::id::AO_MIN).unwrap_or(-10.0),
            bound(attributes::channel::id::AO_MAX).unwrap_or(10.0),
        ),
        _ => (0.0, 1.0),
    }
}

fn put<T: AttributeKind>(task: &mut SimTask, attr: Attribute<T>, value: T) {
    task.overrides.insert((attr.group, attr.id), value.into_value());
}

/// Entry point family of an attribute call.
fn attribute_function(verb: usize, group: AttrGroup) -> &'static str {
    const NAMES: [[&str; 3]; 9] = [
        ["DAQmxGetTaskAttribute", "DAQmxSetTaskAttribute", "DAQmxResetTaskAttribute"],
        ["DAQmxGetChanAttribute", "DAQmxSetChanAttribute", "DAQmxResetChanAttribute"],
        ["DAQmxGetTimingAttribute", "DAQmxSetTimingAttribute", "DAQmxResetTimingAttribute"],
        ["DAQmxGetTrigAttribute", "DAQmxSetTrigAttribute", "DAQmxResetTrigAttribute"],
        ["DAQmxGetReadAttribute", "DAQmxSetReadAttribute", "DAQmxResetReadAttribute"],
        ["DAQmxGetWriteAttribute", "DAQmxSetWriteAttribute", "DAQmxResetWriteAttribute"],
        ["DAQmxGetExportedSignalAttribute", "DAQmxSetExportedSignalAttribute", "DAQmxResetExportedSignalAttribute"],
        ["DAQmxGetBufferAttribute", "DAQmxSetBufferAttribute", "DAQmxResetBufferAttribute"],
        ["DAQmxGetWatchdogAttribute", "DAQmxSetWatchdogAttribute", "DAQmxResetWatchdogAttribute"],
    ];
    let row = match group {
        AttrGroup::Task => 0,
        AttrGroup::Channel => 1,
        AttrGroup::Timing => 2,
        AttrGroup::Trigger => 3,
        AttrGroup::Read => 4,
        AttrGroup::Write => 5,
        AttrGroup::ExportedSignal => 6,
        AttrGroup::Buffer => 7,
        AttrGroup::Watchdog => 8,
    };
    NAMES[row][verb]
}

fn unknown_attribute(group: AttrGroup, id: i32) -> DaqError {
    DaqError::driver(
        error_codes::ATTRIBUTE_NOT_SUPPORTED_IN_TASK_CONTEXT,
        format!("Attribute {id:#x} is not supported in the {group} group."),
    )
}

/// Transfer family of a read or write entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Analog,
    Power,
    Lines,
    Port,
    CounterF64,
    CounterU32,
    CtrFreq,
    CtrTime,
    CtrTicks,
    Raw,
}

impl Transfer {
    fn reads(self, chan: &SimChannel) -> bool {
        use ChannelSpec as S;
        match (self, &chan.spec) {
            (Transfer::Analog, S::AiVoltage(_) | S::AiCurrent(_) | S::AiThermocouple(_)) => true,
            (Transfer::Power, S::AiPower(_)) => true,
            (Transfer::Lines | Transfer::Port, S::Di(_)) => true,
            (Transfer::CounterF64, spec) => {
                chan.chan_type() == ChannelType::CounterInput
                    && !matches!(spec, S::CiPulseFreq(_) | S::CiPulseTime(_) | S::CiPulseTicks(_))
            }
            (Transfer::CounterU32, S::CiCountEdges(_)) => true,
            (Transfer::CtrFreq, S::CiPulseFreq(_)) => true,
            (Transfer::CtrTime, S::CiPulseTime(_)) => true,
            (Transfer::CtrTicks, S::CiPulseTicks(_)) => true,
            (Transfer::Raw, S::AiVoltage(_) | S::AiCurrent(_) | S::AiThermocouple(_) | S::Di(_)) => true,
            _ => false,
        }
    }

    fn writes(self, chan: &SimChannel) -> bool {
        use ChannelSpec as S;
        match (self, &chan.spec) {
            (Transfer::Analog, S::AoVoltage(_) | S::AoCurrent(_)) => true,
            (Transfer::Lines | Transfer::Port, S::Do(_)) => true,
            (Transfer::CtrFreq, S::CoPulseFreq(_)) => true,
            (Transfer::CtrTime, S::CoPulseTime(_)) => true,
            (Transfer::CtrTicks, S::CoPulseTicks(_)) => true,
            (Transfer::Raw, S::AoVoltage(_) | S::AoCurrent(_) | S::Do(_)) => true,
            _ => false,
        }
    }
}

/// Value a channel presents for one read; repeated for every sample.
#[derive(Debug, Clone)]
enum SimValue {
    F64(f64),
    U32(u32),
    Lines(Vec<bool>),
    Freq(CtrFreq),
    Time(CtrTime),
    Ticks(CtrTick),
    Power(PowerMeasurement),
    Bytes(Vec<u8>),
}

impl SimValue {
    fn f64(&self) -> f64 {
        match self {
            SimValue::F64(v) => *v,
            SimValue::U32(v) => f64::from(*v),
            _ => 0.0,
        }
    }

    fn u32(&self) -> u32 {
        match self {
            SimValue::U32(v) => *v,
            _ => 0,
        }
    }
}

impl SimState {
    fn sample(&self, chan: &SimChannel, transfer: Transfer, now: Instant) -> SimValue {
        match transfer {
            Transfer::Analog => SimValue::F64(self.analog_input(chan)),
            Transfer::Power => SimValue::Power(self.power_input(chan)),
            Transfer::Lines => SimValue::Lines(self.line_inputs(chan)),
            Transfer::Port => SimValue::U32(self.port_input(chan)),
            Transfer::CounterF64 => SimValue::F64(self.counter_f64(chan, now)),
            Transfer::CounterU32 => SimValue::U32(self.counter_count(chan, now)),
            Transfer::CtrFreq => SimValue::Freq(self.counter_freq(chan)),
            Transfer::CtrTime => SimValue::Time(self.counter_pulse(chan)),
            Transfer::CtrTicks => SimValue::Ticks(self.counter_ticks(chan)),
            Transfer::Raw => match chan.chan_type() {
                ChannelType::AnalogInput => {
                    let code: i16 = encode(self.analog_input(chan), analog_range(chan));
                    SimValue::Bytes(code.to_le_bytes().to_vec())
                }
                _ => SimValue::Bytes(self.port_input(chan).to_le_bytes().to_vec()),
            },
        }
    }
}

struct ReadRequest {
    transfer: Transfer,
    samps: u32,
    timeout: f64,
    capacity: usize,
    scalar: bool,
}

impl ReadRequest {
    fn many(transfer: Transfer, samps: u32, timeout: f64, capacity: usize) -> Self {
        Self {
            transfer,
            samps,
            timeout,
            capacity,
            scalar: false,
        }
    }

    fn scalar(transfer: Transfer, timeout: f64) -> Self {
        Self {
            transfer,
            samps: 1,
            timeout,
            capacity: 1,
            scalar: true,
        }
    }
}

struct Acquired {
    values: Vec<SimValue>,
    ranges: Vec<(f64, f64)>,
    requested: u32,
    taken: u32,
    slot: usize,
    error: Option<DaqError>,
}

impl Acquired {
    /// Write `value(channel)` into every taken sample of each channel.
    fn fill<T: Copy>(&self, buf: &mut [T], fill: FillMode, value: impl Fn(&SimValue, usize) -> T) {
        let nch = self.values.len();
        let samps = self.requested as usize;
        for (c, v) in self.values.iter().enumerate() {
            let x = value(v, c);
            for s in 0..self.taken as usize {
                buf[position(fill, c, s, nch, samps)] = x;
            }
        }
    }

    fn fill_binary<T: RawCode>(&self, buf: &mut [T], fill: FillMode) {
        self.fill(buf, fill, |v, c| encode(v.f64(), self.ranges[c]));
    }

    fn first(&self) -> &SimValue {
        &self.values[0]
    }

    fn finish(self) -> Result<u32> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.taken),
        }
    }

    fn finish_scalar<T>(self, value: T) -> Result<T> {
        self.finish().map(|_| value)
    }
}

struct WriteRequest {
    samps: u32,
    auto_start: bool,
    len: usize,
}

impl WriteRequest {
    fn new(samps: u32, auto_start: bool, len: usize) -> Self {
        Self { samps, auto_start, len }
    }
}

impl Driver for SimulatedDriver {
    fn create_task(&self, name: &str) -> Result<(TaskHandle, bool)> {
        self.inner.record("DAQmxCreateTask", None);
        let mut state = self.inner.lock();
        Ok((self.new_task(&mut state, name)?, true))
    }

    fn load_task(&self, name: &str) -> Result<TaskHandle> {
        self.inner.record("DAQmxLoadTask", None);
        let mut state = self.inner.lock();
        let saved = state.saved.get(&name.to_ascii_lowercase()).cloned().ok_or_else(|| {
            DaqError::driver(
                error_codes::TASK_NOT_IN_DATA_NEIGHBORHOOD,
                format!("Task cannot be loaded because it is not in the configuration store.\n\nTask Name: {name}"),
            )
        })?;
        let handle = self.new_task(&mut state, name)?;
        let task = state.task_mut(handle)?;
        task.channels = saved.channels;
        task.overrides = saved.overrides;
        Ok(handle)
    }

    fn create_watchdog_timer_task(&self, device: &str, name: &str, timeout: f64) -> Result<(TaskHandle, bool)> {
        self.inner.record("DAQmxCreateWatchdogTimerTaskEx", None);
        let dev = self
            .inner
            .devices
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(device.trim()))
            .ok_or_else(|| {
                DaqError::driver(
                    error_codes::INVALID_DEVICE_ID,
                    format!("Device identifier is invalid.\n\nDevice Specified: {device}"),
                )
            })?;
        if timeout != -1.0 && timeout <= 0.0 {
            return Err(DaqError::driver(
                error_codes::INVALID_ATTRIBUTE_VALUE,
                format!("Watchdog timeout must be positive or -1, got {timeout}."),
            ));
        }
        let mut state = self.inner.lock();
        let handle = self.new_task(&mut state, name)?;
        let task = state.task_mut(handle)?;
        task.watchdog = Some(WatchdogState {
            device: dev.name.clone(),
            ..Default::default()
        });
        put(task, watchdog::TIMEOUT, timeout);
        Ok((handle, true))
    }

    fn clear_task(&self, task: TaskHandle) -> Result<()> {
        self.inner.record("DAQmxClearTask", Some(task));
        let mut state = self.inner.lock();
        let mut removed = state.tasks.remove(&task).ok_or_else(invalid_task)?;
        if let Some(wd) = &removed.watchdog {
            state.release_halted(&wd.entries);
        }
        drop(state);
        tracing::info!(task = %removed.name, handle = %task, "Simulated task cleared");
        self.join_worker(removed.worker.take());
        // Callbacks may own tasks of their own; dropped here, unlocked.
        drop(removed);
        Ok(())
    }

    fn start_task(&self, task: TaskHandle) -> Result<()> {
        self.inner.record("DAQmxStartTask", Some(task));
        let mut state = self.inner.lock();
        self.start_locked(&mut state, task)
    }

    fn stop_task(&self, task: TaskHandle) -> Result<()> {
        self.inner.record("DAQmxStopTask", Some(task));
        let worker = Self::stop_locked(&mut self.inner.lock(), task)?;
        self.join_worker(worker);
        Ok(())
    }

    fn task_control(&self, task: TaskHandle, action: TaskMode) -> Result<()> {
        self.inner.record("DAQmxTaskControl", Some(task));
        let mut state = self.inner.lock();
        match action {
            TaskMode::Start => return self.start_locked(&mut state, task),
            TaskMode::Stop | TaskMode::Abort => {
                let worker = Self::stop_locked(&mut state, task)?;
                if action == TaskMode::Abort {
                    state.task_mut(task)?.state = TaskState::Verified;
                }
                drop(state);
                self.join_worker(worker);
                return Ok(());
            }
            _ => {}
        }
        let t = state.task_mut(task)?;
        if t.state == TaskState::Running {
            return Err(running(&t.name));
        }
        if t.channels.is_empty() && t.watchdog.is_none() {
            return Err(no_channels(&t.name));
        }
        t.state = match action {
            TaskMode::Verify => t.state.max(TaskState::Verified),
            TaskMode::Reserve => t.state.max(TaskState::Reserved),
            TaskMode::Commit => t.state.max(TaskState::Committed),
            _ => TaskState::Verified,
        };
        tracing::debug!(task = %t.name, ?action, state = ?t.state, "Simulated task control");
        Ok(())
    }

    fn wait_until_task_done(&self, task: TaskHandle, timeout: f64) -> Result<()> {
        self.inner.record("DAQmxWaitUntilTaskDone", Some(task));
        let deadline = deadline(timeout);
        let mut state = self.inner.lock();
        loop {
            let t = state.task(task)?;
            if t.state != TaskState::Running {
                return Ok(());
            }
            let timed = t.timing_type() != SampleTimingType::OnDemand;
            let finite = t.is_clocked() && t.sample_mode() == AcquisitionType::Finite;
            let continuous = timed && t.sample_mode() != AcquisitionType::Finite;
            if !finite && !continuous {
                return Ok(());
            }
            let name = t.name.clone();
            if !self.inner.wait(&mut state, deadline) {
                return Err(DaqError::driver(
                    error_codes::WAIT_UNTIL_DONE_TIMED_OUT,
                    "Wait Until Done did not indicate that the task was done within the specified timeout.",
                )
                .with_task_name(&name));
            }
        }
    }

    fn is_task_done(&self, task: TaskHandle) -> Result<bool> {
        self.inner.record("DAQmxIsTaskDone", Some(task));
        Ok(self.inner.lock().task(task)?.state != TaskState::Running)
    }

    fn wait_for_valid_timestamp(&self, task: TaskHandle, event: TimestampEvent, timeout: f64) -> Result<Timestamp> {
        self.inner.record("DAQmxWaitForValidTimestamp", Some(task));
        let deadline = deadline(timeout);
        let mut state = self.inner.lock();
        let t = state.task(task)?;
        match event {
            TimestampEvent::StartTrigger => {
                if !t.setting(trigger::START_TRIG_TIMESTAMP_ENABLE).unwrap_or(false) {
                    return Err(timestamps_disabled().with_task_name(&t.name));
                }
            }
            TimestampEvent::FirstSampleTimestamp => {}
            _ => return Err(timestamps_disabled().with_task_name(&t.name)),
        }
        loop {
            let t = state.task(task)?;
            if let (Some(at), Some(wall)) = (t.started_at, t.started_wall) {
                if Instant::now() >= at {
                    return Ok(Timestamp::from(wall));
                }
            }
            let name = t.name.clone();
            if !self.inner.wait(&mut state, deadline) {
                return Err(DaqError::driver(
                    error_codes::OPERATION_TIMED_OUT,
                    "Timed out waiting for a valid timestamp.",
                )
                .with_task_name(&name));
            }
        }
    }

    fn add_global_chans_to_task(&self, task: TaskHandle, channels: &str) -> Result<()> {
        self.inner.record("DAQmxAddGlobalChansToTask", Some(task));
        let mut state = self.inner.lock();
        let mut found = Vec::new();
        for name in unflatten_channel_string(channels) {
            let chans = state
                .global_channels
                .get(&name.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| {
                    DaqError::driver(
                        error_codes::GLOBAL_CHAN_NOT_FOUND,
                        format!("Global channel cannot be found.\n\nChannel Name: {name}"),
                    )
                })?;
            found.extend(chans);
        }
        self.insert_channels(&mut state, task, found)
    }

    fn save_task(&self, task: TaskHandle, save_as: &str, author: &str, options: SaveOptions) -> Result<()> {
        self.inner.record("DAQmxSaveTask", Some(task));
        let mut state = self.inner.lock();
        let t = state.task(task)?;
        let name = if save_as.trim().is_empty() { t.name.clone() } else { save_as.trim().to_string() };
        let saved = SavedTask {
            channels: t.channels.clone(),
            overrides: t.overrides.clone(),
            author: author.to_string(),
            options,
        };
        let key = name.to_ascii_lowercase();
        if state.saved.contains_key(&key) && !options.contains(SaveOptions::OVERWRITE) {
            return Err(DaqError::driver(
                error_codes::TASK_ALREADY_SAVED,
                format!("A task with this name is already saved. Set the overwrite option to replace it.\n\nTask Name: {name}"),
            ));
        }
        tracing::info!(task = %name, options = options.bits(), "Simulated task saved");
        state.saved.insert(key, saved);
        Ok(())
    }

    fn last_created_channel(&self) -> Result<String> {
        self.inner.record("DAQmxInternalGetLastCreatedChan", None);
        if !self.inner.last_created_supported.load(Ordering::Relaxed) {
            return Err(DaqError::function_not_supported("DAQmxInternalGetLastCreatedChan"));
        }
        Ok(self.inner.lock().last_created.clone().unwrap_or_default())
    }

    fn create_channel(&self, task: TaskHandle, spec: &ChannelSpec) -> Result<()> {
        self.inner.record(spec.function_name(), Some(task));
        let channels = self.build_channels(spec, None)?;
        let mut state = self.inner.lock();
        self.insert_channels(&mut state, task, channels)
    }

    fn configure_timing(&self, task: TaskHandle, config: &TimingConfig) -> Result<()> {
        self.inner.record(timing_function(config), Some(task));
        if let Some(rate) = config.rate() {
            if rate <= 0.0 {
                return Err(DaqError::driver(
                    error_codes::INVALID_ATTRIBUTE_VALUE,
                    format!("Sample clock rate must be positive, got {rate}."),
                ));
            }
        }
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        if t.state == TaskState::Running {
            return Err(running(&t.name));
        }
        let (mode, samps) = config.quantity();
        put(t, timing::SAMP_TIMING_TYPE, config.timing_type());
        put(t, timing::SAMP_QUANT_SAMP_MODE, mode);
        put(t, timing::SAMP_QUANT_SAMP_PER_CHAN, samps);
        if let Some(rate) = config.rate() {
            put(t, timing::SAMP_CLK_RATE, rate);
        }
        match config {
            TimingConfig::SampleClock { source, active_edge, .. }
            | TimingConfig::PipelinedSampleClock { source, active_edge, .. } => {
                put(t, timing::SAMP_CLK_SRC, source.clone());
                put(t, timing::SAMP_CLK_ACTIVE_EDGE, *active_edge);
            }
            TimingConfig::BurstHandshakingImportClock {
                sample_clk_src,
                sample_clk_active_edge,
                ..
            } => {
                put(t, timing::SAMP_CLK_SRC, sample_clk_src.clone());
                put(t, timing::SAMP_CLK_ACTIVE_EDGE, *sample_clk_active_edge);
            }
            TimingConfig::BurstHandshakingExportClock { sample_clk_outp_term, .. } => {
                put(t, export::SAMP_CLK_OUTPUT_TERM, sample_clk_outp_term.clone());
            }
            TimingConfig::ChangeDetection {
                rising_edge_chan,
                falling_edge_chan,
                ..
            } => {
                put(t, timing::CHANGE_DETECT_DI_RISING_EDGE_PHYSICAL_CHANS, rising_edge_chan.clone());
                put(t, timing::CHANGE_DETECT_DI_FALLING_EDGE_PHYSICAL_CHANS, falling_edge_chan.clone());
            }
            TimingConfig::Implicit { .. } | TimingConfig::Handshaking { .. } => {}
        }
        tracing::debug!(task = %t.name, ?config, "Simulated timing configured");
        Ok(())
    }

    fn configure_trigger(&self, task: TaskHandle, config: &TriggerConfig) -> Result<()> {
        self.inner.record(trigger_function(config), Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        if t.state == TaskState::Running {
            return Err(running(&t.name));
        }
        match config {
            TriggerConfig::DigEdgeStart { source, edge } => {
                put(t, trigger::START_TRIG_TYPE, TriggerType::DigitalEdge);
                put(t, trigger::DIG_EDGE_START_TRIG_SRC, source.clone());
                put(t, trigger::DIG_EDGE_START_TRIG_EDGE, *edge);
            }
            TriggerConfig::AnlgEdgeStart { source, slope, level } => {
                put(t, trigger::START_TRIG_TYPE, TriggerType::AnalogEdge);
                put(t, trigger::ANLG_EDGE_START_TRIG_SRC, source.clone());
                put(t, trigger::ANLG_EDGE_START_TRIG_SLOPE, *slope);
                put(t, trigger::ANLG_EDGE_START_TRIG_LVL, *level);
            }
            TriggerConfig::TimeStart { when, .. } => {
                put(t, trigger::START_TRIG_TYPE, TriggerType::Time);
                put(t, trigger::TIME_START_TRIG_WHEN, *when);
            }
            TriggerConfig::DisableStart => put(t, trigger::START_TRIG_TYPE, TriggerType::None),
            TriggerConfig::DigEdgeRef {
                source,
                edge,
                pretrigger_samples,
            } => {
                put(t, trigger::REF_TRIG_TYPE, TriggerType::DigitalEdge);
                put(t, trigger::DIG_EDGE_REF_TRIG_SRC, source.clone());
                put(t, trigger::DIG_EDGE_REF_TRIG_EDGE, *edge);
                put(t, trigger::REF_TRIG_PRETRIG_SAMPLES, *pretrigger_samples);
            }
            TriggerConfig::AnlgEdgeRef {
                source,
                slope,
                level,
                pretrigger_samples,
            } => {
                put(t, trigger::REF_TRIG_TYPE, TriggerType::AnalogEdge);
                put(t, trigger::ANLG_EDGE_REF_TRIG_SRC, source.clone());
                put(t, trigger::ANLG_EDGE_REF_TRIG_SLOPE, *slope);
                put(t, trigger::ANLG_EDGE_REF_TRIG_LVL, *level);
                put(t, trigger::REF_TRIG_PRETRIG_SAMPLES, *pretrigger_samples);
            }
            TriggerConfig::DisableRef => put(t, trigger::REF_TRIG_TYPE, TriggerType::None),
        }
        tracing::debug!(task = %t.name, ?config, "Simulated trigger configured");
        Ok(())
    }

    fn send_software_trigger(&self, task: TaskHandle, trigger: SoftwareTrigger) -> Result<()> {
        self.inner.record("DAQmxSendSoftwareTrigger", Some(task));
        let state = self.inner.lock();
        let t = state.task(task)?;
        tracing::debug!(task = %t.name, ?trigger, "Simulated software trigger");
        Ok(())
    }

    fn export_signal(&self, task: TaskHandle, signal: Signal, output_terminal: &str) -> Result<()> {
        self.inner.record("DAQmxExportSignal", Some(task));
        let attr = match signal {
            Signal::SampleClock => export::SAMP_CLK_OUTPUT_TERM,
            Signal::StartTrigger => export::START_TRIG_OUTPUT_TERM,
            Signal::ReferenceTrigger => export::REF_TRIG_OUTPUT_TERM,
            Signal::CounterOutputEvent => export::CTR_OUT_EVENT_OUTPUT_TERM,
            other => {
                return Err(DaqError::driver(
                    error_codes::INVALID_ATTRIBUTE_VALUE,
                    format!("{other:?} cannot be exported by the simulated device."),
                ))
            }
        };
        let mut state = self.inner.lock();
        put(state.task_mut(task)?, attr, output_terminal.to_string());
        Ok(())
    }

    fn configure_logging(
        &self,
        task: TaskHandle,
        file_path: &str,
        mode: LoggingMode,
        group_name: &str,
        operation: LoggingOperation,
    ) -> Result<()> {
        self.inner.record("DAQmxConfigureLogging", Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        put(t, read::LOGGING_FILE_PATH, file_path.to_string());
        put(t, read::LOGGING_MODE, mode);
        put(t, read::LOGGING_TDMS_GROUP_NAME, group_name.to_string());
        put(t, read::LOGGING_TDMS_OPERATION, operation);
        Ok(())
    }

    fn start_new_file(&self, task: TaskHandle, file_path: &str) -> Result<()> {
        self.inner.record("DAQmxStartNewFile", Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        if t.setting(read::LOGGING_MODE) == Some(LoggingMode::Off) {
            return Err(DaqError::driver(
                error_codes::INVALID_TASK_STATE,
                "A new file can only be started while logging is enabled.",
            )
            .with_task_name(&t.name));
        }
        put(t, read::LOGGING_FILE_PATH, file_path.to_string());
        Ok(())
    }

    fn read_analog_f64(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadAnalogF64", ReadRequest::many(Transfer::Analog, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.f64());
        acq.finish()
    }

    fn read_analog_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        let acq = self.acquire(task, "DAQmxReadAnalogScalarF64", ReadRequest::scalar(Transfer::Analog, timeout))?;
        let value = acq.first().f64();
        acq.finish_scalar(value)
    }

    fn read_binary_i16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i16]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadBinaryI16", ReadRequest::many(Transfer::Analog, samps, timeout, buf.len()))?;
        acq.fill_binary(buf, fill);
        acq.finish()
    }

    fn read_binary_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadBinaryU16", ReadRequest::many(Transfer::Analog, samps, timeout, buf.len()))?;
        acq.fill_binary(buf, fill);
        acq.finish()
    }

    fn read_binary_i32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i32]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadBinaryI32", ReadRequest::many(Transfer::Analog, samps, timeout, buf.len()))?;
        acq.fill_binary(buf, fill);
        acq.finish()
    }

    fn read_binary_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadBinaryU32", ReadRequest::many(Transfer::Analog, samps, timeout, buf.len()))?;
        acq.fill_binary(buf, fill);
        acq.finish()
    }

    fn read_digital_lines(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<(u32, u32)> {
        let acq = self.acquire(task, "DAQmxReadDigitalLines", ReadRequest::many(Transfer::Lines, samps, timeout, buf.len()))?;
        let nch = acq.values.len();
        let bpc = acq.slot;
        let stride = acq.requested as usize;
        for (c, v) in acq.values.iter().enumerate() {
            let SimValue::Lines(lines) = v else { continue };
            for s in 0..acq.taken as usize {
                let base = position(fill, c, s, nch, stride) * bpc;
                for l in 0..bpc {
                    buf[base + l] = u8::from(lines.get(l).copied().unwrap_or(false));
                }
            }
        }
        let bytes = bpc as u32;
        acq.finish().map(|n| (n, bytes))
    }

    fn read_digital_u8(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadDigitalU8", ReadRequest::many(Transfer::Port, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.u32() as u8);
        acq.finish()
    }

    fn read_digital_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadDigitalU16", ReadRequest::many(Transfer::Port, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.u32() as u16);
        acq.finish()
    }

    fn read_digital_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadDigitalU32", ReadRequest::many(Transfer::Port, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.u32());
        acq.finish()
    }

    fn read_digital_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadDigitalScalarU32", ReadRequest::scalar(Transfer::Port, timeout))?;
        let value = acq.first().u32();
        acq.finish_scalar(value)
    }

    fn read_counter_f64_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadCounterF64Ex", ReadRequest::many(Transfer::CounterF64, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.f64());
        acq.finish()
    }

    fn read_counter_u32_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadCounterU32Ex", ReadRequest::many(Transfer::CounterU32, samps, timeout, buf.len()))?;
        acq.fill(buf, fill, |v, _| v.u32());
        acq.finish()
    }

    fn read_counter_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        let acq = self.acquire(task, "DAQmxReadCounterScalarF64", ReadRequest::scalar(Transfer::CounterF64, timeout))?;
        let value = acq.first().f64();
        acq.finish_scalar(value)
    }

    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        let acq = self.acquire(task, "DAQmxReadCounterScalarU32", ReadRequest::scalar(Transfer::CounterU32, timeout))?;
        let value = acq.first().u32();
        acq.finish_scalar(value)
    }

    fn read_ctr_freq(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        freq: &mut [f64],
        duty_cycle: &mut [f64],
    ) -> Result<u32> {
        let capacity = freq.len().min(duty_cycle.len());
        let acq = self.acquire(task, "DAQmxReadCtrFreq", ReadRequest::many(Transfer::CtrFreq, samps, timeout, capacity))?;
        let pulse = |v: &SimValue| match v {
            SimValue::Freq(p) => *p,
            _ => CtrFreq::default(),
        };
        acq.fill(freq, fill, |v, _| pulse(v).freq);
        acq.fill(duty_cycle, fill, |v, _| pulse(v).duty_cycle);
        acq.finish()
    }

    fn read_ctr_time(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        high_time: &mut [f64],
        low_time: &mut [f64],
    ) -> Result<u32> {
        let capacity = high_time.len().min(low_time.len());
        let acq = self.acquire(task, "DAQmxReadCtrTime", ReadRequest::many(Transfer::CtrTime, samps, timeout, capacity))?;
        let pulse = |v: &SimValue| match v {
            SimValue::Time(p) => *p,
            _ => CtrTime::default(),
        };
        acq.fill(high_time, fill, |v, _| pulse(v).high_time);
        acq.fill(low_time, fill, |v, _| pulse(v).low_time);
        acq.finish()
    }

    fn read_ctr_ticks(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        high_ticks: &mut [u32],
        low_ticks: &mut [u32],
    ) -> Result<u32> {
        let capacity = high_ticks.len().min(low_ticks.len());
        let acq = self.acquire(task, "DAQmxReadCtrTicks", ReadRequest::many(Transfer::CtrTicks, samps, timeout, capacity))?;
        let pulse = |v: &SimValue| match v {
            SimValue::Ticks(p) => *p,
            _ => CtrTick::default(),
        };
        acq.fill(high_ticks, fill, |v, _| pulse(v).high_tick);
        acq.fill(low_ticks, fill, |v, _| pulse(v).low_tick);
        acq.finish()
    }

    fn read_ctr_freq_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrFreq> {
        let acq = self.acquire(task, "DAQmxReadCtrFreqScalar", ReadRequest::scalar(Transfer::CtrFreq, timeout))?;
        let value = match acq.first() {
            SimValue::Freq(p) => *p,
            _ => CtrFreq::default(),
        };
        acq.finish_scalar(value)
    }

    fn read_ctr_time_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTime> {
        let acq = self.acquire(task, "DAQmxReadCtrTimeScalar", ReadRequest::scalar(Transfer::CtrTime, timeout))?;
        let value = match acq.first() {
            SimValue::Time(p) => *p,
            _ => CtrTime::default(),
        };
        acq.finish_scalar(value)
    }

    fn read_ctr_ticks_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTick> {
        let acq = self.acquire(task, "DAQmxReadCtrTicksScalar", ReadRequest::scalar(Transfer::CtrTicks, timeout))?;
        let value = match acq.first() {
            SimValue::Ticks(p) => *p,
            _ => CtrTick::default(),
        };
        acq.finish_scalar(value)
    }

    fn read_power_f64(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        voltage: &mut [f64],
        current: &mut [f64],
    ) -> Result<u32> {
        let capacity = voltage.len().min(current.len());
        let acq = self.acquire(task, "DAQmxReadPowerF64", ReadRequest::many(Transfer::Power, samps, timeout, capacity))?;
        let power = |v: &SimValue| match v {
            SimValue::Power(p) => *p,
            _ => PowerMeasurement::default(),
        };
        acq.fill(voltage, fill, |v, _| power(v).voltage);
        acq.fill(current, fill, |v, _| power(v).current);
        acq.finish()
    }

    fn read_power_binary_i16(
        &self,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        voltage: &mut [i16],
        current: &mut [i16],
    ) -> Result<u32> {
        let capacity = voltage.len().min(current.len());
        let acq = self.acquire(task, "DAQmxReadPowerBinaryI16", ReadRequest::many(Transfer::Power, samps, timeout, capacity))?;
        let power = |v: &SimValue| match v {
            SimValue::Power(p) => *p,
            _ => PowerMeasurement::default(),
        };
        acq.fill(voltage, fill, |v, _| encode(power(v).voltage, POWER_VOLTAGE_RANGE));
        acq.fill(current, fill, |v, _| encode(power(v).current, POWER_CURRENT_RANGE));
        acq.finish()
    }

    fn read_power_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<PowerMeasurement> {
        let acq = self.acquire(task, "DAQmxReadPowerScalarF64", ReadRequest::scalar(Transfer::Power, timeout))?;
        let value = match acq.first() {
            SimValue::Power(p) => *p,
            _ => PowerMeasurement::default(),
        };
        acq.finish_scalar(value)
    }

    fn read_raw(&self, task: TaskHandle, samps: u32, timeout: f64, buf: &mut [u8]) -> Result<(u32, u32)> {
        let acq = self.acquire(task, "DAQmxReadRaw", ReadRequest::many(Transfer::Raw, samps, timeout, buf.len()))?;
        let nch = acq.values.len();
        let width = acq.slot;
        let stride = acq.requested as usize;
        for (c, v) in acq.values.iter().enumerate() {
            let SimValue::Bytes(bytes) = v else { continue };
            for s in 0..acq.taken as usize {
                let base = position(FillMode::GroupByScanNumber, c, s, nch, stride) * width;
                for (b, byte) in bytes.iter().take(width).enumerate() {
                    buf[base + b] = *byte;
                }
            }
        }
        let width = width as u32;
        acq.finish().map(|n| (n, width))
    }

    fn write_analog_f64(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[f64]) -> Result<u32> {
        let n = samps as usize;
        self.emit(task, "DAQmxWriteAnalogF64", Transfer::Analog, WriteRequest::new(samps, auto_start, data.len()), |state, outputs| {
            for (c, (_, chan)) in outputs.iter().enumerate() {
                state.set_analog_output(chan, data[position(fill, c, n - 1, outputs.len(), n)]);
            }
            Ok(())
        })
    }

    fn write_analog_scalar_f64(&self, task: TaskHandle, auto_start: bool, _timeout: f64, value: f64) -> Result<()> {
        self.emit(task, "DAQmxWriteAnalogScalarF64", Transfer::Analog, WriteRequest::new(1, auto_start, 1), |state, outputs| {
            if outputs.len() > 1 {
                return Err(DaqError::write(
                    error_codes::WRITE_NUM_CHANS_MISMATCH,
                    "A scalar write needs a task with one output channel.",
                    0,
                ));
            }
            state.set_analog_output(&outputs[0].1, value);
            Ok(())
        })
        .map(|_| ())
    }

    fn write_binary_i16(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[i16]) -> Result<u32> {
        self.write_binary(task, "DAQmxWriteBinaryI16", samps, auto_start, fill, data)
    }

    fn write_binary_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        self.write_binary(task, "DAQmxWriteBinaryU16", samps, auto_start, fill, data)
    }

    fn write_binary_i32(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[i32]) -> Result<u32> {
        self.write_binary(task, "DAQmxWriteBinaryI32", samps, auto_start, fill, data)
    }

    fn write_binary_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        self.write_binary(task, "DAQmxWriteBinaryU32", samps, auto_start, fill, data)
    }

    fn write_digital_lines(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        let n = samps as usize;
        self.emit(task, "DAQmxWriteDigitalLines", Transfer::Lines, WriteRequest::new(samps, auto_start, data.len()), |state, outputs| {
            let bpc = outputs.iter().map(|(_, c)| c.resources.len()).max().unwrap_or(1);
            for (c, (_, chan)) in outputs.iter().enumerate() {
                let base = position(fill, c, n - 1, outputs.len(), n) * bpc;
                let states: Vec<bool> = (0..chan.resources.len()).map(|l| data[base + l] != 0).collect();
                state.set_line_outputs(chan, &states);
            }
            Ok(())
        })
    }

    fn write_digital_u8(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        let wide: Vec<u32> = data.iter().map(|&v| u32::from(v)).collect();
        self.write_ports(task, "DAQmxWriteDigitalU8", samps, auto_start, fill, &wide)
    }

    fn write_digital_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        let wide: Vec<u32> = data.iter().map(|&v| u32::from(v)).collect();
        self.write_ports(task, "DAQmxWriteDigitalU16", samps, auto_start, fill, &wide)
    }

    fn write_digital_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        self.write_ports(task, "DAQmxWriteDigitalU32", samps, auto_start, fill, data)
    }

    fn write_digital_scalar_u32(&self, task: TaskHandle, auto_start: bool, _timeout: f64, value: u32) -> Result<()> {
        self.write_ports(task, "DAQmxWriteDigitalScalarU32", 1, auto_start, FillMode::GroupByChannel, &[value])
            .map(|_| ())
    }

    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        _timeout: f64,
        fill: FillMode,
        freq: &[f64],
        duty_cycle: &[f64],
    ) -> Result<u32> {
        let request = WriteRequest::new(samps, auto_start, freq.len().min(duty_cycle.len()));
        self.write_pulses(task, "DAQmxWriteCtrFreq", Transfer::CtrFreq, request, fill, |i| {
            [
                (attributes::channel::id::CO_PULSE_FREQ, AttributeValue::F64(freq[i])),
                (attributes::channel::id::CO_PULSE_DUTY_CYC, AttributeValue::F64(duty_cycle[i])),
            ]
        })
    }

    fn write_ctr_time(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        _timeout: f64,
        fill: FillMode,
        high_time: &[f64],
        low_time: &[f64],
    ) -> Result<u32> {
        let request = WriteRequest::new(samps, auto_start, high_time.len().min(low_time.len()));
        self.write_pulses(task, "DAQmxWriteCtrTime", Transfer::CtrTime, request, fill, |i| {
            [
                (attributes::channel::id::CO_PULSE_HIGH_TIME, AttributeValue::F64(high_time[i])),
                (attributes::channel::id::CO_PULSE_LOW_TIME, AttributeValue::F64(low_time[i])),
            ]
        })
    }

    fn write_ctr_ticks(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        _timeout: f64,
        fill: FillMode,
        high_ticks: &[u32],
        low_ticks: &[u32],
    ) -> Result<u32> {
        let request = WriteRequest::new(samps, auto_start, high_ticks.len().min(low_ticks.len()));
        self.write_pulses(task, "DAQmxWriteCtrTicks", Transfer::CtrTicks, request, fill, |i| {
            [
                (attributes::channel::id::CO_PULSE_HIGH_TICKS, AttributeValue::U32(high_ticks[i])),
                (attributes::channel::id::CO_PULSE_LOW_TICKS, AttributeValue::U32(low_ticks[i])),
            ]
        })
    }

    fn write_ctr_freq_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrFreq) -> Result<()> {
        self.write_ctr_freq(task, 1, auto_start, timeout, FillMode::GroupByChannel, &[value.freq], &[value.duty_cycle])
            .map(|_| ())
    }

    fn write_ctr_time_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTime) -> Result<()> {
        self.write_ctr_time(task, 1, auto_start, timeout, FillMode::GroupByChannel, &[value.high_time], &[value.low_time])
            .map(|_| ())
    }

    fn write_ctr_ticks_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTick) -> Result<()> {
        self.write_ctr_ticks(task, 1, auto_start, timeout, FillMode::GroupByChannel, &[value.high_tick], &[value.low_tick])
            .map(|_| ())
    }

    fn write_raw(&self, task: TaskHandle, samps: u32, auto_start: bool, _timeout: f64, data: &[u8]) -> Result<u32> {
        let n = samps as usize;
        self.emit(task, "DAQmxWriteRaw", Transfer::Raw, WriteRequest::new(samps, auto_start, data.len()), |state, outputs| {
            let width = raw_width(&outputs[0].1);
            for (c, (_, chan)) in outputs.iter().enumerate() {
                let base = position(FillMode::GroupByScanNumber, c, n - 1, outputs.len(), n) * width;
                let bytes = &data[base..base + width];
                match chan.chan_type() {
                    ChannelType::AnalogOutput => {
                        let code = i16::from_le_bytes([bytes[0], bytes[1]]);
                        state.set_analog_output(chan, decode(code, analog_range(chan)));
                    }
                    _ => {
                        let value = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
                        state.set_port_output(chan, value);
                    }
                }
            }
            Ok(())
        })
    }

    fn register_every_n_samples_event(
        &self,
        task: TaskHandle,
        event_type: EveryNSamplesEventType,
        samples: u32,
        callback: EveryNSamplesCallback,
    ) -> Result<Box<dyn EventHandler>> {
        const FUNCTION: &str = "DAQmxRegisterEveryNSamplesEvent";
        self.inner.record(FUNCTION, Some(task));
        if samples == 0 {
            return Err(DaqError::driver(
                error_codes::EVERY_N_SAMPLES_INVALID,
                "Every N Samples event interval must be greater than zero.",
            ));
        }
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        let (id, slot) = new_slot(callback);
        t.events.every_n.push(EveryNSlot {
            id,
            event_type,
            interval: samples,
            slot: slot.clone(),
        });
        tracing::debug!(task = %t.name, ?event_type, samples, "Simulated every-N-samples event registered");
        Ok(Box::new(SimEventHandler::new(self.inner.clone(), task, id, FUNCTION, slot)))
    }

    fn register_done_event(&self, task: TaskHandle, callback: DoneCallback) -> Result<Box<dyn EventHandler>> {
        const FUNCTION: &str = "DAQmxRegisterDoneEvent";
        self.inner.record(FUNCTION, Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        let (id, slot) = new_slot(callback);
        t.events.done = Some((id, slot.clone()));
        tracing::debug!(task = %t.name, "Simulated done event registered");
        Ok(Box::new(SimEventHandler::new(self.inner.clone(), task, id, FUNCTION, slot)))
    }

    fn register_signal_event(&self, task: TaskHandle, signal: Signal, callback: SignalCallback) -> Result<Box<dyn EventHandler>> {
        const FUNCTION: &str = "DAQmxRegisterSignalEvent";
        self.inner.record(FUNCTION, Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        let (id, slot) = new_slot(callback);
        t.events.signals.push(SignalSlot {
            id,
            signal,
            slot: slot.clone(),
        });
        tracing::debug!(task = %t.name, ?signal, "Simulated signal event registered");
        Ok(Box::new(SimEventHandler::new(self.inner.clone(), task, id, FUNCTION, slot)))
    }

    fn control_watchdog_task(&self, task: TaskHandle, action: WatchdogControlAction) -> Result<()> {
        self.inner.record("DAQmxControlWatchdogTask", Some(task));
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        let name = t.name.clone();
        let running = t.state == TaskState::Running;
        let wd = t.watchdog.as_mut().ok_or_else(|| not_watchdog(&name))?;
        match action {
            WatchdogControlAction::ResetTimer => {
                if wd.expired {
                    return Err(DaqError::driver(
                        error_codes::WATCHDOG_EXPIRED,
                        "Watchdog timer expired. Clear the expiration before resetting the timer.",
                    )
                    .with_task_name(&name));
                }
                if running {
                    wd.armed_at = Some(Instant::now());
                }
            }
            WatchdogControlAction::ClearExpiration => {
                wd.expired = false;
                if running {
                    wd.armed_at = Some(Instant::now());
                }
                let entries = wd.entries.clone();
                state.release_halted(&entries);
                tracing::info!(task = %name, "Simulated watchdog expiration cleared");
            }
        }
        Ok(())
    }

    fn cfg_watchdog_ao_expir_states(
        &self,
        task: TaskHandle,
        channels: &str,
        states: &[f64],
        output_types: &[WatchdogAOExpirState],
    ) -> Result<()> {
        self.inner.record("DAQmxCfgWatchdogAOExpirStates", Some(task));
        let actions: Vec<ExpirAction> = states
            .iter()
            .zip(output_types)
            .map(|(&value, &output_type)| ExpirAction::Analog { value, output_type })
            .collect();
        if states.len() != output_types.len() {
            return Err(expir_count_mismatch(channels, states.len().max(output_types.len())));
        }
        self.configure_expiration(task, channels, actions, |r| matches!(r, Resource::Ao(_)))
    }

    fn cfg_watchdog_co_expir_states(&self, task: TaskHandle, channels: &str, states: &[WatchdogCOExpirState]) -> Result<()> {
        self.inner.record("DAQmxCfgWatchdogCOExpirStates", Some(task));
        let actions = states.iter().map(|&s| ExpirAction::Counter(s)).collect();
        self.configure_expiration(task, channels, actions, |r| matches!(r, Resource::Ctr(_)))
    }

    fn cfg_watchdog_do_expir_states(&self, task: TaskHandle, channels: &str, states: &[DigitalLineState]) -> Result<()> {
        self.inner.record("DAQmxCfgWatchdogDOExpirStates", Some(task));
        let actions = states.iter().map(|&s| ExpirAction::Digital(s)).collect();
        self.configure_expiration(task, channels, actions, |r| matches!(r, Resource::Line { .. }))
    }

    fn get_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, ty: AttributeType) -> Result<AttributeValue> {
        let group = target.group();
        self.inner.record(attribute_function(0, group), Some(task));
        let def = attributes::find_by_id(group, id).ok_or_else(|| unknown_attribute(group, id))?;
        let value = self.inner.lock().get_attribute(task, target, def, Instant::now())?;
        if value.attribute_type() != ty {
            return Err(DaqError::driver(
                error_codes::INVALID_ATTRIBUTE_VALUE,
                format!("Attribute {} is {:?}, requested as {ty:?}.", def.name, value.attribute_type()),
            ));
        }
        Ok(value)
    }

    fn set_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, value: &AttributeValue) -> Result<()> {
        let group = target.group();
        self.inner.record(attribute_function(1, group), Some(task));
        let def = attributes::find_by_id(group, id).ok_or_else(|| unknown_attribute(group, id))?;
        attributes::check_type(def, value)?;
        tracing::debug!(property = def.name, %group, ?value, "Simulated attribute set");
        self.inner.lock().set_attribute(task, target, def, value)
    }

    fn reset_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32) -> Result<()> {
        let group = target.group();
        self.inner.record(attribute_function(2, group), Some(task));
        let def = attributes::find_by_id(group, id).ok_or_else(|| unknown_attribute(group, id))?;
        self.inner.lock().reset_attribute(task, target, def)
    }
}

impl SimulatedDriver {
    fn write_binary<T: RawCode>(
        &self,
        task: TaskHandle,
        function: &'static str,
        samps: u32,
        auto_start: bool,
        fill: FillMode,
        data: &[T],
    ) -> Result<u32> {
        let n = samps as usize;
        self.emit(task, function, Transfer::Analog, WriteRequest::new(samps, auto_start, data.len()), |state, outputs| {
            for (c, (_, chan)) in outputs.iter().enumerate() {
                let code = data[position(fill, c, n - 1, outputs.len(), n)];
                state.set_analog_output(chan, decode(code, analog_range(chan)));
            }
            Ok(())
        })
    }

    fn write_ports(
        &self,
        task: TaskHandle,
        function: &'static str,
        samps: u32,
        auto_start: bool,
        fill: FillMode,
        data: &[u32],
    ) -> Result<u32> {
        let n = samps as usize;
        self.emit(task, function, Transfer::Port, WriteRequest::new(samps, auto_start, data.len()), |state, outputs| {
            for (c, (_, chan)) in outputs.iter().enumerate() {
                state.set_port_output(chan, data[position(fill, c, n - 1, outputs.len(), n)]);
            }
            Ok(())
        })
    }

    fn configure_expiration(
        &self,
        task: TaskHandle,
        channels: &str,
        actions: Vec<ExpirAction>,
        fits: impl Fn(&Resource) -> bool,
    ) -> Result<()> {
        let tokens = resolve_physical(&self.inner.devices, channels)?;
        if tokens.len() != actions.len() {
            return Err(expir_count_mismatch(channels, actions.len()));
        }
        let mut state = self.inner.lock();
        let t = state.task_mut(task)?;
        let name = t.name.clone();
        let wd = t.watchdog.as_mut().ok_or_else(|| not_watchdog(&name))?;
        for (token, action) in tokens.into_iter().zip(actions) {
            if !token.device.eq_ignore_ascii_case(&wd.device) || !token.resources.iter().all(&fits) {
                return Err(DaqError::driver(
                    error_codes::PHYSICAL_CHAN_DOES_NOT_EXIST,
                    format!(
                        "Physical channel cannot take this expiration state on the watchdog device.\n\nPhysical Channel Name: {}",
                        token.name
                    ),
                )
                .with_task_name(&name));
            }
            let key = token.name.trim_start_matches('/').to_ascii_lowercase();
            wd.entries.retain(|e| e.physical != key);
            wd.entries.push(ExpirationEntry {
                physical: key,
                device: token.device,
                resources: token.resources,
                action,
            });
        }
        tracing::debug!(task = %name, channels, "Simulated watchdog expiration states configured");
        Ok(())
    }
}

fn expir_count_mismatch(channels: &str, states: usize) -> DaqError {
    DaqError::driver(
        error_codes::INVALID_ATTRIBUTE_VALUE,
        format!("{states} expiration states given for channels \"{channels}\"; counts must match."),
    )
}

fn timing_function(config: &TimingConfig) -> &'static str {
    match config {
        TimingConfig::SampleClock { .. } => "DAQmxCfgSampClkTiming",
        TimingConfig::Implicit { .. } => "DAQmxCfgImplicitTiming",
        TimingConfig::Handshaking { .. } => "DAQmxCfgHandshakingTiming",
        TimingConfig::BurstHandshakingImportClock { .. } => "DAQmxCfgBurstHandshakingTimingImportClock",
        TimingConfig::BurstHandshakingExportClock { .. } => "DAQmxCfgBurstHandshakingTimingExportClock",
        TimingConfig::ChangeDetection { .. } => "DAQmxCfgChangeDetectionTiming",
        TimingConfig::PipelinedSampleClock { .. } => "DAQmxCfgPipelinedSampClkTiming",
    }
}

fn trigger_function(config: &TriggerConfig) -> &'static str {
    match config {
        TriggerConfig::DigEdgeStart { .. } => "DAQmxCfgDigEdgeStartTrig",
        TriggerConfig::AnlgEdgeStart { .. } => "DAQmxCfgAnlgEdgeStartTrig",
        TriggerConfig::TimeStart { .. } => "DAQmxCfgTimeStartTrig",
        TriggerConfig::DisableStart => "DAQmxDisableStartTrig",
        TriggerConfig::DigEdgeRef { .. } => "DAQmxCfgDigEdgeRefTrig",
        TriggerConfig::AnlgEdgeRef { .. } => "DAQmxCfgAnlgEdgeRefTrig",
        TriggerConfig::DisableRef => "DAQmxDisableRefTrig",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{AiVoltageChan, AoVoltageChan, DigitalChan};

    fn ai_ao_task(driver: &SimulatedDriver) -> (TaskHandle, TaskHandle) {
        let (ao, _) = driver.create_task("ao").unwrap();
        driver
            .create_channel(
                ao,
                &ChannelSpec::AoVoltage(AoVoltageChan {
                    physical_channel: "SimDev1/ao0".into(),
                    ..Default::default()
                }),
            )
            .unwrap();
        let (ai, _) = driver.create_task("ai").unwrap();
        driver
            .create_channel(
                ai,
                &ChannelSpec::AiVoltage(AiVoltageChan {
                    physical_channel: "SimDev1/ai0".into(),
                    min_val: -10.0,
                    max_val: 10.0,
                    ..Default::default()
                }),
            )
            .unwrap();
        (ao, ai)
    }

    #[test]
    fn test_analog_loopback() {
        let driver = SimulatedDriver::default();
        let (ao, ai) = ai_ao_task(&driver);
        driver.write_analog_scalar_f64(ao, true, 1.0, 3.14).unwrap();
        let value = driver.read_analog_scalar_f64(ai, 1.0).unwrap();
        assert!((value - 3.14).abs() < 1e-9);
    }

    #[test]
    fn test_unnamed_tasks_get_distinct_names() {
        let driver = SimulatedDriver::default();
        let (a, _) = driver.create_task("").unwrap();
        let (b, _) = driver.create_task("").unwrap();
        let name = |h| driver.get_attribute(h, AttrTarget::Task, attributes::task::NAME.id, AttributeType::String);
        assert_ne!(name(a).unwrap(), name(b).unwrap());
    }

    #[test]
    fn test_duplicate_task_name() {
        let driver = SimulatedDriver::default();
        driver.create_task("same").unwrap();
        let err = driver.create_task("same").unwrap_err();
        assert_eq!(err.code(), error_codes::DUPLICATE_TASK);
    }

    #[test]
    fn test_channel_naming_per_line() {
        let driver = SimulatedDriver::default();
        let (task, _) = driver.create_task("lines").unwrap();
        driver
            .create_channel(
                task,
                &ChannelSpec::Do(DigitalChan {
                    lines: "SimDev1/port0/line0:2".into(),
                    name_to_assign_to_lines: "bit".into(),
                    line_grouping: LineGrouping::ChanPerLine,
                }),
            )
            .unwrap();
        assert_eq!(driver.last_created_channel().unwrap(), "bit0, bit1, bit2");
    }

    #[test]
    fn test_read_buffer_too_small() {
        let driver = SimulatedDriver::default();
        let (_, ai) = ai_ao_task(&driver);
        let mut buf = [0.0; 3];
        let err = driver
            .read_analog_f64(ai, 4, 1.0, FillMode::GroupByChannel, &mut buf)
            .unwrap_err();
        assert_eq!(err.code(), error_codes::READ_BUFFER_TOO_SMALL);
    }

    #[test]
    fn test_start_without_channels() {
        let driver = SimulatedDriver::default();
        let (task, _) = driver.create_task("empty").unwrap();
        let err = driver.start_task(task).unwrap_err();
        assert_eq!(err.code(), error_codes::NO_CHANS_IN_TASK);
    }

    #[test]
    fn test_finite_clock_times_out_with_partial_count() {
        let driver = SimulatedDriver::default();
        let (_, ai) = ai_ao_task(&driver);
        driver
            .configure_timing(
                ai,
                &TimingConfig::SampleClock {
                    rate: 100.0,
                    source: String::new(),
                    active_edge: Edge::Rising,
                    sample_mode: AcquisitionType::Finite,
                    samps_per_chan: 1000,
                },
            )
            .unwrap();
        let mut buf = vec![0.0; 1000];
        let err = driver
            .read_analog_f64(ai, 1000, 0.05, FillMode::GroupByChannel, &mut buf)
            .unwrap_err();
        assert_eq!(err.code(), error_codes::OPERATION_TIMED_OUT);
        assert!(err.samples_transferred().unwrap() < 1000);
        driver.clear_task(ai).unwrap();
    }

    #[test]
    fn test_clear_unknown_task() {
        let driver = SimulatedDriver::default();
        let err = driver.clear_task(TaskHandle::from_raw(99)).unwrap_err();
        assert_eq!(err.code(), error_codes::INVALID_TASK);
    }
}
