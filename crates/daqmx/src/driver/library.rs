//! In-process adapter over the vendor C library.
//!
//! Every call goes straight through `daqmx-sys`. Failing calls fetch their
//! extended error text immediately, on the same thread, before any other
//! driver call can overwrite it.
//!
//! Event callbacks are registered with a trampoline and a pointer to a boxed
//! [`CallbackCell`]. The box belongs to the returned handler and is freed only
//! once the driver can no longer call it: after the unregistration call
//! returns, or after the task was cleared.

#![allow(unsafe_code)]

use std::any::Any;
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Arc;

use libc::{c_char, c_void};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use daqmx_sys as sys;

use super::{
    ChannelSpec, DoneCallback, DoneEvent, Driver, EventHandler, EveryNSamplesCallback, EveryNSamplesEvent,
    SignalCallback, SignalEvent, TaskHandle, TimingConfig, TriggerConfig,
};
use crate::attributes::{AttrTarget, AttributeType, AttributeValue};
use crate::constants::*;
use crate::error::{error_codes, DaqError, ErrorKind, Result};
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::timestamp::Timestamp;
use crate::types::{CtrFreq, CtrTick, CtrTime, PowerMeasurement};

fn handle(task: TaskHandle) -> sys::TaskHandle {
    task.raw() as usize as sys::TaskHandle
}

fn adopt(raw: sys::TaskHandle) -> TaskHandle {
    TaskHandle::from_raw(raw as usize as u64)
}

fn cstr(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| {
        DaqError::invalid_argument(error_codes::INVALID_ATTRIBUTE_VALUE, format!("String contains a NUL byte: {s:?}"))
    })
}

fn samps_arg(samps: u32) -> Result<i32> {
    i32::try_from(samps).map_err(|_| {
        DaqError::invalid_argument(error_codes::NUM_SAMPS_WRONG, format!("{samps} samples per channel is out of range."))
    })
}

fn size_arg(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        DaqError::invalid_argument(error_codes::READ_BUFFER_TOO_SMALL, format!("Buffer of {len} elements is too large."))
    })
}

fn bool32(v: bool) -> sys::bool32 {
    u32::from(v)
}

fn fill_arg(fill: FillMode) -> sys::bool32 {
    match fill {
        FillMode::GroupByChannel => sys::DAQmx_Val_GroupByChannel,
        FillMode::GroupByScanNumber => sys::DAQmx_Val_GroupByScanNumber,
    }
}

/// Text from the buffer-size-query protocol: a first call with a null buffer
/// returns the size required.
fn query_string(mut call: impl FnMut(*mut c_char, u32) -> i32) -> std::result::Result<String, i32> {
    let size = call(ptr::null_mut(), 0);
    if size < 0 {
        return Err(size);
    }
    if size == 0 {
        return Ok(String::new());
    }
    let mut buf = vec![0u8; size as usize];
    let status = call(buf.as_mut_ptr().cast(), size as u32);
    if status < 0 {
        return Err(status);
    }
    let text = CStr::from_bytes_until_nul(&buf)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&buf).into_owned());
    Ok(text)
}

fn extended_error_info(status: i32) -> String {
    // SAFETY: the driver writes at most `size` bytes into the buffer.
    let extended = query_string(|buf, size| unsafe { sys::DAQmxGetExtendedErrorInfo(buf, size) });
    match extended {
        Ok(text) if !text.is_empty() => text,
        _ => {
            // SAFETY: as above.
            query_string(|buf, size| unsafe { sys::DAQmxGetErrorString(status, buf, size) })
                .unwrap_or_else(|_| format!("Driver returned status {status}."))
        }
    }
}

fn check(status: i32) -> Result<()> {
    super::check_status(status, || extended_error_info(status))
}

fn transfer_status(status: i32, transferred: i32, kind: ErrorKind) -> Result<u32> {
    let transferred = u32::try_from(transferred).unwrap_or(0);
    check(status).map_err(|e| e.into_kind(kind).with_samples_transferred(transferred))?;
    Ok(transferred)
}

/// Adapter calling the vendor library in-process.
#[derive(Debug, Clone, Default)]
pub struct LibraryDriver {
    live: Arc<Mutex<HashSet<u64>>>,
}

impl LibraryDriver {
    /// Adapter over the installed vendor library.
    pub fn new() -> Self {
        info!("NI-DAQmx library driver initialized");
        Self::default()
    }

    fn created(&self, raw: sys::TaskHandle) -> TaskHandle {
        let task = adopt(raw);
        self.live.lock().insert(task.raw());
        task
    }
}

macro_rules! read_array {
    ($ffi:ident, $task:expr, $samps:expr, $timeout:expr, $fill:expr, $buf:expr) => {{
        let samps = samps_arg($samps)?;
        let size = size_arg($buf.len())?;
        let mut read = 0;
        // SAFETY: the buffer outlives the call and its length is passed alongside.
        let status = unsafe {
            sys::$ffi(handle($task), samps, $timeout, fill_arg($fill), $buf.as_mut_ptr(), size, &mut read, ptr::null_mut())
        };
        transfer_status(status, read, ErrorKind::Read)
    }};
}

macro_rules! read_paired {
    ($ffi:ident, $task:expr, $samps:expr, $timeout:expr, $fill:expr, $a:expr, $b:expr) => {{
        let samps = samps_arg($samps)?;
        let size = size_arg($a.len().min($b.len()))?;
        let mut read = 0;
        // SAFETY: both buffers outlive the call and hold at least `size` elements.
        let status = unsafe {
            sys::$ffi(
                handle($task),
                samps,
                $timeout,
                fill_arg($fill) as _,
                $a.as_mut_ptr(),
                $b.as_mut_ptr(),
                size,
                &mut read,
                ptr::null_mut(),
            )
        };
        transfer_status(status, read, ErrorKind::Read)
    }};
}

macro_rules! write_array {
    ($ffi:ident, $task:expr, $samps:expr, $auto_start:expr, $timeout:expr, $fill:expr, $($data:expr),+) => {{
        let samps = samps_arg($samps)?;
        let mut written = 0;
        // SAFETY: the driver reads `samps` samples per channel; the engine sized the data.
        let status = unsafe {
            sys::$ffi(
                handle($task),
                samps,
                bool32($auto_start),
                $timeout,
                fill_arg($fill),
                $($data.as_ptr(),)+
                &mut written,
                ptr::null_mut(),
            )
        };
        transfer_status(status, written, ErrorKind::Write)
    }};
}

macro_rules! set_raw {
    ($h:expr, $target:expr, $sel:expr, $id:expr, $($value:expr),+) => {
        match $target {
            AttrTarget::Task => return Err(DaqError::function_not_supported("DAQmxSetTaskAttribute")),
            AttrTarget::Channel(_) => sys::DAQmxSetChanAttribute($h, $sel, $id, $($value),+),
            AttrTarget::Timing => sys::DAQmxSetTimingAttribute($h, $id, $($value),+),
            AttrTarget::Trigger => sys::DAQmxSetTrigAttribute($h, $id, $($value),+),
            AttrTarget::Read => sys::DAQmxSetReadAttribute($h, $id, $($value),+),
            AttrTarget::Write => sys::DAQmxSetWriteAttribute($h, $id, $($value),+),
            AttrTarget::ExportedSignal => sys::DAQmxSetExportedSignalAttribute($h, $id, $($value),+),
            AttrTarget::Buffer => sys::DAQmxSetBufferAttribute($h, $id, $($value),+),
            AttrTarget::Watchdog(_) => sys::DAQmxSetWatchdogAttribute($h, $sel, $id, $($value),+),
        }
    };
}

enum Registration {
    EveryN(EveryNSamplesEventType, u32),
    Done,
    Signal(Signal),
}

struct CallbackCell<C> {
    task: TaskHandle,
    callback: Mutex<C>,
}

unsafe extern "C" fn every_n_trampoline(
    _task: sys::TaskHandle,
    event_type: sys::int32,
    samples: sys::uInt32,
    data: *mut c_void,
) -> sys::int32 {
    // SAFETY: `data` points at the cell owned by the live handler.
    let cell = unsafe { &*(data as *const CallbackCell<EveryNSamplesCallback>) };
    let Some(event_type) = EveryNSamplesEventType::from_raw(event_type) else {
        return 0;
    };
    let event = EveryNSamplesEvent {
        task: cell.task,
        event_type,
        samples,
    };
    if catch_unwind(AssertUnwindSafe(|| (&mut *cell.callback.lock())(event))).is_err() {
        warn!(task = %cell.task, "Every-N-samples callback panicked");
    }
    0
}

unsafe extern "C" fn done_trampoline(_task: sys::TaskHandle, status: sys::int32, data: *mut c_void) -> sys::int32 {
    // SAFETY: `data` points at the cell owned by the live handler.
    let cell = unsafe { &*(data as *const CallbackCell<DoneCallback>) };
    let event = DoneEvent { task: cell.task, status };
    if catch_unwind(AssertUnwindSafe(|| (&mut *cell.callback.lock())(event))).is_err() {
        warn!(task = %cell.task, "Done callback panicked");
    }
    0
}

unsafe extern "C" fn signal_trampoline(_task: sys::TaskHandle, signal: sys::int32, data: *mut c_void) -> sys::int32 {
    // SAFETY: `data` points at the cell owned by the live handler.
    let cell = unsafe { &*(data as *const CallbackCell<SignalCallback>) };
    let Some(signal) = Signal::from_raw(signal) else {
        return 0;
    };
    let event = SignalEvent { task: cell.task, signal };
    if catch_unwind(AssertUnwindSafe(|| (&mut *cell.callback.lock())(event))).is_err() {
        warn!(task = %cell.task, "Signal callback panicked");
    }
    0
}

struct LibraryEventHandler {
    task: TaskHandle,
    registration: Registration,
    cell: Option<Box<dyn Any + Send>>,
    live: Arc<Mutex<HashSet<u64>>>,
}

impl LibraryEventHandler {
    fn task_is_live(&self) -> bool {
        self.live.lock().contains(&self.task.raw())
    }
}

impl EventHandler for LibraryEventHandler {
    fn unregister(&mut self) -> Result<()> {
        if self.cell.is_none() {
            return Ok(());
        }
        if self.task_is_live() {
            let h = handle(self.task);
            // SAFETY: a null callback removes the registration; the driver
            // returns only after in-flight callbacks have finished.
            let status = unsafe {
                match self.registration {
                    Registration::EveryN(kind, samples) => {
                        sys::DAQmxRegisterEveryNSamplesEvent(h, kind.raw(), samples, 0, None, ptr::null_mut())
                    }
                    Registration::Done => sys::DAQmxRegisterDoneEvent(h, 0, None, ptr::null_mut()),
                    Registration::Signal(signal) => sys::DAQmxRegisterSignalEvent(h, signal.raw(), 0, None, ptr::null_mut()),
                }
            };
            check(status)?;
        }
        self.cell = None;
        debug!(task = %self.task, "Event callback unregistered");
        Ok(())
    }
}

impl Drop for LibraryEventHandler {
    fn drop(&mut self) {
        // Still registered with a live task: the driver may call it until the
        // task is cleared, so the cell must outlive this handler.
        if let Some(cell) = self.cell.take() {
            if self.task_is_live() {
                std::mem::forget(cell);
            }
        }
    }
}

fn box_cell<C: Send + 'static>(task: TaskHandle, callback: C) -> (Box<dyn Any + Send>, *mut c_void) {
    let cell = Box::new(CallbackCell {
        task,
        callback: Mutex::new(callback),
    });
    let data = ptr::addr_of!(*cell) as *mut c_void;
    (cell, data)
}

impl Driver for LibraryDriver {
    fn create_task(&self, name: &str) -> Result<(TaskHandle, bool)> {
        let name_c = cstr(name)?;
        let mut raw = ptr::null_mut();
        // SAFETY: the name is NUL-terminated and `raw` receives the handle.
        check(unsafe { sys::DAQmxCreateTask(name_c.as_ptr(), &mut raw) }).map_err(|e| e.with_task_name(name))?;
        Ok((self.created(raw), true))
    }

    fn load_task(&self, name: &str) -> Result<TaskHandle> {
        let name_c = cstr(name)?;
        let mut raw = ptr::null_mut();
        // SAFETY: as in `create_task`.
        check(unsafe { sys::DAQmxLoadTask(name_c.as_ptr(), &mut raw) }).map_err(|e| e.with_task_name(name))?;
        Ok(self.created(raw))
    }

    fn create_watchdog_timer_task(&self, device: &str, name: &str, timeout: f64) -> Result<(TaskHandle, bool)> {
        let device_c = cstr(device)?;
        let name_c = cstr(name)?;
        let mut raw = ptr::null_mut();
        // SAFETY: both strings are NUL-terminated and `raw` receives the handle.
        check(unsafe { sys::DAQmxCreateWatchdogTimerTaskEx(device_c.as_ptr(), name_c.as_ptr(), &mut raw, timeout) })
            .map_err(|e| e.with_task_name(name))?;
        Ok((self.created(raw), true))
    }

    fn clear_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: the task layer passes each handle here once.
        let status = unsafe { sys::DAQmxClearTask(handle(task)) };
        self.live.lock().remove(&task.raw());
        check(status)
    }

    fn start_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: handle issued by this driver and not yet cleared.
        check(unsafe { sys::DAQmxStartTask(handle(task)) })
    }

    fn stop_task(&self, task: TaskHandle) -> Result<()> {
        // SAFETY: as above.
        check(unsafe { sys::DAQmxStopTask(handle(task)) })
    }

    fn task_control(&self, task: TaskHandle, action: TaskMode) -> Result<()> {
        // SAFETY: as above.
        check(unsafe { sys::DAQmxTaskControl(handle(task), action.raw()) })
    }

    fn wait_until_task_done(&self, task: TaskHandle, timeout: f64) -> Result<()> {
        // SAFETY: as above.
        check(unsafe { sys::DAQmxWaitUntilTaskDone(handle(task), timeout) })
    }

    fn is_task_done(&self, task: TaskHandle) -> Result<bool> {
        let mut done = 0;
        // SAFETY: `done` receives the flag.
        check(unsafe { sys::DAQmxIsTaskDone(handle(task), &mut done) })?;
        Ok(done != 0)
    }

    fn wait_for_valid_timestamp(&self, task: TaskHandle, event: TimestampEvent, timeout: f64) -> Result<Timestamp> {
        let mut ts = sys::CVIAbsoluteTime::default();
        // SAFETY: `ts` receives the timestamp.
        check(unsafe { sys::DAQmxWaitForValidTimestamp(handle(task), event.raw(), timeout, &mut ts) })?;
        Ok(Timestamp::from(ts))
    }

    fn add_global_chans_to_task(&self, task: TaskHandle, channels: &str) -> Result<()> {
        let channels_c = cstr(channels)?;
        // SAFETY: NUL-terminated channel list.
        check(unsafe { sys::DAQmxAddGlobalChansToTask(handle(task), channels_c.as_ptr()) })
    }

    fn save_task(&self, task: TaskHandle, save_as: &str, author: &str, options: SaveOptions) -> Result<()> {
        let save_as_c = cstr(save_as)?;
        let author_c = cstr(author)?;
        // SAFETY: NUL-terminated strings.
        check(unsafe { sys::DAQmxSaveTask(handle(task), save_as_c.as_ptr(), author_c.as_ptr(), options.bits()) })
    }

    fn last_created_channel(&self) -> Result<String> {
        // SAFETY: the driver writes at most `size` bytes.
        query_string(|buf, size| unsafe { sys::DAQmxInternalGetLastCreatedChan(buf, size) })
            .map_err(|status| DaqError::driver(status, extended_error_info(status)))
    }

    fn create_channel(&self, task: TaskHandle, spec: &ChannelSpec) -> Result<()> {
        let h = handle(task);
        let physical = cstr(spec.physical())?;
        let name = cstr(spec.assigned_name())?;
        let (p, n) = (physical.as_ptr(), name.as_ptr());
        // SAFETY: every string argument is NUL-terminated and outlives its call.
        let status = unsafe {
            match spec {
                ChannelSpec::AiVoltage(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateAIVoltageChan(
                        h,
                        p,
                        n,
                        c.terminal_config.raw(),
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::AiCurrent(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateAICurrentChan(
                        h,
                        p,
                        n,
                        c.terminal_config.raw(),
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.shunt_resistor_loc.raw(),
                        c.ext_shunt_resistor_val,
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::AiThermocouple(c) => {
                    let cjc = cstr(&c.cjc_channel)?;
                    sys::DAQmxCreateAIThrmcplChan(
                        h,
                        p,
                        n,
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.thermocouple_type.raw(),
                        c.cjc_source.raw(),
                        c.cjc_val,
                        cjc.as_ptr(),
                    )
                }
                ChannelSpec::AiPower(c) => {
                    sys::DAQmxCreateAIPowerChan(h, p, n, c.voltage_setpoint, c.current_setpoint, bool32(c.output_enable))
                }
                ChannelSpec::AoVoltage(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateAOVoltageChan(h, p, n, c.min_val, c.max_val, c.units.raw(), scale.as_ptr())
                }
                ChannelSpec::AoCurrent(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateAOCurrentChan(h, p, n, c.min_val, c.max_val, c.units.raw(), scale.as_ptr())
                }
                ChannelSpec::Di(c) => sys::DAQmxCreateDIChan(h, p, n, c.line_grouping.raw()),
                ChannelSpec::Do(c) => sys::DAQmxCreateDOChan(h, p, n, c.line_grouping.raw()),
                ChannelSpec::CiCountEdges(c) => {
                    sys::DAQmxCreateCICountEdgesChan(h, p, n, c.edge.raw(), c.initial_count, c.count_direction.raw())
                }
                ChannelSpec::CiFreq(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateCIFreqChan(
                        h,
                        p,
                        n,
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.edge.raw(),
                        c.meas_method.raw(),
                        c.meas_time,
                        c.divisor,
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::CiPeriod(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateCIPeriodChan(
                        h,
                        p,
                        n,
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.edge.raw(),
                        c.meas_method.raw(),
                        c.meas_time,
                        c.divisor,
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::CiPulseWidth(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateCIPulseWidthChan(
                        h,
                        p,
                        n,
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.starting_edge.raw(),
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::CiSemiPeriod(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateCISemiPeriodChan(h, p, n, c.min_val, c.max_val, c.units.raw(), scale.as_ptr())
                }
                ChannelSpec::CiTwoEdgeSep(c) => {
                    let scale = cstr(&c.custom_scale_name)?;
                    sys::DAQmxCreateCITwoEdgeSepChan(
                        h,
                        p,
                        n,
                        c.min_val,
                        c.max_val,
                        c.units.raw(),
                        c.first_edge.raw(),
                        c.second_edge.raw(),
                        scale.as_ptr(),
                    )
                }
                ChannelSpec::CiPulseFreq(c) => sys::DAQmxCreateCIPulseChanFreq(h, p, n, c.min_val, c.max_val, c.units.raw()),
                ChannelSpec::CiPulseTime(c) => sys::DAQmxCreateCIPulseChanTime(h, p, n, c.min_val, c.max_val, c.units.raw()),
                ChannelSpec::CiPulseTicks(c) => {
                    let source = cstr(&c.source_terminal)?;
                    sys::DAQmxCreateCIPulseChanTicks(h, p, n, source.as_ptr(), c.min_val, c.max_val)
                }
                ChannelSpec::CoPulseFreq(c) => sys::DAQmxCreateCOPulseChanFreq(
                    h,
                    p,
                    n,
                    c.units.raw(),
                    c.idle_state.raw(),
                    c.initial_delay,
                    c.freq,
                    c.duty_cycle,
                ),
                ChannelSpec::CoPulseTime(c) => sys::DAQmxCreateCOPulseChanTime(
                    h,
                    p,
                    n,
                    c.units.raw(),
                    c.idle_state.raw(),
                    c.initial_delay,
                    c.low_time,
                    c.high_time,
                ),
                ChannelSpec::CoPulseTicks(c) => {
                    let source = cstr(&c.source_terminal)?;
                    sys::DAQmxCreateCOPulseChanTicks(
                        h,
                        p,
                        n,
                        source.as_ptr(),
                        c.idle_state.raw(),
                        c.initial_delay,
                        c.low_ticks,
                        c.high_ticks,
                    )
                }
            }
        };
        check(status)?;
        debug!(%task, function = spec.function_name(), physical = spec.physical(), "Channel created");
        Ok(())
    }

    fn configure_timing(&self, task: TaskHandle, config: &TimingConfig) -> Result<()> {
        let h = handle(task);
        // SAFETY: string arguments are NUL-terminated and outlive the call.
        let status = unsafe {
            match config {
                TimingConfig::SampleClock {
                    rate,
                    source,
                    active_edge,
                    sample_mode,
                    samps_per_chan,
                } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgSampClkTiming(h, source.as_ptr(), *rate, active_edge.raw(), sample_mode.raw(), *samps_per_chan)
                }
                TimingConfig::Implicit {
                    sample_mode,
                    samps_per_chan,
                } => sys::DAQmxCfgImplicitTiming(h, sample_mode.raw(), *samps_per_chan),
                TimingConfig::Handshaking {
                    sample_mode,
                    samps_per_chan,
                } => sys::DAQmxCfgHandshakingTiming(h, sample_mode.raw(), *samps_per_chan),
                TimingConfig::BurstHandshakingImportClock {
                    sample_mode,
                    samps_per_chan,
                    sample_clk_rate,
                    sample_clk_src,
                    sample_clk_active_edge,
                    pause_when,
                    ready_event_active_level,
                } => {
                    let src = cstr(sample_clk_src)?;
                    sys::DAQmxCfgBurstHandshakingTimingImportClock(
                        h,
                        sample_mode.raw(),
                        *samps_per_chan,
                        *sample_clk_rate,
                        src.as_ptr(),
                        sample_clk_active_edge.raw(),
                        pause_when.raw(),
                        ready_event_active_level.raw(),
                    )
                }
                TimingConfig::BurstHandshakingExportClock {
                    sample_mode,
                    samps_per_chan,
                    sample_clk_rate,
                    sample_clk_outp_term,
                    sample_clk_pulse_polarity,
                    pause_when,
                    ready_event_active_level,
                } => {
                    let term = cstr(sample_clk_outp_term)?;
                    sys::DAQmxCfgBurstHandshakingTimingExportClock(
                        h,
                        sample_mode.raw(),
                        *samps_per_chan,
                        *sample_clk_rate,
                        term.as_ptr(),
                        sample_clk_pulse_polarity.raw(),
                        pause_when.raw(),
                        ready_event_active_level.raw(),
                    )
                }
                TimingConfig::ChangeDetection {
                    rising_edge_chan,
                    falling_edge_chan,
                    sample_mode,
                    samps_per_chan,
                } => {
                    let rising = cstr(rising_edge_chan)?;
                    let falling = cstr(falling_edge_chan)?;
                    sys::DAQmxCfgChangeDetectionTiming(
                        h,
                        rising.as_ptr(),
                        falling.as_ptr(),
                        sample_mode.raw(),
                        *samps_per_chan,
                    )
                }
                TimingConfig::PipelinedSampleClock {
                    rate,
                    source,
                    active_edge,
                    sample_mode,
                    samps_per_chan,
                } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgPipelinedSampClkTiming(
                        h,
                        source.as_ptr(),
                        *rate,
                        active_edge.raw(),
                        sample_mode.raw(),
                        *samps_per_chan,
                    )
                }
            }
        };
        check(status)
    }

    fn configure_trigger(&self, task: TaskHandle, config: &TriggerConfig) -> Result<()> {
        let h = handle(task);
        // SAFETY: string arguments are NUL-terminated and outlive the call.
        let status = unsafe {
            match config {
                TriggerConfig::DigEdgeStart { source, edge } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgDigEdgeStartTrig(h, source.as_ptr(), edge.raw())
                }
                TriggerConfig::AnlgEdgeStart { source, slope, level } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgAnlgEdgeStartTrig(h, source.as_ptr(), slope.raw(), *level)
                }
                TriggerConfig::TimeStart { when, timescale } => {
                    sys::DAQmxCfgTimeStartTrig(h, sys::CVIAbsoluteTime::from(*when), timescale.raw())
                }
                TriggerConfig::DisableStart => sys::DAQmxDisableStartTrig(h),
                TriggerConfig::DigEdgeRef {
                    source,
                    edge,
                    pretrigger_samples,
                } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgDigEdgeRefTrig(h, source.as_ptr(), edge.raw(), *pretrigger_samples)
                }
                TriggerConfig::AnlgEdgeRef {
                    source,
                    slope,
                    level,
                    pretrigger_samples,
                } => {
                    let source = cstr(source)?;
                    sys::DAQmxCfgAnlgEdgeRefTrig(h, source.as_ptr(), slope.raw(), *level, *pretrigger_samples)
                }
                TriggerConfig::DisableRef => sys::DAQmxDisableRefTrig(h),
            }
        };
        check(status)
    }

    fn send_software_trigger(&self, task: TaskHandle, trigger: SoftwareTrigger) -> Result<()> {
        // SAFETY: handle issued by this driver.
        check(unsafe { sys::DAQmxSendSoftwareTrigger(handle(task), trigger.raw()) })
    }

    fn export_signal(&self, task: TaskHandle, signal: Signal, output_terminal: &str) -> Result<()> {
        let term = cstr(output_terminal)?;
        // SAFETY: NUL-terminated terminal name.
        check(unsafe { sys::DAQmxExportSignal(handle(task), signal.raw(), term.as_ptr()) })
    }

    fn configure_logging(
        &self,
        task: TaskHandle,
        file_path: &str,
        mode: LoggingMode,
        group_name: &str,
        operation: LoggingOperation,
    ) -> Result<()> {
        let path = cstr(file_path)?;
        let group = cstr(group_name)?;
        // SAFETY: NUL-terminated strings.
        check(unsafe { sys::DAQmxConfigureLogging(handle(task), path.as_ptr(), mode.raw(), group.as_ptr(), operation.raw()) })
    }

    fn start_new_file(&self, task: TaskHandle, file_path: &str) -> Result<()> {
        let path = cstr(file_path)?;
        // SAFETY: NUL-terminated path.
        check(unsafe { sys::DAQmxStartNewFile(handle(task), path.as_ptr()) })
    }

    fn read_analog_f64(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        read_array!(DAQmxReadAnalogF64, task, samps, timeout, fill, buf)
    }

    fn read_analog_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        let mut value = 0.0;
        // SAFETY: `value` receives the sample.
        check(unsafe { sys::DAQmxReadAnalogScalarF64(handle(task), timeout, &mut value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_binary_i16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i16]) -> Result<u32> {
        read_array!(DAQmxReadBinaryI16, task, samps, timeout, fill, buf)
    }

    fn read_binary_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        read_array!(DAQmxReadBinaryU16, task, samps, timeout, fill, buf)
    }

    fn read_binary_i32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i32]) -> Result<u32> {
        read_array!(DAQmxReadBinaryI32, task, samps, timeout, fill, buf)
    }

    fn read_binary_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        read_array!(DAQmxReadBinaryU32, task, samps, timeout, fill, buf)
    }

    fn read_digital_lines(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<(u32, u32)> {
        let samps = samps_arg(samps)?;
        let size = size_arg(buf.len())?;
        let (mut read, mut bytes_per_samp) = (0, 0);
        // SAFETY: the buffer outlives the call and its length is passed alongside.
        let status = unsafe {
            sys::DAQmxReadDigitalLines(
                handle(task),
                samps,
                timeout,
                fill_arg(fill),
                buf.as_mut_ptr(),
                size,
                &mut read,
                &mut bytes_per_samp,
                ptr::null_mut(),
            )
        };
        let read = transfer_status(status, read, ErrorKind::Read)?;
        Ok((read, u32::try_from(bytes_per_samp).unwrap_or(0)))
    }

    fn read_digital_u8(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<u32> {
        read_array!(DAQmxReadDigitalU8, task, samps, timeout, fill, buf)
    }

    fn read_digital_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        read_array!(DAQmxReadDigitalU16, task, samps, timeout, fill, buf)
    }

    fn read_digital_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        read_array!(DAQmxReadDigitalU32, task, samps, timeout, fill, buf)
    }

    fn read_digital_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        let mut value = 0;
        // SAFETY: `value` receives the sample.
        check(unsafe { sys::DAQmxReadDigitalScalarU32(handle(task), timeout, &mut value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_counter_f64_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        read_array!(DAQmxReadCounterF64Ex, task, samps, timeout, fill, buf)
    }

    fn read_counter_u32_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        read_array!(DAQmxReadCounterU32Ex, task, samps, timeout, fill, buf)
    }

    fn read_counter_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        let mut value = 0.0;
        // SAFETY: `value` receives the sample.
        check(unsafe { sys::DAQmxReadCounterScalarF64(handle(task), timeout, &mut value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        let mut value = 0;
        // SAFETY: `value` receives the sample.
        check(unsafe { sys::DAQmxReadCounterScalarU32(handle(task), timeout, &mut value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
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
        read_paired!(DAQmxReadCtrFreq, task, samps, timeout, fill, freq, duty_cycle)
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
        read_paired!(DAQmxReadCtrTime, task, samps, timeout, fill, high_time, low_time)
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
        read_paired!(DAQmxReadCtrTicks, task, samps, timeout, fill, high_ticks, low_ticks)
    }

    fn read_ctr_freq_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrFreq> {
        let mut value = CtrFreq::default();
        // SAFETY: both outputs are valid for writes.
        check(unsafe {
            sys::DAQmxReadCtrFreqScalar(handle(task), timeout, &mut value.freq, &mut value.duty_cycle, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_ctr_time_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTime> {
        let mut value = CtrTime::default();
        // SAFETY: both outputs are valid for writes.
        check(unsafe {
            sys::DAQmxReadCtrTimeScalar(handle(task), timeout, &mut value.high_time, &mut value.low_time, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_ctr_ticks_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTick> {
        let mut value = CtrTick::default();
        // SAFETY: both outputs are valid for writes.
        check(unsafe {
            sys::DAQmxReadCtrTicksScalar(handle(task), timeout, &mut value.high_tick, &mut value.low_tick, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
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
        read_paired!(DAQmxReadPowerF64, task, samps, timeout, fill, voltage, current)
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
        read_paired!(DAQmxReadPowerBinaryI16, task, samps, timeout, fill, voltage, current)
    }

    fn read_power_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<PowerMeasurement> {
        let mut value = PowerMeasurement::default();
        // SAFETY: both outputs are valid for writes.
        check(unsafe {
            sys::DAQmxReadPowerScalarF64(handle(task), timeout, &mut value.voltage, &mut value.current, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Read))?;
        Ok(value)
    }

    fn read_raw(&self, task: TaskHandle, samps: u32, timeout: f64, buf: &mut [u8]) -> Result<(u32, u32)> {
        let samps = samps_arg(samps)?;
        let size = size_arg(buf.len())?;
        let (mut read, mut bytes_per_samp) = (0, 0);
        // SAFETY: the buffer outlives the call and its byte length is passed alongside.
        let status = unsafe {
            sys::DAQmxReadRaw(
                handle(task),
                samps,
                timeout,
                buf.as_mut_ptr().cast(),
                size,
                &mut read,
                &mut bytes_per_samp,
                ptr::null_mut(),
            )
        };
        let read = transfer_status(status, read, ErrorKind::Read)?;
        Ok((read, u32::try_from(bytes_per_samp).unwrap_or(0)))
    }

    fn write_analog_f64(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[f64]) -> Result<u32> {
        write_array!(DAQmxWriteAnalogF64, task, samps, auto_start, timeout, fill, data)
    }

    fn write_analog_scalar_f64(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: f64) -> Result<()> {
        // SAFETY: scalar arguments only.
        check(unsafe { sys::DAQmxWriteAnalogScalarF64(handle(task), bool32(auto_start), timeout, value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn write_binary_i16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i16]) -> Result<u32> {
        write_array!(DAQmxWriteBinaryI16, task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        write_array!(DAQmxWriteBinaryU16, task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_i32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i32]) -> Result<u32> {
        write_array!(DAQmxWriteBinaryI32, task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        write_array!(DAQmxWriteBinaryU32, task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_lines(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        write_array!(DAQmxWriteDigitalLines, task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u8(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        write_array!(DAQmxWriteDigitalU8, task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        write_array!(DAQmxWriteDigitalU16, task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        write_array!(DAQmxWriteDigitalU32, task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_scalar_u32(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: u32) -> Result<()> {
        // SAFETY: scalar arguments only.
        check(unsafe { sys::DAQmxWriteDigitalScalarU32(handle(task), bool32(auto_start), timeout, value, ptr::null_mut()) })
            .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn write_ctr_freq(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        freq: &[f64],
        duty_cycle: &[f64],
    ) -> Result<u32> {
        write_array!(DAQmxWriteCtrFreq, task, samps, auto_start, timeout, fill, freq, duty_cycle)
    }

    fn write_ctr_time(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        high_time: &[f64],
        low_time: &[f64],
    ) -> Result<u32> {
        write_array!(DAQmxWriteCtrTime, task, samps, auto_start, timeout, fill, high_time, low_time)
    }

    fn write_ctr_ticks(
        &self,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        high_ticks: &[u32],
        low_ticks: &[u32],
    ) -> Result<u32> {
        write_array!(DAQmxWriteCtrTicks, task, samps, auto_start, timeout, fill, high_ticks, low_ticks)
    }

    fn write_ctr_freq_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrFreq) -> Result<()> {
        // SAFETY: scalar arguments only.
        check(unsafe {
            sys::DAQmxWriteCtrFreqScalar(handle(task), bool32(auto_start), timeout, value.freq, value.duty_cycle, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn write_ctr_time_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTime) -> Result<()> {
        // SAFETY: scalar arguments only.
        check(unsafe {
            sys::DAQmxWriteCtrTimeScalar(handle(task), bool32(auto_start), timeout, value.high_time, value.low_time, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn write_ctr_ticks_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTick) -> Result<()> {
        // SAFETY: scalar arguments only.
        check(unsafe {
            sys::DAQmxWriteCtrTicksScalar(handle(task), bool32(auto_start), timeout, value.high_tick, value.low_tick, ptr::null_mut())
        })
        .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn write_raw(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, data: &[u8]) -> Result<u32> {
        let samps = samps_arg(samps)?;
        let mut written = 0;
        // SAFETY: the driver reads `samps` raw samples from `data`.
        let status = unsafe {
            sys::DAQmxWriteRaw(
                handle(task),
                samps,
                bool32(auto_start),
                timeout,
                data.as_ptr().cast(),
                &mut written,
                ptr::null_mut(),
            )
        };
        transfer_status(status, written, ErrorKind::Write)
    }

    fn register_every_n_samples_event(
        &self,
        task: TaskHandle,
        event_type: EveryNSamplesEventType,
        samples: u32,
        callback: EveryNSamplesCallback,
    ) -> Result<Box<dyn EventHandler>> {
        let (cell, data) = box_cell(task, callback);
        // SAFETY: `data` stays valid until the handler unregisters or the task is cleared.
        check(unsafe {
            sys::DAQmxRegisterEveryNSamplesEvent(
                handle(task),
                event_type.raw(),
                samples,
                0,
                Some(every_n_trampoline),
                data,
            )
        })?;
        Ok(Box::new(LibraryEventHandler {
            task,
            registration: Registration::EveryN(event_type, samples),
            cell: Some(cell),
            live: self.live.clone(),
        }))
    }

    fn register_done_event(&self, task: TaskHandle, callback: DoneCallback) -> Result<Box<dyn EventHandler>> {
        let (cell, data) = box_cell(task, callback);
        // SAFETY: as above.
        check(unsafe { sys::DAQmxRegisterDoneEvent(handle(task), 0, Some(done_trampoline), data) })?;
        Ok(Box::new(LibraryEventHandler {
            task,
            registration: Registration::Done,
            cell: Some(cell),
            live: self.live.clone(),
        }))
    }

    fn register_signal_event(&self, task: TaskHandle, signal: Signal, callback: SignalCallback) -> Result<Box<dyn EventHandler>> {
        let (cell, data) = box_cell(task, callback);
        // SAFETY: as above.
        check(unsafe { sys::DAQmxRegisterSignalEvent(handle(task), signal.raw(), 0, Some(signal_trampoline), data) })?;
        Ok(Box::new(LibraryEventHandler {
            task,
            registration: Registration::Signal(signal),
            cell: Some(cell),
            live: self.live.clone(),
        }))
    }

    fn control_watchdog_task(&self, task: TaskHandle, action: WatchdogControlAction) -> Result<()> {
        // SAFETY: handle issued by this driver.
        check(unsafe { sys::DAQmxControlWatchdogTask(handle(task), action.raw()) })
    }

    fn cfg_watchdog_ao_expir_states(
        &self,
        task: TaskHandle,
        channels: &str,
        states: &[f64],
        output_types: &[WatchdogAOExpirState],
    ) -> Result<()> {
        let channels_c = cstr(channels)?;
        let types: Vec<i32> = output_types.iter().map(|t| t.raw()).collect();
        let size = size_arg(states.len().min(types.len()))?;
        // SAFETY: both arrays hold at least `size` elements.
        check(unsafe {
            sys::DAQmxCfgWatchdogAOExpirStates(handle(task), channels_c.as_ptr(), states.as_ptr(), types.as_ptr(), size)
        })
    }

    fn cfg_watchdog_co_expir_states(&self, task: TaskHandle, channels: &str, states: &[WatchdogCOExpirState]) -> Result<()> {
        let channels_c = cstr(channels)?;
        let raw: Vec<i32> = states.iter().map(|s| s.raw()).collect();
        let size = size_arg(raw.len())?;
        // SAFETY: the array holds `size` elements.
        check(unsafe { sys::DAQmxCfgWatchdogCOExpirStates(handle(task), channels_c.as_ptr(), raw.as_ptr(), size) })
    }

    fn cfg_watchdog_do_expir_states(&self, task: TaskHandle, channels: &str, states: &[DigitalLineState]) -> Result<()> {
        let channels_c = cstr(channels)?;
        let raw: Vec<i32> = states.iter().map(|s| s.raw()).collect();
        let size = size_arg(raw.len())?;
        // SAFETY: the array holds `size` elements.
        check(unsafe { sys::DAQmxCfgWatchdogDOExpirStates(handle(task), channels_c.as_ptr(), raw.as_ptr(), size) })
    }

    fn get_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, ty: AttributeType) -> Result<AttributeValue> {
        let h = handle(task);
        let selector = cstr(selector_of(target))?;
        let get = |value: *mut c_void, size: u32| -> i32 {
            // SAFETY: `value` points at storage of the attribute's type holding
            // at least `size` elements (or is null with size 0 for a size query).
            unsafe { get_raw(h, target, selector.as_ptr(), id, value, size) }
        };
        let value = match ty {
            AttributeType::Bool => {
                let mut v: sys::bool32 = 0;
                check(get(ptr::addr_of_mut!(v).cast(), 0))?;
                AttributeValue::Bool(v != 0)
            }
            AttributeType::I32 => {
                let mut v: i32 = 0;
                check(get(ptr::addr_of_mut!(v).cast(), 0))?;
                AttributeValue::I32(v)
            }
            AttributeType::U32 => {
                let mut v: u32 = 0;
                check(get(ptr::addr_of_mut!(v).cast(), 0))?;
                AttributeValue::U32(v)
            }
            AttributeType::U64 => {
                let mut v: u64 = 0;
                check(get(ptr::addr_of_mut!(v).cast(), 0))?;
                AttributeValue::U64(v)
            }
            AttributeType::F64 => {
                let mut v: f64 = 0.0;
                check(get(ptr::addr_of_mut!(v).cast(), 0))?;
                AttributeValue::F64(v)
            }
            AttributeType::String | AttributeType::StringList => {
                let text = query_string(|buf, size| get(buf.cast(), size))
                    .map_err(|status| DaqError::driver(status, extended_error_info(status)))?;
                if ty == AttributeType::StringList {
                    AttributeValue::StringList(unflatten_channel_string(&text))
                } else {
                    AttributeValue::String(text)
                }
            }
            AttributeType::F64List => {
                let size = get(ptr::null_mut(), 0);
                check(size.min(0))?;
                let mut values = vec![0.0f64; size.max(0) as usize];
                if !values.is_empty() {
                    check(get(values.as_mut_ptr().cast(), size as u32))?;
                }
                AttributeValue::F64List(values)
            }
            AttributeType::Timestamp => {
                let mut ts = sys::CVIAbsoluteTime::default();
                check(get(ptr::addr_of_mut!(ts).cast(), 0))?;
                AttributeValue::Timestamp(Timestamp::from(ts))
            }
        };
        Ok(value)
    }

    fn set_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, value: &AttributeValue) -> Result<()> {
        let h = handle(task);
        let selector = cstr(selector_of(target))?;
        let sel = selector.as_ptr();
        // SAFETY: each arm passes the value with the C type the attribute expects.
        let status = unsafe {
            match value {
                AttributeValue::Bool(v) => set_raw!(h, target, sel, id, bool32(*v)),
                AttributeValue::I32(v) => set_raw!(h, target, sel, id, *v),
                AttributeValue::U32(v) => set_raw!(h, target, sel, id, *v),
                AttributeValue::U64(v) => set_raw!(h, target, sel, id, *v),
                AttributeValue::F64(v) => set_raw!(h, target, sel, id, *v),
                AttributeValue::String(v) => {
                    let v = cstr(v)?;
                    set_raw!(h, target, sel, id, v.as_ptr())
                }
                AttributeValue::StringList(v) => {
                    let v = cstr(&flatten_channel_string(v))?;
                    set_raw!(h, target, sel, id, v.as_ptr())
                }
                AttributeValue::F64List(v) => {
                    let size = size_arg(v.len())?;
                    set_raw!(h, target, sel, id, v.as_ptr(), size)
                }
                AttributeValue::Timestamp(v) => set_raw!(h, target, sel, id, sys::CVIAbsoluteTime::from(*v)),
            }
        };
        check(status)
    }

    fn reset_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32) -> Result<()> {
        let h = handle(task);
        let selector = cstr(selector_of(target))?;
        // SAFETY: handle and selector are valid for the call.
        let status = unsafe {
            match target {
                AttrTarget::Task => return Err(DaqError::function_not_supported("DAQmxResetTaskAttribute")),
                AttrTarget::Channel(_) => sys::DAQmxResetChanAttribute(h, selector.as_ptr(), id),
                AttrTarget::Timing => sys::DAQmxResetTimingAttribute(h, id),
                AttrTarget::Trigger => sys::DAQmxResetTrigAttribute(h, id),
                AttrTarget::Read => sys::DAQmxResetReadAttribute(h, id),
                AttrTarget::Write => sys::DAQmxResetWriteAttribute(h, id),
                AttrTarget::ExportedSignal => sys::DAQmxResetExportedSignalAttribute(h, id),
                AttrTarget::Buffer => sys::DAQmxResetBufferAttribute(h, id),
                AttrTarget::Watchdog(_) => sys::DAQmxResetWatchdogAttribute(h, selector.as_ptr(), id),
            }
        };
        check(status)
    }
}

fn selector_of(target: AttrTarget<'_>) -> &str {
    match target {
        AttrTarget::Channel(names) | AttrTarget::Watchdog(names) => names,
        _ => "",
    }
}

/// Getter dispatch. The trailing size is ignored for scalar attributes.
unsafe fn get_raw(h: sys::TaskHandle, target: AttrTarget<'_>, selector: *const c_char, id: i32, value: *mut c_void, size: u32) -> i32 {
    // SAFETY: forwarded from the caller.
    unsafe {
        match target {
            AttrTarget::Task => sys::DAQmxGetTaskAttribute(h, id, value, size),
            AttrTarget::Channel(_) => sys::DAQmxGetChanAttribute(h, selector, id, value, size),
            AttrTarget::Timing => sys::DAQmxGetTimingAttribute(h, id, value, size),
            AttrTarget::Trigger => sys::DAQmxGetTrigAttribute(h, id, value, size),
            AttrTarget::Read => sys::DAQmxGetReadAttribute(h, id, value, size),
            AttrTarget::Write => sys::DAQmxGetWriteAttribute(h, id, value, size),
            AttrTarget::ExportedSignal => sys::DAQmxGetExportedSignalAttribute(h, id, value, size),
            AttrTarget::Buffer => sys::DAQmxGetBufferAttribute(h, id, value, size),
            AttrTarget::Watchdog(_) => sys::DAQmxGetWatchdogAttribute(h, selector, id, value, size),
        }
    }
}
