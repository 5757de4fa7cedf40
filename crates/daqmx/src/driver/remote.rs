//! Remote-session adapter.
//!
//! [`RemoteDriver`] forwards every [`Driver`] call as a named method with a
//! JSON request to a [`SessionTransport`]. Tasks live on the server as named
//! sessions; the adapter maps them to local [`TaskHandle`]s. How requests
//! reach the server (gRPC, a test double, ...) is the transport's business.
//!
//! Events are server streams. Each registration gets its own pump thread
//! that polls the stream and invokes the callback; unregistering cancels the
//! stream and joins the pump.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{
    check_status, ChannelSpec, DoneCallback, DoneEvent, Driver, EventHandler, EveryNSamplesCallback,
    EveryNSamplesEvent, SignalCallback, SignalEvent, TaskHandle, TimingConfig, TriggerConfig,
};
use crate::attributes::{AttrGroup, AttrTarget, AttributeType, AttributeValue};
use crate::constants::*;
use crate::error::{error_codes, DaqError, ErrorKind, Result};
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::timestamp::Timestamp;
use crate::types::{CtrFreq, CtrTick, CtrTime, PowerMeasurement};

const STREAM_POLL: Duration = Duration::from_millis(20);

/// Status code of a failed remote call, following the gRPC taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RpcCode {
    /// The caller cancelled the call.
    Cancelled,
    /// Unclassified failure.
    Unknown,
    /// The request was malformed.
    InvalidArgument,
    /// The call timed out.
    DeadlineExceeded,
    /// The session or entity does not exist.
    NotFound,
    /// The entity already exists.
    AlreadyExists,
    /// The caller lacks permission.
    PermissionDenied,
    /// A server quota ran out.
    ResourceExhausted,
    /// The server is not in a state to run the call.
    FailedPrecondition,
    /// The call was aborted by a conflict.
    Aborted,
    /// A value was out of range.
    OutOfRange,
    /// The server does not offer the method.
    Unimplemented,
    /// Internal server error.
    Internal,
    /// The server could not be reached.
    Unavailable,
    /// Unrecoverable data loss.
    DataLoss,
    /// Missing or invalid credentials.
    Unauthenticated,
}

/// Failure reported by a [`SessionTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcStatus {
    /// Transport status code.
    pub code: RpcCode,
    /// Status message.
    pub message: String,
    /// Vendor status code when the server-side driver call failed.
    pub daqmx_error: Option<i32>,
}

impl RpcStatus {
    /// Status without a vendor error code.
    pub fn new(code: RpcCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            daqmx_error: None,
        }
    }

    /// Status of a driver call that failed on the server.
    pub fn driver(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: RpcCode::Unknown,
            message: message.into(),
            daqmx_error: Some(code),
        }
    }
}

impl fmt::Display for RpcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl From<RpcStatus> for DaqError {
    fn from(status: RpcStatus) -> Self {
        match (status.daqmx_error, status.code) {
            (Some(code), _) => DaqError::driver(code, status.message),
            (None, RpcCode::Unimplemented) => DaqError::new(
                ErrorKind::FunctionNotSupported,
                error_codes::FUNCTION_NOT_SUPPORTED,
                status.message,
            ),
            (None, RpcCode::Unknown) => DaqError::driver(error_codes::UNKNOWN, status.message),
            (None, _) => DaqError::remote(status.to_string()),
        }
    }
}

/// One poll of an [`EventStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPoll {
    /// A JSON notification.
    Message(Value),
    /// Nothing arrived within the wait.
    Idle,
    /// The server ended the stream.
    Closed,
    /// The stream failed.
    Failed(RpcStatus),
}

/// Server stream carrying event notifications.
pub trait EventStream: Send {
    /// Wait up to `wait` for the next message.
    fn poll_next(&mut self, wait: Duration) -> StreamPoll;
}

/// Request/response and streaming channel to a session server.
pub trait SessionTransport: Send + Sync + fmt::Debug {
    /// Unary call.
    fn invoke(&self, method: &str, request: Value) -> std::result::Result<Value, RpcStatus>;

    /// Open a server stream.
    fn subscribe(&self, method: &str, request: Value) -> std::result::Result<Box<dyn EventStream>, RpcStatus>;
}

/// What the server does with a named session at task creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionInitializationBehavior {
    /// Attach when the session exists, otherwise initialize it.
    #[default]
    Auto,
    /// Create the session; fail if it exists.
    InitializeServerSession,
    /// Attach to an existing session; fail if it is missing.
    AttachToServerSession,
    /// Create the session and leave it open on close.
    InitializeSessionThenDetach,
    /// Attach, and close the session when the task closes.
    AttachToSessionThenClose,
}

impl SessionInitializationBehavior {
    /// Wire value.
    pub fn raw(self) -> i32 {
        match self {
            Self::Auto => 0,
            Self::InitializeServerSession => 1,
            Self::AttachToServerSession => 2,
            Self::InitializeSessionThenDetach => 3,
            Self::AttachToSessionThenClose => 4,
        }
    }
}

/// Session options applied to every task the adapter creates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrpcOptions {
    /// Must be empty or equal to the task name.
    #[serde(default)]
    pub session_name: String,
    /// Whether to create a session or attach to one.
    #[serde(default)]
    pub initialization_behavior: SessionInitializationBehavior,
}

#[derive(Debug, Default)]
struct Sessions {
    by_handle: Mutex<HashMap<TaskHandle, String>>,
    next: AtomicU64,
}

impl Sessions {
    fn insert(&self, name: String) -> TaskHandle {
        let handle = TaskHandle::from_raw(self.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.by_handle.lock().insert(handle, name);
        handle
    }

    fn name(&self, task: TaskHandle) -> Result<String> {
        self.by_handle.lock().get(&task).cloned().ok_or_else(|| {
            DaqError::driver(
                error_codes::INVALID_TASK,
                format!("No remote session is bound to task handle {task}."),
            )
        })
    }
}

/// Driver adapter that forwards calls to a session server.
#[derive(Debug, Clone)]
pub struct RemoteDriver {
    transport: Arc<dyn SessionTransport>,
    options: GrpcOptions,
    sessions: Arc<Sessions>,
}

impl RemoteDriver {
    /// Adapter over `transport` with the given session options.
    pub fn new(transport: Arc<dyn SessionTransport>, options: GrpcOptions) -> Self {
        tracing::info!(session = %options.session_name, behavior = ?options.initialization_behavior, "Remote driver created");
        Self {
            transport,
            options,
            sessions: Arc::new(Sessions::default()),
        }
    }

    /// Adapter sharing this one's transport and sessions with other options.
    #[must_use]
    pub fn with_options(&self, options: GrpcOptions) -> Self {
        Self {
            transport: self.transport.clone(),
            options,
            sessions: self.sessions.clone(),
        }
    }

    /// Session options applied to new tasks.
    pub fn options(&self) -> &GrpcOptions {
        &self.options
    }

    /// Server-side session name of a task.
    pub fn session_name(&self, task: TaskHandle) -> Result<String> {
        self.sessions.name(task)
    }

    fn call(&self, method: &str, request: Value) -> Result<Value> {
        tracing::trace!(method, "Remote call");
        let response = self.transport.invoke(method, request)?;
        if let Some(status) = response.get("status").and_then(Value::as_i64) {
            let status = i32::try_from(status).unwrap_or(error_codes::UNKNOWN);
            check_status(status, || {
                response
                    .get("error_message")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{method} returned status {status}."), str::to_string)
            })?;
        }
        Ok(response)
    }

    fn task_request(&self, task: TaskHandle, fields: Value) -> Result<Value> {
        let mut request = Map::new();
        request.insert("task".into(), json!({ "name": self.sessions.name(task)? }));
        if let Value::Object(fields) = fields {
            request.extend(fields);
        }
        Ok(Value::Object(request))
    }

    fn task_call(&self, method: &str, task: TaskHandle, fields: Value) -> Result<Value> {
        let request = self.task_request(task, fields)?;
        self.call(method, request)
    }

    fn session_check(&self, name: &str) -> Result<()> {
        let session = &self.options.session_name;
        if session.is_empty() || session == name {
            return Ok(());
        }
        Err(DaqError::driver(
            error_codes::UNKNOWN,
            format!("Unsupported session name: \"{session}\". If a session name is specified, it must match the task name."),
        )
        .with_task_name(name))
    }

    fn bind(&self, response: &Value, fallback: &str) -> (TaskHandle, bool) {
        let name = response
            .pointer("/task/name")
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_string();
        let owns = response
            .get("new_session_initialized")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        (self.sessions.insert(name), owns)
    }

    fn read_into<T: DeserializeOwned + Copy>(
        &self,
        method: &str,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        buf: &mut [T],
    ) -> Result<u32> {
        let response = self
            .task_call(method, task, read_request(samps, timeout, fill, buf.len()))
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        copy_into(buf, &field::<Vec<T>>(&response, "read_array")?);
        field(&response, "samps_per_chan_read")
    }

    #[allow(clippy::too_many_arguments)]
    fn read_pair<A: DeserializeOwned + Copy, B: DeserializeOwned + Copy>(
        &self,
        method: &str,
        task: TaskHandle,
        samps: u32,
        timeout: f64,
        fill: FillMode,
        names: (&str, &str),
        first: &mut [A],
        second: &mut [B],
    ) -> Result<u32> {
        let size = first.len().min(second.len());
        let response = self
            .task_call(method, task, read_request(samps, timeout, fill, size))
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        copy_into(first, &field::<Vec<A>>(&response, names.0)?);
        copy_into(second, &field::<Vec<B>>(&response, names.1)?);
        field(&response, "samps_per_chan_read")
    }

    fn read_scalar(&self, method: &str, task: TaskHandle, timeout: f64) -> Result<Value> {
        self.task_call(method, task, json!({ "timeout": timeout }))
            .map_err(|e| e.into_kind(ErrorKind::Read))
    }

    fn write_from<T: Serialize>(
        &self,
        method: &str,
        task: TaskHandle,
        samps: u32,
        auto_start: bool,
        timeout: f64,
        fill: FillMode,
        data: &[T],
    ) -> Result<u32> {
        let mut fields = write_request(samps, auto_start, timeout, fill);
        fields["write_array"] = serde_json::to_value(data)?;
        self.write_call(method, task, fields)
    }

    fn write_call(&self, method: &str, task: TaskHandle, fields: Value) -> Result<u32> {
        let response = self
            .task_call(method, task, fields)
            .map_err(|e| e.into_kind(ErrorKind::Write))?;
        field(&response, "samps_per_chan_written")
    }

    fn write_scalar(&self, method: &str, task: TaskHandle, auto_start: bool, timeout: f64, value: Value) -> Result<()> {
        let mut fields = json!({ "auto_start": auto_start, "timeout": timeout });
        if let (Value::Object(fields), Value::Object(value)) = (&mut fields, value) {
            fields.extend(value);
        }
        self.task_call(method, task, fields)
            .map(|_| ())
            .map_err(|e| e.into_kind(ErrorKind::Write))
    }

    fn subscribe<F>(&self, method: &'static str, task: TaskHandle, fields: Value, on_message: F) -> Result<Box<dyn EventHandler>>
    where
        F: FnMut(&Value) + Send + 'static,
    {
        let request = self.task_request(task, fields)?;
        let stream = self.transport.subscribe(method, request)?;
        let cancel = Arc::new(AtomicBool::new(false));
        let pump = spawn_pump(format!("daqmx-remote-{}", task.raw()), stream, cancel.clone(), on_message)?;
        tracing::debug!(method, %task, "Remote event stream opened");
        Ok(Box::new(RemoteEventHandler {
            method,
            cancel,
            pump: Some(pump),
        }))
    }
}

fn read_request(samps: u32, timeout: f64, fill: FillMode, size: usize) -> Value {
    json!({
        "num_samps_per_chan": samps,
        "timeout": timeout,
        "fill_mode": fill.raw(),
        "array_size_in_samps": size,
    })
}

fn write_request(samps: u32, auto_start: bool, timeout: f64, fill: FillMode) -> Value {
    json!({
        "num_samps_per_chan": samps,
        "auto_start": auto_start,
        "timeout": timeout,
        "data_layout": fill.raw(),
    })
}

fn field<T: DeserializeOwned>(response: &Value, name: &str) -> Result<T> {
    let value = response
        .get(name)
        .cloned()
        .ok_or_else(|| DaqError::remote(format!("response is missing field '{name}'")))?;
    Ok(serde_json::from_value(value)?)
}

fn copy_into<T: Copy>(buf: &mut [T], data: &[T]) {
    let n = buf.len().min(data.len());
    buf[..n].copy_from_slice(&data[..n]);
}

fn method_name(function: &str) -> &str {
    function.strip_prefix("DAQmx").unwrap_or(function)
}

fn channel_payload(spec: &ChannelSpec) -> Result<Value> {
    let value = match spec {
        ChannelSpec::AiVoltage(c) => serde_json::to_value(c),
        ChannelSpec::AiCurrent(c) => serde_json::to_value(c),
        ChannelSpec::AiThermocouple(c) => serde_json::to_value(c),
        ChannelSpec::AiPower(c) => serde_json::to_value(c),
        ChannelSpec::AoVoltage(c) => serde_json::to_value(c),
        ChannelSpec::AoCurrent(c) => serde_json::to_value(c),
        ChannelSpec::Di(c) | ChannelSpec::Do(c) => serde_json::to_value(c),
        ChannelSpec::CiCountEdges(c) => serde_json::to_value(c),
        ChannelSpec::CiFreq(c) => serde_json::to_value(c),
        ChannelSpec::CiPeriod(c) => serde_json::to_value(c),
        ChannelSpec::CiPulseWidth(c) => serde_json::to_value(c),
        ChannelSpec::CiSemiPeriod(c) => serde_json::to_value(c),
        ChannelSpec::CiTwoEdgeSep(c) => serde_json::to_value(c),
        ChannelSpec::CiPulseFreq(c) => serde_json::to_value(c),
        ChannelSpec::CiPulseTime(c) => serde_json::to_value(c),
        ChannelSpec::CiPulseTicks(c) => serde_json::to_value(c),
        ChannelSpec::CoPulseFreq(c) => serde_json::to_value(c),
        ChannelSpec::CoPulseTime(c) => serde_json::to_value(c),
        ChannelSpec::CoPulseTicks(c) => serde_json::to_value(c),
    };
    Ok(value?)
}

fn timing_method(config: &TimingConfig) -> &'static str {
    match config {
        TimingConfig::SampleClock { .. } => "CfgSampClkTiming",
        TimingConfig::Implicit { .. } => "CfgImplicitTiming",
        TimingConfig::Handshaking { .. } => "CfgHandshakingTiming",
        TimingConfig::BurstHandshakingImportClock { .. } => "CfgBurstHandshakingTimingImportClock",
        TimingConfig::BurstHandshakingExportClock { .. } => "CfgBurstHandshakingTimingExportClock",
        TimingConfig::ChangeDetection { .. } => "CfgChangeDetectionTiming",
        TimingConfig::PipelinedSampleClock { .. } => "CfgPipelinedSampClkTiming",
    }
}

fn trigger_request(config: &TriggerConfig) -> Result<(&'static str, Value)> {
    let request = match config {
        TriggerConfig::DigEdgeStart { source, edge } => (
            "CfgDigEdgeStartTrig",
            json!({ "trigger_source": source, "trigger_edge": edge }),
        ),
        TriggerConfig::AnlgEdgeStart { source, slope, level } => (
            "CfgAnlgEdgeStartTrig",
            json!({ "trigger_source": source, "trigger_slope": slope, "trigger_level": level }),
        ),
        TriggerConfig::TimeStart { when, timescale } => (
            "CfgTimeStartTrig",
            json!({ "when": timestamp_to_json(*when)?, "timescale": timescale }),
        ),
        TriggerConfig::DisableStart => ("DisableStartTrig", json!({})),
        TriggerConfig::DigEdgeRef {
            source,
            edge,
            pretrigger_samples,
        } => (
            "CfgDigEdgeRefTrig",
            json!({ "trigger_source": source, "trigger_edge": edge, "pretrigger_samples": pretrigger_samples }),
        ),
        TriggerConfig::AnlgEdgeRef {
            source,
            slope,
            level,
            pretrigger_samples,
        } => (
            "CfgAnlgEdgeRefTrig",
            json!({
                "trigger_source": source,
                "trigger_slope": slope,
                "trigger_level": level,
                "pretrigger_samples": pretrigger_samples,
            }),
        ),
        TriggerConfig::DisableRef => ("DisableRefTrig", json!({})),
    };
    Ok(request)
}

/// Timestamps travel as Unix seconds plus nanoseconds.
fn timestamp_to_json(ts: Timestamp) -> Result<Value> {
    let dt = ts.to_datetime().ok_or_else(|| {
        DaqError::invalid_argument(error_codes::INVALID_ATTRIBUTE_VALUE, "Timestamp is outside the representable range.")
    })?;
    Ok(json!({ "seconds": dt.timestamp(), "nanos": dt.timestamp_subsec_nanos() }))
}

fn timestamp_from_json(value: &Value) -> Result<Timestamp> {
    let seconds = value.get("seconds").and_then(Value::as_i64).unwrap_or(0);
    let nanos = value.get("nanos").and_then(Value::as_u64).unwrap_or(0);
    let nanos = u32::try_from(nanos).unwrap_or(0);
    Utc.timestamp_opt(seconds, nanos)
        .single()
        .map(Timestamp::from)
        .ok_or_else(|| DaqError::remote(format!("invalid timestamp {value}")))
}

fn attribute_method(verb: &str, target: AttrTarget<'_>, ty: Option<AttributeType>) -> String {
    let group = match target.group() {
        AttrGroup::Task => "Task",
        AttrGroup::Channel => "Chan",
        AttrGroup::Timing => "Timing",
        AttrGroup::Trigger => "Trig",
        AttrGroup::Read => "Read",
        AttrGroup::Write => "Write",
        AttrGroup::ExportedSignal => "ExportedSignal",
        AttrGroup::Buffer => "Buffer",
        AttrGroup::Watchdog => "Watchdog",
    };
    let suffix = match ty {
        None => "",
        Some(AttributeType::Bool) => "Bool",
        Some(AttributeType::I32) => "Int32",
        Some(AttributeType::U32) => "UInt32",
        Some(AttributeType::U64) => "UInt64",
        Some(AttributeType::F64) => "Double",
        Some(AttributeType::String | AttributeType::StringList) => "String",
        Some(AttributeType::F64List) => "DoubleArray",
        Some(AttributeType::Timestamp) => "Timestamp",
    };
    format!("{verb}{group}Attribute{suffix}")
}

fn attribute_fields(target: AttrTarget<'_>, id: i32) -> Value {
    let mut fields = json!({ "attribute_raw": id });
    match target {
        AttrTarget::Channel(names) => fields["channel"] = json!(names),
        AttrTarget::Watchdog(lines) if !lines.is_empty() => fields["lines"] = json!(lines),
        _ => {}
    }
    fields
}

fn value_to_json(value: &AttributeValue) -> Result<Value> {
    let json = match value {
        AttributeValue::Bool(v) => json!(v),
        AttributeValue::I32(v) => json!(v),
        AttributeValue::U32(v) => json!(v),
        AttributeValue::U64(v) => json!(v),
        AttributeValue::F64(v) => json!(v),
        AttributeValue::String(v) => json!(v),
        AttributeValue::StringList(v) => json!(flatten_channel_string(v)),
        AttributeValue::F64List(v) => json!(v),
        AttributeValue::Timestamp(v) => timestamp_to_json(*v)?,
    };
    Ok(json)
}

fn value_from_json(value: &Value, ty: AttributeType) -> Result<AttributeValue> {
    let decoded = match ty {
        AttributeType::Bool => AttributeValue::Bool(serde_json::from_value(value.clone())?),
        AttributeType::I32 => AttributeValue::I32(serde_json::from_value(value.clone())?),
        AttributeType::U32 => AttributeValue::U32(serde_json::from_value(value.clone())?),
        AttributeType::U64 => AttributeValue::U64(serde_json::from_value(value.clone())?),
        AttributeType::F64 => AttributeValue::F64(serde_json::from_value(value.clone())?),
        AttributeType::String => AttributeValue::String(serde_json::from_value(value.clone())?),
        AttributeType::StringList => {
            let flat: String = serde_json::from_value(value.clone())?;
            AttributeValue::StringList(unflatten_channel_string(&flat))
        }
        AttributeType::F64List => AttributeValue::F64List(serde_json::from_value(value.clone())?),
        AttributeType::Timestamp => AttributeValue::Timestamp(timestamp_from_json(value)?),
    };
    Ok(decoded)
}

fn spawn_pump<F>(name: String, mut stream: Box<dyn EventStream>, cancel: Arc<AtomicBool>, mut on_message: F) -> Result<JoinHandle<()>>
where
    F: FnMut(&Value) + Send + 'static,
{
    thread::Builder::new()
        .name(name)
        .spawn(move || {
            while !cancel.load(Ordering::Acquire) {
                match stream.poll_next(STREAM_POLL) {
                    StreamPoll::Message(message) => {
                        if cancel.load(Ordering::Acquire) {
                            break;
                        }
                        if catch_unwind(AssertUnwindSafe(|| on_message(&message))).is_err() {
                            tracing::error!("Event callback panicked; the stream keeps running");
                        }
                    }
                    StreamPoll::Idle => {}
                    StreamPoll::Closed => break,
                    StreamPoll::Failed(status) => {
                        tracing::warn!(%status, "Remote event stream failed");
                        break;
                    }
                }
            }
        })
        .map_err(|e| DaqError::remote(format!("failed to start the event pump: {e}")))
}

struct RemoteEventHandler {
    method: &'static str,
    cancel: Arc<AtomicBool>,
    pump: Option<JoinHandle<()>>,
}

impl EventHandler for RemoteEventHandler {
    fn unregister(&mut self) -> Result<()> {
        self.cancel.store(true, Ordering::Release);
        if let Some(pump) = self.pump.take() {
            // The callback itself may drop its registration.
            if pump.thread().id() != thread::current().id() && pump.join().is_err() {
                return Err(DaqError::remote(format!("{} pump thread panicked", self.method)));
            }
            tracing::debug!(method = self.method, "Remote event stream closed");
        }
        Ok(())
    }
}

impl Drop for RemoteEventHandler {
    fn drop(&mut self) {
        self.cancel.store(true, Ordering::Release);
    }
}

impl Driver for RemoteDriver {
    fn create_task(&self, name: &str) -> Result<(TaskHandle, bool)> {
        self.session_check(name)?;
        let response = self.call(
            "CreateTask",
            json!({
                "session_name": name,
                "initialization_behavior": self.options.initialization_behavior.raw(),
            }),
        )?;
        let (handle, owns) = self.bind(&response, name);
        tracing::info!(task = %name, %handle, new_session = owns, "Remote task created");
        Ok((handle, owns))
    }

    fn load_task(&self, name: &str) -> Result<TaskHandle> {
        let response = self.call(
            "LoadTask",
            json!({
                "session_name": name,
                "initialization_behavior": self.options.initialization_behavior.raw(),
            }),
        )?;
        Ok(self.bind(&response, name).0)
    }

    fn create_watchdog_timer_task(&self, device: &str, name: &str, timeout: f64) -> Result<(TaskHandle, bool)> {
        self.session_check(name)?;
        let response = self.call(
            "CreateWatchdogTimerTaskEx",
            json!({
                "device_name": device,
                "session_name": name,
                "timeout": timeout,
                "initialization_behavior": self.options.initialization_behavior.raw(),
            }),
        )?;
        Ok(self.bind(&response, name))
    }

    fn clear_task(&self, task: TaskHandle) -> Result<()> {
        let result = self.task_call("ClearTask", task, json!({}));
        // The session is gone from this process either way.
        self.sessions.by_handle.lock().remove(&task);
        result.map(|_| ())
    }

    fn start_task(&self, task: TaskHandle) -> Result<()> {
        self.task_call("StartTask", task, json!({})).map(|_| ())
    }

    fn stop_task(&self, task: TaskHandle) -> Result<()> {
        self.task_call("StopTask", task, json!({})).map(|_| ())
    }

    fn task_control(&self, task: TaskHandle, action: TaskMode) -> Result<()> {
        self.task_call("TaskControl", task, json!({ "action": action })).map(|_| ())
    }

    fn wait_until_task_done(&self, task: TaskHandle, timeout: f64) -> Result<()> {
        self.task_call("WaitUntilTaskDone", task, json!({ "time_to_wait": timeout }))
            .map(|_| ())
    }

    fn is_task_done(&self, task: TaskHandle) -> Result<bool> {
        let response = self.task_call("IsTaskDone", task, json!({}))?;
        field(&response, "is_task_done")
    }

    fn wait_for_valid_timestamp(&self, task: TaskHandle, event: TimestampEvent, timeout: f64) -> Result<Timestamp> {
        let response = self.task_call(
            "WaitForValidTimestamp",
            task,
            json!({ "timestamp_event": event, "timeout": timeout }),
        )?;
        let ts = response
            .get("timestamp")
            .ok_or_else(|| DaqError::remote("response is missing field 'timestamp'"))?;
        timestamp_from_json(ts)
    }

    fn add_global_chans_to_task(&self, task: TaskHandle, channels: &str) -> Result<()> {
        self.task_call("AddGlobalChansToTask", task, json!({ "channel_names": channels }))
            .map(|_| ())
    }

    fn save_task(&self, task: TaskHandle, save_as: &str, author: &str, options: SaveOptions) -> Result<()> {
        self.task_call(
            "SaveTask",
            task,
            json!({ "save_as": save_as, "author": author, "options_raw": options.bits() }),
        )
        .map(|_| ())
    }

    fn create_channel(&self, task: TaskHandle, spec: &ChannelSpec) -> Result<()> {
        self.task_call(method_name(spec.function_name()), task, channel_payload(spec)?)
            .map(|_| ())
    }

    fn configure_timing(&self, task: TaskHandle, config: &TimingConfig) -> Result<()> {
        self.task_call(timing_method(config), task, serde_json::to_value(config)?)
            .map(|_| ())
    }

    fn configure_trigger(&self, task: TaskHandle, config: &TriggerConfig) -> Result<()> {
        let (method, fields) = trigger_request(config)?;
        self.task_call(method, task, fields).map(|_| ())
    }

    fn send_software_trigger(&self, task: TaskHandle, trigger: SoftwareTrigger) -> Result<()> {
        self.task_call("SendSoftwareTrigger", task, json!({ "trigger_id": trigger }))
            .map(|_| ())
    }

    fn export_signal(&self, task: TaskHandle, signal: Signal, output_terminal: &str) -> Result<()> {
        self.task_call(
            "ExportSignal",
            task,
            json!({ "signal_id": signal, "output_terminal": output_terminal }),
        )
        .map(|_| ())
    }

    fn configure_logging(
        &self,
        task: TaskHandle,
        file_path: &str,
        mode: LoggingMode,
        group_name: &str,
        operation: LoggingOperation,
    ) -> Result<()> {
        self.task_call(
            "ConfigureLogging",
            task,
            json!({
                "file_path": file_path,
                "logging_mode": mode,
                "group_name": group_name,
                "operation": operation,
            }),
        )
        .map(|_| ())
    }

    fn start_new_file(&self, task: TaskHandle, file_path: &str) -> Result<()> {
        self.task_call("StartNewFile", task, json!({ "file_path": file_path }))
            .map(|_| ())
    }

    fn read_analog_f64(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        self.read_into("ReadAnalogF64", task, samps, timeout, fill, buf)
    }

    fn read_analog_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        field(&self.read_scalar("ReadAnalogScalarF64", task, timeout)?, "value")
    }

    fn read_binary_i16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i16]) -> Result<u32> {
        self.read_into("ReadBinaryI16", task, samps, timeout, fill, buf)
    }

    fn read_binary_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        self.read_into("ReadBinaryU16", task, samps, timeout, fill, buf)
    }

    fn read_binary_i32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [i32]) -> Result<u32> {
        self.read_into("ReadBinaryI32", task, samps, timeout, fill, buf)
    }

    fn read_binary_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        self.read_into("ReadBinaryU32", task, samps, timeout, fill, buf)
    }

    fn read_digital_lines(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<(u32, u32)> {
        let response = self
            .task_call("ReadDigitalLines", task, read_request(samps, timeout, fill, buf.len()))
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        copy_into(buf, &field::<Vec<u8>>(&response, "read_array")?);
        Ok((
            field(&response, "samps_per_chan_read")?,
            field(&response, "num_bytes_per_samp")?,
        ))
    }

    fn read_digital_u8(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u8]) -> Result<u32> {
        self.read_into("ReadDigitalU8", task, samps, timeout, fill, buf)
    }

    fn read_digital_u16(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u16]) -> Result<u32> {
        self.read_into("ReadDigitalU16", task, samps, timeout, fill, buf)
    }

    fn read_digital_u32(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        self.read_into("ReadDigitalU32", task, samps, timeout, fill, buf)
    }

    fn read_digital_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        field(&self.read_scalar("ReadDigitalScalarU32", task, timeout)?, "value")
    }

    fn read_counter_f64_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [f64]) -> Result<u32> {
        self.read_into("ReadCounterF64Ex", task, samps, timeout, fill, buf)
    }

    fn read_counter_u32_ex(&self, task: TaskHandle, samps: u32, timeout: f64, fill: FillMode, buf: &mut [u32]) -> Result<u32> {
        self.read_into("ReadCounterU32Ex", task, samps, timeout, fill, buf)
    }

    fn read_counter_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<f64> {
        field(&self.read_scalar("ReadCounterScalarF64", task, timeout)?, "value")
    }

    fn read_counter_scalar_u32(&self, task: TaskHandle, timeout: f64) -> Result<u32> {
        field(&self.read_scalar("ReadCounterScalarU32", task, timeout)?, "value")
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
        let names = ("read_array_frequency", "read_array_duty_cycle");
        self.read_pair("ReadCtrFreq", task, samps, timeout, fill, names, freq, duty_cycle)
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
        let names = ("read_array_high_time", "read_array_low_time");
        self.read_pair("ReadCtrTime", task, samps, timeout, fill, names, high_time, low_time)
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
        let names = ("read_array_high_ticks", "read_array_low_ticks");
        self.read_pair("ReadCtrTicks", task, samps, timeout, fill, names, high_ticks, low_ticks)
    }

    fn read_ctr_freq_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrFreq> {
        let response = self.read_scalar("ReadCtrFreqScalar", task, timeout)?;
        Ok(CtrFreq {
            freq: field(&response, "frequency")?,
            duty_cycle: field(&response, "duty_cycle")?,
        })
    }

    fn read_ctr_time_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTime> {
        let response = self.read_scalar("ReadCtrTimeScalar", task, timeout)?;
        Ok(CtrTime {
            high_time: field(&response, "high_time")?,
            low_time: field(&response, "low_time")?,
        })
    }

    fn read_ctr_ticks_scalar(&self, task: TaskHandle, timeout: f64) -> Result<CtrTick> {
        let response = self.read_scalar("ReadCtrTicksScalar", task, timeout)?;
        Ok(CtrTick {
            high_tick: field(&response, "high_ticks")?,
            low_tick: field(&response, "low_ticks")?,
        })
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
        let names = ("read_array_voltage", "read_array_current");
        self.read_pair("ReadPowerF64", task, samps, timeout, fill, names, voltage, current)
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
        let names = ("read_array_voltage", "read_array_current");
        self.read_pair("ReadPowerBinaryI16", task, samps, timeout, fill, names, voltage, current)
    }

    fn read_power_scalar_f64(&self, task: TaskHandle, timeout: f64) -> Result<PowerMeasurement> {
        let response = self.read_scalar("ReadPowerScalarF64", task, timeout)?;
        Ok(PowerMeasurement {
            voltage: field(&response, "voltage")?,
            current: field(&response, "current")?,
        })
    }

    fn read_raw(&self, task: TaskHandle, samps: u32, timeout: f64, buf: &mut [u8]) -> Result<(u32, u32)> {
        let response = self
            .task_call(
                "ReadRaw",
                task,
                json!({ "num_samps_per_chan": samps, "timeout": timeout, "array_size_in_bytes": buf.len() }),
            )
            .map_err(|e| e.into_kind(ErrorKind::Read))?;
        copy_into(buf, &field::<Vec<u8>>(&response, "read_array")?);
        Ok((field(&response, "samps_read")?, field(&response, "num_bytes_per_samp")?))
    }

    fn write_analog_f64(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[f64]) -> Result<u32> {
        self.write_from("WriteAnalogF64", task, samps, auto_start, timeout, fill, data)
    }

    fn write_analog_scalar_f64(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: f64) -> Result<()> {
        self.write_scalar("WriteAnalogScalarF64", task, auto_start, timeout, json!({ "value": value }))
    }

    fn write_binary_i16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i16]) -> Result<u32> {
        self.write_from("WriteBinaryI16", task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        self.write_from("WriteBinaryU16", task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_i32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[i32]) -> Result<u32> {
        self.write_from("WriteBinaryI32", task, samps, auto_start, timeout, fill, data)
    }

    fn write_binary_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        self.write_from("WriteBinaryU32", task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_lines(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        self.write_from("WriteDigitalLines", task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u8(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u8]) -> Result<u32> {
        self.write_from("WriteDigitalU8", task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u16(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u16]) -> Result<u32> {
        self.write_from("WriteDigitalU16", task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_u32(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, fill: FillMode, data: &[u32]) -> Result<u32> {
        self.write_from("WriteDigitalU32", task, samps, auto_start, timeout, fill, data)
    }

    fn write_digital_scalar_u32(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: u32) -> Result<()> {
        self.write_scalar("WriteDigitalScalarU32", task, auto_start, timeout, json!({ "value": value }))
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
        let mut fields = write_request(samps, auto_start, timeout, fill);
        fields["frequency"] = json!(freq);
        fields["duty_cycle"] = json!(duty_cycle);
        self.write_call("WriteCtrFreq", task, fields)
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
        let mut fields = write_request(samps, auto_start, timeout, fill);
        fields["high_time"] = json!(high_time);
        fields["low_time"] = json!(low_time);
        self.write_call("WriteCtrTime", task, fields)
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
        let mut fields = write_request(samps, auto_start, timeout, fill);
        fields["high_ticks"] = json!(high_ticks);
        fields["low_ticks"] = json!(low_ticks);
        self.write_call("WriteCtrTicks", task, fields)
    }

    fn write_ctr_freq_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrFreq) -> Result<()> {
        let fields = json!({ "frequency": value.freq, "duty_cycle": value.duty_cycle });
        self.write_scalar("WriteCtrFreqScalar", task, auto_start, timeout, fields)
    }

    fn write_ctr_time_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTime) -> Result<()> {
        let fields = json!({ "high_time": value.high_time, "low_time": value.low_time });
        self.write_scalar("WriteCtrTimeScalar", task, auto_start, timeout, fields)
    }

    fn write_ctr_ticks_scalar(&self, task: TaskHandle, auto_start: bool, timeout: f64, value: CtrTick) -> Result<()> {
        let fields = json!({ "high_ticks": value.high_tick, "low_ticks": value.low_tick });
        self.write_scalar("WriteCtrTicksScalar", task, auto_start, timeout, fields)
    }

    fn write_raw(&self, task: TaskHandle, samps: u32, auto_start: bool, timeout: f64, data: &[u8]) -> Result<u32> {
        let fields = json!({
            "num_samps": samps,
            "auto_start": auto_start,
            "timeout": timeout,
            "write_array": data,
        });
        self.write_call("WriteRaw", task, fields)
    }

    fn register_every_n_samples_event(
        &self,
        task: TaskHandle,
        event_type: EveryNSamplesEventType,
        samples: u32,
        mut callback: EveryNSamplesCallback,
    ) -> Result<Box<dyn EventHandler>> {
        let fields = json!({ "every_n_samples_event_type": event_type, "n_samples": samples });
        self.subscribe("RegisterEveryNSamplesEvent", task, fields, move |message| {
            let samples = message
                .get("n_samples")
                .and_then(Value::as_u64)
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(samples);
            callback(EveryNSamplesEvent {
                task,
                event_type,
                samples,
            });
        })
    }

    fn register_done_event(&self, task: TaskHandle, mut callback: DoneCallback) -> Result<Box<dyn EventHandler>> {
        self.subscribe("RegisterDoneEvent", task, json!({}), move |message| {
            let status = message
                .get("status")
                .and_then(Value::as_i64)
                .and_then(|s| i32::try_from(s).ok())
                .unwrap_or(0);
            callback(DoneEvent { task, status });
        })
    }

    fn register_signal_event(&self, task: TaskHandle, signal: Signal, mut callback: SignalCallback) -> Result<Box<dyn EventHandler>> {
        self.subscribe("RegisterSignalEvent", task, json!({ "signal_id": signal }), move |message| {
            let signal = message
                .get("signal_id")
                .and_then(Value::as_i64)
                .and_then(|raw| i32::try_from(raw).ok())
                .and_then(Signal::from_raw)
                .unwrap_or(signal);
            callback(SignalEvent { task, signal });
        })
    }

    fn control_watchdog_task(&self, task: TaskHandle, action: WatchdogControlAction) -> Result<()> {
        self.task_call("ControlWatchdogTask", task, json!({ "action": action }))
            .map(|_| ())
    }

    fn cfg_watchdog_ao_expir_states(
        &self,
        task: TaskHandle,
        channels: &str,
        states: &[f64],
        output_types: &[WatchdogAOExpirState],
    ) -> Result<()> {
        self.task_call(
            "CfgWatchdogAOExpirStates",
            task,
            json!({ "channel_names": channels, "expir_state_array": states, "output_type_array": output_types }),
        )
        .map(|_| ())
    }

    fn cfg_watchdog_co_expir_states(&self, task: TaskHandle, channels: &str, states: &[WatchdogCOExpirState]) -> Result<()> {
        self.task_call(
            "CfgWatchdogCOExpirStates",
            task,
            json!({ "channel_names": channels, "expir_state_array": states }),
        )
        .map(|_| ())
    }

    fn cfg_watchdog_do_expir_states(&self, task: TaskHandle, channels: &str, states: &[DigitalLineState]) -> Result<()> {
        self.task_call(
            "CfgWatchdogDOExpirStates",
            task,
            json!({ "channel_names": channels, "dig_state_array": states }),
        )
        .map(|_| ())
    }

    fn get_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, ty: AttributeType) -> Result<AttributeValue> {
        let method = attribute_method("Get", target, Some(ty));
        let response = self.task_call(&method, task, attribute_fields(target, id))?;
        let value = response
            .get("value")
            .ok_or_else(|| DaqError::remote(format!("{method} response is missing field 'value'")))?;
        value_from_json(value, ty)
    }

    fn set_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32, value: &AttributeValue) -> Result<()> {
        let method = attribute_method("Set", target, Some(value.attribute_type()));
        let mut fields = attribute_fields(target, id);
        fields["value"] = value_to_json(value)?;
        tracing::debug!(method = %method, attribute = id, "Remote attribute set");
        self.task_call(&method, task, fields).map(|_| ())
    }

    fn reset_attribute(&self, task: TaskHandle, target: AttrTarget<'_>, id: i32) -> Result<()> {
        let method = attribute_method("Reset", target, None);
        self.task_call(&method, task, attribute_fields(target, id)).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct ScriptedTransport {
        responses: Mutex<HashMap<String, Value>>,
        requests: Mutex<Vec<(String, Value)>>,
        events: Mutex<VecDeque<Value>>,
    }

    impl ScriptedTransport {
        fn respond(&self, method: &str, response: Value) {
            self.responses.lock().insert(method.to_string(), response);
        }
    }

    struct QueueStream(Vec<Value>);

    impl EventStream for QueueStream {
        fn poll_next(&mut self, wait: Duration) -> StreamPoll {
            match self.0.pop() {
                Some(message) => StreamPoll::Message(message),
                None => {
                    thread::sleep(wait);
                    StreamPoll::Idle
                }
            }
        }
    }

    impl SessionTransport for ScriptedTransport {
        fn invoke(&self, method: &str, request: Value) -> std::result::Result<Value, RpcStatus> {
            self.requests.lock().push((method.to_string(), request));
            self.responses
                .lock()
                .get(method)
                .cloned()
                .ok_or_else(|| RpcStatus::new(RpcCode::Unimplemented, format!("{method} is not scripted")))
        }

        fn subscribe(&self, _method: &str, _request: Value) -> std::result::Result<Box<dyn EventStream>, RpcStatus> {
            Ok(Box::new(QueueStream(self.events.lock().drain(..).collect())))
        }
    }

    fn driver(options: GrpcOptions) -> (Arc<ScriptedTransport>, RemoteDriver) {
        let transport = Arc::new(ScriptedTransport::default());
        transport.respond(
            "CreateTask",
            json!({ "task": { "name": "ai_task" }, "new_session_initialized": false }),
        );
        (transport.clone(), RemoteDriver::new(transport, options))
    }

    #[test]
    fn test_session_name_must_match_task_name() {
        let (_, remote) = driver(GrpcOptions {
            session_name: "other".into(),
            ..Default::default()
        });
        let err = remote.create_task("ai_task").unwrap_err();
        assert_eq!(err.code(), error_codes::UNKNOWN);
        assert!(err.message().contains("Unsupported session name: \"other\""));
    }

    #[test]
    fn test_attached_session_is_not_owned() {
        let (transport, remote) = driver(GrpcOptions {
            session_name: "ai_task".into(),
            initialization_behavior: SessionInitializationBehavior::AttachToServerSession,
        });
        let (task, owns) = remote.create_task("ai_task").unwrap();
        assert!(!owns);
        assert_eq!(remote.session_name(task).unwrap(), "ai_task");
        let requests = transport.requests.lock();
        assert_eq!(requests[0].1["initialization_behavior"], json!(2));
    }

    #[test]
    fn test_vendor_code_wins_over_rpc_code() {
        let err = DaqError::from(RpcStatus::driver(error_codes::INVALID_TASK, "gone"));
        assert_eq!(err.code(), error_codes::INVALID_TASK);

        let err = DaqError::from(RpcStatus::new(RpcCode::Unavailable, "down"));
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn test_read_fills_caller_buffer() {
        let (transport, remote) = driver(GrpcOptions::default());
        transport.respond("ReadAnalogF64", json!({ "read_array": [1.0, 2.0, 3.0], "samps_per_chan_read": 3 }));
        let (task, _) = remote.create_task("ai_task").unwrap();
        let mut buf = [0.0; 4];
        let n = remote
            .read_analog_f64(task, 3, 1.0, FillMode::GroupByChannel, &mut buf)
            .unwrap();
        assert_eq!(n, 3);
        assert_eq!(buf, [1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_event_pump_delivers_and_unregister_joins() {
        let (transport, remote) = driver(GrpcOptions::default());
        transport.events.lock().push_back(json!({ "status": 0 }));
        let (task, _) = remote.create_task("ai_task").unwrap();
        let (tx, rx) = mpsc::channel();
        let mut handler = remote
            .register_done_event(task, Box::new(move |event| tx.send(event.status).unwrap()))
            .unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 0);
        handler.unregister().unwrap();
        handler.unregister().unwrap();
    }

    #[test]
    fn test_attribute_method_names() {
        assert_eq!(
            attribute_method("Get", AttrTarget::Timing, Some(AttributeType::F64)),
            "GetTimingAttributeDouble"
        );
        assert_eq!(attribute_method("Reset", AttrTarget::Channel("a"), None), "ResetChanAttribute");
    }
}
