//! Error types for DAQmx operations.
//!
//! Every negative driver status becomes a [`DaqError`]. The error carries the
//! vendor status code, the extended error text the driver reported, and,
//! where it applies, the task name and the number of samples transferred
//! before the failure.

use std::fmt;
use thiserror::Error;

/// Result type alias for DAQmx operations.
pub type Result<T> = std::result::Result<T, DaqError>;

/// Vendor status codes used by this crate.
///
/// The driver defines several thousand codes; only the ones the binding
/// produces or inspects itself are listed here.
pub mod error_codes {
    /// Generic failure without a more specific vendor code.
    pub const UNKNOWN: i32 = -1;
    /// Status returned when the task handle is not valid.
    pub const INVALID_TASK: i32 = -200088;
    /// Task name conflicts with an existing task.
    pub const DUPLICATE_TASK: i32 = -200089;
    /// Physical channel does not exist on the device.
    pub const PHYSICAL_CHAN_DOES_NOT_EXIST: i32 = -200170;
    /// Device identifier is not known to the driver.
    pub const INVALID_DEVICE_ID: i32 = -200220;
    /// Attribute value is not valid for this attribute.
    pub const INVALID_ATTRIBUTE_VALUE: i32 = -200077;
    /// Attribute is not supported by the task configuration.
    pub const ATTRIBUTE_NOT_SUPPORTED_IN_TASK_CONTEXT: i32 = -200452;
    /// Channel values disagree when read as a set.
    pub const ATTRIBUTE_INCONSISTENT_ACROSS_CHANNELS: i32 = -200657;
    /// Samples requested by a read are not yet available.
    pub const SAMPLES_NOT_YET_AVAILABLE: i32 = -200284;
    /// A blocking call did not complete before its timeout.
    pub const OPERATION_TIMED_OUT: i32 = -200474;
    /// `wait_until_done` timed out before the task finished.
    pub const WAIT_UNTIL_DONE_TIMED_OUT: i32 = -200560;
    /// Task has no channels.
    pub const NO_CHANS_IN_TASK: i32 = -200478;
    /// Read buffer is smaller than the requested transfer.
    pub const READ_BUFFER_TOO_SMALL: i32 = -200229;
    /// Write data does not match the number of channels in the task.
    pub const WRITE_NUM_CHANS_MISMATCH: i32 = -200524;
    /// Read was issued against a channel type it cannot serve.
    pub const READ_CHAN_TYPE_MISMATCH: i32 = -200525;
    /// Write was issued against a channel type it cannot serve.
    pub const WRITE_CHAN_TYPE_MISMATCH: i32 = -200526;
    /// Operation is undefined in the current task state.
    pub const INVALID_TASK_STATE: i32 = -200479;
    /// Watchdog timer has expired and must be cleared.
    pub const WATCHDOG_EXPIRED: i32 = -200644;
    /// Saved task name does not exist.
    pub const TASK_NOT_IN_DATA_NEIGHBORHOOD: i32 = -200323;
    /// Saved task already exists and overwrite was not requested.
    pub const TASK_ALREADY_SAVED: i32 = -200480;
    /// Entry point missing from the loaded driver version.
    pub const FUNCTION_NOT_SUPPORTED: i32 = -200197;
    /// Device does not support timestamps on this signal.
    pub const TIMESTAMP_NOT_SUPPORTED: i32 = -201401;
    /// Named channel is not part of the task.
    pub const CHAN_NOT_IN_TASK: i32 = -200486;
    /// Global channel name not found in the configuration store.
    pub const GLOBAL_CHAN_NOT_FOUND: i32 = -200489;
    /// Scalar read issued against a task with several channels.
    pub const READ_NUM_CHANS_MISMATCH: i32 = -200523;
    /// Attribute cannot be set or reset.
    pub const ATTRIBUTE_READ_ONLY: i32 = -200096;
    /// Channels in write data carry different sample counts.
    pub const NUM_SAMPS_WRONG: i32 = -200102;
    /// Every-N-samples event registration with a zero interval.
    pub const EVERY_N_SAMPLES_INVALID: i32 = -200878;
}

/// Category of a [`DaqError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Generic negative status from the driver.
    Driver,
    /// A read failed; samples acquired before the failure are recorded.
    Read,
    /// A write failed; samples generated before the failure are recorded.
    Write,
    /// The task was closed and its handle can no longer be used.
    InvalidHandle,
    /// The driver does not provide the requested entry point.
    FunctionNotSupported,
    /// The driver library could not be located.
    NotFound,
    /// The driver is present but the platform or build cannot use it.
    NotSupported,
    /// Data or arguments were rejected before any driver call.
    InvalidArgument,
    /// A property name is not part of the façade's property set.
    UnknownProperty,
    /// An event of this kind is already registered on the task.
    AlreadyRegistered,
    /// The remote session transport failed.
    Remote,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Driver => "driver error",
            Self::Read => "read error",
            Self::Write => "write error",
            Self::InvalidHandle => "invalid handle",
            Self::FunctionNotSupported => "function not supported",
            Self::NotFound => "driver not found",
            Self::NotSupported => "driver not supported",
            Self::InvalidArgument => "invalid argument",
            Self::UnknownProperty => "unknown property",
            Self::AlreadyRegistered => "event already registered",
            Self::Remote => "remote session error",
        };
        f.write_str(label)
    }
}

/// Error reported by the driver or raised by the binding.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct DaqError {
    kind: ErrorKind,
    code: i32,
    message: String,
    task_name: Option<String>,
    samples_transferred: Option<u32>,
}

impl fmt::Display for DaqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(task) = &self.task_name {
            write!(f, "\n\nTask Name: {task}")?;
        }
        if let Some(samples) = self.samples_transferred {
            write!(f, "\n\nSamples Transferred: {samples}")?;
        }
        write!(f, "\n\nStatus Code: {}", self.code)
    }
}

impl DaqError {
    /// Create an error of the given kind.
    pub fn new(kind: ErrorKind, code: i32, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            task_name: None,
            samples_transferred: None,
        }
    }

    /// Generic driver failure.
    pub fn driver(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Driver, code, message)
    }

    /// Read failure with the number of samples per channel already read.
    pub fn read(code: i32, message: impl Into<String>, samples_read: u32) -> Self {
        Self::new(ErrorKind::Read, code, message).with_samples_transferred(samples_read)
    }

    /// Write failure with the number of samples per channel already written.
    pub fn write(code: i32, message: impl Into<String>, samples_written: u32) -> Self {
        Self::new(ErrorKind::Write, code, message).with_samples_transferred(samples_written)
    }

    /// Use of a task after it has been closed.
    pub fn invalid_handle(task_name: &str) -> Self {
        Self::new(
            ErrorKind::InvalidHandle,
            error_codes::INVALID_TASK,
            "Task has already been closed and its handle is no longer valid.",
        )
        .with_task_name(task_name)
    }

    /// Entry point not available in the active driver.
    pub fn function_not_supported(function: &str) -> Self {
        Self::new(
            ErrorKind::FunctionNotSupported,
            error_codes::FUNCTION_NOT_SUPPORTED,
            format!("The driver does not support the function {function}."),
        )
    }

    /// Argument rejected before reaching the driver.
    pub fn invalid_argument(code: i32, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, code, message)
    }

    /// Property name not present in a façade's property set.
    pub fn unknown_property(group: &str, name: &str) -> Self {
        Self::new(
            ErrorKind::UnknownProperty,
            error_codes::UNKNOWN,
            format!("'{name}' is not a property of {group}."),
        )
    }

    /// Second registration of an event kind.
    pub fn already_registered(event: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyRegistered,
            error_codes::UNKNOWN,
            format!("A {event} event is already registered. Unregister it before registering a new callback."),
        )
    }

    /// Transport-level failure in the remote-session adapter.
    pub fn remote(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Remote, error_codes::UNKNOWN, message)
    }

    /// Attach the task name for diagnostics.
    #[must_use]
    pub fn with_task_name(mut self, task_name: &str) -> Self {
        if !task_name.is_empty() {
            self.task_name = Some(task_name.to_string());
        }
        self
    }

    /// Attach the transferred sample count.
    #[must_use]
    pub fn with_samples_transferred(mut self, samples: u32) -> Self {
        self.samples_transferred = Some(samples);
        self
    }

    /// Reclassify a driver error as a read or write failure.
    #[must_use]
    pub(crate) fn into_kind(mut self, kind: ErrorKind) -> Self {
        if self.kind == ErrorKind::Driver {
            self.kind = kind;
        }
        self
    }

    /// Error category.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Vendor status code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// Textual detail without the task name or code suffix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Task the error was raised on, if known.
    pub fn task_name(&self) -> Option<&str> {
        self.task_name.as_deref()
    }

    /// Samples per channel transferred before a read or write failed.
    pub fn samples_transferred(&self) -> Option<u32> {
        self.samples_transferred
    }

    /// True for the two timeout statuses.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.code,
            error_codes::OPERATION_TIMED_OUT | error_codes::WAIT_UNTIL_DONE_TIMED_OUT
        )
    }
}

impl From<serde_json::Error> for DaqError {
    fn from(err: serde_json::Error) -> Self {
        DaqError::remote(format!("malformed session payload: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_task_and_code() {
        let err = DaqError::driver(error_codes::INVALID_TASK, "Task specified is invalid.")
            .with_task_name("ai_task");
        let text = err.to_string();
        assert!(text.starts_with("Task specified is invalid."));
        assert!(text.contains("Task Name: ai_task"));
        assert!(text.ends_with("Status Code: -200088"));
    }

    #[test]
    fn test_read_error_carries_samples() {
        let err = DaqError::read(error_codes::OPERATION_TIMED_OUT, "timed out", 42);
        assert_eq!(err.kind(), ErrorKind::Read);
        assert_eq!(err.samples_transferred(), Some(42));
        assert!(err.is_timeout());
    }

    #[test]
    fn test_into_kind_only_reclassifies_driver_errors() {
        let driver = DaqError::driver(-1, "x").into_kind(ErrorKind::Write);
        assert_eq!(driver.kind(), ErrorKind::Write);

        let handle = DaqError::invalid_handle("t").into_kind(ErrorKind::Write);
        assert_eq!(handle.kind(), ErrorKind::InvalidHandle);
    }

    #[test]
    fn test_empty_task_name_is_ignored() {
        let err = DaqError::driver(-1, "x").with_task_name("");
        assert_eq!(err.task_name(), None);
    }
}
