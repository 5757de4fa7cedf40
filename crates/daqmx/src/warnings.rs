//! Non-fatal diagnostics.
//!
//! Positive driver statuses and task-lifetime problems are reported as
//! [`Warning`]s. Each warning is logged through `tracing` and then handed to
//! the process-wide handler, if one is installed, so applications can
//! collect or escalate them.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

/// Positive status returned by the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaqWarning {
    /// Vendor status code (always positive).
    pub code: i32,
    /// Driver-provided description.
    pub message: String,
}

/// A task was used or destroyed in a way that risks leaking driver resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaqResourceWarning {
    /// Name of the affected task.
    pub task_name: String,
    /// What happened.
    pub message: String,
}

/// Any warning surfaced by the binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Positive driver status.
    Driver(DaqWarning),
    /// Task lifetime warning.
    Resource(DaqResourceWarning),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::Driver(w) => write!(f, "{}\n\nStatus Code: {}", w.message, w.code),
            Warning::Resource(w) => write!(f, "{} (task '{}')", w.message, w.task_name),
        }
    }
}

/// Callback receiving every warning emitted in this process.
pub type WarningHandler = Arc<dyn Fn(&Warning) + Send + Sync>;

static HANDLER: RwLock<Option<WarningHandler>> = parking_lot::const_rwlock(None);

/// Install a handler for all subsequent warnings, replacing any previous one.
pub fn set_warning_handler(handler: impl Fn(&Warning) + Send + Sync + 'static) {
    *HANDLER.write() = Some(Arc::new(handler));
}

/// Remove and return the installed handler.
pub fn take_warning_handler() -> Option<WarningHandler> {
    HANDLER.write().take()
}

pub(crate) fn emit(warning: Warning) {
    match &warning {
        Warning::Driver(w) => warn!(code = w.code, "DAQmx warning: {}", w.message),
        Warning::Resource(w) => warn!(task = %w.task_name, "{}", w.message),
    }
    // Clone out so a handler may itself install or remove handlers.
    let handler = HANDLER.read().clone();
    if let Some(handler) = handler {
        handler(&warning);
    }
}

pub(crate) fn driver_warning(code: i32, message: impl Into<String>) {
    emit(Warning::Driver(DaqWarning {
        code,
        message: message.into(),
    }));
}

pub(crate) fn resource_warning(task_name: &str, message: impl Into<String>) {
    emit(Warning::Resource(DaqResourceWarning {
        task_name: task_name.to_string(),
        message: message.into(),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_warning_display() {
        let w = Warning::Driver(DaqWarning {
            code: 200015,
            message: "Values clipped".into(),
        });
        assert_eq!(w.to_string(), "Values clipped\n\nStatus Code: 200015");

        let r = Warning::Resource(DaqResourceWarning {
            task_name: "t".into(),
            message: "Task was not closed".into(),
        });
        assert_eq!(r.to_string(), "Task was not closed (task 't')");
    }

    #[traced_test]
    #[test]
    fn test_resource_warning_is_logged() {
        resource_warning("leaky", "Task was not explicitly closed.");
        assert!(logs_contain("Task was not explicitly closed."));
        assert!(logs_contain("leaky"));
    }
}
