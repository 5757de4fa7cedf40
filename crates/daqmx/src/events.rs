//! Event registrations of a task.
//!
//! The driver invokes callbacks on its own threads. A task keeps at most one
//! registration per [`EventKind`]; the registry owns the driver-side
//! [`EventHandler`], which in turn owns the callback, so the callback stays
//! alive until the driver has confirmed unregistration.
//!
//! [`EventSink`] adapts any event into a bounded `tokio` channel for async
//! consumers. The driver thread never blocks on it: a full channel drops
//! the notification and counts it.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::driver::EventHandler;
use crate::error::{DaqError, Result};

/// Kind of event a task can register a callback for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The task finished or stopped on an error.
    Done,
    /// N samples were acquired into the input buffer.
    EveryNSamplesAcquiredIntoBuffer,
    /// N samples were transferred out of the output buffer.
    EveryNSamplesTransferredFromBuffer,
    /// A hardware signal fired.
    Signal,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Done => "Done",
            EventKind::EveryNSamplesAcquiredIntoBuffer => "Every N Samples Acquired Into Buffer",
            EventKind::EveryNSamplesTransferredFromBuffer => "Every N Samples Transferred From Buffer",
            EventKind::Signal => "Signal",
        };
        f.write_str(name)
    }
}

/// Registrations of one task, keyed by kind.
#[derive(Default)]
pub(crate) struct EventRegistry {
    handlers: Mutex<HashMap<EventKind, Box<dyn EventHandler>>>,
}

impl EventRegistry {
    /// Register through `register` unless `kind` already has a callback.
    ///
    /// The map stays locked across the driver call so two threads cannot
    /// both register the same kind.
    pub fn register(
        &self,
        kind: EventKind,
        register: impl FnOnce() -> Result<Box<dyn EventHandler>>,
    ) -> Result<()> {
        let mut handlers = self.handlers.lock();
        if handlers.contains_key(&kind) {
            return Err(DaqError::already_registered(&kind.to_string()));
        }
        let handler = register()?;
        handlers.insert(kind, handler);
        debug!(event = %kind, "Event callback registered");
        Ok(())
    }

    /// Remove the registration of `kind`; a no-op when there is none.
    ///
    /// The driver call runs with the map unlocked so a callback in flight
    /// may still register or unregister other kinds.
    pub fn unregister(&self, kind: EventKind) -> Result<()> {
        let handler = self.handlers.lock().remove(&kind);
        match handler {
            Some(mut handler) => {
                handler.unregister()?;
                debug!(event = %kind, "Event callback unregistered");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// Whether a handler of `kind` is registered.
    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.lock().contains_key(&kind)
    }

    /// Unregister everything, continuing past failures.
    ///
    /// The map is snapshotted and emptied under the lock before any driver
    /// call. Returns the first error.
    pub fn close_all(&self) -> Result<()> {
        let mut drained: Vec<(EventKind, Box<dyn EventHandler>)> = self.handlers.lock().drain().collect();
        drained.sort_by_key(|(kind, _)| *kind);
        let mut first_error = None;
        for (kind, mut handler) in drained {
            if let Err(e) = handler.unregister() {
                warn!(event = %kind, error = %e, "Failed to unregister event callback");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<EventKind> = self.handlers.lock().keys().copied().collect();
        kinds.sort();
        f.debug_struct("EventRegistry").field("registered", &kinds).finish()
    }
}

/// Forwards events into a bounded `tokio` channel.
///
/// ```no_run
/// # async fn example(task: &daqmx::Task) -> daqmx::Result<()> {
/// let (sink, mut done) = task.done_events(8)?;
/// task.start()?;
/// if let Some(event) = done.recv().await {
///     println!("done with status {}", event.status);
/// }
/// println!("{} notifications dropped", sink.dropped());
/// # Ok(())
/// # }
/// ```
pub struct EventSink<E> {
    sender: mpsc::Sender<E>,
    dropped: Arc<AtomicU64>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl<E: Send + 'static> EventSink<E> {
    /// Create a sink and the receiver it feeds.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<E>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let sink = Self {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (sink, receiver)
    }

    /// Offer one event without blocking.
    pub fn send(&self, event: E) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                trace!("Dropped event (sink full)");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::SeqCst);
                trace!("Dropped event (receiver closed)");
            }
        }
    }

    /// Boxed callback feeding this sink, suitable for event registration.
    pub fn callback(&self) -> Box<dyn FnMut(E) + Send> {
        let sink = self.clone();
        Box::new(move |event| sink.send(event))
    }

    /// Notifications dropped because the receiver was full or gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

impl<E> fmt::Debug for EventSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("capacity", &self.sender.max_capacity())
            .field("dropped", &self.dropped.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Recorder {
        log: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        fail: bool,
    }

    impl EventHandler for Recorder {
        fn unregister(&mut self) -> Result<()> {
            self.log.lock().push(self.name);
            if self.fail {
                Err(DaqError::driver(-1, "unregister failed"))
            } else {
                Ok(())
            }
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str, fail: bool) -> Box<dyn EventHandler> {
        Box::new(Recorder {
            log: Arc::clone(log),
            name,
            fail,
        })
    }

    #[test]
    fn test_second_registration_fails() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = EventRegistry::default();
        registry.register(EventKind::Done, || Ok(recorder(&log, "done", false))).unwrap();
        let err = registry
            .register(EventKind::Done, || Ok(recorder(&log, "again", false)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRegistered);

        registry.unregister(EventKind::Done).unwrap();
        registry.unregister(EventKind::Done).unwrap();
        assert_eq!(*log.lock(), vec!["done"]);
        assert!(!registry.is_registered(EventKind::Done));
    }

    #[test]
    fn test_close_all_continues_after_failure() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = EventRegistry::default();
        registry.register(EventKind::Done, || Ok(recorder(&log, "done", true))).unwrap();
        registry
            .register(EventKind::Signal, || Ok(recorder(&log, "signal", false)))
            .unwrap();

        let err = registry.close_all().unwrap_err();
        assert_eq!(err.message(), "unregister failed");
        assert_eq!(*log.lock(), vec!["done", "signal"]);
        assert!(registry.close_all().is_ok());
    }

    #[tokio::test]
    async fn test_sink_counts_drops() {
        let (sink, mut rx) = EventSink::<u32>::new(1);
        let mut callback = sink.callback();
        callback(1);
        callback(2);
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(sink.dropped(), 1);

        drop(rx);
        callback(3);
        assert_eq!(sink.dropped(), 2);
    }
}
