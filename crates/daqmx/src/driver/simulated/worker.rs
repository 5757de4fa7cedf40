//! Sample-clock worker and callback slots of the simulated driver.
//!
//! Sample availability is derived from elapsed time, so the worker never
//! produces data itself. It only walks the clock forward and dispatches the
//! events the new samples cross. Callbacks run with the state lock released.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::ReentrantMutex;

use super::state::SimTask;
use super::SimInner;
use crate::constants::{EveryNSamplesEventType, Signal};
use crate::driver::{
    DoneCallback, DoneEvent, EventHandler, EveryNSamplesCallback, EveryNSamplesEvent, SignalCallback, SignalEvent,
    TaskHandle,
};
use crate::error::{error_codes, DaqError, Result};

const TICK: Duration = Duration::from_millis(2);

static NEXT_REGISTRATION: AtomicU64 = AtomicU64::new(1);

/// A callback cell. Invocation holds the re-entrant lock, so unregistering
/// from another thread waits for it; the invoking thread may re-enter.
pub(super) type Slot<C> = Arc<ReentrantMutex<RefCell<C>>>;

pub(super) fn new_slot<C>(callback: C) -> (u64, Slot<C>) {
    let id = NEXT_REGISTRATION.fetch_add(1, Ordering::Relaxed);
    (id, Arc::new(ReentrantMutex::new(RefCell::new(callback))))
}

pub(super) struct EveryNSlot {
    pub id: u64,
    pub event_type: EveryNSamplesEventType,
    pub interval: u32,
    pub slot: Slot<EveryNSamplesCallback>,
}

pub(super) struct SignalSlot {
    pub id: u64,
    pub signal: Signal,
    pub slot: Slot<SignalCallback>,
}

#[derive(Default)]
pub(super) struct EventSlots {
    pub every_n: Vec<EveryNSlot>,
    pub done: Option<(u64, Slot<DoneCallback>)>,
    pub signals: Vec<SignalSlot>,
}

impl EventSlots {
    pub fn remove(&mut self, id: u64) {
        self.every_n.retain(|s| s.id != id);
        self.signals.retain(|s| s.id != id);
        if self.done.as_ref().is_some_and(|(done, _)| *done == id) {
            self.done = None;
        }
    }
}

fn invoke<E>(slot: &Slot<Box<dyn FnMut(E) + Send>>, event: E) {
    let guard = slot.lock();
    // Re-entrant invocation of the same callback is skipped.
    let Ok(mut callback) = guard.try_borrow_mut() else {
        return;
    };
    if catch_unwind(AssertUnwindSafe(|| (*callback)(event))).is_err() {
        tracing::error!("Event callback panicked; the clock keeps running");
    }
}

/// Handler returned by the simulated registration calls.
pub(super) struct SimEventHandler {
    inner: Arc<SimInner>,
    task: TaskHandle,
    id: u64,
    function: &'static str,
    quiesce: Option<Box<dyn FnOnce() + Send>>,
}

impl SimEventHandler {
    pub fn new<C: Send + 'static>(
        inner: Arc<SimInner>,
        task: TaskHandle,
        id: u64,
        function: &'static str,
        slot: Slot<C>,
    ) -> Self {
        Self {
            inner,
            task,
            id,
            function,
            quiesce: Some(Box::new(move || drop(slot.lock()))),
        }
    }
}

impl EventHandler for SimEventHandler {
    fn unregister(&mut self) -> Result<()> {
        let Some(quiesce) = self.quiesce.take() else {
            return Ok(());
        };
        self.inner.record(self.function, Some(self.task));
        if let Some(task) = self.inner.state.lock().tasks.get_mut(&self.task) {
            task.events.remove(self.id);
        }
        quiesce();
        Ok(())
    }
}

enum Fire {
    EveryN(Slot<EveryNSamplesCallback>, EveryNSamplesEvent),
    Signal(Slot<SignalCallback>, SignalEvent),
}

impl Fire {
    fn invoke(self) {
        match self {
            Fire::EveryN(slot, event) => invoke(&slot, event),
            Fire::Signal(slot, event) => invoke(&slot, event),
        }
    }
}

/// Events crossed while the clock moved from `seen` to `produced` samples.
fn crossed(task: &SimTask, handle: TaskHandle, seen: u64, produced: u64) -> Vec<Fire> {
    let direction = if task.input_indices().is_empty() {
        EveryNSamplesEventType::TransferredFromBuffer
    } else {
        EveryNSamplesEventType::AcquiredIntoBuffer
    };
    let mut fires = Vec::new();
    for every in task.events.every_n.iter().filter(|e| e.event_type == direction) {
        let n = u64::from(every.interval.max(1));
        for _ in seen / n..produced / n {
            fires.push(Fire::EveryN(
                every.slot.clone(),
                EveryNSamplesEvent {
                    task: handle,
                    event_type: every.event_type,
                    samples: every.interval,
                },
            ));
        }
    }
    for sig in &task.events.signals {
        if matches!(sig.signal, Signal::SampleClock | Signal::SampleCompleteEvent) {
            for _ in seen..produced {
                fires.push(Fire::Signal(
                    sig.slot.clone(),
                    SignalEvent {
                        task: handle,
                        signal: sig.signal,
                    },
                ));
            }
        }
    }
    fires
}

pub(super) fn spawn_clock(inner: Arc<SimInner>, handle: TaskHandle, epoch: u64) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("daqmx-sim-{}", handle.raw()))
        .spawn(move || run_clock(&inner, handle, epoch))
        .map_err(|e| DaqError::driver(error_codes::UNKNOWN, format!("Failed to start the sample clock: {e}")))
}

fn run_clock(inner: &SimInner, handle: TaskHandle, epoch: u64) {
    let mut seen = 0u64;
    loop {
        let (fires, finished) = {
            let state = inner.state.lock();
            let Some(task) = state.tasks.get(&handle) else {
                return;
            };
            if task.epoch != epoch {
                return;
            }
            let Some(clock) = task.clock else {
                return;
            };
            let produced = clock.produced(Instant::now());
            let fires = crossed(task, handle, seen, produced);
            seen = produced;
            (fires, clock.total.is_some_and(|total| produced >= total))
        };
        inner.cond.notify_all();

        for fire in fires {
            if !inner.epoch_is(handle, epoch) {
                return;
            }
            fire.invoke();
        }

        if finished {
            let done = {
                let mut state = inner.state.lock();
                let Some(task) = state.tasks.get_mut(&handle) else {
                    return;
                };
                if task.epoch != epoch {
                    return;
                }
                task.state = super::state::TaskState::Done;
                task.events.done.as_ref().map(|(_, slot)| slot.clone())
            };
            inner.cond.notify_all();
            tracing::debug!(%handle, samples = seen, "Simulated acquisition complete");
            if let Some(slot) = done {
                invoke(&slot, DoneEvent { task: handle, status: 0 });
            }
            return;
        }
        thread::sleep(TICK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_only_matching_registration() {
        let mut slots = EventSlots::default();
        let (id, slot) = new_slot::<DoneCallback>(Box::new(|_| {}));
        slots.done = Some((id, slot));
        slots.remove(id + 1000);
        assert!(slots.done.is_some());
        slots.remove(id);
        assert!(slots.done.is_none());
    }

    #[test]
    fn test_invoke_survives_panicking_callback() {
        let (_, slot) = new_slot::<DoneCallback>(Box::new(|_| panic!("boom")));
        invoke(&slot, DoneEvent { task: TaskHandle::from_raw(1), status: 0 });
        invoke(&slot, DoneEvent { task: TaskHandle::from_raw(1), status: 0 });
    }
}
