//! Task handle ownership and lifecycle.
//!
//! A [`Task`] owns one driver handle and releases it exactly once, either in
//! [`Task::close`] or when the task is dropped. Every method takes `&self`:
//! the handle lives behind a lock so another thread may close the task while
//! a read is waiting, and the façades returned by [`Task::timing`],
//! [`Task::ai_channels`] and friends borrow the task instead of sharing it.
//!
//! Event callbacks that need to read from their own task should hold a
//! `Weak` reference to an `Arc<Task>`; a strong one would keep the task alive
//! through its own registration.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::attributes::{self, AttrTarget, Attribute, AttributeKind, AttributeValue};
use crate::channels::{
    self, AiChannelCollection, AoChannelCollection, Channel, CiChannelCollection, CoChannelCollection,
    DiChannelCollection, DoChannelCollection,
};
use crate::constants::{EveryNSamplesEventType, SaveOptions, Signal, TaskMode, TimestampEvent};
use crate::driver::{
    DoneCallback, DoneEvent, Driver, EventHandler, EveryNSamplesCallback, EveryNSamplesEvent, SignalCallback,
    SignalEvent, TaskHandle,
};
use crate::error::{DaqError, Result};
use crate::events::{EventKind, EventRegistry, EventSink};
use crate::export_signals::ExportSignals;
use crate::in_stream::InStream;
use crate::names::{flatten_channel_string, unflatten_channel_string};
use crate::out_stream::OutStream;
use crate::timestamp::Timestamp;
use crate::timing::Timing;
use crate::triggering::Triggers;
use crate::types::{NumSamples, ReadData, ResolvedChannel, WriteData};
use crate::{read, warnings, write};

/// A driver task: channels, timing, triggering and the handle behind them.
///
/// Tasks cannot be cloned. Two tasks compare equal when they hold the same
/// driver handle.
#[derive(Debug)]
pub struct Task {
    driver: Arc<dyn Driver>,
    handle: RwLock<Option<TaskHandle>>,
    name: String,
    owns_on_exit: bool,
    channels: RwLock<Vec<ResolvedChannel>>,
    events: EventRegistry,
}

impl Task {
    /// Create a task. An empty name lets the driver pick one.
    pub fn new(driver: Arc<dyn Driver>, name: &str) -> Result<Self> {
        let (handle, owns_on_exit) = driver.create_task(name)?;
        let name = driver
            .get_attribute(handle, AttrTarget::Task, attributes::task::id::NAME, String::TYPE)
            .and_then(String::from_value)
            .unwrap_or_else(|_| name.to_string());
        info!(task = %name, handle = %handle, owns_on_exit, "Task created");
        Ok(Self::adopt(driver, handle, name, owns_on_exit))
    }

    /// Load a task saved in the driver's configuration store.
    pub fn load(driver: Arc<dyn Driver>, name: &str) -> Result<Self> {
        let handle = driver.load_task(name)?;
        info!(task = %name, handle = %handle, "Task loaded");
        let task = Self::adopt(driver, handle, name.to_string(), true);
        task.resolve_existing_channels()?;
        Ok(task)
    }

    /// Wrap a handle created elsewhere, such as an attached remote session.
    ///
    /// With `owns_on_exit` false, dropping the task leaves the handle alone;
    /// [`Task::close`] still clears it.
    pub fn from_handle(driver: Arc<dyn Driver>, handle: TaskHandle, owns_on_exit: bool) -> Result<Self> {
        let name = driver
            .get_attribute(handle, AttrTarget::Task, attributes::task::id::NAME, String::TYPE)
            .and_then(String::from_value)?;
        debug!(task = %name, handle = %handle, owns_on_exit, "Task handle adopted");
        let task = Self::adopt(driver, handle, name, owns_on_exit);
        task.resolve_existing_channels()?;
        Ok(task)
    }

    pub(crate) fn adopt(driver: Arc<dyn Driver>, handle: TaskHandle, name: String, owns_on_exit: bool) -> Self {
        Self {
            driver,
            handle: RwLock::new(Some(handle)),
            name,
            owns_on_exit,
            channels: RwLock::new(Vec::new()),
            events: EventRegistry::default(),
        }
    }

    fn resolve_existing_channels(&self) -> Result<()> {
        let names = self.channel_names()?;
        let resolved = names
            .iter()
            .map(|name| channels::resolve_channel(self, name))
            .collect::<Result<Vec<_>>>()?;
        *self.channels.write() = resolved;
        Ok(())
    }

    // Accessors

    /// Name the driver assigned to the task.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Driver handle, or `InvalidHandle` once the task is closed.
    pub fn handle(&self) -> Result<TaskHandle> {
        (*self.handle.read()).ok_or_else(|| DaqError::invalid_handle(&self.name))
    }

    /// Whether dropping the task clears the handle.
    pub fn owns_on_exit(&self) -> bool {
        self.owns_on_exit
    }

    /// True once [`Task::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.handle.read().is_none()
    }

    pub(crate) fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// Attach the task name to errors that lack one.
    pub(crate) fn annotate(&self, error: DaqError) -> DaqError {
        if error.task_name().is_some() {
            error
        } else {
            error.with_task_name(&self.name)
        }
    }

    /// Run `f` against the live handle, tagging its error with the task name.
    pub(crate) fn with_handle<T>(&self, f: impl FnOnce(&dyn Driver, TaskHandle) -> Result<T>) -> Result<T> {
        let handle = self.handle()?;
        f(self.driver(), handle).map_err(|e| self.annotate(e))
    }

    /// Virtual channel names, in task order.
    pub fn channel_names(&self) -> Result<Vec<String>> {
        self.get(AttrTarget::Task, attributes::task::CHANNEL_NAMES)
    }

    /// Number of virtual channels.
    pub fn number_of_channels(&self) -> Result<u32> {
        self.get(AttrTarget::Task, attributes::task::NUMBER_OF_CHANNELS)
    }

    /// Devices the task's channels live on.
    pub fn devices(&self) -> Result<Vec<String>> {
        self.get(AttrTarget::Task, attributes::task::DEVICES)
    }

    /// Number of devices.
    pub fn number_of_devices(&self) -> Result<u32> {
        self.get(AttrTarget::Task, attributes::task::NUMBER_OF_DEVICES)
    }

    // Channels

    /// Analog input channels.
    pub fn ai_channels(&self) -> AiChannelCollection<'_> {
        AiChannelCollection::new(self)
    }

    /// Analog output channels.
    pub fn ao_channels(&self) -> AoChannelCollection<'_> {
        AoChannelCollection::new(self)
    }

    /// Counter input channels.
    pub fn ci_channels(&self) -> CiChannelCollection<'_> {
        CiChannelCollection::new(self)
    }

    /// Counter output channels.
    pub fn co_channels(&self) -> CoChannelCollection<'_> {
        CoChannelCollection::new(self)
    }

    /// Digital input channels.
    pub fn di_channels(&self) -> DiChannelCollection<'_> {
        DiChannelCollection::new(self)
    }

    /// Digital output channels.
    pub fn do_channels(&self) -> DoChannelCollection<'_> {
        DoChannelCollection::new(self)
    }

    /// View over every channel of the task.
    pub fn channels(&self) -> Channel<'_> {
        let names: Vec<String> = self.channels.read().iter().map(|c| c.name.clone()).collect();
        Channel::new(self, flatten_channel_string(&names))
    }

    /// Add channels saved in the driver's configuration store.
    pub fn add_global_channels<S: AsRef<str>>(&self, global_channels: &[S]) -> Result<()> {
        let list = flatten_channel_string(global_channels);
        self.with_handle(|driver, handle| driver.add_global_chans_to_task(handle, &list))?;
        let resolved = unflatten_channel_string(&list)
            .iter()
            .map(|name| channels::resolve_channel(self, name))
            .collect::<Result<Vec<_>>>()?;
        debug!(task = %self.name, channels = %list, "Global channels added");
        self.channels.write().extend(resolved);
        Ok(())
    }

    pub(crate) fn push_channels(&self, resolved: Vec<ResolvedChannel>) {
        self.channels.write().extend(resolved);
    }

    /// Channels configured on the task, in task order.
    pub(crate) fn resolved_channels(&self) -> Vec<ResolvedChannel> {
        self.channels.read().clone()
    }

    /// Channels a read addresses, as the driver reports them. The subset may
    /// have been set by name, through [`Task::set`] or restored with a saved
    /// task, so it is queried on every read rather than cached.
    pub(crate) fn read_channels(&self) -> Result<Vec<ResolvedChannel>> {
        let list = self.get(AttrTarget::Read, attributes::read::CHANNELS_TO_READ)?;
        let cached = self.channels.read().clone();
        let names = unflatten_channel_string(&list);
        if names.is_empty() {
            return Ok(cached.into_iter().filter(|c| channels::is_input(c.chan_type)).collect());
        }
        names
            .iter()
            .map(|name| match cached.iter().find(|c| c.name.eq_ignore_ascii_case(name)) {
                Some(chan) => Ok(chan.clone()),
                None => channels::resolve_channel(self, name),
            })
            .collect()
    }

    /// Output channels a write addresses.
    pub(crate) fn write_channels(&self) -> Vec<ResolvedChannel> {
        self.channels
            .read()
            .iter()
            .filter(|c| !channels::is_input(c.chan_type))
            .cloned()
            .collect()
    }

    // Façades

    /// Timing configuration.
    pub fn timing(&self) -> Timing<'_> {
        Timing::new(self)
    }

    /// Trigger configuration.
    pub fn triggers(&self) -> Triggers<'_> {
        Triggers::new(self)
    }

    /// Exported signal routing.
    pub fn export_signals(&self) -> ExportSignals<'_> {
        ExportSignals::new(self)
    }

    /// Input stream configuration.
    pub fn in_stream(&self) -> InStream<'_> {
        InStream::new(self)
    }

    /// Output stream configuration.
    pub fn out_stream(&self) -> OutStream<'_> {
        OutStream::new(self)
    }

    // Attributes

    /// Read a typed attribute.
    pub fn get<T: AttributeKind>(&self, target: AttrTarget<'_>, attr: Attribute<T>) -> Result<T> {
        let value = self.with_handle(|driver, handle| driver.get_attribute(handle, target, attr.id, T::TYPE))?;
        T::from_value(value)
    }

    /// Write a typed attribute.
    pub fn set<T: AttributeKind>(&self, target: AttrTarget<'_>, attr: Attribute<T>, value: T) -> Result<()> {
        let value = value.into_value();
        self.with_handle(|driver, handle| driver.set_attribute(handle, target, attr.id, &value))?;
        debug!(task = %self.name, property = attr.name, group = %attr.group, ?value, "Attribute set");
        Ok(())
    }

    /// Restore an attribute to its default.
    pub fn reset<T: AttributeKind>(&self, target: AttrTarget<'_>, attr: Attribute<T>) -> Result<()> {
        self.with_handle(|driver, handle| driver.reset_attribute(handle, target, attr.id))?;
        debug!(task = %self.name, property = attr.name, group = %attr.group, "Attribute reset");
        Ok(())
    }

    /// Read an attribute by property name.
    pub fn get_property(&self, target: AttrTarget<'_>, name: &str) -> Result<AttributeValue> {
        let def = attributes::lookup(target.group(), name)?;
        self.with_handle(|driver, handle| driver.get_attribute(handle, target, def.id, def.ty))
    }

    /// Write an attribute by property name; the value must have its type.
    pub fn set_property(&self, target: AttrTarget<'_>, name: &str, value: AttributeValue) -> Result<()> {
        let def = attributes::lookup(target.group(), name)?;
        attributes::check_type(def, &value)?;
        self.with_handle(|driver, handle| driver.set_attribute(handle, target, def.id, &value))?;
        debug!(task = %self.name, property = def.name, group = %def.group, ?value, "Attribute set");
        Ok(())
    }

    /// Reset an attribute by property name.
    pub fn reset_property(&self, target: AttrTarget<'_>, name: &str) -> Result<()> {
        let def = attributes::lookup(target.group(), name)?;
        self.with_handle(|driver, handle| driver.reset_attribute(handle, target, def.id))?;
        debug!(task = %self.name, property = def.name, group = %def.group, "Attribute reset");
        Ok(())
    }

    // Lifecycle

    /// Move the task through the driver state model.
    pub fn control(&self, action: TaskMode) -> Result<()> {
        self.with_handle(|driver, handle| driver.task_control(handle, action))?;
        debug!(task = %self.name, ?action, "Task control");
        Ok(())
    }

    /// Start the task.
    pub fn start(&self) -> Result<()> {
        self.with_handle(|driver, handle| driver.start_task(handle))?;
        info!(task = %self.name, "Task started");
        Ok(())
    }

    /// Stop the task. Pending event notifications are discarded.
    pub fn stop(&self) -> Result<()> {
        self.with_handle(|driver, handle| driver.stop_task(handle))?;
        info!(task = %self.name, "Task stopped");
        Ok(())
    }

    /// Block until a finite task finishes or `timeout` seconds elapse.
    pub fn wait_until_done(&self, timeout: f64) -> Result<()> {
        self.with_handle(|driver, handle| driver.wait_until_task_done(handle, timeout))
    }

    /// Whether the task has finished.
    pub fn is_task_done(&self) -> Result<bool> {
        self.with_handle(|driver, handle| driver.is_task_done(handle))
    }

    /// Block until the timestamp of `event` is valid and return it.
    pub fn wait_for_valid_timestamp(&self, event: TimestampEvent, timeout: f64) -> Result<Timestamp> {
        self.with_handle(|driver, handle| driver.wait_for_valid_timestamp(handle, event, timeout))
    }

    /// Save the task to the driver's configuration store.
    pub fn save(
        &self,
        save_as: &str,
        author: &str,
        overwrite_existing_task: bool,
        allow_interactive_editing: bool,
        allow_interactive_deletion: bool,
    ) -> Result<()> {
        let mut options = SaveOptions::empty();
        options.set(SaveOptions::OVERWRITE, overwrite_existing_task);
        options.set(SaveOptions::ALLOW_INTERACTIVE_EDITING, allow_interactive_editing);
        options.set(SaveOptions::ALLOW_INTERACTIVE_DELETION, allow_interactive_deletion);
        self.save_with_options(save_as, author, options)
    }

    /// Save with an explicit option set. An empty `save_as` keeps the task name.
    pub fn save_with_options(&self, save_as: &str, author: &str, options: SaveOptions) -> Result<()> {
        let save_as = if save_as.is_empty() { self.name.as_str() } else { save_as };
        self.with_handle(|driver, handle| driver.save_task(handle, save_as, author, options))?;
        info!(task = %self.name, save_as, options = options.bits(), "Task saved");
        Ok(())
    }

    /// Clear the task.
    ///
    /// The handle is cleared before event registrations are released. Both
    /// steps run even if the first fails; the first error is returned.
    /// Closing a closed task emits a resource warning and returns `Ok`.
    pub fn close(&self) -> Result<()> {
        let Some(handle) = self.handle.write().take() else {
            warnings::resource_warning(
                &self.name,
                format!("Attempted to close task '{}' but the task was already closed.", self.name),
            );
            return Ok(());
        };
        let mut first_error = self.driver.clear_task(handle).err();
        if let Err(e) = self.events.close_all() {
            first_error.get_or_insert(e);
        }
        self.channels.write().clear();
        match first_error {
            Some(e) => {
                warn!(task = %self.name, error = %e, "Task closed with errors");
                Err(self.annotate(e))
            }
            None => {
                info!(task = %self.name, "Task closed");
                Ok(())
            }
        }
    }

    // Data

    /// Read with shape and type inferred from the task's channels.
    ///
    /// [`NumSamples::Unset`] reads one sample per channel and returns scalars;
    /// an explicit count returns lists. Short reads are trimmed.
    pub fn read(&self, samples: impl Into<NumSamples>, timeout: f64) -> Result<ReadData> {
        read::read(self, samples.into(), timeout)
    }

    /// Write with shape and type inferred from the data.
    ///
    /// `auto_start` defaults to true for one sample per channel and false
    /// otherwise. Returns samples per channel written.
    pub fn write(&self, data: impl Into<WriteData>, auto_start: Option<bool>, timeout: f64) -> Result<u32> {
        write::write(self, data.into(), auto_start, timeout)
    }

    // Events

    fn register_event<C>(
        &self,
        kind: EventKind,
        callback: Option<C>,
        register: impl FnOnce(&dyn Driver, TaskHandle, C) -> Result<Box<dyn EventHandler>>,
    ) -> Result<()> {
        let handle = self.handle()?;
        let result = match callback {
            Some(callback) => self.events.register(kind, || register(self.driver(), handle, callback)),
            None => self.events.unregister(kind),
        };
        result.map_err(|e| self.annotate(e))
    }

    /// Register the done callback; `None` unregisters.
    pub fn register_done_event(&self, callback: Option<DoneCallback>) -> Result<()> {
        self.register_event(EventKind::Done, callback, |driver, handle, cb| {
            driver.register_done_event(handle, cb)
        })
    }

    /// Register a callback for every `sample_interval` samples acquired;
    /// `None` unregisters.
    pub fn register_every_n_samples_acquired_into_buffer_event(
        &self,
        sample_interval: u32,
        callback: Option<EveryNSamplesCallback>,
    ) -> Result<()> {
        self.register_event(EventKind::EveryNSamplesAcquiredIntoBuffer, callback, |driver, handle, cb| {
            driver.register_every_n_samples_event(handle, EveryNSamplesEventType::AcquiredIntoBuffer, sample_interval, cb)
        })
    }

    /// Register a callback for every `sample_interval` samples transferred
    /// to the device; `None` unregisters.
    pub fn register_every_n_samples_transferred_from_buffer_event(
        &self,
        sample_interval: u32,
        callback: Option<EveryNSamplesCallback>,
    ) -> Result<()> {
        self.register_event(EventKind::EveryNSamplesTransferredFromBuffer, callback, |driver, handle, cb| {
            driver.register_every_n_samples_event(
                handle,
                EveryNSamplesEventType::TransferredFromBuffer,
                sample_interval,
                cb,
            )
        })
    }

    /// Register a callback for a hardware signal; `None` unregisters.
    pub fn register_signal_event(&self, signal: Signal, callback: Option<SignalCallback>) -> Result<()> {
        self.register_event(EventKind::Signal, callback, |driver, handle, cb| {
            driver.register_signal_event(handle, signal, cb)
        })
    }

    /// Whether a callback of `kind` is registered.
    pub fn is_event_registered(&self, kind: EventKind) -> bool {
        self.events.is_registered(kind)
    }

    /// Deliver done events into a bounded channel.
    pub fn done_events(&self, capacity: usize) -> Result<(EventSink<DoneEvent>, mpsc::Receiver<DoneEvent>)> {
        let (sink, receiver) = EventSink::new(capacity);
        self.register_done_event(Some(sink.callback()))?;
        Ok((sink, receiver))
    }

    /// Deliver every-N-samples events into a bounded channel.
    pub fn every_n_samples_events(
        &self,
        event_type: EveryNSamplesEventType,
        sample_interval: u32,
        capacity: usize,
    ) -> Result<(EventSink<EveryNSamplesEvent>, mpsc::Receiver<EveryNSamplesEvent>)> {
        let (sink, receiver) = EventSink::new(capacity);
        match event_type {
            EveryNSamplesEventType::AcquiredIntoBuffer => {
                self.register_every_n_samples_acquired_into_buffer_event(sample_interval, Some(sink.callback()))?
            }
            EveryNSamplesEventType::TransferredFromBuffer => {
                self.register_every_n_samples_transferred_from_buffer_event(sample_interval, Some(sink.callback()))?
            }
        }
        Ok((sink, receiver))
    }

    /// Deliver signal events into a bounded channel.
    pub fn signal_events(
        &self,
        signal: Signal,
        capacity: usize,
    ) -> Result<(EventSink<SignalEvent>, mpsc::Receiver<SignalEvent>)> {
        let (sink, receiver) = EventSink::new(capacity);
        self.register_signal_event(signal, Some(sink.callback()))?;
        Ok((sink, receiver))
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (*self.handle.read(), *other.handle.read()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Task {}

impl Drop for Task {
    fn drop(&mut self) {
        if self.handle.get_mut().is_none() {
            return;
        }
        if !self.owns_on_exit {
            if let Err(e) = self.events.close_all() {
                warn!(task = %self.name, error = %e, "Failed to release event callbacks of an adopted task");
            }
            return;
        }
        warnings::resource_warning(
            &self.name,
            "Task was not explicitly closed before it was dropped. Resources on the task device may still be reserved.",
        );
        if let Err(e) = self.close() {
            warn!(task = %self.name, error = %e, "Failed to clear task on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::SimulatedDriver;
    use crate::error::ErrorKind;

    fn sim() -> Arc<SimulatedDriver> {
        Arc::new(SimulatedDriver::default())
    }

    #[test]
    fn test_close_clears_once() {
        let driver = sim();
        let task = Task::new(driver.clone(), "once").unwrap();
        task.close().unwrap();
        task.close().unwrap();
        drop(task);
        assert_eq!(driver.calls_to("DAQmxClearTask"), 1);
        assert_eq!(driver.live_tasks(), 0);
    }

    #[test]
    fn test_closed_task_makes_no_driver_calls() {
        let driver = sim();
        let task = Task::new(driver.clone(), "closed").unwrap();
        let handle = task.handle().unwrap();
        task.close().unwrap();
        let before = driver.calls_on(handle);

        assert_eq!(task.start().unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(task.read(NumSamples::Unset, 1.0).unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(task.timing().samp_clk_rate().unwrap_err().kind(), ErrorKind::InvalidHandle);
        assert_eq!(driver.calls_on(handle), before);
    }

    #[test]
    fn test_drop_clears_owned_task() {
        let driver = sim();
        {
            let _task = Task::new(driver.clone(), "scoped").unwrap();
        }
        assert_eq!(driver.calls_to("DAQmxClearTask"), 1);
    }

    #[test]
    fn test_drop_leaves_adopted_handle() {
        let driver = sim();
        let (handle, _) = driver.create_task("shared").unwrap();
        {
            let task = Task::from_handle(driver.clone(), handle, false).unwrap();
            assert_eq!(task.name(), "shared");
        }
        assert_eq!(driver.calls_to("DAQmxClearTask"), 0);
        assert_eq!(driver.live_tasks(), 1);
        driver.clear_task(handle).unwrap();
    }

    #[test]
    fn test_equality_is_by_handle() {
        let driver = sim();
        let a = Task::new(driver.clone(), "a").unwrap();
        let b = Task::new(driver.clone(), "b").unwrap();
        assert_eq!(a, a);
        assert_ne!(a, b);
        a.close().unwrap();
        b.close().unwrap();
    }

    #[test]
    fn test_unnamed_task_takes_driver_name() {
        let task = Task::new(sim(), "").unwrap();
        assert!(task.name().starts_with("_unnamedTask<"));
        task.close().unwrap();
    }
}
