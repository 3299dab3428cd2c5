use super::{DataInfo, FutureError, FutureResult};
use crossbeam_channel::Sender;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

static NEXT_FUTURE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide unique identity of a future slot
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FutureId(u64);

impl FutureId {
    fn next() -> Self {
        Self(NEXT_FUTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FutureId({})", self.0)
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "future-{}", self.0)
    }
}

/// Observable lifecycle of a future: Pending -> Ready -> Consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureStatus {
    Pending,
    Ready,
    Consumed,
}

enum Slot {
    Pending,
    Ready(Box<dyn Any + Send + Sync>),
    Consumed,
}

impl Slot {
    fn status(&self) -> FutureStatus {
        match self {
            Slot::Pending => FutureStatus::Pending,
            Slot::Ready(_) => FutureStatus::Ready,
            Slot::Consumed => FutureStatus::Consumed,
        }
    }

    fn is_pending(&self) -> bool {
        matches!(self, Slot::Pending)
    }
}

/// Wake-up handle registered by `wait_for_any` on every pending member
pub(crate) struct Listener {
    pub(crate) id: u64,
    pub(crate) tx: Sender<()>,
}

struct SlotState {
    slot: Slot,
    listeners: Vec<Listener>,
}

struct Shared {
    id: FutureId,
    name: String,
    data: DataInfo,
    state: Mutex<SlotState>,
    produced: Condvar,
    notify: Notify,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Producer side of a future. Sets the value exactly once.
pub struct Promise {
    shared: Arc<Shared>,
}

impl Promise {
    /// Create a promise whose future carries values of type `T`
    pub fn new<T: Any + Send + Sync>(name: impl Into<String>) -> Self {
        Self::with_data_info(name, DataInfo::of::<T>())
    }

    /// Create a promise named after its future id (`future-<id>`)
    pub fn unnamed<T: Any + Send + Sync>() -> Self {
        let id = FutureId::next();
        Self::build(id, id.to_string(), DataInfo::of::<T>())
    }

    /// Create a promise from a runtime type identity (used by declared ports)
    pub fn with_data_info(name: impl Into<String>, data: DataInfo) -> Self {
        Self::build(FutureId::next(), name.into(), data)
    }

    fn build(id: FutureId, name: String, data: DataInfo) -> Self {
        Self {
            shared: Arc::new(Shared {
                id,
                name,
                data,
                state: Mutex::new(SlotState {
                    slot: Slot::Pending,
                    listeners: Vec::new(),
                }),
                produced: Condvar::new(),
                notify: Notify::new(),
            }),
        }
    }

    pub fn future(&self) -> Future {
        Future {
            shared: self.shared.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn data_info(&self) -> DataInfo {
        self.shared.data
    }

    pub fn is_set(&self) -> bool {
        !self.shared.lock().slot.is_pending()
    }

    /// Publish the value and wake every waiter.
    ///
    /// Fails with `TypeMismatch` when `T` is not the declared type and with
    /// `AlreadySet` on a second call.
    pub fn set<T: Any + Send + Sync>(&self, value: T) -> FutureResult<()> {
        self.shared.data.check::<T>()?;

        let listeners = {
            let mut state = self.shared.lock();
            if !state.slot.is_pending() {
                warn!(future = %self.shared.name, "promise set twice");
                return Err(FutureError::AlreadySet(self.shared.name.clone()));
            }
            state.slot = Slot::Ready(Box::new(value));
            std::mem::take(&mut state.listeners)
        };

        self.shared.produced.notify_all();
        self.shared.notify.notify_waiters();
        for listener in listeners {
            // Receiver may already have returned through another member
            let _ = listener.tx.try_send(());
        }

        debug!(future = %self.shared.name, id = %self.shared.id, "future ready");
        Ok(())
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if self.shared.lock().slot.is_pending() {
            debug!(future = %self.shared.name, "promise dropped without a value");
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("data", &self.shared.data)
            .finish()
    }
}

/// Consumer handle to a single-assignment, type-tagged result slot.
///
/// Clones share the slot: readiness and consumption are visible through
/// every handle, whichever registry it was reached from.
#[derive(Clone)]
pub struct Future {
    shared: Arc<Shared>,
}

impl Future {
    pub fn id(&self) -> FutureId {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn data_info(&self) -> DataInfo {
        self.shared.data
    }

    pub fn status(&self) -> FutureStatus {
        self.shared.lock().slot.status()
    }

    /// True once the value was produced. Stays true after consumption.
    pub fn is_ready(&self) -> bool {
        self.status() != FutureStatus::Pending
    }

    pub fn is_consumed(&self) -> bool {
        self.status() == FutureStatus::Consumed
    }

    /// Block until the value has been produced
    pub fn wait(&self) {
        drop(self.wait_produced());
    }

    pub fn wait_timeout(&self, timeout: Duration) -> FutureResult<()> {
        self.wait_produced_timeout(timeout).map(drop)
    }

    /// Block until ready and return a copy of the value
    pub fn get<T: Any + Clone + Send + Sync>(&self) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        let state = self.wait_produced();
        self.settled(self.clone_value(&state.slot))
    }

    pub fn get_timeout<T: Any + Clone + Send + Sync>(&self, timeout: Duration) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        let state = self.wait_produced_timeout(timeout)?;
        self.settled(self.clone_value(&state.slot))
    }

    /// Block until ready and move the value out, leaving the future consumed.
    ///
    /// Only one caller ever receives the value; every later (or racing)
    /// caller gets `UseAfterConsume`.
    pub fn take<T: Any + Send + Sync>(&self) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        let mut state = self.wait_produced();
        self.settled(self.take_value(&mut state.slot))
    }

    pub fn take_timeout<T: Any + Send + Sync>(&self, timeout: Duration) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        let mut state = self.wait_produced_timeout(timeout)?;
        self.settled(self.take_value(&mut state.slot))
    }

    /// Copy the value if it is currently held, without blocking
    pub fn try_get<T: Any + Clone + Send + Sync>(&self) -> FutureResult<Option<T>> {
        self.shared.data.check::<T>()?;
        let state = self.shared.lock();
        if matches!(state.slot, Slot::Consumed) {
            return Ok(None);
        }
        self.clone_value(&state.slot)
    }

    /// Move the value out if it is currently held, without blocking
    pub fn try_take<T: Any + Send + Sync>(&self) -> FutureResult<Option<T>> {
        self.shared.data.check::<T>()?;
        let mut state = self.shared.lock();
        if matches!(state.slot, Slot::Consumed) {
            return Ok(None);
        }
        self.take_value(&mut state.slot)
    }

    /// Suspend the calling task until the value has been produced
    pub async fn wait_async(&self) {
        loop {
            let notified = self.shared.notify.notified();
            if !self.is_pending() {
                return;
            }
            trace!(future = %self.shared.name, "task parked on future");
            notified.await;
        }
    }

    pub async fn get_async<T: Any + Clone + Send + Sync>(&self) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        self.wait_async().await;
        let state = self.shared.lock();
        self.settled(self.clone_value(&state.slot))
    }

    pub async fn take_async<T: Any + Send + Sync>(&self) -> FutureResult<T> {
        self.shared.data.check::<T>()?;
        self.wait_async().await;
        let mut state = self.shared.lock();
        self.settled(self.take_value(&mut state.slot))
    }

    /// Register a group wake-up. Returns false when the value is already
    /// produced, in which case nothing was registered.
    pub(crate) fn register_listener(&self, listener: Listener) -> bool {
        let mut state = self.shared.lock();
        if !state.slot.is_pending() {
            return false;
        }
        state.listeners.push(listener);
        true
    }

    pub(crate) fn remove_listener(&self, id: u64) {
        self.shared.lock().listeners.retain(|listener| listener.id != id);
    }

    fn is_pending(&self) -> bool {
        self.shared.lock().slot.is_pending()
    }

    fn wait_produced(&self) -> MutexGuard<'_, SlotState> {
        let state = self.shared.lock();
        if state.slot.is_pending() {
            trace!(future = %self.shared.name, "blocking on future");
        }
        self.shared
            .produced
            .wait_while(state, |state| state.slot.is_pending())
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wait_produced_timeout(&self, timeout: Duration) -> FutureResult<MutexGuard<'_, SlotState>> {
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .produced
            .wait_timeout_while(state, timeout, |state| state.slot.is_pending())
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.slot.is_pending() {
            warn!(future = %self.shared.name, ?timeout, "timed out waiting for future");
            return Err(FutureError::Timeout {
                target: self.shared.name.clone(),
                timeout,
            });
        }
        Ok(state)
    }

    fn clone_value<T: Any + Clone>(&self, slot: &Slot) -> FutureResult<Option<T>> {
        match slot {
            Slot::Pending => Ok(None),
            Slot::Ready(value) => value
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| self.mismatch::<T>()),
            Slot::Consumed => Err(self.consumed()),
        }
    }

    fn take_value<T: Any>(&self, slot: &mut Slot) -> FutureResult<Option<T>> {
        match std::mem::replace(slot, Slot::Consumed) {
            Slot::Pending => {
                *slot = Slot::Pending;
                Ok(None)
            }
            Slot::Ready(value) => match value.downcast::<T>() {
                Ok(value) => {
                    debug!(future = %self.shared.name, "future consumed");
                    Ok(Some(*value))
                }
                Err(value) => {
                    *slot = Slot::Ready(value);
                    Err(self.mismatch::<T>())
                }
            },
            Slot::Consumed => {
                warn!(future = %self.shared.name, "future already consumed");
                Err(self.consumed())
            }
        }
    }

    // Blocking accessors only read settled slots, so `None` cannot come back
    fn settled<T>(&self, value: FutureResult<Option<T>>) -> FutureResult<T> {
        value?.ok_or_else(|| self.consumed())
    }

    fn mismatch<T: Any>(&self) -> FutureError {
        FutureError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: self.shared.data.type_name(),
        }
    }

    fn consumed(&self) -> FutureError {
        FutureError::UseAfterConsume(self.shared.name.clone())
    }
}

/// Move values out of several futures as one step: either every selected
/// value is moved or none is. Slots are locked in id order so concurrent
/// group takes over overlapping futures cannot deadlock.
///
/// With `ready_only`, futures that hold no value are skipped. Otherwise the
/// caller has already waited on every future, and any future without a value
/// fails the whole take. Results come back in `futures` order.
pub(crate) fn take_all<T: Any + Send + Sync>(
    futures: &[Future],
    ready_only: bool,
) -> FutureResult<Vec<T>> {
    for future in futures {
        future.shared.data.check::<T>()?;
    }

    let mut order: Vec<usize> = (0..futures.len()).collect();
    order.sort_by_key(|&i| futures[i].shared.id);

    let mut guards: Vec<Option<MutexGuard<'_, SlotState>>> = futures.iter().map(|_| None).collect();
    let mut previous = None;
    for i in order {
        let future = &futures[i];
        // A future connected twice holds one value, delivered to its first position
        let duplicate = previous == Some(future.shared.id);
        previous = Some(future.shared.id);
        if duplicate {
            if ready_only {
                continue;
            }
            return Err(future.consumed());
        }

        let state = future.shared.lock();
        if matches!(state.slot, Slot::Ready(_)) {
            guards[i] = Some(state);
        } else if !ready_only {
            return Err(future.consumed());
        }
    }

    let mut values = Vec::with_capacity(futures.len());
    for (future, guard) in futures.iter().zip(guards.iter_mut()) {
        if let Some(state) = guard {
            if let Some(value) = future.take_value(&mut state.slot)? {
                values.push(value);
            }
        }
    }
    Ok(values)
}

impl PartialEq for Future {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Future {}

impl fmt::Debug for Future {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("data", &self.shared.data)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unnamed_future_uses_id() {
        let promise = Promise::unnamed::<u8>();
        let future = promise.future();
        assert_eq!(future.name(), future.id().to_string());
        assert_eq!(future.name(), format!("future-{}", future.id().value()));
    }

    #[test]
    fn test_ids_are_unique() {
        let first = Promise::new::<u8>("a").future().id();
        let second = Promise::new::<u8>("a").future().id();
        assert_ne!(first, second);
        assert!(second.value() > first.value());
    }

    #[test]
    fn test_status_transitions() {
        let promise = Promise::new::<String>("label");
        let future = promise.future();
        assert_eq!(future.status(), FutureStatus::Pending);

        promise.set("done".to_string()).unwrap();
        assert_eq!(future.status(), FutureStatus::Ready);

        assert_eq!(future.take::<String>().unwrap(), "done");
        assert_eq!(future.status(), FutureStatus::Consumed);
        assert!(future.is_ready());
    }

    #[test]
    fn test_handles_share_slot() {
        let promise = Promise::new::<i32>("shared");
        let a = promise.future();
        let b = promise.future();
        assert_eq!(a, b);

        promise.set(5).unwrap();
        assert_eq!(a.take::<i32>().unwrap(), 5);
        assert!(b.is_consumed());
    }
}
