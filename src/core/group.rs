use super::future::Listener;
use super::{Future, FutureError, FutureResult};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Ordered group of futures
pub type Futures = Vec<Future>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(0);

pub fn all_ready(futures: &[Future]) -> bool {
    futures.iter().all(Future::is_ready)
}

pub fn any_ready(futures: &[Future]) -> bool {
    futures.iter().any(Future::is_ready)
}

fn first_ready(futures: &[Future]) -> Option<usize> {
    futures.iter().position(Future::is_ready)
}

/// Block until every future of the group is ready
pub fn wait_for_all(futures: &[Future]) {
    for future in futures {
        future.wait();
    }
}

/// Like `wait_for_all`, with the timeout shared by the whole group
pub fn wait_for_all_timeout(futures: &[Future], timeout: Duration) -> FutureResult<()> {
    let deadline = Instant::now() + timeout;
    for future in futures {
        let remaining = deadline.saturating_duration_since(Instant::now());
        future.wait_timeout(remaining).map_err(|_| FutureError::Timeout {
            target: future.name().to_string(),
            timeout,
        })?;
    }
    Ok(())
}

/// Block until at least one future is ready.
///
/// Returns the index of the first ready future in group order.
pub fn wait_for_any(futures: &[Future]) -> FutureResult<usize> {
    let registration = match AnyRegistration::register(futures)? {
        Registered::AlreadyReady(index) => return Ok(index),
        Registered::Pending(registration) => registration,
    };

    trace!(group_size = futures.len(), "blocking on future group");
    // Every member keeps a sender until it fires, so this only returns on a wake-up
    let _ = registration.rx.recv();
    Ok(registration.ready_index())
}

pub fn wait_for_any_timeout(futures: &[Future], timeout: Duration) -> FutureResult<usize> {
    let registration = match AnyRegistration::register(futures)? {
        Registered::AlreadyReady(index) => return Ok(index),
        Registered::Pending(registration) => registration,
    };

    match registration.rx.recv_timeout(timeout) {
        Err(RecvTimeoutError::Timeout) if !any_ready(futures) => {
            warn!(group_size = futures.len(), ?timeout, "timed out waiting for any future");
            Err(FutureError::Timeout {
                target: format!("any of {} futures", futures.len()),
                timeout,
            })
        }
        _ => Ok(registration.ready_index()),
    }
}

enum Registered<'a> {
    AlreadyReady(usize),
    Pending(AnyRegistration<'a>),
}

/// Listener registered on every member of a group; removed again on drop
struct AnyRegistration<'a> {
    id: u64,
    futures: &'a [Future],
    registered: usize,
    rx: Receiver<()>,
}

impl<'a> AnyRegistration<'a> {
    fn register(futures: &'a [Future]) -> FutureResult<Registered<'a>> {
        if futures.is_empty() {
            return Err(FutureError::EmptyGroup);
        }

        let (tx, rx) = crossbeam_channel::bounded(futures.len());
        let mut registration = AnyRegistration {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            futures,
            registered: 0,
            rx,
        };

        for (index, future) in futures.iter().enumerate() {
            let listener = Listener {
                id: registration.id,
                tx: tx.clone(),
            };
            if !future.register_listener(listener) {
                let index = first_ready(futures).unwrap_or(index);
                return Ok(Registered::AlreadyReady(index));
            }
            registration.registered = index + 1;
        }
        Ok(Registered::Pending(registration))
    }

    fn ready_index(&self) -> usize {
        first_ready(self.futures).unwrap_or(0)
    }
}

impl Drop for AnyRegistration<'_> {
    fn drop(&mut self) {
        for future in &self.futures[..self.registered] {
            future.remove_listener(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Promise;

    #[test]
    fn test_empty_group_is_rejected() {
        assert_eq!(wait_for_any(&[]), Err(FutureError::EmptyGroup));
    }

    #[test]
    fn test_registration_is_removed() {
        let promise = Promise::new::<u32>("slow");
        let futures = vec![promise.future()];

        let result = wait_for_any_timeout(&futures, Duration::from_millis(10));
        assert!(matches!(result, Err(FutureError::Timeout { .. })));

        // A later set must not trip over a stale listener
        promise.set(1u32).unwrap();
        assert_eq!(wait_for_any(&futures), Ok(0));
    }
}
