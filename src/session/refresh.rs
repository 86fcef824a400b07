//! Single-flight coordination for token refresh
//!
//! The first caller to find the coordinator idle starts the refresh; every
//! caller arriving while it runs awaits the same shared future and observes
//! the same result. Completion and `reset()` both return the coordinator to
//! idle. A flight that finishes after a reset leaves the newer state alone,
//! and its [`RefreshTicket`] refuses to commit.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};

type Flight = Shared<BoxFuture<'static, bool>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    flight: Option<Flight>,
}

/// Handed to the refresh work; identifies the flight it belongs to
pub struct RefreshTicket {
    generation: u64,
    slot: Arc<Mutex<Slot>>,
}

impl RefreshTicket {
    /// Still the coordinator's current flight (no reset since it started)
    pub fn is_current(&self) -> bool {
        RefreshCoordinator::lock(&self.slot).generation == self.generation
    }

    /// Run `apply` only while this flight is current. The coordinator stays
    /// locked for the duration, so a concurrent `reset()` lands either
    /// before (and `apply` is skipped) or after.
    pub fn commit(&self, apply: impl FnOnce()) -> bool {
        let slot = RefreshCoordinator::lock(&self.slot);
        if slot.generation != self.generation {
            return false;
        }
        apply();
        true
    }
}

#[derive(Default)]
pub struct RefreshCoordinator {
    slot: Arc<Mutex<Slot>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_refreshing(&self) -> bool {
        Self::lock(&self.slot).flight.is_some()
    }

    /// Join the in-flight refresh, or start one with `start` if idle
    pub async fn run<F, Fut>(&self, start: F) -> bool
    where
        F: FnOnce(RefreshTicket) -> Fut,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let flight = {
            let mut slot = Self::lock(&self.slot);
            match slot.flight.clone() {
                Some(flight) => {
                    tracing::debug!("Token refresh already in flight, joining");
                    flight
                }
                None => {
                    slot.generation += 1;
                    let generation = slot.generation;
                    let shared_slot = Arc::clone(&self.slot);
                    let work = start(RefreshTicket {
                        generation,
                        slot: Arc::clone(&self.slot),
                    });
                    let flight = async move {
                        let result = work.await;
                        let mut slot = Self::lock(&shared_slot);
                        if slot.generation == generation {
                            slot.flight = None;
                        }
                        result
                    }
                    .boxed()
                    .shared();
                    slot.flight = Some(flight.clone());
                    flight
                }
            }
        };

        flight.await
    }

    /// Forget any in-flight refresh. Its network call is not aborted; its
    /// completion no longer touches the coordinator.
    pub fn reset(&self) {
        let mut slot = Self::lock(&self.slot);
        slot.generation += 1;
        slot.flight = None;
    }
}
