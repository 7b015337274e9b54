//! Capacity gate: the only path through which seat counters move.

use std::sync::Arc;
use std::time::Duration;

use ulid::Ulid;

use crate::error::Error;
use crate::observability::SEAT_RELEASE_FAILURES_TOTAL;
use crate::store::EntityStore;

const RELEASE_RETRIES: u32 = 3;

/// Moves seat counters through the store's atomic adjustment, so a
/// check-then-increment can never interleave with another admission for the
/// same class.
pub struct CapacityGate<S> {
    store: Arc<S>,
}

/// Proof that one seat is held. Consume with [`commit`](Self::commit) once
/// the booking record lands, or hand it back through
/// [`CapacityGate::release`] when admission fails downstream.
#[must_use = "an unconsumed reservation leaks a seat"]
pub struct SeatReservation {
    class_id: Ulid,
}

impl SeatReservation {
    pub fn class_id(&self) -> Ulid {
        self.class_id
    }

    /// The booking landed; the seat stays taken.
    pub fn commit(self) {}
}

impl<S: EntityStore> CapacityGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Take one seat. `CapacityExceeded` when the class is full — a normal
    /// rejection, not a fault.
    pub async fn try_reserve(&self, class_id: Ulid) -> Result<SeatReservation, Error> {
        self.store.adjust_seat_count(class_id, 1).await?;
        Ok(SeatReservation { class_id })
    }

    /// Hand back a seat reserved earlier in a failed admission.
    pub async fn release(&self, reservation: SeatReservation) {
        self.release_seat(reservation.class_id).await;
    }

    /// Decrement a class's seat counter, retrying transient store failures.
    /// A seat that stays leaked after the retries is flagged, never returned
    /// as an error: the caller's operation already settled.
    pub async fn release_seat(&self, class_id: Ulid) {
        let mut attempt = 0;
        loop {
            match self.store.adjust_seat_count(class_id, -1).await {
                Ok(_) => return,
                Err(Error::Transient(reason)) if attempt < RELEASE_RETRIES => {
                    attempt += 1;
                    tracing::warn!(
                        "seat release for class {class_id} failed ({reason}), retry {attempt}/{RELEASE_RETRIES}"
                    );
                    tokio::time::sleep(Duration::from_millis(50 << attempt)).await;
                }
                Err(e) => {
                    metrics::counter!(SEAT_RELEASE_FAILURES_TOTAL).increment(1);
                    tracing::error!("seat release for class {class_id} failed: {e}");
                    return;
                }
            }
        }
    }
}
