//! The booking admission path and its inverse.
//!
//! Admission order is fixed: class, member, seat, overlap, persist. The seat
//! is taken before the overlap check so a passing check cannot be
//! invalidated by a concurrent admission; every rejection after the seat is
//! taken hands it back.

use std::time::Instant;

use ulid::Ulid;

use crate::error::Error;
use crate::model::{now_ms, Booking, BookingStatus, Principal, Role, Visibility};
use crate::observability::{
    ADMISSION_DURATION_SECONDS, BOOKINGS_ADMITTED_TOTAL, BOOKINGS_CANCELLED_TOTAL,
    BOOKINGS_REJECTED_TOTAL,
};
use crate::store::EntityStore;

use super::overlap::check_no_overlap;
use super::Gym;

impl<S: EntityStore> Gym<S> {
    /// Book a seat in `class_id` for the calling trainee.
    ///
    /// On success exactly one seat is consumed and exactly one Confirmed
    /// booking exists for the (member, class) pair. On any rejection no seat
    /// is leaked and no partial booking exists.
    pub async fn create_booking(
        &self,
        principal: &Principal,
        class_id: Ulid,
    ) -> Result<Booking, Error> {
        let started = Instant::now();
        let result = self.admit(principal, class_id).await;
        metrics::histogram!(ADMISSION_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        match &result {
            Ok(booking) => {
                metrics::counter!(BOOKINGS_ADMITTED_TOTAL).increment(1);
                tracing::debug!(
                    "admitted booking {} for member {} in class {class_id}",
                    booking.id,
                    booking.member_id
                );
            }
            Err(e) if e.is_rejection() => {
                metrics::counter!(BOOKINGS_REJECTED_TOTAL).increment(1);
                tracing::debug!("rejected booking for class {class_id}: {e}");
            }
            Err(e) => {
                tracing::error!("booking admission fault for class {class_id}: {e}");
            }
        }
        result
    }

    async fn admit(&self, principal: &Principal, class_id: Ulid) -> Result<Booking, Error> {
        // 1. The class must exist, be live and open for booking.
        let class = self
            .store
            .find_class(class_id, Visibility::Active)
            .await?
            .filter(|c| c.is_available)
            .ok_or(Error::NotFound(class_id))?;

        // 2. The member record decides, not the principal's claims.
        let member = self
            .store
            .find_member(principal.member_id, Visibility::Active)
            .await?
            .ok_or(Error::Forbidden("unknown member"))?;
        if member.role != Role::Trainee {
            return Err(Error::Forbidden("only trainees book classes"));
        }
        if !member.is_active {
            return Err(Error::Forbidden("membership is inactive"));
        }

        // 3. Seat first. Holding it keeps the overlap verdict stable: no
        //    concurrent admission can consume this seat out from under us.
        let reservation = self.gate.try_reserve(class_id).await?;

        // 4. Overlap against every window the trainee already holds.
        let windows = match self.store.confirmed_windows(member.id).await {
            Ok(windows) => windows,
            Err(e) => {
                self.gate.release(reservation).await;
                return Err(e);
            }
        };
        if let Err(conflict) = check_no_overlap(&windows, &class.window()) {
            self.gate.release(reservation).await;
            return Err(conflict);
        }

        // 5. Persist. The store enforces one active booking per pair;
        //    losing that race hands the seat back like any other rejection.
        let booking = Booking {
            id: Ulid::new(),
            member_id: member.id,
            class_id,
            booked_at: now_ms(),
            status: BookingStatus::Confirmed,
        };
        match self.store.insert_booking(booking.clone()).await {
            Ok(()) => {
                reservation.commit();
                Ok(booking)
            }
            Err(e) => {
                self.gate.release(reservation).await;
                Err(e)
            }
        }
    }

    /// Cancel the calling trainee's own booking and free its seat.
    ///
    /// The store's scoped status transition makes this exactly-once: a
    /// second attempt, or an attempt against someone else's booking, finds
    /// no Confirmed match and gets `NotFound`, so the seat can never be
    /// released twice for one booking.
    pub async fn cancel_booking(
        &self,
        principal: &Principal,
        booking_id: Ulid,
    ) -> Result<Booking, Error> {
        if principal.role != Role::Trainee {
            return Err(Error::Forbidden("only trainees cancel bookings"));
        }
        let booking = self.store.cancel_booking(booking_id, principal.member_id).await?;

        // The cancellation is already durable; the release is best-effort
        // and a failure is flagged rather than surfaced.
        self.gate.release_seat(booking.class_id).await;
        metrics::counter!(BOOKINGS_CANCELLED_TOTAL).increment(1);
        tracing::debug!("cancelled booking {booking_id} for member {}", principal.member_id);
        Ok(booking)
    }
}
