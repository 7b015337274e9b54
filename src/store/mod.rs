//! Storage seam between the admission core and whatever holds the records.
//! The core talks only to [`EntityStore`]; the durable in-memory reference
//! implementation is [`MemoryStore`].

mod memory;

pub use memory::{run_compactor, MemoryStore};

use async_trait::async_trait;
use chrono::NaiveDate;
use ulid::Ulid;

use crate::error::Error;
use crate::model::{
    BookedWindow, Booking, BookingStatus, Class, ClassPatch, Difficulty, Member, MemberPatch,
    Role, Visibility,
};

/// Member list query. All criteria are ANDed; `search` is a
/// case-insensitive substring over name and email.
#[derive(Debug, Clone, Default)]
pub struct MemberFilter {
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub search: Option<String>,
    pub visibility: Visibility,
}

/// Class list query. `location` and `search` are case-insensitive
/// substrings; `search` matches any of code, name, description and
/// location. `available` matches the raw availability flag, while
/// `only_bookable` keeps classes that are live, available and not full.
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    pub instructor_id: Option<Ulid>,
    pub location: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub day: Option<NaiveDate>,
    pub search: Option<String>,
    pub available: Option<bool>,
    pub only_bookable: bool,
    pub visibility: Visibility,
}

/// Booking list query. `day` matches the UTC calendar day of the booked
/// class's start time.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub member_id: Option<Ulid>,
    pub class_id: Option<Ulid>,
    pub status: Option<BookingStatus>,
    pub day: Option<NaiveDate>,
}

/// Entity persistence as the admission core sees it.
///
/// Implementations speak the crate's one error taxonomy directly and are
/// responsible for the per-record atomicity the contracts below call out;
/// the admission core adds no locking around individual store calls.
#[async_trait]
pub trait EntityStore: Send + Sync + 'static {
    // ── Members ─────────────────────────────────────────────────

    /// Insert a new member. Rejects `AlreadyExists` (carrying the existing
    /// member's id) when the email is already held by a non-deleted member.
    async fn insert_member(&self, member: Member) -> Result<(), Error>;

    async fn find_member(&self, id: Ulid, vis: Visibility) -> Result<Option<Member>, Error>;

    /// Apply a patch to a non-deleted member. An email change re-checks
    /// uniqueness atomically.
    async fn update_member(&self, id: Ulid, patch: MemberPatch) -> Result<Member, Error>;

    /// Soft delete: sets `is_deleted`, clears `is_active`, and frees the
    /// email for reuse. The record itself is kept.
    async fn soft_delete_member(&self, id: Ulid) -> Result<Member, Error>;

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, Error>;

    // ── Classes ─────────────────────────────────────────────────

    /// Insert a new class. Rejects `AlreadyExists` when the code is already
    /// held by a non-deleted class.
    async fn insert_class(&self, class: Class) -> Result<(), Error>;

    async fn find_class(&self, id: Ulid, vis: Visibility) -> Result<Option<Class>, Error>;

    /// Apply a patch to a non-deleted class. Never touches `booked_seats`,
    /// and rejects `Validation` when the patch would shrink `max_capacity`
    /// below the seats already booked — checked under the class's write
    /// lock, so concurrent seat adjustments cannot slip past it.
    async fn update_class(&self, id: Ulid, patch: ClassPatch) -> Result<Class, Error>;

    /// Soft delete, allowed only while `booked_seats == 0` (`ClassOccupied`
    /// otherwise — the check and the delete are one critical section). Also
    /// clears `is_available` and frees the code for reuse.
    async fn soft_delete_class(&self, id: Ulid) -> Result<Class, Error>;

    /// Atomically move the seat counter by `delta`, keeping it inside
    /// `0..=max_capacity`. A positive delta past capacity rejects
    /// `CapacityExceeded`; a negative delta below zero is an
    /// `InvariantViolation` and leaves the counter untouched. Returns the
    /// class as of the adjustment.
    async fn adjust_seat_count(&self, class_id: Ulid, delta: i32) -> Result<Class, Error>;

    /// Non-deleted classes whose start time falls on the given UTC day.
    async fn count_classes_on(&self, day: NaiveDate) -> Result<u32, Error>;

    async fn list_classes(&self, filter: &ClassFilter) -> Result<Vec<Class>, Error>;

    // ── Bookings ────────────────────────────────────────────────

    /// Insert a booking, enforcing at most one non-cancelled booking per
    /// (member, class) pair in the same step (`AlreadyBooked` on violation).
    async fn insert_booking(&self, booking: Booking) -> Result<(), Error>;

    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, Error>;

    /// Scoped compare-and-set: flips the booking to `Cancelled` only if it
    /// exists, belongs to `member_id`, and is currently `Confirmed`, in one
    /// critical section. Anything else — absent, foreign, already cancelled
    /// — is `NotFound`, which is what makes a repeated cancel harmless.
    /// Returns the cancelled booking.
    async fn cancel_booking(&self, booking_id: Ulid, member_id: Ulid) -> Result<Booking, Error>;

    /// The member's confirmed bookings joined with their classes' schedule
    /// windows. Entries whose class record cannot be resolved come back
    /// with `window: None` rather than being dropped.
    async fn confirmed_windows(&self, member_id: Ulid) -> Result<Vec<BookedWindow>, Error>;

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, Error>;
}
