use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type.
pub type Ms = i64;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// The UTC calendar day containing `t`. Day bucketing is always UTC so that
/// the schedule quota does not depend on where the process runs.
pub fn day_of(t: Ms) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(t)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .date_naive()
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    pub fn duration_ms(&self) -> Ms {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Admin,
    Trainer,
    Trainee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// Booking lifecycle states. The admission core only ever produces
/// `Confirmed` and `Cancelled`; `Pending` and `Completed` exist for external
/// processes (payment capture, post-class settlement) that transition
/// bookings out of band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Pending,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Ulid,
    pub name: String,
    /// Unique among non-deleted members (compared lowercased).
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub is_deleted: bool,
    pub joined_at: Ms,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub id: Ulid,
    /// Human-facing schedule code, unique among non-deleted classes.
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub instructor_id: Ulid,
    pub scheduled_at: Ms,
    pub duration_min: u32,
    pub location: String,
    pub difficulty: Difficulty,
    /// Seat ceiling for this class. Invariant: `booked_seats <= max_capacity`.
    pub max_capacity: u32,
    /// Occupied seats. Moves only through `EntityStore::adjust_seat_count`.
    pub booked_seats: u32,
    pub is_available: bool,
    pub is_deleted: bool,
}

impl Class {
    /// The window this class occupies on a member's schedule.
    pub fn window(&self) -> Span {
        Span::new(
            self.scheduled_at,
            self.scheduled_at + self.duration_min as Ms * 60_000,
        )
    }

    /// The UTC calendar day this class counts against.
    pub fn day(&self) -> NaiveDate {
        day_of(self.scheduled_at)
    }

    pub fn seats_left(&self) -> u32 {
        self.max_capacity.saturating_sub(self.booked_seats)
    }

    /// Currently accepting bookings: live, available, and not full.
    pub fn is_bookable(&self) -> bool {
        self.is_available && !self.is_deleted && self.booked_seats < self.max_capacity
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub member_id: Ulid,
    pub class_id: Ulid,
    pub booked_at: Ms,
    pub status: BookingStatus,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        !matches!(self.status, BookingStatus::Cancelled)
    }
}

/// A confirmed booking joined with its class's schedule data, as consumed by
/// the overlap check. `window` is `None` when the referenced class record is
/// missing or unreadable; `class_name` is empty in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedWindow {
    pub booking_id: Ulid,
    pub class_id: Ulid,
    pub class_name: String,
    pub window: Option<Span>,
}

/// The authenticated caller. Every permissioned operation takes one
/// explicitly — there is no ambient request context to read a role from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub member_id: Ulid,
    pub role: Role,
}

impl Principal {
    pub fn new(member_id: Ulid, role: Role) -> Self {
        Self { member_id, role }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    /// Class administration is open to admins and trainers.
    pub fn manages_classes(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Trainer)
    }
}

/// Whether a read sees soft-deleted records. Every store read takes one;
/// nothing is filtered behind the caller's back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only records that are not soft-deleted.
    #[default]
    Active,
    /// Everything, tombstones included.
    All,
}

impl Visibility {
    pub fn admits(&self, is_deleted: bool) -> bool {
        match self {
            Visibility::Active => !is_deleted,
            Visibility::All => true,
        }
    }
}

// ── Operation payloads ───────────────────────────────────────────

/// Registration input. Role is always Trainee at registration; promotion is
/// an admin-only member update.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub name: String,
    pub email: String,
}

/// Partial member update. Fields left `None` keep their current value.
#[derive(Debug, Clone, Default)]
pub struct MemberPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Admin only.
    pub role: Option<Role>,
    /// Admin only.
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NewClass {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub instructor_id: Ulid,
    pub scheduled_at: Ms,
    pub duration_min: u32,
    pub location: String,
    pub difficulty: Difficulty,
    /// Defaults to the configured seat ceiling.
    pub max_capacity: Option<u32>,
}

/// Partial class update. The code is fixed at creation and `booked_seats`
/// never appears here — the seat counter moves only through the gate.
#[derive(Debug, Clone, Default)]
pub struct ClassPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub instructor_id: Option<Ulid>,
    pub scheduled_at: Option<Ms>,
    pub duration_min: Option<u32>,
    pub location: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub max_capacity: Option<u32>,
    pub is_available: Option<bool>,
}

// ── WAL record format ────────────────────────────────────────────

/// The event types — flat, no nesting. This is the WAL record format.
/// Creation events carry the full record, so a compacted log is one event
/// per record with its current state (tombstones and cancelled bookings
/// included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    MemberCreated { member: Member },
    MemberUpdated { member: Member },
    MemberDeleted { id: Ulid },
    ClassCreated { class: Class },
    ClassUpdated { class: Class },
    ClassDeleted { id: Ulid },
    SeatAdjusted { class_id: Ulid, delta: i32 },
    BookingCreated { booking: Booking },
    BookingCancelled { id: Ulid },
}

// ── Query result types ───────────────────────────────────────────

/// A day's classes with seat usage, ready to serialize for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub day: NaiveDate,
    pub classes: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleEntry {
    pub class_id: Ulid,
    pub code: String,
    pub name: String,
    pub instructor_id: Ulid,
    pub starts_at: Ms,
    pub ends_at: Ms,
    pub location: String,
    pub difficulty: Difficulty,
    pub booked_seats: u32,
    pub max_capacity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_class(start: Ms, duration_min: u32) -> Class {
        Class {
            id: Ulid::new(),
            code: "YG-01".into(),
            name: "Yoga".into(),
            description: None,
            instructor_id: Ulid::new(),
            scheduled_at: start,
            duration_min,
            location: "Studio 1".into(),
            difficulty: Difficulty::Beginner,
            max_capacity: 10,
            booked_seats: 0,
            is_available: true,
            is_deleted: false,
        }
    }

    #[test]
    fn span_basics() {
        let s = Span::new(100, 200);
        assert_eq!(s.duration_ms(), 100);
        assert!(s.contains_instant(100));
        assert!(s.contains_instant(199));
        assert!(!s.contains_instant(200)); // half-open
    }

    #[test]
    fn span_overlap() {
        let a = Span::new(100, 200);
        let b = Span::new(150, 250);
        let c = Span::new(200, 300);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c)); // adjacent, not overlapping
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn class_window_spans_duration() {
        let c = sample_class(3_600_000, 90);
        assert_eq!(c.window(), Span::new(3_600_000, 3_600_000 + 90 * 60_000));
    }

    #[test]
    fn class_bookable_states() {
        let mut c = sample_class(0, 60);
        assert!(c.is_bookable());
        c.booked_seats = c.max_capacity;
        assert!(!c.is_bookable());
        assert_eq!(c.seats_left(), 0);
        c.booked_seats = 3;
        c.is_available = false;
        assert!(!c.is_bookable());
    }

    #[test]
    fn day_of_buckets_in_utc() {
        // 2024-01-01T00:00:00Z and one ms before it land on different days.
        let jan1: Ms = 1_704_067_200_000;
        assert_eq!(day_of(jan1), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(day_of(jan1 - 1), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
        assert_eq!(day_of(jan1 + 23 * 3_600_000), day_of(jan1));
    }

    #[test]
    fn visibility_admits() {
        assert!(Visibility::Active.admits(false));
        assert!(!Visibility::Active.admits(true));
        assert!(Visibility::All.admits(true));
    }

    #[test]
    fn cancelled_booking_is_not_active() {
        let b = Booking {
            id: Ulid::new(),
            member_id: Ulid::new(),
            class_id: Ulid::new(),
            booked_at: 0,
            status: BookingStatus::Cancelled,
        };
        assert!(!b.is_active());
        assert!(Booking { status: BookingStatus::Confirmed, ..b.clone() }.is_active());
        assert!(Booking { status: BookingStatus::Pending, ..b }.is_active());
    }

    #[test]
    fn event_serialization_roundtrip() {
        let event = Event::ClassCreated { class: sample_class(946_684_800_000, 60) };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);

        let event = Event::SeatAdjusted { class_id: Ulid::new(), delta: -1 };
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }
}
