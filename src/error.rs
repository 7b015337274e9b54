use chrono::NaiveDate;
use ulid::Ulid;

/// Every failure the store and the admission core can produce.
///
/// Most variants are *rejections*: the caller's request was understood and
/// refused, and retrying the same input will fail the same way. `Transient`
/// is retryable infrastructure trouble. `InvariantViolation` is a fault in
/// this crate's own concurrency control and is logged as an error at the
/// point of detection — everything else is the caller's problem, not ours,
/// and never logged above debug level.
#[derive(Debug)]
pub enum Error {
    /// Entity missing, soft-deleted, or out of the caller's reach.
    NotFound(Ulid),
    /// Role or ownership check failed.
    Forbidden(&'static str),
    /// The candidate class overlaps one the member already holds.
    Overlap { class_id: Ulid, class_name: String },
    /// The calendar day is already at its class quota.
    QuotaExceeded { day: NaiveDate, limit: u32 },
    /// The member already holds an active booking for this class.
    AlreadyBooked { class_id: Ulid },
    /// Duplicate member email or class code; carries the existing record's id.
    AlreadyExists(Ulid),
    /// Class deletion attempted while seats are still occupied.
    ClassOccupied { seats: u32 },
    /// Every seat is taken. Not retryable — the class is full.
    CapacityExceeded(u32),
    /// Input outside configured bounds or hard limits.
    Validation(&'static str),
    /// Storage unavailable; safe to retry with backoff.
    Transient(String),
    /// The seat counter would leave `0..=max_capacity`. Never clamped.
    InvariantViolation(String),
}

impl Error {
    /// True for expected domain rejections, false for faults
    /// (`Transient`, `InvariantViolation`).
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Error::Transient(_) | Error::InvariantViolation(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotFound(id) => write!(f, "not found: {id}"),
            Error::Forbidden(msg) => write!(f, "forbidden: {msg}"),
            Error::Overlap { class_id, class_name } => {
                write!(f, "schedule conflict with class {class_name} ({class_id})")
            }
            Error::QuotaExceeded { day, limit } => {
                write!(f, "{day} already has {limit} classes scheduled")
            }
            Error::AlreadyBooked { class_id } => {
                write!(f, "already holds an active booking for class {class_id}")
            }
            Error::AlreadyExists(id) => write!(f, "already exists: {id}"),
            Error::ClassOccupied { seats } => {
                write!(f, "class still has {seats} booked seats")
            }
            Error::CapacityExceeded(cap) => {
                write!(f, "capacity {cap} exceeded: class is full")
            }
            Error::Validation(msg) => write!(f, "invalid input: {msg}"),
            Error::Transient(e) => write!(f, "transient storage error: {e}"),
            Error::InvariantViolation(e) => write!(f, "invariant violation: {e}"),
        }
    }
}

impl std::error::Error for Error {}
