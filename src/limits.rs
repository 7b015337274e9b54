//! Hard caps on inputs and table sizes. These are not tunables — they bound
//! what any deployment will accept, independent of `GymConfig`.

/// Longest member or class name, in bytes.
pub const MAX_NAME_LEN: usize = 256;

/// Longest human-facing class code, in bytes.
pub const MAX_CODE_LEN: usize = 64;

/// Longest email address accepted at registration (RFC 5321 limit).
pub const MAX_EMAIL_LEN: usize = 254;

/// Longest class location string, in bytes.
pub const MAX_LOCATION_LEN: usize = 256;

/// Longest class description, in bytes.
pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Upper bound on registered members.
pub const MAX_MEMBERS: usize = 100_000;

/// Upper bound on classes, deleted ones included.
pub const MAX_CLASSES: usize = 100_000;

/// Upper bound on bookings, cancelled ones included.
pub const MAX_BOOKINGS: usize = 1_000_000;

/// 2000-01-01T00:00:00Z. Schedule timestamps before this are garbage.
pub const MIN_VALID_TIMESTAMP_MS: i64 = 946_684_800_000;

/// 2100-01-01T00:00:00Z. Schedule timestamps past this are garbage.
pub const MAX_VALID_TIMESTAMP_MS: i64 = 4_102_444_800_000;

/// Largest WAL record payload we will attempt to read back. A length prefix
/// beyond this is treated as a corrupt tail.
pub const MAX_WAL_RECORD_BYTES: u32 = 1 << 20;
