//! Gym class scheduling with admission control at its heart.
//!
//! Every booking request runs a fixed gauntlet: the capacity gate takes a
//! seat atomically, the overlap detector checks the trainee's existing
//! schedule, and only then does the booking commit — with a compensating
//! seat release on any rejection along the way. Class creation passes a
//! per-day schedule quota under a per-day lock. State lives in an
//! in-memory store backed by a group-commit write-ahead log, replayed on
//! open and compacted in the background.
//!
//! [`admission::Gym`] is the entry point; [`store::EntityStore`] is the
//! seam for alternative storage backends.

pub mod admission;
pub mod config;
pub mod error;
pub mod limits;
pub mod model;
pub mod observability;
pub mod store;
pub mod wal;
