//! Daily schedule quota: a hard cap on classes per UTC calendar day.

use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::Error;

/// Serializes quota decisions per calendar day. Counting existing classes
/// and inserting the new one must happen under the same day lock, or two
/// concurrent creates could both pass the check and overshoot the cap.
/// Different days use different locks and never block each other.
pub struct DayQuota {
    max_per_day: u32,
    days: DashMap<NaiveDate, Arc<Mutex<()>>>,
}

impl DayQuota {
    pub fn new(max_per_day: u32) -> Self {
        Self { max_per_day, days: DashMap::new() }
    }

    /// Take the day's lock. Hold the guard across the count-check-insert
    /// sequence.
    pub async fn lock_day(&self, day: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = self.days.entry(day).or_default().clone();
        lock.lock_owned().await
    }

    /// The check proper: `scheduled` is how many non-deleted classes the day
    /// already holds.
    pub fn check(&self, day: NaiveDate, scheduled: u32) -> Result<(), Error> {
        if scheduled >= self.max_per_day {
            return Err(Error::QuotaExceeded { day, limit: self.max_per_day });
        }
        Ok(())
    }

    pub fn limit(&self) -> u32 {
        self.max_per_day
    }
}
