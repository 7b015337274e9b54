//! Booking admission control: the decision path every booking request takes
//! before a seat is granted, plus the class and member administration built
//! around it.
//!
//! A booking request flows controller → capacity gate → overlap detector →
//! store commit. Cancellation flows the inverse: store transition → seat
//! release. Each [`Gym`] owns the admission state that guards its store.

mod bookings;
mod capacity;
mod classes;
mod members;
mod overlap;
mod queries;
mod quota;

pub use capacity::{CapacityGate, SeatReservation};
pub use quota::DayQuota;

use std::io;
use std::path::Path;
use std::sync::Arc;

use crate::config::GymConfig;
use crate::store::{EntityStore, MemoryStore};

/// One gym: an entity store plus the admission state serializing access
/// to its seats and its schedule quota.
pub struct Gym<S: EntityStore> {
    store: Arc<S>,
    gate: CapacityGate<S>,
    quota: DayQuota,
    config: GymConfig,
}

impl<S: EntityStore> Gym<S> {
    pub fn new(store: Arc<S>, config: GymConfig) -> Self {
        Self {
            gate: CapacityGate::new(store.clone()),
            quota: DayQuota::new(config.max_classes_per_day),
            store,
            config,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &GymConfig {
        &self.config
    }
}

impl Gym<MemoryStore> {
    /// Open a durable gym under `data_dir` and start its WAL compactor.
    /// Spawns background tasks, so this must run inside a Tokio runtime.
    pub fn open(config: GymConfig, data_dir: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let store = Arc::new(MemoryStore::open(&data_dir.join("gym.wal"))?);
        tokio::spawn(crate::store::run_compactor(store.clone(), config.compact_threshold));
        Ok(Self::new(store, config))
    }
}
