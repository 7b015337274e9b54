use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, RwLock};
use ulid::Ulid;

use crate::error::Error;
use crate::limits;
use crate::model::*;
use crate::store::{BookingFilter, ClassFilter, EntityStore, MemberFilter};
use crate::wal::Wal;

type Shared<T> = Arc<RwLock<T>>;

fn shared<T>(value: T) -> Shared<T> {
    Arc::new(RwLock::new(value))
}

// ── Group-commit WAL channel ─────────────────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until the first Append arrives.
/// 2. Buffer it (no fsync).
/// 3. Drain all immediately available Appends (the batch window).
/// 4. Single flush_sync for the whole batch.
/// 5. Respond Ok to all senders.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WalCommand::Append { event, response } => {
                let mut batch = vec![(event, response)];

                // Drain all immediately available appends
                loop {
                    match rx.try_recv() {
                        Ok(WalCommand::Append { event, response }) => {
                            batch.push((event, response));
                        }
                        Ok(other) => {
                            // Flush current batch first, then handle the non-append command
                            flush_and_respond(&mut wal, &mut batch);
                            handle_non_append(&mut wal, other);
                            break;
                        }
                        Err(_) => break, // channel empty — flush batch
                    }
                }

                if !batch.is_empty() {
                    flush_and_respond(&mut wal, &mut batch);
                }
            }
            other => handle_non_append(&mut wal, other),
        }
    }
}

fn flush_and_respond(wal: &mut Wal, batch: &mut Vec<(Event, oneshot::Sender<io::Result<()>>)>) {
    metrics::histogram!(crate::observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
    let flush_start = std::time::Instant::now();
    let result = flush_batch(wal, batch);
    metrics::histogram!(crate::observability::WAL_FLUSH_DURATION_SECONDS)
        .record(flush_start.elapsed().as_secs_f64());
    for (_, tx) in batch.drain(..) {
        let r = match &result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn flush_batch(
    wal: &mut Wal,
    batch: &[(Event, oneshot::Sender<io::Result<()>>)],
) -> io::Result<()> {
    let mut append_err: Option<io::Error> = None;
    for (event, _) in batch.iter() {
        if let Err(e) = wal.append_buffered(event) {
            append_err = Some(e);
            break;
        }
    }
    // Always flush — even on append error — so partially buffered bytes
    // don't leak into the next batch (callers were told this batch failed).
    let flush_err = wal.flush_sync().err();
    if let Some(e) = append_err {
        return Err(e);
    }
    if let Some(e) = flush_err {
        return Err(e);
    }
    Ok(())
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let result = Wal::write_compact_file(wal.path(), &events)
                .and_then(|()| wal.swap_compact_file());
            let _ = response.send(result);
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!(),
    }
}

/// Durable in-memory store: every record is an `Arc<RwLock<..>>` in a
/// `DashMap`, every mutation is WAL-appended before it is applied, and the
/// uniqueness constraints live in secondary index maps.
pub struct MemoryStore {
    members: DashMap<Ulid, Shared<Member>>,
    classes: DashMap<Ulid, Shared<Class>>,
    bookings: DashMap<Ulid, Shared<Booking>>,
    /// Lowercased email → member id. Non-deleted members only, so a deleted
    /// member's email can be registered again.
    email_index: DashMap<String, Ulid>,
    /// Class code → class id. Non-deleted classes only.
    code_index: DashMap<String, Ulid>,
    /// (member, class) → booking id for non-cancelled bookings. Holding a
    /// key here IS the at-most-one-active-booking constraint.
    active_pairs: DashMap<(Ulid, Ulid), Ulid>,
    /// member → all their booking ids, any status.
    member_bookings: DashMap<Ulid, Vec<Ulid>>,
    wal_tx: mpsc::Sender<WalCommand>,
    /// Mutations hold this shared, compaction exclusively, so a compaction
    /// snapshot never interleaves with appends. Always acquired before any
    /// record lock.
    compact_gate: RwLock<()>,
}

impl MemoryStore {
    /// Open the store at `wal_path`, replaying whatever the log holds.
    /// Spawns the WAL writer task, so this must run inside a Tokio runtime.
    pub fn open(wal_path: &Path) -> io::Result<Self> {
        let events = Wal::replay(wal_path)?;
        let wal = Wal::open(wal_path)?;
        let (wal_tx, wal_rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, wal_rx));

        let store = Self {
            members: DashMap::new(),
            classes: DashMap::new(),
            bookings: DashMap::new(),
            email_index: DashMap::new(),
            code_index: DashMap::new(),
            active_pairs: DashMap::new(),
            member_bookings: DashMap::new(),
            wal_tx,
            compact_gate: RwLock::new(()),
        };

        // Replay — we're the sole owner of every Arc here, so try_write
        // always succeeds instantly. Never use blocking_write: open may run
        // inside an async context.
        for event in events {
            store.apply_replayed(event);
        }
        Ok(store)
    }

    fn apply_replayed(&self, event: Event) {
        match event {
            Event::MemberCreated { member } => {
                if !member.is_deleted {
                    self.email_index.insert(member.email.to_lowercase(), member.id);
                }
                self.members.insert(member.id, shared(member));
            }
            Event::MemberUpdated { member } => {
                if let Some(arc) = self.members.get(&member.id).map(|e| e.value().clone()) {
                    let old = arc.try_read().expect("replay: uncontended read").clone();
                    if old.email.to_lowercase() != member.email.to_lowercase() {
                        self.email_index.remove(&old.email.to_lowercase());
                    }
                }
                if member.is_deleted {
                    self.email_index.remove(&member.email.to_lowercase());
                } else {
                    self.email_index.insert(member.email.to_lowercase(), member.id);
                }
                self.members.insert(member.id, shared(member));
            }
            Event::MemberDeleted { id } => {
                if let Some(arc) = self.members.get(&id).map(|e| e.value().clone()) {
                    let mut rec = arc.try_write().expect("replay: uncontended write");
                    rec.is_deleted = true;
                    rec.is_active = false;
                    self.email_index.remove(&rec.email.to_lowercase());
                }
            }
            Event::ClassCreated { class } => {
                if !class.is_deleted {
                    self.code_index.insert(class.code.clone(), class.id);
                }
                self.classes.insert(class.id, shared(class));
            }
            Event::ClassUpdated { class } => {
                // Codes are immutable, so no re-indexing here.
                self.classes.insert(class.id, shared(class));
            }
            Event::ClassDeleted { id } => {
                if let Some(arc) = self.classes.get(&id).map(|e| e.value().clone()) {
                    let mut rec = arc.try_write().expect("replay: uncontended write");
                    rec.is_deleted = true;
                    rec.is_available = false;
                    self.code_index.remove(&rec.code);
                }
            }
            Event::SeatAdjusted { class_id, delta } => {
                if let Some(arc) = self.classes.get(&class_id).map(|e| e.value().clone()) {
                    let mut rec = arc.try_write().expect("replay: uncontended write");
                    let next = rec.booked_seats as i64 + delta as i64;
                    if next < 0 || next > rec.max_capacity as i64 {
                        tracing::warn!(
                            "replay: seat adjustment for class {class_id} lands at {next}, skipping"
                        );
                    } else {
                        rec.booked_seats = next as u32;
                    }
                }
            }
            Event::BookingCreated { booking } => {
                if booking.is_active() {
                    self.active_pairs
                        .insert((booking.member_id, booking.class_id), booking.id);
                }
                self.member_bookings
                    .entry(booking.member_id)
                    .or_default()
                    .push(booking.id);
                self.bookings.insert(booking.id, shared(booking));
            }
            Event::BookingCancelled { id } => {
                if let Some(arc) = self.bookings.get(&id).map(|e| e.value().clone()) {
                    let mut rec = arc.try_write().expect("replay: uncontended write");
                    rec.status = BookingStatus::Cancelled;
                    self.active_pairs.remove(&(rec.member_id, rec.class_id));
                }
            }
        }
    }

    /// Write an event via the background group-commit writer.
    async fn wal_append(&self, event: &Event) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Append { event: event.clone(), response: tx })
            .await
            .map_err(|_| Error::Transient("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| Error::Transient("WAL writer dropped response".into()))?
            .map_err(|e| Error::Transient(e.to_string()))
    }

    fn member_arc(&self, id: &Ulid) -> Option<Shared<Member>> {
        self.members.get(id).map(|e| e.value().clone())
    }

    fn class_arc(&self, id: &Ulid) -> Option<Shared<Class>> {
        self.classes.get(id).map(|e| e.value().clone())
    }

    fn booking_arc(&self, id: &Ulid) -> Option<Shared<Booking>> {
        self.bookings.get(id).map(|e| e.value().clone())
    }

    /// Rewrite the WAL as one creation event per record with its current
    /// state inline. Holds the gate exclusively: in-flight mutations finish
    /// their appends first and none start until the swap is done, so the
    /// snapshot and the log cannot disagree.
    pub async fn compact_wal(&self) -> Result<(), Error> {
        let _gate = self.compact_gate.write().await;

        let member_arcs: Vec<_> = self.members.iter().map(|e| e.value().clone()).collect();
        let class_arcs: Vec<_> = self.classes.iter().map(|e| e.value().clone()).collect();
        let booking_arcs: Vec<_> = self.bookings.iter().map(|e| e.value().clone()).collect();

        let mut events =
            Vec::with_capacity(member_arcs.len() + class_arcs.len() + booking_arcs.len());
        for arc in member_arcs {
            events.push(Event::MemberCreated { member: arc.read().await.clone() });
        }
        for arc in class_arcs {
            events.push(Event::ClassCreated { class: arc.read().await.clone() });
        }
        for arc in booking_arcs {
            events.push(Event::BookingCreated { booking: arc.read().await.clone() });
        }

        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact { events, response: tx })
            .await
            .map_err(|_| Error::Transient("WAL writer shut down".into()))?;
        rx.await
            .map_err(|_| Error::Transient("WAL writer dropped response".into()))?
            .map_err(|e| Error::Transient(e.to_string()))
    }

    pub async fn wal_appends_since_compact(&self) -> u64 {
        let (tx, rx) = oneshot::channel();
        if self
            .wal_tx
            .send(WalCommand::AppendsSinceCompact { response: tx })
            .await
            .is_err()
        {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

/// Background loop that compacts the WAL once enough appends accumulate.
pub async fn run_compactor(store: Arc<MemoryStore>, threshold: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(30));
    loop {
        interval.tick().await;
        let appends = store.wal_appends_since_compact().await;
        if appends < threshold {
            continue;
        }
        match store.compact_wal().await {
            Ok(()) => tracing::info!("wal compacted after {appends} appends"),
            Err(e) => tracing::warn!("wal compaction failed: {e}"),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_member(&self, member: Member) -> Result<(), Error> {
        if self.members.len() >= limits::MAX_MEMBERS {
            return Err(Error::Validation("member table is full"));
        }
        if self.members.contains_key(&member.id) {
            return Err(Error::AlreadyExists(member.id));
        }
        let _gate = self.compact_gate.read().await;

        // Reserve the email first; a concurrent duplicate loses at the
        // index, not after both hit the WAL.
        let email_key = member.email.to_lowercase();
        match self.email_index.entry(email_key.clone()) {
            Entry::Occupied(e) => return Err(Error::AlreadyExists(*e.get())),
            Entry::Vacant(v) => {
                v.insert(member.id);
            }
        }

        let event = Event::MemberCreated { member: member.clone() };
        if let Err(e) = self.wal_append(&event).await {
            self.email_index.remove(&email_key);
            return Err(e);
        }
        self.members.insert(member.id, shared(member));
        Ok(())
    }

    async fn find_member(&self, id: Ulid, vis: Visibility) -> Result<Option<Member>, Error> {
        let Some(arc) = self.member_arc(&id) else {
            return Ok(None);
        };
        let rec = arc.read().await;
        Ok(vis.admits(rec.is_deleted).then(|| rec.clone()))
    }

    async fn update_member(&self, id: Ulid, patch: MemberPatch) -> Result<Member, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.member_arc(&id).ok_or(Error::NotFound(id))?;
        let mut rec = arc.write().await;
        if rec.is_deleted {
            return Err(Error::NotFound(id));
        }

        let mut next = rec.clone();
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(email) = patch.email {
            next.email = email;
        }
        if let Some(role) = patch.role {
            next.role = role;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }

        let old_key = rec.email.to_lowercase();
        let new_key = next.email.to_lowercase();
        let email_changed = new_key != old_key;
        if email_changed {
            match self.email_index.entry(new_key.clone()) {
                Entry::Occupied(e) => return Err(Error::AlreadyExists(*e.get())),
                Entry::Vacant(v) => {
                    v.insert(id);
                }
            }
        }

        let event = Event::MemberUpdated { member: next.clone() };
        if let Err(e) = self.wal_append(&event).await {
            if email_changed {
                self.email_index.remove(&new_key);
            }
            return Err(e);
        }
        if email_changed {
            self.email_index.remove(&old_key);
        }
        *rec = next.clone();
        Ok(next)
    }

    async fn soft_delete_member(&self, id: Ulid) -> Result<Member, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.member_arc(&id).ok_or(Error::NotFound(id))?;
        let mut rec = arc.write().await;
        if rec.is_deleted {
            return Err(Error::NotFound(id));
        }

        let event = Event::MemberDeleted { id };
        self.wal_append(&event).await?;
        rec.is_deleted = true;
        rec.is_active = false;
        self.email_index.remove(&rec.email.to_lowercase());
        Ok(rec.clone())
    }

    async fn list_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, Error> {
        let arcs: Vec<_> = self.members.iter().map(|e| e.value().clone()).collect();
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut out = Vec::new();
        for arc in arcs {
            let rec = arc.read().await;
            if !filter.visibility.admits(rec.is_deleted) {
                continue;
            }
            if let Some(role) = filter.role
                && rec.role != role
            {
                continue;
            }
            if let Some(active) = filter.active
                && rec.is_active != active
            {
                continue;
            }
            if let Some(ref needle) = needle
                && !rec.name.to_lowercase().contains(needle)
                && !rec.email.to_lowercase().contains(needle)
            {
                continue;
            }
            out.push(rec.clone());
        }
        out.sort_by_key(|m| m.id);
        Ok(out)
    }

    async fn insert_class(&self, class: Class) -> Result<(), Error> {
        if self.classes.len() >= limits::MAX_CLASSES {
            return Err(Error::Validation("class table is full"));
        }
        if self.classes.contains_key(&class.id) {
            return Err(Error::AlreadyExists(class.id));
        }
        let _gate = self.compact_gate.read().await;

        match self.code_index.entry(class.code.clone()) {
            Entry::Occupied(e) => return Err(Error::AlreadyExists(*e.get())),
            Entry::Vacant(v) => {
                v.insert(class.id);
            }
        }

        let event = Event::ClassCreated { class: class.clone() };
        if let Err(e) = self.wal_append(&event).await {
            self.code_index.remove(&class.code);
            return Err(e);
        }
        self.classes.insert(class.id, shared(class));
        Ok(())
    }

    async fn find_class(&self, id: Ulid, vis: Visibility) -> Result<Option<Class>, Error> {
        let Some(arc) = self.class_arc(&id) else {
            return Ok(None);
        };
        let rec = arc.read().await;
        Ok(vis.admits(rec.is_deleted).then(|| rec.clone()))
    }

    async fn update_class(&self, id: Ulid, patch: ClassPatch) -> Result<Class, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.class_arc(&id).ok_or(Error::NotFound(id))?;
        let mut rec = arc.write().await;
        if rec.is_deleted {
            return Err(Error::NotFound(id));
        }

        let mut next = rec.clone();
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(description) = patch.description {
            next.description = Some(description);
        }
        if let Some(instructor_id) = patch.instructor_id {
            next.instructor_id = instructor_id;
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            next.scheduled_at = scheduled_at;
        }
        if let Some(duration_min) = patch.duration_min {
            next.duration_min = duration_min;
        }
        if let Some(location) = patch.location {
            next.location = location;
        }
        if let Some(difficulty) = patch.difficulty {
            next.difficulty = difficulty;
        }
        if let Some(max_capacity) = patch.max_capacity {
            next.max_capacity = max_capacity;
        }
        if let Some(is_available) = patch.is_available {
            next.is_available = is_available;
        }

        // Checked under the class write lock: no seat adjustment can land
        // between this check and the write.
        if next.max_capacity < rec.booked_seats {
            return Err(Error::Validation("max capacity below booked seats"));
        }

        let event = Event::ClassUpdated { class: next.clone() };
        self.wal_append(&event).await?;
        *rec = next.clone();
        Ok(next)
    }

    async fn soft_delete_class(&self, id: Ulid) -> Result<Class, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.class_arc(&id).ok_or(Error::NotFound(id))?;
        let mut rec = arc.write().await;
        if rec.is_deleted {
            return Err(Error::NotFound(id));
        }
        if rec.booked_seats > 0 {
            return Err(Error::ClassOccupied { seats: rec.booked_seats });
        }

        let event = Event::ClassDeleted { id };
        self.wal_append(&event).await?;
        rec.is_deleted = true;
        rec.is_available = false;
        self.code_index.remove(&rec.code);
        Ok(rec.clone())
    }

    async fn adjust_seat_count(&self, class_id: Ulid, delta: i32) -> Result<Class, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.class_arc(&class_id).ok_or(Error::NotFound(class_id))?;
        let mut rec = arc.write().await;
        if rec.is_deleted {
            return Err(Error::NotFound(class_id));
        }

        let next = rec.booked_seats as i64 + delta as i64;
        if next > rec.max_capacity as i64 {
            return Err(Error::CapacityExceeded(rec.max_capacity));
        }
        if next < 0 {
            return Err(Error::InvariantViolation(format!(
                "seat counter for class {class_id} would land at {next}"
            )));
        }

        let event = Event::SeatAdjusted { class_id, delta };
        self.wal_append(&event).await?;
        rec.booked_seats = next as u32;
        Ok(rec.clone())
    }

    async fn count_classes_on(&self, day: NaiveDate) -> Result<u32, Error> {
        let arcs: Vec<_> = self.classes.iter().map(|e| e.value().clone()).collect();
        let mut n = 0u32;
        for arc in arcs {
            let rec = arc.read().await;
            if !rec.is_deleted && rec.day() == day {
                n += 1;
            }
        }
        Ok(n)
    }

    async fn list_classes(&self, filter: &ClassFilter) -> Result<Vec<Class>, Error> {
        let arcs: Vec<_> = self.classes.iter().map(|e| e.value().clone()).collect();
        let location = filter.location.as_ref().map(|s| s.to_lowercase());
        let needle = filter.search.as_ref().map(|s| s.to_lowercase());
        let mut out = Vec::new();
        for arc in arcs {
            let rec = arc.read().await;
            if !filter.visibility.admits(rec.is_deleted) {
                continue;
            }
            if let Some(instructor_id) = filter.instructor_id
                && rec.instructor_id != instructor_id
            {
                continue;
            }
            if let Some(ref location) = location
                && !rec.location.to_lowercase().contains(location)
            {
                continue;
            }
            if let Some(difficulty) = filter.difficulty
                && rec.difficulty != difficulty
            {
                continue;
            }
            if let Some(day) = filter.day
                && rec.day() != day
            {
                continue;
            }
            if let Some(available) = filter.available
                && rec.is_available != available
            {
                continue;
            }
            if filter.only_bookable && !rec.is_bookable() {
                continue;
            }
            if let Some(ref needle) = needle
                && !rec.code.to_lowercase().contains(needle)
                && !rec.name.to_lowercase().contains(needle)
                && !rec.description.as_deref().unwrap_or("").to_lowercase().contains(needle)
                && !rec.location.to_lowercase().contains(needle)
            {
                continue;
            }
            out.push(rec.clone());
        }
        out.sort_by_key(|c| (c.scheduled_at, c.id));
        Ok(out)
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), Error> {
        if self.bookings.len() >= limits::MAX_BOOKINGS {
            return Err(Error::Validation("booking table is full"));
        }
        if self.bookings.contains_key(&booking.id) {
            return Err(Error::AlreadyExists(booking.id));
        }
        let _gate = self.compact_gate.read().await;

        // Claiming the pair key IS the uniqueness check; one of two
        // concurrent inserts for the same pair loses here.
        let pair = (booking.member_id, booking.class_id);
        if booking.is_active() {
            match self.active_pairs.entry(pair) {
                Entry::Occupied(_) => {
                    return Err(Error::AlreadyBooked { class_id: booking.class_id })
                }
                Entry::Vacant(v) => {
                    v.insert(booking.id);
                }
            }
        }

        let event = Event::BookingCreated { booking: booking.clone() };
        if let Err(e) = self.wal_append(&event).await {
            if booking.is_active() {
                self.active_pairs.remove(&pair);
            }
            return Err(e);
        }
        self.member_bookings
            .entry(booking.member_id)
            .or_default()
            .push(booking.id);
        self.bookings.insert(booking.id, shared(booking));
        Ok(())
    }

    async fn find_booking(&self, id: Ulid) -> Result<Option<Booking>, Error> {
        let Some(arc) = self.booking_arc(&id) else {
            return Ok(None);
        };
        let rec = arc.read().await;
        Ok(Some(rec.clone()))
    }

    async fn cancel_booking(&self, booking_id: Ulid, member_id: Ulid) -> Result<Booking, Error> {
        let _gate = self.compact_gate.read().await;
        let arc = self.booking_arc(&booking_id).ok_or(Error::NotFound(booking_id))?;
        let mut rec = arc.write().await;
        // One caller wins this check under the write lock; everyone after
        // sees a booking that is no longer Confirmed.
        if rec.member_id != member_id || rec.status != BookingStatus::Confirmed {
            return Err(Error::NotFound(booking_id));
        }

        let event = Event::BookingCancelled { id: booking_id };
        self.wal_append(&event).await?;
        rec.status = BookingStatus::Cancelled;
        self.active_pairs.remove(&(rec.member_id, rec.class_id));
        Ok(rec.clone())
    }

    async fn confirmed_windows(&self, member_id: Ulid) -> Result<Vec<BookedWindow>, Error> {
        let ids = self
            .member_bookings
            .get(&member_id)
            .map(|v| v.value().clone())
            .unwrap_or_default();
        let mut out = Vec::new();
        for booking_id in ids {
            let Some(arc) = self.booking_arc(&booking_id) else {
                continue;
            };
            let booking = arc.read().await.clone();
            if booking.status != BookingStatus::Confirmed {
                continue;
            }
            let (class_name, window) = match self.class_arc(&booking.class_id) {
                Some(carc) => {
                    let class = carc.read().await;
                    (class.name.clone(), Some(class.window()))
                }
                None => (String::new(), None),
            };
            out.push(BookedWindow {
                booking_id: booking.id,
                class_id: booking.class_id,
                class_name,
                window,
            });
        }
        Ok(out)
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> Result<Vec<Booking>, Error> {
        // A member filter narrows the scan to that member's bookings.
        let arcs: Vec<_> = match filter.member_id {
            Some(member_id) => self
                .member_bookings
                .get(&member_id)
                .map(|v| v.value().clone())
                .unwrap_or_default()
                .iter()
                .filter_map(|id| self.booking_arc(id))
                .collect(),
            None => self.bookings.iter().map(|e| e.value().clone()).collect(),
        };
        let mut out = Vec::new();
        for arc in arcs {
            let rec = arc.read().await.clone();
            if let Some(member_id) = filter.member_id
                && rec.member_id != member_id
            {
                continue;
            }
            if let Some(class_id) = filter.class_id
                && rec.class_id != class_id
            {
                continue;
            }
            if let Some(status) = filter.status
                && rec.status != status
            {
                continue;
            }
            if let Some(day) = filter.day {
                let Some(carc) = self.class_arc(&rec.class_id) else {
                    continue;
                };
                if carc.read().await.day() != day {
                    continue;
                }
            }
            out.push(rec);
        }
        out.sort_by_key(|b| b.id);
        Ok(out)
    }
}
