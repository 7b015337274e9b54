use std::net::SocketAddr;

// ── Admission metrics (request-driven) ──────────────────────────

/// Counter: bookings admitted.
pub const BOOKINGS_ADMITTED_TOTAL: &str = "turnstile_bookings_admitted_total";

/// Counter: bookings rejected (any rejection reason).
pub const BOOKINGS_REJECTED_TOTAL: &str = "turnstile_bookings_rejected_total";

/// Counter: bookings cancelled.
pub const BOOKINGS_CANCELLED_TOTAL: &str = "turnstile_bookings_cancelled_total";

/// Histogram: booking admission latency in seconds, rejections included.
pub const ADMISSION_DURATION_SECONDS: &str = "turnstile_admission_duration_seconds";

/// Counter: classes created.
pub const CLASSES_CREATED_TOTAL: &str = "turnstile_classes_created_total";

/// Counter: schedule writes refused by the daily class quota.
pub const QUOTA_REJECTIONS_TOTAL: &str = "turnstile_quota_rejections_total";

// ── Fault metrics ───────────────────────────────────────────────

/// Counter: compensating seat releases that ultimately failed. Any nonzero
/// value means a class is advertising fewer seats than it really has.
pub const SEAT_RELEASE_FAILURES_TOTAL: &str = "turnstile_seat_release_failures_total";

// ── Storage metrics ─────────────────────────────────────────────

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "turnstile_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "turnstile_wal_flush_batch_size";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install the fmt tracing subscriber. For embedding binaries that do not
/// bring their own subscriber; call once, early.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}
