//! Runtime tunables, read once at startup. Hard caps that are not
//! deployment-specific live in `limits` instead.

/// Knobs for a gym deployment. `Default` gives the standard policy;
/// `from_env` overlays `TURNSTILE_*` environment variables for binaries.
#[derive(Debug, Clone)]
pub struct GymConfig {
    /// Classes allowed on one UTC calendar day, across all creators.
    pub max_classes_per_day: u32,
    /// Hard ceiling on any class's `max_capacity`, and the default capacity
    /// for classes created without one.
    pub seat_ceiling: u32,
    /// Shortest accepted class duration, minutes.
    pub min_class_duration_min: u32,
    /// Longest accepted class duration, minutes.
    pub max_class_duration_min: u32,
    /// WAL appends between automatic compactions.
    pub compact_threshold: u64,
}

impl Default for GymConfig {
    fn default() -> Self {
        Self {
            max_classes_per_day: 5,
            seat_ceiling: 10,
            min_class_duration_min: 15,
            max_class_duration_min: 480,
            compact_threshold: 1000,
        }
    }
}

impl GymConfig {
    /// Read `TURNSTILE_*` environment variables, falling back to defaults
    /// for anything unset or unparsable.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(default)
        }
        let d = Self::default();
        Self {
            max_classes_per_day: var("TURNSTILE_MAX_CLASSES_PER_DAY", d.max_classes_per_day),
            seat_ceiling: var("TURNSTILE_SEAT_CEILING", d.seat_ceiling),
            min_class_duration_min: var(
                "TURNSTILE_MIN_CLASS_DURATION_MIN",
                d.min_class_duration_min,
            ),
            max_class_duration_min: var(
                "TURNSTILE_MAX_CLASS_DURATION_MIN",
                d.max_class_duration_min,
            ),
            compact_threshold: var("TURNSTILE_COMPACT_THRESHOLD", d.compact_threshold),
        }
    }
}
