//! Overlap detection between a candidate class window and the windows a
//! member already holds.

use crate::error::Error;
use crate::model::{BookedWindow, Span};

/// Check `candidate` against every held window, rejecting on the first
/// conflict. Windows are half-open, so a class ending exactly when the next
/// one starts does not conflict.
///
/// A held booking whose class can no longer be resolved has no window; it
/// cannot conflict with anything and is skipped.
pub fn check_no_overlap(existing: &[BookedWindow], candidate: &Span) -> Result<(), Error> {
    for held in existing {
        let Some(window) = held.window else {
            tracing::warn!(
                "overlap check: booking {} references class {} with no resolvable window, skipping",
                held.booking_id,
                held.class_id
            );
            continue;
        };
        if window.overlaps(candidate) {
            return Err(Error::Overlap {
                class_id: held.class_id,
                class_name: held.class_name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    const H: i64 = 3_600_000;

    fn held(start: i64, end: i64) -> BookedWindow {
        BookedWindow {
            booking_id: Ulid::new(),
            class_id: Ulid::new(),
            class_name: "Held".into(),
            window: Some(Span::new(start, end)),
        }
    }

    #[test]
    fn back_to_back_classes_do_not_conflict() {
        let existing = vec![held(10 * H, 12 * H)];
        assert!(check_no_overlap(&existing, &Span::new(12 * H, 14 * H)).is_ok());
        assert!(check_no_overlap(&existing, &Span::new(8 * H, 10 * H)).is_ok());
    }

    #[test]
    fn intersecting_windows_conflict_both_ways() {
        let existing = vec![held(10 * H, 12 * H)];
        assert!(matches!(
            check_no_overlap(&existing, &Span::new(11 * H, 13 * H)),
            Err(Error::Overlap { .. })
        ));
        assert!(matches!(
            check_no_overlap(&existing, &Span::new(9 * H, 11 * H)),
            Err(Error::Overlap { .. })
        ));
        // Containment in either direction conflicts too.
        assert!(matches!(
            check_no_overlap(&existing, &Span::new(9 * H, 13 * H)),
            Err(Error::Overlap { .. })
        ));
        assert!(matches!(
            check_no_overlap(&existing, &Span::new(11 * H, 11 * H + 1)),
            Err(Error::Overlap { .. })
        ));
    }

    #[test]
    fn one_millisecond_of_overlap_conflicts() {
        let existing = vec![held(10 * H, 12 * H + 1)];
        assert!(matches!(
            check_no_overlap(&existing, &Span::new(12 * H, 14 * H)),
            Err(Error::Overlap { .. })
        ));
    }

    #[test]
    fn conflict_names_the_held_class() {
        let mut blocker = held(10 * H, 12 * H);
        blocker.class_name = "Morning Yoga".into();
        let id = blocker.class_id;
        let err = check_no_overlap(&[blocker], &Span::new(11 * H, 13 * H)).unwrap_err();
        match err {
            Error::Overlap { class_id, class_name } => {
                assert_eq!(class_id, id);
                assert_eq!(class_name, "Morning Yoga");
            }
            other => panic!("expected Overlap, got {other:?}"),
        }
    }

    #[test]
    fn unresolvable_windows_are_skipped() {
        let dangling = BookedWindow {
            booking_id: Ulid::new(),
            class_id: Ulid::new(),
            class_name: String::new(),
            window: None,
        };
        assert!(check_no_overlap(&[dangling], &Span::new(10 * H, 12 * H)).is_ok());
    }

    #[test]
    fn empty_schedule_never_conflicts() {
        assert!(check_no_overlap(&[], &Span::new(0, H)).is_ok());
    }
}
