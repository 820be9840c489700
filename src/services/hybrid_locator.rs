//! Bounded searches for hybrid questions across the pages of an attempt.
//!
//! Every search walks a finite page range and reports a typed outcome; none of
//! them can run past the last page.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db::models::{AttemptSnapshot, SlotSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct SlotPosition {
    pub(crate) slot: i32,
    pub(crate) page: i32,
}

impl From<&SlotSnapshot> for SlotPosition {
    fn from(slot: &SlotSnapshot) -> Self {
        Self { slot: slot.slot, page: slot.page }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Direction {
    First,
    Next,
    Previous,
}

impl Direction {
    /// Word placing the page in error messages ("no hybrid question after page 2").
    fn preposition(self) -> &'static str {
        match self {
            Self::First => "from",
            Self::Next => "after",
            Self::Previous => "before",
        }
    }
}

/// Outcome of a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum Located {
    Hybrid(SlotPosition),
    /// `first` reached the last page without meeting a hybrid slot; carries the
    /// first slot of that last page.
    LastPageFallback(SlotPosition),
}

impl Located {
    pub(crate) fn position(self) -> SlotPosition {
        match self {
            Self::Hybrid(position) | Self::LastPageFallback(position) => position,
        }
    }

    pub(crate) fn is_fallback(self) -> bool {
        matches!(self, Self::LastPageFallback(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum LocateError {
    #[error("attempt has no pages")]
    EmptyAttempt,
    #[error("page {page} is outside the attempt ({page_count} pages)")]
    PageOutOfRange { page: i32, page_count: i32 },
    #[error("no hybrid question {} page {page}", .direction.preposition())]
    NotFound { direction: Direction, page: i32 },
}

pub(crate) fn locate(
    direction: Direction,
    attempt: &AttemptSnapshot,
    from_page: i32,
) -> Result<Located, LocateError> {
    match direction {
        Direction::First => first(attempt, from_page),
        Direction::Next => next(attempt, from_page).map(Located::Hybrid),
        Direction::Previous => previous(attempt, from_page).map(Located::Hybrid),
    }
}

/// Scans forward from `start_page` inclusive.
pub(crate) fn first(attempt: &AttemptSnapshot, start_page: i32) -> Result<Located, LocateError> {
    let page_count = checked_page(attempt, start_page)?;

    if let Some(found) = (start_page..page_count).find_map(|page| hybrid_on_page(attempt, page)) {
        return Ok(Located::Hybrid(found));
    }

    let last_page = page_count - 1;
    attempt
        .slots_on_page(last_page)
        .next()
        .map(|slot| Located::LastPageFallback(slot.into()))
        .ok_or(LocateError::NotFound { direction: Direction::First, page: start_page })
}

/// Scans forward starting at `from_page + 1`.
pub(crate) fn next(attempt: &AttemptSnapshot, from_page: i32) -> Result<SlotPosition, LocateError> {
    let page_count = checked_page(attempt, from_page)?;

    (from_page + 1..page_count)
        .find_map(|page| hybrid_on_page(attempt, page))
        .ok_or(LocateError::NotFound { direction: Direction::Next, page: from_page })
}

/// Scans backward starting at `from_page - 1`.
pub(crate) fn previous(
    attempt: &AttemptSnapshot,
    from_page: i32,
) -> Result<SlotPosition, LocateError> {
    checked_page(attempt, from_page)?;

    (0..from_page)
        .rev()
        .find_map(|page| hybrid_on_page(attempt, page))
        .ok_or(LocateError::NotFound { direction: Direction::Previous, page: from_page })
}

/// True when no slot numbered `from_slot` or later is hybrid.
pub(crate) fn is_last(attempt: &AttemptSnapshot, from_slot: i32) -> bool {
    !attempt.slots.iter().any(|slot| slot.slot >= from_slot && slot.is_hybrid())
}

pub(crate) fn has_hybrid_question(attempt: &AttemptSnapshot) -> bool {
    attempt.hybrid_slots().next().is_some()
}

/// Where the hybrid questions sit relative to `page`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Navigation {
    pub(crate) page: i32,
    pub(crate) first: Located,
    pub(crate) next: Option<SlotPosition>,
    pub(crate) previous: Option<SlotPosition>,
    /// The page holds the attempt's last hybrid slot.
    pub(crate) is_last: bool,
}

pub(crate) fn navigation(attempt: &AttemptSnapshot, page: i32) -> Result<Navigation, LocateError> {
    let first = locate(Direction::First, attempt, 0)?;
    let next = neighbour(attempt, Direction::Next, page)?;
    let previous = neighbour(attempt, Direction::Previous, page)?;
    let is_last = attempt
        .slots_on_page(page)
        .filter(|slot| slot.is_hybrid())
        .map(|slot| slot.slot)
        .max()
        .is_some_and(|slot| is_last(attempt, slot + 1));

    Ok(Navigation { page, first, next, previous, is_last })
}

fn neighbour(
    attempt: &AttemptSnapshot,
    direction: Direction,
    page: i32,
) -> Result<Option<SlotPosition>, LocateError> {
    match locate(direction, attempt, page) {
        Ok(located) => Ok(Some(located.position())),
        Err(LocateError::NotFound { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn hybrid_on_page(attempt: &AttemptSnapshot, page: i32) -> Option<SlotPosition> {
    attempt.slots_on_page(page).find(|slot| slot.is_hybrid()).map(SlotPosition::from)
}

fn checked_page(attempt: &AttemptSnapshot, page: i32) -> Result<i32, LocateError> {
    let page_count = attempt.page_count();
    if page_count == 0 {
        return Err(LocateError::EmptyAttempt);
    }
    if page < 0 || page >= page_count {
        return Err(LocateError::PageOutOfRange { page, page_count });
    }
    Ok(page_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::AttemptState;
    use crate::test_support::{attempt_snapshot, SlotSpec};

    fn one_per_page(kinds: &[bool]) -> AttemptSnapshot {
        let slots = kinds
            .iter()
            .enumerate()
            .map(|(index, hybrid)| {
                let (slot, page) = (index as i32 + 1, index as i32);
                if *hybrid {
                    SlotSpec::hybrid(slot, page)
                } else {
                    SlotSpec::essay(slot, page)
                }
            })
            .collect();
        attempt_snapshot(AttemptState::InProgress, slots)
    }

    #[test]
    fn first_finds_only_hybrid_on_page_three_of_five() {
        let attempt = one_per_page(&[false, false, false, true, false]);

        assert_eq!(first(&attempt, 0), Ok(Located::Hybrid(SlotPosition { slot: 4, page: 3 })));
    }

    #[test]
    fn first_includes_start_page() {
        let attempt = one_per_page(&[true, false, true]);

        assert_eq!(
            first(&attempt, 2).map(Located::position),
            Ok(SlotPosition { slot: 3, page: 2 })
        );
    }

    #[test]
    fn first_checks_the_last_page_itself() {
        let attempt = one_per_page(&[false, false, true]);

        assert_eq!(first(&attempt, 0), Ok(Located::Hybrid(SlotPosition { slot: 3, page: 2 })));
    }

    #[test]
    fn first_without_hybrid_reports_fallback() {
        let attempt = one_per_page(&[false, false, false]);

        let located = first(&attempt, 1).expect("fallback");
        assert!(located.is_fallback());
        assert_eq!(located.position(), SlotPosition { slot: 3, page: 2 });
    }

    #[test]
    fn next_from_last_hybrid_page_is_not_found() {
        let attempt = one_per_page(&[true, false, true, false]);

        assert_eq!(
            next(&attempt, 2),
            Err(LocateError::NotFound { direction: Direction::Next, page: 2 })
        );
        assert_eq!(next(&attempt, 3).unwrap_err().to_string(), "no hybrid question after page 3");
    }

    #[test]
    fn next_skips_non_hybrid_pages() {
        let attempt = one_per_page(&[true, false, false, true]);

        assert_eq!(next(&attempt, 0), Ok(SlotPosition { slot: 4, page: 3 }));
    }

    #[test]
    fn previous_scans_backward_and_stops_at_page_zero() {
        let attempt = one_per_page(&[true, false, true, false]);

        assert_eq!(previous(&attempt, 3), Ok(SlotPosition { slot: 3, page: 2 }));
        assert_eq!(previous(&attempt, 2), Ok(SlotPosition { slot: 1, page: 0 }));
        assert!(matches!(previous(&attempt, 0), Err(LocateError::NotFound { .. })));
    }

    #[test]
    fn pages_outside_the_attempt_are_rejected() {
        let attempt = one_per_page(&[true, false]);

        assert_eq!(next(&attempt, 2), Err(LocateError::PageOutOfRange { page: 2, page_count: 2 }));
        assert_eq!(
            first(&attempt, -1),
            Err(LocateError::PageOutOfRange { page: -1, page_count: 2 })
        );
    }

    #[test]
    fn empty_attempt_is_its_own_error() {
        let attempt = attempt_snapshot(AttemptState::InProgress, Vec::new());

        assert_eq!(first(&attempt, 0), Err(LocateError::EmptyAttempt));
        assert!(!has_hybrid_question(&attempt));
    }

    #[test]
    fn hybrid_slot_anywhere_on_a_page_counts() {
        let attempt = attempt_snapshot(
            AttemptState::InProgress,
            vec![SlotSpec::essay(1, 0), SlotSpec::essay(2, 1), SlotSpec::hybrid(3, 1)],
        );

        assert_eq!(
            locate(Direction::First, &attempt, 0),
            Ok(Located::Hybrid(SlotPosition { slot: 3, page: 1 }))
        );
    }

    #[test]
    fn is_last_looks_at_slots_from_index_on() {
        let attempt = one_per_page(&[true, false, true, false]);

        assert!(!is_last(&attempt, 1));
        assert!(!is_last(&attempt, 3));
        assert!(is_last(&attempt, 4));
        assert!(is_last(&attempt, 99));
    }

    #[test]
    fn navigation_collects_neighbours() {
        let attempt = one_per_page(&[false, true, false, true, false]);

        let nav = navigation(&attempt, 2).expect("navigation");
        assert_eq!(nav.first, Located::Hybrid(SlotPosition { slot: 2, page: 1 }));
        assert_eq!(nav.next, Some(SlotPosition { slot: 4, page: 3 }));
        assert_eq!(nav.previous, Some(SlotPosition { slot: 2, page: 1 }));
        assert!(!nav.is_last);

        let last = navigation(&attempt, 3).expect("navigation");
        assert_eq!(last.next, None);
        assert!(last.is_last);
    }

    #[test]
    fn navigation_rejects_pages_outside_the_attempt() {
        let attempt = one_per_page(&[true]);

        assert_eq!(
            navigation(&attempt, 4),
            Err(LocateError::PageOutOfRange { page: 4, page_count: 1 })
        );
    }

    #[test]
    fn locate_dispatches_by_direction() {
        let attempt = one_per_page(&[true, true, true]);

        assert_eq!(
            locate(Direction::Next, &attempt, 1).map(Located::position),
            Ok(SlotPosition { slot: 3, page: 2 })
        );
        assert_eq!(
            locate(Direction::Previous, &attempt, 1).map(Located::position),
            Ok(SlotPosition { slot: 1, page: 0 })
        );
    }

    #[test]
    fn not_found_messages_read_as_a_search_from_the_page() {
        let after = LocateError::NotFound { direction: Direction::Next, page: 2 };
        let before = LocateError::NotFound { direction: Direction::Previous, page: 0 };

        assert_eq!(after.to_string(), "no hybrid question after page 2");
        assert_eq!(before.to_string(), "no hybrid question before page 0");
        assert_eq!(
            serde_json::to_value(Direction::Next).expect("serialize"),
            serde_json::json!("next")
        );
    }
}
