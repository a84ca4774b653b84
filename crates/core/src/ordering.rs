//! Contiguous 1-based ordering for itinerary entries.
//!
//! After every completed mutation the `activity_order` values of a trek's
//! activities must be exactly `{1..N}`. Removal leaves a gap, which is
//! closed by renumbering the survivors to their positional index.

use crate::types::DbId;

/// One entry whose stored order differs from its positional order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reorder {
    pub id: DbId,
    pub from: u32,
    pub to: u32,
}

/// Order assigned to a newly appended entry.
pub fn next_order(current_count: usize) -> u32 {
    u32::try_from(current_count).map_or(u32::MAX, |n| n.saturating_add(1))
}

/// Compute the renumber calls needed for a list already in display order.
///
/// `entries` holds `(id, stored_order)` pairs in positional order. The
/// result lists only entries whose order changes, in ascending position.
pub fn renumber_plan(entries: &[(DbId, u32)]) -> Vec<Reorder> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(idx, &(id, from))| {
            let to = next_order(idx);
            (from != to).then_some(Reorder { id, from, to })
        })
        .collect()
}

/// Whether the orders form exactly `{1..N}` with no gaps or duplicates.
pub fn is_contiguous(orders: impl IntoIterator<Item = u32>) -> bool {
    let mut sorted: Vec<u32> = orders.into_iter().collect();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(idx, &order)| order == next_order(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_middle_entry_renumbers_only_tail() {
        // [1:1, 2:2, 3:3] with id 2 removed.
        let plan = renumber_plan(&[(1, 1), (3, 3)]);
        assert_eq!(plan, vec![Reorder { id: 3, from: 3, to: 2 }]);
    }

    #[test]
    fn removing_first_entry_renumbers_everything() {
        let plan = renumber_plan(&[(2, 2), (3, 3), (4, 4)]);
        assert_eq!(
            plan.iter().map(|r| (r.id, r.to)).collect::<Vec<_>>(),
            vec![(2, 1), (3, 2), (4, 3)]
        );
    }

    #[test]
    fn removing_last_entry_needs_no_calls() {
        assert!(renumber_plan(&[(1, 1), (2, 2)]).is_empty());
    }

    #[test]
    fn contiguity_detects_gaps_and_duplicates() {
        assert!(is_contiguous(Vec::<u32>::new()));
        assert!(is_contiguous([2, 1, 3]));
        assert!(!is_contiguous([1, 3]));
        assert!(!is_contiguous([1, 1, 2]));
        assert!(!is_contiguous([0, 1]));
    }

    #[test]
    fn next_order_is_one_based() {
        assert_eq!(next_order(0), 1);
        assert_eq!(next_order(4), 5);
    }
}
