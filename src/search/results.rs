use std::cmp::Ordering;

use crate::search::game::Utility;

/// The score of one root action.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult<A, U> {
    pub action: A,
    pub utility: U,
    /// False if `utility` comes from a shallower round, because this action's search did not finish in time.
    pub completed: bool,
    /// Position of the action in the initial root ordering. Breaks ties between equal utilities.
    pub order: usize,
}

impl<A, U: Utility> SearchResult<A, U> {
    fn best_first(&self, other: &Self) -> Ordering {
        other
            .utility
            .cmp(&self.utility)
            .then_with(|| self.order.cmp(&other.order))
    }
}

pub fn sort_results<A, U: Utility>(results: &mut [SearchResult<A, U>]) {
    results.sort_by(SearchResult::best_first);
}

/// Merges one round's scores into the results of the previous round.
///
/// `previous` is the work list the round was run over, `finished[i]` the score of `previous[i]` if it was finished before the deadline, and `completed_prefix` one past the highest index that finished in time.
/// The results are cut down to the first `completed_prefix` actions and sorted best-first. Actions in that prefix that did not finish keep their previous score.
/// Returns `None` when the round timed out with fewer than two finished actions, in which case the previous results should be kept.
pub fn merge_round<A: Clone, U: Utility>(
    previous: &[SearchResult<A, U>],
    finished: &[Option<U>],
    completed_prefix: usize,
    timed_out: bool,
) -> Option<Vec<SearchResult<A, U>>> {
    let prefix = if timed_out {
        completed_prefix.min(previous.len())
    } else {
        previous.len()
    };
    let mut merged: Vec<SearchResult<A, U>> = previous[..prefix]
        .iter()
        .enumerate()
        .map(|(i, result)| match finished.get(i).copied().flatten() {
            Some(utility) => SearchResult {
                action: result.action.clone(),
                utility,
                completed: true,
                order: result.order,
            },
            None => SearchResult {
                completed: false,
                ..result.clone()
            },
        })
        .collect();

    if timed_out && merged.iter().filter(|result| result.completed).count() < 2 {
        return None;
    }
    sort_results(&mut merged);
    Some(merged)
}

#[cfg(test)]
fn work_list(utilities: &[i32]) -> Vec<SearchResult<char, i32>> {
    utilities
        .iter()
        .enumerate()
        .map(|(i, &utility)| SearchResult {
            action: (b'a' + i as u8) as char,
            utility,
            completed: true,
            order: i,
        })
        .collect()
}

#[test]
fn full_round_is_sorted_with_stable_ties_test() {
    let previous = work_list(&[0, 0, 0, 0]);
    let merged = merge_round(&previous, &[Some(3), Some(5), Some(3), Some(-1)], 4, false).unwrap();
    let actions: Vec<char> = merged.iter().map(|result| result.action).collect();
    assert_eq!(actions, vec!['b', 'a', 'c', 'd']);
    assert!(merged.iter().all(|result| result.completed));
}

#[test]
fn timed_out_round_is_truncated_test() {
    let previous = work_list(&[9, 8, 7, 6, 5]);
    // Items 0, 1 and 3 finished in time, item 2 did not
    let merged = merge_round(&previous, &[Some(1), Some(4), None, Some(2), None], 4, true).unwrap();
    assert_eq!(merged.len(), 4);
    assert_eq!(merged[0].action, 'c');
    assert_eq!(merged[0].utility, 7);
    assert!(!merged[0].completed);
    assert_eq!(merged[1].action, 'b');
    assert_eq!(merged[2].action, 'd');
    assert_eq!(merged[3].action, 'a');
}

#[test]
fn timed_out_round_with_one_result_is_discarded_test() {
    let previous = work_list(&[9, 8, 7]);
    assert_eq!(merge_round(&previous, &[Some(-5), None, None], 1, true), None);
    assert_eq!(merge_round(&previous, &[None, None, None], 0, true), None);
}
