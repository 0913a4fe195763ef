//! Eligible amount selection.
//!
//! Given the amounts of the unused eligible receipts and a reimbursement
//! target, [`select`] picks the subset whose sum is the largest value that does
//! not exceed the target.
//!
//! The search visits every subset, so its cost is `O(2^n)` in time. The
//! enumeration order is what decides ties between subsets with the same sum,
//! which is why the search is not pruned. Callers must bound `n`; the engine
//! does it with [`DEFAULT_MAX_CANDIDATES`] (see [`select_capped`]).
//!
//! Subsets are visited as the classic growing state list would visit them:
//! for amount `k`, every subset of the amounts before it, in the order they
//! were created, extended by `k`. Position `p` in that list is exactly the
//! subset whose bitmask is `p`, so the list never has to be materialised:
//! counting `p` upwards and carrying the running sum from `p - 1` to `p`
//! covers it in constant memory.

use crate::{EngineError, MoneyCents, ResultEngine};

/// Default cap on the number of amounts fed to [`select`].
///
/// 25 amounts mean 2^25 (about 33 million) subsets, well under a second of
/// one blocking thread and no memory beyond the input. Every further amount
/// doubles the time.
pub const DEFAULT_MAX_CANDIDATES: usize = 25;

/// Subsets are tracked as `u64` bitmasks.
pub const MAX_SELECTION_INPUT: usize = 63;

/// Returns the indices (ascending, i.e. in input order) of the subset of
/// `amounts` whose sum best approaches `target` without exceeding it.
///
/// The best subset only changes on a strictly smaller remainder, so among
/// subsets with the same sum the one enumerated first wins. Within one amount
/// the subsets are visited in the order they were created, which puts subsets
/// built from earlier items ahead of later ones.
///
/// Sums are accumulated in `i128`, so no combination of `i64` amounts can
/// wrap around and sneak under the target.
///
/// An empty input, a zero target, or a target smaller than every amount all
/// yield an empty selection.
///
/// # Panics
///
/// If more than [`MAX_SELECTION_INPUT`] amounts are given.
#[must_use]
pub fn select(amounts: &[MoneyCents], target: MoneyCents) -> Vec<usize> {
    assert!(
        amounts.len() <= MAX_SELECTION_INPUT,
        "cannot enumerate subsets of {} amounts",
        amounts.len()
    );
    let values: Vec<i128> = amounts.iter().map(|a| i128::from(a.cents())).collect();
    // prefix[i] = sum of values[..i]
    let prefix: Vec<i128> = std::iter::once(0)
        .chain(values.iter().scan(0i128, |acc, v| {
            *acc += v;
            Some(*acc)
        }))
        .collect();
    let target = i128::from(target.cents());

    let mut best_mask = 0u64;
    let mut best_remainder = target;

    for (index, &amount) in values.iter().enumerate() {
        // Sum of the subset with bitmask `mask` over the amounts before `index`.
        let mut base = 0i128;
        for mask in 0u64..(1u64 << index) {
            if mask > 0 {
                // mask - 1 -> mask clears the trailing ones and sets the next bit.
                let bit = mask.trailing_zeros() as usize;
                base += values[bit] - prefix[bit];
            }
            let sum = base + amount;
            if sum <= target && target - sum < best_remainder {
                best_remainder = target - sum;
                best_mask = mask | (1u64 << index);
            }
        }
    }

    (0..amounts.len())
        .filter(|&i| best_mask & (1u64 << i) != 0)
        .collect()
}

/// [`select`] guarded by an input-size cap.
///
/// Returns [`EngineError::TooManyCandidates`] instead of running an
/// enumeration over more than `limit` amounts (never more than
/// [`MAX_SELECTION_INPUT`]).
pub fn select_capped(
    amounts: &[MoneyCents],
    target: MoneyCents,
    limit: usize,
) -> ResultEngine<Vec<usize>> {
    if target.is_negative() {
        return Err(EngineError::InvalidAmount(
            "target amount must not be negative".to_string(),
        ));
    }
    let limit = limit.min(MAX_SELECTION_INPUT);
    if amounts.len() > limit {
        return Err(EngineError::TooManyCandidates {
            count: amounts.len(),
            limit,
        });
    }
    if let Some(amount) = amounts.iter().find(|a| !a.is_positive()) {
        return Err(EngineError::InvalidAmount(format!(
            "selection amounts must be positive, got {amount}"
        )));
    }
    Ok(select(amounts, target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(values: &[i64]) -> Vec<MoneyCents> {
        values.iter().copied().map(MoneyCents::new).collect()
    }

    fn sum_of(amounts: &[MoneyCents], indices: &[usize]) -> MoneyCents {
        indices.iter().map(|&i| amounts[i]).sum()
    }

    /// Largest subset sum not above `target`, by plain bitmask enumeration.
    fn best_sum(amounts: &[MoneyCents], target: MoneyCents) -> MoneyCents {
        let mut best = MoneyCents::ZERO;
        for mask in 0u32..(1 << amounts.len()) {
            let sum: MoneyCents = (0..amounts.len())
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| amounts[i])
                .sum();
            if sum <= target && sum > best {
                best = sum;
            }
        }
        best
    }

    #[test]
    fn picks_pair_closest_to_target() {
        let amounts = cents(&[1250, 725, 3000]);
        let selected = select(&amounts, MoneyCents::new(2000));
        assert_eq!(selected, vec![0, 1]);
        assert_eq!(sum_of(&amounts, &selected), MoneyCents::new(1975));
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select(&[], MoneyCents::new(5000)).is_empty());
    }

    #[test]
    fn zero_target_selects_nothing() {
        assert!(select(&cents(&[100, 200]), MoneyCents::ZERO).is_empty());
    }

    #[test]
    fn target_below_every_amount_selects_nothing() {
        assert!(select(&cents(&[500, 700]), MoneyCents::new(499)).is_empty());
    }

    #[test]
    fn exact_match_uses_every_item_when_needed() {
        let amounts = cents(&[100, 200, 300]);
        assert_eq!(select(&amounts, MoneyCents::new(600)), vec![0, 1, 2]);
    }

    #[test]
    fn ties_keep_the_first_enumerated_subset() {
        // {0} and {1} both sum to 5.00; {0} is found first.
        let amounts = cents(&[500, 500]);
        assert_eq!(select(&amounts, MoneyCents::new(500)), vec![0]);

        // {2} = 6.00 is reached after {0,1} = 6.00, so {0,1} is kept.
        let amounts = cents(&[200, 400, 600]);
        assert_eq!(select(&amounts, MoneyCents::new(600)), vec![0, 1]);

        // {0,2} = 7.00 and {1,2} = 7.00: states for the third item are
        // visited as {}, {0}, {1}, {0,1}, so {0,2} comes first.
        let amounts = cents(&[300, 300, 400]);
        assert_eq!(select(&amounts, MoneyCents::new(700)), vec![0, 2]);
    }

    #[test]
    fn later_exact_hit_replaces_earlier_partial() {
        let amounts = cents(&[300, 1000]);
        assert_eq!(select(&amounts, MoneyCents::new(1000)), vec![1]);
    }

    #[test]
    fn is_deterministic() {
        let amounts = cents(&[1999, 450, 1234, 77, 830, 2100]);
        let first = select(&amounts, MoneyCents::new(3333));
        for _ in 0..5 {
            assert_eq!(select(&amounts, MoneyCents::new(3333)), first);
        }
    }

    #[test]
    fn never_exceeds_target_and_reaches_best_sum() {
        let inputs: &[&[i64]] = &[
            &[1250, 725, 3000],
            &[1, 2, 4, 8, 16],
            &[999, 1001, 505, 495, 250],
            &[3000, 2999, 1, 2, 7, 13],
            &[45, 45, 45, 90, 135],
        ];
        for values in inputs {
            let amounts = cents(values);
            for target in [0, 1, 50, 500, 1000, 1999, 2500, 4000, 10_000] {
                let target = MoneyCents::new(target);
                let selected = select(&amounts, target);
                let sum = sum_of(&amounts, &selected);
                assert!(sum <= target, "{values:?} / {target}: {sum} over target");
                assert_eq!(sum, best_sum(&amounts, target), "{values:?} / {target}");
                assert!(selected.windows(2).all(|w| w[0] < w[1]));
            }
        }
    }

    /// The growing state list the bitmask walk stands in for.
    fn state_list_select(amounts: &[MoneyCents], target: MoneyCents) -> Vec<usize> {
        let mut states: Vec<(i64, Vec<usize>)> = vec![(0, Vec::new())];
        let mut best: (i64, Vec<usize>) = (0, Vec::new());
        for (index, amount) in amounts.iter().enumerate() {
            let mut extended = Vec::new();
            for (sum, indices) in &states {
                let mut indices = indices.clone();
                indices.push(index);
                let sum = sum + amount.cents();
                if sum <= target.cents() && target.cents() - sum < target.cents() - best.0 {
                    best = (sum, indices.clone());
                }
                extended.push((sum, indices));
            }
            states.append(&mut extended);
        }
        best.1
    }

    #[test]
    fn matches_the_state_list_order_everywhere() {
        let inputs: &[&[i64]] = &[
            &[500, 500, 500],
            &[200, 400, 600, 200],
            &[300, 300, 400, 700, 100],
            &[1250, 725, 3000, 1975, 25, 1250],
            &[45, 45, 45, 90, 135, 180, 225],
        ];
        for values in inputs {
            let amounts = cents(values);
            for target in [0, 45, 100, 500, 700, 1000, 1975, 2000, 3000, 5000] {
                let target = MoneyCents::new(target);
                assert_eq!(
                    select(&amounts, target),
                    state_list_select(&amounts, target),
                    "{values:?} / {target}"
                );
            }
        }
    }

    #[test]
    fn huge_amounts_cannot_wrap_under_the_target() {
        let amounts = cents(&[i64::MAX, 100, i64::MAX]);
        assert_eq!(select(&amounts, MoneyCents::new(100)), vec![1]);
        assert_eq!(select(&amounts, MoneyCents::new(i64::MAX)), vec![0]);
    }

    #[test]
    fn capped_never_exceeds_the_bitmask_width() {
        let amounts = cents(&[1; MAX_SELECTION_INPUT + 1]);
        let err = select_capped(&amounts, MoneyCents::new(1), usize::MAX).unwrap_err();
        assert_eq!(
            err,
            EngineError::TooManyCandidates {
                count: MAX_SELECTION_INPUT + 1,
                limit: MAX_SELECTION_INPUT
            }
        );
    }

    #[test]
    fn capped_rejects_oversized_input() {
        let amounts = cents(&[100; 4]);
        let err = select_capped(&amounts, MoneyCents::new(100), 3).unwrap_err();
        assert_eq!(err, EngineError::TooManyCandidates { count: 4, limit: 3 });
    }

    #[test]
    fn capped_rejects_negative_target_and_non_positive_amounts() {
        assert!(matches!(
            select_capped(&cents(&[100]), MoneyCents::new(-1), 10),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            select_capped(&cents(&[100, 0]), MoneyCents::new(100), 10),
            Err(EngineError::InvalidAmount(_))
        ));
    }

    #[test]
    fn capped_matches_uncapped_within_limit() {
        let amounts = cents(&[1250, 725, 3000]);
        assert_eq!(
            select_capped(&amounts, MoneyCents::new(2000), DEFAULT_MAX_CANDIDATES).unwrap(),
            select(&amounts, MoneyCents::new(2000))
        );
    }
}
