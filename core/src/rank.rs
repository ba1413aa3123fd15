//! Ranking engine: competitive ranking within partitions.
//!
//! Highest metric gets rank 1. Equal metrics share a rank and the next rank
//! skips (1, 1, 3). A caller that needs a single winner supplies a tie-break;
//! without one, "top 1" may legitimately hold several rows.

use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub rank: usize,
}

/// Secondary ordering applied only between rows whose metric is equal.
/// `Ordering::Less` means the left row ranks ahead.
pub type TieBreak<'a, T> = &'a dyn Fn(&T, &T) -> Ordering;

/// Rank `items` independently inside each partition.
///
/// Output is grouped by partition key ascending, then by rank; rows that tie
/// keep their input order. An empty input yields an empty output.
pub fn rank_within<T, K, P, M>(
    items: Vec<T>,
    partition_of: P,
    metric_of: M,
    tie_break: Option<TieBreak<'_, T>>,
) -> Vec<Ranked<T>>
where
    K: Ord,
    P: Fn(&T) -> K,
    M: Fn(&T) -> f64,
{
    let mut partitions: BTreeMap<K, Vec<T>> = BTreeMap::new();
    for item in items {
        partitions.entry(partition_of(&item)).or_default().push(item);
    }

    let compare = |a: &T, b: &T| -> Ordering {
        metric_of(b)
            .total_cmp(&metric_of(a))
            .then_with(|| tie_break.map_or(Ordering::Equal, |tb| tb(a, b)))
    };

    let mut out = Vec::new();
    for (_, mut members) in partitions {
        members.sort_by(|a, b| compare(a, b));
        let mut previous: Option<(usize, usize)> = None; // (index, rank)
        let mut ranked: Vec<Ranked<T>> = Vec::with_capacity(members.len());
        for (i, item) in members.into_iter().enumerate() {
            let rank = match previous {
                Some((prev_idx, prev_rank))
                    if compare(&ranked[prev_idx].item, &item) == Ordering::Equal =>
                {
                    prev_rank
                }
                _ => i + 1,
            };
            previous = Some((i, rank));
            ranked.push(Ranked { item, rank });
        }
        out.extend(ranked);
    }
    out
}

/// Keep rows ranked `n` or better. Ties at the cut line are all kept.
pub fn top_n<T>(ranked: Vec<Ranked<T>>, n: usize) -> Vec<Ranked<T>> {
    ranked.into_iter().filter(|r| r.rank <= n).collect()
}
