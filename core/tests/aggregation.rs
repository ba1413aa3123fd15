//! Aggregation and ranking over a realistic synthetic log.

use civic_core::{
    aggregate::{aggregate, Accumulator, AggregateQuery, AggregateRow, Dimension, Field, Predicate},
    cleaning::normalize,
    fact_table::{FactTable, Selection},
    rank::{rank_within, top_n, TieBreak},
    synthetic::SyntheticLog,
};

fn synthetic_table(seed: u64, n: usize) -> FactTable {
    FactTable::new(normalize(SyntheticLog::new(seed, n).generate()).records).unwrap()
}

/// Per-group counts always add back up to the rows that were grouped.
#[test]
fn group_counts_sum_to_filtered_total() {
    let table = synthetic_table(11, 2_000);
    let selections = [
        Selection::all(),
        Selection::closed(),
        Selection::open(),
        Selection::all().with_neighborhood(),
    ];
    let groupings: [&[Dimension]; 4] = [
        &[Dimension::Department],
        &[Dimension::Reason, Dimension::Source],
        &[Dimension::Neighborhood],
        &[Dimension::Department, Dimension::OpenedMonth],
    ];

    for selection in &selections {
        let rows = table.select(selection);
        for dims in groupings {
            let query = AggregateQuery::by(dims).metric("n", Accumulator::Count);
            let groups = aggregate(rows.iter().copied(), &query).unwrap();
            let summed: usize = groups.iter().map(|g| g.row_count).sum();
            assert_eq!(summed, rows.len(), "selection {selection:?}, dims {dims:?}");
            assert!(groups.iter().all(|g| g.get("n") == Some(g.row_count as f64)));
        }
    }
}

#[test]
fn count_where_and_rate_agree() {
    let table = synthetic_table(3, 1_000);
    let query = AggregateQuery::by(&[Dimension::Department])
        .metric("met", Accumulator::CountWhere(Predicate::SlaMet))
        .metric("rate", Accumulator::Rate(Predicate::SlaMet))
        .metric("closed_rate", Accumulator::Average(Field::ClosedSlaMet));
    let groups = aggregate(table.select(&Selection::closed()), &query).unwrap();

    assert!(!groups.is_empty());
    for g in &groups {
        let met = g.get("met").unwrap();
        let rate = g.get("rate").unwrap();
        assert!((met / g.row_count as f64 - rate).abs() < 1e-12);
        // Over closed rows only, both formulations match.
        assert!((g.get("closed_rate").unwrap() - rate).abs() < 1e-12);
    }
}

#[test]
fn top_one_per_partition_always_holds_the_maximum() {
    let table = synthetic_table(21, 3_000);
    let query = AggregateQuery::by(&[Dimension::Neighborhood, Dimension::Reason])
        .metric("n", Accumulator::Count);
    let groups = aggregate(table.select(&Selection::all().with_neighborhood()), &query).unwrap();

    let mut max_by_hood = std::collections::BTreeMap::new();
    for g in &groups {
        let hood = g.key.text(0).unwrap().to_string();
        let best = max_by_hood.entry(hood).or_insert(0usize);
        *best = (*best).max(g.row_count);
    }

    let winners = top_n(
        rank_within(groups, |g| g.key.text(0).unwrap().to_string(), |g| g.row_count as f64, None),
        1,
    );
    for w in &winners {
        assert_eq!(w.rank, 1);
        assert_eq!(w.item.row_count, max_by_hood[w.item.key.text(0).unwrap()]);
    }
    // Every neighborhood has at least one winner.
    let hoods: std::collections::BTreeSet<_> =
        winners.iter().map(|w| w.item.key.text(0).unwrap()).collect();
    assert_eq!(hoods.len(), max_by_hood.len());
}

#[test]
fn tie_break_leaves_exactly_one_winner_per_partition() {
    let table = synthetic_table(21, 3_000);
    let query = AggregateQuery::by(&[Dimension::Neighborhood, Dimension::Reason])
        .metric("n", Accumulator::Count);
    let groups = aggregate(table.select(&Selection::all().with_neighborhood()), &query).unwrap();
    let partitions: std::collections::BTreeSet<String> =
        groups.iter().map(|g| g.key.text(0).unwrap().to_string()).collect();

    let by_reason = |a: &AggregateRow, b: &AggregateRow| a.key.text(1).cmp(&b.key.text(1));
    let tie_break: TieBreak<'_, AggregateRow> = &by_reason;
    let winners = top_n(
        rank_within(
            groups,
            |g| g.key.text(0).unwrap().to_string(),
            |g| g.row_count as f64,
            Some(tie_break),
        ),
        1,
    );
    assert_eq!(winners.len(), partitions.len());
}
