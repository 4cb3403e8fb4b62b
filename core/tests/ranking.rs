use chrono::NaiveDateTime;
use shoplytics_core::ranking::{
    dense_rank_by_timestamp, rank, timestamp_at_dense_rank, PurchaseStage, RankDiscipline,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Sequential ranking numbers every event distinctly, ties included. Two
/// lines of one basket plus a later order rank 1, 2, 3.
#[test]
fn sequential_ranks_ties_distinctly() {
    let events = vec![
        ts("2024-03-01 10:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-04-02 09:00:00"),
    ];

    let ranked = rank("c-1", &events, RankDiscipline::Sequential);
    let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

/// Tie-sharing gives both basket lines rank 1 and the later order rank 2,
/// with no gap.
#[test]
fn tie_sharing_is_dense() {
    let events = vec![
        ts("2024-03-01 10:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-04-02 09:00:00"),
    ];

    let ranked = rank("c-1", &events, RankDiscipline::TieSharing);
    let ranks: Vec<u32> = ranked.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 1, 2], "equal timestamps share the dense rank");
}

/// Ranking sorts chronologically no matter the input order.
#[test]
fn unsorted_input_is_sorted_first() {
    let events = vec![
        ts("2024-04-02 09:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-06-10 12:00:00"),
    ];

    let ranked = rank("c-1", &events, RankDiscipline::Sequential);
    assert_eq!(ranked[0].purchased_at, ts("2024-03-01 10:00:00"));
    assert_eq!(ranked[0].rank, 1);
    assert_eq!(ranked[2].purchased_at, ts("2024-06-10 12:00:00"));
    assert_eq!(ranked[2].rank, 3);
}

/// Tie-sharing rank depends only on the timestamps themselves: the same
/// events in any input order yield identical (timestamp, rank) pairs.
#[test]
fn tie_sharing_rank_is_input_order_invariant() {
    let chronological = vec![
        ts("2024-03-01 10:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-04-02 09:00:00"),
        ts("2024-06-10 12:00:00"),
    ];
    let reversed: Vec<NaiveDateTime> = chronological.iter().rev().copied().collect();
    let interleaved = vec![
        ts("2024-04-02 09:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-06-10 12:00:00"),
        ts("2024-03-01 10:00:00"),
    ];

    let pairs = |events: &[NaiveDateTime]| -> Vec<(NaiveDateTime, u32)> {
        rank("c-1", events, RankDiscipline::TieSharing)
            .into_iter()
            .map(|r| (r.purchased_at, r.rank))
            .collect()
    };

    let want = pairs(&chronological);
    assert_eq!(pairs(&reversed), want, "reversed input must not change ranks");
    assert_eq!(
        pairs(&interleaved),
        want,
        "interleaved input must not change ranks"
    );
}

/// The dense-rank lookup maps each distinct timestamp to its ordinal.
#[test]
fn dense_rank_lookup_covers_distinct_timestamps() {
    let events = vec![
        ts("2024-03-01 10:00:00"),
        ts("2024-03-01 10:00:00"),
        ts("2024-04-02 09:00:00"),
        ts("2024-06-10 12:00:00"),
    ];

    let dense = dense_rank_by_timestamp(&events);
    assert_eq!(dense.len(), 3, "three distinct timestamps");
    assert_eq!(dense[&ts("2024-03-01 10:00:00")], 1);
    assert_eq!(dense[&ts("2024-04-02 09:00:00")], 2);
    assert_eq!(dense[&ts("2024-06-10 12:00:00")], 3);
}

/// Rank 2 means the second distinct order event. A customer whose only
/// repeat lines share the first timestamp has no rank 2.
#[test]
fn second_purchase_requires_second_distinct_timestamp() {
    let single_order = vec![ts("2024-03-01 10:00:00"), ts("2024-03-01 10:00:00")];
    assert_eq!(
        timestamp_at_dense_rank(&single_order, 2),
        None,
        "a multi-item basket is not a second purchase"
    );

    let two_orders = vec![ts("2024-03-01 10:00:00"), ts("2024-04-02 09:00:00")];
    assert_eq!(
        timestamp_at_dense_rank(&two_orders, 2),
        Some(ts("2024-04-02 09:00:00"))
    );
}

/// Stage First is dense rank 1; everything later is Subsequent.
#[test]
fn purchase_stage_splits_at_first_order() {
    assert!(PurchaseStage::First.matches(1));
    assert!(!PurchaseStage::First.matches(2));
    assert!(PurchaseStage::Subsequent.matches(2));
    assert!(PurchaseStage::Subsequent.matches(7));
    assert!(!PurchaseStage::Subsequent.matches(1));
}
