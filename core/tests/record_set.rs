//! Record set preconditions: ordering, unique ids, canonical order.

mod common;

use common::txn;
use riskscore_core::{RecordSet, ScoreError};

#[test]
fn unsorted_input_is_rejected_with_position() {
    let result = RecordSet::from_ordered(vec![
        txn("a", 0).build(),
        txn("b", 20).build(),
        txn("c", 10).build(),
    ]);
    match result {
        Err(ScoreError::NotSorted { index, id }) => {
            assert_eq!(index, 2);
            assert_eq!(id, "c");
        }
        other => panic!("expected NotSorted, got {other:?}"),
    }
}

#[test]
fn new_sorts_into_canonical_order() {
    let set = RecordSet::new(vec![
        txn("c", 10).build(),
        txn("b", 0).build(),
        txn("a", 10).build(),
    ])
    .unwrap();
    let ids: Vec<&str> = set.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["b", "a", "c"]);
    assert_eq!(set.position_of("c"), Some(2));
    assert_eq!(set.position_of("missing"), None);
}

#[test]
fn ties_are_ordered_by_id_even_when_presorted() {
    let set = RecordSet::from_ordered(vec![txn("z", 0).build(), txn("y", 0).build()]).unwrap();
    assert_eq!(set.get(0).id, "y");
}

#[test]
fn duplicate_ids_are_rejected() {
    let result = RecordSet::new(vec![txn("a", 0).build(), txn("a", 5).build()]);
    assert!(matches!(result, Err(ScoreError::DuplicateId { index: 1, .. })));
}

#[test]
fn empty_id_is_a_missing_field() {
    let result = RecordSet::new(vec![txn("", 0).build()]);
    assert!(matches!(
        result,
        Err(ScoreError::MissingField { field: "transaction_id", .. })
    ));
}

#[test]
fn groupings_cover_every_record_once() {
    let set = RecordSet::new(common::random_log(3, 120)).unwrap();
    let g = set.groupings();
    for grouping_len in [
        g.by_ip.values().map(Vec::len).sum::<usize>(),
        g.by_email.values().map(Vec::len).sum::<usize>(),
        g.by_card_key.values().map(Vec::len).sum::<usize>(),
        g.by_bin.values().map(Vec::len).sum::<usize>(),
    ] {
        assert_eq!(grouping_len, 120);
    }
    for positions in g.by_ip.values() {
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "group positions not ascending");
    }
}
