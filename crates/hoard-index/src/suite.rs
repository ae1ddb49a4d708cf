//! Behaviour every [`EntryIndex`] must share, run against each index.

use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use hoard_types::{Address, Entry, Score, ORIGINAL_ROLE};

use crate::traits::EntryIndex;

fn at(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + seconds, 0).unwrap()
}

/// An entry whose id is fully determined by `n`.
pub(crate) fn entry_at(n: i64) -> Entry {
    let score = Score::of(n.to_string().as_bytes());
    let location = format!("mem://test/blobs/{score}");
    Entry::new(at(n))
        .entry_type("image")
        .address(ORIGINAL_ROLE, Address::new(score, location, 1))
}

pub(crate) fn add_get_roundtrip(index: &dyn EntryIndex) {
    let added = index
        .add(entry_at(1).name("photo.jpg").importance(3).gridsquare("FN31"))
        .unwrap();
    assert_eq!(added.group, index.group());
    assert!(added.id.starts_with("2020-09-13T12:26:41Z"));
    assert_eq!(
        added.gridsquare_id.as_deref(),
        Some(format!("FN31{}", added.id).as_str())
    );

    let fetched = index.get(&added.id).unwrap();
    assert_eq!(fetched, added);
    assert!(index.exists(&added.id).unwrap());
    assert!(!index.exists("nope").unwrap());
    assert!(index.get("nope").unwrap_err().is_not_found());
}

pub(crate) fn duplicate_add_is_already_exists(index: &dyn EntryIndex) {
    let first = index.add(entry_at(2).name("first")).unwrap();
    let err = index.add(entry_at(2).name("second")).unwrap_err();
    assert!(err.is_already_exists());
    assert_eq!(index.get(&first.id).unwrap().name.as_deref(), Some("first"));

    // An explicit id is kept as given.
    let explicit = index.add(Entry::with_id("custom", at(0))).unwrap();
    assert_eq!(explicit.id, "custom");
}

pub(crate) fn alias_uniqueness(index: &dyn EntryIndex) {
    let a = index.add(entry_at(3)).unwrap().id;
    let b = index.add(entry_at(4)).unwrap().id;

    index.alias("best", &a).unwrap();
    assert!(index.alias("best", &b).unwrap_err().is_already_exists());
    assert_eq!(index.get_alias("best").unwrap().id, a);

    // Two names may point at the same entry.
    index.alias("also-best", &a).unwrap();
    assert_eq!(index.get_alias("also-best").unwrap().id, a);

    index.unalias("best").unwrap();
    assert!(index.get_alias("best").unwrap_err().is_not_found());
    index.alias("best", &b).unwrap();
    assert_eq!(index.get_alias("best").unwrap().id, b);

    index.unalias("ghost").unwrap();
}

pub(crate) fn alias_requires_entry(index: &dyn EntryIndex) {
    let err = index.alias("orphan", "missing").unwrap_err();
    assert!(err.is_precondition());
    assert!(index.get_alias("orphan").unwrap_err().is_not_found());
}

pub(crate) fn relation_sets(index: &dyn EntryIndex) {
    let a = index.add(entry_at(5)).unwrap().id;
    let b = index.add(entry_at(6)).unwrap().id;
    let c = index.add(entry_at(7)).unwrap().id;

    assert!(index.relations(&a).unwrap().is_empty());

    index.relate(&a, &c).unwrap();
    index.relate(&a, &b).unwrap();
    index.relate(&a, &b).unwrap();
    let mut expected = vec![b.clone(), c.clone()];
    expected.sort();
    assert_eq!(index.relations(&a).unwrap(), expected);

    // Edges are directed.
    assert!(index.relations(&b).unwrap().is_empty());

    index.unrelate(&a, &b).unwrap();
    assert_eq!(index.relations(&a).unwrap(), vec![c.clone()]);
    index.unrelate(&a, &b).unwrap();
    index.unrelate(&b, &a).unwrap();
}

pub(crate) fn relate_requires_both_entries(index: &dyn EntryIndex) {
    let a = index.add(entry_at(8)).unwrap().id;
    assert!(index.relate(&a, "missing").unwrap_err().is_precondition());
    assert!(index.relate("missing", &a).unwrap_err().is_precondition());
    assert!(index.relations(&a).unwrap().is_empty());
    assert!(index.relations("missing").unwrap().is_empty());
}

pub(crate) fn near_orders_by_gridsquare(index: &dyn EntryIndex) {
    index.add(entry_at(9).gridsquare("FN31pr")).unwrap();
    index.add(entry_at(10).gridsquare("FN20xa")).unwrap();
    index.add(entry_at(11).gridsquare("JO01ab")).unwrap();
    index.add(entry_at(12)).unwrap();

    let fn_squares: Vec<String> = index
        .near("FN")
        .unwrap()
        .into_iter()
        .filter_map(|e| e.gridsquare)
        .collect();
    assert_eq!(fn_squares, vec!["FN20xa", "FN31pr"]);
    assert_eq!(index.near("JO01").unwrap().len(), 1);
    assert!(index.near("ZZ").unwrap().is_empty());
    assert_eq!(index.near("").unwrap().len(), 3);
}

pub(crate) fn concurrent_alias_has_one_winner<I>(index: Arc<I>)
where
    I: EntryIndex + 'static,
{
    const WRITERS: usize = 8;
    let ids: Vec<String> = (0..WRITERS as i64)
        .map(|n| index.add(entry_at(100 + n)).unwrap().id)
        .collect();

    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let index = Arc::clone(&index);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                index.alias("contested", &id).map(|()| id)
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        match handle.join().expect("writer should not panic") {
            Ok(id) => winners.push(id),
            Err(e) => assert!(e.is_already_exists(), "unexpected error: {e}"),
        }
    }
    assert_eq!(winners.len(), 1);
    assert_eq!(index.get_alias("contested").unwrap().id, winners[0]);
}
