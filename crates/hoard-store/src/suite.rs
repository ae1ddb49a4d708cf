//! Behaviour every [`ContentStore`] must share, run against each store.

use std::io::Write;
use std::sync::{Arc, Barrier};
use std::thread;

use hoard_types::Score;

use crate::error::StoreError;
use crate::traits::ContentStore;

pub(crate) fn put_describe_get(store: &dyn ContentStore) {
    let content = b"hello world";
    let addr = store.put(&mut &content[..]).unwrap();
    assert_eq!(addr.score, Score::of(content));
    assert_eq!(addr.size, content.len() as u64);
    assert_eq!(addr.offset, 0);
    assert!(!addr.location.is_empty());

    assert_eq!(store.describe(&addr.score).unwrap(), addr);

    let mut by_score = Vec::new();
    store.get(&addr.score, &mut by_score).unwrap();
    assert_eq!(by_score, content);

    let mut by_address = Vec::new();
    store.get_address(&addr, &mut by_address).unwrap();
    assert_eq!(by_address, content);
}

pub(crate) fn describe_missing_is_not_found(store: &dyn ContentStore) {
    let missing = Score::of(b"never stored");
    let err = store.describe(&missing).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref s) if *s == missing));
    assert!(store.get(&missing, &mut Vec::new()).unwrap_err().is_not_found());
}

pub(crate) fn sequential_dedup(store: &dyn ContentStore, uploads: impl Fn() -> usize) {
    let a1 = store.put(&mut &b"same bytes"[..]).unwrap();
    let a2 = store.put(&mut &b"same bytes"[..]).unwrap();
    assert_eq!(a1, a2);
    assert_eq!(uploads(), 1);

    let other = store.put(&mut &b"other bytes"[..]).unwrap();
    assert_ne!(other.score, a1.score);
    assert_eq!(uploads(), 2);
}

pub(crate) fn concurrent_dedup<S>(store: Arc<S>, uploads: impl Fn() -> usize)
where
    S: ContentStore + 'static,
{
    const WRITERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WRITERS));
    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.put(&mut &b"contended content"[..]).unwrap()
            })
        })
        .collect();

    let addresses: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().expect("writer should not panic"))
        .collect();
    for addr in &addresses[1..] {
        assert_eq!(addr.score, addresses[0].score);
        assert_eq!(addr.location, addresses[0].location);
    }
    assert_eq!(uploads(), 1);
}

pub(crate) fn put_file_and_empty_content(store: &dyn ContentStore) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"from a file").unwrap();
    let from_file = store.put_file(file.path()).unwrap();
    assert_eq!(from_file.score, Score::of(b"from a file"));

    let missing = store.put_file(std::path::Path::new("/definitely/not/here"));
    assert!(matches!(missing, Err(StoreError::Io(_))));

    let empty = store.put(&mut std::io::empty()).unwrap();
    assert_eq!(empty.size, 0);
    let mut out = Vec::new();
    store.get(&empty.score, &mut out).unwrap();
    assert!(out.is_empty());
}
