use bucket_hashmap::{BucketHashMap, IdentityBuildHasher, PositionError};

type Quad = BucketHashMap<u32, &'static str, 4, IdentityBuildHasher>;

#[test]
fn colliding_chain_walkthrough() {
    let mut m = Quad::default();
    m.push(1, "a");
    m.push(5, "b");
    m.push(9, "c");
    assert_eq!(m.chain_len(1), 3);
    let chain: Vec<u32> = m.iter().map(|(_, k, _)| *k).collect();
    assert_eq!(chain, vec![9, 5, 1]);

    assert_eq!(m.peek(&5), Some(&"b"));
    assert_eq!(m.pop(&9), Some("c"));
    assert_eq!(m.len(), 2);

    let pos = m.index_of(&1).expect("key 1 present");
    assert_eq!(pos.primary_index(), 1);
    assert_eq!(pos.secondary_index(), 1);
    assert!(m.remove_at(pos));
    assert_eq!(m.len(), 1);
    assert_eq!(m.peek(&5), Some(&"b"));
    assert!(!m.contains_key(&1));
}

#[test]
fn pushed_keys_are_found() {
    let mut m: BucketHashMap<u64, u64, 32> = BucketHashMap::new();
    for k in 0..200u64 {
        m.push(k, k * 3);
        assert!(m.contains_key(&k));
        assert_eq!(m.peek(&k), Some(&(k * 3)));
    }
    assert_eq!(m.len(), 200);
    assert_eq!(m.bucket_count(), 32);
    assert!(m.longest_chain() >= 200 / 32);
}

#[test]
fn size_tracks_successful_removals_only() {
    let mut m = Quad::default();
    m.push(2, "x");
    m.push(3, "y");
    m.push(3, "z");
    assert!(!m.remove(&7));
    assert_eq!(m.pop(&8), None);
    assert_eq!(m.len(), 3);
    assert!(m.remove(&3));
    assert_eq!(m.peek(&3), Some(&"y"));
    let pos = m.index_of(&2).unwrap();
    assert!(m.remove_at(pos));
    assert!(!m.remove_at(pos), "second removal through the same position fails");
    assert_eq!(m.len(), 1);
}

#[test]
fn export_is_aligned_and_detached() {
    let mut m = Quad::default();
    for (k, v) in [(0, "zero"), (4, "four"), (1, "one"), (3, "three"), (4, "four-again")] {
        m.push(k, v);
    }
    let (values, keys) = m.to_lists();
    assert_eq!(keys, vec![4, 4, 0, 1, 3]);
    assert_eq!(values, vec!["four-again", "four", "zero", "one", "three"]);

    m.clear();
    m.push(2, "two");
    assert_eq!(keys.len(), 5, "snapshot unaffected by later mutation");

    let mut values = vec!["stale"];
    let mut keys = vec![99];
    m.collect_into(&mut values, &mut keys);
    assert_eq!(values, vec!["two"]);
    assert_eq!(keys, vec![2]);
}

#[test]
fn clear_restores_fresh_state() {
    let mut m = Quad::default();
    m.extend([(1, "a"), (2, "b"), (6, "c")]);
    assert!(m.is_allocated());
    m.clear();
    assert!(!m.is_allocated());
    assert_eq!(m.len(), 0);
    assert!(m.is_empty());
    for k in [1, 2, 6] {
        assert!(!m.contains_key(&k));
        assert_eq!(m.peek(&k), None);
    }
    m.clear();
    assert!(!m.is_allocated());
}

#[test]
fn position_errors_explain_rejection() {
    let mut m = Quad::default();
    let p = m.push(1, "a");
    m.push(1, "b");
    assert_eq!(m.try_remove_at(p), Err(PositionError::Stale { bucket: 1 }));
    let fresh = m.index_of(&1).unwrap();
    assert_eq!(m.try_remove_at(fresh), Ok((1, "b")));
    m.clear();
    assert_eq!(m.try_remove_at(fresh), Err(PositionError::Unallocated));
    assert_eq!(
        PositionError::Stale { bucket: 3 }.to_string(),
        "bucket 3 was modified after the position was taken"
    );
}

#[test]
fn string_keys_with_borrowed_lookup() {
    let mut m: BucketHashMap<String, u16, 64> = BucketHashMap::new();
    m.push("10.0.0.1:61000".to_string(), 1);
    m.push("10.0.0.2:61000".to_string(), 2);
    assert_eq!(m.peek("10.0.0.2:61000"), Some(&2));
    assert!(m.remove("10.0.0.1:61000"));
    assert!(!m.contains_key("10.0.0.1:61000"));
    assert_eq!(format!("{:?}", m), r#"{"10.0.0.2:61000": 2}"#);
}

#[test]
fn load_factor_grows_without_resizing() {
    let mut m: BucketHashMap<u32, (), 8, IdentityBuildHasher> = BucketHashMap::default();
    for k in 0..64 {
        m.push(k, ());
    }
    assert_eq!(m.bucket_count(), 8);
    assert!((m.load_factor() - 8.0).abs() < f64::EPSILON);
    assert_eq!(m.longest_chain(), 8);
    for b in 0..8 {
        assert_eq!(m.chain_len(b), 8);
    }
}

#[test]
fn position_from_wider_map_is_out_of_range() {
    let mut wide: BucketHashMap<u32, &str, 8, IdentityBuildHasher> = BucketHashMap::default();
    let mut narrow = Quad::default();
    narrow.push(1, "a");
    let p = wide.push(5, "five");
    assert_eq!(
        narrow.try_remove_at(p),
        Err(PositionError::BucketOutOfRange {
            bucket: 5,
            buckets: 4
        })
    );
    assert_eq!(narrow.len(), 1);
}

#[test]
fn position_never_reaches_another_maps_entry() {
    let mut mine = Quad::default();
    let mut other = Quad::default();
    other.push(1, "other");
    let p = mine.push(1, "mine");
    assert_eq!(other.try_remove_at(p), Err(PositionError::Stale { bucket: 1 }));
    assert!(other.key_at(p).is_none());
    assert_eq!(other.peek(&1), Some(&"other"));

    // Same push history on both maps still yields distinct stamps.
    let mut a = Quad::default();
    let mut b = Quad::default();
    let pa = a.push(2, "a");
    let pb = b.push(2, "b");
    assert_ne!(pa, pb);
    assert!(!b.remove_at(pa));
    assert!(!a.remove_at(pb));
    assert_eq!((a.len(), b.len()), (1, 1));
}
