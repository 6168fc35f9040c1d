use crate::common::TestContext;
use exthash::buffer::buffer_pool_manager::BufferPoolManager;
use exthash::common::config::HASH_TABLE_MAX_DEPTH;
use exthash::common::rid::RID;
use exthash::container::disk_extendible_hash_table::DiskExtendibleHashTable;
use exthash::container::hash_function::{HashFunction, IdentityHashFunction};
use exthash::storage::index::int_comparator::IntComparator;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

type IntTable = DiskExtendibleHashTable<i32, RID, IntComparator, HashFunction>;
type IdentityTable = DiskExtendibleHashTable<i32, RID, IntComparator, IdentityHashFunction>;

fn new_table(bpm: Arc<BufferPoolManager>) -> IntTable {
    DiskExtendibleHashTable::new(
        "test_table".to_string(),
        bpm,
        IntComparator::new(),
        HashFunction::new(),
    )
    .unwrap()
}

/// Identity-hashed table with two-slot buckets, for scripting exact
/// directory layouts.
fn new_identity_table(bpm: Arc<BufferPoolManager>, bucket_max_size: u32) -> IdentityTable {
    DiskExtendibleHashTable::with_bucket_max_size(
        "test_table".to_string(),
        bpm,
        IntComparator::new(),
        IdentityHashFunction::new(),
        bucket_max_size,
    )
    .unwrap()
}

fn lookup(table: &IdentityTable, key: i32) -> Vec<RID> {
    let mut result = vec![];
    table.get_value(None, &key, &mut result).unwrap();
    result
}

#[test]
fn test_insert_and_get() {
    let ctx = TestContext::new("ht_insert_and_get");
    let ht = new_table(ctx.bpm.clone());

    let num_keys = 5;
    for i in 0..num_keys {
        assert!(ht.insert(None, &i, &RID::new(i as u32, 0)).unwrap());
        let mut result = vec![];
        assert!(ht.get_value(None, &i, &mut result).unwrap());
        assert_eq!(result, vec![RID::new(i as u32, 0)]);
    }
    ht.verify_integrity().unwrap();

    // keys that were never inserted
    for i in num_keys..2 * num_keys {
        let mut result = vec![];
        assert!(!ht.get_value(None, &i, &mut result).unwrap());
        assert!(result.is_empty());
    }

    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_duplicate_pair_rejected() {
    let ctx = TestContext::new("ht_duplicate_pair_rejected");
    let ht = new_table(ctx.bpm.clone());

    assert!(ht.insert(None, &5, &RID::new(100, 0)).unwrap());
    assert!(!ht.insert(None, &5, &RID::new(100, 0)).unwrap());

    let mut result = vec![];
    assert!(ht.get_value(None, &5, &mut result).unwrap());
    assert_eq!(result, vec![RID::new(100, 0)]);
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_duplicate_key_distinct_values() {
    let ctx = TestContext::new("ht_duplicate_key_distinct_values");
    let ht = new_table(ctx.bpm.clone());

    assert!(ht.insert(None, &5, &RID::new(100, 0)).unwrap());
    assert!(ht.insert(None, &5, &RID::new(200, 0)).unwrap());

    let mut result = vec![];
    assert!(ht.get_value(None, &5, &mut result).unwrap());
    // values come back in insertion order
    assert_eq!(result, vec![RID::new(100, 0), RID::new(200, 0)]);

    // removing one value leaves the other
    assert!(ht.remove(None, &5, &RID::new(100, 0)).unwrap());
    result.clear();
    assert!(ht.get_value(None, &5, &mut result).unwrap());
    assert_eq!(result, vec![RID::new(200, 0)]);
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_grows_to_depth_two() {
    let ctx = TestContext::new("ht_grows_to_depth_two");
    let ht = new_identity_table(ctx.bpm.clone(), 2);

    // With identity hashing and two-slot buckets, {0, 2} fill the single
    // depth-0 bucket; 4 forces two successive splits (0 and 2 share their
    // low bit) and 6 lands in the now-separate prefix-2 bucket.
    for key in [0, 2, 4, 6] {
        assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
    }

    assert_eq!(ht.get_global_depth().unwrap(), 2);
    ht.verify_integrity().unwrap();
    for key in [0, 2, 4, 6] {
        assert_eq!(lookup(&ht, key), vec![RID::new(key as u32, 0)]);
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_split_without_directory_growth() {
    let ctx = TestContext::new("ht_split_without_directory_growth");
    let ht = new_identity_table(ctx.bpm.clone(), 2);

    for key in [0, 2, 4, 6] {
        assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
    }
    assert_eq!(ht.get_global_depth().unwrap(), 2);

    // Odd keys all route to the depth-1 bucket; the third odd key splits it
    // to depth 2 without growing the directory.
    for key in [1, 3, 5] {
        assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
    }
    assert_eq!(ht.get_global_depth().unwrap(), 2);
    ht.verify_integrity().unwrap();

    for key in [0, 1, 2, 3, 4, 5, 6] {
        assert_eq!(lookup(&ht, key), vec![RID::new(key as u32, 0)]);
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_merge_on_empty_shrinks_directory() {
    let ctx = TestContext::new("ht_merge_on_empty_shrinks_directory");
    let ht = new_identity_table(ctx.bpm.clone(), 2);

    for key in [0, 2, 4, 6] {
        assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
    }
    assert_eq!(ht.get_global_depth().unwrap(), 2);

    // Emptying the prefix-0 bucket merges it with its image and the whole
    // directory becomes uniformly shallow.
    assert!(ht.remove(None, &0, &RID::new(0, 0)).unwrap());
    assert!(ht.remove(None, &4, &RID::new(4, 0)).unwrap());
    assert_eq!(ht.get_global_depth().unwrap(), 1);
    ht.verify_integrity().unwrap();
    assert_eq!(lookup(&ht, 2), vec![RID::new(2, 0)]);
    assert_eq!(lookup(&ht, 6), vec![RID::new(6, 0)]);

    // Round trip: removing the rest collapses back to the initial state.
    assert!(ht.remove(None, &2, &RID::new(2, 0)).unwrap());
    assert!(ht.remove(None, &6, &RID::new(6, 0)).unwrap());
    assert_eq!(ht.get_global_depth().unwrap(), 0);
    ht.verify_integrity().unwrap();
    for key in [0, 2, 4, 6] {
        assert!(lookup(&ht, key).is_empty());
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_merge_blocked_by_asymmetric_depth() {
    let ctx = TestContext::new("ht_merge_blocked_by_asymmetric_depth");
    let ht = new_identity_table(ctx.bpm.clone(), 2);

    // Directory at depth 2 with the even prefixes split to depth 2 and the
    // odd prefix still at depth 1.
    for key in [0, 2, 4, 6] {
        assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
    }
    assert!(ht.insert(None, &1, &RID::new(1, 0)).unwrap());

    // Emptying the depth-1 bucket finds its image at depth 2: no merge.
    assert!(ht.remove(None, &1, &RID::new(1, 0)).unwrap());
    assert_eq!(ht.get_global_depth().unwrap(), 2);
    ht.verify_integrity().unwrap();
    assert!(lookup(&ht, 1).is_empty());
    assert_eq!(lookup(&ht, 0), vec![RID::new(0, 0)]);
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_insert_fails_at_max_depth() {
    let ctx = TestContext::new("ht_insert_fails_at_max_depth");
    // Single-slot buckets and a constant hash prefix: the same key can
    // never separate, so splitting bottoms out at the maximum depth.
    let ht = new_identity_table(ctx.bpm.clone(), 1);

    assert!(ht.insert(None, &7, &RID::new(100, 0)).unwrap());
    assert!(!ht.insert(None, &7, &RID::new(200, 0)).unwrap());

    assert_eq!(ht.get_global_depth().unwrap(), HASH_TABLE_MAX_DEPTH);
    ht.verify_integrity().unwrap();
    assert_eq!(lookup(&ht, 7), vec![RID::new(100, 0)]);
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_random_workload_keeps_invariants() {
    let ctx = TestContext::new("ht_random_workload");
    let ht = DiskExtendibleHashTable::with_bucket_max_size(
        "test_table".to_string(),
        ctx.bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
        8,
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(0xE27A);
    let mut expected: HashMap<i32, RID> = HashMap::new();
    while expected.len() < 400 {
        let key = rng.gen_range(0..1_000_000);
        let rid = RID::new(key as u32, 0);
        if expected.insert(key, rid).is_none() {
            assert!(ht.insert(None, &key, &rid).unwrap());
        }
    }
    ht.verify_integrity().unwrap();

    // remove a random half
    let mut keys: Vec<i32> = expected.keys().copied().collect();
    keys.shuffle(&mut rng);
    for key in keys.iter().take(200) {
        let rid = expected.remove(key).unwrap();
        assert!(ht.remove(None, key, &rid).unwrap());
    }
    ht.verify_integrity().unwrap();

    for key in keys {
        let mut result = vec![];
        let found = ht.get_value(None, &key, &mut result).unwrap();
        match expected.get(&key) {
            Some(rid) => {
                assert!(found);
                assert_eq!(result, vec![*rid]);
            }
            None => {
                assert!(!found);
                assert!(result.is_empty());
            }
        }
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_removing_everything_collapses_directory() {
    let ctx = TestContext::new("ht_remove_everything");
    let ht = DiskExtendibleHashTable::with_bucket_max_size(
        "test_table".to_string(),
        ctx.bpm.clone(),
        IntComparator::new(),
        HashFunction::new(),
        4,
    )
    .unwrap();

    let total = 64;
    for i in 0..total {
        assert!(ht.insert(None, &i, &RID::new(i as u32, 0)).unwrap());
    }
    assert!(ht.get_global_depth().unwrap() > 0);

    for i in 0..total {
        assert!(ht.remove(None, &i, &RID::new(i as u32, 0)).unwrap());
    }
    ht.verify_integrity().unwrap();
    // every removal-triggered merge has run; nothing is pinned
    assert_eq!(ctx.bpm.pinned_page_count(), 0);

    for i in 0..total {
        let mut result = vec![];
        assert!(!ht.get_value(None, &i, &mut result).unwrap());
    }
}

#[test]
fn test_concurrent_inserts_and_lookups() {
    let ctx = TestContext::new("ht_concurrent_inserts");
    let ht = Arc::new(new_table(ctx.bpm.clone()));

    let threads = 4;
    let keys_per_thread = 200;
    let mut handles = vec![];
    for t in 0..threads {
        let ht = Arc::clone(&ht);
        handles.push(std::thread::spawn(move || {
            let base = t * 1000;
            for i in 0..keys_per_thread {
                let key = base + i;
                assert!(ht.insert(None, &key, &RID::new(key as u32, 0)).unwrap());
                let mut result = vec![];
                assert!(ht.get_value(None, &key, &mut result).unwrap());
                assert_eq!(result, vec![RID::new(key as u32, 0)]);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    ht.verify_integrity().unwrap();
    for t in 0..threads {
        for i in 0..keys_per_thread {
            let key = t * 1000 + i;
            let mut result = vec![];
            assert!(ht.get_value(None, &key, &mut result).unwrap());
            assert_eq!(result, vec![RID::new(key as u32, 0)]);
        }
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}

#[test]
fn test_concurrent_removes() {
    let ctx = TestContext::new("ht_concurrent_removes");
    let ht = Arc::new(new_table(ctx.bpm.clone()));

    let total = 800;
    for i in 0..total {
        assert!(ht.insert(None, &i, &RID::new(i as u32, 0)).unwrap());
    }

    let threads = 4;
    let chunk = total / threads;
    let mut handles = vec![];
    for t in 0..threads {
        let ht = Arc::clone(&ht);
        handles.push(std::thread::spawn(move || {
            for i in (t * chunk)..((t + 1) * chunk) {
                if i % 2 == 0 {
                    assert!(ht.remove(None, &i, &RID::new(i as u32, 0)).unwrap());
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    ht.verify_integrity().unwrap();
    for i in 0..total {
        let mut result = vec![];
        let found = ht.get_value(None, &i, &mut result).unwrap();
        if i % 2 == 0 {
            assert!(!found, "key {i} should have been removed");
        } else {
            assert!(found, "key {i} should still be present");
            assert_eq!(result, vec![RID::new(i as u32, 0)]);
        }
    }
    assert_eq!(ctx.bpm.pinned_page_count(), 0);
}
