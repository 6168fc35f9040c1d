use crate::common::TestContext;
use exthash::common::rid::RID;
use exthash::storage::index::int_comparator::IntComparator;
use exthash::storage::page::hash_table_bucket_page::HashTableBucketPage;
use exthash::storage::page::hash_table_directory_page::HashTableDirectoryPage;
use exthash::storage::page::hash_table_page_defs::bucket_array_size;

#[test]
fn test_directory_page_view_over_pool_page() {
    let ctx = TestContext::new("directory_page_view");
    let bpm = &ctx.bpm;

    let page = bpm.new_page().unwrap();
    let page_id = page.read().get_page_id();
    {
        let mut guard = page.write();
        let dir = HashTableDirectoryPage::view_mut(guard.get_data_mut());
        dir.set_page_id(page_id);
        dir.set_bucket_page_id(0, 17);
        dir.set_local_depth(0, 0);
        dir.incr_global_depth();
        assert_eq!(dir.size(), 2);
        assert_eq!(dir.get_bucket_page_id(1), 17);
        dir.verify_integrity();
    }
    assert!(bpm.unpin_page(page_id, true));

    // the state lives in the page bytes, not in the view
    let page = bpm.fetch_page(page_id).unwrap();
    {
        let guard = page.read();
        let dir = HashTableDirectoryPage::view(guard.get_data());
        assert_eq!(dir.get_page_id(), page_id);
        assert_eq!(dir.get_global_depth(), 1);
        assert_eq!(dir.get_bucket_page_id(0), 17);
        assert_eq!(dir.get_bucket_page_id(1), 17);
    }
    assert!(bpm.unpin_page(page_id, false));
}

#[test]
fn test_bucket_page_view_over_pool_page() {
    let ctx = TestContext::new("bucket_page_view");
    let bpm = &ctx.bpm;
    let cmp = IntComparator::new();

    let page = bpm.new_page().unwrap();
    let page_id = page.read().get_page_id();
    {
        let mut guard = page.write();
        let mut bucket = HashTableBucketPage::<i32, RID>::new(guard.get_data_mut(), 0);
        for i in 0..10 {
            assert!(bucket.insert(&i, &RID::new(i as u32, 0), &cmp));
        }
        assert!(bucket.remove(&3, &RID::new(3, 0), &cmp));
    }
    assert!(bpm.unpin_page(page_id, true));

    let page = bpm.fetch_page(page_id).unwrap();
    {
        let mut guard = page.write();
        let bucket = HashTableBucketPage::<i32, RID>::new(guard.get_data_mut(), 0);
        assert_eq!(bucket.num_readable(), 9);
        assert!(bucket.is_occupied(3) && !bucket.is_readable(3));

        let mut result = vec![];
        assert!(bucket.get_value(&7, &cmp, &mut result));
        assert_eq!(result, vec![RID::new(7, 0)]);
        result.clear();
        assert!(!bucket.get_value(&3, &cmp, &mut result));
    }
    assert!(bpm.unpin_page(page_id, false));
}

#[test]
fn test_bucket_page_fills_whole_page() {
    let ctx = TestContext::new("bucket_page_capacity");
    let bpm = &ctx.bpm;
    let cmp = IntComparator::new();

    let page = bpm.new_page().unwrap();
    let page_id = page.read().get_page_id();
    let capacity = bucket_array_size::<i32, RID>();
    {
        let mut guard = page.write();
        let mut bucket = HashTableBucketPage::<i32, RID>::new(guard.get_data_mut(), 0);
        for i in 0..capacity {
            assert!(bucket.insert(&(i as i32), &RID::new(i as u32, 0), &cmp));
        }
        assert!(bucket.is_full());
        assert!(!bucket.insert(&-1, &RID::new(0, 1), &cmp));
        assert_eq!(bucket.get_kv_pairs().len(), capacity);
    }
    assert!(bpm.unpin_page(page_id, true));
}
