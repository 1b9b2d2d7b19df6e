use dav_bridge_rs::CollectionCache;

#[test]
fn is_fresh_requires_entry_nonempty_tag_and_match() {
    let cache: CollectionCache<String> = CollectionCache::new();

    assert!(!cache.is_fresh("/cal/personal/", "ctag-1"));

    cache.set("/cal/personal/", "ctag-1", vec!["a".to_string()]);
    assert!(cache.is_fresh("/cal/personal/", "ctag-1"));
    assert!(!cache.is_fresh("/cal/personal/", "ctag-2"));
    assert!(!cache.is_fresh("/cal/personal/", ""));
    assert!(!cache.is_fresh("/cal/other/", "ctag-1"));
}

#[test]
fn set_replaces_and_get_returns_objects() {
    let cache: CollectionCache<String> = CollectionCache::new();
    cache.set("/cal/a/", "t1", vec!["one".to_string()]);
    cache.set("/cal/a/", "t2", vec!["two".to_string(), "three".to_string()]);

    let entry = cache.get("/cal/a/").expect("entry present");
    assert_eq!(entry.ctag, "t2");
    assert_eq!(entry.objects, vec!["two".to_string(), "three".to_string()]);
    assert_eq!(cache.len(), 1);
}

#[test]
fn invalidate_removes_only_that_collection() {
    let cache: CollectionCache<u32> = CollectionCache::new();
    cache.set("/cal/a/", "t", vec![1]);
    cache.set("/cal/b/", "t", vec![2]);

    cache.invalidate("/cal/a/");
    assert!(cache.get("/cal/a/").is_none());
    assert!(cache.get("/cal/b/").is_some());
    assert_eq!(cache.len(), 1);
}

#[test]
fn clear_empties_the_cache() {
    let cache: CollectionCache<u32> = CollectionCache::new();
    cache.set("/cal/a/", "t", vec![1]);
    cache.set("/cal/b/", "t", vec![2]);
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn cache_is_shareable_across_threads() {
    use std::sync::Arc;

    let cache: Arc<CollectionCache<u32>> = Arc::new(CollectionCache::new());
    let mut handles = Vec::new();
    for i in 0..8u32 {
        let cache = cache.clone();
        handles.push(std::thread::spawn(move || {
            let url = format!("/cal/{i}/");
            cache.set(&url, "tag", vec![i]);
            assert!(cache.is_fresh(&url, "tag"));
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(cache.len(), 8);
}
