// End to end on the local filesystem with the wall clock.

mod common;

use std::thread;
use std::time::Duration;

use array_metadata::store::FragmentStore;
use array_metadata::{Array, Clock, Config, Context, EncryptionKey, OpenMode, SystemClock};
use common::{init_tracing, keys, write_aaa_bb};
use tempfile::tempdir;

fn local_context(config: Config) -> Context {
    init_tracing();
    Context::from_config(config)
}

// Prevent fragment timestamp ties between sessions
fn pause() {
    thread::sleep(Duration::from_millis(2));
}

// =============================================================================
// Test 1: Write, delete, time travel, consolidate on disk
// =============================================================================
#[test]
fn local_array_lifecycle() {
    let dir = tempdir().unwrap();
    let uri = format!("file://{}", dir.path().join("test_metadata").display());
    let ctx = local_context(Config::default());

    Array::create(&ctx, &uri, None).unwrap();

    let mut array = Array::open(&ctx, &uri, OpenMode::Write, None).unwrap();
    write_aaa_bb(&mut array);
    array.close().unwrap();

    pause();
    let timestamp = SystemClock.now_ms();
    pause();

    let mut array = Array::open(&ctx, &uri, OpenMode::Write, None).unwrap();
    array.delete(b"aaa").unwrap();
    array.put_values(b"cccc", &[10i32]).unwrap();
    array.close().unwrap();

    let past = Array::open_at(&ctx, &uri, OpenMode::Read, timestamp, None).unwrap();
    assert_eq!(keys(&past), vec!["aaa", "bb"]);

    let now = Array::open(&ctx, &uri, OpenMode::Read, None).unwrap();
    assert_eq!(keys(&now), vec!["bb", "cccc"]);

    Array::consolidate_metadata(&ctx, &uri, None).unwrap();
    let store = FragmentStore::new(&ctx, &uri);
    assert_eq!(store.list().unwrap().len(), 1);

    // One fragment on disk and no leftover temp uploads
    let meta_dir = dir.path().join("test_metadata").join("__meta");
    assert_eq!(std::fs::read_dir(&meta_dir).unwrap().count(), 1);

    let after = Array::open(&ctx, &uri, OpenMode::Read, None).unwrap();
    assert_eq!(keys(&after), vec!["bb", "cccc"]);
    assert_eq!(after.get(b"cccc").unwrap().to_vec::<i32>(), Some(vec![10]));
}

// =============================================================================
// Test 2: Config from TOML drives directory layout
// =============================================================================
#[test]
fn custom_layout_from_toml() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("store.toml");
    std::fs::write(
        &config_path,
        "metadata_dir = \"md\"\nfragment_suffix = \"frag\"\nsync_on_write = false\n",
    )
    .unwrap();

    let ctx = local_context(Config::from_file(&config_path).unwrap());
    let uri = dir.path().join("arr").display().to_string();
    let key = EncryptionKey::new(common::KEY).unwrap();

    Array::create(&ctx, &uri, Some(&key)).unwrap();
    let mut array = Array::open(&ctx, &uri, OpenMode::Write, Some(&key)).unwrap();
    array.put_values(b"k", &[1u8, 2, 3]).unwrap();
    let desc = array.close().unwrap().unwrap();

    assert!(desc.name.ends_with(".frag"));
    assert!(dir.path().join("arr").join("md").join(&desc.name).is_file());

    let array = Array::open(&ctx, &uri, OpenMode::Read, Some(&key)).unwrap();
    assert_eq!(array.get(b"k").unwrap().to_vec::<u8>(), Some(vec![1, 2, 3]));
}
