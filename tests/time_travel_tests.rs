// Array metadata: opening at a past timestamp, reopen, snapshot isolation.

mod common;

use std::thread;

use array_metadata::{Array, Clock, Error, OpenMode};
use common::{fixture, keys, write_aaa_bb};

// =============================================================================
// Test 1: Open at a timestamp before a delete still sees the deleted key
// =============================================================================
#[test]
fn open_at_sees_state_before_delete() {
    let fx = fixture();

    let mut array = fx.open(OpenMode::Write);
    write_aaa_bb(&mut array);
    array.close().unwrap();

    let timestamp = fx.clock.now_ms();
    fx.tick();

    let mut array = fx.open(OpenMode::Write);
    array.delete(b"aaa").unwrap();
    array.close().unwrap();

    let past = Array::open_at(&fx.ctx, &fx.uri, OpenMode::Read, timestamp, None).unwrap();
    assert_eq!(past.timestamp(), timestamp);
    assert_eq!(past.get(b"aaa").unwrap().to_vec::<i32>(), Some(vec![5]));
    assert_eq!(past.count(), 2);

    let now = fx.open(OpenMode::Read);
    assert!(now.get(b"aaa").is_none());
    assert_eq!(now.count(), 1);
}

// =============================================================================
// Test 2: Opening before the first write sees nothing
// =============================================================================
#[test]
fn open_before_first_write_is_empty() {
    let fx = fixture();
    fx.tick();

    let mut array = fx.open(OpenMode::Write);
    write_aaa_bb(&mut array);
    array.close().unwrap();

    let before = Array::open_at(&fx.ctx, &fx.uri, OpenMode::Read, common::START_TS, None).unwrap();
    assert_eq!(before.count(), 0);
    assert!(before.get_by_index(0).is_err());
}

// =============================================================================
// Test 3: Reopen moves a time-travel session to the present
// =============================================================================
#[test]
fn reopen_sees_latest() {
    let fx = fixture();

    let mut array = fx.open(OpenMode::Write);
    write_aaa_bb(&mut array);
    array.close().unwrap();

    let timestamp = fx.clock.now_ms();
    fx.tick();

    let mut array = fx.open(OpenMode::Write);
    array.delete(b"aaa").unwrap();
    array.close().unwrap();

    let mut array = Array::open_at(&fx.ctx, &fx.uri, OpenMode::Read, timestamp, None).unwrap();
    assert!(array.get(b"aaa").is_some());
    assert_eq!(array.count(), 2);

    array.reopen().unwrap();
    assert!(array.get(b"aaa").is_none());
    assert_eq!(array.count(), 1);
    assert!(array.timestamp() > timestamp);
}

// =============================================================================
// Test 4: Reopen is a read-mode operation
// =============================================================================
#[test]
fn reopen_rejects_write_mode() {
    let fx = fixture();
    let mut array = fx.open(OpenMode::Write);
    assert!(matches!(
        array.reopen(),
        Err(Error::WrongOpenMode { expected: "read" })
    ));
}

// =============================================================================
// Test 5: An open read session is a snapshot
// =============================================================================
#[test]
fn read_session_is_a_snapshot() {
    let fx = fixture();

    let mut array = fx.open(OpenMode::Write);
    write_aaa_bb(&mut array);
    array.close().unwrap();

    let mut reader = fx.open(OpenMode::Read);

    fx.tick();
    let mut writer = fx.open(OpenMode::Write);
    writer.put_values(b"later", &[1u16]).unwrap();
    writer.delete(b"bb").unwrap();
    writer.close().unwrap();

    assert!(reader.get(b"later").is_none());
    assert!(reader.get(b"bb").is_some());
    assert_eq!(keys(&reader), vec!["aaa", "bb"]);

    reader.reopen().unwrap();
    assert_eq!(keys(&reader), vec!["aaa", "later"]);
}

// =============================================================================
// Test 6: Writes at an explicit timestamp are only visible from it onwards
// =============================================================================
#[test]
fn write_at_fixed_timestamp() {
    let fx = fixture();
    fx.clock.set(5_000);

    let mut array = Array::open_at(&fx.ctx, &fx.uri, OpenMode::Write, 2_000, None).unwrap();
    array.put_values(b"old", &[1i32]).unwrap();
    let desc = array.close().unwrap().unwrap();
    assert_eq!((desc.start_ts, desc.end_ts), (2_000, 2_000));

    let at = |ts| Array::open_at(&fx.ctx, &fx.uri, OpenMode::Read, ts, None).unwrap();
    assert!(at(1_999).get(b"old").is_none());
    assert!(at(2_000).get(b"old").is_some());
    assert!(fx.open(OpenMode::Read).get(b"old").is_some());
}

// =============================================================================
// Test 7: Concurrent readers build independent views
// =============================================================================
#[test]
fn concurrent_readers() {
    let fx = fixture();

    let mut array = fx.open(OpenMode::Write);
    for i in 0..50u32 {
        array.put_values(format!("key{i}").as_bytes(), &[i]).unwrap();
    }
    array.close().unwrap();

    let mut handles = vec![];
    for _ in 0..8 {
        let ctx = fx.ctx.clone();
        let uri = fx.uri.clone();
        handles.push(thread::spawn(move || {
            let array = Array::open(&ctx, &uri, OpenMode::Read, None).unwrap();
            assert_eq!(array.count(), 50);
            for i in 0..50u32 {
                let (key, value) = array.get_by_index(u64::from(i)).unwrap();
                assert_eq!(key, format!("key{i}").as_bytes());
                assert_eq!(value.to_vec::<u32>(), Some(vec![i]));
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
}
