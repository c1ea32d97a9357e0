// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Once};

use array_metadata::vfs::MemFs;
use array_metadata::{Array, Context, EncryptionKey, ManualClock, OpenMode};

pub const ARRAY_URI: &str = "mem://tiledb_test/test_metadata";
pub const KEY: &[u8] = b"0123456789abcdeF0123456789abcdeF";
pub const START_TS: u64 = 1_000;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// In-memory array driven by a manual clock.
pub struct Fixture {
    pub ctx: Context,
    pub clock: Arc<ManualClock>,
    pub vfs: Arc<MemFs>,
    pub uri: String,
}

impl Fixture {
    pub fn open(&self, mode: OpenMode) -> Array {
        Array::open(&self.ctx, &self.uri, mode, None).unwrap()
    }

    pub fn open_with_key(&self, mode: OpenMode, key: &EncryptionKey) -> Array {
        Array::open(&self.ctx, &self.uri, mode, Some(key)).unwrap()
    }

    /// Move the clock forward one millisecond, as two real writes would be.
    pub fn tick(&self) -> u64 {
        self.clock.advance(1)
    }
}

fn build(key: Option<&EncryptionKey>) -> Fixture {
    init_tracing();
    let clock = Arc::new(ManualClock::new(START_TS));
    let vfs = Arc::new(MemFs::new());
    let ctx = Context::builder()
        .vfs(vfs.clone())
        .clock(clock.clone())
        .build();
    Array::create(&ctx, ARRAY_URI, key).unwrap();
    Fixture {
        ctx,
        clock,
        vfs,
        uri: ARRAY_URI.to_string(),
    }
}

/// Unencrypted empty array.
pub fn fixture() -> Fixture {
    build(None)
}

/// AES-256-GCM encrypted empty array and its key.
pub fn encrypted_fixture() -> (Fixture, EncryptionKey) {
    let key = EncryptionKey::new(KEY).unwrap();
    (build(Some(&key)), key)
}

pub fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Writes `aaa = 5i32` and `bb = [1.1f32, 1.2f32]` in one session.
pub fn write_aaa_bb(array: &mut Array) {
    array
        .put(b"aaa", array_metadata::Datatype::Int32, 1, Some(&5i32.to_le_bytes()))
        .unwrap();
    array
        .put(
            b"bb",
            array_metadata::Datatype::Float32,
            2,
            Some(&f32_bytes(&[1.1, 1.2])),
        )
        .unwrap();
}

/// Keys of the array in iteration order, lossily decoded.
pub fn keys(array: &Array) -> Vec<String> {
    array
        .iter()
        .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
        .collect()
}
