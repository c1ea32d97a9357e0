use std::sync::Arc;

use array_metadata::vfs::MemFs;
use array_metadata::{Array, Context, ManualClock, OpenMode};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};

const URI: &str = "mem://bench/array";

/// An in-memory array with `fragments` write sessions of `keys_per_fragment`
/// puts each, every session overwriting half of the previous keys.
fn populated(fragments: u64, keys_per_fragment: u64) -> Context {
    let clock = Arc::new(ManualClock::new(1));
    let ctx = Context::builder()
        .vfs(Arc::new(MemFs::new()))
        .clock(clock.clone())
        .build();
    Array::create(&ctx, URI, None).unwrap();

    for f in 0..fragments {
        let mut array = Array::open(&ctx, URI, OpenMode::Write, None).unwrap();
        let base = f * keys_per_fragment / 2;
        for k in base..base + keys_per_fragment {
            array.put_values(format!("key_{k:06}").as_bytes(), &[k]).unwrap();
        }
        array.close().unwrap();
        clock.advance(1);
    }
    ctx
}

fn bench_open(c: &mut Criterion) {
    let ctx = populated(32, 256);
    c.bench_function("open_read_32x256", |b| {
        b.iter(|| Array::open(&ctx, URI, OpenMode::Read, None).unwrap().count())
    });
}

fn bench_consolidate(c: &mut Criterion) {
    c.bench_function("consolidate_32x256", |b| {
        b.iter_batched(
            || populated(32, 256),
            |ctx| Array::consolidate_metadata(&ctx, URI, None).unwrap(),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_open, bench_consolidate);
criterion_main!(benches);
