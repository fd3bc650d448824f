use std::time::{Duration, SystemTime};

use criterion::{criterion_group, criterion_main, Criterion};
use fadecast::{Fader, Memory};

fn bench_memory_put(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let fader = {
        let _guard = runtime.enter();
        Memory::new(Duration::from_secs(60))
    };

    c.bench_function("memory_put", |b| {
        b.to_async(&runtime).iter(|| {
            let fader = fader.clone();
            async move {
                fader
                    .put(b"key", SystemTime::now(), b"value")
                    .await
                    .unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_memory_put);
criterion_main!(benches);
