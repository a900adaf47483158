use criterion::measurement::WallTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkGroup, BenchmarkId, Criterion};

use arcade_relay::p2p::LivenessRecord;

use std::time::{Duration, Instant};

pub fn run_liveness_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("liveness_benchmark");
    let windows = vec![10, 100, 1000];

    mean_rtt_benchmark(&mut group, windows.clone());
    heartbeat_round_benchmark(&mut group, windows);

    group.finish();
}

fn mean_rtt_benchmark(group: &mut BenchmarkGroup<WallTime>, windows: Vec<usize>) {
    for window in windows {
        let mut record = LivenessRecord::new(Instant::now(), window);
        for i in 0..window as u64 {
            record.push_sample(Duration::from_micros(100 + i));
        }
        group.bench_with_input(BenchmarkId::new("mean rtt", window), &record, |b, record| {
            b.iter(|| black_box(record.mean_rtt()))
        });
    }
}

fn heartbeat_round_benchmark(group: &mut BenchmarkGroup<WallTime>, windows: Vec<usize>) {
    for window in windows {
        group.bench_with_input(BenchmarkId::new("send and reply", window), &window, |b, window| {
            let start = Instant::now();
            let mut record = LivenessRecord::new(start, *window);
            let mut seq = 0u64;
            b.iter(|| {
                record.record_send(seq, start);
                let rtt = record.record_reply(seq, start + Duration::from_millis(seq % 50));
                seq += 1;
                black_box(rtt)
            })
        });
    }
}

criterion_group!(benches, run_liveness_benchmark);
criterion_main!(benches);
