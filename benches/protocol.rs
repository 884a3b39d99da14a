use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use bitlamp::testing::{RecordingLamps, ScriptedButtons};
use bitlamp::{calculate, encode_pulses, decode_pulses, Calculator, Operands, Operation, Signaler, Timing};

fn bench_signaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("signaling");

    for value in [0u64, 8, u64::MAX] {
        group.bench_with_input(BenchmarkId::new("encode_decode", value), &value, |bencher, &v| {
            bencher.iter(|| decode_pulses(encode_pulses(black_box(v))))
        });

        group.bench_with_input(BenchmarkId::new("transmit", value), &value, |bencher, &v| {
            let lamps = RecordingLamps::new();
            let mut signal = Signaler::new(lamps.clone(), lamps.clock(), Timing::default());
            bencher.iter(|| {
                signal.transmit(black_box(v)).unwrap();
                lamps.clear_history();
            })
        });
    }

    group.finish();
}

fn bench_entry(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry");

    group.bench_function("append_64_bits", |bencher| {
        bencher.iter(|| {
            let mut ops = Operands::new();
            ops.begin(0);
            for i in 0..64 {
                ops.append(black_box(i % 3 == 0));
            }
            black_box(ops.value(0))
        })
    });

    group.bench_function("full_cycle", |bencher| {
        let mut presses = vec![2; 64];
        presses.push(0);
        presses.extend([1, 2, 0, 1, 1, 0]);
        bencher.iter(|| {
            let lamps = RecordingLamps::new();
            let clock = lamps.clock();
            let mut calc = Calculator::new(ScriptedButtons::presses(&presses), lamps, clock, Timing::default())
                .with_cycle_limit(1);
            calc.run().unwrap();
            black_box(calc.last_result())
        })
    });

    group.bench_function("calculate_all_ops", |bencher| {
        bencher.iter(|| {
            Operation::ALL
                .iter()
                .map(|&op| calculate(black_box(u64::MAX), black_box(3), op))
                .fold(0u64, u64::wrapping_add)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_signaling, bench_entry);
criterion_main!(benches);
