//! Estimator and batch evaluation throughput.
//!
//! Tests:
//! - Envelope interpolation on a realistic 4-axis grid
//! - Single estimate (envelope + amplification + phase + stall)
//! - Parallel batch evaluation scaling with experiment count

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nori_putrate::{
    CalibrationGrid, CalibrationPoint, DeviceEnvelope, EnvelopeQuery, EstimateInput, Evaluator,
    Experiment, LevelStats, ModelConfig, PhaseContext, PutRateEstimator, SaturationPolicy,
    StallProfile,
};

fn build_grid() -> CalibrationGrid {
    let mut points = Vec::new();
    for (ri, read_ratio) in [0.0, 0.25, 0.5, 0.75, 1.0].into_iter().enumerate() {
        for (qi, queue_depth) in [1u32, 4, 16, 64, 256].into_iter().enumerate() {
            for (ci, concurrency) in [1u32, 2, 4, 8].into_iter().enumerate() {
                for (bi, block_size) in [4096u64, 16384, 65536, 262144].into_iter().enumerate() {
                    let base = 200.0 * (1 + qi + ci + bi) as f64;
                    points.push(CalibrationPoint {
                        read_ratio,
                        queue_depth,
                        concurrency,
                        block_size,
                        read_bw: base * (1.0 + ri as f64),
                        write_bw: base * (5.0 - ri as f64),
                    });
                }
            }
        }
    }
    CalibrationGrid::from_points(points).unwrap()
}

fn levels() -> Vec<LevelStats> {
    (0..7)
        .map(|level| LevelStats {
            level,
            flush_bytes: if level == 0 { 1e10 } else { 0.0 },
            compaction_write_bytes: 1e9 * (level + 1) as f64,
            compaction_read_bytes: 1.2e9 * (level + 1) as f64,
            file_count: 10 * (level as u64 + 1),
        })
        .collect()
}

fn query() -> EnvelopeQuery {
    EnvelopeQuery {
        read_ratio: 0.3,
        queue_depth: 24,
        concurrency: 3,
        block_size: 8192,
    }
}

fn bench_envelope(c: &mut Criterion) {
    let envelope = DeviceEnvelope::new(build_grid(), SaturationPolicy::Clamp);
    let q = query();

    c.bench_function("envelope_interpolate_4d", |b| {
        b.iter(|| black_box(envelope.bandwidth(black_box(&q)).unwrap()));
    });
}

fn bench_estimate(c: &mut Criterion) {
    let mut config = ModelConfig::default();
    config.phases.interpolate_efficiency = true;
    let estimator = PutRateEstimator::new(build_grid(), &config).unwrap();
    let levels = levels();
    let input = EstimateInput {
        envelope: query(),
        level_stats: &levels,
        phase_context: PhaseContext::DiskUtilization(0.55),
        stall: StallProfile {
            stall_probability: 0.15,
            mean_stall_secs: 1.5,
            impact_factor: 0.4,
        },
        workload_base_efficiency: 0.05,
    };

    c.bench_function("estimate_single", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&input)).unwrap()));
    });
}

fn bench_batch(c: &mut Criterion) {
    let mut config = ModelConfig::default();
    config.workloads.insert("random_write".to_string(), 0.05);
    let evaluator = Evaluator::new(build_grid(), config).unwrap();

    let mut group = c.benchmark_group("evaluate_batch");
    for size in [16usize, 256, 4096].iter() {
        let experiments: Vec<Experiment> = (0..*size)
            .map(|i| Experiment {
                name: format!("exp_{:05}", i),
                workload: "random_write".to_string(),
                envelope: query(),
                level_stats: levels(),
                phase_context: PhaseContext::DiskUtilization((i % 100) as f64 / 100.0),
                stall: None,
                stall_counters: None,
                stall_impact: None,
                measured: vec![100.0, 110.0, 95.0],
                trace: Vec::new(),
            })
            .collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &experiments, |b, experiments| {
            b.iter(|| black_box(evaluator.evaluate_batch(black_box(experiments))));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_envelope, bench_estimate, bench_batch);
criterion_main!(benches);
