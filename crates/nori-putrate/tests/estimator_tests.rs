//! End-to-end estimator and scoring tests.
//!
//! 1. Reference scenario - every factor verifiable through the breakdown
//! 2. Scoring boundaries on the canonical accuracy mapping
//! 3. Serde round-trips of results handed to reporting
//! 4. YAML-configured batch evaluation

use nori_putrate::{
    AccuracyClass, CalibrationGrid, CalibrationPoint, EnvelopeQuery, EstimateInput, Evaluator,
    Experiment, LevelStats, ModelConfig, Phase, PhaseContext, PredictionResult, PutRateEstimator,
    Scorer, StallProfile, ValidationResult,
};

const MB: f64 = 1024.0 * 1024.0;

fn nvme_grid() -> CalibrationGrid {
    let mut points = Vec::new();
    for (read_ratio, read_bw, write_bw) in [
        (0.0, 0.0, 1500.0 * MB),
        (0.5, 1800.0 * MB, 1200.0 * MB),
        (1.0, 3200.0 * MB, 0.0),
    ] {
        for (queue_depth, scale) in [(1, 0.25), (16, 1.0)] {
            points.push(CalibrationPoint {
                read_ratio,
                queue_depth,
                concurrency: 1,
                block_size: 4096,
                read_bw: read_bw * scale,
                write_bw: write_bw * scale,
            });
        }
    }
    CalibrationGrid::from_points(points).unwrap()
}

/// Aggregate WA = (400 + 100 + 300 + 0 + 200) / (400 + 100) = 2.0
fn wa_two_levels() -> Vec<LevelStats> {
    vec![
        LevelStats {
            level: 0,
            flush_bytes: 400.0 * MB,
            compaction_write_bytes: 300.0 * MB,
            compaction_read_bytes: 350.0 * MB,
            file_count: 6,
        },
        LevelStats {
            level: 1,
            flush_bytes: 100.0 * MB,
            compaction_write_bytes: 200.0 * MB,
            compaction_read_bytes: 250.0 * MB,
            file_count: 40,
        },
    ]
}

fn write_only_query() -> EnvelopeQuery {
    EnvelopeQuery {
        read_ratio: 0.0,
        queue_depth: 16,
        concurrency: 1,
        block_size: 4096,
    }
}

#[test]
fn test_reference_scenario() {
    let mut config = ModelConfig::default();
    config.phases.stable.efficiency_factor = 0.5;
    let estimator = PutRateEstimator::new(nvme_grid(), &config).unwrap();

    let levels = wa_two_levels();
    let result = estimator
        .estimate(&EstimateInput {
            envelope: write_only_query(),
            level_stats: &levels,
            phase_context: PhaseContext::DiskUtilization(0.85),
            stall: StallProfile {
                stall_probability: 0.2,
                mean_stall_secs: 2.0,
                impact_factor: 0.5,
            },
            workload_base_efficiency: 0.02,
        })
        .unwrap();

    let b = result.component_breakdown;
    assert_eq!(b.envelope_bw, 1500.0 * MB);
    assert_eq!(b.phase_factor, 0.5);
    assert_eq!(result.aggregate_wa, 2.0);
    // weighted WA penalty = 1.0 * (2.0 - 1.0)
    assert_eq!(b.amplification_factor, 1.0 / (1.0 + 1.0));
    assert!((b.stall_factor - 0.9).abs() < 1e-12);
    assert_eq!(b.workload_efficiency, 0.02);

    let expected = 1500.0 * MB * 0.5 * 0.5 * b.stall_factor * 0.02;
    assert!((result.predicted_throughput - expected).abs() < 1e-6);
    // ~6.75 MB/s
    assert!((result.predicted_throughput / MB - 6.75).abs() < 1e-9);
    assert_eq!(result.phase, Phase::Stable);
    assert_eq!(result.dominant_level, Some(0));
}

#[test]
fn test_mixed_workload_uses_harmonic_envelope() {
    let estimator = PutRateEstimator::new(nvme_grid(), &ModelConfig::default()).unwrap();
    let levels = wa_two_levels();
    let result = estimator
        .estimate(&EstimateInput {
            envelope: EnvelopeQuery {
                read_ratio: 0.5,
                ..write_only_query()
            },
            level_stats: &levels,
            phase_context: PhaseContext::DiskUtilization(0.1),
            stall: StallProfile::default(),
            workload_base_efficiency: 1.0,
        })
        .unwrap();

    // 1 / (0.5 / 1800 + 0.5 / 1200) = 1440
    assert!((result.component_breakdown.envelope_bw / MB - 1440.0).abs() < 1e-9);
}

#[test]
fn test_scoring_boundaries() {
    let scorer = Scorer::default();

    let at_boundary = scorer.score_value(90.0, 100.0).unwrap();
    assert_eq!(at_boundary.relative_error_pct, 10.0);
    assert_eq!(at_boundary.accuracy_class, AccuracyClass::Excellent);

    let past_boundary = scorer.score_value(89.99, 100.0).unwrap();
    assert!((past_boundary.relative_error_pct - 10.01).abs() < 1e-9);
    assert_eq!(past_boundary.accuracy_class, AccuracyClass::Good);
}

#[test]
fn test_prediction_roundtrip() {
    let estimator = PutRateEstimator::new(nvme_grid(), &ModelConfig::default()).unwrap();
    let levels = wa_two_levels();
    let prediction = estimator
        .estimate(&EstimateInput {
            envelope: EnvelopeQuery {
                read_ratio: 0.37,
                queue_depth: 64,
                concurrency: 1,
                block_size: 4096,
            },
            level_stats: &levels,
            phase_context: PhaseContext::ElapsedSecs(1234.5),
            stall: StallProfile {
                stall_probability: 0.13,
                mean_stall_secs: 0.7,
                impact_factor: 0.31,
            },
            workload_base_efficiency: 0.037,
        })
        .unwrap();
    assert!(!prediction.clamped_axes.is_empty());

    let json = serde_json::to_string(&prediction).unwrap();
    let back: PredictionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, prediction);

    let validation = Scorer::default().score(&prediction, 7.3 * MB).unwrap();
    let json = serde_json::to_string(&validation).unwrap();
    let back: ValidationResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, validation);
}

#[test]
fn test_yaml_configured_batch() {
    let config: ModelConfig = serde_yaml::from_str(
        r#"
phases:
  utilization: { transitional_at: 0.25, stable_at: 0.6 }
  stable: { efficiency_factor: 0.5 }
workloads:
  random_write: 0.02
  sequential_write: 0.08
"#,
    )
    .unwrap();

    let experiments: Vec<Experiment> = serde_yaml::from_str(
        r#"
- name: fillrandom
  workload: random_write
  envelope: { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096 }
  level_stats:
    - { level: 0, flush_bytes: 100.0, compaction_write_bytes: 100.0, compaction_read_bytes: 0.0 }
  phase_context: { disk_utilization: 0.7 }
  measured: [7.0, 8.0]
- name: fillseq
  workload: sequential_write
  envelope: { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096 }
  level_stats:
    - { level: 0, flush_bytes: 100.0, compaction_write_bytes: 0.0, compaction_read_bytes: 0.0 }
  phase_context: { elapsed_secs: 10.0 }
- name: unknown
  workload: readwhilewriting
  envelope: { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096 }
  level_stats:
    - { level: 0, flush_bytes: 1.0, compaction_write_bytes: 0.0, compaction_read_bytes: 0.0 }
  phase_context: { elapsed_secs: 10.0 }
"#,
    )
    .unwrap();

    let grid = CalibrationGrid::from_points(vec![CalibrationPoint {
        read_ratio: 0.0,
        queue_depth: 16,
        concurrency: 1,
        block_size: 4096,
        read_bw: 0.0,
        write_bw: 1500.0,
    }])
    .unwrap();
    let evaluator = Evaluator::new(grid, config).unwrap();
    let results = evaluator.evaluate_batch(&experiments);

    // 1500 * 0.5 * 0.5 * 1.0 * 0.02 = 7.5
    let fillrandom = results[0].as_ref().unwrap();
    assert!((fillrandom.prediction.predicted_throughput - 7.5).abs() < 1e-9);
    let series = fillrandom.series.as_ref().unwrap();
    assert_eq!(series.aggregate.count, 2);

    // 1500 * 1.0 * 1.0 * 1.0 * 0.08 = 120
    let fillseq = results[1].as_ref().unwrap();
    assert!((fillseq.prediction.predicted_throughput - 120.0).abs() < 1e-9);

    assert!(results[2].is_err());
}
