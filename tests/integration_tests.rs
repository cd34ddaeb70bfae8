use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;

use cpetrs::engines::{EngineResultSet, EngineResults};
use cpetrs::kinetics::{KineticPhenotypeClassifier, PhenotypeStatus, TauClass};
use cpetrs::limiters::{LimiterKind, LimiterScorer};
use cpetrs::models::{channels, GoalType, SignalTable, TrainingProfile};
use cpetrs::plan::PlanGenerator;
use cpetrs::report::run_full_analysis;
use cpetrs::segment::segment_stats;
use cpetrs::snapshot::PhysioSnapshotBuilder;

/// Integration tests that exercise the complete analysis workflows

fn engine_results() -> EngineResultSet {
    let mut results = EngineResultSet::new();
    results.insert(
        "E01".to_string(),
        json!({
            "vo2max_ml_min": 3900.0,
            "vo2max_ml_kg_min": 52.0,
            "hr_max": 188.0,
            "hr_rest": 48.0,
            "body_mass_kg": 75.0,
            "sport_class": "TRAINED"
        }),
    );
    results.insert(
        "E02".to_string(),
        json!({
            "vt1": {"pct_vo2max": 62.0, "hr": 148.0, "speed_kmh": 11.2},
            "vt2": {"pct_vo2max": 84.0, "hr": 172.0, "speed_kmh": 14.0}
        }),
    );
    results.insert(
        "E03".to_string(),
        json!({
            "zones": [
                {"label": "Z1", "hr_low": 95.0, "hr_high": 125.0, "speed_low": 6.0, "speed_high": 8.5},
                {"label": "Z2", "hr_low": 126.0, "hr_high": 148.0, "speed_low": 8.5, "speed_high": 11.2},
                {"label": "Z3", "hr_low": 149.0, "hr_high": 163.0, "speed_low": 11.2, "speed_high": 12.8},
                {"label": "Z4", "hr_low": 164.0, "hr_high": 172.0, "speed_low": 12.8, "speed_high": 14.0},
                {"label": "Z5", "hr_low": 173.0, "hr_high": 188.0, "speed_low": 14.0, "speed_high": 18.0}
            ]
        }),
    );
    results.insert(
        "E07".to_string(),
        json!({"ve_vco2_slope": 28.5, "breathing_reserve_pct": 22.0}),
    );
    results.insert(
        "E09".to_string(),
        json!({"fatmax_g_min": 0.52, "fatmax_hr": 134.0, "crossover_pct_vo2max": 55.0}),
    );
    results.insert(
        "E11".to_string(),
        json!({"hrr_1min": 28.0, "hrr_3min": 62.0, "o2_pulse_trajectory": "RISING"}),
    );
    results.insert(
        "E13".to_string(),
        json!({
            "mode": "CONSTANT_WORK_RATE",
            "vo2max_ml_min": 3900.0,
            "stages": [
                {"stage": 1, "domain": "MODERATE", "t_start_s": 60.0, "t_end_s": 360.0,
                 "speed_kmh": 9.5, "duration_s": 300.0, "tau_on_s": 24.0,
                 "slow_component_pct": 1.5, "r_squared": 0.93, "off_half_time_s": 38.0,
                 "mean_rer": 0.88},
                {"stage": 2, "domain": "HEAVY", "t_start_s": 360.0, "t_end_s": 660.0,
                 "speed_kmh": 12.5, "duration_s": 300.0, "tau_on_s": 33.0,
                 "slow_component_pct": 6.0, "r_squared": 0.9, "off_half_time_s": 52.0,
                 "mean_rer": 0.99},
                {"stage": 3, "domain": "SEVERE", "t_start_s": 660.0, "t_end_s": 900.0,
                 "speed_kmh": 14.2, "duration_s": 240.0, "tau_on_s": 58.0,
                 "slow_component_pct": 10.0, "r_squared": 0.8, "off_half_time_s": 65.0,
                 "mean_rer": 1.09}
            ]
        }),
    );
    results
}

fn signal_table() -> SignalTable {
    let mut time = Vec::new();
    let mut phase = Vec::new();
    let mut hr = Vec::new();
    let mut vo2 = Vec::new();
    let mut o2p = Vec::new();

    for i in 0..=1100u32 {
        let t = i as f64;
        time.push(t);
        let (label, hr_v, vo2_v) = if t < 60.0 {
            ("REST", 55.0, 380.0)
        } else if t < 360.0 {
            ("WORK", 128.0, 2300.0)
        } else if t < 660.0 {
            let dt = t - 360.0;
            ("WORK", 158.0 + dt / 50.0, 3100.0 + dt * 0.8)
        } else if t < 900.0 {
            ("WORK", 180.0, 3850.0)
        } else {
            let dt = t - 900.0;
            ("RECOVERY", (183.0 - dt * 0.45).max(90.0), 1100.0)
        };
        phase.push(Some(label.to_string()));
        hr.push(Some(hr_v));
        vo2.push(Some(vo2_v));
        o2p.push(Some(vo2_v / hr_v));
    }

    let mut cols = BTreeMap::new();
    cols.insert(channels::HR.to_string(), hr);
    cols.insert(channels::VO2.to_string(), vo2);
    cols.insert(channels::O2_PULSE.to_string(), o2p);
    SignalTable::from_columns(time, phase, cols).unwrap()
}

/// The documented end-to-end scenario: VT1 at 50%, no VT2, untrained.
#[test]
fn low_base_scenario_emits_exactly_one_limiter() {
    let mut results = EngineResultSet::new();
    results.insert(
        "E01".to_string(),
        json!({"sport_class": "UNTRAINED"}),
    );
    results.insert(
        "E02".to_string(),
        json!({"vt1": {"pct_vo2max": 50.0}, "vt2": {"pct_vo2max": 0.0}}),
    );
    let typed = EngineResults::from_result_set(&results);
    let snapshot = PhysioSnapshotBuilder::build(&typed);
    let limiters = LimiterScorer::score_limiters(&snapshot, &TrainingProfile::default());

    // Default goal is endurance, which boosts LOW_BASE: use health to observe
    // the raw score.
    let profile = TrainingProfile {
        goal_type: GoalType::Health,
        ..Default::default()
    };
    let limiters_raw = LimiterScorer::score_limiters(&snapshot, &profile);
    assert_eq!(limiters_raw.len(), 1);
    assert_eq!(limiters_raw[0].kind, LimiterKind::LowBase);
    assert_eq!(limiters_raw[0].score, 15.0);

    // And the endurance boost multiplies it by 1.5.
    assert_eq!(limiters[0].score, 22.5);
}

/// The documented vo2max-goal boost scenario.
#[test]
fn vo2max_goal_boosts_ceiling_limiter() {
    let mut results = EngineResultSet::new();
    results.insert("E01".to_string(), json!({"sport_class": "RECREATIONAL"}));
    results.insert(
        "E02".to_string(),
        json!({"vt1": {"pct_vo2max": 0.0}, "vt2": {"pct_vo2max": 86.0}}),
    );
    let typed = EngineResults::from_result_set(&results);
    let snapshot = PhysioSnapshotBuilder::build(&typed);

    let neutral = LimiterScorer::score_limiters(
        &snapshot,
        &TrainingProfile {
            goal_type: GoalType::Health,
            ..Default::default()
        },
    );
    let boosted = LimiterScorer::score_limiters(
        &snapshot,
        &TrainingProfile {
            goal_type: GoalType::Vo2max,
            ..Default::default()
        },
    );
    assert_eq!(neutral[0].kind, LimiterKind::HighThresholdsLowCeiling);
    // VO2max unknown -> fixed 40, boosted once by 1.5.
    assert_eq!(neutral[0].score, 40.0);
    assert_eq!(boosted[0].score, 60.0);
}

/// Sub-window null propagation with exactly 3 and exactly 9 samples.
#[test]
fn segment_statistics_null_contract() {
    // Exactly 9 samples in the window: everything is null.
    let times: Vec<f64> = (0..9).map(|i| i as f64).collect();
    let mut cols = BTreeMap::new();
    cols.insert(
        channels::HR.to_string(),
        times.iter().map(|_| Some(100.0)).collect(),
    );
    let table = SignalTable::from_columns(times, vec![None; 9], cols).unwrap();
    let stats = segment_stats(&table, channels::HR, 0.0, 8.0);
    assert!(stats.window_mean.is_none());
    assert!(stats.early_mean.is_none());
    assert!(stats.late_mean.is_none());

    // 12 samples spread so that exactly 3 land in the tail sub-window.
    let times: Vec<f64> = (0..12).map(|i| i as f64 * 20.0).collect();
    let mut cols = BTreeMap::new();
    cols.insert(
        channels::HR.to_string(),
        times.iter().map(|_| Some(100.0)).collect(),
    );
    let table = SignalTable::from_columns(times, vec![None; 12], cols).unwrap();
    let stats = segment_stats(&table, channels::HR, 0.0, 220.0);
    assert!(stats.window_mean.is_some());
    assert!(stats.late_mean.is_none(), "3-sample tail must be null, not zero");
}

#[test]
fn full_analysis_produces_consistent_artifacts() {
    let report = run_full_analysis(
        &signal_table(),
        &engine_results(),
        &TrainingProfile::default(),
    );

    // Both pipelines completed.
    assert_eq!(report.phenotype.status, PhenotypeStatus::Ok);
    assert_eq!(report.phenotype.tau_class_moderate, Some(TauClass::Trained));
    assert_eq!(
        format!("{:?}", report.cross_correlation.status),
        "Ok"
    );

    // Plan embeds the snapshot summary and a full week.
    assert_eq!(report.plan.snapshot.vo2max_ml_kg_min, 52.0);
    assert_eq!(report.plan.sessions.len(), 5);
    assert!(report
        .plan
        .sessions
        .iter()
        .all(|s| (1..=5).contains(&s.zone)));

    // Limiters obey the ranking contract.
    assert!(report.limiters.len() <= 3);
    for (i, limiter) in report.limiters.iter().enumerate() {
        assert_eq!(limiter.priority as usize, i + 1);
        assert!((0.0..=100.0).contains(&limiter.score));
    }

    // Triangulation shares sum to 100 when present.
    if let Some(t) = &report.cross_correlation.triangulation {
        assert!((t.central_pct + t.peripheral_pct + t.integrated_pct - 100.0).abs() < 1e-6);
        assert!(t.n_signals > 0);
    }

    // The artifact serializes with no cycles and a sane timestamp.
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.len() > 500);
    assert!(report.generated_at <= Utc::now());
}

#[test]
fn upstream_hrr_and_dissociation_flow_through() {
    let report = run_full_analysis(
        &signal_table(),
        &engine_results(),
        &TrainingProfile::default(),
    );
    let recovery = &report.cross_correlation.recovery;
    // E11 provided HRR, so no derivation happens.
    assert_eq!(recovery.hrr_1min, Some(28.0));
    assert!(recovery.tau_off_s.is_some());
    assert!(recovery.dissociation.is_some());
}

#[test]
fn missing_engines_degrade_but_never_fail() {
    let report = run_full_analysis(
        &signal_table(),
        &EngineResultSet::new(),
        &TrainingProfile::default(),
    );
    assert_eq!(report.phenotype.status, PhenotypeStatus::NoKineticsData);
    assert!(report.limiters.is_empty());
    assert_eq!(report.plan.philosophy, "General endurance development");
    // The signal table alone still yields a cross-correlation envelope.
    assert!(report.cross_correlation.stages.is_empty());
}

#[test]
fn malformed_profile_days_are_clamped() {
    let typed = EngineResults::from_result_set(&engine_results());
    let snapshot = PhysioSnapshotBuilder::build(&typed);
    let profile = TrainingProfile {
        weekly_days: -2,
        ..Default::default()
    };
    let plan = PlanGenerator::generate(&snapshot, &profile, Vec::new());
    assert_eq!(plan.sessions.len(), 3);
}

#[test]
fn phenotype_confidence_bounds_hold_on_real_shape() {
    let typed = EngineResults::from_result_set(&engine_results());
    let snapshot = PhysioSnapshotBuilder::build(&typed);
    let phenotype = KineticPhenotypeClassifier::classify(&typed, &snapshot);
    assert!(phenotype.archetype.is_some());
    assert!(phenotype.archetype_confidence > 0.0);
    assert!(phenotype.archetype_confidence <= 1.0);
    let total: u32 = phenotype.vote_breakdown.values().sum();
    let winner = phenotype
        .vote_breakdown
        .values()
        .cloned()
        .max()
        .unwrap_or(0);
    assert!((phenotype.archetype_confidence - winner as f64 / total as f64).abs() < 1e-9);
}
