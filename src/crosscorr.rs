//! Cross-signal correlation analysis
//!
//! Correlates independent signals per exercise stage (HR / VO2 / O2-pulse
//! drift, breathing pattern, NIRS desaturation) and across the whole test
//! (recovery dissociation, ventilatory-kinetic integration), then folds the
//! evidence into composite scores: fitness fingerprint, limitation
//! triangulation, trainability gap and a sport-specific performance
//! projection.
//!
//! Threshold constants are empirical calibration values; they are kept
//! exactly as documented rather than re-derived.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::collections::BTreeMap;
use tracing::debug;

use crate::engines::{EngineResults, StageKinetics};
use crate::kinetics::KineticPhenotype;
use crate::models::{channels, IntensityDomain, Modality, SignalTable, TrainingProfile};
use crate::plan::format_pace;
use crate::segment::{linear_slope, segment_stats, SegmentStats};
use crate::snapshot::PhysioSnapshot;

/// Phase labels marking the post-exercise recovery segment.
const RECOVERY_PHASE_LABELS: [&str; 3] = ["RECOVERY", "COOLDOWN", "ODPOCZYNEK"];
/// Phase labels marking the pre-exercise rest segment.
const REST_PHASE_LABELS: [&str; 2] = ["REST", "SPOCZYNEK"];

/// Minimum non-null samples for a usable muscle-oxygenation channel.
const MIN_NIRS_SAMPLES: usize = 50;
/// Minimum desaturation (% points) for a meaningful NIRS tau estimate.
const MIN_NIRS_DESAT_PCT: f64 = 2.0;
/// NIRS tau within this of the VO2 tau counts as coupled, seconds.
const NIRS_TAU_COUPLING_TOLERANCE_S: f64 = 10.0;

/// Moderate tau at or under this is "fast" for integration typing, seconds.
const TAU_INTEGRATION_FAST_S: f64 = 25.0;
/// VE/VCO2 slope at or under this is "good" for integration typing.
const VE_VCO2_GOOD_SLOPE: f64 = 34.0;

const HRR_FAST_BPM: f64 = 25.0;
const HRR_SLOW_BPM: f64 = 15.0;
const TAU_OFF_FAST_S: f64 = 35.0;
const TAU_OFF_SLOW_S: f64 = 60.0;

/// Terminal status of a cross-correlation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossCorrelationStatus {
    #[default]
    Ok,
    NoData,
}

/// Dominant driver of within-stage drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftPattern {
    Cardiovascular,
    MuscleRecruitment,
    MetabolicSc,
    Stable,
    Mixed,
}

/// O2-pulse late/early stability bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum O2PulseStability {
    Stable,
    MildDrift,
    CardiacDrift,
}

impl O2PulseStability {
    fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.95 {
            O2PulseStability::Stable
        } else if ratio >= 0.90 {
            O2PulseStability::MildDrift
        } else {
            O2PulseStability::CardiacDrift
        }
    }
}

/// HRR vs tau-off dissociation classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DissociationClass {
    AutonomicFast,
    MetabolicFast,
    BalancedFast,
    DualSlow,
    Balanced,
}

/// Ventilatory-kinetic integration 2x2 classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VentilatoryIntegration {
    FullyIntegrated,
    VqMismatch,
    PeripheralLimited,
    DualLimitation,
}

/// NIRS-vs-VO2 kinetic agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NirsCoupling {
    Coupled,
    Decoupled,
}

/// Where the HRR values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoverySource {
    Upstream,
    Derived,
}

/// Breathing-pattern metrics for one stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BreathingMetrics {
    pub bf_mean: Option<f64>,
    pub vt_mean_l: Option<f64>,
    pub ve_mean_l_min: Option<f64>,
    pub bf_drift_pct: Option<f64>,
    pub vt_drift_pct: Option<f64>,
    /// Breaths per minute per litre; rising values mean rapid-shallow drift.
    pub rapid_shallow_index: Option<f64>,
}

/// All cross-metrics for one exercise stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageCrossMetrics {
    pub stage: u32,
    pub domain: Option<IntensityDomain>,
    pub hr_drift_pct: Option<f64>,
    pub vo2_drift_pct: Option<f64>,
    pub o2_pulse_drift_pct: Option<f64>,
    pub drift_pattern: Option<DriftPattern>,
    /// Slow component x mean RER metabolic-efficiency index.
    pub sc_rer_index: Option<f64>,
    pub o2_pulse_stability_ratio: Option<f64>,
    pub o2_pulse_stability: Option<O2PulseStability>,
    /// Early-over-late VO2; below 1.0 means economy decays within the stage.
    pub economy_durability: Option<f64>,
    pub breathing: BreathingMetrics,
    pub ve_vco2_ratio: Option<f64>,
}

/// Heart-rate recovery and its dissociation from metabolic recovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoveryAnalysis {
    pub hrr_1min: Option<f64>,
    pub hrr_3min: Option<f64>,
    pub source: Option<RecoverySource>,
    pub tau_off_s: Option<f64>,
    /// HRR(1min) divided by tau-off.
    pub dissociation_ratio: Option<f64>,
    pub dissociation: Option<DissociationClass>,
}

/// Per-stage NIRS desaturation metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NirsStageMetrics {
    pub stage: u32,
    pub early_pct: Option<f64>,
    pub late_pct: Option<f64>,
    /// Linear slope of %saturation per minute within the stage.
    pub desat_slope_pct_per_min: Option<f64>,
    /// Indirect tau via time to 63% of the total within-stage change.
    pub tau_estimate_s: Option<f64>,
    pub vo2_tau_s: Option<f64>,
    pub coupling: Option<NirsCoupling>,
}

/// Muscle-oxygenation analysis over the chosen channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NirsAnalysis {
    pub channel: String,
    pub rest_baseline_pct: Option<f64>,
    pub global_min_pct: Option<f64>,
    pub desaturation_depth_pct: Option<f64>,
    pub stages: Vec<NirsStageMetrics>,
}

/// Four-dimension fitness fingerprint, each 0-100.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FitnessFingerprint {
    pub capacity: f64,
    pub thresholds: f64,
    pub kinetics: f64,
    pub recovery: f64,
}

/// Weighted central/peripheral/integrated evidence shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitationTriangulation {
    pub central_pct: f64,
    pub peripheral_pct: f64,
    pub integrated_pct: f64,
    pub dominant: String,
    /// Equal to the winning percentage.
    pub confidence_pct: f64,
    pub n_signals: usize,
    pub evidence: Vec<String>,
}

/// Mean normalized distance-to-elite across the kinetic metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainabilityGap {
    /// 0 = nothing left to gain, 100 = maximal headroom.
    pub gap_index: f64,
    pub components: BTreeMap<String, f64>,
}

/// Sport-specific sustainable-pace projection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceProjection {
    pub event: String,
    pub sustainable_speed_kmh: Option<f64>,
    pub projected_pace_min_km: Option<String>,
    pub notes: String,
}

/// Full cross-correlation report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossCorrelationReport {
    pub status: CrossCorrelationStatus,
    pub stages: Vec<StageCrossMetrics>,
    pub recovery: RecoveryAnalysis,
    pub nirs: Option<NirsAnalysis>,
    pub ventilatory_integration: Option<VentilatoryIntegration>,
    pub fingerprint: FitnessFingerprint,
    pub triangulation: Option<LimitationTriangulation>,
    pub trainability: TrainabilityGap,
    pub projection: PerformanceProjection,
}

impl CrossCorrelationReport {
    fn with_status(status: CrossCorrelationStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

/// Cross-signal analyzer over the shared read-only inputs.
pub struct CrossCorrelationAnalyzer;

impl CrossCorrelationAnalyzer {
    pub fn analyze(
        table: &SignalTable,
        results: &EngineResults,
        snapshot: &PhysioSnapshot,
        phenotype: Option<&KineticPhenotype>,
        profile: &TrainingProfile,
    ) -> CrossCorrelationReport {
        if table.is_empty() {
            return CrossCorrelationReport::with_status(CrossCorrelationStatus::NoData);
        }

        let kinetic_stages = &results.kinetics.stages;
        let stages: Vec<StageCrossMetrics> = kinetic_stages
            .iter()
            .map(|stage| analyze_stage(table, stage))
            .collect();

        let recovery = analyze_recovery(table, snapshot, phenotype, kinetic_stages);
        let nirs = analyze_nirs(table, kinetic_stages);

        let tau_moderate = kinetic_stages
            .first()
            .map(|s| s.tau_on_s)
            .filter(|t| *t > 0.0);
        let tau_heavy = kinetic_stages
            .get(1)
            .map(|s| s.tau_on_s)
            .filter(|t| *t > 0.0);
        let sc_heavy = kinetic_stages.get(1).map(|s| s.slow_component_pct.abs());

        let ventilatory_integration =
            integration_class(tau_moderate, snapshot.ventilatory.ve_vco2_slope);
        let fingerprint = fingerprint(snapshot, tau_moderate);
        let triangulation =
            triangulate(snapshot, tau_moderate, tau_heavy, sc_heavy, nirs.as_ref());
        let trainability = trainability_gap(
            snapshot,
            tau_moderate,
            tau_heavy,
            sc_heavy,
            recovery.hrr_1min,
        );
        let projection = project_performance(snapshot, profile, tau_moderate, sc_heavy);

        debug!(
            stages = stages.len(),
            nirs = nirs.is_some(),
            "cross-correlation analysis complete"
        );

        CrossCorrelationReport {
            status: CrossCorrelationStatus::Ok,
            stages,
            recovery,
            nirs,
            ventilatory_integration,
            fingerprint,
            triangulation,
            trainability,
            projection,
        }
    }
}

fn analyze_stage(table: &SignalTable, stage: &StageKinetics) -> StageCrossMetrics {
    let (t0, t1) = (stage.t_start_s, stage.t_end_s);
    let windowed = t1 > t0;

    let (hr, vo2, o2p, bf, vt, ve, vco2) = if windowed {
        (
            segment_stats(table, channels::HR, t0, t1),
            segment_stats(table, channels::VO2, t0, t1),
            segment_stats(table, channels::O2_PULSE, t0, t1),
            segment_stats(table, channels::BF, t0, t1),
            segment_stats(table, channels::VT, t0, t1),
            segment_stats(table, channels::VE, t0, t1),
            segment_stats(table, channels::VCO2, t0, t1),
        )
    } else {
        Default::default()
    };

    let hr_drift = hr.drift_pct();
    let vo2_drift = vo2.drift_pct();
    let o2p_drift = o2p.drift_pct();

    let drift_pattern = match (hr_drift, vo2_drift, o2p_drift) {
        (Some(h), Some(v), Some(o)) => Some(classify_drift(h, v, o)),
        _ => None,
    };

    let o2_pulse_stability_ratio = o2p.stability_ratio();
    let breathing = breathing_metrics(&bf, &vt, &ve);

    let ve_vco2_ratio = match (ve.window_mean, vco2.window_mean) {
        // VE in L/min against VCO2 in ml/min.
        (Some(ve_mean), Some(vco2_mean)) if vco2_mean > 0.0 => {
            Some(ve_mean / (vco2_mean / 1000.0))
        }
        _ => None,
    };

    StageCrossMetrics {
        stage: stage.stage,
        domain: IntensityDomain::from_label(&stage.domain),
        hr_drift_pct: hr_drift,
        vo2_drift_pct: vo2_drift,
        o2_pulse_drift_pct: o2p_drift,
        drift_pattern,
        sc_rer_index: (stage.mean_rer > 0.0)
            .then(|| stage.slow_component_pct * stage.mean_rer),
        o2_pulse_stability_ratio,
        o2_pulse_stability: o2_pulse_stability_ratio.map(O2PulseStability::from_ratio),
        economy_durability: match (vo2.early_mean, vo2.late_mean) {
            (Some(early), Some(late)) if late > 0.0 => Some(early / late),
            _ => None,
        },
        breathing,
        ve_vco2_ratio,
    }
}

/// Fixed threshold cascade over the three drift percentages.
fn classify_drift(hr_drift: f64, vo2_drift: f64, o2p_drift: f64) -> DriftPattern {
    if hr_drift >= 5.0 && o2p_drift <= -3.0 {
        DriftPattern::Cardiovascular
    } else if vo2_drift >= 5.0 && hr_drift < 5.0 {
        DriftPattern::MuscleRecruitment
    } else if vo2_drift >= 3.0 && hr_drift >= 3.0 {
        DriftPattern::MetabolicSc
    } else if hr_drift.abs() < 3.0 && vo2_drift.abs() < 3.0 {
        DriftPattern::Stable
    } else {
        DriftPattern::Mixed
    }
}

fn breathing_metrics(bf: &SegmentStats, vt: &SegmentStats, ve: &SegmentStats) -> BreathingMetrics {
    BreathingMetrics {
        bf_mean: bf.window_mean,
        vt_mean_l: vt.window_mean,
        ve_mean_l_min: ve.window_mean,
        bf_drift_pct: bf.drift_pct(),
        vt_drift_pct: vt.drift_pct(),
        rapid_shallow_index: match (bf.window_mean, vt.window_mean) {
            (Some(bf_mean), Some(vt_mean)) if vt_mean > 0.0 => Some(bf_mean / vt_mean),
            _ => None,
        },
    }
}

fn analyze_recovery(
    table: &SignalTable,
    snapshot: &PhysioSnapshot,
    phenotype: Option<&KineticPhenotype>,
    stages: &[StageKinetics],
) -> RecoveryAnalysis {
    let upstream_hrr = snapshot.recovery.hrr_1min;
    let (hrr_1min, hrr_3min, source) = if upstream_hrr > 0.0 {
        (
            Some(upstream_hrr),
            (snapshot.recovery.hrr_3min > 0.0).then_some(snapshot.recovery.hrr_3min),
            Some(RecoverySource::Upstream),
        )
    } else {
        let (derived_1, derived_3) = derive_hrr(table);
        let source = derived_1.is_some().then_some(RecoverySource::Derived);
        (derived_1, derived_3, source)
    };

    let tau_off_s = phenotype
        .and_then(|p| p.median_off_half_time_s)
        .or_else(|| {
            let valid: Vec<f64> = stages
                .iter()
                .map(|s| s.off_half_time_s)
                .filter(|t| *t > 1.0)
                .collect();
            if valid.is_empty() {
                None
            } else {
                Some(Data::new(valid).median())
            }
        });

    let dissociation_ratio = match (hrr_1min, tau_off_s) {
        (Some(hrr), Some(tau)) if tau > 0.0 => Some(hrr / tau),
        _ => None,
    };
    let dissociation = match (hrr_1min, tau_off_s) {
        (Some(hrr), Some(tau)) => Some(classify_dissociation(hrr, tau)),
        _ => None,
    };

    RecoveryAnalysis {
        hrr_1min,
        hrr_3min,
        source,
        tau_off_s,
        dissociation_ratio,
        dissociation,
    }
}

/// Derive HRR(1min)/HRR(3min) from the recovery-phase segment of the table.
fn derive_hrr(table: &SignalTable) -> (Option<f64>, Option<f64>) {
    let Some(start_index) = table.phase_start_index(&RECOVERY_PHASE_LABELS) else {
        return (None, None);
    };
    let t0 = table.time_s()[start_index];

    // Peak HR over the last 30 s of exercise.
    let peak_window = table.window_values(channels::HR, t0 - 30.0, t0);
    let peak = peak_window.iter().cloned().fold(f64::NAN, f64::max);
    if !peak.is_finite() {
        return (None, None);
    }

    let at_offset = |offset: f64| -> Option<f64> {
        let values = table.window_values(channels::HR, t0 + offset - 5.0, t0 + offset + 5.0);
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    let hrr_1 = at_offset(60.0).map(|hr| (peak - hr).max(0.0));
    let hrr_3 = at_offset(180.0).map(|hr| (peak - hr).max(0.0));
    (hrr_1, hrr_3)
}

/// Fixed-threshold 2-way table over (HRR speed, tau-off speed).
fn classify_dissociation(hrr_1min: f64, tau_off_s: f64) -> DissociationClass {
    let hrr_fast = hrr_1min >= HRR_FAST_BPM;
    let hrr_slow = hrr_1min < HRR_SLOW_BPM;
    let tau_fast = tau_off_s <= TAU_OFF_FAST_S;
    let tau_slow = tau_off_s > TAU_OFF_SLOW_S;

    if hrr_fast && tau_fast {
        DissociationClass::BalancedFast
    } else if hrr_fast && tau_slow {
        DissociationClass::AutonomicFast
    } else if hrr_slow && tau_fast {
        DissociationClass::MetabolicFast
    } else if hrr_slow && tau_slow {
        DissociationClass::DualSlow
    } else {
        DissociationClass::Balanced
    }
}

fn analyze_nirs(table: &SignalTable, stages: &[StageKinetics]) -> Option<NirsAnalysis> {
    let channel = channels::MUSCLE_O2_CANDIDATES.iter().find(|name| {
        table
            .channel(name)
            .map(|col| col.iter().flatten().count() >= MIN_NIRS_SAMPLES)
            .unwrap_or(false)
    })?;
    let column = table.channel(channel)?;

    let rest_baseline_pct = rest_baseline(table, channel);
    let global_min_pct = column.iter().flatten().cloned().fold(f64::NAN, f64::min);
    let global_min_pct = global_min_pct.is_finite().then_some(global_min_pct);
    let desaturation_depth_pct = match (rest_baseline_pct, global_min_pct) {
        (Some(baseline), Some(min)) => Some(baseline - min),
        _ => None,
    };

    let stage_metrics = stages
        .iter()
        .filter(|s| s.t_end_s > s.t_start_s)
        .map(|stage| nirs_stage(table, channel, stage))
        .collect();

    Some(NirsAnalysis {
        channel: channel.to_string(),
        rest_baseline_pct,
        global_min_pct,
        desaturation_depth_pct,
        stages: stage_metrics,
    })
}

/// Mean saturation over the rest phase, falling back to the first 60 s.
fn rest_baseline(table: &SignalTable, channel: &str) -> Option<f64> {
    let values = match table.phase_start_index(&REST_PHASE_LABELS) {
        Some(index) => {
            let t0 = table.time_s()[index];
            table.window_values(channel, t0, t0 + 60.0)
        }
        None => {
            let t0 = *table.time_s().first()?;
            table.window_values(channel, t0, t0 + 60.0)
        }
    };
    if values.len() < 4 {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn nirs_stage(table: &SignalTable, channel: &str, stage: &StageKinetics) -> NirsStageMetrics {
    let (t0, t1) = (stage.t_start_s, stage.t_end_s);
    let stats = segment_stats(table, channel, t0, t1);

    // Slope of %saturation on minutes over the stage.
    let indices = table.window_indices(t0, t1);
    let column = table.channel(channel);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    if let Some(column) = column {
        for i in indices {
            if let Some(value) = column[i] {
                xs.push((table.time_s()[i] - t0) / 60.0);
                ys.push(value);
            }
        }
    }
    let desat_slope = linear_slope(&xs, &ys);

    let tau_estimate_s = nirs_tau_estimate(&xs, &ys);
    let vo2_tau_s = (stage.tau_on_s > 0.0).then_some(stage.tau_on_s);
    let coupling = match (tau_estimate_s, vo2_tau_s) {
        (Some(nirs_tau), Some(vo2_tau)) => Some(
            if (nirs_tau - vo2_tau).abs() <= NIRS_TAU_COUPLING_TOLERANCE_S {
                NirsCoupling::Coupled
            } else {
                NirsCoupling::Decoupled
            },
        ),
        _ => None,
    };

    NirsStageMetrics {
        stage: stage.stage,
        early_pct: stats.early_mean,
        late_pct: stats.late_mean,
        desat_slope_pct_per_min: desat_slope,
        tau_estimate_s,
        vo2_tau_s,
        coupling,
    }
}

/// Indirect tau: time to 63% of the total within-stage desaturation.
///
/// `xs` are minutes from stage start, `ys` the saturation values.
fn nirs_tau_estimate(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if ys.len() < 10 {
        return None;
    }
    let start = ys[0];
    let min = ys.iter().cloned().fold(f64::INFINITY, f64::min);
    let total_drop = start - min;
    if total_drop < MIN_NIRS_DESAT_PCT {
        return None;
    }
    let target = start - 0.63 * total_drop;
    xs.iter()
        .zip(ys)
        .find(|(_, y)| **y <= target)
        .map(|(x, _)| x * 60.0)
}

/// 2x2 table over (moderate tau speed, VE/VCO2 slope quality).
fn integration_class(
    tau_moderate: Option<f64>,
    ve_vco2_slope: f64,
) -> Option<VentilatoryIntegration> {
    let tau = tau_moderate?;
    if ve_vco2_slope <= 0.0 {
        return None;
    }
    let tau_fast = tau <= TAU_INTEGRATION_FAST_S;
    let slope_good = ve_vco2_slope <= VE_VCO2_GOOD_SLOPE;
    Some(match (tau_fast, slope_good) {
        (true, true) => VentilatoryIntegration::FullyIntegrated,
        (true, false) => VentilatoryIntegration::VqMismatch,
        (false, true) => VentilatoryIntegration::PeripheralLimited,
        (false, false) => VentilatoryIntegration::DualLimitation,
    })
}

/// Fixed-breakpoint scoring for the four fingerprint dimensions.
fn fingerprint(snapshot: &PhysioSnapshot, tau_moderate: Option<f64>) -> FitnessFingerprint {
    fn score(value: f64, breakpoints: &[(f64, f64)], floor: f64) -> f64 {
        if value <= 0.0 {
            return 0.0;
        }
        for (threshold, score) in breakpoints {
            if value >= *threshold {
                return *score;
            }
        }
        floor
    }

    let capacity = score(
        snapshot.capacity.vo2max_ml_kg_min,
        &[(70.0, 100.0), (60.0, 85.0), (50.0, 70.0), (42.0, 55.0), (35.0, 40.0)],
        25.0,
    );

    let vt1_score = score(
        snapshot.thresholds.vt1_pct_vo2max,
        &[(75.0, 100.0), (68.0, 85.0), (60.0, 70.0), (52.0, 55.0), (45.0, 40.0)],
        25.0,
    );
    let vt2_score = score(
        snapshot.thresholds.vt2_pct_vo2max,
        &[(90.0, 100.0), (85.0, 85.0), (80.0, 70.0), (72.0, 55.0), (65.0, 40.0)],
        25.0,
    );
    let thresholds = match (vt1_score > 0.0, vt2_score > 0.0) {
        (true, true) => (vt1_score + vt2_score) / 2.0,
        (true, false) => vt1_score,
        (false, true) => vt2_score,
        (false, false) => 0.0,
    };

    // Kinetics scores invert: a smaller tau is better.
    let kinetics = match tau_moderate {
        None => 0.0,
        Some(tau) if tau <= 15.0 => 100.0,
        Some(tau) if tau <= 20.0 => 85.0,
        Some(tau) if tau <= 25.0 => 70.0,
        Some(tau) if tau <= 32.0 => 55.0,
        Some(tau) if tau <= 40.0 => 40.0,
        Some(_) => 25.0,
    };

    let recovery = score(
        snapshot.recovery.hrr_1min,
        &[(40.0, 100.0), (30.0, 80.0), (20.0, 60.0), (12.0, 40.0)],
        20.0,
    );

    FitnessFingerprint {
        capacity,
        thresholds,
        kinetics,
        recovery,
    }
}

/// Accumulate weighted central/peripheral/integrated evidence from up to
/// five independent signals.
fn triangulate(
    snapshot: &PhysioSnapshot,
    tau_moderate: Option<f64>,
    tau_heavy: Option<f64>,
    sc_heavy: Option<f64>,
    nirs: Option<&NirsAnalysis>,
) -> Option<LimitationTriangulation> {
    let mut central = 0.0;
    let mut peripheral = 0.0;
    let mut integrated = 0.0;
    let mut n_signals = 0usize;
    let mut evidence = Vec::new();

    // Signal 1: O2-pulse trajectory.
    let trajectory = snapshot.recovery.o2_pulse_trajectory;
    if trajectory.is_limited() {
        central += 2.0;
        n_signals += 1;
        evidence.push("O2-pulse plateau/decline points central".to_string());
    } else if trajectory == crate::models::O2PulseTrajectory::Rising {
        integrated += 1.0;
        n_signals += 1;
        evidence.push("O2-pulse rising to peak".to_string());
    }

    // Signal 2: heavy/moderate tau ratio.
    if let (Some(moderate), Some(heavy)) = (tau_moderate, tau_heavy) {
        let ratio = heavy / moderate;
        n_signals += 1;
        if ratio > 1.5 {
            peripheral += 2.0;
            evidence.push(format!("tau heavy/moderate ratio {:.2} points peripheral", ratio));
        } else if ratio < 1.2 {
            integrated += 1.0;
            evidence.push(format!("tau ratio {:.2} is proportionate", ratio));
        } else {
            peripheral += 0.5;
            evidence.push(format!("tau ratio {:.2} mildly elevated", ratio));
        }
    }

    // Signal 3: ventilatory efficiency.
    let slope = snapshot.ventilatory.ve_vco2_slope;
    if slope > VE_VCO2_GOOD_SLOPE {
        central += 1.5;
        n_signals += 1;
        evidence.push(format!("VE/VCO2 slope {:.1} elevated", slope));
    } else if slope > 0.0 && slope <= 30.0 {
        integrated += 0.5;
        n_signals += 1;
        evidence.push(format!("VE/VCO2 slope {:.1} efficient", slope));
    }

    // Signal 4: NIRS desaturation depth.
    if let Some(depth) = nirs.and_then(|n| n.desaturation_depth_pct) {
        n_signals += 1;
        if depth > 30.0 {
            peripheral += 2.0;
            evidence.push(format!("deep muscle desaturation ({:.0}%)", depth));
        } else if depth < 15.0 {
            central += 1.0;
            evidence.push(format!("shallow desaturation ({:.0}%): extraction reserve unused", depth));
        } else {
            integrated += 0.5;
            evidence.push(format!("desaturation depth {:.0}% unremarkable", depth));
        }
    }

    // Signal 5: heavy slow-component magnitude.
    if let Some(sc) = sc_heavy.filter(|sc| *sc > 0.0) {
        if sc >= 8.0 {
            peripheral += 1.5;
            n_signals += 1;
            evidence.push(format!("slow component {:.1}% elevated", sc));
        } else if sc < 3.0 {
            integrated += 1.0;
            n_signals += 1;
            evidence.push(format!("slow component {:.1}% minimal", sc));
        }
    }

    let total = central + peripheral + integrated;
    if n_signals == 0 || total <= 0.0 {
        return None;
    }

    let central_pct = central / total * 100.0;
    let peripheral_pct = peripheral / total * 100.0;
    let integrated_pct = integrated / total * 100.0;
    let (dominant, confidence_pct) = [
        ("CENTRAL", central_pct),
        ("PERIPHERAL", peripheral_pct),
        ("INTEGRATED", integrated_pct),
    ]
    .into_iter()
    .fold(("CENTRAL", 0.0), |best, candidate| {
        if candidate.1 > best.1 {
            candidate
        } else {
            best
        }
    });

    Some(LimitationTriangulation {
        central_pct,
        peripheral_pct,
        integrated_pct,
        dominant: dominant.to_string(),
        confidence_pct,
        n_signals,
        evidence,
    })
}

/// Per-metric normalized distance to elite reference values.
fn trainability_gap(
    snapshot: &PhysioSnapshot,
    tau_moderate: Option<f64>,
    tau_heavy: Option<f64>,
    sc_heavy: Option<f64>,
    hrr_1min: Option<f64>,
) -> TrainabilityGap {
    let mut components = BTreeMap::new();

    if let Some(tau) = tau_moderate {
        components.insert(
            "tau_moderate".to_string(),
            ((tau - 15.0) / 30.0).clamp(0.0, 1.0),
        );
    }
    if let Some(tau) = tau_heavy {
        components.insert(
            "tau_heavy".to_string(),
            ((tau - 20.0) / 30.0).clamp(0.0, 1.0),
        );
    }
    if let Some(sc) = sc_heavy {
        components.insert("slow_component".to_string(), ((sc - 3.0) / 12.0).clamp(0.0, 1.0));
    }
    if snapshot.thresholds.vt1_pct_vo2max > 0.0 {
        components.insert(
            "vt1_position".to_string(),
            ((75.0 - snapshot.thresholds.vt1_pct_vo2max) / 30.0).clamp(0.0, 1.0),
        );
    }
    if let Some(hrr) = hrr_1min.filter(|h| *h > 0.0) {
        components.insert("hrr".to_string(), ((35.0 - hrr) / 25.0).clamp(0.0, 1.0));
    }

    let gap_index = if components.is_empty() {
        0.0
    } else {
        components.values().sum::<f64>() / components.len() as f64 * 100.0
    };

    TrainabilityGap {
        gap_index,
        components,
    }
}

/// Sustainable-pace projection; distinct formulas for a multi-transition
/// mixed-modality event and a pure-running event, both penalized by the
/// slow-component magnitude.
fn project_performance(
    snapshot: &PhysioSnapshot,
    profile: &TrainingProfile,
    tau_moderate: Option<f64>,
    sc_heavy: Option<f64>,
) -> PerformanceProjection {
    let vt1_speed = snapshot.thresholds.vt1_speed_kmh;
    let vt2_speed = snapshot.thresholds.vt2_speed_kmh;
    let sc = sc_heavy.unwrap_or(0.0).min(15.0);

    let mixed = matches!(profile.modality, Modality::Hybrid | Modality::Triathlon);
    let event = if mixed {
        "multi-transition mixed-modality event"
    } else {
        "sustained running event"
    };

    if vt2_speed <= 0.0 || (mixed && vt1_speed <= 0.0) {
        return PerformanceProjection {
            event: event.to_string(),
            sustainable_speed_kmh: None,
            projected_pace_min_km: None,
            notes: "Threshold speeds unavailable; no projection.".to_string(),
        };
    }

    let speed = if mixed {
        // Transitions re-incur the O2 deficit, so slow on-kinetics and the
        // slow component both cost pace.
        let tau_penalty = tau_moderate
            .map(|tau| ((tau - 20.0) / 200.0).clamp(0.0, 0.10))
            .unwrap_or(0.0);
        (0.6 * vt2_speed + 0.4 * vt1_speed) * (1.0 - 1.2 * sc / 100.0 - tau_penalty)
    } else {
        vt2_speed * 0.97 * (1.0 - 0.8 * sc / 100.0)
    };

    let notes = if mixed {
        "Pace between stations; each transition re-triggers VO2 kinetics.".to_string()
    } else {
        "Sustainable pace just under VT2, discounted by the slow component.".to_string()
    };

    PerformanceProjection {
        event: event.to_string(),
        sustainable_speed_kmh: Some(speed),
        projected_pace_min_km: format_pace(speed),
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::KineticsResult;
    use std::collections::BTreeMap;

    fn empty_table() -> SignalTable {
        SignalTable::default()
    }

    /// A 3-stage constant-work-rate test at 1 Hz with recovery tail.
    fn synthetic_table() -> SignalTable {
        let mut time = Vec::new();
        let mut hr = Vec::new();
        let mut vo2 = Vec::new();
        let mut o2p = Vec::new();
        let mut bf = Vec::new();
        let mut vt = Vec::new();
        let mut ve = Vec::new();
        let mut vco2 = Vec::new();
        let mut smo2 = Vec::new();
        let mut phase = Vec::new();

        for i in 0..=1500u32 {
            let t = i as f64;
            time.push(t);
            let (p, hr_v, vo2_v, smo2_v) = if t < 60.0 {
                ("REST", 60.0, 400.0, 70.0)
            } else if t < 360.0 {
                // Moderate stage: stable.
                ("WORK", 120.0, 2000.0, 62.0)
            } else if t < 660.0 {
                // Heavy stage: drifting HR, sagging SmO2.
                let dt = t - 360.0;
                ("WORK", 150.0 + dt / 30.0, 2800.0 + dt, 55.0 - dt / 60.0)
            } else if t < 960.0 {
                ("WORK", 175.0, 3600.0, 42.0)
            } else {
                let dt = t - 960.0;
                ("RECOVERY", (178.0 - dt * 0.5).max(95.0), 1200.0, 60.0)
            };
            phase.push(Some(p.to_string()));
            hr.push(Some(hr_v));
            vo2.push(Some(vo2_v));
            o2p.push(Some(vo2_v / hr_v));
            bf.push(Some(30.0));
            vt.push(Some(2.0));
            ve.push(Some(60.0));
            vco2.push(Some(vo2_v * 0.95));
            smo2.push(Some(smo2_v));
        }

        let mut cols = BTreeMap::new();
        cols.insert(channels::HR.to_string(), hr);
        cols.insert(channels::VO2.to_string(), vo2);
        cols.insert(channels::O2_PULSE.to_string(), o2p);
        cols.insert(channels::BF.to_string(), bf);
        cols.insert(channels::VT.to_string(), vt);
        cols.insert(channels::VE.to_string(), ve);
        cols.insert(channels::VCO2.to_string(), vco2);
        cols.insert("SmO2".to_string(), smo2);
        SignalTable::from_columns(time, phase, cols).unwrap()
    }

    fn stage(n: u32, t0: f64, t1: f64, tau: f64, sc: f64) -> StageKinetics {
        StageKinetics {
            stage: n,
            domain: match n {
                1 => "MODERATE".to_string(),
                2 => "HEAVY".to_string(),
                _ => "SEVERE".to_string(),
            },
            t_start_s: t0,
            t_end_s: t1,
            duration_s: t1 - t0,
            tau_on_s: tau,
            slow_component_pct: sc,
            mean_rer: 0.95,
            speed_kmh: 10.0 + n as f64,
            r_squared: 0.9,
            off_half_time_s: 35.0,
        }
    }

    fn results() -> EngineResults {
        EngineResults {
            kinetics: KineticsResult {
                mode: "CONSTANT_WORK_RATE".to_string(),
                vo2max_ml_min: 4000.0,
                stages: vec![
                    stage(1, 60.0, 360.0, 22.0, 1.0),
                    stage(2, 360.0, 660.0, 30.0, 6.0),
                    stage(3, 660.0, 960.0, 55.0, 10.0),
                ],
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_table_short_circuits_with_no_data() {
        let report = CrossCorrelationAnalyzer::analyze(
            &empty_table(),
            &EngineResults::default(),
            &PhysioSnapshot::default(),
            None,
            &TrainingProfile::default(),
        );
        assert_eq!(report.status, CrossCorrelationStatus::NoData);
        assert!(report.stages.is_empty());
    }

    #[test]
    fn heavy_stage_shows_drift_and_nirs_desaturation() {
        let table = synthetic_table();
        let report = CrossCorrelationAnalyzer::analyze(
            &table,
            &results(),
            &PhysioSnapshot::default(),
            None,
            &TrainingProfile::default(),
        );
        assert_eq!(report.status, CrossCorrelationStatus::Ok);
        assert_eq!(report.stages.len(), 3);

        let heavy = &report.stages[1];
        assert!(heavy.hr_drift_pct.unwrap() > 3.0);
        assert!(heavy.drift_pattern.is_some());

        let nirs = report.nirs.as_ref().expect("SmO2 channel present");
        assert_eq!(nirs.channel, "SmO2");
        assert!(nirs.rest_baseline_pct.unwrap() > 65.0);
        // Heavy-stage saturation slopes downward.
        assert!(nirs.stages[1].desat_slope_pct_per_min.unwrap() < 0.0);
    }

    #[test]
    fn moderate_stage_is_stable() {
        let table = synthetic_table();
        let report = CrossCorrelationAnalyzer::analyze(
            &table,
            &results(),
            &PhysioSnapshot::default(),
            None,
            &TrainingProfile::default(),
        );
        assert_eq!(
            report.stages[0].drift_pattern,
            Some(DriftPattern::Stable)
        );
        assert_eq!(
            report.stages[0].o2_pulse_stability,
            Some(O2PulseStability::Stable)
        );
    }

    #[test]
    fn hrr_is_derived_from_recovery_phase_when_upstream_absent() {
        let table = synthetic_table();
        let report = CrossCorrelationAnalyzer::analyze(
            &table,
            &results(),
            &PhysioSnapshot::default(),
            None,
            &TrainingProfile::default(),
        );
        assert_eq!(report.recovery.source, Some(RecoverySource::Derived));
        // HR falls 0.5 bpm/s from 178: ~30 bpm in the first minute.
        let hrr = report.recovery.hrr_1min.unwrap();
        assert!(hrr > 20.0 && hrr < 40.0, "hrr={}", hrr);
        assert!(report.recovery.hrr_3min.unwrap() > hrr);
    }

    #[test]
    fn upstream_hrr_wins_over_derivation() {
        let table = synthetic_table();
        let mut snapshot = PhysioSnapshot::default();
        snapshot.recovery.hrr_1min = 22.0;
        let report = CrossCorrelationAnalyzer::analyze(
            &table,
            &results(),
            &snapshot,
            None,
            &TrainingProfile::default(),
        );
        assert_eq!(report.recovery.source, Some(RecoverySource::Upstream));
        assert_eq!(report.recovery.hrr_1min, Some(22.0));
        // tau_off 35 with HRR 22 sits between every extreme.
        assert_eq!(
            report.recovery.dissociation,
            Some(DissociationClass::Balanced)
        );
    }

    #[test]
    fn integration_table_is_exhaustive() {
        assert_eq!(
            integration_class(Some(20.0), 30.0),
            Some(VentilatoryIntegration::FullyIntegrated)
        );
        assert_eq!(
            integration_class(Some(20.0), 38.0),
            Some(VentilatoryIntegration::VqMismatch)
        );
        assert_eq!(
            integration_class(Some(32.0), 30.0),
            Some(VentilatoryIntegration::PeripheralLimited)
        );
        assert_eq!(
            integration_class(Some(32.0), 38.0),
            Some(VentilatoryIntegration::DualLimitation)
        );
        assert_eq!(integration_class(None, 30.0), None);
    }

    #[test]
    fn triangulation_percentages_sum_to_100() {
        let mut snapshot = PhysioSnapshot::default();
        snapshot.ventilatory.ve_vco2_slope = 37.0;
        snapshot.recovery.o2_pulse_trajectory = crate::models::O2PulseTrajectory::Plateau;
        let triangulation =
            triangulate(&snapshot, Some(20.0), Some(36.0), Some(9.0), None).unwrap();
        let sum = triangulation.central_pct
            + triangulation.peripheral_pct
            + triangulation.integrated_pct;
        assert!((sum - 100.0).abs() < 1e-6);
        assert_eq!(triangulation.n_signals, 4);
        assert_eq!(
            triangulation.confidence_pct,
            triangulation
                .central_pct
                .max(triangulation.peripheral_pct)
                .max(triangulation.integrated_pct)
        );
    }

    #[test]
    fn triangulation_absent_without_signals() {
        let snapshot = PhysioSnapshot::default();
        assert!(triangulate(&snapshot, None, None, None, None).is_none());
    }

    #[test]
    fn trainability_gap_shrinks_with_elite_values() {
        let mut snapshot = PhysioSnapshot::default();
        snapshot.thresholds.vt1_pct_vo2max = 75.0;
        let elite = trainability_gap(&snapshot, Some(14.0), Some(18.0), Some(2.0), Some(40.0));
        assert_eq!(elite.gap_index, 0.0);

        let untrained =
            trainability_gap(&snapshot, Some(45.0), Some(50.0), Some(15.0), Some(10.0));
        assert!(untrained.gap_index > 70.0);
    }

    #[test]
    fn projection_penalizes_slow_component_and_transitions() {
        let mut snapshot = PhysioSnapshot::default();
        snapshot.thresholds.vt1_speed_kmh = 11.0;
        snapshot.thresholds.vt2_speed_kmh = 14.0;

        let running = TrainingProfile::default();
        let clean = project_performance(&snapshot, &running, Some(20.0), Some(1.0));
        let heavy_sc = project_performance(&snapshot, &running, Some(20.0), Some(12.0));
        assert!(clean.sustainable_speed_kmh.unwrap() > heavy_sc.sustainable_speed_kmh.unwrap());

        let hybrid = TrainingProfile {
            modality: Modality::Hybrid,
            ..Default::default()
        };
        let mixed = project_performance(&snapshot, &hybrid, Some(40.0), Some(1.0));
        // The mixed event blends VT1 into the pace and pays a tau penalty.
        assert!(mixed.sustainable_speed_kmh.unwrap() < clean.sustainable_speed_kmh.unwrap());
        assert!(mixed.event.contains("multi-transition"));
    }
}
