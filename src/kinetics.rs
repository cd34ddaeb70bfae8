//! Kinetic phenotype classification
//!
//! Classifies already-fitted VO2 on/off kinetics per intensity domain,
//! triangulates central-vs-peripheral limitation from the tau pattern, and
//! scores a phenotype archetype by folding weighted signal contributions
//! into a vote vector. State-free: unusable input returns the record with a
//! terminal status code set and everything else empty, never an error.
//!
//! Stage convention: stage 1 = moderate, stage 2 = heavy, stage 3 = severe.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::engines::{EngineResults, StageKinetics};
use crate::models::IntensityDomain;
use crate::snapshot::PhysioSnapshot;

/// Protocol mode required for kinetic analysis.
pub const CONSTANT_WORK_RATE_MODE: &str = "CONSTANT_WORK_RATE";

/// Moderate-domain tau thresholds: ELITE/TRAINED/ACTIVE ceilings, seconds.
const TAU_MODERATE_BANDS: [f64; 3] = [15.0, 25.0, 40.0];
/// Heavy-domain tau thresholds, seconds.
const TAU_HEAVY_BANDS: [f64; 3] = [20.0, 35.0, 50.0];
/// Severe tau above this is simply the expected slowdown.
const SEVERE_TAU_EXPECTED_S: f64 = 50.0;
/// Slow-component magnitude ceilings: MINIMAL/NORMAL/HIGH, percent.
const SC_BANDS: [f64; 3] = [3.0, 8.0, 15.0];
/// Recovery half-time ceilings: EXCELLENT/GOOD/MODERATE, seconds.
const RECOVERY_BANDS: [f64; 3] = [30.0, 60.0, 90.0];
/// Off half-times at or below this are fit artifacts and excluded.
const MIN_VALID_OFF_HALF_TIME_S: f64 = 1.0;
/// Severe stages shorter than this cannot show a full slow component.
const MIN_SEVERE_STAGE_S: f64 = 180.0;
/// Heavy tau below this fraction of moderate tau suggests a priming effect.
const PRIMING_RATIO: f64 = 0.8;
const MIN_R2_MODERATE: f64 = 0.7;
const MIN_R2_HEAVY: f64 = 0.5;

/// Terminal status of a classification run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhenotypeStatus {
    #[default]
    Ok,
    NoKineticsData,
    InsufficientStages,
    NoVo2maxReference,
}

/// Tau grading against domain-specific bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TauClass {
    Elite,
    Trained,
    Active,
    Slow,
}

impl TauClass {
    fn from_tau(tau_s: f64, bands: [f64; 3]) -> Self {
        match tau_s {
            t if t <= bands[0] => TauClass::Elite,
            t if t <= bands[1] => TauClass::Trained,
            t if t <= bands[2] => TauClass::Active,
            _ => TauClass::Slow,
        }
    }

    /// Elite and Trained count as fast in the limitation table.
    fn is_fast(&self) -> bool {
        matches!(self, TauClass::Elite | TauClass::Trained)
    }
}

/// Severe tau is never graded on the moderate/heavy scale, only flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SevereTauFlag {
    ExpectedSlow,
    FastForSevere,
}

/// Slow-component magnitude class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlowComponentClass {
    Minimal,
    Normal,
    High,
    VeryHigh,
}

impl SlowComponentClass {
    fn from_pct(sc_pct: f64) -> Self {
        match sc_pct.abs() {
            s if s < SC_BANDS[0] => SlowComponentClass::Minimal,
            s if s < SC_BANDS[1] => SlowComponentClass::Normal,
            s if s < SC_BANDS[2] => SlowComponentClass::High,
            _ => SlowComponentClass::VeryHigh,
        }
    }
}

/// Off-transient recovery speed class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryClass {
    Excellent,
    Good,
    Moderate,
    Slow,
}

impl RecoveryClass {
    fn from_half_time(half_time_s: f64) -> Self {
        match half_time_s {
            t if t <= RECOVERY_BANDS[0] => RecoveryClass::Excellent,
            t if t <= RECOVERY_BANDS[1] => RecoveryClass::Good,
            t if t <= RECOVERY_BANDS[2] => RecoveryClass::Moderate,
            _ => RecoveryClass::Slow,
        }
    }
}

/// Central-vs-peripheral limitation read from the tau pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimitationType {
    WellIntegrated,
    DeliveryLimited,
    PeripheralLimited,
    EfficiencyLimited,
    MixedCheckData,
}

/// Named phenotype archetypes, in fixed tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Archetype {
    EliteAerobic,
    Diesel,
    TempoRunner,
    BurstRecover,
    PowerEndurance,
    DeliveryLimited,
    PeripheralLimited,
}

impl Archetype {
    /// Slot in the fixed vote vector; matches `ARCHETYPES` order.
    fn index(&self) -> usize {
        match self {
            Archetype::EliteAerobic => 0,
            Archetype::Diesel => 1,
            Archetype::TempoRunner => 2,
            Archetype::BurstRecover => 3,
            Archetype::PowerEndurance => 4,
            Archetype::DeliveryLimited => 5,
            Archetype::PeripheralLimited => 6,
        }
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Archetype::EliteAerobic => "ELITE_AEROBIC",
            Archetype::Diesel => "DIESEL",
            Archetype::TempoRunner => "TEMPO_RUNNER",
            Archetype::BurstRecover => "BURST_RECOVER",
            Archetype::PowerEndurance => "POWER_ENDURANCE",
            Archetype::DeliveryLimited => "DELIVERY_LIMITED",
            Archetype::PeripheralLimited => "PERIPHERAL_LIMITED",
        };
        write!(f, "{}", name)
    }
}

/// Declaration order doubles as the deterministic argmax tie-break.
const ARCHETYPES: [Archetype; 7] = [
    Archetype::EliteAerobic,
    Archetype::Diesel,
    Archetype::TempoRunner,
    Archetype::BurstRecover,
    Archetype::PowerEndurance,
    Archetype::DeliveryLimited,
    Archetype::PeripheralLimited,
];

/// Domain suggested by the stage speed relative to VT1/VT2 speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpeedDomainCheck {
    Moderate,
    Heavy,
    Severe,
    VerySevere,
    HeavySevereBorder,
}

impl SpeedDomainCheck {
    fn domain(&self) -> Option<IntensityDomain> {
        match self {
            SpeedDomainCheck::Moderate => Some(IntensityDomain::Moderate),
            SpeedDomainCheck::Heavy => Some(IntensityDomain::Heavy),
            SpeedDomainCheck::Severe => Some(IntensityDomain::Severe),
            SpeedDomainCheck::VerySevere => Some(IntensityDomain::VerySevere),
            SpeedDomainCheck::HeavySevereBorder => None,
        }
    }
}

/// Per-stage domain cross-check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageValidation {
    pub stage: u32,
    /// Upstream-assigned domain, when parseable.
    pub assigned: Option<IntensityDomain>,
    pub by_speed: Option<SpeedDomainCheck>,
    pub by_rer: Option<IntensityDomain>,
    pub expected: Option<IntensityDomain>,
    pub mismatch: bool,
}

/// Indirect fiber-type proxy from the heavy-domain slow component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiberTypeEstimate {
    /// Estimated type-I fraction range, e.g. "45-65%".
    pub type_i_fraction: String,
    /// Always "LOW": an indirect proxy, explicitly not diagnostic.
    pub confidence: String,
    pub note: String,
}

/// One remediation item keyed to a sub-elite kinetic metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPriority {
    pub focus: String,
    pub current: f64,
    pub target: f64,
    pub method: String,
    pub frequency: String,
    pub rationale: String,
}

/// Full kinetic phenotype report.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KineticPhenotype {
    pub status: PhenotypeStatus,
    pub stage_validation: Vec<StageValidation>,
    pub tau_moderate_s: Option<f64>,
    pub tau_heavy_s: Option<f64>,
    pub tau_severe_s: Option<f64>,
    pub tau_class_moderate: Option<TauClass>,
    pub tau_class_heavy: Option<TauClass>,
    pub severe_tau_flag: Option<SevereTauFlag>,
    pub sc_class_heavy: Option<SlowComponentClass>,
    pub sc_class_severe: Option<SlowComponentClass>,
    pub median_off_half_time_s: Option<f64>,
    pub recovery_class: Option<RecoveryClass>,
    pub limitation: Option<LimitationType>,
    pub fiber_type: Option<FiberTypeEstimate>,
    pub archetype: Option<Archetype>,
    /// Winning vote share in [0,1].
    pub archetype_confidence: f64,
    /// Votes per archetype, for explainability.
    pub vote_breakdown: BTreeMap<String, u32>,
    pub training_priorities: Vec<TrainingPriority>,
    /// Advisory data-quality flags; never terminal.
    pub flags: Vec<String>,
}

impl KineticPhenotype {
    fn with_status(status: PhenotypeStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }
}

/// State-free classifier over the upstream kinetics results.
pub struct KineticPhenotypeClassifier;

impl KineticPhenotypeClassifier {
    pub fn classify(results: &EngineResults, snapshot: &PhysioSnapshot) -> KineticPhenotype {
        let kinetics = &results.kinetics;
        if !kinetics.mode.eq_ignore_ascii_case(CONSTANT_WORK_RATE_MODE) {
            return KineticPhenotype::with_status(PhenotypeStatus::NoKineticsData);
        }
        if kinetics.stages.len() < 2 {
            return KineticPhenotype::with_status(PhenotypeStatus::InsufficientStages);
        }
        let vo2max_ref = if kinetics.vo2max_ml_min > 0.0 {
            kinetics.vo2max_ml_min
        } else {
            snapshot.capacity.vo2max_ml_min
        };
        if vo2max_ref <= 0.0 {
            return KineticPhenotype::with_status(PhenotypeStatus::NoVo2maxReference);
        }

        let stages = &kinetics.stages;
        let mut flags = Vec::new();

        let stage_validation = validate_domains(stages, snapshot, &mut flags);

        let tau_moderate_s = positive(stages.first().map(|s| s.tau_on_s));
        let tau_heavy_s = positive(stages.get(1).map(|s| s.tau_on_s));
        let tau_severe_s = positive(stages.get(2).map(|s| s.tau_on_s));

        let tau_class_moderate = tau_moderate_s.map(|t| TauClass::from_tau(t, TAU_MODERATE_BANDS));
        let tau_class_heavy = tau_heavy_s.map(|t| TauClass::from_tau(t, TAU_HEAVY_BANDS));
        let severe_tau_flag = tau_severe_s.map(|t| {
            if t > SEVERE_TAU_EXPECTED_S {
                SevereTauFlag::ExpectedSlow
            } else {
                SevereTauFlag::FastForSevere
            }
        });

        let sc_heavy = stages.get(1).map(|s| s.slow_component_pct);
        let sc_severe = stages.get(2).map(|s| s.slow_component_pct);
        let sc_class_heavy = sc_heavy.map(SlowComponentClass::from_pct);
        let sc_class_severe = sc_severe.map(SlowComponentClass::from_pct);

        let off_half_times: Vec<f64> = stages
            .iter()
            .map(|s| s.off_half_time_s)
            .filter(|t| *t > MIN_VALID_OFF_HALF_TIME_S)
            .collect();
        let median_off_half_time_s = if off_half_times.is_empty() {
            None
        } else {
            Some(Data::new(off_half_times).median())
        };
        let recovery_class = median_off_half_time_s.map(RecoveryClass::from_half_time);

        let limitation =
            limitation_type(tau_class_moderate, tau_class_heavy, sc_class_heavy);
        let fiber_type = sc_class_heavy.map(fiber_type_estimate);

        let (archetype, archetype_confidence, vote_breakdown) = score_archetypes(
            tau_class_moderate,
            tau_class_heavy,
            sc_class_heavy,
            snapshot.thresholds.vt1_pct_vo2max,
            snapshot.heavy_zone_width_pct(),
            recovery_class,
            limitation,
        );

        let training_priorities = training_priorities(
            tau_moderate_s,
            tau_class_moderate,
            tau_heavy_s,
            tau_class_heavy,
            sc_heavy,
            sc_class_heavy,
            median_off_half_time_s,
            recovery_class,
        );

        quality_flags(stages, tau_moderate_s, tau_heavy_s, &mut flags);

        debug!(
            archetype = %archetype.map(|a| a.to_string()).unwrap_or_else(|| "none".into()),
            confidence = archetype_confidence,
            "kinetic phenotype classified"
        );

        KineticPhenotype {
            status: PhenotypeStatus::Ok,
            stage_validation,
            tau_moderate_s,
            tau_heavy_s,
            tau_severe_s,
            tau_class_moderate,
            tau_class_heavy,
            severe_tau_flag,
            sc_class_heavy,
            sc_class_severe,
            median_off_half_time_s,
            recovery_class,
            limitation,
            fiber_type,
            archetype,
            archetype_confidence,
            vote_breakdown,
            training_priorities,
            flags,
        }
    }
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

/// Expected domain per stage index, by protocol convention.
fn expected_domain(index: usize) -> Option<IntensityDomain> {
    match index {
        0 => Some(IntensityDomain::Moderate),
        1 => Some(IntensityDomain::Heavy),
        2 => Some(IntensityDomain::Severe),
        3 => Some(IntensityDomain::VerySevere),
        _ => None,
    }
}

/// Cross-check each stage's assigned domain against speed ratio and RER.
fn validate_domains(
    stages: &[StageKinetics],
    snapshot: &PhysioSnapshot,
    flags: &mut Vec<String>,
) -> Vec<StageValidation> {
    let vt1_speed = snapshot.thresholds.vt1_speed_kmh;
    let vt2_speed = snapshot.thresholds.vt2_speed_kmh;

    stages
        .iter()
        .enumerate()
        .map(|(index, stage)| {
            let assigned = IntensityDomain::from_label(&stage.domain);
            let by_speed = speed_domain_check(stage.speed_kmh, vt1_speed, vt2_speed);
            let by_rer = rer_domain_check(stage.mean_rer);
            let expected = expected_domain(index);

            let mismatch = expected
                .map(|exp| {
                    let checks = [
                        assigned,
                        by_speed.and_then(|c| c.domain()),
                        by_rer,
                    ];
                    checks
                        .iter()
                        .flatten()
                        .any(|check| !check.matches_expected(exp))
                })
                .unwrap_or(false);
            if mismatch {
                flags.push(format!("DOMAIN_MISMATCH_STAGE_{}", stage.stage));
            }

            StageValidation {
                stage: stage.stage,
                assigned,
                by_speed,
                by_rer,
                expected,
                mismatch,
            }
        })
        .collect()
}

/// Domain from stage speed relative to threshold speeds.
///
/// Cascade thresholds: <92% of VT1 speed is moderate; <98% of VT2 speed is
/// heavy; above 110% of VT2 speed is very severe; at or above 95% severe;
/// anything left is the heavy/severe border.
fn speed_domain_check(speed: f64, vt1_speed: f64, vt2_speed: f64) -> Option<SpeedDomainCheck> {
    if speed <= 0.0 || vt1_speed <= 0.0 || vt2_speed <= 0.0 {
        return None;
    }
    let check = if speed < 0.92 * vt1_speed {
        SpeedDomainCheck::Moderate
    } else if speed < 0.98 * vt2_speed {
        SpeedDomainCheck::Heavy
    } else if speed > 1.10 * vt2_speed {
        SpeedDomainCheck::VerySevere
    } else if speed >= 0.95 * vt2_speed {
        SpeedDomainCheck::Severe
    } else {
        SpeedDomainCheck::HeavySevereBorder
    };
    Some(check)
}

/// Domain from the stage's mean respiratory exchange ratio.
fn rer_domain_check(mean_rer: f64) -> Option<IntensityDomain> {
    if mean_rer <= 0.0 {
        return None;
    }
    Some(if mean_rer < 0.95 {
        IntensityDomain::Moderate
    } else if mean_rer < 1.05 {
        IntensityDomain::Heavy
    } else {
        IntensityDomain::Severe
    })
}

/// 2x2 decision over (moderate tau rank, heavy tau rank), with a high heavy
/// slow component promoting a well-integrated profile to efficiency-limited.
fn limitation_type(
    tau_moderate: Option<TauClass>,
    tau_heavy: Option<TauClass>,
    sc_heavy: Option<SlowComponentClass>,
) -> Option<LimitationType> {
    let (moderate, heavy) = (tau_moderate?, tau_heavy?);
    let base = match (moderate.is_fast(), heavy.is_fast()) {
        (true, true) => LimitationType::WellIntegrated,
        (false, false) => LimitationType::DeliveryLimited,
        (true, false) => LimitationType::PeripheralLimited,
        (false, true) => LimitationType::MixedCheckData,
    };
    if base == LimitationType::WellIntegrated
        && matches!(
            sc_heavy,
            Some(SlowComponentClass::High) | Some(SlowComponentClass::VeryHigh)
        )
    {
        return Some(LimitationType::EfficiencyLimited);
    }
    Some(base)
}

/// Heavy-domain SC magnitude mapped to a type-I fraction range.
fn fiber_type_estimate(sc_class: SlowComponentClass) -> FiberTypeEstimate {
    let (range, note) = match sc_class {
        SlowComponentClass::Minimal => ("60-80%", "Consistent with slow-twitch dominance."),
        SlowComponentClass::Normal => ("45-65%", "Mixed fiber profile."),
        SlowComponentClass::High => ("35-55%", "Leaning fast-twitch."),
        SlowComponentClass::VeryHigh => ("25-45%", "Consistent with fast-twitch dominance."),
    };
    FiberTypeEstimate {
        type_i_fraction: range.to_string(),
        confidence: "LOW".to_string(),
        note: format!("{} Indirect proxy from the slow component; not diagnostic.", note),
    }
}

type Contribution = (&'static str, Vec<(Archetype, u32)>);

/// Fold ordered signal contributions into a vote vector, then take the
/// argmax once. First-encountered maximum in declaration order wins.
#[allow(clippy::too_many_arguments)]
fn score_archetypes(
    tau_moderate: Option<TauClass>,
    tau_heavy: Option<TauClass>,
    sc_heavy: Option<SlowComponentClass>,
    vt1_pct: f64,
    heavy_zone_width_pct: f64,
    recovery: Option<RecoveryClass>,
    limitation: Option<LimitationType>,
) -> (Option<Archetype>, f64, BTreeMap<String, u32>) {
    use Archetype::*;

    let mut contributions: Vec<Contribution> = Vec::new();

    if let Some(class) = tau_moderate {
        contributions.push((
            "tau_moderate",
            match class {
                TauClass::Elite => vec![(EliteAerobic, 3)],
                TauClass::Trained => vec![(Diesel, 2)],
                TauClass::Active => vec![(PowerEndurance, 1)],
                TauClass::Slow => vec![(DeliveryLimited, 3)],
            },
        ));
    }
    if let Some(class) = tau_heavy {
        contributions.push((
            "tau_heavy",
            match class {
                TauClass::Elite => vec![(EliteAerobic, 3)],
                TauClass::Trained => vec![(Diesel, 2), (TempoRunner, 1)],
                TauClass::Active => vec![(PeripheralLimited, 1)],
                TauClass::Slow => vec![(PeripheralLimited, 3)],
            },
        ));
    }
    if let Some(class) = sc_heavy {
        contributions.push((
            "slow_component",
            match class {
                SlowComponentClass::Minimal => vec![(EliteAerobic, 2)],
                SlowComponentClass::Normal => vec![(TempoRunner, 2)],
                SlowComponentClass::High => vec![(PowerEndurance, 2)],
                SlowComponentClass::VeryHigh => vec![(PeripheralLimited, 2), (PowerEndurance, 1)],
            },
        ));
    }
    if vt1_pct > 0.0 {
        contributions.push((
            "vt1_position",
            if vt1_pct >= 75.0 {
                vec![(EliteAerobic, 2)]
            } else if vt1_pct >= 65.0 {
                vec![(Diesel, 2)]
            } else if vt1_pct >= 55.0 {
                vec![(TempoRunner, 1)]
            } else {
                vec![(DeliveryLimited, 1)]
            },
        ));
    }
    if heavy_zone_width_pct > 0.0 {
        contributions.push((
            "heavy_zone_width",
            if heavy_zone_width_pct >= 25.0 {
                vec![(TempoRunner, 2), (Diesel, 1)]
            } else if heavy_zone_width_pct >= 15.0 {
                vec![(TempoRunner, 1)]
            } else {
                vec![(BurstRecover, 2)]
            },
        ));
    }
    if let Some(class) = recovery {
        contributions.push((
            "recovery",
            match class {
                RecoveryClass::Excellent => vec![(BurstRecover, 2), (EliteAerobic, 1)],
                RecoveryClass::Good => vec![(BurstRecover, 1)],
                RecoveryClass::Moderate => vec![],
                RecoveryClass::Slow => vec![(DeliveryLimited, 1), (PeripheralLimited, 1)],
            },
        ));
    }
    if let Some(limitation) = limitation {
        contributions.push((
            "limitation",
            match limitation {
                LimitationType::DeliveryLimited => vec![(DeliveryLimited, 3)],
                LimitationType::PeripheralLimited => vec![(PeripheralLimited, 3)],
                LimitationType::EfficiencyLimited => vec![(PowerEndurance, 2)],
                LimitationType::WellIntegrated => vec![(EliteAerobic, 1)],
                LimitationType::MixedCheckData => vec![],
            },
        ));
    }

    let mut votes = [0u32; ARCHETYPES.len()];
    for (_, weights) in &contributions {
        for (archetype, weight) in weights {
            votes[archetype.index()] += weight;
        }
    }

    let breakdown: BTreeMap<String, u32> = ARCHETYPES
        .iter()
        .zip(votes)
        .map(|(a, v)| (a.to_string(), v))
        .collect();

    let total: u32 = votes.iter().sum();
    if total == 0 {
        return (None, 0.0, breakdown);
    }
    // First maximum in declaration order.
    let (winner_index, winner_votes) = votes
        .iter()
        .enumerate()
        .fold((0usize, 0u32), |(best_i, best_v), (i, v)| {
            if *v > best_v {
                (i, *v)
            } else {
                (best_i, best_v)
            }
        });
    (
        Some(ARCHETYPES[winner_index]),
        winner_votes as f64 / total as f64,
        breakdown,
    )
}

/// Ordered remediation list for sub-elite kinetic metrics.
#[allow(clippy::too_many_arguments)]
fn training_priorities(
    tau_moderate_s: Option<f64>,
    tau_class_moderate: Option<TauClass>,
    tau_heavy_s: Option<f64>,
    tau_class_heavy: Option<TauClass>,
    sc_heavy: Option<f64>,
    sc_class_heavy: Option<SlowComponentClass>,
    median_off_half_time_s: Option<f64>,
    recovery_class: Option<RecoveryClass>,
) -> Vec<TrainingPriority> {
    let mut priorities = Vec::new();

    if let (Some(tau), Some(class)) = (tau_moderate_s, tau_class_moderate) {
        if class != TauClass::Elite {
            priorities.push(TrainingPriority {
                focus: "VO2 on-kinetics, moderate domain".to_string(),
                current: tau,
                target: TAU_MODERATE_BANDS[0],
                method: "30/30 s repeats at ~100% vVO2max".to_string(),
                frequency: "2x/week".to_string(),
                rationale: "Faster on-kinetics shrink the O2 deficit at every pace change."
                    .to_string(),
            });
        }
    }
    if let (Some(tau), Some(class)) = (tau_heavy_s, tau_class_heavy) {
        if class != TauClass::Elite {
            priorities.push(TrainingPriority {
                focus: "VO2 on-kinetics, heavy domain".to_string(),
                current: tau,
                target: TAU_HEAVY_BANDS[0],
                method: "Threshold intervals with fast 90 s starts".to_string(),
                frequency: "1-2x/week".to_string(),
                rationale: "Heavy-domain kinetics govern how quickly race surges settle."
                    .to_string(),
            });
        }
    }
    if let (Some(sc), Some(class)) = (sc_heavy, sc_class_heavy) {
        if matches!(class, SlowComponentClass::High | SlowComponentClass::VeryHigh) {
            priorities.push(TrainingPriority {
                focus: "Slow component, heavy domain".to_string(),
                current: sc.abs(),
                target: SC_BANDS[0],
                method: "Heavy-domain repeats stopping well short of failure".to_string(),
                frequency: "1x/week".to_string(),
                rationale: "A smaller slow component preserves economy late in sustained efforts."
                    .to_string(),
            });
        }
    }
    if let (Some(half_time), Some(class)) = (median_off_half_time_s, recovery_class) {
        if class != RecoveryClass::Excellent {
            priorities.push(TrainingPriority {
                focus: "Off-transient recovery".to_string(),
                current: half_time,
                target: RECOVERY_BANDS[0],
                method: "Interval floats instead of full stops; easy spin-downs".to_string(),
                frequency: "Every interval session".to_string(),
                rationale: "Faster off-kinetics mean more repeatable high-intensity work."
                    .to_string(),
            });
        }
    }
    priorities
}

/// Advisory data-quality flags over the stage set.
fn quality_flags(
    stages: &[StageKinetics],
    tau_moderate_s: Option<f64>,
    tau_heavy_s: Option<f64>,
    flags: &mut Vec<String>,
) {
    if let Some(severe) = stages.get(2) {
        if severe.duration_s > 0.0 && severe.duration_s < MIN_SEVERE_STAGE_S {
            flags.push("SHORT_SEVERE_STAGE".to_string());
        }
    }
    if let (Some(moderate), Some(heavy)) = (tau_moderate_s, tau_heavy_s) {
        if heavy < PRIMING_RATIO * moderate {
            flags.push("SUSPECTED_PRIMING".to_string());
        }
    }
    if let Some(stage) = stages.first() {
        if stage.r_squared > 0.0 && stage.r_squared < MIN_R2_MODERATE {
            flags.push("LOW_FIT_QUALITY_MODERATE".to_string());
        }
    }
    if let Some(stage) = stages.get(1) {
        if stage.r_squared > 0.0 && stage.r_squared < MIN_R2_HEAVY {
            flags.push("LOW_FIT_QUALITY_HEAVY".to_string());
        }
    }
}
