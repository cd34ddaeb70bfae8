//! Limiter diagnosis rules
//!
//! Nine independent diagnostic rules inspect the snapshot and each may emit
//! one limiter candidate. Rules are pure predicate -> builder functions
//! evaluated in a fixed declared order; the stable descending sort on score
//! therefore breaks ties by rule order. The athlete's goal type boosts the
//! matching limiter once, capped at 100. At most three candidates survive,
//! with priorities 1..k.
//!
//! A sentinel value of 0 in any snapshot field means "unavailable" and never
//! satisfies a trigger on its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{FitnessClass, GoalType, TrainingProfile};
use crate::snapshot::PhysioSnapshot;

const MAX_LIMITERS: usize = 3;
const GOAL_BOOST: f64 = 1.5;

/// Enumerated limiter diagnoses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LimiterKind {
    LowBase,
    HighBaseLowThreshold,
    HighThresholdsLowCeiling,
    EconomyLimiter,
    SubstrateLimiter,
    VentilatoryLimiter,
    CardiacLimiter,
    RecoveryLimiter,
    RaceSpecific,
}

impl fmt::Display for LimiterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LimiterKind::LowBase => "LOW_BASE",
            LimiterKind::HighBaseLowThreshold => "HIGH_BASE_LOW_THRESHOLD",
            LimiterKind::HighThresholdsLowCeiling => "HIGH_THRESHOLDS_LOW_CEILING",
            LimiterKind::EconomyLimiter => "ECONOMY_LIMITER",
            LimiterKind::SubstrateLimiter => "SUBSTRATE_LIMITER",
            LimiterKind::VentilatoryLimiter => "VENTILATORY_LIMITER",
            LimiterKind::CardiacLimiter => "CARDIAC_LIMITER",
            LimiterKind::RecoveryLimiter => "RECOVERY_LIMITER",
            LimiterKind::RaceSpecific => "RACE_SPECIFIC",
        };
        write!(f, "{}", name)
    }
}

/// One ranked limiter candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limiter {
    pub kind: LimiterKind,
    /// Score in [0,100].
    pub score: f64,
    pub reason: String,
    pub method: String,
    /// Weekly training focus across zones 1..5, summing to ~100.
    pub zone_focus: [f64; 5],
    /// 1 = top priority; assigned after ranking.
    pub priority: u8,
}

impl Limiter {
    fn new(
        kind: LimiterKind,
        score: f64,
        reason: String,
        method: &str,
        zone_focus: [f64; 5],
    ) -> Self {
        Self {
            kind,
            score: score.clamp(0.0, 100.0),
            reason,
            method: method.to_string(),
            zone_focus,
            priority: 0,
        }
    }
}

/// Rule-based limiter scoring engine.
pub struct LimiterScorer;

/// Rule evaluation order. This order is the tie-break for equal scores.
const RULES: [fn(&PhysioSnapshot) -> Option<Limiter>; 9] = [
    low_base,
    high_base_low_threshold,
    high_thresholds_low_ceiling,
    economy_limiter,
    substrate_limiter,
    ventilatory_limiter,
    cardiac_limiter,
    recovery_limiter,
    race_specific,
];

impl LimiterScorer {
    /// Score all rules against the snapshot, boost the goal-matching
    /// candidate once, and return the top 3 with priorities assigned.
    ///
    /// An empty result is valid; the plan generator then falls back to a
    /// generic profile.
    pub fn score_limiters(snapshot: &PhysioSnapshot, profile: &TrainingProfile) -> Vec<Limiter> {
        let mut candidates: Vec<Limiter> =
            RULES.iter().filter_map(|rule| rule(snapshot)).collect();

        if let Some(boosted_kind) = goal_boost_target(profile.goal_type) {
            for candidate in &mut candidates {
                if candidate.kind == boosted_kind {
                    candidate.score = (candidate.score * GOAL_BOOST).min(100.0);
                    candidate.reason.push_str(" Matches the declared goal.");
                }
            }
        }

        // Stable sort keeps rule order for equal scores.
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(MAX_LIMITERS);
        for (i, candidate) in candidates.iter_mut().enumerate() {
            candidate.priority = (i + 1) as u8;
        }
        candidates
    }
}

/// Which limiter the declared goal type amplifies.
fn goal_boost_target(goal: GoalType) -> Option<LimiterKind> {
    match goal {
        GoalType::Fatmax => Some(LimiterKind::SubstrateLimiter),
        GoalType::Speed => Some(LimiterKind::EconomyLimiter),
        GoalType::Race => Some(LimiterKind::RaceSpecific),
        GoalType::Vo2max => Some(LimiterKind::HighThresholdsLowCeiling),
        GoalType::Threshold => Some(LimiterKind::HighBaseLowThreshold),
        GoalType::Endurance => Some(LimiterKind::LowBase),
        GoalType::Health => None,
    }
}

fn low_base(s: &PhysioSnapshot) -> Option<Limiter> {
    let vt1 = s.thresholds.vt1_pct_vo2max;
    if vt1 > 0.0 && vt1 < 55.0 {
        Some(Limiter::new(
            LimiterKind::LowBase,
            ((55.0 - vt1) * 3.0).min(100.0),
            format!(
                "VT1 at {:.0}% VO2max leaves little aerobic base under the first threshold.",
                vt1
            ),
            "High-volume zone 2 work below VT1",
            [20.0, 50.0, 20.0, 10.0, 0.0],
        ))
    } else {
        None
    }
}

fn high_base_low_threshold(s: &PhysioSnapshot) -> Option<Limiter> {
    let vt1 = s.thresholds.vt1_pct_vo2max;
    let vt2 = s.thresholds.vt2_pct_vo2max;
    if vt1 >= 58.0 && vt2 > 0.0 && vt2 < 82.0 {
        Some(Limiter::new(
            LimiterKind::HighBaseLowThreshold,
            ((82.0 - vt2) * 3.0).min(100.0),
            format!(
                "Solid base (VT1 {:.0}%) but VT2 at {:.0}% VO2max caps sustained pace.",
                vt1, vt2
            ),
            "Threshold intervals between VT1 and VT2",
            [10.0, 30.0, 25.0, 30.0, 5.0],
        ))
    } else {
        None
    }
}

fn high_thresholds_low_ceiling(s: &PhysioSnapshot) -> Option<Limiter> {
    let vt2 = s.thresholds.vt2_pct_vo2max;
    if vt2 >= 85.0 && s.capacity.fitness_class <= FitnessClass::Recreational {
        let vo2max = s.capacity.vo2max_ml_kg_min;
        let score = if vo2max > 0.0 {
            (40.0 + (90.0 - vo2max) * 1.5).min(100.0)
        } else {
            40.0
        };
        Some(Limiter::new(
            LimiterKind::HighThresholdsLowCeiling,
            score,
            format!(
                "Thresholds sit high ({:.0}% VO2max) but the aerobic ceiling itself is low.",
                vt2
            ),
            "VO2max intervals at or above VT2",
            [10.0, 25.0, 15.0, 20.0, 30.0],
        ))
    } else {
        None
    }
}

fn economy_limiter(s: &PhysioSnapshot) -> Option<Limiter> {
    if s.economy.economy_divergence {
        Some(Limiter::new(
            LimiterKind::EconomyLimiter,
            78.0,
            "Aerobic class outruns speed class by two or more ranks: a movement-economy penalty."
                .to_string(),
            "Running drills, strides and cadence work",
            [15.0, 35.0, 20.0, 20.0, 10.0],
        ))
    } else {
        None
    }
}

fn substrate_limiter(s: &PhysioSnapshot) -> Option<Limiter> {
    let crossover = s.substrate.crossover_pct_vo2max;
    let vt1 = s.thresholds.vt1_pct_vo2max;
    if crossover > 0.0 && vt1 > 0.0 && crossover < vt1 - 15.0 {
        Some(Limiter::new(
            LimiterKind::SubstrateLimiter,
            ((vt1 - crossover - 15.0) * 3.0).min(100.0).max(20.0),
            format!(
                "Crossover at {:.0}% VO2max, well below VT1 ({:.0}%): carbohydrate-dominant early.",
                crossover, vt1
            ),
            "Fasted low-intensity sessions at FATmax heart rate",
            [25.0, 50.0, 15.0, 10.0, 0.0],
        ))
    } else {
        None
    }
}

fn ventilatory_limiter(s: &PhysioSnapshot) -> Option<Limiter> {
    let slope = s.ventilatory.ve_vco2_slope;
    if slope > 34.0 {
        Some(Limiter::new(
            LimiterKind::VentilatoryLimiter,
            ((slope - 34.0) * 10.0).min(100.0).max(30.0),
            format!(
                "VE/VCO2 slope of {:.1} points at inefficient ventilation-perfusion matching.",
                slope
            ),
            "Breathing mechanics work plus moderate-intensity volume",
            [15.0, 35.0, 20.0, 20.0, 10.0],
        ))
    } else {
        None
    }
}

fn cardiac_limiter(s: &PhysioSnapshot) -> Option<Limiter> {
    let hrr = s.recovery.hrr_1min;
    if s.recovery.o2_pulse_trajectory.is_limited() && hrr > 0.0 && hrr < 12.0 {
        Some(Limiter::new(
            LimiterKind::CardiacLimiter,
            70.0,
            format!(
                "O2-pulse {} with HRR(1min) of {:.0} bpm: stroke-volume ceiling suspected.",
                match s.recovery.o2_pulse_trajectory {
                    crate::models::O2PulseTrajectory::Declining => "declining",
                    _ => "plateauing",
                },
                hrr
            ),
            "Conservative aerobic progression; consider medical review",
            [30.0, 45.0, 15.0, 10.0, 0.0],
        ))
    } else {
        None
    }
}

fn recovery_limiter(s: &PhysioSnapshot) -> Option<Limiter> {
    let hrr = s.recovery.hrr_1min;
    if hrr > 0.0 && hrr < 18.0 && s.capacity.fitness_class >= FitnessClass::Trained {
        Some(Limiter::new(
            LimiterKind::RecoveryLimiter,
            ((18.0 - hrr) * 8.0).min(100.0).max(25.0),
            format!(
                "HRR(1min) of {:.0} bpm is slow for a {} athlete: autonomic recovery lags.",
                hrr, s.capacity.fitness_class
            ),
            "Polarize intensity, add parasympathetic recovery work",
            [30.0, 50.0, 10.0, 10.0, 0.0],
        ))
    } else {
        None
    }
}

fn race_specific(s: &PhysioSnapshot) -> Option<Limiter> {
    let vt1 = s.thresholds.vt1_pct_vo2max;
    let vt2 = s.thresholds.vt2_pct_vo2max;
    if vt1 >= 62.0 && vt2 >= 88.0 && s.capacity.fitness_class >= FitnessClass::Competitive {
        Some(Limiter::new(
            LimiterKind::RaceSpecific,
            50.0,
            "Profile is well developed across the board; gains now come from race-specific work."
                .to_string(),
            "Race-pace blocks and event-specific simulation",
            [10.0, 25.0, 20.0, 25.0, 20.0],
        ))
    } else {
        None
    }
}
