//! Normalized physiological snapshot
//!
//! Flattens the heterogeneous per-engine results into one attribute record
//! covering capacity, thresholds, zones, economy, ventilation, substrate and
//! recovery. Every field has a numeric-or-empty default so a missing
//! upstream engine degrades the snapshot, never the pipeline. Percentage
//! fields are clamped to [0,100], with 0 meaning "unavailable".

use serde::{Deserialize, Serialize};

use crate::engines::EngineResults;
use crate::models::{FitnessClass, O2PulseTrajectory};

/// Ranks the VO2max class must exceed the speed class by to call it an
/// economy problem rather than noise.
const ECONOMY_DIVERGENCE_RANKS: u8 = 2;

/// Aerobic capacity section of the snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapacitySummary {
    pub vo2max_ml_kg_min: f64,
    pub vo2max_ml_min: f64,
    pub hr_max: f64,
    pub hr_rest: f64,
    pub body_mass_kg: f64,
    pub fitness_class: FitnessClass,
}

/// Threshold positions as %VO2max, HR and speed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdSummary {
    pub vt1_pct_vo2max: f64,
    pub vt1_hr: f64,
    pub vt1_speed_kmh: f64,
    pub vt2_pct_vo2max: f64,
    pub vt2_hr: f64,
    pub vt2_speed_kmh: f64,
}

/// One training zone with HR and speed bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneSummary {
    pub label: String,
    pub hr_low: f64,
    pub hr_high: f64,
    pub speed_low: f64,
    pub speed_high: f64,
}

/// Running economy section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EconomySummary {
    pub running_economy_ml_kg_km: f64,
    /// Fitness class judged from threshold speed, when derivable.
    pub class_by_speed: Option<FitnessClass>,
    /// True when aerobic class outruns speed class by >= 2 ranks.
    pub economy_divergence: bool,
}

/// Ventilatory efficiency section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VentilatorySummary {
    pub ve_vco2_slope: f64,
    pub breathing_reserve_pct: f64,
}

/// Substrate oxidation section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstrateSummary {
    pub fatmax_g_min: f64,
    pub fatmax_hr: f64,
    pub crossover_pct_vo2max: f64,
}

/// Heart-rate recovery section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecoverySummary {
    pub hrr_1min: f64,
    pub hrr_3min: f64,
    pub o2_pulse_trajectory: O2PulseTrajectory,
}

/// Normalized per-test attribute record, derived once per run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhysioSnapshot {
    pub capacity: CapacitySummary,
    pub thresholds: ThresholdSummary,
    pub zones: Vec<ZoneSummary>,
    pub economy: EconomySummary,
    pub ventilatory: VentilatorySummary,
    pub substrate: SubstrateSummary,
    pub recovery: RecoverySummary,
}

impl PhysioSnapshot {
    /// Width of the heavy domain as %VO2max, 0 when either threshold is
    /// unavailable.
    pub fn heavy_zone_width_pct(&self) -> f64 {
        let t = &self.thresholds;
        if t.vt1_pct_vo2max > 0.0 && t.vt2_pct_vo2max > 0.0 {
            (t.vt2_pct_vo2max - t.vt1_pct_vo2max).max(0.0)
        } else {
            0.0
        }
    }

    /// Compact summary for embedding into generated artifacts.
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            vo2max_ml_kg_min: self.capacity.vo2max_ml_kg_min,
            fitness_class: self.capacity.fitness_class,
            vt1_pct_vo2max: self.thresholds.vt1_pct_vo2max,
            vt1_speed_kmh: self.thresholds.vt1_speed_kmh,
            vt2_pct_vo2max: self.thresholds.vt2_pct_vo2max,
            vt2_speed_kmh: self.thresholds.vt2_speed_kmh,
            hrr_1min: self.recovery.hrr_1min,
            fatmax_g_min: self.substrate.fatmax_g_min,
        }
    }
}

/// Key snapshot figures embedded into the training plan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub vo2max_ml_kg_min: f64,
    pub fitness_class: FitnessClass,
    pub vt1_pct_vo2max: f64,
    pub vt1_speed_kmh: f64,
    pub vt2_pct_vo2max: f64,
    pub vt2_speed_kmh: f64,
    pub hrr_1min: f64,
    pub fatmax_g_min: f64,
}

/// Pure mapping from the typed engine results to a snapshot.
pub struct PhysioSnapshotBuilder;

impl PhysioSnapshotBuilder {
    pub fn build(results: &EngineResults) -> PhysioSnapshot {
        let capacity = &results.capacity;
        let fitness_class = FitnessClass::from_label(&capacity.sport_class)
            .unwrap_or_else(|| FitnessClass::from_vo2max_rel(capacity.vo2max_ml_kg_min));

        let thresholds = ThresholdSummary {
            vt1_pct_vo2max: clamp_pct(results.thresholds.vt1.pct_vo2max),
            vt1_hr: non_negative(results.thresholds.vt1.hr),
            vt1_speed_kmh: non_negative(results.thresholds.vt1.speed_kmh),
            vt2_pct_vo2max: clamp_pct(results.thresholds.vt2.pct_vo2max),
            vt2_hr: non_negative(results.thresholds.vt2.hr),
            vt2_speed_kmh: non_negative(results.thresholds.vt2.speed_kmh),
        };

        let class_by_speed = FitnessClass::from_label(&results.economy.speed_class).or({
            if thresholds.vt2_speed_kmh > 0.0 {
                Some(FitnessClass::from_threshold_speed(thresholds.vt2_speed_kmh))
            } else {
                None
            }
        });
        let economy_divergence = class_by_speed
            .map(|speed_class| {
                fitness_class.rank() >= speed_class.rank() + ECONOMY_DIVERGENCE_RANKS
            })
            .unwrap_or(false);

        PhysioSnapshot {
            capacity: CapacitySummary {
                vo2max_ml_kg_min: non_negative(capacity.vo2max_ml_kg_min),
                vo2max_ml_min: non_negative(capacity.vo2max_ml_min),
                hr_max: non_negative(capacity.hr_max),
                hr_rest: non_negative(capacity.hr_rest),
                body_mass_kg: non_negative(capacity.body_mass_kg),
                fitness_class,
            },
            thresholds,
            zones: results
                .zones
                .zones
                .iter()
                .map(|z| ZoneSummary {
                    label: z.label.clone(),
                    hr_low: non_negative(z.hr_low),
                    hr_high: non_negative(z.hr_high),
                    speed_low: non_negative(z.speed_low),
                    speed_high: non_negative(z.speed_high),
                })
                .collect(),
            economy: EconomySummary {
                running_economy_ml_kg_km: non_negative(results.economy.running_economy_ml_kg_km),
                class_by_speed,
                economy_divergence,
            },
            ventilatory: VentilatorySummary {
                ve_vco2_slope: non_negative(results.ventilatory.ve_vco2_slope),
                breathing_reserve_pct: clamp_pct(results.ventilatory.breathing_reserve_pct),
            },
            substrate: SubstrateSummary {
                fatmax_g_min: non_negative(results.substrate.fatmax_g_min),
                fatmax_hr: non_negative(results.substrate.fatmax_hr),
                crossover_pct_vo2max: clamp_pct(results.substrate.crossover_pct_vo2max),
            },
            recovery: RecoverySummary {
                hrr_1min: non_negative(results.recovery.hrr_1min),
                hrr_3min: non_negative(results.recovery.hrr_3min),
                o2_pulse_trajectory: O2PulseTrajectory::from_label(
                    &results.recovery.o2_pulse_trajectory,
                ),
            },
        }
    }
}

/// Clamp a percentage to [0,100]; non-positive collapses to the 0 sentinel.
fn clamp_pct(value: f64) -> f64 {
    if value <= 0.0 || !value.is_finite() {
        0.0
    } else {
        value.min(100.0)
    }
}

fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::{
        CapacityResult, EconomyResult, EngineResults, ThresholdPoint, ThresholdsResult,
    };

    fn results_with(
        vo2max_rel: f64,
        sport_class: &str,
        vt2_speed: f64,
        speed_class: &str,
    ) -> EngineResults {
        EngineResults {
            capacity: CapacityResult {
                vo2max_ml_kg_min: vo2max_rel,
                sport_class: sport_class.to_string(),
                ..Default::default()
            },
            thresholds: ThresholdsResult {
                vt1: ThresholdPoint {
                    pct_vo2max: 60.0,
                    hr: 145.0,
                    speed_kmh: 10.0,
                },
                vt2: ThresholdPoint {
                    pct_vo2max: 85.0,
                    hr: 170.0,
                    speed_kmh: vt2_speed,
                },
            },
            economy: EconomyResult {
                speed_class: speed_class.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn empty_results_build_a_default_snapshot() {
        let snapshot = PhysioSnapshotBuilder::build(&EngineResults::default());
        assert_eq!(snapshot.capacity.fitness_class, FitnessClass::Untrained);
        assert_eq!(snapshot.thresholds.vt1_pct_vo2max, 0.0);
        assert!(!snapshot.economy.economy_divergence);
    }

    #[test]
    fn declared_class_wins_over_vo2max_banding() {
        let results = results_with(38.0, "COMPETITIVE", 15.0, "");
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert_eq!(snapshot.capacity.fitness_class, FitnessClass::Competitive);
    }

    #[test]
    fn economy_divergence_needs_two_ranks() {
        // Competitive engine (rank 3), recreational legs (rank 1).
        let results = results_with(60.0, "", 11.0, "RECREATIONAL");
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert!(snapshot.economy.economy_divergence);

        // One rank apart is not divergence.
        let results = results_with(60.0, "", 15.0, "TRAINED");
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert!(!snapshot.economy.economy_divergence);
    }

    #[test]
    fn no_speed_information_means_no_divergence() {
        let results = results_with(70.0, "", 0.0, "");
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert!(snapshot.economy.class_by_speed.is_none());
        assert!(!snapshot.economy.economy_divergence);
    }

    #[test]
    fn percentages_are_clamped() {
        let mut results = results_with(50.0, "", 14.0, "");
        results.thresholds.vt1.pct_vo2max = 140.0;
        results.thresholds.vt2.pct_vo2max = -5.0;
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert_eq!(snapshot.thresholds.vt1_pct_vo2max, 100.0);
        assert_eq!(snapshot.thresholds.vt2_pct_vo2max, 0.0);
    }

    #[test]
    fn heavy_zone_width_requires_both_thresholds() {
        let results = results_with(50.0, "", 14.0, "");
        let snapshot = PhysioSnapshotBuilder::build(&results);
        assert_eq!(snapshot.heavy_zone_width_pct(), 25.0);

        let mut missing = results_with(50.0, "", 14.0, "");
        missing.thresholds.vt1.pct_vo2max = 0.0;
        let snapshot = PhysioSnapshotBuilder::build(&missing);
        assert_eq!(snapshot.heavy_zone_width_pct(), 0.0);
    }
}
