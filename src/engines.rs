//! Typed view over the upstream engine result set
//!
//! Upstream analysis stages hand the core a mapping keyed by engine
//! identifier (`"E01"`..`"E19"`), each holding that engine's result record.
//! This module converts the untyped mapping into one defaulted struct per
//! engine of interest, exactly once, at the pipeline boundary. A missing or
//! malformed engine degrades its section to defaults and never raises; this
//! is the single place the degradation policy lives.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// Raw per-engine result mapping as produced upstream.
pub type EngineResultSet = HashMap<String, Value>;

/// Engine identifiers the core consumes.
pub mod engine_ids {
    pub const CAPACITY: &str = "E01";
    pub const THRESHOLDS: &str = "E02";
    pub const ZONES: &str = "E03";
    pub const ECONOMY: &str = "E05";
    pub const VENTILATORY: &str = "E07";
    pub const SUBSTRATE: &str = "E09";
    pub const RECOVERY: &str = "E11";
    pub const KINETICS: &str = "E13";
}

/// Aerobic capacity engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityResult {
    pub vo2max_ml_min: f64,
    pub vo2max_ml_kg_min: f64,
    pub hr_max: f64,
    pub hr_rest: f64,
    pub body_mass_kg: f64,
    /// Declared fitness class label, e.g. "TRAINED".
    pub sport_class: String,
}

/// One ventilatory threshold position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdPoint {
    pub pct_vo2max: f64,
    pub hr: f64,
    pub speed_kmh: f64,
}

/// Threshold detection engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsResult {
    pub vt1: ThresholdPoint,
    pub vt2: ThresholdPoint,
}

/// One training zone boundary pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneBound {
    pub label: String,
    pub hr_low: f64,
    pub hr_high: f64,
    pub speed_low: f64,
    pub speed_high: f64,
}

/// Zone model engine output (five zones expected).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ZonesResult {
    pub zones: Vec<ZoneBound>,
}

/// Running economy engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyResult {
    pub running_economy_ml_kg_km: f64,
    /// Fitness class judged from threshold speed alone, e.g. "RECREATIONAL".
    pub speed_class: String,
}

/// Ventilatory efficiency engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VentilatoryResult {
    pub ve_vco2_slope: f64,
    pub breathing_reserve_pct: f64,
}

/// Substrate oxidation engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubstrateResult {
    pub fatmax_g_min: f64,
    pub fatmax_hr: f64,
    pub crossover_pct_vo2max: f64,
}

/// Heart-rate recovery engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryResult {
    pub hrr_1min: f64,
    pub hrr_3min: f64,
    /// "RISING" / "PLATEAU" / "DECLINING".
    pub o2_pulse_trajectory: String,
}

/// One constant-work-rate stage with its fitted on/off kinetics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StageKinetics {
    pub stage: u32,
    /// Upstream-assigned intensity domain label.
    pub domain: String,
    pub t_start_s: f64,
    pub t_end_s: f64,
    pub speed_kmh: f64,
    pub duration_s: f64,
    /// Fitted on-transient time constant, seconds.
    pub tau_on_s: f64,
    /// Slow component as % of the primary amplitude.
    pub slow_component_pct: f64,
    /// Goodness of the on-transient fit.
    pub r_squared: f64,
    /// Off-transient half-time, seconds; <=0 means not fitted.
    pub off_half_time_s: f64,
    pub mean_rer: f64,
}

/// Kinetics engine output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KineticsResult {
    /// Protocol mode; the phenotype classifier requires "CONSTANT_WORK_RATE".
    pub mode: String,
    pub vo2max_ml_min: f64,
    pub stages: Vec<StageKinetics>,
}

/// All engine sections the core reads, each defaulted when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineResults {
    pub capacity: CapacityResult,
    pub thresholds: ThresholdsResult,
    pub zones: ZonesResult,
    pub economy: EconomyResult,
    pub ventilatory: VentilatoryResult,
    pub substrate: SubstrateResult,
    pub recovery: RecoveryResult,
    pub kinetics: KineticsResult,
}

impl EngineResults {
    /// Convert the raw result mapping into the typed contract.
    pub fn from_result_set(results: &EngineResultSet) -> Self {
        Self {
            capacity: section(results, engine_ids::CAPACITY),
            thresholds: section(results, engine_ids::THRESHOLDS),
            zones: section(results, engine_ids::ZONES),
            economy: section(results, engine_ids::ECONOMY),
            ventilatory: section(results, engine_ids::VENTILATORY),
            substrate: section(results, engine_ids::SUBSTRATE),
            recovery: section(results, engine_ids::RECOVERY),
            kinetics: section(results, engine_ids::KINETICS),
        }
    }
}

fn section<T: DeserializeOwned + Default>(results: &EngineResultSet, id: &str) -> T {
    match results.get(id) {
        None => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            warn!(engine = id, error = %err, "malformed engine result, using defaults");
            T::default()
        }),
    }
}
