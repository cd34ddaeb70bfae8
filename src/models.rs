//! Shared data model for CPET interpretation
//!
//! Holds the input-side records every pipeline component reads: the
//! time-stamped signal table, the athlete training profile, and the small
//! ordinal/categorical types (fitness class, intensity domain) that the
//! classifiers and scorers share.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CpetError, Result};

/// Well-known signal table column names.
///
/// Channel headers follow the upstream metabolic-cart export. `PHASE` is the
/// test-phase label column; the muscle-oxygenation candidates are probed in
/// order until one has enough coverage.
pub mod channels {
    pub const TIME: &str = "Time_s";
    pub const HR: &str = "HR_bpm";
    pub const VO2: &str = "VO2_ml_min";
    pub const VCO2: &str = "VCO2_ml_min";
    pub const O2_PULSE: &str = "O2_Pulse";
    pub const VE: &str = "VE_L_min";
    pub const BF: &str = "BF_1_min";
    pub const VT: &str = "VT_L";
    pub const RER: &str = "RER";
    pub const PHASE: &str = "Faza";

    /// Muscle-oxygenation channels, probed in this order.
    pub const MUSCLE_O2_CANDIDATES: [&str; 4] = ["SmO2", "SmO2_2", "TSI_pct", "MO2_pct"];
}

/// Column-oriented table of time-stamped physiological samples.
///
/// `time_s` is strictly non-decreasing (validated on construction). Numeric
/// channels are stored per column with `None` marking dropped/blank samples,
/// so gaps propagate as absent data rather than zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalTable {
    time_s: Vec<f64>,
    phase: Vec<Option<String>>,
    channels: BTreeMap<String, Vec<Option<f64>>>,
}

impl SignalTable {
    /// Build a table from parallel columns.
    ///
    /// Fails on length mismatches or a time column that runs backwards.
    pub fn from_columns(
        time_s: Vec<f64>,
        phase: Vec<Option<String>>,
        channels: BTreeMap<String, Vec<Option<f64>>>,
    ) -> Result<Self> {
        if phase.len() != time_s.len() {
            return Err(CpetError::Validation(format!(
                "phase column length {} does not match time column length {}",
                phase.len(),
                time_s.len()
            )));
        }
        for (name, column) in &channels {
            if column.len() != time_s.len() {
                return Err(CpetError::Validation(format!(
                    "channel '{}' length {} does not match time column length {}",
                    name,
                    column.len(),
                    time_s.len()
                )));
            }
        }
        if let Some(row) = time_s.windows(2).position(|w| w[1] < w[0]) {
            return Err(CpetError::Validation(format!(
                "time column decreases at row {}",
                row + 1
            )));
        }
        Ok(Self {
            time_s,
            phase,
            channels,
        })
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn time_s(&self) -> &[f64] {
        &self.time_s
    }

    pub fn phase(&self) -> &[Option<String>] {
        &self.phase
    }

    pub fn has_channel(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    pub fn channel(&self, name: &str) -> Option<&[Option<f64>]> {
        self.channels.get(name).map(|c| c.as_slice())
    }

    /// Index range of samples with `t_start <= t <= t_end`.
    pub fn window_indices(&self, t_start: f64, t_end: f64) -> std::ops::Range<usize> {
        let start = self.time_s.partition_point(|t| *t < t_start);
        let end = self.time_s.partition_point(|t| *t <= t_end);
        start..end.max(start)
    }

    /// Non-null values of a channel inside a time window.
    pub fn window_values(&self, name: &str, t_start: f64, t_end: f64) -> Vec<f64> {
        let Some(column) = self.channels.get(name) else {
            return Vec::new();
        };
        self.window_indices(t_start, t_end)
            .filter_map(|i| column[i])
            .collect()
    }

    /// First sample index whose phase label matches `label` (case-insensitive).
    pub fn phase_start_index(&self, labels: &[&str]) -> Option<usize> {
        self.phase.iter().position(|p| {
            p.as_deref()
                .map(|p| labels.iter().any(|l| p.eq_ignore_ascii_case(l)))
                .unwrap_or(false)
        })
    }
}

/// Training modality declared by the athlete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    #[default]
    Running,
    Cycling,
    Triathlon,
    /// Multi-transition mixed-modality event (run/erg/functional stations).
    Hybrid,
    Other,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Running => write!(f, "running"),
            Modality::Cycling => write!(f, "cycling"),
            Modality::Triathlon => write!(f, "triathlon"),
            Modality::Hybrid => write!(f, "hybrid"),
            Modality::Other => write!(f, "other"),
        }
    }
}

/// Goal type declared by the athlete; drives the limiter score boost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    #[default]
    Endurance,
    Threshold,
    Vo2max,
    Speed,
    Fatmax,
    Race,
    Health,
}

/// Athlete-supplied configuration, immutable per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingProfile {
    pub modality: Modality,
    pub weekly_hours: f64,
    pub weekly_days: i64,
    pub goal_type: GoalType,
    pub experience_years: f64,
    pub goal_notes: Option<String>,
    pub injury_notes: Option<String>,
}

impl Default for TrainingProfile {
    fn default() -> Self {
        Self {
            modality: Modality::Running,
            weekly_hours: 6.0,
            weekly_days: 5,
            goal_type: GoalType::Endurance,
            experience_years: 0.0,
            goal_notes: None,
            injury_notes: None,
        }
    }
}

/// Five-level ordinal fitness classification.
///
/// Rank order matters: the economy-divergence check and the limiter rules
/// compare classes by rank, never by VO2max directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FitnessClass {
    #[default]
    Untrained,
    Recreational,
    Trained,
    Competitive,
    Elite,
}

impl FitnessClass {
    /// Ordinal rank 0 (Untrained) .. 4 (Elite).
    pub fn rank(&self) -> u8 {
        match self {
            FitnessClass::Untrained => 0,
            FitnessClass::Recreational => 1,
            FitnessClass::Trained => 2,
            FitnessClass::Competitive => 3,
            FitnessClass::Elite => 4,
        }
    }

    /// Parse an upstream class label, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "UNTRAINED" => Some(FitnessClass::Untrained),
            "RECREATIONAL" => Some(FitnessClass::Recreational),
            "TRAINED" => Some(FitnessClass::Trained),
            "COMPETITIVE" => Some(FitnessClass::Competitive),
            "ELITE" => Some(FitnessClass::Elite),
            _ => None,
        }
    }

    /// Class from relative VO2max (ml/kg/min) banding.
    pub fn from_vo2max_rel(vo2max_rel: f64) -> Self {
        match vo2max_rel {
            v if v < 35.0 => FitnessClass::Untrained,
            v if v < 45.0 => FitnessClass::Recreational,
            v if v < 55.0 => FitnessClass::Trained,
            v if v < 65.0 => FitnessClass::Competitive,
            _ => FitnessClass::Elite,
        }
    }

    /// Class from threshold running speed (km/h) banding.
    pub fn from_threshold_speed(speed_kmh: f64) -> Self {
        match speed_kmh {
            v if v < 10.0 => FitnessClass::Untrained,
            v if v < 12.0 => FitnessClass::Recreational,
            v if v < 14.0 => FitnessClass::Trained,
            v if v < 16.0 => FitnessClass::Competitive,
            _ => FitnessClass::Elite,
        }
    }
}

impl fmt::Display for FitnessClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitnessClass::Untrained => write!(f, "Untrained"),
            FitnessClass::Recreational => write!(f, "Recreational"),
            FitnessClass::Trained => write!(f, "Trained"),
            FitnessClass::Competitive => write!(f, "Competitive"),
            FitnessClass::Elite => write!(f, "Elite"),
        }
    }
}

/// Exercise-intensity domain relative to the ventilatory thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntensityDomain {
    Moderate,
    Heavy,
    Severe,
    VerySevere,
}

impl IntensityDomain {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "MODERATE" => Some(IntensityDomain::Moderate),
            "HEAVY" => Some(IntensityDomain::Heavy),
            "SEVERE" => Some(IntensityDomain::Severe),
            "VERY_SEVERE" | "VERY SEVERE" => Some(IntensityDomain::VerySevere),
            _ => None,
        }
    }

    /// Severe and very-severe are equivalent for mismatch flagging.
    pub fn matches_expected(&self, expected: IntensityDomain) -> bool {
        use IntensityDomain::*;
        match (self, expected) {
            (Severe, VerySevere) | (VerySevere, Severe) => true,
            (a, b) => *a == b,
        }
    }
}

impl fmt::Display for IntensityDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityDomain::Moderate => write!(f, "MODERATE"),
            IntensityDomain::Heavy => write!(f, "HEAVY"),
            IntensityDomain::Severe => write!(f, "SEVERE"),
            IntensityDomain::VerySevere => write!(f, "VERY_SEVERE"),
        }
    }
}

/// O2-pulse trajectory over the final exercise stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum O2PulseTrajectory {
    Rising,
    Plateau,
    Declining,
    #[default]
    Unknown,
}

impl O2PulseTrajectory {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "RISING" => O2PulseTrajectory::Rising,
            "PLATEAU" => O2PulseTrajectory::Plateau,
            "DECLINING" => O2PulseTrajectory::Declining,
            _ => O2PulseTrajectory::Unknown,
        }
    }

    /// Plateau or declining O2-pulse points at a stroke-volume ceiling.
    pub fn is_limited(&self) -> bool {
        matches!(self, O2PulseTrajectory::Plateau | O2PulseTrajectory::Declining)
    }
}
