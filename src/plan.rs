//! Weekly training plan generation
//!
//! Maps the top-ranked limiter plus a weekly-frequency template onto a
//! concrete schedule: sessions with zones, durations and HR targets,
//! nutrition guidance per session type, a fixed four-week progression block
//! and a monitoring checklist. This generator never fails: a malformed
//! profile is clamped and an empty limiter list produces a generic plan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::limiters::{Limiter, LimiterKind};
use crate::models::TrainingProfile;
use crate::snapshot::{PhysioSnapshot, SnapshotSummary};

/// Default weekly zone distribution when no limiter was found.
const GENERIC_ZONE_DISTRIBUTION: [f64; 5] = [25.0, 45.0, 15.0, 10.0, 5.0];

/// Volume percentages for the BASE/BUILD/PEAK/RECOVERY block.
const PROGRESSION_VOLUME_PCT: [u32; 4] = [100, 110, 115, 60];

/// Session slot categories used by the weekly templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionType {
    Recovery,
    Easy,
    Key,
    Long,
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::Recovery => write!(f, "RECOVERY"),
            SessionType::Easy => write!(f, "EASY"),
            SessionType::Key => write!(f, "KEY"),
            SessionType::Long => write!(f, "LONG"),
        }
    }
}

/// One planned weekly session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedSession {
    pub day: String,
    pub session_type: SessionType,
    /// Primary zone 1..5.
    pub zone: u8,
    pub duration_min: u32,
    pub description: String,
    /// Formatted HR band, empty when zone HR data is unavailable.
    pub hr_target: String,
}

/// One week of the progression block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressionWeek {
    pub week: u8,
    pub phase: String,
    pub volume_pct: u32,
    pub focus: String,
}

/// Fully generated weekly plan; an immutable artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub philosophy: String,
    pub limiters: Vec<Limiter>,
    pub zone_distribution: [f64; 5],
    pub sessions: Vec<PlannedSession>,
    pub nutrition: BTreeMap<String, String>,
    pub progression: Vec<ProgressionWeek>,
    pub monitoring: Vec<String>,
    pub snapshot: SnapshotSummary,
}

/// Template-driven plan generator.
pub struct PlanGenerator;

impl PlanGenerator {
    pub fn generate(
        snapshot: &PhysioSnapshot,
        profile: &TrainingProfile,
        limiters: Vec<Limiter>,
    ) -> TrainingPlan {
        let days = profile.weekly_days.clamp(3, 7);
        let top = limiters.first().cloned();
        debug!(
            days,
            top_limiter = %top.as_ref().map(|l| l.kind.to_string()).unwrap_or_else(|| "none".into()),
            "generating weekly plan"
        );

        let sessions = weekly_template(days)
            .iter()
            .map(|(day, session_type, duration)| {
                build_session(day, *session_type, *duration, snapshot, top.as_ref())
            })
            .collect();

        let zone_distribution = top
            .as_ref()
            .map(|l| l.zone_focus)
            .unwrap_or(GENERIC_ZONE_DISTRIBUTION);

        TrainingPlan {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            philosophy: philosophy(top.as_ref().map(|l| l.kind)).to_string(),
            zone_distribution,
            sessions,
            nutrition: nutrition_guide(snapshot),
            progression: progression_block(),
            monitoring: monitoring_checklist(snapshot),
            snapshot: snapshot.summary(),
            limiters,
        }
    }
}

/// Fixed weekly templates: (day, slot, minutes). Day counts without a
/// template of their own fall back to the five-day layout.
fn weekly_template(days: i64) -> &'static [(&'static str, SessionType, u32)] {
    const THREE: &[(&str, SessionType, u32)] = &[
        ("Tuesday", SessionType::Key, 60),
        ("Thursday", SessionType::Easy, 45),
        ("Sunday", SessionType::Long, 90),
    ];
    const FIVE: &[(&str, SessionType, u32)] = &[
        ("Monday", SessionType::Recovery, 30),
        ("Tuesday", SessionType::Key, 60),
        ("Thursday", SessionType::Easy, 45),
        ("Friday", SessionType::Key, 50),
        ("Sunday", SessionType::Long, 100),
    ];
    const SIX: &[(&str, SessionType, u32)] = &[
        ("Monday", SessionType::Recovery, 30),
        ("Tuesday", SessionType::Key, 60),
        ("Wednesday", SessionType::Easy, 40),
        ("Thursday", SessionType::Easy, 45),
        ("Friday", SessionType::Key, 50),
        ("Sunday", SessionType::Long, 100),
    ];
    const SEVEN: &[(&str, SessionType, u32)] = &[
        ("Monday", SessionType::Recovery, 30),
        ("Tuesday", SessionType::Key, 60),
        ("Wednesday", SessionType::Easy, 40),
        ("Thursday", SessionType::Easy, 45),
        ("Friday", SessionType::Key, 50),
        ("Saturday", SessionType::Recovery, 30),
        ("Sunday", SessionType::Long, 100),
    ];
    match days {
        3 => THREE,
        6 => SIX,
        7 => SEVEN,
        _ => FIVE,
    }
}

fn build_session(
    day: &str,
    session_type: SessionType,
    duration_min: u32,
    snapshot: &PhysioSnapshot,
    top: Option<&Limiter>,
) -> PlannedSession {
    let (zone, description) = match session_type {
        SessionType::Recovery => (
            1,
            "Very easy spin or jog; conversation should feel effortless.".to_string(),
        ),
        SessionType::Easy => (2, easy_description(snapshot)),
        SessionType::Long => (2, long_description(snapshot)),
        SessionType::Key => return scale_session(day, duration_min, snapshot, top),
    };
    PlannedSession {
        day: day.to_string(),
        session_type,
        zone,
        duration_min,
        description,
        hr_target: zone_hr_target(snapshot, zone),
    }
}

/// Resolve a KEY slot into a concrete prescription driven by the top
/// limiter. Interval counts scale with fitness-class rank.
fn scale_session(
    day: &str,
    duration_min: u32,
    snapshot: &PhysioSnapshot,
    top: Option<&Limiter>,
) -> PlannedSession {
    let rank = snapshot.capacity.fitness_class.rank() as u32;
    let (zone, description) = match top.map(|l| l.kind) {
        Some(LimiterKind::HighBaseLowThreshold) | Some(LimiterKind::RaceSpecific) => {
            let reps = 2 + rank;
            let pace = format_pace(snapshot.thresholds.vt2_speed_kmh)
                .map(|p| format!(" at {}", p))
                .unwrap_or_default();
            (
                4,
                format!("{}x8 min threshold intervals{}, 2 min float between.", reps, pace),
            )
        }
        Some(LimiterKind::HighThresholdsLowCeiling) | Some(LimiterKind::VentilatoryLimiter) => {
            let reps = 3 + rank;
            (
                5,
                format!(
                    "{}x3 min VO2max intervals above VT2, equal jog recoveries.",
                    reps
                ),
            )
        }
        Some(LimiterKind::EconomyLimiter) => (
            3,
            "Drills and 8x20 s strides with full recovery; no interval work.".to_string(),
        ),
        Some(LimiterKind::SubstrateLimiter) => {
            let fatmax = snapshot.substrate.fatmax_hr;
            let target = if fatmax > 0.0 {
                format!(" holding ~{:.0} bpm (FATmax)", fatmax)
            } else {
                String::new()
            };
            (2, format!("Steady fat-oxidation ride/run{}.", target))
        }
        _ => (
            3,
            "Steady tempo just below VT1, finishing comfortably.".to_string(),
        ),
    };
    PlannedSession {
        day: day.to_string(),
        session_type: SessionType::Key,
        zone,
        duration_min,
        description,
        hr_target: zone_hr_target(snapshot, zone),
    }
}

fn easy_description(snapshot: &PhysioSnapshot) -> String {
    match format_pace(snapshot.thresholds.vt1_speed_kmh) {
        Some(pace) => format!("Easy aerobic run, no faster than {}.", pace),
        None => "Easy aerobic session well below VT1.".to_string(),
    }
}

fn long_description(snapshot: &PhysioSnapshot) -> String {
    let mut description = "Long endurance session at steady zone 2 effort.".to_string();
    if snapshot.substrate.fatmax_hr > 0.0 {
        description.push_str(&format!(
            " Fat-oxidation focus: hold ~{:.0} bpm (FATmax).",
            snapshot.substrate.fatmax_hr
        ));
    }
    description
}

/// HR band for a zone from the snapshot zone table, empty when absent.
fn zone_hr_target(snapshot: &PhysioSnapshot, zone: u8) -> String {
    snapshot
        .zones
        .get(zone.saturating_sub(1) as usize)
        .filter(|z| z.hr_low > 0.0 && z.hr_high > 0.0)
        .map(|z| format!("{:.0}-{:.0} bpm", z.hr_low, z.hr_high))
        .unwrap_or_default()
}

/// Convert speed in km/h into a "m:ss/km" pace string.
pub fn format_pace(speed_kmh: f64) -> Option<String> {
    if speed_kmh <= 0.0 || !speed_kmh.is_finite() {
        return None;
    }
    let pace_min = 60.0 / speed_kmh;
    let mut minutes = pace_min.floor() as u32;
    let mut seconds = ((pace_min - minutes as f64) * 60.0).round() as u32;
    if seconds == 60 {
        minutes += 1;
        seconds = 0;
    }
    Some(format!("{}:{:02}/km", minutes, seconds))
}

fn nutrition_guide(snapshot: &PhysioSnapshot) -> BTreeMap<String, String> {
    let mut guide = BTreeMap::new();
    guide.insert(
        SessionType::Recovery.to_string(),
        "No fueling needed; hydrate and keep protein at meals.".to_string(),
    );
    guide.insert(
        SessionType::Easy.to_string(),
        "Water only under 75 min; add 30 g/h carbohydrate beyond that.".to_string(),
    );
    guide.insert(
        SessionType::Key.to_string(),
        "60-90 g/h carbohydrate during; 20-30 g protein within 30 min after.".to_string(),
    );
    guide.insert(
        SessionType::Long.to_string(),
        "Start fueled; 60 g/h carbohydrate after the first hour.".to_string(),
    );
    if snapshot.substrate.fatmax_g_min > 0.0 {
        guide.insert(
            "FATMAX".to_string(),
            format!(
                "Fat oxidation peaks at {:.2} g/min. Train low before breakfast at most twice weekly; cap fasted work at 75 min.",
                snapshot.substrate.fatmax_g_min
            ),
        );
    }
    guide
}

fn progression_block() -> Vec<ProgressionWeek> {
    const PHASES: [(&str, &str); 4] = [
        ("BASE", "Establish the weekly rhythm at full planned volume."),
        ("BUILD", "Extend key-session work intervals."),
        ("PEAK", "Touch the highest sustainable load of the block."),
        ("RECOVERY", "Absorb: volume drops, intensity stays light."),
    ];
    PHASES
        .iter()
        .zip(PROGRESSION_VOLUME_PCT)
        .enumerate()
        .map(|(i, ((phase, focus), volume_pct))| ProgressionWeek {
            week: (i + 1) as u8,
            phase: phase.to_string(),
            volume_pct,
            focus: focus.to_string(),
        })
        .collect()
}

fn monitoring_checklist(snapshot: &PhysioSnapshot) -> Vec<String> {
    let vt1_pace = format_pace(snapshot.thresholds.vt1_speed_kmh)
        .unwrap_or_else(|| "your easy pace".to_string());
    vec![
        format!(
            "Heart rate at {} should drift down week over week at the same effort.",
            vt1_pace
        ),
        "Morning resting HR more than 5 bpm above normal: replace the day with recovery."
            .to_string(),
        "Two poor sleep nights in a row: drop the next key session to easy.".to_string(),
        "Re-test after the four-week block to re-baseline thresholds.".to_string(),
    ]
}

/// Plan philosophy keyed on the top limiter.
fn philosophy(kind: Option<LimiterKind>) -> &'static str {
    match kind {
        Some(LimiterKind::LowBase) => "Aerobic base first",
        Some(LimiterKind::HighBaseLowThreshold) => "Raise the sustainable fraction",
        Some(LimiterKind::HighThresholdsLowCeiling) => "Lift the ceiling",
        Some(LimiterKind::EconomyLimiter) => "Speed through economy",
        Some(LimiterKind::SubstrateLimiter) => "Metabolic flexibility",
        Some(LimiterKind::VentilatoryLimiter) => "Breathe cheaper",
        Some(LimiterKind::CardiacLimiter) => "Protect and build the pump",
        Some(LimiterKind::RecoveryLimiter) => "Recover harder than you train",
        Some(LimiterKind::RaceSpecific) => "Sharpen for the event",
        None => "General endurance development",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FitnessClass;

    fn profile_with_days(days: i64) -> TrainingProfile {
        TrainingProfile {
            weekly_days: days,
            ..Default::default()
        }
    }

    #[test]
    fn pace_formatting_round_trips() {
        assert_eq!(format_pace(12.0).unwrap(), "5:00/km");
        assert_eq!(format_pace(10.0).unwrap(), "6:00/km");
        assert_eq!(format_pace(13.0).unwrap(), "4:37/km");
        assert!(format_pace(0.0).is_none());
    }

    #[test]
    fn day_counts_clamp_and_fall_back() {
        let snapshot = PhysioSnapshot::default();
        for (days, expected_sessions) in [(0, 3), (3, 3), (4, 5), (5, 5), (6, 6), (7, 7), (12, 7)] {
            let plan =
                PlanGenerator::generate(&snapshot, &profile_with_days(days), Vec::new());
            assert_eq!(plan.sessions.len(), expected_sessions, "days={}", days);
        }
    }

    #[test]
    fn empty_limiters_produce_generic_plan() {
        let plan = PlanGenerator::generate(
            &PhysioSnapshot::default(),
            &TrainingProfile::default(),
            Vec::new(),
        );
        assert_eq!(plan.philosophy, "General endurance development");
        assert_eq!(plan.zone_distribution, GENERIC_ZONE_DISTRIBUTION);
        assert!(!plan.sessions.is_empty());
    }

    #[test]
    fn threshold_limiter_scales_reps_with_fitness_rank() {
        let mut snapshot = PhysioSnapshot::default();
        snapshot.capacity.fitness_class = FitnessClass::Competitive;
        snapshot.thresholds.vt2_speed_kmh = 14.0;
        let limiter = Limiter {
            kind: LimiterKind::HighBaseLowThreshold,
            score: 60.0,
            reason: String::new(),
            method: String::new(),
            zone_focus: [10.0, 30.0, 25.0, 30.0, 5.0],
            priority: 1,
        };
        let plan = PlanGenerator::generate(
            &snapshot,
            &TrainingProfile::default(),
            vec![limiter],
        );
        let key = plan
            .sessions
            .iter()
            .find(|s| s.session_type == SessionType::Key)
            .unwrap();
        // Competitive rank 3 -> 5 reps, paced off VT2 speed.
        assert!(key.description.starts_with("5x8 min"));
        assert!(key.description.contains("4:17/km"));
        assert_eq!(key.zone, 4);
    }

    #[test]
    fn economy_limiter_swaps_intervals_for_drills() {
        let limiter = Limiter {
            kind: LimiterKind::EconomyLimiter,
            score: 78.0,
            reason: String::new(),
            method: String::new(),
            zone_focus: [15.0, 35.0, 20.0, 20.0, 10.0],
            priority: 1,
        };
        let plan = PlanGenerator::generate(
            &PhysioSnapshot::default(),
            &TrainingProfile::default(),
            vec![limiter],
        );
        let key = plan
            .sessions
            .iter()
            .find(|s| s.session_type == SessionType::Key)
            .unwrap();
        assert!(key.description.contains("strides"));
        assert!(!key.description.contains("intervals"));
    }

    #[test]
    fn long_session_annotates_fatmax_only_when_present() {
        let mut snapshot = PhysioSnapshot::default();
        let plan = PlanGenerator::generate(
            &snapshot,
            &TrainingProfile::default(),
            Vec::new(),
        );
        let long = plan
            .sessions
            .iter()
            .find(|s| s.session_type == SessionType::Long)
            .unwrap();
        assert!(!long.description.contains("FATmax"));

        snapshot.substrate.fatmax_hr = 132.0;
        let plan = PlanGenerator::generate(&snapshot, &TrainingProfile::default(), Vec::new());
        let long = plan
            .sessions
            .iter()
            .find(|s| s.session_type == SessionType::Long)
            .unwrap();
        assert!(long.description.contains("132 bpm"));
    }

    #[test]
    fn progression_block_is_fixed() {
        let plan = PlanGenerator::generate(
            &PhysioSnapshot::default(),
            &TrainingProfile::default(),
            Vec::new(),
        );
        let volumes: Vec<u32> = plan.progression.iter().map(|w| w.volume_pct).collect();
        assert_eq!(volumes, vec![100, 110, 115, 60]);
        assert_eq!(plan.progression[3].phase, "RECOVERY");
    }

    #[test]
    fn fatmax_nutrition_block_gated_on_rate() {
        let mut snapshot = PhysioSnapshot::default();
        let plan = PlanGenerator::generate(&snapshot, &TrainingProfile::default(), Vec::new());
        assert!(!plan.nutrition.contains_key("FATMAX"));

        snapshot.substrate.fatmax_g_min = 0.55;
        let plan = PlanGenerator::generate(&snapshot, &TrainingProfile::default(), Vec::new());
        assert!(plan.nutrition["FATMAX"].contains("0.55 g/min"));
    }
}
