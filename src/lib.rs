// Library interface for cpetrs modules
// This allows integration tests to access the core functionality

pub mod config;
pub mod crosscorr;
pub mod engines;
pub mod error;
pub mod import;
pub mod kinetics;
pub mod limiters;
pub mod logging;
pub mod models;
pub mod plan;
pub mod report;
pub mod segment;
pub mod snapshot;

// Re-export commonly used types for convenience
pub use crosscorr::{CrossCorrelationAnalyzer, CrossCorrelationReport};
pub use engines::{EngineResultSet, EngineResults};
pub use error::{CpetError, Result};
pub use kinetics::{KineticPhenotype, KineticPhenotypeClassifier};
pub use limiters::{Limiter, LimiterKind, LimiterScorer};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{FitnessClass, GoalType, Modality, SignalTable, TrainingProfile};
pub use plan::{PlanGenerator, TrainingPlan};
pub use report::{run_full_analysis, AnalysisReport};
pub use snapshot::{PhysioSnapshot, PhysioSnapshotBuilder};
