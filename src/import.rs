//! Input loading for the CLI boundary
//!
//! The analysis core never parses files; this module turns the on-disk
//! artifacts (signal table CSV, engine results JSON, training profile JSON)
//! into the in-memory contracts the core consumes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::engines::EngineResultSet;
use crate::error::{CpetError, ImportError, Result};
use crate::models::{channels, SignalTable, TrainingProfile};

/// CSV loader for the time-stamped signal table.
///
/// Every column except `Time_s` and the phase column is treated as a
/// numeric channel; blank or unparseable cells become nulls rather than
/// zeros.
pub struct SignalTableImporter;

impl SignalTableImporter {
    pub fn from_csv_path(path: &Path) -> Result<SignalTable> {
        if !path.exists() {
            return Err(ImportError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| ImportError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ImportError::ParseError {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let time_index = headers
            .iter()
            .position(|h| h == channels::TIME)
            .ok_or_else(|| ImportError::MissingColumn {
                column: channels::TIME.to_string(),
            })?;
        let phase_index = headers.iter().position(|h| h == channels::PHASE);

        let mut time_s = Vec::new();
        let mut phase = Vec::new();
        let mut columns: BTreeMap<String, Vec<Option<f64>>> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != time_index && Some(*i) != phase_index)
            .map(|(_, h)| (h.clone(), Vec::new()))
            .collect();

        for (row, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ImportError::ParseError {
                path: path.to_path_buf(),
                reason: format!("row {}: {}", row + 1, e),
            })?;

            let time_cell = record.get(time_index).unwrap_or_default();
            let t: f64 = time_cell.parse().map_err(|_| ImportError::ParseError {
                path: path.to_path_buf(),
                reason: format!("row {}: bad time value '{}'", row + 1, time_cell),
            })?;
            time_s.push(t);
            phase.push(
                phase_index
                    .and_then(|i| record.get(i))
                    .filter(|p| !p.is_empty())
                    .map(|p| p.to_string()),
            );

            for (i, header) in headers.iter().enumerate() {
                if i == time_index || Some(i) == phase_index {
                    continue;
                }
                let cell = record.get(i).unwrap_or_default();
                let value = if cell.is_empty() {
                    None
                } else {
                    match cell.parse::<f64>() {
                        Ok(v) => Some(v),
                        Err(_) => {
                            warn!(row = row + 1, column = %header, "unparseable cell, treated as null");
                            None
                        }
                    }
                };
                if let Some(column) = columns.get_mut(header) {
                    column.push(value);
                }
            }
        }

        debug!(
            samples = time_s.len(),
            channels = columns.len(),
            "signal table loaded"
        );
        SignalTable::from_columns(time_s, phase, columns)
    }
}

/// Load the raw per-engine result mapping from JSON.
pub fn load_engine_results(path: &Path) -> Result<EngineResultSet> {
    let contents = read(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        CpetError::Import(ImportError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

/// Load the athlete training profile from JSON.
pub fn load_profile(path: &Path) -> Result<TrainingProfile> {
    let contents = read(path)?;
    serde_json::from_str(&contents).map_err(|e| {
        CpetError::Import(ImportError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })
}

fn read(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ImportError::FileNotFound {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(fs::read_to_string(path)?)
}
