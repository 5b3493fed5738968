use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchmarkError {
    #[error("Duplicate model id: {0}")]
    DuplicateId(String),

    #[error("Score out of range for model {model}: {axis} = {value} (max 100)")]
    ScoreOutOfRange {
        model: String,
        axis: &'static str,
        value: u8,
    },
}

/// Scores on the four benchmark axes, each 0-100.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BenchmarkScores {
    pub coding: u8,
    pub reasoning: u8,
    pub multimodal: u8,
    pub efficiency: u8,
}

impl BenchmarkScores {
    fn axes(&self) -> [(&'static str, u8); 4] {
        [
            ("coding", self.coding),
            ("reasoning", self.reasoning),
            ("multimodal", self.multimodal),
            ("efficiency", self.efficiency),
        ]
    }
}

/// How much weight to put on a record's scores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// One model's entry in the benchmark catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkRecord {
    pub id: String,
    pub name: String,
    pub scores: BenchmarkScores,
    pub source: String,
    pub confidence: Confidence,
}

/// The full catalog payload served to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BenchmarkCatalog {
    pub models: Vec<BenchmarkRecord>,
    pub last_updated: String,
}

/// Validates a set of records: ids must be unique and all scores in range.
pub fn validate_records(records: &[BenchmarkRecord]) -> Result<(), BenchmarkError> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(BenchmarkError::DuplicateId(record.id.clone()));
        }
        for (axis, value) in record.scores.axes() {
            if value > 100 {
                return Err(BenchmarkError::ScoreOutOfRange {
                    model: record.id.clone(),
                    axis,
                    value,
                });
            }
        }
    }
    Ok(())
}
