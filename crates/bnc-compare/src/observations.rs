//! Fixed-point observation specifications.
//!
//! A specification is a CSV table whose header row names the variables:
//!
//! ```text
//! ID,A,B,C
//! o1,1,,0
//! o2,0,1,
//! ```
//!
//! Every cell is `1`, `0`, or empty. Empty cells leave the variable
//! unconstrained in that observation.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CompareError, Result};

/// Values of the constrained variables of one observation. Variables that are
/// not present are don't-care.
pub type PartialAssignment = BTreeMap<String, bool>;

/// One named row of the specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub values: PartialAssignment,
}

/// A parsed specification, observations kept in file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationSpec {
    /// Variable names declared in the header, trimmed.
    pub variables: Vec<String>,
    observations: Vec<Observation>,
}

impl ObservationSpec {
    /// Load a specification from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CompareError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let spec = Self::from_records(reader)?;
        debug!(
            "Loaded {} observations over {} variables from {}",
            spec.len(),
            spec.variables.len(),
            path.display()
        );
        Ok(spec)
    }

    /// Parse a specification from in-memory CSV text.
    pub fn parse(text: &str) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        Self::from_records(reader)
    }

    fn from_records<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record?,
            None => {
                return Err(CompareError::EmptySpec {
                    reason: "specification file is empty".into(),
                });
            }
        };
        // Blank header cells (a trailing comma) name no variable; their
        // column is ignored.
        let columns: Vec<String> = header.iter().skip(1).map(|h| h.trim().to_string()).collect();
        let variables: Vec<String> = columns.iter().filter(|c| !c.is_empty()).cloned().collect();
        if variables.is_empty() {
            return Err(CompareError::EmptySpec {
                reason: "list of variables is empty".into(),
            });
        }

        let mut spec = ObservationSpec {
            variables,
            observations: Vec::new(),
        };
        for record in records {
            let record = record?;
            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }

            let id = record.get(0).unwrap_or_default().trim().to_string();
            let mut values = PartialAssignment::new();
            for (var, cell) in columns.iter().zip(record.iter().skip(1)) {
                if var.is_empty() {
                    continue;
                }
                if let Some(value) = parse_cell(cell)? {
                    values.insert(var.clone(), value);
                }
            }
            spec.insert(Observation { id, values });
        }

        if spec.is_empty() {
            return Err(CompareError::EmptySpec {
                reason: "specification file has no observations".into(),
            });
        }
        Ok(spec)
    }

    /// A later row with an already used identifier replaces the earlier one.
    fn insert(&mut self, observation: Observation) {
        match self.observations.iter_mut().find(|o| o.id == observation.id) {
            Some(existing) => *existing = observation,
            None => self.observations.push(observation),
        }
    }

    pub fn get(&self, id: &str) -> Option<&PartialAssignment> {
        self.observations
            .iter()
            .find(|o| o.id == id)
            .map(|o| &o.values)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observation identifier to partial assignment.
    pub fn to_map(&self) -> BTreeMap<String, PartialAssignment> {
        self.observations
            .iter()
            .map(|o| (o.id.clone(), o.values.clone()))
            .collect()
    }

    /// JSON object `{id: {var: 0|1}}` handed to the constraint solver.
    pub fn to_solver_json(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for obs in &self.observations {
            let values: serde_json::Map<String, serde_json::Value> = obs
                .values
                .iter()
                .map(|(var, &v)| (var.clone(), serde_json::Value::from(u8::from(v))))
                .collect();
            root.insert(obs.id.clone(), serde_json::Value::Object(values));
        }
        serde_json::Value::Object(root)
    }
}

fn parse_cell(cell: &str) -> Result<Option<bool>> {
    match cell.trim() {
        "" => Ok(None),
        "1" => Ok(Some(true)),
        "0" => Ok(Some(false)),
        other => Err(CompareError::InvalidValue {
            value: other.to_string(),
        }),
    }
}
