//! Per-variable view of the update functions admitted by a symbolic archive.

use serde::{Deserialize, Serialize};

use crate::candidates::SymbolicArchive;
use crate::error::Result;

/// Variants listed per variable when no limit is given.
pub const DEFAULT_VARIANT_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSummary {
    pub name: String,
    /// Update function as written in the partially specified model.
    pub original: String,
    /// Distinct admissible instantiations, up to the limit.
    pub variants: Vec<String>,
    /// True when the limit cut the list short.
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveSummary {
    pub approx_networks: f64,
    pub variables: Vec<VariableSummary>,
}

impl ArchiveSummary {
    pub fn build(archive: &SymbolicArchive, limit: usize) -> Result<Self> {
        let mut variables = Vec::new();
        for name in archive.variable_names() {
            // One extra variant tells us whether the list was cut.
            let mut variants = archive.update_variants(&name, limit.saturating_add(1))?;
            let truncated = variants.len() > limit;
            variants.truncate(limit);
            variables.push(VariableSummary {
                original: archive.original_update(&name).unwrap_or_default(),
                name,
                variants,
                truncated,
            });
        }
        Ok(Self {
            approx_networks: archive.approx_count(),
            variables,
        })
    }

    pub fn summary(&self) -> String {
        let mut out = format!("Candidate networks: {}\n", self.approx_networks);
        for var in &self.variables {
            out.push_str(&format!("\n{}: {}\n", var.name, var.original));
            let more = if var.truncated { "+" } else { "" };
            out.push_str(&format!("  {}{} admissible update functions\n", var.variants.len(), more));
            for variant in &var.variants {
                out.push_str(&format!("  - {variant}\n"));
            }
        }
        out
    }

    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
