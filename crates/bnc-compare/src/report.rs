//! Comparison reporting: human-readable summaries and JSON for single runs
//! and whole batches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::canonical::{ExpressionEvaluator, Fingerprint};
use crate::diff::{CandidateSet, Comparison, DiffCounts, Verdict};

/// Networks shown per side when a run differs.
pub const SAMPLE_LIMIT: usize = 5;

/// Outcome of comparing both tools on one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Descriptive label, usually the file stem of the archive.
    pub label: String,
    /// Whether the solver forbade fixed points beyond the observations.
    pub universal_fixed_points: bool,
    /// Networks enumerated per tool, duplicates included.
    pub symbolic_enumerated: usize,
    pub solver_enumerated: usize,
    /// Distinct networks per tool.
    pub symbolic_distinct: usize,
    pub solver_distinct: usize,
    pub counts: DiffCounts,
    pub verdict: Verdict,
    /// A few networks present only on the symbolic side, in canonical form.
    pub only_in_symbolic: Vec<BTreeMap<String, String>>,
    /// A few networks present only on the solver side, in canonical form.
    pub only_in_solver: Vec<BTreeMap<String, String>>,
}

impl RunReport {
    pub fn new(
        label: String,
        universal_fixed_points: bool,
        symbolic: &CandidateSet,
        solver: &CandidateSet,
        comparison: &Comparison,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Self {
        let sample = |side: &[Fingerprint]| -> Vec<BTreeMap<String, String>> {
            side.iter()
                .take(SAMPLE_LIMIT)
                .map(|fp| fp.describe(evaluator))
                .collect()
        };
        Self {
            label,
            universal_fixed_points,
            symbolic_enumerated: symbolic.enumerated,
            solver_enumerated: solver.enumerated,
            symbolic_distinct: symbolic.len(),
            solver_distinct: solver.len(),
            counts: comparison.counts(),
            verdict: comparison.verdict(),
            only_in_symbolic: sample(&comparison.only_in_a),
            only_in_solver: sample(&comparison.only_in_b),
        }
    }

    pub fn matched(&self) -> bool {
        self.verdict == Verdict::Match
    }

    /// Human-readable summary, the last line being the verdict sentence.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Networks in both: {}\n", self.counts.intersection));
        out.push_str(&format!(
            "Networks only in A (symbolic): {}\n",
            self.counts.only_in_a
        ));
        out.push_str(&format!(
            "Networks only in B (solver): {}\n",
            self.counts.only_in_b
        ));
        for (title, samples, total) in [
            ("A", &self.only_in_symbolic, self.counts.only_in_a),
            ("B", &self.only_in_solver, self.counts.only_in_b),
        ] {
            if samples.is_empty() {
                continue;
            }
            out.push_str(&format!("\nFirst {} networks only in {}:\n", samples.len(), title));
            for network in samples {
                let line: Vec<String> = network.iter().map(|(v, f)| format!("{v} = {f}")).collect();
                out.push_str(&format!("  {}\n", line.join("; ")));
            }
            if total > samples.len() {
                out.push_str(&format!("  ... and {} more\n", total - samples.len()));
            }
        }
        out.push('\n');
        out.push_str(if self.matched() {
            "Results match exactly!"
        } else {
            "Results differ!"
        });
        out
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("{}", self.summary());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Final state of one discovered triplet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub name: String,
    pub verdict: Verdict,
    /// Diff counts for MATCH/DIFFER runs.
    pub counts: Option<DiffCounts>,
    /// Why the triplet was skipped or failed.
    pub detail: Option<String>,
}

/// Append-only table of batch results, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub entries: Vec<BatchEntry>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: BatchEntry) {
        self.entries.push(entry);
    }

    /// Number of entries per label, labels sorted.
    pub fn counts_by_label(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.verdict.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.entries.iter().filter(|e| e.verdict == verdict).count()
    }

    /// True if every triplet that ran produced MATCH.
    pub fn all_matched(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(e.verdict, Verdict::Match | Verdict::Skipped))
    }

    pub fn summary(&self) -> String {
        let rule = "=".repeat(80);
        let mut out = format!("\n{rule}\nSUMMARY\n{rule}\n");
        for entry in &self.entries {
            out.push_str(&format!("{:60} {}\n", entry.name, entry.verdict));
        }
        out.push_str(&format!("\n{}\n", "-".repeat(80)));
        for (label, count) in self.counts_by_label() {
            out.push_str(&format!("{label:15} {count}\n"));
        }
        out
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        print!("{}", self.summary());
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
