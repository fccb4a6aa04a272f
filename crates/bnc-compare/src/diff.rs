//! Candidate set diffing and run classification.
//!
//! Compares two canonical candidate sets with exact set operations and
//! classifies the outcome as a [`Verdict`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candidates::{CandidateSource, Tool};
use crate::canonical::{ExpressionEvaluator, Fingerprint};
use crate::error::Result;

/// Final label of one comparison run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Match,
    Differ,
    Error,
    Timeout,
    Skipped,
}

/// Set of canonical networks produced by one tool.
///
/// Syntactically different copies of one network collapse into a single
/// element because membership is decided by [`Fingerprint`] equality.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub tool: Tool,
    /// Networks enumerated, duplicates included.
    pub enumerated: usize,
    fingerprints: HashSet<Fingerprint>,
}

impl CandidateSet {
    /// Drain `source`, canonicalizing every network it yields.
    pub fn collect(source: &dyn CandidateSource, evaluator: &dyn ExpressionEvaluator) -> Result<Self> {
        let mut fingerprints = HashSet::new();
        let enumerated = source.visit(&mut |network| {
            fingerprints.insert(Fingerprint::build(&network, evaluator)?);
            Ok(())
        })?;
        info!(
            "Extracted {} {} candidate networks ({} distinct)",
            enumerated,
            source.tool(),
            fingerprints.len()
        );
        Ok(Self {
            tool: source.tool(),
            enumerated,
            fingerprints,
        })
    }

    pub fn from_fingerprints(tool: Tool, fingerprints: impl IntoIterator<Item = Fingerprint>) -> Self {
        let fingerprints: HashSet<_> = fingerprints.into_iter().collect();
        Self {
            tool,
            enumerated: fingerprints.len(),
            fingerprints,
        }
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Compare against `other`, with `self` on the A side.
    pub fn diff(&self, other: &CandidateSet) -> Comparison {
        let mut only_in_a: Vec<Fingerprint> =
            self.fingerprints.difference(&other.fingerprints).cloned().collect();
        let mut only_in_b: Vec<Fingerprint> =
            other.fingerprints.difference(&self.fingerprints).cloned().collect();
        only_in_a.sort();
        only_in_b.sort();
        let intersection = self.fingerprints.intersection(&other.fingerprints).count();
        Comparison {
            only_in_a,
            only_in_b,
            intersection,
        }
    }
}

/// Sizes of the three regions of a set comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffCounts {
    pub only_in_a: usize,
    pub only_in_b: usize,
    pub intersection: usize,
}

impl core::fmt::Display for DiffCounts {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "both={}, only_a={}, only_b={}",
            self.intersection, self.only_in_a, self.only_in_b
        )
    }
}

/// Result of diffing two candidate sets. Difference members are sorted.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub only_in_a: Vec<Fingerprint>,
    pub only_in_b: Vec<Fingerprint>,
    pub intersection: usize,
}

impl Comparison {
    pub fn counts(&self) -> DiffCounts {
        DiffCounts {
            only_in_a: self.only_in_a.len(),
            only_in_b: self.only_in_b.len(),
            intersection: self.intersection,
        }
    }

    /// `MATCH` iff neither side has networks the other lacks.
    pub fn verdict(&self) -> Verdict {
        if self.only_in_a.is_empty() && self.only_in_b.is_empty() {
            Verdict::Match
        } else {
            Verdict::Differ
        }
    }
}
