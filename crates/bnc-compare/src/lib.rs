//! Semantic cross-validation of two Boolean network inference tools.
//!
//! Networks produced by a symbolic tool (a zip archive holding a partially
//! specified model and a color BDD) and by a constraint solver (text output
//! of a helper program) are reduced to canonical BDD fingerprints over a
//! shared variable domain and compared as exact sets. A batch orchestrator
//! repeats the comparison over a directory of triplets.

pub mod batch;
pub mod candidates;
pub mod canonical;
pub mod diff;
pub mod error;
pub mod inspect;
pub mod observations;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod solver;

pub use batch::{BatchConfig, DirectorySource, InProcessRunner, Orchestrator, ProcessRunner};
pub use candidates::{CandidateNetwork, CandidateSource, SolverOutput, SymbolicArchive, Tool};
pub use canonical::{Diagram, ExpressionEvaluator, Fingerprint, SharedDomain};
pub use diff::{CandidateSet, Comparison, DiffCounts, Verdict};
pub use error::{CompareError, Result};
pub use inspect::ArchiveSummary;
pub use observations::ObservationSpec;
pub use pipeline::{Triplet, compare_triplet};
pub use report::{BatchSummary, RunReport};
pub use solver::SolverConfig;
