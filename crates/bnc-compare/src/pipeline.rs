//! One end-to-end comparison: parse, enumerate both tools, canonicalize, diff.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candidates::SymbolicArchive;
use crate::canonical::{ExpressionEvaluator, SharedDomain};
use crate::diff::CandidateSet;
use crate::error::{CompareError, Result};
use crate::observations::ObservationSpec;
use crate::report::RunReport;
use crate::solver::SolverConfig;

/// Inputs of one comparison: symbolic results archive, partially specified
/// model for the solver, and the observation table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triplet {
    pub name: String,
    pub archive: PathBuf,
    pub model: PathBuf,
    pub data: PathBuf,
}

impl Triplet {
    /// Name the triplet after the archive's file stem.
    pub fn new(archive: impl Into<PathBuf>, model: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        let archive = archive.into();
        Self {
            name: stem_of(&archive),
            archive,
            model: model.into(),
            data: data.into(),
        }
    }

    /// First of the three paths that does not exist.
    pub fn missing_file(&self) -> Option<&Path> {
        [&self.archive, &self.model, &self.data]
            .into_iter()
            .find(|p| !p.is_file())
            .map(PathBuf::as_path)
    }
}

pub(crate) fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Run both tools on `triplet` and compare their candidate sets.
pub fn compare_triplet(triplet: &Triplet, solver: &SolverConfig) -> Result<RunReport> {
    if let Some(path) = triplet.missing_file() {
        return Err(CompareError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let spec = ObservationSpec::load(&triplet.data)?;
    info!(
        "Loaded {} observations for {}",
        spec.len(),
        triplet.name
    );

    info!("Processing symbolic results...");
    let archive = SymbolicArchive::open(&triplet.archive)?;
    info!("Loaded symbolic archive with ~{} networks", archive.approx_count());

    info!("Computing solver results...");
    let solver_output = solver.run(&triplet.model, &spec)?;

    let domain = SharedDomain::new(&archive.variable_names())?;
    check_observed_variables(&spec, &domain)?;

    info!("Comparing the results...");
    let symbolic = CandidateSet::collect(&archive, &domain)?;
    let solved = CandidateSet::collect(&solver_output, &domain)?;
    let comparison = symbolic.diff(&solved);

    Ok(RunReport::new(
        triplet.name.clone(),
        solver.universal_fixed_points,
        &symbolic,
        &solved,
        &comparison,
        &domain,
    ))
}

/// Observations may only mention variables of the shared domain.
fn check_observed_variables(spec: &ObservationSpec, domain: &dyn ExpressionEvaluator) -> Result<()> {
    let known = domain.variables();
    if spec.variables.iter().all(|v| known.contains(v)) {
        return Ok(());
    }
    let mut expected = known.to_vec();
    expected.sort();
    let mut found = spec.variables.clone();
    found.sort();
    Err(CompareError::DomainMismatch { expected, found })
}
