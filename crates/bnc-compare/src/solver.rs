//! Invocation of the constraint-solver helper.
//!
//! The helper is an external program called as
//! `<program> [args...] <model.aeon> [--universal-fps]`. It receives the
//! observations as JSON on stdin and prints the admissible networks in the
//! text form read by [`SolverOutput`].

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::candidates::SolverOutput;
use crate::error::{CompareError, Result};
use crate::observations::ObservationSpec;
use crate::process::run_with_deadline;

/// Program name used when none is configured.
pub const DEFAULT_SOLVER: &str = "bonesis-enumerate";

/// Flag that asks the solver to forbid fixed points beyond the observed ones.
pub const UNIVERSAL_FPS_FLAG: &str = "--universal-fps";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverConfig {
    pub program: String,
    /// Extra arguments placed before the model path.
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    pub universal_fixed_points: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            program: DEFAULT_SOLVER.to_string(),
            args: Vec::new(),
            timeout: None,
            universal_fixed_points: false,
        }
    }
}

impl SolverConfig {
    pub fn command(&self, model: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(model);
        if self.universal_fixed_points {
            cmd.arg(UNIVERSAL_FPS_FLAG);
        }
        cmd
    }

    /// Run the helper on `model` constrained by `spec`.
    pub fn run(&self, model: &Path, spec: &ObservationSpec) -> Result<SolverOutput> {
        if !model.is_file() {
            return Err(CompareError::MissingFile {
                path: model.to_path_buf(),
            });
        }
        let input = serde_json::to_vec(&spec.to_solver_json())?;
        let output = run_with_deadline(self.command(model), Some(input), self.timeout, &self.program)?;
        if !output.success() {
            return Err(output.failure(&self.program));
        }

        let networks = SolverOutput::parse(&output.stdout)?;
        info!(
            "Solver {} returned {} candidate networks",
            self.program,
            networks.len()
        );
        Ok(networks)
    }
}
