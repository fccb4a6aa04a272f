//! Candidate networks and the adapters that produce them.
//!
//! Both inference tools report fully specified networks in their own shape.
//! The adapters here normalize them to [`CandidateNetwork`] so that the rest of
//! the pipeline only ever sees one representation:
//!
//! - [`SymbolicArchive`] expands a results archive of the symbolic tool (a
//!   partially specified model plus a BDD of admissible parametrizations).
//! - [`SolverOutput`] reads the bnet-style text printed by the solver helper.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use biodivine_lib_bdd::Bdd;
use biodivine_lib_param_bn::symbolic_async_graph::{GraphColors, SymbolicAsyncGraph};
use biodivine_lib_param_bn::{BooleanNetwork, VariableId};
use serde::{Deserialize, Serialize};
use tracing::debug;
use zip::ZipArchive;

use crate::error::{CompareError, Result};

/// Archive entry holding the partially specified model (aeon format).
pub const MODEL_ENTRY: &str = "derived_model.aeon";
/// Archive entry holding the BDD of admissible parametrizations.
pub const COLORS_ENTRY: &str = "color_bdd.bdd";

/// Which tool produced a set of candidates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
pub enum Tool {
    /// Symbolic enumeration engine, read from a results archive.
    #[strum(serialize = "symbolic")]
    Symbolic,
    /// Constraint solver, run as a helper process.
    #[strum(serialize = "solver")]
    Solver,
}

/// A fully specified network: exactly one update expression per variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateNetwork {
    functions: BTreeMap<String, String>,
}

impl CandidateNetwork {
    pub fn new(functions: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            functions: functions.into_iter().collect(),
        }
    }

    pub fn expression(&self, variable: &str) -> Option<&str> {
        self.functions.get(variable).map(String::as_str)
    }

    /// Variable names in sorted order.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.functions
            .iter()
            .map(|(var, expr)| (var.as_str(), expr.as_str()))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Producer of candidate networks.
///
/// Each call to `visit` restarts the enumeration and feeds networks to the
/// visitor one at a time; an error from the visitor stops it.
pub trait CandidateSource {
    fn tool(&self) -> Tool;

    /// Returns the number of networks visited.
    fn visit(&self, visitor: &mut dyn FnMut(CandidateNetwork) -> Result<()>) -> Result<usize>;
}

/// Results archive of the symbolic tool.
pub struct SymbolicArchive {
    network: BooleanNetwork,
    graph: SymbolicAsyncGraph,
    colors: GraphColors,
}

impl SymbolicArchive {
    /// Read the two required entries from a zip archive.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CompareError::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
        let model = read_entry(&mut archive, MODEL_ENTRY)?;
        let colors = read_entry(&mut archive, COLORS_ENTRY)?;
        debug!("Read {} and {} from {}", MODEL_ENTRY, COLORS_ENTRY, path.display());
        Self::from_parts(&model, &colors)
    }

    /// Build from the textual model and the serialized color BDD.
    pub fn from_parts(model: &str, colors: &str) -> Result<Self> {
        let network = BooleanNetwork::try_from(model)
            .map_err(|e| CompareError::format(MODEL_ENTRY, e))?;
        let graph =
            SymbolicAsyncGraph::new(&network).map_err(|e| CompareError::format(MODEL_ENTRY, e))?;

        let bdd = Bdd::read_as_string(&mut colors.trim().as_bytes())
            .map_err(|e| CompareError::format(COLORS_ENTRY, e))?;
        let expected = graph.symbolic_context().bdd_variable_set().num_vars();
        if bdd.num_vars() != expected {
            return Err(CompareError::format(
                COLORS_ENTRY,
                format!(
                    "BDD has {} variables but the model context has {}",
                    bdd.num_vars(),
                    expected
                ),
            ));
        }
        let colors = GraphColors::new(bdd, graph.symbolic_context());

        Ok(Self {
            network,
            graph,
            colors,
        })
    }

    /// Variable names of the embedded model, in model order.
    pub fn variable_names(&self) -> Vec<String> {
        self.network
            .variables()
            .map(|v| self.network.get_variable_name(v).clone())
            .collect()
    }

    /// Approximate number of candidate networks in the archive.
    pub fn approx_count(&self) -> f64 {
        self.colors.approx_cardinality()
    }

    /// Update function of `variable` as written in the embedded model.
    pub fn original_update(&self, variable: &str) -> Option<String> {
        let id = self.find(variable)?;
        Some(match self.network.get_update_function(id) {
            Some(update) => update.to_string(&self.network),
            None => "(unspecified)".to_string(),
        })
    }

    /// Distinct admissible update functions of one variable, at most `limit`.
    pub fn update_variants(&self, variable: &str, limit: usize) -> Result<Vec<String>> {
        let id = self.find(variable).ok_or_else(|| {
            CompareError::format(MODEL_ENTRY, format!("variable `{variable}` not found"))
        })?;
        let projection = self.colors.fn_update_projection(&[id], &self.graph);
        Ok(projection
            .iter()
            .take(limit)
            .map(|valuation| valuation[0].1.to_string(&self.network))
            .collect())
    }

    fn find(&self, variable: &str) -> Option<VariableId> {
        self.network.as_graph().find_variable(variable)
    }
}

impl CandidateSource for SymbolicArchive {
    fn tool(&self) -> Tool {
        Tool::Symbolic
    }

    fn visit(&self, visitor: &mut dyn FnMut(CandidateNetwork) -> Result<()>) -> Result<usize> {
        let variables: Vec<VariableId> = self.network.variables().collect();
        let projection = self.colors.fn_update_projection(&variables, &self.graph);
        let mut count = 0;
        for valuation in projection.iter() {
            let functions = valuation.into_iter().map(|(id, update)| {
                (
                    self.network.get_variable_name(id).clone(),
                    update.to_string(&self.network),
                )
            });
            visitor(CandidateNetwork::new(functions))?;
            count += 1;
        }
        Ok(count)
    }
}

fn read_entry<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => {
            CompareError::format("results archive", format!("missing entry `{name}`"))
        }
        other => other.into(),
    })?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

/// Networks printed by the solver helper.
///
/// One `variable, expression` line per variable, networks separated by blank
/// lines. The `targets, factors` header and `#` comments are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverOutput {
    networks: Vec<CandidateNetwork>,
}

impl SolverOutput {
    pub fn parse(text: &str) -> Result<Self> {
        let mut networks = Vec::new();
        let mut current: BTreeMap<String, String> = BTreeMap::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                if !current.is_empty() {
                    networks.push(CandidateNetwork::new(std::mem::take(&mut current)));
                }
                continue;
            }
            let Some((var, expr)) = line.split_once(',') else {
                return Err(CompareError::format(
                    "solver output",
                    format!("line {}: expected `variable, expression`", index + 1),
                ));
            };
            let (var, expr) = (var.trim(), expr.trim());
            if var.eq_ignore_ascii_case("targets") && expr.eq_ignore_ascii_case("factors") {
                continue;
            }
            if current
                .insert(var.to_string(), normalize_literal(expr))
                .is_some()
            {
                return Err(CompareError::format(
                    "solver output",
                    format!("line {}: variable `{var}` defined twice in one network", index + 1),
                ));
            }
        }
        if !current.is_empty() {
            networks.push(CandidateNetwork::new(current));
        }
        Ok(Self { networks })
    }

    pub fn networks(&self) -> &[CandidateNetwork] {
        &self.networks
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}

impl From<Vec<CandidateNetwork>> for SolverOutput {
    fn from(networks: Vec<CandidateNetwork>) -> Self {
        Self { networks }
    }
}

impl CandidateSource for SolverOutput {
    fn tool(&self) -> Tool {
        Tool::Solver
    }

    fn visit(&self, visitor: &mut dyn FnMut(CandidateNetwork) -> Result<()>) -> Result<usize> {
        for network in &self.networks {
            visitor(network.clone())?;
        }
        Ok(self.networks.len())
    }
}

/// The solver writes constants as `1`/`0`; the evaluator expects `true`/`false`.
fn normalize_literal(expr: &str) -> String {
    match expr {
        "1" => "true".to_string(),
        "0" => "false".to_string(),
        other => other.to_string(),
    }
}
