//! Batch comparison over a directory of triplets.
//!
//! Each archive found by a [`TripletSource`] moves through
//! `DISCOVERED -> SKIPPED` or `DISCOVERED -> RUNNING -> <verdict>`. Triplets
//! are processed one at a time, in discovery order, and a failing triplet is
//! recorded without stopping the batch.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::diff::Verdict;
use crate::error::{CompareError, Result};
use crate::pipeline::{Triplet, compare_triplet, stem_of};
use crate::process::run_with_deadline;
use crate::report::{BatchEntry, BatchSummary, RunReport};
use crate::solver::{SolverConfig, UNIVERSAL_FPS_FLAG};

pub const ARCHIVE_EXTENSION: &str = "zip";
pub const MODEL_EXTENSION: &str = "aeon";
pub const DATA_EXTENSION: &str = "csv";

/// Wall-clock budget of one triplet when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    pub universal_fixed_points: bool,
    /// Per-triplet deadline; `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            universal_fixed_points: false,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }
}

/// What discovery found for one archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Complete(Triplet),
    /// A companion file is absent; the triplet will be skipped.
    Incomplete {
        name: String,
        archive: PathBuf,
        missing: PathBuf,
    },
}

impl Discovery {
    pub fn name(&self) -> &str {
        match self {
            Discovery::Complete(triplet) => &triplet.name,
            Discovery::Incomplete { name, .. } => name,
        }
    }
}

/// Finds the triplets of a batch.
pub trait TripletSource {
    fn discover(&self) -> Result<Vec<Discovery>>;
}

/// Runs one complete triplet.
pub trait TripletRunner {
    fn run(&mut self, triplet: &Triplet, config: &BatchConfig) -> Result<RunReport>;
}

impl<F> TripletRunner for F
where
    F: FnMut(&Triplet, &BatchConfig) -> Result<RunReport>,
{
    fn run(&mut self, triplet: &Triplet, config: &BatchConfig) -> Result<RunReport> {
        self(triplet, config)
    }
}

/// Every `*.zip` of a directory, paired with same-stem `.aeon` and `.csv`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn archives(&self) -> Result<Vec<PathBuf>> {
        if !self.dir.is_dir() {
            return Err(CompareError::MissingFile {
                path: self.dir.clone(),
            });
        }
        let mut archives = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && has_extension(&path, ARCHIVE_EXTENSION) {
                archives.push(path);
            }
        }
        archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(archives)
    }
}

impl TripletSource for DirectorySource {
    fn discover(&self) -> Result<Vec<Discovery>> {
        let archives = self.archives()?;
        if archives.is_empty() {
            return Err(CompareError::format(
                "batch directory",
                format!("no .{ARCHIVE_EXTENSION} archives in {}", self.dir.display()),
            ));
        }

        Ok(archives
            .into_iter()
            .map(|archive| {
                let model = archive.with_extension(MODEL_EXTENSION);
                let data = archive.with_extension(DATA_EXTENSION);
                let name = stem_of(&archive);
                let absent = [&model, &data]
                    .into_iter()
                    .find(|p| !p.is_file())
                    .cloned();
                match absent {
                    Some(missing) => Discovery::Incomplete {
                        name,
                        missing,
                        archive,
                    },
                    None => Discovery::Complete(Triplet {
                        name,
                        archive,
                        model,
                        data,
                    }),
                }
            })
            .collect())
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// Lifecycle of one triplet inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripletState {
    Discovered,
    Skipped,
    Running,
    Finished(Verdict),
}

impl core::fmt::Display for TripletState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TripletState::Discovered => write!(f, "DISCOVERED"),
            TripletState::Skipped => write!(f, "SKIPPED"),
            TripletState::Running => write!(f, "RUNNING"),
            TripletState::Finished(verdict) => write!(f, "{verdict}"),
        }
    }
}

fn transition(name: &str, from: TripletState, to: TripletState) -> TripletState {
    debug!("{name}: {from} -> {to}");
    to
}

/// Drives a batch: discovery, then one runner call per complete triplet.
pub struct Orchestrator<R> {
    runner: R,
    config: BatchConfig,
}

impl<R: TripletRunner> Orchestrator<R> {
    pub fn new(runner: R, config: BatchConfig) -> Self {
        Self { runner, config }
    }

    /// Process every discovered triplet.
    ///
    /// Only discovery failures are returned as errors; per-triplet failures
    /// become `ERROR`/`TIMEOUT` entries of the summary.
    pub fn run(&mut self, source: &dyn TripletSource) -> Result<BatchSummary> {
        let discovered = source.discover()?;
        let total = discovered.len();
        info!("Found {total} archives");

        let mut summary = BatchSummary::new();
        for (index, item) in discovered.into_iter().enumerate() {
            let position = format!("[{}/{}]", index + 1, total);
            let state = TripletState::Discovered;
            let entry = match item {
                Discovery::Incomplete { name, missing, .. } => {
                    transition(&name, state, TripletState::Skipped);
                    info!("{position} Skipping {name}: missing {}", missing.display());
                    BatchEntry {
                        name,
                        verdict: Verdict::Skipped,
                        counts: None,
                        detail: Some(format!("missing {}", missing.display())),
                    }
                }
                Discovery::Complete(triplet) => {
                    let state = transition(&triplet.name, state, TripletState::Running);
                    info!("{position} Comparing {}", triplet.name);
                    let entry = self.run_one(&triplet);
                    transition(&triplet.name, state, TripletState::Finished(entry.verdict));
                    info!("{position} {}: {}", triplet.name, entry.verdict);
                    entry
                }
            };
            summary.record(entry);
        }
        Ok(summary)
    }

    fn run_one(&mut self, triplet: &Triplet) -> BatchEntry {
        match self.runner.run(triplet, &self.config) {
            Ok(report) => BatchEntry {
                name: triplet.name.clone(),
                verdict: report.verdict,
                counts: Some(report.counts),
                detail: None,
            },
            Err(err) => {
                warn!("{} failed: {err}", triplet.name);
                BatchEntry {
                    name: triplet.name.clone(),
                    verdict: err.verdict(),
                    counts: None,
                    detail: Some(err.to_string()),
                }
            }
        }
    }
}

/// Runs each triplet in a child `compare --json` process so a crash or hang
/// stays contained to that triplet. On timeout the child's process group is
/// killed, which takes the solver it started down too.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    leading_args: Vec<String>,
    solver: SolverConfig,
}

impl ProcessRunner {
    /// `program` must accept the `compare` command line of `bn-crosscheck`.
    pub fn new(program: impl Into<PathBuf>, solver: SolverConfig) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
            solver,
        }
    }

    /// Arguments placed before the `compare` command.
    pub fn with_leading_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.leading_args.extend(args);
        self
    }

    pub fn command(&self, triplet: &Triplet, config: &BatchConfig) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("compare")
            .arg("--json")
            .arg("--solver")
            .arg(&self.solver.program);
        for arg in &self.solver.args {
            cmd.arg(format!("--solver-arg={arg}"));
        }
        if config.universal_fixed_points {
            cmd.arg(UNIVERSAL_FPS_FLAG);
        }
        cmd.arg(&triplet.archive)
            .arg(&triplet.model)
            .arg(&triplet.data);
        cmd
    }
}

impl TripletRunner for ProcessRunner {
    fn run(&mut self, triplet: &Triplet, config: &BatchConfig) -> Result<RunReport> {
        let tool = format!("compare {}", triplet.name);
        let output = run_with_deadline(self.command(triplet, config), None, config.timeout, &tool)?;
        if !output.success() {
            return Err(output.failure(&tool));
        }
        serde_json::from_str(&output.stdout)
            .map_err(|e| CompareError::format(format!("report of {}", triplet.name), e.to_string()))
    }
}

/// Runs each triplet in the current process; only the solver gets a deadline.
#[derive(Debug, Clone, Default)]
pub struct InProcessRunner {
    solver: SolverConfig,
}

impl InProcessRunner {
    pub fn new(solver: SolverConfig) -> Self {
        Self { solver }
    }
}

impl TripletRunner for InProcessRunner {
    fn run(&mut self, triplet: &Triplet, config: &BatchConfig) -> Result<RunReport> {
        let solver = SolverConfig {
            universal_fixed_points: config.universal_fixed_points,
            timeout: config.timeout,
            ..self.solver.clone()
        };
        compare_triplet(triplet, &solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffCounts;

    struct FixedSource(Vec<Discovery>);

    impl TripletSource for FixedSource {
        fn discover(&self) -> Result<Vec<Discovery>> {
            Ok(self.0.clone())
        }
    }

    fn triplet(name: &str) -> Triplet {
        Triplet::new(format!("{name}.zip"), format!("{name}.aeon"), format!("{name}.csv"))
    }

    fn incomplete(name: &str) -> Discovery {
        Discovery::Incomplete {
            name: name.into(),
            archive: format!("{name}.zip").into(),
            missing: format!("{name}.csv").into(),
        }
    }

    fn report(name: &str, verdict: Verdict, only_in_a: usize) -> RunReport {
        RunReport {
            label: name.into(),
            universal_fixed_points: false,
            symbolic_enumerated: 2 + only_in_a,
            solver_enumerated: 2,
            symbolic_distinct: 2 + only_in_a,
            solver_distinct: 2,
            counts: DiffCounts {
                only_in_a,
                only_in_b: 0,
                intersection: 2,
            },
            verdict,
            only_in_symbolic: vec![],
            only_in_solver: vec![],
        }
    }

    #[test]
    fn test_complete_and_incomplete_triplets() {
        let source = FixedSource(vec![
            Discovery::Complete(triplet("m1")),
            incomplete("m2"),
        ]);
        let mut calls = Vec::new();
        let runner = |t: &Triplet, _: &BatchConfig| -> Result<RunReport> {
            calls.push(t.name.clone());
            Ok(report(&t.name, Verdict::Match, 0))
        };
        let summary = Orchestrator::new(runner, BatchConfig::default())
            .run(&source)
            .unwrap();

        assert_eq!(calls, vec!["m1"]);
        assert_eq!(summary.entries.len(), 2);
        assert_eq!(summary.entries[0].verdict, Verdict::Match);
        assert_eq!(summary.entries[1].verdict, Verdict::Skipped);
        assert!(summary.entries[1].detail.as_deref().unwrap().contains("m2.csv"));
    }

    #[test]
    fn test_failures_do_not_stop_the_batch() {
        let source = FixedSource(vec![
            Discovery::Complete(triplet("a")),
            Discovery::Complete(triplet("b")),
            Discovery::Complete(triplet("c")),
            Discovery::Complete(triplet("d")),
        ]);
        let runner = |t: &Triplet, _: &BatchConfig| -> Result<RunReport> {
            match t.name.as_str() {
                "a" => Err(CompareError::Timeout {
                    tool: "solver".into(),
                    after: Duration::from_secs(600),
                }),
                "b" => Err(CompareError::InvalidValue { value: "2".into() }),
                "c" => Ok(report("c", Verdict::Differ, 1)),
                _ => Ok(report("d", Verdict::Match, 0)),
            }
        };
        let summary = Orchestrator::new(runner, BatchConfig::default())
            .run(&source)
            .unwrap();

        let verdicts: Vec<_> = summary.entries.iter().map(|e| e.verdict).collect();
        assert_eq!(
            verdicts,
            vec![Verdict::Timeout, Verdict::Error, Verdict::Differ, Verdict::Match]
        );
        assert!(summary.entries[1].detail.as_deref().unwrap().contains("`2`"));
        assert_eq!(summary.entries[2].counts.unwrap().only_in_a, 1);
    }

    #[test]
    fn test_runner_receives_batch_config() {
        let source = FixedSource(vec![Discovery::Complete(triplet("m"))]);
        let config = BatchConfig {
            universal_fixed_points: true,
            timeout: Some(Duration::from_secs(5)),
        };
        let runner = |_: &Triplet, c: &BatchConfig| -> Result<RunReport> {
            assert!(c.universal_fixed_points);
            assert_eq!(c.timeout, Some(Duration::from_secs(5)));
            Ok(report("m", Verdict::Match, 0))
        };
        let summary = Orchestrator::new(runner, config).run(&source).unwrap();
        assert!(summary.all_matched());
    }

    #[test]
    fn test_directory_discovery() {
        let dir = tempfile::tempdir().unwrap();
        for file in ["b.zip", "b.aeon", "b.csv", "a.zip", "a.aeon", "c.zip", "c.csv", "notes.txt"] {
            std::fs::write(dir.path().join(file), "").unwrap();
        }
        let found = DirectorySource::new(dir.path()).discover().unwrap();
        let names: Vec<_> = found.iter().map(Discovery::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        match &found[0] {
            Discovery::Incomplete { missing, .. } => assert!(missing.ends_with("a.csv")),
            other => panic!("expected incomplete, got {other:?}"),
        }
        assert!(matches!(found[1], Discovery::Complete(_)));
        match &found[2] {
            Discovery::Incomplete { missing, .. } => assert!(missing.ends_with("c.aeon")),
            other => panic!("expected incomplete, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_without_archives() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("x.aeon"), "").unwrap();
        assert!(DirectorySource::new(dir.path()).discover().is_err());

        let missing = DirectorySource::new(dir.path().join("nope")).discover();
        assert!(matches!(missing, Err(CompareError::MissingFile { .. })));
    }

    #[test]
    fn test_process_runner_command_line() {
        let solver = SolverConfig {
            program: "enum".into(),
            args: vec!["-q".into()],
            ..Default::default()
        };
        let runner = ProcessRunner::new("/bin/bn-crosscheck", solver);
        let config = BatchConfig {
            universal_fixed_points: true,
            ..Default::default()
        };
        let cmd = runner.command(&triplet("m"), &config);
        let args: Vec<_> = cmd.get_args().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            vec![
                "compare",
                "--json",
                "--solver",
                "enum",
                "--solver-arg=-q",
                "--universal-fps",
                "m.zip",
                "m.aeon",
                "m.csv"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_reads_child_report() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("report.json");
        std::fs::write(&json, report("m", Verdict::Differ, 1).to_json().unwrap()).unwrap();
        let script = dir.path().join("child.sh");
        std::fs::write(&script, format!("cat '{}'\n", json.display())).unwrap();

        let mut runner = ProcessRunner::new("sh", SolverConfig::default())
            .with_leading_args([script.to_string_lossy().into_owned()]);
        let parsed = runner.run(&triplet("m"), &BatchConfig::default()).unwrap();
        assert_eq!(parsed.verdict, Verdict::Differ);
        assert_eq!(parsed.counts.only_in_a, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_stops_the_childs_solver() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("solver_still_ran");
        let child = dir.path().join("child.sh");
        std::fs::write(&child, format!("(sleep 1; touch '{}') &\nwait\n", marker.display())).unwrap();

        let mut runner = ProcessRunner::new("sh", SolverConfig::default())
            .with_leading_args([child.to_string_lossy().into_owned()]);
        let config = BatchConfig {
            universal_fixed_points: false,
            timeout: Some(Duration::from_millis(200)),
        };
        let err = runner.run(&triplet("m"), &config).unwrap_err();
        assert_eq!(err.verdict(), Verdict::Timeout);

        std::thread::sleep(Duration::from_millis(1500));
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_process_runner_failures() {
        let dir = tempfile::tempdir().unwrap();
        let crash = dir.path().join("crash.sh");
        std::fs::write(&crash, "echo 'Error: boom' >&2\nexit 1\n").unwrap();
        let garbage = dir.path().join("garbage.sh");
        std::fs::write(&garbage, "echo 'not json'\n").unwrap();
        let hang = dir.path().join("hang.sh");
        std::fs::write(&hang, "sleep 5\n").unwrap();

        let run = |script: &Path, timeout: Option<Duration>| {
            let mut runner = ProcessRunner::new("sh", SolverConfig::default())
                .with_leading_args([script.to_string_lossy().into_owned()]);
            let config = BatchConfig {
                universal_fixed_points: false,
                timeout,
            };
            runner.run(&triplet("m"), &config).unwrap_err().verdict()
        };
        assert_eq!(run(&crash, None), Verdict::Error);
        assert_eq!(run(&garbage, None), Verdict::Error);
        assert_eq!(run(&hang, Some(Duration::from_millis(100))), Verdict::Timeout);
    }
}
