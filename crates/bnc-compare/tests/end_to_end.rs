//! Full comparisons over real archives and a scripted solver helper.
#![cfg(unix)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use biodivine_lib_param_bn::BooleanNetwork;
use biodivine_lib_param_bn::symbolic_async_graph::SymbolicAsyncGraph;
use zip::write::SimpleFileOptions;

use bnc_compare::candidates::{COLORS_ENTRY, MODEL_ENTRY};
use bnc_compare::{
    ArchiveSummary, CompareError, SolverConfig, SymbolicArchive, Triplet, Verdict, compare_triplet,
};

/// `A` is forced to `!B` by the observable inhibition.
const FIXED_MODEL: &str = "B -| A\nA -> B\n$B: A\n";

/// `A` may be `true`, `false` or `!B`.
const OPEN_MODEL: &str = "B -|? A\nA -> B\n$B: A\n";

const DATA: &str = "ID,A,B\no1,1,\no2,0,1\n";

fn write_archive(path: &Path, model: &str) {
    let bn = BooleanNetwork::try_from(model).unwrap();
    let graph = SymbolicAsyncGraph::new(&bn).unwrap();
    let colors = graph.mk_unit_colors().as_bdd().to_string();

    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    zip.start_file(MODEL_ENTRY, options).unwrap();
    zip.write_all(model.as_bytes()).unwrap();
    zip.start_file(COLORS_ENTRY, options).unwrap();
    zip.write_all(colors.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Lay out `<name>.zip`, `<name>.aeon` and `<name>.csv` in `dir`.
fn triplet(dir: &Path, name: &str, model: &str) -> Triplet {
    let archive = dir.join(format!("{name}.zip"));
    let model_path = dir.join(format!("{name}.aeon"));
    let data = dir.join(format!("{name}.csv"));
    write_archive(&archive, model);
    std::fs::write(&model_path, model).unwrap();
    std::fs::write(&data, DATA).unwrap();
    Triplet::new(archive, model_path, data)
}

/// Solver helper that ignores its input and prints `networks`.
fn solver(dir: &Path, name: &str, networks: &str) -> SolverConfig {
    let output: PathBuf = dir.join(format!("{name}.out"));
    std::fs::write(&output, networks).unwrap();
    let script = dir.join(format!("{name}.sh"));
    std::fs::write(&script, format!("cat '{}'\n", output.display())).unwrap();
    SolverConfig {
        program: "sh".into(),
        args: vec![script.to_string_lossy().into_owned()],
        ..Default::default()
    }
}

// ============================================================================
// Single comparisons
// ============================================================================

#[test]
fn test_fixed_model_matches() {
    let dir = tempfile::tempdir().unwrap();
    let t = triplet(dir.path(), "fixed", FIXED_MODEL);
    let config = solver(dir.path(), "one", "targets, factors\nA, !B\nB, A\n");

    let report = compare_triplet(&t, &config).unwrap();
    assert_eq!(report.label, "fixed");
    assert_eq!(report.verdict, Verdict::Match);
    assert_eq!(report.counts.intersection, 1);
    assert!(report.summary().ends_with("Results match exactly!"));
}

#[test]
fn test_extra_solver_network_differs() {
    let dir = tempfile::tempdir().unwrap();
    let t = triplet(dir.path(), "fixed", FIXED_MODEL);
    let config = solver(dir.path(), "two", "A, !B\nB, A\n\nA, B\nB, A\n");

    let report = compare_triplet(&t, &config).unwrap();
    assert_eq!(report.verdict, Verdict::Differ);
    assert_eq!(report.counts.only_in_a, 0);
    assert_eq!(report.counts.only_in_b, 1);
    assert_eq!(report.only_in_solver.len(), 1);
    assert_eq!(report.only_in_solver[0]["A"], "B");
}

#[test]
fn test_open_model_with_literal_constants() {
    let dir = tempfile::tempdir().unwrap();
    let t = triplet(dir.path(), "open", OPEN_MODEL);
    let config = solver(
        dir.path(),
        "three",
        "A, 1\nB, A\n\nA, 0\nB, A & A\n\nA, !B | (B & !B)\nB, A\n",
    );

    let report = compare_triplet(&t, &config).unwrap();
    assert_eq!(report.symbolic_distinct, 3);
    assert_eq!(report.solver_distinct, 3);
    assert_eq!(report.verdict, Verdict::Match);
}

#[test]
fn test_solver_universe_mismatch_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let t = triplet(dir.path(), "fixed", FIXED_MODEL);
    let config = solver(dir.path(), "short", "A, !B\n");

    let err = compare_triplet(&t, &config).unwrap_err();
    assert!(matches!(err, CompareError::DomainMismatch { .. }));
}

#[test]
fn test_invalid_observation_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    let t = triplet(dir.path(), "fixed", FIXED_MODEL);
    std::fs::write(&t.data, "ID,A\no1,2\n").unwrap();
    let config = solver(dir.path(), "one", "A, !B\nB, A\n");

    let err = compare_triplet(&t, &config).unwrap_err();
    assert_eq!(err.to_string(), "Unsupported specification value `2`");
}

// ============================================================================
// Archive handling
// ============================================================================

#[test]
fn test_archive_without_colors_entry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.zip");
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    zip.start_file(MODEL_ENTRY, SimpleFileOptions::default()).unwrap();
    zip.write_all(FIXED_MODEL.as_bytes()).unwrap();
    zip.finish().unwrap();

    let err = SymbolicArchive::open(&path).err().unwrap();
    assert!(err.to_string().contains(COLORS_ENTRY));
}

#[test]
fn test_inspect_open_archive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("open.zip");
    write_archive(&path, OPEN_MODEL);

    let archive = SymbolicArchive::open(&path).unwrap();
    let summary = ArchiveSummary::build(&archive, 10).unwrap();
    assert_eq!(summary.variables[0].name, "A");
    assert_eq!(summary.variables[0].variants.len(), 3);
    assert_eq!(summary.variables[1].variants.len(), 1);
}
