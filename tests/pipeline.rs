//! End-to-end batch against fake `/bin/sh` solvers

use std::fs;
use std::path::{Path, PathBuf};

use strbench::benchmark::ArtifactStore;
use strbench::config::{Config, ExecutionConfig, LogConfig, LogFormat, StorageConfig};
use strbench::models::{ExitClass, JobKey, RunManifest, Verdict};
use strbench::{BatchRunner, HarnessError, Manifest};

const FAST: &str = r#"case "$2" in
  b1) echo sat; echo '(model (define-fun X () String ""))' ;;
  b2) echo unsat ;;
  *) echo unknown ;;
esac"#;

const INLINE: &str = r#"printf 'sat( (define-fun X () String ""))\n'"#;

const FLAKY: &str = r#"case "$2" in
  b1) sleep 30 ;;
  b2) kill -KILL $$ ;;
  *) echo 'fatal: unsupported logic' >&2; exit 3 ;;
esac"#;

fn manifest_json() -> String {
    let solver = |id: &str, dialect: &str, script: &str| {
        serde_json::json!({
            "id": id,
            "program": "/bin/sh",
            "args": ["-c", script, "sh", "{input}", "{benchmark}"],
            "dialect": dialect,
        })
    };
    serde_json::json!({
        "solvers": [
            solver("fast", "smtlib", FAST),
            solver("inline", "inline", INLINE),
            solver("flaky", "smtlib", FLAKY),
        ],
        "benchmark_sets": [
            { "id": "set1", "root": "bench/set1", "list": "bench/set1/files.txt" }
        ]
    })
    .to_string()
}

fn setup(root: &Path) -> BatchRunner {
    let bench = root.join("bench/set1");
    fs::create_dir_all(&bench).unwrap();
    fs::write(bench.join("files.txt"), "b1\nb2\nb3\nb4\n").unwrap();
    for name in ["b1", "b2", "b3"] {
        fs::write(bench.join(format!("{name}.smt2")), "(check-sat)\n").unwrap();
    }

    let config = Config {
        storage: StorageConfig {
            manifest_path: root.join("harness.json"),
            results_dir: root.join("results"),
        },
        execution: ExecutionConfig {
            timeout_secs: 1,
            memory_limit_mb: 1024,
            workers: 3,
            min_free_memory_mb: 0,
            pin_cores: false,
        },
        logging: LogConfig {
            rust_log: "strbench=debug".to_string(),
            format: LogFormat::Pretty,
        },
    };
    let manifest = Manifest::parse(&manifest_json(), root).unwrap();
    BatchRunner::new(config, manifest)
}

fn read_tables(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .map(|p| {
            let bytes = fs::read(&p).unwrap();
            (p, bytes)
        })
        .collect();
    files.sort();
    files
}

#[tokio::test]
async fn test_full_batch() {
    let dir = tempfile::tempdir().unwrap();
    let runner = setup(dir.path());

    let outcome = runner.run("all", "all").await.unwrap();
    assert_eq!(outcome.executed, 9);
    assert_eq!(outcome.skipped, 3);
    assert_eq!(outcome.tables.len(), 4);

    // Every executed job left both artifacts, whatever its fate
    let store = ArtifactStore::new(dir.path().join("results/artifacts"));
    for solver in ["fast", "inline", "flaky"] {
        for name in ["b1", "b2", "b3"] {
            let key = JobKey::new(solver, "set1", name);
            assert!(store.log_path(&key).is_file(), "{key}");
            assert!(store.time_path(&key).is_file(), "{key}");
        }
        assert!(!store.log_path(&JobKey::new(solver, "set1", "b4")).exists());
    }

    let table = &outcome.reports[0].table;
    assert_eq!(table.rows.len(), 4);
    assert!(table.rows.iter().all(|r| r.cells.len() == 3));

    let fast_b1 = table.cell(0, "fast").unwrap();
    assert_eq!(fast_b1.verdict, Verdict::Sat);
    assert_eq!(fast_b1.model.as_deref(), Some(""));
    assert_eq!(table.cell(1, "fast").unwrap().verdict, Verdict::Unsat);
    assert_eq!(table.cell(2, "fast").unwrap().verdict, Verdict::Unknown);
    for row in 0..3 {
        let cell = table.cell(row, "inline").unwrap();
        assert_eq!((cell.verdict, cell.model.as_deref()), (Verdict::Sat, Some("")));
    }

    let timed_out = table.cell(0, "flaky").unwrap();
    assert_eq!(timed_out.status, Some(ExitClass::Timeout));
    assert_eq!(timed_out.verdict, Verdict::Unknown);
    assert!(timed_out.elapsed.unwrap() >= 1.0);
    assert!(timed_out.elapsed.unwrap() < 10.0);
    assert_eq!(table.cell(1, "flaky").unwrap().status, Some(ExitClass::Killed));
    assert_eq!(table.cell(1, "flaky").unwrap().verdict, Verdict::Error);
    assert_eq!(table.cell(2, "flaky").unwrap().status, Some(ExitClass::Error));
    assert!(table.rows[3].cells.iter().all(|c| c.verdict == Verdict::Missing));

    let csv = fs::read_to_string(dir.path().join("results/tables/set1.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("benchmark,fast_time,fast_memory_kb,fast_result,fast_model,"));
    assert!(lines.iter().all(|l| l.split(',').count() == 13));
    assert_eq!(lines[4], "b4,,,missing,,,,missing,,,,missing,");

    let run: RunManifest =
        serde_json::from_slice(&fs::read(outcome.run_manifest.unwrap()).unwrap()).unwrap();
    assert_eq!(run.exit_counts["ok"], 6);
    assert_eq!(run.exit_counts["timeout"], 1);
    assert_eq!(run.exit_counts["killed"], 1);
    assert_eq!(run.exit_counts["error"], 1);
    assert_eq!(run.skipped.len(), 3);
    assert_eq!(run.inputs.len(), 3);
}

#[tokio::test]
async fn test_rerun_overwrites_and_report_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let runner = setup(dir.path());
    let artifacts = dir.path().join("results/artifacts/fast/set1");
    let tables = dir.path().join("results/tables");

    runner.run("fast,inline", "set1").await.unwrap();
    let first_listing = fs::read_dir(&artifacts).unwrap().count();
    runner.run("fast,inline", "set1").await.unwrap();
    assert_eq!(fs::read_dir(&artifacts).unwrap().count(), first_listing);

    runner.report("fast,inline", "set1").unwrap();
    let first = read_tables(&tables);
    runner.report("fast,inline", "set1").unwrap();
    assert_eq!(read_tables(&tables), first);
}

#[tokio::test]
async fn test_configuration_errors_abort_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let runner = setup(dir.path());

    let err = runner.run("fast,z3str3", "all").await.unwrap_err();
    assert!(matches!(&err, HarnessError::UnknownSolver(name) if name == "z3str3"));
    assert!(err.is_configuration());

    fs::remove_file(dir.path().join("bench/set1/files.txt")).unwrap();
    let err = runner.run("all", "set1").await.unwrap_err();
    assert!(matches!(err, HarnessError::MissingFilenameList { .. }));
    assert!(!dir.path().join("results/artifacts").exists());
}
