//! Solver and benchmark-set registry
//!
//! The registry is a JSON document listing every solver the harness knows
//! how to invoke and every benchmark set it can run. It is the single place
//! where solver-specific invocation syntax and file layout live; everything
//! downstream works on resolved [`Job`](crate::models::Job)s.
//!
//! ```json
//! {
//!   "solvers": [
//!     { "id": "cvc5", "program": "cvc5",
//!       "args": ["--produce-models", "{input}"], "dialect": "smtlib" }
//!   ],
//!   "benchmark_sets": [
//!     { "id": "woorpje", "root": "benchmarks/woorpje",
//!       "list": "benchmarks/woorpje/files.txt" }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::benchmark::dialects::OutputDialect;
use crate::constants::SELECT_ALL;
use crate::error::{HarnessError, HarnessResult};

/// How the benchmark reaches the solver
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// `{input}` is the benchmark file path
    #[default]
    Path,
    /// The benchmark file is connected to stdin
    Stdin,
    /// The benchmark is wrapped in a JSON document; `{input}` is its path
    Json,
}

/// Where a solver expects its copy of a logical benchmark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkLayout {
    /// Directory under the set root, if the solver's files live apart
    #[serde(default)]
    pub subdir: Option<String>,
    /// Appended to the canonical base name
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for BenchmarkLayout {
    fn default() -> Self {
        Self {
            subdir: None,
            extension: default_extension(),
        }
    }
}

fn default_extension() -> String {
    ".smt2".to_string()
}

/// Uniform description of one external solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSpec {
    pub id: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub input: InputMode,
    #[serde(default)]
    pub dialect: OutputDialect,
    #[serde(default)]
    pub layout: BenchmarkLayout,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl SolverSpec {
    /// Concrete input file this solver reads for a benchmark of a set
    pub fn input_path(&self, set: &BenchmarkSetSpec, benchmark: &str) -> PathBuf {
        let dir = match &self.layout.subdir {
            Some(subdir) => set.root.join(subdir),
            None => set.root.clone(),
        };
        dir.join(format!("{}{}", benchmark, self.layout.extension))
    }
}

/// A named benchmark collection with its canonical filename list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkSetSpec {
    pub id: String,
    pub root: PathBuf,
    /// One benchmark base name per line; defines row order
    pub list: PathBuf,
}

/// Parsed registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub solvers: Vec<SolverSpec>,
    pub benchmark_sets: Vec<BenchmarkSetSpec>,
}

impl Manifest {
    /// Load and validate a manifest, resolving relative paths against the
    /// manifest's own directory
    pub fn load(path: &Path) -> HarnessResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| HarnessError::InvalidManifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&contents, base).map_err(|e| match e {
            HarnessError::InvalidManifest { reason, .. } => HarnessError::InvalidManifest {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse manifest text; `base` anchors relative paths
    pub fn parse(contents: &str, base: &Path) -> HarnessResult<Self> {
        let mut manifest: Manifest =
            serde_json::from_str(contents).map_err(|e| invalid(base, e.to_string()))?;

        for set in &mut manifest.benchmark_sets {
            set.root = anchor(base, &set.root);
            set.list = anchor(base, &set.list);
        }
        for solver in &mut manifest.solvers {
            // Bare names are looked up on PATH; only explicit relative paths are anchored
            if solver.program.contains('/') {
                solver.program = anchor(base, Path::new(&solver.program))
                    .to_string_lossy()
                    .into_owned();
            }
        }

        manifest.validate(base)?;
        Ok(manifest)
    }

    fn validate(&self, base: &Path) -> HarnessResult<()> {
        let mut seen = HashSet::new();
        for solver in &self.solvers {
            if solver.id.trim().is_empty() || solver.id == SELECT_ALL {
                return Err(invalid(base, format!("invalid solver id '{}'", solver.id)));
            }
            if !seen.insert(solver.id.as_str()) {
                return Err(invalid(base, format!("duplicate solver id '{}'", solver.id)));
            }
            if solver.program.trim().is_empty() {
                return Err(invalid(base, format!("solver '{}' has no program", solver.id)));
            }
        }

        let mut seen = HashSet::new();
        for set in &self.benchmark_sets {
            if set.id.trim().is_empty() || set.id == SELECT_ALL {
                return Err(invalid(base, format!("invalid benchmark set id '{}'", set.id)));
            }
            if !seen.insert(set.id.as_str()) {
                return Err(invalid(base, format!("duplicate benchmark set id '{}'", set.id)));
            }
        }
        Ok(())
    }

    pub fn solver(&self, id: &str) -> Option<&SolverSpec> {
        self.solvers.iter().find(|s| s.id == id)
    }

    pub fn benchmark_set(&self, id: &str) -> Option<&BenchmarkSetSpec> {
        self.benchmark_sets.iter().find(|s| s.id == id)
    }

    /// Resolve a solver selector (`all` or a comma list)
    pub fn select_solvers(&self, selector: &str) -> HarnessResult<Vec<&SolverSpec>> {
        match parse_selector(selector, "solvers")? {
            Selection::All => Ok(self.solvers.iter().collect()),
            Selection::Named(names) => names
                .iter()
                .map(|name| {
                    self.solver(name)
                        .ok_or_else(|| HarnessError::UnknownSolver(name.clone()))
                })
                .collect(),
        }
    }

    /// Resolve a benchmark-set selector (`all` or a comma list)
    pub fn select_sets(&self, selector: &str) -> HarnessResult<Vec<&BenchmarkSetSpec>> {
        match parse_selector(selector, "benchmark sets")? {
            Selection::All => Ok(self.benchmark_sets.iter().collect()),
            Selection::Named(names) => names
                .iter()
                .map(|name| {
                    self.benchmark_set(name)
                        .ok_or_else(|| HarnessError::UnknownBenchmarkSet(name.clone()))
                })
                .collect(),
        }
    }
}

enum Selection {
    All,
    Named(Vec<String>),
}

fn parse_selector(selector: &str, what: &str) -> HarnessResult<Selection> {
    let mut names: Vec<String> = Vec::new();
    for name in selector.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if name == SELECT_ALL {
            return Ok(Selection::All);
        }
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    if names.is_empty() {
        return Err(HarnessError::EmptySelection(format!("no {} selected", what)));
    }
    Ok(Selection::Named(names))
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn invalid(base: &Path, reason: String) -> HarnessError {
    HarnessError::InvalidManifest {
        path: base.to_path_buf(),
        reason,
    }
}
