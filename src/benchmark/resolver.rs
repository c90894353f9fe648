//! Job descriptor resolution
//!
//! Expands a solver selection and a benchmark-set selection into concrete
//! jobs. Ordering is benchmark-set major, solver minor, then canonical
//! filename order, so every downstream join sees the same sequence.

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::error::{HarnessError, HarnessResult};
use crate::manifest::{BenchmarkSetSpec, SolverSpec};
use crate::models::{Job, JobKey, SkippedJob};

/// Canonical benchmark names of one set, in list order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkList {
    pub set: String,
    pub names: Vec<String>,
}

/// Output of the resolver
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub lists: Vec<BenchmarkList>,
    pub jobs: Vec<Job>,
    /// Expected inputs that do not exist
    pub skipped: Vec<SkippedJob>,
}

impl Resolution {
    pub fn list(&self, set: &str) -> Option<&BenchmarkList> {
        self.lists.iter().find(|l| l.set == set)
    }

    /// Keys of resolved jobs belonging to one set
    pub fn jobs_in<'a>(&'a self, set: &'a str) -> impl Iterator<Item = &'a Job> + 'a {
        self.jobs.iter().filter(move |job| job.set() == set)
    }
}

/// Read a set's canonical filename list.
///
/// Blank lines and `#` comments are skipped; repeated names keep their
/// first position. A name must be a single plain path component, since it
/// addresses artifact files under the results directory.
pub fn load_filenames(set: &BenchmarkSetSpec) -> HarnessResult<BenchmarkList> {
    let text = std::fs::read_to_string(&set.list).map_err(|_| HarnessError::MissingFilenameList {
        set: set.id.clone(),
        path: set.list.clone(),
    })?;

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for name in text.lines().map(str::trim) {
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        if !is_plain_name(name) {
            return Err(HarnessError::InvalidBenchmarkName {
                set: set.id.clone(),
                name: name.to_string(),
            });
        }
        if seen.insert(name) {
            names.push(name.to_string());
        } else {
            tracing::warn!(set = %set.id, benchmark = name, "Duplicate entry in filename list ignored");
        }
    }

    Ok(BenchmarkList {
        set: set.id.clone(),
        names,
    })
}

fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(part)), None) if part == name
    )
}

/// Build the job list for a selection.
///
/// Every filename list is loaded before any job is produced, so a missing
/// list fails the whole selection up front. Absent inputs are skipped with a
/// warning.
pub fn resolve(solvers: &[&SolverSpec], sets: &[&BenchmarkSetSpec]) -> HarnessResult<Resolution> {
    let lists = sets
        .iter()
        .map(|set| load_filenames(set))
        .collect::<HarnessResult<Vec<_>>>()?;

    let mut resolution = Resolution::default();
    for (set, list) in sets.iter().zip(&lists) {
        for solver in solvers {
            for name in &list.names {
                let key = JobKey::new(&solver.id, &set.id, name);
                let input = solver.input_path(set, name);
                if input.is_file() {
                    resolution.jobs.push(Job::new(key, input));
                } else {
                    tracing::warn!(
                        solver = %solver.id,
                        set = %set.id,
                        benchmark = %name,
                        expected = %input.display(),
                        "Input missing, skipping job"
                    );
                    resolution.skipped.push(SkippedJob {
                        key,
                        expected: input,
                    });
                }
            }
        }
    }
    resolution.lists = lists;

    tracing::info!(
        jobs = resolution.jobs.len(),
        skipped = resolution.skipped.len(),
        "Resolved job list"
    );
    Ok(resolution)
}
