//! Batch autograder for GitHub Classroom assignments.
//!
//! The library clones nothing and prints nothing by itself: it interprets a
//! list of test descriptors against already-cloned repository directories,
//! aggregates points into one grade per repository, and writes the grades to
//! a CSV file. Acquisition of the repositories and the workflow-status query
//! are thin wrappers around the `gh` CLI in [`github`].

mod config;
mod grader;
mod github;
mod report;
mod utils;

pub use config::{CommandSeq, TestDescriptor, TestSuite};
pub use grader::runner::{TestOutcome, execute};
pub use grader::{BatchGrader, BatchOptions, CI_FAILURE_FEEDBACK, GradeRecord};
pub use github::{GhWorkflowStatus, WorkflowStatus, clone_student_repos, submissions_root};
pub use report::write_grades_csv;
pub use utils::{copy_dir_recursive, student_name_from_repo};

use std::{io, path::PathBuf};
use thiserror::Error;

/// Failures that abort an operation instead of being folded into a grade.
///
/// Per-descriptor failures never show up here: a failing or timed-out test
/// command becomes a zero-point [`TestOutcome`], not an error.
#[derive(Debug, Error)]
pub enum GraderError {
    #[error("failed to read descriptor file '{path}': {source}")]
    SuiteIo { path: PathBuf, source: io::Error },
    #[error("invalid descriptor file '{path}': {reason}")]
    SuiteInvalid { path: PathBuf, reason: String },
    #[error("no cloned repositories found under '{0}'")]
    NoTargets(PathBuf),
    #[error("failed to write grade report '{path}': {source}")]
    Report { path: PathBuf, source: csv::Error },
}
