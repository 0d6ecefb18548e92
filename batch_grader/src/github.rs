//! Thin wrappers around the GitHub CLI.
//!
//! Cloning and workflow-status queries both shell out to `gh`; the grader
//! consumes only their side effects (directories on disk) or a single
//! boolean. A non-zero `gh` exit is surfaced as an error for the caller to
//! log — it never aborts a batch by itself.

use std::{
    fs, io,
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info, warn};
use serde::Deserialize;

use crate::GraderError;

/// Clones all student repositories for `assignment` into `clone_root` via
/// `gh classroom`.
pub fn clone_student_repos(assignment: &str, clone_root: &Path) -> io::Result<()> {
    fs::create_dir_all(clone_root)?;
    info!("cloning student repositories for assignment '{assignment}'");
    let status = Command::new("gh")
        .args(["classroom", "clone", "student-repos", "-a", assignment])
        .current_dir(clone_root)
        .status()?;
    if !status.success() {
        return Err(io::Error::other(format!(
            "gh classroom clone exited with {status}"
        )));
    }
    Ok(())
}

/// Resolves the directory `gh classroom` cloned the repositories into: the
/// first subdirectory of `clone_root`.
pub fn submissions_root(clone_root: &Path) -> Result<PathBuf, GraderError> {
    let entries = match fs::read_dir(clone_root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("unable to read '{}': {err}", clone_root.display());
            return Err(GraderError::NoTargets(clone_root.to_path_buf()));
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs.into_iter()
        .next()
        .ok_or_else(|| GraderError::NoTargets(clone_root.to_path_buf()))
}

/// Reports whether a repository's CI is green.
pub trait WorkflowStatus {
    /// `Ok(true)` when every workflow's most recent run concluded
    /// successfully. A workflow with no runs at all does not fail the check.
    fn all_workflows_passing(&self, repo: &str) -> io::Result<bool>;
}

#[derive(Deserialize, Debug, PartialEq)]
struct WorkflowList {
    workflows: Vec<Workflow>,
}

#[derive(Deserialize, Debug, PartialEq)]
struct Workflow {
    id: u64,
    name: String,
}

#[derive(Deserialize, Debug, PartialEq)]
struct RunList {
    workflow_runs: Vec<WorkflowRun>,
}

#[derive(Deserialize, Debug, PartialEq)]
struct WorkflowRun {
    conclusion: Option<String>,
}

/// [`WorkflowStatus`] backed by `gh api` against the GitHub Actions REST
/// endpoints.
pub struct GhWorkflowStatus {
    org: String,
}

impl GhWorkflowStatus {
    pub fn new(org: impl Into<String>) -> Self {
        Self { org: org.into() }
    }

    fn api_json(endpoint: &str) -> io::Result<Vec<u8>> {
        debug!("querying 'gh api {endpoint}'");
        let output = Command::new("gh").args(["api", endpoint]).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "gh api {endpoint} exited with {}",
                output.status
            )));
        }
        Ok(output.stdout)
    }
}

/// Decides the check from already-fetched workflow data. `latest_runs`
/// supplies each workflow's most recent run page, in workflow order.
///
/// A workflow with no runs yet counts as passing; a run that has not
/// concluded (`conclusion: null`) does not.
fn all_latest_runs_passing(
    list: &WorkflowList,
    mut latest_runs: impl FnMut(&Workflow) -> io::Result<RunList>,
) -> io::Result<bool> {
    for workflow in &list.workflows {
        let runs = latest_runs(workflow)?;
        match runs.workflow_runs.first() {
            None => debug!("workflow '{}' has no runs yet", workflow.name),
            Some(run) if run.conclusion.as_deref() == Some("success") => {}
            Some(run) => {
                info!(
                    "workflow '{}' latest run concluded {:?}",
                    workflow.name, run.conclusion
                );
                return Ok(false);
            }
        }
    }
    Ok(true)
}

impl WorkflowStatus for GhWorkflowStatus {
    fn all_workflows_passing(&self, repo: &str) -> io::Result<bool> {
        let endpoint = format!("repos/{}/{repo}/actions/workflows", self.org);
        let list: WorkflowList =
            serde_json::from_slice(&Self::api_json(&endpoint)?).map_err(io::Error::other)?;

        all_latest_runs_passing(&list, |workflow| {
            let endpoint = format!(
                "repos/{}/{repo}/actions/workflows/{}/runs?per_page=1",
                self.org, workflow.id
            );
            serde_json::from_slice(&Self::api_json(&endpoint)?).map_err(io::Error::other)
        })
    }
}
