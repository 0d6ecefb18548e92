pub mod runner;

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{error, info, warn};

use crate::{
    GraderError,
    config::TestSuite,
    github::WorkflowStatus,
    grader::runner::{TestOutcome, execute},
    utils,
};

/// Feedback written when the workflow-status override zeroes a grade.
pub const CI_FAILURE_FEEDBACK: &str = "workflow(s) not passing";

/// Descriptor file a repository may ship for itself.
const REPO_SUITE_PATH: &str = ".github/classroom/autograding.json";

/// One repository's final grade.
#[derive(Debug, PartialEq, Eq, Clone, serde::Serialize)]
pub struct GradeRecord {
    #[serde(rename = "student_username")]
    pub identifier: String,
    #[serde(rename = "grade")]
    pub total_score: u32,
    pub feedback: String,
}

impl GradeRecord {
    fn new(identifier: String) -> Self {
        Self {
            identifier,
            total_score: 0,
            feedback: String::new(),
        }
    }

    fn absorb(&mut self, outcome: TestOutcome) {
        self.total_score += outcome.points_awarded;
        if !outcome.feedback.is_empty() {
            if !self.feedback.is_empty() {
                self.feedback.push(' ');
            }
            self.feedback.push_str(&outcome.feedback);
        }
    }
}

/// The behavioral toggles that used to be scattered across copies of the
/// grading script.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// How many trailing dash-separated segments of the repository name form
    /// the student identifier.
    pub name_parts: usize,
    /// Directory copied into each repository before grading.
    pub template_dir: Option<PathBuf>,
    /// Prefer the descriptor file shipped inside the repository itself.
    /// Repository content is student-controlled; enabling this trusts it.
    pub prefer_repo_suite: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            name_parts: 1,
            template_dir: None,
            prefer_repo_suite: false,
        }
    }
}

/// Grades a batch of repository directories against one descriptor suite.
///
/// Processing is strictly sequential: one target at a time, descriptors in
/// list order, commands in list order. Every command receives the target as
/// an explicit working directory, so the grader never touches the process
/// cwd.
pub struct BatchGrader<'a> {
    suite: &'a TestSuite,
    options: BatchOptions,
    ci: Option<&'a dyn WorkflowStatus>,
}

impl<'a> BatchGrader<'a> {
    pub fn new(suite: &'a TestSuite, options: BatchOptions) -> Self {
        Self {
            suite,
            options,
            ci: None,
        }
    }

    /// Enables the workflow-status override: a target whose workflows are
    /// not all passing is forced to a zero grade.
    pub fn with_ci(mut self, ci: &'a dyn WorkflowStatus) -> Self {
        self.ci = Some(ci);
        self
    }

    /// Grades every repository directory under `root`, in name order.
    ///
    /// Fails only when no repository directory exists at all; everything
    /// else degrades to a per-target grade or a logged diagnostic.
    pub fn grade_all(&self, root: &Path) -> Result<Vec<GradeRecord>, GraderError> {
        let targets = list_target_dirs(root)?;
        if targets.is_empty() {
            return Err(GraderError::NoTargets(root.to_path_buf()));
        }

        let mut records = Vec::with_capacity(targets.len());
        for target in &targets {
            records.push(self.grade_target(target));
        }
        Ok(records)
    }

    /// Grades one repository directory.
    pub fn grade_target(&self, target: &Path) -> GradeRecord {
        let repo_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let identifier = utils::student_name_from_repo(&repo_name, self.options.name_parts);
        info!("grading '{identifier}'");

        if let Some(template) = &self.options.template_dir
            && let Err(err) = utils::copy_dir_recursive(template, target)
        {
            error!("unable to copy template into '{repo_name}', grading as-is: {err}");
        }

        let repo_suite = self.load_repo_suite(target);
        let suite = repo_suite.as_ref().unwrap_or(self.suite);

        let mut record = GradeRecord::new(identifier);
        for descriptor in &suite.tests {
            record.absorb(execute(descriptor, target));
        }

        if let Some(ci) = self.ci {
            match ci.all_workflows_passing(&repo_name) {
                Ok(true) => {}
                Ok(false) => {
                    info!("'{repo_name}': workflows not passing, forcing grade to 0");
                    record.total_score = 0;
                    record.feedback = CI_FAILURE_FEEDBACK.to_string();
                }
                Err(err) => {
                    warn!("skipping workflow check for '{repo_name}': {err}");
                }
            }
        }

        info!(
            "done grading '{}' (grade: {})",
            record.identifier, record.total_score
        );
        record
    }

    /// Loads the repository's own descriptor file when configured to.
    /// A missing or invalid file falls back to the fixed suite.
    fn load_repo_suite(&self, target: &Path) -> Option<TestSuite> {
        if !self.options.prefer_repo_suite {
            return None;
        }
        match TestSuite::load(&target.join(REPO_SUITE_PATH)) {
            Ok(suite) => Some(suite),
            Err(err) => {
                warn!("falling back to the fixed suite: {err}");
                None
            }
        }
    }
}

/// Lists the subdirectories of `root`, sorted by name for a stable grading
/// and report order.
fn list_target_dirs(root: &Path) -> Result<Vec<PathBuf>, GraderError> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("unable to read '{}': {err}", root.display());
            return Err(GraderError::NoTargets(root.to_path_buf()));
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}
