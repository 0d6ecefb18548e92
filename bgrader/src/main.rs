use std::{error::Error, path::PathBuf};

use batch_grader::{
    BatchGrader, BatchOptions, GhWorkflowStatus, TestSuite, clone_student_repos, submissions_root,
    write_grades_csv,
};
use clap::Parser;
use log::error;

const CLONE_ROOT: &str = "cloned_repos";

#[derive(Parser, Debug)]
#[command(
    name = "bgrader",
    version,
    about = "Clone GitHub Classroom repositories, run the configured tests against each one, and save the grades to a CSV file."
)]
struct Cli {
    /// GitHub Classroom assignment identifier.
    assignment: String,

    /// Run `gh classroom clone` before grading.
    #[arg(long)]
    clone: bool,

    /// Descriptor file listing the tests to run.
    #[arg(long, default_value = "autograding.json")]
    tests: PathBuf,

    /// Prefer the descriptor file shipped inside each repository
    /// (.github/classroom/autograding.json).
    #[arg(long)]
    repo_tests: bool,

    /// Directory copied into each repository before grading.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Trailing dash-separated repository-name segments forming the student
    /// identifier.
    #[arg(long, default_value_t = 1)]
    name_parts: usize,

    /// Force a zero grade when the repository's workflows are not passing.
    #[arg(long, requires = "org")]
    check_ci: bool,

    /// GitHub organization owning the student repositories.
    #[arg(long, requires = "check_ci")]
    org: Option<String>,

    /// Output CSV file.
    #[arg(long, default_value = "output_grades.csv")]
    output: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    let clone_root = PathBuf::from(CLONE_ROOT);
    if args.clone
        && let Err(err) = clone_student_repos(&args.assignment, &clone_root)
    {
        // repositories from a previous run may already be on disk
        error!("cloning failed, grading whatever is already cloned: {err}");
    }

    let suite = TestSuite::load(&args.tests)?;
    let options = BatchOptions {
        name_parts: args.name_parts,
        template_dir: args.template,
        prefer_repo_suite: args.repo_tests,
    };

    let ci = match (args.check_ci, args.org) {
        (true, Some(org)) => Some(GhWorkflowStatus::new(org)),
        _ => None,
    };
    let mut grader = BatchGrader::new(&suite, options);
    if let Some(ci) = &ci {
        grader = grader.with_ci(ci);
    }

    let root = submissions_root(&clone_root)?;
    let records = grader.grade_all(&root)?;
    write_grades_csv(&records, &args.output)?;

    Ok(())
}
