//! The test runner: executes one descriptor against one repository
//! directory and reports points plus feedback.
//!
//! Every failure path is local. A broken command, a non-zero exit, or a
//! timeout becomes a zero-point [`TestOutcome`]; nothing propagates to the
//! caller, so the batch loop always moves on to the next descriptor.

use std::{
    path::Path,
    process::{Command, Stdio},
    time::Duration,
};

use log::{debug, info, warn};
use wait_timeout::ChildExt;

use crate::config::TestDescriptor;

/// Outcome of running one descriptor against a target directory.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TestOutcome {
    /// Either the descriptor's full point value or zero.
    pub points_awarded: u32,
    /// Empty on full success, a descriptor-identifying message otherwise.
    pub feedback: String,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum CommandStatus {
    Passed,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Setup,
    Run,
}

fn failure_feedback(phase: Phase, name: &str, status: CommandStatus) -> String {
    match (phase, status) {
        (Phase::Setup, CommandStatus::TimedOut) => format!("Setup for test {name} timed out."),
        (Phase::Setup, _) => format!("Setup for test {name} failed."),
        (Phase::Run, CommandStatus::TimedOut) => format!("Test {name} timed out."),
        (Phase::Run, _) => format!("Test {name} failed."),
    }
}

/// Runs a single argv inside `workdir`, killing it once `timeout` expires.
///
/// The command inherits the parent environment but none of its stdio; student
/// output is noise at batch scale and pass/fail comes from the exit status.
fn run_single(argv: &[String], workdir: &Path, timeout: Duration) -> CommandStatus {
    debug!("executing {argv:?} in '{}'", workdir.display());
    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..])
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!("unable to spawn '{}': {err}", argv[0]);
            return CommandStatus::Failed;
        }
    };

    match child.wait_timeout(timeout) {
        Ok(Some(status)) if status.success() => CommandStatus::Passed,
        Ok(Some(status)) => {
            debug!("command '{}' exited with {status}", argv[0]);
            CommandStatus::Failed
        }
        Ok(None) => {
            debug!("command '{}' exceeded {timeout:?}", argv[0]);
            // reap the killed child so it does not linger as a zombie
            let _ = child.kill();
            let _ = child.wait();
            CommandStatus::TimedOut
        }
        Err(err) => {
            warn!("unable to wait on '{}': {err}", argv[0]);
            let _ = child.kill();
            let _ = child.wait();
            CommandStatus::Failed
        }
    }
}

fn run_phase(
    descriptor: &TestDescriptor,
    phase: Phase,
    workdir: &Path,
) -> Result<(), TestOutcome> {
    let seq = match phase {
        Phase::Setup => &descriptor.setup,
        Phase::Run => &descriptor.run,
    };
    let argvs = match seq.argvs() {
        Ok(argvs) => argvs,
        Err(reason) => {
            // descriptors are validated at load time, so this only fires for
            // hand-built ones
            warn!("test '{}': unusable command sequence: {reason}", descriptor.name);
            return Err(TestOutcome {
                points_awarded: 0,
                feedback: failure_feedback(phase, &descriptor.name, CommandStatus::Failed),
            });
        }
    };

    let timeout = Duration::from_secs(descriptor.timeout);
    for argv in &argvs {
        match run_single(argv, workdir, timeout) {
            CommandStatus::Passed => {}
            status => {
                return Err(TestOutcome {
                    points_awarded: 0,
                    feedback: failure_feedback(phase, &descriptor.name, status),
                });
            }
        }
    }
    Ok(())
}

/// Executes `descriptor` with `workdir` as the working directory of every
/// command.
///
/// Setup commands run first, in order; the first timeout or non-zero exit
/// fails the descriptor without attempting any run command. Run commands
/// then run in order under the same per-command timeout. Points are
/// all-or-nothing: `(descriptor.points, "")` only when every command exits
/// zero in time.
///
/// Commands may mutate `workdir`; nothing is rolled back on failure.
pub fn execute(descriptor: &TestDescriptor, workdir: &Path) -> TestOutcome {
    info!("running test '{}'", descriptor.name);

    if let Err(outcome) = run_phase(descriptor, Phase::Setup, workdir) {
        info!("test '{}': setup did not pass", descriptor.name);
        return outcome;
    }
    if let Err(outcome) = run_phase(descriptor, Phase::Run, workdir) {
        info!("test '{}': not passed", descriptor.name);
        return outcome;
    }

    info!("test '{}': passed", descriptor.name);
    TestOutcome {
        points_awarded: descriptor.points,
        feedback: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandSeq;

    fn descriptor(name: &str, setup: &str, run: &str, timeout: u64, points: u32) -> TestDescriptor {
        TestDescriptor {
            name: name.to_string(),
            setup: CommandSeq::Single(setup.to_string()),
            run: CommandSeq::Single(run.to_string()),
            timeout,
            points,
        }
    }

    mod execute_tests {
        use super::*;

        #[test_log::test]
        fn should_award_full_points_when_everything_passes() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(&descriptor("unit", "true", "true", 5, 5), dir.path());
            assert_eq!(
                outcome,
                TestOutcome {
                    points_awarded: 5,
                    feedback: String::new(),
                }
            );
        }

        #[test_log::test]
        fn should_fail_when_a_run_command_exits_non_zero() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(&descriptor("build", "true", "false", 5, 10), dir.path());
            assert_eq!(
                outcome,
                TestOutcome {
                    points_awarded: 0,
                    feedback: "Test build failed.".to_string(),
                }
            );
        }

        #[test_log::test]
        fn should_fail_when_a_run_command_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(&descriptor("slow", "true", "sleep 10", 1, 5), dir.path());
            assert_eq!(
                outcome,
                TestOutcome {
                    points_awarded: 0,
                    feedback: "Test slow timed out.".to_string(),
                }
            );
        }

        #[test_log::test]
        fn should_never_run_commands_after_a_setup_failure() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor("guard", "false", "touch run_marker", 5, 3),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 0);
            assert_eq!(outcome.feedback, "Setup for test guard failed.");
            assert!(
                !dir.path().join("run_marker").exists(),
                "run command should not have been attempted"
            );
        }

        #[test_log::test]
        fn should_distinguish_a_setup_timeout_from_a_setup_failure() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor("sluggish", "sleep 10", "true", 1, 3),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 0);
            assert_eq!(outcome.feedback, "Setup for test sluggish timed out.");
        }

        #[test_log::test]
        fn should_treat_an_unspawnable_command_as_a_failure() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor("ghost", "true", "____not_a_real_command", 5, 2),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 0);
            assert_eq!(outcome.feedback, "Test ghost failed.");
        }

        #[test_log::test]
        fn should_run_commands_in_order_inside_the_workdir() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor(
                    "layout",
                    "mkdir sub; touch sub/seed",
                    "test -f sub/seed",
                    5,
                    7,
                ),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 7);
            assert!(dir.path().join("sub/seed").exists());
        }

        #[test_log::test]
        fn should_stop_a_run_sequence_at_the_first_failure() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor("chain", "true", "false; touch late_marker", 5, 4),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 0);
            assert_eq!(outcome.feedback, "Test chain failed.");
            assert!(!dir.path().join("late_marker").exists());
        }

        #[test_log::test]
        fn should_leave_partial_setup_mutations_in_place() {
            let dir = tempfile::tempdir().unwrap();
            let outcome = execute(
                &descriptor("mutating", "touch half_done; false", "true", 5, 4),
                dir.path(),
            );
            assert_eq!(outcome.points_awarded, 0);
            assert!(
                dir.path().join("half_done").exists(),
                "setup side effects are not rolled back"
            );
        }
    }
}
