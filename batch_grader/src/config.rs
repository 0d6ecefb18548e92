use crate::GraderError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// One or more shell command strings.
///
/// The single-string form may pack several commands separated by `;`; the
/// list form carries one command per item. Either way, each command is
/// tokenized into an argv with `shlex` before execution — commands are never
/// handed to a shell.
///
/// The `;` split happens before tokenization, so the single-string form
/// cannot carry a quoted `;` (the fragments are rejected as unbalanced
/// quoting). A command needing a literal `;` must use the list form.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum CommandSeq {
    Single(String),
    Many(Vec<String>),
}

impl CommandSeq {
    /// Splits the sequence into individual argvs, in execution order.
    pub fn argvs(&self) -> Result<Vec<Vec<String>>, &'static str> {
        let raw: Vec<&str> = match self {
            CommandSeq::Single(combined) => combined.split(';').collect(),
            CommandSeq::Many(commands) => commands.iter().map(String::as_str).collect(),
        };
        let raw: Vec<&str> = raw.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
        if raw.is_empty() {
            return Err("empty command sequence");
        }

        let mut argvs = Vec::with_capacity(raw.len());
        for command in raw {
            let argv = shlex::split(command).ok_or("command has unbalanced quoting")?;
            if argv.is_empty() {
                return Err("command tokenized to nothing");
            }
            argvs.push(argv);
        }
        Ok(argvs)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
struct TestDescriptorUnchecked {
    name: String,
    setup: CommandSeq,
    run: CommandSeq,
    timeout: u64,
    points: u32,
}

/// One gradable check: setup commands, run commands, a per-command timeout
/// in seconds, and an all-or-nothing point award.
///
/// Read-only after loading; the runner never mutates a descriptor.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(try_from = "TestDescriptorUnchecked")]
pub struct TestDescriptor {
    pub name: String,
    pub setup: CommandSeq,
    pub run: CommandSeq,
    pub timeout: u64,
    pub points: u32,
}

impl TestDescriptor {
    fn build(
        name: String,
        setup: CommandSeq,
        run: CommandSeq,
        timeout: u64,
        points: u32,
    ) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("test name must not be empty".to_string());
        }
        if timeout == 0 {
            return Err(format!("test '{name}': timeout must be at least 1 second"));
        }
        setup
            .argvs()
            .map_err(|reason| format!("test '{name}': invalid setup: {reason}"))?;
        run.argvs()
            .map_err(|reason| format!("test '{name}': invalid run: {reason}"))?;

        Ok(Self {
            name,
            setup,
            run,
            timeout,
            points,
        })
    }
}

impl TryFrom<TestDescriptorUnchecked> for TestDescriptor {
    type Error = String;

    fn try_from(value: TestDescriptorUnchecked) -> Result<Self, Self::Error> {
        let TestDescriptorUnchecked {
            name,
            setup,
            run,
            timeout,
            points,
        } = value;

        TestDescriptor::build(name, setup, run, timeout, points)
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(deny_unknown_fields)]
struct TestSuiteUnchecked {
    tests: Vec<TestDescriptor>,
}

/// The full list of descriptors graded against every repository.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(try_from = "TestSuiteUnchecked")]
pub struct TestSuite {
    pub tests: Vec<TestDescriptor>,
}

impl TryFrom<TestSuiteUnchecked> for TestSuite {
    type Error = String;

    fn try_from(value: TestSuiteUnchecked) -> Result<Self, Self::Error> {
        if value.tests.is_empty() {
            return Err("at least one test is expected".to_string());
        }
        Ok(Self { tests: value.tests })
    }
}

impl TestSuite {
    /// Loads and validates a descriptor file.
    pub fn load(path: &Path) -> Result<Self, GraderError> {
        debug!("loading descriptor file '{}'", path.display());
        let raw = fs::read_to_string(path).map_err(|source| GraderError::SuiteIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|err| GraderError::SuiteInvalid {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}
