//! Subprocess execution
//!
//! Every external program ffcss runs goes through a [`CommandRunner`], so
//! callers can substitute their own runner (tests never spawn `git`).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A program invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory, or the current one when `None`
    pub dir: Option<PathBuf>,
}

impl CommandLine {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
        }
    }

    pub fn in_dir(mut self, dir: &Path) -> Self {
        self.dir = Some(dir.to_path_buf());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status and combined stdout/stderr of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs a command to completion
pub trait CommandRunner {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessOutput>;
}

/// Runs commands with [`std::process::Command`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessOutput> {
        let mut process = Command::new(&command.program);
        process.args(&command.args);
        if let Some(dir) = &command.dir {
            process.current_dir(dir);
        }

        tracing::debug!("Running {}", command);
        let output = process.output()?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ProcessOutput {
            code: output.status.code(),
            output: combined,
        })
    }
}
