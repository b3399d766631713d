//! Git operations used to download and pin themes

use std::path::Path;
use thiserror::Error;

use crate::process::{CommandLine, CommandRunner, ProcessOutput};

/// Exit code git uses when a remote repository cannot be found
pub const REPOSITORY_NOT_FOUND_EXIT_CODE: i32 = 128;

/// Failure of a git invocation
#[derive(Error, Debug)]
pub enum GitError {
    #[error("couldn't run `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {}: {}", describe_code(.code), .output.trim())]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by a signal)".to_string(),
    }
}

/// Git client running its commands through a [`CommandRunner`]
#[derive(Clone, Copy)]
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Whether `url` points to a repository git can clone.
    ///
    /// Errors other than "repository not found" are logged and count as not
    /// clonable.
    pub fn is_clonable(&self, url: &str) -> bool {
        let command = CommandLine::new("git", ["ls-remote", url]);
        match self.runner.run(&command) {
            Ok(result) if result.success() => true,
            Ok(result) if result.code == Some(REPOSITORY_NOT_FOUND_EXIT_CODE) => false,
            Ok(result) => {
                tracing::warn!(
                    "could not determine clonability of {}: `{}` exited with {}: {}",
                    url,
                    command,
                    describe_code(&result.code),
                    result.output.trim()
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    "could not determine clonability of {}: while running `{}`: {}",
                    url,
                    command,
                    e
                );
                false
            }
        }
    }

    /// Clone `url` into `into`, optionally checking out `branch`
    pub fn clone_repository(
        &self,
        url: &str,
        into: &Path,
        branch: Option<&str>,
    ) -> Result<(), GitError> {
        let mut args = vec![
            "clone".to_string(),
            url.to_string(),
            into.display().to_string(),
        ];
        if let Some(branch) = branch {
            args.push("--branch".to_string());
            args.push(branch.to_string());
        }
        self.run(CommandLine::new("git", args))
    }

    pub fn switch_branch(&self, repository: &Path, branch: &str) -> Result<(), GitError> {
        self.run(CommandLine::new("git", ["switch", branch]).in_dir(repository))
    }

    pub fn checkout_commit(&self, repository: &Path, commit: &str) -> Result<(), GitError> {
        self.run(CommandLine::new("git", ["checkout", commit]).in_dir(repository))
    }

    /// Fetch every tag, then check out `tag`
    pub fn checkout_tag(&self, repository: &Path, tag: &str) -> Result<(), GitError> {
        self.run(CommandLine::new("git", ["fetch", "--all", "--tags"]).in_dir(repository))?;
        let tag_ref = format!("tags/{tag}");
        self.run(CommandLine::new("git", ["checkout", tag_ref.as_str()]).in_dir(repository))
    }

    /// URL of the `origin` remote of the repository at `repository`, if it
    /// has one
    pub fn origin_url(&self, repository: &Path) -> Option<String> {
        let command = CommandLine::new("git", ["config", "--get", "remote.origin.url"])
            .in_dir(repository);
        match self.runner.run(&command) {
            Ok(result) if result.success() && !result.output.trim().is_empty() => {
                Some(result.output.trim().to_string())
            }
            Ok(_) | Err(_) => {
                tracing::warn!(
                    "Could not get the URL of the origin remote, leaving the download location blank"
                );
                None
            }
        }
    }

    fn run(&self, command: CommandLine) -> Result<(), GitError> {
        let result = self.runner.run(&command).map_err(|source| GitError::Spawn {
            command: command.to_string(),
            source,
        })?;
        check(&command, result)
    }
}

fn check(command: &CommandLine, result: ProcessOutput) -> Result<(), GitError> {
    if result.success() {
        return Ok(());
    }
    Err(GitError::Failed {
        command: command.to_string(),
        code: result.code,
        output: result.output,
    })
}
