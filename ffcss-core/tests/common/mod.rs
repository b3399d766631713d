//! Test helpers shared by the integration tests
//!
//! Nothing here touches the network or spawns `git`: repositories and
//! websites are scripted in memory and materialized on disk when the
//! acquisition code asks for them.

#![allow(dead_code)]

use ffcss_core::http::{Fetcher, RemoteFile};
use ffcss_core::process::{CommandLine, CommandRunner, ProcessOutput};
use ffcss_core::{DataDirs, Session};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Once;
use tempfile::TempDir;

/// Initialize logging for tests (only once per test run)
static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_target(true)
                    .with_level(true),
            )
            .with(tracing_subscriber::filter::EnvFilter::from_default_env())
            .try_init();
    });
}

/// Cache and config roots inside a temporary directory
pub struct TestEnv {
    pub temp: TempDir,
    pub dirs: DataDirs,
}

impl TestEnv {
    pub fn new() -> Self {
        init_test_logging();
        let temp = TempDir::new().unwrap();
        let dirs = DataDirs::new(temp.path().join("cache"), temp.path().join("config"));
        Self { temp, dirs }
    }

    pub fn session(&self) -> Session {
        Session::new(self.dirs.clone())
    }

    /// Add a manifest to the catalog directory
    pub fn add_to_catalog(&self, file_name: &str, manifest: &str) {
        let dir = self.dirs.catalog_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file_name), manifest).unwrap();
    }

    /// Entries left in the staging area
    pub fn leftover_downloads(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.dirs.downloads_dir()) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

type Files = Vec<(String, String)>;

#[derive(Default)]
struct RunnerState {
    /// Files of each repository, keyed by URL or by `URL#branch`
    repositories: HashMap<String, Files>,
    /// `git ls-remote` exit codes, 128 for unknown URLs
    remotes: HashMap<String, i32>,
    /// Subcommands that fail with exit code 1
    failing: Vec<String>,
    calls: Vec<CommandLine>,
}

/// A scripted `git`
///
/// Clones write the scripted files of the repository into the clone
/// destination. Clones share their state so a test can keep a handle on the
/// runner after handing it over.
#[derive(Clone, Default)]
pub struct ScriptedGit {
    state: Rc<RefCell<RunnerState>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a clonable repository at `url` with `files` on its default
    /// branch
    pub fn with_repository(self, url: &str, files: &[(&str, &str)]) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.repositories.insert(url.to_string(), to_files(files));
            state.remotes.insert(url.to_string(), 0);
        }
        self
    }

    /// Serve different files when `branch` is cloned
    pub fn with_branch(self, url: &str, branch: &str, files: &[(&str, &str)]) -> Self {
        self.state
            .borrow_mut()
            .repositories
            .insert(format!("{url}#{branch}"), to_files(files));
        self
    }

    /// Make `git ls-remote <url>` exit with `code`
    pub fn with_remote_code(self, url: &str, code: i32) -> Self {
        self.state.borrow_mut().remotes.insert(url.to_string(), code);
        self
    }

    /// Make `git <subcommand>` fail
    pub fn failing(self, subcommand: &str) -> Self {
        self.state.borrow_mut().failing.push(subcommand.to_string());
        self
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.state.borrow().calls.clone()
    }

    /// Arguments of every call, joined with spaces
    pub fn call_lines(&self) -> Vec<String> {
        self.calls().iter().map(|c| c.args.join(" ")).collect()
    }

    fn clone_into(&self, args: &[String]) -> io::Result<ProcessOutput> {
        let url = &args[1];
        let into = Path::new(&args[2]);
        let branch = args
            .iter()
            .position(|a| a == "--branch")
            .map(|i| args[i + 1].clone());

        let state = self.state.borrow();
        let files = branch
            .and_then(|b| state.repositories.get(&format!("{url}#{b}")))
            .or_else(|| state.repositories.get(url));

        let Some(files) = files else {
            return Ok(exit(
                128,
                &format!("fatal: repository '{url}' not found"),
            ));
        };

        for (path, content) in files {
            let path = into.join(path);
            std::fs::create_dir_all(path.parent().unwrap())?;
            std::fs::write(path, content)?;
        }
        Ok(exit(0, ""))
    }
}

impl CommandRunner for ScriptedGit {
    fn run(&self, command: &CommandLine) -> io::Result<ProcessOutput> {
        assert_eq!(command.program, "git");
        self.state.borrow_mut().calls.push(command.clone());

        let subcommand = command.args[0].as_str();
        if self.state.borrow().failing.iter().any(|f| f == subcommand) {
            return Ok(exit(1, &format!("error: {subcommand} failed")));
        }

        match subcommand {
            "ls-remote" => {
                let code = self
                    .state
                    .borrow()
                    .remotes
                    .get(&command.args[1])
                    .copied()
                    .unwrap_or(128);
                Ok(exit(code, ""))
            }
            "clone" => self.clone_into(&command.args),
            _ => Ok(exit(0, "")),
        }
    }
}

fn exit(code: i32, output: &str) -> ProcessOutput {
    ProcessOutput {
        code: Some(code),
        output: output.to_string(),
    }
}

fn to_files(files: &[(&str, &str)]) -> Files {
    files
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect()
}

/// Zip archive holding `files`
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(io::Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[derive(Default)]
struct FetcherState {
    sites: HashMap<String, (RemoteFile, Vec<u8>)>,
    requests: Vec<String>,
}

/// A scripted web server
#[derive(Clone, Default)]
pub struct FakeWeb {
    state: Rc<RefCell<FetcherState>>,
}

impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`
    pub fn serving(self, url: &str, status: u16, content_type: &str, body: Vec<u8>) -> Self {
        let status_text = match status {
            200 => "200 OK".to_string(),
            404 => "404 Not Found".to_string(),
            other => other.to_string(),
        };
        self.state.borrow_mut().sites.insert(
            url.to_string(),
            (
                RemoteFile {
                    status,
                    status_text,
                    content_type: Some(content_type.to_string()),
                },
                body,
            ),
        );
        self
    }

    /// Requests received, as `METHOD url`
    pub fn requests(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }
}

impl Fetcher for FakeWeb {
    fn head(&self, url: &str) -> anyhow::Result<RemoteFile> {
        let mut state = self.state.borrow_mut();
        state.requests.push(format!("HEAD {url}"));
        state
            .sites
            .get(url)
            .map(|(remote, _)| remote.clone())
            .ok_or_else(|| anyhow::anyhow!("connection refused"))
    }

    fn download(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let mut state = self.state.borrow_mut();
        state.requests.push(format!("GET {url}"));
        let (_, body) = state
            .sites
            .get(url)
            .ok_or_else(|| anyhow::anyhow!("connection refused"))?;
        std::fs::write(dest, body)?;
        Ok(())
    }
}
