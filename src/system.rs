// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Host system interaction.
//!
//! Every side effect the bootstrap performs on the host goes through the
//! [`Host`] trait: running external commands, cloning repositories, and
//! placing executables. Read-only lookups go through [`Probe`]. Keeping these
//! behind traits lets the planner and installer be exercised against a
//! recording host instead of the real machine.
//!
//! # Failure Taxonomy
//!
//! - __Environment gaps__: a required tool is absent. Reported as a warning,
//!   and the run continues with reduced capability.
//! - __Command failures__: one external invocation failed. Caught per package,
//!   and never aborts the overall run.
//! - __Fatal preconditions__: nothing further can succeed. The binary exits
//!   with a non-zero code.

use crate::path::Environment;

use git2::{build::RepoBuilder, FetchOptions};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Duration,
};
use tracing::{debug, info, instrument};

/// One external command with its arguments.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Construct new invocation of program without arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Run a script through `sh -c`.
    ///
    /// Used for vendor installers that are piped from the network into a
    /// shell. That is an accepted trust boundary of bootstrapping.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").args(["-c".to_string(), script.into()])
    }

    /// Append arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Check if any part of the invocation contains the given text.
    pub fn mentions(&self, needle: &str) -> bool {
        self.program.contains(needle) || self.args.iter().any(|arg| arg.contains(needle))
    }
}

impl Display for Invocation {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(&self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(fmt, " {arg:?}")?;
            } else {
                write!(fmt, " {arg}")?;
            }
        }

        Ok(())
    }
}

/// Read-only view of the host.
pub trait Probe {
    /// Locate executable on `PATH`.
    fn which(&self, program: &str) -> Option<PathBuf>;

    /// Check if a file or directory exists.
    fn path_exists(&self, path: &Path) -> bool;
}

impl Probe for Environment {
    fn which(&self, program: &str) -> Option<PathBuf> {
        Environment::which(self, program)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Mutating view of the host.
pub trait Host: Probe {
    /// Run external command to completion and capture its output.
    fn run(&self, invocation: &Invocation) -> Result<String>;

    /// Clone repository at depth one into destination.
    fn shallow_clone(&self, url: &str, dest: &Path) -> Result<()>;

    /// Copy file into destination path, and mark it executable.
    fn install_executable(&self, src: &Path, dest: &Path) -> Result<()>;
}

/// The real host.
#[derive(Debug, Clone)]
pub struct HostSystem {
    env: Environment,
}

impl HostSystem {
    /// Construct new host that resolves executables through environment.
    pub fn new(env: Environment) -> Self {
        Self { env }
    }

    fn spinner(&self, message: String) -> Result<ProgressBar> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner:.green} {elapsed:.yellow} {msg}")?);
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(100));
        Ok(bar)
    }
}

impl Probe for HostSystem {
    fn which(&self, program: &str) -> Option<PathBuf> {
        self.env.which(program)
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl Host for HostSystem {
    #[instrument(skip(self, invocation), fields(command = %invocation), level = "debug")]
    fn run(&self, invocation: &Invocation) -> Result<String> {
        info!("run {invocation}");
        let bar = self.spinner(invocation.to_string())?;
        let output = syscall(&self.env, invocation);
        bar.finish_and_clear();

        output
    }

    #[instrument(skip(self), level = "debug")]
    fn shallow_clone(&self, url: &str, dest: &Path) -> Result<()> {
        info!("clone {url} into {:?}", dest.display());
        let bar = self.spinner(format!("clone {url}"))?;
        let mut fo = FetchOptions::new();
        fo.depth(1);
        let result = RepoBuilder::new().fetch_options(fo).clone(url, dest);
        bar.finish_and_clear();
        result?;

        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    fn install_executable(&self, src: &Path, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            mkdirp::mkdirp(parent)?;
        }
        fs::copy(src, dest)?;
        mark_executable(dest)?;
        debug!("installed {:?}", dest.display());

        Ok(())
    }
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn syscall(env: &Environment, invocation: &Invocation) -> Result<String> {
    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .env("PATH", env.path_var())
        .stdin(Stdio::inherit())
        .output()
        .map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SystemError::EnvironmentGap(invocation.program.clone()),
            _ => SystemError::Io(err),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            command: invocation.to_string(),
            message,
        });
    }

    Ok(message)
}

/// Host interaction error types.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Required tool is not available on this host.
    #[error("required tool {0:?} is not available")]
    EnvironmentGap(String),

    /// External command exited unsuccessfully.
    #[error("command {command:?} failed:\n{message}")]
    CommandFailed { command: String, message: String },

    /// Precondition failed such that no further step can succeed.
    #[error("{0}")]
    FatalPrecondition(String),

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),

    /// Filesystem operations fail.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Friendly result alias :3
pub type Result<T, E = SystemError> = std::result::Result<T, E>;
