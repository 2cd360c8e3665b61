// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files and executables
//! that need to be interacted with. The process environment is captured once
//! into an [`Environment`] value that gets threaded through each component by
//! reference. Nothing here mutates the real process environment. Changes to
//! `PATH` produce a new [`Environment`], and changes to shell startup files
//! are expressed as [`RcAppend`] write intents that the caller applies.

use std::{
    env,
    ffi::OsString,
    fs::{read_to_string, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Snapshot of the process environment relevant to bootstrapping.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Environment {
    home: PathBuf,
    path: Vec<PathBuf>,
    wsl_distro: Option<String>,
}

impl Environment {
    /// Construct new environment from explicit parts.
    pub fn new(
        home: impl Into<PathBuf>,
        path: impl IntoIterator<Item = impl Into<PathBuf>>,
        wsl_distro: Option<String>,
    ) -> Self {
        Self {
            home: home.into(),
            path: path.into_iter().map(Into::into).collect(),
            wsl_distro,
        }
    }

    /// Capture environment of current process.
    ///
    /// Reads the home directory, `PATH`, and the `WSL_DISTRO_NAME` marker.
    ///
    /// # Errors
    ///
    /// - Return [`NoWayHome`] if home directory path cannot be determined.
    pub fn from_process() -> Result<Self> {
        let home = home_dir()?;
        let path = env::var_os("PATH")
            .map(|value| env::split_paths(&value).collect())
            .unwrap_or_default();
        let wsl_distro = env::var("WSL_DISTRO_NAME")
            .ok()
            .filter(|name| !name.is_empty());

        Ok(Self {
            home,
            path,
            wsl_distro,
        })
    }

    /// Absolute path to user's home directory.
    pub fn home(&self) -> &Path {
        self.home.as_path()
    }

    /// Directories listed in `PATH`, in search order.
    pub fn path_dirs(&self) -> &[PathBuf] {
        self.path.as_slice()
    }

    /// Check if running inside a Windows Subsystem for Linux distribution.
    pub fn is_wsl(&self) -> bool {
        self.wsl_distro.is_some()
    }

    /// Default user-local directory for installed binaries.
    pub fn local_bin(&self) -> PathBuf {
        self.home.join(".local").join("bin")
    }

    /// Produce copy of environment with directory placed in front of `PATH`.
    ///
    /// Returns an unchanged copy if directory is already listed.
    pub fn with_path_prepended(&self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut next = self.clone();
        if !next.path.contains(&dir) {
            next.path.insert(0, dir);
        }

        next
    }

    /// Render `PATH` value of this environment.
    pub fn path_var(&self) -> OsString {
        env::join_paths(&self.path).unwrap_or_default()
    }

    /// Locate executable by searching `PATH` in order.
    ///
    /// First match wins. Relative paths containing a separator are resolved
    /// against the home directory.
    pub fn which(&self, program: &str) -> Option<PathBuf> {
        which::which_in(program, Some(self.path_var()), &self.home).ok()
    }
}

/// Request to export a directory through `PATH` in shell startup files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExport {
    line: String,
}

impl PathExport {
    /// Construct export line for target directory.
    ///
    /// Directories under the home directory are written relative to `$HOME`
    /// so the line stays portable.
    pub fn new(env: &Environment, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        let shown = match dir.strip_prefix(env.home()) {
            Ok(rest) if !rest.as_os_str().is_empty() => format!("$HOME/{}", rest.display()),
            _ => dir.display().to_string(),
        };

        Self {
            line: format!("export PATH=\"{shown}:$PATH\""),
        }
    }

    /// The exact line appended to startup files.
    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    /// Determine write intent for startup file with given contents.
    ///
    /// Returns `None` when the export line is already present.
    pub fn intent_for(&self, rc_file: impl Into<PathBuf>, contents: &str) -> Option<RcAppend> {
        if contents.contains(self.line.as_str()) {
            return None;
        }

        Some(RcAppend {
            file: rc_file.into(),
            line: self.line.clone(),
        })
    }

    /// Read startup file from disk and determine write intent for it.
    ///
    /// Missing startup files are left alone.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if existing startup file cannot be read.
    pub fn intent_for_file(&self, rc_file: impl AsRef<Path>) -> std::io::Result<Option<RcAppend>> {
        let rc_file = rc_file.as_ref();
        if !rc_file.is_file() {
            debug!("skip missing startup file {:?}", rc_file.display());
            return Ok(None);
        }

        let contents = read_to_string(rc_file)?;
        Ok(self.intent_for(rc_file, &contents))
    }
}

/// Write intent to append one line to a shell startup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RcAppend {
    pub file: PathBuf,
    pub line: String,
}

impl RcAppend {
    /// Append the line to the startup file.
    ///
    /// # Errors
    ///
    /// - Return [`std::io::Error`] if startup file cannot be opened or written.
    #[instrument(skip(self), level = "debug")]
    pub fn apply(&self) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.file)?;
        writeln!(file, "\n{}", self.line)?;
        Ok(())
    }
}

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to the root configuration directory.
///
/// Uses `$DOTFILES_ROOT` when set, otherwise `~/.dotfiles`. Does not check if
/// the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_root_dir() -> Result<PathBuf> {
    match env::var_os("DOTFILES_ROOT").filter(|root| !root.is_empty()) {
        Some(root) => Ok(PathBuf::from(root)),
        None => home_dir().map(|home| home.join(".dotfiles")),
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
