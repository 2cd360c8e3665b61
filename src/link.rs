// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration directory linking.
//!
//! Each top-level directory of the root configuration directory is a
//! __link package__ laid out the way GNU Stow expects: its contents mirror
//! the target directory. Linking a package symlinks its contents into the
//! target. A package is either linked or not, and restowing an already linked
//! package is a no-op, so linking can run on every bootstrap.

use crate::system::{Host, Invocation, Result, SystemError};

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Link packages found in root directory into target directory.
#[derive(Debug)]
pub struct Linker<'a, H>
where
    H: Host,
{
    host: &'a H,
    root: PathBuf,
    target: PathBuf,
}

impl<'a, H> Linker<'a, H>
where
    H: Host,
{
    /// Construct new linker.
    pub fn new(host: &'a H, root: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            host,
            root: root.into(),
            target: target.into(),
        }
    }

    /// Link every given package, continuing past failures.
    ///
    /// Returns names of packages that failed to link.
    ///
    /// # Errors
    ///
    /// - Return [`SystemError::EnvironmentGap`] if stow is not installed.
    #[instrument(skip(self, packages), level = "debug")]
    pub fn link_all(&self, packages: &[String]) -> Result<Vec<String>> {
        if self.host.which("stow").is_none() {
            return Err(SystemError::EnvironmentGap("stow".into()));
        }

        let mut failed = Vec::new();
        for package in packages {
            if let Err(err) = self.link(package) {
                warn!("failed to link {package}: {err}");
                failed.push(package.clone());
            }
        }

        Ok(failed)
    }

    /// Link one package.
    ///
    /// # Errors
    ///
    /// - Return [`SystemError::EnvironmentGap`] if package directory is missing.
    /// - Return [`SystemError::CommandFailed`] if stow fails.
    pub fn link(&self, package: &str) -> Result<()> {
        if !self.host.path_exists(&self.root.join(package)) {
            return Err(SystemError::EnvironmentGap(format!("package directory {package}")));
        }

        self.host.run(&Invocation::new("stow").args([
            "--restow".to_string(),
            "--dir".to_string(),
            self.root.display().to_string(),
            "--target".to_string(),
            self.target.display().to_string(),
            package.to_string(),
        ]))?;
        info!("linked {package} into {:?}", self.target.display());

        Ok(())
    }
}

/// Discover link packages in root directory.
///
/// Every non-hidden top-level directory counts, sorted by name.
///
/// # Errors
///
/// - Return [`LinkError::Pattern`] if root directory makes an invalid pattern.
pub fn discover_packages(root: impl AsRef<Path>) -> std::result::Result<Vec<String>, LinkError> {
    let root = glob::Pattern::escape(&root.as_ref().display().to_string());
    let pattern = format!("{}/*", root.trim_end_matches('/'));

    let mut packages = glob::glob(&pattern)?
        .filter_map(std::result::Result::ok)
        .filter(|path| path.is_dir())
        .filter_map(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .filter(|name| !name.starts_with('.'))
        .collect::<Vec<_>>();
    packages.sort();

    Ok(packages)
}

/// Link package discovery error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Glob pattern of root directory is invalid.
    #[error(transparent)]
    Pattern(#[from] glob::PatternError),
}
