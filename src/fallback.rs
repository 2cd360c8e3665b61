// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Fallback install recipes.
//!
//! When the native package manager cannot provide a tool, a small set of
//! tools have bespoke recipes: install through a language toolchain, fetch a
//! release archive, clone and run a bundled installer, or run a vendor
//! install script. Every recipe carries its own existence checks, and every
//! failure is reported as a [`FallbackOutcome`] value instead of an error.

use crate::{
    platform::{OsClass, PlatformContext},
    system::{Host, Invocation, Result as SystemResult},
};

use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Result category of a fallback attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
    NoRecipe,
}

/// Result of attempting a fallback recipe for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub name: String,
    pub outcome: Outcome,

    /// Download URL, manual install hint, or failure message.
    pub detail: Option<String>,
}

impl FallbackOutcome {
    fn new(name: &str, outcome: Outcome, detail: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            outcome,
            detail,
        }
    }
}

/// Bespoke install procedure for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipe {
    /// Install through cargo, otherwise point at manual download.
    Toolchain {
        crate_name: &'static str,
        manual_url: &'static str,
    },

    /// Download release archive and extract a single binary.
    ReleaseArchive {
        repo: &'static str,
        binary: &'static str,
    },

    /// Install through cargo, otherwise run vendor install script.
    ToolchainOrScript {
        crate_name: &'static str,
        script_url: &'static str,
    },

    /// Clone source repository, and run its bundled installer.
    CloneAndInstall {
        repo_url: &'static str,
        dir_name: &'static str,
        installer_args: &'static [&'static str],
    },
}

/// Look up fallback recipe by short package name.
pub fn recipe_for(name: &str) -> Option<Recipe> {
    let recipe = match name {
        "bat" => Recipe::Toolchain {
            crate_name: "bat",
            manual_url: "https://github.com/sharkdp/bat/releases",
        },
        "eza" => Recipe::Toolchain {
            crate_name: "eza",
            manual_url: "https://github.com/eza-community/eza/releases",
        },
        "lazygit" => Recipe::ReleaseArchive {
            repo: "jesseduffield/lazygit",
            binary: "lazygit",
        },
        "zoxide" => Recipe::ToolchainOrScript {
            crate_name: "zoxide",
            script_url: "https://raw.githubusercontent.com/ajeetdsouza/zoxide/main/install.sh",
        },
        "fzf" => Recipe::CloneAndInstall {
            repo_url: "https://github.com/junegunn/fzf.git",
            dir_name: ".fzf",
            installer_args: &["--key-bindings", "--completion", "--no-update-rc"],
        },
        _ => return None,
    };

    Some(recipe)
}

/// Compute release archive URL for a versioned GitHub release.
///
/// Follows the `<binary>_<version>_<Os>_<arch>.tar.gz` asset naming used by
/// goreleaser projects. Only macOS and Linux have tarball assets.
pub fn release_archive_url(
    repo: &str,
    binary: &str,
    version: &str,
    os: OsClass,
    arch: &str,
) -> Option<String> {
    let version = version.trim_start_matches('v');
    let os = match os {
        OsClass::MacOs => "Darwin",
        OsClass::Linux => "Linux",
        OsClass::Windows | OsClass::Unknown => return None,
    };

    let asset = format!("{binary}_{version}_{os}_{arch}.tar.gz");
    Some(format!("https://github.com/{repo}/releases/download/v{version}/{asset}"))
}

/// Tool installed once per session regardless of catalog contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentTool {
    pub name: &'static str,
    pub script: &'static str,
}

/// A shell prompt, a fast runtime-version manager, and a universal runtime
/// manager.
pub const ENVIRONMENT_TOOLS: [EnvironmentTool; 3] = [
    EnvironmentTool {
        name: "starship",
        script: "curl -sS https://starship.rs/install.sh | sh -s -- -y",
    },
    EnvironmentTool {
        name: "fnm",
        script: "curl -fsSL https://fnm.vercel.app/install | bash -s -- --skip-shell",
    },
    EnvironmentTool {
        name: "mise",
        script: "curl -fsSL https://mise.run | sh",
    },
];

/// Executes fallback recipes against a host.
#[derive(Debug)]
pub struct Fallbacks<'a, H>
where
    H: Host,
{
    ctx: &'a PlatformContext,
    host: &'a H,
    home: PathBuf,
    bin_dir: PathBuf,
    lazygit_version: String,
}

impl<'a, H> Fallbacks<'a, H>
where
    H: Host,
{
    /// Construct new fallback executor.
    pub fn new(
        ctx: &'a PlatformContext,
        host: &'a H,
        home: impl Into<PathBuf>,
        bin_dir: impl Into<PathBuf>,
        lazygit_version: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            host,
            home: home.into(),
            bin_dir: bin_dir.into(),
            lazygit_version: lazygit_version.into(),
        }
    }

    /// Attempt fallback recipe for package.
    #[instrument(skip(self), level = "debug")]
    pub fn attempt(&self, name: &str) -> FallbackOutcome {
        let Some(recipe) = recipe_for(name) else {
            warn!("no fallback recipe for {name}, install it manually");
            return FallbackOutcome::new(name, Outcome::NoRecipe, None);
        };

        info!("attempt fallback install of {name}");
        let outcome = match recipe {
            Recipe::Toolchain {
                crate_name,
                manual_url,
            } => self.via_toolchain(name, crate_name, manual_url),
            Recipe::ReleaseArchive { repo, binary } => self.via_release_archive(name, repo, binary),
            Recipe::ToolchainOrScript {
                crate_name,
                script_url,
            } => self.via_toolchain_or_script(name, crate_name, script_url),
            Recipe::CloneAndInstall {
                repo_url,
                dir_name,
                installer_args,
            } => self.via_clone(name, repo_url, dir_name, installer_args),
        };

        match outcome.outcome {
            Outcome::Success => info!("installed {name} through fallback"),
            _ => warn!(
                "fallback install of {name} failed: {}",
                outcome.detail.as_deref().unwrap_or("no details")
            ),
        }

        outcome
    }

    /// Install environment-level tools that are not already present.
    ///
    /// Returns outcomes for attempted tools only.
    #[instrument(skip(self), level = "debug")]
    pub fn ensure_environment_tools(&self) -> Vec<FallbackOutcome> {
        ENVIRONMENT_TOOLS
            .iter()
            .filter_map(|tool| {
                if self.host.which(tool.name).is_some() {
                    info!("{} already installed", tool.name);
                    return None;
                }

                info!("install {} through vendor script", tool.name);
                let outcome = match self.host.run(&Invocation::shell(tool.script)) {
                    Ok(_) => FallbackOutcome::new(tool.name, Outcome::Success, None),
                    Err(err) => {
                        warn!("failed to install {}: {err}", tool.name);
                        FallbackOutcome::new(tool.name, Outcome::Failure, Some(err.to_string()))
                    }
                };

                Some(outcome)
            })
            .collect()
    }

    fn via_toolchain(&self, name: &str, crate_name: &str, manual_url: &str) -> FallbackOutcome {
        if self.host.which("cargo").is_none() {
            return FallbackOutcome::new(
                name,
                Outcome::Failure,
                Some(format!("cargo not available, download {name} from {manual_url}")),
            );
        }

        self.finish(name, self.cargo_install(crate_name), None)
    }

    fn via_toolchain_or_script(
        &self,
        name: &str,
        crate_name: &str,
        script_url: &str,
    ) -> FallbackOutcome {
        if self.host.which("cargo").is_some() {
            return self.finish(name, self.cargo_install(crate_name), None);
        }

        let script = format!("curl -sSfL {script_url} | sh");
        let result = self.host.run(&Invocation::shell(script)).map(|_| ());
        self.finish(name, result, Some(script_url.to_string()))
    }

    fn via_release_archive(&self, name: &str, repo: &str, binary: &str) -> FallbackOutcome {
        let Some(url) = release_archive_url(
            repo,
            binary,
            &self.lazygit_version,
            self.ctx.os,
            self.ctx.release_arch(),
        ) else {
            return FallbackOutcome::new(
                name,
                Outcome::Failure,
                Some(format!("no release asset of {name} for {}", self.ctx.os)),
            );
        };
        let result = self.fetch_release_binary(&url, binary);
        self.finish(name, result, Some(url))
    }

    fn fetch_release_binary(&self, url: &str, binary: &str) -> SystemResult<()> {
        // INVARIANT: Scratch directory is removed on drop, success or not.
        let scratch = tempfile::tempdir()?;
        let archive = scratch.path().join(format!("{binary}.tar.gz"));

        self.host.run(&Invocation::new("curl").args([
            "-fsSL".to_string(),
            "-o".to_string(),
            display(&archive),
            url.to_string(),
        ]))?;
        self.host.run(&Invocation::new("tar").args([
            "-xzf".to_string(),
            display(&archive),
            "-C".to_string(),
            display(scratch.path()),
            binary.to_string(),
        ]))?;
        self.host
            .install_executable(&scratch.path().join(binary), &self.bin_dir.join(binary))?;

        Ok(())
    }

    fn via_clone(
        &self,
        name: &str,
        repo_url: &str,
        dir_name: &str,
        installer_args: &[&str],
    ) -> FallbackOutcome {
        let dest = self.home.join(dir_name);
        if self.host.path_exists(&dest) {
            info!("{name} already present at {:?}", dest.display());
            return FallbackOutcome::new(name, Outcome::Success, Some(display(&dest)));
        }

        let installer = Invocation::new(display(&dest.join("install")))
            .args(installer_args.iter().copied());
        let result = self
            .host
            .shallow_clone(repo_url, &dest)
            .and_then(|_| self.host.run(&installer).map(|_| ()));
        self.finish(name, result, Some(repo_url.to_string()))
    }

    fn cargo_install(&self, crate_name: &str) -> SystemResult<()> {
        self.host
            .run(&Invocation::new("cargo").args(["install", "--locked", crate_name]))
            .map(|_| ())
    }

    fn finish(
        &self,
        name: &str,
        result: SystemResult<()>,
        detail: Option<String>,
    ) -> FallbackOutcome {
        match result {
            Ok(()) => FallbackOutcome::new(name, Outcome::Success, detail),
            Err(err) => {
                let message = match detail {
                    Some(detail) => format!("{err} ({detail})"),
                    None => err.to_string(),
                };
                FallbackOutcome::new(name, Outcome::Failure, Some(message))
            }
        }
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("bat", true; "pager")]
    #[test_case("eza", true; "listing")]
    #[test_case("lazygit", true; "git tui")]
    #[test_case("zoxide", true; "jumper")]
    #[test_case("fzf", true; "fuzzy finder")]
    #[test_case("neovim", false; "no recipe")]
    #[test]
    fn recipe_dispatch(name: &str, expect: bool) {
        assert_eq!(recipe_for(name).is_some(), expect);
    }

    const REPO: &str = "jesseduffield/lazygit";

    #[test]
    fn release_url_uses_normalized_arch() {
        let result = release_archive_url(REPO, "lazygit", "v0.44.1", OsClass::Linux, "arm64");
        let expect = "https://github.com/jesseduffield/lazygit/releases/download/v0.44.1/\
                      lazygit_0.44.1_Linux_arm64.tar.gz";
        assert_eq!(result.as_deref(), Some(expect));

        let result = release_archive_url(REPO, "lazygit", "0.44.1", OsClass::MacOs, "x86_64");
        assert!(result.is_some_and(|url| url.ends_with("lazygit_0.44.1_Darwin_x86_64.tar.gz")));
    }

    #[test_case(OsClass::Windows; "windows")]
    #[test_case(OsClass::Unknown; "unknown")]
    #[test]
    fn release_url_missing_for_platform_without_tarball(os: OsClass) {
        assert_eq!(release_archive_url(REPO, "lazygit", "0.44.1", os, "x86_64"), None);
    }

    #[test]
    fn environment_tools_are_distinct() {
        let names = ENVIRONMENT_TOOLS.iter().map(|tool| tool.name).collect::<Vec<_>>();
        assert_eq!(names, vec!["starship", "fnm", "mise"]);
    }
}
