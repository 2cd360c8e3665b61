// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap session.
//!
//! Drive one pass of the package pipeline:
//!
//! 1. Parse the catalog into package directives.
//! 2. Plan each directive against the resolved platform.
//! 3. Install every package mapped to the native package manager, one at a
//!    time. A failing install never aborts the pass. It is queued instead.
//! 4. Attempt fallback recipes for the queue, in the order failures were
//!    observed.
//!
//! The pass ends with a [`RunSummary`] that counts what happened.

use crate::{
    catalog::{self, PackageDirective},
    config::{BootstrapConfig, UnrecognizedPolicy},
    fallback::{FallbackOutcome, Fallbacks, Outcome},
    path::Environment,
    plan::{NativeNames, Plan, Planner, ResolvedAction, Status},
    platform::{OsClass, PackageManager, PlatformContext},
    system::{Host, Invocation, Result, SystemError},
};

use std::{
    cell::Cell,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, info, instrument, warn};

/// Vendor installer for Homebrew.
pub const HOMEBREW_INSTALL_SCRIPT: &str = concat!(
    "curl -fsSL https://raw.githubusercontent.com/Homebrew/install/HEAD/install.sh",
    " | NONINTERACTIVE=1 bash",
);

/// Counts of everything that happened during one bootstrap pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub installed: Vec<String>,
    pub already_satisfied: Vec<String>,
    pub skipped_platform: Vec<String>,
    pub native_failures: Vec<String>,
    pub fallbacks: Vec<FallbackOutcome>,
    pub unrecognized: usize,

    /// Environment tools whose vendor installer failed.
    pub environment_failures: Vec<String>,
}

impl RunSummary {
    /// Packages that fallback recipes installed.
    pub fn recovered(&self) -> Vec<&str> {
        self.fallbacks_with(|outcome| outcome == Outcome::Success)
    }

    /// Packages left uninstalled after every strategy was tried.
    pub fn unresolved(&self) -> Vec<&str> {
        self.fallbacks_with(|outcome| outcome != Outcome::Success)
    }

    /// Check if pass finished without anything left uninstalled.
    pub fn is_clean(&self) -> bool {
        self.unresolved().is_empty() && self.environment_failures.is_empty()
    }

    /// Record outcomes of the environment tool step.
    pub fn record_environment_tools(&mut self, outcomes: &[FallbackOutcome]) {
        self.environment_failures.extend(
            outcomes
                .iter()
                .filter(|outcome| outcome.outcome != Outcome::Success)
                .map(|outcome| outcome.name.clone()),
        );
    }

    fn fallbacks_with(&self, keep: impl Fn(Outcome) -> bool) -> Vec<&str> {
        self.fallbacks
            .iter()
            .filter(|fallback| keep(fallback.outcome))
            .map(|fallback| fallback.name.as_str())
            .collect()
    }
}

impl Display for RunSummary {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(
            fmt,
            "{} installed, {} already present, {} skipped (platform), {} failed natively, \
             {} recovered by fallback, {} unresolved, {} unrecognized line(s)",
            self.installed.len(),
            self.already_satisfied.len(),
            self.skipped_platform.len(),
            self.native_failures.len(),
            self.recovered().len(),
            self.unresolved().len(),
            self.unrecognized,
        )?;

        let unresolved = self.unresolved();
        if !unresolved.is_empty() {
            write!(fmt, "\nunresolved: {}", unresolved.join(", "))?;
        }

        if !self.skipped_platform.is_empty() {
            write!(fmt, "\nskipped on this platform: {}", self.skipped_platform.join(", "))?;
        }

        if !self.environment_failures.is_empty() {
            write!(
                fmt,
                "\nenvironment tools failed: {}",
                self.environment_failures.join(", ")
            )?;
        }

        Ok(())
    }
}

/// One bootstrap session against a host.
#[derive(Debug)]
pub struct Bootstrap<'a, H>
where
    H: Host,
{
    ctx: &'a PlatformContext,
    env: &'a Environment,
    host: &'a H,
    config: &'a BootstrapConfig,
    names: NativeNames,
    refreshed: Cell<bool>,
}

impl<'a, H> Bootstrap<'a, H>
where
    H: Host,
{
    /// Construct new bootstrap session.
    pub fn new(
        ctx: &'a PlatformContext,
        env: &'a Environment,
        host: &'a H,
        config: &'a BootstrapConfig,
    ) -> Self {
        Self {
            ctx,
            env,
            host,
            config,
            names: NativeNames::with_mappings(config.mappings()),
            refreshed: Cell::new(false),
        }
    }

    /// Parse catalog, and collect package directives.
    ///
    /// Unrecognized lines are reported according to the configured policy,
    /// and counted.
    pub fn directives(&self, catalog: &str) -> (Vec<PackageDirective>, usize) {
        let mut directives = Vec::new();
        let mut unrecognized = 0;
        for item in catalog::parse(catalog, self.ctx) {
            match item {
                Ok(directive) => directives.push(directive),
                Err(err) => {
                    unrecognized += 1;
                    match self.config.settings.unrecognized {
                        UnrecognizedPolicy::Warn => warn!("{err}"),
                        UnrecognizedPolicy::Silent => debug!("{err}"),
                    }
                }
            }
        }

        (directives, unrecognized)
    }

    /// Plan catalog without installing anything.
    pub fn plan(&self, catalog: &str) -> (Plan, usize) {
        let (directives, unrecognized) = self.directives(catalog);
        let plan = Planner::new(self.ctx, &self.names, self.host).plan(directives);

        (plan, unrecognized)
    }

    /// Run the full package pipeline over catalog text.
    #[instrument(skip(self, catalog), level = "debug")]
    pub fn run(&self, catalog: &str) -> RunSummary {
        let (plan, unrecognized) = self.plan(catalog);
        let mut summary = RunSummary {
            unrecognized,
            ..RunSummary::default()
        };

        // INVARIANT: Fallback queue order is the order failures were observed.
        let mut queue = Vec::new();
        for action in plan.actions() {
            match action.status {
                Status::AlreadySatisfied => {
                    summary.already_satisfied.push(action.name.clone());
                }
                Status::SkippedPlatformMismatch => {
                    summary.skipped_platform.push(action.name.clone());
                }
                Status::MappedToNative => match self.install_native(action) {
                    Ok(()) => summary.installed.push(action.name.clone()),
                    Err(err) => {
                        warn!("native install of {} failed: {err}", action.name);
                        summary.native_failures.push(action.name.clone());
                        queue.push(action.name.clone());
                    }
                },
                Status::Unmapped => {
                    info!("{} has no native package on {}", action.name, self.ctx.package_manager);
                    queue.push(action.name.clone());
                }
            }
        }

        let fallbacks = self.fallbacks();
        summary.fallbacks = queue.iter().map(|name| fallbacks.attempt(name)).collect();
        info!("summary: {summary}");

        summary
    }

    /// Install environment-level tools once per session.
    pub fn ensure_environment_tools(&self) -> Vec<FallbackOutcome> {
        self.fallbacks().ensure_environment_tools()
    }

    /// Install one package through the native package manager.
    ///
    /// # Errors
    ///
    /// - Return [`SystemError::EnvironmentGap`] if no package manager exists.
    /// - Return [`SystemError::CommandFailed`] if the install command fails.
    #[instrument(skip(self, action), fields(package = %action.name), level = "debug")]
    pub fn install_native(&self, action: &ResolvedAction) -> Result<()> {
        let native = action.native.as_deref().unwrap_or(action.name.as_str());
        let Some(invocation) = self
            .ctx
            .package_manager
            .install_invocation(native, action.is_cask())
        else {
            warn!("no package manager available to install {native}");
            return Err(SystemError::EnvironmentGap("package manager".into()));
        };

        if !self.refreshed.replace(true) {
            if let Some(refresh) = self.ctx.package_manager.refresh_invocation() {
                if let Err(err) = self.host.run(&refresh) {
                    warn!("failed to refresh package index: {err}");
                }
            }
        }

        self.host.run(&invocation)?;
        info!("installed {native} with {}", self.ctx.package_manager);

        Ok(())
    }

    fn fallbacks(&self) -> Fallbacks<'a, H> {
        Fallbacks::new(
            self.ctx,
            self.host,
            self.env.home(),
            self.config.settings.bin_dir(),
            self.config.settings.lazygit_version.as_str(),
        )
    }
}

/// Check that the developer toolchain required by later steps exists.
///
/// On macOS the command line tools are required. When missing, their vendor
/// installer is started, and the user must rerun once it completes.
///
/// # Errors
///
/// - Return [`SystemError::FatalPrecondition`] if toolchain is missing.
#[instrument(skip(ctx, host), level = "debug")]
pub fn check_developer_toolchain(ctx: &PlatformContext, host: &impl Host) -> Result<()> {
    if ctx.os != OsClass::MacOs {
        return Ok(());
    }

    if host.run(&Invocation::new("xcode-select").args(["-p"])).is_ok() {
        debug!("command line tools present");
        return Ok(());
    }

    if let Err(err) = host.run(&Invocation::new("xcode-select").args(["--install"])) {
        warn!("failed to start command line tools installer: {err}");
    }

    Err(SystemError::FatalPrecondition(
        "command line developer tools are missing; rerun once their installer finishes".into(),
    ))
}

/// Install Homebrew on macOS when it is missing.
///
/// Returns true if Homebrew was installed, so the caller knows to resolve the
/// platform again. Failure is an environment gap, reported as a warning.
#[instrument(skip(ctx, host), level = "debug")]
pub fn ensure_homebrew(ctx: &PlatformContext, host: &impl Host) -> bool {
    if ctx.os != OsClass::MacOs || ctx.package_manager == PackageManager::Brew {
        return false;
    }

    info!("homebrew missing, running its installer");
    match host.run(&Invocation::shell(HOMEBREW_INSTALL_SCRIPT)) {
        Ok(_) => true,
        Err(err) => {
            warn!("failed to install homebrew: {err}");
            false
        }
    }
}
