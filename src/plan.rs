// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Installation planning.
//!
//! Classify each package directive into a [`ResolvedAction`] without touching
//! the package manager. The planner only decides. Installing is an explicit
//! side effect that the caller performs one package at a time.
//!
//! # Native Name Table
//!
//! Package names differ between package managers far less than one would
//! expect for the small set of tools we care about. So, there is exactly one
//! canonical table keyed by the short package name, mapping to the name the
//! native package manager knows it by. The table can be extended through
//! configuration. Homebrew bypasses the table entirely, because every catalog
//! entry is already written in Homebrew's own terms.

use crate::{
    catalog::{DirectiveKind, PackageDirective},
    config::NativeMapping,
    platform::{PackageManager, PlatformContext},
    system::Probe,
};

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// Tools with identical names across every supported package manager.
///
/// A syntax-highlighting pager, a directory-listing tool, a fuzzy-finder, a
/// version-control tool, a git TUI, a directory-jumper, a file-linker, and a
/// terminal multiplexer.
pub const DEFAULT_NATIVE_NAMES: [&str; 8] =
    ["bat", "eza", "fzf", "git", "lazygit", "zoxide", "stow", "tmux"];

/// Cross-platform native name table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeNames {
    names: BTreeMap<String, String>,
}

impl Default for NativeNames {
    fn default() -> Self {
        Self {
            names: DEFAULT_NATIVE_NAMES
                .iter()
                .map(|name| (name.to_string(), name.to_string()))
                .collect(),
        }
    }
}

impl NativeNames {
    /// Construct default table extended with extra mappings.
    ///
    /// Extra mappings override default entries of the same name.
    pub fn with_mappings<'a>(mappings: impl IntoIterator<Item = &'a NativeMapping>) -> Self {
        let mut table = Self::default();
        for mapping in mappings {
            table.names.insert(mapping.name.clone(), mapping.native.clone());
        }

        table
    }

    /// Look up native package name for short name.
    pub fn lookup(&self, short_name: &str) -> Option<&str> {
        self.names.get(short_name).map(String::as_str)
    }
}

/// Planning outcome of one package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Executable already resolves on `PATH`.
    AlreadySatisfied,

    /// Native package manager can install it.
    MappedToNative,

    /// Native package manager does not know it.
    Unmapped,

    /// Exclusive to another platform, never attempted.
    SkippedPlatformMismatch,
}

/// Planned action for one package directive.
///
/// Computed once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    pub name: String,
    pub kind: DirectiveKind,
    pub status: Status,
    pub native: Option<String>,
}

impl ResolvedAction {
    fn new(name: &str, kind: DirectiveKind, status: Status) -> Self {
        Self {
            name: name.to_string(),
            kind,
            status,
            native: None,
        }
    }

    /// Check if native installation should use Homebrew's cask flavor.
    pub fn is_cask(&self) -> bool {
        self.kind == DirectiveKind::PlatformPackage
    }
}

/// Ordered result of a planning pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Plan {
    actions: Vec<ResolvedAction>,
}

impl Plan {
    /// All planned actions in catalog order.
    pub fn actions(&self) -> &[ResolvedAction] {
        self.actions.as_slice()
    }

    /// Names of packages skipped because they belong to another platform.
    pub fn skipped(&self) -> Vec<&str> {
        self.with_status(Status::SkippedPlatformMismatch)
    }

    /// Names of packages with given status.
    pub fn with_status(&self, status: Status) -> Vec<&str> {
        self.actions
            .iter()
            .filter(|action| action.status == status)
            .map(|action| action.name.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Classify package directives against the platform.
#[derive(Debug)]
pub struct Planner<'a, P>
where
    P: Probe,
{
    ctx: &'a PlatformContext,
    names: &'a NativeNames,
    probe: &'a P,
}

impl<'a, P> Planner<'a, P>
where
    P: Probe,
{
    /// Construct new planner.
    pub fn new(ctx: &'a PlatformContext, names: &'a NativeNames, probe: &'a P) -> Self {
        Self { ctx, names, probe }
    }

    /// Plan every package directive in order.
    ///
    /// Directives that do not name a package produce no action.
    #[instrument(skip(self, directives), level = "debug")]
    pub fn plan(&self, directives: impl IntoIterator<Item = PackageDirective>) -> Plan {
        let actions = directives
            .into_iter()
            .filter_map(|directive| self.resolve(&directive))
            .collect::<Vec<_>>();

        let plan = Plan { actions };
        let skipped = plan.skipped();
        if !skipped.is_empty() {
            info!(
                "skipping {} tool(s) exclusive to macOS: {}",
                skipped.len(),
                skipped.join(", ")
            );
        }

        plan
    }

    /// Resolve one package directive.
    pub fn resolve(&self, directive: &PackageDirective) -> Option<ResolvedAction> {
        if !directive.kind().is_package() {
            return None;
        }

        let name = directive.short_name()?;
        let kind = directive.kind();
        if !directive.filter().admits(self.ctx.os) {
            return Some(ResolvedAction::new(name, kind, Status::SkippedPlatformMismatch));
        }

        if self.probe.which(name).is_some() {
            info!("{name} already installed");
            return Some(ResolvedAction::new(name, kind, Status::AlreadySatisfied));
        }

        let native = match self.ctx.package_manager {
            PackageManager::Brew => directive.qualified_name(),
            _ => self.names.lookup(name),
        };

        let action = match native {
            Some(native) => ResolvedAction {
                native: Some(native.to_string()),
                ..ResolvedAction::new(name, kind, Status::MappedToNative)
            },
            None => ResolvedAction::new(name, kind, Status::Unmapped),
        };
        debug!("planned {name} as {:?}", action.status);

        Some(action)
    }
}
