// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfiles bootstrap.
//!
//! Detect the host platform, install a declared set of developer tools
//! through the native package manager with per-tool fallback recipes, and
//! link configuration directories into place.
//!
//! The pipeline reads leaf-first:
//!
//! - [`platform`] resolves the operating system, package manager, and
//!   architecture.
//! - [`catalog`] classifies each line of the package catalog.
//! - [`plan`] decides what each package needs without touching the host.
//! - [`bootstrap`] installs planned packages, and collects failures.
//! - [`fallback`] holds the bespoke install recipes.
//! - [`link`] links configuration directories with GNU Stow.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod fallback;
pub mod link;
pub mod path;
pub mod plan;
pub mod platform;
pub mod system;

pub use bootstrap::{Bootstrap, RunSummary};
pub use catalog::{parse, DirectiveKind, PackageDirective};
pub use config::BootstrapConfig;
pub use fallback::{FallbackOutcome, Fallbacks, Outcome};
pub use path::Environment;
pub use plan::{Plan, Planner, ResolvedAction, Status};
pub use platform::{normalize_arch, OsClass, PackageManager, PlatformContext};
pub use system::{Host, HostSystem, Invocation, Probe, SystemError};
