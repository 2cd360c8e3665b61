// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Platform resolution.
//!
//! Determine which operating system we are running on, which native package
//! manager is available, and which CPU architecture release artifacts should
//! target. Resolution never fails. Anything that cannot be identified
//! degrades to [`OsClass::Unknown`] or [`PackageManager::None`], and the rest
//! of the bootstrap treats those as valid low-capability platforms.

use crate::{
    path::Environment,
    system::{Invocation, Probe},
};

use std::{
    env::consts,
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, info, instrument};

/// Operating system family.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsClass {
    MacOs,
    Linux,
    Windows,
    #[default]
    Unknown,
}

impl OsClass {
    /// Classify a kernel name as reported by `uname -s` or [`consts::OS`].
    pub fn from_kernel(kernel: &str) -> Self {
        let kernel = kernel.trim();
        let lower = kernel.to_ascii_lowercase();
        match lower.as_str() {
            "darwin" | "macos" => Self::MacOs,
            "linux" => Self::Linux,
            "windows" | "windows_nt" => Self::Windows,
            _ if ["mingw", "msys", "cygwin"]
                .iter()
                .any(|prefix| lower.starts_with(prefix)) =>
            {
                Self::Windows
            }
            _ => Self::Unknown,
        }
    }

    /// Parse selection from the interactive platform menu.
    ///
    /// Empty input and "4" select auto-detection, returned as `Some(None)`.
    /// Input outside the menu returns `None`.
    pub fn from_menu_input(input: &str) -> Option<Option<Self>> {
        match input.trim() {
            "" | "4" => Some(None),
            "1" => Some(Some(Self::MacOs)),
            "2" => Some(Some(Self::Linux)),
            "3" => Some(Some(Self::Windows)),
            _ => None,
        }
    }
}

impl Display for OsClass {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            Self::MacOs => "macOS",
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::Unknown => "unknown",
        };
        fmt.write_str(name)
    }
}

/// Native package manager.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Brew,
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    #[default]
    None,
}

impl PackageManager {
    /// Probe order for Linux package managers. First match wins.
    pub const LINUX_PRIORITY: [Self; 5] = [
        Self::Apt,
        Self::Dnf,
        Self::Yum,
        Self::Pacman,
        Self::Zypper,
    ];

    /// Executable probed to detect this package manager.
    pub fn executable(&self) -> Option<&'static str> {
        match self {
            Self::Brew => Some("brew"),
            Self::Apt => Some("apt"),
            Self::Dnf => Some("dnf"),
            Self::Yum => Some("yum"),
            Self::Pacman => Some("pacman"),
            Self::Zypper => Some("zypper"),
            Self::None => None,
        }
    }

    /// Command installing one native package.
    ///
    /// The `cask` flag only matters to Homebrew. Returns `None` when no
    /// package manager is available.
    pub fn install_invocation(&self, native: &str, cask: bool) -> Option<Invocation> {
        let invocation = match self {
            Self::Brew if cask => Invocation::new("brew").args(["install", "--cask", native]),
            Self::Brew => Invocation::new("brew").args(["install", native]),
            Self::Apt => Invocation::new("sudo").args(["apt-get", "install", "-y", native]),
            Self::Dnf => Invocation::new("sudo").args(["dnf", "install", "-y", native]),
            Self::Yum => Invocation::new("sudo").args(["yum", "install", "-y", native]),
            Self::Pacman => {
                Invocation::new("sudo").args(["pacman", "-S", "--noconfirm", "--needed", native])
            }
            Self::Zypper => Invocation::new("sudo").args(["zypper", "install", "-y", native]),
            Self::None => return None,
        };

        Some(invocation)
    }

    /// Command refreshing the package index before the first install.
    pub fn refresh_invocation(&self) -> Option<Invocation> {
        match self {
            Self::Apt => Some(Invocation::new("sudo").args(["apt-get", "update"])),
            Self::Pacman => Some(Invocation::new("sudo").args(["pacman", "-Sy"])),
            _ => None,
        }
    }
}

impl Display for PackageManager {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.executable().unwrap_or("none"))
    }
}

/// Normalize CPU architecture name to the spelling release archives use.
///
/// Anything unrecognized maps to `x86_64` as the conservative default.
pub fn normalize_arch(arch: &str) -> &'static str {
    match arch.trim() {
        "aarch64" | "arm64" => "arm64",
        _ => "x86_64",
    }
}

/// Resolved platform information.
///
/// Established once at startup, and read-only afterwards.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    pub os: OsClass,
    pub package_manager: PackageManager,
    pub arch: String,
}

impl PlatformContext {
    /// Resolve platform of current process.
    ///
    /// An explicit OS selection from the platform menu takes precedence over
    /// the detected kernel.
    #[instrument(skip(env, probe), level = "debug")]
    pub fn detect(selection: Option<OsClass>, env: &Environment, probe: &impl Probe) -> Self {
        let context = Self::resolve(selection, consts::OS, consts::ARCH, env.is_wsl(), |program| {
            probe.which(program).is_some()
        });
        info!(
            "platform {} with package manager {} on {}",
            context.os, context.package_manager, context.arch
        );

        context
    }

    /// Resolve platform from kernel name, architecture, and executable probe.
    ///
    /// A WSL distribution marker implies Linux whatever the kernel says.
    pub fn resolve(
        selection: Option<OsClass>,
        kernel: &str,
        arch: &str,
        wsl: bool,
        has_program: impl Fn(&str) -> bool,
    ) -> Self {
        let os = match selection {
            Some(os) => os,
            None if wsl => OsClass::Linux,
            None => OsClass::from_kernel(kernel),
        };

        let package_manager = match os {
            OsClass::MacOs => Some(PackageManager::Brew)
                .filter(|manager| manager.executable().is_some_and(&has_program))
                .unwrap_or_default(),
            OsClass::Linux => PackageManager::LINUX_PRIORITY
                .into_iter()
                .find(|manager| manager.executable().is_some_and(&has_program))
                .unwrap_or_default(),
            OsClass::Windows | OsClass::Unknown => PackageManager::None,
        };
        debug!("resolved {os} with package manager {package_manager}");

        Self {
            os,
            package_manager,
            arch: arch.trim().to_string(),
        }
    }

    /// Architecture spelling used in release archive names.
    pub fn release_arch(&self) -> &'static str {
        normalize_arch(&self.arch)
    }
}
