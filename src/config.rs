// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the optional `oxistrap.toml` configuration file that
//! lives at the top-level of the root configuration directory. File I/O is
//! left to the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::PathBuf,
    str::FromStr,
};

/// Name of configuration file at the top-level of the root directory.
pub const CONFIG_FILE_NAME: &str = "oxistrap.toml";

/// Bootstrap configuration layout.
///
/// # General Layout
///
/// A bootstrap configuration is composed of three parts: settings, native
/// name mappings, and config linking. The settings section controls where
/// the catalog lives and how the installer behaves. The mapping section
/// extends the cross-platform native name table. The link section selects
/// which configuration directories get linked into place.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct BootstrapConfig {
    /// General settings.
    #[serde(default)]
    pub settings: BootstrapSettings,

    /// Extra native package name mappings.
    #[serde(rename = "mapping")]
    pub mappings: Option<Vec<NativeMapping>>,

    /// Config linking settings.
    pub link: Option<LinkSettings>,
}

impl BootstrapConfig {
    /// Iterate over extra native package name mappings.
    pub fn mappings(&self) -> impl Iterator<Item = &NativeMapping> {
        self.mappings.iter().flatten()
    }
}

impl FromStr for BootstrapConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: BootstrapConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        config.settings.bin_dir = expand(&config.settings.bin_dir)?;
        config.settings.rc_files = config
            .settings
            .rc_files
            .iter()
            .map(|rc_file| expand(rc_file))
            .collect::<Result<Vec<_>>>()?;
        if let Some(link) = config.link.as_mut() {
            if let Some(target) = link.target.as_ref() {
                link.target = Some(expand(target)?);
            }
        }

        Ok(config)
    }
}

impl Display for BootstrapConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand(value: &str) -> Result<String> {
    Ok(shellexpand::full(value)
        .map_err(ConfigError::ShellExpansion)?
        .into_owned())
}

/// General bootstrap settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BootstrapSettings {
    /// Path to catalog file relative to root directory.
    pub catalog: PathBuf,

    /// How to report catalog lines that match no known directive.
    pub unrecognized: UnrecognizedPolicy,

    /// Directory that receives binaries installed from release archives.
    pub bin_dir: String,

    /// Release version of the git TUI fetched by its fallback recipe.
    pub lazygit_version: String,

    /// Shell startup files that receive the `PATH` export for `bin_dir`.
    pub rc_files: Vec<String>,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            catalog: PathBuf::from("Brewfile"),
            unrecognized: UnrecognizedPolicy::Warn,
            bin_dir: "$HOME/.local/bin".into(),
            lazygit_version: "0.44.1".into(),
            rc_files: vec!["~/.bashrc".into(), "~/.zshrc".into()],
        }
    }
}

impl BootstrapSettings {
    /// Directory that receives binaries installed from release archives.
    pub fn bin_dir(&self) -> PathBuf {
        PathBuf::from(&self.bin_dir)
    }
}

/// Reporting policy for unrecognized catalog lines.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedPolicy {
    /// Log a warning for each unrecognized line.
    #[default]
    Warn,

    /// Only count unrecognized lines.
    Silent,
}

/// Extra entry of the native package name table.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct NativeMapping {
    /// Short package name as written in the catalog.
    pub name: String,

    /// Package name the native package manager knows.
    pub native: String,
}

/// Config linking settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct LinkSettings {
    /// Package directories to link. Defaults to every top-level directory.
    pub packages: Option<Vec<String>>,

    /// Target directory to link into. Defaults to home directory.
    pub target: Option<String>,
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
