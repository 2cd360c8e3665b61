// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package catalog parsing.
//!
//! The __catalog__ is a line-oriented list of desired tools, written in the
//! same shape as a Homebrew bundle file:
//!
//! ```text
//! # Comments and blank lines are ignored.
//! tap "FelixKratz/formulae"
//! brew "git"
//! brew "FelixKratz/formulae/borders"
//! cask "raycast"
//! vscode "rust-lang.rust-analyzer"
//! ```
//!
//! Each line is classified into exactly one [`DirectiveKind`]. Only native
//! package (`brew`) and platform package (`cask`) lines carry a package name
//! that the planner acts on. Registry taps and editor extensions have no
//! meaning outside of Homebrew, so they are dropped here. Lines that match no
//! known shape are surfaced to the caller as [`CatalogError::Unrecognized`].
//!
//! # Platform-Exclusive Tools
//!
//! Some tools only make sense on macOS, e.g., a tiling window manager, or an
//! application launcher. Package directives naming one of these are tagged
//! with [`PlatformFilter::MacOsOnly`] so the planner can skip them elsewhere.

use crate::platform::{OsClass, PlatformContext};

use std::{iter::Enumerate, str::Lines};
use tracing::debug;

/// Tools whose functionality is only meaningful on macOS.
///
/// A window manager, a launcher, an uninstaller utility, and a window-border
/// utility.
pub const PLATFORM_EXCLUSIVE: [&str; 4] = ["aerospace", "raycast", "appcleaner", "borders"];

/// Classification of one catalog line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    Blank,
    Comment,
    Tap,
    EditorExtension,
    PlatformPackage,
    NativePackage,
    Unrecognized,
}

impl DirectiveKind {
    /// Check if directive names a package the planner should act on.
    pub fn is_package(&self) -> bool {
        matches!(self, Self::PlatformPackage | Self::NativePackage)
    }
}

/// Platform restriction of a package directive.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformFilter {
    #[default]
    None,
    MacOsOnly,
}

impl PlatformFilter {
    /// Check if directive applies to the given operating system.
    pub fn admits(&self, os: OsClass) -> bool {
        match self {
            Self::None => true,
            Self::MacOsOnly => os == OsClass::MacOs,
        }
    }
}

/// One classified catalog line.
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDirective {
    raw: String,
    line: usize,
    kind: DirectiveKind,
    name: Option<String>,
    filter: PlatformFilter,
}

impl PackageDirective {
    /// Classify one catalog line.
    ///
    /// Line numbers are one-based and only used for reporting.
    pub fn parse_line(line: usize, raw: &str) -> Self {
        let trimmed = raw.trim();
        let (kind, name) = if trimmed.is_empty() {
            (DirectiveKind::Blank, None)
        } else if trimmed.starts_with('#') {
            (DirectiveKind::Comment, None)
        } else {
            let (keyword, rest) = trimmed
                .split_once(char::is_whitespace)
                .unwrap_or((trimmed, ""));
            // INVARIANT: Package names always shorten to something non-empty.
            let name = quoted(rest).filter(|name| !short_name(name).is_empty());
            match (keyword, name) {
                ("tap", Some(_)) => (DirectiveKind::Tap, None),
                ("vscode", Some(_)) => (DirectiveKind::EditorExtension, None),
                ("cask", Some(name)) => (DirectiveKind::PlatformPackage, Some(name)),
                ("brew", Some(name)) => (DirectiveKind::NativePackage, Some(name)),
                _ => (DirectiveKind::Unrecognized, None),
            }
        };

        let filter = match name {
            Some(name) if is_platform_exclusive(name) => PlatformFilter::MacOsOnly,
            _ => PlatformFilter::None,
        };

        Self {
            raw: raw.to_string(),
            line,
            kind,
            name: name.map(str::to_string),
            filter,
        }
    }

    /// Original text of line.
    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    /// One-based line number within catalog.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn kind(&self) -> DirectiveKind {
        self.kind
    }

    pub fn filter(&self) -> PlatformFilter {
        self.filter
    }

    /// Full package name as written, possibly vendor-qualified.
    pub fn qualified_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Canonical short package name used for mapping.
    pub fn short_name(&self) -> Option<&str> {
        self.name.as_deref().map(short_name)
    }
}

/// Take everything after the last path separator of a package name.
///
/// Idempotent: `short_name(short_name(x)) == short_name(x)`.
pub fn short_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Check if package name refers to a platform-exclusive tool.
pub fn is_platform_exclusive(name: &str) -> bool {
    PLATFORM_EXCLUSIVE.contains(&short_name(name))
}

// Extract single or double quoted string that text starts with.
fn quoted(text: &str) -> Option<&str> {
    let text = text.trim_start();
    let quote = text.chars().next().filter(|quote| matches!(quote, '"' | '\''))?;
    let body = &text[quote.len_utf8()..];
    let end = body.find(quote)?;
    let name = body[..end].trim();

    (!name.is_empty()).then_some(name)
}

/// Parse catalog text into package directives.
///
/// Produces a lazy sequence that preserves catalog order. The returned
/// iterator is cheap to clone, and each clone restarts from where the
/// original was at the time of cloning.
pub fn parse<'a>(text: &'a str, ctx: &'a PlatformContext) -> Directives<'a> {
    Directives {
        lines: text.lines().enumerate(),
        ctx,
    }
}

/// Lazy sequence of package directives.
///
/// Yields only package directives. Blank lines, comments, taps, and editor
/// extensions are consumed silently. Lines matching no known shape are
/// yielded as errors so the caller decides how loudly to report them.
#[derive(Debug, Clone)]
pub struct Directives<'a> {
    lines: Enumerate<Lines<'a>>,
    ctx: &'a PlatformContext,
}

impl Iterator for Directives<'_> {
    type Item = Result<PackageDirective>;

    fn next(&mut self) -> Option<Self::Item> {
        for (index, raw) in self.lines.by_ref() {
            let directive = PackageDirective::parse_line(index + 1, raw);
            match directive.kind() {
                kind if kind.is_package() => {
                    if !directive.filter().admits(self.ctx.os) {
                        debug!(
                            "line {}: {:?} is exclusive to macOS",
                            directive.line(),
                            directive.qualified_name().unwrap_or_default()
                        );
                    }
                    return Some(Ok(directive));
                }
                DirectiveKind::Unrecognized => {
                    return Some(Err(CatalogError::Unrecognized {
                        line: directive.line(),
                        text: directive.raw().trim().to_string(),
                    }));
                }
                kind => debug!("line {}: skip {kind:?}", directive.line()),
            }
        }

        None
    }
}

/// Catalog parsing error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// Line matches no known directive shape.
    #[error("line {line}: unrecognized catalog directive {text:?}")]
    Unrecognized { line: usize, text: String },
}

/// Friendly result alias :3
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;
