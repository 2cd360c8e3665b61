// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use oxistrap::{
    bootstrap::{check_developer_toolchain, ensure_homebrew, Bootstrap},
    config::{BootstrapConfig, CONFIG_FILE_NAME},
    link::{discover_packages, Linker},
    path::{default_root_dir, Environment, PathExport},
    platform::{OsClass, PlatformContext},
    system::{HostSystem, SystemError},
};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use inquire::{InquireError, Text};
use std::{
    env::set_current_dir,
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "oxistrap [options]",
    version
)]
struct Cli {
    /// Path to root configuration directory.
    #[arg(short, long, value_name = "path")]
    pub root: Option<PathBuf>,

    /// Platform to bootstrap for instead of asking.
    #[arg(short, long, value_enum, value_name = "platform")]
    pub platform: Option<PlatformChoice>,

    /// Show install plan without installing anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not link configuration directories.
    #[arg(long)]
    pub skip_link: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PlatformChoice {
    Macos,
    Linux,
    Windows,
    Auto,
}

impl From<PlatformChoice> for Option<OsClass> {
    fn from(choice: PlatformChoice) -> Self {
        match choice {
            PlatformChoice::Macos => Some(OsClass::MacOs),
            PlatformChoice::Linux => Some(OsClass::Linux),
            PlatformChoice::Windows => Some(OsClass::Windows),
            PlatformChoice::Auto => None,
        }
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run(Cli::parse()) {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => default_root_dir()?,
    };
    set_current_dir(&root)
        .with_context(|| format!("cannot enter root directory {:?}", root.display()))?;

    let config = load_config(&root)?;
    let bin_dir = config.settings.bin_dir();
    let mut env = Environment::from_process()?.with_path_prepended(&bin_dir);
    let selection = match cli.platform {
        Some(choice) => choice.into(),
        None => prompt_platform()?,
    };

    let mut host = HostSystem::new(env.clone());
    let mut ctx = PlatformContext::detect(selection, &env, &host);
    check_developer_toolchain(&ctx, &host)?;
    if ensure_homebrew(&ctx, &host) {
        env = env
            .with_path_prepended("/usr/local/bin")
            .with_path_prepended("/opt/homebrew/bin");
        host = HostSystem::new(env.clone());
        ctx = PlatformContext::detect(selection, &env, &host);
    }

    let catalog = load_catalog(&root.join(&config.settings.catalog))?;
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);
    if cli.dry_run {
        let (plan, unrecognized) = bootstrap.plan(&catalog);
        for action in plan.actions() {
            info!(
                "{}: {:?}{}",
                action.name,
                action.status,
                action
                    .native
                    .as_deref()
                    .map(|native| format!(" ({native})"))
                    .unwrap_or_default()
            );
        }
        info!("{} planned, {unrecognized} unrecognized line(s)", plan.actions().len());
        return Ok(());
    }

    let mut summary = bootstrap.run(&catalog);
    summary.record_environment_tools(&bootstrap.ensure_environment_tools());
    export_bin_dir(&env, &bin_dir, &config.settings.rc_files);

    if !cli.skip_link {
        link_packages(&host, &root, &env, &config)?;
    }

    info!("bootstrap complete: {summary}");

    Ok(())
}

fn prompt_platform() -> Result<Option<OsClass>> {
    loop {
        let input = Text::new("Select platform:")
            .with_help_message("1) macOS  2) Linux  3) Windows  4) auto-detect (default)")
            .prompt();
        let input = match input {
            Ok(input) => input,
            Err(InquireError::NotTTY) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        match OsClass::from_menu_input(&input) {
            Some(selection) => return Ok(selection),
            None => warn!("invalid selection {input:?}, pick a number from 1 to 4"),
        }
    }
}

fn load_config(root: &Path) -> Result<BootstrapConfig> {
    let path = root.join(CONFIG_FILE_NAME);
    let data = match read_to_string(&path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
        Err(err) => {
            return Err(err).with_context(|| format!("cannot read {:?}", path.display()));
        }
    };

    data.parse::<BootstrapConfig>()
        .with_context(|| format!("invalid configuration {:?}", path.display()))
}

fn load_catalog(path: &Path) -> Result<String> {
    match read_to_string(path) {
        Ok(catalog) => Ok(catalog),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!("no catalog at {:?}, nothing to install", path.display());
            Ok(String::new())
        }
        Err(err) => Err(err).with_context(|| format!("cannot read catalog {:?}", path.display())),
    }
}

fn export_bin_dir(env: &Environment, bin_dir: &Path, rc_files: &[String]) {
    let export = PathExport::new(env, bin_dir);
    for rc_file in rc_files {
        let result = export
            .intent_for_file(rc_file)
            .and_then(|intent| intent.map(|intent| intent.apply()).transpose());
        match result {
            Ok(Some(())) => info!("added {:?} to {rc_file}", export.line()),
            Ok(None) => {}
            Err(err) => warn!("failed to update {rc_file}: {err}"),
        }
    }
}

fn link_packages(
    host: &HostSystem,
    root: &Path,
    env: &Environment,
    config: &BootstrapConfig,
) -> Result<()> {
    let link = config.link.clone().unwrap_or_default();
    let packages = match link.packages {
        Some(packages) => packages,
        None => discover_packages(root)?,
    };
    let target = link
        .target
        .map(PathBuf::from)
        .unwrap_or_else(|| env.home().to_path_buf());

    match Linker::new(host, root, target).link_all(&packages) {
        Ok(failed) if failed.is_empty() => info!("linked {} package(s)", packages.len()),
        Ok(failed) => warn!("failed to link: {}", failed.join(", ")),
        Err(SystemError::EnvironmentGap(tool)) => warn!("{tool} not installed, skip linking"),
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
