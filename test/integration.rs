// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{config, environment, platform, HostFixture};

use indoc::indoc;
use oxistrap::{
    bootstrap::{check_developer_toolchain, ensure_homebrew, Bootstrap, RunSummary},
    catalog::DirectiveKind,
    config::UnrecognizedPolicy,
    fallback::{Fallbacks, Outcome},
    link::Linker,
    plan::{ResolvedAction, Status},
    platform::{OsClass, PackageManager},
    system::SystemError,
};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

#[test]
fn taps_dropped_and_present_tool_satisfied() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new().with_programs(["git", "apt"]);
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let catalog = indoc! {r#"
        tap "foo/bar"
        brew "git"
    "#};
    let (plan, unrecognized) = bootstrap.plan(catalog);
    let expect = vec![ResolvedAction {
        name: "git".into(),
        kind: DirectiveKind::NativePackage,
        status: Status::AlreadySatisfied,
        native: None,
    }];
    assert_eq!(plan.actions(), expect.as_slice());
    assert_eq!(unrecognized, 0);

    let summary = bootstrap.run(catalog);
    assert_eq!(summary.already_satisfied, vec!["git".to_string()]);
    assert_eq!(host.invocations(), Vec::<String>::new());
}

#[test]
fn platform_exclusive_cask_skipped_on_linux() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new();
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let summary = bootstrap.run("cask \"raycast\"\n");
    assert_eq!(summary.skipped_platform, vec!["raycast".to_string()]);
    assert_eq!(summary.fallbacks, Vec::new());
    assert_eq!(host.invocations(), Vec::<String>::new());
}

#[test]
fn failed_native_install_falls_back_to_release_archive() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "aarch64");
    let env = environment();
    let config = config();
    let host = HostFixture::new().failing("apt-get install -y lazygit");
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let catalog = "brew \"jesseduffield/lazygit/lazygit\"\n";
    let (plan, _) = bootstrap.plan(catalog);
    assert_eq!(plan.with_status(Status::MappedToNative), vec!["lazygit"]);
    assert_eq!(plan.actions()[0].native.as_deref(), Some("lazygit"));

    let summary = bootstrap.run(catalog);
    assert_eq!(summary.native_failures, vec!["lazygit".to_string()]);
    assert_eq!(summary.fallbacks.len(), 1);

    let fallback = &summary.fallbacks[0];
    assert_eq!(fallback.name, "lazygit");
    assert_eq!(fallback.outcome, Outcome::Success);
    let url = fallback.detail.as_deref().unwrap_or_default();
    assert_eq!(
        url,
        "https://github.com/jesseduffield/lazygit/releases/download/v0.44.1/\
         lazygit_0.44.1_Linux_arm64.tar.gz"
    );

    let invocations = host.invocations();
    assert_eq!(invocations[0], "sudo apt-get update");
    assert_eq!(invocations[1], "sudo apt-get install -y lazygit");
    assert!(invocations[2].starts_with("curl -fsSL -o "));
    assert!(invocations[2].ends_with(url));
    assert!(invocations[3].starts_with("tar -xzf "));
    assert_eq!(
        host.installed_files(),
        vec![PathBuf::from("/home/blah/.local/bin/lazygit")]
    );
}

#[test]
fn failed_release_download_installs_nothing() {
    let ctx = platform(OsClass::Linux, PackageManager::None, "aarch64");
    let host = HostFixture::new().failing("curl -fsSL");
    let fallbacks = Fallbacks::new(&ctx, &host, "/home/blah", "/home/blah/.local/bin", "0.44.1");

    let outcome = fallbacks.attempt("lazygit");
    assert_eq!(outcome.outcome, Outcome::Failure);
    let detail = outcome.detail.unwrap_or_default();
    assert!(detail.contains(
        "https://github.com/jesseduffield/lazygit/releases/download/v0.44.1/\
         lazygit_0.44.1_Linux_arm64.tar.gz"
    ));
    assert_eq!(host.installed_files(), Vec::<PathBuf>::new());

    let invocations = host.invocations();
    assert_eq!(invocations.len(), 1);
    assert!(invocations[0].starts_with("curl -fsSL -o "));
    assert!(!invocations.iter().any(|invocation| invocation.starts_with("tar ")));
}

#[test]
fn release_archive_unavailable_on_windows() {
    let ctx = platform(OsClass::Windows, PackageManager::None, "x86_64");
    let host = HostFixture::new();
    let fallbacks = Fallbacks::new(&ctx, &host, "/home/blah", "/home/blah/.local/bin", "0.44.1");

    let outcome = fallbacks.attempt("lazygit");
    assert_eq!(outcome.outcome, Outcome::Failure);
    assert_eq!(outcome.detail.as_deref(), Some("no release asset of lazygit for Windows"));
    assert_eq!(host.invocations(), Vec::<String>::new());
    assert_eq!(host.installed_files(), Vec::<PathBuf>::new());
}

#[test]
fn empty_catalog_yields_clean_summary() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new();
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let (plan, _) = bootstrap.plan("");
    assert!(plan.is_empty());

    let summary = bootstrap.run("");
    assert_eq!(summary, RunSummary::default());
    assert!(summary.is_clean());
    assert_eq!(
        summary.to_string(),
        "0 installed, 0 already present, 0 skipped (platform), 0 failed natively, \
         0 recovered by fallback, 0 unresolved, 0 unrecognized line(s)"
    );
}

#[test]
fn second_pass_issues_no_installs() {
    let ctx = platform(OsClass::Linux, PackageManager::Dnf, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new().with_programs(["git"]);
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let catalog = indoc! {r#"
        brew "git"
        brew "tmux"
        brew "stow"
    "#};
    let first = bootstrap.run(catalog);
    assert_eq!(first.installed, vec!["tmux".to_string(), "stow".to_string()]);
    let installs = host.install_invocations().len();
    assert_eq!(installs, 2);

    let second = bootstrap.run(catalog);
    assert_eq!(second.installed, Vec::<String>::new());
    assert_eq!(second.already_satisfied.len(), 3);
    assert_eq!(host.install_invocations().len(), installs);
}

#[test]
fn fallback_queue_follows_failure_order() {
    let ctx = platform(OsClass::Linux, PackageManager::Pacman, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new().failing("pacman -S --noconfirm --needed bat");
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let catalog = indoc! {r#"
        brew "neovim"
        brew "bat"
        brew "tmux"
    "#};
    let summary = bootstrap.run(catalog);

    assert_eq!(summary.installed, vec!["tmux".to_string()]);
    assert_eq!(summary.native_failures, vec!["bat".to_string()]);
    let outcomes = summary
        .fallbacks
        .iter()
        .map(|fallback| (fallback.name.as_str(), fallback.outcome))
        .collect::<Vec<_>>();
    assert_eq!(outcomes, vec![("neovim", Outcome::NoRecipe), ("bat", Outcome::Failure)]);

    let detail = summary.fallbacks[1].detail.as_deref().unwrap_or_default();
    assert!(detail.contains("https://github.com/sharkdp/bat/releases"));
    assert_eq!(summary.unresolved(), vec!["neovim", "bat"]);
}

#[test]
fn missing_package_manager_queues_fallback() {
    let ctx = platform(OsClass::Linux, PackageManager::None, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new();
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let summary = bootstrap.run("brew \"zoxide\"\n");
    assert_eq!(summary.native_failures, vec!["zoxide".to_string()]);
    assert_eq!(summary.recovered(), vec!["zoxide"]);
    let script = "https://raw.githubusercontent.com/ajeetdsouza/zoxide/main/install.sh";
    assert_eq!(
        host.invocations(),
        vec![format!(r#"sh -c "curl -sSfL {script} | sh""#)]
    );
}

#[test]
fn directory_jumper_prefers_cargo() {
    let ctx = platform(OsClass::Linux, PackageManager::None, "x86_64");
    let host = HostFixture::new().with_programs(["cargo"]);
    let fallbacks = Fallbacks::new(&ctx, &host, "/home/blah", "/home/blah/.local/bin", "0.44.1");

    let outcome = fallbacks.attempt("zoxide");
    assert_eq!(outcome.outcome, Outcome::Success);
    assert_eq!(host.invocations(), vec!["cargo install --locked zoxide".to_string()]);
}

#[test]
fn fuzzy_finder_directory_counts_as_installed() {
    let ctx = platform(OsClass::Linux, PackageManager::None, "x86_64");
    let host = HostFixture::new().with_path("/home/blah/.fzf");
    let fallbacks = Fallbacks::new(&ctx, &host, "/home/blah", "/home/blah/.local/bin", "0.44.1");

    let outcome = fallbacks.attempt("fzf");
    assert_eq!(outcome.outcome, Outcome::Success);
    assert_eq!(host.clones(), Vec::new());
    assert_eq!(host.invocations(), Vec::<String>::new());
}

#[test]
fn fuzzy_finder_cloned_and_installed() {
    let ctx = platform(OsClass::Linux, PackageManager::None, "x86_64");
    let host = HostFixture::new();
    let fallbacks = Fallbacks::new(&ctx, &host, "/home/blah", "/home/blah/.local/bin", "0.44.1");

    let outcome = fallbacks.attempt("fzf");
    assert_eq!(outcome.outcome, Outcome::Success);
    assert_eq!(
        host.clones(),
        vec![(
            "https://github.com/junegunn/fzf.git".to_string(),
            PathBuf::from("/home/blah/.fzf")
        )]
    );
    assert_eq!(
        host.invocations(),
        vec!["/home/blah/.fzf/install --key-bindings --completion --no-update-rc".to_string()]
    );
}

#[test]
fn environment_tools_gated_by_presence() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    let env = environment();
    let config = config();
    let host = HostFixture::new().with_programs(["starship"]).failing("mise.run");
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let tools = bootstrap.ensure_environment_tools();
    let outcomes = tools
        .iter()
        .map(|outcome| (outcome.name.as_str(), outcome.outcome))
        .collect::<Vec<_>>();
    assert_eq!(outcomes, vec![("fnm", Outcome::Success), ("mise", Outcome::Failure)]);

    let mut summary = bootstrap.run("");
    summary.record_environment_tools(&tools);
    assert_eq!(summary.environment_failures, vec!["mise".to_string()]);
    assert!(!summary.is_clean());
}

#[test]
fn unrecognized_lines_counted_under_either_policy() {
    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    let env = environment();
    let host = HostFixture::new().with_programs(["git"]);
    let catalog = indoc! {r#"
        mas "Xcode", id: 497799835
        brew "git"
        whalebrew "whalebrew/wget"
    "#};

    for policy in [UnrecognizedPolicy::Warn, UnrecognizedPolicy::Silent] {
        let mut config = config();
        config.settings.unrecognized = policy;
        let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

        let summary = bootstrap.run(catalog);
        assert_eq!(summary.unrecognized, 2);
        assert_eq!(summary.already_satisfied, vec!["git".to_string()]);
    }
}

#[test]
fn homebrew_installs_casks_and_qualified_formulae() {
    let ctx = platform(OsClass::MacOs, PackageManager::Brew, "arm64");
    let env = environment();
    let config = config();
    let host = HostFixture::new();
    let bootstrap = Bootstrap::new(&ctx, &env, &host, &config);

    let catalog = indoc! {r#"
        tap "FelixKratz/formulae"
        brew "FelixKratz/formulae/borders"
        cask "raycast"
        vscode "vscodevim.vim"
    "#};
    let summary = bootstrap.run(catalog);
    assert_eq!(summary.installed, vec!["borders".to_string(), "raycast".to_string()]);
    assert_eq!(
        host.invocations(),
        vec![
            "brew install FelixKratz/formulae/borders".to_string(),
            "brew install --cask raycast".to_string(),
        ]
    );
}

#[test]
fn missing_command_line_tools_is_fatal_on_macos() {
    let ctx = platform(OsClass::MacOs, PackageManager::Brew, "arm64");
    let host = HostFixture::new().failing("xcode-select -p");
    let result = check_developer_toolchain(&ctx, &host);
    assert!(matches!(result, Err(SystemError::FatalPrecondition(_))));
    assert_eq!(
        host.invocations(),
        vec!["xcode-select -p".to_string(), "xcode-select --install".to_string()]
    );

    let ctx = platform(OsClass::Linux, PackageManager::Apt, "x86_64");
    assert!(check_developer_toolchain(&ctx, &host).is_ok());
}

#[test]
fn homebrew_installed_only_when_missing() {
    let host = HostFixture::new();
    let ctx = platform(OsClass::MacOs, PackageManager::Brew, "arm64");
    assert!(!ensure_homebrew(&ctx, &host));

    let ctx = platform(OsClass::MacOs, PackageManager::None, "arm64");
    assert!(ensure_homebrew(&ctx, &host));
    assert_eq!(host.invocations().len(), 1);

    let ctx = platform(OsClass::Linux, PackageManager::None, "x86_64");
    assert!(!ensure_homebrew(&ctx, &host));
}

#[test]
fn linking_requires_stow() {
    let host = HostFixture::new().with_path("/home/blah/.dotfiles/nvim");
    let linker = Linker::new(&host, "/home/blah/.dotfiles", "/home/blah");
    let result = linker.link_all(&["nvim".to_string()]);
    assert!(matches!(result, Err(SystemError::EnvironmentGap(tool)) if tool == "stow"));

    let host = HostFixture::new()
        .with_programs(["stow"])
        .with_path("/home/blah/.dotfiles/nvim");
    let linker = Linker::new(&host, "/home/blah/.dotfiles", "/home/blah");
    let failed = linker
        .link_all(&["nvim".to_string(), "missing".to_string()])
        .expect("stow is present");
    assert_eq!(failed, vec!["missing".to_string()]);
    assert_eq!(
        host.invocations(),
        vec!["stow --restow --dir /home/blah/.dotfiles --target /home/blah nvim".to_string()]
    );
}
