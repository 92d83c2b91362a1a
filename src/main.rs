use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use domain_patcher::settings::{self, Overrides, Settings, SettingsFile};
use domain_patcher::{BranchError, BranchName, ConfigPatcher, PatchOutcome, WorkspaceGuard};
use similar::{ChangeTag, TextDiff};
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "domain-patcher")]
#[command(about = "Namespace a deployment config's API domain by git branch", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to domain-patcher.toml in the workspace, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct TargetArgs {
    /// Config document to patch [default: config/prod.exs]
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Branch name [default: $BRANCH_NAME]
    #[arg(short, long)]
    branch: Option<String>,

    /// Unqualified domain to namespace [default: api.teamwalnut.com]
    #[arg(long)]
    domain: Option<String>,

    /// Key the domain is assigned to [default: domain]
    #[arg(long)]
    key: Option<String>,

    /// Workspace root the file is resolved against [default: current directory]
    #[arg(short, long)]
    workspace: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite the domain assignment in place
    Apply {
        #[command(flatten)]
        target: TargetArgs,

        /// Interpolate the branch without validation (empty if unset)
        #[arg(long)]
        unchecked_branch: bool,

        /// Dry run - print the result without modifying the file
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Do not print the document before and after patching
        #[arg(short, long)]
        quiet: bool,
    },

    /// Report how many assignments are unqualified or already qualified
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {e:#}").red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Apply {
            target,
            unchecked_branch,
            dry_run,
            diff,
            quiet,
        } => cmd_apply(
            cli.config.as_deref(),
            target,
            unchecked_branch,
            dry_run,
            diff,
            quiet,
        ),

        Commands::Status { target } => cmd_status(cli.config.as_deref(), target),
    }
}

fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// Helper: Resolve the workspace root, settings file and layered settings.
fn load_settings(
    config: Option<&Path>,
    target: TargetArgs,
    unchecked_branch: bool,
) -> Result<(PathBuf, Settings)> {
    let workspace = match target.workspace {
        Some(path) => path,
        None => env::current_dir().context("failed to determine current directory")?,
    };

    let settings_path = match config {
        Some(path) => Some(path.to_path_buf()),
        None => settings::discover(&workspace),
    };
    let settings_file: Option<SettingsFile> = match settings_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading settings file");
            Some(settings::load_from_path(&path)?)
        }
        None => None,
    };

    let overrides = Overrides {
        file: target.file,
        key: target.key,
        domain: target.domain,
        branch: target.branch,
        unchecked_branch,
    };

    let settings = Settings::resolve(overrides, settings_file.as_ref(), |name| {
        env::var(name).ok()
    });

    Ok((workspace, settings))
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(
    config: Option<&Path>,
    target: TargetArgs,
    unchecked_branch: bool,
    dry_run: bool,
    show_diff: bool,
    quiet: bool,
) -> Result<()> {
    let (workspace, settings) = load_settings(config, target, unchecked_branch)?;

    let pattern = settings.pattern()?;
    let branch = settings.branch()?;
    if !branch.is_checked() {
        warn!(branch = %branch, "branch name interpolated without validation");
    }

    let guard = WorkspaceGuard::new(&workspace)?;
    let patcher = ConfigPatcher::new(pattern, guard)
        .dry_run(dry_run)
        .echo(!quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = patcher.patch(&settings.file, &branch, &mut out)?;
    out.flush()?;
    drop(out);

    if show_diff && report.before != report.after {
        display_diff(&report.path, &report.before, &report.after);
    }

    match report.outcome {
        PatchOutcome::Patched { replacements } if dry_run => {
            println!(
                "{} Would patch {} occurrence(s) in {} {}",
                "✓".green(),
                replacements,
                report.path.display(),
                "[DRY RUN]".cyan()
            );
        }
        PatchOutcome::Patched { replacements } => {
            println!(
                "{} Patched {} occurrence(s) in {}",
                "✓".green(),
                replacements,
                report.path.display()
            );
        }
        PatchOutcome::Unchanged => {
            println!(
                "{} No occurrences of {} in {}",
                "⊙".yellow(),
                patcher.pattern().source_literal(),
                report.path.display()
            );
        }
    }

    Ok(())
}

fn cmd_status(config: Option<&Path>, target: TargetArgs) -> Result<()> {
    let (workspace, settings) = load_settings(config, target, false)?;

    let pattern = settings.pattern()?;
    let branch: Option<BranchName> = match settings.branch() {
        Ok(branch) => Some(branch),
        Err(BranchError::Missing { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    let guard = WorkspaceGuard::new(&workspace)?;
    let patcher = ConfigPatcher::new(pattern, guard);
    let census = patcher.status(&settings.file, branch.as_ref())?;

    println!("{}", "Domain Status Report".bold());
    println!("Config: {}", census.path.display());
    println!();

    let literal = patcher.pattern().source_literal();
    if census.unqualified > 0 {
        println!(
            "{} {} unqualified ({})",
            "⊙".yellow(),
            census.unqualified.to_string().yellow(),
            literal
        );
    } else {
        println!("{} 0 unqualified ({})", "✓".green(), literal.dimmed());
    }

    match (&branch, census.qualified) {
        (Some(branch), Some(count)) => println!(
            "{} {} qualified for branch {}",
            "✓".green(),
            count.to_string().green(),
            branch
        ),
        _ => println!(
            "{} qualified count unavailable ({})",
            "⊘".cyan(),
            format!("${} is not set", settings.branch_env).dimmed()
        ),
    }

    Ok(())
}
