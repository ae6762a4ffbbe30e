//! DotVault - back up and restore dotfiles
//!
//! Copies selected configuration files from the home directory into a plain
//! tree, a zip archive or a tar.gz archive, and restores them with
//! conflict handling.

mod display;
mod json_output;
mod progress;
mod prompt;
mod selection;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use display::{
    display_backup_summary, display_error, display_info, display_restore_summary,
    display_success, display_verify_report,
};
use dotvault_config::{Settings, SettingsLoader};
use dotvault_engine::{
    contract_home, expand_home, home_dir, resolver_for, spawn_backup, spawn_restore,
    timestamped_folder_name, verify_tree, BackupEngine, BackupRequest, GlobFilter, RestoreEngine,
    RestoreRequest, Worker,
};
use dotvault_types::{
    ArchiveFormat, Cancellable, CancellationToken, ConflictPolicy, ConflictResolver,
};
use json_output::{print_json, VerifyReportJson};
use progress::ProgressTracker;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use walkdir::WalkDir;

/// DotVault - back up and restore dotfiles
#[derive(Parser, Debug)]
#[command(
    name = "dotvault",
    version = env!("CARGO_PKG_VERSION"),
    about = "Back up and restore dotfiles",
    long_about = "DotVault copies configuration files from your home directory into a\n\
                  plain folder, a zip archive or a tar.gz archive, and restores them\n\
                  with a choice of what to do when files already exist."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Back up files and directories
    Backup {
        /// Paths to back up, `~` is expanded
        #[arg(required = true)]
        paths: Vec<String>,
        /// Destination directory (defaults to the configured backup directory)
        #[arg(long)]
        dest: Option<PathBuf>,
        /// Write an archive instead of a plain copy
        #[arg(long)]
        compress: bool,
        /// Archive format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Exclude pattern, replaces the configured list when given
        #[arg(long)]
        exclude: Vec<String>,
        /// Do not keep permission bits and modification times
        #[arg(long)]
        no_preserve_permissions: bool,
        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,
        /// Skip hidden files inside selected directories
        #[arg(long)]
        skip_hidden: bool,
        /// Copy straight into the destination without a timestamped folder
        #[arg(long)]
        no_timestamp: bool,
        /// Name of the backup below the destination
        #[arg(long)]
        name: Option<String>,
    },
    /// Restore a backup folder or archive
    Restore {
        /// Backup folder, .zip, .tar.gz or .tgz
        source: PathBuf,
        /// Directory to restore into
        dest: PathBuf,
        /// What to do with files that already exist
        #[arg(long, value_enum)]
        on_conflict: Option<ConflictArg>,
        /// Do not apply stored permission bits and modification times
        #[arg(long)]
        no_preserve_permissions: bool,
    },
    /// Compare a backup folder with a restored or live tree
    Verify {
        /// Backup folder
        source: PathBuf,
        /// Tree to compare against
        restored: PathBuf,
    },
    /// List files below a directory
    List {
        /// Directory to list
        dir: PathBuf,
        /// Glob matched against file names
        #[arg(long)]
        filter: Option<String>,
    },
    /// Show or generate configuration
    Config {
        /// Write the default configuration to this file
        #[arg(long)]
        generate: Option<PathBuf>,
        /// Show the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Zip,
    TarGz,
}

impl From<FormatArg> for ArchiveFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Zip => ArchiveFormat::Zip,
            FormatArg::TarGz => ArchiveFormat::TarGz,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ConflictArg {
    Overwrite,
    Skip,
    Rename,
    Ask,
}

impl From<ConflictArg> for ConflictPolicy {
    fn from(policy: ConflictArg) -> Self {
        match policy {
            ConflictArg::Overwrite => ConflictPolicy::Overwrite,
            ConflictArg::Skip => ConflictPolicy::Skip,
            ConflictArg::Rename => ConflictPolicy::Rename,
            ConflictArg::Ask => ConflictPolicy::Ask,
        }
    }
}

/// Output switches shared by every command
#[derive(Debug, Clone, Copy)]
struct OutputMode {
    quiet: bool,
    json: bool,
}

impl OutputMode {
    fn human(self) -> bool {
        !self.quiet && !self.json
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let settings = SettingsLoader::load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    init_logging(&cli, &settings)?;
    info!("DotVault v{} starting", env!("CARGO_PKG_VERSION"));

    let output = OutputMode {
        quiet: cli.quiet,
        json: cli.json,
    };

    let success = match cli.command {
        Commands::Backup {
            paths,
            dest,
            compress,
            format,
            exclude,
            no_preserve_permissions,
            follow_symlinks,
            skip_hidden,
            no_timestamp,
            name,
        } => {
            let mut options = settings.backup_options();
            options.compress |= compress || format.is_some();
            if let Some(format) = format {
                options.archive_format = format.into();
            }
            if !exclude.is_empty() {
                options.exclude_patterns = exclude;
            }
            options.preserve_permissions &= !no_preserve_permissions;
            options.follow_symlinks |= follow_symlinks;
            options.skip_hidden |= skip_hidden;
            options.create_timestamp_subfolder &= !no_timestamp;

            backup_command(&settings, paths, dest, name, options, output).await?
        }
        Commands::Restore {
            source,
            dest,
            on_conflict,
            no_preserve_permissions,
        } => {
            let mut options = settings.restore_options();
            options.preserve_permissions &= !no_preserve_permissions;
            let policy = on_conflict.map_or(settings.restore.conflict_policy, Into::into);

            restore_command(source, dest, options, policy, output).await?
        }
        Commands::Verify { source, restored } => verify_command(&source, &restored, output)?,
        Commands::List { dir, filter } => list_command(&dir, filter.as_deref(), output)?,
        Commands::Config { generate, show } => {
            config_command(&settings, generate.as_deref(), show, output)?
        }
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn init_logging(cli: &Cli, settings: &Settings) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        match settings.logging.level.as_str() {
            // Stock setting; the terminal only shows warnings without -v
            "info" => "warn",
            other => other,
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(cli.debug);

    if settings.logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }

    Ok(())
}

/// Wait for a worker, cancelling it on Ctrl-C
async fn run_worker<T: Send + 'static>(
    worker: Worker<T>,
    token: CancellationToken,
    tracker: &ProgressTracker,
) -> Result<T> {
    let mut join = tokio::task::spawn_blocking(move || worker.join());

    let joined = tokio::select! {
        joined = &mut join => joined,
        _ = tokio::signal::ctrl_c() => {
            tracker.display_warning("Interrupted, finishing the current file...");
            token.cancel();
            join.await
        }
    };

    Ok(joined.context("Worker task failed")??)
}

async fn backup_command(
    settings: &Settings,
    paths: Vec<String>,
    dest: Option<PathBuf>,
    name: Option<String>,
    options: dotvault_types::BackupOptions,
    output: OutputMode,
) -> Result<bool> {
    let home = home_dir()?;
    let cwd = std::env::current_dir().context("Cannot read the working directory")?;
    let entries = selection::select_entries(&paths, &home, &cwd);

    let root = dest.unwrap_or_else(|| expand_home(&settings.backup.backup_directory, &home));
    let destination = match name {
        Some(name) => root.join(name),
        // Archives are named after the destination, so give each one its own name
        None if options.compress => root.join(timestamped_folder_name("dotfiles")),
        None => root,
    };

    debug!("Backup options: {:?}", options);
    if output.human() {
        println!(
            "{} Backing up {} entries to {}",
            style("→").green().bold(),
            entries.len(),
            style(contract_home(&destination, &home)).cyan()
        );
    }

    let engine = Arc::new(BackupEngine::with_home(&home));
    let token = engine.cancellation_token();
    let tracker = ProgressTracker::new(output.human());
    let bar = tracker.clone();

    let request = BackupRequest::new(entries, destination).with_options(options);
    let worker = spawn_backup(engine, request, move |event| bar.update(event))?;
    let result = run_worker(worker, token, &tracker).await?;
    tracker.finish_and_clear();

    if output.json {
        print_json("backup", &result)?;
    } else if output.quiet {
        result.errors.iter().for_each(|e| display_error(e));
    } else {
        display_backup_summary(&result, &home);
        if result.success {
            display_success("Backup completed");
        } else {
            display_error("Backup failed");
        }
    }

    Ok(result.success)
}

async fn restore_command(
    source: PathBuf,
    dest: PathBuf,
    options: dotvault_types::RestoreOptions,
    policy: ConflictPolicy,
    output: OutputMode,
) -> Result<bool> {
    if output.human() {
        println!(
            "{} Restoring {} into {} ({:?} on conflict)",
            style("←").green().bold(),
            style(source.display()).cyan(),
            style(dest.display()).cyan(),
            policy
        );
    }

    let engine = Arc::new(RestoreEngine::new());
    let token = engine.cancellation_token();
    let tracker = ProgressTracker::new(output.human());
    let bar = tracker.clone();

    let resolver: Arc<dyn ConflictResolver> = match policy {
        ConflictPolicy::Ask if !output.json => Arc::new(prompt::terminal_resolver(tracker.clone())),
        other => Arc::from(resolver_for(other)),
    };

    let request = RestoreRequest::new(source, dest).with_options(options);
    let worker = spawn_restore(engine, request, resolver, move |event| bar.update(event))?;
    let result = run_worker(worker, token, &tracker).await?;
    tracker.finish_and_clear();

    if output.json {
        print_json("restore", &result)?;
    } else if output.quiet {
        result.errors.iter().for_each(|e| display_error(e));
    } else {
        display_restore_summary(&result);
        if result.success {
            display_success("Restore completed");
        } else {
            display_error("Restore failed");
        }
    }

    Ok(result.success)
}

fn verify_command(source: &Path, restored: &Path, output: OutputMode) -> Result<bool> {
    let report = verify_tree(source, restored)?;

    if output.json {
        print_json("verify", VerifyReportJson::from(&report))?;
    } else if !output.quiet {
        display_verify_report(&report);
        if report.is_clean() {
            display_success("All files match");
        }
    }

    Ok(report.is_clean())
}

fn list_command(dir: &Path, filter: Option<&str>, output: OutputMode) -> Result<bool> {
    let filter = GlobFilter::new(filter.unwrap_or_default())?;
    let files = list_files(dir, &filter);

    if output.json {
        print_json("list", &files)?;
    } else {
        for file in &files {
            println!("{}", file);
        }
        if output.human() {
            display_info(&format!("{} files match '{}'", files.len(), filter.pattern()));
        }
    }

    Ok(true)
}

fn list_files(dir: &Path, filter: &GlobFilter) -> Vec<String> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file() && filter.matches(entry.path()))
        .map(|entry| entry.path().display().to_string())
        .collect()
}

fn config_command(
    settings: &Settings,
    generate: Option<&Path>,
    show: bool,
    output: OutputMode,
) -> Result<bool> {
    if let Some(path) = generate {
        SettingsLoader::generate_default(path)?;
        if output.human() {
            display_success(&format!("Wrote default configuration to {}", path.display()));
        }
    }

    if show || generate.is_none() {
        if output.json {
            print_json("config", settings)?;
        } else {
            if output.human() {
                let origin = SettingsLoader::config_exists()
                    .map_or_else(|| "defaults".to_string(), |p| p.display().to_string());
                println!("{} Effective configuration ({}):", style("⚙").blue().bold(), origin);
            }
            print!("{}", serde_yaml::to_string(settings)?);
        }
    }

    Ok(true)
}
