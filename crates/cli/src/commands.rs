// FILE: crates/cli/src/commands.rs

use anyhow::{anyhow, bail, Result};
use clap::ArgMatches;
use console::style;
use loanload_config::{
    reconcile, ConfigBackupManager, ConfigDocument, ConfigLock, ConfigStore, ReconcileReport,
    Settings, SettingsManager,
};
use loanload_content_sources::{ExportFileSource, LibrarySource, SessionToolSource};
use loanload_core::{AppError, Loan};
use loanload_library::{
    CommandDownloadTool, DownloadTool, FetchRunner, FetchSummary, LayoutPlanner, StagingProgress,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Logs the full error and wraps it in the message the user sees
pub fn app_error<E: Into<AppError>>(err: E) -> anyhow::Error {
    let err = err.into();
    if err.is_critical() {
        log::error!("{}", err);
    } else {
        log::debug!("{}", err);
    }
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

/// Merge discovered libraries into the download tool configuration
pub fn configure(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let source = library_source(settings, matches);
    let dry_run = matches.get_flag("dry-run");

    let (doc, report) = reconcile_into_config(settings, source.as_ref(), dry_run)?;
    print_report(&report);

    let path = settings.download_config_path.display();
    if dry_run {
        println!("\n{}", doc.to_json_string()?);
        println!("{} Dry run, {} was not written", style("!").yellow().bold(), path);
    } else if report.changed() {
        println!("\n{} Saved {}", style("✓").green().bold(), path);
    } else {
        println!("\n{} {} is already up to date", style("✓").green().bold(), path);
    }

    let missing = doc.libraries_missing_pin();
    if !missing.is_empty() {
        println!(
            "\n{} Add your card PIN to {} for: {}",
            style("!").yellow().bold(),
            path,
            missing.join(", ")
        );
    }

    Ok(())
}

/// Fetches records from `source` and merges them into the configured file
///
/// The file is locked, backed up and saved only when something changed and
/// `dry_run` is off.
pub fn reconcile_into_config(
    settings: &Settings,
    source: &dyn LibrarySource,
    dry_run: bool,
) -> Result<(ConfigDocument, ReconcileReport)> {
    let provider = source.metadata().name;
    let records = source
        .fetch_records()
        .map_err(|e| app_error(e.into_app_error(&provider)))?;
    log::info!("{} reported {} library record(s)", provider, records.len());

    let store = ConfigStore::new(&settings.download_config_path);
    let _lock = if dry_run {
        None
    } else {
        Some(ConfigLock::acquire(store.path()).map_err(app_error)?)
    };

    let mut doc = store.load().map_err(app_error)?;
    let before = doc.clone();
    let report = reconcile(&mut doc, &records);

    if report.changed() && !dry_run {
        if settings.backup_on_save && store.exists() {
            backup_manager(settings)
                .create_backup(&before)
                .map_err(app_error)?;
        }
        store.save(&doc).map_err(app_error)?;
    }

    Ok((doc, report))
}

/// Download every loan whose final directory is missing
pub fn download(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let planner = layout_planner(settings, matches.get_one::<String>("dest"))?;
    let loans = fetch_loans(library_source(settings, matches).as_ref())?;

    let tool = download_tool(settings, &planner);
    let summary = download_loans(&planner, &tool, &settings.download_config_path, &loans)?;
    print_summary(&summary);

    if !summary.is_success() {
        bail!("{} loan(s) failed to download", summary.failed.len());
    }
    Ok(())
}

pub fn download_loans<T: DownloadTool + ?Sized>(
    planner: &LayoutPlanner,
    tool: &T,
    config_path: &Path,
    loans: &[Loan],
) -> Result<FetchSummary> {
    log::debug!("Using {} for {} loan(s)", tool.name(), loans.len());
    FetchRunner::new(planner, tool, config_path)
        .run(loans)
        .map_err(app_error)
}

/// Print where one loan would be staged and stored
pub fn plan(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let loan_id = matches
        .get_one::<String>("loan_id")
        .ok_or_else(|| anyhow!("Loan ID is required"))?;
    let planner = layout_planner(settings, matches.get_one::<String>("dest"))?;
    let layout = planner.plan(loan_id);

    println!("{} {}", style("Staging:").bold(), layout.staging_path.display());
    println!("{} {}", style("Final:  ").bold(), layout.final_path.display());
    println!("{} {}", style("State:  ").bold(), LoanState::of(&planner, loan_id).styled());
    Ok(())
}

/// List current loans with their local state
pub fn loans(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let planner = layout_planner(settings, None)?;
    let loans = fetch_loans(library_source(settings, matches).as_ref())?;

    if loans.is_empty() {
        println!("No current loans.");
        return Ok(());
    }

    println!("\n{} Loans", style(loans.len()).bold().cyan());
    println!("{}", "=".repeat(80));
    for loan in &loans {
        let state = LoanState::of(&planner, &loan.id);
        println!(
            "{} {:<12} {}{}",
            state.styled(),
            loan.id,
            truncate(&loan.title, 50),
            loan.library_name
                .as_deref()
                .map(|name| format!(" {}", style(format!("({})", name)).dim()))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// Show, create or reset the settings file
pub fn settings(manager: &SettingsManager, matches: &ArgMatches) -> Result<()> {
    let path = manager.settings_path();
    match matches.subcommand() {
        Some(("init", _)) => {
            if manager.initialize().map_err(app_error)? {
                println!("{} Created {}", style("✓").green().bold(), path.display());
            } else {
                println!("Settings already exist at {}", path.display());
            }
        }
        Some(("reset", _)) => {
            manager.reset().map_err(app_error)?;
            println!("{} Reset {} to defaults", style("✓").green().bold(), path.display());
        }
        _ => {
            let settings = manager.load_with_env_overrides().map_err(app_error)?;
            println!("{}", style(format!("# {}", path.display())).dim());
            print!("{}", toml::to_string_pretty(&settings)?);
        }
    }
    Ok(())
}

/// List or restore backups of the download tool configuration
pub fn backups(settings: &Settings, matches: &ArgMatches) -> Result<()> {
    let manager = backup_manager(settings);
    match matches.subcommand() {
        Some(("restore", sub_matches)) => {
            let name = sub_matches
                .get_one::<String>("file")
                .ok_or_else(|| anyhow!("Backup file is required"))?;
            let restored = restore_backup(settings, &manager, name)?;
            println!(
                "{} Restored {} from {}",
                style("✓").green().bold(),
                settings.download_config_path.display(),
                restored.display()
            );
        }
        _ => {
            let backups = manager.list_backups().map_err(app_error)?;
            if backups.is_empty() {
                println!("No backups in {}", manager.backup_dir().display());
                return Ok(());
            }
            println!("\n{} Backups", style(backups.len()).bold().cyan());
            println!("{}", "=".repeat(80));
            for backup in backups {
                println!(
                    "{}  {}  {}",
                    style(&backup.filename).bold(),
                    backup.modified_timestamp(),
                    style(backup.size_human()).dim()
                );
            }
        }
    }
    Ok(())
}

/// Replaces the live configuration with the backup `name`
///
/// The current file is backed up first when it can be read.
pub fn restore_backup(
    settings: &Settings,
    manager: &ConfigBackupManager,
    name: &str,
) -> Result<PathBuf> {
    let backup_path = manager.resolve(name);
    let doc = manager.restore_from_backup(&backup_path).map_err(app_error)?;

    let store = ConfigStore::new(&settings.download_config_path);
    let _lock = ConfigLock::acquire(store.path()).map_err(app_error)?;

    if store.exists() {
        match store.load() {
            Ok(current) => {
                manager.create_backup(&current).map_err(app_error)?;
            }
            Err(e) => log::warn!("Not backing up the current configuration: {}", e),
        }
    }
    store.save(&doc).map_err(app_error)?;
    Ok(backup_path)
}

/// Local state of one loan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanState {
    /// The final directory exists
    Downloaded,
    /// Marked bad; delete the marker to retry
    Bad,
    /// A staging directory is left from an earlier attempt
    Partial,
    Pending,
}

impl LoanState {
    pub fn of(planner: &LayoutPlanner, loan_id: &str) -> Self {
        let layout = planner.plan(loan_id);
        if layout.is_complete() {
            Self::Downloaded
        } else if StagingProgress::new(&layout.staging_path).is_bad() {
            Self::Bad
        } else if layout.staging_path.is_dir() {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    fn styled(self) -> console::StyledObject<String> {
        let label = format!("{:<10}", self.to_string());
        match self {
            Self::Downloaded => style(label).green(),
            Self::Bad => style(label).red().bold(),
            Self::Partial => style(label).yellow(),
            Self::Pending => style(label).cyan(),
        }
    }
}

impl fmt::Display for LoanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Downloaded => "done",
            Self::Bad => "bad",
            Self::Partial => "partial",
            Self::Pending => "pending",
        };
        f.write_str(label)
    }
}

// Helper functions

fn library_source(settings: &Settings, matches: &ArgMatches) -> Box<dyn LibrarySource> {
    match matches.get_one::<String>("export") {
        Some(path) => Box::new(ExportFileSource::new(path)),
        None => Box::new(
            SessionToolSource::new(settings.session_command_line(), &settings.export_path)
                .interactive(true),
        ),
    }
}

fn fetch_loans(source: &dyn LibrarySource) -> Result<Vec<Loan>> {
    let provider = source.metadata().name;
    source
        .fetch_loans()
        .map_err(|e| app_error(e.into_app_error(&provider)))
}

/// `dest` if given, otherwise the configured download root
fn layout_planner(settings: &Settings, dest: Option<&String>) -> Result<LayoutPlanner> {
    let download_root = match dest {
        Some(dest) => PathBuf::from(dest),
        None => settings
            .require_download_root()
            .map_err(app_error)?
            .to_path_buf(),
    };
    Ok(planner_for(settings, download_root))
}

fn planner_for(settings: &Settings, download_root: PathBuf) -> LayoutPlanner {
    let planner = LayoutPlanner::new(download_root);
    match &settings.staging_root {
        Some(staging_root) => planner.with_staging_root(staging_root),
        None => planner,
    }
}

fn download_tool(settings: &Settings, planner: &LayoutPlanner) -> CommandDownloadTool {
    CommandDownloadTool::new(
        &settings.download_command,
        Duration::from_secs(settings.download_timeout_secs),
    )
    .with_download_root(planner.download_root())
}

fn backup_manager(settings: &Settings) -> ConfigBackupManager {
    ConfigBackupManager::new(settings.backup_dir()).with_max_backups(settings.max_backups)
}

fn print_report(report: &ReconcileReport) {
    for name in &report.added {
        println!("  {} {}", style("+").green().bold(), name);
    }
    for name in &report.updated {
        println!("  {} {}", style("~").yellow().bold(), name);
    }
    for name in &report.unchanged {
        println!("  {} {}", style("=").dim(), style(name).dim());
    }
    for err in &report.skipped {
        println!("  {} {}", style("!").red().bold(), err.user_message());
    }
    if !report.duplicates.is_empty() {
        println!(
            "  {} Reported more than once, last entry kept: {}",
            style("!").yellow().bold(),
            report.duplicates.join(", ")
        );
    }
    println!(
        "\n{} library(ies): {} added, {} updated, {} unchanged",
        style(report.merged_count()).bold().cyan(),
        report.added.len(),
        report.updated.len(),
        report.unchanged.len()
    );
}

fn print_summary(summary: &FetchSummary) {
    println!("\n{}", style("Download Summary").bold().cyan());
    println!("{}", "=".repeat(80));
    println!("Downloaded: {}", summary.downloaded.len());
    println!("Skipped:    {}", summary.skipped.len());
    println!("Failed:     {}", summary.failed.len());
    for (loan_id, reason) in &summary.failed {
        let err = AppError::DownloadFailed {
            loan_id: loan_id.clone(),
            reason: reason.clone(),
        };
        log::debug!("{}", err);
        println!("  {} {} ({})", style("✗").red().bold(), err.user_message(), reason);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}
