//! Downloads every pending loan, one at a time

use crate::error::LibraryResult;
use crate::layout::LayoutPlanner;
use crate::metadata::tag_provenance;
use crate::progress::StagingProgress;
use crate::promote::{promote, Promotion};
use crate::tool::{DownloadOutcome, DownloadTool};
use loanload_core::Loan;
use std::path::{Path, PathBuf};

/// What happened to one loan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Downloaded and promoted into the final root
    Downloaded,
    /// The final directory already existed
    AlreadyPresent,
    /// A `bad` marker is present; delete it to retry
    SkippedBad { marker: PathBuf },
    /// The attempt failed; the output was appended to the staging log
    Failed { reason: String, marked_bad: bool },
}

/// Totals for a whole run
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub downloaded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl FetchSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Drives a [`DownloadTool`] over a list of loans
pub struct FetchRunner<'a, T: DownloadTool + ?Sized> {
    planner: &'a LayoutPlanner,
    tool: &'a T,
    config_path: &'a Path,
}

impl<'a, T: DownloadTool + ?Sized> FetchRunner<'a, T> {
    pub fn new(planner: &'a LayoutPlanner, tool: &'a T, config_path: &'a Path) -> Self {
        Self {
            planner,
            tool,
            config_path,
        }
    }

    /// Loans whose final directory does not exist yet
    pub fn pending<'l>(&self, loans: &'l [Loan]) -> Vec<&'l Loan> {
        loans
            .iter()
            .filter(|loan| !self.planner.plan(&loan.id).is_complete())
            .collect()
    }

    /// Downloads every pending loan in order; one failure does not stop the rest
    pub fn run(&self, loans: &[Loan]) -> LibraryResult<FetchSummary> {
        self.planner.ensure_libby_root()?;

        let pending = self.pending(loans);
        let mut summary = FetchSummary::default();
        if pending.is_empty() {
            log::info!("Nothing to do");
            return Ok(summary);
        }

        log::info!("{} loan(s) to download:", pending.len());
        for loan in &pending {
            log::info!("  {} - {} ({})", loan.id, loan.title, loan.website_id);
        }

        for loan in pending {
            match self.fetch_one(loan)? {
                FetchOutcome::Downloaded => summary.downloaded.push(loan.id.clone()),
                FetchOutcome::AlreadyPresent | FetchOutcome::SkippedBad { .. } => {
                    summary.skipped.push(loan.id.clone())
                }
                FetchOutcome::Failed { reason, .. } => {
                    summary.failed.push((loan.id.clone(), reason))
                }
            }
        }
        Ok(summary)
    }

    /// One attempt at one loan
    ///
    /// A loan that made progress on an earlier attempt but none on this one is
    /// marked bad, so it is not retried forever.
    pub fn fetch_one(&self, loan: &Loan) -> LibraryResult<FetchOutcome> {
        let layout = self.planner.plan(&loan.id);
        if layout.is_complete() {
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let progress = StagingProgress::new(&layout.staging_path);
        if progress.is_bad() {
            let marker = progress.bad_marker_path();
            log::warn!(
                "Skipping '{}' due to bad marker (delete to retry): {}",
                loan.title,
                marker.display()
            );
            return Ok(FetchOutcome::SkippedBad { marker });
        }

        log::info!("Downloading '{}' ({})", loan.title, loan.id);
        let was_previously_run = progress.previously_run()?;

        let outcome = match self.tool.run_download(loan, &layout, self.config_path) {
            Ok(outcome) => outcome,
            Err(e) => DownloadOutcome {
                output: e.to_string(),
                ..DownloadOutcome::default()
            },
        };

        let made_progress = progress.record_progress()?.made_progress;

        if !outcome.success || !made_progress {
            let reason = failure_reason(&outcome, made_progress);
            log::error!("Download of {} ({}) failed: {}", loan.id, loan.title, reason);
            let log_path = progress.append_log(&outcome.output)?;
            log::info!("Tool output saved to {}", log_path.display());

            let marked_bad = was_previously_run && !made_progress;
            if marked_bad {
                let marker = progress.mark_bad()?;
                log::warn!(
                    "Earlier attempts made progress but this one did not, marking bad: {}",
                    marker.display()
                );
            }
            return Ok(FetchOutcome::Failed { reason, marked_bad });
        }

        let promotion = match promote(&layout) {
            Ok(promotion) => promotion,
            Err(e) => return Ok(failed_after_download(loan, &progress, e.to_string())),
        };
        if promotion == Promotion::NothingStaged && !layout.is_complete() {
            let reason = "download tool produced no files".to_string();
            log::error!("Download of {} failed: {}", loan.id, reason);
            return Ok(FetchOutcome::Failed {
                reason,
                marked_bad: false,
            });
        }

        if let Err(e) = tag_provenance(&layout.final_path, loan) {
            return Ok(failed_after_download(loan, &progress, e.to_string()));
        }
        log::info!("Finished '{}'", loan.title);
        Ok(FetchOutcome::Downloaded)
    }
}

/// The tool succeeded but moving or tagging the result did not
fn failed_after_download(loan: &Loan, progress: &StagingProgress, reason: String) -> FetchOutcome {
    log::error!("Download of {} ({}) failed: {}", loan.id, loan.title, reason);
    match progress.append_log(&reason) {
        Ok(log_path) => log::info!("Error saved to {}", log_path.display()),
        Err(e) => log::warn!("Could not write {}: {}", progress.log_path().display(), e),
    }
    FetchOutcome::Failed {
        reason,
        marked_bad: false,
    }
}

fn failure_reason(outcome: &DownloadOutcome, made_progress: bool) -> String {
    let mut parts = Vec::new();
    if outcome.timed_out {
        parts.push("timed out".to_string());
    } else if !outcome.success {
        parts.push(match outcome.exit_code {
            Some(code) => format!("exit code {}", code),
            None if outcome.output.is_empty() => "terminated".to_string(),
            None => outcome.output.lines().next().unwrap_or_default().to_string(),
        });
    }
    if !made_progress {
        parts.push("no progress made".to_string());
    }
    parts.join(", ")
}
