//! The download tool, behind a narrow capability trait

use crate::error::{LibraryError, LibraryResult};
use loanload_core::{Loan, LoanLayout};
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// What one download attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DownloadOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    /// Everything the tool printed, stdout first
    pub output: String,
}

/// Fetches, decrypts and re-encodes the audio for one loan
pub trait DownloadTool {
    /// Runs a download into `layout`, reading the tool configuration at
    /// `config_path`
    ///
    /// `Err` means the tool could not be run at all; a tool that ran and
    /// failed is reported through [`DownloadOutcome::success`].
    fn run_download(
        &self,
        loan: &Loan,
        layout: &LoanLayout,
        config_path: &Path,
    ) -> LibraryResult<DownloadOutcome>;

    fn name(&self) -> &str;
}

/// Runs a shell command template once per loan
///
/// Placeholders: `{website_id}`, `{loan_id}`, `{staging}`, `{staging_rel}`,
/// `{final}`, `{config}`. `{staging_rel}` is the staging path relative to the
/// download root, for tools that run with `DOWNLOAD_BASE` as their working
/// root (such as a container that mounts it); it falls back to the absolute
/// path when staging lives elsewhere.
#[derive(Debug, Clone)]
pub struct CommandDownloadTool {
    template: String,
    timeout: Duration,
    download_root: Option<PathBuf>,
}

impl CommandDownloadTool {
    pub fn new(template: impl Into<String>, timeout: Duration) -> Self {
        Self {
            template: template.into(),
            timeout,
            download_root: None,
        }
    }

    /// Exported to the tool as `DOWNLOAD_BASE`
    pub fn with_download_root(mut self, download_root: impl Into<PathBuf>) -> Self {
        self.download_root = Some(download_root.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The command line for one loan
    pub fn render(&self, loan: &Loan, layout: &LoanLayout, config_path: &Path) -> String {
        self.template
            .replace("{website_id}", &loan.website_id)
            .replace("{loan_id}", &loan.id)
            .replace("{staging_rel}", &self.relative_staging(layout).display().to_string())
            .replace("{staging}", &layout.staging_path.display().to_string())
            .replace("{final}", &layout.final_path.display().to_string())
            .replace("{config}", &config_path.display().to_string())
    }

    fn relative_staging<'l>(&self, layout: &'l LoanLayout) -> &'l Path {
        self.download_root
            .as_deref()
            .and_then(|root| layout.staging_path.strip_prefix(root).ok())
            .unwrap_or(&layout.staging_path)
    }

    fn shell(command_line: &str) -> Command {
        if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command_line);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command_line);
            cmd
        }
    }

    /// Waits for `child`, killing it once the timeout passes
    fn wait_with_timeout(&self, child: &mut Child) -> LibraryResult<(Option<i32>, bool)> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((status.code(), false));
            }
            if start.elapsed() >= self.timeout {
                log::warn!(
                    "Download tool still running after {} minutes, killing it",
                    start.elapsed().as_secs() / 60
                );
                // Already exited between the check and the kill
                let _ = child.kill();
                let status = child.wait()?;
                return Ok((status.code(), true));
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl DownloadTool for CommandDownloadTool {
    fn run_download(
        &self,
        loan: &Loan,
        layout: &LoanLayout,
        config_path: &Path,
    ) -> LibraryResult<DownloadOutcome> {
        let command_line = self.render(loan, layout, config_path);
        log::info!("Running download tool: {}", command_line);

        let mut cmd = Self::shell(&command_line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(root) = &self.download_root {
            cmd.env("DOWNLOAD_BASE", root);
        }

        let mut child = cmd.spawn().map_err(LibraryError::ToolStart)?;

        // Stream stdout live so progress is visible, keep a copy for the log
        let stdout_reader = child.stdout.take().map(|stdout| {
            thread::spawn(move || {
                let mut collected = String::new();
                for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                    log::info!("{}", line);
                    collected.push_str(&line);
                    collected.push('\n');
                }
                collected
            })
        });
        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut collected = String::new();
                let _ = stderr.read_to_string(&mut collected);
                collected
            })
        });

        let (exit_code, timed_out) = self.wait_with_timeout(&mut child)?;

        let mut output = String::new();
        for reader in [stdout_reader, stderr_reader].into_iter().flatten() {
            output.push_str(&reader.join().unwrap_or_default());
        }
        if timed_out {
            output.push_str(&format!(
                "Timeout reached after {} minutes for loan {}, process killed.\n",
                self.timeout.as_secs() / 60,
                loan.id
            ));
        }

        let success = !timed_out && exit_code == Some(0);
        if !success {
            log::warn!(
                "Download tool failed for loan {} (exit code {:?})",
                loan.id,
                exit_code
            );
        }

        Ok(DownloadOutcome {
            success,
            exit_code,
            timed_out,
            output,
        })
    }

    fn name(&self) -> &str {
        "download tool"
    }
}
