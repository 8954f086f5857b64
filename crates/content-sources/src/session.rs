//! Runs the session tool and reads the export it writes

use crate::{LibrarySource, SessionExport, SourceError, SourceMetadata, SourceResult};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};

/// Phrases in the session tool's output that mean the user must log in again
pub const AUTH_HINTS: &[&str] = &[
    "login",
    "log in",
    "sign in",
    "not authenticated",
    "authenticate",
    "expired",
];

pub(crate) fn mentions_authentication(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_HINTS.iter().any(|hint| lower.contains(hint))
}

/// Builds a shell invocation for a command line
pub(crate) fn shell_command(command_line: &str) -> Command {
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

/// The session tool, run as an external command
///
/// The command is expected to write its export to `export_path`. No retries
/// are attempted: an expired login needs the user, not another try.
#[derive(Debug, Clone)]
pub struct SessionToolSource {
    command_line: String,
    export_path: PathBuf,
    interactive: bool,
}

impl SessionToolSource {
    pub fn new(command_line: impl Into<String>, export_path: impl Into<PathBuf>) -> Self {
        Self {
            command_line: command_line.into(),
            export_path: export_path.into(),
            interactive: false,
        }
    }

    /// Let the tool talk to the terminal so it can prompt for a login code
    ///
    /// Output is echoed as it arrives and still collected, so a failed login
    /// is classified the same way as in a non-interactive run.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    fn run(&self) -> SourceResult<()> {
        log::info!("Running session tool: {}", self.command_line);

        let mut cmd = shell_command(&self.command_line);
        cmd.stdin(if self.interactive {
            Stdio::inherit()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            SourceError::Unavailable(format!("failed to start '{}': {}", self.command_line, e))
        })?;

        let (echo_out, echo_err): (Option<Echo>, Option<Echo>) = if self.interactive {
            (Some(echo_stdout as Echo), Some(echo_stderr as Echo))
        } else {
            (None, None)
        };
        let stdout_reader = child.stdout.take().map(|out| tee(out, echo_out));
        let stderr_reader = child.stderr.take().map(|err| tee(err, echo_err));

        let status = child.wait().map_err(|e| {
            SourceError::Unavailable(format!("failed to wait for '{}': {}", self.command_line, e))
        })?;

        let joined = |reader: Option<JoinHandle<Vec<u8>>>| {
            reader
                .map(|r| r.join().unwrap_or_default())
                .unwrap_or_default()
        };
        let output = Output {
            status,
            stdout: joined(stdout_reader),
            stderr: joined(stderr_reader),
        };

        Self::check_output(&output)
    }

    fn check_output(output: &Output) -> SourceResult<()> {
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stdout.lines().chain(stderr.lines()) {
            log::debug!("session tool: {}", line);
        }

        if output.status.success() {
            return Ok(());
        }

        let detail = stderr
            .lines()
            .chain(stdout.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string();

        if mentions_authentication(&stderr) || mentions_authentication(&stdout) {
            return Err(SourceError::AuthenticationRequired(detail));
        }

        Err(SourceError::Unavailable(match output.status.code() {
            Some(code) if detail.is_empty() => format!("exited with status {}", code),
            Some(code) => format!("exited with status {}: {}", code, detail),
            None => "terminated by a signal".to_string(),
        }))
    }
}

impl LibrarySource for SessionToolSource {
    fn fetch_export(&self) -> SourceResult<SessionExport> {
        self.run()?;
        read_export(&self.export_path)
    }

    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "session tool".to_string(),
            description: format!(
                "`{}` exporting to {}",
                self.command_line,
                self.export_path.display()
            ),
            requires_auth: true,
        }
    }
}

type Echo = fn(&[u8]);

fn echo_stdout(bytes: &[u8]) {
    let mut out = io::stdout().lock();
    let _ = out.write_all(bytes);
    let _ = out.flush();
}

fn echo_stderr(bytes: &[u8]) {
    let mut err = io::stderr().lock();
    let _ = err.write_all(bytes);
    let _ = err.flush();
}

/// Reads `stream` to the end on its own thread, echoing each chunk
///
/// Chunks rather than lines, so a prompt without a trailing newline shows up
/// before the tool waits for input.
fn tee<R: Read + Send + 'static>(mut stream: R, echo: Option<Echo>) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut collected = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(echo) = echo {
                        echo(&buf[..n]);
                    }
                    collected.extend_from_slice(&buf[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        collected
    })
}

/// Reads and parses an export file
pub(crate) fn read_export(path: &Path) -> SourceResult<SessionExport> {
    let contents = fs::read_to_string(path).map_err(|e| {
        SourceError::Unavailable(format!("cannot read export {}: {}", path.display(), e))
    })?;
    SessionExport::parse(&contents)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use loanload_core::LibraryRecord;
    use tempfile::TempDir;

    fn source_writing(contents: &str, dir: &TempDir) -> SessionToolSource {
        let export = dir.path().join("libby.json");
        let fixture = dir.path().join("fixture.json");
        fs::write(&fixture, contents).unwrap();
        SessionToolSource::new(
            format!("cp '{}' '{}'", fixture.display(), export.display()),
            export,
        )
    }

    #[test]
    fn test_runs_command_and_parses_export() {
        let dir = TempDir::new().unwrap();
        let source = source_writing(
            r#"[{"name": "CityLib", "base_url": "c", "website_id": "1"}]"#,
            &dir,
        );

        let records = source.fetch_records().unwrap();
        assert_eq!(records, vec![LibraryRecord::new("CityLib", "c", "1")]);
    }

    #[test]
    fn test_auth_hint_on_failure() {
        let dir = TempDir::new().unwrap();
        let source = SessionToolSource::new(
            "echo 'Error: token expired, please login again' >&2; exit 1",
            dir.path().join("libby.json"),
        );

        assert!(matches!(
            source.fetch_records(),
            Err(SourceError::AuthenticationRequired(_))
        ));
    }

    #[test]
    fn test_interactive_run_still_detects_login_failure() {
        let dir = TempDir::new().unwrap();
        let source = SessionToolSource::new(
            "echo 'Error: not authenticated, please login' >&2; exit 1",
            dir.path().join("libby.json"),
        )
        .interactive(true);

        match source.fetch_records() {
            Err(SourceError::AuthenticationRequired(detail)) => {
                assert!(detail.contains("not authenticated"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interactive_run_reads_export() {
        let dir = TempDir::new().unwrap();
        let source = source_writing(r#"[{"name": "CityLib", "website_id": "1"}]"#, &dir)
            .interactive(true);
        assert_eq!(source.fetch_records().unwrap().len(), 1);
    }

    #[test]
    fn test_plain_failure_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source =
            SessionToolSource::new("echo 'boom' >&2; exit 3", dir.path().join("libby.json"));

        match source.fetch_records() {
            Err(SourceError::Unavailable(reason)) => {
                assert!(reason.contains("status 3"));
                assert!(reason.contains("boom"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_tool_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = SessionToolSource::new(
            "definitely-not-a-real-session-tool --export",
            dir.path().join("libby.json"),
        );
        assert!(matches!(
            source.fetch_records(),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_success_without_export_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let source = SessionToolSource::new("true", dir.path().join("libby.json"));
        assert!(matches!(
            source.fetch_loans(),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn test_mentions_authentication() {
        assert!(mentions_authentication("Please Sign In first"));
        assert!(mentions_authentication("NOT AUTHENTICATED"));
        assert!(!mentions_authentication("connection refused"));
    }
}
