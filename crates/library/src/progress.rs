//! Bookkeeping kept inside a loan's staging directory between attempts
//!
//! - `older.files` lists the audio files already seen, one per line
//! - `bad` marks a loan that stopped making progress; delete it to retry
//! - `process.log` accumulates the download tool's output from failed runs

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub const OLDER_FILES: &str = "older.files";
pub const BAD_MARKER: &str = "bad";
pub const PROCESS_LOG: &str = "process.log";

const LOG_SEPARATOR: &str = "\n==================\n";
const AUDIO_EXTENSION: &str = "mp3";

/// Result of comparing the staging directory against the last attempt
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressCheck {
    pub made_progress: bool,
    /// Audio files that appeared since the last check
    pub new_files: Vec<String>,
}

/// Progress state of one staging directory
#[derive(Debug, Clone)]
pub struct StagingProgress {
    staging_path: PathBuf,
}

impl StagingProgress {
    pub fn new(staging_path: impl Into<PathBuf>) -> Self {
        Self {
            staging_path: staging_path.into(),
        }
    }

    pub fn staging_path(&self) -> &Path {
        &self.staging_path
    }

    pub fn bad_marker_path(&self) -> PathBuf {
        self.staging_path.join(BAD_MARKER)
    }

    pub fn log_path(&self) -> PathBuf {
        self.staging_path.join(PROCESS_LOG)
    }

    fn older_files_path(&self) -> PathBuf {
        self.staging_path.join(OLDER_FILES)
    }

    fn older_files(&self) -> io::Result<Vec<String>> {
        match fs::read_to_string(self.older_files_path()) {
            Ok(contents) => Ok(contents
                .lines()
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// True if an earlier attempt already produced audio files
    pub fn previously_run(&self) -> io::Result<bool> {
        Ok(!self.older_files()?.is_empty())
    }

    pub fn is_bad(&self) -> bool {
        self.bad_marker_path().is_file()
    }

    pub fn mark_bad(&self) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.staging_path)?;
        let marker = self.bad_marker_path();
        OpenOptions::new().create(true).append(true).open(&marker)?;
        Ok(marker)
    }

    /// Records audio files that appeared since the last check
    ///
    /// A missing staging directory counts as progress: the tool may have
    /// finished and moved everything already.
    pub fn record_progress(&self) -> io::Result<ProgressCheck> {
        if !self.staging_path.is_dir() {
            return Ok(ProgressCheck {
                made_progress: true,
                new_files: Vec::new(),
            });
        }

        let mut seen = self.older_files()?;
        let mut current: Vec<String> = fs::read_dir(&self.staging_path)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| {
                Path::new(name).extension().and_then(|e| e.to_str()) == Some(AUDIO_EXTENSION)
            })
            .collect();
        current.sort();

        let new_files: Vec<String> = current
            .into_iter()
            .filter(|name| !seen.contains(name))
            .collect();
        for name in &new_files {
            log::info!("  {}", name);
        }
        seen.extend(new_files.iter().cloned());

        if !seen.is_empty() {
            fs::write(self.older_files_path(), seen.join("\n"))?;
        }

        Ok(ProgressCheck {
            made_progress: !new_files.is_empty(),
            new_files,
        })
    }

    /// Appends the tool's output from a failed run to `process.log`
    pub fn append_log(&self, output: &str) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.staging_path)?;
        let path = self.log_path();
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(output.as_bytes())?;
        file.write_all(b"\n")?;
        file.write_all(LOG_SEPARATOR.as_bytes())?;
        Ok(path)
    }
}
