use std::fs;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::config::Config;

/// Simple file logger for certification runs with buffered writes
pub struct FileLogger {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl FileLogger {
    /// Create a new file logger, writing to ~/logs/fel-tools/felassist_<timestamp>.log
    pub(crate) fn new() -> Result<Self> {
        let home_dir = dirs::home_dir().context("Failed to get home directory")?;
        Self::in_directory(&home_dir.join("logs").join("fel-tools"))
    }

    /// Create a new log file in the given directory.
    pub(crate) fn in_directory(log_dir: &Path) -> Result<Self> {
        if !log_dir.exists() {
            fs::create_dir_all(log_dir).context("Failed to create log directory")?;
        }

        let path = log_dir.join(format!("felassist_{}.log", Local::now().format("%Y-%m-%d_%H-%M-%S")));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
        })
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn timestamp() -> String {
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
    }

    /// Log when starting the program. Secrets are never written.
    pub(crate) fn log_init(&mut self, config: &Config) {
        let _ = writeln!(self.writer, "[{}] INIT", Self::timestamp());
        let _ = writeln!(self.writer, "  environment: {}", config.infile.environment);
        let _ = writeln!(self.writer, "  certification_url: {}", config.infile.certification_url);
        let _ = writeln!(self.writer, "  organization_id: {}", config.books.organization_id);
        let _ = writeln!(self.writer, "  emitter: {} ({})", config.emitter.name, config.emitter.tax_id);
        let _ = writeln!(self.writer, "  phrases: {}", config.phrases.len());
        let _ = writeln!(self.writer, "  identifier_prefix: {}", config.identifier_prefix);
        let _ = writeln!(self.writer, "  verbose: {}", config.verbose);
        let _ = self.writer.flush();
    }

    /// Write one event line.
    pub(crate) fn log_line(&mut self, level: &str, message: &str) {
        let _ = writeln!(self.writer, "[{}] {level:<7} {message}", Self::timestamp());
        let _ = self.writer.flush();
    }

    /// Write a multi-line block, indented under a header line.
    pub(crate) fn log_block(&mut self, level: &str, header: &str, content: &str) {
        let _ = writeln!(self.writer, "[{}] {level:<7} {header}", Self::timestamp());
        for line in content.lines() {
            let _ = writeln!(self.writer, "  {line}");
        }
        let _ = self.writer.flush();
    }

    pub(crate) fn log_end(&mut self) {
        let _ = writeln!(self.writer, "[{}] END", Self::timestamp());
        let _ = self.writer.flush();
    }
}
