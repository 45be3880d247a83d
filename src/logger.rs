//! Run logger
//!
//! User-facing progress and summary output for a single resolution run.
//! Messages go to stderr (through the spinner when one is active) so that the
//! JSON result on stdout stays clean. Diagnostics from library code go
//! through `tracing` instead.

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum VerbosityLevel {
    Silent = 0,   // Errors only: no spinner, no summary
    Summary = 1,  // Run milestones (default)
    Detailed = 2, // Warnings and per-entity results
    Debug = 3,
}

impl VerbosityLevel {
    pub fn from_verbose_count(count: u8) -> Self {
        match count {
            0 => VerbosityLevel::Summary,
            1 => VerbosityLevel::Detailed,
            2.. => VerbosityLevel::Debug,
        }
    }

    /// Default `tracing` filter directive for this level
    pub fn tracing_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Silent => "error",
            VerbosityLevel::Summary => "warn",
            VerbosityLevel::Detailed => "info",
            VerbosityLevel::Debug => "debug",
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct RunMetadata {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub website: String,
    pub keywords_tried: usize,
    pub candidates_fetched: usize,
    pub reference_url: Option<String>,
    pub entities_found: usize,
    pub domains_resolved: usize,
    pub output_file: String,
}

impl RunMetadata {
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().ok(),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct RunLogger {
    verbosity: VerbosityLevel,
    spinner: Arc<Mutex<Option<ProgressBar>>>,
    metadata: Arc<Mutex<RunMetadata>>,
    log_buffer: Arc<Mutex<Vec<String>>>,
    log_file_path: Option<String>,
}

impl RunLogger {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            spinner: Arc::new(Mutex::new(None)),
            metadata: Arc::new(Mutex::new(RunMetadata::default())),
            log_buffer: Arc::new(Mutex::new(Vec::new())),
            log_file_path: None,
        }
    }

    pub fn with_log_file(verbosity: VerbosityLevel, log_file_path: String) -> Self {
        Self {
            log_file_path: Some(log_file_path),
            ..Self::new(verbosity)
        }
    }

    pub fn info(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Summary {
            self.emit("INFO", message);
        }
    }

    pub fn warn(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.emit("WARN", message);
        }
    }

    /// Errors are shown at every verbosity.
    pub fn error(&self, message: &str) {
        self.emit("ERROR", message);
    }

    pub fn debug(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Debug {
            self.emit("DEBUG", message);
        }
    }

    fn emit(&self, level: &str, message: &str) {
        let line = format!("[{}] {}: {}", Local::now().format("%H:%M:%S%.3f"), level, message);

        if self.log_file_path.is_some() {
            if let Ok(mut buffer) = self.log_buffer.lock() {
                buffer.push(line.clone());
            }
        }

        if let Ok(guard) = self.spinner.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.println(line);
                return;
            }
        }
        eprintln!("{}", line);
    }

    fn with_metadata(&self, f: impl FnOnce(&mut RunMetadata)) {
        if let Ok(mut metadata) = self.metadata.lock() {
            f(&mut metadata);
        }
    }

    pub fn metadata(&self) -> RunMetadata {
        self.metadata.lock().map(|m| m.clone()).unwrap_or_default()
    }

    /// Record the start of the run and, when `show_spinner` is set and the
    /// level is above Silent, draw a spinner on stderr until [`RunLogger::finish`].
    pub fn start(&self, website: &str, show_spinner: bool) {
        self.with_metadata(|m| {
            m.start_time = Some(Utc::now());
            m.website = website.to_string();
        });

        if show_spinner && self.shows_progress() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner} [{elapsed_precise}] {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message(format!("Resolving {}", website));
            if let Ok(mut guard) = self.spinner.lock() {
                *guard = Some(pb);
            }
        }

        self.info(&format!("Resolving reference article for {}", website));
    }

    pub fn finish(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
        self.with_metadata(|m| m.end_time = Some(Utc::now()));
    }

    pub fn record_search(&self, keywords_tried: usize, candidates_fetched: usize) {
        self.with_metadata(|m| {
            m.keywords_tried = keywords_tried;
            m.candidates_fetched = candidates_fetched;
        });
        self.debug(&format!(
            "Tried {} keywords, fetched {} candidate articles",
            keywords_tried, candidates_fetched
        ));
    }

    pub fn log_match(&self, reference_url: &str, tier: &str) {
        self.with_metadata(|m| m.reference_url = Some(reference_url.to_string()));
        self.info(&format!("Matched reference article {} ({})", reference_url, tier));
    }

    pub fn log_no_match(&self, website: &str) {
        self.info(&format!("No reference article matched {}", website));
    }

    pub fn log_entity(&self, name: &str, relation: &str, domain: Option<&str>) {
        match domain {
            Some(domain) => self.detail(&format!("{} '{}' resolved to {}", relation, name, domain)),
            None => self.debug(&format!("{} '{}' has no trusted domain", relation, name)),
        }
    }

    fn detail(&self, message: &str) {
        if self.verbosity >= VerbosityLevel::Detailed {
            self.emit("INFO", message);
        }
    }

    pub fn record_entities(&self, entities_found: usize, domains_resolved: usize) {
        self.with_metadata(|m| {
            m.entities_found = entities_found;
            m.domains_resolved = domains_resolved;
        });
    }

    pub fn log_export_success(&self, path: &str) {
        self.with_metadata(|m| m.output_file = path.to_string());
        self.info(&format!("Export completed: {}", path));
    }

    /// Render the end-of-run summary.
    pub fn summary_lines(&self) -> Vec<String> {
        let metadata = self.metadata();
        let mut lines = vec!["=== RESOLUTION SUMMARY ===".to_string()];

        if let Some(duration) = metadata.duration() {
            lines.push(format!("Duration: {:.2}s", duration.as_secs_f64()));
        }
        lines.push(format!("Website: {}", metadata.website));
        lines.push(format!("Keywords Tried: {}", metadata.keywords_tried));
        lines.push(format!("Candidate Articles: {}", metadata.candidates_fetched));
        lines.push(format!(
            "Reference Article: {}",
            metadata.reference_url.as_deref().unwrap_or("none")
        ));
        lines.push(format!("Related Companies: {}", metadata.entities_found));
        lines.push(format!("Domains Resolved: {}", metadata.domains_resolved));
        if !metadata.output_file.is_empty() {
            lines.push(format!("Results Exported: {}", metadata.output_file));
        }
        lines.push("==========================".to_string());
        lines
    }

    /// Spinner and final summary are suppressed at Silent.
    pub fn shows_progress(&self) -> bool {
        self.verbosity > VerbosityLevel::Silent
    }

    /// Print the summary to stderr unless the level is Silent.
    pub fn print_final_summary(&self) {
        if !self.shows_progress() {
            return;
        }
        eprintln!();
        for line in self.summary_lines() {
            eprintln!("{}", line);
        }
    }

    /// Write all buffered messages to the log file, if one was configured.
    pub fn export_logs(&self) -> Result<()> {
        let Some(ref log_file_path) = self.log_file_path else {
            return Ok(());
        };

        if let Some(parent) = Path::new(log_file_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)?;

        if let Ok(buffer) = self.log_buffer.lock() {
            for entry in buffer.iter() {
                writeln!(file, "{}", entry)?;
            }
        }
        file.flush()?;
        Ok(())
    }

    pub fn is_log_export_enabled(&self) -> bool {
        self.log_file_path.is_some()
    }

    pub fn log_count(&self) -> usize {
        self.log_buffer.lock().map(|b| b.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_from_count() {
        assert_eq!(VerbosityLevel::from_verbose_count(0), VerbosityLevel::Summary);
        assert_eq!(VerbosityLevel::from_verbose_count(1), VerbosityLevel::Detailed);
        assert_eq!(VerbosityLevel::from_verbose_count(5), VerbosityLevel::Debug);
        assert_eq!(VerbosityLevel::Debug.tracing_directive(), "debug");
    }

    #[test]
    fn test_messages_below_verbosity_are_not_buffered() {
        let logger = RunLogger::with_log_file(VerbosityLevel::Summary, "unused.log".to_string());
        logger.info("kept");
        logger.debug("dropped");
        logger.error("always kept");
        assert_eq!(logger.log_count(), 2);
    }

    #[test]
    fn test_silent_suppresses_progress_output() {
        assert!(!RunLogger::new(VerbosityLevel::Silent).shows_progress());
        assert!(RunLogger::new(VerbosityLevel::Summary).shows_progress());

        let silent = RunLogger::with_log_file(VerbosityLevel::Silent, "unused.log".to_string());
        silent.start("acme.com", true);
        silent.info("hidden");
        silent.error("shown");
        silent.finish();
        assert_eq!(silent.log_count(), 1);
    }

    #[test]
    fn test_summary_reflects_recorded_metadata() {
        let logger = RunLogger::new(VerbosityLevel::Silent);
        logger.start("acme.com", false);
        logger.record_search(2, 5);
        logger.log_match("https://en.wikipedia.org/wiki/Acme_Corporation", "exact_domain");
        logger.record_entities(3, 1);
        logger.finish();

        let summary = logger.summary_lines().join("\n");
        assert!(summary.contains("Website: acme.com"));
        assert!(summary.contains("Candidate Articles: 5"));
        assert!(summary.contains("Reference Article: https://en.wikipedia.org/wiki/Acme_Corporation"));
        assert!(summary.contains("Domains Resolved: 1"));
        assert!(logger.metadata().duration().is_some());
    }

    #[test]
    fn test_export_logs_writes_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("run.log");
        let logger = RunLogger::with_log_file(VerbosityLevel::Debug, path.to_string_lossy().to_string());
        logger.info("first");
        logger.debug("second");
        logger.export_logs().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("INFO: first"));
        assert!(written.contains("DEBUG: second"));
    }
}
