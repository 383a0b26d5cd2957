use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::config::DebugConfig;

/// Appends final transcripts to the history file named in the debug config
pub struct TranscriptWriter {
    path: PathBuf,
    enabled: bool,
}

impl TranscriptWriter {
    pub fn new(config: &DebugConfig) -> Self {
        Self {
            path: PathBuf::from(&config.transcript_history_path),
            enabled: config.save_transcript_history,
        }
    }

    /// Records one final transcript with a timestamp
    ///
    /// A disabled writer and a blank transcript are both no-ops, so callers
    /// can hand over every final result unconditionally.
    pub fn append_final(&self, text: &str) -> Result<(), std::io::Error> {
        let text = text.trim();
        if !self.enabled || text.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, text)?;
        Ok(())
    }
}
