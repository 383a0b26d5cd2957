use serde::{Deserialize, Serialize};

/// Audio capture configuration
///
/// The recognizer expects 16 kHz mono LINEAR16, so the sample rate here is
/// also what gets declared in the stream start message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio sample rate in Hz
    pub sample_rate: usize,
    /// Number of samples read from the device per block
    /// This is the fundamental audio block size for the whole pipeline
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            block_size: 1024,
        }
    }
}

/// Configuration for the recognizer stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// WebSocket endpoint of the streaming recognizer
    pub endpoint: String,
    /// BCP-47 language code sent in the stream start message
    pub language_code: String,
    /// Whether to request interim (partial) results
    pub interim_results: bool,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "wss://speech.example.com/v1/stream".to_string(),
            language_code: "en-US".to_string(),
            interim_results: true,
            api_key_env: "VOXSTREAM_API_KEY".to_string(),
        }
    }
}

/// Debug and diagnostics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Whether to log session statistics periodically
    pub log_stats_enabled: bool,
    /// Seconds between periodic statistics reports
    pub stats_interval_secs: u64,
    /// Whether to append final transcripts to a history file
    pub save_transcript_history: bool,
    /// Path of the transcript history file
    pub transcript_history_path: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_stats_enabled: false,
            stats_interval_secs: 30,
            save_transcript_history: false,
            transcript_history_path: "transcript_history.txt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub stream: StreamConfig,
    pub debug: DebugConfig,
}

/// Helper function to read the application configuration
///
/// Falls back to defaults when the file is missing or malformed so the
/// program can always start.
pub fn read_app_config(path: &str) -> AppConfig {
    match std::fs::read_to_string(path) {
        Ok(config_str) => match toml::from_str(&config_str) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to parse {}: {}. Using default configuration.",
                    path,
                    e
                );
                AppConfig::default()
            }
        },
        Err(e) => {
            tracing::debug!(
                "Failed to read {}: {}. Using default configuration.",
                path,
                e
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_recognizer_expectations() {
        let config = AppConfig::default();
        assert_eq!(config.audio.sample_rate, 16000);
        assert_eq!(config.stream.language_code, "en-US");
        assert!(config.stream.interim_results);
    }

    #[test]
    fn partial_config_keeps_defaults_for_missing_sections() {
        let config: AppConfig = toml::from_str(
            r#"
            [stream]
            language_code = "de-DE"
            "#,
        )
        .unwrap();
        assert_eq!(config.stream.language_code, "de-DE");
        assert_eq!(config.audio.block_size, 1024);
        assert_eq!(config.stream.api_key_env, "VOXSTREAM_API_KEY");
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let config = read_app_config("/nonexistent/voxstream.toml");
        assert_eq!(config.audio.sample_rate, 16000);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [[[").unwrap();
        let config = read_app_config(file.path().to_str().unwrap());
        assert_eq!(config.audio.block_size, 1024);
    }
}
