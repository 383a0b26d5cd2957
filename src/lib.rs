pub mod audio_capture;
pub mod config;
pub mod pcm;
pub mod protocol;
pub mod session_stats;
pub mod stats_reporter;
pub mod stream_client;
pub mod stream_transcriber;
pub mod transcript_writer;

// Re-export key components for easier access
pub use audio_capture::AudioCapture;
pub use config::{read_app_config, AppConfig};
pub use session_stats::SessionStats;
pub use stats_reporter::StatsReporter;
pub use stream_client::{RecognizerClient, StreamError};
pub use stream_transcriber::{StreamTranscriber, TranscriptUpdate};
