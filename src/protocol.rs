use serde::{Deserialize, Serialize};

use crate::config::{AudioConfig, StreamConfig};

/// Audio encoding declared in the stream start message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudioEncoding {
    Linear16,
}

/// Recognition parameters sent once when the stream opens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub encoding: AudioEncoding,
    pub sample_rate_hertz: u32,
    pub language_code: String,
    pub interim_results: bool,
}

/// First frame on the wire; everything after it is binary audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartMessage {
    pub config: RecognitionConfig,
}

impl StartMessage {
    pub fn new(stream: &StreamConfig, audio: &AudioConfig) -> Self {
        Self {
            config: RecognitionConfig {
                encoding: AudioEncoding::Linear16,
                sample_rate_hertz: audio.sample_rate as u32,
                language_code: stream.language_code.clone(),
                interim_results: stream.interim_results,
            },
        }
    }
}

/// One recognition hypothesis
#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

/// A single result within a response; interim until `is_final` flips
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub stability: f32,
}

impl RecognitionResult {
    /// The top hypothesis, if the service sent any
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives
            .first()
            .map(|alternative| alternative.transcript.as_str())
    }
}

/// Error object the service embeds in a response instead of results
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i32,
    #[serde(default)]
    pub message: String,
}

impl ApiError {
    /// Codes 3 and 11 are how the service reports hitting its 60 second
    /// streaming limit, without saying so in the message.
    pub fn is_stream_limit(&self) -> bool {
        matches!(self.code, 3 | 11)
    }
}

/// A response frame from the recognizer
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
    #[serde(default)]
    pub error: Option<ApiError>,
}
