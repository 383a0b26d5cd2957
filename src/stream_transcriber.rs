use anyhow::Context;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::audio_capture::AudioCapture;
use crate::config::AppConfig;
use crate::pcm;
use crate::session_stats::SessionStats;
use crate::stats_reporter::StatsReporter;
use crate::stream_client::{AudioSink, RecognizerClient, ResponseStream};
use crate::transcript_writer::TranscriptWriter;

/// One transcript line from the recognizer
#[derive(Debug, Clone)]
pub struct TranscriptUpdate {
    pub text: String,
    pub is_final: bool,
}

/// Coordinates the capture loop and the recognizer stream
///
/// Two tasks run until the stream ends or an error flips the running flag:
/// one forwards captured blocks to the recognizer as PCM frames, the other
/// reads responses and broadcasts transcript updates. There is no retry or
/// reconnect; any failure ends the session.
pub struct StreamTranscriber {
    audio_capture: Arc<Mutex<AudioCapture>>,

    tx: mpsc::Sender<Vec<f32>>,
    rx: Option<mpsc::Receiver<Vec<f32>>>,

    transcript_tx: broadcast::Sender<TranscriptUpdate>,

    running: Arc<AtomicBool>,
    recording: Arc<AtomicBool>,

    stats: Arc<Mutex<SessionStats>>,
    stats_reporter: Option<StatsReporter>,

    send_handle: Option<tokio::task::JoinHandle<()>>,
    recv_handle: Option<tokio::task::JoinHandle<()>>,

    config: AppConfig,
}

impl StreamTranscriber {
    pub fn new(config: AppConfig) -> Self {
        let (tx, rx) = mpsc::channel(400);
        let (transcript_tx, _) = broadcast::channel(100);

        let stats = Arc::new(Mutex::new(SessionStats::new(config.audio.sample_rate)));

        Self {
            audio_capture: Arc::new(Mutex::new(AudioCapture::new())),
            tx,
            rx: Some(rx),
            transcript_tx,
            running: Arc::new(AtomicBool::new(true)),
            recording: Arc::new(AtomicBool::new(false)),
            stats,
            stats_reporter: None,
            send_handle: None,
            recv_handle: None,
            config,
        }
    }

    /// Connects to the recognizer and starts the capture and stream tasks
    pub async fn start(&mut self) -> Result<(), anyhow::Error> {
        self.running.store(true, Ordering::Relaxed);

        let (sink, responses) =
            RecognizerClient::connect(&self.config.stream, &self.config.audio)
                .await
                .context("Failed to open recognizer stream")?;

        self.recording.store(true, Ordering::Relaxed);
        self.audio_capture
            .lock()
            .start(
                &self.config.audio,
                self.tx.clone(),
                self.running.clone(),
                self.recording.clone(),
                self.stats.clone(),
            )
            .context("Failed to start audio capture")?;

        let rx = self
            .rx
            .take()
            .ok_or_else(|| anyhow::anyhow!("Audio receiver already taken"))?;

        self.send_handle = Some(self.spawn_audio_sender(rx, sink));
        self.recv_handle = Some(self.spawn_response_reader(responses));

        if self.config.debug.log_stats_enabled {
            let reporter = StatsReporter::new(
                self.stats.clone(),
                self.running.clone(),
                self.config.debug.stats_interval_secs,
            );
            reporter.start_periodic_reporting();
            self.stats_reporter = Some(reporter);
        }

        Ok(())
    }

    /// Forwards captured blocks to the recognizer as binary PCM frames
    fn spawn_audio_sender(
        &self,
        mut rx: mpsc::Receiver<Vec<f32>>,
        mut sink: AudioSink,
    ) -> tokio::task::JoinHandle<()> {
        let running = self.running.clone();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            tracing::debug!("Audio sender task started");

            loop {
                tokio::select! {
                    block = rx.recv() => match block {
                        Some(samples) => {
                            let frame = pcm::f32_to_linear16(&samples);
                            if frame.is_empty() {
                                continue;
                            }
                            if let Err(e) = sink.send_audio(&frame).await {
                                tracing::error!("Could not send audio: {}", e);
                                running.store(false, Ordering::Relaxed);
                                break;
                            }
                            stats.lock().record_bytes_sent(frame.len());
                        }
                        None => break,
                    },
                    _ = tokio::time::sleep(Duration::from_millis(100)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                    }
                }
            }

            // Best effort; the service may already be gone.
            if let Err(e) = sink.finish().await {
                tracing::debug!("Failed to close audio sink: {}", e);
            }
            tracing::debug!("Audio sender task stopped");
        })
    }

    /// Reads responses until end-of-stream or error and broadcasts them
    fn spawn_response_reader(&self, mut responses: ResponseStream) -> tokio::task::JoinHandle<()> {
        let running = self.running.clone();
        let stats = self.stats.clone();
        let transcript_tx = self.transcript_tx.clone();
        let writer = TranscriptWriter::new(&self.config.debug);

        tokio::spawn(async move {
            tracing::debug!("Response reader task started");

            loop {
                match responses.next_response().await {
                    Ok(Some(response)) => {
                        if let Some(error) = response.error {
                            if error.is_stream_limit() {
                                tracing::warn!(
                                    "Speech recognition request exceeded limit of 60 seconds"
                                );
                            }
                            tracing::error!(
                                "Could not recognize: {} (code {})",
                                error.message,
                                error.code
                            );
                            running.store(false, Ordering::Relaxed);
                            break;
                        }

                        for result in response.results {
                            stats.lock().record_response(result.is_final);

                            let Some(text) = result.best_transcript() else {
                                continue;
                            };
                            if text.is_empty() {
                                continue;
                            }

                            if result.is_final {
                                if let Err(e) = writer.append_final(text) {
                                    tracing::warn!("Failed to write transcript history: {}", e);
                                }
                            }

                            let _ = transcript_tx.send(TranscriptUpdate {
                                text: text.to_string(),
                                is_final: result.is_final,
                            });
                        }
                    }
                    Ok(None) => {
                        tracing::info!("Recognizer ended the stream");
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Cannot stream results: {}", e);
                        running.store(false, Ordering::Relaxed);
                        break;
                    }
                }
            }

            tracing::debug!("Response reader task stopped");
        })
    }

    /// Stops capture, waits for both stream tasks, and reports final stats
    pub async fn shutdown(&mut self) -> Result<(), anyhow::Error> {
        self.running.store(false, Ordering::Relaxed);
        self.recording.store(false, Ordering::Relaxed);

        self.audio_capture.lock().stop();

        if let Some(handle) = self.send_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Audio sender task panicked: {:?}", e);
            }
        }
        if let Some(handle) = self.recv_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("Response reader task panicked: {:?}", e);
            }
        }

        if let Some(reporter) = &self.stats_reporter {
            reporter.print_stats();
        }

        Ok(())
    }

    /// Get a receiver for transcript updates
    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptUpdate> {
        self.transcript_tx.subscribe()
    }

    /// Get the running state reference
    pub fn get_running(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
