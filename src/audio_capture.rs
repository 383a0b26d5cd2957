use parking_lot::Mutex;
use portaudio as pa;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::AudioConfig;
use crate::session_stats::SessionStats;

/// Manages microphone capture using PortAudio
///
/// Captured blocks are pushed into a bounded channel from the PortAudio
/// callback; the callback never blocks, so a full channel means the block is
/// dropped and counted.
pub struct AudioCapture {
    pa_stream: Option<pa::Stream<pa::NonBlocking, pa::Input<f32>>>,
    pa: Option<pa::PortAudio>,
    input_settings: Option<pa::InputStreamSettings<f32>>,
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            pa_stream: None,
            pa: None,
            input_settings: None,
        }
    }

    /// Initializes PortAudio settings without starting the stream
    fn initialize_audio(&mut self, config: &AudioConfig) -> Result<(), anyhow::Error> {
        if self.pa.is_some() {
            return Ok(());
        }

        let pa = pa::PortAudio::new()
            .map_err(|e| anyhow::anyhow!("Failed to initialize PortAudio: {}", e))?;

        // Mono input; the recognizer only accepts a single channel
        let input_params = pa
            .default_input_stream_params::<f32>(1)
            .map_err(|e| anyhow::anyhow!("Failed to get default input stream parameters: {}", e))?;

        let input_settings = pa::InputStreamSettings::new(
            input_params,
            config.sample_rate as f64,
            config.block_size as u32,
        );

        self.pa = Some(pa);
        self.input_settings = Some(input_settings);
        Ok(())
    }

    /// Opens the input device and starts delivering sample blocks
    ///
    /// # Arguments
    /// * `tx` - Channel sender for audio blocks
    /// * `running` - Atomic flag indicating whether the app is running
    /// * `recording` - Atomic flag indicating whether capture is active
    pub fn start(
        &mut self,
        config: &AudioConfig,
        tx: mpsc::Sender<Vec<f32>>,
        running: Arc<AtomicBool>,
        recording: Arc<AtomicBool>,
        stats: Arc<Mutex<SessionStats>>,
    ) -> Result<(), anyhow::Error> {
        self.initialize_audio(config)?;

        let pa = self
            .pa
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("PortAudio not initialized"))?;
        let input_settings = self
            .input_settings
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Audio input settings not initialized"))?
            .clone();

        let recording_for_callback = recording.clone();
        let stats_for_callback = stats.clone();

        let callback = move |pa::InputStreamCallbackArgs { buffer, .. }| {
            if recording_for_callback.load(Ordering::Relaxed) {
                let samples = buffer.to_vec();
                let sample_count = samples.len();
                match tx.try_send(samples) {
                    Ok(_) => {
                        if let Some(mut stats) = stats_for_callback.try_lock() {
                            stats.record_block_captured(sample_count);
                        }
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        if let Some(mut stats) = stats_for_callback.try_lock() {
                            let total = stats.record_block_dropped();
                            tracing::warn!("Audio channel full, dropped block (total: {})", total);
                        }
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        tracing::error!("Failed to send audio block: channel closed");
                    }
                }
            }

            if running.load(Ordering::Relaxed) {
                pa::Continue
            } else {
                pa::Complete
            }
        };

        let mut stream = pa
            .open_non_blocking_stream(input_settings, callback)
            .map_err(|e| anyhow::anyhow!("Failed to open input stream: {}", e))?;

        stream
            .start()
            .map_err(|e| anyhow::anyhow!("Failed to start input stream: {}", e))?;

        self.pa_stream = Some(stream);
        Ok(())
    }

    /// Completely stops and cleans up the audio capture
    pub fn stop(&mut self) {
        if let Some(stream) = &mut self.pa_stream {
            if let Err(e) = stream.stop() {
                tracing::warn!("Failed to stop input stream: {}", e);
            }
            if let Err(e) = stream.close() {
                tracing::warn!("Failed to close input stream: {}", e);
            }
        }
        self.pa_stream = None;
        self.pa = None;
        self.input_settings = None;
    }
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
