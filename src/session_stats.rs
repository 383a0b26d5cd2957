use std::time::Instant;

/// Counters for one streaming session
///
/// Updated from the capture callback and the stream tasks, reported
/// periodically by the stats reporter.
pub struct SessionStats {
    started_at: Instant,
    sample_rate: usize,
    blocks_captured: usize,
    samples_captured: usize,
    blocks_dropped: usize,
    bytes_sent: usize,
    responses_received: usize,
    final_results: usize,
}

impl SessionStats {
    pub fn new(sample_rate: usize) -> Self {
        Self {
            started_at: Instant::now(),
            sample_rate,
            blocks_captured: 0,
            samples_captured: 0,
            blocks_dropped: 0,
            bytes_sent: 0,
            responses_received: 0,
            final_results: 0,
        }
    }

    pub fn record_block_captured(&mut self, samples: usize) {
        self.blocks_captured += 1;
        self.samples_captured += samples;
    }

    /// Records a dropped block and returns the running total
    pub fn record_block_dropped(&mut self) -> usize {
        self.blocks_dropped += 1;
        self.blocks_dropped
    }

    pub fn record_bytes_sent(&mut self, bytes: usize) {
        self.bytes_sent += bytes;
    }

    pub fn record_response(&mut self, is_final: bool) {
        self.responses_received += 1;
        if is_final {
            self.final_results += 1;
        }
    }

    /// Seconds of audio captured so far
    pub fn audio_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples_captured as f32 / self.sample_rate as f32
    }

    pub fn report(&self) -> String {
        format!(
            "session {:.0}s: {:.1}s audio captured ({} blocks, {} dropped), {} KiB sent, {} responses ({} final)",
            self.started_at.elapsed().as_secs_f32(),
            self.audio_seconds(),
            self.blocks_captured,
            self.blocks_dropped,
            self.bytes_sent / 1024,
            self.responses_received,
            self.final_results,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_seconds_follows_sample_rate() {
        let mut stats = SessionStats::new(16000);
        stats.record_block_captured(16000);
        stats.record_block_captured(8000);
        assert!((stats.audio_seconds() - 1.5).abs() < f32::EPSILON);
    }

    #[test]
    fn drop_counter_returns_running_total() {
        let mut stats = SessionStats::new(16000);
        assert_eq!(stats.record_block_dropped(), 1);
        assert_eq!(stats.record_block_dropped(), 2);
    }

    #[test]
    fn report_includes_final_result_count() {
        let mut stats = SessionStats::new(16000);
        stats.record_response(false);
        stats.record_response(true);
        stats.record_bytes_sent(2048);
        let report = stats.report();
        assert!(report.contains("2 responses (1 final)"));
        assert!(report.contains("2 KiB sent"));
    }

    #[test]
    fn zero_sample_rate_does_not_divide_by_zero() {
        let stats = SessionStats::new(0);
        assert_eq!(stats.audio_seconds(), 0.0);
    }
}
