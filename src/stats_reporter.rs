use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::session_stats::SessionStats;

/// Periodically logs session statistics while the app is running
pub struct StatsReporter {
    stats: Arc<Mutex<SessionStats>>,
    running: Arc<AtomicBool>,
    interval_secs: u64,
}

impl StatsReporter {
    pub fn new(
        stats: Arc<Mutex<SessionStats>>,
        running: Arc<AtomicBool>,
        interval_secs: u64,
    ) -> Self {
        Self {
            stats,
            running,
            interval_secs,
        }
    }

    pub fn start_periodic_reporting(&self) {
        let stats = self.stats.clone();
        let running = self.running.clone();
        let interval_secs = self.interval_secs.max(1);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            // The first tick fires immediately; skip it so the first report
            // has something to say.
            interval.tick().await;

            while running.load(Ordering::Relaxed) {
                interval.tick().await;
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                tracing::info!("{}", stats.lock().report());
            }
        });
    }

    /// Logs the current statistics on demand
    pub fn print_stats(&self) {
        tracing::info!("{}", self.stats.lock().report());
    }
}
