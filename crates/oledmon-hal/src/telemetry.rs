//! Observation channels
//!
//! The render thread is the only producer. Any number of monitor requests may
//! read concurrently. Histories are fixed-capacity rings that drop the oldest
//! entry; contrast, polarity and the current screen are latest-value cells
//! backed by `tokio::sync::watch`, so publishing never waits on a reader.

use crate::screen::Snapshot;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Default number of entries kept per history
pub const DEFAULT_HISTORY: usize = 100;

/// Bounded most-recent-wins history
#[derive(Debug)]
pub struct History<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> History<T> {
    /// Create a history holding at most `capacity` entries (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&self, value: T) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.len() == self.capacity {
                entries.pop_front();
            }
            entries.push_back(value);
        }
    }

    /// Copy of the retained entries, oldest first
    pub fn to_vec(&self) -> Vec<T> {
        self.entries
            .lock()
            .map(|e| e.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything a display publishes for observers
#[derive(Debug)]
pub struct Telemetry {
    writes: History<Arc<[u8]>>,
    latencies: History<Duration>,
    contrast: watch::Sender<f64>,
    invert: watch::Sender<bool>,
    screen: watch::Sender<Option<Arc<Snapshot>>>,
}

impl Telemetry {
    pub fn new(history: usize, contrast: f64, invert: bool) -> Self {
        Self {
            writes: History::new(history),
            latencies: History::new(history),
            contrast: watch::Sender::new(contrast),
            invert: watch::Sender::new(invert),
            screen: watch::Sender::new(None),
        }
    }

    pub(crate) fn record_write(&self, frame: &[u8]) {
        self.writes.push(Arc::from(frame));
    }

    pub(crate) fn record_latency(&self, elapsed: Duration) {
        self.latencies.push(elapsed);
    }

    pub(crate) fn publish_contrast(&self, value: f64) {
        self.contrast.send_replace(value);
    }

    pub(crate) fn publish_invert(&self, value: bool) {
        self.invert.send_replace(value);
    }

    pub(crate) fn publish_screen(&self, snapshot: Snapshot) {
        self.screen.send_replace(Some(Arc::new(snapshot)));
    }

    /// Recent raw transfers, oldest first
    pub fn writes(&self) -> Vec<Arc<[u8]>> {
        self.writes.to_vec()
    }

    /// Recent raw transfers as lowercase hex strings
    pub fn writes_hex(&self) -> Vec<String> {
        self.writes.to_vec().iter().map(hex::encode).collect()
    }

    /// Recent full-frame push durations, oldest first
    pub fn latencies(&self) -> Vec<Duration> {
        self.latencies.to_vec()
    }

    /// Recent full-frame push durations in milliseconds
    pub fn latencies_ms(&self) -> Vec<f64> {
        self.latencies
            .to_vec()
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect()
    }

    pub fn contrast(&self) -> f64 {
        *self.contrast.borrow()
    }

    pub fn invert(&self) -> bool {
        *self.invert.borrow()
    }

    /// Latest reconstructed screen, if a full frame has been sent
    pub fn screen(&self) -> Option<Arc<Snapshot>> {
        self.screen.borrow().clone()
    }

    /// Receiver notified on every new screen snapshot
    pub fn subscribe_screen(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.screen.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_drops_oldest() {
        let history = History::new(3);
        for i in 0..5 {
            history.push(i);
        }
        assert_eq!(history.to_vec(), vec![2, 3, 4]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_history_zero_capacity() {
        let history = History::new(0);
        history.push("a");
        history.push("b");
        assert_eq!(history.to_vec(), vec!["b"]);
    }

    #[test]
    fn test_history_empty() {
        let history: History<u8> = History::new(4);
        assert!(history.is_empty());
        assert_eq!(history.len(), 0);
    }

    #[test]
    fn test_latest_value_cells() {
        let telemetry = Telemetry::new(DEFAULT_HISTORY, 0.1, false);
        telemetry.publish_contrast(0.75);
        telemetry.publish_invert(true);

        assert_eq!(telemetry.contrast(), 0.75);
        assert!(telemetry.invert());
        assert!(telemetry.screen().is_none());
    }

    #[test]
    fn test_writes_hex() {
        let telemetry = Telemetry::new(2, 0.1, false);
        telemetry.record_write(&[0x00, 0xAF]);
        telemetry.record_write(&[0x00, 0x81, 0x80]);
        telemetry.record_write(&[0x40, 0xFF]);
        assert_eq!(telemetry.writes_hex(), vec!["008180", "40ff"]);
    }

    #[test]
    fn test_latencies_ms() {
        let telemetry = Telemetry::new(4, 0.1, false);
        telemetry.record_latency(Duration::from_micros(2500));
        assert_eq!(telemetry.latencies_ms(), vec![2.5]);
    }
}
