//! Display registry for the monitor
//!
//! Maps display ids to the shared driver and its telemetry. Reads go through
//! telemetry and never touch the driver lock; mutations lock the driver and
//! therefore wait for an in-flight frame to finish.

use oledmon_hal::{Bus, DisplayError, Snapshot, Ssd1306, Telemetry, contrast_level};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// A driver shared between its render loop and the monitor
pub type SharedDisplay<B> = Arc<Mutex<Ssd1306<B>>>;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Duplicate device: {0}")]
    DuplicateDevice(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Display {0} is unavailable")]
    Unavailable(String),

    #[error(transparent)]
    Display(#[from] DisplayError),
}

/// Identity of a registered display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub name: String,
    pub id: String,
}

/// Everything the monitor shows for one display
#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatus {
    pub name: String,
    pub id: String,
    pub contrast: f64,
    pub contrast_level: u8,
    pub invert: bool,
    pub latencies_ms: Vec<f64>,
    pub writes: Vec<String>,
    pub screen_timestamp_ms: Option<u64>,
    pub lit_pixels: Option<usize>,
}

struct Entry<B: Bus> {
    summary: DeviceSummary,
    display: SharedDisplay<B>,
    telemetry: Arc<Telemetry>,
}

/// All displays driven by this process
pub struct Registry<B: Bus> {
    entries: Vec<Entry<B>>,
}

impl<B: Bus> Registry<B> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add a display; returns its id
    pub fn register(&mut self, display: SharedDisplay<B>) -> Result<String, MonitorError> {
        let (summary, telemetry) = {
            let guard = display
                .lock()
                .map_err(|_| MonitorError::Unavailable("<unregistered>".to_string()))?;
            (
                DeviceSummary {
                    name: guard.name().to_string(),
                    id: guard.id().to_string(),
                },
                guard.telemetry(),
            )
        };

        if self.entries.iter().any(|e| e.summary.id == summary.id) {
            return Err(MonitorError::DuplicateDevice(summary.name));
        }

        tracing::debug!("Registered {} as {}", summary.name, summary.id);
        let id = summary.id.clone();
        self.entries.push(Entry {
            summary,
            display,
            telemetry,
        });
        Ok(id)
    }

    pub fn devices(&self) -> Vec<DeviceSummary> {
        self.entries.iter().map(|e| e.summary.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: &str) -> Result<&Entry<B>, MonitorError> {
        self.entries
            .iter()
            .find(|e| e.summary.id == id)
            .ok_or_else(|| MonitorError::UnknownDevice(id.to_string()))
    }

    /// Current observable state of a display
    pub fn status(&self, id: &str) -> Result<DeviceStatus, MonitorError> {
        let entry = self.entry(id)?;
        let telemetry = &entry.telemetry;
        let screen = telemetry.screen();
        let contrast = telemetry.contrast();

        Ok(DeviceStatus {
            name: entry.summary.name.clone(),
            id: entry.summary.id.clone(),
            contrast,
            contrast_level: contrast_level(contrast).unwrap_or_default(),
            invert: telemetry.invert(),
            latencies_ms: telemetry.latencies_ms(),
            writes: telemetry.writes_hex(),
            screen_timestamp_ms: screen.as_ref().map(|s| s.timestamp_ms),
            lit_pixels: screen.as_ref().map(|s| s.lit()),
        })
    }

    /// Latest reconstructed screen
    pub fn screen(&self, id: &str) -> Result<Option<Arc<Snapshot>>, MonitorError> {
        Ok(self.entry(id)?.telemetry.screen())
    }

    /// Set contrast from a 0-255 level. Blocks on the bus write.
    pub fn set_contrast(&self, id: &str, level: u8) -> Result<DeviceStatus, MonitorError> {
        self.with_display(id, |display| display.set_contrast(level as f64 / 255.0))?;
        self.status(id)
    }

    /// Set polarity. Blocks on the bus write.
    pub fn set_invert(&self, id: &str, invert: bool) -> Result<DeviceStatus, MonitorError> {
        self.with_display(id, |display| display.set_invert(invert))?;
        self.status(id)
    }

    fn with_display<F>(&self, id: &str, f: F) -> Result<(), MonitorError>
    where
        F: FnOnce(&mut Ssd1306<B>) -> Result<(), DisplayError>,
    {
        let entry = self.entry(id)?;
        let mut display = entry
            .display
            .lock()
            .map_err(|_| MonitorError::Unavailable(entry.summary.name.clone()))?;
        f(&mut *display).map_err(|e| {
            tracing::warn!("{}: {}", entry.summary.name, e);
            MonitorError::from(e)
        })
    }
}

impl<B: Bus> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oledmon_hal::FRAME_BYTES;
    use oledmon_hal::mock::MockBus;

    fn shared(name: &str) -> SharedDisplay<MockBus> {
        let mut display = Ssd1306::new(MockBus::named(name));
        display.init().unwrap();
        Arc::new(Mutex::new(display))
    }

    #[test]
    fn test_register_and_list() {
        let mut registry = Registry::new();
        let id_a = registry.register(shared("a")).unwrap();
        let id_b = registry.register(shared("b")).unwrap();

        assert_ne!(id_a, id_b);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.devices()[0].name, "a");
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = Registry::new();
        registry.register(shared("a")).unwrap();
        assert!(matches!(
            registry.register(shared("a")),
            Err(MonitorError::DuplicateDevice(_))
        ));
    }

    #[test]
    fn test_unknown_device() {
        let registry: Registry<MockBus> = Registry::new();
        assert!(matches!(
            registry.status("deadbeef"),
            Err(MonitorError::UnknownDevice(_))
        ));
    }

    #[test]
    fn test_status_reflects_frames() {
        let display = shared("a");
        let mut registry = Registry::new();
        let id = registry.register(Arc::clone(&display)).unwrap();

        let status = registry.status(&id).unwrap();
        assert_eq!(status.contrast_level, 26);
        assert!(status.screen_timestamp_ms.is_none());

        display.lock().unwrap().push_frame(&[0x01; FRAME_BYTES]).unwrap();
        let status = registry.status(&id).unwrap();
        assert_eq!(status.lit_pixels, Some(FRAME_BYTES));
        assert_eq!(status.latencies_ms.len(), 1);
        assert!(status.writes.last().unwrap().starts_with("40"));
    }

    #[test]
    fn test_mutations() {
        let display = shared("a");
        let mut registry = Registry::new();
        let id = registry.register(Arc::clone(&display)).unwrap();

        let status = registry.set_contrast(&id, 128).unwrap();
        assert_eq!(status.contrast_level, 128);
        assert_eq!(status.writes.last().unwrap(), "008180");

        let status = registry.set_invert(&id, true).unwrap();
        assert!(status.invert);
        assert!(display.lock().unwrap().invert());
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let display = shared("a");
        let mut registry = Registry::new();
        let id = registry.register(Arc::clone(&display)).unwrap();

        display.lock().unwrap().bus_mut().fail_on(1);
        assert!(matches!(
            registry.set_invert(&id, true),
            Err(MonitorError::Display(DisplayError::Transport(_)))
        ));
        assert!(!registry.status(&id).unwrap().invert);
    }
}
