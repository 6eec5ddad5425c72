//! Mock transport for testing without real hardware
//!
//! [`MockBus`] records every transfer and can be armed to fail, so driver
//! behavior around framing and transport errors can be checked on a desktop.
//!
//! # Usage
//!
//! ```
//! use oledmon_hal::mock::MockBus;
//! use oledmon_hal::{Ssd1306, FRAME_BYTES};
//!
//! let mut display = Ssd1306::new(MockBus::new());
//! display.init().unwrap();
//! display.push_frame(&[0; FRAME_BYTES]).unwrap();
//! assert_eq!(display.bus().data_frames().len(), 16);
//! ```

use crate::command::control;
use crate::transport::{Bus, TransportError};

/// Recording transport with optional failure injection
#[derive(Debug, Default)]
pub struct MockBus {
    name: Option<String>,
    frames: Vec<Vec<u8>>,
    transmissions: usize,
    fail_at: Option<usize>,
    fail_forever: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom identity instead of `mock`
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Fail the `n`th transfer from now (1-based); later transfers succeed
    pub fn fail_on(&mut self, n: usize) {
        self.fail_at = Some(self.transmissions + n.max(1));
        self.fail_forever = false;
    }

    /// Fail the `n`th transfer from now and every one after it
    pub fn fail_from(&mut self, n: usize) {
        self.fail_on(n);
        self.fail_forever = true;
    }

    /// Stop injecting failures
    pub fn heal(&mut self) {
        self.fail_at = None;
        self.fail_forever = false;
    }

    /// Every transfer attempted, including failed ones
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.clone()
    }

    /// Transfers starting with the command-stream control byte
    pub fn command_frames(&self) -> Vec<Vec<u8>> {
        self.with_control(control::CMD_STREAM)
    }

    /// Transfers starting with the data-stream control byte
    pub fn data_frames(&self) -> Vec<Vec<u8>> {
        self.with_control(control::DATA_STREAM)
    }

    /// Forget recorded transfers
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    fn with_control(&self, byte: u8) -> Vec<Vec<u8>> {
        self.frames
            .iter()
            .filter(|f| f.first() == Some(&byte))
            .cloned()
            .collect()
    }
}

impl Bus for MockBus {
    fn name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "mock".to_string())
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.transmissions += 1;
        self.frames.push(bytes.to_vec());

        let failing = match self.fail_at {
            Some(at) if self.fail_forever => self.transmissions >= at,
            Some(at) => self.transmissions == at,
            None => false,
        };

        if failing {
            tracing::debug!("[MOCK] Failing transfer #{}", self.transmissions);
            return Err(TransportError::Write {
                target: self.name(),
                len: bytes.len(),
                reason: "injected failure".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records() {
        let mut bus = MockBus::new();
        bus.transmit(&[0x00, 0xAF]).unwrap();
        bus.transmit(&[0x40, 0x01]).unwrap();
        bus.transmit(&[0x80, 0xE3]).unwrap();

        assert_eq!(bus.frames().len(), 3);
        assert_eq!(bus.command_frames(), vec![vec![0x00, 0xAF]]);
        assert_eq!(bus.data_frames(), vec![vec![0x40, 0x01]]);
    }

    #[test]
    fn test_mock_fail_on() {
        let mut bus = MockBus::new();
        bus.transmit(&[0x00]).unwrap();
        bus.fail_on(2);
        assert!(bus.transmit(&[0x00]).is_ok());
        assert!(bus.transmit(&[0x00]).is_err());
        assert!(bus.transmit(&[0x00]).is_ok());
    }

    #[test]
    fn test_mock_fail_from() {
        let mut bus = MockBus::new();
        bus.fail_from(1);
        assert!(bus.transmit(&[0x00]).is_err());
        assert!(bus.transmit(&[0x00]).is_err());
        bus.heal();
        assert!(bus.transmit(&[0x00]).is_ok());
    }

    #[test]
    fn test_mock_names() {
        assert_eq!(MockBus::new().name(), "mock");
        assert_eq!(MockBus::named("panel-a").name(), "panel-a");
    }
}
