//! Bus transports
//!
//! A transport moves one framed byte sequence to one addressed device.
//! The driver only sees the [`Bus`] trait; [`Transport`] is the closed set of
//! transports the daemon can build from a device specification.

use embedded_hal::i2c::I2c;
use linux_embedded_hal::I2cdev;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to open {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Write of {len} bytes to {target} failed: {reason}")]
    Write {
        target: String,
        len: usize,
        reason: String,
    },
}

/// Byte sink for one display controller
pub trait Bus {
    /// Human-readable identity, stable for the lifetime of the transport
    fn name(&self) -> String;

    /// Send `bytes` to the device as a single transfer
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError>;
}

/// Linux I2C character device with a fixed 7-bit target address
pub struct LinuxI2c {
    bus: u32,
    address: u8,
    dev: I2cdev,
}

impl LinuxI2c {
    /// Open `/dev/i2c-<bus>` for writes to `address`
    pub fn open(bus: u32, address: u8) -> Result<Self, TransportError> {
        let path = PathBuf::from(format!("/dev/i2c-{}", bus));
        let dev = I2cdev::new(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!("Opened {} for device 0x{:02x}", path.display(), address);
        Ok(Self { bus, address, dev })
    }
}

impl Bus for LinuxI2c {
    fn name(&self) -> String {
        linux_name(self.bus, self.address)
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.dev
            .write(self.address, bytes)
            .map_err(|e| TransportError::Write {
                target: self.name(),
                len: bytes.len(),
                reason: e.to_string(),
            })
    }
}

/// Identity of a Linux I2C display; bus in decimal, device in hex
pub(crate) fn linux_name(bus: u32, address: u8) -> String {
    format!("linux:bus_{}:dev_{:x}", bus, address)
}

/// Identity of the discarding transport
pub(crate) const TRACE_NAME: &str = "trace";

/// Every transport a device specification can produce
pub enum Transport {
    /// Real I2C writes
    Linux(LinuxI2c),
    /// No physical effect; frames are only logged at trace level
    Trace,
}

impl Bus for Transport {
    fn name(&self) -> String {
        match self {
            Transport::Linux(i2c) => i2c.name(),
            Transport::Trace => TRACE_NAME.to_string(),
        }
    }

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        match self {
            Transport::Linux(i2c) => i2c.transmit(bytes),
            Transport::Trace => {
                tracing::trace!("[TRACE] {}", hex::encode(bytes));
                Ok(())
            }
        }
    }
}
