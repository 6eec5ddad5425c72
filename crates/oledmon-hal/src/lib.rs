//! Hardware Abstraction Layer (HAL) for SSD1306 OLED panels
//!
//! This crate drives 128x64 SSD1306 controllers over Linux I2C and keeps an
//! observable record of everything it sends, so a monitor can show what the
//! panel is displaying without reading anything back from the hardware.
//!
//! # Supported Transports
//!
//! - `linux:<bus>:<device>` - `/dev/i2c-<bus>`, 7-bit device address
//! - `trace` - discards every write, for development without hardware
//!
//! # Example
//!
//! ```no_run
//! use oledmon_hal::{DeviceSpec, Ssd1306, FRAME_BYTES};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spec = DeviceSpec::parse("linux:1:3c")?;
//!     let mut display = Ssd1306::new(spec.open()?);
//!     display.init()?;
//!
//!     display.set_contrast(0.5)?;
//!     display.push_frame(&[0xAA; FRAME_BYTES])?;
//!     println!("{} ({})", display.name(), display.id());
//!     Ok(())
//! }
//! ```

pub mod canvas;
pub mod command;
pub mod device;
pub mod display;
pub mod mock;
pub mod screen;
pub mod telemetry;
pub mod transport;

pub use canvas::Canvas;
pub use command::{CHUNK_SIZE, FRAME_BYTES, FrameKind, HEIGHT, PAGES, WIDTH};
pub use device::{DeviceError, DeviceKind, DeviceSpec};
pub use display::{DisplayError, Ssd1306, contrast_level, device_id};
pub use screen::{ShadowBuffer, Snapshot};
pub use telemetry::{DEFAULT_HISTORY, History, Telemetry};
pub use transport::{Bus, LinuxI2c, Transport, TransportError};

/// HAL Result type
pub type Result<T> = std::result::Result<T, DisplayError>;

/// The driver type the daemon builds for every configured panel
pub type Display = Ssd1306<Transport>;
