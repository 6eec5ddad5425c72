//! SSD1306 display driver
//!
//! Frames controller commands and pixel data, tracks contrast and polarity,
//! and feeds every data-stream transfer into a [`ShadowBuffer`] so the last
//! full frame can be observed through [`Telemetry`].
//!
//! `init()` must be called before `set_contrast`, `set_invert` or
//! `push_frame`; those return [`DisplayError::NotInitialized`] otherwise.
//! A startup contrast can be chosen with [`Ssd1306::with_contrast`] and is
//! applied by `init()`.

use crate::command::{self, CHUNK_SIZE, FRAME_BYTES, FULL_FRAME_PREFIX, FrameKind, INIT_SEQUENCE};
use crate::screen::ShadowBuffer;
use crate::telemetry::{DEFAULT_HISTORY, Telemetry};
use crate::transport::{Bus, TransportError};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Contrast before anything is configured (~10%)
pub const DEFAULT_CONTRAST: f64 = 0.1;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Display {0} not initialized")]
    NotInitialized(String),
}

/// Scale a contrast fraction to the controller's register value.
///
/// Values outside `[0, 1]` and NaN are rejected rather than clamped.
pub fn contrast_level(value: f64) -> Result<u8, DisplayError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(DisplayError::InvalidArgument(format!(
            "contrast {} outside [0, 1]",
            value
        )));
    }
    Ok((255.0 * value).round() as u8)
}

/// Short stable fingerprint of a display name: CRC-32 as little-endian hex
pub fn device_id(name: &str) -> String {
    hex::encode(crc32fast::hash(name.as_bytes()).to_le_bytes())
}

/// Driver for one 128x64 SSD1306 panel
pub struct Ssd1306<B: Bus> {
    bus: B,
    name: String,
    id: String,
    contrast: f64,
    invert: bool,
    initialized: bool,
    shadow: ShadowBuffer,
    telemetry: Arc<Telemetry>,
}

impl<B: Bus> std::fmt::Debug for Ssd1306<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ssd1306")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("contrast", &self.contrast)
            .field("invert", &self.invert)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl<B: Bus> Ssd1306<B> {
    /// Create a driver with the default history depth
    pub fn new(bus: B) -> Self {
        Self::with_history(bus, DEFAULT_HISTORY)
    }

    /// Create a driver keeping `history` recent writes and latencies
    pub fn with_history(bus: B, history: usize) -> Self {
        let name = bus.name();
        let id = device_id(&name);
        tracing::debug!("Display {} has id {}", name, id);

        Self {
            bus,
            name,
            id,
            contrast: DEFAULT_CONTRAST,
            invert: false,
            initialized: false,
            shadow: ShadowBuffer::new(),
            telemetry: Arc::new(Telemetry::new(history, DEFAULT_CONTRAST, false)),
        }
    }

    /// Choose the contrast `init()` will apply
    pub fn with_contrast(mut self, value: f64) -> Result<Self, DisplayError> {
        contrast_level(value)?;
        self.contrast = value;
        self.telemetry.publish_contrast(value);
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn invert(&self) -> bool {
        self.invert
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Shared handle for observers on other threads
    pub fn telemetry(&self) -> Arc<Telemetry> {
        Arc::clone(&self.telemetry)
    }

    /// Current GDDRAM write cursor of the shadow buffer
    pub fn write_cursor(&self) -> usize {
        self.shadow.cursor()
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Send the power-on sequence, then re-apply the stored contrast
    pub fn init(&mut self) -> Result<(), DisplayError> {
        tracing::info!("Initializing display {}", self.name);
        self.write(&INIT_SEQUENCE)?;
        self.initialized = true;
        self.apply_contrast(self.contrast)
    }

    /// Set contrast as a fraction in `[0, 1]`
    pub fn set_contrast(&mut self, value: f64) -> Result<(), DisplayError> {
        self.ensure_initialized()?;
        self.apply_contrast(value)
    }

    fn apply_contrast(&mut self, value: f64) -> Result<(), DisplayError> {
        let level = contrast_level(value)?;
        self.write(&command::contrast_frame(level))?;
        self.contrast = value;
        self.telemetry.publish_contrast(value);
        tracing::debug!("{}: contrast {:.3} (0x{:02x})", self.name, value, level);
        Ok(())
    }

    /// Select inverted (`true`) or normal polarity
    pub fn set_invert(&mut self, value: bool) -> Result<(), DisplayError> {
        self.ensure_initialized()?;
        self.write(&command::invert_frame(value))?;
        self.invert = value;
        self.telemetry.publish_invert(value);
        tracing::debug!("{}: invert {}", self.name, value);
        Ok(())
    }

    /// Send a complete 1024-byte frame.
    ///
    /// The addressing prefix is followed by 16 data transfers of 64 bytes.
    /// On success exactly one snapshot is published; a transport failure
    /// aborts the remaining chunks and no snapshot is published.
    pub fn push_frame(&mut self, pixels: &[u8]) -> Result<(), DisplayError> {
        if pixels.len() != FRAME_BYTES {
            return Err(DisplayError::InvalidArgument(format!(
                "frame is {} bytes, expected {}",
                pixels.len(),
                FRAME_BYTES
            )));
        }
        self.ensure_initialized()?;

        let started = Instant::now();
        self.write(&FULL_FRAME_PREFIX)?;

        let mut chunk = [0u8; CHUNK_SIZE + 1];
        chunk[0] = command::control::DATA_STREAM;
        for payload in pixels.chunks_exact(CHUNK_SIZE) {
            chunk[1..].copy_from_slice(payload);
            self.write(&chunk)?;
        }

        self.telemetry.record_latency(started.elapsed());
        Ok(())
    }

    /// Send one framed transfer.
    ///
    /// The bytes are recorded and forwarded unmodified. A command stream
    /// resets the shadow cursor whether or not the transfer succeeds; a data
    /// stream is appended to the shadow only once the transport accepted it.
    pub fn write(&mut self, frame: &[u8]) -> Result<(), DisplayError> {
        let kind = FrameKind::of(frame)
            .ok_or_else(|| DisplayError::InvalidArgument("empty frame".to_string()))?;

        self.telemetry.record_write(frame);
        if kind == FrameKind::Command {
            self.shadow.reset();
        }
        self.bus.transmit(frame)?;

        if kind == FrameKind::Data {
            if let Some(snapshot) = self.shadow.accumulate(&frame[1..]) {
                tracing::trace!("{}: frame complete, {} lit", self.name, snapshot.lit());
                self.telemetry.publish_screen(snapshot);
            }
        }
        Ok(())
    }

    fn ensure_initialized(&self) -> Result<(), DisplayError> {
        if self.initialized {
            Ok(())
        } else {
            Err(DisplayError::NotInitialized(self.name.clone()))
        }
    }
}
