//! Screen reconstruction
//!
//! Rebuilds the panel image from the data-stream bytes the driver has sent.
//! GDDRAM in horizontal addressing mode stores byte `i` at column `i % 128`
//! of page `i / 128`, with bit `b` being row `page * 8 + b`.

use crate::command::{FRAME_BYTES, HEIGHT, WIDTH};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

/// Immutable, timestamped copy of one completed frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    #[serde(skip)]
    pixels: Box<[u8; FRAME_BYTES]>,
}

impl Snapshot {
    /// Capture `pixels` stamped with the current wall-clock time
    pub fn capture(pixels: &[u8; FRAME_BYTES]) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            timestamp_ms,
            pixels: Box::new(*pixels),
        }
    }

    /// Raw GDDRAM bytes
    pub fn bytes(&self) -> &[u8; FRAME_BYTES] {
        &self.pixels
    }

    /// Whether the pixel at column `x`, row `y` is lit; out of range is off
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        if x >= WIDTH || y >= HEIGHT {
            return false;
        }
        self.pixels[(y / 8) * WIDTH + x] & (1 << (y % 8)) != 0
    }

    /// Row-major 64x128 grid
    pub fn grid(&self) -> Vec<Vec<bool>> {
        (0..HEIGHT)
            .map(|y| (0..WIDTH).map(|x| self.pixel(x, y)).collect())
            .collect()
    }

    /// Number of lit pixels
    pub fn lit(&self) -> usize {
        self.pixels.iter().map(|b| b.count_ones() as usize).sum()
    }

    /// One line per row, `#` for lit and `.` for dark
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((WIDTH + 1) * HEIGHT);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                out.push(if self.pixel(x, y) { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }
}

/// Local copy of transmitted pixel data plus the GDDRAM write cursor
#[derive(Debug)]
pub struct ShadowBuffer {
    pixels: [u8; FRAME_BYTES],
    cursor: usize,
    completed: bool,
}

impl ShadowBuffer {
    pub fn new() -> Self {
        Self {
            pixels: [0; FRAME_BYTES],
            cursor: 0,
            completed: false,
        }
    }

    /// A command-stream frame was sent; the next data starts a fresh frame
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.completed = false;
    }

    /// Append a data-stream payload at the cursor.
    ///
    /// Returns a snapshot the first time the cursor reaches the end of the
    /// buffer after a reset. Bytes past the end are dropped.
    pub fn accumulate(&mut self, payload: &[u8]) -> Option<Snapshot> {
        let room = FRAME_BYTES - self.cursor;
        let take = payload.len().min(room);
        if take < payload.len() {
            tracing::warn!(
                "Data frame overruns shadow buffer by {} bytes",
                payload.len() - take
            );
        }

        self.pixels[self.cursor..self.cursor + take].copy_from_slice(&payload[..take]);
        self.cursor += take;

        if self.cursor == FRAME_BYTES && !self.completed {
            self.completed = true;
            return Some(Snapshot::capture(&self.pixels));
        }
        None
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Default for ShadowBuffer {
    fn default() -> Self {
        Self::new()
    }
}
