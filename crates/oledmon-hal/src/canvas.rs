//! Drawable 128x64 frame
//!
//! Packs pixels the way the controller expects them in horizontal addressing
//! mode, so `as_bytes()` can be handed straight to `push_frame`.

use crate::command::{FRAME_BYTES, HEIGHT, WIDTH};
use embedded_graphics::{
    Pixel,
    pixelcolor::BinaryColor,
    prelude::{DrawTarget, OriginDimensions, Size},
};

#[derive(Clone)]
pub struct Canvas {
    buf: [u8; FRAME_BYTES],
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            buf: [0; FRAME_BYTES],
        }
    }

    pub fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) {
        if x < 0 || y < 0 || x >= WIDTH as i32 || y >= HEIGHT as i32 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        let idx = (y / 8) * WIDTH + x;
        let bit = 1 << (y % 8);
        match color {
            BinaryColor::On => self.buf[idx] |= bit,
            BinaryColor::Off => self.buf[idx] &= !bit,
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.buf[(y / 8) * WIDTH + x] & (1 << (y % 8)) != 0
    }

    pub fn fill(&mut self, color: BinaryColor) {
        self.buf.fill(if color.is_on() { 0xFF } else { 0x00 });
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_BYTES] {
        &self.buf
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            self.set_pixel(coord.x, coord.y, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.fill(color);
        Ok(())
    }
}
