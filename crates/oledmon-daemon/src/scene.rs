//! Sample content for the render loops
//!
//! Draws the display name, a UTC clock, a frame counter and a bar sweeping
//! across the bottom rows so motion is visible on the panel and the monitor.

use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use std::time::{SystemTime, UNIX_EPOCH};

const BAR_WIDTH: u32 = 16;
const BAR_HEIGHT: u32 = 8;

pub struct Scene {
    label: String,
}

impl Scene {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    /// Render frame number `frame` as of `now`
    pub fn draw<D>(&self, target: &mut D, frame: u64, now: SystemTime) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor> + OriginDimensions,
    {
        target.clear(BinaryColor::Off)?;
        let size = target.size();
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);

        Text::with_baseline(&self.label, Point::zero(), style, Baseline::Top).draw(target)?;
        Text::with_baseline(&clock(now), Point::new(0, 16), style, Baseline::Top).draw(target)?;
        Text::with_baseline(
            &format!("#{}", frame),
            Point::new(0, 32),
            style,
            Baseline::Top,
        )
        .draw(target)?;

        let travel = size.width.saturating_sub(BAR_WIDTH).max(1) as u64;
        let x = (frame % travel) as i32;
        let y = size.height.saturating_sub(BAR_HEIGHT) as i32;
        Rectangle::new(Point::new(x, y), Size::new(BAR_WIDTH, BAR_HEIGHT))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
            .draw(target)?;

        Ok(())
    }
}

/// `HH:MM:SS` in UTC
fn clock(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
        % 86_400;
    format!("{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}
