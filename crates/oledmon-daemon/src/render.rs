//! Per-display render loop
//!
//! Each display gets one OS thread, since I2C writes block. A loop draws the
//! scene into a private canvas, then holds the driver lock only for the
//! duration of `push_frame`. A failed frame is logged and the loop carries on
//! with the next one.

use crate::monitor::SharedDisplay;
use crate::scene::Scene;
use oledmon_hal::{Bus, Canvas};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// Counters reported when a loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub attempts: u64,
    pub frames: u64,
    pub failures: u64,
}

pub struct RenderLoop<B: Bus> {
    display: SharedDisplay<B>,
    interval: Duration,
    frames: u64,
    stop: Arc<AtomicBool>,
}

impl<B: Bus + Send + 'static> RenderLoop<B> {
    pub fn new(display: SharedDisplay<B>, interval: Duration) -> Self {
        Self {
            display,
            interval,
            frames: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop after `frames` attempts; 0 runs until stopped
    pub fn with_frames(mut self, frames: u64) -> Self {
        self.frames = frames;
        self
    }

    /// Share a stop flag across several loops
    pub fn with_stop(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Run on the current thread until stopped or the frame limit is hit
    pub fn run(self) -> RenderStats {
        let (name, id) = match self.display.lock() {
            Ok(display) => (display.name().to_string(), display.id().to_string()),
            Err(_) => {
                tracing::error!("Display lock poisoned before render loop start");
                return RenderStats::default();
            }
        };
        let scene = Scene::new(name.clone());
        let mut canvas = Canvas::new();
        let mut stats = RenderStats::default();

        tracing::info!("Render loop for {} ({}) started", name, id);

        while !self.stop.load(Ordering::Relaxed) {
            if self.frames != 0 && stats.attempts >= self.frames {
                break;
            }

            scene
                .draw(&mut canvas, stats.attempts, SystemTime::now())
                .unwrap_or_else(|never| match never {});

            let result = match self.display.lock() {
                Ok(mut display) => display.push_frame(canvas.as_bytes()),
                Err(_) => {
                    tracing::error!("{}: display lock poisoned, stopping", name);
                    break;
                }
            };

            stats.attempts += 1;
            match result {
                Ok(()) => stats.frames += 1,
                Err(e) => {
                    stats.failures += 1;
                    tracing::error!("{}: frame {} failed: {}", name, stats.attempts, e);
                }
            }

            if !self.interval.is_zero() {
                std::thread::sleep(self.interval);
            }
        }

        tracing::info!(
            "Render loop for {} stopped after {} frames ({} failed)",
            name,
            stats.attempts,
            stats.failures
        );
        stats
    }

    /// Run on a dedicated, named thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<RenderStats>> {
        let label = self
            .display
            .lock()
            .map(|d| d.id().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        std::thread::Builder::new()
            .name(format!("render-{}", label))
            .spawn(move || self.run())
    }
}
