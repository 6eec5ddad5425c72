//! Display bring-up

use anyhow::{Context, Result};
use oledmon_config::RenderConfig;
use oledmon_hal::{DeviceSpec, Display, Ssd1306};

/// Parse, open and initialize one display
pub fn open_display(spec: &str, render: &RenderConfig) -> Result<Display> {
    let spec = DeviceSpec::parse(spec).with_context(|| format!("Invalid device spec {:?}", spec))?;
    let transport = spec
        .open()
        .with_context(|| format!("Failed to open {}", spec))?;

    let mut panel = Ssd1306::with_history(transport, render.history)
        .with_contrast(render.contrast)
        .context("Invalid startup contrast")?;
    panel
        .init()
        .with_context(|| format!("Failed to initialize {}", spec.name()))?;
    if render.invert {
        panel.set_invert(true)?;
    }

    tracing::info!("Opened {} ({})", panel.name(), panel.id());
    Ok(panel)
}
