//! oledmon daemon internals
//!
//! Render loops that keep each panel fed with frames, the registry the
//! monitor uses to find displays by id, and the HTTP monitor itself.

pub mod http;
pub mod monitor;
pub mod render;
pub mod scene;
pub mod startup;

pub use monitor::{DeviceStatus, DeviceSummary, MonitorError, Registry, SharedDisplay};
pub use render::{RenderLoop, RenderStats};
pub use scene::Scene;
pub use startup::open_display;
