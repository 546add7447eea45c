//! Gesture-driven window tiling
//!
//! Listens to global pointer movement, recognizes swipes and hot-corner
//! dwells, and moves the foreground window into the layout slot bound to
//! the gesture. The listener survives sleep/wake by re-arming its hook on
//! every resume.

pub mod app;
pub mod config;
pub mod domain;
pub mod logging;
pub mod platform;

pub use app::{ListenerState, Tiler, TilingSession};
pub use config::TilerConfig;
