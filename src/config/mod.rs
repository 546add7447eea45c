//! Configuration module for win-tiler
//!
//! The configuration collaborator hands the tiler a single [`TilerConfig`]
//! at start. It is treated as immutable for the lifetime of a session; a
//! reload requires a full stop/start cycle.

pub mod arming;
pub mod tiler;

pub use arming::{ArmHotkey, ArmingConfig, HotkeyKey, HotkeyModifier, HotkeyParseError};
pub use tiler::{
    ConfigError, ControllerConfig, GestureButton, LayoutConfig, RecognizerConfig, SupervisorConfig,
    TilerConfig,
};
