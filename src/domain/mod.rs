//! Domain logic and core data structures
//!
//! This module contains pure logic that is independent of Win32 APIs and
//! platform-specific implementations: geometry, gesture recognition,
//! layout resolution and the hotkey arming gate.

pub mod core;
pub mod gate;
pub mod gesture;
pub mod layout;
pub mod monitor;
