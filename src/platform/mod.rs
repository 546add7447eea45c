//! Platform capability interfaces and their Win32 implementations
//!
//! The rest of the crate only talks to the OS through two narrow traits:
//! [`WindowManager`] for window geometry and [`EventSource`] for the global
//! pointer hook plus power and display notifications. Everything Win32
//! lives behind `cfg(windows)`.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::domain::core::Rect;
use crate::domain::gesture::PointerSample;
use crate::domain::monitor::MonitorDescriptor;

#[cfg(test)]
pub mod fake;
#[cfg(windows)]
pub mod hook;
#[cfg(windows)]
pub mod monitors;
#[cfg(windows)]
pub mod window;
#[cfg(windows)]
pub mod windows;

/// Opaque OS window handle
///
/// Only valid for the duration of one controller call; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub isize);

/// Style facts the controller needs to decide whether a window is tileable
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowStyle {
    pub class_name: String,
    pub title: String,
    pub is_visible: bool,
    pub is_child: bool,
    pub is_resizable: bool,
    pub is_minimized: bool,
    pub is_maximized: bool,
    pub is_tool_window: bool,
}

/// Errors reported by the OS window manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Window {0:?} no longer exists")]
    InvalidWindow(WindowId),
    #[error("Failed to query window {window:?}: {reason}")]
    QueryFailed { window: WindowId, reason: String },
    #[error("Window manager refused to place window {window:?}: {reason}")]
    Rejected { window: WindowId, reason: String },
    #[error("Failed to enumerate monitors: {0}")]
    MonitorQueryFailed(String),
}

/// Capability interface over the OS window manager
pub trait WindowManager: Send {
    /// The window that currently has keyboard focus, if any
    fn get_foreground_window(&self) -> Option<WindowId>;

    fn get_window_rect(&self, window: WindowId) -> Result<Rect, PlatformError>;

    fn get_window_style(&self, window: WindowId) -> Result<WindowStyle, PlatformError>;

    /// Moves and resizes the window without changing focus or z-order
    ///
    /// A maximized window is restored first and stays restored even when
    /// the placement is then rejected. Returns `Rejected` when the OS
    /// refuses or clamps the requested geometry.
    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), PlatformError>;

    /// Puts the window back into the maximized state
    fn maximize_window(&self, window: WindowId) -> Result<(), PlatformError>;

    fn enumerate_monitors(&self) -> Result<Vec<MonitorDescriptor>, PlatformError>;
}

/// One event delivered to the listener thread, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Pointer(PointerSample),
    /// Periodic clock tick on the listener timeline
    Tick(Duration),
    /// Monitors were added, removed or rearranged
    TopologyChanged,
    /// The system is about to sleep
    Suspend,
    /// The system came back from sleep
    Resume,
    /// The arm hotkey was pressed, at this point of the listener timeline
    Armed(Duration),
    /// Posted by [`Wake::wake`]; carries no data
    Wake,
}

/// Errors from the global pointer hook and its event channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    #[error("Event channel could not be created: {0}")]
    ChannelFailed(String),
    #[error("Failed to install pointer hook: {0}")]
    InstallFailed(String),
    #[error("Failed to register arm hotkey: {0}")]
    HotkeyFailed(String),
    #[error("Event source closed unexpectedly")]
    SourceClosed,
}

/// Thread-safe handle that interrupts a blocked [`EventSource::next_event`]
pub trait Wake: Send + Sync {
    /// Queues a [`HookEvent::Wake`] behind any events already pending
    fn wake(&self);
}

/// Producer of listener events, driven from a single dedicated thread
///
/// Every method except [`EventSource::waker`] is called on the listener
/// thread. `open` runs first and `close` last for each listener generation.
pub trait EventSource: Send + 'static {
    /// Creates the thread-affine resources: notification window, clock
    /// tick and the arm hotkey when one is configured
    fn open(&mut self, tick_interval: Duration) -> Result<(), HookError>;

    /// Installs the global pointer hook. Installing twice is a no-op.
    fn install_hook(&mut self) -> Result<(), HookError>;

    /// Detaches the pointer hook. Removing an absent hook is a no-op.
    fn remove_hook(&mut self);

    fn is_hook_installed(&self) -> bool;

    /// Blocks until the next event; `None` once the channel is gone
    fn next_event(&mut self) -> Option<HookEvent>;

    /// Releases everything `open` created, removing the hook if still present
    fn close(&mut self);

    fn waker(&self) -> Arc<dyn Wake>;
}
