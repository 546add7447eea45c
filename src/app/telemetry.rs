//! Telemetry and preview collaborators
//!
//! Both are fire-and-forget from the listener thread: a sink that cannot
//! take an event reports it, and the caller drops the event.

use std::sync::mpsc::{self, Receiver, Sender, SyncSender, TrySendError};

use thiserror::Error;

use crate::app::state::ListenerState;
use crate::domain::core::Rect;
use crate::domain::gesture::{GestureProgress, GestureSymbol};

/// Notable things that happened in the tiling pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilingEvent {
    GestureRecognized(GestureSymbol),
    TilingApplied {
        symbol: GestureSymbol,
        slot: String,
        monitor: usize,
        rect: Rect,
    },
    TilingFailed {
        symbol: GestureSymbol,
        reason: String,
    },
    ListenerStateChanged {
        from: ListenerState,
        to: ListenerState,
    },
    /// The hook could not be re-armed after a resume (`attempts` > 0), or
    /// the event source went away on its own (`attempts` == 0)
    ListenerFailed {
        attempts: u32,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TelemetryError {
    #[error("Telemetry sink is unavailable")]
    Unavailable,
}

/// Receiver of [`TilingEvent`]s
pub trait TelemetrySink: Send {
    fn record(&self, event: TilingEvent) -> Result<(), TelemetryError>;
}

/// Default sink that turns events into log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: TilingEvent) -> Result<(), TelemetryError> {
        match event {
            TilingEvent::GestureRecognized(symbol) => tracing::debug!(%symbol, "gesture recognized"),
            TilingEvent::TilingApplied {
                symbol,
                slot,
                monitor,
                rect,
            } => tracing::info!(%symbol, %slot, monitor, ?rect, "tiling applied"),
            TilingEvent::TilingFailed { symbol, reason } => tracing::info!(%symbol, %reason, "tiling skipped"),
            TilingEvent::ListenerStateChanged { from, to } => tracing::debug!(%from, %to, "listener state changed"),
            TilingEvent::ListenerFailed { attempts, reason } => {
                tracing::error!(attempts, %reason, "input listener failed")
            }
        }
        Ok(())
    }
}

/// Sink that forwards events over a channel
#[derive(Debug, Clone)]
pub struct ChannelTelemetry {
    sender: Sender<TilingEvent>,
}

impl ChannelTelemetry {
    pub fn new() -> (Self, Receiver<TilingEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self { sender }, receiver)
    }
}

impl TelemetrySink for ChannelTelemetry {
    fn record(&self, event: TilingEvent) -> Result<(), TelemetryError> {
        self.sender.send(event).map_err(|_| TelemetryError::Unavailable)
    }
}

/// Receiver of the gesture in progress, for an on-screen preview
///
/// `None` means the stroke ended or was abandoned.
pub trait PreviewSink: Send {
    fn update(&self, progress: Option<GestureProgress>) -> Result<(), TelemetryError>;
}

/// Preview sink over a bounded channel; never blocks the listener
#[derive(Debug, Clone)]
pub struct ChannelPreview {
    sender: SyncSender<Option<GestureProgress>>,
}

impl ChannelPreview {
    pub fn new(capacity: usize) -> (Self, Receiver<Option<GestureProgress>>) {
        let (sender, receiver) = mpsc::sync_channel(capacity);
        (Self { sender }, receiver)
    }
}

impl PreviewSink for ChannelPreview {
    fn update(&self, progress: Option<GestureProgress>) -> Result<(), TelemetryError> {
        match self.sender.try_send(progress) {
            Ok(()) => Ok(()),
            // A slow consumer just misses intermediate frames
            Err(TrySendError::Full(_)) => Ok(()),
            Err(TrySendError::Disconnected(_)) => Err(TelemetryError::Unavailable),
        }
    }
}
