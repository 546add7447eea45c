//! Tiling orchestrator
//!
//! [`TilingSession`] is the process-wide pipeline state: recognizer,
//! resolver, monitor cache and window controller. It runs on the listener
//! thread as the supervisor's handler. [`Tiler`] is the public facade that
//! owns the supervisor and exposes start/stop.

use std::time::Duration;

use thiserror::Error;

use crate::app::placement::{ControllerError, WindowController};
use crate::app::state::ListenerState;
use crate::app::supervisor::{InputSupervisor, ListenerHandler, SupervisorError};
use crate::app::telemetry::{PreviewSink, TelemetrySink, TilingEvent, TracingTelemetry};
use crate::app::topology::MonitorTopology;
use crate::config::{SupervisorConfig, TilerConfig};
use crate::domain::core::Rect;
use crate::domain::gate::ArmingGate;
use crate::domain::gesture::{GestureProgress, GestureRecognizer, GestureSymbol, PointerSample};
use crate::domain::layout::{LayoutResolver, LayoutSlot, ResolveError};
use crate::platform::{EventSource, HookError, WindowManager};

/// Why a recognized gesture did not move a window
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TilingFailure {
    #[error("No monitor available")]
    NoMonitor,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

/// Result of one successful tiling pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilingOutcome {
    pub slot: String,
    pub monitor: usize,
    pub rect: Rect,
}

/// Pipeline state that travels with the listener thread
pub struct TilingSession<W: WindowManager> {
    recognizer: GestureRecognizer,
    gate: ArmingGate,
    resolver: LayoutResolver,
    slots: Vec<LayoutSlot>,
    topology: MonitorTopology,
    controller: WindowController<W>,
    telemetry: Box<dyn TelemetrySink>,
    preview: Option<Box<dyn PreviewSink>>,
    last_preview: Option<GestureProgress>,
    active: bool,
}

impl<W: WindowManager> TilingSession<W> {
    pub fn new(config: &TilerConfig, manager: W) -> Self {
        Self {
            recognizer: GestureRecognizer::new(config.recognizer.clone()),
            gate: ArmingGate::new(&config.arming),
            resolver: LayoutResolver::new(config.layout.bindings.clone(), config.layout.area),
            slots: config.layout.slots.clone(),
            topology: MonitorTopology::new(),
            controller: WindowController::new(manager, &config.controller),
            telemetry: Box::new(TracingTelemetry),
            preview: None,
            last_preview: None,
            active: false,
        }
    }

    pub fn with_telemetry(mut self, telemetry: impl TelemetrySink + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    pub fn with_preview(mut self, preview: impl PreviewSink + 'static) -> Self {
        self.preview = Some(Box::new(preview));
        self
    }

    /// True while the listener is running with the hook installed
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn topology(&self) -> &MonitorTopology {
        &self.topology
    }

    /// Resolves and applies one gesture
    pub fn tile(&mut self, symbol: GestureSymbol) -> Result<TilingOutcome, TilingFailure> {
        if self.topology.is_empty() {
            self.refresh_topology();
        }

        let foreground = self.controller.foreground_rect();
        let monitor = *self
            .topology
            .monitor_for_rect(foreground)
            .ok_or(TilingFailure::NoMonitor)?;

        let placement = self.resolver.try_resolve(symbol, &monitor, &self.slots)?;
        self.controller.apply(placement.rect)?;

        Ok(TilingOutcome {
            slot: placement.slot,
            monitor: monitor.id,
            rect: placement.rect,
        })
    }

    /// Tiles for a gesture that completed at `now`
    fn dispatch(&mut self, symbol: GestureSymbol, now: Duration) {
        if !symbol.is_actionable() {
            tracing::trace!("stroke matched no gesture");
            return;
        }
        if !self.gate.admit(now) {
            tracing::debug!(%symbol, "gesture ignored; capture not armed");
            return;
        }

        self.emit(TilingEvent::GestureRecognized(symbol));
        match self.tile(symbol) {
            Ok(outcome) => self.emit(TilingEvent::TilingApplied {
                symbol,
                slot: outcome.slot,
                monitor: outcome.monitor,
                rect: outcome.rect,
            }),
            Err(failure) => {
                tracing::debug!(%symbol, %failure, "gesture not applied");
                self.emit(TilingEvent::TilingFailed {
                    symbol,
                    reason: failure.to_string(),
                });
            }
        }
    }

    fn refresh_topology(&mut self) {
        self.topology.refresh(self.controller.manager());
        self.recognizer.set_screens(self.topology.screen_rects());
    }

    fn publish_preview(&mut self) {
        let Some(preview) = &self.preview else {
            return;
        };

        let progress = self.recognizer.progress();
        if progress == self.last_preview {
            return;
        }
        self.last_preview = progress;
        if let Err(error) = preview.update(progress) {
            tracing::trace!(%error, "preview update dropped");
        }
    }

    fn emit(&self, event: TilingEvent) {
        if let Err(error) = self.telemetry.record(event) {
            tracing::trace!(%error, "telemetry event dropped");
        }
    }
}

impl<W: WindowManager + 'static> ListenerHandler for TilingSession<W> {
    fn on_pointer(&mut self, sample: PointerSample) {
        let symbol = self.recognizer.observe(sample);
        self.publish_preview();
        if let Some(symbol) = symbol {
            self.dispatch(symbol, sample.timestamp);
        }
    }

    fn on_tick(&mut self, now: Duration) {
        let symbol = self.recognizer.tick(now);
        self.publish_preview();
        if let Some(symbol) = symbol {
            self.dispatch(symbol, now);
        }
    }

    fn on_armed(&mut self, now: Duration) {
        if self.gate.is_required() {
            tracing::debug!(?now, "gesture capture armed");
            self.gate.arm(now);
        }
    }

    fn on_topology_changed(&mut self) {
        tracing::info!("display configuration changed");
        self.refresh_topology();
    }

    fn on_state_changed(&mut self, from: ListenerState, to: ListenerState) {
        if self.recognizer.is_stroke_active() {
            tracing::debug!(buffered = self.recognizer.buffered(), "abandoning stroke in progress");
        }
        // Timestamps restart with every listener generation
        self.recognizer.reset();
        self.gate.reset();
        self.publish_preview();

        self.active = to == ListenerState::Running;
        if self.active {
            self.refresh_topology();
        }
        self.emit(TilingEvent::ListenerStateChanged { from, to });
    }

    fn on_listener_failed(&mut self, attempts: u32, error: &HookError) {
        self.emit(TilingEvent::ListenerFailed {
            attempts,
            reason: error.to_string(),
        });
    }
}

/// Gesture tiling engine: a supervised listener feeding a tiling session
pub struct Tiler<S: EventSource, W: WindowManager + 'static> {
    supervisor: InputSupervisor<S, TilingSession<W>>,
}

impl<S: EventSource, W: WindowManager + 'static> Tiler<S, W> {
    /// Builds a tiler that reports to the tracing log
    pub fn new(config: &TilerConfig, source: S, manager: W) -> Self {
        Self::with_session(config.supervisor.clone(), source, TilingSession::new(config, manager))
    }

    /// Builds a tiler around a pre-configured session
    pub fn with_session(config: SupervisorConfig, source: S, session: TilingSession<W>) -> Self {
        Self {
            supervisor: InputSupervisor::new(config, source, session),
        }
    }

    /// Installs the pointer hook and starts listening
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        self.supervisor.start()
    }

    /// Stops listening; idempotent
    pub fn stop(&mut self) -> Result<(), SupervisorError> {
        self.supervisor.stop()
    }

    pub fn restart(&mut self) -> Result<(), SupervisorError> {
        self.supervisor.restart()
    }

    pub fn state(&self) -> ListenerState {
        self.supervisor.state()
    }

    /// False once the listener thread has exited, whether stopped or not
    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    pub fn has_persistent_failure(&self) -> bool {
        self.supervisor.has_persistent_failure()
    }

    /// The session, available while stopped
    pub fn session(&self) -> Option<&TilingSession<W>> {
        self.supervisor.handler()
    }
}
