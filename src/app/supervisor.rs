//! Input listener supervisor
//!
//! Owns the dedicated listener thread, the global pointer hook it installs
//! and the session that consumes its events. The session and the event
//! source move into the thread on start and come back on join, so a
//! stop/start cycle re-initializes the same session instead of building a
//! new one.
//!
//! Threading model:
//! - Only the listener thread touches the source and the session while running
//! - Events are handled strictly in arrival order
//! - Stop raises a flag, then queues a wake event behind pending events and
//!   joins; every event queued before `stop` is handled, including a resume
//!   whose re-arm retries run to completion
//! - A listener whose event source goes away on its own is reported as a
//!   persistent failure

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;

use crate::app::state::{HookAction, ListenerMachine, ListenerState, ListenerTransition, SharedState};
use crate::config::SupervisorConfig;
use crate::domain::gesture::PointerSample;
use crate::platform::{EventSource, HookError, HookEvent, Wake};

/// Receiver of listener events, run on the listener thread
pub trait ListenerHandler: Send + 'static {
    fn on_pointer(&mut self, sample: PointerSample);

    fn on_tick(&mut self, now: Duration);

    fn on_topology_changed(&mut self);

    /// The arm hotkey was pressed at `now`
    fn on_armed(&mut self, now: Duration);

    /// Called after every lifecycle transition, including start and stop
    fn on_state_changed(&mut self, from: ListenerState, to: ListenerState);

    /// The listener can no longer see pointer input
    ///
    /// `attempts` counts the failed reinstalls after a resume; it is zero
    /// when the event source itself went away.
    fn on_listener_failed(&mut self, attempts: u32, error: &HookError);
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Input listener is already running")]
    AlreadyRunning,
    #[error("Input listener session was lost and cannot be started")]
    Unavailable,
    #[error(transparent)]
    HookInstall(#[from] HookError),
    #[error("Failed to spawn listener thread: {0}")]
    SpawnFailed(String),
    #[error("Input listener thread panicked")]
    ThreadPanicked,
}

/// Everything the listener thread shares with its supervisor
#[derive(Clone)]
struct ListenerContext {
    config: SupervisorConfig,
    state: Arc<SharedState>,
    persistent_failure: Arc<AtomicBool>,
    /// Only honoured once the listener dequeues the stop wake
    stop_requested: Arc<AtomicBool>,
}

struct ActiveListener<S, H> {
    thread: JoinHandle<(S, H)>,
    waker: Arc<dyn Wake>,
}

/// Lifecycle owner of the global pointer hook
pub struct InputSupervisor<S: EventSource, H: ListenerHandler> {
    context: ListenerContext,
    /// Source and session while no listener thread exists
    parked: Option<(S, H)>,
    active: Option<ActiveListener<S, H>>,
}

impl<S: EventSource, H: ListenerHandler> InputSupervisor<S, H> {
    pub fn new(config: SupervisorConfig, source: S, handler: H) -> Self {
        Self {
            context: ListenerContext {
                config,
                state: Arc::new(SharedState::default()),
                persistent_failure: Arc::new(AtomicBool::new(false)),
                stop_requested: Arc::new(AtomicBool::new(false)),
            },
            parked: Some((source, handler)),
            active: None,
        }
    }

    /// Spawns the listener thread and installs the hook
    ///
    /// Returns once the hook is installed. An install failure here is
    /// fatal: the thread exits, the session is parked again and the error
    /// is returned.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if let Some(active) = self.active.take() {
            if !active.thread.is_finished() {
                self.active = Some(active);
                return Err(SupervisorError::AlreadyRunning);
            }
            // The listener lost its event source; take the session back
            self.reclaim(active.thread)?;
        }
        let (source, handler) = self.parked.take().ok_or(SupervisorError::Unavailable)?;

        let waker = source.waker();
        self.context.stop_requested.store(false, Ordering::SeqCst);
        self.context.persistent_failure.store(false, Ordering::SeqCst);

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let context = self.context.clone();
        let thread = thread::Builder::new()
            .name("win-tiler-listener".to_string())
            .spawn(move || run_listener(source, handler, context, ready_tx))
            .map_err(|error| SupervisorError::SpawnFailed(error.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.active = Some(ActiveListener { thread, waker });
                Ok(())
            }
            Ok(Err(error)) => {
                tracing::error!(%error, "pointer hook installation failed at start");
                self.reclaim(thread)?;
                Err(SupervisorError::HookInstall(error))
            }
            Err(_) => {
                self.reclaim(thread)?;
                Err(SupervisorError::ThreadPanicked)
            }
        }
    }

    /// Stops the listener and joins its thread
    ///
    /// Events already queued are handled first. Calling `stop` on a
    /// stopped supervisor does nothing.
    pub fn stop(&mut self) -> Result<(), SupervisorError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };

        tracing::debug!("stopping input listener");
        self.context.stop_requested.store(true, Ordering::SeqCst);
        active.waker.wake();
        self.reclaim(active.thread)
    }

    /// Stops, then starts from scratch; clears a persistent failure on success
    pub fn restart(&mut self) -> Result<(), SupervisorError> {
        self.stop()?;
        self.start()
    }

    pub fn state(&self) -> ListenerState {
        self.context.state.load()
    }

    /// False once the listener thread has exited, even before `stop`
    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.thread.is_finished())
    }

    /// True once every reinstall attempt after a resume has failed, or the
    /// event source went away without a stop request
    pub fn has_persistent_failure(&self) -> bool {
        self.context.persistent_failure.load(Ordering::SeqCst)
    }

    /// The session, available only while no listener thread is running
    pub fn handler(&self) -> Option<&H> {
        self.parked.as_ref().map(|(_, handler)| handler)
    }

    fn reclaim(&mut self, thread: JoinHandle<(S, H)>) -> Result<(), SupervisorError> {
        match thread.join() {
            Ok(parts) => {
                self.parked = Some(parts);
                Ok(())
            }
            Err(_) => {
                self.context.state.store(ListenerState::Stopped);
                tracing::error!("input listener thread panicked; session lost");
                Err(SupervisorError::ThreadPanicked)
            }
        }
    }
}

impl<S: EventSource, H: ListenerHandler> Drop for InputSupervisor<S, H> {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Body of the listener thread; returns the source and session on exit
fn run_listener<S: EventSource, H: ListenerHandler>(
    mut source: S,
    mut handler: H,
    context: ListenerContext,
    ready: SyncSender<Result<(), HookError>>,
) -> (S, H) {
    let armed = source
        .open(context.config.tick_interval)
        .and_then(|()| source.install_hook());
    if let Err(error) = armed {
        source.close();
        let _ = ready.send(Err(error));
        return (source, handler);
    }

    apply(&context, &mut handler, ListenerTransition::Start);
    let _ = ready.send(Ok(()));
    tracing::info!("input listener running");

    let mut stop_honoured = false;
    while let Some(event) = source.next_event() {
        let state = context.state.load();
        match event {
            HookEvent::Wake => {
                if context.stop_requested.load(Ordering::SeqCst) {
                    stop_honoured = true;
                    break;
                }
            }
            HookEvent::Pointer(sample) if state == ListenerState::Running => handler.on_pointer(sample),
            HookEvent::Tick(now) if state == ListenerState::Running => handler.on_tick(now),
            HookEvent::Armed(now) if state == ListenerState::Running => handler.on_armed(now),
            HookEvent::Pointer(_) | HookEvent::Tick(_) | HookEvent::Armed(_) => {}
            HookEvent::TopologyChanged => handler.on_topology_changed(),
            HookEvent::Suspend => {
                if ListenerMachine::hook_action(state, ListenerTransition::Suspend) == HookAction::Remove {
                    tracing::info!("system suspending; detaching pointer hook");
                    source.remove_hook();
                    apply(&context, &mut handler, ListenerTransition::Suspend);
                }
            }
            HookEvent::Resume => {
                if ListenerMachine::hook_action(state, ListenerTransition::Resume) == HookAction::Reinstall {
                    tracing::info!(%state, "system resumed; re-arming pointer hook");
                    rearm(&mut source, &mut handler, &context);
                }
            }
        }
    }

    source.close();
    apply(&context, &mut handler, ListenerTransition::Stop);
    if stop_honoured {
        tracing::info!("input listener stopped");
    } else {
        let error = HookError::SourceClosed;
        tracing::error!(%error, "input listener exited without a stop request");
        context.persistent_failure.store(true, Ordering::SeqCst);
        handler.on_listener_failed(0, &error);
    }
    (source, handler)
}

/// Reinstalls the hook from scratch with exponential backoff
///
/// Runs to completion even when a stop is pending: the stop wake sits
/// behind the resume that triggered this, so the full retry budget is
/// spent before the listener exits.
fn rearm<S: EventSource, H: ListenerHandler>(source: &mut S, handler: &mut H, context: &ListenerContext) {
    source.remove_hook();

    let attempts = context.config.rearm_attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match source.install_hook() {
            Ok(()) => {
                context.persistent_failure.store(false, Ordering::SeqCst);
                apply(context, handler, ListenerTransition::Resume);
                return;
            }
            Err(error) => {
                tracing::warn!(attempt, attempts, %error, "pointer hook re-arm failed");
                last_error = Some(error);
            }
        }

        if attempt < attempts {
            thread::sleep(context.config.backoff_after(attempt));
        }
    }

    let error = last_error.unwrap_or_else(|| HookError::InstallFailed("no attempt made".to_string()));
    tracing::error!(attempts, %error, "pointer hook could not be re-armed; listener suspended");
    context.persistent_failure.store(true, Ordering::SeqCst);
    apply(context, handler, ListenerTransition::RearmFailed);
    handler.on_listener_failed(attempts, &error);
}

/// Runs a transition through the state machine and notifies the handler
fn apply<H: ListenerHandler>(context: &ListenerContext, handler: &mut H, transition: ListenerTransition) {
    let from = context.state.load();
    let Some(to) = ListenerMachine::next(from, transition) else {
        return;
    };

    context.state.store(to);
    if from != to {
        tracing::debug!(%from, %to, ?transition, "listener state changed");
    }
    handler.on_state_changed(from, to);
}
