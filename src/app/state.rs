//! Listener lifecycle state machine
//!
//! Power notifications are first-class transitions here rather than side
//! effects observed by the hook code. The machine itself is pure; the
//! supervisor performs the hook work each transition calls for.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of the input listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ListenerState {
    /// No thread, no hook
    #[default]
    Stopped = 0,
    /// Thread alive and hook installed
    Running = 1,
    /// Thread alive, hook detached, session kept
    Suspended = 2,
}

impl ListenerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ListenerState::Running,
            2 => ListenerState::Suspended,
            _ => ListenerState::Stopped,
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListenerState::Stopped => "stopped",
            ListenerState::Running => "running",
            ListenerState::Suspended => "suspended",
        };
        f.write_str(name)
    }
}

/// Events that drive the listener state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTransition {
    /// Hook installed at start
    Start,
    /// Power-suspend notification
    Suspend,
    /// Hook reinstalled after a resume notification
    Resume,
    /// Every reinstall attempt after a resume failed
    RearmFailed,
    Stop,
}

/// What the supervisor must do with the hook for a given transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookAction {
    None,
    Install,
    Remove,
    /// Remove and install again from scratch
    Reinstall,
}

/// Pure transition function for the listener lifecycle
pub struct ListenerMachine;

impl ListenerMachine {
    /// Returns the next state, or `None` when the transition does not apply
    pub fn next(current: ListenerState, transition: ListenerTransition) -> Option<ListenerState> {
        use ListenerState::*;
        use ListenerTransition as T;

        match (current, transition) {
            (Stopped, T::Start) => Some(Running),
            (Running, T::Suspend) => Some(Suspended),
            // A resume while running still re-arms: the hook may have been
            // dropped without a suspend notification
            (Running | Suspended, T::Resume) => Some(Running),
            (Running | Suspended, T::RearmFailed) => Some(Suspended),
            (Running | Suspended, T::Stop) => Some(Stopped),
            _ => None,
        }
    }

    /// Hook work needed to handle a power notification in `current` state
    pub fn hook_action(current: ListenerState, transition: ListenerTransition) -> HookAction {
        use ListenerState::*;
        use ListenerTransition as T;

        match (current, transition) {
            (Stopped, T::Start) => HookAction::Install,
            (Running, T::Suspend) => HookAction::Remove,
            (Running | Suspended, T::Resume) => HookAction::Reinstall,
            (Running | Suspended, T::Stop) => HookAction::Remove,
            _ => HookAction::None,
        }
    }
}

/// Listener state shared between the supervisor and its thread
#[derive(Debug, Default)]
pub struct SharedState(AtomicU8);

impl SharedState {
    pub fn load(&self) -> ListenerState {
        ListenerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, state: ListenerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}
