//! In-memory stand-ins for the OS collaborators
//!
//! `FakeWindowManager` models a desktop of windows and monitors and records
//! every placement request. `ScriptedSource` replays events pushed through a
//! channel by the test, so listener behaviour can be driven step by step.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{EventSource, HookError, HookEvent, PlatformError, Wake, WindowId, WindowManager, WindowStyle};
use crate::domain::core::Rect;
use crate::domain::gesture::PointerSample;
use crate::domain::monitor::MonitorDescriptor;

#[derive(Debug, Clone)]
struct FakeWindow {
    rect: Rect,
    style: WindowStyle,
    /// Geometry to return to when maximized again
    maximized_rect: Option<Rect>,
}

#[derive(Debug, Default)]
struct FakeDesktop {
    windows: HashMap<WindowId, FakeWindow>,
    foreground: Option<WindowId>,
    monitors: Vec<MonitorDescriptor>,
    monitor_failure: bool,
    /// Geometry left behind by the next rejected placement, if any
    pending_rejection: Option<Option<Rect>>,
    calls: Vec<(WindowId, Rect)>,
}

/// Shared handle to a simulated desktop
#[derive(Debug, Clone, Default)]
pub struct FakeWindowManager {
    desktop: Arc<Mutex<FakeDesktop>>,
}

impl FakeWindowManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single 1920x1080 primary monitor with a 40px taskbar
    pub fn single_monitor() -> Self {
        let manager = Self::new();
        manager.set_monitors(vec![MonitorDescriptor::new(
            0,
            Rect::new(0, 0, 1920, 1080),
            Rect::new(0, 0, 1920, 1040),
            true,
        )]);
        manager
    }

    /// A regular application window style
    pub fn app_style(class_name: &str, title: &str) -> WindowStyle {
        WindowStyle {
            class_name: class_name.to_string(),
            title: title.to_string(),
            is_visible: true,
            is_resizable: true,
            ..WindowStyle::default()
        }
    }

    fn desktop(&self) -> MutexGuard<'_, FakeDesktop> {
        self.desktop.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_monitors(&self, monitors: Vec<MonitorDescriptor>) {
        self.desktop().monitors = monitors;
    }

    pub fn fail_monitor_queries(&self, fail: bool) {
        self.desktop().monitor_failure = fail;
    }

    pub fn add_window(&self, id: WindowId, rect: Rect, style: WindowStyle) {
        let maximized_rect = style.is_maximized.then_some(rect);
        self.desktop().windows.insert(
            id,
            FakeWindow {
                rect,
                style,
                maximized_rect,
            },
        );
    }

    pub fn focus(&self, id: Option<WindowId>) {
        self.desktop().foreground = id;
    }

    pub fn close_window(&self, id: WindowId) {
        self.desktop().windows.remove(&id);
    }

    /// Makes the next placement fail, optionally leaving `partial` applied
    pub fn reject_next_placement(&self, partial: Option<Rect>) {
        self.desktop().pending_rejection = Some(partial);
    }

    pub fn rect_of(&self, id: WindowId) -> Option<Rect> {
        self.desktop().windows.get(&id).map(|window| window.rect)
    }

    pub fn is_maximized(&self, id: WindowId) -> Option<bool> {
        self.desktop().windows.get(&id).map(|window| window.style.is_maximized)
    }

    /// Every placement request, accepted or not, in call order
    pub fn placement_calls(&self) -> Vec<(WindowId, Rect)> {
        self.desktop().calls.clone()
    }
}

impl WindowManager for FakeWindowManager {
    fn get_foreground_window(&self) -> Option<WindowId> {
        self.desktop().foreground
    }

    fn get_window_rect(&self, window: WindowId) -> Result<Rect, PlatformError> {
        self.rect_of(window).ok_or(PlatformError::InvalidWindow(window))
    }

    fn get_window_style(&self, window: WindowId) -> Result<WindowStyle, PlatformError> {
        self.desktop()
            .windows
            .get(&window)
            .map(|entry| entry.style.clone())
            .ok_or(PlatformError::InvalidWindow(window))
    }

    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), PlatformError> {
        let mut desktop = self.desktop();
        desktop.calls.push((window, rect));

        let rejection = desktop.pending_rejection.take();
        let Some(entry) = desktop.windows.get_mut(&window) else {
            return Err(PlatformError::InvalidWindow(window));
        };
        // Restored before the move, whatever the outcome
        entry.style.is_maximized = false;

        match rejection {
            Some(partial) => {
                if let Some(partial) = partial {
                    entry.rect = partial;
                }
                Err(PlatformError::Rejected {
                    window,
                    reason: "simulated rejection".to_string(),
                })
            }
            None => {
                entry.rect = rect;
                Ok(())
            }
        }
    }

    fn maximize_window(&self, window: WindowId) -> Result<(), PlatformError> {
        let mut desktop = self.desktop();
        let entry = desktop
            .windows
            .get_mut(&window)
            .ok_or(PlatformError::InvalidWindow(window))?;
        if let Some(rect) = entry.maximized_rect {
            entry.rect = rect;
        }
        entry.style.is_maximized = true;
        Ok(())
    }

    fn enumerate_monitors(&self) -> Result<Vec<MonitorDescriptor>, PlatformError> {
        let desktop = self.desktop();
        if desktop.monitor_failure {
            return Err(PlatformError::MonitorQueryFailed("simulated failure".to_string()));
        }
        Ok(desktop.monitors.clone())
    }
}

#[derive(Debug, Default)]
struct SourceState {
    open: AtomicBool,
    installed: AtomicBool,
    failing_installs: AtomicU32,
    installs: AtomicU32,
    removals: AtomicU32,
    /// Makes `next_event` report the channel gone until the next `open`
    disconnected: AtomicBool,
}

/// Event source fed by the test through a [`ScriptHandle`]
pub struct ScriptedSource {
    receiver: Receiver<HookEvent>,
    sender: Sender<HookEvent>,
    state: Arc<SourceState>,
}

/// Test-side controls of a [`ScriptedSource`]
#[derive(Clone)]
pub struct ScriptHandle {
    sender: Sender<HookEvent>,
    state: Arc<SourceState>,
}

struct ChannelWaker {
    sender: Sender<HookEvent>,
}

impl Wake for ChannelWaker {
    fn wake(&self) {
        let _ = self.sender.send(HookEvent::Wake);
    }
}

impl ScriptedSource {
    pub fn new() -> (Self, ScriptHandle) {
        let (sender, receiver) = mpsc::channel();
        let state = Arc::new(SourceState::default());
        let handle = ScriptHandle {
            sender: sender.clone(),
            state: Arc::clone(&state),
        };
        (
            Self {
                receiver,
                sender,
                state,
            },
            handle,
        )
    }
}

impl ScriptHandle {
    pub fn send(&self, event: HookEvent) {
        let _ = self.sender.send(event);
    }

    pub fn pointer(&self, millis: u64, x: i32, y: i32, button_down: bool) {
        self.send(HookEvent::Pointer(PointerSample::new(
            Duration::from_millis(millis),
            x,
            y,
            button_down,
        )));
    }

    pub fn tick(&self, millis: u64) {
        self.send(HookEvent::Tick(Duration::from_millis(millis)));
    }

    /// Presses the arm hotkey
    pub fn arm(&self, millis: u64) {
        self.send(HookEvent::Armed(Duration::from_millis(millis)));
    }

    /// Simulates the OS tearing down the event channel; events already
    /// queued are lost
    pub fn disconnect(&self) {
        self.state.disconnected.store(true, Ordering::SeqCst);
        // Unblocks a listener waiting in `next_event`
        self.send(HookEvent::Wake);
    }

    /// Makes the next `count` hook installs fail
    pub fn fail_next_installs(&self, count: u32) {
        self.state.failing_installs.store(count, Ordering::SeqCst);
    }

    pub fn is_hook_installed(&self) -> bool {
        self.state.installed.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Number of install attempts, successful or not
    pub fn installs(&self) -> u32 {
        self.state.installs.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> u32 {
        self.state.removals.load(Ordering::SeqCst)
    }
}

impl EventSource for ScriptedSource {
    fn open(&mut self, _tick_interval: Duration) -> Result<(), HookError> {
        self.state.disconnected.store(false, Ordering::SeqCst);
        self.state.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn install_hook(&mut self) -> Result<(), HookError> {
        if self.state.installed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.state.installs.fetch_add(1, Ordering::SeqCst);

        let failing = self.state.failing_installs.load(Ordering::SeqCst);
        if failing > 0 {
            self.state.failing_installs.store(failing - 1, Ordering::SeqCst);
            return Err(HookError::InstallFailed("simulated install failure".to_string()));
        }

        self.state.installed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn remove_hook(&mut self) {
        if self.state.installed.swap(false, Ordering::SeqCst) {
            self.state.removals.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_hook_installed(&self) -> bool {
        self.state.installed.load(Ordering::SeqCst)
    }

    fn next_event(&mut self) -> Option<HookEvent> {
        let event = self.receiver.recv().ok()?;
        if self.state.disconnected.load(Ordering::SeqCst) {
            return None;
        }
        Some(event)
    }

    fn close(&mut self) {
        self.remove_hook();
        self.state.open.store(false, Ordering::SeqCst);
    }

    fn waker(&self) -> Arc<dyn Wake> {
        Arc::new(ChannelWaker {
            sender: self.sender.clone(),
        })
    }
}
