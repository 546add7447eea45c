//! Win32 event source: low-level mouse hook plus a hidden notification window
//!
//! Critical threading requirements:
//! - Everything here runs on the listener thread; the hook callback is
//!   invoked by the system from inside that thread's `GetMessageW`
//! - The hook callback only appends to a thread-local queue and never
//!   blocks; the listener drains the queue between messages
//! - The notification window is a hidden top-level window, since
//!   message-only windows do not receive power and display broadcasts
//! - The arm hotkey, when configured, is registered against that window so
//!   its `WM_HOTKEY` arrives in the same queue as everything else

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use windows::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Input::KeyboardAndMouse::{HOT_KEY_MODIFIERS, MOD_NOREPEAT, RegisterHotKey, UnregisterHotKey};
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetMessageW, HHOOK, KillTimer,
    MSG, MSLLHOOKSTRUCT, PostThreadMessageW, RegisterClassW, SetTimer, SetWindowsHookExW, UnhookWindowsHookEx,
    WH_MOUSE_LL, WINDOW_EX_STYLE, WM_APP, WM_DISPLAYCHANGE, WM_HOTKEY, WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN,
    WM_MBUTTONUP, WM_MOUSEMOVE, WM_POWERBROADCAST, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_TIMER, WNDCLASSW, WS_OVERLAPPED,
};
use windows::core::{PCWSTR, w};

use crate::config::{ArmHotkey, GestureButton};
use crate::domain::gesture::PointerSample;
use crate::platform::{EventSource, HookError, HookEvent, Wake};

/// Posted by the waker; becomes a `HookEvent::Wake` behind pending events
const WM_LISTENER_WAKE: u32 = WM_APP + 1;
/// Posted by the hook callback to return from `GetMessageW`
const WM_LISTENER_NOTIFY: u32 = WM_APP + 2;

const PBT_APMSUSPEND: usize = 0x0004;
const PBT_APMRESUMESUSPEND: usize = 0x0007;
const PBT_APMRESUMEAUTOMATIC: usize = 0x0012;

const TICK_TIMER_ID: usize = 1;
const ARM_HOTKEY_ID: i32 = 1;

thread_local! {
    static PENDING: RefCell<VecDeque<HookEvent>> = const { RefCell::new(VecDeque::new()) };
    static ORIGIN: Cell<Option<Instant>> = const { Cell::new(None) };
    /// (button-down message, button-up message) of the gesture button
    static BUTTON_MESSAGES: Cell<(u32, u32)> = const { Cell::new((WM_RBUTTONDOWN, WM_RBUTTONUP)) };
    static BUTTON_DOWN: Cell<bool> = const { Cell::new(false) };
}

/// Time since the listener generation started
fn listener_clock() -> Duration {
    ORIGIN.with(|origin| origin.get().map(|start| start.elapsed()).unwrap_or_default())
}

/// Queues an event; returns true if the queue was empty before
fn push_pending(event: HookEvent) -> bool {
    PENDING.with(|pending| {
        let mut pending = pending.borrow_mut();
        let was_empty = pending.is_empty();
        pending.push_back(event);
        was_empty
    })
}

fn pop_pending() -> Option<HookEvent> {
    PENDING.with(|pending| pending.borrow_mut().pop_front())
}

fn button_messages(button: GestureButton) -> (u32, u32) {
    match button {
        GestureButton::Left => (WM_LBUTTONDOWN, WM_LBUTTONUP),
        GestureButton::Right => (WM_RBUTTONDOWN, WM_RBUTTONUP),
        GestureButton::Middle => (WM_MBUTTONDOWN, WM_MBUTTONUP),
    }
}

/// Low-level mouse hook procedure
///
/// Must stay fast: the system drops hooks that stall the input queue.
/// Never consumes the input.
unsafe extern "system" fn mouse_hook_proc(code: i32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if code >= 0 {
        let message = wparam.0 as u32;
        let (down, up) = BUTTON_MESSAGES.with(Cell::get);

        let button_down = if message == down {
            Some(true)
        } else if message == up {
            Some(false)
        } else if message == WM_MOUSEMOVE {
            Some(BUTTON_DOWN.with(Cell::get))
        } else {
            None
        };

        if let Some(button_down) = button_down {
            BUTTON_DOWN.with(|state| state.set(button_down));
            let data = unsafe { &*(lparam.0 as *const MSLLHOOKSTRUCT) };
            let sample = PointerSample::new(listener_clock(), data.pt.x, data.pt.y, button_down);
            if push_pending(HookEvent::Pointer(sample)) {
                let _ = unsafe { PostThreadMessageW(GetCurrentThreadId(), WM_LISTENER_NOTIFY, WPARAM(0), LPARAM(0)) };
            }
        }
    }

    unsafe { CallNextHookEx(None, code, wparam, lparam) }
}

/// Window procedure of the hidden notification window
unsafe extern "system" fn notification_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    match msg {
        WM_POWERBROADCAST => {
            match wparam.0 {
                PBT_APMSUSPEND => {
                    push_pending(HookEvent::Suspend);
                }
                PBT_APMRESUMESUSPEND | PBT_APMRESUMEAUTOMATIC => {
                    push_pending(HookEvent::Resume);
                }
                _ => {}
            }
            LRESULT(1)
        }
        WM_DISPLAYCHANGE => {
            push_pending(HookEvent::TopologyChanged);
            LRESULT(0)
        }
        WM_HOTKEY if wparam.0 == ARM_HOTKEY_ID as usize => {
            push_pending(HookEvent::Armed(listener_clock()));
            LRESULT(0)
        }
        WM_TIMER if wparam.0 == TICK_TIMER_ID => {
            push_pending(HookEvent::Tick(listener_clock()));
            LRESULT(0)
        }
        _ => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
    }
}

struct ThreadWaker {
    thread_id: Arc<AtomicU32>,
}

impl Wake for ThreadWaker {
    fn wake(&self) {
        let thread_id = self.thread_id.load(Ordering::SeqCst);
        if thread_id == 0 {
            return;
        }
        if let Err(error) = unsafe { PostThreadMessageW(thread_id, WM_LISTENER_WAKE, WPARAM(0), LPARAM(0)) } {
            tracing::warn!(%error, "failed to wake input listener");
        }
    }
}

/// Global pointer hook and OS notifications for one listener thread
pub struct Win32EventSource {
    button: GestureButton,
    arm_hotkey: Option<ArmHotkey>,
    hotkey_registered: bool,
    thread_id: Arc<AtomicU32>,
    window: Option<HWND>,
    hook: Option<HHOOK>,
}

impl Win32EventSource {
    pub fn new(button: GestureButton) -> Self {
        Self {
            button,
            arm_hotkey: None,
            hotkey_registered: false,
            thread_id: Arc::new(AtomicU32::new(0)),
            window: None,
            hook: None,
        }
    }

    /// Requires `hotkey` to be pressed before each gesture
    pub fn with_arm_hotkey(mut self, hotkey: Option<ArmHotkey>) -> Self {
        self.arm_hotkey = hotkey;
        self
    }

    fn register_arm_hotkey(&mut self, hwnd: HWND) -> Result<(), HookError> {
        let Some(hotkey) = &self.arm_hotkey else {
            return Ok(());
        };

        let modifiers = HOT_KEY_MODIFIERS(hotkey.modifier_mask()) | MOD_NOREPEAT;
        unsafe { RegisterHotKey(hwnd, ARM_HOTKEY_ID, modifiers, hotkey.key().virtual_key()) }
            .map_err(|error| HookError::HotkeyFailed(format!("{hotkey}: {error}")))?;

        self.hotkey_registered = true;
        tracing::info!(%hotkey, "arm hotkey registered");
        Ok(())
    }

    fn create_notification_window() -> Result<HWND, HookError> {
        let class_name = w!("WinTilerListenerWindow");
        let hinstance =
            unsafe { GetModuleHandleW(PCWSTR::null()) }.map_err(|error| HookError::ChannelFailed(error.to_string()))?;

        let class = WNDCLASSW {
            lpfnWndProc: Some(notification_proc),
            hInstance: hinstance.into(),
            lpszClassName: class_name,
            ..Default::default()
        };
        // Fails harmlessly when a previous listener generation registered it
        unsafe { RegisterClassW(&class) };

        let hwnd = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE::default(),
                class_name,
                w!(""),
                WS_OVERLAPPED,
                0,
                0,
                0,
                0,
                None,
                None,
                hinstance,
                None,
            )
        };
        if hwnd.0 == 0 {
            return Err(HookError::ChannelFailed("notification window creation failed".to_string()));
        }
        Ok(hwnd)
    }
}

impl EventSource for Win32EventSource {
    fn open(&mut self, tick_interval: Duration) -> Result<(), HookError> {
        ORIGIN.with(|origin| origin.set(Some(Instant::now())));
        BUTTON_MESSAGES.with(|messages| messages.set(button_messages(self.button)));
        BUTTON_DOWN.with(|state| state.set(false));
        PENDING.with(|pending| pending.borrow_mut().clear());

        let hwnd = Self::create_notification_window()?;
        let interval = u32::try_from(tick_interval.as_millis()).unwrap_or(u32::MAX).max(1);
        if unsafe { SetTimer(hwnd, TICK_TIMER_ID, interval, None) } == 0 {
            tracing::warn!("clock tick timer unavailable; hot-corner dwell needs pointer movement");
        }

        self.window = Some(hwnd);
        self.register_arm_hotkey(hwnd)?;
        self.thread_id.store(unsafe { GetCurrentThreadId() }, Ordering::SeqCst);
        Ok(())
    }

    fn install_hook(&mut self) -> Result<(), HookError> {
        if self.hook.is_some() {
            return Ok(());
        }

        let hinstance =
            unsafe { GetModuleHandleW(PCWSTR::null()) }.map_err(|error| HookError::InstallFailed(error.to_string()))?;
        let hook = unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), hinstance, 0) }
            .map_err(|error| HookError::InstallFailed(error.to_string()))?;

        BUTTON_DOWN.with(|state| state.set(false));
        self.hook = Some(hook);
        tracing::debug!("low-level mouse hook installed");
        Ok(())
    }

    fn remove_hook(&mut self) {
        if let Some(hook) = self.hook.take() {
            if let Err(error) = unsafe { UnhookWindowsHookEx(hook) } {
                // Typically the system already dropped the hook during sleep
                tracing::debug!(%error, "mouse hook was already detached");
            }
        }
    }

    fn is_hook_installed(&self) -> bool {
        self.hook.is_some()
    }

    fn next_event(&mut self) -> Option<HookEvent> {
        loop {
            if let Some(event) = pop_pending() {
                return Some(event);
            }

            let mut msg = MSG::default();
            let result = unsafe { GetMessageW(&mut msg, None, 0, 0) };
            match result.0 {
                0 => {
                    tracing::warn!("listener message queue received WM_QUIT");
                    return None;
                }
                -1 => {
                    let error = windows::core::Error::from_win32();
                    tracing::error!(%error, "listener message loop failed");
                    return None;
                }
                _ => {}
            }

            match msg.message {
                WM_LISTENER_WAKE => {
                    push_pending(HookEvent::Wake);
                }
                WM_LISTENER_NOTIFY => {}
                _ => {
                    unsafe { DispatchMessageW(&msg) };
                }
            }
        }
    }

    fn close(&mut self) {
        self.remove_hook();
        self.thread_id.store(0, Ordering::SeqCst);

        if let Some(hwnd) = self.window.take() {
            if std::mem::take(&mut self.hotkey_registered) {
                if let Err(error) = unsafe { UnregisterHotKey(hwnd, ARM_HOTKEY_ID) } {
                    tracing::debug!(%error, "arm hotkey was already unregistered");
                }
            }
            unsafe {
                let _ = KillTimer(hwnd, TICK_TIMER_ID);
                let _ = DestroyWindow(hwnd);
            }
        }
        PENDING.with(|pending| pending.borrow_mut().clear());
    }

    fn waker(&self) -> Arc<dyn Wake> {
        Arc::new(ThreadWaker {
            thread_id: Arc::clone(&self.thread_id),
        })
    }
}
