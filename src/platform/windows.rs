//! General Windows platform utilities
//!
//! Win32 helpers that don't fit into the more specialized platform modules.

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::HiDpi::{DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetProcessDpiAwarenessContext};

use crate::domain::core::Rect;
use crate::platform::WindowId;

/// Opts the process into per-monitor DPI awareness
///
/// Must run before any window or hook is created so that every coordinate
/// the crate sees is in real pixels. Fails if the awareness was already set,
/// for example through the application manifest; that is not fatal.
pub fn enable_dpi_awareness() -> bool {
    match unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) } {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(%error, "per-monitor DPI awareness not applied");
            false
        }
    }
}

pub fn hwnd_of(window: WindowId) -> HWND {
    HWND(window.0)
}

pub fn window_id(hwnd: HWND) -> WindowId {
    WindowId(hwnd.0)
}

/// Converts a Windows RECT to a domain rectangle
pub fn win32_rect_to_rect(rect: &RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right - rect.left, rect.bottom - rect.top)
}

/// Reads a UTF-16 buffer filled by a Win32 text getter
pub fn utf16_to_string(buffer: &[u16], length: i32) -> String {
    let length = usize::try_from(length).unwrap_or(0).min(buffer.len());
    String::from_utf16_lossy(&buffer[..length])
}
