//! Window management and positioning
//!
//! Win32 implementation of [`WindowManager`]. Placement never activates the
//! window and never changes its z-order.

use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    GWL_EXSTYLE, GWL_STYLE, GetClassNameW, GetForegroundWindow, GetWindowLongW, GetWindowRect, GetWindowTextW,
    IsIconic, IsWindow, IsWindowVisible, IsZoomed, SW_MAXIMIZE, SW_RESTORE, SWP_NOACTIVATE, SWP_NOZORDER, SetWindowPos, ShowWindow,
    WINDOW_EX_STYLE, WINDOW_STYLE, WS_CHILD, WS_EX_TOOLWINDOW, WS_THICKFRAME,
};

use crate::domain::core::Rect;
use crate::domain::monitor::MonitorDescriptor;
use crate::platform::windows::{hwnd_of, win32_rect_to_rect, window_id, utf16_to_string};
use crate::platform::{PlatformError, WindowId, WindowManager, WindowStyle};

/// Pixels of drift tolerated between the requested and the resulting rect
///
/// Some frames snap their size to a character or DPI grid.
const PLACEMENT_TOLERANCE: i32 = 2;

/// Stateless window manager over the Win32 API
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32WindowManager;

impl Win32WindowManager {
    pub fn new() -> Self {
        Self
    }

    fn validate(window: WindowId) -> Result<HWND, PlatformError> {
        let hwnd = hwnd_of(window);
        if unsafe { IsWindow(hwnd) }.as_bool() {
            Ok(hwnd)
        } else {
            Err(PlatformError::InvalidWindow(window))
        }
    }
}

fn within_tolerance(requested: Rect, actual: Rect) -> bool {
    (requested.x - actual.x).abs() <= PLACEMENT_TOLERANCE
        && (requested.y - actual.y).abs() <= PLACEMENT_TOLERANCE
        && (requested.w - actual.w).abs() <= PLACEMENT_TOLERANCE
        && (requested.h - actual.h).abs() <= PLACEMENT_TOLERANCE
}

impl WindowManager for Win32WindowManager {
    fn get_foreground_window(&self) -> Option<WindowId> {
        let hwnd = unsafe { GetForegroundWindow() };
        if hwnd.0 == 0 { None } else { Some(window_id(hwnd)) }
    }

    fn get_window_rect(&self, window: WindowId) -> Result<Rect, PlatformError> {
        let hwnd = Self::validate(window)?;
        let mut rect = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut rect) }.map_err(|error| PlatformError::QueryFailed {
            window,
            reason: error.to_string(),
        })?;
        Ok(win32_rect_to_rect(&rect))
    }

    fn get_window_style(&self, window: WindowId) -> Result<WindowStyle, PlatformError> {
        let hwnd = Self::validate(window)?;

        let mut class_buffer = [0u16; 256];
        let class_length = unsafe { GetClassNameW(hwnd, &mut class_buffer) };
        let mut title_buffer = [0u16; 512];
        let title_length = unsafe { GetWindowTextW(hwnd, &mut title_buffer) };

        let style = WINDOW_STYLE(unsafe { GetWindowLongW(hwnd, GWL_STYLE) } as u32);
        let ex_style = WINDOW_EX_STYLE(unsafe { GetWindowLongW(hwnd, GWL_EXSTYLE) } as u32);

        Ok(WindowStyle {
            class_name: utf16_to_string(&class_buffer, class_length),
            title: utf16_to_string(&title_buffer, title_length),
            is_visible: unsafe { IsWindowVisible(hwnd) }.as_bool(),
            is_child: (style & WS_CHILD) != WINDOW_STYLE(0),
            is_resizable: (style & WS_THICKFRAME) != WINDOW_STYLE(0),
            is_minimized: unsafe { IsIconic(hwnd) }.as_bool(),
            is_maximized: unsafe { IsZoomed(hwnd) }.as_bool(),
            is_tool_window: (ex_style & WS_EX_TOOLWINDOW) != WINDOW_EX_STYLE(0),
        })
    }

    fn set_window_rect(&self, window: WindowId, rect: Rect) -> Result<(), PlatformError> {
        let hwnd = Self::validate(window)?;
        let rejected = |reason: String| PlatformError::Rejected { window, reason };

        // A maximized window ignores SetWindowPos until restored
        if unsafe { IsZoomed(hwnd) }.as_bool() {
            // The return value is the previous visibility, not an error
            unsafe { ShowWindow(hwnd, SW_RESTORE) };
            if unsafe { IsZoomed(hwnd) }.as_bool() {
                return Err(rejected("window refused to leave the maximized state".to_string()));
            }
        }

        unsafe {
            SetWindowPos(
                hwnd,
                HWND(0), // Ignored due to SWP_NOZORDER
                rect.x,
                rect.y,
                rect.w,
                rect.h,
                SWP_NOACTIVATE | SWP_NOZORDER,
            )
        }
        .map_err(|error| rejected(error.to_string()))?;

        let actual = self.get_window_rect(window)?;
        if !within_tolerance(rect, actual) {
            return Err(rejected(format!("requested {rect:?}, window settled at {actual:?}")));
        }
        Ok(())
    }

    fn maximize_window(&self, window: WindowId) -> Result<(), PlatformError> {
        let hwnd = Self::validate(window)?;
        // Only ever called for the foreground window, so the implied activation is a no-op
        unsafe { ShowWindow(hwnd, SW_MAXIMIZE) };
        if unsafe { IsZoomed(hwnd) }.as_bool() {
            Ok(())
        } else {
            Err(PlatformError::Rejected {
                window,
                reason: "window could not be maximized again".to_string(),
            })
        }
    }

    fn enumerate_monitors(&self) -> Result<Vec<MonitorDescriptor>, PlatformError> {
        super::monitors::enumerate_monitors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_handle_is_reported() {
        let manager = Win32WindowManager::new();
        let bogus = WindowId(999_999);
        assert_eq!(manager.get_window_rect(bogus), Err(PlatformError::InvalidWindow(bogus)));
        assert!(matches!(
            manager.set_window_rect(bogus, Rect::new(0, 0, 100, 100)),
            Err(PlatformError::InvalidWindow(_))
        ));
    }

    #[test]
    fn tolerance_allows_small_snapping() {
        let requested = Rect::new(0, 0, 960, 540);
        assert!(within_tolerance(requested, Rect::new(1, 0, 958, 541)));
        assert!(!within_tolerance(requested, Rect::new(0, 0, 800, 540)));
    }
}
