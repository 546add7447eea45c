//! Monitor enumeration
//!
//! CRITICAL: This module must handle the Windows virtual coordinate system
//! where secondary monitors can have negative coordinates. The process is
//! per-monitor DPI aware, so the rectangles reported here are real pixels.

use windows::Win32::Foundation::{BOOL, FALSE, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO};

use crate::domain::monitor::MonitorDescriptor;
use crate::platform::PlatformError;
use crate::platform::windows::win32_rect_to_rect;

/// MONITORINFOF_PRIMARY
const MONITOR_PRIMARY_FLAG: u32 = 1;

/// Context for the monitor enumeration callback
struct EnumContext {
    monitors: Vec<MonitorDescriptor>,
    skipped: usize,
}

/// Callback for monitor enumeration
///
/// Keeps enumerating when one monitor fails to report its info; partial
/// data is better than none.
unsafe extern "system" fn enum_monitor_proc(hmonitor: HMONITOR, _hdc: HDC, _rect: *mut RECT, lparam: LPARAM) -> BOOL {
    unsafe {
        let context = &mut *(lparam.0 as *mut EnumContext);

        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if GetMonitorInfoW(hmonitor, &mut info) == FALSE {
            context.skipped += 1;
            return TRUE;
        }

        let id = context.monitors.len();
        context.monitors.push(MonitorDescriptor::new(
            id,
            win32_rect_to_rect(&info.rcMonitor),
            win32_rect_to_rect(&info.rcWork),
            info.dwFlags & MONITOR_PRIMARY_FLAG != 0,
        ));

        TRUE
    }
}

/// Enumerates all connected monitors in enumeration order
pub fn enumerate_monitors() -> Result<Vec<MonitorDescriptor>, PlatformError> {
    let mut context = EnumContext {
        monitors: Vec::new(),
        skipped: 0,
    };

    let ok = unsafe {
        EnumDisplayMonitors(
            None,
            None,
            Some(enum_monitor_proc),
            LPARAM(&mut context as *mut EnumContext as isize),
        )
    };
    if ok == FALSE {
        return Err(PlatformError::MonitorQueryFailed("EnumDisplayMonitors failed".to_string()));
    }
    if context.skipped > 0 {
        tracing::warn!(skipped = context.skipped, "some monitors did not report their geometry");
    }
    if context.monitors.is_empty() {
        return Err(PlatformError::MonitorQueryFailed("no monitors found".to_string()));
    }

    Ok(context.monitors)
}
