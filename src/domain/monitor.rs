//! Display geometry as seen by the tiling pipeline

use crate::domain::core::Rect;

/// One connected display in virtual-screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorDescriptor {
    /// Zero-based enumeration index, stable until the next topology change
    pub id: usize,
    /// Full monitor rectangle
    pub bounds: Rect,
    /// Bounds minus taskbars and docked toolbars
    pub work_area: Rect,
    pub is_primary: bool,
}

impl MonitorDescriptor {
    pub fn new(id: usize, bounds: Rect, work_area: Rect, is_primary: bool) -> Self {
        Self {
            id,
            bounds,
            work_area,
            is_primary,
        }
    }

    /// Area shared between this monitor and `rect`, in square pixels
    pub fn overlap(&self, rect: &Rect) -> i64 {
        self.bounds.intersection(rect).map_or(0, |shared| shared.area())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_with_window() {
        let monitor = MonitorDescriptor::new(0, Rect::new(0, 0, 1920, 1080), Rect::new(0, 0, 1920, 1040), true);
        assert_eq!(monitor.overlap(&Rect::new(1820, 0, 200, 100)), 100 * 100);
        assert_eq!(monitor.overlap(&Rect::new(2000, 0, 200, 100)), 0);
    }
}
