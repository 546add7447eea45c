//! Monitor topology provider
//!
//! Caches the connected displays for the session. The cache is refreshed
//! on topology-change notifications, on resume, and whenever it is found
//! empty at tiling time.

use crate::domain::core::Rect;
use crate::domain::monitor::MonitorDescriptor;
use crate::platform::WindowManager;

#[derive(Debug, Clone, Default)]
pub struct MonitorTopology {
    monitors: Vec<MonitorDescriptor>,
}

impl MonitorTopology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-queries the OS; a failed query leaves the set empty
    pub fn refresh<W: WindowManager>(&mut self, manager: &W) -> &[MonitorDescriptor] {
        match manager.enumerate_monitors() {
            Ok(monitors) => {
                tracing::debug!(count = monitors.len(), "monitor topology refreshed");
                self.monitors = monitors;
            }
            Err(error) => {
                tracing::warn!(%error, "monitor query failed; tiling paused until it succeeds");
                self.monitors.clear();
            }
        }
        &self.monitors
    }

    pub fn monitors(&self) -> &[MonitorDescriptor] {
        &self.monitors
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// The primary monitor, or the first one if none is flagged
    pub fn primary(&self) -> Option<&MonitorDescriptor> {
        self.monitors
            .iter()
            .find(|monitor| monitor.is_primary)
            .or_else(|| self.monitors.first())
    }

    /// The monitor sharing the largest area with `rect`, else the primary
    pub fn monitor_for_rect(&self, rect: Option<Rect>) -> Option<&MonitorDescriptor> {
        let best = rect.and_then(|rect| {
            // Reversed so the first monitor wins a tie
            self.monitors
                .iter()
                .rev()
                .map(|monitor| (monitor, monitor.overlap(&rect)))
                .filter(|(_, overlap)| *overlap > 0)
                .max_by_key(|(_, overlap)| *overlap)
                .map(|(monitor, _)| monitor)
        });
        best.or_else(|| self.primary())
    }

    /// Monitor bounds, for hot-corner detection
    pub fn screen_rects(&self) -> Vec<Rect> {
        self.monitors.iter().map(|monitor| monitor.bounds).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::fake::FakeWindowManager;

    fn dual() -> FakeWindowManager {
        let manager = FakeWindowManager::new();
        manager.set_monitors(vec![
            MonitorDescriptor::new(0, Rect::new(-1280, 0, 1280, 1024), Rect::new(-1280, 0, 1280, 984), false),
            MonitorDescriptor::new(1, Rect::new(0, 0, 1920, 1080), Rect::new(0, 0, 1920, 1040), true),
        ]);
        manager
    }

    #[test]
    fn refresh_and_lookup() {
        let manager = dual();
        let mut topology = MonitorTopology::new();
        assert!(topology.is_empty());

        assert_eq!(topology.refresh(&manager).len(), 2);
        assert_eq!(topology.primary().map(|monitor| monitor.id), Some(1));
        assert_eq!(
            topology.screen_rects(),
            vec![Rect::new(-1280, 0, 1280, 1024), Rect::new(0, 0, 1920, 1080)]
        );
    }

    #[test]
    fn window_spanning_monitors_uses_largest_overlap() {
        let mut topology = MonitorTopology::new();
        topology.refresh(&dual());

        let mostly_left = Rect::new(-1000, 100, 1200, 500);
        assert_eq!(topology.monitor_for_rect(Some(mostly_left)).map(|m| m.id), Some(0));

        let mostly_right = Rect::new(-200, 100, 1200, 500);
        assert_eq!(topology.monitor_for_rect(Some(mostly_right)).map(|m| m.id), Some(1));
    }

    #[test]
    fn offscreen_or_missing_window_falls_back_to_primary() {
        let mut topology = MonitorTopology::new();
        topology.refresh(&dual());

        assert_eq!(topology.monitor_for_rect(Some(Rect::new(9000, 9000, 10, 10))).map(|m| m.id), Some(1));
        assert_eq!(topology.monitor_for_rect(None).map(|m| m.id), Some(1));
    }

    #[test]
    fn failed_query_empties_the_cache() {
        let manager = dual();
        let mut topology = MonitorTopology::new();
        topology.refresh(&manager);

        manager.fail_monitor_queries(true);
        assert!(topology.refresh(&manager).is_empty());
        assert!(topology.monitor_for_rect(None).is_none());
    }
}
