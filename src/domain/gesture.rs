//! Gesture recognition from raw pointer samples
//!
//! Two kinds of gestures are recognized:
//! - **Swipes**: a stroke drawn while the gesture button is held, classified
//!   on release by its net displacement vector
//! - **Hot corners**: the pointer resting near a monitor corner for longer
//!   than the dwell threshold
//!
//! The recognizer is a pure state machine. It never reads the clock: every
//! timestamp comes from the samples and ticks it is fed.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::RecognizerConfig;
use crate::domain::core::{Point, Rect};

/// A single raw pointer observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerSample {
    /// Monotonic time since an arbitrary per-listener origin
    pub timestamp: Duration,
    /// Absolute position in virtual-screen coordinates
    pub position: Point,
    /// Whether the gesture button is held
    pub button_down: bool,
}

impl PointerSample {
    pub fn new(timestamp: Duration, x: i32, y: i32, button_down: bool) -> Self {
        Self {
            timestamp,
            position: Point::new(x, y),
            button_down,
        }
    }
}

/// Discrete gesture produced by the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureSymbol {
    SwipeLeft,
    SwipeRight,
    SwipeUp,
    SwipeDown,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomLeft,
    CornerBottomRight,
    /// A completed stroke that matched nothing
    None,
}

impl GestureSymbol {
    pub const ALL: [GestureSymbol; 9] = [
        GestureSymbol::SwipeLeft,
        GestureSymbol::SwipeRight,
        GestureSymbol::SwipeUp,
        GestureSymbol::SwipeDown,
        GestureSymbol::CornerTopLeft,
        GestureSymbol::CornerTopRight,
        GestureSymbol::CornerBottomLeft,
        GestureSymbol::CornerBottomRight,
        GestureSymbol::None,
    ];

    /// Returns true for every symbol except `None`
    pub fn is_actionable(&self) -> bool {
        !matches!(self, GestureSymbol::None)
    }
}

impl fmt::Display for GestureSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GestureSymbol::SwipeLeft => "swipe-left",
            GestureSymbol::SwipeRight => "swipe-right",
            GestureSymbol::SwipeUp => "swipe-up",
            GestureSymbol::SwipeDown => "swipe-down",
            GestureSymbol::CornerTopLeft => "corner-top-left",
            GestureSymbol::CornerTopRight => "corner-top-right",
            GestureSymbol::CornerBottomLeft => "corner-bottom-left",
            GestureSymbol::CornerBottomRight => "corner-bottom-right",
            GestureSymbol::None => "none",
        };
        f.write_str(name)
    }
}

/// One of the four corners of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// Same order as [`Rect::corners`]
    const ORDER: [Corner; 4] = [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    pub fn symbol(self) -> GestureSymbol {
        match self {
            Corner::TopLeft => GestureSymbol::CornerTopLeft,
            Corner::TopRight => GestureSymbol::CornerTopRight,
            Corner::BottomLeft => GestureSymbol::CornerBottomLeft,
            Corner::BottomRight => GestureSymbol::CornerBottomRight,
        }
    }
}

/// Samples of the stroke currently being drawn
///
/// Bounded by time: samples older than the stroke timeout relative to the
/// newest one are evicted on every push.
#[derive(Debug, Clone, Default)]
pub struct GestureStroke {
    samples: VecDeque<PointerSample>,
}

impl GestureStroke {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample and evicts everything that fell out of the window
    pub fn push(&mut self, sample: PointerSample, window: Duration) {
        self.samples.push_back(sample);
        while let Some(oldest) = self.samples.front() {
            if sample.timestamp.saturating_sub(oldest.timestamp) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&PointerSample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&PointerSample> {
        self.samples.back()
    }

    /// Net displacement from the first to the last sample as (dx, dy)
    pub fn displacement(&self) -> (f64, f64) {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => (
                f64::from(last.position.x) - f64::from(first.position.x),
                f64::from(last.position.y) - f64::from(first.position.y),
            ),
            _ => (0.0, 0.0),
        }
    }

    /// Total distance travelled along the stroke
    pub fn path_length(&self) -> f64 {
        self.samples
            .iter()
            .zip(self.samples.iter().skip(1))
            .map(|(a, b)| (a.position.distance_squared(b.position) as f64).sqrt())
            .sum()
    }
}

/// Snapshot of a stroke in progress, for the preview overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureProgress {
    pub origin: Point,
    pub current: Point,
    /// What the stroke would classify as if released now
    pub candidate: GestureSymbol,
}

/// Hot-corner dwell bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DwellState {
    corner: Option<Corner>,
    entered_at: Duration,
    /// Set once the dwell emitted; cleared only by leaving the corner
    fired: bool,
}

impl DwellState {
    fn entered(corner: Corner, at: Duration) -> Self {
        Self {
            corner: Some(corner),
            entered_at: at,
            fired: false,
        }
    }
}

/// Finite-state gesture matcher fed from the listener thread
#[derive(Debug, Clone)]
pub struct GestureRecognizer {
    config: RecognizerConfig,
    stroke: GestureStroke,
    stroke_active: bool,
    last_timestamp: Option<Duration>,
    screens: Vec<Rect>,
    dwell: DwellState,
}

impl GestureRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self {
            config,
            stroke: GestureStroke::new(),
            stroke_active: false,
            last_timestamp: None,
            screens: Vec::new(),
            dwell: DwellState::default(),
        }
    }

    /// Replaces the monitor rectangles used for hot-corner detection
    pub fn set_screens(&mut self, screens: Vec<Rect>) {
        self.screens = screens;
        self.dwell = DwellState::default();
    }

    /// Drops any stroke or dwell in progress
    ///
    /// Called around power transitions, after which timestamps from the
    /// old listener generation are meaningless.
    pub fn reset(&mut self) {
        self.stroke.clear();
        self.stroke_active = false;
        self.last_timestamp = None;
        self.dwell = DwellState::default();
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke_active
    }

    /// Number of buffered samples of the current stroke
    pub fn buffered(&self) -> usize {
        self.stroke.len()
    }

    /// Feeds one raw sample
    ///
    /// Returns `Some(symbol)` when a stroke completed (possibly
    /// `GestureSymbol::None`) or a corner dwell fired; `None` otherwise.
    pub fn observe(&mut self, sample: PointerSample) -> Option<GestureSymbol> {
        if let Some(last) = self.last_timestamp {
            if sample.timestamp < last {
                tracing::trace!(timestamp = ?sample.timestamp, last = ?last, "dropping out-of-order pointer sample");
                return None;
            }
        }
        self.last_timestamp = Some(sample.timestamp);

        let stroke_symbol = self.track_stroke(sample);
        let corner_symbol = self.track_corner(sample);
        stroke_symbol.or(corner_symbol)
    }

    /// Reports that the pointer has rested in `corner` for `duration`
    ///
    /// Emits the corner symbol once the threshold is reached, then stays
    /// silent until the pointer leaves the corner.
    pub fn observe_corner_dwell(&mut self, corner: Corner, duration: Duration) -> Option<GestureSymbol> {
        if duration < self.config.dwell_threshold {
            return None;
        }
        if self.dwell.fired && self.dwell.corner == Some(corner) {
            return None;
        }

        if self.dwell.corner != Some(corner) {
            self.dwell = DwellState::entered(corner, self.last_timestamp.unwrap_or_default());
        }
        self.dwell.fired = true;
        Some(corner.symbol())
    }

    /// Advances the recognizer clock without pointer movement
    ///
    /// Expires a stale stroke and completes a dwell the pointer is resting in.
    pub fn tick(&mut self, now: Duration) -> Option<GestureSymbol> {
        if self.last_timestamp.is_some_and(|last| now < last) {
            return None;
        }

        if self.stroke_active {
            let newest = self.stroke.last().map(|sample| sample.timestamp);
            if newest.is_some_and(|newest| now.saturating_sub(newest) > self.config.stroke_timeout) {
                tracing::trace!(samples = self.stroke.len(), "gesture stroke expired");
                self.stroke.clear();
                self.stroke_active = false;
            }
            return None;
        }

        match self.dwell {
            DwellState {
                corner: Some(corner),
                entered_at,
                fired: false,
            } => self.observe_corner_dwell(corner, now.saturating_sub(entered_at)),
            _ => None,
        }
    }

    /// The stroke being drawn, if any
    pub fn progress(&self) -> Option<GestureProgress> {
        if !self.stroke_active {
            return None;
        }
        let origin = self.stroke.first()?.position;
        let current = self.stroke.last()?.position;
        Some(GestureProgress {
            origin,
            current,
            candidate: self.classify(),
        })
    }

    fn track_stroke(&mut self, sample: PointerSample) -> Option<GestureSymbol> {
        let window = self.config.stroke_timeout;
        match (self.stroke_active, sample.button_down) {
            (false, true) => {
                self.stroke.clear();
                self.stroke.push(sample, window);
                self.stroke_active = true;
                None
            }
            (true, true) => {
                self.stroke.push(sample, window);
                None
            }
            (true, false) => {
                self.stroke.push(sample, window);
                let symbol = self.classify();
                self.stroke.clear();
                self.stroke_active = false;
                Some(symbol)
            }
            (false, false) => None,
        }
    }

    fn track_corner(&mut self, sample: PointerSample) -> Option<GestureSymbol> {
        if sample.button_down {
            self.dwell = DwellState::default();
            return None;
        }

        let Some(corner) = self.corner_at(sample.position) else {
            self.dwell = DwellState::default();
            return None;
        };

        if self.dwell.corner != Some(corner) {
            self.dwell = DwellState::entered(corner, sample.timestamp);
            return None;
        }
        if self.dwell.fired {
            return None;
        }

        let elapsed = sample.timestamp.saturating_sub(self.dwell.entered_at);
        self.observe_corner_dwell(corner, elapsed)
    }

    fn corner_at(&self, position: Point) -> Option<Corner> {
        let radius = self.config.corner_radius;
        let radius_squared = (radius * radius) as i64;

        let screen = self.screens.iter().find(|screen| screen.contains_point(position))?;
        screen
            .corners()
            .into_iter()
            .zip(Corner::ORDER)
            .find(|(point, _)| point.distance_squared(position) <= radius_squared)
            .map(|(_, corner)| corner)
    }

    fn classify(&self) -> GestureSymbol {
        let (dx, dy) = self.stroke.displacement();
        let magnitude = dx.hypot(dy);
        let min_distance = self.config.min_distance;

        if magnitude < min_distance || self.stroke.path_length() < min_distance {
            return GestureSymbol::None;
        }

        let (major, minor) = if dx.abs() >= dy.abs() {
            (dx.abs(), dy.abs())
        } else {
            (dy.abs(), dx.abs())
        };
        if major <= self.config.dominance_ratio * minor {
            return GestureSymbol::None;
        }

        if dx.abs() >= dy.abs() {
            if dx < 0.0 { GestureSymbol::SwipeLeft } else { GestureSymbol::SwipeRight }
        } else if dy < 0.0 {
            GestureSymbol::SwipeUp
        } else {
            GestureSymbol::SwipeDown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn recognizer() -> GestureRecognizer {
        let mut recognizer = GestureRecognizer::new(RecognizerConfig::default());
        recognizer.set_screens(vec![Rect::new(0, 0, 1920, 1080)]);
        recognizer
    }

    /// Draws a straight stroke of `count` samples and returns every emitted symbol
    fn draw(
        recognizer: &mut GestureRecognizer,
        from: (i32, i32),
        to: (i32, i32),
        start: Duration,
        span: Duration,
        count: u32,
    ) -> Vec<GestureSymbol> {
        let mut emitted = Vec::new();
        for i in 0..count {
            let t = f64::from(i) / f64::from(count - 1);
            let x = from.0 + ((f64::from(to.0 - from.0)) * t).round() as i32;
            let y = from.1 + ((f64::from(to.1 - from.1)) * t).round() as i32;
            let timestamp = start + span.mul_f64(t);
            let button_down = i + 1 < count;
            emitted.extend(recognizer.observe(PointerSample::new(timestamp, x, y, button_down)));
        }
        emitted
    }

    #[test]
    fn vertical_stroke_is_swipe_up() {
        let mut recognizer = recognizer();
        let emitted = draw(&mut recognizer, (100, 500), (100, 50), ms(0), ms(300), 200);
        assert_eq!(emitted, vec![GestureSymbol::SwipeUp]);
        assert_eq!(recognizer.buffered(), 0);
        assert!(!recognizer.is_stroke_active());
    }

    #[test]
    fn each_direction_emits_exactly_one_symbol() {
        let cases = [
            ((900, 500), (400, 520), GestureSymbol::SwipeLeft),
            ((400, 500), (900, 480), GestureSymbol::SwipeRight),
            ((600, 800), (620, 200), GestureSymbol::SwipeUp),
            ((600, 200), (580, 800), GestureSymbol::SwipeDown),
        ];

        for (from, to, expected) in cases {
            let mut recognizer = recognizer();
            let emitted = draw(&mut recognizer, from, to, ms(0), ms(200), 40);
            assert_eq!(emitted, vec![expected], "stroke {from:?} -> {to:?}");
        }
    }

    #[test]
    fn short_strokes_are_none() {
        let mut recognizer = recognizer();
        for (i, length) in [0, 10, 40, 79].into_iter().enumerate() {
            let start = ms(1000 * i as u64);
            let emitted = draw(&mut recognizer, (500, 500), (500 + length, 500), start, ms(100), 20);
            assert_eq!(emitted, vec![GestureSymbol::None], "length {length}");
        }
    }

    #[test]
    fn diagonal_stroke_is_none() {
        let mut recognizer = recognizer();
        let emitted = draw(&mut recognizer, (200, 200), (500, 450), ms(0), ms(200), 30);
        assert_eq!(emitted, vec![GestureSymbol::None]);
    }

    #[test]
    fn zigzag_with_small_net_displacement_is_none() {
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        let xs = [500, 700, 500, 700, 500, 530];
        for (i, x) in xs.iter().enumerate() {
            let button_down = i + 1 < xs.len();
            emitted.extend(recognizer.observe(PointerSample::new(ms(10 * i as u64), *x, 500, button_down)));
        }
        assert_eq!(emitted, vec![GestureSymbol::None]);
    }

    #[test]
    fn out_of_order_samples_are_dropped() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.observe(PointerSample::new(ms(100), 100, 500, true)), None);
        // Stale sample far to the right must not count towards the stroke
        assert_eq!(recognizer.observe(PointerSample::new(ms(50), 1500, 500, true)), None);
        assert_eq!(recognizer.buffered(), 1);
        assert_eq!(
            recognizer.observe(PointerSample::new(ms(150), 120, 500, false)),
            Some(GestureSymbol::None)
        );
    }

    #[test]
    fn equal_timestamps_are_accepted() {
        let mut recognizer = recognizer();
        // Coalesced hook events often share a timestamp
        assert_eq!(recognizer.observe(PointerSample::new(ms(100), 100, 500, true)), None);
        assert_eq!(recognizer.observe(PointerSample::new(ms(100), 300, 500, true)), None);
        assert_eq!(recognizer.buffered(), 2);
        assert_eq!(
            recognizer.observe(PointerSample::new(ms(100), 500, 500, false)),
            Some(GestureSymbol::SwipeRight)
        );
    }

    #[test]
    fn buffer_is_bounded_by_timeout() {
        let mut recognizer = recognizer();
        recognizer.observe(PointerSample::new(ms(0), 100, 100, true));
        for i in 1..=2000u64 {
            recognizer.observe(PointerSample::new(ms(i), 100, 100, true));
        }
        // 500 ms window at one sample per millisecond
        assert_eq!(recognizer.buffered(), 501);
    }

    #[test]
    fn slow_stroke_only_counts_recent_window() {
        let mut recognizer = recognizer();
        // Travel 600px left over 2 s, then stop; only the last 500 ms count
        let mut emitted = draw(&mut recognizer, (1000, 500), (400, 500), ms(0), ms(2000), 201);
        assert_eq!(emitted.pop(), Some(GestureSymbol::SwipeLeft));

        let mut resting = self::recognizer();
        resting.observe(PointerSample::new(ms(0), 1000, 500, true));
        resting.observe(PointerSample::new(ms(100), 400, 500, true));
        // Resting for a second pushes the movement out of the window
        resting.observe(PointerSample::new(ms(1100), 400, 500, true));
        assert_eq!(
            resting.observe(PointerSample::new(ms(1110), 400, 500, false)),
            Some(GestureSymbol::None)
        );
    }

    #[test]
    fn stale_stroke_expires_on_tick() {
        let mut recognizer = recognizer();
        recognizer.observe(PointerSample::new(ms(0), 100, 500, true));
        recognizer.observe(PointerSample::new(ms(50), 400, 500, true));
        assert!(recognizer.is_stroke_active());

        assert_eq!(recognizer.tick(ms(400)), None);
        assert!(recognizer.is_stroke_active());
        assert_eq!(recognizer.tick(ms(600)), None);
        assert!(!recognizer.is_stroke_active());
        assert_eq!(recognizer.buffered(), 0);
    }

    #[test]
    fn corner_dwell_fires_once() {
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        for i in 0..=40u64 {
            emitted.extend(recognizer.observe(PointerSample::new(ms(i * 10), 0, 0, false)));
        }
        assert_eq!(emitted, vec![GestureSymbol::CornerTopLeft]);

        // A second dwell period without leaving triggers nothing
        let mut again = Vec::new();
        for i in 41..=100u64 {
            again.extend(recognizer.observe(PointerSample::new(ms(i * 10), 1, 1, false)));
            again.extend(recognizer.tick(ms(i * 10 + 5)));
        }
        assert!(again.is_empty());
    }

    #[test]
    fn corner_dwell_completes_on_tick_without_movement() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.observe(PointerSample::new(ms(1000), 1919, 1079, false)), None);
        assert_eq!(recognizer.tick(ms(1200)), None);
        assert_eq!(recognizer.tick(ms(1300)), Some(GestureSymbol::CornerBottomRight));
        assert_eq!(recognizer.tick(ms(1400)), None);
    }

    #[test]
    fn corner_rearms_after_leaving_radius() {
        let mut recognizer = recognizer();
        recognizer.observe(PointerSample::new(ms(0), 1919, 0, false));
        assert_eq!(recognizer.tick(ms(350)), Some(GestureSymbol::CornerTopRight));

        // Leave the corner
        assert_eq!(recognizer.observe(PointerSample::new(ms(400), 1800, 200, false)), None);

        recognizer.observe(PointerSample::new(ms(500), 1919, 0, false));
        assert_eq!(recognizer.tick(ms(700)), None);
        assert_eq!(recognizer.tick(ms(850)), Some(GestureSymbol::CornerTopRight));
    }

    #[test]
    fn dwell_is_ignored_while_button_is_held() {
        let mut recognizer = recognizer();
        let mut emitted = Vec::new();
        for i in 0..=40u64 {
            emitted.extend(recognizer.observe(PointerSample::new(ms(i * 10), 0, 1079, true)));
        }
        assert!(emitted.is_empty());
    }

    #[test]
    fn corners_follow_secondary_monitors() {
        let mut recognizer = GestureRecognizer::new(RecognizerConfig::default());
        recognizer.set_screens(vec![Rect::new(0, 0, 1920, 1080), Rect::new(-1280, 0, 1280, 1024)]);

        recognizer.observe(PointerSample::new(ms(0), -1280, 1023, false));
        assert_eq!(recognizer.tick(ms(300)), Some(GestureSymbol::CornerBottomLeft));
    }

    #[test]
    fn explicit_dwell_report() {
        let mut recognizer = recognizer();
        assert_eq!(recognizer.observe_corner_dwell(Corner::TopLeft, ms(100)), None);
        assert_eq!(
            recognizer.observe_corner_dwell(Corner::TopLeft, ms(400)),
            Some(GestureSymbol::CornerTopLeft)
        );
        assert_eq!(recognizer.observe_corner_dwell(Corner::TopLeft, ms(800)), None);
        assert_eq!(
            recognizer.observe_corner_dwell(Corner::BottomLeft, ms(400)),
            Some(GestureSymbol::CornerBottomLeft)
        );
    }

    #[test]
    fn progress_reports_candidate() {
        let mut recognizer = recognizer();
        assert!(recognizer.progress().is_none());
        recognizer.observe(PointerSample::new(ms(0), 800, 500, true));
        recognizer.observe(PointerSample::new(ms(50), 600, 505, true));

        let progress = recognizer.progress().unwrap();
        assert_eq!(progress.origin, Point::new(800, 500));
        assert_eq!(progress.current, Point::new(600, 505));
        assert_eq!(progress.candidate, GestureSymbol::SwipeLeft);
    }

    #[test]
    fn reset_forgets_clock_and_stroke() {
        let mut recognizer = recognizer();
        recognizer.observe(PointerSample::new(ms(5000), 100, 500, true));
        recognizer.reset();
        assert!(!recognizer.is_stroke_active());

        // Timestamps from a fresh listener origin are accepted again
        let emitted = draw(&mut recognizer, (100, 500), (100, 50), ms(0), ms(300), 50);
        assert_eq!(emitted, vec![GestureSymbol::SwipeUp]);
    }
}
