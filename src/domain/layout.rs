//! Layout slots and gesture-to-slot resolution
//!
//! A layout slot is a named rectangle expressed in fractions of a monitor.
//! The resolver maps a gesture symbol to a slot through an association
//! table and projects the slot onto a concrete monitor.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::core::Rect;
use crate::domain::gesture::GestureSymbol;
use crate::domain::monitor::MonitorDescriptor;

/// Tolerance for fractions produced by float arithmetic in config tools
const FRACTION_EPSILON: f64 = 1e-9;

/// Errors raised when a slot violates its invariants
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Layout slot '{name}' has a non-finite coordinate")]
    NonFinite { name: String },
    #[error("Layout slot '{name}' extends outside the monitor (fractions must stay within 0..=1)")]
    OutOfBounds { name: String },
    #[error("Layout slot '{name}' has zero width or height")]
    EmptyArea { name: String },
    #[error("Layout slot name must not be empty")]
    EmptyName,
}

/// Reasons a gesture could not be turned into a target rectangle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Gesture {symbol} is not bound to any layout slot")]
    Unmapped { symbol: GestureSymbol },
    #[error("Gesture {symbol} is bound to unknown slot '{slot}'")]
    MissingSlot { symbol: GestureSymbol, slot: String },
    #[error("Slot '{slot}' collapses to an empty rectangle on monitor {monitor}")]
    Degenerate { slot: String, monitor: usize },
}

/// A named target rectangle relative to a monitor
///
/// Invariant: all fractions lie in `[0, 1]`, the slot ends inside the
/// monitor and both width and height are positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawLayoutSlot", into = "RawLayoutSlot")]
pub struct LayoutSlot {
    name: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Unvalidated wire form of [`LayoutSlot`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawLayoutSlot {
    name: String,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

impl TryFrom<RawLayoutSlot> for LayoutSlot {
    type Error = LayoutError;

    fn try_from(raw: RawLayoutSlot) -> Result<Self, Self::Error> {
        LayoutSlot::new(raw.name, raw.x, raw.y, raw.width, raw.height)
    }
}

impl From<LayoutSlot> for RawLayoutSlot {
    fn from(slot: LayoutSlot) -> Self {
        Self {
            name: slot.name,
            x: slot.x,
            y: slot.y,
            width: slot.width,
            height: slot.height,
        }
    }
}

impl LayoutSlot {
    /// Creates a slot, validating the fractional bounds
    ///
    /// # Example
    /// ```rust
    /// use win_tiler::domain::layout::LayoutSlot;
    ///
    /// let top = LayoutSlot::new("top-half", 0.0, 0.0, 1.0, 0.5).unwrap();
    /// assert_eq!(top.name(), "top-half");
    /// assert!(LayoutSlot::new("bad", 0.6, 0.0, 0.6, 1.0).is_err());
    /// ```
    pub fn new(name: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Result<Self, LayoutError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(LayoutError::EmptyName);
        }
        if ![x, y, width, height].iter().all(|value| value.is_finite()) {
            return Err(LayoutError::NonFinite { name });
        }
        if width <= 0.0 || height <= 0.0 {
            return Err(LayoutError::EmptyArea { name });
        }

        let within = |value: f64| (-FRACTION_EPSILON..=1.0 + FRACTION_EPSILON).contains(&value);
        if !within(x) || !within(y) || !within(x + width) || !within(y + height) {
            return Err(LayoutError::OutOfBounds { name });
        }

        Ok(Self {
            name,
            x,
            y,
            width,
            height,
        })
    }

    /// Halves and quarters, named to match the default gesture bindings
    pub fn default_grid() -> Vec<LayoutSlot> {
        let slots = [
            ("left-half", 0.0, 0.0, 0.5, 1.0),
            ("right-half", 0.5, 0.0, 0.5, 1.0),
            ("top-half", 0.0, 0.0, 1.0, 0.5),
            ("bottom-half", 0.0, 0.5, 1.0, 0.5),
            ("top-left-quarter", 0.0, 0.0, 0.5, 0.5),
            ("top-right-quarter", 0.5, 0.0, 0.5, 0.5),
            ("bottom-left-quarter", 0.0, 0.5, 0.5, 0.5),
            ("bottom-right-quarter", 0.5, 0.5, 0.5, 0.5),
        ];

        slots
            .into_iter()
            .filter_map(|(name, x, y, w, h)| LayoutSlot::new(name, x, y, w, h).ok())
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Projects the slot onto an absolute area
    ///
    /// Each edge is rounded on its own so that two adjacent slots share
    /// their border pixel-exactly.
    pub fn project(&self, area: Rect) -> Rect {
        let edge = |origin: i32, span: i32, fraction: f64| origin + (f64::from(span) * fraction).round() as i32;

        let left = edge(area.x, area.w, self.x);
        let top = edge(area.y, area.h, self.y);
        let right = edge(area.x, area.w, self.x + self.width);
        let bottom = edge(area.y, area.h, self.y + self.height);

        Rect::new(left, top, right - left, bottom - top)
    }
}

/// Which monitor rectangle slots are projected onto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetArea {
    /// The full monitor bounds
    #[default]
    Bounds,
    /// The monitor bounds minus taskbars and docked toolbars
    WorkArea,
}

/// Association table from gesture symbols to slot names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureBindings {
    table: HashMap<GestureSymbol, String>,
}

impl GestureBindings {
    /// Creates an empty table; every gesture is a no-op until bound
    pub fn empty() -> Self {
        Self { table: HashMap::new() }
    }

    /// Binds a gesture to a slot name, replacing any previous binding
    pub fn bind(&mut self, symbol: GestureSymbol, slot: impl Into<String>) -> &mut Self {
        self.table.insert(symbol, slot.into());
        self
    }

    pub fn slot_for(&self, symbol: GestureSymbol) -> Option<&str> {
        self.table.get(&symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for GestureBindings {
    fn default() -> Self {
        let mut bindings = Self::empty();
        bindings
            .bind(GestureSymbol::SwipeLeft, "left-half")
            .bind(GestureSymbol::SwipeRight, "right-half")
            .bind(GestureSymbol::SwipeUp, "top-half")
            .bind(GestureSymbol::SwipeDown, "bottom-half")
            .bind(GestureSymbol::CornerTopLeft, "top-left-quarter")
            .bind(GestureSymbol::CornerTopRight, "top-right-quarter")
            .bind(GestureSymbol::CornerBottomLeft, "bottom-left-quarter")
            .bind(GestureSymbol::CornerBottomRight, "bottom-right-quarter");
        bindings
    }
}

/// A resolved placement: the slot that matched and its absolute rectangle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub slot: String,
    pub rect: Rect,
}

/// Maps gesture symbols to absolute target rectangles
///
/// Stateless apart from its immutable configuration, so identical inputs
/// always resolve to identical rectangles.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResolver {
    bindings: GestureBindings,
    area: TargetArea,
}

impl LayoutResolver {
    pub fn new(bindings: GestureBindings, area: TargetArea) -> Self {
        Self { bindings, area }
    }

    /// Resolves a symbol to a rectangle on the given monitor
    ///
    /// Returns `None` for unmapped symbols, unknown slots and degenerate
    /// results; use [`LayoutResolver::try_resolve`] for the reason.
    pub fn resolve(&self, symbol: GestureSymbol, monitor: &MonitorDescriptor, grid: &[LayoutSlot]) -> Option<Rect> {
        self.try_resolve(symbol, monitor, grid).ok().map(|placement| placement.rect)
    }

    /// Resolves a symbol, reporting why it could not be placed
    pub fn try_resolve(
        &self,
        symbol: GestureSymbol,
        monitor: &MonitorDescriptor,
        grid: &[LayoutSlot],
    ) -> Result<Placement, ResolveError> {
        let slot_name = self.bindings.slot_for(symbol).ok_or(ResolveError::Unmapped { symbol })?;

        // First definition wins when a grid repeats a name
        let slot = grid
            .iter()
            .find(|slot| slot.name() == slot_name)
            .ok_or_else(|| ResolveError::MissingSlot {
                symbol,
                slot: slot_name.to_string(),
            })?;

        let area = match self.area {
            TargetArea::Bounds => monitor.bounds,
            TargetArea::WorkArea => monitor.work_area,
        };
        let rect = slot.project(area);
        if rect.is_degenerate() {
            return Err(ResolveError::Degenerate {
                slot: slot_name.to_string(),
                monitor: monitor.id,
            });
        }

        Ok(Placement {
            slot: slot_name.to_string(),
            rect,
        })
    }
}

impl Default for LayoutResolver {
    fn default() -> Self {
        Self::new(GestureBindings::default(), TargetArea::default())
    }
}
