//! Core domain types and operations
//!
//! This module defines pure geometric types that work exclusively with
//! real pixels in virtual-screen coordinates and have no knowledge of Win32.

use serde::{Deserialize, Serialize};

/// A point in virtual-screen coordinates
///
/// Secondary monitors can sit left of or above the primary one, so both
/// components may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Creates a new point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Squared euclidean distance to another point
    pub fn distance_squared(&self, other: Point) -> i64 {
        let dx = i64::from(self.x) - i64::from(other.x);
        let dy = i64::from(self.y) - i64::from(other.y);
        dx * dx + dy * dy
    }
}

/// Rectangle in real pixel coordinates
///
/// This is the fundamental building block for all geometric calculations.
/// All coordinates are in real pixels, already DPI-normalized by the platform layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    /// Creates a new rectangle
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Returns the right edge coordinate (exclusive)
    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    /// Returns the bottom edge coordinate (exclusive)
    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    /// Returns true if the rectangle covers no pixels
    pub fn is_degenerate(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// Returns true if this rectangle contains the given point
    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    /// Returns the four corner pixels as (top-left, top-right, bottom-left, bottom-right)
    ///
    /// Corners are the last pixels inside the rectangle, which is where a
    /// pointer clamped to the screen edge ends up.
    pub fn corners(&self) -> [Point; 4] {
        let right = self.right() - 1;
        let bottom = self.bottom() - 1;
        [
            Point::new(self.x, self.y),
            Point::new(right, self.y),
            Point::new(self.x, bottom),
            Point::new(right, bottom),
        ]
    }

    /// Returns the intersection of two rectangles, or None if they don't intersect
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if left < right && top < bottom {
            Some(Rect::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    /// Returns the area of the rectangle in square pixels
    pub fn area(&self) -> i64 {
        i64::from(self.w.max(0)) * i64::from(self.h.max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_basic_properties() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert_eq!(rect.area(), 5000);
        assert!(!rect.is_degenerate());
        assert!(Rect::new(0, 0, 0, 10).is_degenerate());
    }

    #[test]
    fn rect_contains_point() {
        let rect = Rect::new(10, 10, 20, 20);
        assert!(rect.contains_point(Point::new(15, 15))); // Inside
        assert!(rect.contains_point(Point::new(10, 10))); // Top-left corner
        assert!(!rect.contains_point(Point::new(30, 30))); // Right/bottom edges are exclusive
        assert!(!rect.contains_point(Point::new(5, 5))); // Outside left-top
    }

    #[test]
    fn rect_corners_are_inside() {
        let rect = Rect::new(-1920, 0, 1920, 1080);
        let corners = rect.corners();
        assert_eq!(corners[0], Point::new(-1920, 0));
        assert_eq!(corners[3], Point::new(-1, 1079));
        assert!(corners.iter().all(|corner| rect.contains_point(*corner)));
    }

    #[test]
    fn rect_intersection() {
        let rect1 = Rect::new(0, 0, 20, 20);
        let rect2 = Rect::new(10, 10, 20, 20);
        assert_eq!(rect1.intersection(&rect2), Some(Rect::new(10, 10, 10, 10)));

        // No intersection
        let rect3 = Rect::new(30, 30, 10, 10);
        assert!(rect1.intersection(&rect3).is_none());
    }

    #[test]
    fn point_distance() {
        assert_eq!(Point::new(0, 0).distance_squared(Point::new(3, 4)), 25);
    }
}
