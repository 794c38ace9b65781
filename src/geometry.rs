//! Integer image-space points and the two geometric primitives the cropper
//! needs: infinite-line intersection and rectangle centroid/extent.

use serde::{Deserialize, Serialize};

/// Determinants smaller than this are treated as parallel lines.
const PARALLEL_EPSILON: f64 = 1e-9;

/// A pixel coordinate in image space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Round a fractional position to the nearest pixel.
    pub fn round(x: f64, y: f64) -> Self {
        Self {
            x: x.round() as i32,
            y: y.round() as i32,
        }
    }
}

/// Dimensions of the loaded image. All annotation geometry lives in this space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `0 <= x <= width && 0 <= y <= height`
    pub fn contains(&self, p: Point) -> bool {
        p.x >= 0 && p.y >= 0 && p.x as i64 <= self.width as i64 && p.y as i64 <= self.height as i64
    }

    /// Strict interior test used to filter intersections: points on the border are rejected.
    pub fn contains_strictly(&self, x: f64, y: f64) -> bool {
        x > 0.0 && y > 0.0 && x < self.width as f64 && y < self.height as f64
    }

    pub fn clamp(&self, p: Point) -> Point {
        let w = self.width.min(i32::MAX as u32) as i32;
        let h = self.height.min(i32::MAX as u32) as i32;
        Point::new(p.x.clamp(0, w), p.y.clamp(0, h))
    }
}

/// Where the infinite lines through `a1-a2` and `b1-b2` cross.
///
/// The result is not clipped to either segment and is left unrounded; callers
/// round when they turn it into a pixel. Returns `None` for parallel or
/// coincident lines.
pub fn line_intersection(a1: Point, a2: Point, b1: Point, b2: Point) -> Option<(f64, f64)> {
    let (x1, y1) = (a1.x as f64, a1.y as f64);
    let (x2, y2) = (a2.x as f64, a2.y as f64);
    let (x3, y3) = (b1.x as f64, b1.y as f64);
    let (x4, y4) = (b2.x as f64, b2.y as f64);

    let det = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if det.abs() < PARALLEL_EPSILON {
        return None;
    }

    let a = x1 * y2 - y1 * x2;
    let b = x3 * y4 - y3 * x4;
    let x = (a * (x3 - x4) - (x1 - x2) * b) / det;
    let y = (a * (y3 - y4) - (y1 - y2) * b) / det;
    Some((x, y))
}

/// Centroid of the axis-aligned rectangle spanned by two opposite corners,
/// together with its long-axis length.
///
/// Corners may be given in any order.
pub fn rect_centroid_and_size(p1: Point, p2: Point) -> (Point, u32) {
    let left = p1.x.min(p2.x);
    let top = p1.y.min(p2.y);
    let width = p1.x.abs_diff(p2.x);
    let height = p1.y.abs_diff(p2.y);

    let centroid = Point::round(
        left as f64 + width as f64 / 2.0,
        top as f64 + height as f64 / 2.0,
    );
    (centroid, width.max(height))
}
