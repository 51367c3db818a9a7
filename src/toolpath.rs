//! Tool-path data types produced by the interpreter.
//!
//! A tool path is the ordered sequence of [`PathSegment`]s emitted for one
//! program run on one canal: each segment carries the discretised points of
//! a single interpreted block together with its traversal time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A Cartesian machine position with three linear and three rotary axes.
///
/// Immutable once emitted; the interpolators always allocate fresh points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Point {
            x,
            y,
            z,
            ..Point::default()
        }
    }

    /// Builds a point from a resolved axis map; absent axes read as `0.0`.
    pub fn from_axes(axes: &BTreeMap<char, f64>) -> Self {
        let get = |letter| axes.get(&letter).copied().unwrap_or(0.0);
        Point {
            x: get('X'),
            y: get('Y'),
            z: get('Z'),
            a: get('A'),
            b: get('B'),
            c: get('C'),
        }
    }

    /// Euclidean distance to `other` over the linear axes only.
    pub fn linear_distance(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// The points of one interpreted block plus the time to traverse them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    /// Discretised positions in traversal order. The block's start point is
    /// never included; the final element is the block's end point.
    pub points: Vec<Point>,
    /// Traversal time in seconds; `0.0` for zero-length moves.
    pub seconds: f64,
}

impl PathSegment {
    pub fn new(points: Vec<Point>, seconds: f64) -> Self {
        PathSegment { points, seconds }
    }

    /// The block's end point, if the segment is non-empty.
    pub fn end_point(&self) -> Option<&Point> {
        self.points.last()
    }
}
