//! Geometric utility functions for headings, bearings and distances.

use geo::algorithm::Distance;
use geo::{Euclidean, Line, Point};
use serde::{Deserialize, Serialize};

/// Instantaneous placement of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Horizontal position (raster column).
    pub x: f32,
    /// Vertical position (raster row).
    pub y: f32,
    /// Heading in degrees, `[0, 360)`.
    pub heading: f32,
}

impl Pose {
    /// Creates a pose, normalizing the heading.
    pub fn new(x: f32, y: f32, heading: f32) -> Self {
        Self {
            x,
            y,
            heading: normalize_heading(heading),
        }
    }

    /// Moves `distance` along `heading + angle_offset` and returns the point.
    pub fn project(&self, angle_offset: f32, distance: f32) -> (f32, f32) {
        let (dx, dy) = heading_vector(self.heading + angle_offset);
        (self.x + dx * distance, self.y + dy * distance)
    }
}

/// Wraps a heading in degrees into `[0, 360)`.
pub fn normalize_heading(heading: f32) -> f32 {
    let wrapped = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Unit vector for a heading in degrees.
///
/// Heading 0 points along +x and heading 90 along +y (raster rows grow downwards).
pub fn heading_vector(heading: f32) -> (f32, f32) {
    let rad = (90.0 - heading).to_radians();
    (rad.sin(), rad.cos())
}

/// Calculates the minimum distance between a point and a line segment.
///
/// # Arguments
///
/// * `x`, `y` - The point
/// * `segment` - The line segment
pub fn point_segment_distance(x: f32, y: f32, segment: &Line<f32>) -> f32 {
    Euclidean.distance(&Point::new(x, y), segment)
}
