//! Track surface: a drivability raster plus ordered checkpoint gates.
//!
//! The track is immutable once built and is shared read-only between all
//! workers for the whole run.

use geo::{Line, coord};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::geometric_utils::{Pose, point_segment_distance};
use crate::error::{Error, Result};

/// An ordered gate segment on the track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// First endpoint `[x, y]`.
    pub start: [f32; 2],
    /// Second endpoint `[x, y]`.
    pub end: [f32; 2],
}

impl Checkpoint {
    /// Creates a gate between two points.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            start: [x1, y1],
            end: [x2, y2],
        }
    }

    /// The gate as a `geo` line segment.
    pub fn segment(&self) -> Line<f32> {
        Line::new(
            coord! { x: self.start[0], y: self.start[1] },
            coord! { x: self.end[0], y: self.end[1] },
        )
    }

    /// Distance from a point to the gate segment.
    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        point_segment_distance(x, y, &self.segment())
    }
}

/// On-disk description of a track.
///
/// Rows use `#` for walls and `.` or a space for drivable cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackFile {
    /// Raster rows, top to bottom.
    pub rows: Vec<String>,
    /// Gates in driving order.
    pub checkpoints: Vec<Checkpoint>,
    /// Where every agent starts.
    pub start: Pose,
}

/// Binary drivability raster with checkpoint gates and a start pose.
#[derive(Debug, Clone)]
pub struct Track {
    /// `true` where the surface is drivable, indexed `[row, column]`.
    mask: Array2<bool>,
    checkpoints: Vec<Checkpoint>,
    start: Pose,
}

impl Track {
    /// Builds a track from a raster mask.
    pub fn new(mask: Array2<bool>, checkpoints: Vec<Checkpoint>, start: Pose) -> Result<Self> {
        if mask.is_empty() {
            return Err(Error::InvalidTrack("raster must not be empty".into()));
        }
        if checkpoints.is_empty() {
            return Err(Error::InvalidTrack("at least one checkpoint is required".into()));
        }
        Ok(Self {
            mask,
            checkpoints,
            start: Pose::new(start.x, start.y, start.heading),
        })
    }

    /// Builds a track from ASCII rows.
    pub fn from_ascii<S: AsRef<str>>(
        rows: &[S],
        checkpoints: Vec<Checkpoint>,
        start: Pose,
    ) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        let mut mask = Array2::from_elem((height, width), false);

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(Error::InvalidTrack(format!(
                    "row {y} has {} cells, expected {width}",
                    row.chars().count()
                )));
            }
            for (x, cell) in row.chars().enumerate() {
                mask[[y, x]] = match cell {
                    '#' => false,
                    '.' | ' ' => true,
                    other => {
                        return Err(Error::InvalidTrack(format!(
                            "unexpected cell {other:?} at ({x}, {y})"
                        )));
                    }
                };
            }
        }

        Self::new(mask, checkpoints, start)
    }

    /// Procedural elliptical ring track.
    ///
    /// The ring is `track_width` wide and touches the raster border with a
    /// small margin. Agents start at the bottom of the ring heading along it,
    /// and `gates` checkpoints are spread evenly in driving order, the last
    /// one sitting on the start line.
    pub fn oval(width: usize, height: usize, track_width: f32, gates: usize) -> Result<Self> {
        if gates == 0 {
            return Err(Error::InvalidTrack("at least one checkpoint is required".into()));
        }
        let margin = 2.0;
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let outer = (cx - margin, cy - margin);
        let inner = (outer.0 - track_width, outer.1 - track_width);
        if inner.0 <= 0.0 || inner.1 <= 0.0 {
            return Err(Error::InvalidTrack(format!(
                "track width {track_width} does not fit a {width}x{height} raster"
            )));
        }

        let inside = |x: f32, y: f32, (rx, ry): (f32, f32)| {
            let dx = (x - cx) / rx;
            let dy = (y - cy) / ry;
            dx * dx + dy * dy <= 1.0
        };
        let mask = Array2::from_shape_fn((height, width), |(row, col)| {
            let x = col as f32 + 0.5;
            let y = row as f32 + 0.5;
            inside(x, y, outer) && !inside(x, y, inner)
        });

        let mid = (outer.0 - track_width / 2.0, outer.1 - track_width / 2.0);
        let start_angle = std::f32::consts::FRAC_PI_2;
        let step = std::f32::consts::TAU / gates as f32;
        // Shrink gates slightly so their endpoints stay on the surface.
        let inset = 1.0;
        let checkpoints = (1..=gates)
            .map(|k| {
                let angle = start_angle + step * k as f32;
                let (cos, sin) = (angle.cos(), angle.sin());
                Checkpoint::new(
                    cx + (inner.0 + inset) * cos,
                    cy + (inner.1 + inset) * sin,
                    cx + (outer.0 - inset) * cos,
                    cy + (outer.1 - inset) * sin,
                )
            })
            .collect();

        // At the bottom of the ring the direction of travel is -x.
        let start = Pose::new(cx, cy + mid.1, 180.0);
        Self::new(mask, checkpoints, start)
    }

    /// Builds a track from its on-disk description.
    pub fn from_track_file(file: &TrackFile) -> Result<Self> {
        Self::from_ascii(&file.rows, file.checkpoints.clone(), file.start)
    }

    /// Loads a track from a JSON file.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let file: TrackFile = serde_json::from_str(&json)?;
        Self::from_track_file(&file)
    }

    /// Raster width in cells.
    pub fn width(&self) -> usize {
        self.mask.ncols()
    }

    /// Raster height in cells.
    pub fn height(&self) -> usize {
        self.mask.nrows()
    }

    /// Drivability of an integer raster cell, or `None` outside the raster.
    #[inline]
    pub fn is_drivable(&self, x: i64, y: i64) -> Option<bool> {
        if x < 0 || y < 0 {
            return None;
        }
        self.mask.get([y as usize, x as usize]).copied()
    }

    /// Drivability of the cell containing a continuous point.
    #[inline]
    pub fn is_drivable_at(&self, x: f32, y: f32) -> Option<bool> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        self.is_drivable(x.floor() as i64, y.floor() as i64)
    }

    /// Gates in driving order.
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Start pose shared by every agent.
    pub fn start(&self) -> Pose {
        self.start
    }
}
