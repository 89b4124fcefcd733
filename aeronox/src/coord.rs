//! Local Cartesian coordinate system.
//!
//! Geometry for the noise model is solved on a flat plane tangent to a study
//! origin. Positions are WGS84 longitude/latitude in degrees; the projection
//! is accurate for the distances a single study covers (tens of kilometres
//! around an airport).

use serde::{Deserialize, Serialize};

use crate::PRECISION;

const EARTH_RADIUS: f64 = 6371000.0;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Where the perpendicular foot of a point falls relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    Behind,
    Between,
    Ahead,
}

/// Flat-plane projection around a study origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSystem {
    origin: Position,
}

impl CoordinateSystem {
    pub fn new(origin: Position) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    fn forward(&self, position: Position) -> (f64, f64) {
        let lat0 = self.origin.latitude.to_radians();
        let x = (position.longitude - self.origin.longitude).to_radians() * EARTH_RADIUS * lat0.cos();
        let y = (position.latitude - self.origin.latitude).to_radians() * EARTH_RADIUS;
        (x, y)
    }

    fn reverse(&self, x: f64, y: f64) -> Position {
        let lat0 = self.origin.latitude.to_radians();
        Position {
            longitude: self.origin.longitude + (x / (EARTH_RADIUS * lat0.cos())).to_degrees(),
            latitude: self.origin.latitude + (y / EARTH_RADIUS).to_degrees(),
        }
    }

    /// Ground distance between two positions in metres.
    pub fn distance(&self, a: Position, b: Position) -> f64 {
        let (ax, ay) = self.forward(a);
        let (bx, by) = self.forward(b);
        (bx - ax).hypot(by - ay)
    }

    /// Heading from `a` to `b` in degrees, north up, normalized to [0, 360).
    pub fn heading(&self, a: Position, b: Position) -> f64 {
        let (ax, ay) = self.forward(a);
        let (bx, by) = self.forward(b);
        // x and y swap places because 0 degrees points north
        normalize_heading((bx - ax).atan2(by - ay).to_degrees())
    }

    /// Perpendicular foot of `point` on the line through `p1`/`p2` and its
    /// location relative to the segment. A 5 cm tolerance around the segment
    /// ends keeps near-orthogonal cases classified as Between.
    pub fn intersection(&self, p1: Position, p2: Position, point: Position) -> (Position, Intersection) {
        let (x1, y1) = self.forward(p1);
        let (x2, y2) = self.forward(p2);
        let (x3, y3) = self.forward(point);

        let dx = x2 - x1;
        let dy = y2 - y1;
        let length_squared = dx * dx + dy * dy;
        if length_squared < PRECISION * PRECISION {
            return (p1, Intersection::Between);
        }

        let t = ((x3 - x1) * dx + (y3 - y1) * dy) / length_squared;
        let foot = self.reverse(x1 + t * dx, y1 + t * dy);

        let tolerance = 0.05 / length_squared.sqrt();
        let location = if t > -tolerance {
            if t < 1.0 + tolerance {
                Intersection::Between
            } else {
                Intersection::Ahead
            }
        } else {
            Intersection::Behind
        };

        (foot, location)
    }

    /// Which side of the track `p1 -> p2` the `point` lies on: 1 when a turn
    /// towards the point would be to the right, -1 when to the left.
    pub fn turn_direction(&self, p1: Position, p2: Position, point: Position) -> f64 {
        let difference = normalize_heading(self.heading(p2, point) - self.heading(p1, p2));
        if difference > 180.0 {
            -1.0
        } else {
            1.0
        }
    }
}

fn normalize_heading(heading: f64) -> f64 {
    let normalized = heading % 360.0;
    if normalized < 0.0 {
        normalized + 360.0
    } else {
        normalized
    }
}
