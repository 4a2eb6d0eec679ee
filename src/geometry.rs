//! Planar geometry used to place ports of nested circuits.
//!
//! Every composite instance embeds its circuit through a [`Transform`]: the
//! child's local frame is reflected about its X axis (optionally), rotated
//! about the local origin and finally translated to the instance origin.

use serde::Deserialize;
use std::fmt;

/// Tolerance used when comparing positions produced by transforms.
pub const POSITION_TOLERANCE: f64 = 1e-9;

/// A point in a circuit's coordinate frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Component-wise comparison within [`POSITION_TOLERANCE`].
    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() <= POSITION_TOLERANCE
            && (self.y - other.y).abs() <= POSITION_TOLERANCE
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Placement of a child circuit inside its parent.
///
/// Applied as: reflect about the local X axis when `reflect_x` is set, rotate
/// counter-clockwise by `rotation` degrees about the local origin, then
/// translate by `origin`.
///
/// # Example
///
/// ```
/// use pathlen::geometry::{Point, Transform};
///
/// let t = Transform::new(Point::new(10.0, 0.0), 90.0, false);
/// assert!(t.apply(Point::new(1.0, 0.0)).approx_eq(&Point::new(10.0, 1.0)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub origin: Point,
    pub rotation: f64,
    #[serde(alias = "mirror", alias = "x_reflection")]
    pub reflect_x: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        origin: Point::ORIGIN,
        rotation: 0.0,
        reflect_x: false,
    };

    pub fn new(origin: Point, rotation: f64, reflect_x: bool) -> Self {
        Self {
            origin,
            rotation,
            reflect_x,
        }
    }

    /// Pure translation.
    pub fn translation(x: f64, y: f64) -> Self {
        Self::new(Point::new(x, y), 0.0, false)
    }

    /// Map a point from the child frame into the parent frame.
    pub fn apply(&self, point: Point) -> Point {
        let y = if self.reflect_x { -point.y } else { point.y };
        let (cos, sin) = cos_sin_degrees(self.rotation);
        Point {
            x: point.x * cos - y * sin + self.origin.x,
            y: point.x * sin + y * cos + self.origin.y,
        }
    }

    /// The transform equivalent to applying `self` first and then `outer`.
    pub fn then(&self, outer: &Transform) -> Transform {
        // Reflection conjugates rotation: F * R(a) = R(-a) * F
        let rotation = if outer.reflect_x {
            outer.rotation - self.rotation
        } else {
            outer.rotation + self.rotation
        };
        Transform {
            origin: outer.apply(self.origin),
            rotation: rotation.rem_euclid(360.0),
            reflect_x: self.reflect_x ^ outer.reflect_x,
        }
    }
}

/// Cosine and sine of an angle in degrees, exact on multiples of 90°.
fn cos_sin_degrees(degrees: f64) -> (f64, f64) {
    let normalised = degrees.rem_euclid(360.0);
    if normalised == 0.0 {
        (1.0, 0.0)
    } else if normalised == 90.0 {
        (0.0, 1.0)
    } else if normalised == 180.0 {
        (-1.0, 0.0)
    } else if normalised == 270.0 {
        (0.0, -1.0)
    } else {
        let radians = normalised.to_radians();
        (radians.cos(), radians.sin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_leaves_points_alone() {
        let p = Point::new(3.5, -2.0);
        assert_eq!(Transform::IDENTITY.apply(p), p);
    }

    #[test]
    fn reflection_happens_before_rotation() {
        // (1, 1) -> reflect -> (1, -1) -> rotate 90 -> (1, 1) -> translate
        let t = Transform::new(Point::new(5.0, 5.0), 90.0, true);
        assert!(t.apply(Point::new(1.0, 1.0)).approx_eq(&Point::new(6.0, 6.0)));
    }

    #[test]
    fn quarter_turns_are_exact() {
        let t = Transform::new(Point::ORIGIN, -90.0, false);
        assert_eq!(t.apply(Point::new(2.0, 0.0)), Point::new(0.0, -2.0));
        let t = Transform::new(Point::ORIGIN, 540.0, false);
        assert_eq!(t.apply(Point::new(2.0, 1.0)), Point::new(-2.0, -1.0));
    }

    #[test]
    fn arbitrary_angle() {
        let t = Transform::new(Point::ORIGIN, 45.0, false);
        let p = t.apply(Point::new(1.0, 0.0));
        let h = std::f64::consts::FRAC_1_SQRT_2;
        assert!(p.approx_eq(&Point::new(h, h)));
    }

    #[test]
    fn composition_matches_sequential_application() {
        let inner = Transform::new(Point::new(1.0, 2.0), 30.0, true);
        let outer = Transform::new(Point::new(-4.0, 7.5), 90.0, true);
        let composed = inner.then(&outer);

        for p in [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(-3.0, 2.5),
        ] {
            assert!(composed.apply(p).approx_eq(&outer.apply(inner.apply(p))));
        }
    }

    #[test]
    fn point_from_pair() {
        let p: Point = [1.0, 2.0].into();
        assert_eq!(p, Point::new(1.0, 2.0));
        assert_eq!(p.to_string(), "(1, 2)");
    }
}
