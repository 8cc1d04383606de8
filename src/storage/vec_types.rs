//! Scene-space point and boundary-color types.

use std::ops::{Add, Mul};

use euclid::Point2D;

use crate::storage::coord_spaces::SceneSpace;

/// A point (or displacement) in the scene's mathematical plane.
pub type Vec2 = Point2D<f64, SceneSpace>;

/// A constant boundary color, or an accumulated/throughput-weighted sum of
/// boundary colors. Matches the HDR image's per-channel float precision.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { r: 0.0, g: 0.0, b: 0.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Vec3 {
        Vec3 { r, g, b }
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.r * s, self.g * s, self.b * s)
    }
}

/// Sample a point at distance `radius` from the origin at a uniformly random
/// angle, i.e. a point on the circle of the given radius.
pub fn sample_circle_point(radius: f64, uniform: f64) -> Vec2 {
    let theta = uniform * std::f64::consts::TAU;
    Vec2::new(radius * theta.cos(), radius * theta.sin())
}
