//! Numeric 3D vector/point arithmetic.
//!
//! Shaped after the teacher's `LineSegment`/`Triangle` method style
//! (`examples/nical-lyon/geom/src/line.rs`, `triangle.rs`) — small `Copy`
//! structs with chainable combinators — generalized from 2D `euclid::Point`
//! to a concrete 3D `f64` vector, since the engine works in 64-bit float
//! throughout (spec §4.1) and has no need for `lyon_geom`'s generic `Scalar`
//! parameter.

use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

pub fn vec3(x: f64, y: f64, z: f64) -> Vec3 {
    Vec3 { x, y, z }
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Vec3 {
        Vec3 { x, y, z }
    }

    pub fn dot(&self, b: Vec3) -> f64 {
        self.x * b.x + self.y * b.y + self.z * b.z
    }

    pub fn cross(&self, b: Vec3) -> Vec3 {
        vec3(
            self.y * b.z - self.z * b.y,
            self.z * b.x - self.x * b.z,
            self.x * b.y - self.y * b.x,
        )
    }

    pub fn mag_squared(&self) -> f64 {
        self.dot(*self)
    }

    pub fn magnitude(&self) -> f64 {
        self.mag_squared().sqrt()
    }

    pub fn with_magnitude(&self, s: f64) -> Vec3 {
        let m = self.magnitude();
        if m < 1e-20 {
            return Vec3::ZERO;
        }
        *self * (s / m)
    }

    pub fn normalize(&self) -> Vec3 {
        self.with_magnitude(1.0)
    }

    pub fn scaled_by(&self, s: f64) -> Vec3 {
        *self * s
    }

    pub fn lerp(&self, b: Vec3, t: f64) -> Vec3 {
        *self + (b - *self) * t
    }

    /// Component furthest from the origin on each axis across `vmax`/`vmin`,
    /// matching `SMesh::DoBounding` (`examples/original_source/mesh.cpp`).
    pub fn expand_bounds(&self, vmax: &mut Vec3, vmin: &mut Vec3) {
        vmax.x = vmax.x.max(self.x);
        vmax.y = vmax.y.max(self.y);
        vmax.z = vmax.z.max(self.z);
        vmin.x = vmin.x.min(self.x);
        vmin.y = vmin.y.min(self.y);
        vmin.z = vmin.z.min(self.z);
    }

    pub fn equals_exactly(&self, b: Vec3) -> bool {
        self.x == b.x && self.y == b.y && self.z == b.z
    }

    pub fn approx_eq(&self, b: Vec3, tol: f64) -> bool {
        (*self - b).magnitude() < tol
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        vec3(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        vec3(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f64) -> Vec3 {
        vec3(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f64> for Vec3 {
    type Output = Vec3;
    fn div(self, s: f64) -> Vec3 {
        vec3(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        vec3(-self.x, -self.y, -self.z)
    }
}

/// Axis-aligned bounding box, accumulated with [`Vec3::expand_bounds`].
#[derive(Copy, Clone, Debug)]
pub struct Bbox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bbox {
    pub fn empty() -> Bbox {
        Bbox {
            min: vec3(1e12, 1e12, 1e12),
            max: vec3(-1e12, -1e12, -1e12),
        }
    }

    pub fn of_points<'a>(pts: impl IntoIterator<Item = &'a Vec3>) -> Bbox {
        let mut b = Bbox::empty();
        for p in pts {
            p.expand_bounds(&mut b.max, &mut b.min);
        }
        b
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn grow(&mut self, other: &Bbox) {
        other.min.expand_bounds(&mut self.max, &mut self.min);
        other.max.expand_bounds(&mut self.max, &mut self.min);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_product_is_perpendicular() {
        let a = vec3(1.0, 0.0, 0.0);
        let b = vec3(0.0, 1.0, 0.0);
        let c = a.cross(b);
        assert!(c.approx_eq(vec3(0.0, 0.0, 1.0), 1e-12));
        assert!(c.dot(a).abs() < 1e-12);
        assert!(c.dot(b).abs() < 1e-12);
    }

    #[test]
    fn with_magnitude_scales_to_requested_length() {
        let v = vec3(3.0, 4.0, 0.0).with_magnitude(10.0);
        assert!((v.magnitude() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn bbox_accumulates_points() {
        let pts = [vec3(1.0, -2.0, 0.0), vec3(-1.0, 5.0, 3.0)];
        let b = Bbox::of_points(&pts);
        assert_eq!(b.min, vec3(-1.0, -2.0, 0.0));
        assert_eq!(b.max, vec3(1.0, 5.0, 3.0));
    }
}
