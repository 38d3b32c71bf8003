//! 3D line segment, shaped after the teacher's chainable `LineSegment`
//! (`examples/nical-lyon/geom/src/line.rs`) but concrete `f64`/3D instead of
//! generic-`Scalar`/2D.

use crate::vec3::Vec3;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LineSegment3 {
    pub from: Vec3,
    pub to: Vec3,
}

impl LineSegment3 {
    pub fn new(from: Vec3, to: Vec3) -> LineSegment3 {
        LineSegment3 { from, to }
    }

    pub fn sample(&self, t: f64) -> Vec3 {
        self.from.lerp(self.to, t)
    }

    pub fn direction(&self) -> Vec3 {
        self.to - self.from
    }

    pub fn length(&self) -> f64 {
        self.direction().magnitude()
    }

    pub fn flip(&self) -> LineSegment3 {
        LineSegment3 { from: self.to, to: self.from }
    }

    /// Closest point on the (infinite) line through this segment to `p`,
    /// along with the parameter `t` at which it occurs.
    pub fn closest_point_to(&self, p: Vec3) -> (Vec3, f64) {
        let d = self.direction();
        let len_sq = d.mag_squared();
        if len_sq < 1e-20 {
            return (self.from, 0.0);
        }
        let t = (p - self.from).dot(d) / len_sq;
        (self.sample(t), t)
    }

    pub fn distance_to_point(&self, p: Vec3) -> f64 {
        let (closest, _) = self.closest_point_to(p);
        (p - closest).magnitude()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec3::vec3;

    #[test]
    fn closest_point_projects_onto_segment_line() {
        let seg = LineSegment3::new(vec3(0.0, 0.0, 0.0), vec3(10.0, 0.0, 0.0));
        let (closest, t) = seg.closest_point_to(vec3(4.0, 3.0, 0.0));
        assert!(closest.approx_eq(vec3(4.0, 0.0, 0.0), 1e-12));
        assert!((t - 0.4).abs() < 1e-12);
    }

    #[test]
    fn distance_to_point_is_perpendicular_offset() {
        let seg = LineSegment3::new(vec3(0.0, 0.0, 0.0), vec3(1.0, 0.0, 0.0));
        assert!((seg.distance_to_point(vec3(0.5, 2.0, 0.0)) - 2.0).abs() < 1e-12);
    }
}
