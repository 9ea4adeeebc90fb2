//! Axis-aligned scene bound and slab-method ray intersection.

use glam::Vec3;

use crate::ray::Ray;

/// Lower corner of the fixed scene bound.
pub const SCENE_MIN: Vec3 = Vec3::new(-1.1, -0.1, -0.1);
/// Upper corner of the fixed scene bound.
pub const SCENE_MAX: Vec3 = Vec3::new(1.1, 2.1, 2.1);

/// The bound every camera ray is clipped against before marching.
#[must_use]
pub fn scene_bounds() -> Aabb {
    Aabb {
        min: SCENE_MIN,
        max: SCENE_MAX,
    }
}

/// Visible parametric span of a ray inside a box, `t_near <= t_far`,
/// `t_near >= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub t_near: f32,
    pub t_far: f32,
}

impl Interval {
    /// Marchable distance inside the box.
    #[must_use]
    pub fn length(&self) -> f32 {
        self.t_far - self.t_near
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Slab-method intersection. `None` is the no-intersection sentinel; the
    /// caller never sees an error or an inverted interval.
    #[must_use]
    pub fn intersect(&self, ray: &Ray) -> Option<Interval> {
        let mut t_near = f32::NEG_INFINITY;
        let mut t_far = f32::INFINITY;

        for axis in 0..3 {
            let inv = 1.0 / ray.direction[axis];
            let t0 = (self.min[axis] - ray.origin[axis]) * inv;
            let t1 = (self.max[axis] - ray.origin[axis]) * inv;
            // min/max drop a NaN produced by a ray lying exactly on a slab
            // plane with zero direction on that axis.
            t_near = t_near.max(t0.min(t1));
            t_far = t_far.min(t0.max(t1));
        }

        if t_far >= t_near && t_far >= 0.0 {
            Some(Interval {
                t_near: t_near.max(0.0),
                t_far,
            })
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}
