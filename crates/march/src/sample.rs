//! Scene sampling capability and the procedural room scene.
//!
//! The marcher only ever sees the [`SceneSampler::sample`] capability; which
//! concrete variant backs it is a per-frame configuration choice.

use glam::Vec3;

use crate::grid::DensityGrid;

/// Slab half-thickness shared by every wall of the procedural room.
pub const WALL_THICKNESS: f32 = 0.05;

const WHITE: Vec3 = Vec3::new(0.73, 0.73, 0.73);
const RED: Vec3 = Vec3::new(0.65, 0.05, 0.05);
const GREEN: Vec3 = Vec3::new(0.12, 0.45, 0.15);
const LAMP: Vec3 = Vec3::new(1.0, 1.0, 0.95);

/// One scene lookup: color plus density.
///
/// Ephemeral by design; produced fresh for every position queried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelSample {
    pub color: Vec3,
    pub alpha: f32,
}

impl VoxelSample {
    /// Empty space. Out-of-range lookups resolve to this, never to an error.
    pub const TRANSPARENT: Self = Self {
        color: Vec3::ZERO,
        alpha: 0.0,
    };

    #[must_use]
    pub const fn solid(color: Vec3) -> Self {
        Self { color, alpha: 1.0 }
    }
}

/// Rotate `offset` about +Y by the angle whose cosine and sine are given.
///
/// Passing the negated sine applies the inverse rotation, which is how a
/// query point is carried into a rotated prism's local frame.
#[must_use]
pub fn rotate_y(offset: Vec3, cos_a: f32, sin_a: f32) -> Vec3 {
    Vec3::new(
        offset.x * cos_a - offset.z * sin_a,
        offset.y,
        offset.x * sin_a + offset.z * cos_a,
    )
}

/// A rectangular prism standing on the floor, rotated about the vertical axis.
#[derive(Debug, Clone, Copy)]
struct Prism {
    center: Vec3,
    half_extents: Vec3,
    cos_a: f32,
    sin_a: f32,
}

impl Prism {
    fn contains(&self, position: Vec3) -> bool {
        let local = rotate_y(position - self.center, self.cos_a, self.sin_a);
        local.x.abs() <= self.half_extents.x
            && position.y >= 0.0
            && position.y <= self.half_extents.y * 2.0
            && local.z.abs() <= self.half_extents.z
    }
}

const TALL_PRISM: Prism = Prism {
    center: Vec3::new(-0.35, 0.3, 0.65),
    half_extents: Vec3::new(0.15, 0.3, 0.15),
    cos_a: 0.956,
    sin_a: -0.292,
};

const SHORT_PRISM: Prism = Prism {
    center: Vec3::new(0.35, 0.15, 1.35),
    half_extents: Vec3::new(0.15, 0.15, 0.15),
    cos_a: 0.956,
    sin_a: 0.292,
};

/// The scene lookup capability behind an explicit tagged variant.
pub enum SceneSampler {
    /// Hardcoded Cornell-room geometry, evaluated predicate by predicate.
    Procedural,
    /// Dense 3D field with trilinear reconstruction.
    Grid(DensityGrid),
}

impl SceneSampler {
    /// Total over all of R^3: positions outside any geometry return the
    /// transparent sample.
    #[must_use]
    pub fn sample(&self, position: Vec3) -> VoxelSample {
        match self {
            Self::Procedural => sample_room(position),
            Self::Grid(grid) => grid.sample(position),
        }
    }
}

/// Procedural room lookup. Predicates run in fixed priority order and the
/// first match wins.
fn sample_room(p: Vec3) -> VoxelSample {
    let t = WALL_THICKNESS;

    // Floor band, clipped to the room footprint.
    if p.y >= -t && p.y <= t && in_footprint(p) {
        return VoxelSample::solid(WHITE);
    }

    // Ceiling band with the emissive lamp inset.
    if p.y >= 2.0 - t && p.y <= 2.0 + t && in_footprint(p) {
        if p.x >= -0.25 && p.x <= 0.25 && p.z >= 0.75 && p.z <= 1.25 {
            return VoxelSample::solid(LAMP);
        }
        return VoxelSample::solid(WHITE);
    }

    // Back wall, over-extended so it meets the side walls and floor.
    if p.z >= 2.0 - t && p.z <= 2.0 + t && p.x >= -1.0 - t && p.x <= 1.0 + t && p.y >= -t && p.y <= 2.0 + t {
        return VoxelSample::solid(WHITE);
    }

    // Left wall.
    if p.x >= -1.0 - t && p.x <= -1.0 + t && p.z >= 0.0 && p.z <= 2.0 && p.y >= 0.0 && p.y <= 2.0 {
        return VoxelSample::solid(RED);
    }

    // Right wall.
    if p.x >= 1.0 - t && p.x <= 1.0 + t && p.z >= 0.0 && p.z <= 2.0 && p.y >= 0.0 && p.y <= 2.0 {
        return VoxelSample::solid(GREEN);
    }

    if TALL_PRISM.contains(p) || SHORT_PRISM.contains(p) {
        return VoxelSample::solid(WHITE);
    }

    VoxelSample::TRANSPARENT
}

fn in_footprint(p: Vec3) -> bool {
    p.x >= -1.0 && p.x <= 1.0 && p.z >= 0.0 && p.z <= 2.0
}
