//! The per-ray marching state machine.
//!
//! A ray moves through `Entering -> Marching -> {Hit | Exhausted}`, or goes
//! straight to `Missed` when the scene bound is never crossed. The step
//! transition is a pure function of the current state and the frame-global
//! inputs, so every path through the machine is testable without a dispatch
//! context.

use glam::Vec3;

use crate::bounds::{Aabb, Interval};
use crate::composite::Accumulated;
use crate::control::PerformanceState;
use crate::ray::Ray;
use crate::sample::{SceneSampler, VoxelSample};

/// Hard cap on marching iterations per ray.
pub const MAX_MARCH_STEPS: u32 = 500;
/// Samples above this density terminate the ray as an opaque hit.
pub const OPAQUE_THRESHOLD: f32 = 0.5;
/// Smallest permitted marching step.
pub const MIN_STEP: f32 = 0.005;
/// Largest permitted marching step.
pub const MAX_STEP: f32 = 0.05;

/// Background gradient color at the top row.
pub const SKY: Vec3 = Vec3::new(0.5, 0.7, 0.9);
/// Background gradient color at the bottom row.
pub const HORIZON: Vec3 = Vec3::new(0.1, 0.2, 0.4);

/// Step length for the current position: the frame-global coarseness scaled
/// up with distance from the camera, clamped into the valid range.
#[must_use]
pub fn adaptive_step(base_voxel_size: f32, distance_from_camera: f32) -> f32 {
    (base_voxel_size * (1.0 + 0.1 * distance_from_camera)).clamp(MIN_STEP, MAX_STEP)
}

/// Mutable marching position while in the `Marching` state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cursor {
    pub position: Vec3,
    pub traveled: f32,
    /// Length of the box interval; marching past it exhausts the ray.
    pub max_distance: f32,
    pub steps: u32,
    pub accumulated: Accumulated,
}

/// One ray's progress through the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MarchState {
    /// A valid box interval was found; marching has not begun.
    Entering(Interval),
    Marching(Cursor),
    /// Terminal: an opaque sample was found. Its color is emitted directly,
    /// bypassing the compositor.
    Hit(VoxelSample),
    /// Terminal: iteration or distance budget ran out.
    Exhausted(Accumulated),
    /// Terminal: the ray never crosses the scene bound.
    Missed,
}

impl MarchState {
    /// Clip the ray against the bound: `Entering` on a valid interval,
    /// `Missed` otherwise.
    #[must_use]
    pub fn begin(ray: &Ray, bounds: &Aabb) -> Self {
        match bounds.intersect(ray) {
            Some(interval) => Self::Entering(interval),
            None => Self::Missed,
        }
    }

    /// Pure per-step transition. Terminal states return themselves.
    #[must_use]
    pub fn step(self, ray: &Ray, sampler: &SceneSampler, perf: &PerformanceState) -> Self {
        match self {
            Self::Entering(interval) => Self::Marching(Cursor {
                position: ray.at(interval.t_near),
                traveled: 0.0,
                max_distance: interval.length(),
                steps: 0,
                accumulated: Accumulated::CLEAR,
            }),
            Self::Marching(mut cursor) => {
                if cursor.steps >= MAX_MARCH_STEPS || cursor.traveled >= cursor.max_distance {
                    return Self::Exhausted(cursor.accumulated);
                }

                let distance_from_camera = cursor.position.distance(ray.origin);
                let step = adaptive_step(perf.base_voxel_size, distance_from_camera);

                let sample = sampler.sample(cursor.position);
                if sample.alpha > OPAQUE_THRESHOLD {
                    return Self::Hit(sample);
                }

                cursor.accumulated = cursor.accumulated.composite(&sample, step);
                cursor.position += ray.direction * step;
                cursor.traveled += step;
                cursor.steps += 1;
                Self::Marching(cursor)
            }
            terminal => terminal,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Hit(_) | Self::Exhausted(_) | Self::Missed)
    }
}

/// Drive one ray to its terminal state.
///
/// Termination is guaranteed by the iteration cap even when the step clamps
/// to its minimum: the loop runs at most `MAX_MARCH_STEPS` sampling steps
/// plus the two bookkeeping transitions.
#[must_use]
pub fn march(ray: &Ray, bounds: &Aabb, sampler: &SceneSampler, perf: &PerformanceState) -> MarchState {
    let mut state = MarchState::begin(ray, bounds);
    while !state.is_terminal() {
        state = state.step(ray, sampler, perf);
    }
    state
}

/// Background gradient for rays that miss the scene bound, blended by the
/// normalized row coordinate (zero at the top).
#[must_use]
pub fn background(row: f32) -> [f32; 4] {
    let color = SKY.lerp(HORIZON, row.clamp(0.0, 1.0));
    [color.x, color.y, color.z, 1.0]
}

/// Resolve a terminal state into the pixel's RGBA color.
///
/// `Exhausted` resolves the accumulation over opaque black, which is exactly
/// `(0, 0, 0, 1)` for an empty interior.
#[must_use]
pub fn shade(terminal: &MarchState, row: f32) -> [f32; 4] {
    match terminal {
        MarchState::Hit(sample) => [sample.color.x, sample.color.y, sample.color.z, 1.0],
        MarchState::Exhausted(accumulated) => accumulated.over_black(),
        MarchState::Missed => background(row),
        // Non-terminal states only reach here through misuse; resolve them
        // like an exhausted ray instead of failing.
        MarchState::Entering(_) | MarchState::Marching(_) => Accumulated::CLEAR.over_black(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::scene_bounds;
    use crate::control::PerformanceState;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn perf(base: f32) -> PerformanceState {
        PerformanceState {
            base_voxel_size: base,
            frame_time: 1.0 / 60.0,
        }
    }

    #[test]
    fn step_stays_in_bounds_for_any_distance() {
        for base in [0.005, 0.01, 0.02, 0.05] {
            for distance in [0.0, 0.5, 1.0, 4.0, 100.0] {
                let step = adaptive_step(base, distance);
                assert!(step >= MIN_STEP);
                assert!(step <= MAX_STEP);
            }
        }
    }

    #[test]
    fn max_base_at_zero_distance_is_not_clamped_down() {
        assert_relative_eq!(adaptive_step(0.05, 0.0), 0.05);
    }

    #[test]
    fn step_grows_with_distance() {
        assert!(adaptive_step(0.01, 10.0) > adaptive_step(0.01, 0.0));
    }

    #[test]
    fn ray_pointing_away_is_missed_without_marching() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, -5.0), Vec3::NEG_Z);
        let state = MarchState::begin(&ray, &scene_bounds());
        assert_eq!(state, MarchState::Missed);
        assert!(state.is_terminal());
    }

    #[test]
    fn left_wall_is_hit_with_its_tint() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::NEG_X);
        let state = march(&ray, &scene_bounds(), &SceneSampler::Procedural, &perf(0.02));
        match state {
            MarchState::Hit(sample) => {
                assert_eq!(sample.color, Vec3::new(0.65, 0.05, 0.05));
                assert_eq!(shade(&state, 0.5), [0.65, 0.05, 0.05, 1.0]);
            }
            other => panic!("expected a hit, got {other:?}"),
        }
    }

    #[test]
    fn empty_traversal_exhausts_to_opaque_black() {
        // From the room center out through the open front face: the interval
        // is fully inside empty space, so the distance budget runs dry.
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::NEG_Z);
        let state = march(&ray, &scene_bounds(), &SceneSampler::Procedural, &perf(0.02));
        assert!(matches!(state, MarchState::Exhausted(_)));
        assert_eq!(shade(&state, 0.5), [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn termination_holds_at_minimum_step() {
        // A bound far larger than the room, a ray that never touches
        // geometry, and the smallest base size: the distance budget is
        // unreachable, so the iteration cap is the only thing stopping the
        // loop - and it must.
        let bounds = Aabb {
            min: Vec3::splat(-10.0),
            max: Vec3::splat(10.0),
        };
        let ray = Ray::new(Vec3::new(-9.0, 5.0, 1.0), Vec3::X);

        let mut state = MarchState::begin(&ray, &bounds);
        let mut transitions = 0u32;
        while !state.is_terminal() {
            state = state.step(&ray, &SceneSampler::Procedural, &perf(0.005));
            transitions += 1;
            assert!(transitions <= MAX_MARCH_STEPS + 2, "marcher failed to terminate");
        }
        assert!(matches!(state, MarchState::Exhausted(_)));
        assert_eq!(transitions, MAX_MARCH_STEPS + 2);
    }

    #[test]
    fn entering_transitions_before_sampling() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, -2.0), Vec3::Z);
        let entering = MarchState::begin(&ray, &scene_bounds());
        assert!(matches!(entering, MarchState::Entering(_)));

        let marching = entering.step(&ray, &SceneSampler::Procedural, &perf(0.02));
        match marching {
            MarchState::Marching(cursor) => {
                assert_eq!(cursor.steps, 0);
                assert_relative_eq!(cursor.traveled, 0.0);
                // Marching begins on the bound, not at the camera.
                assert_relative_eq!(cursor.position.z, -0.1, epsilon = 1e-5);
            }
            other => panic!("expected marching, got {other:?}"),
        }
    }

    #[test]
    fn terminal_states_are_fixed_points() {
        let ray = Ray::new(Vec3::new(0.0, 1.0, 1.0), Vec3::NEG_X);
        let terminal = march(&ray, &scene_bounds(), &SceneSampler::Procedural, &perf(0.02));
        let stepped = terminal.step(&ray, &SceneSampler::Procedural, &perf(0.02));
        assert_eq!(terminal, stepped);
    }

    #[test]
    fn background_gradient_endpoints() {
        assert_eq!(background(0.0), [0.5, 0.7, 0.9, 1.0]);
        assert_eq!(background(1.0), [0.1, 0.2, 0.4, 1.0]);

        let mid = background(0.5);
        assert_relative_eq!(mid[0], 0.3);
        assert_relative_eq!(mid[1], 0.45);
        assert_relative_eq!(mid[2], 0.65);
    }

    #[test]
    fn semi_transparent_grid_accumulates_through_the_compositor() {
        // A faint fog everywhere inside a small box: no sample crosses the
        // opaque threshold, so the march exhausts with accumulated haze.
        let grid = crate::DensityGrid::bake(
            [2, 2, 2],
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, 1.0, 2.0),
            |_| VoxelSample {
                color: Vec3::ONE,
                alpha: 0.4,
            },
        )
        .expect("bake");
        let sampler = SceneSampler::Grid(grid);
        let bounds = Aabb {
            min: Vec3::new(-1.0, -1.0, 0.0),
            max: Vec3::new(1.0, 1.0, 2.0),
        };

        let ray = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::Z);
        let state = march(&ray, &bounds, &sampler, &perf(0.02));
        match state {
            MarchState::Exhausted(accumulated) => {
                assert!(accumulated.alpha > 0.0);
                assert!(accumulated.alpha < 1.0);
                let shaded = shade(&state, 0.5);
                assert!(shaded[0] > 0.0);
                assert_eq!(shaded[3], 1.0);
            }
            other => panic!("expected exhaustion through fog, got {other:?}"),
        }
    }
}
