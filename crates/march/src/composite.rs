//! Exponential absorption compositing.
//!
//! Accumulation follows the Beer-Lambert law: each sample attenuates what is
//! already accumulated by `exp(-density)` and contributes the complement.
//! The opaque-hit shortcut in the marcher means the procedural scene never
//! reaches this path; it carries non-binary density fields.

use glam::Vec3;

use crate::sample::VoxelSample;

/// Samples below this density are skipped outright so that long runs of
/// near-empty space cannot drift the accumulator.
pub const NEGLIGIBLE_ALPHA: f32 = 0.01;

/// Running front-to-back accumulation state for one ray.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Accumulated {
    pub color: Vec3,
    /// Opacity accumulated so far. Non-decreasing, bounded in `[0, 1]`.
    pub alpha: f32,
}

impl Accumulated {
    pub const CLEAR: Self = Self {
        color: Vec3::ZERO,
        alpha: 0.0,
    };

    /// Fold one sample spanning `step_size` into the accumulation.
    #[must_use]
    pub fn composite(self, sample: &VoxelSample, step_size: f32) -> Self {
        if sample.alpha < NEGLIGIBLE_ALPHA {
            return self;
        }

        let density = sample.alpha * step_size;
        let transmission = (-density).exp();
        let absorption = 1.0 - transmission;

        Self {
            color: self.color * transmission + sample.color * absorption,
            alpha: self.alpha + (1.0 - self.alpha) * absorption,
        }
    }

    /// Resolve the accumulation against an opaque black backdrop.
    #[must_use]
    pub fn over_black(self) -> [f32; 4] {
        [self.color.x, self.color.y, self.color.z, 1.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn haze(alpha: f32) -> VoxelSample {
        VoxelSample {
            color: Vec3::new(0.9, 0.6, 0.3),
            alpha,
        }
    }

    #[test]
    fn negligible_density_is_a_no_op() {
        let acc = Accumulated {
            color: Vec3::new(0.2, 0.2, 0.2),
            alpha: 0.4,
        };
        assert_eq!(acc.composite(&haze(0.009), 0.05), acc);
        assert_eq!(acc.composite(&VoxelSample::TRANSPARENT, 0.05), acc);
    }

    #[test]
    fn alpha_is_monotone_and_bounded() {
        let mut acc = Accumulated::CLEAR;
        let mut previous = 0.0;
        for _ in 0..2000 {
            acc = acc.composite(&haze(0.5), 0.05);
            assert!(acc.alpha >= previous);
            assert!(acc.alpha <= 1.0);
            previous = acc.alpha;
        }
        // A long march through constant haze saturates.
        assert!(acc.alpha > 0.99);
    }

    #[test]
    fn color_stays_a_convex_combination() {
        // Compositing a single color from a clear state can approach but
        // never exceed that color.
        let mut acc = Accumulated::CLEAR;
        for _ in 0..1000 {
            acc = acc.composite(&haze(1.0), 0.05);
            for axis in 0..3 {
                assert!(acc.color[axis] >= 0.0);
                assert!(acc.color[axis] <= haze(1.0).color[axis] + 1e-6);
            }
        }
    }

    #[test]
    fn single_step_matches_the_attenuation_law() {
        let acc = Accumulated::CLEAR.composite(&haze(1.0), 0.05);
        let absorption = 1.0 - (-0.05f32).exp();
        assert_relative_eq!(acc.alpha, absorption, epsilon = 1e-6);
        assert_relative_eq!(acc.color.x, 0.9 * absorption, epsilon = 1e-6);
    }

    #[test]
    fn empty_accumulation_resolves_to_opaque_black() {
        assert_eq!(Accumulated::CLEAR.over_black(), [0.0, 0.0, 0.0, 1.0]);
    }
}
