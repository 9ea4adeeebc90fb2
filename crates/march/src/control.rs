//! Closed-loop control of the marching coarseness.
//!
//! The controller runs exactly once per frame boundary, strictly serialized
//! between one frame's completion and the next frame's dispatch. It is the
//! sole writer of the performance state; per-pixel work only ever sees the
//! immutable snapshot published here.

use std::collections::VecDeque;

use crate::marcher::{MAX_STEP, MIN_STEP};

/// Bounded frame-time history window.
pub const HISTORY_CAPACITY: usize = 10;
/// Consecutive in-band frames required before quality is refined.
pub const STABLE_FRAMES_FOR_REFINE: u32 = 15;

/// Emergency fires when effective FPS drops below this fraction of target.
const EMERGENCY_HEADROOM: f32 = 0.95;
/// Single-frame emergency coarsening is capped at this factor.
const EMERGENCY_MAX_FACTOR: f32 = 2.0;
/// Sustained degrade: history average beyond this ratio of the target.
const DEGRADE_RATIO: f32 = 1.1;
const DEGRADE_FACTOR: f32 = 1.1;
/// Gradual improve: history average below this ratio of the target.
const IMPROVE_RATIO: f32 = 0.8;
const REFINE_FACTOR: f32 = 0.92;
/// Frame times beyond this are treated as timer glitches, not load.
const MAX_SANE_FRAME_TIME: f32 = 1.0;

/// Read-only snapshot visible to all per-pixel work of one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceState {
    /// Global step coarseness, always within `[MIN_STEP, MAX_STEP]`.
    pub base_voxel_size: f32,
    /// The most recent accepted frame time, seconds.
    pub frame_time: f32,
}

/// Feedback controller retuning `base_voxel_size` from measured frame times.
pub struct PerformanceController {
    target_fps: f32,
    base_voxel_size: f32,
    frame_time: f32,
    history: VecDeque<f32>,
    stable_frames: u32,
}

impl PerformanceController {
    #[must_use]
    pub fn new(target_fps: f32) -> Self {
        Self {
            target_fps,
            base_voxel_size: 0.02,
            frame_time: 1.0 / target_fps,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            stable_frames: 0,
        }
    }

    #[must_use]
    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    #[must_use]
    pub fn base_voxel_size(&self) -> f32 {
        self.base_voxel_size
    }

    /// The snapshot handed to the next frame's dispatch.
    #[must_use]
    pub fn snapshot(&self) -> PerformanceState {
        PerformanceState {
            base_voxel_size: self.base_voxel_size,
            frame_time: self.frame_time,
        }
    }

    /// Feed one measured frame time and publish the next frame's snapshot.
    ///
    /// Decision priority: emergency coarsening on the single latest frame,
    /// sustained degrade on the history average, gradual refinement only
    /// after a stability streak, otherwise hold. Anomalous samples (zero,
    /// negative, non-finite, or absurdly long, e.g. the very first frame)
    /// are discounted entirely.
    pub fn update(&mut self, frame_time: f32) -> PerformanceState {
        if !frame_time.is_finite() || frame_time <= 0.0 || frame_time > MAX_SANE_FRAME_TIME {
            tracing::trace!(frame_time, "discarding anomalous frame time");
            return self.snapshot();
        }

        self.frame_time = frame_time;
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
        }
        self.history.push_back(frame_time);

        let target_frame_time = 1.0 / self.target_fps;

        if frame_time > 1.0 / (EMERGENCY_HEADROOM * self.target_fps) {
            // React within a single frame; waiting for the average to move
            // would smear the stutter over the whole window.
            let factor = (frame_time / target_frame_time).min(EMERGENCY_MAX_FACTOR);
            self.base_voxel_size = (self.base_voxel_size * factor).clamp(MIN_STEP, MAX_STEP);
            self.stable_frames = 0;
            tracing::warn!(
                fps = 1.0 / frame_time,
                base_voxel_size = self.base_voxel_size,
                "emergency coarsening"
            );
            return self.snapshot();
        }

        let average = self.average_frame_time();
        if average > DEGRADE_RATIO * target_frame_time {
            self.base_voxel_size = (self.base_voxel_size * DEGRADE_FACTOR).clamp(MIN_STEP, MAX_STEP);
            self.stable_frames = 0;
            tracing::debug!(
                avg_fps = 1.0 / average,
                base_voxel_size = self.base_voxel_size,
                "sustained degrade, coarsening"
            );
        } else if average < IMPROVE_RATIO * target_frame_time
            && self.stable_frames >= STABLE_FRAMES_FOR_REFINE
        {
            self.base_voxel_size = (self.base_voxel_size * REFINE_FACTOR).clamp(MIN_STEP, MAX_STEP);
            self.stable_frames = 0;
            tracing::debug!(
                avg_fps = 1.0 / average,
                base_voxel_size = self.base_voxel_size,
                "headroom available, refining"
            );
        } else {
            self.stable_frames += 1;
        }

        self.snapshot()
    }

    fn average_frame_time(&self) -> f32 {
        if self.history.is_empty() {
            return 1.0 / self.target_fps;
        }
        #[allow(clippy::cast_precision_loss)]
        let len = self.history.len() as f32;
        self.history.iter().sum::<f32>() / len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn snapshot_starts_within_bounds() {
        let controller = PerformanceController::new(60.0);
        let state = controller.snapshot();
        assert!(state.base_voxel_size >= MIN_STEP);
        assert!(state.base_voxel_size <= MAX_STEP);
    }

    #[test]
    fn on_target_frame_times_reach_a_fixed_point() {
        let mut controller = PerformanceController::new(60.0);
        let on_target = 1.0 / 60.0;
        let before = controller.base_voxel_size();
        for _ in 0..200 {
            controller.update(on_target);
        }
        assert_relative_eq!(controller.base_voxel_size(), before);
    }

    #[test]
    fn emergency_fires_on_the_first_bad_frame() {
        let mut controller = PerformanceController::new(60.0);
        // Prime the history with perfectly good frames.
        for _ in 0..50 {
            controller.update(1.0 / 60.0);
        }
        let before = controller.base_voxel_size();

        // One frame below 95% of target must coarsen immediately.
        let state = controller.update(1.0 / 50.0);
        assert!(state.base_voxel_size > before);
    }

    #[test]
    fn emergency_factor_is_capped_at_two() {
        let mut controller = PerformanceController::new(60.0);
        let before = controller.base_voxel_size();
        controller.update(0.5); // 2 FPS, thirty times over budget
        assert!(controller.base_voxel_size() <= (before * 2.0).min(MAX_STEP) + f32::EPSILON);
    }

    #[test]
    fn coarseness_never_leaves_the_valid_range() {
        let mut controller = PerformanceController::new(60.0);
        for _ in 0..100 {
            controller.update(0.9); // persistently terrible
            assert!(controller.base_voxel_size() <= MAX_STEP);
        }
        for _ in 0..2000 {
            controller.update(1.0 / 400.0); // persistently excellent
            assert!(controller.base_voxel_size() >= MIN_STEP);
        }
    }

    #[test]
    fn sustained_degrade_uses_the_average() {
        let mut controller = PerformanceController::new(60.0);
        // One slow frame lands in the history through the emergency branch...
        controller.update(0.025);
        let after_emergency = controller.base_voxel_size();

        // ...then a frame below the emergency threshold. The average is still
        // above 1.1x target, so the sustained-degrade branch coarsens again.
        let calm = 1.0 / (0.95 * 60.0) - 1e-4;
        controller.update(calm);
        assert!(controller.base_voxel_size() > after_emergency);
    }

    #[test]
    fn refinement_requires_a_stability_streak() {
        let mut controller = PerformanceController::new(60.0);
        let before = controller.base_voxel_size();

        // Fast frames put the average in the improve band immediately, yet
        // nothing may change before the stability streak matures.
        let fast = 0.5 / 60.0;
        for _ in 0..STABLE_FRAMES_FOR_REFINE {
            controller.update(fast);
            assert_relative_eq!(controller.base_voxel_size(), before);
        }

        // The streak is now mature; the next fast frame refines.
        controller.update(fast);
        assert!(controller.base_voxel_size() < before);
    }

    #[test]
    fn anomalous_samples_are_discounted() {
        let mut controller = PerformanceController::new(60.0);
        let before = controller.snapshot();

        assert_eq!(controller.update(0.0), before);
        assert_eq!(controller.update(-1.0), before);
        assert_eq!(controller.update(f32::NAN), before);
        assert_eq!(controller.update(30.0), before); // startup hiccup
    }

    #[test]
    fn history_is_a_bounded_ring() {
        let mut controller = PerformanceController::new(60.0);
        // Two admissible-but-awful frames dominate the average and pin the
        // controller in the degrade band as long as they stay in the window.
        controller.update(0.9);
        controller.update(0.9);
        assert_relative_eq!(controller.base_voxel_size(), MAX_STEP);

        let fast = 0.5 / 60.0;
        for _ in 0..HISTORY_CAPACITY - 2 {
            controller.update(fast);
            // Still degrading (clamped): the slow frames are in the window.
            assert_relative_eq!(controller.base_voxel_size(), MAX_STEP);
        }

        // Further fast frames evict the outliers; the average drops into the
        // improve band and, once the streak matures, quality refines -
        // impossible unless the ring actually forgot the outliers.
        for _ in 0..STABLE_FRAMES_FOR_REFINE + 2 {
            controller.update(fast);
        }
        assert!(controller.base_voxel_size() < MAX_STEP);
    }
}
