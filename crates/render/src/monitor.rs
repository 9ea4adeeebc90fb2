//! Frame-time recording and report generation.
//!
//! Separate from the closed-loop controller in `march`: the monitor only
//! observes, it never steers. On exit it can dump a markdown report of the
//! session.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Sliding window used for the "current FPS" readout.
const WINDOW: usize = 120;

pub struct FrameMonitor {
    elapsed: f32,
    frame_times: VecDeque<f32>,
    /// Completed-second FPS history as `(second, frames)`.
    fps_history: Vec<(u32, u32)>,
    last_second: u32,
    frames_in_current_second: u32,
    pub total_frames: u32,
}

impl Default for FrameMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            elapsed: 0.0,
            frame_times: VecDeque::with_capacity(WINDOW),
            fps_history: Vec::new(),
            last_second: 0,
            frames_in_current_second: 0,
            total_frames: 0,
        }
    }

    /// Record one frame of `frame_time` seconds.
    pub fn record_frame(&mut self, frame_time: f32) {
        if self.frame_times.len() == WINDOW {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(frame_time);

        self.total_frames += 1;
        self.frames_in_current_second += 1;
        self.elapsed += frame_time;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let current_second = self.elapsed as u32;
        if current_second > self.last_second {
            self.fps_history.push((self.last_second, self.frames_in_current_second));
            self.last_second = current_second;
            self.frames_in_current_second = 0;
        }
    }

    /// FPS over the recent window.
    #[must_use]
    pub fn current_fps(&self) -> f32 {
        if self.frame_times.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let average = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        1.0 / average
    }

    /// FPS over the whole session.
    #[must_use]
    pub fn average_fps(&self) -> f32 {
        if self.elapsed > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let frames = self.total_frames as f32;
            frames / self.elapsed
        } else {
            0.0
        }
    }

    /// Write the session report as markdown.
    ///
    /// # Errors
    ///
    /// Propagates any I/O failure from creating or writing the file.
    pub fn write_report(&self, path: &Path) -> std::io::Result<()> {
        let mut file = File::create(path)?;

        writeln!(file, "# Performance Report")?;
        writeln!(file)?;
        writeln!(file, "## Summary")?;
        writeln!(file, "- **Total Runtime**: {:.2} seconds", self.elapsed)?;
        writeln!(file, "- **Total Frames**: {}", self.total_frames)?;
        writeln!(file, "- **Average FPS**: {:.2}", self.average_fps())?;
        writeln!(file, "- **Current FPS**: {:.2}", self.current_fps())?;

        if let (Some(best), Some(worst)) = (
            self.frame_times.iter().copied().reduce(f32::min),
            self.frame_times.iter().copied().reduce(f32::max),
        ) {
            writeln!(file, "- **Best Frame Time**: {:.2} ms ({:.2} FPS)", best * 1000.0, 1.0 / best)?;
            writeln!(file, "- **Worst Frame Time**: {:.2} ms ({:.2} FPS)", worst * 1000.0, 1.0 / worst)?;
        }

        writeln!(file)?;
        writeln!(file, "## FPS Per Second")?;
        writeln!(file)?;
        writeln!(file, "| Second | FPS |")?;
        writeln!(file, "|--------|-----|")?;
        for (second, fps) in &self.fps_history {
            writeln!(file, "| {second} | {fps} |")?;
        }
        if self.frames_in_current_second > 0 {
            writeln!(file, "| {} | {} |", self.last_second, self.frames_in_current_second)?;
        }

        Ok(())
    }
}
