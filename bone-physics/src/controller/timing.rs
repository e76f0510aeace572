// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Fixed-timestep accumulator

/// Converts variable frame times into a whole number of fixed sub-steps
///
/// Time that does not fill a whole sub-step, or that exceeds the sub-step cap,
/// stays in the accumulator for the next frame. The accumulator is kept in
/// `f64` so that long sessions do not drift.
///
/// After a stall the carried backlog is paid off at `max_substeps` per frame,
/// so a 2 s hitch at 60 Hz with a cap of 10 costs the following 12 frames a
/// full sub-step budget each. [`TimeAccumulator::limit_carry`] bounds that
/// backlog at the price of simulated time.
///
/// # Examples
///
/// ```
/// use bone_physics::controller::TimeAccumulator;
///
/// let mut timer = TimeAccumulator::new();
/// assert_eq!(timer.advance(0.025, 0.01, 10), 2);
/// assert!((timer.leftover() - 0.005).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimeAccumulator {
    accumulated: f64,
}

impl TimeAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `elapsed` seconds and take as many `tick`-long steps as allowed
    ///
    /// Negative or non-finite `elapsed` values are ignored. Returns the number
    /// of sub-steps to run this frame.
    pub fn advance(&mut self, elapsed: f32, tick: f32, max_substeps: u32) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulated += f64::from(elapsed);
        } else if elapsed != 0.0 {
            log::warn!("ignoring invalid frame time {elapsed}");
        }
        if !tick.is_finite() || tick <= 0.0 {
            return 0;
        }

        let tick = f64::from(tick);
        let available = (self.accumulated / tick).floor();
        let steps = available.min(f64::from(max_substeps)).max(0.0) as u32;
        self.accumulated -= f64::from(steps) * tick;
        steps
    }

    /// Drop carried time beyond `limit` seconds and return the amount dropped
    ///
    /// A non-positive or non-finite `limit` keeps everything.
    pub fn limit_carry(&mut self, limit: f64) -> f64 {
        if !limit.is_finite() || limit <= 0.0 || self.accumulated <= limit {
            return 0.0;
        }
        let dropped = self.accumulated - limit;
        self.accumulated = limit;
        dropped
    }

    /// Time carried into the next frame
    pub fn leftover(&self) -> f64 {
        self.accumulated
    }

    /// Drop the carried time
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}
