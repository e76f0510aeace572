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
//! Rolling tick statistics
//!
//! The simulation thread accumulates per-tick samples and, once per interval,
//! publishes the averages to a shared slot. Readers on other threads take a
//! copy through a [`ProfilerHandle`].

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Averages over the last completed interval
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfilerStats {
    /// Mean wall time spent inside a tick
    pub avg_tick_time: Duration,
    /// Mean number of simulated actors
    pub avg_actor_count: f32,
    /// Mean sub-steps per tick
    pub avg_steps_per_update: f32,
    /// Sub-steps per second of frame time
    pub avg_step_rate: f32,
    /// Mean elapsed frame time fed to the tick
    pub avg_frame_time: Duration,
    /// Ticks in the interval
    pub samples: u32,
    /// Increases by one at every publish
    pub uid: u64,
}

#[derive(Debug, Default)]
struct Accumulator {
    tick_time: Duration,
    actors: u64,
    steps: u64,
    frame_time: f64,
    samples: u32,
}

/// Shared read access to the published statistics
#[derive(Debug, Clone, Default)]
pub struct ProfilerHandle {
    shared: Arc<Mutex<ProfilerStats>>,
}

impl ProfilerHandle {
    /// Copy of the latest published statistics
    pub fn snapshot(&self) -> ProfilerStats {
        *self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Interval-averaging tick profiler
///
/// # Examples
///
/// ```
/// use bone_physics::profiler::Profiler;
/// use std::time::{Duration, Instant};
///
/// let mut profiler = Profiler::new(Duration::from_secs(1));
/// let handle = profiler.handle();
/// let start = Instant::now();
///
/// profiler.begin_at(start);
/// profiler.end_at(start + Duration::from_millis(2), 3, 2, 1.0 / 30.0);
/// assert_eq!(handle.snapshot().uid, 0);
///
/// profiler.begin_at(start + Duration::from_secs(1));
/// let stats = profiler.end_at(start + Duration::from_secs(1), 3, 2, 1.0 / 30.0);
/// assert_eq!(stats.map(|s| s.samples), Some(2));
/// assert_eq!(handle.snapshot().uid, 1);
/// ```
#[derive(Debug)]
pub struct Profiler {
    interval: Duration,
    window_start: Option<Instant>,
    tick_start: Option<Instant>,
    accum: Accumulator,
    uid: u64,
    handle: ProfilerHandle,
}

impl Profiler {
    /// Create a profiler publishing every `interval`
    pub fn new(interval: Duration) -> Self {
        Profiler {
            interval,
            window_start: None,
            tick_start: None,
            accum: Accumulator::default(),
            uid: 0,
            handle: ProfilerHandle::default(),
        }
    }

    /// Change the averaging interval; takes effect for the running window
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Averaging interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Reader handle
    pub fn handle(&self) -> ProfilerHandle {
        self.handle.clone()
    }

    /// Mark the start of a tick
    pub fn begin(&mut self) {
        self.begin_at(Instant::now());
    }

    /// Mark the start of a tick at a given instant
    pub fn begin_at(&mut self, now: Instant) {
        self.window_start.get_or_insert(now);
        self.tick_start = Some(now);
    }

    /// Mark the end of a tick; returns the statistics if an interval closed
    pub fn end(&mut self, actors: usize, steps: u32, frame_time: f32) -> Option<ProfilerStats> {
        self.end_at(Instant::now(), actors, steps, frame_time)
    }

    /// Mark the end of a tick at a given instant
    pub fn end_at(
        &mut self,
        now: Instant,
        actors: usize,
        steps: u32,
        frame_time: f32,
    ) -> Option<ProfilerStats> {
        let started = self.tick_start.take()?;
        self.accum.tick_time += now.saturating_duration_since(started);
        self.accum.actors += actors as u64;
        self.accum.steps += u64::from(steps);
        self.accum.frame_time += f64::from(frame_time.max(0.0));
        self.accum.samples += 1;

        let window_start = self.window_start?;
        if now.saturating_duration_since(window_start) < self.interval {
            return None;
        }

        let stats = self.publish();
        self.window_start = Some(now);
        Some(stats)
    }

    fn publish(&mut self) -> ProfilerStats {
        let acc = std::mem::take(&mut self.accum);
        let samples = acc.samples.max(1);
        let n = f64::from(samples);
        self.uid += 1;
        let stats = ProfilerStats {
            avg_tick_time: acc.tick_time / samples,
            avg_actor_count: (acc.actors as f64 / n) as f32,
            avg_steps_per_update: (acc.steps as f64 / n) as f32,
            avg_step_rate: if acc.frame_time > 0.0 {
                (acc.steps as f64 / acc.frame_time) as f32
            } else {
                0.0
            },
            avg_frame_time: Duration::from_secs_f64(acc.frame_time / n),
            samples: acc.samples,
            uid: self.uid,
        };
        *self.handle.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = stats;
        stats
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Profiler::new(Duration::from_secs(1))
    }
}
