// Copyright 2025 eraflo
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

//! Per-iteration timing of the render loop.

use std::time::{Duration, Instant};

/// Delta time, frame id and frames per second, advanced once per render iteration.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    delta: Duration,
    frame_id: u64,
    fps: u32,
    frames: u32,
    second_start: Option<Instant>,
}

impl FrameClock {
    /// A clock that has not ticked yet.
    pub fn new() -> Self {
        Self {
            last: None,
            delta: Duration::ZERO,
            frame_id: 0,
            fps: 0,
            frames: 0,
            second_start: None,
        }
    }

    /// Starts a new frame at `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(last) = self.last {
            self.delta = now.saturating_duration_since(last);
            self.frame_id += 1;
        }
        self.last = Some(now);

        let second_start = *self.second_start.get_or_insert(now);
        self.frames += 1;
        if now.saturating_duration_since(second_start) >= Duration::from_secs(1) {
            self.fps = self.frames;
            self.frames = 0;
            self.second_start = Some(now);
        }
    }

    /// Time between the last two ticks.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// [`FrameClock::delta`] in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Frames started since the first tick.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Frames counted over the last full second.
    pub fn fps(&self) -> u32 {
        self.fps
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_has_no_delta() {
        let mut clock = FrameClock::new();
        clock.tick(Instant::now());
        assert_eq!(clock.delta(), Duration::ZERO);
        assert_eq!(clock.frame_id(), 0);
    }

    #[test]
    fn fps_is_counted_per_second() {
        let start = Instant::now();
        let mut clock = FrameClock::new();
        for frame in 0..=30u32 {
            clock.tick(start + Duration::from_millis(u64::from(frame) * 50));
        }
        assert_eq!(clock.delta(), Duration::from_millis(50));
        assert_eq!(clock.frame_id(), 30);
        // 21 ticks fall into the first second (0ms..=1000ms).
        assert_eq!(clock.fps(), 21);
    }
}
