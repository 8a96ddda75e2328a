/*
 *  themes/breathe.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Breathe - a soft disc rising and falling on an eased curve,
 *  timed by a per-frame duration table
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::time::Duration;

use super::settings::{self, Settings};
use super::{FrameDurationProvider, Theme, ThemeError};
use crate::audio::Easing;
use crate::matrix::PixelFrame;

const FRAME_COUNT: usize = 16;
const HALF: usize = FRAME_COUNT / 2;
const FLOOR_LEVEL: f32 = 24.0;
const PEAK_LEVEL: f32 = 255.0;

pub struct BreatheTheme {
    brightness: u8,
    speed: Duration,
    durations: Vec<Duration>,
    frames: Vec<PixelFrame>,
}

impl BreatheTheme {
    pub fn from_settings(s: &Settings) -> Result<Self, ThemeError> {
        let brightness = settings::brightness(s, 180)?;
        let speed = settings::speed(s, Duration::from_millis(120))?;
        let durations = match settings::durations(s, "durations")? {
            Some(list) if list.len() != FRAME_COUNT => {
                return Err(ThemeError::DurationTableMismatch {
                    expected: FRAME_COUNT,
                    actual: list.len(),
                });
            }
            Some(list) => list,
            None => default_durations(speed),
        };
        let radius = settings::float(s, "radius", 9.0, 1.0..=12.0)?.round() as u32;

        Ok(Self {
            brightness,
            speed,
            durations,
            frames: (0..FRAME_COUNT).map(|i| breath_frame(i, radius)).collect(),
        })
    }
}

/// Disc level for `index`: eased up over the first half, back down over the second.
fn breath_level(index: usize) -> u8 {
    let t = if index < HALF {
        index as f32 / (HALF - 1) as f32
    } else {
        (FRAME_COUNT - 1 - index) as f32 / (HALF - 1) as f32
    };
    Easing::CubicInOut.apply(FLOOR_LEVEL, PEAK_LEVEL, t).round() as u8
}

fn breath_frame(index: usize, radius: u32) -> PixelFrame {
    let level = breath_level(index);
    let mut frame = PixelFrame::blank();
    frame.disc(radius, level / 2);
    frame.disc(radius.saturating_sub(3), level);
    frame
}

fn default_durations(speed: Duration) -> Vec<Duration> {
    // linger at the top and bottom of each breath
    (0..FRAME_COUNT)
        .map(|i| match i {
            0 | 15 => speed * 3,
            7 | 8 => speed * 2,
            _ => speed,
        })
        .map(|d| d.min(Duration::from_millis(2000)))
        .collect()
}

impl Theme for BreatheTheme {
    fn name(&self) -> &'static str {
        "breathe"
    }

    fn frame_count(&self) -> usize {
        FRAME_COUNT
    }

    fn generate_frame(&self, index: usize) -> PixelFrame {
        self.frames.get(index).cloned().unwrap_or_default()
    }

    fn animation_speed(&self) -> Duration {
        self.speed
    }

    fn brightness(&self) -> u8 {
        self.brightness
    }

    fn as_frame_durations(&self) -> Option<&dyn FrameDurationProvider> {
        Some(self)
    }
}

impl FrameDurationProvider for BreatheTheme {
    fn frame_duration(&self, index: usize) -> Duration {
        self.durations.get(index).copied().unwrap_or(self.speed)
    }
}
