/*
 *  themes/pulse.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pulse - concentric rings driven by bass weighted audio intensity
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
use super::{AudioReactive, StateFrame, Theme, ThemeError};
use crate::audio::{AudioData, BeatDetector, Easing, FeatureWeights, IntensityTier, DEFAULT_TIER_THRESHOLDS};
use crate::matrix::{PixelFrame, CENTER};
use crate::player::PlayerState;
use embedded_graphics::prelude::Point;

const FRAME_COUNT: usize = 12;
const OUTER_RADIUS: u32 = 12;
// fraction of the remaining distance covered per audio frame
const SCALE_BLEND: f32 = 0.35;

pub struct PulseTheme {
    brightness: u8,
    speed: Duration,
    weights: FeatureWeights,
    thresholds: Vec<f32>,
    easing: Easing,
    beat: BeatDetector,
    scale: f32,
    frames: Vec<PixelFrame>,
    paused: PixelFrame,
    offline: PixelFrame,
    error: PixelFrame,
}

impl PulseTheme {
    pub fn from_settings(s: &Settings) -> Result<Self, ThemeError> {
        let brightness = settings::brightness(s, 255)?;
        let speed = settings::speed(s, Duration::from_millis(90))?;
        let weights = FeatureWeights {
            beat: settings::float(s, "beat_weight", FeatureWeights::BASS_PULSE.beat, 0.0..=1.0)?,
            bass: settings::float(s, "bass_weight", FeatureWeights::BASS_PULSE.bass, 0.0..=1.0)?,
            mid: settings::float(s, "mid_weight", FeatureWeights::BASS_PULSE.mid, 0.0..=1.0)?,
            treble: settings::float(s, "treble_weight", FeatureWeights::BASS_PULSE.treble, 0.0..=1.0)?,
        };
        if weights.beat + weights.bass + weights.mid + weights.treble <= 0.0 {
            return Err(ThemeError::InvalidSetting {
                key: "weights".to_string(),
                reason: "at least one weight must be positive".to_string(),
            });
        }
        let thresholds = settings::ascending_floats(s, "thresholds")?
            .unwrap_or_else(|| DEFAULT_TIER_THRESHOLDS.to_vec());
        let beat_threshold = settings::float(s, "beat_threshold", 0.3, 0.0..=1.0)?;
        let beat_multiplier = settings::float(s, "beat_multiplier", 1.3, 1.0..=4.0)?;
        let easing = match s.get("easing").and_then(|v| v.as_str()) {
            None | Some("elastic") => Easing::ELASTIC,
            Some("cubic") => Easing::CubicInOut,
            Some("linear") => Easing::Linear,
            Some(other) => {
                return Err(ThemeError::InvalidSetting {
                    key: "easing".to_string(),
                    reason: format!("unknown curve '{}'", other),
                })
            }
        };

        Ok(Self {
            brightness,
            speed,
            weights,
            thresholds,
            easing,
            beat: BeatDetector::new(beat_threshold, beat_multiplier),
            scale: 0.0,
            frames: (0..FRAME_COUNT).map(expanding_ring).collect(),
            paused: pause_bars(),
            offline: dim_rim(),
            error: cross(),
        })
    }

    pub fn tier(&self, intensity: f32) -> IntensityTier {
        IntensityTier::classify(intensity, &self.thresholds)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

fn expanding_ring(index: usize) -> PixelFrame {
    let mut frame = PixelFrame::blank();
    let level = 255u8.saturating_sub((index * 14) as u8);
    frame.ring(index as u32 + 1, level, 1);
    frame.set(CENTER as usize, CENTER as usize, 96);
    frame
}

fn pause_bars() -> PixelFrame {
    let mut frame = PixelFrame::blank();
    for col in [9, 10, 14, 15] {
        frame.line(Point::new(col, 7), Point::new(col, 17), 200);
    }
    frame
}

fn dim_rim() -> PixelFrame {
    let mut frame = PixelFrame::blank();
    frame.ring(OUTER_RADIUS, 40, 1);
    frame
}

fn cross() -> PixelFrame {
    let mut frame = PixelFrame::blank();
    frame.line(Point::new(6, 6), Point::new(18, 18), 255);
    frame.line(Point::new(18, 6), Point::new(6, 18), 255);
    frame
}

impl Theme for PulseTheme {
    fn name(&self) -> &'static str {
        "pulse"
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

    fn state_frame(&self, state: PlayerState) -> StateFrame {
        match state {
            PlayerState::Paused => StateFrame::Frame(self.paused.clone()),
            PlayerState::Offline => StateFrame::Frame(self.offline.clone()),
            PlayerState::Error => StateFrame::Frame(self.error.clone()),
            PlayerState::Loading | PlayerState::Playing => StateFrame::Freeze,
        }
    }

    fn as_audio_reactive(&self) -> Option<&dyn AudioReactive> {
        Some(self)
    }

    fn as_audio_reactive_mut(&mut self) -> Option<&mut dyn AudioReactive> {
        Some(self)
    }

    fn resume(&mut self) {
        // stale loudness from before the pause would mask the first beats
        self.beat.clear();
        self.scale = 0.0;
    }
}

impl AudioReactive for PulseTheme {
    fn feature_weights(&self) -> FeatureWeights {
        self.weights
    }

    fn generate_audio_reactive_frame(&mut self, index: usize, audio: &AudioData) -> PixelFrame {
        let intensity = self.intensity(audio);
        let tier = self.tier(intensity);
        let beat = self.beat.observe(intensity);
        self.scale = self.easing.apply(self.scale, intensity, SCALE_BLEND).clamp(0.0, 1.2);

        let mut frame = PixelFrame::blank();
        let reach = ((self.scale * OUTER_RADIUS as f32).round() as u32).min(OUTER_RADIUS - 1);
        let level = (120.0 + 135.0 * intensity).round().clamp(0.0, 255.0) as u8;

        match tier {
            IntensityTier::Silent => {
                frame.set(CENTER as usize, CENTER as usize, level);
            }
            IntensityTier::Quiet | IntensityTier::Moderate => {
                let rings = tier as u32;
                for r in 1..=rings {
                    frame.ring((reach * r / rings).max(1), level, 1);
                }
            }
            IntensityTier::Loud => {
                frame.disc(reach / 2, level / 2);
                frame.ring(reach.max(1), level, 2);
            }
            IntensityTier::VeryLoud => {
                frame.disc(reach, level);
            }
        }

        // slow sweep so steady levels are not a still image
        let sweep = (index % FRAME_COUNT) as f32 * (360.0 / FRAME_COUNT as f32);
        frame.spoke(sweep, reach as f32, level / 3);

        if beat {
            frame.ring(OUTER_RADIUS, 255, 1);
        }
        frame
    }
}
