/*
 *  themes/orbit.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Orbit - a spoke sweeping the ring, played through frame transitions
 *  with a short opening
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
use super::{FrameDurationProvider, StateFrame, Theme, ThemeError};
use crate::matrix::{PixelFrame, CENTER};
use crate::player::PlayerState;
use crate::sequence::{FrameTransition, TransitionPlan};
use embedded_graphics::prelude::Point;

/// Spoke positions, 45 degrees apart.
const SPOKES: usize = 8;
/// Spokes followed by the opening frames (dot, small disc, ring).
const FRAME_COUNT: usize = SPOKES + 3;
const SPOKE_LENGTH: f32 = 11.0;
const SPOKE_MS: u64 = 80;
const OPENING_MS: u64 = 140;

pub struct OrbitTheme {
    brightness: u8,
    speed: Duration,
    frames: Vec<PixelFrame>,
    opening: Option<Vec<FrameTransition>>,
    main: Vec<FrameTransition>,
    paused: PixelFrame,
    loading: PixelFrame,
    error: PixelFrame,
}

impl OrbitTheme {
    pub fn from_settings(s: &Settings) -> Result<Self, ThemeError> {
        let brightness = settings::brightness(s, 220)?;
        let speed = settings::speed(s, Duration::from_millis(SPOKE_MS))?;
        let spoke_ms = speed.as_millis() as u64;

        let main = match settings::transitions(s, "transitions")? {
            Some(list) => list,
            None => default_main(spoke_ms)?,
        };
        let opening = match s.get("opening") {
            Some(serde_json::Value::Bool(false)) => None,
            Some(_) => settings::transitions(s, "opening")?,
            None => Some(default_opening()?),
        };

        Ok(Self {
            brightness,
            speed,
            frames: (0..FRAME_COUNT).map(orbit_frame).collect(),
            opening,
            main,
            paused: all_spokes(50),
            loading: {
                let mut f = PixelFrame::blank();
                f.ring(4, 90, 1);
                f
            },
            error: {
                let mut f = PixelFrame::blank();
                f.line(Point::new(7, 7), Point::new(17, 17), 255);
                f.line(Point::new(17, 7), Point::new(7, 17), 255);
                f
            },
        })
    }
}

fn default_main(spoke_ms: u64) -> Result<Vec<FrameTransition>, ThemeError> {
    // spokes in pairs: 0->1, 2->3 ... one full turn per pass
    let mut list = Vec::with_capacity(SPOKES / 2 + 1);
    for pair in 0..SPOKES / 2 {
        list.push(FrameTransition::new(pair * 2, pair * 2 + 1, 1, spoke_ms)?);
    }
    // a slow flick between opposite spokes closes each lap
    list.push(FrameTransition::new(0, SPOKES / 2, 2, (spoke_ms * 3).min(2000))?);
    Ok(list)
}

fn default_opening() -> Result<Vec<FrameTransition>, ThemeError> {
    Ok(vec![
        FrameTransition::new(SPOKES, SPOKES + 1, 1, OPENING_MS)?,
        FrameTransition::new(SPOKES + 2, 0, 1, OPENING_MS)?,
    ])
}

fn orbit_frame(index: usize) -> PixelFrame {
    let mut frame = PixelFrame::blank();
    match index {
        i if i < SPOKES => {
            let angle = i as f32 * (360.0 / SPOKES as f32);
            // short trailing spoke gives the sweep a direction
            frame.spoke(angle - 22.5, SPOKE_LENGTH * 0.6, 60);
            frame.spoke(angle, SPOKE_LENGTH, 255);
        }
        i if i == SPOKES => frame.set(CENTER as usize, CENTER as usize, 255),
        i if i == SPOKES + 1 => frame.disc(2, 200),
        _ => frame.ring(SPOKE_LENGTH as u32, 160, 1),
    }
    frame
}

fn all_spokes(level: u8) -> PixelFrame {
    let mut frame = PixelFrame::blank();
    for i in 0..SPOKES {
        frame.spoke(i as f32 * (360.0 / SPOKES as f32), SPOKE_LENGTH, level);
    }
    frame
}

impl Theme for OrbitTheme {
    fn name(&self) -> &'static str {
        "orbit"
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
            PlayerState::Loading => StateFrame::Frame(self.loading.clone()),
            PlayerState::Error => StateFrame::Frame(self.error.clone()),
            PlayerState::Offline | PlayerState::Playing => StateFrame::Freeze,
        }
    }

    fn as_frame_durations(&self) -> Option<&dyn FrameDurationProvider> {
        Some(self)
    }
}

impl FrameDurationProvider for OrbitTheme {
    fn frame_duration(&self, index: usize) -> Duration {
        if index < SPOKES {
            self.speed
        } else {
            Duration::from_millis(OPENING_MS)
        }
    }

    fn frame_transitions(&self) -> Option<TransitionPlan> {
        Some(TransitionPlan {
            opening: self.opening.clone(),
            main: self.main.clone(),
        })
    }
}
