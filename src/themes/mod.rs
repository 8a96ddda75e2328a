/*
 *  themes/mod.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Theme capabilities - frames, timing, audio reactivity and
 *  player state overrides
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
use thiserror::Error;

use crate::audio::{AudioData, FeatureWeights};
use crate::matrix::PixelFrame;
use crate::player::PlayerState;
use crate::sequence::{FrameTransitionSequence, SequenceError, TransitionPlan};

pub mod settings;
pub mod catalog;
pub mod pulse;
pub mod orbit;
pub mod breathe;

pub use settings::Settings;
pub use catalog::{build_theme, available_themes, ThemeManager, ThemeSelection, DEFAULT_THEME};
pub use pulse::PulseTheme;
pub use orbit::OrbitTheme;
pub use breathe::BreatheTheme;

/// Slowest global animation speed a theme may ask for.
pub const MAX_SPEED_MS: u64 = 2000;
/// Fastest global animation speed a theme may ask for.
pub const MIN_SPEED_MS: u64 = 50;

/// Configuration errors; any of these keeps a theme from becoming active.
#[derive(Debug, Error, PartialEq)]
pub enum ThemeError {
    #[error("unknown theme '{0}'")]
    Unknown(String),
    #[error("setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },
    #[error("brightness {0} outside 0..=255")]
    BrightnessOutOfRange(i64),
    #[error("animation speed {0} ms outside 50..=2000 ms")]
    SpeedOutOfRange(u64),
    #[error("frame duration table has {actual} entries for {expected} frames")]
    DurationTableMismatch { expected: usize, actual: usize },
    #[error("theme has no frames")]
    NoFrames,
    #[error("invalid transitions: {0}")]
    Sequence(#[from] SequenceError),
}

/// What a theme shows for a non-animating player state.
#[derive(Debug, Clone, PartialEq)]
pub enum StateFrame {
    /// Render this frame verbatim.
    Frame(PixelFrame),
    /// No override, hold the last animation frame.
    Freeze,
}

impl StateFrame {
    /// The override frame, if any and not empty.
    pub fn frame(&self) -> Option<&PixelFrame> {
        match self {
            StateFrame::Frame(f) if !f.is_blank() => Some(f),
            _ => None,
        }
    }
}

/// A policy object describing the frames, timing and reactivity of the ring.
pub trait Theme: Send {
    fn name(&self) -> &'static str;

    fn frame_count(&self) -> usize;

    /// Standard frame for `index`, `index < frame_count()`.
    fn generate_frame(&self, index: usize) -> PixelFrame;

    /// Global per-frame duration when nothing more specific applies.
    fn animation_speed(&self) -> Duration;

    fn brightness(&self) -> u8;

    /// Override for paused/offline/loading/error.
    fn state_frame(&self, _state: PlayerState) -> StateFrame {
        StateFrame::Freeze
    }

    fn as_audio_reactive(&self) -> Option<&dyn AudioReactive> {
        None
    }

    fn as_audio_reactive_mut(&mut self) -> Option<&mut dyn AudioReactive> {
        None
    }

    fn as_frame_durations(&self) -> Option<&dyn FrameDurationProvider> {
        None
    }

    /// Playback resumed; scroll style themes keep their own offsets here.
    fn resume(&mut self) {}
}

/// Themes that draw from live audio features.
pub trait AudioReactive {
    fn feature_weights(&self) -> FeatureWeights;

    /// Fused 0..=1 intensity of `audio` under this theme's weights.
    fn intensity(&self, audio: &AudioData) -> f32 {
        self.feature_weights().intensity(audio)
    }

    fn generate_audio_reactive_frame(&mut self, index: usize, audio: &AudioData) -> PixelFrame;
}

/// Themes with their own per-frame timing.
pub trait FrameDurationProvider {
    fn frame_duration(&self, index: usize) -> Duration;

    /// Transition lists to drive the sequencer, None to cycle frames in order.
    fn frame_transitions(&self) -> Option<TransitionPlan> {
        None
    }
}

/// Checks a theme before activation and builds its sequencer when it has one.
pub fn prepare_theme(theme: &dyn Theme) -> Result<Option<FrameTransitionSequence>, ThemeError> {
    let frame_count = theme.frame_count();
    if frame_count == 0 {
        return Err(ThemeError::NoFrames);
    }
    let speed = theme.animation_speed().as_millis() as u64;
    if !(MIN_SPEED_MS..=MAX_SPEED_MS).contains(&speed) {
        return Err(ThemeError::SpeedOutOfRange(speed));
    }
    let plan = theme
        .as_frame_durations()
        .and_then(|d| d.frame_transitions());
    match plan {
        Some(plan) => Ok(Some(FrameTransitionSequence::from_plan(plan, frame_count)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::FrameTransition;

    struct Bare {
        frames: usize,
        speed: u64,
        plan: Option<TransitionPlan>,
    }

    impl Theme for Bare {
        fn name(&self) -> &'static str { "bare" }
        fn frame_count(&self) -> usize { self.frames }
        fn generate_frame(&self, _index: usize) -> PixelFrame { PixelFrame::filled(10) }
        fn animation_speed(&self) -> Duration { Duration::from_millis(self.speed) }
        fn brightness(&self) -> u8 { 255 }
        fn as_frame_durations(&self) -> Option<&dyn FrameDurationProvider> { Some(self) }
    }

    impl FrameDurationProvider for Bare {
        fn frame_duration(&self, _index: usize) -> Duration { Duration::from_millis(self.speed) }
        fn frame_transitions(&self) -> Option<TransitionPlan> { self.plan.clone() }
    }

    #[test]
    fn test_prepare_rejects_bad_configuration() {
        let empty = Bare { frames: 0, speed: 100, plan: None };
        assert_eq!(prepare_theme(&empty).unwrap_err(), ThemeError::NoFrames);

        let fast = Bare { frames: 2, speed: 10, plan: None };
        assert_eq!(prepare_theme(&fast).unwrap_err(), ThemeError::SpeedOutOfRange(10));

        let plan = TransitionPlan {
            opening: None,
            main: vec![FrameTransition::new(0, 5, 1, 100).unwrap()],
        };
        let bad = Bare { frames: 2, speed: 100, plan: Some(plan) };
        assert!(matches!(prepare_theme(&bad), Err(ThemeError::Sequence(_))));
    }

    #[test]
    fn test_prepare_builds_sequence() {
        let plain = Bare { frames: 2, speed: 100, plan: None };
        assert!(prepare_theme(&plain).unwrap().is_none());

        let plan = TransitionPlan {
            opening: None,
            main: vec![FrameTransition::new(0, 1, 1, 100).unwrap()],
        };
        let seq = Bare { frames: 2, speed: 100, plan: Some(plan) };
        assert!(prepare_theme(&seq).unwrap().is_some());
    }

    #[test]
    fn test_state_frame_blank_is_no_override() {
        assert!(StateFrame::Frame(PixelFrame::blank()).frame().is_none());
        assert!(StateFrame::Freeze.frame().is_none());
        assert!(StateFrame::Frame(PixelFrame::filled(1)).frame().is_some());
    }
}
