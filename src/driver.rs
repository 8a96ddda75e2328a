/*
 *  driver.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Animation driver - player state machine with predicted state,
 *  frame selection and per-tick cadence
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

use log::{debug, info, trace, warn};
use std::time::{Duration, Instant};

use crate::audio::AudioData;
use crate::brightness;
use crate::matrix::PixelFrame;
use crate::player::{PlaybackStatus, PlayerState, SourceError};
use crate::sequence::FrameTransitionSequence;
use crate::themes::{prepare_theme, Theme, ThemeError};

/// Timing knobs for the state machine and cadence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverTiming {
    /// How long a predicted state is trusted without confirmation.
    pub prediction_timeout: Duration,
    /// Floor for audio accelerated frames.
    pub min_frame: Duration,
    /// Idle cadence while media is available (catch play/pause quickly).
    pub idle_fast: Duration,
    /// Idle cadence while offline or in error.
    pub idle_slow: Duration,
    /// Beat intensity above which frames are shortened.
    pub beat_damping_threshold: f32,
    /// Fraction of the beat intensity taken off the frame duration.
    pub beat_damping: f32,
}

impl Default for DriverTiming {
    fn default() -> Self {
        Self {
            prediction_timeout: Duration::from_millis(1000),
            min_frame: Duration::from_millis(30),
            idle_fast: Duration::from_millis(10),
            idle_slow: Duration::from_millis(100),
            beat_damping_threshold: 0.6,
            beat_damping: 0.5,
        }
    }
}

/// Speculative state applied ahead of the media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    /// Toggle that produced it, unique per driver.
    pub id: u64,
    pub state: PlayerState,
    pub deadline: Instant,
}

/// Outcome of folding one status poll into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    Unchanged,
    Changed { from: PlayerState, to: PlayerState },
    /// The poll matched the outstanding prediction.
    Confirmed(PlayerState),
    /// A live prediction disagrees with the poll; the prediction wins for now.
    Suppressed,
    /// The prediction timed out and the observed state took over.
    Expired { predicted: PlayerState, observed: PlayerState },
}

/// Frame ready for the display: brightness mapped, masked.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedFrame {
    pub pixels: PixelFrame,
    pub brightness: u8,
    pub state: PlayerState,
}

pub struct AnimationDriver {
    theme: Box<dyn Theme>,
    sequence: Option<FrameTransitionSequence>,
    frame_index: usize,
    resume_index: Option<usize>,
    canonical: PlayerState,
    prediction: Option<Prediction>,
    next_toggle: u64,
    media_available: bool,
    last_frame: PixelFrame,
    timing: DriverTiming,
}

impl AnimationDriver {
    /// Validates `theme` and starts in `Loading` until the first poll.
    pub fn new(theme: Box<dyn Theme>, timing: DriverTiming) -> Result<Self, ThemeError> {
        let sequence = prepare_theme(theme.as_ref())?;
        let frame_index = sequence.as_ref().map_or(0, |s| s.current_frame_index());
        let last_frame = theme.generate_frame(frame_index);
        info!("Animation driver started with theme '{}'", theme.name());
        Ok(Self {
            theme,
            sequence,
            frame_index,
            resume_index: None,
            canonical: PlayerState::Loading,
            prediction: None,
            next_toggle: 1,
            media_available: false,
            last_frame,
            timing,
        })
    }

    /// Swaps in a new theme together with a freshly built sequencer.
    ///
    /// On error the current theme stays active untouched.
    pub fn set_theme(&mut self, theme: Box<dyn Theme>) -> Result<(), ThemeError> {
        let sequence = prepare_theme(theme.as_ref())?;
        info!("Theme changed: {} -> {}", self.theme.name(), theme.name());
        self.frame_index = sequence.as_ref().map_or(0, |s| s.current_frame_index());
        self.last_frame = theme.generate_frame(self.frame_index);
        self.sequence = sequence;
        self.theme = theme;
        self.resume_index = None;
        Ok(())
    }

    pub fn theme(&self) -> &dyn Theme {
        self.theme.as_ref()
    }

    pub fn timing(&self) -> &DriverTiming {
        &self.timing
    }

    pub fn canonical_state(&self) -> PlayerState {
        self.canonical
    }

    pub fn prediction(&self) -> Option<Prediction> {
        self.prediction
    }

    pub fn media_available(&self) -> bool {
        self.media_available
    }

    /// Effective state: a live prediction, else the canonical state.
    pub fn state(&self, now: Instant) -> PlayerState {
        match self.prediction {
            Some(p) if now < p.deadline => p.state,
            _ => self.canonical,
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.state(now).is_playing()
    }

    /// Index of the animation frame currently on show.
    pub fn frame_index(&self) -> usize {
        match &self.sequence {
            Some(seq) => seq.current_frame_index(),
            None => self.frame_index,
        }
    }

    /// Frame index captured when playback last stopped.
    pub fn resume_index(&self) -> Option<usize> {
        self.resume_index
    }

    pub fn in_opening(&self) -> bool {
        self.sequence.as_ref().is_some_and(|s| s.is_in_opening())
    }

    /// Folds a playback status poll into the state machine.
    pub fn reconcile(
        &mut self,
        observed: Result<PlaybackStatus, SourceError>,
        now: Instant,
    ) -> Reconcile {
        let observed_state = match observed {
            Ok(status) => {
                self.media_available = status.is_media_available;
                PlayerState::from_status(&status)
            }
            Err(e) => {
                warn!("Playback status query failed: {}", e);
                self.media_available = false;
                PlayerState::Error
            }
        };

        if let Some(p) = self.prediction {
            if now >= p.deadline {
                self.prediction = None;
                warn!("Prediction {} expired unconfirmed, observed {}", p.state, observed_state);
                self.canonical = observed_state;
                if p.state != observed_state {
                    self.apply_transition(p.state, observed_state);
                }
                return Reconcile::Expired { predicted: p.state, observed: observed_state };
            }
            if observed_state == p.state {
                self.prediction = None;
                self.canonical = observed_state;
                info!("Prediction {} confirmed", observed_state);
                return Reconcile::Confirmed(observed_state);
            }
            trace!("Prediction {} outstanding, ignoring observed {}", p.state, observed_state);
            return Reconcile::Suppressed;
        }

        if observed_state == self.canonical {
            return Reconcile::Unchanged;
        }
        let from = self.canonical;
        self.canonical = observed_state;
        self.apply_transition(from, observed_state);
        Reconcile::Changed { from, to: observed_state }
    }

    /// User asked to toggle play/pause. Applies the expected state at once
    /// and returns it, or None when a toggle means nothing in this state.
    pub fn request_toggle(&mut self, now: Instant) -> Option<PlayerState> {
        self.expire_prediction(now);
        let current = self.state(now);
        let Some(next) = current.toggled() else {
            debug!("Toggle ignored while {}", current);
            return None;
        };
        let id = self.next_toggle;
        self.next_toggle += 1;
        self.prediction = Some(Prediction {
            id,
            state: next,
            deadline: now + self.timing.prediction_timeout,
        });
        info!("Predicting {} -> {} (toggle #{})", current, next, id);
        self.apply_transition(current, next);
        Some(next)
    }

    /// The toggle command failed; drop the prediction and go back to the
    /// canonical state straight away. Returns false if nothing was pending.
    pub fn revert_prediction(&mut self) -> bool {
        let Some(p) = self.prediction.take() else {
            return false;
        };
        warn!("Reverting prediction {} to {}", p.state, self.canonical);
        if p.state != self.canonical {
            self.apply_transition(p.state, self.canonical);
        }
        true
    }

    /// A toggle command failed. Reverts only while the prediction it made is
    /// still outstanding; failures of superseded toggles are ignored.
    pub fn revert_toggle(&mut self, id: u64) -> bool {
        match self.prediction {
            Some(p) if p.id == id => self.revert_prediction(),
            _ => {
                debug!("Ignoring failure of superseded toggle #{}", id);
                false
            }
        }
    }

    fn expire_prediction(&mut self, now: Instant) {
        if let Some(p) = self.prediction {
            if now >= p.deadline {
                self.prediction = None;
                warn!("Prediction {} expired unconfirmed", p.state);
                if p.state != self.canonical {
                    self.apply_transition(p.state, self.canonical);
                }
            }
        }
    }

    fn apply_transition(&mut self, from: PlayerState, to: PlayerState) {
        info!("Player state: {} -> {}", from, to);

        if from.is_playing() && !to.is_playing() {
            let index = self.frame_index();
            debug!("Captured frame {} for resume", index);
            self.resume_index = Some(index);
        }

        if to.is_playing() && !from.is_playing() {
            let resumed = from == PlayerState::Paused;
            match self.sequence.as_mut() {
                Some(seq) => {
                    seq.reset(true);
                    self.frame_index = seq.current_frame_index();
                }
                None => {
                    let start = if resumed { self.resume_index.unwrap_or(0) } else { 0 };
                    self.frame_index = start % self.theme.frame_count();
                }
            }
            self.resume_index = None;
            self.theme.resume();
        }
    }

    /// Builds the frame for this tick.
    pub fn render(&mut self, audio: Option<&AudioData>, now: Instant) -> RenderedFrame {
        let state = self.state(now);
        let raw = if state.is_playing() {
            self.animation_frame(audio)
        } else {
            match self.theme.state_frame(state).frame() {
                Some(frame) => frame.clone(),
                None => self.last_frame.clone(),
            }
        };
        let level = self.theme.brightness();
        RenderedFrame {
            pixels: brightness::apply_to_frame(&raw, level).masked(),
            brightness: level,
            state,
        }
    }

    fn animation_frame(&mut self, audio: Option<&AudioData>) -> PixelFrame {
        let index = self.frame_index();
        let reactive = match audio.filter(|a| a.is_playing) {
            Some(a) => self
                .theme
                .as_audio_reactive_mut()
                .map(|r| r.generate_audio_reactive_frame(index, a)),
            None => None,
        };
        let frame = reactive.unwrap_or_else(|| self.theme.generate_frame(index));
        self.last_frame = frame.clone();
        frame
    }

    /// Steps to the next animation frame; a no-op unless animating.
    /// Returns false when a full cycle has just completed.
    pub fn advance(&mut self, now: Instant) -> bool {
        if !self.is_animating(now) {
            return true;
        }
        match self.sequence.as_mut() {
            Some(seq) => {
                let more = seq.advance();
                self.frame_index = seq.current_frame_index();
                if !more {
                    trace!("Transition loop complete");
                }
                more
            }
            None => {
                self.frame_index = (self.frame_index + 1) % self.theme.frame_count();
                self.frame_index != 0
            }
        }
    }

    /// How long to hold the current frame before the next tick.
    pub fn frame_duration(&self, audio: Option<&AudioData>, now: Instant) -> Duration {
        if !self.is_animating(now) {
            return if self.media_available {
                self.timing.idle_fast
            } else {
                self.timing.idle_slow
            };
        }

        let base = if let Some(seq) = &self.sequence {
            seq.current_duration()
        } else if let Some(durations) = self.theme.as_frame_durations() {
            durations.frame_duration(self.frame_index)
        } else {
            self.theme.animation_speed()
        };

        match audio {
            Some(a) if a.is_playing && self.theme.as_audio_reactive().is_some() => {
                self.modulate(base, a)
            }
            _ => base,
        }
    }

    fn modulate(&self, base: Duration, audio: &AudioData) -> Duration {
        let beat = audio.beat_intensity.clamp(0.0, 1.0);
        if beat <= self.timing.beat_damping_threshold {
            return base;
        }
        let factor = (1.0 - self.timing.beat_damping * beat).clamp(0.0, 1.0);
        let ms = (base.as_millis() as f32 * factor).round() as u64;
        Duration::from_millis(ms).max(self.timing.min_frame)
    }
}
