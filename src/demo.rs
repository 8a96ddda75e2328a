/*
 *  demo.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Simulated media session and audio tap for running without a device
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

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::audio::AudioData;
use crate::player::{AudioSource, PlaybackControl, PlaybackSource, PlaybackStatus, SourceError};

#[derive(Debug)]
struct Session {
    media_available: bool,
    playing: bool,
    // commanded state and when the "remote" gets round to applying it
    pending: Option<(bool, Instant)>,
    fail_next: bool,
}

impl Session {
    fn settle(&mut self, now: Instant) {
        if let Some((target, at)) = self.pending {
            if now >= at {
                self.playing = target;
                self.pending = None;
                debug!("simulated player now {}", if target { "playing" } else { "paused" });
            }
        }
    }
}

/// Media session stand in. Clones share one session, so the same player can
/// answer status polls, take commands and be driven from the keyboard.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    session: Arc<Mutex<Session>>,
    apply_delay: Duration,
}

impl SimulatedPlayer {
    /// Media available and paused; commands land after `apply_delay`.
    pub fn new(apply_delay: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session {
                media_available: true,
                playing: false,
                pending: None,
                fail_next: false,
            })),
            apply_delay,
        }
    }

    pub fn is_playing(&self) -> bool {
        let mut s = self.lock();
        s.settle(Instant::now());
        s.media_available && s.playing
    }

    pub fn set_media_available(&self, available: bool) {
        let mut s = self.lock();
        if s.media_available != available {
            info!("simulated media {}", if available { "connected" } else { "gone" });
        }
        s.media_available = available;
        if !available {
            s.playing = false;
            s.pending = None;
        }
    }

    /// Flips media availability, returning the new value.
    pub fn toggle_media(&self) -> bool {
        let available = !self.lock().media_available;
        self.set_media_available(available);
        available
    }

    /// Makes the next playback command fail.
    pub fn fail_next_command(&self) {
        self.lock().fail_next = true;
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlaybackSource for SimulatedPlayer {
    async fn status(&mut self) -> Result<PlaybackStatus, SourceError> {
        let mut s = self.lock();
        s.settle(Instant::now());
        Ok(PlaybackStatus {
            is_media_available: s.media_available,
            is_playing: s.media_available && s.playing,
        })
    }
}

impl PlaybackControl for SimulatedPlayer {
    async fn toggle_playback(&mut self) -> Result<(), SourceError> {
        let delay = self.apply_delay;
        let mut s = self.lock();
        if std::mem::take(&mut s.fail_next) {
            return Err(SourceError::Command("simulated command failure".to_string()));
        }
        if !s.media_available {
            return Err(SourceError::Command("no media session".to_string()));
        }
        let target = !s.pending.map_or(s.playing, |(t, _)| t);
        s.pending = Some((target, Instant::now() + delay));
        if delay.is_zero() {
            s.settle(Instant::now());
        }
        Ok(())
    }
}

/// Random audio features with a steady beat, optionally silent while the
/// linked player is paused.
pub struct SimulatedAudio {
    rng: StdRng,
    tick: u64,
    beat_every: u64,
    player: Option<SimulatedPlayer>,
}

impl SimulatedAudio {
    /// Beats land every `beat_every` samples.
    pub fn new(beat_every: u64) -> Self {
        Self::with_rng(StdRng::from_os_rng(), beat_every)
    }

    /// Deterministic feed for tests.
    pub fn seeded(seed: u64, beat_every: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), beat_every)
    }

    fn with_rng(rng: StdRng, beat_every: u64) -> Self {
        Self { rng, tick: 0, beat_every: beat_every.max(1), player: None }
    }

    pub fn follow(mut self, player: SimulatedPlayer) -> Self {
        self.player = Some(player);
        self
    }

    fn next(&mut self) -> AudioData {
        self.tick += 1;
        if !self.player.as_ref().is_none_or(|p| p.is_playing()) {
            return AudioData::silent();
        }
        let on_beat = self.tick % self.beat_every == 0;
        // slow swell so the tiers wander
        let swell = (self.tick as f32 * 0.05).sin() * 0.5 + 0.5;
        let rng = &mut self.rng;
        let (beat, bass) = if on_beat {
            (rng.random_range(0.65f32..=1.0), rng.random_range(0.8f32..=1.0))
        } else {
            (rng.random_range(0.0f32..0.3), 0.25 + 0.35 * swell + rng.random_range(0.0f32..0.15))
        };
        let mid = 0.2 + 0.4 * swell + rng.random_range(-0.1f32..0.1);
        let treble = rng.random_range(0.05f32..0.5);
        AudioData::new(beat, bass, mid, treble, true)
    }
}

impl AudioSource for SimulatedAudio {
    async fn sample(&mut self) -> Result<AudioData, SourceError> {
        Ok(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_player_applies_after_delay() {
        let mut player = SimulatedPlayer::new(Duration::from_millis(40));
        let mut control = player.clone();
        assert_eq!(player.status().await.unwrap(), PlaybackStatus::PAUSED);

        control.toggle_playback().await.unwrap();
        assert_eq!(player.status().await.unwrap(), PlaybackStatus::PAUSED);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(player.status().await.unwrap(), PlaybackStatus::PLAYING);
    }

    #[tokio::test]
    async fn test_double_toggle_before_apply() {
        let mut player = SimulatedPlayer::new(Duration::from_millis(30));
        player.toggle_playback().await.unwrap();
        player.toggle_playback().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(player.status().await.unwrap(), PlaybackStatus::PAUSED);
    }

    #[tokio::test]
    async fn test_offline_and_failures() {
        let mut player = SimulatedPlayer::new(Duration::ZERO);
        player.toggle_playback().await.unwrap();
        assert!(player.is_playing());

        assert!(!player.toggle_media());
        assert_eq!(player.status().await.unwrap(), PlaybackStatus::OFFLINE);
        assert!(player.toggle_playback().await.is_err());

        player.set_media_available(true);
        player.fail_next_command();
        assert!(player.toggle_playback().await.is_err());
        assert!(player.toggle_playback().await.is_ok());
        assert!(player.is_playing());
    }

    #[tokio::test]
    async fn test_audio_beats_and_silence() {
        let mut audio = SimulatedAudio::seeded(7, 4);
        let samples: Vec<AudioData> = {
            let mut v = Vec::new();
            for _ in 0..8 {
                v.push(audio.sample().await.unwrap());
            }
            v
        };
        assert!(samples.iter().all(|s| s.is_playing));
        assert!(samples[3].beat_intensity >= 0.65);
        assert!(samples[7].bass_level >= 0.8);
        assert!(samples[0].beat_intensity < 0.3);

        let player = SimulatedPlayer::new(Duration::ZERO);
        let mut audio = SimulatedAudio::seeded(7, 4).follow(player);
        let quiet = audio.sample().await.unwrap();
        assert!(!quiet.is_playing);
    }
}
