/*
 *  player.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Player state and the inbound collaborators - playback status,
 *  audio features and the play/pause command
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

use std::fmt;
use std::future::Future;
use thiserror::Error;

use crate::audio::AudioData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Playing,
    Paused,
    Offline,
    Loading,
    Error,
}

impl PlayerState {
    /// State implied by a playback status poll.
    pub fn from_status(status: &PlaybackStatus) -> Self {
        match (status.is_media_available, status.is_playing) {
            (false, _) => PlayerState::Offline,
            (true, true) => PlayerState::Playing,
            (true, false) => PlayerState::Paused,
        }
    }

    /// Expected state after a play/pause toggle, None where a toggle means nothing.
    pub fn toggled(self) -> Option<Self> {
        match self {
            PlayerState::Playing => Some(PlayerState::Paused),
            PlayerState::Paused => Some(PlayerState::Playing),
            PlayerState::Offline | PlayerState::Loading | PlayerState::Error => None,
        }
    }

    pub fn is_playing(self) -> bool {
        self == PlayerState::Playing
    }

    pub fn name(self) -> &'static str {
        match self {
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Offline => "offline",
            PlayerState::Loading => "loading",
            PlayerState::Error => "error",
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Result of polling the media session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub is_media_available: bool,
    pub is_playing: bool,
}

impl PlaybackStatus {
    pub const OFFLINE: PlaybackStatus = PlaybackStatus { is_media_available: false, is_playing: false };
    pub const PLAYING: PlaybackStatus = PlaybackStatus { is_media_available: true, is_playing: true };
    pub const PAUSED: PlaybackStatus = PlaybackStatus { is_media_available: true, is_playing: false };
}

/// Transient failure from an inbound collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("playback status unavailable: {0}")]
    Status(String),
    #[error("audio sample unavailable: {0}")]
    Audio(String),
    #[error("playback command failed: {0}")]
    Command(String),
}

/// Answers "is media available, is it playing".
pub trait PlaybackSource: Send + 'static {
    fn status(&mut self) -> impl Future<Output = Result<PlaybackStatus, SourceError>> + Send;
}

/// Delivers the four audio features per sampling tick.
pub trait AudioSource: Send + 'static {
    fn sample(&mut self) -> impl Future<Output = Result<AudioData, SourceError>> + Send;
}

/// Issues the user's play/pause toggle to the media session.
pub trait PlaybackControl: Send + 'static {
    fn toggle_playback(&mut self) -> impl Future<Output = Result<(), SourceError>> + Send;
}

/// Stand in for deployments without an audio tap.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAudio;

impl AudioSource for NoAudio {
    async fn sample(&mut self) -> Result<AudioData, SourceError> {
        Err(SourceError::Audio("no audio source configured".to_string()))
    }
}
