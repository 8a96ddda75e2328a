/*
 *  lib.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Animation core for a 25x25 circular pixel matrix following a media
 *  player's state and, optionally, its audio
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

pub mod matrix;
pub mod brightness;
pub mod sequence;
pub mod audio;
pub mod player;
pub mod themes;
pub mod driver;
pub mod service;
pub mod display;
pub mod config;
pub mod demo;

pub use driver::{AnimationDriver, DriverTiming, RenderedFrame};
pub use matrix::PixelFrame;
pub use player::{PlaybackStatus, PlayerState};
pub use service::{AnimationService, ServiceTiming};
