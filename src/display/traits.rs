/*
 *  display/traits.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Outbound display driver contract
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

use crate::display::error::DisplayError;
use crate::driver::RenderedFrame;
use crate::matrix::{PixelFrame, GRID_SIZE};

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Short driver name for logs
    pub name: &'static str,

    /// Addressable grid width in cells
    pub width: u32,

    /// Addressable grid height in cells
    pub height: u32,

    /// Maximum recommended frame rate
    pub max_fps: u32,

    /// Whether the display supports brightness control
    pub supports_brightness: bool,

    /// Renders through the preview response curve rather than hardware levels
    pub is_preview: bool,
}

impl DisplayCapabilities {
    pub fn matrix(name: &'static str) -> Self {
        Self {
            name,
            width: GRID_SIZE as u32,
            height: GRID_SIZE as u32,
            max_fps: 100,
            supports_brightness: true,
            is_preview: false,
        }
    }
}

/// All display drivers must implement this trait
///
/// Frames arrive already mapped through the final brightness curve and
/// masked to the visible circle.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set display brightness (0-255)
    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Stage a frame for the next flush
    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), DisplayError>;

    /// Push the staged frame out
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Clear the display to blank/off state
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Write a raw row-major buffer of 625 pixel levels
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let pixels = PixelFrame::from_slice(buffer)?;
        let frame = RenderedFrame {
            pixels: pixels.masked(),
            brightness: 255,
            state: crate::player::PlayerState::Playing,
        };
        self.write_frame(&frame)?;
        self.flush()
    }
}
