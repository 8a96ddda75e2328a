/*
 *  display/drivers/console.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Console preview - draws the ring in the terminal through the preview
 *  response curve
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

use log::debug;
use std::fmt::Write as _;
use std::io::{self, Write};

use crate::brightness::{preview_alpha, PREVIEW_ALPHA_FLOOR};
use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::driver::RenderedFrame;
use crate::matrix::{is_visible, GRID_SIZE};

/// Glyphs from faintest to full, indexed by preview alpha above the floor.
const RAMP: [char; 4] = ['░', '▒', '▓', '█'];
const DARK_CELL: char = '·';

const HOME: &str = "\x1b[H";
const CLEAR_SCREEN: &str = "\x1b[2J";

pub struct ConsoleDriver {
    capabilities: DisplayCapabilities,
    out: Box<dyn Write + Send>,
    staged: String,
    redraw_in_place: bool,
    initialized: bool,
}

impl ConsoleDriver {
    /// Preview on stdout, redrawn in place.
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()), true)
    }

    pub fn with_writer(out: Box<dyn Write + Send>, redraw_in_place: bool) -> Self {
        let mut capabilities = DisplayCapabilities::matrix("console");
        capabilities.max_fps = 30;
        capabilities.is_preview = true;
        capabilities.supports_brightness = false;
        Self {
            capabilities,
            out,
            staged: String::new(),
            redraw_in_place,
            initialized: false,
        }
    }
}

/// Glyph for one cell. Pixels already carry the final brightness, so the
/// alpha is taken against full scale.
pub fn glyph_for(level: u8) -> char {
    let alpha = preview_alpha(level, 255);
    if alpha <= 0.0 {
        return DARK_CELL;
    }
    let t = ((alpha - PREVIEW_ALPHA_FLOOR) / (1.0 - PREVIEW_ALPHA_FLOOR)).clamp(0.0, 1.0);
    RAMP[(t * (RAMP.len() - 1) as f32).round() as usize]
}

/// Renders the grid as text, two columns per cell, off-mask cells blank.
pub fn render_text(frame: &RenderedFrame) -> String {
    let mut text = String::with_capacity(GRID_SIZE * (GRID_SIZE * 2 + 1) + 48);
    let _ = writeln!(text, "lyring [{:<8}] brightness {:>3}", frame.state, frame.brightness);
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let glyph = if is_visible(row, col) {
                glyph_for(frame.pixels.get(row, col))
            } else {
                ' '
            };
            text.push(glyph);
            text.push(if glyph == DARK_CELL { ' ' } else { glyph });
        }
        // keep the right edge clean when redrawing in place
        let trimmed = text.trim_end_matches(' ').len();
        text.truncate(trimmed);
        text.push('\n');
    }
    text
}

impl DisplayDriver for ConsoleDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        if self.redraw_in_place {
            write!(self.out, "{CLEAR_SCREEN}{HOME}")?;
            self.out.flush()?;
        }
        self.initialized = true;
        debug!("console preview ready");
        Ok(())
    }

    fn set_brightness(&mut self, _value: u8) -> Result<(), DisplayError> {
        // levels are baked into each frame
        Err(DisplayError::UnsupportedOperation)
    }

    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), DisplayError> {
        if !self.initialized {
            return Err(DisplayError::NotInitialized);
        }
        self.staged = render_text(frame);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        if self.staged.is_empty() {
            return Ok(());
        }
        if self.redraw_in_place {
            self.out.write_all(HOME.as_bytes())?;
        }
        self.out.write_all(self.staged.as_bytes())?;
        self.out.flush()?;
        self.staged.clear();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.staged.clear();
        if self.redraw_in_place {
            write!(self.out, "{CLEAR_SCREEN}{HOME}")?;
            self.out.flush()?;
        }
        Ok(())
    }
}
