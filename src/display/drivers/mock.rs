/*
 *  display/drivers/mock.rs
 *
 *  LyRing - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display driver - records every call for inspection
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

use std::sync::{Arc, Mutex, MutexGuard};

use crate::display::error::DisplayError;
use crate::display::traits::{DisplayCapabilities, DisplayDriver};
use crate::driver::RenderedFrame;
use crate::matrix::PixelFrame;
use crate::player::PlayerState;

/// Mock display driver for testing
///
/// Simulates the matrix without hardware. Useful for unit and integration
/// tests and for running headless.
///
/// The driver records all operations; the shared state handle stays valid
/// after the driver is boxed and moved into a service.
#[derive(Debug, Clone)]
pub struct MockDriver {
    /// Frame staged by write_frame, shown on flush
    staged: Option<RenderedFrame>,

    /// Display capabilities
    capabilities: DisplayCapabilities,

    /// Shared state for testing
    state: Arc<Mutex<MockDriverState>>,
}

/// Internal state for the mock driver (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockDriverState {
    /// Number of times init() was called
    pub init_count: usize,

    /// Number of frames flushed to the "panel"
    pub frame_count: usize,

    /// Number of times clear() was called
    pub clear_count: usize,

    /// Last brightness value set
    pub last_brightness: Option<u8>,

    /// Last frame shown
    pub last_frame: Option<PixelFrame>,

    /// Player state the last frame was rendered for
    pub last_state: Option<PlayerState>,

    /// Every state seen, in order, without consecutive repeats
    pub state_history: Vec<PlayerState>,

    /// Whether the driver is initialized
    pub is_initialized: bool,

    /// Simulate failures (for error testing)
    pub simulate_flush_failure: bool,
    pub simulate_init_failure: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            staged: None,
            capabilities: DisplayCapabilities::matrix("mock"),
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Reset state counters (useful between tests)
    pub fn reset_state(&mut self) {
        *self.lock() = MockDriverState::default();
    }

    /// Count lit cells on the last shown frame
    pub fn count_on_pixels(&self) -> usize {
        self.lock().last_frame.as_ref().map_or(0, |f| f.lit_count())
    }

    fn lock(&self) -> MutexGuard<'_, MockDriverState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock();

        if state.simulate_init_failure {
            return Err(DisplayError::InitializationFailed("Simulated init failure".to_string()));
        }

        state.init_count += 1;
        state.is_initialized = true;
        Ok(())
    }

    fn set_brightness(&mut self, value: u8) -> Result<(), DisplayError> {
        self.lock().last_brightness = Some(value);
        Ok(())
    }

    fn write_frame(&mut self, frame: &RenderedFrame) -> Result<(), DisplayError> {
        if !self.lock().is_initialized {
            return Err(DisplayError::NotInitialized);
        }
        self.staged = Some(frame.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let staged = self.staged.take();
        let mut state = self.lock();

        if state.simulate_flush_failure {
            return Err(DisplayError::Other("Simulated flush failure".to_string()));
        }

        if let Some(frame) = staged {
            state.frame_count += 1;
            if state.state_history.last() != Some(&frame.state) {
                state.state_history.push(frame.state);
            }
            state.last_state = Some(frame.state);
            state.last_frame = Some(frame.pixels);
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.staged = None;
        let mut state = self.lock();
        state.clear_count += 1;
        state.last_frame = Some(PixelFrame::blank());
        Ok(())
    }
}
