/*
 *  display/drivers/mock.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock screen for unit tests
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::framebuffer::FrameBuffer;
use crate::display::traits::{ColorDepth, DisplayCapabilities, DisplaySink};

/// Mock screen that records every operation
///
/// The state lives behind an `Arc<Mutex<..>>` so a test can keep a handle
/// after the screen has been moved into the engine.
#[derive(Debug, Clone)]
pub struct MockScreen {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockScreenState>>,
}

/// Internal state for the mock screen (shared for inspection in tests)
#[derive(Debug, Default)]
pub struct MockScreenState {
    /// Successful writes
    pub write_count: usize,

    /// Attempted writes, failed ones included
    pub write_attempts: usize,

    pub clear_count: usize,

    pub last_frame: Option<FrameBuffer>,

    /// Simulate failures (for error testing)
    pub simulate_write_failure: bool,
    pub simulate_clear_failure: bool,
}

impl MockScreen {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_depth(width, height, ColorDepth::Monochrome)
    }

    /// Gray4 mock doubles as an HD panel with a refresh budget
    pub fn with_depth(width: u32, height: u32, color_depth: ColorDepth) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth,
                supports_refresh_budget: color_depth == ColorDepth::Gray4,
            },
            state: Arc::new(Mutex::new(MockScreenState::default())),
        }
    }

    pub fn state(&self) -> Arc<Mutex<MockScreenState>> {
        Arc::clone(&self.state)
    }
}

impl DisplaySink for MockScreen {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn write(&mut self, image: &FrameBuffer) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        state.write_attempts += 1;
        if state.simulate_write_failure {
            return Err(DisplayError::WriteFailed("Simulated write failure".to_string()));
        }
        state.write_count += 1;
        state.last_frame = Some(image.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_clear_failure {
            return Err(DisplayError::ClearFailed("Simulated clear failure".to_string()));
        }
        state.clear_count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_screen_records_writes() {
        let mut screen = MockScreen::new(32, 16);
        let state = screen.state();
        screen.write(&FrameBuffer::new(32, 16, ColorDepth::Monochrome)).unwrap();
        assert_eq!(state.lock().unwrap().write_count, 1);
        assert!(state.lock().unwrap().last_frame.is_some());
        assert!(!screen.supports_refresh_budget());
    }

    #[test]
    fn test_mock_screen_failure_injection() {
        let mut screen = MockScreen::with_depth(32, 16, ColorDepth::Gray4);
        let state = screen.state();
        state.lock().unwrap().simulate_write_failure = true;
        assert!(screen.write(&FrameBuffer::new(32, 16, ColorDepth::Gray4)).is_err());
        assert_eq!(state.lock().unwrap().write_attempts, 1);
        assert_eq!(state.lock().unwrap().write_count, 0);
        assert!(screen.supports_refresh_budget());
    }
}
