/*
 *  display/factory.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Screen factory - builds the configured sink
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

use log::info;

use crate::config::DisplayConfig;
use crate::display::drivers::{FileScreen, NullScreen};
use crate::display::error::DisplayInitError;
use crate::display::traits::DisplaySink;

/// Type alias for boxed screen trait objects
pub type BoxedScreen = Box<dyn DisplaySink>;

/// Known `display_type` values
pub const SCREEN_TYPES: &[&str] = &["file", "null"];

/// Factory for creating screens from configuration
pub struct ScreenFactory;

impl ScreenFactory {
    /// Create a screen from configuration
    ///
    /// Geometry is checked here so every sink can assume a sane config.
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedScreen, DisplayInitError> {
        if config.width == 0 || config.height == 0 {
            return Err(DisplayInitError::InvalidConfiguration(format!(
                "resolution {}x{} is not drawable", config.width, config.height
            )));
        }

        let kind = config.display_type.trim().to_ascii_lowercase();
        info!("creating '{}' screen", kind);
        match kind.as_str() {
            "file" => Ok(Box::new(FileScreen::new(config)?)),
            "null" => Ok(Box::new(NullScreen::new(config))),
            _ => Err(DisplayInitError::UnknownDevice(config.display_type.clone())),
        }
    }
}
