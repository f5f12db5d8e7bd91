/*
 *  display/drivers/null.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Headless sink, accepts and drops every frame
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

use log::trace;

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::framebuffer::FrameBuffer;
use crate::display::traits::{DisplayCapabilities, DisplaySink};

#[derive(Debug)]
pub struct NullScreen {
    capabilities: DisplayCapabilities,
}

impl NullScreen {
    pub fn new(config: &DisplayConfig) -> Self {
        let (width, height) = config.logical_resolution();
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                color_depth: config.effective_mode().color_depth(),
                supports_refresh_budget: config.supports_refresh_budget(),
            },
        }
    }
}

impl DisplaySink for NullScreen {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn write(&mut self, image: &FrameBuffer) -> Result<(), DisplayError> {
        trace!("null screen dropped a {:?} frame", image.dimensions());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        Ok(())
    }
}
