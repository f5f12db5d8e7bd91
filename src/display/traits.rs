/*
 *  display/traits.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Core trait definitions for the screen sink abstraction
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

use serde::{Deserialize, Serialize};

use crate::display::error::DisplayError;
use crate::display::framebuffer::FrameBuffer;

/// Color depth capabilities of the supported panels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// One bit per pixel, ink or paper
    Monochrome,

    /// 4-bit grayscale (16 levels)
    /// Used by the HD panels that also need periodic full clears
    Gray4,
}

/// Screen mode as it appears in configuration, `1` or `L`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenMode {
    #[serde(rename = "1")]
    OneBit,
    #[serde(rename = "L")]
    Gray,
}

impl ScreenMode {
    pub fn color_depth(self) -> ColorDepth {
        match self {
            ScreenMode::OneBit => ColorDepth::Monochrome,
            ScreenMode::Gray => ColorDepth::Gray4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScreenMode::OneBit => "1",
            ScreenMode::Gray => "L",
        }
    }
}

/// Display capabilities and metadata
#[derive(Debug, Clone)]
pub struct DisplayCapabilities {
    /// Logical width in pixels, after rotation
    pub width: u32,

    /// Logical height in pixels, after rotation
    pub height: u32,

    /// Color depth (monochrome or grayscale)
    pub color_depth: ColorDepth,

    /// Panel accumulates ghosting and wants a full clear every few writes
    pub supports_refresh_budget: bool,
}

/// Anything that can receive a finished image
///
/// The rotation engine only ever talks to the screen through this trait,
/// so a real panel, a frame dumper and the test recorder are interchangeable.
pub trait DisplaySink: Send {
    /// Returns the capabilities of this screen
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the logical dimensions as (width, height)
    fn resolution(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    fn supports_refresh_budget(&self) -> bool {
        self.capabilities().supports_refresh_budget
    }

    /// Push a complete frame to the panel
    fn write(&mut self, image: &FrameBuffer) -> Result<(), DisplayError>;

    /// Full clear, also used to shake off ghosting on HD panels
    fn clear(&mut self) -> Result<(), DisplayError>;
}
