/*
 *  display/mod.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display subsystem - screen sinks, framebuffers and the block layout engine
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod framebuffer;
pub mod factory;
pub mod color;

// Screen sinks
pub mod drivers;

// Field-based layout system
pub mod field;
pub mod page;

pub use traits::{ColorDepth, DisplayCapabilities, DisplaySink, ScreenMode};
pub use error::{DisplayError, DisplayInitError};
pub use framebuffer::{FrameBuffer, VarFrameBuf};
pub use factory::ScreenFactory;
pub use color::Color;
pub use field::{Field, FieldArea};
pub use page::PageLayout;
