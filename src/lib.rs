/*
 *  lib.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Library root, the binary in main.rs is a thin shell over these modules
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

pub mod cache;
pub mod config;
pub mod constants;
pub mod display;
pub mod engine;
pub mod func_timer;
pub mod pacer;
pub mod plugin;
pub mod snapshot;

pub use cache::CacheStore;
pub use display::{DisplaySink, FrameBuffer};
pub use engine::{RotationEngine, TickReport};
pub use plugin::{FetchOutcome, Fetcher, PluginContext, PluginData};
pub use plugin::unit::{PluginUnit, UpdateOutcome};
