/*
 *  plugin/builtin/mod.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Plugins compiled into the binary
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

pub mod basic_clock;
pub mod debugging;
pub mod default;
pub mod splash_screen;
pub mod word_clock;

use serde_json::Value;

use super::registry::PluginSpec;
use super::PluginData;

pub fn all() -> Vec<PluginSpec> {
    vec![
        default::spec(),
        basic_clock::spec(),
        word_clock::spec(),
        debugging::spec(),
        splash_screen::spec(),
    ]
}

/// Build a data map from string pairs
pub(crate) fn text_data<const N: usize>(pairs: [(&str, String); N]) -> PluginData {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::String(v)))
        .collect()
}
