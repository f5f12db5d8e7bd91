/*
 *  plugin/builtin/default.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fallback plugin, shown when nothing else wants the screen
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

use chrono::Local;
use embedded_text::alignment::{HorizontalAlignment, VerticalAlignment};

use super::text_data;
use crate::config::PluginConfig;
use crate::constants::INACTIVE_PRIORITY;
use crate::display::{Field, FieldArea, PageLayout};
use crate::plugin::registry::PluginSpec;
use crate::plugin::{FetchError, FetchOutcome, Fetcher, PluginContext, PluginError};

pub const NAME: &str = "default";
pub const DEFAULT_MSG: &str = "No plugins are active, check the logs!";

/// Priority when nothing is wrong, low enough that any real plugin wins
pub const RESTING_PRIORITY: i32 = 1 << 14;
/// Priority with `high_priority: true`, beats everything
pub const URGENT_PRIORITY: i32 = -(1 << 15);

const SAMPLE: &str = "\
- name: default fallback plugin
  plugin: default
  layout: layout
  refresh_rate: 30
  min_display_time: 60
  max_priority: 32768
";

pub struct DefaultFetcher {
    msg: String,
    high_priority: bool,
}

impl Fetcher for DefaultFetcher {
    fn fetch(&mut self, _ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        let data = text_data([
            ("digit_time", Local::now().format("%H:%M:%S").to_string()),
            ("msg", self.msg.clone()),
        ]);
        let priority = if self.high_priority { URGENT_PRIORITY } else { RESTING_PRIORITY };
        Ok(FetchOutcome::new(true, data, priority))
    }
}

fn build(ctx: &PluginContext) -> Result<Box<dyn Fetcher>, PluginError> {
    let msg = ctx
        .option_str("msg")
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MSG)
        .to_string();
    Ok(Box::new(DefaultFetcher {
        msg,
        high_priority: ctx.option_bool("high_priority").unwrap_or(false),
    }))
}

fn layout(name: &str) -> Option<PageLayout> {
    match name {
        "layout" => Some(
            PageLayout::new("layout")
                .add_field(Field::new_text("digit_time", FieldArea::new(0.0, 0.0, 1.0, 0.6)))
                .add_field(
                    Field::new_text("msg", FieldArea::new(0.0, 0.6, 1.0, 0.4))
                        .max_lines(2)
                        .align(HorizontalAlignment::Center, VerticalAlignment::Top),
                ),
        ),
        _ => None,
    }
}

/// Entry appended to every configuration so the screen is never empty
pub fn fallback_entry() -> PluginConfig {
    let mut entry = PluginConfig::new("default fallback plugin", NAME);
    entry.refresh_rate = Some(30);
    entry.min_display_time = Some(60);
    entry.max_priority = Some(INACTIVE_PRIORITY);
    entry
}

pub fn spec() -> PluginSpec {
    PluginSpec {
        name: NAME,
        description: "Time and a message; displayed when every other plugin has gone quiet",
        data_keys: &[("digit_time", "HH:MM:SS"), ("msg", "message to display")],
        layouts: &["layout"],
        default_max_priority: INACTIVE_PRIORITY,
        sample_config: SAMPLE,
        build,
        layout,
        helpers: &[],
    }
}
