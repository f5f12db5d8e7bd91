/*
 *  plugin/builtin/basic_clock.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Digital clock
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

use super::text_data;
use crate::display::{Field, FieldArea, PageLayout};
use crate::plugin::registry::PluginSpec;
use crate::plugin::{FetchError, FetchOutcome, Fetcher, PluginContext, PluginError};

pub const NAME: &str = "basic_clock";

const SAMPLE: &str = "\
- name: Basic Clock
  plugin: basic_clock
  layout: layout
  refresh_rate: 30
  min_display_time: 50
  max_priority: 2
";

struct ClockFetcher;

impl Fetcher for ClockFetcher {
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        let now = Local::now();
        let data = text_data([
            ("digit_time", now.format("%H:%M").to_string()),
            ("date", now.format("%A, %d %B").to_string()),
        ]);
        Ok(FetchOutcome::new(true, data, ctx.max_priority))
    }
}

fn build(_ctx: &PluginContext) -> Result<Box<dyn Fetcher>, PluginError> {
    Ok(Box::new(ClockFetcher))
}

fn layout(name: &str) -> Option<PageLayout> {
    match name {
        "layout" => Some(PageLayout::new("layout").add_field(Field::new_text("digit_time", FieldArea::FULL))),
        "time_date" => Some(
            PageLayout::new("time_date")
                .add_field(Field::new_text("digit_time", FieldArea::new(0.0, 0.0, 1.0, 0.7)))
                .add_field(Field::new_text("date", FieldArea::new(0.0, 0.7, 1.0, 0.3))),
        ),
        _ => None,
    }
}

pub fn spec() -> PluginSpec {
    PluginSpec {
        name: NAME,
        description: "Current time as HH:MM, optionally with the date",
        data_keys: &[("digit_time", "HH:MM"), ("date", "weekday, day and month")],
        layouts: &["layout", "time_date"],
        default_max_priority: 2,
        sample_config: SAMPLE,
        build,
        layout,
        helpers: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_reports_max_priority() {
        let ctx = PluginContext::new("clock", 2);
        let out = build(&ctx).unwrap().fetch(&ctx).unwrap();
        assert_eq!(out.priority, 2);
        assert_eq!(out.data["digit_time"].as_str().unwrap().len(), 5);
        assert!(out.data.contains_key("date"));
    }

    #[test]
    fn test_layouts() {
        assert_eq!(layout("time_date").unwrap().fields().len(), 2);
        assert!(layout("nope").is_none());
    }
}
