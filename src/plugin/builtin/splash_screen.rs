/*
 *  plugin/builtin/splash_screen.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Startup banner
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

use super::text_data;
use crate::config::PluginConfig;
use crate::constants::{APP_NAME, INACTIVE_PRIORITY, URL, VERSION};
use crate::display::{Color, Field, FieldArea, PageLayout};
use crate::plugin::registry::PluginSpec;
use crate::plugin::{FetchError, FetchOutcome, Fetcher, PluginContext, PluginError};

pub const NAME: &str = "splash_screen";

struct Splash;

impl Fetcher for Splash {
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        let data = text_data([
            ("app_name", APP_NAME.to_string()),
            ("version", format!("version {}", VERSION)),
            ("url", URL.to_string()),
        ]);
        Ok(FetchOutcome::new(true, data, ctx.max_priority))
    }
}

fn build(_ctx: &PluginContext) -> Result<Box<dyn Fetcher>, PluginError> {
    Ok(Box::new(Splash))
}

fn layout(name: &str) -> Option<PageLayout> {
    match name {
        "layout" => Some(
            PageLayout::new("layout")
                .add_field(
                    Field::new_text("app_name", FieldArea::new(0.0, 0.0, 1.0, 0.5))
                        .colors(Color::White, Some(Color::Black))
                        .fixed_colors(),
                )
                .add_field(Field::new_text("version", FieldArea::new(0.0, 0.5, 1.0, 0.25)))
                .add_field(Field::new_text("url", FieldArea::new(0.0, 0.75, 1.0, 0.25))),
        ),
        _ => None,
    }
}

/// Config entry used by the shell for the startup splash
pub fn splash_entry() -> PluginConfig {
    let mut entry = PluginConfig::new("splash screen", NAME);
    entry.refresh_rate = Some(30);
    entry.min_display_time = Some(60);
    entry.max_priority = Some(INACTIVE_PRIORITY);
    entry
}

pub fn spec() -> PluginSpec {
    PluginSpec {
        name: NAME,
        description: "Application name, version and url; shown once at startup",
        data_keys: &[("app_name", "application name"), ("version", "version string"), ("url", "project url")],
        layouts: &["layout"],
        default_max_priority: INACTIVE_PRIORITY,
        sample_config: "# not configurable, enable with `splash: true` in the main section\n",
        build,
        layout,
        helpers: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_splash_data() {
        let ctx = PluginContext::new("splash", INACTIVE_PRIORITY);
        let out = build(&ctx).unwrap().fetch(&ctx).unwrap();
        assert_eq!(out.data["app_name"], json!(APP_NAME));
        assert_eq!(out.priority, INACTIVE_PRIORITY);
    }
}
