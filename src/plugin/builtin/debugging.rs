/*
 *  plugin/builtin/debugging.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Misbehaving plugin for exercising failure and promotion paths
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

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use log::info;
use rand::Rng;

use super::text_data;
use crate::display::{Field, FieldArea, PageLayout};
use crate::plugin::registry::PluginSpec;
use crate::plugin::{FetchError, FetchOutcome, Fetcher, PluginContext, PluginError};

pub const NAME: &str = "debugging";
pub const DEFAULT_TITLE: &str = "Debug";
pub const DEFAULT_MIN_PRIORITY: i32 = 2;

const SAMPLE: &str = "\
- name: Debugging 50
  plugin: debugging
  layout: layout
  min_display_time: 50
  max_priority: 1
  refresh_rate: 5
  title: Debugging 50
  crash_rate: 0.5
  max_priority_rate: 0.1
  min_priority: 2
";

/// Crashes at `crash_rate`, otherwise reports `max_priority` at
/// `max_priority_rate` and `min_priority` the rest of the time
pub struct DebuggingFetcher {
    title: String,
    crash_rate: f64,
    max_priority_rate: f64,
    min_priority: i32,
    /// Present once the first fetch has happened
    sentinel: PathBuf,
}

impl DebuggingFetcher {
    /// Roll the dice; `roll` and `promote` are in 0.0..1.0
    fn outcome(&self, ctx: &PluginContext, roll: f64, promote: f64) -> Result<FetchOutcome, FetchError> {
        // the very first fetch doubles as the startup probe, never crash it
        let roll = if self.sentinel.exists() {
            roll
        } else {
            info!("first run of '{}', creating sentinel {}", ctx.name, self.sentinel.display());
            if let Some(parent) = self.sentinel.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&self.sentinel, b"")?;
            2.0
        };

        let priority = if promote <= self.max_priority_rate { ctx.max_priority } else { self.min_priority };

        if roll <= self.crash_rate {
            return Err(FetchError::msg(format!(
                "random crash: {:.2} <= crash rate {:.2}", roll, self.crash_rate
            )));
        }

        let data = text_data([
            ("title", self.title.clone()),
            ("crash_rate", format!("Crash Rate: {:.0}%", self.crash_rate * 100.0)),
            ("digit_time", Local::now().format("%H:%M:%S").to_string()),
            ("priority", format!("priority: {}", priority)),
        ]);
        Ok(FetchOutcome::new(true, data, priority))
    }
}

impl Fetcher for DebuggingFetcher {
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        let mut rng = rand::rng();
        let roll: f64 = rng.random();
        let promote: f64 = rng.random();
        self.outcome(ctx, roll, promote)
    }
}

fn build(ctx: &PluginContext) -> Result<Box<dyn Fetcher>, PluginError> {
    let title = ctx.option_str("title").unwrap_or(DEFAULT_TITLE).to_string();
    let rate = |key: &str| -> Result<f64, PluginError> {
        let value = ctx.option_f64(key).unwrap_or(0.0);
        if (0.0..=1.0).contains(&value) {
            Ok(value)
        } else {
            Err(PluginError::construction(&ctx.name, format!("{} must be between 0 and 1, got {}", key, value)))
        }
    };
    let crash_rate = rate("crash_rate")?;
    let max_priority_rate = rate("max_priority_rate")?;
    let min_priority = match ctx.option_i64("min_priority") {
        Some(p) => i32::try_from(p)
            .map_err(|_| PluginError::construction(&ctx.name, format!("min_priority {} is out of range", p)))?,
        None => DEFAULT_MIN_PRIORITY,
    };

    let file_name: String = title.chars().filter(|c| c.is_alphanumeric()).collect();
    let base = match &ctx.cache {
        Some(cache) => cache.path().to_path_buf(),
        None => std::env::temp_dir(),
    };

    Ok(Box::new(DebuggingFetcher {
        sentinel: base.join(format!("{}_{}", NAME, file_name)),
        title,
        crash_rate,
        max_priority_rate,
        min_priority,
    }))
}

fn layout(name: &str) -> Option<PageLayout> {
    match name {
        "layout" => Some(
            PageLayout::new("layout")
                .add_field(Field::new_text("title", FieldArea::new(0.0, 0.0, 1.0, 0.25)))
                .add_field(Field::new_text("digit_time", FieldArea::new(0.0, 0.25, 1.0, 0.4)))
                .add_field(Field::new_text("crash_rate", FieldArea::new(0.0, 0.65, 1.0, 0.175)))
                .add_field(Field::new_text("priority", FieldArea::new(0.0, 0.825, 1.0, 0.175))),
        ),
        _ => None,
    }
}

pub fn spec() -> PluginSpec {
    PluginSpec {
        name: NAME,
        description: "Throws errors at a configurable rate and randomly jumps to its max priority",
        data_keys: &[
            ("title", "title from the config"),
            ("crash_rate", "configured crash rate as a percentage"),
            ("digit_time", "HH:MM:SS"),
            ("priority", "priority reported this round"),
        ],
        layouts: &["layout"],
        default_max_priority: 1,
        sample_config: SAMPLE,
        build,
        layout,
        helpers: &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fetcher(crash_rate: f64, max_priority_rate: f64) -> (DebuggingFetcher, PluginContext) {
        let dir = std::env::temp_dir().join(format!("paperpi_debugging_{}", rand::rng().random::<u32>()));
        let ctx = PluginContext::new("debug", 0);
        let fetcher = DebuggingFetcher {
            title: "Debug".into(),
            crash_rate,
            max_priority_rate,
            min_priority: 2,
            sentinel: dir.join("sentinel"),
        };
        (fetcher, ctx)
    }

    #[test]
    fn test_first_run_never_crashes() {
        let (f, ctx) = fetcher(1.0, 0.0);
        assert!(f.outcome(&ctx, 0.0, 0.5).is_ok());
        assert!(f.sentinel.exists());
        assert!(f.outcome(&ctx, 0.0, 0.5).is_err());
        fs::remove_dir_all(f.sentinel.parent().unwrap()).ok();
    }

    #[test]
    fn test_promotion_and_resting_priority() {
        let (f, ctx) = fetcher(0.0, 0.5);
        let promoted = f.outcome(&ctx, 0.9, 0.1).unwrap();
        assert_eq!(promoted.priority, 0);
        let resting = f.outcome(&ctx, 0.9, 0.9).unwrap();
        assert_eq!(resting.priority, 2);
        assert_eq!(resting.data["priority"], json!("priority: 2"));
        assert_eq!(resting.data["crash_rate"], json!("Crash Rate: 0%"));
        fs::remove_dir_all(f.sentinel.parent().unwrap()).ok();
    }

    #[test]
    fn test_rate_out_of_range_is_a_construction_error() {
        let mut ctx = PluginContext::new("debug", 0);
        ctx.options.insert("crash_rate".into(), json!(1.5));
        assert!(matches!(build(&ctx), Err(PluginError::Construction { .. })));
    }

    #[test]
    fn test_huge_min_priority_is_a_construction_error() {
        let mut ctx = PluginContext::new("debug", 0);
        ctx.options.insert("min_priority".into(), json!(i64::from(i32::MAX) + 1));
        assert!(matches!(build(&ctx), Err(PluginError::Construction { .. })));

        ctx.options.insert("min_priority".into(), json!(-7));
        ctx.options.insert("title".into(), json!("negative ok"));
        assert!(build(&ctx).is_ok());
    }
}
