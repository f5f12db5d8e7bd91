/*
 *  plugin/registry.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Compile-time plugin table and the unit builder
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

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};
use log::{debug, error, info};

use super::builtin;
use super::error::PluginError;
use super::unit::{PluginUnit, UnitSettings};
use super::{Fetcher, PluginContext};
use crate::cache::CacheStore;
use crate::config::PluginConfig;
use crate::constants;
use crate::display::color::{resolve_text_colors, Color};
use crate::display::{PageLayout, ScreenMode};

pub type BuildFn = fn(&PluginContext) -> Result<Box<dyn Fetcher>, PluginError>;
pub type LayoutFn = fn(&str) -> Option<PageLayout>;
pub type HelperFn = fn(&[String]) -> anyhow::Result<String>;

/// User callable function exposed through `--run-plugin-func`
pub struct Helper {
    pub name: &'static str,
    pub description: &'static str,
    pub run: HelperFn,
}

/// Everything the shell needs to know about one plugin
pub struct PluginSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// Keys the fetcher puts in its data, with a short explanation
    pub data_keys: &'static [(&'static str, &'static str)],
    pub layouts: &'static [&'static str],
    pub default_max_priority: i32,
    pub sample_config: &'static str,
    pub build: BuildFn,
    pub layout: LayoutFn,
    pub helpers: &'static [Helper],
}

/// Screen and runtime facts shared by every unit
#[derive(Debug, Clone)]
pub struct UnitEnvironment {
    pub resolution: (u32, u32),
    pub screen_mode: ScreenMode,
    pub timeout: Duration,
    pub cache: Option<Arc<CacheStore>>,
}

pub struct PluginRegistry {
    specs: Vec<PluginSpec>,
}

impl PluginRegistry {
    pub fn builtin() -> Self {
        Self { specs: builtin::all() }
    }

    pub fn with_specs(specs: Vec<PluginSpec>) -> Self {
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<&PluginSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|s| s.name)
    }

    /// One line per plugin, for `--list-plugins`
    pub fn listing(&self) -> String {
        let mut out = String::from("available plugins:\n");
        for spec in &self.specs {
            let _ = writeln!(out, "  {:<16} {}", spec.name, spec.description);
        }
        out
    }

    /// Long help for `--plugin-info`
    pub fn describe(&self, name: &str) -> Option<String> {
        let spec = self.get(name)?;
        let mut out = String::new();
        let _ = writeln!(out, "{}\n\n{}\n", spec.name, spec.description);
        let _ = writeln!(out, "data keys:");
        for (key, about) in spec.data_keys {
            let _ = writeln!(out, "  {:<14} {}", key, about);
        }
        let _ = writeln!(out, "\nlayouts: {}", spec.layouts.join(", "));
        if !spec.helpers.is_empty() {
            let _ = writeln!(out, "\nuser functions:");
            for helper in spec.helpers {
                let _ = writeln!(out, "  {}.{:<12} {}", spec.name, helper.name, helper.description);
            }
        }
        let _ = writeln!(out, "\nsample configuration:\n{}", spec.sample_config.trim_end());
        Some(out)
    }

    /// Run `plugin.function` with free-form arguments
    pub fn run_helper(&self, target: &str, args: &[String]) -> anyhow::Result<String> {
        let (plugin, func) = target
            .split_once('.')
            .ok_or_else(|| anyhow!("expected PLUGIN.FUNCTION, got '{}'", target))?;
        let spec = self.get(plugin).ok_or_else(|| anyhow!("no plugin named '{}'", plugin))?;
        match spec.helpers.iter().find(|h| h.name == func) {
            Some(helper) => (helper.run)(args),
            None if spec.helpers.is_empty() => bail!("plugin '{}' has no user functions", plugin),
            None => {
                let known: Vec<&str> = spec.helpers.iter().map(|h| h.name).collect();
                bail!("plugin '{}' has no function '{}', try one of: {}", plugin, func, known.join(", "))
            }
        }
    }

    /// Build every entry, leaving out only those that cannot be constructed
    ///
    /// Fetch trouble is not a reason to drop a unit, the rotation keeps
    /// retrying it on later ticks.
    pub fn build_units<'a>(
        &self,
        entries: impl IntoIterator<Item = &'a PluginConfig>,
        env: &UnitEnvironment,
    ) -> Vec<PluginUnit> {
        let mut units = Vec::new();
        for entry in entries {
            match self.build_unit(entry, env) {
                Ok(unit) => units.push(unit),
                Err(e) => error!("excluding '{}': {}", entry.name, e),
            }
        }
        info!("{} plugin(s) in rotation", units.len());
        units
    }

    /// Turn one config entry into a ready unit
    ///
    /// Nothing is fetched here, the caller decides when the first paint happens.
    pub fn build_unit(&self, entry: &PluginConfig, env: &UnitEnvironment) -> Result<PluginUnit, PluginError> {
        let spec = self
            .get(&entry.plugin)
            .ok_or_else(|| PluginError::Unknown(entry.plugin.clone()))?;

        let layout_name = entry.layout.as_deref().unwrap_or(constants::DEFAULT_LAYOUT);
        let mut layout = (spec.layout)(layout_name).ok_or_else(|| PluginError::UnknownLayout {
            plugin: spec.name.to_string(),
            layout: layout_name.to_string(),
        })?;

        // colors only make sense with gray levels to spare
        let text = entry.options.get("text_color").and_then(|v| v.as_str());
        let background = entry.options.get("bkground_color").and_then(|v| v.as_str());
        if env.screen_mode == ScreenMode::Gray && (text.is_some() || background.is_some()) {
            let (fg, bg) = resolve_text_colors(text, background, (Color::Black, Color::White), &mut rand::rng());
            debug!("'{}' colors {:?} on {:?}", entry.name, fg, bg);
            layout.recolor(fg, bg);
        }

        let max_priority = entry.max_priority.unwrap_or(spec.default_max_priority);
        let context = PluginContext {
            name: entry.name.clone(),
            max_priority,
            resolution: env.resolution,
            screen_mode: env.screen_mode,
            options: entry.options.clone(),
            cache: env.cache.clone(),
        };

        let fetcher = (spec.build)(&context)?;
        let settings = UnitSettings {
            name: entry.name.clone(),
            refresh_interval: Duration::from_secs(entry.refresh_rate.unwrap_or(constants::DEFAULT_REFRESH_RATE)),
            min_display_time: Duration::from_secs(entry.min_display_time.unwrap_or(constants::DEFAULT_MIN_DISPLAY_TIME)),
            max_priority,
            timeout: env.timeout,
        };
        info!("built '{}' from plugin '{}'", entry.name, spec.name);
        Ok(PluginUnit::new(settings, fetcher, layout, context, env.screen_mode.color_depth()))
    }
}
