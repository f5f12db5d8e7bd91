/*
 *  config.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered YAML configuration with CLI overrides
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
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use log::{debug, info};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants;
use crate::display::ScreenMode;
use crate::plugin::builtin::default::fallback_entry;
use crate::plugin::PluginData;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level configuration: the `main` section plus the plugin list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub main: MainConfig,
    /// Replaced wholesale by any later file that has a list
    pub plugins: Option<Vec<PluginConfig>>,
}

/// Options in the `main` section. Every field is optional so files layer.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MainConfig {
    pub log_level: Option<String>,      // e.g., "warn" | "debug"
    pub display_type: Option<String>,   // "file" | "null"
    pub output_dir: Option<PathBuf>,
    pub vcom: Option<f32>,
    pub rotation: Option<i16>,
    pub mirror: Option<bool>,
    pub screen_mode: Option<ScreenMode>,
    pub force_onebit: Option<bool>,
    /// [width, height] of the simulated panel
    pub resolution: Option<[u32; 2]>,
    pub max_refresh: Option<u32>,
    pub tick_seconds: Option<u64>,
    pub plugin_timeout: Option<u64>,
    pub inactive_priority: Option<i32>,
    pub splash: Option<bool>,
    pub no_wipe: Option<bool>,
    pub cache: Option<CacheConfig>,
    pub snapshot: Option<SnapshotConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    /// Persistent cache directory, a throwaway temp dir when unset
    pub path: Option<PathBuf>,
    /// Files older than this are evicted at startup
    pub max_age_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SnapshotConfig {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub keep: Option<usize>,
}

/// One entry of the `plugins` list
///
/// Keys other than the ones below are handed to the plugin untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginConfig {
    pub name: String,
    pub plugin: String,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub refresh_rate: Option<u64>,
    #[serde(default)]
    pub min_display_time: Option<u64>,
    #[serde(default)]
    pub max_priority: Option<i32>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub options: PluginData,
}

impl PluginConfig {
    pub fn new(name: impl Into<String>, plugin: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            plugin: plugin.into(),
            layout: None,
            refresh_rate: None,
            min_display_time: None,
            max_priority: None,
            enabled: None,
            options: PluginData::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Fully resolved screen settings handed to the screen factory
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub display_type: String,
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub rotation: i16,
    pub mirror: bool,
    pub screen_mode: ScreenMode,
    pub force_onebit: bool,
    pub vcom: Option<f32>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            display_type: constants::DEFAULT_DISPLAY_TYPE.to_string(),
            output_dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            width: constants::DEFAULT_WIDTH,
            height: constants::DEFAULT_HEIGHT,
            rotation: 0,
            mirror: false,
            screen_mode: ScreenMode::OneBit,
            force_onebit: false,
            vcom: None,
        }
    }
}

impl DisplayConfig {
    /// Geometry the layouts draw at, panel size with rotation applied
    pub fn logical_resolution(&self) -> (u32, u32) {
        match self.rotation.rem_euclid(360) {
            90 | 270 => (self.height, self.width),
            _ => (self.width, self.height),
        }
    }

    /// Mode frames are rendered in; `force_onebit` wins over the panel mode
    pub fn effective_mode(&self) -> ScreenMode {
        if self.force_onebit { ScreenMode::OneBit } else { self.screen_mode }
    }

    /// Grayscale (HD) panels ghost and need a periodic full clear
    pub fn supports_refresh_budget(&self) -> bool {
        self.screen_mode == ScreenMode::Gray
    }
}

impl MainConfig {
    /// Built-in defaults, the bottom layer of every load
    pub fn builtin() -> Self {
        Self {
            log_level: Some(constants::DEFAULT_LOG_LEVEL.to_string()),
            display_type: Some(constants::DEFAULT_DISPLAY_TYPE.to_string()),
            output_dir: Some(PathBuf::from(constants::DEFAULT_OUTPUT_DIR)),
            vcom: None,
            rotation: Some(0),
            mirror: Some(false),
            screen_mode: Some(ScreenMode::OneBit),
            force_onebit: Some(false),
            resolution: Some([constants::DEFAULT_WIDTH, constants::DEFAULT_HEIGHT]),
            max_refresh: Some(constants::DEFAULT_MAX_REFRESH),
            tick_seconds: Some(constants::DEFAULT_TICK_SECONDS),
            plugin_timeout: Some(constants::DEFAULT_PLUGIN_TIMEOUT),
            inactive_priority: Some(constants::INACTIVE_PRIORITY),
            splash: Some(true),
            no_wipe: Some(false),
            cache: Some(CacheConfig::default()),
            snapshot: Some(SnapshotConfig::default()),
        }
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(constants::DEFAULT_LOG_LEVEL)
    }

    pub fn max_refresh(&self) -> u32 {
        self.max_refresh.unwrap_or(constants::DEFAULT_MAX_REFRESH)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_seconds.unwrap_or(constants::DEFAULT_TICK_SECONDS))
    }

    pub fn plugin_timeout(&self) -> Duration {
        Duration::from_secs(self.plugin_timeout.unwrap_or(constants::DEFAULT_PLUGIN_TIMEOUT))
    }

    pub fn inactive_priority(&self) -> i32 {
        self.inactive_priority.unwrap_or(constants::INACTIVE_PRIORITY)
    }

    pub fn splash(&self) -> bool {
        self.splash.unwrap_or(true)
    }

    pub fn no_wipe(&self) -> bool {
        self.no_wipe.unwrap_or(false)
    }

    pub fn display_config(&self) -> DisplayConfig {
        let defaults = DisplayConfig::default();
        let [width, height] = self.resolution.unwrap_or([defaults.width, defaults.height]);
        DisplayConfig {
            display_type: self.display_type.clone().unwrap_or(defaults.display_type),
            output_dir: self.output_dir.clone().unwrap_or(defaults.output_dir),
            width,
            height,
            rotation: self.rotation.unwrap_or(0),
            mirror: self.mirror.unwrap_or(false),
            screen_mode: self.screen_mode.unwrap_or(ScreenMode::OneBit),
            force_onebit: self.force_onebit.unwrap_or(false),
            vcom: self.vcom,
        }
    }
}

impl Config {
    pub fn builtin() -> Self {
        Self { main: MainConfig::builtin(), plugins: None }
    }

    /// Enabled entries in file order with the fallback plugin appended
    pub fn active_plugins(&self) -> Vec<PluginConfig> {
        let mut active: Vec<PluginConfig> = Vec::new();
        for entry in self.plugins.iter().flatten() {
            if entry.is_enabled() {
                active.push(entry.clone());
            } else {
                info!("skipping disabled plugin '{}'", entry.name);
            }
        }
        active.push(fallback_entry());
        active
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// CLI flags. Overrides are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "paperpi", about = "PaperPi e-paper display", disable_version_flag = true)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(short = 'c', long, value_hint = ValueHint::FilePath, conflicts_with = "daemon")]
    pub config: Option<PathBuf>,
    /// run as a service using the system-wide config
    #[arg(short = 'd', long, action = ArgAction::SetTrue)]
    pub daemon: bool,
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,
    #[arg(long)]
    pub display_type: Option<String>,
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,
    /// list the available plugins and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub list_plugins: bool,
    /// show help, layouts and a sample config for one plugin
    #[arg(long, value_name = "PLUGIN")]
    pub plugin_info: Option<String>,
    /// run a plugin user function, e.g. word_clock.time_words 10:35
    #[arg(long, value_name = "PLUGIN.FUNC", num_args = 1.., allow_hyphen_values = true)]
    pub run_plugin_func: Option<Vec<String>>,
    /// print version and build date then exit
    #[arg(short = 'V', long, action = ArgAction::SetTrue)]
    pub version: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: read YAML layers, merge, apply CLI, validate.
pub fn load(cli: &Cli) -> Result<Config, ConfigError> {
    let mut files = Vec::new();
    if let Some(base) = find_base_file() {
        files.push(base);
    }

    if let Some(p) = cli.config.as_ref() {
        files.push(require(p)?);
    } else if cli.daemon {
        files.push(require(Path::new(constants::CONFIG_SYSTEM))?);
    } else if let Some(p) = user_config_path().filter(|p| p.exists()) {
        files.push(p);
    } else {
        info!("no user config found, running with built-in defaults");
    }

    layered(&files, cli)
}

/// Merge `files` in order over the built-in defaults, then CLI overrides
pub fn layered(files: &[PathBuf], cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::builtin();
    for path in files {
        debug!("merging config {}", path.display());
        merge(&mut cfg, read_yaml(path)?);
    }
    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

pub fn user_config_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(constants::CONFIG_USER))
}

/// Base file next to the binary, or in the working directory
fn find_base_file() -> Option<PathBuf> {
    let beside_exe = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(constants::CONFIG_BASE)));
    beside_exe
        .into_iter()
        .chain(std::iter::once(PathBuf::from(constants::CONFIG_BASE)))
        .find(|p| p.exists())
}

fn require(path: &Path) -> Result<PathBuf, ConfigError> {
    if path.exists() {
        Ok(path.to_path_buf())
    } else {
        Err(ConfigError::NotFound(path.to_path_buf()))
    }
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    if s.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    merge_main(&mut dst.main, src.main);
    if src.plugins.is_some() { dst.plugins = src.plugins; }
}

fn merge_main(dst: &mut MainConfig, src: MainConfig) {
    if src.log_level.is_some()         { dst.log_level = src.log_level; }
    if src.display_type.is_some()      { dst.display_type = src.display_type; }
    if src.output_dir.is_some()        { dst.output_dir = src.output_dir; }
    if src.vcom.is_some()              { dst.vcom = src.vcom; }
    if src.rotation.is_some()          { dst.rotation = src.rotation; }
    if src.mirror.is_some()            { dst.mirror = src.mirror; }
    if src.screen_mode.is_some()       { dst.screen_mode = src.screen_mode; }
    if src.force_onebit.is_some()      { dst.force_onebit = src.force_onebit; }
    if src.resolution.is_some()        { dst.resolution = src.resolution; }
    if src.max_refresh.is_some()       { dst.max_refresh = src.max_refresh; }
    if src.tick_seconds.is_some()      { dst.tick_seconds = src.tick_seconds; }
    if src.plugin_timeout.is_some()    { dst.plugin_timeout = src.plugin_timeout; }
    if src.inactive_priority.is_some() { dst.inactive_priority = src.inactive_priority; }
    if src.splash.is_some()            { dst.splash = src.splash; }
    if src.no_wipe.is_some()           { dst.no_wipe = src.no_wipe; }
    match (&mut dst.cache, src.cache) {
        (None, Some(c)) => dst.cache = Some(c),
        (Some(d), Some(s)) => {
            if s.path.is_some()            { d.path = s.path; }
            if s.max_age_seconds.is_some() { d.max_age_seconds = s.max_age_seconds; }
        }
        _ => {}
    }
    match (&mut dst.snapshot, src.snapshot) {
        (None, Some(s)) => dst.snapshot = Some(s),
        (Some(d), Some(s)) => {
            if s.enabled.is_some() { d.enabled = s.enabled; }
            if s.dir.is_some()     { d.dir = s.dir; }
            if s.keep.is_some()    { d.keep = s.keep; }
        }
        _ => {}
    }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()    { cfg.main.log_level = cli.log_level.clone(); }
    if cli.display_type.is_some() { cfg.main.display_type = cli.display_type.clone(); }
    if cli.output_dir.is_some()   { cfg.main.output_dir = cli.output_dir.clone(); }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    let main = &cfg.main;
    if let Some([w, h]) = main.resolution {
        if w == 0 || h == 0 {
            return Err(ConfigError::Validation("resolution width/height must be > 0".into()));
        }
    }
    if let Some(rot) = main.rotation {
        match rot {
            0 | 90 | -90 | 180 | 270 => {},
            _ => return Err(ConfigError::Validation("rotation must be 0|90|-90|180|270".into()))
        }
    }
    if main.max_refresh == Some(0) {
        return Err(ConfigError::Validation("max_refresh must be at least 1".into()));
    }
    if main.tick_seconds == Some(0) {
        return Err(ConfigError::Validation("tick_seconds must be at least 1".into()));
    }
    if let Some(level) = main.log_level.as_deref() {
        match level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(ConfigError::Validation(format!("unknown log_level '{}'", level)))
        }
    }
    if let Some(snapshot) = main.snapshot.as_ref() {
        if snapshot.keep == Some(0) {
            return Err(ConfigError::Validation("snapshot keep must be at least 1".into()));
        }
    }
    for entry in cfg.plugins.iter().flatten() {
        if entry.name.trim().is_empty() || entry.plugin.trim().is_empty() {
            return Err(ConfigError::Validation("every plugin entry needs a name and a plugin".into()));
        }
    }
    Ok(())
}
