/*
 *  plugin/mod.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Content providers - the fetcher contract and the per-unit wrapper
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

pub mod builtin;
pub mod error;
pub mod registry;
pub mod timeout;
pub mod unit;

use std::sync::Arc;

use serde_json::Value;

use crate::cache::CacheStore;
use crate::display::ScreenMode;

pub use error::{FetchError, PluginError};
pub use registry::PluginRegistry;
pub use timeout::{GuardError, TimeoutGuard};
pub use unit::{PluginUnit, UnitSettings, UpdateOutcome};

/// Free-form payload a plugin hands to its layout
pub type PluginData = serde_json::Map<String, Value>;

/// Result of one successful fetch
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// The plugin believes it has something new to show
    pub updated: bool,
    pub data: PluginData,
    pub priority: i32,
}

impl FetchOutcome {
    pub fn new(updated: bool, data: PluginData, priority: i32) -> Self {
        Self { updated, data, priority }
    }
}

/// What a fetcher may know about the world it runs in
#[derive(Debug, Clone)]
pub struct PluginContext {
    pub name: String,
    pub max_priority: i32,
    pub resolution: (u32, u32),
    pub screen_mode: ScreenMode,
    /// The plugin's own section of the config
    pub options: PluginData,
    pub cache: Option<Arc<CacheStore>>,
}

impl PluginContext {
    /// Bare context, handy for helpers and tests
    pub fn new(name: impl Into<String>, max_priority: i32) -> Self {
        Self {
            name: name.into(),
            max_priority,
            resolution: (0, 0),
            screen_mode: ScreenMode::OneBit,
            options: PluginData::new(),
            cache: None,
        }
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    pub fn option_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(Value::as_bool)
    }

    pub fn option_f64(&self, key: &str) -> Option<f64> {
        self.options.get(key).and_then(Value::as_f64)
    }

    pub fn option_i64(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(Value::as_i64)
    }
}

/// One content source
///
/// Fetches run on the blocking pool, so an implementation is free to do
/// synchronous I/O. A fetch that outlives its timeout is abandoned, not
/// cancelled, and the unit will not call it again until it returns.
pub trait Fetcher: Send + 'static {
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError>;
}

impl<F> Fetcher for F
where
    F: FnMut(&PluginContext) -> Result<FetchOutcome, FetchError> + Send + 'static,
{
    fn fetch(&mut self, ctx: &PluginContext) -> Result<FetchOutcome, FetchError> {
        self(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_closure_is_a_fetcher() {
        let mut calls = 0;
        let mut fetcher = move |ctx: &PluginContext| {
            calls += 1;
            let mut data = PluginData::new();
            data.insert("calls".into(), json!(calls));
            Ok::<_, FetchError>(FetchOutcome::new(true, data, ctx.max_priority))
        };
        let ctx = PluginContext::new("closure", 7);
        let out = Fetcher::fetch(&mut fetcher, &ctx).unwrap();
        assert_eq!(out.priority, 7);
        let out = Fetcher::fetch(&mut fetcher, &ctx).unwrap();
        assert_eq!(out.data["calls"], json!(2));
    }

    #[test]
    fn test_option_accessors() {
        let mut ctx = PluginContext::new("opts", 1);
        ctx.options = json!({"msg": "hi", "flag": true, "rate": 0.5, "n": 3})
            .as_object()
            .cloned()
            .unwrap();
        assert_eq!(ctx.option_str("msg"), Some("hi"));
        assert_eq!(ctx.option_bool("flag"), Some(true));
        assert_eq!(ctx.option_f64("rate"), Some(0.5));
        assert_eq!(ctx.option_i64("n"), Some(3));
        assert_eq!(ctx.option_str("missing"), None);
    }
}
