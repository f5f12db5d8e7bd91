/*
 *  plugin/unit.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  PluginUnit - one content source with its data, image, hash and priority
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

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use tokio::time::Instant;

use super::timeout::{share, GuardError, SharedFetcher, TimeoutGuard};
use super::{FetchOutcome, Fetcher, PluginContext, PluginData};
use crate::display::{ColorDepth, FrameBuffer, PageLayout};

static HASH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Timing and priority knobs for one unit
#[derive(Debug, Clone)]
pub struct UnitSettings {
    pub name: String,
    /// Minimum time between two fetch attempts
    pub refresh_interval: Duration,
    /// Minimum time on screen once selected
    pub min_display_time: Duration,
    pub max_priority: i32,
    /// Ceiling for one fetch, zero for none
    pub timeout: Duration,
}

impl UnitSettings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            refresh_interval: Duration::from_secs(crate::constants::DEFAULT_REFRESH_RATE),
            min_display_time: Duration::from_secs(crate::constants::DEFAULT_MIN_DISPLAY_TIME),
            max_priority: crate::constants::INACTIVE_PRIORITY,
            timeout: Duration::from_secs(crate::constants::DEFAULT_PLUGIN_TIMEOUT),
        }
    }
}

/// What one `update` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Too soon since the last attempt, nothing was called
    Throttled,
    /// Fetched, data identical, only the priority was refreshed
    Unchanged,
    /// New data, new image, new hash
    Changed,
    TimedOut,
    /// A previous call that timed out has not returned yet
    Busy,
    /// Fetch error, panic or render failure
    Failed,
}

impl UpdateOutcome {
    pub fn is_failure(self) -> bool {
        matches!(self, UpdateOutcome::TimedOut | UpdateOutcome::Busy | UpdateOutcome::Failed)
    }
}

/// One content source as the rotation engine sees it
///
/// `data`, `image`, `hash` and `priority` are only ever replaced together,
/// after the new image rendered, so any reader sees a consistent set.
pub struct PluginUnit {
    settings: UnitSettings,
    fetcher: SharedFetcher,
    guard: TimeoutGuard,
    layout: PageLayout,
    context: PluginContext,
    depth: ColorDepth,

    last_fetch: Option<Instant>,
    data: PluginData,
    image: FrameBuffer,
    hash: String,
    priority: i32,
}

impl std::fmt::Debug for PluginUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginUnit")
            .field("name", &self.settings.name)
            .field("layout", &self.layout.name)
            .field("priority", &self.priority)
            .field("hash", &self.hash)
            .finish()
    }
}

impl PluginUnit {
    /// Starts inactive at `max_priority` with a blank image and fresh hash
    pub fn new(
        settings: UnitSettings,
        fetcher: Box<dyn Fetcher>,
        layout: PageLayout,
        mut context: PluginContext,
        depth: ColorDepth,
    ) -> Self {
        context.name = settings.name.clone();
        context.max_priority = settings.max_priority;
        let (w, h) = context.resolution;
        info!(
            "unit '{}' layout '{}' refresh {:?} display {:?} timeout {:?}",
            settings.name, layout.name, settings.refresh_interval, settings.min_display_time, settings.timeout
        );
        Self {
            guard: TimeoutGuard::new(settings.timeout),
            hash: fresh_hash(&settings.name),
            priority: settings.max_priority,
            image: FrameBuffer::new(w, h, depth),
            data: PluginData::new(),
            last_fetch: None,
            fetcher: share(fetcher),
            layout,
            context,
            depth,
            settings,
        }
    }

    pub fn name(&self) -> &str { &self.settings.name }
    pub fn priority(&self) -> i32 { self.priority }
    pub fn max_priority(&self) -> i32 { self.settings.max_priority }
    pub fn hash(&self) -> &str { &self.hash }
    pub fn data(&self) -> &PluginData { &self.data }
    pub fn image(&self) -> &FrameBuffer { &self.image }
    pub fn min_display_time(&self) -> Duration { self.settings.min_display_time }
    pub fn refresh_interval(&self) -> Duration { self.settings.refresh_interval }
    pub fn timeout(&self) -> Duration { self.settings.timeout }
    pub fn last_fetch(&self) -> Option<Instant> { self.last_fetch }
    pub fn layout_name(&self) -> &str { &self.layout.name }

    /// Throttled refresh, see `UpdateOutcome` for what can come back
    pub async fn update(&mut self, force: bool) -> UpdateOutcome {
        let now = Instant::now();
        if !force {
            if let Some(last) = self.last_fetch {
                if now.saturating_duration_since(last) < self.settings.refresh_interval {
                    return UpdateOutcome::Throttled;
                }
            }
        }
        self.last_fetch = Some(now);

        match self.guard.run(&self.fetcher, &self.context).await {
            Ok(outcome) => self.apply(outcome, force),
            Err(GuardError::TimedOut(after)) => {
                warn!("'{}' timed out after {:?}, keeping previous data", self.settings.name, after);
                UpdateOutcome::TimedOut
            }
            Err(GuardError::Busy) => {
                warn!("'{}' is still busy with an earlier fetch", self.settings.name);
                UpdateOutcome::Busy
            }
            Err(e) => {
                error!("'{}' failed to update: {}", self.settings.name, e);
                UpdateOutcome::Failed
            }
        }
    }

    /// Fetch regardless of the throttle and always regenerate the image
    pub async fn force_update(&mut self) -> UpdateOutcome {
        self.update(true).await
    }

    fn apply(&mut self, outcome: FetchOutcome, force: bool) -> UpdateOutcome {
        debug!("'{}' fetched, updated={} priority={}", self.settings.name, outcome.updated, outcome.priority);
        if !force && outcome.data == self.data {
            self.priority = outcome.priority;
            return UpdateOutcome::Unchanged;
        }

        let (w, h) = self.context.resolution;
        let image = match self.layout.render(&outcome.data, w, h, self.depth) {
            Ok(image) => image,
            Err(e) => {
                error!("'{}' could not render its layout: {}", self.settings.name, e);
                return UpdateOutcome::Failed;
            }
        };

        self.data = outcome.data;
        self.image = image;
        self.priority = outcome.priority;
        self.hash = fresh_hash(&self.settings.name);
        UpdateOutcome::Changed
    }
}

/// Opaque change token, unique within the process
fn fresh_hash(name: &str) -> String {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default()
        .hash(&mut hasher);
    HASH_COUNTER.fetch_add(1, Ordering::Relaxed).hash(&mut hasher);
    let mut hex = format!("{:016x}", hasher.finish());
    hex.truncate(10);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{Field, FieldArea};
    use crate::plugin::FetchError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};

    fn layout() -> PageLayout {
        PageLayout::new("layout").add_field(Field::new_text("msg", FieldArea::FULL))
    }

    fn data(msg: &str) -> PluginData {
        json!({ "msg": msg }).as_object().cloned().unwrap()
    }

    /// Fetcher that replays a script of (msg, priority) and counts calls
    fn scripted(script: Arc<Mutex<(String, i32)>>, calls: Arc<AtomicUsize>) -> Box<dyn Fetcher> {
        Box::new(move |_: &PluginContext| {
            calls.fetch_add(1, Ordering::SeqCst);
            let (msg, priority) = script.lock().unwrap().clone();
            Ok::<_, FetchError>(FetchOutcome::new(true, data(&msg), priority))
        })
    }

    fn unit_with(settings: UnitSettings, fetcher: Box<dyn Fetcher>) -> PluginUnit {
        let mut ctx = PluginContext::new(settings.name.clone(), settings.max_priority);
        ctx.resolution = (80, 40);
        PluginUnit::new(settings, fetcher, layout(), ctx, ColorDepth::Monochrome)
    }

    fn settings(name: &str, refresh: u64) -> UnitSettings {
        UnitSettings {
            name: name.into(),
            refresh_interval: Duration::from_secs(refresh),
            min_display_time: Duration::ZERO,
            max_priority: 10,
            timeout: Duration::ZERO,
        }
    }

    #[test]
    fn test_new_unit_is_inactive_and_blank() {
        let script = Arc::new(Mutex::new(("x".to_string(), 1)));
        let unit = unit_with(settings("fresh", 60), scripted(script, Arc::default()));
        assert_eq!(unit.priority(), 10);
        assert!(unit.data().is_empty());
        assert_eq!(unit.image().ink_count(), 0);
        assert_eq!(unit.hash().len(), 10);
        assert!(unit.last_fetch().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_holds_between_refreshes() {
        let script = Arc::new(Mutex::new(("hello".to_string(), 5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut unit = unit_with(settings("throttled", 60), scripted(script.clone(), calls.clone()));

        assert_eq!(unit.update(false).await, UpdateOutcome::Changed);
        let hash = unit.hash().to_string();

        tokio::time::advance(Duration::from_secs(10)).await;
        script.lock().unwrap().0 = "changed".into();
        assert_eq!(unit.update(false).await, UpdateOutcome::Throttled);
        assert_eq!(unit.hash(), hash);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(50)).await;
        assert_eq!(unit.update(false).await, UpdateOutcome::Changed);
        assert_ne!(unit.hash(), hash);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_data_keeps_hash_but_takes_priority() {
        let script = Arc::new(Mutex::new(("same".to_string(), 5)));
        let mut unit = unit_with(settings("steady", 0), scripted(script.clone(), Arc::default()));

        unit.update(false).await;
        let hash = unit.hash().to_string();
        let image = unit.image().clone();

        script.lock().unwrap().1 = 3;
        assert_eq!(unit.update(false).await, UpdateOutcome::Unchanged);
        assert_eq!(unit.hash(), hash);
        assert_eq!(unit.image(), &image);
        assert_eq!(unit.priority(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_regenerates_even_when_identical() {
        let script = Arc::new(Mutex::new(("same".to_string(), 5)));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut unit = unit_with(settings("forced", 3600), scripted(script, calls.clone()));

        unit.update(false).await;
        let hash = unit.hash().to_string();
        assert_eq!(unit.force_update().await, UpdateOutcome::Changed);
        assert_ne!(unit.hash(), hash);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_previous_snapshot() {
        let fail = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = fail.clone();
        let fetcher = Box::new(move |_: &PluginContext| {
            if flag.load(Ordering::SeqCst) {
                Err(FetchError::msg("upstream down"))
            } else {
                Ok(FetchOutcome::new(true, data("good"), 4))
            }
        });
        let mut unit = unit_with(settings("flaky", 0), fetcher);

        unit.update(false).await;
        let hash = unit.hash().to_string();

        fail.store(true, Ordering::SeqCst);
        assert_eq!(unit.update(false).await, UpdateOutcome::Failed);
        assert_eq!(unit.hash(), hash);
        assert_eq!(unit.priority(), 4);
        assert_eq!(unit.data()["msg"], json!("good"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_failure_commits_nothing() {
        let script = Arc::new(Mutex::new(("fresh".to_string(), 2)));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut ctx = PluginContext::new("shapeless", 10);
        // nothing can be drawn on a zero sized frame
        ctx.resolution = (0, 0);
        let mut unit = PluginUnit::new(
            settings("shapeless", 0),
            scripted(script, calls.clone()),
            layout(),
            ctx,
            ColorDepth::Monochrome,
        );
        let hash = unit.hash().to_string();
        let image = unit.image().clone();

        assert_eq!(unit.update(false).await, UpdateOutcome::Failed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(unit.hash(), hash);
        assert_eq!(unit.image(), &image);
        assert_eq!(unit.priority(), 10);
        assert!(unit.data().is_empty());

        assert_eq!(unit.force_update().await, UpdateOutcome::Failed);
        assert_eq!(unit.hash(), hash);
        assert_eq!(unit.priority(), 10);
    }

    #[tokio::test]
    async fn test_timeout_leaves_unit_untouched() {
        let fetcher = Box::new(|_: &PluginContext| {
            std::thread::sleep(Duration::from_millis(600));
            Ok::<_, FetchError>(FetchOutcome::new(true, data("late"), 1))
        });
        let mut s = settings("sleepy", 0);
        s.timeout = Duration::from_millis(100);
        let mut unit = unit_with(s, fetcher);
        let hash = unit.hash().to_string();

        let started = std::time::Instant::now();
        assert_eq!(unit.update(false).await, UpdateOutcome::TimedOut);
        assert!(started.elapsed() < Duration::from_millis(500));
        assert_eq!(unit.hash(), hash);
        assert_eq!(unit.priority(), 10);
        assert!(unit.data().is_empty());
    }

    #[test]
    fn test_hashes_are_unique() {
        let a = fresh_hash("same");
        let b = fresh_hash("same");
        assert_ne!(a, b);
    }
}
