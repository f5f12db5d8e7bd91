/*
 *  engine/rotation.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  RotationEngine - picks which unit owns the screen each tick
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

use log::{debug, error, info, warn};
use tokio::time::Instant;

use crate::constants::{DEFAULT_MAX_REFRESH, INACTIVE_PRIORITY, PRIORITY_FLOOR_SENTINEL};
use crate::display::DisplaySink;
use crate::func_timer::FunctionTimer;
use crate::plugin::{PluginUnit, UpdateOutcome};

#[derive(Debug, Clone, Copy)]
pub struct EngineSettings {
    /// Writes between two full clears on panels with a refresh budget
    pub max_refresh: u32,
    /// Units at or above this priority are never shown
    pub inactive_priority: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { max_refresh: DEFAULT_MAX_REFRESH, inactive_priority: INACTIVE_PRIORITY }
    }
}

/// What one tick did, for logs and tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the unit on screen after this tick
    pub active: Option<usize>,
    pub selected: Option<String>,
    /// A different unit (or any unit after none) was picked this tick
    pub switched: bool,
    pub wrote: bool,
    pub cleared: bool,
    pub write_failed: bool,
    /// Units whose refresh timed out, was busy or failed
    pub refresh_failures: usize,
    pub current_floor: i32,
    pub previous_floor: i32,
}

#[derive(Debug)]
pub struct RotationEngine {
    units: Vec<PluginUnit>,
    settings: EngineSettings,
    started: bool,
    cursor: usize,
    /// False until something is selected, and after a failed write
    active: bool,
    active_since: Option<Instant>,
    last_displayed_hash: Option<String>,
    current_floor: i32,
    previous_floor: i32,
    refresh_count: u32,
}

impl RotationEngine {
    pub fn new(units: Vec<PluginUnit>, settings: EngineSettings) -> Self {
        info!(
            "rotation engine with {} units, max_refresh {}, inactive at {}",
            units.len(),
            settings.max_refresh,
            settings.inactive_priority
        );
        Self {
            units,
            settings,
            started: false,
            cursor: 0,
            active: false,
            active_since: None,
            last_displayed_hash: None,
            current_floor: PRIORITY_FLOOR_SENTINEL,
            previous_floor: PRIORITY_FLOOR_SENTINEL,
            refresh_count: 0,
        }
    }

    pub fn units(&self) -> &[PluginUnit] { &self.units }
    pub fn floor(&self) -> i32 { self.current_floor }
    pub fn previous_floor(&self) -> i32 { self.previous_floor }
    pub fn refresh_count(&self) -> u32 { self.refresh_count }
    pub fn last_displayed_hash(&self) -> Option<&str> { self.last_displayed_hash.as_deref() }

    pub fn active_index(&self) -> Option<usize> {
        (self.active && self.cursor < self.units.len()).then_some(self.cursor)
    }

    pub fn active_unit(&self) -> Option<&PluginUnit> {
        self.active_index().map(|i| &self.units[i])
    }

    /// First paint: force every unit, then pick the first eligible from index 0
    pub async fn start(&mut self, sink: &mut dyn DisplaySink) -> TickReport {
        let _timer = FunctionTimer::new("rotation start");
        self.started = true;

        let mut report = TickReport::default();
        for unit in self.units.iter_mut() {
            let outcome = unit.force_update().await;
            if outcome.is_failure() {
                warn!("'{}' first update {:?}, retrying on later ticks", unit.name(), outcome);
                report.refresh_failures += 1;
            }
        }

        self.current_floor = self.lowest_priority();
        self.previous_floor = self.current_floor;
        self.cursor = 0;
        self.active = false;
        if let Some(idx) = self.find_eligible(0) {
            self.select(idx, &mut report);
        } else {
            warn!("no unit is eligible at startup, floor {}", self.current_floor);
        }
        self.render(sink, &mut report);
        self.finish(report)
    }

    /// One Refreshing -> Evaluating -> Holding/Switching -> Rendering pass
    pub async fn tick(&mut self, sink: &mut dyn DisplaySink) -> TickReport {
        if !self.started {
            return self.start(sink).await;
        }
        let _timer = FunctionTimer::new("rotation tick");
        let mut report = TickReport::default();

        for unit in self.units.iter_mut() {
            let outcome = unit.update(false).await;
            if outcome.is_failure() {
                report.refresh_failures += 1;
            }
            if outcome == UpdateOutcome::Changed {
                debug!("'{}' has new content, priority {}", unit.name(), unit.priority());
            }
        }

        self.previous_floor = self.current_floor;
        self.current_floor = self.lowest_priority();

        if self.active_is_ineligible() {
            match self.find_eligible(1) {
                Some(idx) => self.select(idx, &mut report),
                None => {
                    if self.active {
                        info!("nothing eligible at floor {}, holding", self.current_floor);
                    }
                    self.active = false;
                }
            }
        }

        self.render(sink, &mut report);
        self.finish(report)
    }

    fn lowest_priority(&self) -> i32 {
        self.units
            .iter()
            .map(PluginUnit::priority)
            .min()
            .unwrap_or(PRIORITY_FLOOR_SENTINEL)
            .min(PRIORITY_FLOOR_SENTINEL)
    }

    fn active_is_ineligible(&self) -> bool {
        let Some(unit) = self.active_unit() else { return true };
        if self.current_floor > self.previous_floor {
            debug!("floor rose {} -> {}, moving on from '{}'", self.previous_floor, self.current_floor, unit.name());
            return true;
        }
        match self.active_since {
            Some(since) => since.elapsed() > unit.min_display_time(),
            None => true,
        }
    }

    fn is_eligible(&self, unit: &PluginUnit) -> bool {
        unit.priority() <= self.current_floor && unit.priority() < self.settings.inactive_priority
    }

    /// Walk the rotation once, starting `offset` places after the cursor
    fn find_eligible(&self, offset: usize) -> Option<usize> {
        let len = self.units.len();
        (0..len)
            .map(|k| (self.cursor + offset + k) % len)
            .find(|&idx| self.is_eligible(&self.units[idx]))
    }

    fn select(&mut self, idx: usize, report: &mut TickReport) {
        report.switched = !self.active || idx != self.cursor;
        if report.switched {
            let unit = &self.units[idx];
            info!("displaying '{}' priority {} floor {}", unit.name(), unit.priority(), self.current_floor);
        }
        self.cursor = idx;
        self.active = true;
        self.active_since = Some(Instant::now());
    }

    fn render(&mut self, sink: &mut dyn DisplaySink, report: &mut TickReport) {
        let Some(idx) = self.active_index() else { return };
        let unit = &self.units[idx];
        if self.last_displayed_hash.as_deref() == Some(unit.hash()) {
            return;
        }

        if sink.supports_refresh_budget() && self.refresh_count + 1 >= self.settings.max_refresh {
            debug!("{} writes since last clear, wiping the panel", self.refresh_count);
            match sink.clear() {
                Ok(()) => {
                    self.refresh_count = 0;
                    report.cleared = true;
                }
                Err(e) => warn!("full clear failed: {}", e),
            }
        }

        match sink.write(unit.image()) {
            Ok(()) => {
                self.last_displayed_hash = Some(unit.hash().to_string());
                self.refresh_count += 1;
                report.wrote = true;
            }
            Err(e) => {
                error!("failed to write '{}' to the screen: {}", unit.name(), e);
                report.write_failed = true;
                self.active = false;
            }
        }
    }

    fn finish(&self, mut report: TickReport) -> TickReport {
        report.active = self.active_index();
        report.selected = self.active_unit().map(|u| u.name().to_string());
        report.current_floor = self.current_floor;
        report.previous_floor = self.previous_floor;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockScreen;
    use crate::display::{ColorDepth, Field, FieldArea, PageLayout};
    use crate::plugin::{FetchError, FetchOutcome, PluginContext, UnitSettings};
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const W: u32 = 64;
    const H: u32 = 32;

    /// Unit whose priority (and therefore content) follows `knob`
    fn unit(name: &str, knob: &Arc<AtomicI32>, min_display: u64) -> PluginUnit {
        let knob = Arc::clone(knob);
        let label = name.to_string();
        let fetcher = Box::new(move |_: &PluginContext| {
            let priority = knob.load(Ordering::SeqCst);
            let data = json!({ "msg": format!("{} {}", label, priority) }).as_object().cloned().unwrap();
            Ok::<_, FetchError>(FetchOutcome::new(true, data, priority))
        });
        let settings = UnitSettings {
            name: name.into(),
            refresh_interval: Duration::ZERO,
            min_display_time: Duration::from_secs(min_display),
            max_priority: INACTIVE_PRIORITY,
            timeout: Duration::ZERO,
        };
        let mut ctx = PluginContext::new(name, INACTIVE_PRIORITY);
        ctx.resolution = (W, H);
        let layout = PageLayout::new("layout").add_field(Field::new_text("msg", FieldArea::FULL));
        PluginUnit::new(settings, fetcher, layout, ctx, ColorDepth::Monochrome)
    }

    fn knobs(values: &[i32]) -> Vec<Arc<AtomicI32>> {
        values.iter().map(|v| Arc::new(AtomicI32::new(*v))).collect()
    }

    fn engine(knobs: &[Arc<AtomicI32>], min_display: u64, max_refresh: u32) -> RotationEngine {
        let names = ["a", "b", "c", "d"];
        let units = knobs.iter().zip(names).map(|(k, n)| unit(n, k, min_display)).collect();
        RotationEngine::new(units, EngineSettings { max_refresh, ..EngineSettings::default() })
    }

    async fn step(engine: &mut RotationEngine, screen: &mut MockScreen) -> TickReport {
        tokio::time::advance(Duration::from_secs(5)).await;
        engine.tick(screen).await
    }

    #[tokio::test(start_paused = true)]
    async fn test_basic_rotation() {
        let k = knobs(&[5, 5, 9]);
        let mut engine = engine(&k, 0, 100);
        let mut screen = MockScreen::new(W, H);

        let first = engine.tick(&mut screen).await;
        assert_eq!(first.active, Some(0));
        assert!(first.wrote);
        assert_eq!(first.current_floor, 5);

        k[0].store(20, Ordering::SeqCst);
        let second = step(&mut engine, &mut screen).await;
        assert_eq!(second.current_floor, 5);
        assert_eq!(second.active, Some(1));
        assert!(second.switched);
        assert!(second.wrote);
        assert_eq!(screen.state().lock().unwrap().write_count, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_display_time_holds_selection() {
        let k = knobs(&[1, 1]);
        let mut engine = engine(&k, 30, 100);
        let mut screen = MockScreen::new(W, H);

        assert_eq!(engine.tick(&mut screen).await.active, Some(0));
        // exactly 30s on screen still counts as within the minimum
        for _ in 0..6 {
            let report = step(&mut engine, &mut screen).await;
            assert_eq!(report.active, Some(0));
            assert!(!report.switched);
        }
        let report = step(&mut engine, &mut screen).await;
        assert_eq!(report.active, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_floor_increase_forces_switch() {
        let k = knobs(&[1, 5]);
        let mut engine = engine(&k, 3600, 100);
        let mut screen = MockScreen::new(W, H);

        let report = engine.tick(&mut screen).await;
        assert_eq!(report.active, Some(0));
        assert_eq!(report.current_floor, 1);

        // urgent content went away long before min_display_time
        k[0].store(5, Ordering::SeqCst);
        let report = step(&mut engine, &mut screen).await;
        assert_eq!(report.previous_floor, 1);
        assert_eq!(report.current_floor, 5);
        assert_eq!(report.active, Some(1));
        assert!(report.switched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_hash_does_not_write() {
        let k = knobs(&[3]);
        let mut engine = engine(&k, 0, 100);
        let mut screen = MockScreen::new(W, H);

        assert!(engine.tick(&mut screen).await.wrote);
        let report = step(&mut engine, &mut screen).await;
        assert_eq!(report.active, Some(0));
        assert!(!report.wrote);
        assert_eq!(screen.state().lock().unwrap().write_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_eligible_holds_then_recovers() {
        let k = knobs(&[INACTIVE_PRIORITY, INACTIVE_PRIORITY]);
        let mut engine = engine(&k, 0, 100);
        let mut screen = MockScreen::new(W, H);

        let report = engine.tick(&mut screen).await;
        assert_eq!(report.active, None);
        assert!(!report.wrote);
        let report = step(&mut engine, &mut screen).await;
        assert_eq!(report.active, None);
        assert_eq!(screen.state().lock().unwrap().write_attempts, 0);

        k[1].store(3, Ordering::SeqCst);
        let report = step(&mut engine, &mut screen).await;
        assert_eq!(report.active, Some(1));
        assert!(report.wrote);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_budget_clears_panel() {
        let k = knobs(&[2]);
        let mut engine = engine(&k, 0, 3);
        let mut screen = MockScreen::with_depth(W, H, ColorDepth::Gray4);
        let state = screen.state();

        engine.tick(&mut screen).await;
        for p in [3, 4] {
            k[0].store(p, Ordering::SeqCst);
            step(&mut engine, &mut screen).await;
        }
        // third write came after max_refresh - 1 writes
        assert_eq!(state.lock().unwrap().write_count, 3);
        assert_eq!(state.lock().unwrap().clear_count, 1);
        assert_eq!(engine.refresh_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mono_panel_never_clears() {
        let k = knobs(&[2]);
        let mut engine = engine(&k, 0, 2);
        let mut screen = MockScreen::new(W, H);

        engine.tick(&mut screen).await;
        for p in [3, 4, 5] {
            k[0].store(p, Ordering::SeqCst);
            assert!(!step(&mut engine, &mut screen).await.cleared);
        }
        assert_eq!(screen.state().lock().unwrap().clear_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_is_retried() {
        let k = knobs(&[2]);
        let mut engine = engine(&k, 0, 100);
        let mut screen = MockScreen::new(W, H);
        let state = screen.state();
        state.lock().unwrap().simulate_write_failure = true;

        let report = engine.tick(&mut screen).await;
        assert!(report.write_failed);
        assert_eq!(report.active, None);
        assert!(engine.last_displayed_hash().is_none());

        state.lock().unwrap().simulate_write_failure = false;
        let report = step(&mut engine, &mut screen).await;
        assert!(report.wrote);
        assert_eq!(report.active, Some(0));
        assert_eq!(engine.last_displayed_hash(), Some(engine.units()[0].hash()));
        assert_eq!(state.lock().unwrap().write_attempts, 2);
    }

    async fn selections(priorities: &[i32], ticks: usize) -> Vec<Option<usize>> {
        let k = knobs(priorities);
        let mut engine = engine(&k, 0, 100);
        let mut screen = MockScreen::new(W, H);
        let mut picked = vec![engine.tick(&mut screen).await.active];
        for _ in 1..ticks {
            picked.push(step(&mut engine, &mut screen).await.active);
        }
        picked
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_is_deterministic_and_wraps() {
        // three-way tie at 3, unit 1 is never eligible
        let first = selections(&[3, 9, 3, 3], 6).await;
        assert_eq!(first, vec![Some(0), Some(2), Some(3), Some(0), Some(2), Some(3)]);
        let second = selections(&[3, 9, 3, 3], 6).await;
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_engine_reports_sentinel() {
        let mut engine = RotationEngine::new(Vec::new(), EngineSettings::default());
        let mut screen = MockScreen::new(W, H);
        let report = engine.tick(&mut screen).await;
        assert_eq!(report.current_floor, PRIORITY_FLOOR_SENTINEL);
        assert_eq!(report.active, None);
        assert!(!report.wrote);
    }
}
