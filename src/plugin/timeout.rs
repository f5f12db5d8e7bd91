/*
 *  plugin/timeout.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Time-bounded fetch execution on the blocking pool
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

use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use log::warn;
use thiserror::Error;

use super::error::FetchError;
use super::{FetchOutcome, Fetcher, PluginContext};

/// A fetcher shared between its unit and any abandoned blocking task
pub type SharedFetcher = Arc<Mutex<Box<dyn Fetcher>>>;

pub fn share(fetcher: Box<dyn Fetcher>) -> SharedFetcher {
    Arc::new(Mutex::new(fetcher))
}

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("fetch timed out after {0:?}")]
    TimedOut(Duration),
    #[error("fetch failed: {0}")]
    Failed(#[from] FetchError),
    #[error("previous fetch is still running")]
    Busy,
    #[error("fetch panicked: {0}")]
    Panicked(String),
}

/// Bounds one fetch call
///
/// The fetch runs via `spawn_blocking`. On expiry the join handle is
/// dropped and the thread runs on to completion in the background; the
/// fetcher mutex keeps a second call from starting until it does.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutGuard {
    timeout: Duration,
}

impl TimeoutGuard {
    /// `Duration::ZERO` disables the bound
    pub fn new(timeout: Duration) -> Self {
        if timeout.is_zero() {
            warn!("fetch timeout disabled, a hung plugin will stall its unit forever");
        }
        Self { timeout }
    }

    pub fn is_bounded(&self) -> bool {
        !self.timeout.is_zero()
    }

    pub async fn run(&self, fetcher: &SharedFetcher, ctx: &PluginContext) -> Result<FetchOutcome, GuardError> {
        let fetcher = Arc::clone(fetcher);
        let ctx = ctx.clone();

        let task = tokio::task::spawn_blocking(move || {
            let mut guard = match fetcher.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::WouldBlock) => return Err(GuardError::Busy),
                // a panic inside an earlier fetch, the fetcher itself is still usable
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            };
            guard.fetch(&ctx).map_err(GuardError::Failed)
        });

        let joined = if self.is_bounded() {
            match tokio::time::timeout(self.timeout, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(GuardError::TimedOut(self.timeout)),
            }
        } else {
            task.await
        };

        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(GuardError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(GuardError::Panicked(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginData;
    use std::time::Instant;

    fn ok_fetcher(priority: i32) -> SharedFetcher {
        share(Box::new(move |_: &PluginContext| Ok::<_, FetchError>(FetchOutcome::new(true, PluginData::new(), priority))))
    }

    #[tokio::test]
    async fn test_fast_fetch_passes_through() {
        let guard = TimeoutGuard::new(Duration::from_secs(1));
        let out = guard.run(&ok_fetcher(3), &PluginContext::new("fast", 3)).await.unwrap();
        assert_eq!(out.priority, 3);
    }

    #[tokio::test]
    async fn test_slow_fetch_times_out() {
        let slow = share(Box::new(|_: &PluginContext| {
            std::thread::sleep(Duration::from_millis(1500));
            Ok::<_, FetchError>(FetchOutcome::new(true, PluginData::new(), 0))
        }));
        let guard = TimeoutGuard::new(Duration::from_millis(200));
        let started = Instant::now();
        let err = guard.run(&slow, &PluginContext::new("slow", 1)).await.unwrap_err();
        assert!(matches!(err, GuardError::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(1));

        // the abandoned call still holds the fetcher
        let err = guard.run(&slow, &PluginContext::new("slow", 1)).await.unwrap_err();
        assert!(matches!(err, GuardError::Busy));
    }

    #[tokio::test]
    async fn test_fetch_error_is_reported() {
        let failing = share(Box::new(|_: &PluginContext| Err::<FetchOutcome, _>(FetchError::msg("no route"))));
        let err = TimeoutGuard::new(Duration::ZERO)
            .run(&failing, &PluginContext::new("failing", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, GuardError::Failed(_)));
        assert!(err.to_string().contains("no route"));
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let panicky = share(Box::new(|_: &PluginContext| -> Result<FetchOutcome, FetchError> {
            panic!("plugin blew up")
        }));
        let guard = TimeoutGuard::new(Duration::from_secs(1));
        let err = guard.run(&panicky, &PluginContext::new("panicky", 1)).await.unwrap_err();
        assert!(matches!(err, GuardError::Panicked(ref m) if m.contains("blew up")));

        // poisoned mutex does not wedge the unit
        let err = guard.run(&panicky, &PluginContext::new("panicky", 1)).await.unwrap_err();
        assert!(matches!(err, GuardError::Panicked(_)));
    }
}
