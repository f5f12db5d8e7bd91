/*
 *  engine/mod.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Rotation engine and the paced loop that drives it
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

pub mod rotation;

use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::display::DisplaySink;
use crate::pacer::Pacer;

pub use rotation::{EngineSettings, RotationEngine, TickReport};

/// Tick `engine` every `period` until `shutdown` flips to true
///
/// A tick waiting on slow fetches is abandoned when shutdown arrives;
/// screen writes never await, so a frame is never half written.
pub async fn run(
    engine: &mut RotationEngine,
    sink: &mut dyn DisplaySink,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut pacer = Pacer::new(period);
    let mut ticks = 0usize;
    info!("rotation loop every {:?}", pacer.period());

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            report = engine.tick(sink) => {
                ticks += 1;
                debug!("tick {}: {:?}", ticks, report);
                if report.refresh_failures > 0 {
                    warn!("{} unit(s) failed to refresh this tick", report.refresh_failures);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("shutdown during tick {}", ticks + 1);
                    break;
                }
            }
        }

        tokio::select! {
            _ = pacer.wait() => {}
            changed = shutdown.changed() => {
                // sender gone, treat as shutdown
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("rotation loop finished after {} ticks", ticks);
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockScreen;

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = watch::channel(false);
        let mut engine = RotationEngine::new(Vec::new(), EngineSettings::default());
        let mut screen = MockScreen::new(8, 8);

        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            tx.send(true).ok();
        });
        let ticks = run(&mut engine, &mut screen, Duration::from_secs(5), rx).await;
        stopper.await.unwrap();
        // ticks at 0, 5 and 10 seconds
        assert_eq!(ticks, 3);
    }
}
