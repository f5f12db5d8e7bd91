/*
 *  pacer.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed period tick pacing for the rotation loop
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
use tokio::time::{sleep_until, Duration, Instant};

pub struct Pacer {
    next_deadline: Instant,
    period: Duration,
}

// ticks start `period` apart; a tick that overruns makes the next one
// start immediately, never two at once
impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self { next_deadline: Instant::now() + period, period }
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the next tick is due and schedule the one after.
    pub async fn wait(&mut self) {
        sleep_until(self.next_deadline).await;
        self.next_deadline = Instant::now() + self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_are_one_period_apart() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_secs(5));
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(5));
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_starts_immediately() {
        let start = Instant::now();
        let mut pacer = Pacer::new(Duration::from_secs(5));
        tokio::time::advance(Duration::from_secs(7)).await;
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(7));
        pacer.wait().await;
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }
}
