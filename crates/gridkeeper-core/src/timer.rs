//! Restartable periodic timer for the coordinator task.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// A periodic timer that can be armed and disarmed any number of times.
///
/// While disarmed, [`Ticker::tick`] never completes, so a disarmed ticker
/// is simply never selected. Arming always schedules the first firing one
/// full period from now.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    interval: Option<Interval>,
}

impl Ticker {
    /// A disarmed ticker with the given period.
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// Arm or disarm to match `should_run`. Matching state is left as is.
    pub fn sync(&mut self, should_run: bool) {
        match (should_run, self.interval.is_some()) {
            (true, false) => {
                let mut interval = time::interval_at(Instant::now() + self.period, self.period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                self.interval = Some(interval);
            }
            (false, true) => self.interval = None,
            _ => {}
        }
    }

    /// Whether the ticker is currently armed.
    pub const fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next firing.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_firing_is_one_period_out() {
        let mut ticker = Ticker::new(Duration::from_millis(500));
        ticker.sync(true);
        let start = Instant::now();
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_ticker_never_fires() {
        let mut ticker = Ticker::new(Duration::from_millis(10));
        ticker.sync(true);
        ticker.sync(false);
        assert!(!ticker.is_armed());
        let fired = time::timeout(Duration::from_secs(1), ticker.tick()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn resync_keeps_the_existing_schedule() {
        let mut ticker = Ticker::new(Duration::from_millis(100));
        ticker.sync(true);
        time::advance(Duration::from_millis(60)).await;
        ticker.sync(true);
        let start = Instant::now();
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_millis(40));
    }
}
