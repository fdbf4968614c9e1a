//! Start-to-start pacing between examples.

use std::time::Duration;
use tokio::time::Instant;

/// Enforces a minimum interval between the starts of consecutive examples.
///
/// The interval is a floor: if an example took longer than the interval to
/// process, the next one starts immediately.
///
/// ```
/// use logan_eval::Throttle;
/// use std::time::Duration;
///
/// # async fn example() {
/// let mut throttle = Throttle::new(Duration::from_secs(15));
/// throttle.wait_turn().await; // first call returns immediately
/// // ... process an example ...
/// throttle.wait_turn().await; // waits until 15s after the first start
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Throttle {
    min_interval: Duration,
    last_start: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_start: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next start is allowed, then record it.
    ///
    /// Returns how long this call slept.
    pub async fn wait_turn(&mut self) -> Duration {
        let now = Instant::now();
        let waited = match self.last_start {
            Some(last) => {
                let next = last + self.min_interval;
                if next > now {
                    let wait = next - now;
                    log::info!("Throttling {:.1}s before next example", wait.as_secs_f64());
                    tokio::time::sleep_until(next).await;
                    wait
                } else {
                    Duration::ZERO
                }
            }
            None => Duration::ZERO,
        };
        self.last_start = Some(Instant::now());
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_turn_is_immediate() {
        let mut throttle = Throttle::new(Duration::from_secs(15));
        assert_eq!(throttle.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_remaining_interval() {
        let mut throttle = Throttle::new(Duration::from_secs(3));
        let start = Instant::now();
        throttle.wait_turn().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        let waited = throttle.wait_turn().await;

        assert_eq!(waited, Duration::from_secs(2));
        assert!(Instant::now() - start >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_when_work_took_longer() {
        let mut throttle = Throttle::new(Duration::from_secs(3));
        throttle.wait_turn().await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(throttle.wait_turn().await, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_waits() {
        let mut throttle = Throttle::new(Duration::ZERO);
        for _ in 0..3 {
            assert_eq!(throttle.wait_turn().await, Duration::ZERO);
        }
    }
}
