use std::time::Duration;
use tokio::time::{Instant, sleep};

/// Byte-rate throttle for media downloads. A rate of zero (the default
/// configuration) disables throttling entirely.
pub(crate) struct TokenBucket {
    capacity: f64,
    available: f64,
    refill_rate: f64,
    refilled_at: Instant,
}

impl TokenBucket {
    pub(crate) fn new(capacity: f64, refill_rate: f64) -> Self {
        TokenBucket {
            capacity,
            available: capacity,
            refill_rate,
            refilled_at: Instant::now(),
        }
    }

    pub(crate) async fn consume(&mut self, amount: usize) {
        if self.refill_rate <= 0.0 {
            return;
        }

        loop {
            let now = Instant::now();
            let elapsed = now.duration_since(self.refilled_at).as_secs_f64();
            self.available = (self.available + elapsed * self.refill_rate).min(self.capacity);
            self.refilled_at = now;

            if self.available >= amount as f64 {
                self.available -= amount as f64;
                return;
            }

            let deficit = amount as f64 - self.available;
            sleep(Duration::from_secs_f64(deficit / self.refill_rate)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_rate_never_blocks() {
        let mut bucket = TokenBucket::new(0.0, 0.0);
        bucket.consume(usize::MAX).await;
    }

    #[tokio::test(start_paused = true)]
    async fn drains_capacity_then_waits_for_refill() {
        let mut bucket = TokenBucket::new(1024.0, 1024.0);
        bucket.consume(1024).await;

        let before = Instant::now();
        bucket.consume(512).await;
        assert!(Instant::now() - before >= Duration::from_millis(500));
    }
}
