use std::future::Future;
use std::time::Duration;
use tracing::info;

/// Bounded retry: `max_attempts` tries, waiting `delay * backoff_factor^(n-1)` after failure n.
/// No wait follows the last attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay: Duration::from_secs(30),
            backoff_factor: 1.0,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts, delay, backoff_factor: 1.0 }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        self.delay.mul_f64(self.backoff_factor.max(1.0).powi(exp))
    }

    /// Runs `op` until it yields `Some`, or the attempts run out.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Option<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        for attempt in 1..=self.max_attempts {
            if let Some(value) = op(attempt).await {
                return Some(value);
            }
            if attempt < self.max_attempts {
                let wait = self.delay_after(attempt);
                info!("🔁 {} not ready (attempt {}/{}), retrying in {:?}", label, attempt, self.max_attempts, wait);
                tokio::time::sleep(wait).await;
            }
        }
        None
    }
}
