use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Holds back the latest value until no newer one has arrived for `delay`.
///
/// `settled` is cancel-safe: dropping it mid-wait keeps the pending value, so it can
/// sit in a `select!` loop next to the input source.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Resolves with the pending value once its quiet period has passed.
    /// Never resolves while nothing is pending.
    pub async fn settled(&mut self) -> T {
        loop {
            let deadline = match &self.pending {
                Some((_, deadline)) => *deadline,
                None => {
                    std::future::pending::<()>().await;
                    continue;
                }
            };
            sleep_until(deadline).await;
            if let Some((value, _)) = self.pending.take() {
                return value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_only_latest_value() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.push("a");
        debouncer.push("ab");
        debouncer.push("abc");
        let start = Instant::now();
        assert_eq!(debouncer.settled().await, "abc");
        assert!(start.elapsed() >= Duration::from_millis(300));
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn push_restarts_quiet_period() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.push(1);
        let first = tokio::time::timeout(Duration::from_millis(200), debouncer.settled()).await;
        assert!(first.is_err(), "value emitted before the quiet period ended");
        debouncer.push(2);
        let start = Instant::now();
        assert_eq!(debouncer.settled().await, 2);
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_debouncer_never_emits() {
        let mut debouncer: Debouncer<u8> = Debouncer::new(Duration::from_millis(10));
        let result = tokio::time::timeout(Duration::from_secs(5), debouncer.settled()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cancel_discards_pending() {
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push("x");
        assert_eq!(debouncer.cancel(), Some("x"));
        assert!(!debouncer.is_pending());
    }
}
