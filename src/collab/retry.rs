use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crate::foundation::error::{GrimError, GrimResult};

const CANCEL_POLL: Duration = Duration::from_millis(20);

/// Shared cooperative cancellation flag. Clones observe the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] was called.
    pub fn checkpoint(&self, what: &str) -> GrimResult<()> {
        if self.is_cancelled() {
            return Err(GrimError::Cancelled(format!("{what} cancelled")));
        }
        Ok(())
    }

    /// Sleep for `d`, waking early on cancellation. Returns `false` when cancelled.
    fn sleep(&self, d: Duration) -> bool {
        let until = Instant::now() + d;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= until {
                return true;
            }
            std::thread::sleep((until - now).min(CANCEL_POLL));
        }
    }
}

/// Timeout and bounded exponential backoff for collaborator calls.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
    /// Per-attempt budget. `None` runs the call inline without a deadline.
    pub timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
            timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl RetryPolicy {
    /// Single inline attempt.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            timeout: None,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GrimResult<()> {
        if self.max_attempts == 0 {
            return Err(GrimError::config("retry max_attempts must be >= 1"));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(GrimError::config(format!(
                "retry multiplier must be finite and >= 1, got {}",
                self.multiplier
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(GrimError::config("retry timeout must be non-zero when set"));
        }
        Ok(())
    }

    /// Backoff before attempt `attempt + 1` (1-based `attempt`).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let nanos = (self.initial_backoff.as_nanos() as f64 * factor).round();
        let cap = self.max_backoff.as_nanos();
        if !nanos.is_finite() || nanos >= cap as f64 {
            return self.max_backoff;
        }
        Duration::from_nanos(nanos.max(0.0) as u64)
    }

    /// Run `f` until it succeeds, fails with a non-retryable error, or attempts run out.
    ///
    /// `f` receives the attempt's stop token. With a timeout, each attempt runs on a scoped
    /// worker thread; when the deadline passes or `cancel` fires, the stop token trips and the
    /// attempt is joined before anything else happens, so no attempt outlives this call and
    /// two attempts never overlap. A result produced after the stop token tripped is discarded.
    /// Without a timeout the attempt runs inline and sees `cancel` itself.
    pub fn run<T, F>(&self, operation: &str, cancel: &CancelToken, f: F) -> GrimResult<T>
    where
        T: Send,
        F: Fn(&CancelToken) -> GrimResult<T> + Sync,
    {
        self.validate()?;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            cancel.checkpoint(operation)?;

            let err = match self.attempt(operation, cancel, &f) {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                if err.is_retryable() {
                    tracing::warn!(operation, attempt, error = %err, "giving up after final attempt");
                }
                return Err(err);
            }

            let delay = match &err {
                GrimError::RateLimited {
                    retry_after: Some(after),
                    ..
                } => *after,
                _ => self.backoff(attempt),
            };
            tracing::warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retrying"
            );
            if !cancel.sleep(delay) {
                return Err(GrimError::Cancelled(format!(
                    "{operation} cancelled during backoff"
                )));
            }
        }
    }

    fn attempt<T, F>(&self, operation: &str, cancel: &CancelToken, f: &F) -> GrimResult<T>
    where
        T: Send,
        F: Fn(&CancelToken) -> GrimResult<T> + Sync,
    {
        let Some(timeout) = self.timeout else {
            return f(cancel);
        };
        let stop = CancelToken::new();
        let deadline = Instant::now() + timeout;

        std::thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            let token = stop.clone();
            let worker = scope.spawn(move || {
                let _ = tx.send(f(&token));
            });

            let outcome = wait_for(operation, timeout, deadline, cancel, &rx);
            if outcome.is_err() && !worker.is_finished() {
                stop.cancel();
                tracing::debug!(operation, "waiting for stopped attempt to wind down");
            }
            if worker.join().is_err() {
                return Err(GrimError::Other(anyhow::anyhow!(
                    "{operation} worker panicked"
                )));
            }
            outcome
        })
    }
}

/// Wait for the attempt's result until `deadline` or cancellation.
fn wait_for<T>(
    operation: &str,
    timeout: Duration,
    deadline: Instant,
    cancel: &CancelToken,
    rx: &mpsc::Receiver<GrimResult<T>>,
) -> GrimResult<T> {
    loop {
        let now = Instant::now();
        if now >= deadline {
            return Err(GrimError::Timeout {
                operation: operation.to_string(),
                after: timeout,
            });
        }
        match rx.recv_timeout((deadline - now).min(CANCEL_POLL)) {
            Ok(result) => return result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    return Err(GrimError::Cancelled(format!("{operation} cancelled")));
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(GrimError::Other(anyhow::anyhow!(
                    "{operation} worker exited without a result"
                )));
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/collab/retry.rs"]
mod tests;
