use std::time::{Duration, Instant};

/// Proof that a login call returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginReceipt {
    pub user: String,
    pub elapsed: Duration,
}

/// Blocking login stub
///
/// `login` blocks the calling thread for the configured delay. Call it on
/// the main thread and the UI freezes for that long; that is the whole point.
#[derive(Debug, Clone)]
pub struct LoginService {
    delay: Duration,
}

impl LoginService {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Log `user` in, blocking for the configured delay
    pub fn login(&self, user: &str) -> LoginReceipt {
        let started = Instant::now();
        tracing::debug!(
            "Logging in {} on {:?}",
            user,
            std::thread::current().name().unwrap_or("unnamed")
        );

        std::thread::sleep(self.delay);

        let elapsed = started.elapsed();
        tracing::info!("Login for {} finished in {:?}", user, elapsed);
        LoginReceipt {
            user: user.to_string(),
            elapsed,
        }
    }
}

impl Default for LoginService {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}
