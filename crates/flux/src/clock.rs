//! Timer collaborator for `wait` commands.
//!
//! The interpreter only needs "resolve after this duration"; hosts plug in
//! a real timer, tests use the virtual clock so waits are instant and
//! observable.

use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::{self, BoxFuture};

pub trait Clock: Send + Sync {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Virtual clock for deterministic tests: resolves immediately and records
/// the total duration slept.
#[derive(Debug, Default)]
pub struct TestClock {
    slept: Mutex<Duration>,
}

impl TestClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time slept so far.
    pub fn total_slept(&self) -> Duration {
        *self.slept.lock().expect("clock lock")
    }
}

impl Clock for TestClock {
    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        let mut slept = self.slept.lock().expect("clock lock");
        *slept += duration;
        Box::pin(future::ready(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_records_sleeps() {
        let clock = TestClock::new();
        let _ = clock.sleep(Duration::from_millis(300));
        let _ = clock.sleep(Duration::from_millis(700));
        assert_eq!(clock.total_slept(), Duration::from_secs(1));
    }
}
