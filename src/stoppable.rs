//! Cooperative cancellation of long running board algorithms.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Polled at loop granularity. A stopped algorithm leaves the board in the
/// last valid state it reached.
pub trait Stoppable {
    fn is_stop_requested(&self) -> bool;
}

/// Stop request that can be raised from another thread.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

impl Stoppable for StopFlag {
    fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeLimit {
    start: Instant,
    limit: Duration,
}

impl TimeLimit {
    pub fn new(milliseconds: u64) -> Self {
        Self {
            start: Instant::now(),
            limit: Duration::from_millis(milliseconds),
        }
    }

    pub fn is_exceeded(&self) -> bool {
        self.start.elapsed() > self.limit
    }

    /// Same limit counted from now.
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }
}

impl Stoppable for TimeLimit {
    fn is_stop_requested(&self) -> bool {
        self.is_exceeded()
    }
}

/// Stop flag and time limit combined; either one stops.
#[derive(Debug, Clone, Default)]
pub struct StopCondition {
    flag: Option<StopFlag>,
    time_limit: Option<TimeLimit>,
}

impl StopCondition {
    pub fn never() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, flag: StopFlag) -> Self {
        self.flag = Some(flag);
        self
    }

    pub fn with_time_limit(mut self, time_limit: TimeLimit) -> Self {
        self.time_limit = Some(time_limit);
        self
    }
}

impl Stoppable for StopCondition {
    fn is_stop_requested(&self) -> bool {
        self.flag.as_ref().is_some_and(|flag| flag.is_stop_requested())
            || self
                .time_limit
                .as_ref()
                .is_some_and(|limit| limit.is_stop_requested())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_is_shared_between_clones() {
        let flag = StopFlag::new();
        let condition = StopCondition::never().with_flag(flag.clone());
        assert!(!condition.is_stop_requested());
        flag.request_stop();
        assert!(condition.is_stop_requested());
        flag.reset();
        assert!(!condition.is_stop_requested());
    }

    #[test]
    fn zero_time_limit_expires() {
        let limit = TimeLimit::new(0);
        std::thread::sleep(Duration::from_millis(2));
        assert!(limit.is_exceeded());
        assert!(!TimeLimit::new(60_000).is_exceeded());
    }
}
