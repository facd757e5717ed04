use log::{Level, log_enabled, trace};
use std::time::{Duration, Instant};

/// Traces how long a scope took when dropped. Costs one `Instant::now()`
/// when trace logging is off.
pub struct FunctionTimer {
    name: &'static str,
    start: Instant,
}

impl FunctionTimer {
    pub fn new(name: &'static str) -> Self {
        FunctionTimer {
            name,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for FunctionTimer {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            trace!("{} took {:?}", self.name, self.start.elapsed());
        }
    }
}
