use std::time::{Duration, Instant};

use log::debug;

/// Logs how long a scope took when it goes out of scope
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

// This `Drop` implementation is called automatically when the `FunctionTimer` struct goes out of scope.
impl Drop for FunctionTimer {
    fn drop(&mut self) {
        debug!("'{}' took: {:?}", self.name, self.start.elapsed());
    }
}
