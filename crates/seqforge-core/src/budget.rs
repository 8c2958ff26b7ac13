//! External time budgets.

use std::time::{Duration, Instant};

/// Checked by long-running operators between steps.
pub trait Budget: Send + Sync {
    fn is_exhausted(&self) -> bool;
}

/// Never runs out.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unlimited;

impl Budget for Unlimited {
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Runs out at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    end: Instant,
}

impl Deadline {
    pub fn at(end: Instant) -> Self {
        Self { end }
    }

    pub fn after(duration: Duration) -> Self {
        Self::at(Instant::now() + duration)
    }

    pub fn remaining(&self) -> Duration {
        self.end.saturating_duration_since(Instant::now())
    }
}

impl Budget for Deadline {
    fn is_exhausted(&self) -> bool {
        Instant::now() >= self.end
    }
}
