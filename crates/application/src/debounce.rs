use std::time::{Duration, Instant};

/// Coalesces bursts of events into one firing after a quiet period.
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    pending: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    pub fn poke(&mut self, now: Instant) {
        self.pending = Some(now + self.quiet);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    pub fn fire(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(at) if now >= at => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}
