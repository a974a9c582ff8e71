use chrono::{DateTime, Duration, Utc};

/// How long a pending save waits for further edits before firing.
pub const DEFAULT_FLUSH_DELAY_MS: i64 = 2000;

/// Deadline tracker that coalesces rapid writes into one flush.
///
/// Every `schedule` pushes the deadline out by the full delay, so a burst of
/// edits produces a single flush after the burst quiets down. The tracker
/// holds no timer and no flush closure; the session loop polls `take_due`
/// once per tick with the current time.
#[derive(Debug, Clone)]
pub struct CoalescingFlush {
    delay: Duration,
    due_at: Option<DateTime<Utc>>,
}

impl Default for CoalescingFlush {
    fn default() -> Self {
        Self::new(Duration::milliseconds(DEFAULT_FLUSH_DELAY_MS))
    }
}

impl CoalescingFlush {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            due_at: None,
        }
    }

    /// Arm (or re-arm) the deadline at `now + delay`.
    pub fn schedule(&mut self, now: DateTime<Utc>) {
        self.due_at = Some(now + self.delay);
    }

    /// Drop any pending flush.
    pub fn cancel(&mut self) {
        self.due_at = None;
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.due_at.is_some()
    }

    /// Returns true and disarms if the deadline has passed.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.due_at {
            Some(due) if due <= now => {
                self.due_at = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assess_core::time::fixed_now;

    #[test]
    fn fires_once_after_the_delay() {
        let mut flush = CoalescingFlush::default();
        let t0 = fixed_now();

        flush.schedule(t0);
        assert!(!flush.take_due(t0 + Duration::milliseconds(1999)));
        assert!(flush.take_due(t0 + Duration::milliseconds(2000)));
        assert!(!flush.is_pending());
        assert!(!flush.take_due(t0 + Duration::seconds(10)));
    }

    #[test]
    fn rapid_schedules_coalesce_to_the_last_deadline() {
        let mut flush = CoalescingFlush::default();
        let t0 = fixed_now();

        flush.schedule(t0);
        flush.schedule(t0 + Duration::milliseconds(300));
        flush.schedule(t0 + Duration::milliseconds(900));

        // Deadline tracks the last edit, not the first.
        assert!(!flush.take_due(t0 + Duration::milliseconds(2000)));
        assert!(flush.take_due(t0 + Duration::milliseconds(2900)));
    }

    #[test]
    fn cancel_disarms_a_pending_flush() {
        let mut flush = CoalescingFlush::default();
        let t0 = fixed_now();

        flush.schedule(t0);
        flush.cancel();
        assert!(!flush.is_pending());
        assert!(!flush.take_due(t0 + Duration::seconds(5)));
    }
}
