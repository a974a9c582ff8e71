/// Remaining time at or below this many seconds puts the countdown in its
/// warning window.
pub const DEFAULT_WARNING_THRESHOLD_SECONDS: u32 = 300;

//
// ─── STATES ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Running,
    Paused,
    Expired,
}

/// Outcome of feeding one one-second tick into the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// The clock is not counting down (idle, paused, expired, or untimed).
    Ignored,
    Running { remaining: u32 },
    /// Remaining time hit zero on this tick. Reported exactly once.
    JustExpired,
}

//
// ─── COUNTDOWN ──────────────────────────────────────────────────────────────────
//

/// Tick-driven countdown for a timed attempt.
///
/// The clock owns no timer of its own; the caller feeds it one tick per
/// second (see `Ticker`) and reacts to the returned [`ClockTick`]. Keeping
/// the countdown passive means it can be stepped deterministically in tests.
///
/// An untimed clock (`limit_seconds = None`) never runs: `start` leaves it
/// idle and every tick is ignored.
#[derive(Debug, Clone)]
pub struct SessionClock {
    state: ClockState,
    remaining: Option<u32>,
    warning_threshold: u32,
}

impl SessionClock {
    #[must_use]
    pub fn new(limit_seconds: Option<u32>) -> Self {
        Self {
            state: ClockState::Idle,
            remaining: limit_seconds,
            warning_threshold: DEFAULT_WARNING_THRESHOLD_SECONDS,
        }
    }

    #[must_use]
    pub fn with_warning_threshold(mut self, seconds: u32) -> Self {
        self.warning_threshold = seconds;
        self
    }

    /// Begin counting down. A no-op for untimed clocks and any non-idle state.
    pub fn start(&mut self) {
        if self.state == ClockState::Idle && self.remaining.is_some() {
            self.state = ClockState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == ClockState::Running {
            self.state = ClockState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ClockState::Paused {
            self.state = ClockState::Running;
        }
    }

    /// Tear the countdown down without expiring it. Further ticks are ignored.
    pub fn stop(&mut self) {
        if self.state != ClockState::Expired {
            self.state = ClockState::Idle;
        }
    }

    /// Consume one second. Remaining time never increases; once the clock
    /// reports [`ClockTick::JustExpired`] every later tick is ignored.
    pub fn tick(&mut self) -> ClockTick {
        if self.state != ClockState::Running {
            return ClockTick::Ignored;
        }
        let Some(remaining) = self.remaining.as_mut() else {
            return ClockTick::Ignored;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.state = ClockState::Expired;
            ClockTick::JustExpired
        } else {
            ClockTick::Running {
                remaining: *remaining,
            }
        }
    }

    #[must_use]
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Seconds left, or `None` for an untimed clock.
    #[must_use]
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.state == ClockState::Expired
    }

    /// True while a timed clock is running inside its warning window.
    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.state == ClockState::Running
            && self
                .remaining
                .is_some_and(|left| left <= self.warning_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expires_exactly_once_after_duration_ticks() {
        let mut clock = SessionClock::new(Some(3));
        clock.start();

        assert_eq!(clock.tick(), ClockTick::Running { remaining: 2 });
        assert_eq!(clock.tick(), ClockTick::Running { remaining: 1 });
        assert_eq!(clock.tick(), ClockTick::JustExpired);
        assert!(clock.is_expired());

        // No second expiry.
        assert_eq!(clock.tick(), ClockTick::Ignored);
        assert_eq!(clock.tick(), ClockTick::Ignored);
    }

    #[test]
    fn untimed_clock_never_runs() {
        let mut clock = SessionClock::new(None);
        clock.start();
        assert_eq!(clock.state(), ClockState::Idle);
        assert_eq!(clock.tick(), ClockTick::Ignored);
        assert_eq!(clock.remaining(), None);
        assert!(!clock.is_warning());
    }

    #[test]
    fn remaining_is_monotonically_non_increasing() {
        let mut clock = SessionClock::new(Some(10));
        clock.start();
        let mut last = clock.remaining().unwrap();
        for _ in 0..12 {
            clock.tick();
            let now = clock.remaining().unwrap();
            assert!(now <= last);
            last = now;
        }
    }

    #[test]
    fn pause_freezes_the_countdown() {
        let mut clock = SessionClock::new(Some(5));
        clock.start();
        clock.tick();
        clock.pause();
        assert_eq!(clock.tick(), ClockTick::Ignored);
        assert_eq!(clock.remaining(), Some(4));
        clock.resume();
        assert_eq!(clock.tick(), ClockTick::Running { remaining: 3 });
    }

    #[test]
    fn stop_tears_down_without_expiring() {
        let mut clock = SessionClock::new(Some(5));
        clock.start();
        clock.stop();
        assert_eq!(clock.tick(), ClockTick::Ignored);
        assert!(!clock.is_expired());
    }

    #[test]
    fn warning_window_is_derived_from_remaining() {
        let mut clock = SessionClock::new(Some(302));
        clock.start();
        clock.tick();
        assert!(!clock.is_warning());
        clock.tick();
        assert!(clock.is_warning());
    }
}
