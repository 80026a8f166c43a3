//! Single-slot cancelable retry timer.
//!
//! The timer holds at most one deadline.  Every `arm` bumps a generation
//! counter, so an expiry token issued for an earlier schedule is
//! recognisably stale and the dispatcher drops it:
//!
//! ```text
//!  arm(5s) ─▶ gen 1 ──┐
//!  arm(60s) ─▶ gen 2  │  token{gen 1} arrives late → is_current() == false
//!                     └─▶ ignored
//! ```
//!
//! Time is supplied by the caller in monotonic milliseconds; the timer
//! never reads a clock itself.

/// Identifies one armed schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    generation: u32,
}

impl TimerToken {
    pub fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    token: TimerToken,
    deadline_ms: u64,
    delay_ms: u64,
}

#[derive(Debug, Default)]
pub struct RetryTimer {
    generation: u32,
    armed: Option<Armed>,
    arm_count: u32,
}

impl RetryTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule an expiry `delay_ms` after `now_ms`, superseding any
    /// pending one.
    pub fn arm(&mut self, now_ms: u64, delay_ms: u64) -> TimerToken {
        self.generation = self.generation.wrapping_add(1);
        let token = TimerToken {
            generation: self.generation,
        };
        self.armed = Some(Armed {
            token,
            deadline_ms: now_ms.saturating_add(delay_ms),
            delay_ms,
        });
        self.arm_count = self.arm_count.wrapping_add(1);
        token
    }

    /// Drop the pending schedule and invalidate tokens already handed out.
    /// Safe to call when nothing is armed or the timer already fired.
    pub fn cancel(&mut self) {
        self.armed = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Return the token if the deadline has passed, disarming the timer.
    /// The token stays current until the next `arm` or `cancel`.
    pub fn poll(&mut self, now_ms: u64) -> Option<TimerToken> {
        match self.armed {
            Some(a) if now_ms >= a.deadline_ms => {
                self.armed = None;
                Some(a.token)
            }
            _ => None,
        }
    }

    /// Whether `token` belongs to the latest schedule.
    pub fn is_current(&self, token: TimerToken) -> bool {
        token.generation == self.generation
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Pending schedules: 0 or 1.
    pub fn pending(&self) -> usize {
        usize::from(self.armed.is_some())
    }

    /// Delay requested by the pending schedule.
    pub fn armed_delay_ms(&self) -> Option<u64> {
        self.armed.map(|a| a.delay_ms)
    }

    /// Milliseconds until the pending deadline (0 if already due).
    pub fn remaining_ms(&self, now_ms: u64) -> Option<u64> {
        self.armed.map(|a| a.deadline_ms.saturating_sub(now_ms))
    }

    /// Total `arm` calls since construction (diagnostics).
    pub fn arm_count(&self) -> u32 {
        self.arm_count
    }
}
