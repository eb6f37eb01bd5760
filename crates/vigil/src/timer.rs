//! Isolation countdown
//!
//! Armed when the score turns high risk, decremented once per tick, fires
//! exactly once per arm cycle when it reaches zero. A drop back to normal
//! cancels silently.
//!
//! Every arm and disarm bumps an epoch. Scheduled ticks carry the epoch they
//! were scheduled under, so a tick left over from a cancelled countdown can
//! never decrement (or fire) a newer one.

use crate::score::RiskClass;
use serde::{Deserialize, Serialize};

/// Default countdown length in seconds
pub const DEFAULT_COUNTDOWN_SECS: u32 = 10;

/// Timer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum TimerState {
    Disarmed,
    Armed { remaining: u32, epoch: u64 },
}

/// Effect of showing the timer a new risk class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerChange {
    /// A fresh countdown started; schedule a tick for this epoch
    Armed { epoch: u64, remaining: u32 },
    /// A running countdown was cancelled
    Cancelled,
    /// Nothing to do
    Unchanged,
}

/// Effect of a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belongs to a countdown that no longer exists
    Stale,
    /// Still counting; schedule the next tick
    Counting { epoch: u64, remaining: u32 },
    /// Reached zero. The timer is disarmed again.
    Fired,
}

#[derive(Debug, Clone)]
pub struct IsolationTimer {
    countdown_secs: u32,
    state: TimerState,
    epoch: u64,
}

impl Default for IsolationTimer {
    fn default() -> Self {
        Self::new(DEFAULT_COUNTDOWN_SECS)
    }
}

impl IsolationTimer {
    pub fn new(countdown_secs: u32) -> Self {
        Self {
            countdown_secs: countdown_secs.max(1),
            state: TimerState::Disarmed,
            epoch: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, TimerState::Armed { .. })
    }

    /// Seconds left, if armed
    pub fn remaining(&self) -> Option<u32> {
        match self.state {
            TimerState::Armed { remaining, .. } => Some(remaining),
            TimerState::Disarmed => None,
        }
    }

    /// Keep the timer consistent with the latest score classification
    pub fn observe(&mut self, class: RiskClass) -> TimerChange {
        match (class, self.state) {
            (RiskClass::HighRisk, TimerState::Disarmed) => {
                self.epoch += 1;
                self.state = TimerState::Armed {
                    remaining: self.countdown_secs,
                    epoch: self.epoch,
                };
                TimerChange::Armed {
                    epoch: self.epoch,
                    remaining: self.countdown_secs,
                }
            }
            (RiskClass::Normal, TimerState::Armed { .. }) => {
                self.disarm();
                TimerChange::Cancelled
            }
            _ => TimerChange::Unchanged,
        }
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        let remaining = match self.state {
            TimerState::Armed {
                remaining,
                epoch: current,
            } if current == epoch => remaining,
            _ => return TickOutcome::Stale,
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.disarm();
            return TickOutcome::Fired;
        }

        self.state = TimerState::Armed { remaining, epoch };
        TickOutcome::Counting { epoch, remaining }
    }

    /// Cancel any countdown. Returns whether one was running.
    pub fn disarm(&mut self) -> bool {
        let was_armed = self.is_armed();
        self.epoch += 1;
        self.state = TimerState::Disarmed;
        was_armed
    }
}
