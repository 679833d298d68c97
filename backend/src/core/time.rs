//! Time management for the simulation
//!
//! The simulation operates on whole days. A step advances the clock by a
//! variable number of days chosen by the adaptive scheduler; the clock only
//! guarantees that it never overshoots the horizon.

use serde::{Deserialize, Serialize};

/// A simulated day, 0-based from the snapshot day.
pub type Day = u32;

/// Tracks the current day, the previous boundary and the horizon end
///
/// # Example
/// ```
/// use fleet_simulator_core_rs::SimClock;
///
/// let mut clock = SimClock::new(30);
/// assert_eq!(clock.current_day(), 0);
///
/// clock.advance(7);
/// assert_eq!(clock.current_day(), 7);
/// assert_eq!(clock.prev_day(), 0);
/// assert_eq!(clock.last_step(), 7);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    /// Boundary the next step starts from
    current_day: Day,
    /// Boundary the last step started from
    prev_day: Day,
    /// Exclusive end of the simulated horizon
    horizon_end: Day,
}

impl SimClock {
    /// Create a clock positioned at day 0
    ///
    /// # Panics
    /// Panics if `horizon_end` is zero. Callers validate the horizon before
    /// constructing the clock.
    pub fn new(horizon_end: Day) -> Self {
        assert!(horizon_end > 0, "horizon_end must be positive");
        Self {
            current_day: 0,
            prev_day: 0,
            horizon_end,
        }
    }

    /// Rebuild a clock at an arbitrary boundary (checkpoint restore)
    pub fn at(current_day: Day, prev_day: Day, horizon_end: Day) -> Self {
        assert!(horizon_end > 0, "horizon_end must be positive");
        let current_day = current_day.min(horizon_end);
        Self {
            current_day,
            prev_day: prev_day.min(current_day),
            horizon_end,
        }
    }

    /// Advance by `days`, clamped so the clock never passes the horizon
    ///
    /// Returns the number of days actually advanced.
    ///
    /// # Example
    /// ```
    /// use fleet_simulator_core_rs::SimClock;
    ///
    /// let mut clock = SimClock::new(10);
    /// clock.advance(8);
    /// assert_eq!(clock.advance(5), 2);
    /// assert!(clock.is_finished());
    /// ```
    pub fn advance(&mut self, days: Day) -> Day {
        let step = days.min(self.remaining());
        self.prev_day = self.current_day;
        self.current_day += step;
        step
    }

    /// Current step boundary
    pub fn current_day(&self) -> Day {
        self.current_day
    }

    /// Boundary the previous step started from
    pub fn prev_day(&self) -> Day {
        self.prev_day
    }

    /// Length of the last completed step
    pub fn last_step(&self) -> Day {
        self.current_day - self.prev_day
    }

    /// Exclusive end of the horizon
    pub fn horizon_end(&self) -> Day {
        self.horizon_end
    }

    /// Days left until the horizon end
    pub fn remaining(&self) -> Day {
        self.horizon_end.saturating_sub(self.current_day)
    }

    /// True once the clock has reached the horizon end
    pub fn is_finished(&self) -> bool {
        self.current_day >= self.horizon_end
    }
}
