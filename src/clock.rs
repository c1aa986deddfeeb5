/*
 * Clock Module
 *
 * Two notions of time are used by the simulation:
 * - Animation time: seconds since local midnight. Every window on the same
 *   machine reads the same value, so body spin stays in phase across
 *   processes that were started at different moments.
 * - Frame delta: measured time between two updates of this process, used to
 *   turn the per-frame constants into rates.
 */

use std::time::{Duration, Instant};

use chrono::{Local, NaiveTime, Timelike};

// Seconds since local midnight, with sub-second precision
pub fn seconds_since_midnight() -> f64 {
    seconds_of_day(Local::now().time())
}

pub fn seconds_of_day(time: NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 + time.nanosecond() as f64 / 1e9
}

pub struct FrameClock {
    last: Instant,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new(max_dt: Duration) -> Self {
        Self {
            last: Instant::now(),
            max_dt,
        }
    }

    // Time since the previous call, clamped so a stalled process does not
    // produce one huge step when it resumes
    pub fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.min(self.max_dt)
    }

    pub fn set_max_dt(&mut self, max_dt: Duration) {
        self.max_dt = max_dt;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_of_day_counts_from_midnight() {
        let t = NaiveTime::from_hms_milli_opt(1, 2, 3, 500).unwrap();
        assert_eq!(seconds_of_day(t), 3723.5);
        assert_eq!(seconds_of_day(NaiveTime::from_hms_opt(0, 0, 0).unwrap()), 0.0);
    }

    #[test]
    fn wall_clock_is_within_a_day() {
        let s = seconds_since_midnight();
        assert!((0.0..86_401.0).contains(&s));
    }

    #[test]
    fn frame_delta_is_clamped() {
        let mut clock = FrameClock::new(Duration::from_millis(5));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.tick(), Duration::from_millis(5));
    }
}
