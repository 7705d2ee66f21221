//! Minute-of-hour payload amplification.
//!
//! A fetched payload is repeated once more for every minute past the hour,
//! so character counts for the same paste grow over the course of an hour.
//! Stored counts depend on this, so it is reproduced exactly.

use chrono::{Local, Timelike};

/// Source of the minute used by [`amplify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Amplification {
    /// Current local minute of the hour.
    #[default]
    WallClock,
    /// Pinned minute, clamped to 0..=59.
    Fixed(u32),
}

impl Amplification {
    pub fn minute(&self) -> u32 {
        match self {
            Amplification::WallClock => Local::now().minute(),
            Amplification::Fixed(minute) => (*minute).min(59),
        }
    }
}

/// Returns `minute + 1` concatenated copies of `payload`.
pub fn amplify(payload: &str, minute: u32) -> String {
    payload.repeat(minute as usize + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minute_zero_is_identity() {
        assert_eq!(amplify("ab\nabc\n a", 0), "ab\nabc\n a");
    }

    #[test]
    fn test_copies_per_minute() {
        assert_eq!(amplify("xy", 3), "xyxyxyxy");
        assert_eq!(amplify("", 59), "");
    }

    #[test]
    fn test_fixed_minute_clamped() {
        assert_eq!(Amplification::Fixed(7).minute(), 7);
        assert_eq!(Amplification::Fixed(120).minute(), 59);
        assert!(Amplification::WallClock.minute() < 60);
    }
}
