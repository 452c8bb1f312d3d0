use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for id generation and the as-of annotation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Whole days from `today` until `target`. Negative once the target has passed.
pub fn days_until(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days()
}


#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn days_until_counts_forward_and_back() {
        assert_eq!(days_until(day(2025, 6, 21), day(2025, 6, 14)), 7);
        assert_eq!(days_until(day(2025, 6, 21), day(2025, 6, 21)), 0);
        assert_eq!(days_until(day(2025, 6, 21), day(2025, 6, 23)), -2);
    }

    #[test]
    fn days_until_crosses_month_boundary() {
        assert_eq!(days_until(day(2025, 3, 2), day(2025, 2, 27)), 3);
    }
}
