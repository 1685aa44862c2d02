use chrono::{Datelike, NaiveDate};

/// Single source of truth for "is this date a working day". Leave approval
/// and the absence sweep both consult this type, so the two can never
/// disagree about what a working day is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingDayPolicy {
    /// Monday through Friday
    Weekdays,
    /// Explicit weekday numbers, 1 = Monday .. 7 = Sunday
    Explicit(Vec<u32>),
}

impl Default for WorkingDayPolicy {
    fn default() -> Self {
        WorkingDayPolicy::Weekdays
    }
}

impl WorkingDayPolicy {
    /// Policy for a work group's `working_days` column; NULL falls back to
    /// the weekday default.
    pub fn from_work_group(days: Option<&[i32]>) -> Self {
        match days {
            Some(list) if !list.is_empty() => {
                WorkingDayPolicy::Explicit(list.iter().map(|d| *d as u32).collect())
            }
            _ => WorkingDayPolicy::Weekdays,
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        let day = date.weekday().number_from_monday();
        match self {
            WorkingDayPolicy::Weekdays => day <= 5,
            WorkingDayPolicy::Explicit(days) => days.contains(&day),
        }
    }

    /// Inclusive count over `[start, end]`; an inverted range counts 0.
    pub fn count_working_days(&self, start: NaiveDate, end: NaiveDate) -> i32 {
        if start > end {
            return 0;
        }

        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_working_day(*d))
            .count() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn default_counts_weekdays_only() {
        // Mon 2026-01-05 .. Wed 2026-01-07
        let policy = WorkingDayPolicy::default();
        assert_eq!(policy.count_working_days(date(2026, 1, 5), date(2026, 1, 7)), 3);
    }

    #[test]
    fn weekend_only_range_is_zero() {
        // Sat 2026-01-03 .. Sun 2026-01-04
        let policy = WorkingDayPolicy::default();
        assert_eq!(policy.count_working_days(date(2026, 1, 3), date(2026, 1, 4)), 0);
    }

    #[test]
    fn full_week_under_default_is_five() {
        // Mon 2026-01-05 .. Sun 2026-01-11
        let policy = WorkingDayPolicy::default();
        assert_eq!(policy.count_working_days(date(2026, 1, 5), date(2026, 1, 11)), 5);
    }

    #[test]
    fn explicit_days_override_the_weekend_rule() {
        // Sunday-through-Thursday schedule
        let policy = WorkingDayPolicy::Explicit(vec![7, 1, 2, 3, 4]);
        // Fri 2026-01-09 .. Sun 2026-01-11: only Sunday counts
        assert_eq!(policy.count_working_days(date(2026, 1, 9), date(2026, 1, 11)), 1);
        assert!(policy.is_working_day(date(2026, 1, 11)));
        assert!(!policy.is_working_day(date(2026, 1, 9)));
    }

    #[test]
    fn inverted_range_counts_zero() {
        let policy = WorkingDayPolicy::default();
        assert_eq!(policy.count_working_days(date(2026, 1, 7), date(2026, 1, 5)), 0);
    }

    #[test]
    fn null_work_group_days_fall_back_to_weekdays() {
        assert_eq!(WorkingDayPolicy::from_work_group(None), WorkingDayPolicy::Weekdays);
        assert_eq!(
            WorkingDayPolicy::from_work_group(Some(&[])),
            WorkingDayPolicy::Weekdays
        );
        assert_eq!(
            WorkingDayPolicy::from_work_group(Some(&[1, 2, 3])),
            WorkingDayPolicy::Explicit(vec![1, 2, 3])
        );
    }
}
