use chrono::NaiveDate;

use crate::workflows::leave::calendar::{count_chargeable_days, CalendarError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn single_weekday_counts_one_without_weekends() {
    // 2024-01-01 is a Monday.
    let day = date(2024, 1, 1);
    assert_eq!(count_chargeable_days(day, day, false).unwrap(), 1);
}

#[test]
fn single_weekend_day_counts_zero_without_weekends() {
    // 2024-01-06 is a Saturday, 2024-01-07 a Sunday.
    let saturday = date(2024, 1, 6);
    let sunday = date(2024, 1, 7);
    assert_eq!(count_chargeable_days(saturday, saturday, false).unwrap(), 0);
    assert_eq!(count_chargeable_days(sunday, sunday, false).unwrap(), 0);
}

#[test]
fn weekend_counting_matches_inclusive_day_count() {
    let start = date(2024, 1, 1);
    let end = date(2024, 1, 14);
    let inclusive = (end - start).num_days() as u32 + 1;
    assert_eq!(count_chargeable_days(start, end, true).unwrap(), inclusive);
}

#[test]
fn weekdays_only_across_a_full_week() {
    // Mon 2024-01-01 through Sun 2024-01-07: five chargeable weekdays.
    assert_eq!(
        count_chargeable_days(date(2024, 1, 1), date(2024, 1, 7), false).unwrap(),
        5
    );
}

#[test]
fn spanning_two_weekends_skips_four_days() {
    // Fri 2024-01-05 through Mon 2024-01-15: 11 calendar days, 4 weekend days.
    assert_eq!(
        count_chargeable_days(date(2024, 1, 5), date(2024, 1, 15), false).unwrap(),
        7
    );
}

#[test]
fn inverted_range_is_rejected() {
    let result = count_chargeable_days(date(2024, 2, 10), date(2024, 2, 1), false);
    assert!(matches!(result, Err(CalendarError::InvalidRange { .. })));
}

#[test]
fn counting_is_deterministic() {
    let start = date(2025, 6, 2);
    let end = date(2025, 6, 30);
    let first = count_chargeable_days(start, end, false).unwrap();
    let second = count_chargeable_days(start, end, false).unwrap();
    assert_eq!(first, second);
}
