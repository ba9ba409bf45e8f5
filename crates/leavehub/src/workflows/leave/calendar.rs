use chrono::{Datelike, NaiveDate, Weekday};

/// Errors raised by the day counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Count the chargeable leave days in `[start, end]` inclusive.
///
/// Every day contributes 1 when `weekend_counts` is true; otherwise Saturday and
/// Sunday contribute 0. Pure and deterministic so callers can snapshot the result.
pub fn count_chargeable_days(
    start: NaiveDate,
    end: NaiveDate,
    weekend_counts: bool,
) -> Result<u32, CalendarError> {
    if start > end {
        return Err(CalendarError::InvalidRange { start, end });
    }

    let chargeable = start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| weekend_counts || !is_weekend(*day))
        .count();

    Ok(chargeable as u32)
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}
