//! Date encoding for persisted rows.
//!
//! Calendar dates persist as ISO-8601 text (`YYYY-MM-DD`), which sorts and
//! compares correctly as a string in both backends. Timestamps persist as
//! Unix seconds.

use time::Date;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Encode a calendar date to its persisted text form.
pub(crate) fn to_sql_date(date: Date) -> String {
    // The format description is static and total over valid dates.
    date.format(DATE_FORMAT).unwrap()
}

/// Decode a persisted text date.
pub(crate) fn from_sql_date(text: &str) -> Result<Date, time::error::Parse> {
    Date::parse(text, DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_date_roundtrip() {
        let d = date!(2024 - 02 - 29);
        let text = to_sql_date(d);
        assert_eq!(text, "2024-02-29");
        assert_eq!(from_sql_date(&text).unwrap(), d);
    }

    #[test]
    fn test_sql_dates_sort_chronologically() {
        let a = to_sql_date(date!(2023 - 12 - 31));
        let b = to_sql_date(date!(2024 - 01 - 01));
        assert!(a < b);
    }
}
