//! Helpers for working with the server's configured local timezone and calendar dates.

use time::{Date, OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// The date format used in requests and responses, e.g. "2025-01-31".
pub const ISO_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Get the current UTC offset of the timezone named `canonical_timezone`, e.g. "Pacific/Auckland".
///
/// Returns `None` if the name is not a known canonical timezone.
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Get today's date in the timezone named `canonical_timezone`.
///
/// # Errors
/// Returns [Error::InvalidTimezoneError] if `canonical_timezone` is not a valid timezone name.
pub fn today(canonical_timezone: &str) -> Result<Date, Error> {
    let Some(offset) = get_local_offset(canonical_timezone) else {
        tracing::error!("Invalid timezone {}", canonical_timezone);
        return Err(Error::InvalidTimezoneError(canonical_timezone.to_owned()));
    };

    Ok(OffsetDateTime::now_utc().to_offset(offset).date())
}

/// Parse a date in the format `YYYY-MM-DD`, returning `None` if it is malformed.
pub fn parse_iso_date(text: &str) -> Option<Date> {
    Date::parse(text.trim(), ISO_DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::Error;

    use super::{get_local_offset, parse_iso_date, today};

    #[test]
    fn utc_has_zero_offset() {
        let offset = get_local_offset("Etc/UTC").unwrap();

        assert!(offset.is_utc());
    }

    #[test]
    fn unknown_timezone_has_no_offset() {
        assert_eq!(get_local_offset("Mars/Olympus_Mons"), None);
    }

    #[test]
    fn today_fails_on_invalid_timezone() {
        assert_eq!(
            today("Not/A_Timezone"),
            Err(Error::InvalidTimezoneError("Not/A_Timezone".to_owned()))
        );
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(parse_iso_date("2024-02-29"), Some(date!(2024 - 02 - 29)));
        assert_eq!(parse_iso_date(" 2024-01-05 "), Some(date!(2024 - 01 - 05)));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("05/01/2024"), None);
        assert_eq!(parse_iso_date("not-a-date"), None);
        assert_eq!(parse_iso_date(""), None);
    }
}
