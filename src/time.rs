//! Calendar, day-of-year and timestamp conversions on the MJD time scale.
//!
//! All epochs handled by this crate are Modified Julian Days (UTC, `f64`).
//! [Epoch] is only used at the API boundary.
use hifitime::Epoch;

use crate::error::ParsingError;

/// Julian day number of the first Gregorian day, 1582-10-15
const GREGORIAN_CUTOVER_JD: i64 = 2299161;

/// Converts a calendar date to MJD. `day` is fractional (1.5 is noon of the 1st).
/// Dates prior to 1582-10-15 are interpreted in the Julian calendar.
pub fn mjd_from_calendar(year: i32, month: u8, day: f64) -> f64 {
    let (mut year, mut month) = (year, month as i32);

    let julian = year < 1582
        || (year == 1582 && month < 10)
        || (year == 1582 && month == 10 && day < 15.0);

    if month < 3 {
        year -= 1;
        month += 12;
    }

    let b = if julian {
        0.0
    } else {
        let a = (year as f64 / 100.0).floor();
        2.0 - a + (a / 4.0).floor()
    };

    // whole days first, the fraction is only added once in the MJD range
    let days = (365.25 * (year as f64 + 4716.0)).floor()
        + (30.6001 * (month as f64 + 1.0)).floor()
        + b
        - 1524.5
        - 2400000.5;

    days + day
}

/// Converts MJD to (year, month, fractional day).
pub fn calendar_from_mjd(mjd: f64) -> (i32, u8, f64) {
    let z = mjd.floor() + 2400001.0;
    let f = mjd - mjd.floor();

    let a = if (z as i64) < GREGORIAN_CUTOVER_JD {
        z
    } else {
        let alpha = ((z - 1867216.25) / 36524.25).floor();
        z + 1.0 + alpha - (alpha / 4.0).floor()
    };

    let b = a + 1524.0;
    let c = ((b - 122.1) / 365.25).floor();
    let d = (365.25 * c).floor();
    let e = ((b - d) / 30.6001).floor();

    let day = b - d - (30.6001 * e).floor() + f;
    let month = if e < 14.0 { e - 1.0 } else { e - 13.0 };
    let year = if month > 2.0 { c - 4716.0 } else { c - 4715.0 };

    (year as i32, month as u8, day)
}

/// Leap year test used by the day-of-year conversions.
/// Centurial years divisible by 400 (2000, 2400..) are *not* leap years here,
/// which diverges from the Gregorian rule. Element sets written by older
/// tools rely on this.
pub(crate) fn legacy_leap_year(year: i32) -> bool {
    year % 4 == 0 && year % 400 != 0
}

/// Converts MJD to (year, fractional day of year), day 1.0 being January 1st 00:00.
pub fn day_of_year_from_mjd(mjd: f64) -> (i32, f64) {
    let (year, month, day) = calendar_from_mjd(mjd);
    let k = if legacy_leap_year(year) { 1.0 } else { 2.0 };
    let month = month as f64;

    let doy = (275.0 * month / 9.0).floor() - k * ((month + 9.0) / 12.0).floor() + day - 30.0;
    (year, doy)
}

/// Converts (year, fractional day of year) to MJD.
pub fn mjd_from_day_of_year(year: i32, doy: f64) -> f64 {
    let k = if legacy_leap_year(year) { 1.0 } else { 2.0 };

    let month = if doy < 32.0 {
        1.0
    } else {
        (9.0 * (k + doy) / 275.0 + 0.98).floor()
    };

    let day = doy - (275.0 * month / 9.0).floor() + k * ((month + 9.0) / 12.0).floor() + 30.0;
    mjd_from_calendar(year, month as u8, day)
}

/// Formats MJD as `YYYY-MM-DDTHH:MM:SS`.
/// The time of day is truncated to the millisecond, then to whole seconds.
pub fn format_timestamp(mjd: f64) -> String {
    const MS_PER_DAY: i64 = 86_400_000;
    // MJD resolution is about 1 µs
    const RESOLUTION_MS: f64 = 1.0E-3;

    let mut day_mjd = mjd.floor();
    let mut ms = ((mjd - day_mjd) * MS_PER_DAY as f64 + RESOLUTION_MS).floor() as i64;
    if ms >= MS_PER_DAY {
        day_mjd += 1.0;
        ms -= MS_PER_DAY;
    }

    let (year, month, day) = calendar_from_mjd(day_mjd);
    let seconds = ms / 1000;

    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
        year,
        month,
        day.floor() as u32,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

fn parse_digits<T: std::str::FromStr>(s: &str, len: usize, content: &str) -> Result<T, ParsingError> {
    if s.len() != len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParsingError::Timestamp(content.to_string()));
    }
    s.parse::<T>()
        .map_err(|_| ParsingError::Timestamp(content.to_string()))
}

/// Parses `YYYY-MM-DDTHH:MM:SS[.fff]` into MJD. Strict inverse of [format_timestamp].
pub fn parse_timestamp(content: &str) -> Result<f64, ParsingError> {
    let invalid = || ParsingError::Timestamp(content.to_string());
    let content = content.trim();

    let (date, time) = content.split_once('T').ok_or_else(invalid)?;

    let mut date = date.split('-');
    let year = parse_digits::<i32>(date.next().ok_or_else(invalid)?, 4, content)?;
    let month = parse_digits::<u8>(date.next().ok_or_else(invalid)?, 2, content)?;
    let day = parse_digits::<u8>(date.next().ok_or_else(invalid)?, 2, content)?;
    if date.next().is_some() {
        return Err(invalid());
    }

    let mut time = time.split(':');
    let hours = parse_digits::<u8>(time.next().ok_or_else(invalid)?, 2, content)?;
    let minutes = parse_digits::<u8>(time.next().ok_or_else(invalid)?, 2, content)?;
    let seconds = time.next().ok_or_else(invalid)?;
    if time.next().is_some() {
        return Err(invalid());
    }

    let seconds = match seconds.split_once('.') {
        Some((integer, fraction)) => {
            let integer = parse_digits::<u8>(integer, 2, content)?;
            if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let fraction = format!("0.{}", fraction)
                .parse::<f64>()
                .map_err(|_| invalid())?;
            integer as f64 + fraction
        },
        None => parse_digits::<u8>(seconds, 2, content)? as f64,
    };

    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    if hours > 23 || minutes > 59 || seconds >= 61.0 {
        return Err(invalid());
    }

    let day = day as f64 + hours as f64 / 24.0 + minutes as f64 / 1440.0 + seconds / 86400.0;
    Ok(mjd_from_calendar(year, month, day))
}

/// Converts MJD (UTC) to [Epoch]
pub fn epoch_from_mjd(mjd: f64) -> Epoch {
    Epoch::from_mjd_utc(mjd)
}

/// Converts [Epoch] to MJD (UTC)
pub fn mjd_from_epoch(epoch: Epoch) -> f64 {
    epoch.to_mjd_utc_days()
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(2020, 5, 31.0, 59000.0)]
    #[case(2000, 1, 1.5, 51544.5)]
    #[case(1957, 10, 4.0, 36115.0)]
    #[case(1858, 11, 17.0, 0.0)]
    #[case(1582, 10, 15.0, -100840.0)]
    #[case(1582, 10, 4.0, -100841.0)]
    fn calendar_to_mjd(#[case] year: i32, #[case] month: u8, #[case] day: f64, #[case] mjd: f64) {
        assert_eq!(mjd_from_calendar(year, month, day), mjd);
    }

    #[rstest]
    #[case(59000.0, 2020, 5, 31.0)]
    #[case(51544.5, 2000, 1, 1.5)]
    #[case(-100840.0, 1582, 10, 15.0)]
    #[case(-100841.0, 1582, 10, 4.0)]
    fn mjd_to_calendar(#[case] mjd: f64, #[case] year: i32, #[case] month: u8, #[case] day: f64) {
        let (y, m, d) = calendar_from_mjd(mjd);
        assert_eq!((y, m), (year, month));
        assert!((d - day).abs() < 1.0E-9, "{} != {}", d, day);
    }

    #[test]
    fn calendar_round_trip() {
        let mut mjd = 36000.0_f64;
        while mjd < 88070.0 {
            let (year, month, day) = calendar_from_mjd(mjd);
            let back = mjd_from_calendar(year, month, day);
            assert!(
                (back - mjd).abs() < 1.0E-6,
                "round trip failed for {}: {}",
                mjd,
                back
            );
            mjd += 37.123456;
        }
    }

    #[test]
    fn calendar_matches_hifitime() {
        for (year, month, day) in [(1970, 1, 1), (1999, 12, 31), (2024, 2, 29), (2100, 3, 1)] {
            let epoch = Epoch::from_gregorian_utc_at_midnight(year, month, day);
            let mjd = mjd_from_calendar(year, month, day as f64);
            assert!((mjd_from_epoch(epoch) - mjd).abs() < 1.0E-9);
        }
        let t = epoch_from_mjd(59000.25);
        assert!((mjd_from_epoch(t) - 59000.25).abs() < 1.0E-9);
    }

    #[test]
    fn sub_millisecond_precision() {
        let fraction = 0.5 / 86400.0;

        let mjd = mjd_from_calendar(2020, 5, 31.5 + fraction);
        assert!((mjd - (59000.5 + fraction)).abs() < 2.0E-11, "{}", mjd);

        let (year, doy) = day_of_year_from_mjd(59000.5 + fraction);
        assert_eq!(year, 2020);
        assert!((doy - (152.5 + fraction)).abs() < 1.0E-11, "{}", doy);
    }

    #[rstest]
    #[case(2024, 60.0, 2024, 2, 29.0)]
    #[case(2023, 60.0, 2023, 3, 1.0)]
    #[case(2021, 1.5, 2021, 1, 1.5)]
    #[case(2021, 365.0, 2021, 12, 31.0)]
    fn day_of_year(
        #[case] year: i32,
        #[case] doy: f64,
        #[case] y: i32,
        #[case] m: u8,
        #[case] d: f64,
    ) {
        let mjd = mjd_from_day_of_year(year, doy);
        assert_eq!(mjd, mjd_from_calendar(y, m, d));
        let (yy, dd) = day_of_year_from_mjd(mjd);
        assert_eq!(yy, year);
        assert!((dd - doy).abs() < 1.0E-9);
    }

    /// Year 2000 is handled as a common year by the day-of-year conversions:
    /// day 60 lands on March 1st instead of February 29th.
    /// Kept for compatibility with element sets produced by older tools.
    #[test]
    fn legacy_leap_rule_year_2000() {
        assert!(!legacy_leap_year(2000));
        assert!(legacy_leap_year(2024));
        assert!(!legacy_leap_year(2023));
        assert_eq!(mjd_from_day_of_year(2000, 60.0), 51604.0);
        assert_eq!(mjd_from_calendar(2000, 3, 1.0), 51604.0);
        let (year, doy) = day_of_year_from_mjd(51604.0);
        assert_eq!((year, doy), (2000, 60.0));
    }

    #[rstest]
    #[case(59000.0, "2020-05-31T00:00:00")]
    #[case(59000.5, "2020-05-31T12:00:00")]
    #[case(59000.999999, "2020-05-31T23:59:59")]
    #[case(58999.9999999999, "2020-05-30T23:59:59")]
    fn timestamp_formatting(#[case] mjd: f64, #[case] expected: &str) {
        assert_eq!(format_timestamp(mjd), expected);
    }

    #[test]
    fn timestamp_truncation() {
        // 12:00:00.900 is truncated, not rounded
        let mjd = 59000.5 + 0.9 / 86400.0;
        assert_eq!(format_timestamp(mjd), "2020-05-31T12:00:00");

        // 12:00:00.9996 does not reach the next second either
        let mjd = 59000.5 + 0.9996 / 86400.0;
        assert_eq!(format_timestamp(mjd), "2020-05-31T12:00:00");

        let mjd = 59000.5 + 1.0 / 86400.0;
        assert_eq!(format_timestamp(mjd), "2020-05-31T12:00:01");
    }

    #[test]
    fn timestamp_round_trip() {
        for ts in [
            "2020-05-31T12:34:56",
            "1999-12-31T23:59:59",
            "2014-01-01T00:00:00",
            "2063-07-04T06:07:08",
        ] {
            let mjd = parse_timestamp(ts).unwrap();
            assert_eq!(format_timestamp(mjd), ts);
        }
        let mjd = parse_timestamp("2020-05-31T12:00:00.500").unwrap();
        assert!((mjd - (59000.5 + 0.5 / 86400.0)).abs() < 1.0E-10);
    }

    #[rstest]
    #[case("2020-05-31 12:34:56")]
    #[case("2020-5-31T12:34:56")]
    #[case("2020-05-31T12:34")]
    #[case("2020-13-01T00:00:00")]
    #[case("2020-05-31T24:00:00")]
    #[case("2020-05-31T12:34:56.")]
    #[case("20/05/31 12:34:56")]
    fn invalid_timestamps(#[case] content: &str) {
        assert!(parse_timestamp(content).is_err());
    }
}
