//! Jalali (Persian) calendar conversion, kept independent of any
//! third-party date crate since none in this stack speaks Jalali. Uses
//! the public-domain break-point algorithm popularized by `jalaali-js`
//! (itself derived from Birashk's astronomical calendar): a table of
//! 33-year cycle boundaries gives an exact leap-year rule for Jalali
//! years -61 through 3177, which safely covers every date the Tehran
//! Stock Exchange has ever or will ever report.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};

const BREAKS: [i64; 20] = [
    -61, 9, 38, 199, 426, 686, 756, 818, 1111, 1181, 1210, 1635, 2060, 2097, 2192, 2262, 2324,
    2394, 2456, 3178,
];

fn div(a: i64, b: i64) -> i64 {
    a / b
}

fn jal_cal(jy: i64) -> (i64, i64, i64) {
    let gy = jy + 621;
    let mut leap_j: i64 = -14;
    let mut jp = BREAKS[0];
    let mut jump = 0i64;
    let mut n = 0i64;

    for &jm in BREAKS.iter().skip(1) {
        jump = jm - jp;
        if jy < jm {
            break;
        }
        leap_j += div(jump, 33) * 8 + div(jump % 33, 4);
        jp = jm;
    }
    n = jy - jp;
    leap_j += div(n, 33) * 8 + div(n % 33 + 3, 4);
    if jump % 33 == 4 && jump - n == 4 {
        leap_j += 1;
    }
    let leap_g = div(gy, 4) - div((div(gy, 100) + 1) * 3, 4) - 150;
    let march = 20 + leap_j - leap_g;

    if jump - n < 6 {
        n = n - jump + div(jump, 33) * 33;
    }
    let mut leap = ((n + 1) % 33 - 1) % 4;
    if leap == -1 {
        leap = 4;
    }
    (leap, gy, march)
}

fn g2d(gy: i64, gm: i64, gd: i64) -> i64 {
    let d = div((gy + div(gm - 8, 6) + 100100) * 1461, 4) + div(153 * ((gm + 9) % 12) + 2, 5) + gd
        - 34840408;
    d - div(div(gy + 100100 + div(gm - 8, 6), 100) * 3, 4) + 752
}

fn d2g(jdn: i64) -> (i64, i64, i64) {
    let mut j = 4 * jdn + 139361631;
    j += div(div(4 * jdn + 183187720, 146097) * 3, 4) * 4 - 3908;
    let i = div(j % 1461, 4) * 5 + 308;
    let gd = div(i % 153, 5) + 1;
    let gm = div(i, 153) % 12 + 1;
    let gy = div(j, 1461) - 100100 + div(8 - gm, 6);
    (gy, gm, gd)
}

fn j2d(jy: i64, jm: i64, jd: i64) -> i64 {
    let (_, gy, march) = jal_cal(jy);
    g2d(gy, 3, march) + (jm - 1) * 31 - div(jm, 7) * (jm - 7) + jd - 1
}

fn d2j(jdn: i64) -> (i64, i64, i64) {
    let (gy, _, _) = d2g(jdn);
    let mut jy = gy - 621;
    let (leap, gy2, march) = jal_cal(jy);
    let jdn1f = g2d(gy2, 3, march);
    let mut k = jdn - jdn1f;

    if k >= 0 {
        if k <= 185 {
            return (jy, 1 + div(k, 31), k % 31 + 1);
        }
        k -= 186;
    } else {
        jy -= 1;
        k += 179;
        if leap == 1 {
            k += 1;
        }
    }
    (jy, 7 + div(k, 30), k % 30 + 1)
}

/// Converts a Jalali calendar date to its Gregorian equivalent.
/// Returns `None` for an out-of-range Jalali year or an impossible
/// month/day combination.
pub fn jalali_to_gregorian(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) || day == 0 || day > 31 {
        return None;
    }
    let jy = year as i64;
    if jy < BREAKS[0] || jy >= *BREAKS.last().unwrap() {
        return None;
    }
    let jdn = j2d(jy, month as i64, day as i64);
    let (gy, gm, gd) = d2g(jdn);
    NaiveDate::from_ymd_opt(gy as i32, gm as u32, gd as u32)
}

/// Converts a Gregorian date to its Jalali equivalent as `(year, month, day)`.
pub fn gregorian_to_jalali(date: NaiveDate) -> (i32, u32, u32) {
    let jdn = g2d(date.year() as i64, date.month() as i64, date.day() as i64);
    let (jy, jm, jd) = d2j(jdn);
    (jy as i32, jm as u32, jd as u32)
}

/// Parses the `"YYYY/MM/DD HH:MM"` form used throughout the upstream
/// provider payloads into a UTC timestamp.
pub fn parse_persian_datetime(s: &str) -> Option<DateTime<Utc>> {
    let mut parts = s.trim().splitn(2, ' ');
    let date_part = parts.next()?;
    let time_part = parts.next();

    let mut date_fields = date_part.split('/');
    let year: i32 = date_fields.next()?.parse().ok()?;
    let month: u32 = date_fields.next()?.parse().ok()?;
    let day: u32 = date_fields.next()?.parse().ok()?;
    let gregorian = jalali_to_gregorian(year, month, day)?;

    let (hour, minute) = match time_part {
        Some(t) => {
            let mut fields = t.split(':');
            let h: u32 = fields.next()?.parse().ok()?;
            let m: u32 = fields.next()?.parse().ok()?;
            (h, m)
        }
        None => (0, 0),
    };

    let naive = NaiveDateTime::new(gregorian, chrono::NaiveTime::from_hms_opt(hour, minute, 0)?);
    Some(Utc.from_utc_datetime(&naive))
}

/// Formats a Gregorian date back into Jalali `"YYYY/MM/DD"` form.
pub fn format_jalali_date(date: NaiveDate) -> String {
    let (y, m, d) = gregorian_to_jalali(date);
    format!("{y:04}/{m:02}/{d:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_nowruz_anchor_converts_correctly() {
        // 1 Farvardin 1400 fell on 2021-03-21.
        let d = jalali_to_gregorian(1400, 1, 1).unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2021, 3, 21).unwrap());
    }

    #[test]
    fn round_trip_gregorian_to_jalali_and_back() {
        let original = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let (jy, jm, jd) = gregorian_to_jalali(original);
        let back = jalali_to_gregorian(jy, jm, jd).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn parse_then_format_yields_the_original_date() {
        let input = "1402/11/02 14:30";
        let parsed = parse_persian_datetime(input).unwrap();
        let formatted = format_jalali_date(parsed.date_naive());
        assert_eq!(formatted, "1402/11/02");
    }

    #[test]
    fn leap_year_esfand_has_thirty_days() {
        // Jalali 1403 is a leap year; 30 Esfand 1403 exists.
        assert!(jalali_to_gregorian(1403, 12, 30).is_some());
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert!(jalali_to_gregorian(1402, 13, 1).is_none());
    }
}
