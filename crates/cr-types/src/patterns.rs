//! Literal grammars used by the value converters.
//!
//! Each validator compiles its regex once into a `OnceLock` static.

use std::sync::OnceLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use regex::Regex;

const UUID_PATTERN: &str =
    r"^[a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12}$";
const LONG_PATTERN: &str = r"^[+-]?[0-9]+$";
const DOUBLE_PATTERN: &str = r"^[+-]?[0-9]+\.[0-9]+(?:[eE][+-][0-9]+)?[fd]?$";
const DATE_PATTERN: &str = concat!(
    r"^(?P<year>[+-]?[0-9]{4})",
    r"(?:-?(?P<month>[0-9]{2})-?(?P<day>[0-9]{2})|-(?P<year_month>[0-9]{2}))",
    r"T(?P<hour>[0-9]{2})(?::?(?P<minute>[0-9]{2})(?::?(?P<second>[0-9]{2})(?:[.,](?P<fraction>[0-9]{1,9}))?)?)?",
    r"(?P<zone>Z|[+-][0-9]{2}(?::?[0-9]{2})?)?$",
);

/// Returns `true` for the canonical lowercase hyphenated UUID form.
pub fn is_uuid(s: &str) -> bool {
    static UUID_REGEX: OnceLock<Regex> = OnceLock::new();
    let uuid_regex = UUID_REGEX.get_or_init(|| Regex::new(UUID_PATTERN).unwrap());
    uuid_regex.is_match(s)
}

/// Returns `true` for an optionally signed run of decimal digits.
pub fn is_long_literal(s: &str) -> bool {
    static LONG_REGEX: OnceLock<Regex> = OnceLock::new();
    let long_regex = LONG_REGEX.get_or_init(|| Regex::new(LONG_PATTERN).unwrap());
    long_regex.is_match(s)
}

/// Returns `true` for a decimal literal with a mandatory fraction, an
/// optional signed exponent and an optional `f`/`d` suffix.
pub fn is_double_literal(s: &str) -> bool {
    static DOUBLE_REGEX: OnceLock<Regex> = OnceLock::new();
    let double_regex = DOUBLE_REGEX.get_or_init(|| Regex::new(DOUBLE_PATTERN).unwrap());
    double_regex.is_match(s)
}

/// Parse a string already accepted by [`is_double_literal`].
pub fn parse_double_literal(s: &str) -> Option<f64> {
    s.trim_end_matches(&['f', 'd'][..]).parse().ok()
}

/// Returns `true` for an RFC 3986 URI with a scheme.
pub fn is_uri(s: &str) -> bool {
    static URI_REGEX: OnceLock<Regex> = OnceLock::new();
    let uri_regex = URI_REGEX.get_or_init(|| {
        let unreserved = r"-a-zA-Z0-9._~!$&'()*+,;=";
        let pct = r"%[0-9a-fA-F]{2}";
        let pchar = format!(r"(?:[{unreserved}:@]|{pct})");
        let userinfo = format!(r"(?:[{unreserved}:]|{pct})*");
        let reg_name = format!(r"(?:[{unreserved}]|{pct})*");
        let pattern = format!(
            concat!(
                r"^[a-zA-Z][a-zA-Z0-9+.-]*:",
                r"(?://(?:{userinfo}@)?(?:\[[0-9a-zA-Z:._~!$&'()*+,;=-]+\]|{reg_name})(?::[0-9]*)?(?:/{pchar}*)*",
                r"|/?(?:{pchar}+(?:/{pchar}*)*)?)",
                r"(?:\?(?:{pchar}|[/?])*)?",
                r"(?:#(?:{pchar}|[/?])*)?$",
            ),
            userinfo = userinfo,
            reg_name = reg_name,
            pchar = pchar,
        );
        Regex::new(&pattern).unwrap()
    });
    uri_regex.is_match(s)
}

/// Parse the ISO 8601 subset accepted for DATE values.
///
/// A date part, `T`, an hour and optionally minutes, seconds, a fraction
/// and a zone designator. The date part is extended or compact, or just
/// `YYYY-MM` for the first of that month. Without a zone the value is
/// taken as UTC. `24:00` is midnight at the end of the day and a leap
/// second `:60` rolls into the next minute. Returns `None` for anything
/// that does not match or names an impossible calendar date or time.
pub fn parse_iso_date(s: &str) -> Option<DateTime<FixedOffset>> {
    static DATE_REGEX: OnceLock<Regex> = OnceLock::new();
    let date_regex = DATE_REGEX.get_or_init(|| Regex::new(DATE_PATTERN).unwrap());
    let caps = date_regex.captures(s)?;

    let number = |name: &str| -> Option<u32> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    let year: i32 = caps.name("year")?.as_str().parse().ok()?;
    let date = match caps.name("year_month") {
        Some(month) => NaiveDate::from_ymd_opt(year, month.as_str().parse().ok()?, 1)?,
        None => NaiveDate::from_ymd_opt(year, number("month")?, number("day")?)?,
    };

    let nanos = match caps.name("fraction") {
        Some(m) => {
            let digits = m.as_str();
            let scale = 10u32.pow(9 - digits.len() as u32);
            digits.parse::<u32>().ok()? * scale
        }
        None => 0,
    };
    let (hour, minute, second) = (number("hour")?, number("minute")?, number("second")?);
    let end_of_day = hour == 24 && minute == 0 && second == 0 && nanos == 0;
    if (hour > 23 && !end_of_day) || minute > 59 || second > 60 {
        return None;
    }
    let local = date.and_hms_opt(0, 0, 0)?
        + Duration::seconds(i64::from(hour * 3600 + minute * 60 + second))
        + Duration::nanoseconds(i64::from(nanos));

    let offset = match caps.name("zone").map(|m| m.as_str()) {
        None | Some("Z") => FixedOffset::east_opt(0)?,
        Some(zone) => {
            let sign = if zone.starts_with('-') { -1 } else { 1 };
            let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
            let hours: i32 = digits.get(..2)?.parse().ok()?;
            let minutes: i32 = match digits.get(2..) {
                Some("") | None => 0,
                Some(m) => m.parse().ok()?,
            };
            if minutes > 59 {
                return None;
            }
            FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?
        }
    };

    local.and_local_timezone(offset).single()
}
