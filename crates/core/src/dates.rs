//! Relative and absolute date/time phrase resolution, plus the past-date
//! correction applied when a task is finalized.
//!
//! Resolution never fails. Text that names no recognizable date resolves to
//! the reference day, and text without a clock time gets the configured
//! default time with `time_specified` cleared.

use std::ops::Range;

use chrono::{prelude::*, Duration, Months};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Connector words that belong to a date phrase ("due next Friday", "by 3/4").
const DATE_LEAD: &str = r"(?:\b(?:due|by|on|before|until)\s+(?:(?:on|by)\s+)?)?";
const TIME_LEAD: &str = r"(?:\bat\s+)?";
const MONTHS: &str = r"(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sept?(?:ember)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";
const WEEKDAYS: &str =
    r"(monday|tuesday|wednesday|thursday|friday|saturday|sunday|mon|tues|tue|wed|thurs|thur|thu|fri|sat|sun)";

static DAY_AFTER_TOMORROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\bday\s+after\s+tomorrow\b")).expect("valid regex")
});
static TOMORROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\b(?:tomorrow|tmrw|tmr)\b")).expect("valid regex")
});
static TODAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\b(?:today|tonight)\b")).expect("valid regex")
});
static NEXT_WEEK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\bnext\s+week\b")).expect("valid regex")
});
static IN_OFFSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\bin\s+(\d{{1,3}})\s+(days?|weeks?)\b")).expect("valid regex")
});
static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){DATE_LEAD}\b(?:(next|this|last|coming)\s+)?{WEEKDAYS}\b"
    ))
    .expect("valid regex")
});
static ISO_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){DATE_LEAD}\b(\d{{4}})-(\d{{1,2}})-(\d{{1,2}})\b")).expect("valid regex")
});
static MONTH_DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){DATE_LEAD}\b{MONTHS}\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});
static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){DATE_LEAD}\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?{MONTHS}\b\.?(?:,?\s+(\d{{4}})\b)?"
    ))
    .expect("valid regex")
});
static SLASH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){DATE_LEAD}\b(\d{{1,2}})/(\d{{1,2}})(?:/(\d{{4}}|\d{{2}}))?\b"
    ))
    .expect("valid regex")
});

static CLOCK_12H_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i){TIME_LEAD}\b(\d{{1,2}})(?::([0-5]\d))?\s*([ap])\.?m\b\.?"
    ))
    .expect("valid regex")
});
static CLOCK_24H_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i){TIME_LEAD}\b([01]?\d|2[0-3]):([0-5]\d)\b")).expect("valid regex")
});
static NOON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i){TIME_LEAD}\b(?:noon|midday)\b")).expect("valid regex"));

/// Outcome of scanning free text for date and time phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub due: NaiveDateTime,
    pub date_specified: bool,
    pub time_specified: bool,
    /// Byte ranges of the consumed phrases in the scanned text.
    pub spans: Vec<Range<usize>>,
}

/// End of business, used when the text names no clock time.
pub fn default_due_time() -> NaiveTime {
    NaiveTime::from_hms_opt(17, 0, 0).expect("valid time")
}

/// Resolve the date and time named in `text` relative to `now`.
pub fn resolve(text: &str, now: NaiveDateTime, default_time: NaiveTime) -> ResolvedDate {
    let mut spans = Vec::new();

    let date = match find_date(text, now.date()) {
        Some((date, span)) => {
            spans.push(span);
            Some(date)
        }
        None => None,
    };

    let time = match find_time(text) {
        Some((time, span)) => {
            spans.push(span);
            Some(time)
        }
        None => None,
    };

    ResolvedDate {
        due: date
            .unwrap_or_else(|| now.date())
            .and_time(time.unwrap_or(default_time)),
        date_specified: date.is_some(),
        time_specified: time.is_some(),
        spans,
    }
}

type DateRule = fn(&Captures<'_>, NaiveDate) -> Option<NaiveDate>;

fn find_date(text: &str, today: NaiveDate) -> Option<(NaiveDate, Range<usize>)> {
    let rules: [(&Lazy<Regex>, DateRule); 10] = [
        (&DAY_AFTER_TOMORROW_RE, |_, today| Some(today + Duration::days(2))),
        (&TOMORROW_RE, |_, today| Some(today + Duration::days(1))),
        (&TODAY_RE, |_, today| Some(today)),
        (&NEXT_WEEK_RE, |_, today| Some(today + Duration::days(7))),
        (&IN_OFFSET_RE, in_offset),
        (&WEEKDAY_RE, weekday_phrase),
        (&ISO_DATE_RE, iso_date),
        (&MONTH_DAY_RE, month_day),
        (&DAY_MONTH_RE, day_month),
        (&SLASH_DATE_RE, slash_date),
    ];

    for (pattern, rule) in rules {
        for caps in pattern.captures_iter(text) {
            if let Some(date) = rule(&caps, today) {
                let whole = caps.get(0).expect("group 0 always present");
                return Some((date, whole.range()));
            }
        }
    }
    None
}

fn in_offset(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_ascii_lowercase();
    let days = if unit.starts_with("week") {
        amount * 7
    } else {
        amount
    };
    today.checked_add_signed(Duration::days(days))
}

fn weekday_phrase(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let target = parse_weekday(&caps.get(2)?.as_str().to_ascii_lowercase())?;
    let qualifier = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
    let offset = weekday_offset(today.weekday(), target, qualifier.as_deref());
    today.checked_add_signed(Duration::days(offset))
}

/// Days from `today` to the `target` weekday.
///
/// A bare weekday, `next` and `coming` all mean the first occurrence strictly
/// after today (1..=7 days). `this` allows today itself (0..=6 days). `last`
/// is the most recent occurrence strictly before today.
pub fn weekday_offset(today: Weekday, target: Weekday, qualifier: Option<&str>) -> i64 {
    let ahead = (i64::from(target.num_days_from_monday())
        - i64::from(today.num_days_from_monday()))
    .rem_euclid(7);
    match qualifier {
        Some("this") => ahead,
        Some("last") => {
            if ahead == 0 {
                -7
            } else {
                ahead - 7
            }
        }
        _ => {
            if ahead == 0 {
                7
            } else {
                ahead
            }
        }
    }
}

fn iso_date(caps: &Captures<'_>, _today: NaiveDate) -> Option<NaiveDate> {
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_day(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let month = parse_month(&caps.get(1)?.as_str().to_ascii_lowercase())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year = explicit_year(caps.get(3).map(|m| m.as_str()), today)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn day_month(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = parse_month(&caps.get(2)?.as_str().to_ascii_lowercase())?;
    let year = explicit_year(caps.get(3).map(|m| m.as_str()), today)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn slash_date(caps: &Captures<'_>, today: NaiveDate) -> Option<NaiveDate> {
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year = explicit_year(caps.get(3).map(|m| m.as_str()), today)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn explicit_year(raw: Option<&str>, today: NaiveDate) -> Option<i32> {
    match raw {
        None => Some(today.year()),
        Some(value) if value.len() == 2 => value.parse::<i32>().ok().map(|yy| 2000 + yy),
        Some(value) => value.parse().ok(),
    }
}

fn find_time(text: &str) -> Option<(NaiveTime, Range<usize>)> {
    for caps in CLOCK_12H_RE.captures_iter(text) {
        let hour: u32 = match caps[1].parse() {
            Ok(hour) if (1..=12).contains(&hour) => hour,
            _ => continue,
        };
        let minute: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let pm = caps[3].eq_ignore_ascii_case("p");
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            return Some((time, caps.get(0)?.range()));
        }
    }

    if let Some(caps) = CLOCK_24H_RE.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
        return Some((time, caps.get(0)?.range()));
    }

    NOON_RE
        .find(text)
        .and_then(|m| Some((NaiveTime::from_hms_opt(12, 0, 0)?, m.range())))
}

/// Weekday for a full name or accepted abbreviation, lowercase.
pub(crate) fn parse_weekday(label: &str) -> Option<Weekday> {
    match label {
        "mon" | "monday" => Some(Weekday::Mon),
        "tue" | "tues" | "tuesday" => Some(Weekday::Tue),
        "wed" | "wednesday" => Some(Weekday::Wed),
        "thu" | "thur" | "thurs" | "thursday" => Some(Weekday::Thu),
        "fri" | "friday" => Some(Weekday::Fri),
        "sat" | "saturday" => Some(Weekday::Sat),
        "sun" | "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Month number for a full name or accepted abbreviation, lowercase.
pub(crate) fn parse_month(label: &str) -> Option<u32> {
    let month = match label {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Move a due date that already passed to the same moment one calendar year
/// later, keeping the stated hour, minute and second.
///
/// Dates at or after `now` come back unchanged. Exactly one year is added to
/// the original date (Feb 29 lands on Feb 28) and sub-seconds are dropped.
pub fn correct_due_date(resolved: NaiveDateTime, now: NaiveDateTime) -> NaiveDateTime {
    if resolved >= now {
        return resolved;
    }

    let time = NaiveTime::from_hms_opt(resolved.hour(), resolved.minute(), resolved.second())
        .unwrap_or(resolved.time());

    resolved
        .date()
        .checked_add_months(Months::new(12))
        .map(|date| date.and_time(time))
        .unwrap_or(resolved)
}
