//! Heuristic extraction of city, trip length and start date from free text.
//!
//! Every field is resolved by its own ordered rule list. Rules are tried in
//! order and the first one that produces a value wins; a miss leaves the
//! field absent instead of raising an error.

use chrono::{Datelike, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::models::ParsedQuery;

static DAYS_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)(\d+)\s*[- ]?\s*day"));
static MARKER_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b(starting from|starting|from|on)\b\s*[:,\-]?\s*(.+)"));
static ISO_RE: Lazy<Regex> = Lazy::new(|| compile(r"\b(\d{4})-(\d{2})-(\d{2})\b"));
static NUMERIC_DMY_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})\b"));
static ORDINAL_MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+([a-z]{3,9})(?:,?\s*(\d{4}))?\b")
});
static DAY_MONTH_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b(\d{1,2})\s+([a-z]+)\s+(\d{4})\b"));
static MONTH_DAY_YEAR_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"(?i)\b([a-z]+)\s+(\d{1,2}),?\s+(\d{4})\b"));
static DAY_MONTH_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(\d{1,2})\s+([a-z]{3,9})\b"));
static WEEKDAY_RE: Lazy<Regex> = Lazy::new(|| {
    compile(
        r"(?i)\b(next|this)\s+(sunday|monday|tuesday|wednesday|thursday|friday|saturday)\b",
    )
});
static WEEKEND_RE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bthis weekend\b"));
static RELATIVE_RES: Lazy<Vec<(Regex, i64)>> = Lazy::new(|| {
    [
        ("day after tomorrow", 2),
        ("tomorrow", 1),
        ("today", 0),
        ("next week", 7),
    ]
    .into_iter()
    .map(|(phrase, offset)| {
        let pattern = format!(r"(?i)\b(?:(?:starting|from|on)\s*)?{phrase}\b");
        (compile(&pattern), offset)
    })
    .collect()
});
static TO_IN_CITY_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"\b(?:to|in)\s+([A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*)"));
static CAPITALIZED_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*"));

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid query pattern")
}

/// What a date rule sees: the full sentence, the part after a discourse
/// marker such as "starting from" (or the full sentence when there is none),
/// and the reference day.
#[derive(Debug, Clone, Copy)]
pub struct DateInput<'a> {
    pub text: &'a str,
    pub remainder: &'a str,
    pub today: NaiveDate,
}

impl<'a> DateInput<'a> {
    pub fn new(text: &'a str, today: NaiveDate) -> Self {
        let remainder = MARKER_RE
            .captures(text)
            .and_then(|captures| captures.get(2))
            .map(|m| m.as_str())
            .unwrap_or(text);

        Self {
            text,
            remainder,
            today,
        }
    }
}

pub type DateRule = fn(&DateInput<'_>) -> Option<NaiveDate>;
pub type CityRule = fn(&str) -> Option<String>;

/// Start-date rules in precedence order.
pub const START_DATE_RULES: &[(&str, DateRule)] = &[
    ("iso", iso_date),
    ("numeric_day_month_year", numeric_day_month_year),
    ("ordinal_month", ordinal_month),
    ("day_month_year", day_month_year),
    ("month_day_year", month_day_year),
    ("day_month", day_month),
    ("weekday", weekday_phrase),
    ("this_weekend", this_weekend),
    ("relative_keyword", relative_keyword),
];

/// City rules in precedence order.
pub const CITY_RULES: &[(&str, CityRule)] = &[
    ("after_to_or_in", city_after_to_or_in),
    ("last_capitalized", last_capitalized_phrase),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch<T> {
    pub rule: &'static str,
    pub value: T,
}

pub fn parse(query: &str) -> ParsedQuery {
    parse_with_today(query, Local::now().date_naive())
}

pub fn parse_with_today(query: &str, today: NaiveDate) -> ParsedQuery {
    if query.trim().is_empty() {
        return ParsedQuery::default();
    }

    let parsed = ParsedQuery {
        city: match_city(query).map(|hit| hit.value),
        days: extract_days(query),
        start_date: match_start_date(query, today).map(|hit| hit.value),
    };

    tracing::debug!(?parsed, "parsed trip query");
    parsed
}

pub fn extract_days(query: &str) -> Option<u32> {
    DAYS_RE
        .captures(query)
        .and_then(|captures| captures[1].parse::<u32>().ok())
}

pub fn match_start_date(query: &str, today: NaiveDate) -> Option<RuleMatch<NaiveDate>> {
    let input = DateInput::new(query, today);
    START_DATE_RULES.iter().find_map(|(name, rule)| {
        rule(&input).map(|value| RuleMatch { rule: *name, value })
    })
}

pub fn match_city(query: &str) -> Option<RuleMatch<String>> {
    CITY_RULES.iter().find_map(|(name, rule)| {
        rule(query)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| RuleMatch { rule: *name, value })
    })
}

fn iso_date(input: &DateInput<'_>) -> Option<NaiveDate> {
    let captures = ISO_RE.captures(input.remainder)?;
    ymd(&captures[1], &captures[2], &captures[3])
}

fn numeric_day_month_year(input: &DateInput<'_>) -> Option<NaiveDate> {
    let captures = NUMERIC_DMY_RE.captures(input.remainder)?;
    ymd(&captures[3], &captures[2], &captures[1])
}

// The named-month rules scan every candidate, not just the first regex hit,
// so "a 3 day trip around 14 Feb" still finds "14 Feb".
fn ordinal_month(input: &DateInput<'_>) -> Option<NaiveDate> {
    ORDINAL_MONTH_RE
        .captures_iter(input.remainder)
        .find_map(|captures| {
            let day = captures[1].parse::<u32>().ok()?;
            let month = month_from_name(&captures[2])?;
            match captures.get(3) {
                Some(year) => NaiveDate::from_ymd_opt(year.as_str().parse().ok()?, month, day),
                None => upcoming(input.today, month, day),
            }
        })
}

fn day_month_year(input: &DateInput<'_>) -> Option<NaiveDate> {
    DAY_MONTH_YEAR_RE
        .captures_iter(input.remainder)
        .find_map(|captures| named_date(&captures, 1, 2, 3))
}

fn month_day_year(input: &DateInput<'_>) -> Option<NaiveDate> {
    MONTH_DAY_YEAR_RE
        .captures_iter(input.remainder)
        .find_map(|captures| named_date(&captures, 2, 1, 3))
}

fn day_month(input: &DateInput<'_>) -> Option<NaiveDate> {
    DAY_MONTH_RE
        .captures_iter(input.remainder)
        .find_map(|captures| {
            let day = captures[1].parse::<u32>().ok()?;
            let month = month_from_name(&captures[2])?;
            upcoming(input.today, month, day)
        })
}

// "next <day>" always skips a week, even when <day> is still ahead this week.
fn weekday_phrase(input: &DateInput<'_>) -> Option<NaiveDate> {
    let captures = WEEKDAY_RE.captures(input.text)?;
    let modifier = captures[1].to_lowercase();
    let target = weekday_index(&captures[2])?;
    let current = i64::from(input.today.weekday().num_days_from_sunday());

    let mut diff = target - current;
    if modifier == "next" || diff <= 0 {
        diff += 7;
    }
    input.today.checked_add_signed(Duration::days(diff))
}

fn this_weekend(input: &DateInput<'_>) -> Option<NaiveDate> {
    if !WEEKEND_RE.is_match(input.text) {
        return None;
    }
    let current = i64::from(input.today.weekday().num_days_from_sunday());
    let diff = match (6 - current + 7) % 7 {
        0 => 7,
        diff => diff,
    };
    input.today.checked_add_signed(Duration::days(diff))
}

fn relative_keyword(input: &DateInput<'_>) -> Option<NaiveDate> {
    RELATIVE_RES
        .iter()
        .find(|(pattern, _)| pattern.is_match(input.text))
        .and_then(|(_, offset)| input.today.checked_add_signed(Duration::days(*offset)))
}

fn city_after_to_or_in(query: &str) -> Option<String> {
    TO_IN_CITY_RE
        .captures(query)
        .map(|captures| captures[1].to_string())
}

fn last_capitalized_phrase(query: &str) -> Option<String> {
    CAPITALIZED_RE
        .find_iter(query)
        .last()
        .map(|m| m.as_str().to_string())
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn named_date(captures: &Captures<'_>, day: usize, month: usize, year: usize) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        captures[year].parse().ok()?,
        month_from_name(&captures[month])?,
        captures[day].parse().ok()?,
    )
}

/// Current-year date, pushed to next year when it already passed.
fn upcoming(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        NaiveDate::from_ymd_opt(today.year() + 1, month, day)
    } else {
        Some(date)
    }
}

/// Accepts full English month names and any prefix of at least three letters.
pub fn month_from_name(token: &str) -> Option<u32> {
    let token = token.to_lowercase();
    if token.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|month| month.starts_with(&token))
        .map(|idx| idx as u32 + 1)
}

fn weekday_index(name: &str) -> Option<i64> {
    let name = name.to_lowercase();
    WEEKDAYS
        .iter()
        .position(|day| *day == name)
        .map(|idx| idx as i64)
}
