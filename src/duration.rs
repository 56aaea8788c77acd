//! Human readable durations.
//!
//! A duration is given as a sequence of pairs of a non-negative integer
//! and a unit, such as `1 month, 2 weeks` or `90d 12h`. Pairs are
//! separated by white space or commas, a number and its unit may also be
//! written without a space in between. Each unit may appear only once.
//!
//! | Unit    | Spellings                      | Seconds    |
//! |---------|--------------------------------|------------|
//! | second  | `s`, `sec`, `second`           | 1          |
//! | minute  | `min`, `minute`                | 60         |
//! | hour    | `h`, `hr`, `hour`              | 3600       |
//! | day     | `d`, `day`                     | 86400      |
//! | week    | `w`, `week`                    | 604800     |
//! | month   | `m`, `month`                   | 30 days    |
//! | year    | `y`, `year`                    | 365 days   |
//!
//! All spellings may take a plural `s`.

use std::fmt;
use std::time::Duration;

use jiff::{SignedDuration, Span, SpanRelativeTo};

/// Parse a duration.
pub fn parse_duration(value: &str) -> Result<Duration, DurationError> {
    let tokens = tokenize(value);
    if tokens.is_empty() {
        return Err(DurationError::Empty);
    }
    if tokens.len() % 2 != 0 {
        return Err(DurationError::MissingUnit);
    }

    let mut seen = Vec::new();
    let mut total = SignedDuration::ZERO;
    for pair in tokens.chunks(2) {
        let (number, unit) = (pair[0], pair[1]);
        let count: i64 = number
            .parse()
            .map_err(|_| DurationError::InvalidNumber(number.into()))?;
        if count < 0 {
            return Err(DurationError::Negative(number.into()));
        }
        let unit = Unit::parse(unit).ok_or_else(|| DurationError::UnknownUnit(unit.into()))?;
        if seen.contains(&unit) {
            return Err(DurationError::DuplicateUnit(unit.name()));
        }
        seen.push(unit);
        let part = unit
            .span(count)
            .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()).ok())
            .ok_or(DurationError::Overflow)?;
        total = total.checked_add(part).ok_or(DurationError::Overflow)?;
    }
    Duration::try_from(total).map_err(|_| DurationError::Overflow)
}

/// Split the input into number and unit tokens.
///
/// Tokens are separated by white space and commas. Within a token, the
/// boundary between digits and letters starts a new token.
fn tokenize(value: &str) -> Vec<&str> {
    let mut res = Vec::new();
    for word in value.split(|ch: char| ch.is_whitespace() || ch == ',') {
        let mut rest = word;
        while !rest.is_empty() {
            let numeric = is_numeric(rest.as_bytes()[0]);
            let end = rest
                .bytes()
                .position(|ch| is_numeric(ch) != numeric)
                .unwrap_or(rest.len());
            let (token, tail) = rest.split_at(end);
            res.push(token);
            rest = tail;
        }
    }
    res
}

fn is_numeric(ch: u8) -> bool {
    ch.is_ascii_digit() || ch == b'-' || ch == b'+'
}

//------------ Unit ----------------------------------------------------------

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl Unit {
    fn parse(unit: &str) -> Option<Self> {
        let unit = unit.to_ascii_lowercase();
        Self::from_singular(&unit).or_else(|| {
            unit.strip_suffix('s')
                .filter(|stem| !stem.is_empty())
                .and_then(Self::from_singular)
        })
    }

    fn from_singular(unit: &str) -> Option<Self> {
        match unit {
            "s" | "sec" | "second" => Some(Unit::Second),
            "min" | "minute" => Some(Unit::Minute),
            "h" | "hr" | "hour" => Some(Unit::Hour),
            "d" | "day" => Some(Unit::Day),
            "w" | "week" => Some(Unit::Week),
            "m" | "month" => Some(Unit::Month),
            "y" | "year" => Some(Unit::Year),
            _ => None,
        }
    }

    /// Returns a span of `count` units.
    ///
    /// Weeks, months and years are expressed in days of 24 hours.
    fn span(self, count: i64) -> Option<Span> {
        let span = Span::new();
        match self {
            Unit::Second => span.try_seconds(count).ok(),
            Unit::Minute => span.try_minutes(count).ok(),
            Unit::Hour => span.try_hours(count).ok(),
            Unit::Day => span.try_days(count).ok(),
            Unit::Week => span.try_days(count.checked_mul(7)?).ok(),
            Unit::Month => span.try_days(count.checked_mul(30)?).ok(),
            Unit::Year => span.try_days(count.checked_mul(365)?).ok(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Unit::Second => "second",
            Unit::Minute => "minute",
            Unit::Hour => "hour",
            Unit::Day => "day",
            Unit::Week => "week",
            Unit::Month => "month",
            Unit::Year => "year",
        }
    }
}

//------------ DurationError -------------------------------------------------

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DurationError {
    Empty,
    MissingUnit,
    InvalidNumber(String),
    Negative(String),
    UnknownUnit(String),
    DuplicateUnit(&'static str),
    Overflow,
}

impl fmt::Display for DurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationError::Empty => f.write_str("empty duration"),
            DurationError::MissingUnit => {
                f.write_str("every number must be followed by a unit")
            }
            DurationError::InvalidNumber(s) => write!(f, "invalid number '{s}'"),
            DurationError::Negative(s) => write!(f, "negative value '{s}'"),
            DurationError::UnknownUnit(s) => write!(f, "unknown unit '{s}'"),
            DurationError::DuplicateUnit(s) => write!(f, "unit '{s}' given more than once"),
            DurationError::Overflow => f.write_str("duration too large"),
        }
    }
}

impl std::error::Error for DurationError {}

//============ Tests =========================================================
