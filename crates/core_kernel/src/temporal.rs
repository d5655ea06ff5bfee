//! Lenient date parsing for extracted document fields
//!
//! Claim forms and policy records carry dates as free text in whatever layout
//! the issuer used. Two dates can only be compared once a single layout is
//! known to fit both of them, so the pair parser walks [`DATE_FORMATS`] in
//! order and stops at the first layout under which *both* values parse.
//!
//! ```text
//! "14-11-2024" + "20-11-2024"  -> %d-%m-%Y  (both parse)
//! "14-11-2024" + "2024-11-20"  -> no shared layout
//! ```

use chrono::NaiveDate;

use crate::error::CoreError;

/// Accepted layouts, in priority order
pub const DATE_FORMATS: [&str; 10] = [
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y.%m.%d",
    "%d %b %Y",
    "%b %d, %Y",
];

/// Two dates parsed under one shared layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDatePair {
    pub first: NaiveDate,
    pub second: NaiveDate,
    pub format: &'static str,
}

impl ParsedDatePair {
    /// True when the first date falls strictly after the second
    pub fn first_is_after_second(&self) -> bool {
        self.first > self.second
    }
}

/// Parses a single date using the first layout that fits
pub fn parse_date(raw: &str) -> Result<(NaiveDate, &'static str), CoreError> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| {
            NaiveDate::parse_from_str(trimmed, format)
                .ok()
                .map(|date| (date, *format))
        })
        .ok_or_else(|| CoreError::UnparseableDate(raw.to_string()))
}

/// Parses two dates under the first layout that fits both
///
/// Returns `None` when no single layout accepts both values, even if each
/// value parses on its own under different layouts.
pub fn parse_date_pair(first: &str, second: &str) -> Option<ParsedDatePair> {
    let (first, second) = (first.trim(), second.trim());
    DATE_FORMATS.iter().find_map(|format| {
        let a = NaiveDate::parse_from_str(first, format).ok()?;
        let b = NaiveDate::parse_from_str(second, format).ok()?;
        Some(ParsedDatePair {
            first: a,
            second: b,
            format,
        })
    })
}
