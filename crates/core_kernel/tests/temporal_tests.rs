//! Tests for lenient date parsing

use chrono::NaiveDate;
use core_kernel::{parse_date, parse_date_pair, DATE_FORMATS};
use proptest::prelude::*;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_format_priority_order() {
    assert_eq!(DATE_FORMATS[0], "%Y-%m-%d");
    assert_eq!(DATE_FORMATS[1], "%d-%m-%Y");
    assert_eq!(DATE_FORMATS[DATE_FORMATS.len() - 1], "%b %d, %Y");
}

#[test]
fn test_first_shared_layout_is_used() {
    // 01-02-2024 parses as day-first before month-first is tried
    let pair = parse_date_pair("01-02-2024", "03-02-2024").unwrap();
    assert_eq!(pair.format, "%d-%m-%Y");
    assert_eq!(pair.first, ymd(2024, 2, 1));
    assert_eq!(pair.second, ymd(2024, 2, 3));
}

#[test]
fn test_month_first_fallback() {
    // day 25 cannot be a month, so the month-first layout is the first shared one
    let pair = parse_date_pair("12-25-2024", "12-31-2024").unwrap();
    assert_eq!(pair.format, "%m-%d-%Y");
    assert_eq!(pair.first, ymd(2024, 12, 25));
}

#[test]
fn test_dotted_and_slashed_layouts() {
    let pair = parse_date_pair("2024.01.15", "2024.06.30").unwrap();
    assert_eq!(pair.format, "%Y.%m.%d");

    let pair = parse_date_pair("2024/01/15", "2024/06/30").unwrap();
    assert_eq!(pair.format, "%Y/%m/%d");
}

#[test]
fn test_surrounding_whitespace_is_ignored() {
    let pair = parse_date_pair("  2024-01-15 ", "2024-06-30\n").unwrap();
    assert_eq!(pair.first, ymd(2024, 1, 15));
}

#[test]
fn test_garbage_never_pairs() {
    assert!(parse_date_pair("soon", "2024-01-01").is_none());
    assert!(parse_date("").is_err());
}

proptest! {
    #[test]
    fn iso_dates_always_pair_under_iso(
        a in 0u32..3650,
        b in 0u32..3650,
    ) {
        let base = ymd(2015, 1, 1);
        let first = base + chrono::Days::new(a as u64);
        let second = base + chrono::Days::new(b as u64);
        let pair = parse_date_pair(
            &first.format("%Y-%m-%d").to_string(),
            &second.format("%Y-%m-%d").to_string(),
        ).unwrap();
        prop_assert_eq!(pair.format, "%Y-%m-%d");
        prop_assert_eq!(pair.first_is_after_second(), first > second);
    }
}
