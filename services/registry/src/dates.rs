//! Acquisition date parsing and whole-year age derivation

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::sheets::Cell;

const DAYS_PER_YEAR: f64 = 365.25;

/// Serial day 0 of the Excel 1900 date system (with the leap-year bug folded in)
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Largest serial Excel can display (9999-12-31)
const EXCEL_MAX_SERIAL: f64 = 2_958_465.0;

/// Formats tried by the best-effort fallback
const GENERIC_FORMATS: &[&str] = &["%Y/%m/%d", "%d.%m.%Y", "%Y.%m.%d", "%Y%m%d", "%d %m %Y"];

/// Parse a cell into a date-time; `None` is the "no date" sentinel
pub fn parse_cell(cell: &Cell) -> Option<NaiveDateTime> {
    match cell {
        Cell::Date(dt) => Some(*dt),
        Cell::Number(n) => excel_serial(*n),
        Cell::Text(s) => parse_text(s),
        Cell::Empty => None,
    }
}

/// Parse heterogeneous date text. First matching rule wins:
/// `YYYY-...` is year first, `D/M/Y` or `D-M-Y` is day first, then best effort.
pub fn parse_text(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if is_year_first(s) {
        return parse_year_first(s);
    }
    if is_day_first(s) {
        return parse_day_first(s);
    }
    parse_generic(s)
}

/// Whole years between the calendar day of `date` and `today`, never negative.
/// Time of day on either side is ignored.
pub fn age_years(date: NaiveDateTime, today: NaiveDate) -> i64 {
    let days = (today - date.date()).num_days() as f64;
    let years = (days / DAYS_PER_YEAR).floor() as i64;
    years.max(0)
}

fn is_year_first(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 5 && b[..4].iter().all(u8::is_ascii_digit) && b[4] == b'-'
}

/// `D/M/Y` or `D-M-Y`, 1-2 digit day and month, 2 or 4 digit year
fn is_day_first(s: &str) -> bool {
    let date_part = s.split_whitespace().next().unwrap_or("");
    let sep = if date_part.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = date_part.split(sep).collect();
    if parts.len() != 3 {
        return false;
    }
    let digits = |p: &str, lens: &[usize]| {
        lens.contains(&p.len()) && p.chars().all(|c| c.is_ascii_digit())
    };
    digits(parts[0], &[1, 2]) && digits(parts[1], &[1, 2]) && digits(parts[2], &[2, 4])
}

fn parse_year_first(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    let date_part = s.split(['T', ' ']).next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(at_midnight)
}

fn parse_day_first(s: &str) -> Option<NaiveDateTime> {
    let date_part = s.split_whitespace().next().unwrap_or(s);
    let sep = if date_part.contains('/') { '/' } else { '-' };
    let year_len = date_part.rsplit(sep).next().map_or(0, str::len);
    let fmt = match (sep, year_len) {
        ('/', 4) => "%d/%m/%Y",
        ('/', _) => "%d/%m/%y",
        (_, 4) => "%d-%m-%Y",
        _ => "%d-%m-%y",
    };
    NaiveDate::parse_from_str(date_part, fmt)
        .ok()
        .map(at_midnight)
}

fn parse_generic(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Some(date) = GENERIC_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
    {
        return Some(at_midnight(date));
    }
    // Serial numbers exported as text ("43831" or "43831.5")
    s.parse::<f64>().ok().and_then(excel_serial)
}

fn excel_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = at_midnight(NaiveDate::from_ymd_opt(y, m, d)?);
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

fn at_midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}
