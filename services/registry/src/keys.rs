//! Canonical lookup keys for unit codes, site names and patrimonial codes
//!
//! All functions here are pure and total: any input yields a key, possibly
//! empty. Callers decide what an empty key means for their index.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Word-boundary abbreviations expanded in site names, longest spelling first
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("c.m.i.", "centro materno infantil"),
    ("c.m.i", "centro materno infantil"),
    ("cmi", "centro materno infantil"),
    ("c. s.", "centro de salud"),
    ("c.s.", "centro de salud"),
    ("c.s", "centro de salud"),
    ("cs", "centro de salud"),
    ("p. s.", "puesto de salud"),
    ("p.s.", "puesto de salud"),
    ("p.s", "puesto de salud"),
    ("ps", "puesto de salud"),
    ("hosp.", "hospital"),
    ("hosp", "hospital"),
];

/// NFKD-decompose and drop combining marks: "Áncash" -> "Ancash"
pub fn strip_accents(s: &str) -> String {
    s.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Trim and collapse internal runs of whitespace to a single space
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Unit key: the last four digits of the code ("145-1685" -> "1685")
pub fn unit_key(raw: &str) -> String {
    let digits: String = strip_float_suffix(raw.trim())
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();

    if digits.len() >= 4 {
        digits[digits.len() - 4..].to_string()
    } else {
        digits
    }
}

/// "1685.0" -> "1685"; spreadsheets often hand back integer codes as floats
fn strip_float_suffix(s: &str) -> &str {
    match s.split_once('.') {
        Some((int, frac))
            if !int.is_empty()
                && !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c == '0') =>
        {
            int
        }
        _ => s,
    }
}

/// Site key: accent-free, lowercase, abbreviations expanded, alphanumeric words
pub fn site_key(raw: &str) -> String {
    let lowered = collapse_whitespace(&strip_accents(raw).to_lowercase());
    let expanded = expand_abbreviations(&lowered);

    let spaced: String = expanded
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();

    collapse_whitespace(&spaced)
}

/// Patrimonial code key: the raw code without any whitespace
pub fn patrimonial_key(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

fn expand_abbreviations(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut rest = text;
    let mut at_boundary = true;

    while let Some(c) = rest.chars().next() {
        if at_boundary {
            if let Some((pattern, full)) = ABBREVIATIONS
                .iter()
                .find(|(pattern, _)| abbreviation_at(rest, pattern))
            {
                out.push_str(full);
                out.push(' ');
                rest = &rest[pattern.len()..];
                continue;
            }
        }

        out.push(c);
        at_boundary = !c.is_alphanumeric();
        rest = &rest[c.len_utf8()..];
    }

    out
}

fn abbreviation_at(rest: &str, pattern: &str) -> bool {
    if !rest.starts_with(pattern) {
        return false;
    }
    let ends_alphanumeric = pattern
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric());
    if !ends_alphanumeric {
        return true;
    }
    rest[pattern.len()..]
        .chars()
        .next()
        .map_or(true, |next| !next.is_alphanumeric())
}
