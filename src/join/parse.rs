//! Locale-aware numeric and year parsing for source cells.
//!
//! A cell that does not parse becomes `None` (absent), never `NaN`.

use serde::{Deserialize, Serialize};

/// Decimal convention of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecimalSeparator {
    /// `1,234.5`: period is decimal, commas are grouping.
    Period,
    /// `1.234,5`: comma is decimal, periods are grouping.
    Comma,
    /// Decide per cell: with both separators present the last one is the
    /// decimal mark; a lone separator is always decimal.
    #[default]
    Auto,
}

/// Parse a numeric cell under the dataset's decimal convention.
///
/// Trailing status flags (`"2.15 p"`, `"1,41 (e)"`) are ignored, as are
/// cells made only of flags or missing markers (`":"`, `".."`, `"n.d."`).
/// Digit groups split by a space or no-break space (`"12 345,6"`) are
/// rejoined; any other multi-token cell is absent.
pub fn parse_decimal(raw: &str, sep: DecimalSeparator) -> Option<f64> {
    let mut tokens: Vec<&str> = raw.split(char::is_whitespace).filter(|t| !t.is_empty()).collect();
    while tokens.last().is_some_and(|t| is_flag(t)) {
        tokens.pop();
    }
    let joined = join_groups(&tokens, sep)?;
    let token = joined.trim_end_matches('%');

    let cleaned = match sep {
        DecimalSeparator::Period => token.replace(',', ""),
        DecimalSeparator::Comma => token.replace('.', "").replace(',', "."),
        DecimalSeparator::Auto => auto_decimal(token),
    };

    let v = cleaned.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

/// Flags and missing markers carry no digits.
fn is_flag(token: &str) -> bool {
    !token.bytes().any(|b| b.is_ascii_digit())
}

/// Rejoin space-grouped digits: a lead of one to three digits, then groups
/// of exactly three. Only the last group may carry the decimal part.
fn join_groups(tokens: &[&str], sep: DecimalSeparator) -> Option<String> {
    let (first, rest) = tokens.split_first()?;
    if rest.is_empty() {
        return Some((*first).to_string());
    }

    let lead = first.strip_prefix(['-', '+']).unwrap_or(first);
    if lead.is_empty() || lead.len() > 3 || !lead.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let last = rest.len() - 1;
    let mut out = (*first).to_string();
    for (i, group) in rest.iter().enumerate() {
        let head = group.get(..3)?;
        if !head.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let tail = group[3..].trim_end_matches('%');
        if !tail.is_empty() && (i != last || !is_decimal_tail(tail, sep)) {
            return None;
        }
        out.push_str(group);
    }
    Some(out)
}

fn is_decimal_tail(tail: &str, sep: DecimalSeparator) -> bool {
    let mark_ok = match sep {
        DecimalSeparator::Period => tail.starts_with('.'),
        DecimalSeparator::Comma => tail.starts_with(','),
        DecimalSeparator::Auto => tail.starts_with(['.', ',']),
    };
    mark_ok && tail.len() > 1 && tail[1..].bytes().all(|b| b.is_ascii_digit())
}

fn auto_decimal(token: &str) -> String {
    match (token.rfind(','), token.rfind('.')) {
        (Some(comma), Some(period)) if comma > period => token.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => token.replace(',', ""),
        (Some(_), None) if token.matches(',').count() == 1 => token.replace(',', "."),
        (Some(_), None) => token.replace(',', ""),
        (None, Some(_)) if token.matches('.').count() > 1 => token.replace('.', ""),
        _ => token.to_string(),
    }
}

/// First run of four digits, e.g. `"2021"`, `"2021-01"`, `"2021 (p)"`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let bytes = raw.trim().as_bytes();
    bytes
        .windows(4)
        .enumerate()
        .find(|(i, w)| {
            w.iter().all(u8::is_ascii_digit)
                && (*i == 0 || !bytes[i - 1].is_ascii_digit())
                && bytes.get(i + 4).is_none_or(|b| !b.is_ascii_digit())
        })
        .and_then(|(_, w)| std::str::from_utf8(w).ok())
        .and_then(|s| s.parse().ok())
}
