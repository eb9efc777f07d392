//! ISO 8601 durations (`P[nW][nD][T[nH][nM][n[.f]S]]`).
//!
//! Years and months have no fixed length and are rejected.

use crate::error::{Error, Result};
use chrono::TimeDelta;

/// Parse an ISO 8601 duration such as `PT1H30M`, `P2DT4.5S` or `-PT5M`.
pub fn parse_iso8601_duration(input: &str) -> Result<TimeDelta> {
    let invalid = || Error::Deserialization(format!("'{}' is not a valid ISO 8601 duration", input));

    let s = input.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let s = s.strip_prefix('P').ok_or_else(invalid)?;
    if s.is_empty() {
        return Err(invalid());
    }

    let mut total = TimeDelta::zero();
    let mut in_time = false;
    let mut number = String::new();
    let mut seen_component = false;

    for c in s.chars() {
        match c {
            'T' if !in_time && number.is_empty() => in_time = true,
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                if number.is_empty() {
                    return Err(invalid());
                }
                let part = match (in_time, unit) {
                    (false, 'W') => whole(&number, 7 * 86_400)?,
                    (false, 'D') => whole(&number, 86_400)?,
                    (true, 'H') => whole(&number, 3_600)?,
                    (true, 'M') => whole(&number, 60)?,
                    (true, 'S') => seconds(&number)?,
                    _ => return Err(invalid()),
                };
                total = total.checked_add(&part).ok_or_else(invalid)?;
                number.clear();
                seen_component = true;
            }
        }
    }

    if !number.is_empty() || !seen_component {
        return Err(invalid());
    }
    Ok(if negative { -total } else { total })
}

/// Format a duration in its shortest ISO 8601 form; zero is `PT0S`.
pub fn format_iso8601_duration(value: &TimeDelta) -> String {
    if value.is_zero() {
        return "PT0S".to_string();
    }

    let (sign, abs) = if *value < TimeDelta::zero() {
        ("-", -*value)
    } else {
        ("", *value)
    };

    let total_secs = abs.num_seconds();
    let nanos = abs.subsec_nanos();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3_600;
    let minutes = (total_secs % 3_600) / 60;
    let secs = total_secs % 60;

    let mut out = format!("{}P", sign);
    if days > 0 {
        out.push_str(&format!("{}D", days));
    }
    if hours > 0 || minutes > 0 || secs > 0 || nanos > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{}H", hours));
        }
        if minutes > 0 {
            out.push_str(&format!("{}M", minutes));
        }
        if secs > 0 || nanos > 0 {
            if nanos > 0 {
                let frac = format!("{:09}", nanos);
                out.push_str(&format!("{}.{}S", secs, frac.trim_end_matches('0')));
            } else {
                out.push_str(&format!("{}S", secs));
            }
        }
    }
    out
}

fn whole(number: &str, unit_secs: i64) -> Result<TimeDelta> {
    let n: i64 = number
        .parse()
        .map_err(|_| Error::Deserialization(format!("'{}' is not a whole number", number)))?;
    n.checked_mul(unit_secs)
        .and_then(TimeDelta::try_seconds)
        .ok_or_else(|| Error::Deserialization(format!("duration component {} overflows", number)))
}

fn seconds(number: &str) -> Result<TimeDelta> {
    let (int, frac) = number.split_once('.').unwrap_or((number, ""));
    let secs = whole(if int.is_empty() { "0" } else { int }, 1)?;
    if frac.is_empty() {
        return Ok(secs);
    }
    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Deserialization(format!("'{}' has an invalid fraction", number)));
    }
    let nanos: i64 = format!("{:0<9}", frac)
        .parse()
        .map_err(|_| Error::Deserialization(format!("'{}' has an invalid fraction", number)))?;
    Ok(secs + TimeDelta::nanoseconds(nanos))
}
