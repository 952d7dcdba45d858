//! Multi-target argument syntax such as `3,5-7,10`.

use std::collections::HashSet;

use crate::{Error, Result};

fn number(token: &str, whole: &str) -> Result<u32> {
    token
        .trim()
        .parse()
        .map_err(|_| Error::InvalidToken(format!("'{}' in '{whole}'", token.trim())))
}

/// Expands `3,5-7,10` style input into ordered, de-duplicated integers.
pub fn expand_range(input: &str) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |n: u32, out: &mut Vec<u32>| {
        if seen.insert(n) {
            out.push(n);
        }
    };

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                if end.contains('-') {
                    return Err(Error::InvalidRange(format!("invalid range format: {part}")));
                }
                let (start, end) = (number(start, part)?, number(end, part)?);
                if start > end {
                    return Err(Error::InvalidRange(format!(
                        "start {start} is greater than end {end}"
                    )));
                }
                for n in start..=end {
                    push(n, &mut out);
                }
            }
            None => push(number(part, part)?, &mut out),
        }
    }

    if out.is_empty() {
        return Err(Error::EmptyRange);
    }
    Ok(out)
}

/// Splits a batch argument into individual references. Only arguments made
/// of digits, commas, hyphens and spaces go through [`expand_range`]; names
/// like `20240601T090000--buy-milk__task.md` stay a single reference.
pub fn expand_targets(arg: &str) -> Result<Vec<String>> {
    let trimmed = arg.trim();
    let range_like = trimmed.contains([',', '-'])
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '-' | ' '));
    if !range_like {
        if trimmed.is_empty() {
            return Err(Error::EmptyRange);
        }
        return Ok(vec![trimmed.to_string()]);
    }
    Ok(expand_range(trimmed)?
        .into_iter()
        .map(|n| n.to_string())
        .collect())
}
