//! Calendar helpers and the user-facing date expression interpreter.

use time::{
    macros::format_description, util::days_in_year_month, Date, Duration, Month, OffsetDateTime,
    Weekday,
};

use crate::{Error, Result};

/// Current time in the local offset, falling back to UTC when the offset
/// cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn local_today() -> Date {
    now().date()
}

pub fn parse_iso(s: &str) -> Result<Date> {
    Date::parse(s.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| Error::Validation(format!("invalid date: {s} (expected YYYY-MM-DD)")))
}

pub fn format_iso(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), u8::from(d.month()), d.day())
}

/// Adds calendar months, clamping the day to the end of the target month.
pub fn add_months(d: Date, months: i32) -> Result<Date> {
    let zero_based = d.year() * 12 + i32::from(u8::from(d.month())) - 1 + months;
    let year = zero_based.div_euclid(12);
    let month = Month::try_from((zero_based.rem_euclid(12) + 1) as u8)
        .map_err(|e| Error::Validation(e.to_string()))?;
    let day = d.day().min(days_in_year_month(year, month));
    Date::from_calendar_date(year, month, day).map_err(|e| Error::Validation(e.to_string()))
}

fn add_days(d: Date, days: i64) -> Result<Date> {
    d.checked_add(Duration::days(days))
        .ok_or_else(|| Error::Validation(format!("date out of range: {days} days from {d}")))
}

fn weekday_named(s: &str) -> Option<Weekday> {
    Some(match s {
        "monday" | "mon" => Weekday::Monday,
        "tuesday" | "tue" => Weekday::Tuesday,
        "wednesday" | "wed" => Weekday::Wednesday,
        "thursday" | "thu" => Weekday::Thursday,
        "friday" | "fri" => Weekday::Friday,
        "saturday" | "sat" => Weekday::Saturday,
        "sunday" | "sun" => Weekday::Sunday,
        _ => return None,
    })
}

/// `3d`, `2w`, `1m` (a month counts as 30 days here).
fn relative_days(s: &str) -> Option<i64> {
    let unit = s.chars().last()?;
    let n: i64 = s[..s.len() - unit.len_utf8()].parse().ok()?;
    match unit {
        'd' => Some(n),
        'w' => Some(n * 7),
        'm' => Some(n * 30),
        _ => None,
    }
}

/// Interprets `today`, `tomorrow`, `next week`, `next month`, weekday names
/// (next occurrence after today), `3d`/`2w`/`1m` offsets and `YYYY-MM-DD`.
pub fn parse_date_expr(expr: &str, today: Date) -> Result<Date> {
    let lower = expr.trim().to_lowercase();
    match lower.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return add_days(today, 1),
        "next week" => return add_days(today, 7),
        "next month" => return add_months(today, 1),
        _ => {}
    }
    if let Some(target) = weekday_named(&lower) {
        let mut ahead = i64::from(target.number_days_from_monday())
            - i64::from(today.weekday().number_days_from_monday());
        if ahead <= 0 {
            ahead += 7;
        }
        return add_days(today, ahead);
    }
    if let Some(days) = relative_days(&lower) {
        return add_days(today, days);
    }
    parse_iso(&lower).map_err(|_| {
        Error::Validation(format!(
            "invalid date format: {expr} (use YYYY-MM-DD, day name, or relative like '3d', '2w', '1m')"
        ))
    })
}
