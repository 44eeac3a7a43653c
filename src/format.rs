use log::debug;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime};

/// Badge text for a contact name.
///
/// A single word yields its first two characters ("Prince" -> "Pr"); several
/// words yield the first character of the first and last word ("Ada Lovelace" -> "AL").
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    match words.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    }
}

/// Parse a loosely formatted day-month-year string (`15-03-1990`, `1/2/90`,
/// `3.4.2001`, `7 8 1999`). Every delimiter splits, so doubled delimiters or
/// padding produce extra parts and the string is rejected.
pub fn parse_birthday(raw: &str) -> Option<Date> {
    parse_birthday_with(raw, OffsetDateTime::now_utc().year())
}

fn parse_birthday_with(raw: &str, current_year: i32) -> Option<Date> {
    let parts: Vec<&str> = raw
        .split(|c: char| matches!(c, '-' | '/' | '.') || c.is_whitespace())
        .collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let day: u8 = day.parse().ok()?;
    let month: u8 = month.parse().ok()?;
    let mut year_value: i32 = year.parse().ok()?;
    if year.len() <= 2 {
        year_value = expand_two_digit_year(year_value, current_year);
    }

    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year_value, month, day).ok()
}

/// Two-digit years land in this century unless that would put them in the future.
fn expand_two_digit_year(year: i32, current_year: i32) -> i32 {
    let expanded = 2000 + year;
    if expanded > current_year {
        1900 + year
    } else {
        expanded
    }
}

/// Render a birthday as "D Mon YYYY", falling back to the raw text.
pub fn format_date(raw: &str) -> String {
    format_date_with(raw, OffsetDateTime::now_utc().year())
}

fn format_date_with(raw: &str, current_year: i32) -> String {
    let Some(date) = parse_birthday_with(raw, current_year) else {
        debug!("birthday `{}` is not a day-month-year date; showing it as is", raw);
        return raw.to_string();
    };

    let description = format_description!("[day padding:none] [month repr:short] [year]");
    match date.format(&description) {
        Ok(formatted) => formatted,
        Err(err) => {
            debug!("failed to format birthday `{}`: {}", raw, err);
            raw.to_string()
        }
    }
}
