use time::{Date, Month};

use crate::contact::Contact;
use crate::format;

pub const DEFAULT_LOOKAHEAD_DAYS: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpcomingBirthday {
    pub name: String,
    /// Birthday exactly as stored.
    pub birthday: String,
    pub days_until: i64,
}

/// The anniversary of `birthday` in `year`. 29 February falls back to
/// 28 February in non-leap years.
fn anniversary_in(birthday: Date, year: i32) -> Option<Date> {
    Date::from_calendar_date(year, birthday.month(), birthday.day())
        .or_else(|_| Date::from_calendar_date(year, Month::February, 28))
        .ok()
}

/// Days from `today` until the next occurrence of `birthday` (0 when it is today).
pub fn days_until(birthday: Date, today: Date) -> Option<i64> {
    let mut next = anniversary_in(birthday, today.year())?;
    if next < today {
        next = anniversary_in(birthday, today.year() + 1)?;
    }
    Some((next - today).whole_days())
}

/// Days until a contact's next birthday, or `None` without a parseable birthday.
pub fn days_to_birthday(contact: &Contact, today: Date) -> Option<i64> {
    let raw = contact.birthday.as_deref()?;
    let birthday = format::parse_birthday(raw)?;
    days_until(birthday, today)
}

/// "today", "tomorrow" or "in N days".
pub fn describe_days(days_until: i64) -> String {
    match days_until {
        0 => "today".to_string(),
        1 => "tomorrow".to_string(),
        n => format!("in {} days", n),
    }
}

/// Contacts whose next birthday is within `days` days of `today`, soonest first.
pub fn upcoming_birthdays(contacts: &[Contact], today: Date, days: u32) -> Vec<UpcomingBirthday> {
    let mut upcoming: Vec<UpcomingBirthday> = contacts
        .iter()
        .filter_map(|contact| {
            let days_until = days_to_birthday(contact, today)?;
            (days_until <= i64::from(days)).then(|| UpcomingBirthday {
                name: contact.name.clone(),
                birthday: contact.birthday.clone().unwrap_or_default(),
                days_until,
            })
        })
        .collect();
    upcoming.sort_by_key(|entry| entry.days_until);
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn with_birthday(name: &str, birthday: &str) -> Contact {
        Contact {
            name: name.to_string(),
            birthday: Some(birthday.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_days_until() {
        let today = date!(2026 - 10 - 16);
        assert_eq!(days_until(date!(1990 - 10 - 16), today), Some(0));
        assert_eq!(days_until(date!(1990 - 10 - 20), today), Some(4));
        assert_eq!(days_until(date!(1990 - 10 - 15), today), Some(364));
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let today = date!(2027 - 02 - 20);
        assert_eq!(days_until(date!(2000 - 02 - 29), today), Some(8));
        let leap_today = date!(2028 - 02 - 20);
        assert_eq!(days_until(date!(2000 - 02 - 29), leap_today), Some(9));
    }

    #[test]
    fn test_upcoming_birthdays_sorted_and_bounded() {
        let today = date!(2026 - 10 - 16);
        let contacts = vec![
            with_birthday("Later", "22-10-1980"),
            with_birthday("Today", "16-10-1975"),
            with_birthday("Soon", "18-10-2001"),
            with_birthday("Far", "01-01-1990"),
            with_birthday("Broken", "someday"),
            Contact {
                name: "None".into(),
                ..Default::default()
            },
        ];
        let upcoming = upcoming_birthdays(&contacts, today, DEFAULT_LOOKAHEAD_DAYS);
        let names: Vec<&str> = upcoming.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["Today", "Soon", "Later"]);
        assert_eq!(upcoming[2].days_until, 6);
        assert_eq!(upcoming[1].birthday, "18-10-2001");
    }

    #[test]
    fn test_describe_days() {
        assert_eq!(describe_days(0), "today");
        assert_eq!(describe_days(1), "tomorrow");
        assert_eq!(describe_days(5), "in 5 days");
    }

    #[test]
    fn test_days_to_birthday_without_birthday() {
        let today = date!(2026 - 10 - 16);
        let contact = Contact {
            name: "Nobody".into(),
            ..Default::default()
        };
        assert_eq!(days_to_birthday(&contact, today), None);
        assert_eq!(days_to_birthday(&with_birthday("X", "bad"), today), None);
    }
}
