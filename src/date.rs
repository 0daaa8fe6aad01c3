use std::collections::HashMap;

use chrono::{Datelike, Locale, NaiveDate};
use regex::Regex;

use crate::error::{MaplapseError, MaplapseResult};

/// Uppercased weekday/month name tables for one locale.
///
/// Built once at startup from chrono's localized formatting and passed into
/// [`DateTextParser`] explicitly, so parsing never depends on ambient process
/// locale state. Weekday names come from a fixed reference week starting on a
/// Sunday (1970-01-04), so index 0 is Sunday in every locale; month names come
/// from the reference year 1970.
#[derive(Clone, Debug)]
pub struct LocaleCalendarNames {
    locale: Locale,
    weekdays: HashMap<String, u32>,
    months: HashMap<String, u32>,
}

/// Sunday of the reference week used to enumerate weekday names.
const REFERENCE_SUNDAY: (i32, u32, u32) = (1970, 1, 4);

impl LocaleCalendarNames {
    pub fn new(locale: Locale) -> Self {
        let (ry, rm, rd) = REFERENCE_SUNDAY;
        let sunday = NaiveDate::from_ymd_opt(ry, rm, rd).unwrap();

        let mut weekdays = HashMap::new();
        for i in 0..7u32 {
            let day = sunday + chrono::Days::new(u64::from(i));
            let name = day.format_localized("%A", locale).to_string();
            weekdays.insert(name.to_uppercase(), i);
        }

        let mut months = HashMap::new();
        match month_name_overrides(locale) {
            Some(names) => {
                for (i, name) in names.iter().enumerate() {
                    months.insert(name.to_uppercase(), i as u32 + 1);
                }
            }
            None => {
                for m in 1..=12u32 {
                    let first = NaiveDate::from_ymd_opt(1970, m, 1).unwrap();
                    let name = first.format_localized("%B", locale).to_string();
                    months.insert(name.to_uppercase(), m);
                }
            }
        }

        Self {
            locale,
            weekdays,
            months,
        }
    }

    pub fn from_identifier(id: &str) -> MaplapseResult<Self> {
        // Accept POSIX-style identifiers with an encoding suffix ("pl_PL.UTF-8").
        let bare = id.split('.').next().unwrap_or(id);
        let locale = Locale::try_from(bare)
            .map_err(|_| MaplapseError::date_parse(format!("unknown locale '{id}'")))?;
        Ok(Self::new(locale))
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Weekday index for an uppercased localized name; 0 = Sunday.
    pub fn weekday(&self, name: &str) -> Option<u32> {
        self.weekdays.get(name).copied()
    }

    /// Month number (1-12) for an uppercased localized name.
    pub fn month(&self, name: &str) -> Option<u32> {
        self.months.get(name).copied()
    }

    pub fn weekday_name(&self, index: u32) -> Option<&str> {
        self.weekdays
            .iter()
            .find(|(_, i)| **i == index)
            .map(|(n, _)| n.as_str())
    }

    pub fn month_name(&self, month: u32) -> Option<&str> {
        self.months
            .iter()
            .find(|(_, m)| **m == month)
            .map(|(n, _)| n.as_str())
    }
}

/// The timeline UI writes dates with genitive month forms in Polish
/// ("9 stycznia 2021"), while chrono's `%B` yields the nominative
/// ("styczeń"). Override the generated table for that locale.
fn month_name_overrides(locale: Locale) -> Option<[&'static str; 12]> {
    match locale {
        Locale::pl_PL => Some([
            "stycznia",
            "lutego",
            "marca",
            "kwietnia",
            "maja",
            "czerwca",
            "lipca",
            "sierpnia",
            "września",
            "października",
            "listopada",
            "grudnia",
        ]),
        _ => None,
    }
}

/// Parses the timeline header's localized date label,
/// e.g. `"Friday, 8 January 2021"`.
pub struct DateTextParser {
    names: LocaleCalendarNames,
    pattern: Regex,
}

impl DateTextParser {
    pub fn new(names: LocaleCalendarNames) -> Self {
        // `\w` is Unicode-aware, so accented month names match.
        let pattern = Regex::new(r"^(\w+),\s+(\d{1,2})\s+(\w+)\s+(\d+)").unwrap();
        Self { names, pattern }
    }

    pub fn names(&self) -> &LocaleCalendarNames {
        &self.names
    }

    pub fn parse(&self, text: &str) -> MaplapseResult<NaiveDate> {
        let upper = text.to_uppercase();
        let caps = self.pattern.captures(upper.trim()).ok_or_else(|| {
            MaplapseError::date_parse(format!("date label '{text}' does not match expected shape"))
        })?;

        let weekday = self.names.weekday(&caps[1]).ok_or_else(|| {
            MaplapseError::date_parse(format!("unrecognized weekday name '{}'", &caps[1]))
        })?;
        let day: u32 = caps[2]
            .parse()
            .map_err(|_| MaplapseError::date_parse(format!("invalid day '{}'", &caps[2])))?;
        let month = self.names.month(&caps[3]).ok_or_else(|| {
            MaplapseError::date_parse(format!("unrecognized month name '{}'", &caps[3]))
        })?;
        let year: i32 = caps[4]
            .parse()
            .map_err(|_| MaplapseError::date_parse(format!("invalid year '{}'", &caps[4])))?;

        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            MaplapseError::date_parse(format!("{year}-{month:02}-{day:02} is not a calendar date"))
        })?;

        // The label's weekday is diagnostic only: a mismatch usually means the
        // page skipped ahead or rendered a different range than expected.
        if date.weekday().num_days_from_sunday() != weekday {
            tracing::warn!(
                label = text,
                parsed = %date,
                "weekday in date label disagrees with parsed date"
            );
        }

        Ok(date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(locale: Locale) -> DateTextParser {
        DateTextParser::new(LocaleCalendarNames::new(locale))
    }

    #[test]
    fn reference_week_maps_sunday_to_zero() {
        let names = LocaleCalendarNames::new(Locale::en_US);
        assert_eq!(names.weekday("SUNDAY"), Some(0));
        assert_eq!(names.weekday("MONDAY"), Some(1));
        assert_eq!(names.weekday("SATURDAY"), Some(6));
    }

    #[test]
    fn parses_english_label() {
        let p = parser(Locale::en_US);
        let date = p.parse("Friday, 8 January 2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 8).unwrap());
    }

    #[test]
    fn parse_is_case_insensitive() {
        let p = parser(Locale::en_US);
        let date = p.parse("fRiDaY, 8 jAnUaRy 2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 8).unwrap());
    }

    #[test]
    fn parses_polish_genitive_month() {
        let p = parser(Locale::pl_PL);
        let date = p.parse("sobota, 9 stycznia 2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 9).unwrap());

        let date = p.parse("niedziela, 10 października 2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 10, 10).unwrap());
    }

    #[test]
    fn round_trips_labels_built_from_own_tables() {
        for locale in [Locale::en_US, Locale::en_GB, Locale::pl_PL] {
            let p = parser(locale);
            for (y, m, d) in [(2021, 1, 8), (2021, 6, 30), (2024, 12, 1)] {
                let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
                let weekday = p
                    .names()
                    .weekday_name(date.weekday().num_days_from_sunday())
                    .unwrap();
                let month = p.names().month_name(m).unwrap();
                let label = format!("{weekday}, {d} {month} {y}");
                assert_eq!(p.parse(&label).unwrap(), date, "label '{label}'");
            }
        }
    }

    #[test]
    fn rejects_non_matching_text() {
        let p = parser(Locale::en_US);
        for text in ["not a date", "", "8 January 2021", "Friday 8 January"] {
            let err = p.parse(text).unwrap_err();
            assert!(matches!(err, MaplapseError::DateParse(_)), "text '{text}'");
        }
    }

    #[test]
    fn rejects_unknown_names_and_bad_days() {
        let p = parser(Locale::en_US);
        assert!(matches!(
            p.parse("Blursday, 8 January 2021").unwrap_err(),
            MaplapseError::DateParse(_)
        ));
        assert!(matches!(
            p.parse("Friday, 8 Janvember 2021").unwrap_err(),
            MaplapseError::DateParse(_)
        ));
        assert!(matches!(
            p.parse("Sunday, 31 February 2021").unwrap_err(),
            MaplapseError::DateParse(_)
        ));
    }

    #[test]
    fn weekday_mismatch_still_parses() {
        // 2021-01-08 was a Friday; the label claims Monday.
        let p = parser(Locale::en_US);
        let date = p.parse("Monday, 8 January 2021").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2021, 1, 8).unwrap());
    }
}
