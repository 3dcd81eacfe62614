//! Calendar-style parser.
//!
//! Whitespace before a field is skipped, a numeric field directly followed
//! by another numeric field is read with its letter count as width, and
//! input left over after the last pattern element is ignored. Parsed fields
//! are resolved into a calendar date: lenient resolution rolls overflowing
//! components into the next unit, strict resolution requires every parsed
//! field to survive unchanged.

use super::pattern::{
    DAYS, DAYS_SHORT, Field, MONTHS, MONTHS_SHORT, ParsedFields, PatternError, PatternToken,
    Scanner, rolled_date, tokenize_pattern,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

const LETTERS: &str = "GyYMLwWDdFEuaHkKhmsSzZX";

/// Zone names understood besides numeric offsets, with their offsets in
/// minutes.
const ZONES: [(&str, i64); 10] = [
    ("UTC", 0),
    ("UT", 0),
    ("EST", -300),
    ("EDT", -240),
    ("CST", -360),
    ("CDT", -300),
    ("MST", -420),
    ("MDT", -360),
    ("PST", -480),
    ("PDT", -420),
];

#[derive(Debug, Clone)]
pub(crate) struct LegacyPattern {
    tokens: Vec<PatternToken>,
    lenient: bool,
}

fn is_numeric(letter: char, count: usize) -> bool {
    match letter {
        'M' | 'L' => count <= 2,
        'y' | 'Y' | 'w' | 'W' | 'D' | 'd' | 'F' | 'u' | 'H' | 'k' | 'K' | 'h' | 'm' | 's'
        | 'S' => true,
        _ => false,
    }
}

impl LegacyPattern {
    pub(crate) fn compile(pattern: &str, lenient: bool) -> Result<Self, PatternError> {
        let tokens = tokenize_pattern(pattern, &[])?;
        for token in &tokens {
            if let PatternToken::Field { letter, .. } = token {
                if !LETTERS.contains(*letter) {
                    return Err(PatternError::new(format!(
                        "Illegal pattern character '{letter}'"
                    )));
                }
            }
        }
        Ok(Self { tokens, lenient })
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        self.parse_fields(text)
            .and_then(|fields| resolve(&fields, self.lenient))
            .is_some()
    }

    fn parse_fields(&self, text: &str) -> Option<ParsedFields> {
        let mut scanner = Scanner::new(text);
        let mut fields = ParsedFields::default();

        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                PatternToken::Literal(literal) => {
                    if !scanner.literal(literal, false) {
                        return None;
                    }
                }
                PatternToken::Field { letter, count } => {
                    let abutting = self
                        .tokens
                        .get(i + 1)
                        .is_some_and(|next| next.is_numeric_field(is_numeric));
                    let width = (abutting && is_numeric(*letter, *count)).then_some(*count);

                    scanner.skip_whitespace();
                    parse_field(&mut scanner, &mut fields, *letter, *count, width)?;
                }
            }
        }

        Some(fields)
    }
}

fn parse_field(
    scanner: &mut Scanner<'_>,
    fields: &mut ParsedFields,
    letter: char,
    count: usize,
    width: Option<usize>,
) -> Option<()> {
    if is_numeric(letter, count) {
        let max = width.unwrap_or(usize::MAX);
        let consumed = scanner.digit_run().min(max);
        let value = scanner.digits(1, max)?;

        let (field, value) = match letter {
            'y' | 'Y' => {
                let value = if count <= 2 && consumed == 2 {
                    ambiguous_year(value)
                } else {
                    value
                };
                let field = if letter == 'y' {
                    Field::YearOfEra
                } else {
                    Field::WeekYear
                };
                (field, value)
            }
            'M' | 'L' => (Field::Month, value),
            'w' => (Field::WeekOfYear, value),
            'W' => (Field::WeekOfMonth, value),
            'D' => (Field::DayOfYear, value),
            'd' => (Field::DayOfMonth, value),
            'F' => (Field::DayOfWeekInMonth, value),
            'u' => (Field::DayOfWeek, value),
            'H' => (Field::HourOfDay, value),
            'k' => (Field::HourOfDay, if value == 24 { 0 } else { value }),
            'K' => (Field::HourOfAmPm, value),
            'h' => (Field::HourOfAmPm, if value == 12 { 0 } else { value }),
            'm' => (Field::Minute, value),
            's' => (Field::Second, value),
            _ => (Field::Millisecond, value),
        };
        fields.replace(field, value);
        return Some(());
    }

    match letter {
        'G' => {
            let era = scanner.choice(&["BC", "AD"], true)?;
            fields.replace(Field::Era, era as i64);
        }
        'M' | 'L' => {
            let names: Vec<&str> = MONTHS.iter().chain(MONTHS_SHORT.iter()).copied().collect();
            let index = scanner.choice(&names, true)?;
            fields.replace(Field::Month, (index % 12) as i64 + 1);
        }
        'E' => {
            let names: Vec<&str> = DAYS.iter().chain(DAYS_SHORT.iter()).copied().collect();
            let index = scanner.choice(&names, true)?;
            fields.replace(Field::DayOfWeek, (index % 7) as i64 + 1);
        }
        'a' => {
            let marker = scanner.choice(&["AM", "PM"], true)?;
            fields.replace(Field::AmPm, marker as i64);
        }
        'X' => {
            let offset = iso_zone(scanner, count)?;
            fields.replace(Field::OffsetSeconds, offset);
        }
        _ => {
            let offset = general_zone(scanner)?;
            fields.replace(Field::OffsetSeconds, offset);
        }
    }
    Some(())
}

/// Two-digit years fall within 80 years before and 20 years after now.
fn ambiguous_year(two_digits: i64) -> i64 {
    let start = i64::from(Utc::now().year()) - 80;
    let year = start / 100 * 100 + two_digits;
    if year < start { year + 100 } else { year }
}

fn offset_seconds(sign: i64, hours: i64, minutes: i64) -> Option<i64> {
    (hours <= 23 && minutes <= 59).then_some(sign * (hours * 3600 + minutes * 60))
}

/// `Z`, `-08`, `-0800` or `-08:00` depending on the letter count.
fn iso_zone(scanner: &mut Scanner<'_>, count: usize) -> Option<i64> {
    if scanner.literal("Z", false) {
        return Some(0);
    }
    let sign = scanner.sign()?;
    let hours = scanner.digits(2, 2)?;
    let minutes = match count {
        1 => 0,
        2 => scanner.digits(2, 2)?,
        _ => {
            if !scanner.literal(":", false) {
                return None;
            }
            scanner.digits(2, 2)?
        }
    };
    offset_seconds(sign, hours, minutes)
}

/// `GMT-08:00`, `-0800` or a zone name.
fn general_zone(scanner: &mut Scanner<'_>) -> Option<i64> {
    if scanner.literal("GMT", true) {
        let Some(sign) = scanner.sign() else {
            return Some(0);
        };
        let hours = scanner.digits(1, 2)?;
        let minutes = if scanner.literal(":", false) {
            scanner.digits(2, 2)?
        } else {
            0
        };
        return offset_seconds(sign, hours, minutes);
    }

    if let Some(sign) = scanner.sign() {
        let hhmm = scanner.digits(4, 4)?;
        return offset_seconds(sign, hhmm / 100, hhmm % 100);
    }

    let names: Vec<&str> = ZONES.iter().map(|(name, _)| *name).collect();
    let index = scanner.choice(&names, true)?;
    Some(ZONES[index].1 * 60)
}

fn in_range(field: Field, value: i64) -> bool {
    let (min, max) = match field {
        Field::Era => (0, 1),
        Field::YearOfEra | Field::WeekYear => (1, 292_278_994),
        Field::Month => (1, 12),
        Field::WeekOfYear => (1, 53),
        Field::WeekOfMonth => (0, 6),
        Field::DayOfYear => (1, 366),
        Field::DayOfMonth => (1, 31),
        Field::DayOfWeekInMonth => (-1, 6),
        Field::DayOfWeek => (1, 7),
        Field::AmPm => (0, 1),
        Field::HourOfDay => (0, 23),
        Field::HourOfAmPm => (0, 11),
        Field::Minute | Field::Second => (0, 59),
        Field::Millisecond => (0, 999),
        _ => return true,
    };
    (min..=max).contains(&value)
}

/// Builds the date-time the fields describe, or `None` if they do not
/// describe one under the chosen leniency.
fn resolve(fields: &ParsedFields, lenient: bool) -> Option<NaiveDateTime> {
    if !lenient && !fields.iter().all(|(field, value)| in_range(field, value)) {
        return None;
    }

    let year_of_era = fields.get(Field::YearOfEra).unwrap_or(1970);
    let year = if fields.get(Field::Era) == Some(0) {
        1 - year_of_era
    } else {
        year_of_era
    };

    let by_day_of_year = fields.contains(Field::DayOfYear)
        && !fields.contains(Field::Month)
        && !fields.contains(Field::DayOfMonth);
    let date = if by_day_of_year {
        let day_of_year = fields.get(Field::DayOfYear).unwrap_or(1);
        if lenient {
            rolled_date(year, 1, day_of_year)?
        } else {
            NaiveDate::from_yo_opt(i32::try_from(year).ok()?, u32::try_from(day_of_year).ok()?)?
        }
    } else {
        let month = fields.get(Field::Month).unwrap_or(1);
        let day = fields.get(Field::DayOfMonth).unwrap_or(1);
        if lenient {
            rolled_date(year, month, day)?
        } else {
            NaiveDate::from_ymd_opt(
                i32::try_from(year).ok()?,
                u32::try_from(month).ok()?,
                u32::try_from(day).ok()?,
            )?
        }
    };

    if !lenient {
        let weekday = i64::from(date.weekday().number_from_monday());
        if fields.get(Field::DayOfWeek).is_some_and(|day| day != weekday) {
            return None;
        }
        let ordinal = i64::from(date.ordinal());
        if fields.get(Field::DayOfYear).is_some_and(|day| day != ordinal) {
            return None;
        }
    }

    let hour = match fields.get(Field::HourOfDay) {
        Some(hour) => hour,
        None => {
            fields.get(Field::HourOfAmPm).unwrap_or(0) + 12 * fields.get(Field::AmPm).unwrap_or(0)
        }
    };
    let minute = fields.get(Field::Minute).unwrap_or(0);
    let second = fields.get(Field::Second).unwrap_or(0);
    let millis = fields.get(Field::Millisecond).unwrap_or(0);

    if lenient {
        return date
            .and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::try_hours(hour)?)?
            .checked_add_signed(Duration::try_minutes(minute)?)?
            .checked_add_signed(Duration::try_seconds(second)?)?
            .checked_add_signed(Duration::try_milliseconds(millis)?);
    }

    let time = NaiveTime::from_hms_milli_opt(
        u32::try_from(hour).ok()?,
        u32::try_from(minute).ok()?,
        u32::try_from(second).ok()?,
        u32::try_from(millis).ok()?,
    )?;
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strict(pattern: &str) -> LegacyPattern {
        LegacyPattern::compile(pattern, false).unwrap()
    }

    fn lenient(pattern: &str) -> LegacyPattern {
        LegacyPattern::compile(pattern, true).unwrap()
    }

    #[test]
    fn test_compile_rejects_unknown_letters() {
        assert!(LegacyPattern::compile(" NOT A VALID DATE PATTERN ", false).is_err());
        assert!(LegacyPattern::compile("yyyy-MM-dd'T'HH:mm:ss.SSSXXX", false).is_ok());
        assert!(LegacyPattern::compile("uuuu-qq", false).is_err());
    }

    #[test]
    fn test_calendar_validity() {
        assert!(strict("yyyy-MM-dd").matches("2018-01-01"));
        assert!(strict("yyyy-MM-dd").matches("2020-02-29"));
        assert!(!strict("yyyy-MM-dd").matches("2018-02-29"));
        assert!(lenient("yyyy-MM-dd").matches("2018-02-29"));
        assert!(!strict("yyyy-MM-dd").matches("2018-13-01"));
        assert!(lenient("yyyy-MM-dd").matches("2018-13-45"));
    }

    #[test]
    fn test_loose_input() {
        assert!(strict("yyyy-MM-dd").matches("2018-1-1 >"));
        assert!(lenient("yyyy-MM-dd").matches("2018-1-1 >"));
        assert!(strict("yyyy-MM-dd").matches(" 2018- 1-01"));
        assert!(!strict("yyyy-MM-dd").matches(" "));
        assert!(!strict("yyyy-MM-dd").matches("2018/01/01"));
    }

    #[test]
    fn test_abutting_numeric_fields() {
        assert!(strict("yyyyMMdd").matches("20180131"));
        assert!(!strict("yyyyMMdd").matches("20180231"));
        assert!(strict("HHmm").matches("2359"));
        assert!(!strict("HHmm").matches("2460"));
    }

    #[test]
    fn test_text_fields() {
        assert!(strict("EEE, d MMM yyyy HH:mm:ss Z").matches("Mon, 1 Jan 2018 10:00:00 +0100"));
        assert!(strict("EEEE d MMMM yyyy").matches("monday 1 JANUARY 2018"));
        assert!(!strict("EEE d MMM yyyy").matches("Tue 1 Jan 2018"));
        assert!(lenient("EEE d MMM yyyy").matches("Tue 1 Jan 2018"));
        assert!(strict("h:mm a").matches("11:30 PM"));
        assert!(strict("yyyy G").matches("44 BC"));
    }

    #[test]
    fn test_zones() {
        assert!(strict("HH:mm z").matches("10:00 GMT-08:00"));
        assert!(strict("HH:mm z").matches("10:00 PST"));
        assert!(strict("HH:mm XXX").matches("10:00 Z"));
        assert!(strict("HH:mm XXX").matches("10:00 +05:30"));
        assert!(!strict("HH:mm XXX").matches("10:00 +0530"));
        assert!(!strict("HH:mm Z").matches("10:00 +2500"));
    }

    #[test]
    fn test_ambiguous_year() {
        let current = i64::from(Utc::now().year());
        let resolved = ambiguous_year(current % 100);
        assert_eq!(resolved, current);
        assert!(strict("yy-MM-dd").matches("18-01-01"));
    }
}
