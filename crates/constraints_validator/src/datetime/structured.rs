//! Strict-format parser with resolver styles.
//!
//! The whole input must be consumed. Field widths follow the letter counts
//! and text is matched case-sensitively. A variable-width number followed
//! directly by fixed-width numbers leaves them their digits, so `uuuuMMdd`
//! reads `20180131`.
//!
//! Resolution depends on the [`ResolverStyle`]:
//!
//! - `Strict` rejects invalid dates and does not combine a year-of-era
//!   without an era into a date; only the field ranges are checked then.
//! - `Smart` clamps the day-of-month to the length of the month.
//! - `Lenient` rolls overflowing months and days over.
//!
//! A parsed day-of-week must agree with the resolved date in every style.

use super::pattern::{
    DAYS, DAYS_SHORT, Field, MONTHS, MONTHS_SHORT, ParsedFields, PatternError, PatternToken,
    Scanner, rolled_date, tokenize_pattern,
};
use chrono::{Datelike, NaiveDate};
use constraints_core::ResolverStyle;

/// Pattern characters with no supported meaning; `[` and `]` would open
/// optional sections.
const RESERVED: [char; 5] = ['{', '}', '#', '[', ']'];

const ERAS: [&str; 2] = ["BC", "AD"];
const ERAS_FULL: [&str; 2] = ["Before Christ", "Anno Domini"];
const AM_PM: [&str; 2] = ["AM", "PM"];
const QUARTERS: [&str; 4] = ["Q1", "Q2", "Q3", "Q4"];
const QUARTERS_FULL: [&str; 4] = ["1st quarter", "2nd quarter", "3rd quarter", "4th quarter"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextStyle {
    Short,
    Full,
    Narrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignStyle {
    /// No sign accepted
    NotNegative,
    /// `-` accepted
    Normal,
    /// `-` accepted, `+` required once the minimum width is exceeded
    ExceedsPad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Absent,
    Optional,
    Required,
}

/// Layout of a numeric zone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OffsetLayout {
    minutes: Presence,
    seconds: Presence,
    colon: bool,
}

impl OffsetLayout {
    const fn new(minutes: Presence, seconds: Presence, colon: bool) -> Self {
        Self {
            minutes,
            seconds,
            colon,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Element {
    Literal(String),
    Number {
        field: Field,
        min: usize,
        max: usize,
        sign: SignStyle,
        /// Digits kept for the fixed-width numbers that follow
        reserved: usize,
    },
    /// Two digits added to 2000
    ReducedYear(Field),
    Fraction(usize),
    Text(Field, TextStyle),
    /// Day of week counted from Sunday
    LocalDayOfWeek {
        min: usize,
    },
    Offset {
        layout: OffsetLayout,
        zero: &'static str,
    },
    LocalizedOffset,
}

impl Element {
    fn number(field: Field, min: usize, max: usize, sign: SignStyle) -> Self {
        Element::Number {
            field,
            min,
            max,
            sign,
            reserved: 0,
        }
    }

    fn variable(field: Field) -> Self {
        Self::number(field, 1, 19, SignStyle::Normal)
    }

    fn fixed(field: Field, width: usize) -> Self {
        Self::number(field, width, width, SignStyle::NotNegative)
    }

    /// Width of a number that always takes the same number of digits.
    fn fixed_width(&self) -> Option<usize> {
        match self {
            Element::Number { min, max, .. } if min == max => Some(*min),
            Element::ReducedYear(_) => Some(2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct StructuredPattern {
    elements: Vec<Element>,
    style: ResolverStyle,
}

impl StructuredPattern {
    pub(crate) fn compile(pattern: &str, style: ResolverStyle) -> Result<Self, PatternError> {
        let mut elements = tokenize_pattern(pattern, &RESERVED)?
            .into_iter()
            .map(|token| match token {
                PatternToken::Literal(text) => Ok(Element::Literal(text)),
                PatternToken::Field { letter, count } => element(letter, count),
            })
            .collect::<Result<Vec<_>, _>>()?;

        for i in 0..elements.len() {
            let subsequent: usize = elements[i + 1..]
                .iter()
                .map_while(Element::fixed_width)
                .sum();
            if let Element::Number {
                min, max, reserved, ..
            } = &mut elements[i]
            {
                if min != max {
                    *reserved = subsequent;
                }
            }
        }

        Ok(Self { elements, style })
    }

    pub(crate) fn matches(&self, text: &str) -> bool {
        self.parse_fields(text)
            .is_some_and(|fields| resolve(&fields, self.style).is_some())
    }

    fn parse_fields(&self, text: &str) -> Option<ParsedFields> {
        let mut scanner = Scanner::new(text);
        let mut fields = ParsedFields::default();

        for element in &self.elements {
            parse_element(&mut scanner, &mut fields, element)?;
        }

        scanner.is_at_end().then_some(fields)
    }
}

fn element(letter: char, count: usize) -> Result<Element, PatternError> {
    let too_many = || PatternError::new(format!("Too many pattern letters: {letter}"));
    let text = |field: Field| match count {
        3 => Ok(Element::Text(field, TextStyle::Short)),
        4 => Ok(Element::Text(field, TextStyle::Full)),
        5 => Ok(Element::Text(field, TextStyle::Narrow)),
        _ => Err(too_many()),
    };

    match letter {
        'G' => match count {
            1..=3 => Ok(Element::Text(Field::Era, TextStyle::Short)),
            _ => text(Field::Era),
        },
        'u' | 'y' => {
            let field = if letter == 'u' {
                Field::Year
            } else {
                Field::YearOfEra
            };
            match count {
                2 => Ok(Element::ReducedYear(field)),
                1 | 3 => Ok(Element::number(field, count, 19, SignStyle::Normal)),
                4..=19 => Ok(Element::number(field, count, 19, SignStyle::ExceedsPad)),
                _ => Err(too_many()),
            }
        }
        'D' => match count {
            1 => Ok(Element::variable(Field::DayOfYear)),
            2 => Ok(Element::number(Field::DayOfYear, 2, 3, SignStyle::NotNegative)),
            3 => Ok(Element::fixed(Field::DayOfYear, 3)),
            _ => Err(too_many()),
        },
        'M' | 'L' | 'Q' | 'q' => {
            let field = if matches!(letter, 'M' | 'L') {
                Field::Month
            } else {
                Field::Quarter
            };
            match count {
                1 => Ok(Element::variable(field)),
                2 => Ok(Element::fixed(field, 2)),
                _ => text(field),
            }
        }
        'd' | 'h' | 'H' | 'k' | 'K' | 'm' | 's' => {
            let field = match letter {
                'd' => Field::DayOfMonth,
                'h' => Field::ClockHourOfAmPm,
                'H' => Field::HourOfDay,
                'k' => Field::ClockHourOfDay,
                'K' => Field::HourOfAmPm,
                'm' => Field::Minute,
                _ => Field::Second,
            };
            match count {
                1 => Ok(Element::variable(field)),
                2 => Ok(Element::fixed(field, 2)),
                _ => Err(too_many()),
            }
        }
        'E' => match count {
            1..=3 => Ok(Element::Text(Field::DayOfWeek, TextStyle::Short)),
            _ => text(Field::DayOfWeek),
        },
        'e' | 'c' => match count {
            1 => Ok(Element::LocalDayOfWeek { min: 1 }),
            2 if letter == 'e' => Ok(Element::LocalDayOfWeek { min: 2 }),
            2 => Err(PatternError::new("Invalid pattern \"cc\"")),
            _ => text(Field::DayOfWeek),
        },
        'a' => match count {
            1 => Ok(Element::Text(Field::AmPm, TextStyle::Short)),
            _ => Err(too_many()),
        },
        'S' => match count {
            1..=9 => Ok(Element::Fraction(count)),
            _ => Err(too_many()),
        },
        'n' => match count {
            1 => Ok(Element::variable(Field::NanoOfSecond)),
            2..=19 => Ok(Element::number(
                Field::NanoOfSecond,
                count,
                19,
                SignStyle::NotNegative,
            )),
            _ => Err(too_many()),
        },
        'X' | 'x' => {
            use Presence::{Absent, Optional, Required};
            let (layout, zero) = match count {
                1 => (OffsetLayout::new(Optional, Absent, false), "+00"),
                2 => (OffsetLayout::new(Required, Absent, false), "+0000"),
                3 => (OffsetLayout::new(Required, Absent, true), "+00:00"),
                4 => (OffsetLayout::new(Required, Optional, false), "+0000"),
                5 => (OffsetLayout::new(Required, Optional, true), "+00:00"),
                _ => return Err(too_many()),
            };
            let zero = if letter == 'X' { "Z" } else { zero };
            Ok(Element::Offset { layout, zero })
        }
        'Z' => {
            use Presence::{Absent, Optional, Required};
            match count {
                1..=3 => Ok(Element::Offset {
                    layout: OffsetLayout::new(Required, Absent, false),
                    zero: "+0000",
                }),
                4 => Ok(Element::LocalizedOffset),
                5 => Ok(Element::Offset {
                    layout: OffsetLayout::new(Required, Optional, true),
                    zero: "Z",
                }),
                _ => Err(too_many()),
            }
        }
        other => Err(PatternError::new(format!("Unknown pattern letter: {other}"))),
    }
}

fn parse_element(
    scanner: &mut Scanner<'_>,
    fields: &mut ParsedFields,
    element: &Element,
) -> Option<()> {
    match element {
        Element::Literal(text) => scanner.literal(text, false).then_some(()),
        Element::Number {
            field,
            min,
            max,
            sign,
            reserved,
        } => {
            let value = parse_number(scanner, *min, *max, *sign, *reserved)?;
            fields.set(*field, value)
        }
        Element::ReducedYear(field) => {
            let value = scanner.digits(2, 2)?;
            fields.set(*field, 2000 + value)
        }
        Element::Fraction(width) => {
            let digits = scanner.digits(*width, *width)?;
            let scale = 10_i64.pow(9 - u32::try_from(*width).ok()?);
            fields.set(Field::NanoOfSecond, digits * scale)
        }
        Element::Text(field, style) => {
            let (index, offset) = parse_text(scanner, *field, *style)?;
            fields.set(*field, index as i64 + offset)
        }
        Element::LocalDayOfWeek { min } => {
            let local = scanner.digits(*min, 2)?;
            if !(1..=7).contains(&local) {
                return None;
            }
            fields.set(Field::DayOfWeek, (local + 5) % 7 + 1)
        }
        Element::Offset { layout, zero } => {
            let offset = if scanner.literal(zero, false) {
                0
            } else {
                parse_offset(scanner, *layout)?
            };
            fields.set(Field::OffsetSeconds, offset)
        }
        Element::LocalizedOffset => {
            if !scanner.literal("GMT", false) {
                return None;
            }
            let offset = match scanner.sign() {
                None => 0,
                Some(sign) => {
                    let hours = scanner.digits(1, 2)?;
                    let minutes = if scanner.literal(":", false) {
                        scanner.digits(2, 2)?
                    } else {
                        0
                    };
                    sign * (hours * 3600 + minutes * 60)
                }
            };
            fields.set(Field::OffsetSeconds, offset)
        }
    }
}

fn parse_number(
    scanner: &mut Scanner<'_>,
    min: usize,
    max: usize,
    sign: SignStyle,
    reserved: usize,
) -> Option<i64> {
    let signum = match (sign, scanner.peek()) {
        (SignStyle::NotNegative, _) => 0,
        (SignStyle::Normal, Some('+')) => return None,
        (_, Some('+' | '-')) => scanner.sign()?,
        _ => 0,
    };

    let available = scanner.digit_run().min(max + reserved);
    let width = available.saturating_sub(reserved).min(max);
    if width < min {
        return None;
    }

    if sign == SignStyle::ExceedsPad && signum != -1 && (signum == 1) != (width > min) {
        return None;
    }

    let value = scanner.digits(width, width)?;
    Some(if signum == -1 { -value } else { value })
}

fn parse_text(scanner: &mut Scanner<'_>, field: Field, style: TextStyle) -> Option<(usize, i64)> {
    let narrow = |names: &[&'static str]| -> Vec<&'static str> {
        names.iter().map(|&name| &name[..1]).collect()
    };

    let (names, offset): (Vec<&str>, i64) = match (field, style) {
        (Field::Era, TextStyle::Short) => (ERAS.to_vec(), 0),
        (Field::Era, TextStyle::Full) => (ERAS_FULL.to_vec(), 0),
        (Field::Era, TextStyle::Narrow) => (vec!["B", "A"], 0),
        (Field::AmPm, _) => (AM_PM.to_vec(), 0),
        (Field::Month, TextStyle::Short) => (MONTHS_SHORT.to_vec(), 1),
        (Field::Month, TextStyle::Full) => (MONTHS.to_vec(), 1),
        (Field::Month, TextStyle::Narrow) => (narrow(&MONTHS), 1),
        (Field::Quarter, TextStyle::Short) => (QUARTERS.to_vec(), 1),
        (Field::Quarter, TextStyle::Full) => (QUARTERS_FULL.to_vec(), 1),
        (Field::Quarter, TextStyle::Narrow) => (vec!["1", "2", "3", "4"], 1),
        (_, TextStyle::Short) => (DAYS_SHORT.to_vec(), 1),
        (_, TextStyle::Full) => (DAYS.to_vec(), 1),
        (_, TextStyle::Narrow) => (narrow(&DAYS), 1),
    };

    let index = scanner.choice(&names, false)?;
    Some((index, offset))
}

fn parse_offset(scanner: &mut Scanner<'_>, layout: OffsetLayout) -> Option<i64> {
    let sign = match scanner.peek() {
        Some('+' | '-') => scanner.sign()?,
        _ => return None,
    };
    let hours = scanner.digits(2, 2)?;

    let mut component = |presence: Presence| -> Option<i64> {
        if presence == Presence::Absent {
            return Some(0);
        }
        let rest = scanner.rest();
        let separated = layout.colon && rest.starts_with(':');
        let digits_at = if separated { 1 } else { 0 };
        let has_digits = rest[digits_at..]
            .bytes()
            .take(2)
            .filter(u8::is_ascii_digit)
            .count()
            == 2;

        if !has_digits || (layout.colon && !separated) {
            return (presence == Presence::Optional).then_some(0);
        }
        if separated {
            scanner.literal(":", false);
        }
        scanner.digits(2, 2)
    };

    let minutes = component(layout.minutes)?;
    let seconds = if minutes == 0 && layout.minutes == Presence::Optional {
        0
    } else {
        component(layout.seconds)?
    };

    (hours <= 18 && minutes <= 59 && seconds <= 59)
        .then_some(sign * (hours * 3600 + minutes * 60 + seconds))
}

fn in_range(field: Field, value: i64) -> bool {
    let (min, max) = match field {
        Field::Era | Field::AmPm => (0, 1),
        Field::Year => (-999_999_999, 999_999_999),
        Field::YearOfEra => (1, 999_999_999),
        Field::Quarter => (1, 4),
        Field::Month => (1, 12),
        Field::DayOfYear => (1, 366),
        Field::DayOfMonth => (1, 31),
        Field::DayOfWeek => (1, 7),
        Field::HourOfDay => (0, 24),
        Field::ClockHourOfDay => (1, 24),
        Field::HourOfAmPm => (0, 11),
        Field::ClockHourOfAmPm => (1, 12),
        Field::Minute | Field::Second => (0, 59),
        Field::NanoOfSecond => (0, 999_999_999),
        Field::OffsetSeconds => (-64_800, 64_800),
        _ => return true,
    };
    (min..=max).contains(&value)
}

/// Checks the fields against each other under `style`. Returns the resolved
/// date, `Some(None)` when the fields hold no complete date.
fn resolve(fields: &ParsedFields, style: ResolverStyle) -> Option<Option<NaiveDate>> {
    let lenient = style == ResolverStyle::Lenient;
    if !lenient && !fields.iter().all(|(field, value)| in_range(field, value)) {
        return None;
    }

    if !lenient && !time_is_consistent(fields, style) {
        return None;
    }

    let Some(year) = resolve_year(fields, style)? else {
        return Some(None);
    };

    let date = match (fields.get(Field::Month), fields.get(Field::DayOfMonth)) {
        (Some(month), Some(day)) => Some(match style {
            ResolverStyle::Strict => ymd(year, month, day)?,
            ResolverStyle::Smart => {
                let last = last_day_of_month(year, month)?;
                ymd(year, month, day.min(last))?
            }
            ResolverStyle::Lenient => rolled_date(year, month, day)?,
        }),
        (None, None) => match fields.get(Field::DayOfYear) {
            Some(day) if lenient => Some(rolled_date(year, 1, day)?),
            Some(day) => Some(NaiveDate::from_yo_opt(
                i32::try_from(year).ok()?,
                u32::try_from(day).ok()?,
            )?),
            None => None,
        },
        _ => None,
    };

    if let Some(date) = date {
        let weekday = i64::from(date.weekday().number_from_monday());
        if fields.get(Field::DayOfWeek).is_some_and(|day| day != weekday) {
            return None;
        }
        let ordinal = i64::from(date.ordinal());
        if fields.get(Field::DayOfYear).is_some_and(|day| day != ordinal) {
            return None;
        }
        let quarter = i64::from(date.month0() / 3 + 1);
        if fields.get(Field::Quarter).is_some_and(|q| q != quarter) {
            return None;
        }
    }

    Some(date)
}

/// Returns the proleptic year, `Some(None)` when there is none to combine.
fn resolve_year(fields: &ParsedFields, style: ResolverStyle) -> Option<Option<i64>> {
    let era = fields.get(Field::Era);
    let from_era = |year_of_era: i64| match era {
        Some(0) => 1 - year_of_era,
        _ => year_of_era,
    };

    match (fields.get(Field::Year), fields.get(Field::YearOfEra)) {
        (Some(year), year_of_era) => {
            if year_of_era.is_some_and(|yoe| from_era(yoe) != year) {
                return None;
            }
            if era.is_some_and(|era| era != i64::from(year >= 1)) {
                return None;
            }
            Some(Some(year))
        }
        (None, Some(year_of_era)) => {
            if era.is_none() && style == ResolverStyle::Strict {
                Some(None)
            } else {
                Some(Some(from_era(year_of_era)))
            }
        }
        (None, None) => Some(None),
    }
}

fn time_is_consistent(fields: &ParsedFields, style: ResolverStyle) -> bool {
    let hour = fields.get(Field::HourOfDay);
    if hour == Some(24) {
        let rest_is_zero = [Field::Minute, Field::Second, Field::NanoOfSecond]
            .iter()
            .all(|field| fields.get(*field).unwrap_or(0) == 0);
        if style != ResolverStyle::Smart || !rest_is_zero {
            return false;
        }
    }

    let clock_hour = fields.get(Field::ClockHourOfDay).map(|h| h % 24);
    if let (Some(hour), Some(clock_hour)) = (hour, clock_hour) {
        if hour % 24 != clock_hour {
            return false;
        }
    }

    let hour_of_day = hour.or(clock_hour).map(|h| h % 24);
    let hour_of_am_pm = fields
        .get(Field::HourOfAmPm)
        .or_else(|| fields.get(Field::ClockHourOfAmPm).map(|h| h % 12));
    let am_pm = fields.get(Field::AmPm);

    if let (Some(hour), Some(am_pm)) = (hour_of_day, am_pm) {
        if hour / 12 != am_pm {
            return false;
        }
    }
    if let (Some(hour), Some(hour_of_am_pm)) = (hour_of_day, hour_of_am_pm) {
        if hour % 12 != hour_of_am_pm {
            return false;
        }
    }
    true
}

fn ymd(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        i32::try_from(year).ok()?,
        u32::try_from(month).ok()?,
        u32::try_from(day).ok()?,
    )
}

fn last_day_of_month(year: i64, month: i64) -> Option<i64> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let last = ymd(next_year, next_month, 1)?.pred_opt()?;
    Some(i64::from(last.day()))
}
