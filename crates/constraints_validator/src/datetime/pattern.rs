//! Pattern compilation and the pieces both parser families share.
//!
//! A pattern is a sequence of letter runs (fields) and literal text. Text in
//! single quotes is literal, `''` is a single quote. What a letter run means
//! depends on the parser family.

use super::legacy::LegacyPattern;
use super::structured::StructuredPattern;
use chrono::{Duration, NaiveDate};
use constraints_core::ResolverStyle;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// A pattern that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct PatternError {
    reason: String,
}

impl PatternError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// One element of a tokenized pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternToken {
    /// A run of `count` identical pattern letters
    Field { letter: char, count: usize },
    /// Text matched as is
    Literal(String),
}

impl PatternToken {
    pub(crate) fn is_numeric_field(&self, numeric: impl Fn(char, usize) -> bool) -> bool {
        matches!(self, PatternToken::Field { letter, count } if numeric(*letter, *count))
    }
}

/// Splits a pattern into fields and literals.
///
/// `reserved` characters are rejected outside quotes.
pub(crate) fn tokenize_pattern(
    pattern: &str,
    reserved: &[char],
) -> Result<Vec<PatternToken>, PatternError> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if chars.next_if_eq(&'\'').is_some() {
                    literal.push('\'');
                    continue;
                }
                loop {
                    match chars.next() {
                        Some('\'') if chars.next_if_eq(&'\'').is_some() => literal.push('\''),
                        Some('\'') => break,
                        Some(quoted) => literal.push(quoted),
                        None => return Err(PatternError::new("Unterminated quote")),
                    }
                }
            }
            c if c.is_ascii_alphabetic() => {
                let mut count = 1;
                while chars.next_if_eq(&c).is_some() {
                    count += 1;
                }
                if !literal.is_empty() {
                    tokens.push(PatternToken::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(PatternToken::Field { letter: c, count });
            }
            c if reserved.contains(&c) => {
                return Err(PatternError::new(format!("Pattern includes reserved character '{c}'")));
            }
            c => literal.push(c),
        }
    }

    if !literal.is_empty() {
        tokens.push(PatternToken::Literal(literal));
    }
    Ok(tokens)
}

/// Calendar and clock fields a pattern can set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Field {
    Era,
    Year,
    YearOfEra,
    WeekYear,
    Quarter,
    Month,
    WeekOfYear,
    WeekOfMonth,
    DayOfYear,
    DayOfMonth,
    DayOfWeekInMonth,
    DayOfWeek,
    AmPm,
    HourOfDay,
    ClockHourOfDay,
    HourOfAmPm,
    ClockHourOfAmPm,
    Minute,
    Second,
    Millisecond,
    NanoOfSecond,
    OffsetSeconds,
}

/// Field values collected while parsing one input.
#[derive(Debug, Default)]
pub(crate) struct ParsedFields {
    values: BTreeMap<Field, i64>,
}

impl ParsedFields {
    pub(crate) fn get(&self, field: Field) -> Option<i64> {
        self.values.get(&field).copied()
    }

    pub(crate) fn contains(&self, field: Field) -> bool {
        self.values.contains_key(&field)
    }

    /// Sets a field, the last value wins.
    pub(crate) fn replace(&mut self, field: Field, value: i64) {
        self.values.insert(field, value);
    }

    /// Sets a field, failing when it already holds a different value.
    pub(crate) fn set(&mut self, field: Field, value: i64) -> Option<()> {
        match self.values.insert(field, value) {
            Some(previous) if previous != value => None,
            _ => Some(()),
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (Field, i64)> + '_ {
        self.values.iter().map(|(field, value)| (*field, *value))
    }
}

pub(crate) const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub(crate) const MONTHS_SHORT: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Day names, Monday first.
pub(crate) const DAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub(crate) const DAYS_SHORT: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Cursor over the input of one parse call.
pub(crate) struct Scanner<'t> {
    text: &'t str,
    pos: usize,
}

impl<'t> Scanner<'t> {
    pub(crate) fn new(text: &'t str) -> Self {
        Self { text, pos: 0 }
    }

    pub(crate) fn rest(&self) -> &'t str {
        &self.text[self.pos..]
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    /// Consumes `expected` if the input continues with it.
    pub(crate) fn literal(&mut self, expected: &str, ignore_case: bool) -> bool {
        let rest = self.rest();
        let matched = match rest.get(..expected.len()) {
            Some(head) if ignore_case => head.eq_ignore_ascii_case(expected),
            Some(head) => head == expected,
            None => false,
        };
        if matched {
            self.pos += expected.len();
        }
        matched
    }

    /// Consumes an optional sign; returns -1 for `-`.
    pub(crate) fn sign(&mut self) -> Option<i64> {
        match self.peek() {
            Some('+') => {
                self.pos += 1;
                Some(1)
            }
            Some('-') => {
                self.pos += 1;
                Some(-1)
            }
            _ => None,
        }
    }

    /// Number of ASCII digits at the cursor.
    pub(crate) fn digit_run(&self) -> usize {
        self.rest().bytes().take_while(u8::is_ascii_digit).count()
    }

    /// Consumes between `min` and `max` digits, as many as available.
    pub(crate) fn digits(&mut self, min: usize, max: usize) -> Option<i64> {
        let width = self.digit_run().min(max);
        if width < min || width == 0 {
            return None;
        }
        let value = self.rest()[..width].parse::<i64>().ok()?;
        self.pos += width;
        Some(value)
    }

    /// Consumes the longest of `candidates`; returns its index.
    pub(crate) fn choice(&mut self, candidates: &[&str], ignore_case: bool) -> Option<usize> {
        let rest = self.rest();
        let (index, len) = candidates
            .iter()
            .enumerate()
            .filter(|(_, candidate)| match rest.get(..candidate.len()) {
                Some(head) if ignore_case => head.eq_ignore_ascii_case(candidate),
                Some(head) => head == **candidate,
                None => false,
            })
            .map(|(index, candidate)| (index, candidate.len()))
            .max_by_key(|(_, len)| *len)?;
        self.pos += len;
        Some(index)
    }
}

/// Date with overflowing months and days carried into the following units.
pub(crate) fn rolled_date(year: i64, month: i64, day: i64) -> Option<NaiveDate> {
    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let first = NaiveDate::from_ymd_opt(
        i32::try_from(months.div_euclid(12)).ok()?,
        u32::try_from(months.rem_euclid(12) + 1).ok()?,
        1,
    )?;
    first.checked_add_signed(Duration::try_days(day.checked_sub(1)?)?)
}

#[derive(Debug, Clone)]
enum Parser {
    Legacy(LegacyPattern),
    Structured(StructuredPattern),
}

/// A date/time pattern compiled for one parser family.
///
/// Compiled patterns are immutable; each [`matches`](Self::matches) call
/// keeps its parse state on the stack, so one pattern can be shared between
/// threads.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    parser: Parser,
}

impl CompiledPattern {
    /// Compiles a calendar-style pattern. `lenient` lets out-of-range
    /// components roll over instead of failing.
    pub fn legacy(pattern: &str, lenient: bool) -> Result<Self, PatternError> {
        Ok(Self {
            source: pattern.to_string(),
            parser: Parser::Legacy(LegacyPattern::compile(pattern, lenient)?),
        })
    }

    /// Compiles a strict-format pattern resolved with `style`.
    pub fn structured(pattern: &str, style: ResolverStyle) -> Result<Self, PatternError> {
        Ok(Self {
            source: pattern.to_string(),
            parser: Parser::Structured(StructuredPattern::compile(pattern, style)?),
        })
    }

    /// Returns the pattern text.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Returns true if `text` parses with this pattern.
    pub fn matches(&self, text: &str) -> bool {
        match &self.parser {
            Parser::Legacy(pattern) => pattern.matches(text),
            Parser::Structured(pattern) => pattern.matches(text),
        }
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
