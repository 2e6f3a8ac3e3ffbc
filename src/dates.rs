use std::fmt;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::FormatError;

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").expect("bracket pattern is valid"));

const OFFSET_SPECIFIERS: [&str; 5] = ["%z", "%:z", "%::z", "%:::z", "%#z"];

/// Wall-clock time as written in the log, with the UTC offset when the line
/// carried one. Dates and hours are taken from the wall clock, not from UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl Timestamp {
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    pub fn zoned(at: DateTime<FixedOffset>) -> Self {
        Self {
            local: at.naive_local(),
            offset: Some(*at.offset()),
        }
    }

    pub fn local(&self) -> NaiveDateTime {
        self.local
    }

    pub fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    pub fn date(&self) -> NaiveDate {
        self.local.date()
    }

    pub fn hour(&self) -> u32 {
        self.local.hour()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{} {}", self.local, offset),
            None => write!(f, "{}", self.local),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single strftime-style pattern, validated on construction.
///
/// The strptime idiom `.%f` (dot + microseconds) is rewritten to chrono's
/// `%.f`, which accepts any fractional precision up to nanoseconds. chrono
/// treats that fraction as optional, so text that also parses without it is
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    pattern: String,
    compiled: String,
    whole_seconds: Option<String>,
    zoned: bool,
}

impl DateFormat {
    pub fn new(pattern: &str) -> Result<Self, FormatError> {
        let pattern = pattern.trim();
        let compiled = pattern.replace(".%f", "%.f");

        if compiled.is_empty()
            || StrftimeItems::new(&compiled).any(|item| matches!(item, Item::Error))
        {
            return Err(FormatError::InvalidPattern {
                pattern: pattern.to_string(),
            });
        }

        let zoned = OFFSET_SPECIFIERS.iter().any(|s| compiled.contains(s));
        let whole_seconds = compiled
            .contains("%.f")
            .then(|| compiled.replace("%.f", ""));
        Ok(Self {
            pattern: pattern.to_string(),
            compiled,
            whole_seconds,
            zoned,
        })
    }

    /// The pattern as it was written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_zoned(&self) -> bool {
        self.zoned
    }

    pub fn parse(&self, text: &str) -> Option<Timestamp> {
        let text = text.trim();
        let parsed = self.parse_with(text, &self.compiled)?;

        match &self.whole_seconds {
            Some(whole) if self.parse_with(text, whole).is_some() => None,
            _ => Some(parsed),
        }
    }

    fn parse_with(&self, text: &str, pattern: &str) -> Option<Timestamp> {
        if self.zoned {
            return DateTime::parse_from_str(text, pattern)
                .ok()
                .map(Timestamp::zoned);
        }

        NaiveDateTime::parse_from_str(text, pattern)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(text, pattern)
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .map(Timestamp::naive)
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern)
    }
}

/// Ordered candidate formats. The first one that parses a bracketed part of
/// the line wins, so the most specific formats belong first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateFormatSpec {
    formats: Vec<DateFormat>,
}

impl DateFormatSpec {
    pub fn new(formats: Vec<DateFormat>) -> Self {
        Self { formats }
    }

    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, FormatError> {
        patterns
            .iter()
            .map(|p| DateFormat::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }

    pub fn push(&mut self, format: DateFormat) {
        self.formats.push(format);
    }

    pub fn formats(&self) -> &[DateFormat] {
        &self.formats
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    pub fn resolve(&self, line: &str) -> Option<Timestamp> {
        resolve(line, &self.formats)
    }
}

/// Finds the timestamp embedded in `line` between square brackets.
pub fn resolve(line: &str, formats: &[DateFormat]) -> Option<Timestamp> {
    let candidates: Vec<&str> = BRACKETED
        .captures_iter(line)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    if candidates.is_empty() {
        return None;
    }

    formats
        .iter()
        .find_map(|format| candidates.iter().find_map(|text| format.parse(text)))
}
