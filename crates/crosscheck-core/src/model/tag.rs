//! VCS tags and the date parsing they share with filters.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

const SEPARATOR: char = '/';
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A named, optionally dated point in a project's history.
///
/// The canonical text form is `<date-or-empty>/<name>`, which is also what
/// `git for-each-ref --format='%(creatordate:short)/%(refname:lstrip=2)'` prints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    date: Option<NaiveDate>,
    name: String,
}

impl Tag {
    /// Sentinel for "not a VCS tag", e.g. a locally checked-out working copy.
    pub const NONE: Tag = Tag {
        date: None,
        name: String::new(),
    };

    /// Only the undated sentinel may have an empty name.
    pub fn new(date: Option<NaiveDate>, name: impl Into<String>) -> Result<Self, ParseError> {
        let tag = Self {
            date,
            name: name.into(),
        };
        if tag.name.is_empty() && tag.date.is_some() {
            return Err(ParseError::EmptyName {
                text: tag.to_string(),
            });
        }
        Ok(tag)
    }

    /// Parse the canonical `<date-or-empty>/<name>` form.
    ///
    /// Splits on the first `/`, so tag names may contain further slashes.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let (date, name) =
            text.split_once(SEPARATOR)
                .ok_or_else(|| ParseError::MissingSeparator {
                    text: text.to_string(),
                })?;

        let date = if date.is_empty() {
            None
        } else {
            Some(parse_iso_date(date)?)
        };

        Self::new(date, name)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is the [`Tag::NONE`] sentinel.
    pub fn is_none(&self) -> bool {
        self.name.is_empty() && self.date.is_none()
    }

    /// Copy with the date cleared, for comparing tags regardless of provenance.
    pub fn without_date(&self) -> Self {
        Self {
            date: None,
            name: self.name.clone(),
        }
    }

    /// Date used for range checks; undated tags sort as far in the future.
    pub fn effective_date(&self) -> NaiveDate {
        self.date.unwrap_or(NaiveDate::MAX)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.date {
            Some(date) => write!(f, "{}{}{}", date.format(DATE_FORMAT), SEPARATOR, self.name),
            None => write!(f, "{}{}", SEPARATOR, self.name),
        }
    }
}

impl FromStr for Tag {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::parse(s)
    }
}

impl TryFrom<String> for Tag {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Tag::parse(&s)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

/// Strict `YYYY-MM-DD`, rejecting anything that would not print back identically.
fn parse_iso_date(text: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .filter(|date| date.format(DATE_FORMAT).to_string() == text)
        .ok_or_else(|| ParseError::InvalidDate {
            text: text.to_string(),
        })
}

/// Parse a year, year-month or full date, trying the coarsest form first.
///
/// A year maps to January 1st and a year-month to the first of that month.
pub fn parse_local_date(text: &str) -> Result<NaiveDate, ParseError> {
    let invalid = || ParseError::InvalidDate {
        text: text.to_string(),
    };
    let text = text.trim();

    if let Some(year) = parse_year(text) {
        return NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid);
    }

    if let Some((year, month)) = text.split_once('-') {
        if let (Some(year), Some(month)) = (parse_year(year), parse_month(month)) {
            return NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid);
        }
    }

    parse_iso_date(text).map_err(|_| invalid())
}

fn parse_year(text: &str) -> Option<i32> {
    if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok()
    } else {
        None
    }
}

fn parse_month(text: &str) -> Option<u32> {
    if text.len() == 2 && text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse().ok().filter(|m| (1..=12).contains(m))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_dated_tag() {
        let tag = Tag::parse("2024-05-01/v1.2.0").unwrap();
        assert_eq!(tag.date(), Some(date(2024, 5, 1)));
        assert_eq!(tag.name(), "v1.2.0");
    }

    #[test]
    fn test_parse_undated_tag() {
        let tag = Tag::parse("/v1.2.0").unwrap();
        assert_eq!(tag.date(), None);
        assert_eq!(tag.name(), "v1.2.0");
    }

    #[test]
    fn test_parse_splits_on_first_separator() {
        let tag = Tag::parse("2024-05-01/release/1.0").unwrap();
        assert_eq!(tag.name(), "release/1.0");
    }

    #[test]
    fn test_missing_separator_is_an_error() {
        let err = Tag::parse("v1.2.0").unwrap_err();
        assert!(matches!(err, ParseError::MissingSeparator { .. }));
    }

    #[test]
    fn test_dated_tag_without_name_is_an_error() {
        let err = Tag::parse("2024-01-01/").unwrap_err();
        assert!(matches!(err, ParseError::EmptyName { .. }));
        assert!(Tag::new(NaiveDate::from_ymd_opt(2024, 1, 1), "").is_err());
        assert_eq!(Tag::parse("/").unwrap(), Tag::NONE);
        assert_eq!(Tag::new(None, "").unwrap(), Tag::NONE);
    }

    #[test]
    fn test_bad_date_is_an_error() {
        assert!(matches!(
            Tag::parse("2024-13-01/v1").unwrap_err(),
            ParseError::InvalidDate { .. }
        ));
        assert!(matches!(
            Tag::parse("2024-5-1/v1").unwrap_err(),
            ParseError::InvalidDate { .. }
        ));
    }

    #[test]
    fn test_round_trip() {
        for text in ["2024-05-01/v1.2.0", "/v1.2.0", "/", "1999-12-31/a/b/c"] {
            assert_eq!(Tag::parse(text).unwrap().to_string(), text);
        }
    }

    #[test]
    fn test_none_sentinel() {
        assert!(Tag::NONE.is_none());
        assert_eq!(Tag::NONE.to_string(), "/");
        assert_eq!(Tag::parse("/").unwrap(), Tag::NONE);
        assert!(!Tag::parse("/v1").unwrap().is_none());
    }

    #[test]
    fn test_without_date() {
        let tag = Tag::parse("2024-05-01/v1").unwrap();
        assert_eq!(tag.without_date(), Tag::parse("/v1").unwrap());
    }

    #[test]
    fn test_effective_date_of_undated_tag_is_max() {
        assert_eq!(Tag::parse("/HEAD").unwrap().effective_date(), NaiveDate::MAX);
    }

    #[test]
    fn test_serde_uses_canonical_form() {
        let tag = Tag::parse("2024-05-01/v1").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"2024-05-01/v1\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
        assert!(serde_json::from_str::<Tag>("\"v1\"").is_err());
    }

    #[test]
    fn test_parse_local_date_granularities() {
        assert_eq!(parse_local_date("2023").unwrap(), date(2023, 1, 1));
        assert_eq!(parse_local_date("2023-07").unwrap(), date(2023, 7, 1));
        assert_eq!(parse_local_date("2023-07-14").unwrap(), date(2023, 7, 14));
    }

    #[test]
    fn test_parse_local_date_rejects_garbage() {
        for text in ["", "23", "2023-7", "2023-13", "2023-02-30", "yesterday"] {
            assert!(parse_local_date(text).is_err(), "accepted {text:?}");
        }
    }
}
