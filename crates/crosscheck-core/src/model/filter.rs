//! Tag selection by name, date range and count.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ParseError;
use crate::model::tag::{parse_local_date, Tag};

/// Selects and orders a subset of tags.
///
/// All criteria are optional; an empty filter accepts every tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Substring the tag name must contain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Inclusive lower date bound.
    #[serde(
        default,
        deserialize_with = "deserialize_local_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub from: Option<NaiveDate>,

    /// Inclusive upper date bound.
    #[serde(
        default,
        deserialize_with = "deserialize_local_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub to: Option<NaiveDate>,

    /// Maximum number of tags kept, counting from the most recent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_from(mut self, from: NaiveDate) -> Self {
        self.from = Some(from);
        self
    }

    pub fn with_to(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Build a filter from textual bounds, as given on a command line.
    pub fn parse(
        name: Option<String>,
        from: Option<&str>,
        to: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Self, ParseError> {
        Ok(Self {
            name,
            from: from.map(parse_local_date).transpose()?,
            to: to.map(parse_local_date).transpose()?,
            limit,
        })
    }

    /// Whether `tag` matches the name and falls within `[from, to]`.
    ///
    /// Undated tags count as infinitely recent: any `to` bound excludes them.
    pub fn contains(&self, tag: &Tag) -> bool {
        if let Some(name) = &self.name {
            if !tag.name().contains(name.as_str()) {
                return false;
            }
        }

        let date = tag.effective_date();
        self.from.is_none_or(|from| from <= date) && self.to.is_none_or(|to| date <= to)
    }

    /// Select matching tags from a newest-first sequence.
    ///
    /// Keeps at most `limit` of the most recent matches and returns them
    /// oldest-first.
    pub fn apply(&self, tags: &[Tag]) -> Vec<Tag> {
        let limit = self.limit.unwrap_or(usize::MAX);
        let mut selected: Vec<Tag> = tags
            .iter()
            .filter(|tag| self.contains(tag))
            .take(limit)
            .cloned()
            .collect();
        selected.reverse();
        selected
    }
}

fn deserialize_local_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|text| parse_local_date(&text).map_err(serde::de::Error::custom))
        .transpose()
}
