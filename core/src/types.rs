//! Client-facing types: list parameters, normalized entries, pages.
//!
//! # Design
//! Field names follow the JSON the browser client already consumes
//! (`image_url`, `count`/`next`/`previous`/`results`), so serde renames
//! live here rather than in the server. Upstream wire shapes are private to
//! `client` and never leak into these types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_OFFSET: u32 = 0;
pub const DEFAULT_LIMIT: u32 = 20;
pub const MIN_LIMIT: u32 = 1;
pub const MAX_LIMIT: u32 = 100;

/// Requested list ordering. Only ascending orders exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    ByName,
    ByIdentifier,
    #[default]
    Unspecified,
}

impl SortKey {
    /// Lenient parse: unknown values fall back to `Unspecified`, which orders
    /// by identifier.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("name") => SortKey::ByName,
            Some("identifier" | "id" | "number") => SortKey::ByIdentifier,
            _ => SortKey::Unspecified,
        }
    }
}

/// Parameters for one list request. Built per request and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    offset: u32,
    limit: u32,
    search: Option<String>,
    sort: SortKey,
}

impl ListQuery {
    /// Clamps `limit` to `[MIN_LIMIT, MAX_LIMIT]` and drops a blank search.
    pub fn new(offset: u32, limit: u32, search: Option<&str>, sort: SortKey) -> Self {
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Self {
            offset,
            limit: limit.clamp(MIN_LIMIT, MAX_LIMIT),
            search,
            sort,
        }
    }

    /// Validate raw inbound parameters. Blank values take their defaults;
    /// `offset` must be a non-negative integer; `limit` must be an integer
    /// and is then clamped.
    pub fn from_params(
        offset: Option<&str>,
        limit: Option<&str>,
        search: Option<&str>,
        sort_by: Option<&str>,
    ) -> Result<Self, ApiError> {
        let offset = match non_blank(offset) {
            None => DEFAULT_OFFSET,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                ApiError::InvalidParameter(format!(
                    "offset must be a non-negative integer, got {raw:?}"
                ))
            })?,
        };
        let limit = match non_blank(limit) {
            None => DEFAULT_LIMIT,
            Some(raw) => {
                let parsed = raw.parse::<i64>().map_err(|_| {
                    ApiError::InvalidParameter(format!("limit must be an integer, got {raw:?}"))
                })?;
                parsed.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as u32
            }
        };
        Ok(Self::new(offset, limit, search, SortKey::parse(sort_by)))
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(DEFAULT_OFFSET, DEFAULT_LIMIT, None, SortKey::Unspecified)
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Opaque pagination link: the offset/limit pair of an adjacent page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub offset: u32,
    pub limit: u32,
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset={}&limit={}", self.offset, self.limit)
    }
}

impl FromStr for Cursor {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ApiError::InvalidParameter(format!("malformed cursor: {s:?}"));
        let mut offset = None;
        let mut limit = None;
        for pair in s.trim_start_matches('?').split('&') {
            let (key, value) = pair.split_once('=').ok_or_else(invalid)?;
            let value = value.parse::<u32>().map_err(|_| invalid())?;
            match key {
                "offset" => offset = Some(value),
                "limit" => limit = Some(value),
                _ => return Err(invalid()),
            }
        }
        Ok(Cursor {
            offset: offset.ok_or_else(invalid)?,
            limit: limit.ok_or_else(invalid)?,
        })
    }
}

impl Serialize for Cursor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One page of results plus links to its neighbours.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PagedResult<T> {
    #[serde(rename = "count")]
    pub total_count: u32,
    #[serde(rename = "next")]
    pub next_cursor: Option<Cursor>,
    #[serde(rename = "previous")]
    pub previous_cursor: Option<Cursor>,
    #[serde(rename = "results")]
    pub items: Vec<T>,
}

/// A catalog entry as shown in the list view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntrySummary {
    pub id: u32,
    pub name: String,
    /// Public dex number; always equal to `id`.
    pub number: u32,
    pub image_url: String,
}

/// A catalog entry as shown in the detail view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntryDetail {
    pub id: u32,
    pub name: String,
    pub number: u32,
    pub image_url: String,
    pub height: u32,
    pub weight: u32,
    pub base_experience: Option<u32>,
    pub types: Vec<String>,
    pub abilities: Vec<Ability>,
    pub moves: Vec<Move>,
    pub forms: Vec<Form>,
    /// Display order downstream; kept exactly as the upstream lists them.
    pub stats: Vec<Stat>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ability {
    pub name: String,
    pub is_hidden: bool,
    pub slot: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Move {
    pub name: String,
    pub version_group_details: Vec<VersionGroupDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersionGroupDetail {
    pub level_learned_at: u32,
    pub move_learn_method: String,
    pub version_group: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Form {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stat {
    pub name: String,
    pub base_stat: u32,
    pub effort: u32,
}
