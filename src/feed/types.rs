use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

// ============================================================================
// Wire Format
// ============================================================================

/// One page of the directory search API.
///
/// `items` is required: a payload without it is a shape error, not an
/// empty page.
#[derive(Debug, Deserialize)]
pub struct ApiResponse {
    pub items: Vec<ApiItem>,
    #[serde(default)]
    pub metadata: ApiMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiMetadata {
    /// Total number of items matching the query.
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ApiItem {
    pub item: ApiEntry,
    #[serde(default)]
    pub tags: Vec<ApiTag>,
}

#[derive(Debug, Deserialize)]
pub struct ApiEntry {
    pub id: String,
    #[serde(rename = "additionalFields", default)]
    pub additional_fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTag {
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// Domain Types
// ============================================================================

/// A feed item ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    /// Upstream identifier; the deduplication key.
    pub external_id: String,
    pub title: String,
    pub body: String,
    pub url: String,
    /// `None` when the upstream value is missing or not RFC 3339.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Tag names exactly as received (case-sensitive), deduplicated.
    pub tags: BTreeSet<String>,
}

/// One fetched page of records, in feed order.
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    pub records: Vec<FeedRecord>,
    /// Total item count reported by the API, if any.
    pub total: Option<u64>,
}

impl From<ApiResponse> for FeedPage {
    fn from(response: ApiResponse) -> Self {
        FeedPage {
            records: response.items.into_iter().map(FeedRecord::from).collect(),
            total: response.metadata.count,
        }
    }
}

impl From<ApiItem> for FeedRecord {
    fn from(api: ApiItem) -> Self {
        let fields = &api.item.additional_fields;
        let tags = api
            .tags
            .into_iter()
            .filter_map(|tag| {
                if tag.name.trim().is_empty() {
                    tracing::debug!(external_id = %api.item.id, "Dropping blank tag name");
                    None
                } else {
                    Some(tag.name)
                }
            })
            .collect();

        FeedRecord {
            title: string_field(fields, "headline"),
            body: string_field(fields, "postBody"),
            url: string_field(fields, "headlineUrl"),
            source_timestamp: parse_source_timestamp(&string_field(fields, "postDateTime")),
            tags,
            external_id: api.item.id,
        }
    }
}

/// String value of an additional field; missing or non-string values are empty.
fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

/// Parses an RFC 3339 timestamp; empty or invalid input yields `None`.
pub fn parse_source_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(value = %raw, error = %e, "Unparseable postDateTime, storing without timestamp");
            None
        }
    }
}
