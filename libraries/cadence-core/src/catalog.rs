//! Catalog intake
//!
//! The catalog service lists records that may or may not be playable. Only
//! records carrying an absolute, parseable media URL become [`MediaItem`]s;
//! everything else is dropped before it can reach a queue.
//!
//! Access gating is not done here. `isLocked` is carried through as an
//! advisory flag and callers decide whether a locked item may be queued.

use crate::error::{CoreError, Result};
use crate::types::{ItemId, MediaItem, MediaType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

/// A record as listed by the catalog service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub artist_name: Option<String>,

    /// Raw media type string (`"audio"` / `"video"`)
    pub media_type: String,

    #[serde(default)]
    pub artwork_url: Option<String>,

    #[serde(default)]
    pub media_url: Option<String>,

    #[serde(default)]
    pub is_locked: Option<bool>,
}

/// Parse a media URL, rejecting blank and relative values
fn resolve_media_url(id: &str, raw: Option<&str>) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::not_playable(id, "missing media URL"))?;

    Url::parse(raw).map_err(|e| CoreError::not_playable(id, format!("bad media URL: {}", e)))
}

impl TryFrom<CatalogRecord> for MediaItem {
    type Error = CoreError;

    fn try_from(record: CatalogRecord) -> Result<Self> {
        if record.id.trim().is_empty() {
            return Err(CoreError::invalid_input("record without id"));
        }

        let media_type: MediaType = record.media_type.parse()?;
        let url = resolve_media_url(&record.id, record.media_url.as_deref())?;

        Ok(MediaItem {
            id: ItemId::new(record.id),
            title: record.title,
            artist_name: record.artist_name,
            media_type,
            artwork_url: record.artwork_url,
            media_url: url.to_string(),
            is_locked: record.is_locked.unwrap_or(false),
        })
    }
}

/// Convert catalog records into queue-ready items
///
/// Drops records that are not playable and repeated ids (first occurrence
/// wins). Listing order is preserved.
pub fn playable_items(records: impl IntoIterator<Item = CatalogRecord>) -> Vec<MediaItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for record in records {
        let id = record.id.clone();
        match MediaItem::try_from(record) {
            Ok(item) => {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                } else {
                    debug!(item_id = %id, "Dropping duplicate catalog record");
                }
            }
            Err(e) => debug!(item_id = %id, error = %e, "Dropping unplayable catalog record"),
        }
    }

    items
}

/// Parse a catalog listing (JSON array of records) into playable items
pub fn playable_items_from_json(json: &str) -> Result<Vec<MediaItem>> {
    let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
    Ok(playable_items(records))
}
