//! Cadence Core
//!
//! Platform-agnostic media item types and catalog intake for Cadence.
//!
//! This crate provides the building blocks shared by the playback controller,
//! the backend adapters and the applications.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `MediaItem`, `MediaType`, `ItemId`
//! - **Catalog Intake**: `CatalogRecord` and the playability filter that turns
//!   catalog listings into queue-ready items
//! - **Error Handling**: `CoreError` and `Result`
//!
//! # Example
//!
//! ```rust
//! use cadence_core::{playable_items, CatalogRecord, MediaType};
//!
//! let records: Vec<CatalogRecord> = serde_json::from_str(r#"[
//!     {"id": "a", "title": "Intro", "mediaType": "audio", "mediaUrl": "https://cdn.example.com/a.mp3"},
//!     {"id": "b", "title": "Teaser", "mediaType": "video"}
//! ]"#).unwrap();
//!
//! // Record "b" has no media URL and is dropped
//! let items = playable_items(records);
//! assert_eq!(items.len(), 1);
//! assert_eq!(items[0].media_type, MediaType::Audio);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod error;
pub mod types;

pub use catalog::{playable_items, playable_items_from_json, CatalogRecord};
pub use error::{CoreError, Result};
pub use types::{ItemId, MediaItem, MediaType};
