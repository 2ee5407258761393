//! Saved content library.
//!
//! The library is a static, read-only set of content items. It ships with
//! a built-in sample set (`samples.json`) and can load an alternative set
//! from a JSON file with the same camelCase item format:
//!
//! ```text
//! [
//!   { "id": "1", "title": "...", "contentType": "article",
//!     "addedAt": "2023-10-15T10:30:00Z", "status": "inbox", ... }
//! ]
//! ```

pub mod catalog;

pub use catalog::{Catalog, ListQuery, MoveNotification, SortOrder, EMPTY_LIST_MESSAGE};
