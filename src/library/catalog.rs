//! Read-only catalog of saved content.
//!
//! Items are loaded once and never mutated. Moving an item between lists
//! only produces a [`MoveNotification`] for the caller to show.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use crate::domain::{ContentItem, ContentType, ItemStatus};
use crate::error::CatalogError;

/// Shown when a list has no items after filtering
pub const EMPTY_LIST_MESSAGE: &str = "No articles match the current filters.";

const SAMPLE_ITEMS: &str = include_str!("samples.json");

/// List ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recently added first
    #[default]
    Newest,
    Oldest,
    /// Title A-Z
    Title,
    /// Source A-Z, missing sources first
    Source,
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "newest" => Ok(SortOrder::Newest),
            "oldest" => Ok(SortOrder::Oldest),
            "title" => Ok(SortOrder::Title),
            "source" => Ok(SortOrder::Source),
            _ => anyhow::bail!("Unknown sort order: {}", s),
        }
    }
}

/// Case-insensitive comparison in the spirit of a locale collation
fn collate(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Filter and sort options for [`Catalog::list`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Only items in this list; `None` keeps all
    pub status: Option<ItemStatus>,
    /// Only items of this type; `None` keeps all
    pub content_type: Option<ContentType>,
    pub sort: SortOrder,
}

impl ListQuery {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: Option<ContentType>) -> Self {
        self.content_type = content_type;
        self
    }

    pub fn sorted_by(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    fn matches(&self, item: &ContentItem) -> bool {
        self.status.map_or(true, |s| item.status == s)
            && self.content_type.map_or(true, |t| item.content_type == t)
    }
}

/// Transient notice produced by a move request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveNotification {
    pub id: String,
    pub target: ItemStatus,
    pub title: &'static str,
    pub description: &'static str,
    /// The item was already in `target` when the move was requested
    pub already_there: bool,
}

/// Catalog of saved content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    items: Vec<ContentItem>,
}

impl Catalog {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    /// Built-in sample set
    pub fn sample() -> Result<Self> {
        Self::from_json(SAMPLE_ITEMS).context("Failed to parse built-in sample catalog")
    }

    /// Parse a JSON array of items
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<ContentItem> = serde_json::from_str(json)?;
        Ok(Self::new(items))
    }

    /// Load a JSON array of items from disk
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read catalog: {}", path.display()))?;

        let catalog = Self::from_json(&content)
            .with_context(|| format!("Failed to parse catalog JSON: {}", path.display()))?;

        info!(path = %path.display(), items = catalog.len(), "Loaded catalog");
        Ok(catalog)
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    /// Get an item by ID
    pub fn get(&self, id: &str) -> Option<&ContentItem> {
        self.items.iter().find(|i| i.id.as_str() == id)
    }

    /// Get an item by ID, failing when it does not exist
    pub fn find(&self, id: &str) -> Result<&ContentItem, CatalogError> {
        self.get(id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Filtered and sorted view
    pub fn list(&self, query: &ListQuery) -> Vec<&ContentItem> {
        let mut items: Vec<_> = self.items.iter().filter(|i| query.matches(i)).collect();

        match query.sort {
            SortOrder::Newest => items.sort_by(|a, b| b.added_at.cmp(&a.added_at)),
            SortOrder::Oldest => items.sort_by(|a, b| a.added_at.cmp(&b.added_at)),
            SortOrder::Title => items.sort_by(|a, b| collate(&a.title, &b.title)),
            SortOrder::Source => items.sort_by(|a, b| {
                collate(
                    a.source.as_deref().unwrap_or(""),
                    b.source.as_deref().unwrap_or(""),
                )
            }),
        }

        debug!(?query, results = items.len(), "Listed catalog");
        items
    }

    /// Most recently added items across all lists
    pub fn recent(&self, limit: usize) -> Vec<&ContentItem> {
        let mut items = self.list(&ListQuery::default());
        items.truncate(limit);
        items
    }

    /// Search items by query (case-insensitive substring match)
    pub fn search(&self, query: &str) -> Vec<&ContentItem> {
        let query_lower = query.to_lowercase();

        self.items
            .iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&query_lower)
                    || item
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&query_lower))
                    || item
                        .source
                        .as_deref()
                        .is_some_and(|s| s.to_lowercase().contains(&query_lower))
            })
            .collect()
    }

    /// Announce moving `id` into `target`. The catalog is not changed.
    ///
    /// Every request for a known item yields a notification, including a
    /// move to the list the item is already in.
    pub fn request_move(
        &self,
        id: &str,
        target: ItemStatus,
    ) -> Result<MoveNotification, CatalogError> {
        let item = self.find(id)?;
        let already_there = item.status == target;

        info!(id, from = %item.status, to = %target, already_there, "Move requested");
        Ok(MoveNotification {
            id: id.to_string(),
            target,
            title: target.move_title(),
            description: target.move_description(),
            already_there,
        })
    }

    /// Get the number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn item(id: &str, title: &str, day: u32, source: Option<&str>) -> ContentItem {
        let item = ContentItem::new(
            id,
            title,
            ContentType::Article,
            Utc.with_ymd_and_hms(2023, 10, day, 12, 0, 0).unwrap(),
        );
        match source {
            Some(source) => item.with_source(source),
            None => item,
        }
    }

    fn ids<'a>(items: &[&'a ContentItem]) -> Vec<&'a str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_sample_catalog_parses() {
        let catalog = Catalog::sample().unwrap();

        assert_eq!(catalog.len(), 13);
        let first = catalog.get("1").unwrap();
        assert_eq!(first.highlights.len(), 2);
        assert_eq!(
            catalog.get("pdf-1").unwrap().original_url.as_deref(),
            Some("https://arxiv.org/pdf/2212.14034.pdf")
        );
    }

    #[test]
    fn test_status_filter() {
        let catalog = Catalog::sample().unwrap();

        assert_eq!(catalog.list(&ListQuery::status(ItemStatus::Inbox)).len(), 6);
        assert_eq!(catalog.list(&ListQuery::status(ItemStatus::Later)).len(), 4);
        assert_eq!(catalog.list(&ListQuery::status(ItemStatus::Archive)).len(), 3);

        let inbox_pdfs = catalog.list(
            &ListQuery::status(ItemStatus::Inbox).with_content_type(Some(ContentType::Pdf)),
        );
        assert_eq!(ids(&inbox_pdfs), vec!["pdf-1"]);
    }

    #[test]
    fn test_sort_orders() {
        let catalog = Catalog::new(vec![
            item("a", "banana", 2, Some("Zeta")),
            item("b", "Apple", 3, None),
            item("c", "cherry", 1, Some("alpha")),
        ]);

        let newest = catalog.list(&ListQuery::default());
        assert_eq!(ids(&newest), vec!["b", "a", "c"]);

        let oldest = catalog.list(&ListQuery::default().sorted_by(SortOrder::Oldest));
        assert_eq!(ids(&oldest), vec!["c", "a", "b"]);

        let title = catalog.list(&ListQuery::default().sorted_by(SortOrder::Title));
        assert_eq!(ids(&title), vec!["b", "a", "c"]);

        // Missing source sorts as the empty string
        let source = catalog.list(&ListQuery::default().sorted_by(SortOrder::Source));
        assert_eq!(ids(&source), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_catalog_search() {
        let catalog = Catalog::sample().unwrap();

        let results = catalog.search("QUANTUM");
        assert_eq!(ids(&results), vec!["4"]);

        let by_source = catalog.search("finance academy");
        assert_eq!(ids(&by_source), vec!["pdf-3"]);

        assert!(catalog.search("no such thing").is_empty());
    }

    #[test]
    fn test_request_move_does_not_mutate() {
        let catalog = Catalog::sample().unwrap();

        let notice = catalog.request_move("1", ItemStatus::Archive).unwrap();
        assert_eq!(notice.title, "Moved to Archive");
        assert_eq!(
            notice.description,
            "This article has been moved to your archive."
        );
        assert_eq!(catalog.get("1").unwrap().status, ItemStatus::Inbox);

        let notice = catalog.request_move("1", ItemStatus::Later).unwrap();
        assert_eq!(notice.title, "Moved to Read Later");
    }

    #[test]
    fn test_request_move_unknown_item() {
        let catalog = Catalog::sample().unwrap();

        assert_eq!(
            catalog.request_move("missing", ItemStatus::Archive),
            Err(CatalogError::NotFound("missing".to_string()))
        );
    }

    #[test]
    fn test_request_move_to_current_list_still_notifies() {
        let catalog = Catalog::sample().unwrap();
        assert_eq!(catalog.get("4").unwrap().status, ItemStatus::Archive);

        let notice = catalog.request_move("4", ItemStatus::Archive).unwrap();
        assert_eq!(notice.title, "Moved to Archive");
        assert!(notice.already_there);
        assert!(!catalog.request_move("4", ItemStatus::Inbox).unwrap().already_there);
    }

    #[test]
    fn test_sort_order_from_str() {
        assert_eq!("Title".parse::<SortOrder>().unwrap(), SortOrder::Title);
        assert!("random".parse::<SortOrder>().is_err());
    }
}
