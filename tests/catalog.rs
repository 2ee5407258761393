//! Catalog Integration Tests
//!
//! Tests for loading a catalog from disk and querying it.

use std::io::Write;

use tempfile::NamedTempFile;

use shelf::library::EMPTY_LIST_MESSAGE;
use shelf::{Catalog, CatalogError, ContentType, ItemStatus, ListQuery, SortOrder};

const ITEMS: &str = r#"[
  {
    "id": "a1",
    "title": "Zebra Patterns",
    "contentType": "article",
    "content": "<p>Stripes</p>",
    "source": "Nature Weekly",
    "addedAt": "2024-01-03T08:00:00Z",
    "status": "inbox"
  },
  {
    "id": "p1",
    "title": "attention Is All You Need",
    "contentType": "pdf",
    "originalUrl": "https://arxiv.org/pdf/1706.03762.pdf",
    "addedAt": "2024-01-01T08:00:00Z",
    "status": "later",
    "highlights": [
      {
        "id": "h1",
        "text": "multi-head attention",
        "position": "page-3",
        "createdAt": "2024-01-02T10:00:00Z"
      }
    ]
  },
  {
    "id": "v1",
    "title": "Conference Talk",
    "contentType": "video",
    "originalUrl": "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "addedAt": "2024-01-02T08:00:00Z",
    "status": "inbox"
  }
]"#;

fn write_catalog() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(ITEMS.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_catalog_from_file() {
    let file = write_catalog();
    let catalog = Catalog::from_json_file(file.path()).await.unwrap();

    assert_eq!(catalog.len(), 3);
    let pdf = catalog.get("p1").unwrap();
    assert_eq!(pdf.content_type, ContentType::Pdf);
    assert_eq!(pdf.highlights[0].position.as_str(), "page-3");
    assert!(pdf.content.is_empty());
}

#[tokio::test]
async fn test_missing_catalog_file_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = Catalog::from_json_file(&dir.path().join("none.json")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_lists_filter_and_sort() {
    let file = write_catalog();
    let catalog = Catalog::from_json_file(file.path()).await.unwrap();

    let inbox: Vec<&str> = catalog
        .list(&ListQuery::status(ItemStatus::Inbox))
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(inbox, vec!["a1", "v1"]);

    let by_title: Vec<&str> = catalog
        .list(&ListQuery::default().sorted_by(SortOrder::Title))
        .iter()
        .map(|i| i.id.as_str())
        .collect();
    assert_eq!(by_title, vec!["p1", "v1", "a1"]);

    let archived_videos = catalog.list(
        &ListQuery::status(ItemStatus::Archive).with_content_type(Some(ContentType::Video)),
    );
    assert!(archived_videos.is_empty());
    assert_eq!(EMPTY_LIST_MESSAGE, "No articles match the current filters.");

    let recent: Vec<&str> = catalog.recent(2).iter().map(|i| i.id.as_str()).collect();
    assert_eq!(recent, vec!["a1", "v1"]);
}

#[tokio::test]
async fn test_move_requests_leave_catalog_unchanged() {
    let file = write_catalog();
    let catalog = Catalog::from_json_file(file.path()).await.unwrap();

    let notice = catalog.request_move("p1", ItemStatus::Inbox).unwrap();
    assert_eq!(notice.target, ItemStatus::Inbox);
    assert_eq!(catalog.get("p1").unwrap().status, ItemStatus::Later);

    assert!(!notice.already_there);

    let repeat = catalog.request_move("v1", ItemStatus::Inbox).unwrap();
    assert_eq!(repeat.title, "Moved to Inbox");
    assert!(repeat.already_there);
    assert_eq!(catalog.get("v1").unwrap().status, ItemStatus::Inbox);

    assert_eq!(
        catalog.request_move("zz", ItemStatus::Inbox),
        Err(CatalogError::NotFound("zz".to_string()))
    );
}
