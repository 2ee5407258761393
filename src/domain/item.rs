//! Saved content items.
//!
//! A content item is one saved article, PDF, newsletter or video together
//! with its lifecycle status. Field names serialize in camelCase so sample
//! sets exported by the web client load unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique item identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of content, which decides the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Web article (HTML body)
    Article,

    /// PDF document (body is empty, the document lives at `original_url`)
    Pdf,

    /// Email newsletter (HTML body)
    Newsletter,

    /// Embedded video
    Video,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Article => write!(f, "article"),
            ContentType::Pdf => write!(f, "pdf"),
            ContentType::Newsletter => write!(f, "newsletter"),
            ContentType::Video => write!(f, "video"),
        }
    }
}

impl std::str::FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "article" | "web" => Ok(ContentType::Article),
            "pdf" => Ok(ContentType::Pdf),
            "newsletter" => Ok(ContentType::Newsletter),
            "video" | "youtube" | "yt" => Ok(ContentType::Video),
            _ => anyhow::bail!("Unknown content type: {}", s),
        }
    }
}

/// Which list an item lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Inbox,
    Later,
    Archive,
}

impl ItemStatus {
    /// Title used when announcing a move into this list
    pub fn move_title(self) -> &'static str {
        match self {
            ItemStatus::Inbox => "Moved to Inbox",
            ItemStatus::Later => "Moved to Read Later",
            ItemStatus::Archive => "Moved to Archive",
        }
    }

    /// Longer description used when announcing a move into this list
    pub fn move_description(self) -> &'static str {
        match self {
            ItemStatus::Inbox => "This article has been moved back to your inbox.",
            ItemStatus::Later => "This article has been saved to your Read Later list.",
            ItemStatus::Archive => "This article has been moved to your archive.",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Inbox => write!(f, "inbox"),
            ItemStatus::Later => write!(f, "later"),
            ItemStatus::Archive => write!(f, "archive"),
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "inbox" => Ok(ItemStatus::Inbox),
            "later" | "read-later" | "read_later" => Ok(ItemStatus::Later),
            "archive" | "archived" => Ok(ItemStatus::Archive),
            _ => anyhow::bail!("Unknown status: {}", s),
        }
    }
}

/// Opaque location token of a highlight inside its item.
///
/// The addressing scheme belongs to whoever created the highlight; this
/// crate only stores and compares it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionToken(String);

impl PositionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A passage the reader marked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,

    /// Quoted text
    pub text: String,

    pub position: PositionToken,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// One saved piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: ItemId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// HTML payload (empty for PDFs)
    #[serde(default)]
    pub content: String,

    pub content_type: ContentType,

    /// Publication or channel name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,

    pub added_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Estimated reading or watching time in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,

    pub status: ItemStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<Highlight>,
}

impl ContentItem {
    /// Create a new item in the inbox
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content_type: ContentType,
        added_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ItemId::new(id),
            title: title.into(),
            description: None,
            content: String::new(),
            content_type,
            source: None,
            original_url: None,
            cover_image: None,
            added_at,
            published_at: None,
            reading_time: None,
            status: ItemStatus::Inbox,
            highlights: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_original_url(mut self, url: impl Into<String>) -> Self {
        self.original_url = Some(url.into());
        self
    }

    pub fn with_cover_image(mut self, url: impl Into<String>) -> Self {
        self.cover_image = Some(url.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    pub fn with_reading_time(mut self, minutes: u32) -> Self {
        self.reading_time = Some(minutes);
        self
    }

    pub fn with_status(mut self, status: ItemStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_highlight(mut self, highlight: Highlight) -> Self {
        self.highlights.push(highlight);
        self
    }
}
