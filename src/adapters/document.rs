//! Paginated document engines.
//!
//! An engine loads a document by URL and renders single pages at a given
//! scale and rotation. Pages are 1-indexed. Two engines ship with the crate:
//! an in-memory engine for fixtures and tests, and an HTTP engine that
//! fetches real PDF files and reads their structure.

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::OnceCell;
use tracing::debug;

use super::pdf_scan::{self, ScannedDocument};
use crate::error::ViewerError;

/// Sparse metadata reported by the engine.
///
/// Every field is optional; an absent field is simply `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub keywords: Option<String>,
    pub creation_date: Option<NaiveDate>,
}

impl DocumentMetadata {
    /// Labelled lines for the fields shown above the document
    pub fn display_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref title) = self.title {
            lines.push(format!("Title: {}", title));
        }
        if let Some(ref author) = self.author {
            lines.push(format!("Author: {}", author));
        }
        if let Some(ref creator) = self.creator {
            lines.push(format!("Creator: {}", creator));
        }
        lines
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Page dimensions in PDF points (1/72 inch)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl Default for PageSize {
    /// US Letter
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
        }
    }
}

/// Result of a successful document load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub page_count: u32,
    pub metadata: DocumentMetadata,
}

/// What to render
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    /// 1-indexed page number
    pub page: u32,
    pub scale: f32,
    /// Clockwise rotation in degrees (0, 90, 180 or 270)
    pub rotation: u16,
}

/// Output of one page render
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    pub page: u32,
    /// Width in device pixels after scaling and rotation
    pub width: u32,
    /// Height in device pixels after scaling and rotation
    pub height: u32,
    pub scale: f32,
    pub rotation: u16,
    /// Text layer of the page, when the engine has one
    pub text: Option<String>,
}

impl RasterSurface {
    /// Lay out a surface for a page of `size` rendered with `params`
    pub fn layout(size: PageSize, params: RenderParams, text: Option<String>) -> Self {
        let width = (size.width * params.scale).round().max(1.0) as u32;
        let height = (size.height * params.scale).round().max(1.0) as u32;
        let (width, height) = if params.rotation == 90 || params.rotation == 270 {
            (height, width)
        } else {
            (width, height)
        };

        Self {
            page: params.page,
            width,
            height,
            scale: params.scale,
            rotation: params.rotation,
            text,
        }
    }
}

/// Trait for paginated document engines
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Human-readable engine name
    fn name(&self) -> &str;

    /// Load a document and report its page count and metadata
    async fn load(&self, url: &str) -> Result<LoadedDocument, ViewerError>;

    /// Render one page of a previously loaded document
    async fn render_page(&self, url: &str, params: RenderParams)
        -> Result<RasterSurface, ViewerError>;
}

/// A document held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDocument {
    pages: Vec<String>,
    metadata: DocumentMetadata,
    page_size: PageSize,
    broken_pages: HashSet<u32>,
    load_delay: Duration,
    render_delays: HashMap<u32, Duration>,
}

impl MemoryDocument {
    /// Create a document from the text of each page
    pub fn new(pages: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            pages: pages.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Create a document of `count` placeholder pages
    pub fn with_page_count(count: u32) -> Self {
        Self::new((1..=count).map(|n| format!("Page {}", n)))
    }

    pub fn with_metadata(mut self, metadata: DocumentMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Make rendering of `page` fail
    pub fn with_broken_page(mut self, page: u32) -> Self {
        self.broken_pages.insert(page);
        self
    }

    /// Delay every load by `delay`
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Delay renders of `page` by `delay`
    pub fn with_render_delay(mut self, page: u32, delay: Duration) -> Self {
        self.render_delays.insert(page, delay);
        self
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}

/// Engine serving pre-registered in-memory documents
#[derive(Debug, Default)]
pub struct MemoryDocumentEngine {
    documents: Mutex<HashMap<String, MemoryDocument>>,
}

impl MemoryDocumentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under `url`, replacing any previous one
    pub fn register(&self, url: impl Into<String>, document: MemoryDocument) {
        if let Ok(mut documents) = self.documents.lock() {
            documents.insert(url.into(), document);
        }
    }

    /// Builder-style variant of [`register`](Self::register)
    pub fn with_document(self, url: impl Into<String>, document: MemoryDocument) -> Self {
        self.register(url, document);
        self
    }

    fn get(&self, url: &str) -> Result<MemoryDocument, ViewerError> {
        let documents = self
            .documents
            .lock()
            .map_err(|_| ViewerError::load("document", "document registry poisoned"))?;

        documents
            .get(url)
            .cloned()
            .ok_or_else(|| ViewerError::load("document", format!("no document at {}", url)))
    }
}

#[async_trait]
impl DocumentEngine for MemoryDocumentEngine {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, url: &str) -> Result<LoadedDocument, ViewerError> {
        let document = self.get(url)?;

        if !document.load_delay.is_zero() {
            tokio::time::sleep(document.load_delay).await;
        }

        Ok(LoadedDocument {
            page_count: document.page_count(),
            metadata: document.metadata.clone(),
        })
    }

    async fn render_page(
        &self,
        url: &str,
        params: RenderParams,
    ) -> Result<RasterSurface, ViewerError> {
        let document = self.get(url)?;

        if let Some(delay) = document.render_delays.get(&params.page) {
            tokio::time::sleep(*delay).await;
        }

        if document.broken_pages.contains(&params.page) {
            return Err(ViewerError::render(params.page, "page content is damaged"));
        }

        let text = document
            .pages
            .get((params.page as usize).wrapping_sub(1))
            .cloned()
            .ok_or_else(|| ViewerError::render(params.page, "page out of range"))?;

        Ok(RasterSurface::layout(document.page_size, params, Some(text)))
    }
}

/// Documents kept by an [`HttpDocumentEngine`]
const MAX_CACHED_DOCUMENTS: usize = 16;

type DocumentCell = Arc<OnceCell<Arc<ScannedDocument>>>;

/// Per-URL load cells, oldest evicted first.
///
/// The map lock is only held to find or create a cell; loads run outside
/// it, so concurrent requests for the same URL share one load while other
/// URLs proceed independently. A failed load leaves its cell empty.
struct DocumentCache {
    capacity: usize,
    entries: Mutex<CacheEntries>,
}

#[derive(Default)]
struct CacheEntries {
    cells: HashMap<String, DocumentCell>,
    order: VecDeque<String>,
}

impl DocumentCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(CacheEntries::default()),
        }
    }

    fn cell(&self, url: &str) -> DocumentCell {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(cell) = entries.cells.get(url) {
            return Arc::clone(cell);
        }

        while entries.order.len() >= self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.cells.remove(&oldest);
                }
                None => break,
            }
        }

        let cell = DocumentCell::default();
        entries.cells.insert(url.to_string(), Arc::clone(&cell));
        entries.order.push_back(url.to_string());
        cell
    }

    async fn get_or_load<F, Fut>(
        &self,
        url: &str,
        load: F,
    ) -> Result<Arc<ScannedDocument>, ViewerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<ScannedDocument>, ViewerError>>,
    {
        let cell = self.cell(url);
        cell.get_or_try_init(load).await.map(Arc::clone)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.cells.len())
            .unwrap_or(0)
    }
}

/// Engine that fetches PDF files over HTTP (or from local paths) and reads
/// their page tree and document information dictionary.
pub struct HttpDocumentEngine {
    client: reqwest::Client,
    timeout: Duration,
    cache: DocumentCache,
}

impl Default for HttpDocumentEngine {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpDocumentEngine {
    /// Create an engine with a per-request timeout
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            cache: DocumentCache::new(MAX_CACHED_DOCUMENTS),
        }
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, ViewerError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self
                .client
                .get(url)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| ViewerError::load("document", e))?;

            let response = response
                .error_for_status()
                .map_err(|e| ViewerError::load("document", e))?;

            let bytes = response
                .bytes()
                .await
                .map_err(|e| ViewerError::load("document", e))?;

            Ok(bytes.to_vec())
        } else {
            let path = url.strip_prefix("file://").unwrap_or(url);
            tokio::fs::read(path)
                .await
                .map_err(|e| ViewerError::load("document", format!("{}: {}", path, e)))
        }
    }

    async fn scanned(&self, url: &str) -> Result<Arc<ScannedDocument>, ViewerError> {
        self.cache
            .get_or_load(url, || async move {
                let bytes = self.fetch_bytes(url).await?;
                debug!(url, bytes = bytes.len(), "Fetched document");

                let document =
                    pdf_scan::scan(&bytes).map_err(|e| ViewerError::load("document", e))?;
                Ok(Arc::new(document))
            })
            .await
    }
}

#[async_trait]
impl DocumentEngine for HttpDocumentEngine {
    fn name(&self) -> &str {
        "http"
    }

    async fn load(&self, url: &str) -> Result<LoadedDocument, ViewerError> {
        let document = self.scanned(url).await?;

        Ok(LoadedDocument {
            page_count: document.page_count(),
            metadata: document.metadata.clone(),
        })
    }

    async fn render_page(
        &self,
        url: &str,
        params: RenderParams,
    ) -> Result<RasterSurface, ViewerError> {
        let document = self
            .scanned(url)
            .await
            .map_err(|e| ViewerError::render(params.page, e))?;

        let size = document
            .page_size(params.page)
            .ok_or_else(|| ViewerError::render(params.page, "page out of range"))?;

        Ok(RasterSurface::layout(size, params, None))
    }
}
