//! Paged document viewer.
//!
//! [`PdfSurface`] owns the view state of one document (page, zoom,
//! rotation) and renders the current page through a [`DocumentEngine`].
//! State changes return a [`RenderJob`]; the job runs without borrowing the
//! surface and its outcome is handed back to [`PdfSurface::apply`]. Each job
//! carries the generation it was issued at, and only the outcome of the
//! latest generation is painted, so a slow render can never overwrite a
//! newer page.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::adapters::{DocumentEngine, DocumentMetadata, RasterSurface, RenderParams};
use crate::error::ViewerError;

/// Message shown while the document is loading
pub const LOADING_MESSAGE: &str = "Loading…";

/// File name offered when downloading a document
pub const DOWNLOAD_FILE_NAME: &str = "document.pdf";

/// Zoom factor stored in tenths, always within 0.5..=3.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZoomScale(u8);

impl ZoomScale {
    pub const MIN_TENTHS: u8 = 5;
    pub const MAX_TENTHS: u8 = 30;

    /// Nearest valid zoom for `scale`
    pub fn new(scale: f32) -> Self {
        let tenths = if scale.is_finite() {
            (scale * 10.0).round().clamp(Self::MIN_TENTHS as f32, Self::MAX_TENTHS as f32) as u8
        } else {
            10
        };
        Self(tenths)
    }

    pub fn value(self) -> f32 {
        f32::from(self.0) / 10.0
    }

    pub fn percent(self) -> u32 {
        u32::from(self.0) * 10
    }

    #[must_use]
    pub fn zoom_in(self) -> Self {
        Self((self.0 + 1).min(Self::MAX_TENTHS))
    }

    #[must_use]
    pub fn zoom_out(self) -> Self {
        Self(self.0.saturating_sub(1).max(Self::MIN_TENTHS))
    }

    pub fn is_min(self) -> bool {
        self.0 <= Self::MIN_TENTHS
    }

    pub fn is_max(self) -> bool {
        self.0 >= Self::MAX_TENTHS
    }
}

impl Default for ZoomScale {
    fn default() -> Self {
        Self(10)
    }
}

impl fmt::Display for ZoomScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Clockwise page rotation: 0, 90, 180 or 270 degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rotation(u16);

impl Rotation {
    pub fn degrees(self) -> u16 {
        self.0
    }

    /// Rotate a quarter turn clockwise, wrapping 270 to 0
    #[must_use]
    pub fn rotate_clockwise(self) -> Self {
        Self((self.0 + 90) % 360)
    }
}

/// Document lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum PdfPhase {
    /// Nothing loaded yet
    Idle,
    Loading,
    Ready,
    /// Load failed; the message is shown in place of the document
    Failed(String),
}

/// View state of one document
#[derive(Debug, Clone, PartialEq)]
pub struct PdfViewState {
    /// Current page, 1-indexed
    pub page: u32,
    pub page_count: u32,
    pub scale: ZoomScale,
    pub rotation: Rotation,
    pub phase: PdfPhase,
    pub metadata: DocumentMetadata,
    pub fullscreen: bool,
    /// Text of the page number input
    pub page_input: String,
}

impl PdfViewState {
    fn new(initial_page: u32) -> Self {
        Self {
            page: initial_page,
            page_count: 0,
            scale: ZoomScale::default(),
            rotation: Rotation::default(),
            phase: PdfPhase::Idle,
            metadata: DocumentMetadata::default(),
            fullscreen: false,
            page_input: initial_page.to_string(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, PdfPhase::Loading | PdfPhase::Idle)
    }

    pub fn is_loaded(&self) -> bool {
        self.phase == PdfPhase::Ready
    }

    pub fn can_go_back(&self) -> bool {
        self.is_loaded() && self.page > 1
    }

    pub fn can_go_forward(&self) -> bool {
        self.is_loaded() && self.page < self.page_count
    }

    /// `3 / 12` style page indicator
    pub fn page_label(&self) -> String {
        format!("{} / {}", self.page, self.page_count)
    }

    fn render_params(&self) -> RenderParams {
        RenderParams {
            page: self.page,
            scale: self.scale.value(),
            rotation: self.rotation.degrees(),
        }
    }
}

/// A file-save request for the original document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub file_name: String,
}

/// A render issued at one generation of the view state
pub struct RenderJob {
    generation: u64,
    url: String,
    params: RenderParams,
    engine: Arc<dyn DocumentEngine>,
}

impl fmt::Debug for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderJob")
            .field("generation", &self.generation)
            .field("url", &self.url)
            .field("params", &self.params)
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl RenderJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn params(&self) -> RenderParams {
        self.params
    }

    /// Render the page. Does not touch the surface that issued the job.
    pub async fn run(self) -> RenderOutcome {
        let result = self.engine.render_page(&self.url, self.params).await;
        RenderOutcome {
            generation: self.generation,
            params: self.params,
            result,
        }
    }
}

/// Completion of a [`RenderJob`]
#[derive(Debug, Clone)]
pub struct RenderOutcome {
    pub generation: u64,
    pub params: RenderParams,
    pub result: Result<RasterSurface, ViewerError>,
}

/// Parse the leading integer of user text, ignoring trailing junk
fn parse_page_number(text: &str) -> Option<i64> {
    let text = text.trim();
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|n| n * sign)
}

/// Viewer for one paged document
pub struct PdfSurface {
    engine: Arc<dyn DocumentEngine>,
    url: String,
    state: PdfViewState,
    generation: u64,
    surface: Option<RasterSurface>,
    last_render_error: Option<ViewerError>,
}

impl fmt::Debug for PdfSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfSurface")
            .field("url", &self.url)
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl PdfSurface {
    /// Create a viewer for `url` starting on page 1
    pub fn new(engine: Arc<dyn DocumentEngine>, url: impl Into<String>) -> Self {
        Self::with_initial_page(engine, url, 1)
    }

    /// Create a viewer that opens on `initial_page` once loaded.
    ///
    /// An initial page outside the document falls back to page 1.
    pub fn with_initial_page(
        engine: Arc<dyn DocumentEngine>,
        url: impl Into<String>,
        initial_page: u32,
    ) -> Self {
        Self {
            engine,
            url: url.into(),
            state: PdfViewState::new(initial_page.max(1)),
            generation: 0,
            surface: None,
            last_render_error: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &PdfViewState {
        &self.state
    }

    /// Most recently painted page, if any
    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    pub fn last_render_error(&self) -> Option<&ViewerError> {
        self.last_render_error.as_ref()
    }

    /// Generation of the newest issued render
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Text to show instead of the document, if any
    pub fn status_message(&self) -> Option<String> {
        match &self.state.phase {
            PdfPhase::Idle | PdfPhase::Loading => Some(LOADING_MESSAGE.to_string()),
            PdfPhase::Failed(message) => Some(message.clone()),
            PdfPhase::Ready => None,
        }
    }

    /// Load the document and paint the initial page.
    ///
    /// A failed load leaves the viewer in [`PdfPhase::Failed`].
    #[instrument(skip(self), fields(url = %self.url, engine = self.engine.name()))]
    pub async fn load(&mut self) -> Result<(), ViewerError> {
        self.state.phase = PdfPhase::Loading;
        self.surface = None;

        let loaded = match self.engine.load(&self.url).await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "Error loading document");
                self.state.phase = PdfPhase::Failed(e.to_string());
                return Err(e);
            }
        };

        if loaded.page_count == 0 {
            let e = ViewerError::load("document", "document has no pages");
            error!(error = %e, "Error loading document");
            self.state.phase = PdfPhase::Failed(e.to_string());
            return Err(e);
        }

        info!(pages = loaded.page_count, "Loaded document");

        self.state.page_count = loaded.page_count;
        self.state.metadata = loaded.metadata;
        if self.state.page > loaded.page_count {
            warn!(
                initial_page = self.state.page,
                "Initial page outside document, opening page 1"
            );
            self.state.page = 1;
        }
        self.state.phase = PdfPhase::Ready;

        let job = self.issue_render();
        self.render(job).await;
        Ok(())
    }

    fn issue_render(&mut self) -> RenderJob {
        self.generation += 1;
        RenderJob {
            generation: self.generation,
            url: self.url.clone(),
            params: self.state.render_params(),
            engine: Arc::clone(&self.engine),
        }
    }

    /// Run `job` and apply its outcome
    pub async fn render(&mut self, job: RenderJob) -> bool {
        let outcome = job.run().await;
        self.apply(outcome)
    }

    /// Apply a finished render. Returns `false` if it was superseded.
    pub fn apply(&mut self, outcome: RenderOutcome) -> bool {
        if outcome.generation != self.generation {
            debug!(
                stale = outcome.generation,
                latest = self.generation,
                "Discarding superseded render"
            );
            return false;
        }

        match outcome.result {
            Ok(surface) => {
                self.state.page_input = outcome.params.page.to_string();
                self.surface = Some(surface);
                self.last_render_error = None;
            }
            Err(e) => {
                error!(page = outcome.params.page, error = %e, "Error rendering page");
                self.last_render_error = Some(e);
            }
        }
        true
    }

    /// Go to page `n`; out-of-range pages are ignored
    pub fn go_to_page(&mut self, n: i64) -> Option<RenderJob> {
        if !self.state.is_loaded() || n < 1 || n > i64::from(self.state.page_count) {
            return None;
        }
        self.state.page = n as u32;
        Some(self.issue_render())
    }

    pub fn next_page(&mut self) -> Option<RenderJob> {
        self.go_to_page(i64::from(self.state.page) + 1)
    }

    pub fn previous_page(&mut self) -> Option<RenderJob> {
        self.go_to_page(i64::from(self.state.page) - 1)
    }

    /// Update the page number input without navigating
    pub fn set_page_input(&mut self, text: impl Into<String>) {
        self.state.page_input = text.into();
    }

    /// Navigate to the page typed into the page input
    pub fn submit_page_input(&mut self) -> Option<RenderJob> {
        let n = parse_page_number(&self.state.page_input)?;
        self.go_to_page(n)
    }

    pub fn zoom_in(&mut self) -> Option<RenderJob> {
        self.set_zoom(self.state.scale.zoom_in())
    }

    pub fn zoom_out(&mut self) -> Option<RenderJob> {
        self.set_zoom(self.state.scale.zoom_out())
    }

    /// Set the zoom directly, as the zoom slider does
    pub fn set_zoom(&mut self, scale: ZoomScale) -> Option<RenderJob> {
        if scale == self.state.scale {
            return None;
        }
        self.state.scale = scale;
        self.rerender()
    }

    pub fn rotate(&mut self) -> Option<RenderJob> {
        self.state.rotation = self.state.rotation.rotate_clockwise();
        self.rerender()
    }

    fn rerender(&mut self) -> Option<RenderJob> {
        self.state.is_loaded().then(|| self.issue_render())
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.state.fullscreen = !self.state.fullscreen;
        self.state.fullscreen
    }

    /// File-save request for the original document
    pub fn download(&self) -> DownloadRequest {
        DownloadRequest {
            url: self.url.clone(),
            file_name: DOWNLOAD_FILE_NAME.to_string(),
        }
    }

    /// Search the document text.
    ///
    /// Full-text search is not provided: a non-empty query on a loaded
    /// document reports [`ViewerError::Unimplemented`].
    pub fn search(&self, query: &str) -> Result<(), ViewerError> {
        if query.trim().is_empty() || !self.state.is_loaded() {
            return Ok(());
        }
        Err(ViewerError::Unimplemented(format!(
            "Search functionality for \"{}\" would be implemented here",
            query
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryDocument, MemoryDocumentEngine};

    const URL: &str = "mem://doc.pdf";

    async fn loaded(pages: u32) -> PdfSurface {
        let engine =
            MemoryDocumentEngine::new().with_document(URL, MemoryDocument::with_page_count(pages));
        let mut surface = PdfSurface::new(Arc::new(engine), URL);
        surface.load().await.unwrap();
        surface
    }

    #[test]
    fn test_zoom_scale_steps_and_clamps() {
        let mut scale = ZoomScale::default();
        assert_eq!(scale.value(), 1.0);

        for _ in 0..50 {
            scale = scale.zoom_in();
        }
        assert_eq!(scale.value(), 3.0);
        assert!(scale.is_max());

        for _ in 0..50 {
            scale = scale.zoom_out();
        }
        assert_eq!(scale.value(), 0.5);
        assert!(scale.is_min());

        assert_eq!(ZoomScale::new(1.26).to_string(), "130%");
        assert_eq!(ZoomScale::new(9.0).value(), 3.0);
        assert_eq!(ZoomScale::new(f32::NAN).value(), 1.0);
    }

    #[test]
    fn test_rotation_wraps() {
        let mut rotation = Rotation::default();
        let seen: Vec<u16> = (0..4)
            .map(|_| {
                rotation = rotation.rotate_clockwise();
                rotation.degrees()
            })
            .collect();
        assert_eq!(seen, vec![90, 180, 270, 0]);
    }

    #[test]
    fn test_parse_page_number() {
        assert_eq!(parse_page_number("12"), Some(12));
        assert_eq!(parse_page_number(" 7 "), Some(7));
        assert_eq!(parse_page_number("3abc"), Some(3));
        assert_eq!(parse_page_number("-2"), Some(-2));
        assert_eq!(parse_page_number("abc"), None);
        assert_eq!(parse_page_number(""), None);
    }

    #[tokio::test]
    async fn test_load_renders_first_page() {
        let surface = loaded(5).await;

        assert!(surface.state().is_loaded());
        assert_eq!(surface.state().page_count, 5);
        assert_eq!(surface.surface().unwrap().page, 1);
        assert_eq!(surface.status_message(), None);
    }

    #[tokio::test]
    async fn test_load_failure_is_explicit_state() {
        let mut surface = PdfSurface::new(Arc::new(MemoryDocumentEngine::new()), URL);
        assert_eq!(surface.status_message().as_deref(), Some(LOADING_MESSAGE));

        assert!(surface.load().await.is_err());
        assert!(matches!(surface.state().phase, PdfPhase::Failed(_)));
        assert!(surface.status_message().unwrap().starts_with("Failed to load"));
    }

    #[tokio::test]
    async fn test_out_of_range_pages_ignored() {
        let mut surface = loaded(3).await;

        assert!(surface.go_to_page(0).is_none());
        assert!(surface.go_to_page(4).is_none());
        assert!(surface.previous_page().is_none());
        assert_eq!(surface.state().page, 1);

        let job = surface.go_to_page(3).unwrap();
        surface.render(job).await;
        assert_eq!(surface.state().page, 3);
        assert!(surface.next_page().is_none());
    }

    #[tokio::test]
    async fn test_page_input_submission() {
        let mut surface = loaded(10).await;

        surface.set_page_input("abc");
        assert!(surface.submit_page_input().is_none());

        surface.set_page_input("7");
        let job = surface.submit_page_input().unwrap();
        surface.render(job).await;
        assert_eq!(surface.state().page, 7);
        assert_eq!(surface.state().page_input, "7");
    }

    #[tokio::test]
    async fn test_initial_page_out_of_range_falls_back() {
        let engine =
            MemoryDocumentEngine::new().with_document(URL, MemoryDocument::with_page_count(2));
        let mut surface = PdfSurface::with_initial_page(Arc::new(engine), URL, 9);
        surface.load().await.unwrap();
        assert_eq!(surface.state().page, 1);
    }

    #[tokio::test]
    async fn test_search_is_unimplemented_for_real_queries() {
        let surface = loaded(1).await;

        assert!(surface.search("").is_ok());
        assert!(surface.search("   ").is_ok());
        assert!(matches!(
            surface.search("needle"),
            Err(ViewerError::Unimplemented(_))
        ));

        let unloaded = PdfSurface::new(Arc::new(MemoryDocumentEngine::new()), URL);
        assert!(unloaded.search("needle").is_ok());
    }

    #[test]
    fn test_download_request() {
        let surface = PdfSurface::new(Arc::new(MemoryDocumentEngine::new()), URL);
        assert_eq!(
            surface.download(),
            DownloadRequest {
                url: URL.to_string(),
                file_name: "document.pdf".to_string()
            }
        );
    }
}
