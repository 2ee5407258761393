//! Picks the viewer for a content item.
//!
//! The dispatch is closed over [`ContentType`]: PDFs go to the paged
//! document surface, videos to the transport control with an optional
//! transcript panel, and articles and newsletters to the markup view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::{debug, instrument};

use super::pdf::PdfSurface;
use super::transcript::{TranscriptPanel, TranscriptPhase, TranscriptSession};
use super::video::{extract_video_id, VideoViewer};
use super::ViewerSettings;
use crate::adapters::{DocumentEngine, TranscriptProvider, VideoPlatform};
use crate::domain::{ContentItem, ContentType};
use crate::error::ViewerError;

/// Which viewer renders a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerKind {
    Pdf,
    Video,
    Markup,
}

/// Select the viewer for `content_type`
pub fn select_viewer(content_type: ContentType) -> ViewerKind {
    match content_type {
        ContentType::Pdf => ViewerKind::Pdf,
        ContentType::Video => ViewerKind::Video,
        ContentType::Article | ContentType::Newsletter => ViewerKind::Markup,
    }
}

/// Collaborators injected into every viewer
#[derive(Clone)]
pub struct ViewerContext {
    pub documents: Arc<dyn DocumentEngine>,
    pub videos: Arc<dyn VideoPlatform>,
    pub transcripts: Arc<dyn TranscriptProvider>,
    pub settings: ViewerSettings,
}

/// Video viewer plus its transcript panel
#[derive(Debug)]
pub struct VideoPane {
    pub viewer: VideoViewer,
    transcripts: TranscriptSession,
    video_id: Option<String>,
    panel: Option<TranscriptPanel>,
    show_transcript: bool,
}

impl VideoPane {
    /// Whether a transcript can be shown for this video
    pub fn has_transcript(&self) -> bool {
        self.video_id.is_some()
    }

    pub fn transcript_visible(&self) -> bool {
        self.show_transcript
    }

    pub fn transcript_session(&self) -> &TranscriptSession {
        &self.transcripts
    }

    pub fn panel(&self) -> Option<&TranscriptPanel> {
        self.panel.as_ref()
    }

    pub fn panel_mut(&mut self) -> Option<&mut TranscriptPanel> {
        self.panel.as_mut()
    }

    /// Show or hide the transcript, fetching it the first time it is shown
    pub async fn toggle_transcript(&mut self) -> bool {
        let Some(video_id) = self.video_id.clone() else {
            return false;
        };

        self.show_transcript = !self.show_transcript;
        let needs_fetch = matches!(
            self.transcripts.phase(),
            TranscriptPhase::Idle | TranscriptPhase::Failed(_)
        );

        if self.show_transcript && needs_fetch {
            self.transcripts.load(&video_id).await;
            self.panel = self.transcripts.panel();
        }
        self.show_transcript
    }
}

/// Trusted markup body of an article or newsletter with its header
#[derive(Debug, Clone, PartialEq)]
pub struct MarkupView {
    pub title: String,
    pub markup: String,
    pub source: Option<String>,
    pub original_url: Option<String>,
    pub cover_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub added_at: DateTime<Utc>,
    pub reading_time: Option<u32>,
}

impl MarkupView {
    fn from_item(item: &ContentItem) -> Self {
        Self {
            title: item.title.clone(),
            markup: item.content.clone(),
            source: item.source.clone(),
            original_url: item.original_url.clone(),
            cover_image: item.cover_image.clone(),
            published_at: item.published_at,
            added_at: item.added_at,
            reading_time: item.reading_time,
        }
    }

    /// Byline lines shown above the body
    pub fn header_lines(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(ref source) = self.source {
            lines.push(format!("From: {}", source));
        }
        if let Some(published) = self.published_at {
            lines.push(format!("Published: {}", published.format("%Y-%m-%d")));
        }
        lines.push(format!("Added: {}", relative_time(self.added_at, now)));
        if let Some(minutes) = self.reading_time {
            lines.push(format!("{} min read", minutes));
        }
        lines
    }

    /// Body with tags removed, for terminals
    pub fn plain_text(&self) -> String {
        markup_text(&self.markup)
    }
}

/// "3 days ago" style distance from `at` to `now`
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - at).num_seconds();
    let (value, unit) = match seconds.abs() {
        s if s < 60 => return "just now".to_string(),
        s if s < 3_600 => (s / 60, "minute"),
        s if s < 86_400 => (s / 3_600, "hour"),
        s if s < 2_592_000 => (s / 86_400, "day"),
        s if s < 31_536_000 => (s / 2_592_000, "month"),
        s => (s / 31_536_000, "year"),
    };
    let plural = if value == 1 { "" } else { "s" };

    if seconds < 0 {
        format!("in {} {}{}", value, unit, plural)
    } else {
        format!("{} {}{} ago", value, unit, plural)
    }
}

/// Elements that end a line of plain text
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "ul", "ol", "blockquote", "pre", "tr",
    "section", "article", "header", "footer",
];

/// Text content of an HTML fragment, one block per line
fn markup_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut out = String::with_capacity(markup.len());
    push_text(fragment.root_element(), &mut out);

    out.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child) = ElementRef::wrap(child) {
            let name = child.value().name();
            if name == "br" {
                out.push('\n');
                continue;
            }
            let block = BLOCK_ELEMENTS.contains(&name);
            if block {
                out.push('\n');
            }
            push_text(child, out);
            if block {
                out.push('\n');
            }
        }
    }
}

/// A mounted viewer for one content item
#[derive(Debug)]
pub enum ContentViewer {
    Pdf(PdfSurface),
    Video(VideoPane),
    Markup(MarkupView),
}

impl ContentViewer {
    /// Mount the viewer `item` needs.
    ///
    /// PDFs are loaded before returning; a load failure is part of the
    /// surface state. Only a PDF without a document URL is an error.
    #[instrument(skip(item, context), fields(id = %item.id, content_type = %item.content_type))]
    pub async fn open(item: &ContentItem, context: &ViewerContext) -> Result<Self, ViewerError> {
        match select_viewer(item.content_type) {
            ViewerKind::Pdf => {
                let url = item.original_url.clone().ok_or_else(|| {
                    ViewerError::InvalidInput(format!("PDF item {} has no document URL", item.id))
                })?;
                let mut surface = PdfSurface::with_initial_page(
                    Arc::clone(&context.documents),
                    url,
                    context.settings.initial_page,
                );
                // Load failure is recorded in the surface phase
                let _ = surface.load().await;
                Ok(Self::Pdf(surface))
            }
            ViewerKind::Video => {
                let url = item.original_url.clone().unwrap_or_default();
                let viewer =
                    VideoViewer::mount(context.videos.as_ref(), &url, context.settings.transport)
                        .await;
                debug!(placeholder = viewer.placeholder().is_some(), "Mounted video");

                Ok(Self::Video(VideoPane {
                    viewer,
                    transcripts: TranscriptSession::new(Arc::clone(&context.transcripts)),
                    video_id: extract_video_id(&url),
                    panel: None,
                    show_transcript: false,
                }))
            }
            ViewerKind::Markup => Ok(Self::Markup(MarkupView::from_item(item))),
        }
    }

    pub fn kind(&self) -> ViewerKind {
        match self {
            Self::Pdf(_) => ViewerKind::Pdf,
            Self::Video(_) => ViewerKind::Video,
            Self::Markup(_) => ViewerKind::Markup,
        }
    }
}
