//! Viewer Dispatch Integration Tests
//!
//! Tests that each content type reaches its own viewer and nothing else.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};

use shelf::adapters::{
    MemoryDocument, MemoryDocumentEngine, MockTranscriptProvider, SimulatedPlatform,
    MOCK_SEGMENT_COUNT,
};
use shelf::viewer::{ContentViewer, PdfPhase, ViewerContext, ViewerKind, ViewerSettings};
use shelf::{Catalog, ContentItem, ContentType, ViewerError};

const PDF_URL: &str = "https://example.com/paper.pdf";

struct Fixture {
    context: ViewerContext,
    platform: Arc<SimulatedPlatform>,
}

fn fixture(settings: ViewerSettings) -> Fixture {
    let documents =
        MemoryDocumentEngine::new().with_document(PDF_URL, MemoryDocument::with_page_count(4));
    let platform = Arc::new(SimulatedPlatform::new(90.0));

    Fixture {
        context: ViewerContext {
            documents: Arc::new(documents),
            videos: platform.clone(),
            transcripts: Arc::new(MockTranscriptProvider::new(Duration::from_millis(500))),
            settings,
        },
        platform,
    }
}

fn item(id: &str, content_type: ContentType) -> ContentItem {
    ContentItem::new(
        id,
        format!("Item {}", id),
        content_type,
        Utc.with_ymd_and_hms(2023, 10, 1, 9, 0, 0).unwrap(),
    )
}

#[tokio::test]
async fn test_pdf_goes_to_document_surface_only() {
    let fx = fixture(ViewerSettings::default());
    let pdf = item("p", ContentType::Pdf)
        .with_original_url(PDF_URL)
        .with_content("<p>This markup is never rendered</p>");

    let viewer = ContentViewer::open(&pdf, &fx.context).await.unwrap();
    assert_eq!(viewer.kind(), ViewerKind::Pdf);

    let ContentViewer::Pdf(surface) = viewer else {
        panic!("expected the PDF viewer");
    };
    assert!(surface.state().is_loaded());
    assert_eq!(surface.state().page_count, 4);
    assert_eq!(surface.surface().unwrap().page, 1);
}

#[tokio::test]
async fn test_pdf_initial_page_from_settings() {
    let settings = ViewerSettings {
        initial_page: 3,
        ..Default::default()
    };
    let fx = fixture(settings);
    let pdf = item("p", ContentType::Pdf).with_original_url(PDF_URL);

    let ContentViewer::Pdf(surface) = ContentViewer::open(&pdf, &fx.context).await.unwrap() else {
        panic!("expected the PDF viewer");
    };
    assert_eq!(surface.state().page, 3);
    assert_eq!(surface.state().page_label(), "3 / 4");
}

#[tokio::test]
async fn test_pdf_without_url_is_an_error() {
    let fx = fixture(ViewerSettings::default());
    let pdf = item("p", ContentType::Pdf);

    let result = ContentViewer::open(&pdf, &fx.context).await;
    assert!(matches!(result, Err(ViewerError::InvalidInput(_))));
}

#[tokio::test]
async fn test_unloadable_pdf_is_surface_state() {
    let fx = fixture(ViewerSettings::default());
    let pdf = item("p", ContentType::Pdf).with_original_url("https://example.com/missing.pdf");

    let ContentViewer::Pdf(surface) = ContentViewer::open(&pdf, &fx.context).await.unwrap() else {
        panic!("expected the PDF viewer");
    };
    assert!(matches!(surface.state().phase, PdfPhase::Failed(_)));
    assert!(surface.status_message().unwrap().contains("missing.pdf"));
}

#[tokio::test]
async fn test_articles_and_newsletters_go_to_markup() {
    let fx = fixture(ViewerSettings::default());

    // A document-looking URL does not change the viewer
    let article = item("a", ContentType::Article)
        .with_original_url(PDF_URL)
        .with_content("<h1>Heading</h1><p>Body text.</p>");
    let newsletter = item("n", ContentType::Newsletter).with_content("<p>Weekly</p>");

    let viewer = ContentViewer::open(&article, &fx.context).await.unwrap();
    let ContentViewer::Markup(view) = viewer else {
        panic!("expected the markup viewer");
    };
    assert_eq!(view.plain_text(), "Heading\nBody text.");

    let viewer = ContentViewer::open(&newsletter, &fx.context).await.unwrap();
    assert_eq!(viewer.kind(), ViewerKind::Markup);
}

#[tokio::test]
async fn test_markup_plain_text_reads_like_a_browser() {
    let fx = fixture(ViewerSettings::default());
    let article = item("a", ContentType::Article)
        .with_content("<p>Fish &amp; chips</p>\n<p>if a < b then</p>\n<p>line one<br>line two</p>");

    let ContentViewer::Markup(view) = ContentViewer::open(&article, &fx.context).await.unwrap()
    else {
        panic!("expected the markup viewer");
    };
    assert_eq!(
        view.plain_text(),
        "Fish & chips\nif a < b then\nline one\nline two"
    );
}

#[tokio::test(start_paused = true)]
async fn test_video_mounts_player_and_loads_transcript_once() {
    let fx = fixture(ViewerSettings::default());
    let video = item("v", ContentType::Video)
        .with_original_url("https://youtu.be/dQw4w9WgXcQ?t=42");

    let ContentViewer::Video(mut pane) = ContentViewer::open(&video, &fx.context).await.unwrap()
    else {
        panic!("expected the video viewer");
    };

    let transport = pane.viewer.transport().unwrap();
    assert_eq!(transport.video_id(), "dQw4w9WgXcQ");
    assert_eq!(transport.state().duration, 90.0);
    assert_eq!(fx.platform.players_created(), 1);

    assert!(pane.has_transcript());
    assert!(pane.toggle_transcript().await);
    assert_eq!(pane.panel().unwrap().transcript().len(), MOCK_SEGMENT_COUNT);

    // Hiding and showing again reuses the loaded transcript
    assert!(!pane.toggle_transcript().await);
    let started = tokio::time::Instant::now();
    assert!(pane.toggle_transcript().await);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_video_with_unusable_url_shows_placeholder() {
    let fx = fixture(ViewerSettings::default());
    let video = item("v", ContentType::Video)
        .with_original_url("https://example.com/talks/recording.mp4");

    let ContentViewer::Video(mut pane) = ContentViewer::open(&video, &fx.context).await.unwrap()
    else {
        panic!("expected the video viewer");
    };

    assert_eq!(pane.viewer.placeholder(), Some("Invalid video URL"));
    assert!(pane.viewer.transport().is_none());
    assert!(!pane.has_transcript());
    assert!(!pane.toggle_transcript().await);
    assert_eq!(fx.platform.players_created(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_every_sample_item_opens_in_its_viewer() {
    let fx = fixture(ViewerSettings::default());
    let catalog = Catalog::sample().unwrap();

    for item in catalog.items() {
        let expected = match item.content_type {
            ContentType::Pdf => ViewerKind::Pdf,
            ContentType::Video => ViewerKind::Video,
            ContentType::Article | ContentType::Newsletter => ViewerKind::Markup,
        };
        let viewer = ContentViewer::open(item, &fx.context).await.unwrap();
        assert_eq!(viewer.kind(), expected, "item {}", item.id);
    }
}
