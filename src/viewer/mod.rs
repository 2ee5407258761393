//! Per-type content viewers.
//!
//! Each viewer is a headless state machine driven by method calls:
//! - pdf: paged document surface with zoom, rotation and render supersession
//! - video: transport control with an owned position poll
//! - transcript: transcript loading, search, highlight and export
//! - dispatch: picks the viewer for a content item

pub mod dispatch;
pub mod pdf;
pub mod transcript;
pub mod video;

pub use dispatch::{select_viewer, ContentViewer, MarkupView, VideoPane, ViewerContext, ViewerKind};
pub use pdf::{DownloadRequest, PdfPhase, PdfSurface, PdfViewState, RenderJob, Rotation, ZoomScale};
pub use transcript::{TranscriptPanel, TranscriptPhase, TranscriptSession};
pub use video::{
    extract_video_id, PlayerPhase, TransportSettings, VideoTransport, VideoViewer, Volume,
};

/// Settings shared by all viewers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewerSettings {
    /// Page a document opens on when it has that many pages
    pub initial_page: u32,
    pub transport: TransportSettings,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            initial_page: 1,
            transport: TransportSettings::default(),
        }
    }
}
