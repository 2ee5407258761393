//! Adapter interfaces for external systems.
//!
//! Viewers never talk to a document engine, an embeddable video player or
//! a transcript service directly. Each collaborator sits behind a trait
//! here and is injected into the viewer that consumes it.

pub mod document;
pub mod pdf_scan;
pub mod transcript;
pub mod video;

// Re-export the adapter traits and their stock implementations
pub use document::{
    DocumentEngine, DocumentMetadata, HttpDocumentEngine, LoadedDocument, MemoryDocument,
    MemoryDocumentEngine, PageSize, RasterSurface, RenderParams,
};
pub use transcript::{
    HttpTranscriptProvider, MockTranscriptProvider, TranscriptProvider, MOCK_SEGMENT_COUNT,
};
pub use video::{
    PlayerEvent, PlayerHandle, PlayerOptions, PlayerState, SimulatedPlatform, SimulatedPlayer,
    VideoPlatform,
};
