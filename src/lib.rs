//! shelf - Read-it-later content viewer
//!
//! Opens saved articles, newsletters, PDFs and videos in a viewer chosen
//! by content type. Viewers are headless state machines: the CLI drives
//! them by method calls and prints what they would show.
//!
//! # Architecture
//!
//! - Documents, players and transcripts sit behind adapter traits
//! - Every async result that can arrive late carries a generation, and
//!   only the newest one is applied
//! - A playing video owns exactly one position poll, cancelled on pause,
//!   end and unmount
//!
//! # Modules
//!
//! - `adapters`: Document engine, video platform, transcript provider
//! - `viewer`: PDF surface, video transport, transcript panel, dispatch
//! - `library`: Read-only catalog of saved items
//! - `domain`: Data structures (ContentItem, Transcript)
//! - `export`: Writes transcripts and downloads to disk
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # List the inbox
//! shelf list --status inbox
//!
//! # Open a PDF on page 3 at 120%
//! shelf show pdf-1 --page 3 --zoom-in 2
//!
//! # Search and export a video transcript
//! shelf transcript video-1 --search lorem --export
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod export;
pub mod library;
pub mod viewer;

// Re-export main types at crate root for convenience
pub use domain::{ContentItem, ContentType, ItemStatus, Transcript, TranscriptSegment};
pub use error::{CatalogError, ViewerError};
pub use export::Exporter;
pub use library::{Catalog, ListQuery, SortOrder};
pub use viewer::{ContentViewer, PdfSurface, TranscriptSession, VideoTransport, ViewerContext};
