//! Domain types for shelf.
//!
//! This module contains the core data structures:
//! - Item: saved content with its status and highlights
//! - Transcript: timestamped segments for video content

pub mod item;
pub mod transcript;

// Re-export commonly used types
pub use item::{ContentItem, ContentType, Highlight, ItemId, ItemStatus, PositionToken};
pub use transcript::{export_text, format_timestamp, Transcript, TranscriptSegment};
