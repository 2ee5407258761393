//! Error types shared by the viewers and their adapters.

use thiserror::Error;

/// Failures a viewer turns into local state instead of propagating
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewerError {
    /// A document or transcript could not be fetched
    #[error("Failed to load {what}: {reason}")]
    LoadFailure { what: String, reason: String },

    /// Input that cannot be acted on (e.g. an unparseable video URL)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A single page render attempt failed
    #[error("Failed to render page {page}: {reason}")]
    RenderFailure { page: u32, reason: String },

    /// Feature exposed as an extension point but not provided
    #[error("{0}")]
    Unimplemented(String),
}

impl ViewerError {
    pub fn load(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ViewerError::LoadFailure {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn render(page: u32, reason: impl std::fmt::Display) -> Self {
        ViewerError::RenderFailure {
            page,
            reason: reason.to_string(),
        }
    }
}

/// Catalog lookup errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Item not found: {0}")]
    NotFound(String),
}
