//! Transcript panel and its loading session.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::adapters::TranscriptProvider;
use crate::domain::{Transcript, TranscriptSegment};
use crate::error::ViewerError;
use crate::export::Exporter;

/// Shown when a search leaves no segments
pub const NO_MATCHES_MESSAGE: &str = "No transcript segments match your search.";

/// File name used when exporting a transcript
pub const TRANSCRIPT_FILE_NAME: &str = "transcript.txt";

/// Consumer of segment selections, e.g. a seek into the player
pub type SegmentCallback = Box<dyn Fn(&TranscriptSegment) + Send + Sync>;

/// Segments whose text contains `query`, ignoring case.
///
/// A blank query keeps every segment. Always filters the full sequence.
pub fn filter_segments<'a>(
    segments: &'a [TranscriptSegment],
    query: &str,
) -> Vec<&'a TranscriptSegment> {
    if query.trim().is_empty() {
        return segments.iter().collect();
    }
    let needle = query.to_lowercase();
    segments
        .iter()
        .filter(|s| s.text.to_lowercase().contains(&needle))
        .collect()
}

/// Piece of segment text, marked when it matches the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub text: String,
    pub matched: bool,
}

impl HighlightSpan {
    fn new(text: &str, matched: bool) -> Self {
        Self {
            text: text.to_string(),
            matched,
        }
    }
}

/// Split `text` into matched and unmatched spans of `query`, ignoring case
pub fn highlight_spans(text: &str, query: &str) -> Vec<HighlightSpan> {
    if query.trim().is_empty() || text.is_empty() {
        return vec![HighlightSpan::new(text, false)];
    }

    let needle: Vec<char> = query.chars().collect();
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut i = 0;

    while i + needle.len() <= chars.len() {
        let hit = needle
            .iter()
            .zip(&chars[i..])
            .all(|(q, (_, c))| q.to_lowercase().eq(c.to_lowercase()));

        if !hit {
            i += 1;
            continue;
        }

        let start = chars[i].0;
        let end = chars
            .get(i + needle.len())
            .map(|(at, _)| *at)
            .unwrap_or(text.len());

        if plain_start < start {
            spans.push(HighlightSpan::new(&text[plain_start..start], false));
        }
        spans.push(HighlightSpan::new(&text[start..end], true));
        plain_start = end;
        i += needle.len();
    }

    if plain_start < text.len() {
        spans.push(HighlightSpan::new(&text[plain_start..], false));
    }
    spans
}

/// Searchable, exportable view of one transcript
pub struct TranscriptPanel {
    transcript: Transcript,
    query: String,
    on_select: Option<SegmentCallback>,
}

impl fmt::Debug for TranscriptPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptPanel")
            .field("segments", &self.transcript.len())
            .field("query", &self.query)
            .field("on_select", &self.on_select.is_some())
            .finish()
    }
}

impl TranscriptPanel {
    pub fn new(transcript: Transcript) -> Self {
        Self {
            transcript,
            query: String::new(),
            on_select: None,
        }
    }

    /// Deliver segment selections to `callback`
    pub fn with_segment_callback(mut self, callback: SegmentCallback) -> Self {
        self.on_select = Some(callback);
        self
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the search query and return the matching segments
    pub fn search(&mut self, query: &str) -> Vec<&TranscriptSegment> {
        self.query = query.to_string();
        self.visible()
    }

    /// Segments matching the current query, in order
    pub fn visible(&self) -> Vec<&TranscriptSegment> {
        filter_segments(self.transcript.segments(), &self.query)
    }

    /// Message to show instead of the list, if nothing matches
    pub fn empty_message(&self) -> Option<&'static str> {
        self.visible().is_empty().then_some(NO_MATCHES_MESSAGE)
    }

    /// Spans of `text` for the current query
    pub fn highlight(&self, text: &str) -> Vec<HighlightSpan> {
        highlight_spans(text, &self.query)
    }

    /// Hand `segment` to the selection callback. Returns whether one was set.
    pub fn select_segment(&self, segment: &TranscriptSegment) -> bool {
        match &self.on_select {
            Some(callback) => {
                debug!(segment = %segment.id, start = segment.start, "Segment selected");
                callback(segment);
                true
            }
            None => false,
        }
    }

    /// The whole transcript as text, regardless of the current search
    pub fn export_text(&self) -> String {
        self.transcript.to_text()
    }

    /// Write the transcript to `transcript.txt` in the export directory
    pub async fn export(&self, exporter: &Exporter) -> Result<PathBuf> {
        exporter
            .save_text(TRANSCRIPT_FILE_NAME, &self.export_text())
            .await
    }
}

/// Loading state of a transcript
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptPhase {
    Idle,
    Loading,
    Loaded(Transcript),
    Failed(String),
}

/// One issued fetch. Runs without borrowing the session.
pub struct TranscriptTicket {
    id: u64,
    video_id: String,
    provider: Arc<dyn TranscriptProvider>,
}

impl TranscriptTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn fetch(self) -> TranscriptOutcome {
        let result = self.provider.fetch(&self.video_id).await;
        TranscriptOutcome {
            ticket: self.id,
            video_id: self.video_id,
            result,
        }
    }
}

/// Completion of a [`TranscriptTicket`]
#[derive(Debug, Clone)]
pub struct TranscriptOutcome {
    pub ticket: u64,
    pub video_id: String,
    pub result: Result<Transcript, ViewerError>,
}

/// Fetches transcripts for the video being viewed.
///
/// Only the latest request counts: responses for a superseded video are
/// dropped on arrival.
pub struct TranscriptSession {
    provider: Arc<dyn TranscriptProvider>,
    latest: u64,
    video_id: Option<String>,
    phase: TranscriptPhase,
}

impl fmt::Debug for TranscriptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscriptSession")
            .field("provider", &self.provider.name())
            .field("latest", &self.latest)
            .field("video_id", &self.video_id)
            .field("phase", &self.phase)
            .finish()
    }
}

impl TranscriptSession {
    pub fn new(provider: Arc<dyn TranscriptProvider>) -> Self {
        Self {
            provider,
            latest: 0,
            video_id: None,
            phase: TranscriptPhase::Idle,
        }
    }

    pub fn phase(&self) -> &TranscriptPhase {
        &self.phase
    }

    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    pub fn transcript(&self) -> Option<&Transcript> {
        match &self.phase {
            TranscriptPhase::Loaded(transcript) => Some(transcript),
            _ => None,
        }
    }

    /// Inline text for the loading and failed states
    pub fn status_message(&self) -> Option<String> {
        match &self.phase {
            TranscriptPhase::Loading => Some(crate::viewer::pdf::LOADING_MESSAGE.to_string()),
            TranscriptPhase::Failed(message) => Some(message.clone()),
            TranscriptPhase::Idle | TranscriptPhase::Loaded(_) => None,
        }
    }

    /// Start fetching the transcript for `video_id`, superseding any
    /// request in flight
    pub fn begin(&mut self, video_id: &str) -> TranscriptTicket {
        self.latest += 1;
        self.video_id = Some(video_id.to_string());
        self.phase = TranscriptPhase::Loading;

        TranscriptTicket {
            id: self.latest,
            video_id: video_id.to_string(),
            provider: Arc::clone(&self.provider),
        }
    }

    /// Apply a finished fetch. Returns `false` if it was superseded.
    pub fn complete(&mut self, outcome: TranscriptOutcome) -> bool {
        if outcome.ticket != self.latest {
            debug!(
                video_id = %outcome.video_id,
                ticket = outcome.ticket,
                latest = self.latest,
                "Discarding late transcript"
            );
            return false;
        }

        self.phase = match outcome.result {
            Ok(transcript) => {
                info!(video_id = %outcome.video_id, segments = transcript.len(), "Loaded transcript");
                TranscriptPhase::Loaded(transcript)
            }
            Err(e) => {
                warn!(video_id = %outcome.video_id, error = %e, "Error fetching transcript");
                TranscriptPhase::Failed(e.to_string())
            }
        };
        true
    }

    /// Fetch and apply in one step
    pub async fn load(&mut self, video_id: &str) -> &TranscriptPhase {
        let ticket = self.begin(video_id);
        let outcome = ticket.fetch().await;
        self.complete(outcome);
        &self.phase
    }

    /// Panel over the loaded transcript
    pub fn panel(&self) -> Option<TranscriptPanel> {
        self.transcript().cloned().map(TranscriptPanel::new)
    }
}
