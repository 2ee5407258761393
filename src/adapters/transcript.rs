//! Transcript sources for video content.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::domain::{Transcript, TranscriptSegment};
use crate::error::ViewerError;

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat. Duis aute irure dolor in reprehenderit in voluptate velit esse cillum dolore eu fugiat nulla pariatur. Excepteur sint occaecat cupidatat non proident, sunt in culpa qui officia deserunt mollit anim id est laborum.";

/// Number of segments in a generated transcript
pub const MOCK_SEGMENT_COUNT: usize = 30;

/// Trait for transcript sources
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch the ordered segments for a video
    async fn fetch(&self, video_id: &str) -> Result<Transcript, ViewerError>;
}

/// Generates placeholder transcripts after a fixed delay.
///
/// Segment texts cycle through the sentences of a lorem ipsum paragraph and
/// each lasts between 5 and 15 seconds. Durations are derived from a hash
/// of the video id, so the same video always yields the same transcript.
#[derive(Debug, Clone)]
pub struct MockTranscriptProvider {
    delay: Duration,
}

impl Default for MockTranscriptProvider {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl MockTranscriptProvider {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Build the transcript for `video_id` without waiting
    pub fn generate(video_id: &str) -> Vec<TranscriptSegment> {
        let sentences: Vec<String> = LOREM
            .split(". ")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}.", s.trim_end_matches('.')))
            .collect();

        let mut segments = Vec::with_capacity(MOCK_SEGMENT_COUNT);
        let mut current = 0.0;

        for i in 0..MOCK_SEGMENT_COUNT {
            let duration = 5.0 + segment_fraction(video_id, i) * 10.0;
            segments.push(TranscriptSegment::new(
                format!("segment-{}", i),
                current,
                current + duration,
                sentences[i % sentences.len()].clone(),
            ));
            current += duration;
        }

        segments
    }
}

/// Deterministic value in [0, 1] for segment `index` of `video_id`
fn segment_fraction(video_id: &str, index: usize) -> f64 {
    let mut hasher = Sha256::new();
    hasher.update(video_id.as_bytes());
    hasher.update(b":");
    hasher.update(index.to_le_bytes());
    let digest = hasher.finalize();

    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    f64::from(value) / f64::from(u32::MAX)
}

#[async_trait]
impl TranscriptProvider for MockTranscriptProvider {
    fn name(&self) -> &str {
        "mock"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Transcript, ViewerError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!("Generated mock transcript");
        Transcript::new(Self::generate(video_id))
    }
}

/// Response shapes accepted from a transcript service
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptResponse {
    Segments(Vec<TranscriptSegment>),
    Wrapped { transcript: Vec<TranscriptSegment> },
}

impl TranscriptResponse {
    fn into_segments(self) -> Vec<TranscriptSegment> {
        match self {
            Self::Segments(segments) | Self::Wrapped { transcript: segments } => segments,
        }
    }
}

/// Fetches transcripts from `GET {endpoint}/{video_id}`.
///
/// The body is either a JSON array of segments or an object with a
/// `transcript` array.
pub struct HttpTranscriptProvider {
    endpoint: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTranscriptProvider {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn url_for(&self, video_id: &str) -> String {
        format!("{}/{}", self.endpoint, video_id)
    }
}

#[async_trait]
impl TranscriptProvider for HttpTranscriptProvider {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Transcript, ViewerError> {
        let url = self.url_for(video_id);

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ViewerError::load("transcript", e))?;

        if !response.status().is_success() {
            return Err(ViewerError::load(
                "transcript",
                format!("{} returned {}", url, response.status()),
            ));
        }

        let body: TranscriptResponse = response
            .json()
            .await
            .map_err(|e| ViewerError::load("transcript", e))?;

        let segments = body.into_segments();
        debug!(segments = segments.len(), "Fetched transcript");

        Transcript::new(segments).map_err(|e| ViewerError::load("transcript", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transcript_shape() {
        let segments = MockTranscriptProvider::generate("dQw4w9WgXcQ");

        assert_eq!(segments.len(), MOCK_SEGMENT_COUNT);
        assert_eq!(segments[0].id, "segment-0");
        assert_eq!(segments[0].start, 0.0);
        assert_eq!(
            segments[0].text,
            "Lorem ipsum dolor sit amet, consectetur adipiscing elit."
        );
        assert!(segments[4].text.ends_with("est laborum."));
        assert!(!segments[4].text.ends_with(".."));
        assert_eq!(segments[5].text, segments[0].text);

        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for segment in &segments {
            let duration = segment.duration();
            assert!((5.0..=15.0).contains(&duration), "duration {}", duration);
        }
    }

    #[test]
    fn test_mock_transcript_is_deterministic() {
        assert_eq!(
            MockTranscriptProvider::generate("abc"),
            MockTranscriptProvider::generate("abc")
        );
        assert_ne!(
            MockTranscriptProvider::generate("abc")[0].end,
            MockTranscriptProvider::generate("xyz")[0].end
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_fetch_waits_for_delay() {
        let provider = MockTranscriptProvider::default();
        let mut fetch = tokio_test::task::spawn(provider.fetch("dQw4w9WgXcQ"));

        tokio_test::assert_pending!(fetch.poll());
        tokio::time::advance(Duration::from_millis(999)).await;
        tokio_test::assert_pending!(fetch.poll());
        tokio::time::advance(Duration::from_millis(1)).await;

        let transcript = tokio_test::assert_ready_ok!(fetch.poll());
        assert_eq!(transcript.len(), MOCK_SEGMENT_COUNT);
    }

    #[test]
    fn test_response_shapes() {
        let bare: TranscriptResponse =
            serde_json::from_str(r#"[{"id":"a","start":0,"end":1.5,"text":"Hi."}]"#).unwrap();
        assert_eq!(bare.into_segments().len(), 1);

        let wrapped: TranscriptResponse =
            serde_json::from_str(r#"{"transcript":[{"id":"a","start":0,"end":1,"text":"Hi."}]}"#)
                .unwrap();
        assert_eq!(wrapped.into_segments()[0].id, "a");
    }

    #[test]
    fn test_http_url_trims_slash() {
        let provider = HttpTranscriptProvider::new("https://example.test/t/", Duration::from_secs(5));
        assert_eq!(provider.url_for("abc"), "https://example.test/t/abc");
    }

    #[tokio::test]
    async fn test_http_fetch_unreachable_is_load_failure() {
        let provider = HttpTranscriptProvider::new("http://127.0.0.1:9", Duration::from_secs(2));
        let result = provider.fetch("abc").await;
        assert!(matches!(result, Err(ViewerError::LoadFailure { .. })));
    }
}
