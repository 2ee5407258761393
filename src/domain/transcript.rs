//! Timestamped transcript segments.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;

/// One timestamped span of spoken text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub id: String,

    /// Start time in seconds
    pub start: f64,

    /// End time in seconds (never before `start`)
    pub end: f64,

    pub text: String,
}

impl TranscriptSegment {
    pub fn new(id: impl Into<String>, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            text: text.into(),
        }
    }

    /// Length of the segment in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// `m:ss - m:ss` label shown above the segment text
    pub fn time_range_label(&self) -> String {
        format!(
            "{} - {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Ordered segment sequence for one video.
///
/// Serialized as a bare segment array; deserializing applies the same
/// ordering checks as [`Transcript::new`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TranscriptSegment>", into = "Vec<TranscriptSegment>")]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
}

impl Transcript {
    /// Build a transcript, checking segment ordering.
    ///
    /// Every segment must end at or after its start, and starts must be
    /// non-decreasing.
    pub fn new(segments: Vec<TranscriptSegment>) -> Result<Self, ViewerError> {
        let mut previous_start = f64::NEG_INFINITY;

        for segment in &segments {
            if !(segment.end >= segment.start) {
                return Err(ViewerError::InvalidInput(format!(
                    "segment {} ends at {} before it starts at {}",
                    segment.id, segment.end, segment.start
                )));
            }
            if segment.start < previous_start {
                return Err(ViewerError::InvalidInput(format!(
                    "segment {} starts at {} before the previous segment",
                    segment.id, segment.start
                )));
            }
            previous_start = segment.start;
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[TranscriptSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment playing at `position` seconds, if any
    pub fn segment_at(&self, position: f64) -> Option<&TranscriptSegment> {
        self.segments
            .iter()
            .rev()
            .find(|s| s.start <= position && position < s.end)
    }

    /// Plain-text export: `[m:ss] text` per segment, separated by a blank line
    pub fn to_text(&self) -> String {
        export_text(&self.segments)
    }
}

impl TryFrom<Vec<TranscriptSegment>> for Transcript {
    type Error = ViewerError;

    fn try_from(segments: Vec<TranscriptSegment>) -> Result<Self, Self::Error> {
        Self::new(segments)
    }
}

impl From<Transcript> for Vec<TranscriptSegment> {
    fn from(transcript: Transcript) -> Self {
        transcript.segments
    }
}

/// Format seconds as `m:ss`.
///
/// Minutes carry no leading zero, seconds are zero-padded to two digits,
/// and fractional seconds are floored.
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Render segments as downloadable text
pub fn export_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}] {}", format_timestamp(s.start), s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_checks_ordering() {
        let ordered: Transcript = serde_json::from_str(
            r#"[{"id":"a","start":0,"end":4,"text":"One."},{"id":"b","start":4,"end":9,"text":"Two."}]"#,
        )
        .unwrap();
        assert_eq!(ordered.len(), 2);
        assert_eq!(
            serde_json::to_value(&ordered).unwrap(),
            serde_json::to_value(ordered.segments()).unwrap()
        );

        let out_of_order = serde_json::from_str::<Transcript>(
            r#"[{"id":"b","start":4,"end":9,"text":"Two."},{"id":"a","start":0,"end":4,"text":"One."}]"#,
        );
        let err = out_of_order.unwrap_err().to_string();
        assert!(err.contains("before the previous segment"), "{}", err);

        let backwards =
            serde_json::from_str::<Transcript>(r#"[{"id":"a","start":5,"end":1,"text":"x"}]"#);
        assert!(backwards.is_err());
    }

    #[test]
    fn test_format_timestamp_floors() {
        assert_eq!(format_timestamp(0.0), "0:00");
        assert_eq!(format_timestamp(5.9), "0:05");
        assert_eq!(format_timestamp(59.99), "0:59");
        assert_eq!(format_timestamp(60.0), "1:00");
        assert_eq!(format_timestamp(754.2), "12:34");
        assert_eq!(format_timestamp(3600.0), "60:00");
    }

    #[test]
    fn test_format_timestamp_negative_and_nan() {
        assert_eq!(format_timestamp(-3.0), "0:00");
        assert_eq!(format_timestamp(f64::NAN), "0:00");
    }

    #[test]
    fn test_export_text_exact() {
        let segments = vec![
            TranscriptSegment::new("segment-0", 0.0, 5.0, "Hello."),
            TranscriptSegment::new("segment-1", 5.0, 12.0, "World."),
        ];

        assert_eq!(export_text(&segments), "[0:00] Hello.\n\n[0:05] World.");
    }

    #[test]
    fn test_export_empty() {
        assert_eq!(export_text(&[]), "");
    }

    #[test]
    fn test_transcript_rejects_inverted_segment() {
        let result = Transcript::new(vec![TranscriptSegment::new("a", 5.0, 2.0, "x")]);
        assert!(matches!(result, Err(ViewerError::InvalidInput(_))));
    }

    #[test]
    fn test_transcript_rejects_decreasing_start() {
        let result = Transcript::new(vec![
            TranscriptSegment::new("a", 5.0, 6.0, "x"),
            TranscriptSegment::new("b", 1.0, 2.0, "y"),
        ]);
        assert!(matches!(result, Err(ViewerError::InvalidInput(_))));
    }

    #[test]
    fn test_segment_at() {
        let transcript = Transcript::new(vec![
            TranscriptSegment::new("a", 0.0, 5.0, "first"),
            TranscriptSegment::new("b", 5.0, 12.0, "second"),
        ])
        .unwrap();

        assert_eq!(transcript.segment_at(4.9).unwrap().id, "a");
        assert_eq!(transcript.segment_at(5.0).unwrap().id, "b");
        assert!(transcript.segment_at(12.0).is_none());
    }

    #[test]
    fn test_time_range_label() {
        let segment = TranscriptSegment::new("a", 65.4, 71.0, "x");
        assert_eq!(segment.time_range_label(), "1:05 - 1:11");
    }
}
