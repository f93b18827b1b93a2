use crate::provider::TranscriptSegment;

/// Join segment texts in order
///
/// No separator is inserted; caption segments carry their own spacing.
pub fn normalize(segments: &[TranscriptSegment]) -> String {
    segments.iter().map(|segment| segment.text.as_str()).collect()
}
