use crate::provider::{CaptionKind, TranscriptCandidate};
use crate::video::CaptionPreference;

/// Outcome of picking a caption track
#[derive(Debug, Clone, PartialEq)]
pub enum Selection<'a> {
    Found(&'a TranscriptCandidate),
    /// A caption type was requested but no track matches it in any preferred language
    NotFound,
    /// The caller asked for no transcript
    Skipped,
}

/// Pick the caption track matching `preference`
///
/// Languages are tried in the given order and the first language with a track of the
/// requested kind wins, regardless of where that track sits in `candidates`.
pub fn select<'a>(
    candidates: &'a [TranscriptCandidate],
    preference: CaptionPreference,
    languages: &[String],
) -> Selection<'a> {
    let kind = match preference {
        CaptionPreference::AutoGenerated => CaptionKind::Generated,
        CaptionPreference::UserGenerated => CaptionKind::Manual,
        CaptionPreference::None => return Selection::Skipped,
    };

    languages
        .iter()
        .find_map(|language| {
            candidates
                .iter()
                .find(|candidate| candidate.kind == kind && candidate.language_code == *language)
        })
        .map_or(Selection::NotFound, Selection::Found)
}
