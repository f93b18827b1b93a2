//! Transcript Provider - fetches YouTube caption tracks and persists them as transcripts
//!
//! This library resolves proxy credentials from AWS Secrets Manager, lists the caption
//! tracks YouTube exposes for a video, picks one according to the caller's caption
//! preference, flattens its segments into a single text and stores the result in DynamoDB.

pub mod cli;
pub mod config;
pub mod output;
pub mod provider;
pub mod secrets;
pub mod storage;
pub mod transcribe;
pub mod utils;
pub mod video;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use provider::{ProviderFactory, TranscriptCandidate, TranscriptProvider, TranscriptSegment};
pub use secrets::{ProxyCredentials, SecretResolver};
pub use storage::TranscriptStore;
pub use transcribe::{ErrorOutput, InvocationOutput, TranscriptionPipeline};
pub use video::{CaptionPreference, VideoRequest, VideoType};

/// Boxed cause kept behind a [`TranscriptorError`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type used throughout the library
pub type Result<T, E = TranscriptorError> = std::result::Result<T, E>;

/// Error types specific to the transcript provider
#[derive(thiserror::Error, Debug)]
pub enum TranscriptorError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to retrieve secret {name}: {reason}")]
    SecretRetrievalFailed {
        name: String,
        reason: String,
        #[source]
        source: BoxError,
    },

    #[error("Secret {0} is empty or has no string payload")]
    EmptySecret(String),

    #[error("Transcript provider unavailable: {reason}")]
    ProviderUnavailable {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("No captions available for video {video_id}: {reason}")]
    NoCaptionsForVideo { video_id: String, reason: String },

    #[error("No transcripts found for video {video_id} ({caption} in languages {languages:?})")]
    TranscriptNotFound {
        video_id: String,
        caption: video::CaptionPreference,
        languages: Vec<String>,
    },

    #[error("No transcript found, fetched transcript for video {0} is empty")]
    EmptyTranscript(String),

    #[error("Caption type NONE requested for video {0}, transcription skipped")]
    TranscriptionSkipped(String),

    #[error("Failed to persist transcript to table {table}: {reason}")]
    PersistenceFailed {
        table: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl TranscriptorError {
    /// Classifies the failure's origin for the error envelope
    pub fn subject(&self) -> &'static str {
        match self {
            TranscriptorError::InvalidRequest(_) => "Invalid request",
            TranscriptorError::SecretRetrievalFailed { .. } | TranscriptorError::EmptySecret(_) => {
                "Secret retrieval error"
            }
            TranscriptorError::ProviderUnavailable { .. }
            | TranscriptorError::NoCaptionsForVideo { .. } => "Transcript provider error",
            TranscriptorError::TranscriptNotFound { .. }
            | TranscriptorError::EmptyTranscript(_)
            | TranscriptorError::TranscriptionSkipped(_) => "No transcript found",
            TranscriptorError::PersistenceFailed { .. } => "Persistence error",
        }
    }

    pub(crate) fn provider(reason: impl Into<String>) -> Self {
        TranscriptorError::ProviderUnavailable {
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn provider_with(reason: impl Into<String>, source: impl Into<BoxError>) -> Self {
        TranscriptorError::ProviderUnavailable {
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}
