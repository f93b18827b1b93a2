use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod proxy;
pub mod youtube;

use crate::config::ProxyConfig;
use crate::secrets::ProxyCredentials;
use crate::Result;

/// Origin of a caption track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptionKind {
    /// Produced by YouTube's automatic speech recognition
    Generated,
    /// Uploaded by a person
    Manual,
}

/// An available, not yet fetched caption track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptCandidate {
    pub video_id: String,

    /// Language code such as `en` or `pl`
    pub language_code: String,

    /// Human readable language name
    pub language: String,

    pub kind: CaptionKind,

    pub is_translatable: bool,

    /// Timed-text URL the segments are fetched from
    pub url: String,
}

impl TranscriptCandidate {
    pub fn is_generated(&self) -> bool {
        self.kind == CaptionKind::Generated
    }
}

/// One timed snippet of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Access to a captioning provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// List every caption track available for a video
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptCandidate>>;

    /// Fetch the ordered segments of one caption track
    async fn fetch_segments(&self, candidate: &TranscriptCandidate) -> Result<Vec<TranscriptSegment>>;
}

/// Builds a provider configured with freshly resolved credentials
#[cfg_attr(test, mockall::automock)]
pub trait ProviderFactory: Send + Sync {
    fn connect(&self, credentials: &ProxyCredentials) -> Result<Box<dyn TranscriptProvider>>;
}

/// Creates YouTube caption clients routed through the rotating proxy
pub struct YoutubeProviderFactory {
    proxy: ProxyConfig,
}

impl YoutubeProviderFactory {
    pub fn new(proxy: ProxyConfig) -> Self {
        Self { proxy }
    }
}

impl ProviderFactory for YoutubeProviderFactory {
    fn connect(&self, credentials: &ProxyCredentials) -> Result<Box<dyn TranscriptProvider>> {
        let proxy = proxy::WebshareProxy::new(credentials, &self.proxy);
        tracing::debug!("Routing caption requests through {:?}", proxy);

        let client = youtube::YoutubeTranscriptClient::new(Some(&proxy))?;
        Ok(Box::new(client))
    }
}

#[cfg(test)]
pub(crate) fn candidate(language_code: &str, kind: CaptionKind) -> TranscriptCandidate {
    TranscriptCandidate {
        video_id: "abc".to_string(),
        language_code: language_code.to_string(),
        language: language_code.to_string(),
        kind,
        is_translatable: true,
        url: format!("https://www.youtube.com/api/timedtext?v=abc&lang={}", language_code),
    }
}
