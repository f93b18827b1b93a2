use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::{Result, TranscriptorError};

/// Which caption variant the caller wants transcribed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptionPreference {
    /// Captions generated by YouTube's speech recognition
    AutoGenerated,
    /// Captions uploaded by the channel owner
    UserGenerated,
    /// Caller opted out of transcription
    None,
}

impl CaptionPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptionPreference::AutoGenerated => "AUTO_GENERATED",
            CaptionPreference::UserGenerated => "USER_GENERATED",
            CaptionPreference::None => "NONE",
        }
    }
}

impl fmt::Display for CaptionPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of YouTube video the event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VideoType {
    Short,
    Video,
    Live,
    Unknown,
    Upcoming,
    Completed,
    Long,
}

/// One transcription request, validated at the boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    pub video_id: String,
    pub channel_id: String,
    pub video_title: String,
    pub video_type: VideoType,
    pub genre: String,
    pub channel_title: String,
    pub channel_uri: String,
    /// Publication time in epoch milliseconds
    pub published_at: i64,
    #[serde(alias = "captions")]
    pub caption: CaptionPreference,
}

impl VideoRequest {
    /// Parse and validate a raw invocation event
    ///
    /// Unknown fields are ignored so upstream events carrying extra bookkeeping
    /// attributes (`type`, `id`, `createdAt`, ...) are accepted as-is.
    pub fn from_event(event: &Value) -> Result<Self> {
        let request: VideoRequest = serde_json::from_value(event.clone())
            .map_err(|e| TranscriptorError::InvalidRequest(e.to_string()))?;

        request.validate()?;
        Ok(request)
    }

    fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(TranscriptorError::InvalidRequest("videoId must not be empty".to_string()));
        }

        if !self
            .video_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TranscriptorError::InvalidRequest(format!(
                "videoId contains invalid characters: {}",
                self.video_id
            )));
        }

        if self.channel_id.trim().is_empty() {
            return Err(TranscriptorError::InvalidRequest("channelId must not be empty".to_string()));
        }

        if self.published_at < 0 {
            return Err(TranscriptorError::InvalidRequest(format!(
                "publishedAt must not be negative: {}",
                self.published_at
            )));
        }

        Ok(())
    }
}
