use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::video::{VideoRequest, VideoType};
use crate::{Result, TranscriptorError};

/// Partition key prefix for transcript records
pub const TRANSCRIPTION_PK: &str = "TRANSCRIPTION";

/// Transcript entity as stored in the main table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRecord {
    /// `TRANSCRIPTION/<channelId>`
    pub pk: String,

    /// Random UUID, unique per stored transcript
    pub sk: String,

    pub created_at: i64,
    pub updated_at: i64,
    pub timestamp: i64,

    pub video_id: String,
    pub video_title: String,
    pub video_type: VideoType,
    pub genre: String,
    pub channel_title: String,
    pub channel_uri: String,
    pub published_at: i64,

    pub transcript: String,
}

impl TranscriptRecord {
    /// Build a record for `request` stamped with `now` (epoch milliseconds)
    ///
    /// Every call generates a new sort key, so repeated invocations for the same
    /// video produce separate records.
    pub fn build(request: &VideoRequest, transcript: String, now: i64) -> Result<Self> {
        if transcript.is_empty() {
            return Err(TranscriptorError::EmptyTranscript(request.video_id.clone()));
        }

        Ok(Self {
            pk: format!("{}/{}", TRANSCRIPTION_PK, request.channel_id),
            sk: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            timestamp: now,
            video_id: request.video_id.clone(),
            video_title: request.video_title.clone(),
            video_type: request.video_type,
            genre: request.genre.clone(),
            channel_title: request.channel_title.clone(),
            channel_uri: request.channel_uri.clone(),
            published_at: request.published_at,
            transcript,
        })
    }

    /// Channel id recovered from the partition key
    pub fn channel_id(&self) -> &str {
        self.pk
            .split_once('/')
            .map(|(_, channel_id)| channel_id)
            .unwrap_or(self.pk.as_str())
    }

    pub fn to_video_transcript(&self) -> VideoTranscript {
        VideoTranscript {
            id: self.sk.clone(),
            record_type: RecordType::Transcription,
            channel_id: self.channel_id().to_string(),
            video_type: self.video_type,
            genre: self.genre.clone(),
            video_id: self.video_id.clone(),
            video_title: self.video_title.clone(),
            channel_title: self.channel_title.clone(),
            channel_uri: self.channel_uri.clone(),
            published_at: self.published_at,
            transcript: self.transcript.clone(),
            created_at: self.created_at,
            send_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordType {
    Transcription,
}

/// Success payload handed to the next processing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoTranscript {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: RecordType,
    pub channel_id: String,
    pub video_type: VideoType,
    pub genre: String,
    pub video_id: String,
    pub video_title: String,
    pub channel_title: String,
    pub channel_uri: String,
    pub published_at: i64,
    pub transcript: String,
    pub created_at: i64,
    pub send_at: i64,
}
