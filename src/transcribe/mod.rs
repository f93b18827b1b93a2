use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::provider::{ProviderFactory, YoutubeProviderFactory};
use crate::secrets::{SecretResolver, SecretsManagerResolver};
use crate::storage::{DynamoTranscriptStore, TranscriptStore};
use crate::utils;
use crate::video::{CaptionPreference, VideoRequest};
use crate::{Result, TranscriptorError};

pub mod normalizer;
pub mod record;
pub mod selector;

use record::{TranscriptRecord, VideoTranscript};
use selector::Selection;

/// Uniform failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub error: String,

    /// The invocation input, echoed back untouched
    pub payload: Value,

    pub subject: String,
}

impl ErrorOutput {
    pub fn from_error(error: &TranscriptorError, payload: Value) -> Self {
        Self {
            error: error.to_string(),
            payload,
            subject: error.subject().to_string(),
        }
    }
}

/// What one invocation returns to its caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvocationOutput {
    Transcript(VideoTranscript),
    Error(ErrorOutput),
}

impl InvocationOutput {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationOutput::Transcript(_))
    }
}

/// Expected reasons for not storing a transcript
#[derive(Debug, Clone, PartialEq)]
pub enum NoTranscript {
    /// Caption preference was NONE
    Skipped,
    /// No track of the requested kind in any preferred language
    NotFound,
    /// The chosen track had no text
    Empty,
}

/// Result of a completed pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Stored(TranscriptRecord),
    NoTranscript(NoTranscript),
}

/// Settings the pipeline needs on every invocation
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub table_name: String,
    pub secret_name: String,
    pub languages: Vec<String>,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            table_name: config.aws.table_name.clone(),
            secret_name: config.aws.secret_name.clone(),
            languages: config.transcripts.languages.clone(),
        }
    }
}

/// Main transcription pipeline
pub struct TranscriptionPipeline {
    secrets: Arc<dyn SecretResolver>,
    providers: Arc<dyn ProviderFactory>,
    store: Arc<dyn TranscriptStore>,
    settings: PipelineSettings,
    clock: fn() -> i64,
}

impl TranscriptionPipeline {
    pub fn new(
        secrets: Arc<dyn SecretResolver>,
        providers: Arc<dyn ProviderFactory>,
        store: Arc<dyn TranscriptStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            secrets,
            providers,
            store,
            settings,
            clock: utils::now_millis,
        }
    }

    /// Create a pipeline wired to AWS and YouTube
    pub async fn from_config(config: &Config) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = config.aws_region() {
            loader = loader.region(region);
        }
        let aws_config = loader.load().await;

        Self::new(
            Arc::new(SecretsManagerResolver::from_conf(&aws_config)),
            Arc::new(YoutubeProviderFactory::new(config.transcripts.proxy.clone())),
            Arc::new(DynamoTranscriptStore::from_conf(&aws_config)),
            PipelineSettings::from(config),
        )
    }

    /// Replace the epoch-millisecond clock used to stamp records
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Run one invocation and shape its result into an envelope
    ///
    /// Never fails: every error becomes an [`ErrorOutput`] echoing `event`.
    pub async fn handle(&self, event: Value) -> InvocationOutput {
        let result = match VideoRequest::from_event(&event) {
            Ok(request) => self.run(&request).await.and_then(|outcome| match outcome {
                Outcome::Stored(record) => Ok(record),
                Outcome::NoTranscript(reason) => Err(self.no_transcript_error(&request, reason)),
            }),
            Err(e) => Err(e),
        };

        match result {
            Ok(record) => InvocationOutput::Transcript(record.to_video_transcript()),
            Err(e) => {
                match e {
                    TranscriptorError::TranscriptNotFound { .. }
                    | TranscriptorError::EmptyTranscript(_)
                    | TranscriptorError::TranscriptionSkipped(_) => tracing::warn!("{}", e),
                    _ => tracing::error!("Transcription failed [{}]: {}", e.subject(), e),
                }
                InvocationOutput::Error(ErrorOutput::from_error(&e, event))
            }
        }
    }

    /// Fetch, normalize and persist the transcript for one video
    pub async fn run(&self, request: &VideoRequest) -> Result<Outcome> {
        tracing::info!(
            "Transcribing video {} of channel {} (caption: {})",
            request.video_id,
            request.channel_id,
            request.caption
        );

        if request.caption == CaptionPreference::None {
            tracing::info!("No transcript requested as per caption type NONE");
            return Ok(Outcome::NoTranscript(NoTranscript::Skipped));
        }

        let credentials = self.secrets.resolve(&self.settings.secret_name).await?;
        let provider = self.providers.connect(&credentials)?;

        let candidates = provider.list_transcripts(&request.video_id).await?;
        tracing::info!("Found {} caption tracks", candidates.len());

        let candidate = match selector::select(&candidates, request.caption, &self.settings.languages) {
            Selection::Found(candidate) => candidate,
            Selection::NotFound => {
                tracing::warn!(
                    "No {} transcript in languages {:?}",
                    request.caption,
                    self.settings.languages
                );
                return Ok(Outcome::NoTranscript(NoTranscript::NotFound));
            }
            Selection::Skipped => return Ok(Outcome::NoTranscript(NoTranscript::Skipped)),
        };

        tracing::info!(
            "Fetching {} transcript ({})",
            candidate.language_code,
            request.caption
        );
        let segments = provider.fetch_segments(candidate).await?;

        let transcript = normalizer::normalize(&segments);
        tracing::debug!(
            "Normalized {} segments into {} chars: {}",
            segments.len(),
            transcript.len(),
            utils::preview(&transcript, 80)
        );

        let record = match TranscriptRecord::build(request, transcript, (self.clock)()) {
            Ok(record) => record,
            Err(TranscriptorError::EmptyTranscript(_)) => {
                tracing::warn!("Fetched transcript is empty");
                return Ok(Outcome::NoTranscript(NoTranscript::Empty));
            }
            Err(e) => return Err(e),
        };

        self.store.save(&record, &self.settings.table_name).await?;
        tracing::info!("Stored transcript {}/{}", record.pk, record.sk);

        Ok(Outcome::Stored(record))
    }

    fn no_transcript_error(&self, request: &VideoRequest, reason: NoTranscript) -> TranscriptorError {
        match reason {
            NoTranscript::Skipped => TranscriptorError::TranscriptionSkipped(request.video_id.clone()),
            NoTranscript::NotFound => TranscriptorError::TranscriptNotFound {
                video_id: request.video_id.clone(),
                caption: request.caption,
                languages: self.settings.languages.clone(),
            },
            NoTranscript::Empty => TranscriptorError::EmptyTranscript(request.video_id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{
        candidate, CaptionKind, MockProviderFactory, MockTranscriptProvider, TranscriptProvider, TranscriptSegment,
    };
    use crate::secrets::{MockSecretResolver, ProxyCredentials};
    use crate::storage::MockTranscriptStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    const NOW: i64 = 1_750_000_000_000;

    fn fixed_clock() -> i64 {
        NOW
    }

    fn event(video_id: &str, caption: &str) -> Value {
        json!({
            "videoId": video_id,
            "channelId": "ch1",
            "videoTitle": "Weekly news",
            "videoType": "VIDEO",
            "genre": "SCIENCE",
            "channelTitle": "Science Channel",
            "channelUri": "https://www.youtube.com/channel/ch1",
            "publishedAt": 1_700_000_000_000i64,
            "caption": caption
        })
    }

    fn settings() -> PipelineSettings {
        PipelineSettings {
            table_name: "main-table".to_string(),
            secret_name: "youtube/secrets".to_string(),
            languages: vec!["en".to_string(), "pl".to_string()],
        }
    }

    fn segments(texts: &[&str]) -> Vec<TranscriptSegment> {
        texts
            .iter()
            .map(|text| TranscriptSegment {
                text: text.to_string(),
                start: 0.0,
                duration: 1.0,
            })
            .collect()
    }

    fn secrets_ok() -> MockSecretResolver {
        let mut secrets = MockSecretResolver::new();
        secrets.expect_resolve().returning(|_| {
            Ok(ProxyCredentials {
                username: "user".to_string(),
                password: "pass".to_string(),
            })
        });
        secrets
    }

    fn factory_for(provider: MockTranscriptProvider) -> MockProviderFactory {
        let mut factory = MockProviderFactory::new();
        factory
            .expect_connect()
            .times(1)
            .return_once(move |_| Ok(Box::new(provider) as Box<dyn TranscriptProvider>));
        factory
    }

    fn recording_store(saved: Arc<Mutex<Vec<TranscriptRecord>>>) -> MockTranscriptStore {
        let mut store = MockTranscriptStore::new();
        store.expect_save().returning(move |record, table_name| {
            assert_eq!(table_name, "main-table");
            saved.lock().unwrap().push(record.clone());
            Ok(())
        });
        store
    }

    fn pipeline(
        secrets: MockSecretResolver,
        factory: MockProviderFactory,
        store: MockTranscriptStore,
    ) -> TranscriptionPipeline {
        TranscriptionPipeline::new(Arc::new(secrets), Arc::new(factory), Arc::new(store), settings())
            .with_clock(fixed_clock)
    }

    #[tokio::test]
    async fn test_auto_generated_transcript_is_stored() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_list_transcripts().times(1).returning(|video_id| {
            assert_eq!(video_id, "abc");
            Ok(vec![candidate("en", CaptionKind::Generated)])
        });
        provider
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Ok(segments(&["Hello ", "world"])));

        let saved = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(secrets_ok(), factory_for(provider), recording_store(saved.clone()));

        let output = pipeline.handle(event("abc", "AUTO_GENERATED")).await;
        let transcript = match output {
            InvocationOutput::Transcript(transcript) => transcript,
            other => panic!("expected transcript, got {:?}", other),
        };

        assert_eq!(transcript.transcript, "Hello world");
        assert_eq!(transcript.channel_id, "ch1");
        assert_eq!(transcript.created_at, NOW);
        assert_eq!(transcript.send_at, NOW);

        let value = serde_json::to_value(&transcript).unwrap();
        assert_eq!(value["type"], "TRANSCRIPTION");

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].pk, "TRANSCRIPTION/ch1");
        assert_eq!(saved[0].sk, transcript.id);
        assert_eq!(saved[0].transcript, "Hello world");
    }

    #[tokio::test]
    async fn test_user_generated_uses_manual_track() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_list_transcripts().returning(|_| {
            Ok(vec![
                candidate("en", CaptionKind::Generated),
                candidate("pl", CaptionKind::Manual),
            ])
        });
        provider.expect_fetch_segments().times(1).returning(|candidate| {
            assert_eq!(candidate.language_code, "pl");
            assert_eq!(candidate.kind, CaptionKind::Manual);
            Ok(segments(&["Cześć"]))
        });

        let saved = Arc::new(Mutex::new(Vec::new()));
        let pipeline = pipeline(secrets_ok(), factory_for(provider), recording_store(saved.clone()));

        let output = pipeline.handle(event("abc", "USER_GENERATED")).await;
        assert!(output.is_success());
        assert_eq!(saved.lock().unwrap()[0].transcript, "Cześć");
    }

    #[tokio::test]
    async fn test_caption_none_makes_no_external_calls() {
        let mut secrets = MockSecretResolver::new();
        secrets.expect_resolve().never();
        let mut factory = MockProviderFactory::new();
        factory.expect_connect().never();
        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets, factory, store);
        let input = event("abc", "NONE");

        match pipeline.handle(input.clone()).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.subject, "No transcript found");
                assert_eq!(error.payload, input);
                assert!(error.error.contains("NONE"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_caption_none_ignores_failing_collaborators() {
        let mut secrets = MockSecretResolver::new();
        secrets
            .expect_resolve()
            .returning(|name| Err(TranscriptorError::EmptySecret(name.to_string())));
        let mut factory = MockProviderFactory::new();
        factory.expect_connect().returning(|_| {
            let mut provider = MockTranscriptProvider::new();
            provider.expect_list_transcripts().returning(|video_id| {
                Err(TranscriptorError::NoCaptionsForVideo {
                    video_id: video_id.to_string(),
                    reason: "transcripts are disabled".to_string(),
                })
            });
            Ok(Box::new(provider) as Box<dyn TranscriptProvider>)
        });

        let pipeline = pipeline(secrets, factory, MockTranscriptStore::new());
        let request = VideoRequest::from_event(&event("abc", "NONE")).unwrap();

        let outcome = pipeline.run(&request).await.unwrap();
        assert_eq!(outcome, Outcome::NoTranscript(NoTranscript::Skipped));
    }

    #[tokio::test]
    async fn test_no_candidates_reports_not_found() {
        let mut provider = MockTranscriptProvider::new();
        provider.expect_list_transcripts().returning(|_| Ok(Vec::new()));
        provider.expect_fetch_segments().never();

        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets_ok(), factory_for(provider), store);
        let input = event("xyz", "AUTO_GENERATED");

        match pipeline.handle(input.clone()).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.payload, input);
                assert_eq!(error.subject, "No transcript found");
                assert!(error.error.starts_with("No transcripts found for video xyz"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_secret_stops_before_provider() {
        let mut secrets = MockSecretResolver::new();
        secrets
            .expect_resolve()
            .times(1)
            .returning(|name| Err(TranscriptorError::EmptySecret(name.to_string())));

        let mut factory = MockProviderFactory::new();
        factory.expect_connect().never();

        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets, factory, store);
        let input = event("abc", "AUTO_GENERATED");

        match pipeline.handle(input.clone()).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.subject, "Secret retrieval error");
                assert_eq!(error.payload, input);
                assert!(error.error.contains("youtube/secrets"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_segments_are_not_persisted() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_transcripts()
            .returning(|_| Ok(vec![candidate("en", CaptionKind::Generated)]));
        provider
            .expect_fetch_segments()
            .times(1)
            .returning(|_| Ok(segments(&["", "", ""])));

        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets_ok(), factory_for(provider), store);

        match pipeline.handle(event("abc", "AUTO_GENERATED")).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.subject, "No transcript found");
                assert!(error.error.starts_with("No transcript found"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_provider_failure_is_enveloped() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_transcripts()
            .returning(|_| Err(TranscriptorError::provider("HTTP 429 Too Many Requests")));

        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets_ok(), factory_for(provider), store);

        match pipeline.handle(event("abc", "AUTO_GENERATED")).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.subject, "Transcript provider error");
                assert!(error.error.contains("429"));
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_enveloped() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_transcripts()
            .returning(|_| Ok(vec![candidate("en", CaptionKind::Generated)]));
        provider
            .expect_fetch_segments()
            .returning(|_| Ok(segments(&["text"])));

        let mut store = MockTranscriptStore::new();
        store.expect_save().times(1).returning(|_, table_name| {
            Err(TranscriptorError::PersistenceFailed {
                table: table_name.to_string(),
                reason: "ResourceNotFoundException".to_string(),
                source: None,
            })
        });

        let pipeline = pipeline(secrets_ok(), factory_for(provider), store);

        let output = pipeline.handle(event("abc", "AUTO_GENERATED")).await;
        match output {
            InvocationOutput::Error(error) => assert_eq!(error.subject, "Persistence error"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let mut secrets = MockSecretResolver::new();
        secrets.expect_resolve().never();
        let mut factory = MockProviderFactory::new();
        factory.expect_connect().never();
        let mut store = MockTranscriptStore::new();
        store.expect_save().never();

        let pipeline = pipeline(secrets, factory, store);
        let input = json!({ "videoId": "abc", "caption": "AUTO_GENERATED" });

        match pipeline.handle(input.clone()).await {
            InvocationOutput::Error(error) => {
                assert_eq!(error.subject, "Invalid request");
                assert_eq!(error.payload, input);
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    static TICKS: AtomicI64 = AtomicI64::new(NOW);

    fn ticking_clock() -> i64 {
        TICKS.fetch_add(1, Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_repeated_invocations_store_distinct_records() {
        let saved = Arc::new(Mutex::new(Vec::new()));

        let mut factory = MockProviderFactory::new();
        factory.expect_connect().times(2).returning(|_| {
            let mut provider = MockTranscriptProvider::new();
            provider
                .expect_list_transcripts()
                .returning(|_| Ok(vec![candidate("en", CaptionKind::Generated)]));
            provider
                .expect_fetch_segments()
                .returning(|_| Ok(segments(&["same text"])));
            Ok(Box::new(provider) as Box<dyn TranscriptProvider>)
        });

        let pipeline = TranscriptionPipeline::new(
            Arc::new(secrets_ok()),
            Arc::new(factory),
            Arc::new(recording_store(saved.clone())),
            settings(),
        )
        .with_clock(ticking_clock);

        assert!(pipeline.handle(event("abc", "AUTO_GENERATED")).await.is_success());
        assert!(pipeline.handle(event("abc", "AUTO_GENERATED")).await.is_success());

        let saved = saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_ne!(saved[0].sk, saved[1].sk);
        assert_ne!(saved[0].created_at, saved[1].created_at);
        assert_eq!(saved[0].pk, saved[1].pk);
    }

    #[tokio::test]
    async fn test_run_reports_outcome_variants() {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_list_transcripts()
            .returning(|_| Ok(vec![candidate("de", CaptionKind::Generated)]));

        let pipeline = pipeline(secrets_ok(), factory_for(provider), MockTranscriptStore::new());
        let request = VideoRequest::from_event(&event("abc", "AUTO_GENERATED")).unwrap();

        let outcome = pipeline.run(&request).await.unwrap();
        assert_eq!(outcome, Outcome::NoTranscript(NoTranscript::NotFound));
    }

    #[test]
    fn test_error_output_shape() {
        let payload = json!({ "videoId": "abc" });
        let output = InvocationOutput::Error(ErrorOutput::from_error(
            &TranscriptorError::EmptySecret("s".to_string()),
            payload.clone(),
        ));

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["payload"], payload);
        assert_eq!(value["subject"], "Secret retrieval error");
        assert_eq!(value["error"], "Secret s is empty or has no string payload");
    }
}
