use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONNECTION, COOKIE};
use scraper::{Html, Selector};
use serde_json::{json, Value};

use super::proxy::WebshareProxy;
use super::{CaptionKind, TranscriptCandidate, TranscriptProvider, TranscriptSegment};
use crate::utils::remove_query_param;
use crate::{Result, TranscriptorError};

const WATCH_URL: &str = "https://www.youtube.com/watch?v=";
const INNERTUBE_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";

const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const BOT_CHECK_REASON: &str = "Sign in to confirm you’re not a bot";
const PO_TOKEN_MARKER: &str = "&exp=xpe";

/// YouTube caption client using the innertube player API
pub struct YoutubeTranscriptClient {
    http: reqwest::Client,
}

impl YoutubeTranscriptClient {
    pub fn new(proxy: Option<&WebshareProxy>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US"));

        let mut builder = reqwest::Client::builder();

        if let Some(proxy) = proxy {
            // Fresh connection per request so the proxy rotates the exit IP
            headers.insert(CONNECTION, HeaderValue::from_static("close"));
            builder = builder.proxy(proxy.to_reqwest()?);
        }

        let http = builder
            .default_headers(headers)
            .build()
            .map_err(|e| TranscriptorError::provider_with("failed to build HTTP client", e))?;

        Ok(Self { http })
    }

    /// Fetch the watch page, accepting the cookie consent interstitial if shown
    async fn fetch_watch_html(&self, video_id: &str) -> Result<String> {
        let url = format!("{}{}", WATCH_URL, video_id);
        let html = self.get_text(&url, None).await?;

        let Some(cookie) = consent_retry_cookie(&html)? else {
            return Ok(html);
        };

        tracing::debug!("Consent interstitial shown for {}, retrying with cookie", video_id);
        let html = self.get_text(&url, Some(&cookie)).await?;
        ensure_consent_accepted(&html)?;

        Ok(html)
    }

    async fn fetch_player(&self, video_id: &str, api_key: &str) -> Result<Value> {
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self
            .http
            .post(INNERTUBE_PLAYER_URL)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| TranscriptorError::provider_with("innertube player request failed", e))?;

        if !response.status().is_success() {
            return Err(TranscriptorError::provider(format!(
                "innertube player request failed: HTTP {}",
                response.status()
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| TranscriptorError::provider_with("invalid innertube player response", e))
    }

    async fn get_text(&self, url: &str, cookie: Option<&str>) -> Result<String> {
        let mut request = self.http.get(url);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request
            .send()
            .await
            .map_err(|e| TranscriptorError::provider_with(format!("request to {} failed", url), e))?;

        if !response.status().is_success() {
            return Err(TranscriptorError::provider(format!(
                "request to {} failed: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| TranscriptorError::provider_with(format!("failed to read response from {}", url), e))
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeTranscriptClient {
    async fn list_transcripts(&self, video_id: &str) -> Result<Vec<TranscriptCandidate>> {
        tracing::debug!("Listing caption tracks for: {}", video_id);

        let html = self.fetch_watch_html(video_id).await?;
        let api_key = api_key_or_block(&html, video_id)?;

        let player = self.fetch_player(video_id, &api_key).await?;
        check_playability(video_id, &player)?;

        let candidates = parse_caption_tracks(video_id, &player)?;
        tracing::debug!("Found {} caption tracks for {}", candidates.len(), video_id);

        Ok(candidates)
    }

    async fn fetch_segments(&self, candidate: &TranscriptCandidate) -> Result<Vec<TranscriptSegment>> {
        ensure_no_po_token(candidate)?;

        let xml = self.get_text(&candidate.url, None).await?;
        Ok(parse_timed_text(&xml))
    }
}

/// Extract the innertube API key embedded in the watch page
pub fn extract_api_key(html: &str) -> Option<String> {
    let pattern = Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).ok()?;
    pattern
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|key| key.as_str().to_string())
}

/// Build the cookie that accepts YouTube's consent form
pub fn consent_cookie(html: &str) -> Option<String> {
    let pattern = Regex::new(r#"name="v" value="(.*?)""#).ok()?;
    pattern
        .captures(html)
        .and_then(|captures| captures.get(1))
        .map(|value| format!("CONSENT=YES+{}", value.as_str()))
}

/// Cookie to retry with when `html` is the consent interstitial
///
/// `None` means the page is the real watch page.
fn consent_retry_cookie(html: &str) -> Result<Option<String>> {
    if !html.contains(CONSENT_FORM_MARKER) {
        return Ok(None);
    }

    consent_cookie(html)
        .map(Some)
        .ok_or_else(|| TranscriptorError::provider("failed to create consent cookie"))
}

fn ensure_consent_accepted(html: &str) -> Result<()> {
    if html.contains(CONSENT_FORM_MARKER) {
        return Err(TranscriptorError::provider("consent cookie was not accepted"));
    }
    Ok(())
}

/// Innertube API key from the watch page, or the reason it is missing
fn api_key_or_block(html: &str, video_id: &str) -> Result<String> {
    match extract_api_key(html) {
        Some(key) => Ok(key),
        None if html.contains(RECAPTCHA_MARKER) => {
            Err(TranscriptorError::provider("request blocked by YouTube (reCAPTCHA)"))
        }
        None => Err(TranscriptorError::provider(format!(
            "could not extract innertube API key for video {}",
            video_id
        ))),
    }
}

fn ensure_no_po_token(candidate: &TranscriptCandidate) -> Result<()> {
    if candidate.url.contains(PO_TOKEN_MARKER) {
        return Err(TranscriptorError::provider(format!(
            "caption track {} of video {} requires a PO token",
            candidate.language_code, candidate.video_id
        )));
    }
    Ok(())
}

fn check_playability(video_id: &str, player: &Value) -> Result<()> {
    let status = &player["playabilityStatus"];
    let state = status["status"].as_str().unwrap_or("OK");

    if state == "OK" {
        return Ok(());
    }

    let reason = status["reason"].as_str().unwrap_or("video is unplayable");

    if state == "LOGIN_REQUIRED" && reason == BOT_CHECK_REASON {
        return Err(TranscriptorError::provider("request blocked by YouTube bot check"));
    }

    Err(TranscriptorError::NoCaptionsForVideo {
        video_id: video_id.to_string(),
        reason: format!("{} ({})", reason, state),
    })
}

/// Turn the player response's caption track list into candidates
pub fn parse_caption_tracks(video_id: &str, player: &Value) -> Result<Vec<TranscriptCandidate>> {
    let tracks = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"]
        .as_array()
        .ok_or_else(|| TranscriptorError::NoCaptionsForVideo {
            video_id: video_id.to_string(),
            reason: "transcripts are disabled for this video".to_string(),
        })?;

    let candidates = tracks
        .iter()
        .filter_map(|track| {
            let base_url = track["baseUrl"].as_str()?;
            let language_code = track["languageCode"].as_str()?.to_string();

            let language = track["name"]["runs"][0]["text"]
                .as_str()
                .or_else(|| track["name"]["simpleText"].as_str())
                .unwrap_or(language_code.as_str())
                .to_string();

            let kind = if track["kind"].as_str() == Some("asr") {
                CaptionKind::Generated
            } else {
                CaptionKind::Manual
            };

            Some(TranscriptCandidate {
                video_id: video_id.to_string(),
                language_code,
                language,
                kind,
                is_translatable: track["isTranslatable"].as_bool().unwrap_or(false),
                url: remove_query_param(base_url, "fmt"),
            })
        })
        .collect();

    Ok(candidates)
}

/// Parse a timed-text document into segments
///
/// Element text is HTML-decoded once more and inline formatting tags (`<i>`, `<b>`, ...)
/// are dropped. Elements without any text are skipped.
pub fn parse_timed_text(xml: &str) -> Vec<TranscriptSegment> {
    let document = Html::parse_document(xml);
    let selector = Selector::parse("text").unwrap_or_else(|_| unreachable!());

    document
        .select(&selector)
        .filter_map(|element| {
            let raw: String = element.text().collect();
            if raw.is_empty() {
                return None;
            }

            let attr = |name: &str| {
                element
                    .value()
                    .attr(name)
                    .and_then(|value| value.parse::<f64>().ok())
                    .unwrap_or(0.0)
            };

            Some(TranscriptSegment {
                text: strip_markup(&raw),
                start: attr("start"),
                duration: attr("dur"),
            })
        })
        .collect()
}

fn strip_markup(text: &str) -> String {
    Html::parse_fragment(text).root_element().text().collect()
}
