//! The `/chat` and `/session/reset` endpoints.
//!
//! `/chat` accepts the web client's `multipart/form-data` (`text_input` or
//! `audio_data`, optionally `session_id`) as well as JSON and urlencoded
//! bodies with the same field names. The session travels in the
//! `X-Session-Id` header; a fresh one is minted when the caller has none
//! and echoed back in both the header and the body.

use axum::{
    Extension, Form,
    extract::{FromRequest, Multipart, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use nyay_core::session::{CollectedFields, SessionKey};
use nyay_core::speech::Transcript;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{RateLimiter, SharedState};

pub const SESSION_HEADER: &str = "x-session-id";

/// Longest session token accepted from a client.
const MAX_SESSION_ID_LEN: usize = 128;

pub const NOTHING_HEARD_EN: &str = "I couldn't hear anything. Please try speaking again.";
pub const NOTHING_HEARD_HI: &str = "मैं कुछ सुन नहीं पाया। कृपया दोबारा प्रयास करें।";

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub english_response: String,
    pub hindi_response: String,
    pub audio_response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fir_data: Option<CollectedFields>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub status: &'static str,
}

/// Body fields shared by the JSON and urlencoded forms.
#[derive(Debug, Default, Deserialize)]
struct TextBody {
    text_input: Option<String>,
    session_id: Option<String>,
}

/// One parsed `/chat` request.
#[derive(Debug, Default)]
pub struct ChatInput {
    pub text: Option<String>,
    pub audio: Option<Vec<u8>>,
    pub session_id: Option<String>,
}

impl From<TextBody> for ChatInput {
    fn from(body: TextBody) -> Self {
        Self {
            text: body.text_input,
            audio: None,
            session_id: body.session_id,
        }
    }
}

impl ChatInput {
    async fn from_multipart(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut input = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| bad_request(e.body_text()))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("text_input") => {
                    input.text = Some(field.text().await.map_err(|e| bad_request(e.body_text()))?);
                }
                Some("audio_data") => {
                    let bytes = field.bytes().await.map_err(|e| bad_request(e.body_text()))?;
                    input.audio = Some(bytes.to_vec());
                }
                Some("session_id") => {
                    input.session_id =
                        Some(field.text().await.map_err(|e| bad_request(e.body_text()))?);
                }
                other => debug!(field = ?other, "Ignoring unknown form field"),
            }
        }
        Ok(input)
    }

    /// Parse a request body according to its content type.
    pub async fn parse(request: Request) -> Result<Self, ApiError> {
        let content_type = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(request, &())
                .await
                .map_err(|e| bad_request(e.body_text()))?;
            Self::from_multipart(multipart).await
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(body) = Form::<TextBody>::from_request(request, &())
                .await
                .map_err(|e| bad_request(e.body_text()))?;
            Ok(body.into())
        } else {
            let Json(body) = Json::<TextBody>::from_request(request, &())
                .await
                .map_err(|e| bad_request(e.body_text()))?;
            Ok(body.into())
        }
    }
}

/// A usable session token from the `X-Session-Id` header.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(valid_session_id)
}

fn valid_session_id(raw: &str) -> Option<String> {
    let id = raw.trim();
    let ok = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    ok.then(|| id.to_string())
}

/// Count one request against the session's rate budget.
fn check_rate(limiter: &RateLimiter, key: &SessionKey) -> Result<(), ApiError> {
    if limiter.check(key.as_str()) {
        return Ok(());
    }
    warn!(session = %key.as_str().chars().take(36).collect::<String>(), "Rate limit exceeded");
    Err((
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorResponse {
            error: "Too many requests for this session, please wait a moment".into(),
        }),
    ))
}

/// Attach the session header to a JSON response.
fn with_session<T: Serialize>(key: &SessionKey, body: T) -> Response {
    let mut response = Json(body).into_response();
    if let Ok(value) = HeaderValue::from_str(key.as_str()) {
        response.headers_mut().insert(SESSION_HEADER, value);
    }
    response
}

/// Turn recorded audio into an utterance, or the English line to show when
/// that is not possible.
async fn transcribe(state: &SharedState, audio: &[u8]) -> Result<String, String> {
    let Some(speech) = &state.speech else {
        return Err("Error: voice input is not available on this server.".into());
    };
    match speech.transcribe(audio, &state.source_lang).await {
        Ok(Transcript::Text(text)) => Ok(text),
        Ok(Transcript::Empty) => Err(NOTHING_HEARD_EN.into()),
        Err(e) => {
            warn!(error = %e, bytes = audio.len(), "Transcription failed");
            Err(format!("Error during transcription: {e}"))
        }
    }
}

/// Hindi speech for `hindi`, or `None` if synthesis is unavailable or fails.
async fn synthesize(state: &SharedState, hindi: &str) -> Option<String> {
    let speech = state.speech.as_ref()?;
    match speech.synthesize(hindi, &state.target_lang).await {
        Ok(audio) => Some(audio),
        Err(e) => {
            warn!(error = %e, "Speech synthesis failed, replying without audio");
            None
        }
    }
}

/// Rate limited per session once the key is resolved, since the session may
/// only be named in the body.
pub(crate) async fn chat_handler(
    State(state): State<SharedState>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    request: Request,
) -> Result<Response, ApiError> {
    let header_session = session_from_headers(request.headers());
    let input = ChatInput::parse(request).await?;

    let key = header_session
        .or_else(|| input.session_id.as_deref().and_then(valid_session_id))
        .map(SessionKey)
        .unwrap_or_else(SessionKey::generate);
    check_rate(&limiter, &key)?;

    let input_was_audio = input.audio.is_some();
    let utterance = match (input.audio, input.text) {
        (Some(audio), _) => match transcribe(&state, &audio).await {
            Ok(text) => text,
            Err(english) => {
                return Ok(with_session(
                    &key,
                    ChatResponse {
                        session_id: key.to_string(),
                        english_response: english,
                        hindi_response: NOTHING_HEARD_HI.into(),
                        audio_response: None,
                        fir_data: None,
                    },
                ));
            }
        },
        (None, Some(text)) if !text.trim().is_empty() => text,
        _ => return Err(bad_request("Provide either text_input or audio_data")),
    };

    info!(
        session = %key,
        chars = utterance.len(),
        audio = input_was_audio,
        "Chat request"
    );

    let (english, hindi, fir_data, wants_audio) =
        match state.dispatcher.dispatch(&key, &utterance).await {
            Ok(outcome) => {
                let wants_audio = outcome.wants_audio(input_was_audio);
                (outcome.english, outcome.hindi, outcome.fir_data, wants_audio)
            }
            Err(e) => {
                let english = e.fallback_message().to_string();
                let hindi = state.dispatcher.translate(&english).await;
                (english, hindi, None, input_was_audio || e.kind.is_form())
            }
        };

    let audio_response = if wants_audio {
        synthesize(&state, &hindi).await
    } else {
        None
    };

    Ok(with_session(
        &key,
        ChatResponse {
            session_id: key.to_string(),
            english_response: english,
            hindi_response: hindi,
            audio_response,
            fir_data,
        },
    ))
}

/// Abandon the caller's form. The session comes from `X-Session-Id`.
pub(crate) async fn reset_handler(
    State(state): State<SharedState>,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let key = session_from_headers(&headers)
        .map(SessionKey)
        .ok_or_else(|| bad_request("Missing or invalid X-Session-Id header"))?;
    check_rate(&limiter, &key)?;

    state.dispatcher.reset(&key).await;
    Ok(with_session(
        &key,
        ResetResponse {
            session_id: key.to_string(),
            status: "reset",
        },
    ))
}
