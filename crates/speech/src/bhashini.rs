//! Bhashini ULCA pipeline client.
//!
//! Every task is two calls: a pipeline-config call that resolves the
//! service id, the compute callback URL and its inference key, then the
//! compute call itself. Resolved endpoints are cached per task and language.
//! A compute call rejected with an auth or not-found status, or one whose
//! callback host refuses the connection, drops the cached entry and is
//! retried once against a freshly fetched config.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use nyay_config::SpeechConfig;
use nyay_core::error::SpeechError;
use nyay_core::speech::{SpeechService, Transcript};
use serde_json::{Value, json};
use reqwest::StatusCode;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::ffmpeg::{ASR_SAMPLE_RATE, AudioConverter};

/// Sample rate requested for synthesized speech.
const TTS_SAMPLE_RATE: u32 = 22_050;

/// Pipeline task kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Asr,
    Tts,
}

impl Task {
    fn as_str(self) -> &'static str {
        match self {
            Task::Asr => "asr",
            Task::Tts => "tts",
        }
    }
}

/// Where and how to call a resolved compute service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineEndpoint {
    pub service_id: String,
    pub callback_url: String,
    pub auth_header: String,
    pub auth_value: String,
}

impl PipelineEndpoint {
    /// Extract the endpoint from a `getModelsPipeline` response.
    pub fn from_config_response(task: Task, body: &Value) -> Result<Self, SpeechError> {
        let missing = |what: &str| SpeechError::PipelineConfig {
            task: task.as_str().into(),
            reason: format!("response has no {what}"),
        };

        let service_id = body["pipelineResponseConfig"][0]["config"][0]["serviceId"]
            .as_str()
            .ok_or_else(|| missing("serviceId"))?;
        let endpoint = &body["pipelineInferenceAPIEndPoint"];
        let callback_url = endpoint["callbackUrl"]
            .as_str()
            .ok_or_else(|| missing("callbackUrl"))?;
        let auth_header = endpoint["inferenceApiKey"]["name"]
            .as_str()
            .ok_or_else(|| missing("inferenceApiKey.name"))?;
        let auth_value = endpoint["inferenceApiKey"]["value"]
            .as_str()
            .ok_or_else(|| missing("inferenceApiKey.value"))?;

        Ok(Self {
            service_id: service_id.into(),
            callback_url: callback_url.into(),
            auth_header: auth_header.into(),
            auth_value: auth_value.into(),
        })
    }
}

fn config_payload(task: Task, lang: &str, pipeline_id: &str) -> Value {
    json!({
        "pipelineTasks": [{
            "taskType": task.as_str(),
            "config": {"language": {"sourceLanguage": lang}}
        }],
        "pipelineRequestConfig": {"pipelineId": pipeline_id}
    })
}

fn asr_payload(service_id: &str, lang: &str, wav_base64: String) -> Value {
    json!({
        "pipelineTasks": [{
            "taskType": "asr",
            "config": {
                "language": {"sourceLanguage": lang},
                "serviceId": service_id,
                "audioFormat": "wav",
                "samplingRate": ASR_SAMPLE_RATE,
                "preProcessors": ["vad"]
            }
        }],
        "inputData": {"audio": [{"audioContent": wav_base64}]}
    })
}

fn tts_payload(service_id: &str, lang: &str, text: &str) -> Value {
    json!({
        "pipelineTasks": [{
            "taskType": "tts",
            "config": {
                "language": {"sourceLanguage": lang},
                "serviceId": service_id,
                "gender": "female",
                "samplingRate": TTS_SAMPLE_RATE,
                "audioFormat": "wav"
            }
        }],
        "inputData": {"input": [{"source": text}]}
    })
}

/// Read the transcript out of an ASR compute response.
///
/// A missing `output` array or blank text both mean nothing was heard.
fn parse_asr_response(body: &Value) -> Result<Transcript, SpeechError> {
    let output = &body["pipelineResponse"][0]["output"];
    match output.as_array() {
        None => Ok(Transcript::Empty),
        Some(items) if items.is_empty() => Ok(Transcript::Empty),
        Some(items) => {
            let text = items[0]["source"].as_str().ok_or_else(|| {
                SpeechError::MalformedResponse("ASR output has no 'source' text".into())
            })?;
            Ok(Transcript::from_raw(text))
        }
    }
}

/// Read the base64 audio out of a TTS compute response.
fn parse_tts_response(body: &Value) -> Result<String, SpeechError> {
    body["pipelineResponse"][0]["audio"][0]["audioContent"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| SpeechError::MalformedResponse("TTS response has no audioContent".into()))
}

/// Why a compute call failed, and whether the endpoint behind it has gone stale.
#[derive(Debug)]
enum ComputeError {
    /// The key was revoked or the callback moved; refetch the config.
    Stale(SpeechError),
    Failed(SpeechError),
}

fn is_stale_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
    )
}

/// Client for the Bhashini ASR/TTS pipeline.
pub struct BhashiniClient {
    user_id: String,
    api_key: String,
    pipeline_id: String,
    config_url: String,
    client: reqwest::Client,
    converter: AudioConverter,
    endpoints: RwLock<HashMap<(Task, String), PipelineEndpoint>>,
}

impl BhashiniClient {
    pub fn new(
        user_id: impl Into<String>,
        api_key: impl Into<String>,
        pipeline_id: impl Into<String>,
        config_url: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            api_key: api_key.into(),
            pipeline_id: pipeline_id.into(),
            config_url: config_url.into(),
            client: reqwest::Client::new(),
            converter: AudioConverter::default(),
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Build from the `[speech]` config section.
    pub fn from_config(config: &SpeechConfig) -> Result<Self, SpeechError> {
        let (Some(user_id), Some(api_key), Some(pipeline_id)) = (
            config.user_id.as_ref(),
            config.ulca_api_key.as_ref(),
            config.pipeline_id.as_ref(),
        ) else {
            return Err(SpeechError::NotConfigured(
                "set BHASHINI_USER_ID, BHASHINI_ULCA_API_KEY and BHASHINI_PIPELINE_ID".into(),
            ));
        };

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Ok(Self {
            client,
            converter: AudioConverter::new(&config.ffmpeg_path),
            ..Self::new(user_id, api_key, pipeline_id, &config.pipeline_config_url)
        })
    }

    /// Resolve (or reuse) the compute endpoint for a task and language.
    async fn endpoint(&self, task: Task, lang: &str) -> Result<PipelineEndpoint, SpeechError> {
        let key = (task, lang.to_string());
        if let Some(cached) = self.endpoints.read().await.get(&key) {
            return Ok(cached.clone());
        }

        debug!(task = task.as_str(), lang, "Fetching pipeline config");
        let response = self
            .client
            .post(&self.config_url)
            .header("userID", &self.user_id)
            .header("ulcaApiKey", &self.api_key)
            .json(&config_payload(task, lang, &self.pipeline_id))
            .send()
            .await
            .map_err(|e| SpeechError::PipelineConfig {
                task: task.as_str().into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(task = task.as_str(), %status, %body, "Pipeline config call failed");
            return Err(SpeechError::PipelineConfig {
                task: task.as_str().into(),
                reason: format!("status {status}"),
            });
        }

        let body: Value = response.json().await.map_err(|e| SpeechError::PipelineConfig {
            task: task.as_str().into(),
            reason: e.to_string(),
        })?;
        let endpoint = PipelineEndpoint::from_config_response(task, &body)?;

        self.endpoints.write().await.insert(key, endpoint.clone());
        Ok(endpoint)
    }

    async fn compute(
        &self,
        endpoint: &PipelineEndpoint,
        payload: &Value,
    ) -> Result<Value, ComputeError> {
        let response = self
            .client
            .post(&endpoint.callback_url)
            .header(endpoint.auth_header.as_str(), &endpoint.auth_value)
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let err = SpeechError::Request(e.to_string());
                if e.is_connect() {
                    ComputeError::Stale(err)
                } else {
                    ComputeError::Failed(err)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "Compute call failed");
            let err = SpeechError::Request(format!("compute call returned {status}"));
            return Err(if is_stale_status(status) {
                ComputeError::Stale(err)
            } else {
                ComputeError::Failed(err)
            });
        }

        response
            .json()
            .await
            .map_err(|e| ComputeError::Failed(SpeechError::MalformedResponse(e.to_string())))
    }

    /// Resolve the endpoint for `task` and run one compute call against it.
    ///
    /// A stale endpoint is evicted and the call retried once with a fresh
    /// pipeline config.
    async fn run<F>(&self, task: Task, lang: &str, payload: F) -> Result<Value, SpeechError>
    where
        F: Fn(&PipelineEndpoint) -> Value,
    {
        let endpoint = self.endpoint(task, lang).await?;
        match self.compute(&endpoint, &payload(&endpoint)).await {
            Ok(body) => Ok(body),
            Err(ComputeError::Stale(e)) => {
                warn!(task = task.as_str(), lang, error = %e, "Cached endpoint rejected, refreshing pipeline config");
                self.evict(task, lang).await;
                let fresh = self.endpoint(task, lang).await?;
                match self.compute(&fresh, &payload(&fresh)).await {
                    Ok(body) => Ok(body),
                    Err(ComputeError::Stale(e)) => {
                        self.evict(task, lang).await;
                        Err(e)
                    }
                    Err(ComputeError::Failed(e)) => Err(e),
                }
            }
            Err(ComputeError::Failed(e)) => Err(e),
        }
    }

    async fn evict(&self, task: Task, lang: &str) {
        self.endpoints.write().await.remove(&(task, lang.to_string()));
    }
}

#[async_trait]
impl SpeechService for BhashiniClient {
    fn name(&self) -> &str {
        "bhashini"
    }

    async fn transcribe(&self, audio: &[u8], source_lang: &str) -> Result<Transcript, SpeechError> {
        info!(lang = source_lang, bytes = audio.len(), "Starting transcription");
        let wav = BASE64.encode(self.converter.to_wav(audio).await?);
        let body = self
            .run(Task::Asr, source_lang, |endpoint| {
                asr_payload(&endpoint.service_id, source_lang, wav.clone())
            })
            .await?;
        let transcript = parse_asr_response(&body)?;

        match &transcript {
            Transcript::Text(text) => info!(chars = text.chars().count(), "Transcription succeeded"),
            Transcript::Empty => info!("Transcription was empty"),
        }
        Ok(transcript)
    }

    async fn synthesize(&self, text: &str, target_lang: &str) -> Result<String, SpeechError> {
        info!(lang = target_lang, chars = text.chars().count(), "Starting speech synthesis");
        let body = self
            .run(Task::Tts, target_lang, |endpoint| {
                tts_payload(&endpoint.service_id, target_lang, text)
            })
            .await?;
        parse_tts_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_response() -> Value {
        json!({
            "pipelineResponseConfig": [{"config": [{"serviceId": "ai4bharat/conformer-en"}]}],
            "pipelineInferenceAPIEndPoint": {
                "callbackUrl": "https://dhruva.example/services/inference/pipeline",
                "inferenceApiKey": {"name": "Authorization", "value": "secret-token"}
            }
        })
    }

    #[test]
    fn endpoint_parsed_from_config_response() {
        let endpoint = PipelineEndpoint::from_config_response(Task::Asr, &config_response()).unwrap();
        assert_eq!(endpoint.service_id, "ai4bharat/conformer-en");
        assert_eq!(endpoint.auth_header, "Authorization");
        assert_eq!(endpoint.auth_value, "secret-token");
        assert!(endpoint.callback_url.ends_with("/pipeline"));
    }

    #[test]
    fn endpoint_missing_service_id_is_config_error() {
        let err = PipelineEndpoint::from_config_response(Task::Tts, &json!({})).unwrap_err();
        match err {
            SpeechError::PipelineConfig { task, reason } => {
                assert_eq!(task, "tts");
                assert!(reason.contains("serviceId"));
            }
            other => panic!("expected PipelineConfig, got {other:?}"),
        }
    }

    #[test]
    fn config_payload_names_task_and_pipeline() {
        let payload = config_payload(Task::Tts, "hi", "pipe-1");
        assert_eq!(payload["pipelineTasks"][0]["taskType"], "tts");
        assert_eq!(payload["pipelineTasks"][0]["config"]["language"]["sourceLanguage"], "hi");
        assert_eq!(payload["pipelineRequestConfig"]["pipelineId"], "pipe-1");
    }

    #[test]
    fn asr_payload_uses_vad_and_16k() {
        let payload = asr_payload("svc", "en", "UklGRg==".into());
        let config = &payload["pipelineTasks"][0]["config"];
        assert_eq!(config["samplingRate"], 16000);
        assert_eq!(config["preProcessors"][0], "vad");
        assert_eq!(payload["inputData"]["audio"][0]["audioContent"], "UklGRg==");
    }

    #[test]
    fn tts_payload_requests_female_voice() {
        let payload = tts_payload("svc", "hi", "नमस्ते");
        assert_eq!(payload["pipelineTasks"][0]["config"]["gender"], "female");
        assert_eq!(payload["pipelineTasks"][0]["config"]["samplingRate"], 22050);
        assert_eq!(payload["inputData"]["input"][0]["source"], "नमस्ते");
    }

    #[test]
    fn asr_response_text() {
        let body = json!({"pipelineResponse": [{"output": [{"source": "fill fir form"}]}]});
        assert_eq!(
            parse_asr_response(&body).unwrap(),
            Transcript::Text("fill fir form".into())
        );
    }

    #[test]
    fn asr_response_without_output_is_empty() {
        assert_eq!(parse_asr_response(&json!({})).unwrap(), Transcript::Empty);
        let blank = json!({"pipelineResponse": [{"output": [{"source": "  "}]}]});
        assert_eq!(parse_asr_response(&blank).unwrap(), Transcript::Empty);
    }

    #[test]
    fn tts_response_audio() {
        let body = json!({"pipelineResponse": [{"audio": [{"audioContent": "UklGRg=="}]}]});
        assert_eq!(parse_tts_response(&body).unwrap(), "UklGRg==");
        assert!(parse_tts_response(&json!({"pipelineResponse": []})).is_err());
    }

    #[test]
    fn from_config_requires_credentials() {
        let config = SpeechConfig::default();
        assert!(matches!(
            BhashiniClient::from_config(&config),
            Err(SpeechError::NotConfigured(_))
        ));
    }

    #[test]
    fn from_config_with_credentials() {
        let config = SpeechConfig {
            user_id: Some("user".into()),
            ulca_api_key: Some("key".into()),
            pipeline_id: Some("pipe".into()),
            ..SpeechConfig::default()
        };
        let client = BhashiniClient::from_config(&config).unwrap();
        assert_eq!(client.name(), "bhashini");
        assert_eq!(client.pipeline_id, "pipe");
    }

    mod rotation {
        use super::*;
        use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};

        /// Local stand-in for Bhashini. Config call N hands out `key-N`;
        /// compute accepts only `valid_key`.
        struct Stub {
            config_calls: AtomicUsize,
            valid_key: Mutex<String>,
            forced_status: Mutex<Option<StatusCode>>,
        }

        type StubState = State<(Arc<Stub>, String)>;

        async fn pipeline_config(State((stub, base)): StubState) -> Json<Value> {
            let n = stub.config_calls.fetch_add(1, Ordering::SeqCst) + 1;
            Json(json!({
                "pipelineResponseConfig": [{"config": [{"serviceId": "tts-svc"}]}],
                "pipelineInferenceAPIEndPoint": {
                    "callbackUrl": format!("{base}/compute"),
                    "inferenceApiKey": {"name": "Authorization", "value": format!("key-{n}")}
                }
            }))
        }

        async fn pipeline_compute(
            State((stub, _)): StubState,
            headers: HeaderMap,
        ) -> (StatusCode, Json<Value>) {
            if let Some(status) = *stub.forced_status.lock().unwrap() {
                return (status, Json(json!({})));
            }
            let key = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            if key != *stub.valid_key.lock().unwrap() {
                return (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid key"})));
            }
            (
                StatusCode::OK,
                Json(json!({"pipelineResponse": [{"audio": [{"audioContent": "UklGRg=="}]}]})),
            )
        }

        async fn serve() -> (Arc<Stub>, BhashiniClient) {
            let stub = Arc::new(Stub {
                config_calls: AtomicUsize::new(0),
                valid_key: Mutex::new("key-1".into()),
                forced_status: Mutex::new(None),
            });
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base = format!("http://{}", listener.local_addr().unwrap());
            let app = Router::new()
                .route("/config", post(pipeline_config))
                .route("/compute", post(pipeline_compute))
                .with_state((stub.clone(), base.clone()));
            tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

            let client = BhashiniClient::new("user", "ulca-key", "pipe", format!("{base}/config"));
            (stub, client)
        }

        fn config_calls(stub: &Stub) -> usize {
            stub.config_calls.load(Ordering::SeqCst)
        }

        #[tokio::test]
        async fn endpoint_is_cached_between_calls() {
            let (stub, client) = serve().await;
            assert_eq!(client.synthesize("नमस्ते", "hi").await.unwrap(), "UklGRg==");
            assert_eq!(client.synthesize("नमस्ते", "hi").await.unwrap(), "UklGRg==");
            assert_eq!(config_calls(&stub), 1);
        }

        #[tokio::test]
        async fn rotated_key_refreshes_endpoint_once() {
            let (stub, client) = serve().await;
            client.synthesize("one", "hi").await.unwrap();

            *stub.valid_key.lock().unwrap() = "key-2".into();
            assert_eq!(client.synthesize("two", "hi").await.unwrap(), "UklGRg==");
            assert_eq!(config_calls(&stub), 2);

            // The refreshed endpoint is cached in turn.
            client.synthesize("three", "hi").await.unwrap();
            assert_eq!(config_calls(&stub), 2);
        }

        #[tokio::test]
        async fn revoked_key_retries_only_once() {
            let (stub, client) = serve().await;
            client.synthesize("one", "hi").await.unwrap();

            *stub.valid_key.lock().unwrap() = "revoked".into();
            let err = client.synthesize("two", "hi").await.unwrap_err();
            assert!(matches!(err, SpeechError::Request(ref m) if m.contains("401")));
            assert_eq!(config_calls(&stub), 2);

            // The rejected endpoint is not kept, so the next call fetches again.
            *stub.valid_key.lock().unwrap() = "key-3".into();
            client.synthesize("three", "hi").await.unwrap();
            assert_eq!(config_calls(&stub), 3);
        }

        #[tokio::test]
        async fn server_error_keeps_cached_endpoint() {
            let (stub, client) = serve().await;
            client.synthesize("one", "hi").await.unwrap();

            *stub.forced_status.lock().unwrap() = Some(StatusCode::INTERNAL_SERVER_ERROR);
            assert!(client.synthesize("two", "hi").await.is_err());
            assert_eq!(config_calls(&stub), 1);

            *stub.forced_status.lock().unwrap() = None;
            client.synthesize("three", "hi").await.unwrap();
            assert_eq!(config_calls(&stub), 1);
        }

        #[test]
        fn stale_statuses() {
            assert!(is_stale_status(StatusCode::UNAUTHORIZED));
            assert!(is_stale_status(StatusCode::NOT_FOUND));
            assert!(!is_stale_status(StatusCode::INTERNAL_SERVER_ERROR));
            assert!(!is_stale_status(StatusCode::TOO_MANY_REQUESTS));
        }
    }
}
