//! Replicate prediction API adapter.
//!
//! Submission is a `POST /v1/predictions` with `Prefer: wait`, so the server may
//! hold the request open and answer with a finished prediction. Otherwise the
//! adapter polls `GET /v1/predictions/{id}` at a fixed interval until the job
//! succeeds, fails, is canceled, or the attempt budget runs out.

use super::types::{
    Capability, GenerationResult, ImageGenerationParams, JobStatus, ModelInfo, PricingTier,
    ProviderInfo,
};
use super::{ImageProvider, SupportsBackgroundRemoval, SupportsUpscale};
use crate::transport::{HttpTransport, JsonResponse};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const PROVIDER_ID: &str = "replicate";
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";
pub const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";
pub const DEFAULT_IMAGE_TO_IMAGE_MODEL: &str = "black-forest-labs/flux-dev";
pub const DEFAULT_REMOVE_BACKGROUND_MODEL: &str = "851-labs/background-remover";
pub const DEFAULT_UPSCALE_MODEL: &str = "nightmareai/real-esrgan";

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;

/// Adapter settings.
///
/// Defaults can be overridden via env:
/// - `REPLICATE_BASE_URL`
/// - `PANELKIT_POLL_INTERVAL_MS` (default 1000)
/// - `PANELKIT_MAX_POLL_ATTEMPTS` (default 120)
/// - `PANELKIT_HTTP_TIMEOUT_SECS` (default 30)
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub base_url: String,
    pub model: String,
    pub image_to_image_model: String,
    pub remove_background_model: String,
    pub upscale_model: String,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
    pub request_timeout: Duration,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            image_to_image_model: DEFAULT_IMAGE_TO_IMAGE_MODEL.to_string(),
            remove_background_model: DEFAULT_REMOVE_BACKGROUND_MODEL.to_string(),
            upscale_model: DEFAULT_UPSCALE_MODEL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("REPLICATE_BASE_URL") {
            if !url.trim().is_empty() {
                config.base_url = url;
            }
        }
        if let Some(ms) = env::var("PANELKIT_POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(n) = env::var("PANELKIT_MAX_POLL_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            config.max_poll_attempts = n;
        }
        config.request_timeout = HttpTransport::timeout_from_env();
        config
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl From<PredictionStatus> for JobStatus {
    fn from(status: PredictionStatus) -> Self {
        match status {
            PredictionStatus::Starting => JobStatus::Pending,
            PredictionStatus::Processing | PredictionStatus::Unknown => JobStatus::Processing,
            PredictionStatus::Succeeded => JobStatus::Completed,
            PredictionStatus::Failed => JobStatus::Failed,
            PredictionStatus::Canceled => JobStatus::Canceled,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl Prediction {
    /// `output` is either a URL or a list of URLs; the first one wins.
    fn output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items.iter().find_map(|v| v.as_str().map(String::from)),
            _ => None,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

/// Replicate-backed image generation.
#[derive(Debug)]
pub struct ReplicateProvider {
    info: ProviderInfo,
    config: ReplicateConfig,
    transport: HttpTransport,
}

impl ReplicateProvider {
    /// Adapter with configuration taken from the environment.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, ReplicateConfig::from_env())
    }

    pub fn with_config(api_key: impl Into<String>, config: ReplicateConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "Replicate API key is empty. Add your Replicate API token in Settings.",
                ErrorContext::new()
                    .with_field_path("credentials.replicate")
                    .with_source(PROVIDER_ID),
            ));
        }
        let transport = HttpTransport::new(&config.base_url, Some(api_key), config.request_timeout)?;
        Ok(Self {
            info: Self::provider_info(),
            config,
            transport,
        })
    }

    pub fn provider_info() -> ProviderInfo {
        ProviderInfo {
            id: PROVIDER_ID.to_string(),
            name: "Replicate".to_string(),
            pricing_tier: PricingTier::Paid,
            cost_per_unit: Some(0.003),
            capabilities: vec![
                Capability::TextToImage,
                Capability::ImageToImage,
                Capability::Upscale,
                Capability::RemoveBackground,
            ],
            models: vec![
                ModelInfo::new(DEFAULT_MODEL, "FLUX.1 [schnell]", vec![Capability::TextToImage]),
                ModelInfo::new(
                    DEFAULT_IMAGE_TO_IMAGE_MODEL,
                    "FLUX.1 [dev]",
                    vec![Capability::TextToImage, Capability::ImageToImage],
                ),
                ModelInfo::new(DEFAULT_UPSCALE_MODEL, "Real-ESRGAN", vec![Capability::Upscale]),
                ModelInfo::new(
                    DEFAULT_REMOVE_BACKGROUND_MODEL,
                    "Background Remover",
                    vec![Capability::RemoveBackground],
                ),
            ],
        }
    }

    pub fn config(&self) -> &ReplicateConfig {
        &self.config
    }

    fn model_for(&self, params: &ImageGenerationParams) -> String {
        if let Some(model) = &params.model {
            return model.clone();
        }
        match params.capability() {
            Capability::ImageToImage => self.config.image_to_image_model.clone(),
            _ => self.config.model.clone(),
        }
    }

    fn build_input(params: &ImageGenerationParams) -> Value {
        let mut input = Map::new();
        input.insert("prompt".into(), Value::String(params.prompt.clone()));
        if let Some(v) = &params.negative_prompt {
            input.insert("negative_prompt".into(), json!(v));
        }
        if let Some(v) = &params.input_image {
            input.insert("image".into(), json!(v));
        }
        match (params.width, params.height) {
            (Some(w), Some(h)) => {
                input.insert("width".into(), json!(w));
                input.insert("height".into(), json!(h));
                input.insert("aspect_ratio".into(), json!("custom"));
            }
            _ => {
                if let Some(v) = &params.aspect_ratio {
                    input.insert("aspect_ratio".into(), json!(v));
                }
            }
        }
        if let Some(v) = params.seed {
            input.insert("seed".into(), json!(v));
        }
        if let Some(v) = params.steps {
            input.insert("num_inference_steps".into(), json!(v));
        }
        if let Some(v) = params.guidance_scale {
            input.insert("guidance_scale".into(), json!(v));
        }
        if let Some(v) = &params.output_format {
            input.insert("output_format".into(), json!(v));
        }
        Value::Object(input)
    }

    /// Submit a prediction and wait for its terminal state.
    async fn run_prediction(&self, model: &str, input: Value) -> Result<Prediction> {
        let prediction = self.submit(model, input).await?;
        self.wait_for_completion(prediction).await
    }

    async fn submit(&self, model: &str, input: Value) -> Result<Prediction> {
        let body = json!({ "version": model, "input": input });
        // hold the request server-side, but return before our own timeout fires
        let wait_secs = self
            .config
            .request_timeout
            .as_secs()
            .saturating_sub(5)
            .clamp(1, 60);
        let prefer = format!("wait={}", wait_secs);
        let response = self
            .transport
            .post_json("/v1/predictions", Some(&body), &[("Prefer", prefer.as_str())])
            .await?;
        let prediction = Self::parse_prediction(response, "Failed to start image generation")?;
        debug!(job_id = %prediction.id, status = ?prediction.status, "prediction submitted");
        Ok(prediction)
    }

    async fn fetch(&self, job_id: &str) -> Result<Prediction> {
        let response = self
            .transport
            .get_json(&format!("/v1/predictions/{}", job_id))
            .await?;
        Self::parse_prediction(response, "Failed to check generation status")
    }

    fn parse_prediction(response: JsonResponse, fallback: &str) -> Result<Prediction> {
        if !response.is_success() {
            return Err(Error::Remote {
                status: response.status,
                message: response
                    .error_message()
                    .unwrap_or_else(|| fallback.to_string()),
            });
        }
        Ok(serde_json::from_value(response.body)?)
    }

    /// Fixed-interval poll loop. No backoff, and a failed status request ends the wait.
    async fn wait_for_completion(&self, mut prediction: Prediction) -> Result<Prediction> {
        let mut attempts: u32 = 0;
        loop {
            match prediction.status {
                PredictionStatus::Succeeded => return Ok(prediction),
                PredictionStatus::Failed => {
                    warn!(job_id = %prediction.id, "prediction failed");
                    return Err(Error::Generation {
                        message: prediction
                            .error_message()
                            .unwrap_or_else(|| "Image generation failed".to_string()),
                        job_id: Some(prediction.id),
                    });
                }
                PredictionStatus::Canceled => {
                    return Err(Error::Generation {
                        message: prediction
                            .error_message()
                            .unwrap_or_else(|| "Image generation was canceled".to_string()),
                        job_id: Some(prediction.id),
                    });
                }
                _ => {}
            }

            if attempts >= self.config.max_poll_attempts {
                warn!(job_id = %prediction.id, attempts, "prediction timed out");
                return Err(Error::Timeout {
                    attempts,
                    waited: self.config.poll_interval * attempts,
                });
            }

            tokio::time::sleep(self.config.poll_interval).await;
            attempts += 1;
            prediction = self.fetch(&prediction.id).await?;
        }
    }

    fn require_output(prediction: &Prediction) -> Result<String> {
        prediction.output_url().ok_or_else(|| Error::Generation {
            message: "Prediction succeeded without an output image".to_string(),
            job_id: Some(prediction.id.clone()),
        })
    }
}

#[async_trait]
impl ImageProvider for ReplicateProvider {
    fn info(&self) -> &ProviderInfo {
        &self.info
    }

    async fn generate_image(&self, params: &ImageGenerationParams) -> Result<GenerationResult> {
        params.validate()?;
        let model = self.model_for(params);
        let started = Instant::now();
        info!(provider = PROVIDER_ID, model = %model, capability = %params.capability(), "submitting image generation");

        let prediction = self
            .run_prediction(&model, Self::build_input(params))
            .await?;
        let url = Self::require_output(&prediction)?;
        let duration = started.elapsed();
        info!(provider = PROVIDER_ID, job_id = %prediction.id, elapsed_ms = duration.as_millis() as u64, "image generation completed");

        Ok(GenerationResult {
            id: prediction.id,
            url,
            prompt: params.prompt.clone(),
            seed: params.seed,
            model,
            provider_id: PROVIDER_ID.to_string(),
            duration,
        })
    }

    async fn cancel_generation(&self, job_id: &str) -> Result<()> {
        let response = self
            .transport
            .post_json(&format!("/v1/predictions/{}/cancel", job_id), None, &[])
            .await?;
        if !response.is_success() {
            return Err(Error::Remote {
                status: response.status,
                message: response
                    .error_message()
                    .unwrap_or_else(|| "Failed to cancel generation".to_string()),
            });
        }
        info!(provider = PROVIDER_ID, job_id, "cancel requested");
        Ok(())
    }

    async fn check_status(&self, job_id: &str) -> Result<JobStatus> {
        Ok(self.fetch(job_id).await?.status.into())
    }
}

#[async_trait]
impl SupportsBackgroundRemoval for ReplicateProvider {
    async fn remove_background(&self, image: &str) -> Result<String> {
        let model = self.config.remove_background_model.clone();
        let prediction = self.run_prediction(&model, json!({ "image": image })).await?;
        Self::require_output(&prediction)
    }
}

#[async_trait]
impl SupportsUpscale for ReplicateProvider {
    async fn upscale(&self, image: &str, scale: u32) -> Result<String> {
        let model = self.config.upscale_model.clone();
        let prediction = self
            .run_prediction(&model, json!({ "image": image, "scale": scale.clamp(1, 10) }))
            .await?;
        Self::require_output(&prediction)
    }
}
