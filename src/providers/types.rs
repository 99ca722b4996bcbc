//! Request and response types shared by all image providers.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A named generation function a provider may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    TextToImage,
    ImageToImage,
    Upscale,
    RemoveBackground,
    Inpainting,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextToImage => "text-to-image",
            Self::ImageToImage => "image-to-image",
            Self::Upscale => "upscale",
            Self::RemoveBackground => "remove-bg",
            Self::Inpainting => "inpainting",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingTier {
    Free,
    Paid,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub capabilities: Vec<Capability>,
}

impl ModelInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities,
        }
    }
}

/// Static description of a provider, fixed at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    pub name: String,
    pub pricing_tier: PricingTier,
    /// Approximate cost of one generation in USD. `None` when the provider does not declare it.
    #[serde(default)]
    pub cost_per_unit: Option<f64>,
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub models: Vec<ModelInfo>,
}

impl ProviderInfo {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Parameters for a single image generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    /// Source image URL (or data URI). Presence selects image-to-image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_image: Option<String>,
    /// e.g. "16:9". Ignored by providers when width and height are both set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance_scale: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
    /// Provider-specific model override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ImageGenerationParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn negative_prompt(mut self, negative: impl Into<String>) -> Self {
        self.negative_prompt = Some(negative.into());
        self
    }

    pub fn input_image(mut self, image: impl Into<String>) -> Self {
        self.input_image = Some(image.into());
        self
    }

    pub fn aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.aspect_ratio = Some(ratio.into());
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn guidance_scale(mut self, scale: f32) -> Self {
        self.guidance_scale = Some(scale);
        self
    }

    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Capability implied by the request shape.
    pub fn capability(&self) -> Capability {
        if self.input_image.is_some() {
            Capability::ImageToImage
        } else {
            Capability::TextToImage
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(Error::validation_with_context(
                "Prompt must not be empty",
                ErrorContext::new()
                    .with_field_path("params.prompt")
                    .with_source("image_generation"),
            ));
        }
        if matches!(self.width, Some(0)) || matches!(self.height, Some(0)) {
            return Err(Error::validation_with_context(
                "Width and height must be positive",
                ErrorContext::new()
                    .with_field_path("params.width")
                    .with_source("image_generation"),
            ));
        }
        Ok(())
    }
}

/// Normalized output of a finished generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Remote job id.
    pub id: String,
    pub url: String,
    pub prompt: String,
    pub seed: Option<u64>,
    pub model: String,
    pub provider_id: String,
    /// Wall-clock time from submission to terminal state.
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}
