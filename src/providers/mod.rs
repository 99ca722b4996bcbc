//! 图像生成适配层 — 通过 trait 对接不同的远程生成服务
//!
//! Image generation adapter layer. Each remote service gets one concrete type
//! implementing [`ImageProvider`]; the registry only ever talks to providers
//! through that trait (`Box<dyn ImageProvider>`).
//!
//! Services that offer more than plain generation expose it through the
//! optional capability traits [`SupportsBackgroundRemoval`] and
//! [`SupportsUpscale`]. Those are called directly on a concretely typed
//! adapter, never through the registry.

pub mod replicate;
pub mod types;

use async_trait::async_trait;

use crate::Result;

pub use replicate::{ReplicateConfig, ReplicateProvider};
pub use types::{
    Capability, GenerationResult, ImageGenerationParams, JobStatus, ModelInfo, PricingTier,
    ProviderInfo,
};

/// Base contract every generation backend implements.
#[async_trait]
pub trait ImageProvider: Send + Sync + std::fmt::Debug {
    /// Static provider description (id, pricing, capabilities, models).
    fn info(&self) -> &ProviderInfo;

    /// Submit a generation and wait for it to reach a terminal state.
    async fn generate_image(&self, params: &ImageGenerationParams) -> Result<GenerationResult>;

    /// Ask the remote service to cancel a job. A running wait loop for the same
    /// job notices on its next status check.
    async fn cancel_generation(&self, job_id: &str) -> Result<()>;

    async fn check_status(&self, job_id: &str) -> Result<JobStatus>;
}

#[async_trait]
pub trait SupportsBackgroundRemoval {
    /// Returns the URL of the cut-out image.
    async fn remove_background(&self, image: &str) -> Result<String>;
}

#[async_trait]
pub trait SupportsUpscale {
    /// Returns the URL of the upscaled image.
    async fn upscale(&self, image: &str, scale: u32) -> Result<String>;
}
