//! # panelkit
//!
//! 分镜/绘本页面布局引擎与图像生成服务注册表。
//!
//! Layout engine and image-generation provider registry for comic, manga and
//! storybook page editors.
//!
//! ## Overview
//!
//! A page is a recursive split tree: internal [`SplitNode`]s divide space among
//! their children along one axis, and [`LeafNode`]s hold the actual panel
//! content (text or an image). Editing is copy-on-write: every operation takes
//! the current tree and returns a new one, so a UI can keep rendering the old
//! snapshot while the next one is built.
//!
//! Panel images come from remote generation services. Each service is wrapped
//! in an adapter implementing [`ImageProvider`], and a [`ProviderRegistry`]
//! picks the adapter for a request by capability and [`CostTier`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use panelkit::{preset, tree, CostTier, ImageGenerationParams, ProviderRegistry};
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> panelkit::Result<()> {
//!     let page = preset::find_preset("Two Columns").unwrap().instantiate();
//!     let page = tree::apply_resize(&page, 0, 0.1);
//!
//!     let mut credentials = HashMap::new();
//!     credentials.insert("replicate".to_string(), "r8_...".to_string());
//!     let registry = ProviderRegistry::from_credentials(&credentials)?;
//!
//!     let result = registry
//!         .generate_image(&ImageGenerationParams::new("a fox reading a map"), CostTier::Cheapest)
//!         .await?;
//!
//!     let first = page.as_split().unwrap().children[0].id().clone();
//!     let page = panelkit::document::attach_generated_image(&page, &first, result.url);
//!     println!("{}", serde_json::to_string_pretty(&page)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`tree`] | Panel tree model and editing operations |
//! | [`preset`] | Built-in and user-defined page templates |
//! | [`document`] | Project, page and generation-record persistence model |
//! | [`providers`] | Image provider contract and the Replicate adapter |
//! | [`registry`] | Capability-indexed provider selection |
//! | [`transport`] | JSON-over-HTTP client used by adapters |

pub mod document;
pub mod preset;
pub mod providers;
pub mod registry;
pub mod transport;
pub mod tree;

// Re-export main types for convenience
pub use document::{GenerationRecord, GenerationStatus, Page, Project};
pub use preset::Preset;
pub use providers::{
    Capability, GenerationResult, ImageGenerationParams, ImageProvider, JobStatus, ProviderInfo,
    ReplicateProvider, SupportsBackgroundRemoval, SupportsUpscale,
};
pub use registry::{CostTier, ProviderRegistry};
pub use tree::{LeafNode, Node, NodeId, SplitDirection, SplitNode};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
