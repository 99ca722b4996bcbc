//! 生成服务注册表 — 按能力和成本档位选择图像生成提供方
//!
//! Provider registry that routes image generation requests to one of several
//! configured adapters. Providers are indexed by the capabilities they declare;
//! a request picks the best enabled provider for its capability according to a
//! [`CostTier`] policy.
//!
//! The registry is an ordinary value owned by the application and passed by
//! reference to whatever issues generation requests. Mutation (`register`,
//! `initialize`, `set_enabled`) needs `&mut self`; generation only needs `&self`,
//! so any number of generations can run concurrently against one registry.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::env;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::providers::{
    Capability, GenerationResult, ImageGenerationParams, ImageProvider, ProviderInfo,
    ReplicateProvider,
};
use crate::{Error, ErrorContext, Result};

/// Provider ids [`ProviderRegistry::initialize`] knows how to construct.
pub const KNOWN_PROVIDERS: &[&str] = &[crate::providers::replicate::PROVIDER_ID];

/// Priority given to providers created by [`ProviderRegistry::initialize`].
pub const DEFAULT_PRIORITY: i32 = 10;

/// Selection policy among several capable providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostTier {
    /// Lowest declared cost first. Undeclared cost counts as free.
    Cheapest,
    /// Lowest priority number first, cost ignored.
    #[default]
    Balanced,
    /// Highest declared cost first, on the assumption that price tracks quality.
    Quality,
}

impl std::str::FromStr for CostTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cheapest" => Ok(Self::Cheapest),
            "balanced" => Ok(Self::Balanced),
            "quality" => Ok(Self::Quality),
            other => Err(Error::validation(format!(
                "Unknown cost tier '{}'. Expected cheapest, balanced or quality",
                other
            ))),
        }
    }
}

/// A registered provider.
#[derive(Debug)]
pub struct ProviderEntry {
    adapter: Box<dyn ImageProvider>,
    info: ProviderInfo,
    enabled: bool,
    priority: i32,
}

impl ProviderEntry {
    pub fn adapter(&self) -> &dyn ImageProvider {
        self.adapter.as_ref()
    }

    pub fn info(&self) -> &ProviderInfo {
        &self.info
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    fn cost(&self) -> f64 {
        self.info.cost_per_unit.unwrap_or(0.0)
    }
}

#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderEntry>,
    /// capability -> provider ids in registration order
    capability_index: HashMap<Capability, Vec<String>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated from a credential map (provider id -> API key).
    pub fn from_credentials(credentials: &HashMap<String, String>) -> Result<Self> {
        let mut registry = Self::new();
        registry.initialize(credentials)?;
        Ok(registry)
    }

    /// Store a provider and index its declared capabilities.
    ///
    /// The index is append-only: registering the same id twice lists it twice.
    /// Call [`clear`](Self::clear) first to start over.
    pub fn register(&mut self, id: impl Into<String>, adapter: Box<dyn ImageProvider>, priority: i32) {
        let id = id.into();
        let info = adapter.info().clone();
        for capability in &info.capabilities {
            self.capability_index
                .entry(*capability)
                .or_default()
                .push(id.clone());
        }
        info!(provider = %id, priority, capabilities = ?info.capabilities, "registered image provider");
        self.providers.insert(
            id,
            ProviderEntry {
                adapter,
                info,
                enabled: true,
                priority,
            },
        );
    }

    pub fn clear(&mut self) {
        self.providers.clear();
        self.capability_index.clear();
    }

    /// Reset the registry and register an adapter for every known provider id
    /// with a non-empty credential. Unknown ids are skipped with a warning.
    pub fn initialize(&mut self, credentials: &HashMap<String, String>) -> Result<()> {
        self.clear();

        let mut ids: Vec<&String> = credentials.keys().collect();
        ids.sort();
        for id in ids {
            let key = credentials[id].trim();
            if key.is_empty() {
                continue;
            }
            match id.as_str() {
                crate::providers::replicate::PROVIDER_ID => {
                    let adapter = ReplicateProvider::new(key)?;
                    self.register(id.clone(), Box::new(adapter), DEFAULT_PRIORITY);
                }
                other => {
                    warn!(provider = other, "no adapter for credential; skipping");
                }
            }
        }
        Ok(())
    }

    /// Soft-disable or re-enable a provider. It stays in the capability index.
    /// Returns false for an unknown id.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> bool {
        match self.providers.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                info!(provider = id, enabled, "provider toggled");
                true
            }
            None => false,
        }
    }

    pub fn entry(&self, id: &str) -> Option<&ProviderEntry> {
        self.providers.get(id)
    }

    /// Direct access to an adapter regardless of its enabled flag.
    pub fn provider(&self, id: &str) -> Option<&dyn ImageProvider> {
        self.providers.get(id).map(ProviderEntry::adapter)
    }

    /// Enabled providers for `capability`, best first according to `tier`.
    pub fn candidates(&self, capability: Capability, tier: CostTier) -> Vec<&ProviderEntry> {
        let Some(ids) = self.capability_index.get(&capability) else {
            return Vec::new();
        };
        let mut entries: Vec<&ProviderEntry> = ids
            .iter()
            .filter_map(|id| self.providers.get(id))
            .filter(|entry| entry.enabled)
            .collect();

        // stable sort: ties keep registration order
        entries.sort_by(|a, b| match tier {
            CostTier::Cheapest => a.cost().total_cmp(&b.cost()),
            CostTier::Quality => b.cost().total_cmp(&a.cost()),
            CostTier::Balanced => a.priority.cmp(&b.priority),
        });
        entries
    }

    pub fn get_provider_for_capability(
        &self,
        capability: Capability,
        tier: CostTier,
    ) -> Option<&dyn ImageProvider> {
        self.candidates(capability, tier)
            .into_iter()
            .next()
            .map(ProviderEntry::adapter)
    }

    /// Route a generation to the best provider for its implied capability.
    ///
    /// Fails with a configuration error, before any network I/O, when no
    /// enabled provider offers that capability. Adapter errors pass through
    /// unchanged; there is no retry here.
    pub async fn generate_image(
        &self,
        params: &ImageGenerationParams,
        tier: CostTier,
    ) -> Result<GenerationResult> {
        let capability = params.capability();
        let provider = self
            .get_provider_for_capability(capability, tier)
            .ok_or_else(|| {
                Error::configuration_with_context(
                    format!(
                        "No image generation provider available for {}. Add an API key for an image provider in Settings.",
                        capability
                    ),
                    ErrorContext::new()
                        .with_field_path("capability")
                        .with_details(capability.to_string())
                        .with_source("registry"),
                )
            })?;

        info!(provider = %provider.info().id, capability = %capability, tier = ?tier, "dispatching image generation");
        provider.generate_image(params).await
    }

    /// Run several generations concurrently. Results come back in input order;
    /// one failure does not affect the others.
    pub async fn generate_batch(
        &self,
        requests: &[ImageGenerationParams],
        tier: CostTier,
    ) -> Vec<Result<GenerationResult>> {
        join_all(requests.iter().map(|params| self.generate_image(params, tier))).await
    }

    /// Info for every registered provider, ordered by priority then id.
    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        let mut entries: Vec<(&String, &ProviderEntry)> = self.providers.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| match a.priority.cmp(&b.priority) {
            Ordering::Equal => a_id.cmp(b_id),
            other => other,
        });
        entries.into_iter().map(|(_, e)| e.info.clone()).collect()
    }

    /// Whether a plain text-to-image request would find a provider.
    pub fn has_generation_capability(&self) -> bool {
        self.get_provider_for_capability(Capability::TextToImage, CostTier::Balanced)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Collect `{ID}_API_KEY` variables for the known provider ids.
pub fn credentials_from_env() -> HashMap<String, String> {
    KNOWN_PROVIDERS
        .iter()
        .filter_map(|id| {
            let var = format!("{}_API_KEY", id.replace('-', "_").to_uppercase());
            env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (id.to_string(), v))
        })
        .collect()
}
