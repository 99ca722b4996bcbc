//! Project documents and generation records.
//!
//! This is the shape the persistence layer stores: a project owns an ordered
//! list of pages, each page owns exactly one tree. Generated images are tracked
//! separately as [`GenerationRecord`]s and surface into a leaf through
//! [`attach_generated_image`].

use crate::preset::Preset;
use crate::providers::GenerationResult;
use crate::tree::{self, ContentType, Node, NodeId};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub root: Node,
}

impl Page {
    pub fn from_preset(preset: &Preset) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            root: preset.instantiate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub pages: Vec<Page>,
    /// Unix epoch milliseconds.
    pub created_at: u64,
    pub updated_at: u64,
}

impl Project {
    /// New project with a single page built from `preset`.
    pub fn new(name: impl Into<String>, preset: &Preset) -> Self {
        let now = now_millis();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
            pages: vec![Page::from_preset(preset)],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a page and return its id.
    pub fn add_page(&mut self, preset: &Preset) -> String {
        let page = Page::from_preset(preset);
        let id = page.id.clone();
        self.pages.push(page);
        self.touch();
        id
    }

    /// Remove a page. The last remaining page is never removed.
    pub fn remove_page(&mut self, page_id: &str) -> bool {
        if self.pages.len() <= 1 {
            return false;
        }
        let before = self.pages.len();
        self.pages.retain(|p| p.id != page_id);
        let removed = self.pages.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn page(&self, page_id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == page_id)
    }

    pub fn page_mut(&mut self, page_id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == page_id)
    }

    /// Replace a page's tree with `edit(current)`. Returns false for an unknown page.
    pub fn apply<F>(&mut self, page_id: &str, edit: F) -> bool
    where
        F: FnOnce(&Node) -> Node,
    {
        let Some(page) = self.pages.iter_mut().find(|p| p.id == page_id) else {
            return false;
        };
        page.root = edit(&page.root);
        self.touch();
        true
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a project and check every page tree.
    pub fn from_json(content: &str) -> Result<Self> {
        let project: Project = serde_json::from_str(content)?;
        project.validate()?;
        Ok(project)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pages.is_empty() {
            return Err(Error::validation_with_context(
                "Project has no pages",
                ErrorContext::new().with_field_path("pages").with_source("document"),
            ));
        }
        for (i, page) in self.pages.iter().enumerate() {
            if page.root.is_leaf() {
                return Err(Error::validation_with_context(
                    "Page root must be a split node",
                    ErrorContext::new()
                        .with_field_path(format!("pages[{}].root", i))
                        .with_source("document"),
                ));
            }
            page.root.validate()?;
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// Point a leaf at a generated image and switch it to image content.
///
/// Returns the tree unchanged if `leaf_id` is absent or names a split.
pub fn attach_generated_image(tree: &Node, leaf_id: &NodeId, url: impl Into<String>) -> Node {
    let url = url.into();
    tree::update_node(tree, leaf_id, move |node| match node {
        Node::Leaf(leaf) => {
            let mut leaf = leaf.clone();
            leaf.content_type = ContentType::Image;
            leaf.image.url = Some(url);
            Node::Leaf(leaf)
        }
        Node::Split(_) => node.clone(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Generating,
    Completed,
    Failed,
    Canceled,
}

impl GenerationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }
}

/// Bookkeeping for one generation request, as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: String,
    pub provider_id: Option<String>,
    pub prompt: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub output_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Leaf that should receive the image once completed.
    #[serde(default)]
    pub target_leaf: Option<NodeId>,
    pub created_at: u64,
}

impl GenerationRecord {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            provider_id: None,
            prompt: prompt.into(),
            status: GenerationStatus::Pending,
            output_url: None,
            error: None,
            target_leaf: None,
            created_at: now_millis(),
        }
    }

    pub fn for_leaf(mut self, leaf_id: NodeId) -> Self {
        self.target_leaf = Some(leaf_id);
        self
    }

    // Terminal states are sticky: a late result after cancel is dropped.

    pub fn start(&mut self, provider_id: impl Into<String>) -> bool {
        if self.status != GenerationStatus::Pending {
            return false;
        }
        self.provider_id = Some(provider_id.into());
        self.status = GenerationStatus::Generating;
        true
    }

    pub fn complete(&mut self, result: &GenerationResult) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.provider_id = Some(result.provider_id.clone());
        self.output_url = Some(result.url.clone());
        self.status = GenerationStatus::Completed;
        true
    }

    pub fn fail(&mut self, error: &Error) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.error = Some(error.to_string());
        self.status = GenerationStatus::Failed;
        true
    }

    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = GenerationStatus::Canceled;
        true
    }

    /// Surface a completed record into its target leaf.
    pub fn apply_to(&self, tree: &Node) -> Node {
        match (&self.status, &self.output_url, &self.target_leaf) {
            (GenerationStatus::Completed, Some(url), Some(leaf)) => {
                attach_generated_image(tree, leaf, url.clone())
            }
            _ => tree.clone(),
        }
    }
}
