//! 面板树模型 — 页面布局的递归分割树
//!
//! Panel tree model: a page layout is a recursive split tree whose leaves are
//! content panels (text or image) and whose internal nodes divide space among
//! their children along one axis.
//!
//! Trees are plain owned values. Every editing operation in [`ops`] takes a
//! tree by reference and returns a new one, so a previous snapshot stays valid
//! (and readable from anywhere) while the next one is built.
//!
//! ## Invariants
//!
//! - Node ids are unique within a document. Duplication mints fresh ids.
//! - `sizes.len() == children.len()` for every split.
//! - Sizes sum to 1.0 after every structural edit.
//! - Resized sizes are clamped to [`MIN_SIZE`, `MAX_SIZE`] before renormalization.

pub mod ops;

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use uuid::Uuid;

pub use ops::{
    apply_resize, duplicate_node_in_parent, find_node, find_parent_node, merge_split, move_child,
    remove_node, replace_node, resize_split, split_leaf_node, split_node, split_split_node,
    update_node,
};

/// Lower clamp for a single child's share after a resize.
pub const MIN_SIZE: f64 = 0.05;
/// Upper clamp for a single child's share after a resize.
pub const MAX_SIZE: f64 = 0.95;
/// Tolerance used when checking that loaded sizes sum to 1.0.
pub const SIZE_SUM_TOLERANCE: f64 = 1e-6;

/// Stable identifier for a panel tree node.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Split orientation.
///
/// `Horizontal` stacks children top-to-bottom, `Vertical` places them
/// side-by-side. The naming follows the persisted document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitDirection {
    Horizontal,
    Vertical,
}

impl SplitDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextProps {
    pub text: String,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub color: String,
    pub align: TextAlign,
    pub line_height: f32,
}

impl Default for TextProps {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: "Inter".to_string(),
            font_size: 16.0,
            font_weight: 400,
            color: "#000000".to_string(),
            align: TextAlign::Left,
            line_height: 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFit {
    #[default]
    Cover,
    Contain,
    Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProps {
    pub url: Option<String>,
    pub fit: ImageFit,
    pub opacity: f32,
    pub border_radius: f32,
}

impl Default for ImageProps {
    fn default() -> Self {
        Self {
            url: None,
            fit: ImageFit::Cover,
            opacity: 1.0,
            border_radius: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundProps {
    pub color: String,
    pub opacity: f32,
}

impl Default for BackgroundProps {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            opacity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Padding {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Padding {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(8.0)
    }
}

/// Terminal content panel.
///
/// Both `text` and `image` are always present; `content_type` selects which one is shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafNode {
    pub id: NodeId,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub text: TextProps,
    #[serde(default)]
    pub image: ImageProps,
    #[serde(default)]
    pub background: BackgroundProps,
    #[serde(default)]
    pub padding: Padding,
}

impl LeafNode {
    /// Empty text panel with default typography and a fresh id.
    pub fn new() -> Self {
        Self::with_id(NodeId::generate())
    }

    pub fn with_id(id: NodeId) -> Self {
        Self {
            id,
            content_type: ContentType::Text,
            text: TextProps::default(),
            image: ImageProps::default(),
            background: BackgroundProps::default(),
            padding: Padding::default(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut leaf = Self::new();
        leaf.text.text = text.into();
        leaf
    }

    pub fn image(url: impl Into<String>) -> Self {
        let mut leaf = Self::new();
        leaf.content_type = ContentType::Image;
        leaf.image.url = Some(url.into());
        leaf
    }

    /// Compare everything except the id.
    pub fn content_eq(&self, other: &LeafNode) -> bool {
        self.content_type == other.content_type
            && self.text == other.text
            && self.image == other.image
            && self.background == other.background
            && self.padding == other.padding
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}

/// Internal node dividing its space among ordered children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitNode {
    pub id: NodeId,
    pub direction: SplitDirection,
    pub sizes: Vec<f64>,
    pub children: Vec<Node>,
}

impl SplitNode {
    /// Split with equal shares for every child and a fresh id.
    pub fn new(direction: SplitDirection, children: Vec<Node>) -> Self {
        Self {
            id: NodeId::generate(),
            direction,
            sizes: uniform_sizes(children.len()),
            children,
        }
    }

    /// Split with explicit sizes. The caller is responsible for the sizes invariant.
    pub fn with_sizes(direction: SplitDirection, sizes: Vec<f64>, children: Vec<Node>) -> Self {
        Self {
            id: NodeId::generate(),
            direction,
            sizes,
            children,
        }
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.children.iter().map(Node::id)
    }

    pub fn position_of(&self, id: &NodeId) -> Option<usize> {
        self.children.iter().position(|c| c.id() == id)
    }

    pub fn sizes_sum(&self) -> f64 {
        self.sizes.iter().sum()
    }
}

/// A panel tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf(LeafNode),
    Split(SplitNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Leaf(leaf) => &leaf.id,
            Node::Split(split) => &split.id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Node::Leaf(leaf) => Some(leaf),
            Node::Split(_) => None,
        }
    }

    pub fn as_split(&self) -> Option<&SplitNode> {
        match self {
            Node::Split(split) => Some(split),
            Node::Leaf(_) => None,
        }
    }

    /// Deep copy of this subtree where every node gets a freshly minted id.
    pub fn with_fresh_ids(&self) -> Node {
        match self {
            Node::Leaf(leaf) => Node::Leaf(LeafNode {
                id: NodeId::generate(),
                ..leaf.clone()
            }),
            Node::Split(split) => Node::Split(SplitNode {
                id: NodeId::generate(),
                direction: split.direction,
                sizes: split.sizes.clone(),
                children: split.children.iter().map(Node::with_fresh_ids).collect(),
            }),
        }
    }

    /// All ids in pre-order.
    pub fn ids(&self) -> Vec<&NodeId> {
        let mut out = Vec::new();
        collect_ids(self, &mut out);
        out
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Node::Leaf(_) => 1,
            Node::Split(split) => split.children.iter().map(Node::leaf_count).sum(),
        }
    }

    /// Leaves in reading order (pre-order).
    pub fn leaves(&self) -> Vec<&LeafNode> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Check the structural invariants of a tree that did not come out of the
    /// editing operations (persisted documents, user preset files).
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        validate_node(self, "root", &mut seen)
    }

    /// Rescale every split's sizes so they sum to exactly 1.0.
    ///
    /// Splits whose sizes have the wrong length or a non-positive sum fall back to equal shares.
    pub fn normalize_sizes(&self) -> Node {
        match self {
            Node::Leaf(_) => self.clone(),
            Node::Split(split) => {
                let total = split.sizes_sum();
                let sizes = if split.sizes.len() != split.children.len() || total <= 0.0 {
                    uniform_sizes(split.children.len())
                } else {
                    split.sizes.iter().map(|s| s / total).collect()
                };
                Node::Split(SplitNode {
                    id: split.id.clone(),
                    direction: split.direction,
                    sizes,
                    children: split.children.iter().map(Node::normalize_sizes).collect(),
                })
            }
        }
    }
}

impl From<LeafNode> for Node {
    fn from(leaf: LeafNode) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<SplitNode> for Node {
    fn from(split: SplitNode) -> Self {
        Node::Split(split)
    }
}

/// `n` equal shares, each `1/n`.
pub fn uniform_sizes(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

fn collect_ids<'a>(node: &'a Node, out: &mut Vec<&'a NodeId>) {
    out.push(node.id());
    if let Node::Split(split) = node {
        for child in &split.children {
            collect_ids(child, out);
        }
    }
}

fn collect_leaves<'a>(node: &'a Node, out: &mut Vec<&'a LeafNode>) {
    match node {
        Node::Leaf(leaf) => out.push(leaf),
        Node::Split(split) => {
            for child in &split.children {
                collect_leaves(child, out);
            }
        }
    }
}

fn validate_node<'a>(node: &'a Node, path: &str, seen: &mut HashSet<&'a NodeId>) -> Result<()> {
    if !seen.insert(node.id()) {
        return Err(Error::validation_with_context(
            format!("Duplicate node id '{}'", node.id()),
            ErrorContext::new()
                .with_field_path(path)
                .with_source("tree_validation"),
        ));
    }

    let Node::Split(split) = node else {
        return Ok(());
    };

    if split.children.is_empty() {
        return Err(Error::validation_with_context(
            "Split node has no children",
            ErrorContext::new()
                .with_field_path(path)
                .with_source("tree_validation"),
        ));
    }
    if split.sizes.len() != split.children.len() {
        return Err(Error::validation_with_context(
            "Split sizes and children have different lengths",
            ErrorContext::new()
                .with_field_path(format!("{}.sizes", path))
                .with_details(format!(
                    "sizes: {}, children: {}",
                    split.sizes.len(),
                    split.children.len()
                ))
                .with_source("tree_validation"),
        ));
    }
    if split.sizes.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return Err(Error::validation_with_context(
            "Split sizes must be positive finite fractions",
            ErrorContext::new()
                .with_field_path(format!("{}.sizes", path))
                .with_source("tree_validation"),
        ));
    }
    let total = split.sizes_sum();
    if (total - 1.0).abs() > SIZE_SUM_TOLERANCE {
        return Err(Error::validation_with_context(
            "Split sizes must sum to 1.0",
            ErrorContext::new()
                .with_field_path(format!("{}.sizes", path))
                .with_details(format!("sum: {}", total))
                .with_source("tree_validation"),
        ));
    }

    for (i, child) in split.children.iter().enumerate() {
        validate_node(child, &format!("{}.children[{}]", path, i), seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_columns() -> Node {
        Node::Split(SplitNode::new(
            SplitDirection::Vertical,
            vec![LeafNode::new().into(), LeafNode::new().into()],
        ))
    }

    #[test]
    fn test_default_leaf_is_empty_text_panel() {
        let leaf = LeafNode::new();
        assert_eq!(leaf.content_type, ContentType::Text);
        assert!(leaf.text.text.is_empty());
        assert!(leaf.image.url.is_none());
        assert_eq!(leaf.padding, Padding::uniform(8.0));
    }

    #[test]
    fn test_fresh_ids_touch_every_node() {
        let tree = Node::Split(SplitNode::new(
            SplitDirection::Horizontal,
            vec![two_columns(), LeafNode::text("caption").into()],
        ));
        let copy = tree.with_fresh_ids();
        let original: HashSet<_> = tree.ids().into_iter().collect();
        assert_eq!(copy.ids().len(), original.len());
        assert!(copy.ids().iter().all(|id| !original.contains(id)));
        assert_eq!(copy.leaves()[2].text.text, "caption");
    }

    #[test]
    fn test_validate_accepts_well_formed_tree() {
        assert!(two_columns().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let mut split = SplitNode::new(SplitDirection::Vertical, vec![LeafNode::new().into()]);
        split.sizes = vec![0.5, 0.5];
        let err = Node::Split(split).validate().unwrap_err();
        assert!(err.to_string().contains("different lengths"));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let leaf = LeafNode::new();
        let tree = Node::Split(SplitNode::new(
            SplitDirection::Vertical,
            vec![leaf.clone().into(), leaf.into()],
        ));
        let err = tree.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate node id"));
    }

    #[test]
    fn test_normalize_sizes_repairs_drift() {
        let tree = Node::Split(SplitNode::with_sizes(
            SplitDirection::Vertical,
            vec![0.3, 0.3],
            vec![LeafNode::new().into(), LeafNode::new().into()],
        ));
        assert!(tree.validate().is_err());
        let fixed = tree.normalize_sizes();
        assert!(fixed.validate().is_ok());
        assert_eq!(fixed.as_split().unwrap().sizes, vec![0.5, 0.5]);
    }

    #[test]
    fn test_node_serde_is_tagged() {
        let tree = two_columns();
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["type"], "split");
        assert_eq!(json["direction"], "vertical");
        assert_eq!(json["children"][0]["type"], "leaf");
        assert_eq!(json["children"][0]["content_type"], "text");
        let back: Node = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_leaf_deserializes_with_defaults() {
        let leaf: Node = serde_json::from_str(r#"{"type":"leaf","id":"a"}"#).unwrap();
        let leaf = leaf.as_leaf().unwrap();
        assert_eq!(leaf.id.as_str(), "a");
        assert_eq!(leaf.text.font_family, "Inter");
        assert_eq!(leaf.background.color, "#ffffff");
    }
}
