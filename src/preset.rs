//! Page layout templates.
//!
//! A preset is a named `{name, category, root}` triple whose root is a split
//! tree with explicit sizes. The built-in catalog ships with the crate; user
//! catalogs can be loaded from YAML or JSON and are validated on load.

use crate::tree::{LeafNode, Node, SplitDirection, SplitNode};
use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub category: String,
    pub root: SplitNode,
}

impl Preset {
    pub fn new(name: impl Into<String>, category: impl Into<String>, root: SplitNode) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            root,
        }
    }

    /// Build a page tree from this template. Every node gets a fresh id, so two
    /// pages made from the same preset never share ids.
    pub fn instantiate(&self) -> Node {
        Node::Split(self.root.clone()).with_fresh_ids()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_with_context(
                "Preset name must not be empty",
                ErrorContext::new().with_field_path("name").with_source("preset"),
            ));
        }
        Node::Split(self.root.clone()).validate().map_err(|e| {
            Error::validation_with_context(
                format!("Preset '{}' has an invalid layout: {}", self.name, e),
                ErrorContext::new().with_field_path("root").with_source("preset"),
            )
        })
    }
}

static BUILTIN_PRESETS: Lazy<Vec<Preset>> = Lazy::new(build_catalog);

/// The catalog shipped with the crate.
pub fn builtin_presets() -> &'static [Preset] {
    &BUILTIN_PRESETS
}

/// Built-in preset by exact name.
pub fn find_preset(name: &str) -> Option<&'static Preset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn presets_in_category(category: &str) -> Vec<&'static Preset> {
    BUILTIN_PRESETS
        .iter()
        .filter(|p| p.category == category)
        .collect()
}

pub fn load_presets_yaml(content: &str) -> Result<Vec<Preset>> {
    let presets: Vec<Preset> = serde_yaml::from_str(content)?;
    validate_all(presets)
}

pub fn load_presets_json(content: &str) -> Result<Vec<Preset>> {
    let presets: Vec<Preset> = serde_json::from_str(content)?;
    validate_all(presets)
}

fn validate_all(presets: Vec<Preset>) -> Result<Vec<Preset>> {
    for preset in &presets {
        preset.validate()?;
    }
    Ok(presets)
}

fn panel() -> Node {
    Node::Leaf(LeafNode::new())
}

fn rows(sizes: &[f64], children: Vec<Node>) -> SplitNode {
    SplitNode::with_sizes(SplitDirection::Horizontal, sizes.to_vec(), children)
}

fn columns(sizes: &[f64], children: Vec<Node>) -> SplitNode {
    SplitNode::with_sizes(SplitDirection::Vertical, sizes.to_vec(), children)
}

fn build_catalog() -> Vec<Preset> {
    vec![
        Preset::new("Single Panel", "basic", rows(&[1.0], vec![panel()])),
        Preset::new(
            "Two Columns",
            "basic",
            columns(&[0.5, 0.5], vec![panel(), panel()]),
        ),
        Preset::new("Two Rows", "basic", rows(&[0.5, 0.5], vec![panel(), panel()])),
        Preset::new(
            "Three Columns",
            "basic",
            columns(&[0.33, 0.34, 0.33], vec![panel(), panel(), panel()]),
        ),
        Preset::new(
            "Three Rows",
            "basic",
            rows(&[0.33, 0.34, 0.33], vec![panel(), panel(), panel()]),
        ),
        Preset::new(
            "Grid 2x2",
            "grid",
            rows(
                &[0.5, 0.5],
                vec![
                    columns(&[0.5, 0.5], vec![panel(), panel()]).into(),
                    columns(&[0.5, 0.5], vec![panel(), panel()]).into(),
                ],
            ),
        ),
        Preset::new(
            "Big Top",
            "comic",
            rows(
                &[0.6, 0.4],
                vec![panel(), columns(&[0.5, 0.5], vec![panel(), panel()]).into()],
            ),
        ),
        Preset::new(
            "Big Left",
            "comic",
            columns(
                &[0.6, 0.4],
                vec![panel(), rows(&[0.5, 0.5], vec![panel(), panel()]).into()],
            ),
        ),
        Preset::new(
            "Classic 6-Panel",
            "comic",
            rows(
                &[0.33, 0.34, 0.33],
                vec![
                    columns(&[0.5, 0.5], vec![panel(), panel()]).into(),
                    columns(&[0.5, 0.5], vec![panel(), panel()]).into(),
                    columns(&[0.5, 0.5], vec![panel(), panel()]).into(),
                ],
            ),
        ),
        Preset::new(
            "Manga 5-Panel",
            "manga",
            rows(
                &[0.3, 0.4, 0.3],
                vec![
                    columns(&[0.6, 0.4], vec![panel(), panel()]).into(),
                    panel(),
                    columns(&[0.4, 0.6], vec![panel(), panel()]).into(),
                ],
            ),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let presets = builtin_presets();
        assert!(presets.len() >= 10);
        for preset in presets {
            preset.validate().unwrap_or_else(|e| panic!("{}: {}", preset.name, e));
        }
        let names: HashSet<_> = presets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names.len(), presets.len());
    }

    #[test]
    fn test_two_columns_shape() {
        let preset = find_preset("Two Columns").unwrap();
        assert_eq!(preset.root.direction, SplitDirection::Vertical);
        assert_eq!(preset.root.sizes, vec![0.5, 0.5]);
        assert!(preset.root.children.iter().all(Node::is_leaf));
    }

    #[test]
    fn test_classic_six_panel_has_six_leaves() {
        let tree = find_preset("Classic 6-Panel").unwrap().instantiate();
        assert_eq!(tree.leaf_count(), 6);
    }

    #[test]
    fn test_instantiate_mints_fresh_ids() {
        let preset = find_preset("Grid 2x2").unwrap();
        let a = preset.instantiate();
        let b = preset.instantiate();
        let a_ids: HashSet<_> = a.ids().into_iter().collect();
        assert!(b.ids().iter().all(|id| !a_ids.contains(id)));
        let template_ids: HashSet<_> = Node::Split(preset.root.clone())
            .ids()
            .into_iter()
            .cloned()
            .collect();
        assert!(a.ids().iter().all(|id| !template_ids.contains(*id)));
    }

    #[test]
    fn test_presets_in_category() {
        let comic = presets_in_category("comic");
        assert!(comic.iter().any(|p| p.name == "Classic 6-Panel"));
        assert!(presets_in_category("nonexistent").is_empty());
    }

    #[test]
    fn test_load_presets_yaml() {
        let yaml = r#"
- name: Splash
  category: custom
  root:
    id: root
    direction: horizontal
    sizes: [0.7, 0.3]
    children:
      - type: leaf
        id: hero
      - type: leaf
        id: caption
"#;
        let presets = load_presets_yaml(yaml).unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].root.sizes, vec![0.7, 0.3]);
        assert_eq!(presets[0].instantiate().leaf_count(), 2);
    }

    #[test]
    fn test_load_presets_rejects_bad_sizes() {
        let json = r#"[{"name":"Broken","category":"custom","root":{"id":"r","direction":"vertical","sizes":[0.9,0.9],"children":[{"type":"leaf","id":"a"},{"type":"leaf","id":"b"}]}}]"#;
        let err = load_presets_json(json).unwrap_err();
        assert!(err.to_string().contains("Broken"));
    }
}
