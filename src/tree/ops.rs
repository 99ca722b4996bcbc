//! Structural editing operations over panel trees.
//!
//! Every operation takes the current tree by reference and returns a new tree.
//! The path from the root to the edited node is rebuilt and everything else is
//! cloned as-is. An id that matches nothing is a silent no-op.

use super::{uniform_sizes, LeafNode, Node, NodeId, SplitDirection, SplitNode, MAX_SIZE, MIN_SIZE};
use tracing::debug;

/// Pre-order depth-first lookup.
pub fn find_node<'a>(tree: &'a Node, id: &NodeId) -> Option<&'a Node> {
    if tree.id() == id {
        return Some(tree);
    }
    match tree {
        Node::Leaf(_) => None,
        Node::Split(split) => split.children.iter().find_map(|c| find_node(c, id)),
    }
}

/// The split whose direct children include `id`.
pub fn find_parent_node<'a>(tree: &'a Node, id: &NodeId) -> Option<&'a SplitNode> {
    let Node::Split(split) = tree else {
        return None;
    };
    if split.position_of(id).is_some() {
        return Some(split);
    }
    split.children.iter().find_map(|c| find_parent_node(c, id))
}

/// Remove `id` from its parent and give every remaining sibling an equal share.
///
/// The root cannot remove itself; absent ids return an equal tree. Removing a
/// split's only child leaves an empty split with no sizes. Callers should
/// collapse or reject such splits; [`Node::validate`] reports them.
pub fn remove_node(tree: &Node, id: &NodeId) -> Node {
    let Node::Split(split) = tree else {
        return tree.clone();
    };

    if split.position_of(id).is_some() {
        let children: Vec<Node> = split
            .children
            .iter()
            .filter(|c| c.id() != id)
            .cloned()
            .collect();
        debug!(parent = %split.id, removed = %id, remaining = children.len(), "removed panel");
        return Node::Split(SplitNode {
            id: split.id.clone(),
            direction: split.direction,
            sizes: uniform_sizes(children.len()),
            children,
        });
    }

    rebuild_children(split, |child| remove_node(child, id))
}

/// Substitute the node matching `id` wholesale. Parent sizes are unchanged.
pub fn replace_node(tree: &Node, id: &NodeId, new_node: Node) -> Node {
    update_node(tree, id, move |_| new_node)
}

/// Substitute the node matching `id` with `updater(old)`.
pub fn update_node<F>(tree: &Node, id: &NodeId, updater: F) -> Node
where
    F: FnOnce(&Node) -> Node,
{
    let mut updater = Some(updater);
    update_in(tree, id, &mut updater)
}

fn update_in<F>(node: &Node, id: &NodeId, updater: &mut Option<F>) -> Node
where
    F: FnOnce(&Node) -> Node,
{
    if node.id() == id {
        // ids are unique, so the updater runs at most once
        return match updater.take() {
            Some(f) => f(node),
            None => node.clone(),
        };
    }
    match node {
        Node::Leaf(_) => node.clone(),
        Node::Split(split) => rebuild_children(split, |child| update_in(child, id, updater)),
    }
}

/// Insert a deep copy of `id` (every node re-minted) right after the original.
///
/// All siblings are reset to equal shares.
pub fn duplicate_node_in_parent(tree: &Node, id: &NodeId) -> Node {
    let Node::Split(split) = tree else {
        return tree.clone();
    };

    if let Some(pos) = split.position_of(id) {
        let mut children = split.children.clone();
        let copy = children[pos].with_fresh_ids();
        debug!(original = %id, copy = %copy.id(), "duplicated panel");
        children.insert(pos + 1, copy);
        return Node::Split(SplitNode {
            id: split.id.clone(),
            direction: split.direction,
            sizes: uniform_sizes(children.len()),
            children,
        });
    }

    rebuild_children(split, |child| duplicate_node_in_parent(child, id))
}

/// Move `delta` of the total size from child `child_index + 1` to child `child_index`.
///
/// Both touched entries are clamped to [`MIN_SIZE`, `MAX_SIZE`] and the whole
/// array is then divided by its sum. Only the two adjacent siblings change
/// before renormalization. A leaf, an index without a right-hand neighbour or
/// a NaN delta is returned unchanged.
pub fn apply_resize(tree: &Node, child_index: usize, delta: f64) -> Node {
    let Node::Split(split) = tree else {
        return tree.clone();
    };
    if child_index + 1 >= split.sizes.len() {
        debug!(split = %split.id, child_index, "resize index has no neighbour");
        return tree.clone();
    }
    if delta.is_nan() {
        debug!(split = %split.id, "ignoring NaN resize delta");
        return tree.clone();
    }

    let mut sizes = split.sizes.clone();
    sizes[child_index] = (sizes[child_index] + delta).clamp(MIN_SIZE, MAX_SIZE);
    sizes[child_index + 1] = (sizes[child_index + 1] - delta).clamp(MIN_SIZE, MAX_SIZE);

    let total: f64 = sizes.iter().sum();
    if total > 0.0 {
        for size in &mut sizes {
            *size /= total;
        }
    }

    Node::Split(SplitNode {
        id: split.id.clone(),
        direction: split.direction,
        sizes,
        children: split.children.clone(),
    })
}

/// [`apply_resize`] on the split with id `split_id`, wherever it is in the tree.
pub fn resize_split(tree: &Node, split_id: &NodeId, child_index: usize, delta: f64) -> Node {
    update_node(tree, split_id, |node| apply_resize(node, child_index, delta))
}

/// Turn a leaf into a split of `count` equal panels.
///
/// The first panel is the original leaf (re-minted); the others are empty text
/// leaves. A count of 1 gives a single-panel split and 0 is treated as 1.
pub fn split_leaf_node(leaf: &LeafNode, direction: SplitDirection, count: usize) -> SplitNode {
    split_into(&Node::Leaf(leaf.clone()), direction, count)
}

/// Wrap an existing split as the first of `count` equal panels in a new split.
pub fn split_split_node(split: &SplitNode, direction: SplitDirection, count: usize) -> SplitNode {
    split_into(&Node::Split(split.clone()), direction, count)
}

fn split_into(original: &Node, direction: SplitDirection, count: usize) -> SplitNode {
    let count = count.max(1);
    let mut children = Vec::with_capacity(count);
    children.push(original.with_fresh_ids());
    children.extend((1..count).map(|_| Node::Leaf(LeafNode::new())));
    SplitNode::new(direction, children)
}

/// Replace node `id` with its split into `count` panels along `direction`.
pub fn split_node(tree: &Node, id: &NodeId, direction: SplitDirection, count: usize) -> Node {
    update_node(tree, id, |node| {
        let split = match node {
            Node::Leaf(leaf) => split_leaf_node(leaf, direction, count),
            Node::Split(split) => split_split_node(split, direction, count),
        };
        Node::Split(split)
    })
}

/// Collapse split `split_id` into its first child, discarding the other panels.
///
/// When the root collapses onto a leaf, the leaf is kept inside a single-child
/// split so a page root is always a split.
pub fn merge_split(tree: &Node, split_id: &NodeId) -> Node {
    let is_root = tree.id() == split_id;
    update_node(tree, split_id, |node| {
        let Node::Split(split) = node else {
            return node.clone();
        };
        let Some(first) = split.children.first() else {
            return node.clone();
        };
        match first {
            Node::Leaf(_) if is_root => Node::Split(SplitNode {
                id: split.id.clone(),
                direction: split.direction,
                sizes: vec![1.0],
                children: vec![first.clone()],
            }),
            _ => first.clone(),
        }
    })
}

/// Reorder a child within split `parent_id`. Its size moves with it.
pub fn move_child(tree: &Node, parent_id: &NodeId, from: usize, to: usize) -> Node {
    update_node(tree, parent_id, |node| {
        let Node::Split(split) = node else {
            return node.clone();
        };
        let len = split.children.len();
        if from >= len || to >= len || from == to {
            return node.clone();
        }
        let mut children = split.children.clone();
        let mut sizes = split.sizes.clone();
        let child = children.remove(from);
        let size = sizes.remove(from);
        children.insert(to, child);
        sizes.insert(to, size);
        Node::Split(SplitNode {
            id: split.id.clone(),
            direction: split.direction,
            sizes,
            children,
        })
    })
}

fn rebuild_children<F>(split: &SplitNode, mut f: F) -> Node
where
    F: FnMut(&Node) -> Node,
{
    Node::Split(SplitNode {
        id: split.id.clone(),
        direction: split.direction,
        sizes: split.sizes.clone(),
        children: split.children.iter().map(&mut f).collect(),
    })
}
