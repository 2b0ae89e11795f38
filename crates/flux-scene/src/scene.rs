//! Append-only node arena with parent/child links.
//!
//! Nodes are never removed; `hidden` toggles visibility instead. The whole
//! tree serializes with serde for host handoff.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::node::{Node, NodeKind};

/// Index of a node in the scene arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// The scene tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scene {
    /// Stamp identifying this scene instance across host handoffs.
    pub scene_id: Ulid,
    nodes: Vec<Node>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            scene_id: Ulid::new(),
            nodes: Vec::new(),
        }
    }

    /// Insert a detached node and return its id.
    pub fn insert(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, kind));
        id
    }

    /// Append `child` to `parent`'s child list.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
    }

    /// Insert a node directly under `parent`.
    pub fn insert_into(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.insert(kind);
        self.append(parent, id);
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn set_hidden(&mut self, id: NodeId, hidden: bool) {
        self.nodes[id.index()].hidden = hidden;
    }

    /// First node carrying the given element id, in insertion order.
    pub fn find_element(&self, element_id: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.element_id.as_deref() == Some(element_id))
            .map(|node| node.id)
    }

    /// Depth-first ids of `root` and every node below it.
    pub fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            ids.push(id);
            let node = self.node(id);
            for child in node.children.iter().rev() {
                stack.push(*child);
            }
        }
        ids
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
