// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, links, and root designations.
//!
//! Nodes live in an arena keyed by stable integer ids; links address pins
//! as `(node id, slot name)` pairs, so there are no object references
//! between nodes and snapshotting is a plain structural copy.

use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId, NodeKind};
use crate::pin::{PinDirection, PinRef, PinType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::sync::Arc;
use uuid::Uuid;

/// Unique identifier for a graph asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphId(pub Uuid);

impl GraphId {
    /// Create a new random graph ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

/// The node graph for one MDA asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Asset identity
    pub id: GraphId,
    /// Graph name
    pub name: String,
    /// Nodes in the graph
    nodes: IndexMap<NodeId, Node>,
    /// Links between pins
    links: IndexMap<LinkId, Link>,
    /// Named root outputs consumed by the runtime, in declaration order
    roots: IndexMap<String, NodeId>,
    /// Next node id to hand out
    next_node: u64,
    /// Next link id to hand out
    next_link: u64,
    /// Bumped on every successful mutation
    revision: u64,
}

impl Graph {
    /// Create a new empty graph
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GraphId::new(),
            name: name.into(),
            nodes: IndexMap::new(),
            links: IndexMap::new(),
            roots: IndexMap::new(),
            next_node: 0,
            next_link: 0,
            revision: 0,
        }
    }

    /// Current revision, bumped on every successful mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Add a node of the given kind
    pub fn add_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, Node::new(id, kind));
        self.revision += 1;
        id
    }

    /// Remove a node and every link touching it.
    ///
    /// Root designations pointing at the node are kept; validation reports
    /// them as unreachable roots.
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<Node> {
        let node = self.nodes.shift_remove(&node_id)?;
        self.links.retain(|_, l| !l.involves_node(node_id));
        self.revision += 1;
        Some(node)
    }

    /// Replace a node's kind, rebuilding its pins.
    ///
    /// Links whose slot survives with a compatible type are kept; the rest
    /// are dropped and returned so the caller can report them.
    pub fn reconfigure_node(&mut self, node_id: NodeId, kind: NodeKind) -> Option<Vec<Link>> {
        let node = self.nodes.get_mut(&node_id)?;
        node.pins = kind.build_pins();
        node.kind = kind;

        let nodes = &self.nodes;
        let mut dropped = Vec::new();
        self.links.retain(|_, l| {
            if !l.involves_node(node_id) {
                return true;
            }
            if link_still_valid(nodes, l) {
                true
            } else {
                dropped.push(l.clone());
                false
            }
        });
        self.revision += 1;
        Some(dropped)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node by ID
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether a node exists
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// Create a link from an output pin to an input pin.
    ///
    /// On failure the graph is left unchanged.
    pub fn add_link(&mut self, from: PinRef, to: PinRef) -> Result<LinkId, LinkError> {
        let from_pin = self
            .pin(&from, PinDirection::Output)
            .ok_or_else(|| LinkError::UnknownPin { pin: from.clone() })?;
        let to_pin = self
            .pin(&to, PinDirection::Input)
            .ok_or_else(|| LinkError::UnknownPin { pin: to.clone() })?;

        if from.node == to.node {
            return Err(LinkError::SelfLoop { node: from.node });
        }

        if !to_pin.pin_type.accepts(from_pin.pin_type) {
            return Err(LinkError::TypeMismatch {
                from: from.clone(),
                from_type: from_pin.pin_type,
                to: to.clone(),
                to_type: to_pin.pin_type,
            });
        }

        if !to_pin.multi && self.links.values().any(|l| l.to == to) {
            return Err(LinkError::SlotOccupied { pin: to });
        }

        let id = LinkId(self.next_link);
        self.next_link += 1;
        self.links.insert(id, Link::new(id, from, to));
        self.revision += 1;
        Ok(id)
    }

    /// Remove a link
    pub fn remove_link(&mut self, link_id: LinkId) -> Option<Link> {
        let link = self.links.shift_remove(&link_id)?;
        self.revision += 1;
        Some(link)
    }

    /// Get a link by ID
    pub fn link(&self, link_id: LinkId) -> Option<&Link> {
        self.links.get(&link_id)
    }

    /// All links in insertion order
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    /// Number of links
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Links feeding a node's inputs
    pub fn links_into(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.to.node == node_id)
    }

    /// Links leaving a node's outputs
    pub fn links_from(&self, node_id: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.from.node == node_id)
    }

    /// The incoming link for an input slot, if any.
    ///
    /// For multi-link slots this returns the first link in creation order.
    pub fn link_to(&self, pin: &PinRef) -> Option<&Link> {
        self.links.values().find(|l| l.to == *pin)
    }

    /// Designate a named root output.
    ///
    /// The node need not exist yet; a missing root node is reported at
    /// validation time.
    pub fn set_root(&mut self, name: impl Into<String>, node_id: NodeId) {
        self.roots.insert(name.into(), node_id);
        self.revision += 1;
    }

    /// Remove a root designation
    pub fn clear_root(&mut self, name: &str) -> Option<NodeId> {
        let node = self.roots.shift_remove(name)?;
        self.revision += 1;
        Some(node)
    }

    /// Root designations in declaration order
    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.roots.iter().map(|(n, id)| (n.as_str(), *id))
    }

    /// Capture an immutable snapshot of the current graph state.
    ///
    /// The snapshot does not observe later mutations and is safe to hand
    /// to validation or compilation on another thread.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            graph: Arc::new(self.clone()),
            revision: self.revision,
        }
    }

    fn pin(&self, pin: &PinRef, direction: PinDirection) -> Option<&crate::pin::Pin> {
        self.nodes
            .get(&pin.node)?
            .pin(&pin.slot)
            .filter(|p| p.direction == direction)
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

fn link_still_valid(nodes: &IndexMap<NodeId, Node>, link: &Link) -> bool {
    let Some(from_pin) = nodes
        .get(&link.from.node)
        .and_then(|n| n.pin(&link.from.slot))
    else {
        return false;
    };
    let Some(to_pin) = nodes.get(&link.to.node).and_then(|n| n.pin(&link.to.slot)) else {
        return false;
    };
    from_pin.direction == PinDirection::Output
        && to_pin.direction == PinDirection::Input
        && to_pin.pin_type.accepts(from_pin.pin_type)
}

/// An immutable, cheaply cloneable view of a graph at a point in time
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    graph: Arc<Graph>,
    revision: u64,
}

impl GraphSnapshot {
    /// Revision of the graph when the snapshot was taken
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl Deref for GraphSnapshot {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

/// Error when creating a link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LinkError {
    /// Endpoint pin does not exist (or has the wrong direction)
    #[error("unknown pin: {pin}")]
    UnknownPin {
        /// The missing endpoint
        pin: PinRef,
    },

    /// Pin types are incompatible
    #[error("type mismatch: {from} ({from_type:?}) cannot feed {to} ({to_type:?})")]
    TypeMismatch {
        /// Source pin
        from: PinRef,
        /// Source pin type
        from_type: PinType,
        /// Destination pin
        to: PinRef,
        /// Destination pin type
        to_type: PinType,
    },

    /// Destination slot already has a link and is not multi-link
    #[error("slot occupied: {pin}")]
    SlotOccupied {
        /// The occupied destination
        pin: PinRef,
    },

    /// Source and destination are the same node
    #[error("self loop on {node}")]
    SelfLoop {
        /// The node
        node: NodeId,
    },
}
