// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structural and type validation of a graph snapshot.
//!
//! All checks run over the whole snapshot and every problem is collected,
//! so the editor can surface them in one pass instead of one at a time.

use crate::graph::GraphSnapshot;
use crate::link::LinkId;
use crate::node::{NodeId, NodeKind};
use crate::pin::{PinDirection, PinRef, PinType};
use std::collections::{BTreeMap, BTreeSet};

/// A fatal validation problem, located at a node, pin, or link
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// A designated root node is absent from the graph
    #[error("root '{name}' refers to missing node {node}")]
    UnreachableRoot {
        /// Root name
        name: String,
        /// The missing node
        node: NodeId,
    },

    /// A directed cycle reachable from a root
    #[error("dependency cycle: {}", format_cycle(cycle))]
    CycleDetected {
        /// The cycle's nodes in traversal order
        cycle: Vec<NodeId>,
    },

    /// A required input with no incoming link and no default
    #[error("required input {node}.{slot} is not connected")]
    DanglingInput {
        /// Owning node
        node: NodeId,
        /// Input slot name
        slot: String,
    },

    /// A link endpoint that does not resolve to a pin of the right
    /// direction (e.g. a corrupted asset referencing a deleted node)
    #[error("link {link}: {pin} does not resolve to an {expected:?} pin")]
    BrokenLink {
        /// The offending link
        link: LinkId,
        /// The endpoint that failed to resolve
        pin: PinRef,
        /// Direction the endpoint was expected to have
        expected: PinDirection,
    },

    /// A select node with nothing to select from
    #[error("select node {node} has no options")]
    EmptySelect {
        /// The node
        node: NodeId,
    },

    /// A link whose endpoint types are incompatible
    #[error("link {link}: {from} ({from_type:?}) cannot feed {to} ({to_type:?})")]
    TypeMismatch {
        /// The offending link
        link: LinkId,
        /// Source pin
        from: PinRef,
        /// Source pin type
        from_type: PinType,
        /// Destination pin
        to: PinRef,
        /// Destination pin type
        to_type: PinType,
    },
}

/// A non-fatal validation finding
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationWarning {
    /// A node with no path to any root; pruned from compilation
    OrphanNode {
        /// The orphan
        node: NodeId,
    },
}

fn format_cycle(cycle: &[NodeId]) -> String {
    let mut out = String::new();
    for (i, n) in cycle.iter().enumerate() {
        if i > 0 {
            out.push_str(" -> ");
        }
        out.push_str(&n.to_string());
    }
    out
}

/// A snapshot that passed validation, with precomputed traversal data.
///
/// The reachable set and in-degree counts are consumed by the compiler so
/// it does not re-derive them.
#[derive(Debug, Clone)]
pub struct ValidatedGraph {
    snapshot: GraphSnapshot,
    reachable: BTreeSet<NodeId>,
    in_degree: BTreeMap<NodeId, usize>,
    warnings: Vec<ValidationWarning>,
}

impl ValidatedGraph {
    /// The validated snapshot
    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// Nodes with a path to a root, in id order
    pub fn reachable(&self) -> &BTreeSet<NodeId> {
        &self.reachable
    }

    /// Incoming dependency-edge counts for reachable nodes
    pub fn in_degree(&self) -> &BTreeMap<NodeId, usize> {
        &self.in_degree
    }

    /// Non-fatal findings (orphan nodes)
    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }
}

/// Validate a snapshot, collecting every problem rather than failing fast.
pub fn validate(snapshot: &GraphSnapshot) -> Result<ValidatedGraph, Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Roots must exist
    let mut root_nodes = Vec::new();
    for (name, node) in snapshot.roots() {
        if snapshot.contains_node(node) {
            root_nodes.push(node);
        } else {
            errors.push(ValidationError::UnreachableRoot {
                name: name.to_string(),
                node,
            });
        }
    }

    // Upstream reachability from the roots
    let mut reachable = BTreeSet::new();
    let mut stack = root_nodes.clone();
    while let Some(node) = stack.pop() {
        if !reachable.insert(node) {
            continue;
        }
        for link in snapshot.links_into(node) {
            stack.push(link.from.node);
        }
    }

    // Cycle detection over the reachable subgraph
    let mut cycles = CycleSearch::default();
    for root in &root_nodes {
        cycles.visit(snapshot, *root);
    }
    for cycle in cycles.found {
        errors.push(ValidationError::CycleDetected { cycle });
    }

    // Required inputs must be fed or defaulted (reachable nodes only;
    // orphans are pruned, not compiled, so their inputs may dangle)
    for node in snapshot.nodes() {
        if !reachable.contains(&node.id) {
            continue;
        }
        // A select with no options would lower into a plan the runtime
        // cannot evaluate
        if node.kind == (NodeKind::Select { options: 0 }) {
            errors.push(ValidationError::EmptySelect { node: node.id });
        }
        for (slot, pin) in node.inputs() {
            if pin.required
                && pin.default.is_none()
                && snapshot.link_to(&PinRef::new(node.id, slot)).is_none()
            {
                errors.push(ValidationError::DanglingInput {
                    node: node.id,
                    slot: slot.to_string(),
                });
            }
        }
    }

    // Re-verify every link; the live mutation path already checks all of
    // this, but snapshots may come from deserialized assets, so both
    // endpoint resolution and types are confirmed here
    for link in snapshot.links() {
        let from_pin = snapshot
            .node(link.from.node)
            .and_then(|n| n.pin(&link.from.slot))
            .filter(|p| p.direction == PinDirection::Output);
        let to_pin = snapshot
            .node(link.to.node)
            .and_then(|n| n.pin(&link.to.slot))
            .filter(|p| p.direction == PinDirection::Input);
        if from_pin.is_none() {
            errors.push(ValidationError::BrokenLink {
                link: link.id,
                pin: link.from.clone(),
                expected: PinDirection::Output,
            });
        }
        if to_pin.is_none() {
            errors.push(ValidationError::BrokenLink {
                link: link.id,
                pin: link.to.clone(),
                expected: PinDirection::Input,
            });
        }
        if let (Some(from_pin), Some(to_pin)) = (from_pin, to_pin) {
            if !to_pin.pin_type.accepts(from_pin.pin_type) {
                errors.push(ValidationError::TypeMismatch {
                    link: link.id,
                    from: link.from.clone(),
                    from_type: from_pin.pin_type,
                    to: link.to.clone(),
                    to_type: to_pin.pin_type,
                });
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Per-node dependency in-degree over the reachable subgraph
    let mut in_degree: BTreeMap<NodeId, usize> = reachable.iter().map(|n| (*n, 0)).collect();
    for link in snapshot.links() {
        if reachable.contains(&link.to.node) && reachable.contains(&link.from.node) {
            if let Some(count) = in_degree.get_mut(&link.to.node) {
                *count += 1;
            }
        }
    }

    let warnings = snapshot
        .node_ids()
        .filter(|n| !reachable.contains(n))
        .map(|node| ValidationWarning::OrphanNode { node })
        .collect();

    Ok(ValidatedGraph {
        snapshot: snapshot.clone(),
        reachable,
        in_degree,
        warnings,
    })
}

/// Depth-first search over dependency edges with an on-stack marker;
/// a back edge to an on-stack node is a cycle.
#[derive(Default)]
struct CycleSearch {
    path: Vec<NodeId>,
    on_stack: BTreeSet<NodeId>,
    done: BTreeSet<NodeId>,
    found: Vec<Vec<NodeId>>,
    seen: Vec<BTreeSet<NodeId>>,
}

impl CycleSearch {
    fn visit(&mut self, snapshot: &GraphSnapshot, node: NodeId) {
        if self.done.contains(&node) {
            return;
        }
        self.path.push(node);
        self.on_stack.insert(node);

        let producers: Vec<NodeId> = snapshot.links_into(node).map(|l| l.from.node).collect();
        for producer in producers {
            if self.on_stack.contains(&producer) {
                self.record(producer);
            } else {
                self.visit(snapshot, producer);
            }
        }

        self.on_stack.remove(&node);
        self.path.pop();
        self.done.insert(node);
    }

    fn record(&mut self, entry: NodeId) {
        let start = self
            .path
            .iter()
            .position(|n| *n == entry)
            .expect("on-stack node must be on the path");
        let cycle: Vec<NodeId> = self.path[start..].to_vec();
        let key: BTreeSet<NodeId> = cycle.iter().copied().collect();
        // The same cycle can be reached from several roots
        if !self.seen.contains(&key) {
            self.seen.push(key);
            self.found.push(cycle);
        }
    }
}
