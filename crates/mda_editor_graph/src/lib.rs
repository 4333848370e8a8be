// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node-graph core for the MDA editor.
//!
//! Animators author selection and blending logic as a graph of typed
//! nodes; this crate owns that graph and turns it into something the
//! runtime can execute:
//! - Graph model with typed pins and validated links
//! - Whole-graph validation (cycles, dangling inputs, type re-checks)
//! - Deterministic compilation into an ordered evaluation plan
//!
//! ## Architecture
//!
//! Editing mutates the [`Graph`] on the editor's thread. A compile
//! trigger captures an immutable [`graph::GraphSnapshot`], which
//! [`validate::validate`] turns into a [`validate::ValidatedGraph`] and
//! [`compile::compile`] lowers into a [`plan::CompiledPlan`]. The plan is
//! handed to the runtime evaluator; the compiler never mutates the graph.

pub mod compile;
pub mod graph;
pub mod link;
pub mod node;
pub mod pin;
pub mod plan;
pub mod registry;
pub mod validate;

pub use compile::compile;
pub use graph::{Graph, GraphId, GraphSnapshot, LinkError};
pub use link::{Link, LinkId};
pub use node::{Node, NodeId, NodeKind};
pub use pin::{Literal, Pin, PinDirection, PinRef, PinType};
pub use plan::CompiledPlan;
pub use validate::{validate, ValidatedGraph, ValidationError, ValidationWarning};
