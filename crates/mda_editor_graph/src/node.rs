// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions: the closed kind catalog and per-kind pin signatures.

use crate::pin::{Literal, Pin, PinType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Unique identifier for a node within one graph.
///
/// Allocated from a per-graph monotonic counter and never reused, so ids
/// give a stable total order used for deterministic compilation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Comparison operator for [`NodeKind::Compare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// Equal
    Eq,
    /// Less than
    Lt,
    /// Less than or equal
    Le,
    /// Greater than
    Gt,
    /// Greater than or equal
    Ge,
}

/// Boolean operator for [`NodeKind::Logic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOp {
    /// Both inputs true
    And,
    /// Either input true
    Or,
    /// Negate the single input
    Not,
}

/// How a layer is accumulated onto the base pose in a layered blend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendMode {
    /// Additive
    Add,
    /// Subtractive
    Subtract,
    /// CoD-style additive (rotations not renormalized)
    CoDAdd,
}

/// Clamp applied to a blend weight before use
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightClamp {
    /// Lower bound
    pub min: f32,
    /// Upper bound
    pub max: f32,
}

impl Default for WeightClamp {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// The closed set of node kinds, each carrying its kind-specific parameters.
///
/// The pin signature of a node is a pure function of its kind; see
/// [`NodeKind::build_pins`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Named value supplied by the runtime each update
    Parameter {
        /// Parameter name looked up by the runtime
        name: String,
        /// Value type (`Bool`, `Scalar`, or `Tag`)
        ty: PinType,
    },
    /// Constant literal value
    Constant {
        /// The literal
        value: Literal,
    },
    /// Motion clip source
    Clip {
        /// Clip asset name
        clip: String,
    },
    /// Scalar comparison producing a boolean
    Compare {
        /// Comparison operator
        op: CompareOp,
    },
    /// Boolean combinator
    Logic {
        /// Boolean operator
        op: LogicOp,
    },
    /// Pick one of several motions by tag value
    Select {
        /// Number of selectable options (at least 1)
        options: u32,
    },
    /// Two-way motion blend by weight
    Blend {
        /// Clamp applied to the weight input
        clamp: WeightClamp,
    },
    /// Additive blend of any number of weighted layers onto a base pose.
    ///
    /// One pose and one weight pin per layer; layers can be added and
    /// removed after creation, which rebuilds the node's pins.
    LayeredBlend {
        /// Per-layer accumulation mode
        modes: Vec<BlendMode>,
        /// Clamp applied to every layer weight
        clamp: WeightClamp,
    },
}

impl NodeKind {
    /// Stable kind identifier used by registry metadata and persistence
    pub fn kind_id(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "parameter",
            Self::Constant { .. } => "constant",
            Self::Clip { .. } => "clip",
            Self::Compare { .. } => "compare",
            Self::Logic { .. } => "logic",
            Self::Select { .. } => "select",
            Self::Blend { .. } => "blend",
            Self::LayeredBlend { .. } => "layered_blend",
        }
    }

    /// Display name for the host graph UI
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Parameter { .. } => "Parameter",
            Self::Constant { .. } => "Constant",
            Self::Clip { .. } => "Motion Clip",
            Self::Compare { .. } => "Compare",
            Self::Logic { .. } => "Logic",
            Self::Select { .. } => "Select",
            Self::Blend { .. } => "Blend",
            Self::LayeredBlend { .. } => "Layered Blend",
        }
    }

    /// Build the pin map for this kind.
    ///
    /// Slot order is the declaration order shown in the UI and is stable
    /// across rebuilds.
    pub fn build_pins(&self) -> IndexMap<String, Pin> {
        let mut pins = IndexMap::new();
        match self {
            Self::Parameter { ty, .. } => {
                pins.insert("out".to_string(), Pin::output(*ty));
            }
            Self::Constant { value } => {
                pins.insert("out".to_string(), Pin::output(value.pin_type()));
            }
            Self::Clip { .. } => {
                pins.insert("out".to_string(), Pin::output(PinType::Motion));
            }
            Self::Compare { .. } => {
                pins.insert("lhs".to_string(), Pin::input(PinType::Scalar).required());
                pins.insert(
                    "rhs".to_string(),
                    Pin::input(PinType::Scalar)
                        .required()
                        .with_default(Literal::Scalar(0.0)),
                );
                pins.insert("out".to_string(), Pin::output(PinType::Bool));
            }
            Self::Logic { op } => {
                pins.insert("a".to_string(), Pin::input(PinType::Bool).required());
                if *op != LogicOp::Not {
                    pins.insert("b".to_string(), Pin::input(PinType::Bool).required());
                }
                pins.insert("out".to_string(), Pin::output(PinType::Bool));
            }
            Self::Select { options } => {
                pins.insert("selector".to_string(), Pin::input(PinType::Tag).required());
                for i in 0..*options {
                    pins.insert(
                        format!("option_{i}"),
                        Pin::input(PinType::Motion).required(),
                    );
                }
                pins.insert("out".to_string(), Pin::output(PinType::Motion));
            }
            Self::Blend { .. } => {
                pins.insert("a".to_string(), Pin::input(PinType::Motion).required());
                pins.insert("b".to_string(), Pin::input(PinType::Motion).required());
                pins.insert(
                    "weight".to_string(),
                    Pin::input(PinType::Scalar)
                        .required()
                        .with_default(Literal::Scalar(0.5)),
                );
                pins.insert("out".to_string(), Pin::output(PinType::Motion));
            }
            Self::LayeredBlend { modes, .. } => {
                pins.insert("base".to_string(), Pin::input(PinType::Motion).required());
                for i in 0..modes.len() {
                    pins.insert(
                        format!("pose_{i}"),
                        Pin::input(PinType::Motion).required(),
                    );
                    pins.insert(
                        format!("weight_{i}"),
                        Pin::input(PinType::Scalar)
                            .required()
                            .with_default(Literal::Scalar(1.0)),
                    );
                }
                pins.insert("out".to_string(), Pin::output(PinType::Motion));
            }
        }
        pins
    }
}

/// A node instance in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Unique instance id
    pub id: NodeId,
    /// Display name (can be customized)
    pub name: String,
    /// Node kind and its parameters
    pub kind: NodeKind,
    /// Pins by slot name, built from the kind
    pub pins: IndexMap<String, Pin>,
}

impl Node {
    /// Create a new node of the given kind
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        let pins = kind.build_pins();
        Self {
            id,
            name: kind.display_name().to_string(),
            kind,
            pins,
        }
    }

    /// Get a pin by slot name
    pub fn pin(&self, slot: &str) -> Option<&Pin> {
        self.pins.get(slot)
    }

    /// Input pins in declaration order
    pub fn inputs(&self) -> impl Iterator<Item = (&str, &Pin)> {
        self.pins
            .iter()
            .filter(|(_, p)| p.direction == crate::pin::PinDirection::Input)
            .map(|(s, p)| (s.as_str(), p))
    }

    /// Output pins in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &Pin)> {
        self.pins
            .iter()
            .filter(|(_, p)| p.direction == crate::pin::PinDirection::Output)
            .map(|(s, p)| (s.as_str(), p))
    }
}
