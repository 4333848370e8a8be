// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative node-kind metadata for the host graph-editor UI.
//!
//! The host's generic graph editor only needs to know which kinds exist,
//! how to label and categorize them, and what pins a fresh instance has.
//! Nothing here carries behavior.

use crate::node::{BlendMode, CompareOp, LogicOp, NodeKind, WeightClamp};
use crate::pin::{Literal, Pin, PinType};
use indexmap::IndexMap;

/// Display category for the node palette
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    /// Sources: parameters, constants, clips
    Input,
    /// Comparison and boolean logic
    Logic,
    /// Pose selection and blending
    Blends,
}

/// Static description of one node kind
#[derive(Debug, Clone)]
pub struct NodeKindDescriptor {
    /// Stable kind identifier
    pub kind_id: &'static str,
    /// Palette display name
    pub display_name: &'static str,
    /// Palette category
    pub category: NodeCategory,
    /// One-line description
    pub description: &'static str,
    /// A default-parameterized instance of the kind
    pub template: NodeKind,
}

impl NodeKindDescriptor {
    /// Pin signature of a default instance of this kind
    pub fn signature(&self) -> IndexMap<String, Pin> {
        self.template.build_pins()
    }
}

/// Describe every available node kind, in palette order.
pub fn descriptors() -> Vec<NodeKindDescriptor> {
    vec![
        NodeKindDescriptor {
            kind_id: "parameter",
            display_name: "Parameter",
            category: NodeCategory::Input,
            description: "Named value supplied by the runtime each update",
            template: NodeKind::Parameter {
                name: String::new(),
                ty: PinType::Scalar,
            },
        },
        NodeKindDescriptor {
            kind_id: "constant",
            display_name: "Constant",
            category: NodeCategory::Input,
            description: "Constant literal value",
            template: NodeKind::Constant {
                value: Literal::Scalar(0.0),
            },
        },
        NodeKindDescriptor {
            kind_id: "clip",
            display_name: "Motion Clip",
            category: NodeCategory::Input,
            description: "Motion clip source",
            template: NodeKind::Clip {
                clip: String::new(),
            },
        },
        NodeKindDescriptor {
            kind_id: "compare",
            display_name: "Compare",
            category: NodeCategory::Logic,
            description: "Compare two scalars",
            template: NodeKind::Compare { op: CompareOp::Gt },
        },
        NodeKindDescriptor {
            kind_id: "logic",
            display_name: "Logic",
            category: NodeCategory::Logic,
            description: "Combine booleans",
            template: NodeKind::Logic { op: LogicOp::And },
        },
        NodeKindDescriptor {
            kind_id: "select",
            display_name: "Select",
            category: NodeCategory::Blends,
            description: "Pick one motion by tag value",
            template: NodeKind::Select { options: 2 },
        },
        NodeKindDescriptor {
            kind_id: "blend",
            display_name: "Blend",
            category: NodeCategory::Blends,
            description: "Blend two motions by weight",
            template: NodeKind::Blend {
                clamp: WeightClamp::default(),
            },
        },
        NodeKindDescriptor {
            kind_id: "layered_blend",
            display_name: "Layered Blend",
            category: NodeCategory::Blends,
            description: "Blend additive layers onto a base pose",
            template: NodeKind::LayeredBlend {
                modes: vec![BlendMode::Add],
                clamp: WeightClamp::default(),
            },
        },
    ]
}

/// Descriptors for one palette category, in palette order.
pub fn descriptors_in_category(category: NodeCategory) -> Vec<NodeKindDescriptor> {
    descriptors()
        .into_iter()
        .filter(|d| d.category == category)
        .collect()
}
