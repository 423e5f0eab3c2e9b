use crate::{activate::Activation, serialize::required};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Input,
    Hidden,
    Output,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: usize,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub bias: f64,
    /// Longest path back to an input, `None` until layered or when no input reaches this node
    #[serde(deserialize_with = "required")]
    pub layer: Option<usize>,
    pub activation: Activation,
}

impl Node {
    pub fn new(id: usize, kind: NodeKind, bias: f64) -> Self {
        Self {
            id,
            kind,
            bias,
            layer: match kind {
                NodeKind::Input => Some(0),
                _ => None,
            },
            activation: match kind {
                NodeKind::Hidden => Activation::Tanh,
                _ => Activation::Identity,
            },
        }
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self.kind, NodeKind::Input)
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        matches!(self.kind, NodeKind::Hidden)
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self.kind, NodeKind::Output)
    }
}

/// Nodes are the same node when they share an id
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}
