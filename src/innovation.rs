//! Registries shared by every genome of one engine: innovation numbers, the pool of every node
//! ever minted, and the nodes used to split each connection.

use crate::{
    config::{Hyper, Settings},
    genome::{Connection, Genome, Node, NodeKind},
    random::random_between,
};
use fxhash::FxHashMap;
use rand::RngCore;

/// Hands out one innovation number per distinct (from, to) path
#[derive(Debug, Clone, Default)]
pub struct InnoGen {
    pub head: usize,
    seen: FxHashMap<(usize, usize), usize>,
}

impl InnoGen {
    pub fn new(head: usize) -> Self {
        Self {
            head,
            seen: FxHashMap::default(),
        }
    }

    /// Restore a generator from its numbered paths. `head` is the next number handed out.
    pub fn from_parts(head: usize, seen: impl IntoIterator<Item = ((usize, usize), usize)>) -> Self {
        Self {
            head,
            seen: seen.into_iter().collect(),
        }
    }

    pub fn path(&mut self, v: (usize, usize)) -> usize {
        match self.seen.get(&v) {
            Some(n) => *n,
            None => {
                let n = self.head;
                self.head += 1;
                self.seen.insert(v, n);
                n
            }
        }
    }

    pub fn get(&self, v: (usize, usize)) -> Option<usize> {
        self.seen.get(&v).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), usize)> + '_ {
        self.seen.iter().map(|(path, n)| (*path, *n))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Every node ever created, ordered by (kind, id). Ids are never reused.
#[derive(Debug, Clone, Default)]
pub struct NodePool(Vec<Node>);

impl NodePool {
    pub fn new(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by_key(|n| (n.kind, n.id));
        Self(nodes)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mint a node with the next id, keeping pool order
    pub fn mint(&mut self, kind: NodeKind, bias: f64) -> Node {
        let node = Node::new(self.0.len(), kind, bias);
        let at = self.0.partition_point(|n| (n.kind, n.id) < (kind, node.id));
        self.0.insert(at, node.clone());
        node
    }
}

/// Engine-scoped state that structural mutation reads and grows
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub innogen: InnoGen,
    pub node_pool: NodePool,
    /// The hidden node last used to split each connection path
    pub replace_pool: FxHashMap<(usize, usize), Node>,
    /// Inputs and outputs, shared by every genome
    pub mandatory: Vec<Node>,
    /// Every input connected to every output
    pub template: Vec<Connection>,
}

impl Registry {
    /// A fresh registry for `inputs` inputs and `outputs` outputs. Inputs take ids `0..inputs`,
    /// outputs the ids after, and each input-output pair one innovation.
    pub fn new(
        inputs: usize,
        outputs: usize,
        rng: &mut impl RngCore,
        settings: &Settings,
    ) -> Self {
        let hyper = &settings.hyper;
        let output_nodes = (inputs..inputs + outputs)
            .map(|id| {
                Node::new(id, NodeKind::Output, random_bias(rng, hyper))
                    .with_activation(settings.output_activation)
            })
            .collect::<Vec<_>>();

        let mut innogen = InnoGen::new(0);
        let mut mandatory = Vec::with_capacity(inputs + outputs);
        let mut template = Vec::with_capacity(inputs * outputs);
        for id in 0..inputs {
            mandatory.push(Node::new(id, NodeKind::Input, random_bias(rng, hyper)));
            for out in &output_nodes {
                let weight = random_between(rng, hyper.min_weight, hyper.max_weight);
                template.push(Connection::new(id, out.id, weight, innogen.path((id, out.id))));
            }
        }
        mandatory.extend(output_nodes);

        Self {
            innogen,
            node_pool: NodePool::new(mandatory.clone()),
            replace_pool: FxHashMap::default(),
            mandatory,
            template,
        }
    }

    /// Mint a node with a random bias
    pub fn new_node(&mut self, kind: NodeKind, rng: &mut impl RngCore, hyper: &Hyper) -> Node {
        let bias = random_bias(rng, hyper);
        self.node_pool.mint(kind, bias)
    }

    /// The hidden node that splits `path`, minted on first use and reused after
    pub fn interposer(
        &mut self,
        path: (usize, usize),
        rng: &mut impl RngCore,
        settings: &Settings,
    ) -> Node {
        if let Some(node) = self.replace_pool.get(&path) {
            return node.clone();
        }

        let node = self
            .new_node(NodeKind::Hidden, rng, &settings.hyper)
            .with_activation(settings.hidden_activation);
        self.replace_pool.insert(path, node.clone());
        node
    }

    /// The mandatory nodes fully connected, with fresh random biases and weights
    pub fn blank_genome(&self, rng: &mut impl RngCore, hyper: &Hyper) -> Genome {
        let nodes = self
            .mandatory
            .iter()
            .map(|n| Node {
                bias: random_bias(rng, hyper),
                ..n.clone()
            })
            .collect();
        let connections = self
            .template
            .iter()
            .map(|c| Connection {
                weight: random_between(rng, hyper.min_weight, hyper.max_weight),
                ..c.clone()
            })
            .collect();

        Genome::assemble(nodes, connections, None)
    }
}

#[inline]
fn random_bias(rng: &mut impl RngCore, hyper: &Hyper) -> f64 {
    random_between(rng, hyper.min_bias, hyper.max_bias)
}
