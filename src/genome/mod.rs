//! Genomes: a topology of [Node]s and [Connection]s, and the feed-forward layering derived from it.
//!
//! A genome keeps its connections sorted by innovation, and keeps a cached adjacency [Graph] and
//! layer ordering that are rebuilt by [Genome::construct_layers] after every structural change.
//! Every structural mutation in [mutate] ends with that rebuild, so neither is ever observed stale.

pub mod connection;
pub mod mutate;
pub mod node;

pub use connection::Connection;
pub use node::{Node, NodeKind};

use crate::{
    error::{Error, Result},
    serialize::required,
};
use core::cmp::Ordering;
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Per-node adjacency, by position in [Genome::nodes] and [Genome::connections]
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Connections ending at each node
    pub incoming: Vec<Vec<usize>>,
    /// Connections leaving each node
    pub outgoing: Vec<Vec<usize>>,
    /// Node positions at the (from, to) ends of each connection
    pub ends: Vec<(usize, usize)>,
}

impl Graph {
    fn new(
        nodes: &[Node],
        connections: &[Connection],
        node_index: &FxHashMap<usize, usize>,
    ) -> Self {
        let mut graph = Self {
            incoming: vec![vec![]; nodes.len()],
            outgoing: vec![vec![]; nodes.len()],
            ends: Vec::with_capacity(connections.len()),
        };

        for (idx, c) in connections.iter().enumerate() {
            let from = node_index[&c.from];
            let to = node_index[&c.to];
            graph.outgoing[from].push(idx);
            graph.incoming[to].push(idx);
            graph.ends.push((from, to));
        }

        graph
    }
}

#[derive(Serialize, Deserialize)]
struct GenomeRecord {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    #[serde(deserialize_with = "required")]
    species: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "GenomeRecord", into = "GenomeRecord")]
pub struct Genome {
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    pub species: Option<usize>,
    node_index: FxHashMap<usize, usize>,
    connection_index: FxHashMap<(usize, usize), usize>,
    layers: Vec<Vec<usize>>,
    graph: Graph,
}

impl TryFrom<GenomeRecord> for Genome {
    type Error = Error;

    fn try_from(record: GenomeRecord) -> Result<Self> {
        Self::new(record.nodes, record.connections, record.species)
    }
}

impl From<Genome> for GenomeRecord {
    fn from(genome: Genome) -> Self {
        Self {
            nodes: genome.nodes,
            connections: genome.connections,
            species: genome.species,
        }
    }
}

impl Genome {
    /// A genome over `nodes` and `connections`, layered and ready to evaluate.
    /// Fails if node ids or connection paths repeat, or a connection references a missing node.
    pub fn new(
        nodes: Vec<Node>,
        mut connections: Vec<Connection>,
        species: Option<usize>,
    ) -> Result<Self> {
        connections.sort_by_key(|c| c.inno);
        let mut genome = Self {
            nodes,
            connections,
            species,
            node_index: FxHashMap::default(),
            connection_index: FxHashMap::default(),
            layers: vec![],
            graph: Graph::default(),
        };

        genome.index_nodes();
        if genome.node_index.len() != genome.nodes.len() {
            return Err(Error::malformed("duplicate node id"));
        }

        genome.index_connections();
        if genome.connection_index.len() != genome.connections.len() {
            return Err(Error::malformed("duplicate connection"));
        }

        if let Some(c) = genome.connections.iter().find(|c| {
            !genome.node_index.contains_key(&c.from) || !genome.node_index.contains_key(&c.to)
        }) {
            return Err(Error::malformed(format!(
                "connection {} references a missing node",
                c.key()
            )));
        }

        genome.construct_layers();
        Ok(genome)
    }

    /// Like [Genome::new], for parts already known to be consistent
    pub(crate) fn assemble(
        nodes: Vec<Node>,
        mut connections: Vec<Connection>,
        species: Option<usize>,
    ) -> Self {
        connections.sort_by_key(|c| c.inno);
        let mut genome = Self {
            nodes,
            connections,
            species,
            node_index: FxHashMap::default(),
            connection_index: FxHashMap::default(),
            layers: vec![],
            graph: Graph::default(),
        };
        genome.index_nodes();
        genome.index_connections();
        debug_assert_eq!(genome.node_index.len(), genome.nodes.len());
        debug_assert_eq!(genome.connection_index.len(), genome.connections.len());
        genome.construct_layers();
        genome
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Connections, ascending by innovation
    #[inline]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Node positions grouped into evaluation order. The first group is every input, the last
    /// every output, each group ascending by node id.
    #[inline]
    pub fn layers(&self) -> &[Vec<usize>] {
        &self.layers
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of nodes plus number of connections
    #[inline]
    pub fn complexity(&self) -> usize {
        self.nodes.len() + self.connections.len()
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.node_index.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_position(&self, id: usize) -> Option<usize> {
        self.node_index.get(&id).copied()
    }

    pub fn connection(&self, path: (usize, usize)) -> Option<&Connection> {
        self.connection_index
            .get(&path)
            .map(|&idx| &self.connections[idx])
    }

    pub fn connection_position(&self, path: (usize, usize)) -> Option<usize> {
        self.connection_index.get(&path).copied()
    }

    /// Zero every recurrent cache
    pub fn flush(&mut self) {
        self.connections
            .iter_mut()
            .for_each(|c| c.output_cache = 0.);
    }

    /// Store each recurrent connection's source value, by node position
    pub(crate) fn cache_recurrent(&mut self, values: &[f64]) {
        for (conn, &(from, _)) in self.connections.iter_mut().zip(&self.graph.ends) {
            if conn.recurrent {
                conn.output_cache = values[from];
            }
        }
    }

    /// Length of the longest path from any input to node `id`, following enabled,
    /// non-recurrent connections. `None` when no such path exists.
    pub fn longest_path_to_input(&self, id: usize) -> Option<usize> {
        let idx = self.node_position(id)?;
        self.depths()[idx]
    }

    /// Whether a connection carries signal forward within one evaluation. Outputs always sit in
    /// the last layer, so nothing leaving one does.
    #[inline]
    fn feeds_forward(&self, c: usize) -> bool {
        let conn = &self.connections[c];
        let (from, to) = self.graph.ends[c];
        conn.enabled
            && !conn.recurrent
            && !self.nodes[from].is_output()
            && !self.nodes[to].is_input()
    }

    /// Longest path to an input for every node position.
    ///
    /// A depth-first walk out of the inputs marks every connection that closes a cycle, and the
    /// remaining forward connections are relaxed in topological order.
    fn depths(&self) -> Vec<Option<usize>> {
        const UNSEEN: u8 = 0;
        const ON_PATH: u8 = 1;
        const DONE: u8 = 2;

        let mut state = vec![UNSEEN; self.nodes.len()];
        let mut closes_cycle = vec![false; self.connections.len()];
        let mut stack: Vec<(usize, usize)> = vec![];
        for root in (0..self.nodes.len()).filter(|&idx| self.nodes[idx].is_input()) {
            state[root] = ON_PATH;
            stack.push((root, 0));
            while let Some(&(node, pos)) = stack.last() {
                let Some(&c) = self.graph.outgoing[node].get(pos) else {
                    state[node] = DONE;
                    stack.pop();
                    continue;
                };
                let top = stack.len() - 1;
                stack[top].1 += 1;
                if !self.feeds_forward(c) {
                    continue;
                }
                let (_, to) = self.graph.ends[c];
                match state[to] {
                    UNSEEN => {
                        state[to] = ON_PATH;
                        stack.push((to, 0));
                    }
                    ON_PATH => closes_cycle[c] = true,
                    _ => {}
                }
            }
        }

        let follows = |c: usize| self.feeds_forward(c) && !closes_cycle[c];
        let mut indegree = vec![0usize; self.nodes.len()];
        for (c, &(from, to)) in self.graph.ends.iter().enumerate() {
            if state[from] == DONE && follows(c) {
                indegree[to] += 1;
            }
        }

        let mut depth = vec![None; self.nodes.len()];
        let mut ready = vec![];
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.is_input() {
                depth[idx] = Some(0);
                ready.push(idx);
            }
        }
        while let Some(node) = ready.pop() {
            let next = depth[node].unwrap_or(0) + 1;
            for &c in &self.graph.outgoing[node] {
                if !follows(c) {
                    continue;
                }
                let (_, to) = self.graph.ends[c];
                depth[to] = depth[to].max(Some(next));
                indegree[to] -= 1;
                if indegree[to] == 0 {
                    ready.push(to);
                }
            }
        }

        depth
    }

    /// Rebuild the adjacency graph, assign every node its layer, regroup [Genome::layers], and
    /// reclassify every connection against the new layers.
    ///
    /// Hidden nodes take their longest path to an input, outputs sit one past the deepest hidden
    /// layer. A connection within one layer is disabled, one pointing to a lower layer is
    /// recurrent. Connections touching an unreachable node keep their flags.
    pub fn construct_layers(&mut self) {
        self.graph = Graph::new(&self.nodes, &self.connections, &self.node_index);

        let depths = self.depths();
        let mut inputs = vec![];
        let mut outputs = vec![];
        let mut hidden: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for idx in 0..self.nodes.len() {
            match self.nodes[idx].kind {
                NodeKind::Input => {
                    self.nodes[idx].layer = Some(0);
                    inputs.push(idx);
                }
                NodeKind::Output => outputs.push(idx),
                NodeKind::Hidden => {
                    let layer = depths[idx];
                    self.nodes[idx].layer = layer;
                    if let Some(layer) = layer {
                        hidden.entry(layer).or_default().push(idx);
                    }
                }
            }
        }

        let output_layer = hidden.keys().next_back().map_or(1, |deepest| deepest + 1);
        for &idx in &outputs {
            self.nodes[idx].layer = Some(output_layer);
        }

        let mut layers = Vec::with_capacity(hidden.len() + 2);
        layers.push(inputs);
        layers.extend(hidden.into_values());
        layers.push(outputs);
        for layer in layers.iter_mut() {
            layer.sort_by_key(|&idx| self.nodes[idx].id);
        }
        self.layers = layers;

        for (c, &(from, to)) in self.graph.ends.iter().enumerate() {
            let (Some(l_from), Some(l_to)) = (self.nodes[from].layer, self.nodes[to].layer) else {
                continue;
            };
            let conn = &mut self.connections[c];
            match l_from.cmp(&l_to) {
                Ordering::Equal => conn.enabled = false,
                Ordering::Greater => conn.recurrent = true,
                Ordering::Less => conn.recurrent = false,
            }
        }
    }

    fn index_nodes(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.id, idx))
            .collect();
    }

    fn index_connections(&mut self) {
        self.connection_index = self
            .connections
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.path(), idx))
            .collect();
    }

    #[inline]
    pub(crate) fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    #[inline]
    pub(crate) fn connections_mut(&mut self) -> &mut [Connection] {
        &mut self.connections
    }

    /// Insert keeping innovation order. The caller guarantees the path is new and both ends exist.
    /// Leaves layers stale.
    pub(crate) fn insert_connection(&mut self, connection: Connection) {
        debug_assert!(!self.connection_index.contains_key(&connection.path()));
        debug_assert!(self.node_index.contains_key(&connection.from));
        debug_assert!(self.node_index.contains_key(&connection.to));
        let at = self
            .connections
            .partition_point(|c| c.inno <= connection.inno);
        self.connections.insert(at, connection);
        self.index_connections();
    }

    /// Leaves layers stale
    pub(crate) fn remove_connection(&mut self, path: (usize, usize)) -> Option<Connection> {
        let idx = self.connection_index.get(&path).copied()?;
        let removed = self.connections.remove(idx);
        self.index_connections();
        Some(removed)
    }

    /// The caller guarantees the id is new. Leaves layers stale.
    pub(crate) fn push_node(&mut self, node: Node) {
        debug_assert!(!self.node_index.contains_key(&node.id));
        self.node_index.insert(node.id, self.nodes.len());
        self.nodes.push(node);
    }

    /// Remove a node along with every connection touching it. Leaves layers stale.
    pub(crate) fn remove_node(&mut self, id: usize) -> Option<Node> {
        let idx = self.node_index.get(&id).copied()?;
        let removed = self.nodes.remove(idx);
        self.index_nodes();
        self.connections.retain(|c| c.from != id && c.to != id);
        self.index_connections();
        Some(removed)
    }

    pub fn to_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string()?)?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_str(&fs::read_to_string(path)?)
    }
}

/// Layering invariants, checked by tests throughout the crate
#[cfg(test)]
pub(crate) fn assert_layered(genome: &Genome) {
    for c in genome.connections() {
        let (Some(l_from), Some(l_to)) = (
            genome.node(c.from).and_then(|n| n.layer),
            genome.node(c.to).and_then(|n| n.layer),
        ) else {
            continue;
        };
        if c.enabled && !c.recurrent {
            assert!(l_from < l_to, "forward connection {} not ascending", c.key());
        }
        if l_from > l_to {
            assert!(c.recurrent, "descending connection {} not recurrent", c.key());
        }
    }
    for (l, layer) in genome.layers().iter().enumerate() {
        assert!(layer
            .windows(2)
            .all(|w| genome.nodes()[w[0]].id < genome.nodes()[w[1]].id));
        if l == 0 {
            assert!(layer.iter().all(|&idx| genome.nodes()[idx].is_input()));
        }
    }
    assert!(genome
        .connections()
        .windows(2)
        .all(|w| w[0].inno < w[1].inno));
}
