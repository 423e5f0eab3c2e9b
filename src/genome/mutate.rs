//! Structural and parametric mutation.
//!
//! Structural operators return whether they changed the topology, and re-layer the genome
//! whenever they did.

use super::{Connection, Genome, NodeKind};
use crate::{
    activate::Activation,
    config::Settings,
    constants::STRATA_MUTATION_RETRIES,
    innovation::Registry,
    random::{random_between, random_std0, Happens},
};
use rand::{seq::IndexedRandom, Rng, RngCore};
use tracing::trace;

impl Genome {
    /// Connect `from` to `to`, with a random weight when `weight` is `None`.
    ///
    /// Rejected when either end is missing or unreachable, when both ends share a layer, when the
    /// connection would be recurrent and the recurrent chance fails, and when it already exists
    /// enabled. An existing disabled connection is re-enabled by chance instead.
    pub fn add_connection(
        &mut self,
        from: usize,
        to: usize,
        weight: Option<f64>,
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) -> bool {
        let (Some(l_from), Some(l_to)) = (
            self.node(from).and_then(|n| n.layer),
            self.node(to).and_then(|n| n.layer),
        ) else {
            trace!(from, to, "connection rejected: missing or unreachable end");
            return false;
        };

        if l_from == l_to {
            trace!(from, to, layer = l_from, "connection rejected: same layer");
            return false;
        }

        if l_from > l_to && !rng.happens(settings.probs.add_recurrent_chance) {
            trace!(from, to, "connection rejected: recurrent");
            return false;
        }

        if let Some(idx) = self.connection_position((from, to)) {
            if self.connections[idx].enabled
                || !rng.happens(settings.probs.re_enable_connection_chance)
            {
                trace!(from, to, "connection rejected: exists");
                return false;
            }
            self.connections[idx].enabled = true;
            self.construct_layers();
            return true;
        }

        let hyper = &settings.hyper;
        let weight =
            weight.unwrap_or_else(|| random_between(rng, hyper.min_weight, hyper.max_weight));
        let mut connection =
            Connection::new(from, to, weight, registry.innogen.path((from, to)));
        connection.recurrent = l_from > l_to;
        self.insert_connection(connection);
        self.construct_layers();
        true
    }

    /// Try to connect two random nodes
    pub fn mutate_connection(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        for _ in 0..STRATA_MUTATION_RETRIES {
            let from = self.nodes[rng.random_range(0..self.nodes.len())].id;
            let to = self.nodes[rng.random_range(0..self.nodes.len())].id;
            if self.add_connection(from, to, None, rng, registry, settings) {
                return true;
            }
        }

        false
    }

    /// Split the connection at `path` through a hidden node. The connection is disabled, the
    /// segment into the node weighs 1 and the segment out of it keeps the original weight.
    pub fn interpose(
        &mut self,
        path: (usize, usize),
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) -> bool {
        let Some(idx) = self.connection_position(path) else {
            return false;
        };
        let Connection {
            from,
            to,
            weight,
            enabled,
            recurrent,
            ..
        } = self.connections[idx];
        if !enabled || recurrent {
            return false;
        }

        let node = registry.interposer(path, rng, settings);
        if self.node(node.id).is_some() {
            trace!(from, to, node = node.id, "interpose rejected: node present");
            return false;
        }

        self.connections[idx].enabled = false;
        let into = Connection::new(from, node.id, 1., registry.innogen.path((from, node.id)));
        let out = Connection::new(node.id, to, weight, registry.innogen.path((node.id, to)));
        self.push_node(node);
        self.insert_connection(into);
        self.insert_connection(out);
        self.construct_layers();
        true
    }

    /// Try to split a random enabled, non-recurrent connection
    pub fn mutate_interpose(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) -> bool {
        if self.connections.is_empty() {
            return false;
        }

        for _ in 0..STRATA_MUTATION_RETRIES {
            let c = &self.connections[rng.random_range(0..self.connections.len())];
            if !c.enabled || c.recurrent {
                continue;
            }
            let path = c.path();
            if registry
                .replace_pool
                .get(&path)
                .is_some_and(|n| self.node(n.id).is_some())
            {
                continue;
            }
            if self.interpose(path, rng, registry, settings) {
                return true;
            }
        }

        false
    }

    /// Remove a random connection. A hidden end left without its only parent or only child is
    /// removed along with its remaining connections.
    pub fn mutate_delete_connection(&mut self, rng: &mut impl RngCore) -> bool {
        if self.connections.is_empty() {
            return false;
        }

        let c = rng.random_range(0..self.connections.len());
        let (from, to) = self.graph.ends[c];
        let orphaned_to = self.nodes[to].is_hidden() && self.graph.incoming[to].len() == 1;
        let orphaned_from = self.nodes[from].is_hidden() && self.graph.outgoing[from].len() == 1;
        let (from_id, to_id) = (self.nodes[from].id, self.nodes[to].id);

        self.remove_connection((from_id, to_id));
        if orphaned_to {
            trace!(node = to_id, "cascading delete");
            self.remove_node(to_id);
        }
        if orphaned_from {
            trace!(node = from_id, "cascading delete");
            self.remove_node(from_id);
        }
        self.construct_layers();
        true
    }

    /// Collapse a random hidden node with a single parent or a single child, connecting its
    /// neighbours directly with the product of the collapsed weights
    pub fn mutate_delete_node(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) -> bool {
        let hidden = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_hidden())
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();

        for _ in 0..STRATA_MUTATION_RETRIES {
            let Some(&idx) = hidden.choose(rng) else {
                return false;
            };
            let parents = self.graph.incoming[idx]
                .iter()
                .map(|&c| (self.connections[c].from, self.connections[c].weight))
                .collect::<Vec<_>>();
            let children = self.graph.outgoing[idx]
                .iter()
                .map(|&c| (self.connections[c].to, self.connections[c].weight))
                .collect::<Vec<_>>();
            if parents.len() != 1 && children.len() != 1 {
                continue;
            }

            let id = self.nodes[idx].id;
            let bridges = parents
                .iter()
                .flat_map(|&(from, w_in)| {
                    children
                        .iter()
                        .map(move |&(to, w_out)| (from, to, w_in * w_out))
                })
                .collect::<Vec<_>>();
            for (from, to, weight) in bridges {
                self.add_connection(from, to, Some(weight), rng, registry, settings);
            }

            trace!(node = id, "deleting node");
            self.remove_node(id);
            self.construct_layers();
            return true;
        }

        false
    }

    /// Disable a random enabled connection
    pub fn mutate_disable_connection(&mut self, rng: &mut impl RngCore) -> bool {
        let enabled = self
            .connections
            .iter()
            .enumerate()
            .filter(|(_, c)| c.enabled)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        let Some(&idx) = enabled.choose(rng) else {
            return false;
        };

        self.connections[idx].enabled = false;
        self.construct_layers();
        true
    }

    /// Give a random non-input node an activation from `allowed`
    pub fn mutate_activation(&mut self, rng: &mut impl RngCore, allowed: &[Activation]) {
        let Some(&activation) = allowed.choose(rng) else {
            return;
        };
        let candidates = self
            .nodes
            .iter_mut()
            .filter(|n| !n.is_input())
            .collect::<Vec<_>>();
        if candidates.is_empty() {
            return;
        }
        let pick = rng.random_range(0..candidates.len());
        if let Some(node) = candidates.into_iter().nth(pick) {
            node.activation = activation;
        }
    }

    pub fn mutate_bias_shift(&mut self, rng: &mut impl RngCore, strength: f64) {
        if self.nodes.is_empty() {
            return;
        }
        let shift = random_std0(rng) * strength;
        let idx = rng.random_range(0..self.nodes.len());
        let node = &mut self.nodes[idx];
        node.bias += shift * node.bias;
    }

    pub fn mutate_bias_random(&mut self, rng: &mut impl RngCore, min: f64, max: f64) {
        if self.nodes.is_empty() {
            return;
        }
        let idx = rng.random_range(0..self.nodes.len());
        self.nodes[idx].bias = random_between(rng, min, max);
    }

    pub fn mutate_weight_shift(&mut self, rng: &mut impl RngCore, strength: f64) {
        if self.connections.is_empty() {
            return;
        }
        let shift = random_std0(rng) * strength;
        let idx = rng.random_range(0..self.connections.len());
        let c = &mut self.connections[idx];
        c.weight += shift * c.weight;
    }

    pub fn mutate_weight_random(&mut self, rng: &mut impl RngCore, min: f64, max: f64) {
        if self.connections.is_empty() {
            return;
        }
        let idx = rng.random_range(0..self.connections.len());
        self.connections[idx].weight = random_between(rng, min, max);
    }

    /// Parametric mutation: maybe an activation, maybe a bias, maybe a weight
    pub fn mutate(&mut self, rng: &mut impl RngCore, settings: &Settings) {
        let (hyper, probs) = (&settings.hyper, &settings.probs);
        if rng.happens(probs.random_activation_chance) {
            self.mutate_activation(rng, &settings.allowed_activations);
        }

        if rng.happens(probs.bias_mutation_chance) {
            if rng.happens(probs.bias_shift_chance) {
                self.mutate_bias_shift(rng, hyper.bias_shift_strength);
            } else {
                self.mutate_bias_random(rng, hyper.min_bias, hyper.max_bias);
            }
        }

        if self.connections.is_empty() {
            return;
        }

        if rng.happens(probs.weight_mutation_chance) {
            if rng.happens(probs.weight_shift_chance) {
                self.mutate_weight_shift(rng, hyper.weight_shift_strength);
            } else {
                self.mutate_weight_random(rng, hyper.min_weight, hyper.max_weight);
            }
        }
    }

    /// Growth: maybe a connection, maybe a split, maybe a disable, then parametric mutation
    pub fn augment(&mut self, rng: &mut impl RngCore, registry: &mut Registry, settings: &Settings) {
        let probs = &settings.probs;
        if rng.happens(probs.add_connection_chance) {
            self.mutate_connection(rng, registry, settings);
        }

        if self.connections.is_empty() {
            return;
        }

        if rng.happens(probs.add_node_chance) {
            self.mutate_interpose(rng, registry, settings);
        }
        if rng.happens(probs.disable_connection_chance) {
            self.mutate_disable_connection(rng);
        }
        self.mutate(rng, settings);
    }

    /// Shrinkage: maybe drop a connection, maybe collapse a node, then parametric mutation
    pub fn simplify(
        &mut self,
        rng: &mut impl RngCore,
        registry: &mut Registry,
        settings: &Settings,
    ) {
        if self.connections.is_empty() {
            return;
        }

        let probs = &settings.probs;
        if rng.happens(probs.delete_connection_chance) {
            self.mutate_delete_connection(rng);
        }
        if rng.happens(probs.delete_node_chance) {
            self.mutate_delete_node(rng, registry, settings);
        }
        self.mutate(rng, settings);
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        config::{Probs, Settings},
        genome::{assert_layered, fixture, Node},
        innovation::InnoGen,
        random::WyRng,
    };
    use NodeKind::*;

    fn setup(inputs: usize, outputs: usize, seed: u64) -> (WyRng, Registry, Settings) {
        let mut rng = WyRng::seeded(seed);
        let settings = Settings::default();
        let registry = Registry::new(inputs, outputs, &mut rng, &settings);
        (rng, registry, settings)
    }

    fn always(settings: &mut Settings) {
        settings.probs = new_t!(
            Probs,
            add_recurrent_chance = 1.,
            re_enable_connection_chance = 1.,
        );
    }

    #[test]
    fn test_interpose() {
        let (mut rng, mut reg, settings) = setup(2, 1, 1);
        let mut g = reg.blank_genome(&mut rng, &settings.hyper);
        let (nodes, conns) = (g.nodes().len(), g.connections().len());
        let weight = g.connection((0, 2)).unwrap().weight;

        assert!(g.interpose((0, 2), &mut rng, &mut reg, &settings));
        assert_eq!(g.nodes().len(), nodes + 1);
        assert_eq!(g.connections().len(), conns + 2);
        assert!(!g.connection((0, 2)).unwrap().enabled);
        assert_eq!(g.connection((0, 3)).unwrap().weight, 1.);
        assert_eq!(g.connection((3, 2)).unwrap().weight, weight);
        assert_eq!(g.node(3).unwrap().layer, Some(1));
        assert_eq!(g.node(2).unwrap().layer, Some(2));
        assert_layered(&g);

        // a disabled connection can't be split again
        assert!(!g.interpose((0, 2), &mut rng, &mut reg, &settings));
    }

    #[test]
    fn test_interpose_shares_node_across_genomes() {
        let (mut rng, mut reg, settings) = setup(2, 1, 2);
        let mut l = reg.blank_genome(&mut rng, &settings.hyper);
        let mut r = reg.blank_genome(&mut rng, &settings.hyper);
        assert!(l.interpose((1, 2), &mut rng, &mut reg, &settings));
        assert!(r.interpose((1, 2), &mut rng, &mut reg, &settings));

        let inno = |g: &Genome, p| g.connection(p).unwrap().inno;
        assert_eq!(inno(&l, (1, 3)), inno(&r, (1, 3)));
        assert_eq!(inno(&l, (3, 2)), inno(&r, (3, 2)));
        assert_eq!(reg.node_pool.len(), 4);
    }

    #[test]
    fn test_add_connection_rules() {
        let (mut rng, mut reg, mut settings) = setup(2, 1, 3);
        let mut g = reg.blank_genome(&mut rng, &settings.hyper);
        g.interpose((0, 2), &mut rng, &mut reg, &settings);

        // same layer
        assert!(!g.add_connection(0, 1, None, &mut rng, &mut reg, &settings));
        // exists and enabled
        assert!(!g.add_connection(0, 3, None, &mut rng, &mut reg, &settings));
        // recurrent, but recurrence is off
        assert!(!g.add_connection(2, 3, None, &mut rng, &mut reg, &settings));
        // missing
        assert!(!g.add_connection(0, 42, None, &mut rng, &mut reg, &settings));

        assert!(g.add_connection(1, 3, Some(0.5), &mut rng, &mut reg, &settings));
        let c = g.connection((1, 3)).unwrap();
        assert_eq!(c.weight, 0.5);
        assert!(!c.recurrent);

        always(&mut settings);
        assert!(g.add_connection(2, 3, Some(2.), &mut rng, &mut reg, &settings));
        assert!(g.connection((2, 3)).unwrap().recurrent);
        // disabled by the split, re-enabled by chance
        assert!(g.add_connection(0, 2, None, &mut rng, &mut reg, &settings));
        assert!(g.connection((0, 2)).unwrap().enabled);
        assert_layered(&g);
    }

    #[test]
    fn test_add_connection_keeps_inno_order() {
        let (mut rng, mut reg, settings) = setup(2, 1, 4);
        let mut l = reg.blank_genome(&mut rng, &settings.hyper);
        let mut r = reg.blank_genome(&mut rng, &settings.hyper);
        l.interpose((0, 2), &mut rng, &mut reg, &settings);
        l.add_connection(1, 3, None, &mut rng, &mut reg, &settings);
        r.interpose((0, 2), &mut rng, &mut reg, &settings);
        r.interpose((1, 2), &mut rng, &mut reg, &settings);
        // (1, 3) was numbered before r's second split
        r.add_connection(1, 3, None, &mut rng, &mut reg, &settings);
        assert_layered(&r);
        assert_eq!(
            r.connection((1, 3)).unwrap().inno,
            l.connection((1, 3)).unwrap().inno
        );
    }

    #[test]
    fn test_delete_connection_cascades() {
        let mut rng = WyRng::seeded(5);
        for _ in 0..50 {
            let mut g = fixture::genome(
                &[(0, Input), (1, Output), (2, Hidden)],
                &[(0, 2, 1.), (2, 1, 1.)],
            );
            assert!(g.mutate_delete_connection(&mut rng));
            // either way the hidden node loses its only parent or child
            assert_eq!(g.nodes().len(), 2);
            assert!(g.connections().is_empty());
            assert!(g.node(0).is_some() && g.node(1).is_some());
            assert_layered(&g);
        }
    }

    #[test]
    fn test_delete_connection_keeps_supported_nodes() {
        let mut rng = WyRng::seeded(6);
        let mut g = fixture::genome(
            &[(0, Input), (1, Input), (2, Output), (3, Hidden)],
            &[(0, 3, 1.), (1, 3, 1.), (3, 2, 1.), (0, 2, 1.)],
        );
        let before = g.nodes().len();
        while g.connections().len() == 4 {
            g.mutate_delete_connection(&mut rng);
        }
        let node_kept = g.node(3).is_some();
        if !node_kept {
            // only the hidden node's sole child could have gone
            assert!(g.connection((0, 2)).is_some());
            assert_eq!(g.nodes().len(), before - 1);
        }
        assert_layered(&g);
    }

    #[test]
    fn test_delete_node() {
        let mut rng = WyRng::seeded(7);
        let settings = Settings::default();
        // numbered past the fixture's innovations
        let mut reg = Registry {
            innogen: InnoGen::new(10),
            ..Registry::default()
        };
        let mut g = fixture::genome(
            &[(0, Input), (1, Input), (2, Output), (3, Hidden)],
            &[(0, 3, 2.), (1, 3, 3.), (3, 2, 0.5)],
        );
        assert!(g.mutate_delete_node(&mut rng, &mut reg, &settings));
        assert!(g.node(3).is_none());
        assert_eq!(g.connection((0, 2)).unwrap().weight, 1.);
        assert_eq!(g.connection((1, 2)).unwrap().weight, 1.5);
        assert_eq!(g.count_kind(Input), 2);
        assert_eq!(g.count_kind(Output), 1);
        assert_layered(&g);
    }

    #[test]
    fn test_delete_node_needs_single_side() {
        let (mut rng, mut reg, settings) = setup(2, 2, 8);
        let mut g = fixture::genome(
            &[
                (0, Input),
                (1, Input),
                (2, Output),
                (3, Output),
                (4, Hidden),
            ],
            &[(0, 4, 1.), (1, 4, 1.), (4, 2, 1.), (4, 3, 1.)],
        );
        assert!(!g.mutate_delete_node(&mut rng, &mut reg, &settings));
        assert!(g.node(4).is_some());

        let mut g = fixture::minimal();
        assert!(!g.mutate_delete_node(&mut rng, &mut reg, &settings));
    }

    #[test]
    fn test_delete_node_only_hidden() {
        let (mut rng, mut reg, mut settings) = setup(2, 1, 9);
        settings.probs = new_t!(Probs, add_node_chance = 0.5, add_connection_chance = 0.5);
        let mut g = reg.blank_genome(&mut rng, &settings.hyper);
        for _ in 0..30 {
            g.augment(&mut rng, &mut reg, &settings);
        }
        for _ in 0..200 {
            let inputs = g.count_kind(Input);
            let outputs = g.count_kind(Output);
            let hidden = g.count_kind(Hidden);
            if g.mutate_delete_node(&mut rng, &mut reg, &settings) {
                assert_eq!(g.count_kind(Hidden), hidden - 1);
            }
            assert_eq!(g.count_kind(Input), inputs);
            assert_eq!(g.count_kind(Output), outputs);
            assert_layered(&g);
        }
    }

    #[test]
    fn test_disable_connection() {
        let mut rng = WyRng::seeded(10);
        let mut g = fixture::minimal();
        assert!(g.mutate_disable_connection(&mut rng));
        assert!(g.mutate_disable_connection(&mut rng));
        assert!(g.connections().iter().all(|c| !c.enabled));
        assert!(!g.mutate_disable_connection(&mut rng));
    }

    #[test]
    fn test_activation_skips_inputs() {
        let mut rng = WyRng::seeded(11);
        let mut g = fixture::minimal();
        for _ in 0..20 {
            g.mutate_activation(&mut rng, &[Activation::Sin]);
        }
        assert!(g
            .nodes()
            .iter()
            .all(|n| n.is_input() == (n.activation == Activation::Identity)));
        assert_eq!(g.node(2).unwrap().activation, Activation::Sin);

        g.mutate_activation(&mut rng, &[]);
        assert_eq!(g.node(2).unwrap().activation, Activation::Sin);
    }

    #[test]
    fn test_shift_is_proportional() {
        let mut rng = WyRng::seeded(12);
        let mut g = Genome::assemble(vec![Node::new(0, Input, 0.)], vec![], None);
        g.mutate_bias_shift(&mut rng, 0.2);
        assert_eq!(g.nodes()[0].bias, 0.);

        let mut g = fixture::minimal();
        for _ in 0..100 {
            g.mutate_weight_shift(&mut rng, 0.2);
        }
        assert!(g
            .connections()
            .iter()
            .all(|c| c.weight > 0. && c.weight < 1.2f64.powi(100)));
    }

    #[test]
    fn test_random_within_bounds() {
        let mut rng = WyRng::seeded(13);
        let mut g = fixture::minimal();
        for _ in 0..100 {
            g.mutate_weight_random(&mut rng, -2., 2.);
            g.mutate_bias_random(&mut rng, 5., 6.);
        }
        assert!(g.connections().iter().all(|c| (-2. ..=2.).contains(&c.weight)));
        assert!(g
            .nodes()
            .iter()
            .filter(|n| n.bias != 0.)
            .all(|n| (5. ..=6.).contains(&n.bias)));
    }

    #[test]
    fn test_augment_simplify_keep_layering() {
        let (mut rng, mut reg, mut settings) = setup(3, 2, 14);
        settings.probs = new_t!(
            Probs,
            add_connection_chance = 0.6,
            add_node_chance = 0.4,
            add_recurrent_chance = 0.5,
            disable_connection_chance = 0.1,
            delete_connection_chance = 0.3,
            delete_node_chance = 0.3,
            random_activation_chance = 0.2,
        );
        let mut g = reg.blank_genome(&mut rng, &settings.hyper);
        for _ in 0..200 {
            g.augment(&mut rng, &mut reg, &settings);
            assert_layered(&g);
        }
        assert!(g.count_kind(Hidden) > 0);
        for _ in 0..200 {
            g.simplify(&mut rng, &mut reg, &settings);
            assert_layered(&g);
        }
        assert_eq!(g.count_kind(Input), 3);
        assert_eq!(g.count_kind(Output), 2);
    }
}
