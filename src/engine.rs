//! The population manager: owns every client and the registries they share, and steps the
//! population one generation at a time.

use crate::{
    client::Client,
    config::{Options, Settings},
    genome::{Genome, Node, NodeKind},
    innovation::Registry,
    random::{default_rng, WyRng},
    reproduce::{allocate, breed, Stagnation},
    specie::{assign_species, cull, group},
};
use core::cmp::Ordering;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// State of the complexity regulation: the population grows until fitness plateaus past a
/// complexity ceiling, then prunes until complexity stops dropping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regulation {
    pub next_prune_complexity: f64,
    pub pruning: bool,
    #[serde(rename = "lastMCP")]
    pub last_mcp: f64,
    pub mcp_floor_count: usize,
    pub last_pop_fitness: f64,
    pub current_pop_fitness: f64,
    pub fitness_platau_count: usize,
}

#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) inputs: usize,
    pub(crate) outputs: usize,
    pub(crate) max_pop: usize,
    pub(crate) settings: Settings,
    pub(crate) registry: Registry,
    pub(crate) population: Vec<Client>,
    pub(crate) stagnation: Stagnation,
    pub(crate) regulation: Regulation,
    pub(crate) generation_limit: Option<usize>,
    pub(crate) rng: WyRng,
}

impl Engine {
    /// An engine with a fresh population of `options.max_pop` clients
    pub fn new(inputs: usize, outputs: usize, options: Options) -> Self {
        let mut engine = Self {
            inputs,
            outputs,
            max_pop: options.max_pop,
            settings: options.settings(),
            registry: Registry::default(),
            population: vec![],
            stagnation: Stagnation::default(),
            regulation: Regulation::default(),
            generation_limit: options.generation_limit,
            rng: options.seed.map_or_else(default_rng, WyRng::seeded),
        };
        engine.reset();
        engine
    }

    /// Start over: new registries, a new population of blank genomes each augmented
    /// `initial_mutation` times, and regulation state cleared
    pub fn reset(&mut self) {
        self.registry = Registry::new(self.inputs, self.outputs, &mut self.rng, &self.settings);
        self.population = Vec::with_capacity(self.max_pop);
        for _ in 0..self.max_pop {
            let mut genome = self.registry.blank_genome(&mut self.rng, &self.settings.hyper);
            for _ in 0..self.settings.hyper.initial_mutation {
                genome.augment(&mut self.rng, &mut self.registry, &self.settings);
            }
            self.population.push(Client::new(genome));
        }

        self.stagnation = Stagnation::default();
        self.regulation = Regulation {
            next_prune_complexity: self.mcp() + self.settings.hyper.complexity_threshold,
            ..Regulation::default()
        };
    }

    /// Every mandatory node, fully connected, with random parameters
    pub fn blank_genome(&mut self) -> Genome {
        self.registry
            .blank_genome(&mut self.rng, &self.settings.hyper)
    }

    /// Mint a node that no genome has used yet
    pub fn new_node(&mut self, kind: NodeKind) -> Node {
        self.registry
            .new_node(kind, &mut self.rng, &self.settings.hyper)
    }

    /// Mean population complexity, nodes plus connections
    pub fn mcp(&self) -> f64 {
        if self.population.is_empty() {
            return 0.;
        }

        self.population
            .iter()
            .map(|c| c.genome.complexity())
            .sum::<usize>() as f64
            / self.population.len() as f64
    }

    /// Charge every client for the size of its genome. Skipped entirely when both unit costs
    /// are 0, leaving old costs in place.
    pub fn populate_genome_costs(&mut self) {
        let hyper = &self.settings.hyper;
        if hyper.connection_cost == 0. && hyper.node_cost == 0. {
            return;
        }

        for client in self.population.iter_mut() {
            client.genome_cost = client.genome.connections().len() as f64 * hyper.connection_cost
                + client.genome.nodes().len() as f64 * hyper.node_cost;
        }
    }

    /// Grow every genome, or shrink every genome while pruning
    pub fn mutate(&mut self) {
        for client in self.population.iter_mut() {
            if self.regulation.pruning {
                client
                    .genome
                    .simplify(&mut self.rng, &mut self.registry, &self.settings);
            } else {
                client
                    .genome
                    .augment(&mut self.rng, &mut self.registry, &self.settings);
            }
        }
    }

    /// Step the population one generation, from the scores it holds now
    pub fn evolve(&mut self) {
        self.population
            .sort_by(|l, r| r.fitness().total_cmp(&l.fitness()));
        self.populate_genome_costs();

        let mut population = core::mem::take(&mut self.population);
        let species_count = assign_species(&mut population, &self.settings.hyper);

        // ranked by the costs they were scored under
        let elite_count = ((population.len() as f64 * self.settings.hyper.elitism).ceil() as usize)
            .min(self.max_pop);
        let mut elites = population
            .iter()
            .take(elite_count)
            .map(|c| Client::new(c.genome.clone()))
            .collect::<Vec<_>>();
        let mut species = group(population, species_count);

        let hyper = &mut self.settings.hyper;
        match species.len().cmp(&hyper.species_target) {
            Ordering::Greater => hyper.threshold += 1.,
            Ordering::Less => hyper.threshold = (hyper.threshold - 1.).max(0.),
            Ordering::Equal => (),
        }

        cull(&mut species, self.settings.hyper.cull_rate);
        let allocation = allocate(
            &species,
            self.max_pop - elites.len(),
            &mut self.stagnation,
            &self.settings.hyper,
            &mut self.rng,
        );
        self.population = breed(
            &species,
            &allocation.offspring,
            &self.registry.mandatory,
            &self.settings.hyper,
            &mut self.rng,
        );
        self.regulation.current_pop_fitness = allocation.pop_fitness;

        while self.population.len() + elites.len() < self.max_pop {
            let genome = self.blank_genome();
            self.population.push(Client::new(genome));
        }

        self.mutate();
        elites.append(&mut self.population);
        self.population = elites;

        self.regulate();
        debug!(
            species = species_count,
            threshold = self.settings.hyper.threshold,
            pruning = self.regulation.pruning,
            mcp = self.regulation.last_mcp,
            fitness = self.regulation.current_pop_fitness,
            "evolved generation"
        );
    }

    /// Advance the fitness plateau counter and the pruning state machine
    fn regulate(&mut self) {
        let mcp = self.mcp();
        let hyper = &self.settings.hyper;
        let r = &mut self.regulation;

        if r.current_pop_fitness > r.last_pop_fitness {
            r.fitness_platau_count = 0;
        } else {
            r.fitness_platau_count += 1;
        }
        r.last_pop_fitness = r.current_pop_fitness;

        if !r.pruning {
            if r.fitness_platau_count >= hyper.fitness_platau_threshold
                && mcp >= r.next_prune_complexity
            {
                r.pruning = true;
                r.mcp_floor_count = 0;
                debug!(mcp, "pruning started");
            }
        } else {
            if mcp < r.last_mcp {
                r.mcp_floor_count = 0;
            } else {
                r.mcp_floor_count += 1;
            }

            if r.mcp_floor_count >= hyper.complexity_floor_delay {
                r.pruning = false;
                r.mcp_floor_count = 0;
                r.next_prune_complexity = mcp + hyper.complexity_threshold;
                r.fitness_platau_count = 0;
                debug!(mcp, ceiling = r.next_prune_complexity, "pruning stopped");
            }
        }
        r.last_mcp = mcp;
    }

    #[inline]
    pub fn population(&self) -> &[Client] {
        &self.population
    }

    #[inline]
    pub fn population_mut(&mut self) -> &mut [Client] {
        &mut self.population
    }

    /// The highest scoring client
    pub fn fittest(&self) -> Option<&Client> {
        self.population
            .iter()
            .max_by(|l, r| l.score.total_cmp(&r.score))
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn regulation(&self) -> &Regulation {
        &self.regulation
    }

    #[inline]
    pub fn stagnation(&self) -> &Stagnation {
        &self.stagnation
    }

    /// (inputs, outputs)
    #[inline]
    pub fn io(&self) -> (usize, usize) {
        (self.inputs, self.outputs)
    }

    #[inline]
    pub fn max_pop(&self) -> usize {
        self.max_pop
    }
}
