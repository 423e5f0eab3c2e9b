//! Partitioning a population into species of compatible genomes.

use crate::{client::Client, config::Hyper, crossover::delta};
use fxhash::FxHashMap;
use std::collections::BTreeMap;

/// A collection of [Client]s whose genomes are compatible with the same representative,
/// ordered fittest first
#[derive(Debug, Clone, Default)]
pub struct Specie {
    pub members: Vec<Client>,
}

impl Specie {
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean of every member's score shared out over the specie. Unscored members count as 0.
    pub fn fit_adjusted(&self) -> f64 {
        let l = self.len() as f64;
        self.members
            .iter()
            .filter(|c| c.score.is_finite())
            .fold(0., |acc, c| acc + c.score / l)
            / l
    }
}

/// Partition a population into species.
///
/// Every specie from the last generation keeps its first member as representative. Each other
/// client joins the first specie whose representative is within `threshold`, or founds a new
/// one. Species are numbered by position, and members are sorted by score net of genome cost.
pub fn speciate(mut population: Vec<Client>, hyper: &Hyper) -> Vec<Specie> {
    let count = assign_species(&mut population, hyper);
    group(population, count)
}

/// The assignment half of [speciate]: number every client's specie in place, leaving the
/// population's order alone. Returns how many species there are.
pub(crate) fn assign_species(population: &mut [Client], hyper: &Hyper) -> usize {
    let mut previous = BTreeMap::new();
    for (idx, client) in population.iter().enumerate() {
        if let Some(s) = client.genome.species {
            previous.entry(s).or_insert(idx);
        }
    }

    let mut reprs = previous.into_values().collect::<Vec<_>>();
    let repr_of = reprs
        .iter()
        .enumerate()
        .map(|(specie, &idx)| (idx, specie))
        .collect::<FxHashMap<_, _>>();

    let mut assigned = Vec::with_capacity(population.len());
    for (idx, client) in population.iter().enumerate() {
        if let Some(&specie) = repr_of.get(&idx) {
            assigned.push(specie);
            continue;
        }

        match reprs
            .iter()
            .position(|&r| delta(&population[r].genome, &client.genome, hyper) <= hyper.threshold)
        {
            Some(specie) => assigned.push(specie),
            None => {
                assigned.push(reprs.len());
                reprs.push(idx);
            }
        }
    }

    for (client, specie) in population.iter_mut().zip(assigned) {
        client.genome.species = Some(specie);
    }
    reprs.len()
}

/// The grouping half of [speciate], for a population already numbered into `count` species
pub(crate) fn group(population: Vec<Client>, count: usize) -> Vec<Specie> {
    let mut species = vec![Specie::default(); count];
    for client in population {
        let specie = client.genome.species.unwrap_or_default();
        debug_assert!(specie < count);
        species[specie].members.push(client);
    }

    for specie in species.iter_mut() {
        specie
            .members
            .sort_by(|l, r| r.fitness().total_cmp(&l.fitness()));
    }

    species
}

/// Truncate every specie to its fittest `1 - cull_rate`, keeping at least one member
pub fn cull(species: &mut Vec<Specie>, cull_rate: f64) {
    for specie in species.iter_mut() {
        let keep = (((1. - cull_rate) * specie.len() as f64).floor() as usize).max(1);
        specie.members.truncate(keep);
    }
    species.retain(|s| !s.is_empty());
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::genome::{Connection, Genome, Node, NodeKind};
    use approx::assert_relative_eq;

    /// A genome with the minimal connections, plus `extra` disjoint ones numbered from `from`
    fn genome(extra: usize, from: usize) -> Genome {
        let mut nodes = vec![
            Node::new(0, NodeKind::Input, 0.),
            Node::new(1, NodeKind::Output, 0.),
        ];
        let mut connections = vec![Connection::new(0, 1, 1., 0)];
        for i in 0..extra {
            nodes.push(Node::new(10 + i, NodeKind::Hidden, 0.));
            connections.push(Connection::new(0, 10 + i, 1., from + i));
        }
        Genome::new(nodes, connections, None).unwrap()
    }

    fn client(genome: Genome, score: f64) -> Client {
        Client {
            score,
            ..Client::new(genome)
        }
    }

    #[test]
    fn test_speciate_groups_compatible() {
        let hyper = new_t!(Hyper, threshold = 3.);
        let pop = vec![
            client(genome(0, 1), 1.),
            client(genome(1, 1), 2.),
            client(genome(6, 100), 3.),
            client(genome(6, 100), 4.),
            client(genome(0, 1), 5.),
        ];
        let species = speciate(pop, &hyper);

        assert_eq!(species.len(), 2);
        assert_eq!(species[0].len(), 3);
        assert_eq!(species[1].len(), 2);
        assert_eq!(
            species[0].members.iter().map(|c| c.score).collect::<Vec<_>>(),
            vec![5., 2., 1.]
        );
        for (id, s) in species.iter().enumerate() {
            assert!(s.members.iter().all(|c| c.genome.species == Some(id)));
        }
    }

    #[test]
    fn test_sorted_net_of_cost() {
        let hyper = Hyper::default();
        let mut cheap = client(genome(0, 1), 3.);
        cheap.genome_cost = 0.5;
        let mut costly = client(genome(0, 1), 4.);
        costly.genome_cost = 2.;
        let species = speciate(vec![costly, cheap], &hyper);
        assert_eq!(species[0].members[0].score, 3.);
    }

    #[test]
    fn test_previous_repr_kept() {
        let hyper = new_t!(Hyper, threshold = 3.);
        let mut far = genome(6, 100);
        far.species = Some(4);
        let mut near = genome(0, 1);
        near.species = Some(9);
        // the new genome matches neither representative and founds a specie after them
        let pop = vec![
            client(genome(6, 200), 1.),
            client(near, 1.),
            client(far, 1.),
            client(genome(0, 1), 1.),
        ];
        let species = speciate(pop, &hyper);
        assert_eq!(species.len(), 3);
        // previous species come first, ordered by their old id
        assert_eq!(species[0].len(), 1);
        assert_eq!(species[1].len(), 2);
        assert_eq!(species[2].len(), 1);
        assert_eq!(species[2].members[0].genome.connections().len(), 7);
        assert_eq!(species[0].members[0].genome.connections()[1].inno, 100);
    }

    #[test]
    fn test_repr_stays_in_own_specie() {
        // two previous species whose representatives are compatible with each other
        let hyper = Hyper::default();
        let mut a = genome(0, 1);
        a.species = Some(0);
        let mut b = genome(0, 1);
        b.species = Some(1);
        let species = speciate(vec![client(a, 1.), client(b, 1.)], &hyper);
        assert_eq!(species.len(), 2);
    }

    #[test]
    fn test_assign_keeps_order() {
        let hyper = new_t!(Hyper, threshold = 3.);
        let mut pop = vec![
            client(genome(6, 100), 1.),
            client(genome(0, 1), 2.),
            client(genome(6, 100), 3.),
        ];
        assert_eq!(assign_species(&mut pop, &hyper), 2);
        assert_eq!(
            pop.iter().map(|c| (c.score, c.genome.species)).collect::<Vec<_>>(),
            vec![(1., Some(0)), (2., Some(1)), (3., Some(0))]
        );

        let species = group(pop, 2);
        assert_eq!(species[0].members[0].score, 3.);
        assert_eq!(species[1].len(), 1);
    }

    #[test]
    fn test_cull() {
        let hyper = Hyper::default();
        let pop = (0..9).map(|i| client(genome(0, 1), i as f64)).collect();
        let mut species = speciate(pop, &hyper);
        species.push(Specie {
            members: vec![client(genome(0, 1), 0.)],
        });
        cull(&mut species, 0.5);
        assert_eq!(species[0].len(), 4);
        assert_eq!(species[0].members[0].score, 8.);
        assert_eq!(species[0].members[3].score, 5.);
        assert_eq!(species[1].len(), 1);

        cull(&mut species, 1.);
        assert!(species.iter().all(|s| s.len() == 1));
    }

    #[test]
    fn test_fit_adjusted() {
        let s = Specie {
            members: vec![client(genome(0, 1), 4.), client(genome(0, 1), 2.)],
        };
        // (4 / 2 + 2 / 2) / 2
        assert_relative_eq!(s.fit_adjusted(), 1.5);
    }
}
