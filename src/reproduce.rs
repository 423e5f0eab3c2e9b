//! Functions related to reproducing on the specie and global population scale.

use crate::{
    client::Client,
    config::Hyper,
    crossover::crossover,
    genome::Node,
    random::Happens,
    specie::Specie,
};
use fxhash::FxHashMap;
use rand::{Rng, RngCore};

/// Select a random client with probability weighted by score.
/// Scores are shifted so negative scores are handled properly, unscored clients get the least
/// weight.
fn weighted_random_select<'a>(members: &'a [Client], rng: &mut impl RngCore) -> Option<&'a Client> {
    if members.is_empty() {
        return None;
    }

    let min_score = members
        .iter()
        .map(|c| c.score)
        .filter(|s| s.is_finite())
        .fold(f64::INFINITY, f64::min);
    let shift = if min_score.is_finite() && min_score < 0. {
        -min_score
    } else {
        0.
    };
    let epsilon = 1e-6;

    let weights = members
        .iter()
        .map(|c| {
            if c.score.is_finite() {
                c.score + shift + epsilon
            } else {
                epsilon
            }
        })
        .collect::<Vec<_>>();

    let total_weight = weights.iter().sum::<f64>();
    let mut threshold = rng.random::<f64>() * total_weight;
    for (i, weight) in weights.iter().enumerate() {
        threshold -= weight;
        if threshold <= 0. {
            return Some(&members[i]);
        }
    }

    members.last()
}

/// Per-specie memory of mean adjusted fitness, keyed by specie id
#[derive(Debug, Clone, Default)]
pub struct Stagnation {
    pub prev_spec_scores: FxHashMap<usize, f64>,
    pub dropoff_tracker: FxHashMap<usize, usize>,
}

impl Stagnation {
    /// Record this generation's specie fitnesses, returning which species went `dropoff`
    /// generations without improving. Those species lose their trackers.
    fn observe(&mut self, fitness: &[f64], dropoff: usize) -> Vec<bool> {
        fitness
            .iter()
            .enumerate()
            .map(|(id, &fit)| match self.prev_spec_scores.get(&id) {
                Some(&prev) if fit <= prev => {
                    let stale = self.dropoff_tracker.get(&id).map_or(1, |n| n + 1);
                    if stale >= dropoff {
                        self.forget(id);
                        true
                    } else {
                        self.dropoff_tracker.insert(id, stale);
                        self.prev_spec_scores.insert(id, fit);
                        false
                    }
                }
                _ => {
                    self.dropoff_tracker.remove(&id);
                    self.prev_spec_scores.insert(id, fit);
                    false
                }
            })
            .collect()
    }

    fn forget(&mut self, id: usize) {
        self.prev_spec_scores.remove(&id);
        self.dropoff_tracker.remove(&id);
    }
}

/// Offspring counts per specie, and the population's mean adjusted fitness
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub offspring: Vec<usize>,
    pub pop_fitness: f64,
}

/// Split `population` offspring between species proportionally to their shared fitness.
///
/// Species that stagnate for `dropoff` generations get nothing, as does the worst specie with
/// chance `drop_rate`. Counts sum to exactly `population` unless every specie is dropped, in
/// which case they're all zero.
pub fn allocate(
    species: &[Specie],
    population: usize,
    stagnation: &mut Stagnation,
    hyper: &Hyper,
    rng: &mut impl RngCore,
) -> Allocation {
    let fitness = species.iter().map(Specie::fit_adjusted).collect::<Vec<_>>();
    let (adjusted_sum, count) = species.iter().fold((0., 0), |(sum, count), s| {
        let l = s.len() as f64;
        s.members
            .iter()
            .filter(|c| c.score.is_finite())
            .fold((sum, count), |(sum, count), c| (sum + c.score / l, count + 1))
    });
    let pop_fitness = if count == 0 {
        0.
    } else {
        adjusted_sum / count as f64
    };

    // negative scores are shifted up so the lowest weighs in at epsilon
    let min_score = species
        .iter()
        .flat_map(|s| s.members.iter().map(|c| c.score))
        .filter(|s| s.is_finite())
        .fold(f64::INFINITY, f64::min);
    let shift = if min_score.is_finite() && min_score < 0. {
        -min_score
    } else {
        0.
    };
    let epsilon = 1e-6;
    let mut weights = species
        .iter()
        .map(|s| {
            s.members
                .iter()
                .map(|c| {
                    if c.score.is_finite() {
                        c.score + shift + epsilon
                    } else {
                        epsilon
                    }
                })
                .sum::<f64>()
                / s.len() as f64
        })
        .collect::<Vec<_>>();

    if !species.is_empty() && rng.happens(hyper.drop_rate) {
        let (worst, _) = fitness
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(w, wf), (i, &f)| {
                if f < wf {
                    (i, f)
                } else {
                    (w, wf)
                }
            });
        weights[worst] = 0.;
        stagnation.forget(worst);
    }

    for (weight, stale) in weights
        .iter_mut()
        .zip(stagnation.observe(&fitness, hyper.dropoff))
    {
        if stale {
            *weight = 0.;
        }
    }

    Allocation {
        offspring: largest_remainder(&weights, population),
        pop_fitness,
    }
}

/// Apportion `total` between `weights`, rounding so the parts sum exactly to `total`
fn largest_remainder(weights: &[f64], total: usize) -> Vec<usize> {
    let sum = weights.iter().sum::<f64>();
    if !(sum > 0. && sum.is_finite()) {
        return vec![0; weights.len()];
    }

    let quotas = weights
        .iter()
        .map(|w| w / sum * total as f64)
        .collect::<Vec<_>>();
    let mut parts = quotas.iter().map(|q| q.floor() as usize).collect::<Vec<_>>();

    let mut by_remainder = (0..quotas.len()).collect::<Vec<_>>();
    by_remainder.sort_by(|&l, &r| {
        (quotas[r] - quotas[r].floor()).total_cmp(&(quotas[l] - quotas[l].floor()))
    });
    let short = total.saturating_sub(parts.iter().sum());
    for &idx in by_remainder.iter().cycle().take(short) {
        parts[idx] += 1;
    }

    parts
}

/// Produce `offspring[i]` children from every specie `i`. A child is either a copy of one
/// roulette-selected member or the crossover of two, fitter first. Children are unscored and
/// unmutated.
pub fn breed(
    species: &[Specie],
    offspring: &[usize],
    mandatory: &[Node],
    hyper: &Hyper,
    rng: &mut impl RngCore,
) -> Vec<Client> {
    let mut children = Vec::with_capacity(offspring.iter().sum());
    for (specie, &size) in species.iter().zip(offspring) {
        for _ in 0..size {
            let genome = if rng.happens(hyper.clone_rate) {
                weighted_random_select(&specie.members, rng).map(|c| c.genome.clone())
            } else {
                weighted_random_select(&specie.members, rng)
                    .zip(weighted_random_select(&specie.members, rng))
                    .map(|(l, r)| {
                        let (fitter, other) = if l.score >= r.score { (l, r) } else { (r, l) };
                        crossover(&fitter.genome, &other.genome, mandatory, rng)
                    })
            };

            if let Some(genome) = genome {
                children.push(Client::new(genome));
            }
        }
    }

    children
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{genome::fixture, random::WyRng};
    use approx::assert_relative_eq;

    fn specie(scores: &[f64]) -> Specie {
        Specie {
            members: scores
                .iter()
                .map(|&score| Client {
                    score,
                    ..Client::new(fixture::minimal())
                })
                .collect(),
        }
    }

    #[test]
    fn test_weighted_select_prefers_fit() {
        let mut rng = WyRng::seeded(42);
        let members = specie(&[1., 2., 10.]).members;
        let picks = (0..1000)
            .filter(|_| weighted_random_select(&members, &mut rng).unwrap().score == 10.)
            .count();
        assert!(picks > 700, "{picks}");

        assert!(weighted_random_select(&[], &mut rng).is_none());
    }

    #[test]
    fn test_weighted_select_negative() {
        let mut rng = WyRng::seeded(7);
        let members = specie(&[-10., -0.5, f64::NEG_INFINITY]).members;
        let picks = (0..1000)
            .filter(|_| weighted_random_select(&members, &mut rng).unwrap().score == -0.5)
            .count();
        assert!(picks > 950, "{picks}");
    }

    #[test]
    fn test_largest_remainder() {
        assert_eq!(largest_remainder(&[1., 1., 1.], 10), vec![4, 3, 3]);
        assert_eq!(largest_remainder(&[1., 2.], 9), vec![3, 6]);
        assert_eq!(largest_remainder(&[0., 1.], 5), vec![0, 5]);
        assert_eq!(largest_remainder(&[0., 0.], 5), vec![0, 0]);
        assert_eq!(largest_remainder(&[], 5), Vec::<usize>::new());
        for total in 0..50 {
            assert_eq!(
                largest_remainder(&[0.3, 1.7, 2.2, 0.01], total).iter().sum::<usize>(),
                total
            );
        }
    }

    fn allocate_fresh(species: &[Specie], population: usize) -> Allocation {
        let hyper = new_t!(Hyper, drop_rate = 0.);
        let mut rng = WyRng::seeded(1);
        allocate(species, population, &mut Stagnation::default(), &hyper, &mut rng)
    }

    #[test]
    fn test_allocate_proportional() {
        let alloc = allocate_fresh(&[specie(&[3., 3.]), specie(&[1.])], 3);
        assert_eq!(alloc.offspring, vec![2, 1]);
        // (3 / 2 + 3 / 2 + 1 / 1) / 3
        assert_relative_eq!(alloc.pop_fitness, 4. / 3.);

        let alloc = allocate_fresh(&[specie(&[3., 3.]), specie(&[1.])], 100);
        assert_eq!(alloc.offspring, vec![75, 25]);
    }

    #[test]
    fn test_allocate_close_species_share() {
        let alloc = allocate_fresh(&[specie(&[5., 5.]), specie(&[4., 4., 4.])], 90);
        assert_eq!(alloc.offspring, vec![50, 40]);
    }

    #[test]
    fn test_allocate_negative_shifted() {
        let alloc = allocate_fresh(&[specie(&[-1.]), specie(&[-3.])], 10);
        assert_eq!(alloc.offspring, vec![10, 0]);

        let alloc = allocate_fresh(&[specie(&[-1.]), specie(&[-2.]), specie(&[-3.])], 30);
        assert_eq!(alloc.offspring, vec![20, 10, 0]);
    }

    #[test]
    fn test_allocate_unscored_even() {
        let alloc = allocate_fresh(
            &[specie(&[f64::NEG_INFINITY]), specie(&[f64::NEG_INFINITY])],
            10,
        );
        assert_eq!(alloc.offspring, vec![5, 5]);
        assert_eq!(alloc.pop_fitness, 0.);
    }

    #[test]
    fn test_allocate_dropoff() {
        let mut rng = WyRng::seeded(2);
        let hyper = new_t!(Hyper, dropoff = 2);
        let mut stagnation = Stagnation::default();
        let species = vec![specie(&[4.]), specie(&[2.]), specie(&[1.])];

        let first = allocate(&species, 30, &mut stagnation, &hyper, &mut rng);
        assert!(first.offspring[0] > 0);
        assert_eq!(stagnation.prev_spec_scores.len(), 3);
        assert!(stagnation.dropoff_tracker.is_empty());

        let second = allocate(&species, 30, &mut stagnation, &hyper, &mut rng);
        assert_eq!(second.offspring, first.offspring);
        assert_eq!(stagnation.dropoff_tracker.get(&0), Some(&1));

        let third = allocate(&species, 30, &mut stagnation, &hyper, &mut rng);
        assert_eq!(third.offspring, vec![0, 0, 0]);
        assert!(stagnation.prev_spec_scores.is_empty());
        assert!(stagnation.dropoff_tracker.is_empty());
    }

    #[test]
    fn test_allocate_improvement_resets() {
        let mut rng = WyRng::seeded(3);
        let hyper = new_t!(Hyper, dropoff = 2);
        let mut stagnation = Stagnation::default();

        allocate(&[specie(&[1.])], 10, &mut stagnation, &hyper, &mut rng);
        allocate(&[specie(&[1.])], 10, &mut stagnation, &hyper, &mut rng);
        assert_eq!(stagnation.dropoff_tracker.get(&0), Some(&1));

        let alloc = allocate(&[specie(&[2.])], 10, &mut stagnation, &hyper, &mut rng);
        assert_eq!(alloc.offspring, vec![10]);
        assert!(stagnation.dropoff_tracker.is_empty());
        assert_eq!(stagnation.prev_spec_scores.get(&0), Some(&2.));
    }

    #[test]
    fn test_allocate_drop_rate() {
        let mut rng = WyRng::seeded(4);
        let hyper = new_t!(Hyper, drop_rate = 1.);
        let mut stagnation = Stagnation::default();
        stagnation.prev_spec_scores.insert(1, 0.5);
        stagnation.dropoff_tracker.insert(1, 3);

        let species = vec![specie(&[5.]), specie(&[1.]), specie(&[3.])];
        let alloc = allocate(&species, 20, &mut stagnation, &hyper, &mut rng);
        assert_eq!(alloc.offspring[1], 0);
        assert_eq!(alloc.offspring.iter().sum::<usize>(), 20);
        // the dropped specie starts tracking afresh
        assert_eq!(stagnation.dropoff_tracker.get(&1), None);
    }

    #[test]
    fn test_breed_count() {
        let mut rng = WyRng::seeded(5);
        let species = vec![specie(&[1., 2., 3.]), specie(&[0.5])];
        let mandatory = fixture::minimal().nodes().to_vec();
        for hyper in [
            new_t!(Hyper, clone_rate = 0.),
            new_t!(Hyper, clone_rate = 1.),
            Hyper::default(),
        ] {
            let children = breed(&species, &[7, 3], &mandatory, &hyper, &mut rng);
            assert_eq!(children.len(), 10);
            assert!(children.iter().all(|c| c.score == f64::NEG_INFINITY));
            assert!(children.iter().all(|c| c.genome.connections().len() == 2));
        }
        assert!(breed(&species, &[0, 0], &mandatory, &Hyper::default(), &mut rng).is_empty());
    }
}
