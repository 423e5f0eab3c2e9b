//! Training loops, scoring the population and evolving it until an objective is met.

use crate::{
    client::Client,
    engine::Engine,
    error::{Error, Result},
    loss::{LossFn, Outcome, Sample},
};
use tracing::info;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// The outcome of a training run: the best client of the last scored generation, and how many
/// generations were evolved to get there
#[derive(Debug, Clone)]
pub struct Trained {
    pub client: Client,
    pub generation: usize,
}

impl Engine {
    /// Score every client with `eval`, returning the best score
    fn score_with<F>(&mut self, eval: &F) -> Result<f64>
    where
        F: Fn(&mut Client) -> Result<f64> + Sync,
    {
        let score = |client: &mut Client| -> Result<f64> {
            client.score = eval(client)?;
            Ok(client.score)
        };

        #[cfg(feature = "parallel")]
        let scores = self
            .population
            .par_iter_mut()
            .map(score)
            .collect::<Result<Vec<_>>>()?;
        #[cfg(not(feature = "parallel"))]
        let scores = self
            .population
            .iter_mut()
            .map(score)
            .collect::<Result<Vec<_>>>()?;

        Ok(scores.into_iter().fold(f64::NEG_INFINITY, f64::max))
    }

    #[inline]
    fn exhausted(&self, generation: usize) -> bool {
        self.generation_limit.is_some_and(|limit| generation >= limit)
    }

    fn trained(&mut self, generation: usize) -> Result<Trained> {
        self.population
            .sort_by(|l, r| r.score.total_cmp(&l.score));
        let client = self
            .population
            .first()
            .cloned()
            .ok_or(Error::EmptyPopulation)?;
        Ok(Trained { client, generation })
    }

    /// Evolve until the best score `eval` hands out is within `target_loss` of `goal`, or the
    /// generation limit is reached
    pub fn train_with_function<F>(
        &mut self,
        eval: F,
        goal: f64,
        target_loss: f64,
        log: bool,
    ) -> Result<Trained>
    where
        F: Fn(&mut Client) -> Result<f64> + Sync,
    {
        if self.population.is_empty() {
            return Err(Error::EmptyPopulation);
        }

        let mut best = f64::NEG_INFINITY;
        let mut generation = 0;
        loop {
            let score = self.score_with(&eval)?;
            if score > best {
                best = score;
                if log {
                    info!(generation, best, "new best score");
                }
                if goal - best <= target_loss {
                    break;
                }
            }

            if self.exhausted(generation) {
                break;
            }
            self.evolve();
            generation += 1;
        }

        self.trained(generation)
    }

    /// Evolve until the lowest loss over `data` is at most `target_loss`, or the generation
    /// limit is reached. Clients are scored by their negated loss, computed with `loss` when
    /// given and the configured loss otherwise.
    pub fn train_with_data(
        &mut self,
        data: &[Sample],
        target_loss: f64,
        log: bool,
        loss: Option<&LossFn>,
    ) -> Result<Trained> {
        if self.population.is_empty() {
            return Err(Error::EmptyPopulation);
        }

        let configured = self.settings.loss_fn;
        let eval = |client: &mut Client| -> Result<f64> {
            let outputs = data
                .iter()
                .map(|(input, expected)| -> Result<Vec<f64>> {
                    let output = client.predict(input)?;
                    if output.len() != expected.len() {
                        return Err(Error::DataShapeMismatch {
                            expected: expected.len(),
                            received: output.len(),
                        });
                    }
                    Ok(output)
                })
                .collect::<Result<Vec<_>>>()?;
            let outcomes = data
                .iter()
                .zip(&outputs)
                .map(|((_, expected), output)| (expected.as_slice(), output.as_slice()))
                .collect::<Vec<Outcome<'_>>>();

            Ok(-match loss {
                Some(loss) => loss(&outcomes),
                None => configured.apply(&outcomes),
            })
        };

        let mut best = f64::INFINITY;
        let mut generation = 0;
        loop {
            let lowest = -self.score_with(&eval)?;
            if lowest < best {
                best = lowest;
                if log {
                    info!(generation, loss = best, "new best loss");
                }
                if best <= target_loss {
                    break;
                }
            }

            if self.exhausted(generation) {
                break;
            }
            self.evolve();
            generation += 1;
        }

        self.trained(generation)
    }
}
