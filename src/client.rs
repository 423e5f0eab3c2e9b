//! A genome paired with its fitness, and the forward pass that evaluates it.

use crate::{
    error::{Error, Result},
    genome::Genome,
};

#[derive(Debug, Clone)]
pub struct Client {
    pub genome: Genome,
    pub score: f64,
    /// Fitness penalty for the genome's size, set once per generation
    pub genome_cost: f64,
}

impl Client {
    pub fn new(genome: Genome) -> Self {
        Self {
            genome,
            score: f64::NEG_INFINITY,
            genome_cost: 0.,
        }
    }

    /// Score net of the genome's cost, what selection ranks by
    #[inline]
    pub fn fitness(&self) -> f64 {
        self.score - self.genome_cost
    }

    /// Evaluate the network once, layer by layer.
    ///
    /// Recurrent connections contribute the value their source held on the previous call, and
    /// are refreshed once every layer is evaluated. Outputs come back ascending by node id.
    pub fn predict(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        let layers = self.genome.layers();
        let expected = layers.first().map_or(0, Vec::len);
        if inputs.len() != expected {
            return Err(Error::ArityMismatch {
                expected,
                received: inputs.len(),
            });
        }

        let nodes = self.genome.nodes();
        let connections = self.genome.connections();
        let graph = self.genome.graph();
        let mut values = vec![0.; nodes.len()];
        let incoming = |idx: usize, values: &[f64]| {
            graph.incoming[idx]
                .iter()
                .map(|&c| {
                    let conn = &connections[c];
                    if !conn.enabled {
                        0.
                    } else if conn.recurrent {
                        conn.output_cache
                    } else {
                        values[graph.ends[c].0] * conn.weight
                    }
                })
                .sum::<f64>()
        };

        for (l, layer) in layers.iter().enumerate() {
            for (i, &idx) in layer.iter().enumerate() {
                values[idx] = if l == 0 {
                    inputs[i] + incoming(idx, &values)
                } else {
                    let node = &nodes[idx];
                    node.activation.apply(node.bias + incoming(idx, &values))
                };
            }
        }

        let outputs = layers
            .last()
            .map(|layer| layer.iter().map(|&idx| values[idx]).collect())
            .unwrap_or_default();

        self.genome.cache_recurrent(&values);

        Ok(outputs)
    }

    /// Forget recurrent state
    pub fn flush(&mut self) {
        self.genome.flush();
    }
}
