//! Engine options, and the evolution knobs that live on through a run.
//!
//! [Options] deserializes partially, missing fields falling back to the defaults in
//! [crate::constants]. [Settings] is what a persisted engine carries, and requires every field.

use crate::{
    activate::{self, Activation},
    constants::*,
    loss::Loss,
};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Deserialize a struct from a possibly partial object, laid over its defaults
fn over_defaults<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Serialize + DeserializeOwned,
{
    use serde::de::Error;

    let patch = Map::<String, Value>::deserialize(deserializer)?;
    let mut merged = serde_json::to_value(T::default()).map_err(D::Error::custom)?;
    if let Value::Object(fields) = &mut merged {
        fields.extend(patch);
    }
    serde_json::from_value(merged).map_err(D::Error::custom)
}

/// Numeric knobs of the evolutionary loop.
///
/// `threshold` is steered by the engine every generation, so it is persisted along with the
/// rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hyper {
    pub c1: f64,
    pub c2: f64,
    pub c3: f64,
    pub weight_shift_strength: f64,
    pub bias_shift_strength: f64,
    pub threshold: f64,
    pub species_target: usize,
    pub initial_mutation: usize,
    pub cull_rate: f64,
    pub min_weight: f64,
    pub max_weight: f64,
    pub min_bias: f64,
    pub max_bias: f64,
    pub elitism: f64,
    pub dropoff: usize,
    pub drop_rate: f64,
    pub clone_rate: f64,
    pub complexity_threshold: f64,
    pub complexity_floor_delay: usize,
    pub fitness_platau_threshold: usize,
    pub connection_cost: f64,
    pub node_cost: f64,
}

impl Default for Hyper {
    fn default() -> Self {
        Self {
            c1: STRATA_DISJOINT_COEFFICIENT,
            c2: STRATA_EXCESS_COEFFICIENT,
            c3: STRATA_WEIGHT_COEFFICIENT,
            weight_shift_strength: STRATA_WEIGHT_SHIFT_STRENGTH,
            bias_shift_strength: STRATA_BIAS_SHIFT_STRENGTH,
            threshold: STRATA_SPECIE_THRESHOLD,
            species_target: STRATA_SPECIES_TARGET,
            initial_mutation: STRATA_INITIAL_MUTATION,
            cull_rate: STRATA_CULL_RATE,
            min_weight: STRATA_MIN_WEIGHT,
            max_weight: STRATA_MAX_WEIGHT,
            min_bias: STRATA_MIN_BIAS,
            max_bias: STRATA_MAX_BIAS,
            elitism: STRATA_ELITISM,
            dropoff: STRATA_DROPOFF,
            drop_rate: STRATA_DROP_RATE,
            clone_rate: STRATA_CLONE_RATE,
            complexity_threshold: STRATA_COMPLEXITY_THRESHOLD,
            complexity_floor_delay: STRATA_COMPLEXITY_FLOOR_DELAY,
            fitness_platau_threshold: STRATA_FITNESS_PLATAU_THRESHOLD,
            connection_cost: STRATA_CONNECTION_COST,
            node_cost: STRATA_NODE_COST,
        }
    }
}

/// Per-operator mutation probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Probs {
    pub weight_mutation_chance: f64,
    pub weight_shift_chance: f64,
    pub bias_mutation_chance: f64,
    pub bias_shift_chance: f64,
    pub add_connection_chance: f64,
    pub add_recurrent_chance: f64,
    pub re_enable_connection_chance: f64,
    pub disable_connection_chance: f64,
    pub add_node_chance: f64,
    pub delete_connection_chance: f64,
    pub delete_node_chance: f64,
    pub random_activation_chance: f64,
}

impl Default for Probs {
    fn default() -> Self {
        Self {
            weight_mutation_chance: STRATA_WEIGHT_MUTATION_CHANCE,
            weight_shift_chance: STRATA_WEIGHT_SHIFT_CHANCE,
            bias_mutation_chance: STRATA_BIAS_MUTATION_CHANCE,
            bias_shift_chance: STRATA_BIAS_SHIFT_CHANCE,
            add_connection_chance: STRATA_ADD_CONNECTION_CHANCE,
            add_recurrent_chance: STRATA_ADD_RECURRENT_CHANCE,
            re_enable_connection_chance: STRATA_RE_ENABLE_CONNECTION_CHANCE,
            disable_connection_chance: STRATA_DISABLE_CONNECTION_CHANCE,
            add_node_chance: STRATA_ADD_NODE_CHANCE,
            delete_connection_chance: STRATA_DELETE_CONNECTION_CHANCE,
            delete_node_chance: STRATA_DELETE_NODE_CHANCE,
            random_activation_chance: STRATA_RANDOM_ACTIVATION_CHANCE,
        }
    }
}

fn default_allowed_activations() -> Vec<Activation> {
    vec![
        Activation::Identity,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Relu,
        Activation::Binary,
        Activation::Gelu,
        Activation::SoftPlus,
        Activation::Invert,
        Activation::SoftSign,
        Activation::BipolarSigmoid,
    ]
}

/// Everything an [crate::Engine] is constructed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
    pub max_pop: usize,
    /// Whether structural mutation may add recurrent connections
    pub recurrent: bool,
    #[serde(with = "activate::by_name")]
    pub output_activation: Activation,
    #[serde(with = "activate::by_name")]
    pub hidden_activation: Activation,
    #[serde(with = "activate::by_names")]
    pub allowed_activations: Vec<Activation>,
    pub loss_fn: Loss,
    #[serde(deserialize_with = "over_defaults")]
    pub hyper: Hyper,
    #[serde(deserialize_with = "over_defaults")]
    pub probs: Probs,
    /// Training loops give up after this many generations
    pub generation_limit: Option<usize>,
    /// Seed for the engine's random stream, drawn from the OS when absent
    pub seed: Option<u64>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_pop: STRATA_MAX_POP,
            recurrent: false,
            output_activation: Activation::Tanh,
            hidden_activation: Activation::Tanh,
            allowed_activations: default_allowed_activations(),
            loss_fn: Loss::Mse,
            hyper: Hyper::default(),
            probs: Probs::default(),
            generation_limit: None,
            seed: None,
        }
    }
}

impl Options {
    /// Settings as the engine holds them, with recurrence folded into the probabilities
    pub fn settings(&self) -> Settings {
        let mut probs = self.probs.clone();
        if !self.recurrent {
            probs.add_recurrent_chance = 0.;
        }

        Settings {
            output_activation: self.output_activation,
            hidden_activation: self.hidden_activation,
            allowed_activations: self.allowed_activations.clone(),
            loss_fn: self.loss_fn,
            hyper: self.hyper.clone(),
            probs,
        }
    }
}

/// The resolved, persisted part of [Options] that mutation and reproduction read from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(with = "activate::by_name")]
    pub output_activation: Activation,
    #[serde(with = "activate::by_name")]
    pub hidden_activation: Activation,
    #[serde(with = "activate::by_names")]
    pub allowed_activations: Vec<Activation>,
    pub loss_fn: Loss,
    pub hyper: Hyper,
    pub probs: Probs,
}

impl Default for Settings {
    fn default() -> Self {
        Options::default().settings()
    }
}
