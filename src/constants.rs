//! Centralized defaults for Strata evolution parameters.
//!
//! All configurable parameters are defined here with the `STRATA_` prefix, and are what
//! [crate::config::Hyper], [crate::config::Probs] and [crate::config::Options] fall back to.

// ============================================================================
// Compatibility Distance
// ============================================================================

/// Coefficient for disjoint genes in compatibility distance calculation
pub const STRATA_DISJOINT_COEFFICIENT: f64 = 1.0;

/// Coefficient for excess genes in compatibility distance calculation
pub const STRATA_EXCESS_COEFFICIENT: f64 = 1.0;

/// Coefficient for weight differences in compatibility distance calculation
pub const STRATA_WEIGHT_COEFFICIENT: f64 = 0.4;

/// Genome size below which distance isn't normalized by genome length
pub const STRATA_NORMALIZATION_THRESHOLD: usize = 20;

// ============================================================================
// Speciation
// ============================================================================

/// Initial genetic distance threshold for speciation, adjusted every generation
pub const STRATA_SPECIE_THRESHOLD: f64 = 10.0;

/// Number of species the threshold is steered towards
pub const STRATA_SPECIES_TARGET: usize = 50;

/// Generations a specie may go without improving before it's dropped
pub const STRATA_DROPOFF: usize = 15;

/// Chance per generation that the worst specie is dropped outright
pub const STRATA_DROP_RATE: f64 = 0.0;

// ============================================================================
// Reproduction
// ============================================================================

/// Fraction of every specie that is removed before breeding
pub const STRATA_CULL_RATE: f64 = 0.5;

/// Fraction of the population carried over unchanged
pub const STRATA_ELITISM: f64 = 0.01;

/// Chance an offspring is a clone rather than a crossover child
pub const STRATA_CLONE_RATE: f64 = 0.25;

/// Number of `augment` passes applied to every fresh genome
pub const STRATA_INITIAL_MUTATION: usize = 1;

// ============================================================================
// Parameter Mutation
// ============================================================================

/// Proportional strength of a weight shift
pub const STRATA_WEIGHT_SHIFT_STRENGTH: f64 = 0.2;

/// Proportional strength of a bias shift
pub const STRATA_BIAS_SHIFT_STRENGTH: f64 = 0.2;

pub const STRATA_MIN_WEIGHT: f64 = -100.0;
pub const STRATA_MAX_WEIGHT: f64 = 100.0;
pub const STRATA_MIN_BIAS: f64 = -100.0;
pub const STRATA_MAX_BIAS: f64 = 100.0;

// ============================================================================
// Complexity Regulation
// ============================================================================

/// Growth allowed above the current mean complexity before pruning may start
pub const STRATA_COMPLEXITY_THRESHOLD: f64 = 30.0;

/// Generations of non-dropping complexity before pruning stops
pub const STRATA_COMPLEXITY_FLOOR_DELAY: usize = 10;

/// Generations without population fitness improvement before pruning may start
pub const STRATA_FITNESS_PLATAU_THRESHOLD: usize = 10;

/// Fitness cost per connection
pub const STRATA_CONNECTION_COST: f64 = 0.1;

/// Fitness cost per node
pub const STRATA_NODE_COST: f64 = 0.2;

// ============================================================================
// Mutation Probabilities
// ============================================================================

pub const STRATA_WEIGHT_MUTATION_CHANCE: f64 = 0.8;
pub const STRATA_WEIGHT_SHIFT_CHANCE: f64 = 0.9;
pub const STRATA_BIAS_MUTATION_CHANCE: f64 = 0.8;
pub const STRATA_BIAS_SHIFT_CHANCE: f64 = 0.9;
pub const STRATA_ADD_CONNECTION_CHANCE: f64 = 0.05;
pub const STRATA_ADD_RECURRENT_CHANCE: f64 = 0.5;
pub const STRATA_RE_ENABLE_CONNECTION_CHANCE: f64 = 0.25;
pub const STRATA_DISABLE_CONNECTION_CHANCE: f64 = 0.05;
pub const STRATA_ADD_NODE_CHANCE: f64 = 0.025;
pub const STRATA_DELETE_CONNECTION_CHANCE: f64 = 0.05;
pub const STRATA_DELETE_NODE_CHANCE: f64 = 0.025;
pub const STRATA_RANDOM_ACTIVATION_CHANCE: f64 = 0.05;

// ============================================================================
// Genome Mutation
// ============================================================================

/// Attempts a structural mutation makes before giving up
pub const STRATA_MUTATION_RETRIES: usize = 20;

// ============================================================================
// Population
// ============================================================================

pub const STRATA_MAX_POP: usize = 1000;
