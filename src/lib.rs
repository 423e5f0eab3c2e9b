//! Layered neuroevolution of variable-topology networks, in the manner of NEAT.
//!
//! An [Engine] owns a population of [Client]s, each wrapping a [Genome] whose topology grows and
//! shrinks under mutation. Genomes are layered by longest path from the inputs, which fixes
//! their evaluation order and which of their connections are recurrent.

#[macro_use]
pub mod macros;

pub mod activate;
pub mod client;
pub mod config;
pub mod constants;
pub mod crossover;
pub mod engine;
pub mod error;
pub mod genome;
pub mod innovation;
pub mod loss;
pub mod random;
pub mod reproduce;
pub mod scenario;
pub mod serialize;
pub mod specie;

pub use activate::Activation;
pub use client::Client;
pub use config::{Hyper, Options, Probs};
pub use engine::Engine;
pub use error::{Error, Result};
pub use genome::{Connection, Genome, Node, NodeKind};
pub use loss::{Loss, Sample};
pub use random::Happens;
pub use scenario::Trained;
pub use serialize::EngineRecord;
pub use specie::Specie;
