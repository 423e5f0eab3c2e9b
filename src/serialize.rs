//! Persisted forms: the [EngineRecord] an engine saves to and restores from, and the JSON
//! helpers around it.

use crate::{
    client::Client,
    config::Settings,
    engine::{Engine, Regulation},
    error::{Error, Result},
    genome::{
        connection::{parse_path_key, path_key},
        Connection, Genome, Node,
    },
    innovation::{InnoGen, NodePool, Registry},
    random::default_rng,
    reproduce::Stagnation,
};
use fxhash::FxHashMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::{collections::BTreeMap, fs, path::Path};

/// Deserialize an `Option` whose key must be present, though its value may be `null`
pub fn required<'de, D, T>(deserializer: D) -> core::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

/// Everything needed to resume an engine. Scores are not kept, a restored population starts
/// unscored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineRecord {
    pub inputs: usize,
    pub outputs: usize,
    pub max_pop: usize,
    #[serde(flatten)]
    pub settings: Settings,
    /// Innovation number of every path, keyed `"from,to"`
    pub connection_pool: BTreeMap<String, usize>,
    /// Every input connected to every output
    pub connections: Vec<Connection>,
    pub node_pool: Vec<Node>,
    pub replace_pool: Vec<(String, Node)>,
    pub mandatory_nodes: Vec<Node>,
    #[serde(alias = "pop")]
    pub population: Vec<Genome>,
    /// Specie id keys are strings, as flattened records can't read integer keys
    pub prev_spec_scores: BTreeMap<String, f64>,
    pub dropoff_tracker: BTreeMap<String, usize>,
    /// The next innovation number
    pub current_connections: usize,
    #[serde(flatten)]
    pub regulation: Regulation,
}

fn path(key: &str) -> Result<(usize, usize)> {
    parse_path_key(key).ok_or_else(|| Error::malformed(format!("bad connection id {key:?}")))
}

fn specie_keyed<T>(map: BTreeMap<String, T>) -> Result<FxHashMap<usize, T>> {
    map.into_iter()
        .map(|(key, v)| {
            key.parse::<usize>()
                .map(|id| (id, v))
                .map_err(|_| Error::malformed(format!("bad specie id {key:?}")))
        })
        .collect()
}

impl Engine {
    pub fn to_persisted(&self) -> EngineRecord {
        let registry = &self.registry;
        let mut replace_pool = registry
            .replace_pool
            .iter()
            .map(|(&p, node)| (p, node.clone()))
            .collect::<Vec<_>>();
        replace_pool.sort_by_key(|(p, _)| *p);

        EngineRecord {
            inputs: self.inputs,
            outputs: self.outputs,
            max_pop: self.max_pop,
            settings: self.settings.clone(),
            connection_pool: registry
                .innogen
                .iter()
                .map(|(p, inno)| (path_key(p), inno))
                .collect(),
            connections: registry.template.clone(),
            node_pool: registry.node_pool.nodes().to_vec(),
            replace_pool: replace_pool
                .into_iter()
                .map(|(p, node)| (path_key(p), node))
                .collect(),
            mandatory_nodes: registry.mandatory.clone(),
            population: self.population.iter().map(|c| c.genome.clone()).collect(),
            prev_spec_scores: self
                .stagnation
                .prev_spec_scores
                .iter()
                .map(|(k, &v)| (k.to_string(), v))
                .collect(),
            dropoff_tracker: self
                .stagnation
                .dropoff_tracker
                .iter()
                .map(|(k, &v)| (k.to_string(), v))
                .collect(),
            current_connections: registry.innogen.head,
            regulation: self.regulation.clone(),
        }
    }

    /// Resume an engine from its record. The random stream is reseeded from the OS, and there
    /// is no generation limit until one is set.
    pub fn from_persisted(record: EngineRecord) -> Result<Self> {
        if record.mandatory_nodes.len() != record.inputs + record.outputs {
            return Err(Error::malformed(format!(
                "{} mandatory nodes for {} inputs and {} outputs",
                record.mandatory_nodes.len(),
                record.inputs,
                record.outputs
            )));
        }

        let seen = record
            .connection_pool
            .iter()
            .map(|(key, &inno)| -> Result<((usize, usize), usize)> {
                if inno >= record.current_connections {
                    return Err(Error::malformed(format!(
                        "innovation {inno} of {key:?} is past the next innovation {}",
                        record.current_connections
                    )));
                }
                Ok((path(key)?, inno))
            })
            .collect::<Result<Vec<_>>>()?;

        let replace_pool = record
            .replace_pool
            .into_iter()
            .map(|(key, node)| -> Result<((usize, usize), Node)> { Ok((path(&key)?, node)) })
            .collect::<Result<FxHashMap<_, _>>>()?;

        Ok(Self {
            inputs: record.inputs,
            outputs: record.outputs,
            max_pop: record.max_pop,
            settings: record.settings,
            registry: Registry {
                innogen: InnoGen::from_parts(record.current_connections, seen),
                node_pool: NodePool::new(record.node_pool),
                replace_pool,
                mandatory: record.mandatory_nodes,
                template: record.connections,
            },
            population: record.population.into_iter().map(Client::new).collect(),
            stagnation: Stagnation {
                prev_spec_scores: specie_keyed(record.prev_spec_scores)?,
                dropoff_tracker: specie_keyed(record.dropoff_tracker)?,
            },
            regulation: record.regulation,
            generation_limit: None,
            rng: default_rng(),
        })
    }

    pub fn set_generation_limit(&mut self, limit: Option<usize>) {
        self.generation_limit = limit;
    }

    pub fn to_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_persisted())?)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self> {
        Self::from_persisted(serde_json::from_str(s)?)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_string()?)?;
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_str(&fs::read_to_string(path)?)
    }
}
