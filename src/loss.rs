//! Loss functions scoring a network's outputs against expected outputs.

use crate::error::{Error, Result};
use core::{fmt, str::FromStr};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Training input paired with its expected output
pub type Sample = (Vec<f64>, Vec<f64>);

/// An `(expected, output)` pair for one sample
pub type Outcome<'a> = (&'a [f64], &'a [f64]);

/// A loss over every outcome of a dataset, lower is better
pub type LossFn = dyn Fn(&[Outcome<'_>]) -> f64 + Sync;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Loss {
    #[default]
    Mse,
}

impl Loss {
    pub const ALL: &'static [Self] = &[Self::Mse];

    pub fn index(self) -> u8 {
        match self {
            Self::Mse => 0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mse => "mse",
        }
    }

    pub fn apply(self, outcomes: &[Outcome<'_>]) -> f64 {
        match self {
            Self::Mse => mse(outcomes),
        }
    }
}

/// Squared error averaged over each sample's outputs, then over samples
pub fn mse(outcomes: &[Outcome<'_>]) -> f64 {
    if outcomes.is_empty() {
        return 0.;
    }

    outcomes
        .iter()
        .map(|(expected, output)| {
            if expected.is_empty() {
                return 0.;
            }
            expected
                .iter()
                .zip(output.iter())
                .map(|(e, o)| (e - o).powi(2))
                .sum::<f64>()
                / expected.len() as f64
        })
        .sum::<f64>()
        / outcomes.len() as f64
}

impl FromStr for Loss {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mse" => Ok(Self::Mse),
            _ => Err(Error::UnknownLoss(s.to_string())),
        }
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Losses serialize as their name
impl Serialize for Loss {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Loss {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse::<Loss>()
            .map_err(de::Error::custom)
    }
}
