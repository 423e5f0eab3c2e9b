//! The table of activation functions a node may apply.
//!
//! Every activation has a stable name and a stable index. Genomes persist a node's activation
//! by index, while options refer to activations by name.

use crate::error::{Error, Result};
use core::{f64::consts::SQRT_2, fmt, str::FromStr};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

macro_rules! activations {
    ($($variant:ident = $idx:literal, $name:literal;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Activation {
            $($variant,)+
        }

        impl Activation {
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            pub fn index(self) -> u8 {
                match self {
                    $(Self::$variant => $idx,)+
                }
            }

            pub fn from_index(idx: u8) -> Option<Self> {
                match idx {
                    $($idx => Some(Self::$variant),)+
                    _ => None,
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl FromStr for Activation {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    _ => Err(Error::UnknownActivation(s.to_string())),
                }
            }
        }
    };
}

activations! {
    Identity = 0, "id";
    Sigmoid = 1, "sig";
    Relu = 2, "relu";
    Binary = 3, "bin";
    Bipolar = 4, "bipol";
    Tanh = 5, "tanh";
    Swish = 6, "swish";
    Invert = 7, "invert";
    BipolarSigmoid = 8, "bipolSig";
    HardTanh = 9, "hardTanh";
    ArcTan = 10, "arcTan";
    SoftSign = 11, "softSign";
    Sinc = 12, "sinc";
    Sin = 13, "sin";
    Gaussian = 14, "gaussian";
    Isru = 15, "isru";
    Gelu = 16, "gelu";
    BentIdentity = 17, "bentId";
    SoftPlus = 18, "softPlus";
    Mish = 19, "mish";
    Sqnl = 20, "sqnl";
    Erf = 21, "erf";
    Elu = 22, "elu";
    Selu = 23, "selu";
}

pub fn sigmoid(x: f64) -> f64 {
    1. / (1. + (-x).exp())
}

pub fn soft_plus(x: f64) -> f64 {
    x.exp().ln_1p()
}

/// Abramowitz-Stegun approximation, max error ~1.5e-7
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0. { -1. } else { 1. };
    let x = x.abs();
    let t = 1. / (1. + P * x);
    let y = 1. - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-(x * x)).exp();
    sign * y
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Identity => x,
            Self::Sigmoid => sigmoid(x),
            Self::Relu => x.max(0.),
            Self::Binary => {
                if x < 0. {
                    0.
                } else {
                    1.
                }
            }
            Self::Bipolar => {
                if x < 0. {
                    -1.
                } else {
                    1.
                }
            }
            Self::Tanh => x.tanh(),
            Self::Swish => x * sigmoid(x),
            Self::Invert => 1. - x,
            Self::BipolarSigmoid => 2. * sigmoid(x) - 1.,
            Self::HardTanh => x.clamp(-1., 1.),
            Self::ArcTan => x.atan(),
            Self::SoftSign => x / (1. + x.abs()),
            Self::Sinc => {
                if x == 0. {
                    1.
                } else {
                    x.sin() / x
                }
            }
            Self::Sin => x.sin(),
            Self::Gaussian => (-(x * x)).exp(),
            Self::Isru => x / (1. + x * x).sqrt(),
            Self::Gelu => x / 2. * (1. + erf(x / SQRT_2)),
            Self::BentIdentity => ((x * x + 1.).sqrt() - 1.) / 2. + x,
            Self::SoftPlus => soft_plus(x),
            Self::Mish => x * soft_plus(x).tanh(),
            Self::Sqnl => {
                if x > 2. {
                    1.
                } else if x < -2. {
                    -1.
                } else if x >= 0. {
                    x - x * x / 4.
                } else {
                    x + x * x / 4.
                }
            }
            Self::Erf => erf(x),
            Self::Elu => {
                if x > 0. {
                    x
                } else {
                    x.exp_m1()
                }
            }
            Self::Selu => {
                1.0507
                    * if x > 0. {
                        x
                    } else {
                        1.67326 * x.exp_m1()
                    }
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Activations serialize as their table index
impl Serialize for Activation {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.index())
    }
}

impl<'de> Deserialize<'de> for Activation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        let idx = u8::deserialize(deserializer)?;
        Self::from_index(idx)
            .ok_or_else(|| de::Error::custom(format!("no activation at index {idx}")))
    }
}

/// (De)serialize a single [Activation] by name, for use with `#[serde(with = ..)]`
pub mod by_name {
    use super::Activation;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(a: &Activation, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(a.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Activation, D::Error> {
        String::deserialize(deserializer)?
            .parse::<Activation>()
            .map_err(de::Error::custom)
    }
}

/// (De)serialize a list of [Activation]s by name, for use with `#[serde(with = ..)]`
pub mod by_names {
    use super::Activation;
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &[Activation], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(v.len()))?;
        for a in v {
            seq.serialize_element(a.name())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Activation>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|name| name.parse::<Activation>().map_err(de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_index_name_table() {
        for (idx, a) in Activation::ALL.iter().enumerate() {
            assert_eq!(a.index() as usize, idx);
            assert_eq!(Activation::from_index(idx as u8), Some(*a));
            assert_eq!(a.name().parse::<Activation>().unwrap(), *a);
        }
        assert_eq!(Activation::from_index(Activation::ALL.len() as u8), None);
        assert!(matches!(
            "nope".parse::<Activation>(),
            Err(Error::UnknownActivation(_))
        ));
    }

    #[test]
    fn test_apply() {
        assert_f64_approx!(Activation::Identity.apply(3.5), 3.5);
        assert_f64_approx!(Activation::Sigmoid.apply(0.), 0.5);
        assert_f64_approx!(Activation::Relu.apply(-2.), 0.);
        assert_f64_approx!(Activation::Binary.apply(-0.1), 0.);
        assert_f64_approx!(Activation::Bipolar.apply(-0.1), -1.);
        assert_f64_approx!(Activation::Tanh.apply(0.), 0.);
        assert_f64_approx!(Activation::Invert.apply(0.25), 0.75);
        assert_f64_approx!(Activation::BipolarSigmoid.apply(0.), 0.);
        assert_f64_approx!(Activation::HardTanh.apply(7.), 1.);
        assert_f64_approx!(Activation::Sinc.apply(0.), 1.);
        assert_f64_approx!(Activation::Gaussian.apply(0.), 1.);
        assert_f64_approx!(Activation::Sqnl.apply(3.), 1.);
        assert_f64_approx!(Activation::Elu.apply(2.), 2.);
        assert!((Activation::Erf.apply(1.) - 0.8427).abs() < 1e-4);
        assert!((Activation::Gelu.apply(1.) - 0.8413).abs() < 1e-3);
    }

    #[test]
    fn test_serde() {
        assert_eq!(serde_json::to_string(&Activation::Tanh).unwrap(), "5");
        assert_eq!(
            serde_json::from_str::<Activation>("1").unwrap(),
            Activation::Sigmoid
        );
        assert!(serde_json::from_str::<Activation>("200").is_err());
    }
}
