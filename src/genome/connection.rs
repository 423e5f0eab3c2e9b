use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(rename = "inNode")]
    pub from: usize,
    #[serde(rename = "outNode")]
    pub to: usize,
    pub weight: f64,
    pub enabled: bool,
    pub recurrent: bool,
    /// Value of `from` as of the last evaluation, only read when recurrent
    pub output_cache: f64,
    #[serde(rename = "innov")]
    pub inno: usize,
}

impl Connection {
    pub fn new(from: usize, to: usize, weight: f64, inno: usize) -> Self {
        Self {
            from,
            to,
            weight,
            enabled: true,
            recurrent: false,
            output_cache: 0.,
            inno,
        }
    }

    #[inline]
    pub fn path(&self) -> (usize, usize) {
        (self.from, self.to)
    }

    /// The `"in,out"` key this connection persists under
    pub fn key(&self) -> String {
        path_key(self.path())
    }
}

pub fn path_key((from, to): (usize, usize)) -> String {
    format!("{from},{to}")
}

pub fn parse_path_key(key: &str) -> Option<(usize, usize)> {
    let (from, to) = key.split_once(',')?;
    Some((from.trim().parse().ok()?, to.trim().parse().ok()?))
}

/// Connections are the same gene when they share an innovation
impl PartialEq for Connection {
    fn eq(&self, other: &Self) -> bool {
        self.inno == other.inno
    }
}

impl Eq for Connection {}
