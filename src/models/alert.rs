use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Above => write!(f, "above"),
            Direction::Below => write!(f, "below"),
        }
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "above" => Ok(Direction::Above),
            "below" => Ok(Direction::Below),
            _ => Err(()),
        }
    }
}

/// Threshold price. Wraps `f64` with a total order so thresholds can key
/// ordered maps; formatting uses the shortest round-trip decimal literal,
/// which is also the on-the-wire form inside alert strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub f64);

impl Eq for Price {}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let v: f64 = s.parse().map_err(|_| ())?;
        if !v.is_finite() {
            return Err(());
        }
        Ok(Price(v))
    }
}

/// One-shot price alert: fires the first time a trade on `pair` reaches the
/// threshold from the configured direction.
///
/// Persisted canonically as `"<pair> <direction> <threshold>"`; parse and
/// compose round-trip losslessly for every alert the service itself writes.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub pair: String,
    pub direction: Direction,
    pub threshold: Price,
}

impl Alert {
    pub fn new(pair: impl Into<String>, direction: Direction, threshold: f64) -> Self {
        Alert {
            pair: pair.into(),
            direction,
            threshold: Price(threshold),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.pair, self.direction, self.threshold)
    }
}

impl FromStr for Alert {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(' ');
        let pair = parts.next().filter(|p| !p.is_empty()).ok_or(())?;
        let direction: Direction = parts.next().ok_or(())?.parse()?;
        let threshold: Price = parts.next().ok_or(())?.parse()?;
        if parts.next().is_some() {
            return Err(());
        }
        Ok(Alert {
            pair: pair.to_string(),
            direction,
            threshold,
        })
    }
}
