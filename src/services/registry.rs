use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::AlertError;
use crate::models::{Alert, Direction, Price};
use crate::services::store::AlertStore;

#[derive(Debug, Default)]
struct DirectionMaps {
    above: BTreeMap<Price, BTreeSet<String>>,
    below: BTreeMap<Price, BTreeSet<String>>,
}

/// One crossed threshold and every user waiting on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Crossing {
    pub direction: Direction,
    pub threshold: Price,
    pub user_ids: Vec<String>,
}

/// Derived index from (pair, direction, threshold) to waiting user ids.
///
/// Never persisted and never patched in place: every change to the store is
/// followed by a full snapshot-and-replace rebuild. Thresholds key ordered
/// maps so crossing detection is a range scan rather than a walk over every
/// threshold of the pair.
#[derive(Debug, Default)]
pub struct Registry {
    pairs: HashMap<String, DirectionMaps>,
}

impl Registry {
    /// Pure function of the store snapshot: same contents, same registry.
    /// A malformed stored string is a defect (the store only holds strings
    /// composed by `set_alert`); it is logged and skipped so one bad record
    /// cannot wedge every future rebuild.
    pub async fn build(store: &dyn AlertStore) -> Result<Registry, AlertError> {
        let mut registry = Registry::default();

        for user_id in store.all_user_ids().await? {
            for raw in store.list(&user_id).await? {
                match raw.parse::<Alert>() {
                    Ok(alert) => registry.insert(&alert, &user_id),
                    Err(()) => {
                        tracing::warn!("skipping malformed stored alert {raw:?} for user {user_id}");
                    }
                }
            }
        }

        Ok(registry)
    }

    fn insert(&mut self, alert: &Alert, user_id: &str) {
        let maps = self.pairs.entry(alert.pair.clone()).or_default();
        let side = match alert.direction {
            Direction::Above => &mut maps.above,
            Direction::Below => &mut maps.below,
        };
        side.entry(alert.threshold)
            .or_default()
            .insert(user_id.to_string());
    }

    pub fn pair_set(&self) -> BTreeSet<String> {
        self.pairs.keys().cloned().collect()
    }

    pub fn contains_pair(&self, pair: &str) -> bool {
        self.pairs.contains_key(pair)
    }

    /// Thresholds crossed by a trade at `price`: every `below` threshold at
    /// or above it, every `above` threshold at or below it (both inclusive —
    /// an exact hit fires). `None` when the pair is untracked, which the
    /// caller treats as a stale-subscription race rather than an error.
    pub fn crossed(&self, pair: &str, price: f64) -> Option<Vec<Crossing>> {
        let maps = self.pairs.get(pair)?;
        let price = Price(price);
        let mut crossings = Vec::new();

        for (&threshold, users) in maps.below.range(price..) {
            crossings.push(Crossing {
                direction: Direction::Below,
                threshold,
                user_ids: users.iter().cloned().collect(),
            });
        }

        for (&threshold, users) in maps.above.range(..=price) {
            crossings.push(Crossing {
                direction: Direction::Above,
                threshold,
                user_ids: users.iter().cloned().collect(),
            });
        }

        Some(crossings)
    }

    #[cfg(test)]
    pub fn users_at(&self, pair: &str, direction: Direction, threshold: f64) -> Vec<String> {
        self.pairs
            .get(pair)
            .and_then(|maps| {
                let side = match direction {
                    Direction::Above => &maps.above,
                    Direction::Below => &maps.below,
                };
                side.get(&Price(threshold))
            })
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }
}
