use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::AlertError;
use crate::models::{Alert, Direction, PairTable};
use crate::services::feed::PriceFeed;
use crate::services::store::AlertStore;

/// Public alert operations used by the front end. Owns its store and feed
/// handles; mutations schedule a registry rebuild on the engine's queue
/// without waiting for it.
#[derive(Clone)]
pub struct AlertService {
    store: Arc<dyn AlertStore>,
    feed: Arc<dyn PriceFeed>,
    pairs: Arc<PairTable>,
    rebuild_tx: mpsc::Sender<()>,
}

impl AlertService {
    pub fn new(
        store: Arc<dyn AlertStore>,
        feed: Arc<dyn PriceFeed>,
        pairs: Arc<PairTable>,
        rebuild_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            store,
            feed,
            pairs,
            rebuild_tx,
        }
    }

    pub fn pairs(&self) -> &PairTable {
        &self.pairs
    }

    /// Registers a one-shot alert and returns its canonical string. The
    /// direction is derived from where the target sits relative to the
    /// current price, so a target equal to the current price is rejected.
    pub async fn set_alert(
        &self,
        user_id: &str,
        pair: &str,
        target: f64,
    ) -> Result<String, AlertError> {
        if !self.pairs.contains(pair) {
            return Err(AlertError::UnknownPair);
        }
        if !target.is_finite() || target <= 0.0 {
            return Err(AlertError::InvalidPrice);
        }

        let current = self.feed.current_price(pair).await?;

        if target == current {
            return Err(AlertError::InvalidAlert);
        }

        let direction = if target > current {
            Direction::Above
        } else {
            Direction::Below
        };
        let alert = Alert::new(pair, direction, target).to_string();

        let existing = self.store.list(user_id).await?;
        if existing.iter().any(|a| a == &alert) {
            return Err(AlertError::DuplicateAlert);
        }

        self.store.append(user_id, &alert).await?;
        self.schedule_rebuild();

        Ok(alert)
    }

    /// Deletes the alert at `index` in store order. Removal is by value:
    /// every occurrence of that exact string goes, which equals positional
    /// deletion because `set_alert` never writes duplicates.
    pub async fn delete_alert_at(&self, user_id: &str, index: usize) -> Result<(), AlertError> {
        let Some(alert) = self.store.get_at(user_id, index).await? else {
            return Err(AlertError::AlertNotFound);
        };

        self.store.remove_all(user_id, &alert).await?;
        self.schedule_rebuild();

        Ok(())
    }

    pub async fn list_alerts(&self, user_id: &str) -> Result<Vec<String>, AlertError> {
        self.store.list(user_id).await
    }

    fn schedule_rebuild(&self) {
        // Fire-and-forget: a full queue already has a rebuild pending that
        // will observe this mutation too.
        let _ = self.rebuild_tx.try_send(());
    }
}
