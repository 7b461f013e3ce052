use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::AlertError;

/// Durable per-user ordered list of alert strings.
///
/// Order is insertion order and only matters for positional deletion;
/// everything else treats the list as a set of canonical alert strings.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, user_id: &str, alert: &str) -> Result<(), AlertError>;

    /// Removes every occurrence of the exact string for the user.
    async fn remove_all(&self, user_id: &str, alert: &str) -> Result<(), AlertError>;

    async fn get_at(&self, user_id: &str, index: usize) -> Result<Option<String>, AlertError>;

    async fn list(&self, user_id: &str) -> Result<Vec<String>, AlertError>;

    async fn all_user_ids(&self) -> Result<Vec<String>, AlertError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct AlertDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    user_id: String,
    alert: String,
    created_at: i64,
}

/// MongoDB-backed store. Each alert is one document; the per-user list order
/// is (created_at, _id) ascending.
#[derive(Clone)]
pub struct MongoAlertStore {
    db: mongodb::Database,
}

impl MongoAlertStore {
    pub fn new(db: mongodb::Database) -> Self {
        Self { db }
    }

    fn alerts(&self) -> mongodb::Collection<AlertDoc> {
        self.db.collection::<AlertDoc>("alerts")
    }

    fn find_opts(skip: Option<u64>, limit: Option<i64>) -> FindOptions {
        FindOptions::builder()
            .sort(doc! { "created_at": 1, "_id": 1 })
            .skip(skip)
            .limit(limit)
            .build()
    }
}

#[async_trait]
impl AlertStore for MongoAlertStore {
    async fn append(&self, user_id: &str, alert: &str) -> Result<(), AlertError> {
        let doc = AlertDoc {
            id: ObjectId::new(),
            user_id: user_id.to_string(),
            alert: alert.to_string(),
            created_at: Utc::now().timestamp(),
        };

        self.alerts()
            .insert_one(&doc, None)
            .await
            .map_err(|e| AlertError::Store(e.to_string()))?;

        Ok(())
    }

    async fn remove_all(&self, user_id: &str, alert: &str) -> Result<(), AlertError> {
        self.alerts()
            .delete_many(doc! { "user_id": user_id, "alert": alert }, None)
            .await
            .map_err(|e| AlertError::Store(e.to_string()))?;

        Ok(())
    }

    async fn get_at(&self, user_id: &str, index: usize) -> Result<Option<String>, AlertError> {
        let opts = Self::find_opts(Some(index as u64), Some(1));

        let mut cursor = self
            .alerts()
            .find(doc! { "user_id": user_id }, opts)
            .await
            .map_err(|e| AlertError::Store(e.to_string()))?;

        match cursor.next().await {
            Some(Ok(doc)) => Ok(Some(doc.alert)),
            Some(Err(e)) => Err(AlertError::Store(e.to_string())),
            None => Ok(None),
        }
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>, AlertError> {
        let opts = Self::find_opts(None, None);

        let mut cursor = self
            .alerts()
            .find(doc! { "user_id": user_id }, opts)
            .await
            .map_err(|e| AlertError::Store(e.to_string()))?;

        let mut items = Vec::new();
        while let Some(res) = cursor.next().await {
            let doc = res.map_err(|e| AlertError::Store(e.to_string()))?;
            items.push(doc.alert);
        }

        Ok(items)
    }

    async fn all_user_ids(&self) -> Result<Vec<String>, AlertError> {
        let values = self
            .alerts()
            .distinct("user_id", None, None)
            .await
            .map_err(|e| AlertError::Store(e.to_string()))?;

        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }
}

/// In-memory store for tests and local development. Same ordering contract
/// as the mongo store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    lists: Arc<Mutex<BTreeMap<String, Vec<String>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertStore for MemoryStore {
    async fn append(&self, user_id: &str, alert: &str) -> Result<(), AlertError> {
        let mut lists = self.lists.lock().await;
        lists
            .entry(user_id.to_string())
            .or_default()
            .push(alert.to_string());
        Ok(())
    }

    async fn remove_all(&self, user_id: &str, alert: &str) -> Result<(), AlertError> {
        let mut lists = self.lists.lock().await;
        if let Some(list) = lists.get_mut(user_id) {
            list.retain(|a| a != alert);
            if list.is_empty() {
                lists.remove(user_id);
            }
        }
        Ok(())
    }

    async fn get_at(&self, user_id: &str, index: usize) -> Result<Option<String>, AlertError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(user_id).and_then(|l| l.get(index)).cloned())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<String>, AlertError> {
        let lists = self.lists.lock().await;
        Ok(lists.get(user_id).cloned().unwrap_or_default())
    }

    async fn all_user_ids(&self) -> Result<Vec<String>, AlertError> {
        let lists = self.lists.lock().await;
        Ok(lists.keys().cloned().collect())
    }
}
