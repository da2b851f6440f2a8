//! Gateway backed by the local SQLite database.

use std::sync::Mutex;

use async_trait::async_trait;

use super::PersistenceGateway;
use crate::error::GatewayError;
use crate::storage::Database;
use crate::streak::StreakStateDto;

/// Stores the streak payload as JSON in the `kv` table under
/// `streak:<user>`.
pub struct LocalGateway {
    db: Mutex<Database>,
    key: String,
}

impl LocalGateway {
    pub fn new(db: Database, user: &str) -> Self {
        Self {
            db: Mutex::new(db),
            key: format!("streak:{user}"),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run `f` against the database.
    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> T) -> T {
        let db = self.db.lock().unwrap_or_else(|e| e.into_inner());
        f(&db)
    }
}

#[async_trait]
impl PersistenceGateway for LocalGateway {
    fn name(&self) -> &str {
        "local"
    }

    async fn load(&self) -> Result<Option<StreakStateDto>, GatewayError> {
        let raw = self.with_db(|db| db.kv_get(&self.key))?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, state: &StreakStateDto) -> Result<(), GatewayError> {
        let json = serde_json::to_string(state)?;
        self.with_db(|db| db.kv_set(&self.key, &json))?;
        Ok(())
    }
}
