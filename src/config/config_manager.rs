// ==========================================
// Blood Bank Allocation - Configuration manager
// ==========================================
// Load, query and overwrite settings
// Storage: config_kv table (key-value + scope)
// ==========================================

use crate::config::allocation_config_trait::{AllocationConfigReader, CandidateOrder, ConfigResult};
use crate::db::open_sqlite_connection;
use crate::domain::donation::{DEFAULT_SHELF_LIFE_DAYS, MAX_SHELF_LIFE_DAYS};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// # Arguments
    /// - db_path: database file path
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Wraps an existing connection
    ///
    /// The shared PRAGMAs are re-applied (idempotent).
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// Reads a global-scope value
    ///
    /// # Returns
    /// - Some(String): the stored value
    /// - None: key not set
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// Public read of a global-scope value
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// Upserts a global-scope value
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// All global settings as a JSON object string
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("failed to acquire lock: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = ?1 ORDER BY key",
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map(params![GLOBAL_SCOPE], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

// ==========================================
// AllocationConfigReader implementation
// ==========================================
#[async_trait]
impl AllocationConfigReader for ConfigManager {
    async fn get_shelf_life_days(&self) -> ConfigResult<i64> {
        let default = DEFAULT_SHELF_LIFE_DAYS.to_string();
        let value = self.get_config_or_default(config_keys::SHELF_LIFE_DAYS, &default)?;

        match value.trim().parse::<i64>() {
            Ok(days) if (1..=MAX_SHELF_LIFE_DAYS).contains(&days) => Ok(days),
            _ => {
                tracing::warn!(
                    config_key = config_keys::SHELF_LIFE_DAYS,
                    raw_value = %value,
                    "invalid shelf life, falling back to default"
                );
                Ok(DEFAULT_SHELF_LIFE_DAYS)
            }
        }
    }

    async fn get_candidate_order(&self) -> ConfigResult<CandidateOrder> {
        let value = self.get_config_or_default(config_keys::EXACT_MATCH_ORDER, "SNAPSHOT")?;

        Ok(CandidateOrder::parse(&value).unwrap_or_else(|| {
            tracing::warn!(
                config_key = config_keys::EXACT_MATCH_ORDER,
                raw_value = %value,
                "unknown candidate order, using SNAPSHOT"
            );
            CandidateOrder::Snapshot
        }))
    }

    async fn get_confirm_on_shortfall(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::CONFIRM_ON_SHORTFALL, "true")?;

        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => {
                tracing::warn!(
                    config_key = config_keys::CONFIRM_ON_SHORTFALL,
                    raw_value = %value,
                    "invalid boolean, using true"
                );
                Ok(true)
            }
        }
    }
}

// ==========================================
// Config keys
// ==========================================
pub mod config_keys {
    pub const SHELF_LIFE_DAYS: &str = "shelf_life_days";
    pub const EXACT_MATCH_ORDER: &str = "exact_match_order";
    pub const CONFIRM_ON_SHORTFALL: &str = "confirm_on_shortfall";
}
