//! Month-keyed character usage counter
//!
//! One record per credential, stored as JSON `{month, count}` under the key
//! `characterCount_<apiKey>`. A record whose month tag differs from the
//! current month counts as zero and is reset on first access.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
use directories::ProjectDirs;
use redb::backends::InMemoryBackend;
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::translation::error::TranslationResult;

const USAGE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("character_usage");

const KEY_PREFIX: &str = "characterCount_";
const DEFAULT_KEY: &str = "default";

pub const QUOTA_DB_FILE_NAME: &str = "quota.redb";

/// Outcome of a quota check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitCheck {
    pub allowed: bool,
    pub current: u64,
    pub limit: u64,
}

impl LimitCheck {
    pub fn message(&self) -> String {
        format!(
            "Monthly character limit reached ({}/{}). The allowance resets at the start of next month.",
            self.current, self.limit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UsageRecord {
    month: String,
    count: u64,
}

/// `YYYY-M`, month not zero-padded
pub fn month_key<D: Datelike>(date: &D) -> String {
    format!("{}-{}", date.year(), date.month())
}

pub fn current_month() -> String {
    month_key(&Local::now())
}

pub fn storage_key(api_key: Option<&str>) -> String {
    let id = api_key
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .unwrap_or(DEFAULT_KEY);
    format!("{KEY_PREFIX}{id}")
}

pub struct QuotaStore {
    db: Database,
    limit: u64,
}

impl QuotaStore {
    pub fn open(path: &Path, limit: u64) -> TranslationResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path)?;
        tracing::debug!("quota store opened at {}", path.display());
        Self::with_database(db, limit)
    }

    pub fn in_memory(limit: u64) -> TranslationResult<Self> {
        let db = Database::builder().create_with_backend(InMemoryBackend::new())?;
        Self::with_database(db, limit)
    }

    fn with_database(db: Database, limit: u64) -> TranslationResult<Self> {
        // Reads fail on a table that was never created
        let txn = db.begin_write()?;
        txn.open_table(USAGE_TABLE)?;
        txn.commit()?;

        Ok(Self { db, limit })
    }

    /// Platform data directory location
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "interlinear").map(|dirs| dirs.data_dir().join(QUOTA_DB_FILE_NAME))
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn get(&self, api_key: Option<&str>) -> TranslationResult<u64> {
        self.get_in(api_key, &current_month())
    }

    /// Count for `month`, resetting a stale or missing record to zero
    pub fn get_in(&self, api_key: Option<&str>, month: &str) -> TranslationResult<u64> {
        let key = storage_key(api_key);
        let txn = self.db.begin_write()?;
        let count = {
            let mut table = txn.open_table(USAGE_TABLE)?;
            let stored = match table.get(key.as_str())? {
                Some(value) => Some(serde_json::from_slice::<UsageRecord>(value.value())?),
                None => None,
            };

            match stored {
                Some(record) if record.month == month => record.count,
                stale => {
                    if let Some(record) = stale {
                        tracing::info!(
                            "usage for {} rolled over from {} to {}",
                            key,
                            record.month,
                            month
                        );
                    }
                    write_record(&mut table, &key, month, 0)?;
                    0
                }
            }
        };
        txn.commit()?;
        Ok(count)
    }

    pub fn increment(&self, api_key: Option<&str>, by: u64) -> TranslationResult<u64> {
        self.increment_in(api_key, by, &current_month())
    }

    pub fn increment_in(&self, api_key: Option<&str>, by: u64, month: &str) -> TranslationResult<u64> {
        let current = self.get_in(api_key, month)?;
        let updated = current.saturating_add(by);

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USAGE_TABLE)?;
            write_record(&mut table, &storage_key(api_key), month, updated)?;
        }
        txn.commit()?;

        tracing::debug!("usage now {}/{}", updated, self.limit);
        Ok(updated)
    }

    pub fn reset(&self, api_key: Option<&str>) -> TranslationResult<()> {
        self.reset_in(api_key, &current_month())
    }

    pub fn reset_in(&self, api_key: Option<&str>, month: &str) -> TranslationResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(USAGE_TABLE)?;
            write_record(&mut table, &storage_key(api_key), month, 0)?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn check_limit(&self, api_key: Option<&str>, additional: u64) -> TranslationResult<LimitCheck> {
        self.check_limit_in(api_key, additional, &current_month())
    }

    pub fn check_limit_in(
        &self,
        api_key: Option<&str>,
        additional: u64,
        month: &str,
    ) -> TranslationResult<LimitCheck> {
        let current = self.get_in(api_key, month)?;
        Ok(LimitCheck {
            allowed: current.saturating_add(additional) <= self.limit,
            current,
            limit: self.limit,
        })
    }

    /// Resets every record not tagged with `month`; returns how many
    pub fn rollover_all(&self, month: &str) -> TranslationResult<usize> {
        let txn = self.db.begin_write()?;
        let stale_keys = {
            let mut table = txn.open_table(USAGE_TABLE)?;

            let mut stale_keys = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let record: UsageRecord = serde_json::from_slice(value.value())?;
                if record.month != month {
                    stale_keys.push(key.value().to_string());
                }
            }

            for key in &stale_keys {
                write_record(&mut table, key, month, 0)?;
            }
            stale_keys
        };
        txn.commit()?;

        if !stale_keys.is_empty() {
            tracing::info!("monthly rollover reset {} usage records", stale_keys.len());
        }
        Ok(stale_keys.len())
    }
}

impl std::fmt::Debug for QuotaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaStore").field("limit", &self.limit).finish()
    }
}

fn write_record(
    table: &mut redb::Table<'_, &'static str, &'static [u8]>,
    key: &str,
    month: &str,
    count: u64,
) -> TranslationResult<()> {
    let record = UsageRecord {
        month: month.to_string(),
        count,
    };
    let bytes = serde_json::to_vec(&record)?;
    table.insert(key, bytes.as_slice())?;
    Ok(())
}
