//! Branch metadata in `.gitai/gitai.sqlite3`.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

/// Stands in for a missing or empty branch purpose.
pub const NO_PURPOSE: &str = "No purpose provided";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("branch {0} does not exist")]
    DoesNotExist(String),

    #[error("branch store: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// What the operator recorded about a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub branch_name: String,
    pub purpose: Option<String>,
    pub ticket_link: Option<String>,
    /// Unix seconds.
    pub created_at: i64,
}

impl BranchInfo {
    /// The purpose, or [`NO_PURPOSE`] when unset or blank.
    pub fn purpose_or_default(&self) -> &str {
        self.purpose
            .as_deref()
            .filter(|purpose| !purpose.trim().is_empty())
            .unwrap_or(NO_PURPOSE)
    }
}

pub struct BranchStore {
    conn: Connection,
}

impl BranchStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened branch store");
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
        };
        store.create_table_if_not_exists()?;
        Ok(store)
    }

    pub fn create_table_if_not_exists(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS branches (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                branch_name TEXT,
                purpose TEXT,
                ticket_link TEXT,
                created_at INTEGER
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, branch_name: &str) -> Result<BranchInfo, StoreError> {
        self.conn
            .query_row(
                "SELECT branch_name, purpose, ticket_link, created_at
                 FROM branches WHERE branch_name = ?1 ORDER BY id LIMIT 1",
                params![branch_name],
                |row| {
                    Ok(BranchInfo {
                        branch_name: row.get(0)?,
                        purpose: row.get(1)?,
                        ticket_link: row.get(2)?,
                        created_at: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::DoesNotExist(branch_name.to_string()))
    }

    pub fn insert(&self, info: &BranchInfo) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO branches (branch_name, purpose, ticket_link, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                info.branch_name,
                info.purpose,
                info.ticket_link,
                info.created_at
            ],
        )?;
        debug!(branch = %info.branch_name, "inserted branch info");
        Ok(())
    }

    /// Update purpose and ticket link; `created_at` is kept.
    pub fn update(
        &self,
        branch_name: &str,
        purpose: Option<&str>,
        ticket_link: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE branches SET purpose = ?1, ticket_link = ?2 WHERE branch_name = ?3",
            params![purpose, ticket_link, branch_name],
        )?;
        if changed == 0 {
            return Err(StoreError::DoesNotExist(branch_name.to_string()));
        }
        debug!(branch = branch_name, "updated branch info");
        Ok(())
    }

    /// Purpose text for `branch_name`, absorbing a missing record.
    pub fn purpose_for(&self, branch_name: &str) -> Result<String, StoreError> {
        match self.get(branch_name) {
            Ok(info) => Ok(info.purpose_or_default().to_string()),
            Err(StoreError::DoesNotExist(_)) => Ok(NO_PURPOSE.to_string()),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(branch: &str, purpose: Option<&str>) -> BranchInfo {
        BranchInfo {
            branch_name: branch.to_string(),
            purpose: purpose.map(str::to_string),
            ticket_link: None,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn missing_branch_does_not_exist() {
        let store = BranchStore::in_memory().expect("store");
        let err = store.get("feature").expect_err("missing");
        assert!(matches!(err, StoreError::DoesNotExist(ref name) if name == "feature"));
    }

    #[test]
    fn insert_then_update_keeps_created_at() {
        let store = BranchStore::in_memory().expect("store");
        store.insert(&info("feature", Some("old"))).expect("insert");

        store
            .update("feature", Some("new"), Some("https://tickets/1"))
            .expect("update");

        let stored = store.get("feature").expect("get");
        assert_eq!(stored.purpose.as_deref(), Some("new"));
        assert_eq!(stored.ticket_link.as_deref(), Some("https://tickets/1"));
        assert_eq!(stored.created_at, 1_700_000_000);
    }

    #[test]
    fn update_of_unknown_branch_fails() {
        let store = BranchStore::in_memory().expect("store");
        assert!(matches!(
            store.update("ghost", None, None),
            Err(StoreError::DoesNotExist(_))
        ));
    }

    #[test]
    fn purpose_falls_back_to_sentinel() {
        let store = BranchStore::in_memory().expect("store");
        store.insert(&info("blank", Some("  "))).expect("insert");
        store.insert(&info("set", Some("Add login"))).expect("insert");

        assert_eq!(store.purpose_for("missing").expect("purpose"), NO_PURPOSE);
        assert_eq!(store.purpose_for("blank").expect("purpose"), NO_PURPOSE);
        assert_eq!(store.purpose_for("set").expect("purpose"), "Add login");
    }

    #[test]
    fn table_creation_is_idempotent_on_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("gitai.sqlite3");
        let store = BranchStore::open(&path).expect("open");
        store.create_table_if_not_exists().expect("create");
        store.insert(&info("main", None)).expect("insert");
        drop(store);

        let reopened = BranchStore::open(&path).expect("reopen");
        reopened.create_table_if_not_exists().expect("create again");
        assert_eq!(reopened.get("main").expect("get").purpose, None);
    }
}
