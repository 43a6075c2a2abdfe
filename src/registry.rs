use crate::error::{Outcome, Result, Warning};
use crate::storage::{ObjectStore, REGISTRY_KEY};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        department TEXT NOT NULL,
        year INTEGER NOT NULL,
        section TEXT NOT NULL,
        name TEXT NOT NULL,
        email TEXT NOT NULL,
        count INTEGER DEFAULT 1,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        UNIQUE(department, year, section, name, email)
    )
";

/// A registration request. Uniqueness is decided on the case-normalized
/// (department, year, section, name, email) tuple.
#[derive(Debug, Clone)]
pub struct Registration {
    pub department: String,
    pub year: u16,
    pub section: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub s_no: usize,
    pub id: i64,
    pub department: String,
    pub year: u16,
    pub section: String,
    pub name: String,
    pub email: String,
    pub count: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy)]
pub struct UpsertResult {
    pub created: bool,
}

/// Visitor registry: a single SQLite table whose file lives in the object
/// store. The local file is only a transient cache; it is re-downloaded
/// before every operation and re-uploaded wholesale after every mutation,
/// so concurrent writers are last-writer-wins.
pub struct UserRegistry {
    store: Arc<dyn ObjectStore>,
    local_path: PathBuf,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn ObjectStore>, local_path: PathBuf) -> Self {
        Self { store, local_path }
    }

    /// Registers a visitor. A repeat of an existing key (compared
    /// case-insensitively, section upper-cased) increments the visit count
    /// instead of inserting a second row.
    pub async fn upsert(&self, reg: &Registration) -> Result<Outcome<UpsertResult>> {
        let warnings = self.pull().await;

        let conn = self.open()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users
                 WHERE LOWER(department) = LOWER(?1)
                 AND year = ?2
                 AND UPPER(section) = UPPER(?3)
                 AND LOWER(name) = LOWER(?4)
                 AND LOWER(email) = LOWER(?5)",
                params![reg.department, reg.year, reg.section, reg.name, reg.email],
                |row| row.get(0),
            )
            .optional()?;

        let created = match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE users SET count = count + 1, updated_at = CURRENT_TIMESTAMP WHERE id = ?1",
                    params![id],
                )?;
                info!("Updated visit count for {}", reg.name);
                false
            }
            None => {
                conn.execute(
                    "INSERT INTO users (department, year, section, name, email, count)
                     VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                    params![
                        reg.department,
                        reg.year,
                        reg.section.to_uppercase(),
                        reg.name,
                        reg.email
                    ],
                )?;
                info!("Registered new visitor {}", reg.name);
                true
            }
        };
        drop(conn);

        self.push().await?;
        Ok(Outcome::with_warnings(UpsertResult { created }, warnings))
    }

    /// All visitors ordered by (year, section, name), each row carrying a
    /// derived 1-based serial number.
    pub async fn list_sorted(&self) -> Result<Outcome<Vec<UserRecord>>> {
        let warnings = self.pull().await;

        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, department, year, section, name, email, count, created_at, updated_at
             FROM users
             ORDER BY year ASC, section ASC, name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(UserRecord {
                s_no: 0,
                id: row.get(0)?,
                department: row.get(1)?,
                year: row.get(2)?,
                section: row.get(3)?,
                name: row.get(4)?,
                email: row.get(5)?,
                count: row.get(6)?,
                created_at: row.get(7)?,
                updated_at: row.get(8)?,
            })
        })?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        for (idx, user) in users.iter_mut().enumerate() {
            user.s_no = idx + 1;
        }
        Ok(Outcome::with_warnings(users, warnings))
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.local_path)?;
        conn.execute(SCHEMA, [])?;
        Ok(conn)
    }

    /// Refreshes the local file from the object store. Absent or unreachable
    /// remote falls back to whatever is on disk (or a fresh empty schema),
    /// reported as a warning so the potential lost update is visible.
    async fn pull(&self) -> Vec<Warning> {
        match self.store.get(REGISTRY_KEY).await {
            Ok(Some(bytes)) => {
                if let Err(e) = std::fs::write(&self.local_path, bytes) {
                    warn!("Failed to write local registry file: {}", e);
                    return vec![Warning::RegistryPullFailed {
                        reason: e.to_string(),
                    }];
                }
                Vec::new()
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to pull registry from object store: {}", e);
                vec![Warning::RegistryPullFailed {
                    reason: e.to_string(),
                }]
            }
        }
    }

    /// Uploads the whole registry file after a mutation. This is the
    /// last-writer-wins half of the hazard described on `UserRegistry`.
    async fn push(&self) -> Result<()> {
        let bytes = std::fs::read(&self.local_path)?;
        self.store
            .put(REGISTRY_KEY, bytes, "application/octet-stream")
            .await
    }
}
