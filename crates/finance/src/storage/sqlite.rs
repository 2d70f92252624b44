//! SQLite-backed local storage

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use super::traits::{InsertBatch, LocalStore};
use crate::models::{Direction, LedgerEntry, LimitPeriod, Money, PreferenceSettings, SpendingLimit};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Ledger entries with soft delete
            CREATE TABLE entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                amount_cents INTEGER NOT NULL,
                direction TEXT NOT NULL,
                category_id INTEGER,
                note TEXT,
                date TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                is_deleted INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX idx_entries_account ON entries(account_id);
            CREATE INDEX idx_entries_date ON entries(date);

            -- Spending limits (no soft delete)
            CREATE TABLE limits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                account_id TEXT NOT NULL,
                category_id INTEGER NOT NULL,
                ceiling_cents INTEGER NOT NULL,
                period TEXT NOT NULL,
                start_date TEXT NOT NULL,
                end_date TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE INDEX idx_limits_account ON limits(account_id);

            -- Preference settings, one row per account
            CREATE TABLE preferences (
                account_id TEXT PRIMARY KEY,
                theme TEXT NOT NULL DEFAULT 'auto',
                currency TEXT NOT NULL DEFAULT 'USD',
                date_format TEXT NOT NULL DEFAULT 'MM/DD/YYYY',
                language TEXT NOT NULL DEFAULT 'en'
            );
            "#,
        ),
    ])
}

/// SQLite-backed implementation of [`LocalStore`]
pub struct SqliteLocalStore {
    conn: Mutex<Connection>,
}

impl SqliteLocalStore {
    /// Open (or create) the database at `db_path` and apply migrations
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;
        Self::setup(conn)
    }

    /// Open an in-memory database (tests)
    pub fn open_in_memory() -> Result<Self> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to enable WAL mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("Failed to set synchronous mode")?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .context("Failed to enable foreign keys")?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to apply database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert a ledger entry, returning its assigned id
    ///
    /// An id of 0 lets SQLite assign one; a non-zero id is used verbatim
    /// (pull inserts rows under their remote key).
    pub fn insert_entry(&self, entry: &LedgerEntry) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO entries
                (id, account_id, amount_cents, direction, category_id, note,
                 date, created_at, updated_at, is_deleted)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                if entry.id == 0 { None } else { Some(entry.id) },
                entry.account_id,
                entry.amount.cents(),
                entry.direction.as_str(),
                entry.category_id,
                entry.note,
                entry.date.to_string(),
                entry.created_at.to_rfc3339(),
                entry.updated_at.to_rfc3339(),
                entry.is_deleted,
            ],
        )
        .context("Failed to insert ledger entry")?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a spending limit, returning its assigned id
    pub fn insert_limit(&self, limit: &SpendingLimit) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO limits
                (id, account_id, category_id, ceiling_cents, period,
                 start_date, end_date, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                if limit.id == 0 { None } else { Some(limit.id) },
                limit.account_id,
                limit.category_id,
                limit.ceiling.cents(),
                limit.period.as_str(),
                limit.start_date.to_string(),
                limit.end_date.to_string(),
                limit.is_active,
            ],
        )
        .context("Failed to insert spending limit")?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert or replace an account's preferences
    pub fn upsert_preferences(&self, prefs: &PreferenceSettings) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO preferences (account_id, theme, currency, date_format, language)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(account_id) DO UPDATE SET
                theme = excluded.theme,
                currency = excluded.currency,
                date_format = excluded.date_format,
                language = excluded.language",
            params![
                prefs.account_id,
                prefs.theme,
                prefs.currency,
                prefs.date_format,
                prefs.language,
            ],
        )
        .context("Failed to upsert preferences")?;
        Ok(())
    }

    /// Fetch one ledger entry by id, deleted or not
    pub fn get_entry(&self, id: i64) -> Result<Option<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, account_id, amount_cents, direction, category_id, note,
                    date, created_at, updated_at, is_deleted
             FROM entries WHERE id = ?1",
            [id],
            entry_from_row,
        )
        .optional()
        .context("Failed to query ledger entry")
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LedgerEntry> {
    let direction: String = row.get(3)?;
    let date: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: Money::from_cents(row.get(2)?),
        direction: Direction::parse(&direction).map_err(invalid_column(3))?,
        category_id: row.get(4)?,
        note: row.get(5)?,
        date: date.parse().map_err(invalid_column(6))?,
        created_at: parse_instant(&created_at).map_err(invalid_column(7))?,
        updated_at: parse_instant(&updated_at).map_err(invalid_column(8))?,
        is_deleted: row.get(9)?,
    })
}

fn limit_from_row(row: &Row<'_>) -> rusqlite::Result<SpendingLimit> {
    let period: String = row.get(4)?;
    let start_date: String = row.get(5)?;
    let end_date: String = row.get(6)?;
    Ok(SpendingLimit {
        id: row.get(0)?,
        account_id: row.get(1)?,
        category_id: row.get(2)?,
        ceiling: Money::from_cents(row.get(3)?),
        period: LimitPeriod::parse(&period).map_err(invalid_column(4))?,
        start_date: start_date.parse().map_err(invalid_column(5))?,
        end_date: end_date.parse().map_err(invalid_column(6))?,
        is_active: row.get(7)?,
    })
}

fn parse_instant(text: &str) -> anyhow::Result<chrono::DateTime<chrono::Utc>> {
    Ok(chrono::DateTime::parse_from_rfc3339(text)?.with_timezone(&chrono::Utc))
}

/// Map a domain parse error onto the rusqlite error type for row mappers
fn invalid_column<E: std::fmt::Display>(
    index: usize,
) -> impl FnOnce(E) -> rusqlite::Error {
    move |e| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            e.to_string().into(),
        )
    }
}

impl LocalStore for SqliteLocalStore {
    fn list_active_entries(&self, account_id: &str) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, account_id, amount_cents, direction, category_id, note,
                    date, created_at, updated_at, is_deleted
             FROM entries
             WHERE account_id = ?1 AND is_deleted = 0
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([account_id], entry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list ledger entries")?;
        Ok(rows)
    }

    fn list_limits(&self, account_id: &str) -> Result<Vec<SpendingLimit>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, account_id, category_id, ceiling_cents, period,
                    start_date, end_date, is_active
             FROM limits
             WHERE account_id = ?1
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([account_id], limit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list spending limits")?;
        Ok(rows)
    }

    fn get_preferences(&self, account_id: &str) -> Result<Option<PreferenceSettings>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT account_id, theme, currency, date_format, language
             FROM preferences WHERE account_id = ?1",
            [account_id],
            |row| {
                Ok(PreferenceSettings {
                    account_id: row.get(0)?,
                    theme: row.get(1)?,
                    currency: row.get(2)?,
                    date_format: row.get(3)?,
                    language: row.get(4)?,
                })
            },
        )
        .optional()
        .context("Failed to query preferences")
    }

    fn has_entry(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM entries WHERE id = ?1", [id], |row| {
                row.get(0)
            })?;
        Ok(count > 0)
    }

    fn has_limit(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM limits WHERE id = ?1", [id], |row| {
                row.get(0)
            })?;
        Ok(count > 0)
    }

    fn apply_inserts(&self, batch: InsertBatch) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().context("Failed to open transaction")?;

        for entry in &batch.entries {
            tx.execute(
                "INSERT INTO entries
                    (id, account_id, amount_cents, direction, category_id, note,
                     date, created_at, updated_at, is_deleted)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    entry.id,
                    entry.account_id,
                    entry.amount.cents(),
                    entry.direction.as_str(),
                    entry.category_id,
                    entry.note,
                    entry.date.to_string(),
                    entry.created_at.to_rfc3339(),
                    entry.updated_at.to_rfc3339(),
                    entry.is_deleted,
                ],
            )
            .context("Failed to insert pulled ledger entry")?;
        }

        for limit in &batch.limits {
            tx.execute(
                "INSERT INTO limits
                    (id, account_id, category_id, ceiling_cents, period,
                     start_date, end_date, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    limit.id,
                    limit.account_id,
                    limit.category_id,
                    limit.ceiling.cents(),
                    limit.period.as_str(),
                    limit.start_date.to_string(),
                    limit.end_date.to_string(),
                    limit.is_active,
                ],
            )
            .context("Failed to insert pulled spending limit")?;
        }

        if let Some(prefs) = &batch.preferences {
            tx.execute(
                "INSERT INTO preferences (account_id, theme, currency, date_format, language)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    prefs.account_id,
                    prefs.theme,
                    prefs.currency,
                    prefs.date_format,
                    prefs.language,
                ],
            )
            .context("Failed to insert pulled preferences")?;
        }

        tx.commit().context("Failed to commit pulled rows")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Direction;
    use chrono::NaiveDate;

    fn store() -> SqliteLocalStore {
        SqliteLocalStore::open_in_memory().unwrap()
    }

    fn entry(id: i64, account: &str) -> LedgerEntry {
        LedgerEntry::new(
            id,
            account,
            Money::from_cents(1234),
            Direction::Outflow,
            NaiveDate::from_ymd_opt(2025, 2, 14).unwrap(),
        )
        .with_note("test")
    }

    #[test]
    fn test_insert_and_list_roundtrip() {
        let store = store();
        store.insert_entry(&entry(1, "a")).unwrap();
        store.insert_entry(&entry(2, "a").deleted()).unwrap();
        store.insert_entry(&entry(3, "b")).unwrap();

        let active = store.list_active_entries("a").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, 1);
        assert_eq!(active[0].amount, Money::from_cents(1234));
        assert_eq!(active[0].note.as_deref(), Some("test"));
        assert!(store.has_entry(2).unwrap());
        assert!(store.get_entry(2).unwrap().unwrap().is_deleted);
    }

    #[test]
    fn test_auto_assigned_id() {
        let store = store();
        let id = store.insert_entry(&entry(0, "a")).unwrap();
        assert!(id > 0);
        assert!(store.has_entry(id).unwrap());
    }

    #[test]
    fn test_limits_roundtrip() {
        let store = store();
        let limit = SpendingLimit::new(
            5,
            "a",
            2,
            Money::from_cents(50_000),
            LimitPeriod::Monthly,
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
        );
        store.insert_limit(&limit).unwrap();
        let rows = store.list_limits("a").unwrap();
        assert_eq!(rows, vec![limit]);
    }

    #[test]
    fn test_preferences_upsert() {
        let store = store();
        let prefs = PreferenceSettings::new("a");
        store.upsert_preferences(&prefs).unwrap();
        store
            .upsert_preferences(&prefs.clone().with_theme("dark"))
            .unwrap();
        let loaded = store.get_preferences("a").unwrap().unwrap();
        assert_eq!(loaded.theme, "dark");
    }

    #[test]
    fn test_apply_inserts_is_transactional() {
        let store = store();
        store.insert_entry(&entry(1, "a")).unwrap();

        // Second row collides on primary key; the first must not survive
        // the failed batch either.
        let mut batch = InsertBatch::new();
        batch.entries.push(entry(10, "a"));
        batch.entries.push(entry(1, "a"));
        assert!(store.apply_inserts(batch).is_err());
        assert!(!store.has_entry(10).unwrap());
    }

    #[test]
    fn test_on_disk_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moneta.db");
        {
            let store = SqliteLocalStore::new(&path).unwrap();
            store.insert_entry(&entry(1, "a")).unwrap();
        }
        let reopened = SqliteLocalStore::new(&path).unwrap();
        assert!(reopened.has_entry(1).unwrap());
    }
}
