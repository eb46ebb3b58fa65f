use std::{marker::PhantomData, path::Path};

use async_trait::async_trait;
use log::debug;
use pretty_type_name::pretty_type_name;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params_from_iter, types::Value, Connection, ErrorCode, Row};
use tokio::time::Instant;

use crate::{Entry, Error, Result, TableExtend, TableFetch, TableRemove, TableUpdate};

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Maps an entry onto a single SQLite table. `COLUMNS[0]` is the primary key.
pub trait SqlEntry: Entry {
    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];

    fn to_values(&self) -> Vec<Value>;

    fn key_value(key: &Self::Key) -> Value;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Opens a pooled connection to the database file and applies `schema`.
pub fn open(path: impl AsRef<Path>, schema: &str) -> Result<SqlitePool> {
    let manager = SqliteConnectionManager::file(path.as_ref());
    let pool = Pool::builder().max_size(4).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(schema)?;

    Ok(pool)
}

pub struct SqliteTable<E> {
    pool: SqlitePool,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Clone for SqliteTable<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _marker: PhantomData,
        }
    }
}

impl<E: SqlEntry> SqliteTable<E> {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            _marker: PhantomData,
        }
    }

    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        let now = Instant::now();

        let result = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn)
        })
        .await?;

        debug!(
            "{} on {} took {:?}",
            op,
            pretty_type_name::<E>(),
            now.elapsed()
        );
        result
    }

    fn select_sql() -> String {
        format!("SELECT {} FROM {}", E::COLUMNS.join(", "), E::TABLE)
    }

    fn insert_sql() -> String {
        let placeholders = (1..=E::COLUMNS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            E::TABLE,
            E::COLUMNS.join(", "),
            placeholders
        )
    }

    fn update_sql() -> String {
        let assignments = E::COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            E::TABLE,
            assignments,
            E::COLUMNS[0],
            E::COLUMNS.len() + 1
        )
    }
}

fn map_constraint(err: rusqlite::Error, key: String) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(ref failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            Error::DuplicateKey(key)
        }
        err => Error::Sqlite(err),
    }
}

#[async_trait]
impl<E: SqlEntry> TableFetch<E> for SqliteTable<E> {
    async fn fetch(&self) -> Result<Vec<E>> {
        let sql = format!("{} ORDER BY rowid", Self::select_sql());

        self.with_conn("fetch", move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| E::from_row(row))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await
    }

    async fn get(&self, key: &E::Key) -> Result<Option<E>> {
        let sql = format!("{} WHERE {} = ?1", Self::select_sql(), E::COLUMNS[0]);
        let key = E::key_value(key);

        self.with_conn("get", move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query_map(params_from_iter([key]), |row| E::from_row(row))?;
            Ok(rows.next().transpose()?)
        })
        .await
    }
}

#[async_trait]
impl<E: SqlEntry> TableExtend<E> for SqliteTable<E> {
    async fn extend(&self, entries: &[E]) -> Result<()> {
        let sql = Self::insert_sql();
        let entries = entries.to_vec();

        self.with_conn("extend", move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(&sql)?;
                for entry in &entries {
                    stmt.execute(params_from_iter(entry.to_values()))
                        .map_err(|e| map_constraint(e, format!("{:?}", entry.key())))?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl<E: SqlEntry> TableUpdate<E> for SqliteTable<E> {
    async fn update(&self, key: &E::Key, entry: &E) -> Result<bool> {
        let sql = Self::update_sql();
        let mut values = entry.to_values();
        values.push(E::key_value(key));
        let new_key = format!("{:?}", entry.key());

        self.with_conn("update", move |conn| {
            let changed = conn
                .execute(&sql, params_from_iter(values))
                .map_err(|e| map_constraint(e, new_key))?;
            Ok(changed > 0)
        })
        .await
    }
}

#[async_trait]
impl<E: SqlEntry> TableRemove<E> for SqliteTable<E> {
    async fn remove(&self, key: &E::Key) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE {} = ?1", E::TABLE, E::COLUMNS[0]);
        let key = E::key_value(key);

        self.with_conn("remove", move |conn| {
            let changed = conn.execute(&sql, params_from_iter([key]))?;
            Ok(changed > 0)
        })
        .await
    }
}
