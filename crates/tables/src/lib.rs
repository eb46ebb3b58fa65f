pub mod in_mem;
pub mod sqlite;

use async_trait::async_trait;
use std::{error::Error as StdError, fmt::Debug, fmt::Display};

pub use rusqlite;

pub mod prelude {
    pub use crate::{Entry, Table, TableExtend, TableFetch, TableRemove, TableUpdate};
}

/// A row addressed by a unique key.
pub trait Entry: Clone + Send + Sync + 'static {
    type Key: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;
}

#[derive(Debug)]
pub enum Error {
    Sqlite(rusqlite::Error),
    Pool(r2d2::Error),
    Join(tokio::task::JoinError),
    DuplicateKey(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Sqlite(e) => write!(f, "sqlite error: {}", e),
            Error::Pool(e) => write!(f, "pool error: {}", e),
            Error::Join(e) => write!(f, "blocking task failed: {}", e),
            Error::DuplicateKey(k) => write!(f, "duplicate key: {}", k),
        }
    }
}

impl StdError for Error {}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Sqlite(e)
    }
}

impl From<r2d2::Error> for Error {
    fn from(e: r2d2::Error) -> Self {
        Error::Pool(e)
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Join(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[async_trait]
pub trait TableFetch<E: Entry>: Send + Sync {
    async fn fetch(&self) -> Result<Vec<E>>;

    async fn get(&self, key: &E::Key) -> Result<Option<E>>;
}

#[async_trait]
pub trait TableExtend<E: Entry>: Send + Sync {
    async fn extend(&self, entries: &[E]) -> Result<()>;

    async fn extend_one(&self, entry: &E) -> Result<()> {
        self.extend(std::slice::from_ref(entry)).await
    }
}

#[async_trait]
pub trait TableUpdate<E: Entry>: Send + Sync {
    /// Replaces the row stored under `key`. The entry may carry a new key.
    /// Returns `false` when no row matched.
    async fn update(&self, key: &E::Key, entry: &E) -> Result<bool>;
}

#[async_trait]
pub trait TableRemove<E: Entry>: Send + Sync {
    async fn remove(&self, key: &E::Key) -> Result<bool>;
}

pub trait Table<E: Entry>: TableFetch<E> + TableExtend<E> + TableUpdate<E> + TableRemove<E> {}

impl<E, T> Table<E> for T
where
    E: Entry,
    T: TableFetch<E> + TableExtend<E> + TableUpdate<E> + TableRemove<E>,
{
}
