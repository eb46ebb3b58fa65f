use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{Entry, Error, Result, TableExtend, TableFetch, TableRemove, TableUpdate};

pub struct InMemTable<E> {
    rows: RwLock<Vec<E>>,
}

impl<E: Entry> InMemTable<E> {
    pub fn new(rows: Vec<E>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }
}

impl<E: Entry> Default for InMemTable<E> {
    fn default() -> Self {
        Self::new(vec![])
    }
}

impl<E: Entry, C: AsRef<[E]>> From<C> for InMemTable<E> {
    fn from(rows: C) -> Self {
        Self::new(rows.as_ref().to_vec())
    }
}

#[async_trait]
impl<E: Entry> TableFetch<E> for InMemTable<E> {
    async fn fetch(&self) -> Result<Vec<E>> {
        Ok(self.rows.read().await.clone())
    }

    async fn get(&self, key: &E::Key) -> Result<Option<E>> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|row| &row.key() == key)
            .cloned())
    }
}

#[async_trait]
impl<E: Entry> TableExtend<E> for InMemTable<E> {
    async fn extend(&self, entries: &[E]) -> Result<()> {
        let mut rows = self.rows.write().await;

        for (idx, entry) in entries.iter().enumerate() {
            let key = entry.key();
            let taken = rows.iter().any(|row| row.key() == key)
                || entries[..idx].iter().any(|prev| prev.key() == key);

            if taken {
                return Err(Error::DuplicateKey(format!("{:?}", key)));
            }
        }

        rows.extend(entries.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl<E: Entry> TableUpdate<E> for InMemTable<E> {
    async fn update(&self, key: &E::Key, entry: &E) -> Result<bool> {
        let mut rows = self.rows.write().await;

        let Some(idx) = rows.iter().position(|row| &row.key() == key) else {
            return Ok(false);
        };

        let new_key = entry.key();
        if &new_key != key && rows.iter().any(|row| row.key() == new_key) {
            return Err(Error::DuplicateKey(format!("{:?}", new_key)));
        }

        rows[idx] = entry.clone();
        Ok(true)
    }
}

#[async_trait]
impl<E: Entry> TableRemove<E> for InMemTable<E> {
    async fn remove(&self, key: &E::Key) -> Result<bool> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|row| &row.key() != key);
        Ok(rows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Row(u32, &'static str);

    impl Entry for Row {
        type Key = u32;

        fn key(&self) -> u32 {
            self.0
        }
    }

    #[tokio::test]
    async fn fetch() {
        let table: InMemTable<Row> = [Row(1, "a"), Row(2, "b")].into();
        let rows = table.fetch().await.unwrap();

        assert_eq!(rows, vec![Row(1, "a"), Row(2, "b")]);
        assert_eq!(table.get(&2).await.unwrap(), Some(Row(2, "b")));
        assert_eq!(table.get(&3).await.unwrap(), None);
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let table: InMemTable<Row> = [Row(1, "a")].into();

        table.extend_one(&Row(2, "b")).await.unwrap();
        assert!(matches!(
            table.extend_one(&Row(1, "c")).await,
            Err(Error::DuplicateKey(_))
        ));
        assert!(matches!(
            table.extend(&[Row(5, "x"), Row(5, "y")]).await,
            Err(Error::DuplicateKey(_))
        ));
        assert_eq!(table.fetch().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_moves_key() {
        let table: InMemTable<Row> = [Row(1, "a"), Row(2, "b")].into();

        assert!(table.update(&1, &Row(3, "c")).await.unwrap());
        assert!(!table.update(&7, &Row(7, "z")).await.unwrap());
        assert!(matches!(
            table.update(&3, &Row(2, "c")).await,
            Err(Error::DuplicateKey(_))
        ));

        assert_eq!(table.fetch().await.unwrap(), vec![Row(3, "c"), Row(2, "b")]);
    }

    #[tokio::test]
    async fn remove() {
        let table: InMemTable<Row> = [Row(1, "a")].into();

        assert!(table.remove(&1).await.unwrap());
        assert!(!table.remove(&1).await.unwrap());
        assert!(table.fetch().await.unwrap().is_empty());
    }
}
