use crate::domain::ports::{Record, Repository};
use crate::utils::error::{CatalogError, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Insertion-ordered in-memory repository keyed by `Record::record_id`.
pub struct InMemoryRepository<T: Record> {
    items: RwLock<Vec<T>>,
}

impl<T: Record> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Record> InMemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self) -> usize {
        self.items.read().await.len()
    }
}

#[async_trait]
impl<T: Record> Repository<T> for InMemoryRepository<T> {
    async fn create(&self, item: T) -> Result<T> {
        let mut items = self.items.write().await;
        let id = item.record_id();
        if items.iter().any(|existing| existing.record_id() == id) {
            return Err(CatalogError::Repository {
                message: format!("{} already exists", id),
            });
        }
        items.push(item.clone());
        Ok(item)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<T>> {
        let items = self.items.read().await;
        Ok(items.iter().find(|item| item.record_id() == id).cloned())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|item| item.record_id() != id);
        Ok(items.len() != before)
    }

    async fn list(&self) -> Result<Vec<T>> {
        Ok(self.items.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::SolutionRecord;

    fn solution(id: &str) -> SolutionRecord {
        SolutionRecord {
            id: id.to_string(),
            name: id.to_string(),
            short_desc: String::new(),
            long_desc: String::new(),
            public: true,
            techzone: false,
            platform: None,
            yaml: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_ids_are_rejected() {
        let repository = InMemoryRepository::new();
        repository.create(solution("sol1")).await.unwrap();

        let err = repository.create(solution("sol1")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Repository { .. }));

        assert!(repository.delete_by_id("sol1").await.unwrap());
        assert!(!repository.delete_by_id("sol1").await.unwrap());
        repository.create(solution("sol1")).await.unwrap();
        assert_eq!(repository.count().await, 1);
    }
}
