use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

use crate::models::catalog::ClassItem;
use crate::services::payment_ledger::StorageError;

/// Read side of the class catalog, as far as payments need it.
#[async_trait]
pub trait ClassCatalog: Send + Sync {
    async fn find(&self, id: &str) -> Result<Option<ClassItem>, StorageError>;
}

#[derive(Default, Clone)]
pub struct InMemoryClassCatalog {
    classes: Arc<DashMap<String, ClassItem>>,
}

impl InMemoryClassCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classes(classes: impl IntoIterator<Item = ClassItem>) -> Self {
        let catalog = Self::new();
        for class in classes {
            catalog.upsert(class);
        }
        catalog
    }

    pub fn upsert(&self, class: ClassItem) {
        self.classes.insert(class.id.clone(), class);
    }
}

#[async_trait]
impl ClassCatalog for InMemoryClassCatalog {
    async fn find(&self, id: &str) -> Result<Option<ClassItem>, StorageError> {
        Ok(self.classes.get(id).map(|entry| entry.clone()))
    }
}
