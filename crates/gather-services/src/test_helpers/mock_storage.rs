use async_trait::async_trait;
use gather_storage::{Storage, StorageError, StorageResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Storage whose writes always fail, counting the attempts.
#[derive(Clone, Default)]
pub struct FailingStorage {
    upload_attempts: Arc<AtomicUsize>,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_attempts(&self) -> usize {
        self.upload_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for FailingStorage {
    async fn upload(
        &self,
        _task_id: Uuid,
        _extension: &str,
        _content_type: &str,
        _data: Vec<u8>,
    ) -> StorageResult<String> {
        self.upload_attempts.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::UploadFailed("disk full".to_string()))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, _storage_key: &str) -> StorageResult<()> {
        Ok(())
    }

    async fn exists(&self, _storage_key: &str) -> StorageResult<bool> {
        Ok(false)
    }
}
