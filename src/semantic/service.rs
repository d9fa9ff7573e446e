//! Process-wide lazily-initialized embedding model handle.
//!
//! Model load takes seconds on first use (and may download weights), so
//! the handle is created once and shared for the process lifetime.
//! Concurrent first calls serialize on the state mutex: the second caller
//! blocks until the in-flight load finishes and then reuses its handle,
//! never starting a duplicate load.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::semantic::embeddings::{Embedder, EmbeddingError, EmbeddingModel};

pub struct EmbeddingService {
    model_name: String,
    cache_dir: PathBuf,
    /// Lazily-initialized handle. Mutex<Option<_>> instead of OnceLock
    /// because get_or_try_init is unstable.
    state: Mutex<Option<Arc<EmbeddingModel>>>,
}

impl EmbeddingService {
    pub fn new(model_name: &str, cache_dir: PathBuf) -> Self {
        Self {
            model_name: model_name.to_string(),
            cache_dir,
            state: Mutex::new(None),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_initialized(&self) -> bool {
        self.state
            .lock()
            .ok()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Get the shared model handle, loading the model if this is the
    /// first use. A failed load is not cached; the next call retries.
    pub fn handle(&self) -> Result<Arc<EmbeddingModel>, EmbeddingError> {
        let mut guard = self.state.lock().map_err(|e| {
            EmbeddingError::InitFailed(format!("Failed to acquire service lock: {}", e))
        })?;

        if guard.is_none() {
            log::info!("Loading embedding model '{}'", self.model_name());
            let model = EmbeddingModel::new(&self.model_name, self.cache_dir.clone())?;
            log::info!(
                "Embedding model ready ({} dimensions)",
                model.dimensions()
            );
            *guard = Some(Arc::new(model));
        }

        Ok(guard.as_ref().cloned().expect("state populated above"))
    }
}

impl Embedder for EmbeddingService {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.handle()?.embed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_initially() {
        let service = EmbeddingService::new("all-MiniLM-L6-v2", std::env::temp_dir());
        assert!(!service.is_initialized());
        assert_eq!(service.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn test_invalid_model_surfaces_on_first_use() {
        let service = EmbeddingService::new("nonexistent-model", std::env::temp_dir());
        let result = service.embed("anything");
        assert!(matches!(result, Err(EmbeddingError::InvalidModel(_))));
        // a failed load must not poison the service state
        assert!(!service.is_initialized());
    }

    #[test]
    #[ignore = "requires model download (~23MB)"]
    fn test_handle_is_shared_across_calls() {
        let dir = std::env::temp_dir().join("snapfind-service-test");
        let service = EmbeddingService::new("all-MiniLM-L6-v2", dir.clone());

        let first = service.handle().unwrap();
        let second = service.handle().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(service.is_initialized());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
