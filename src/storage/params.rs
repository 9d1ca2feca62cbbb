//! Parameter and model store interfaces.
//!
//! The generic key-value store persists the round prime across protocol
//! phases; the model store reports the byte size of the registered model.
//! Both are owned by the surrounding server. The in-memory versions here back
//! single-process deployments and tests.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::StorageError;

/// Key-value store holding the round prime.
pub trait ParameterStore: Send + Sync {
    /// Persists `value` under `key`, replacing any previous value.
    fn register_prime(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Reads the value stored under `key`.
    fn get_prime(&self, key: &str) -> Result<Vec<u8>, StorageError>;
}

/// Source of the model size that determines the feature-vector length.
pub trait ModelStore: Send + Sync {
    /// Byte size of the registered model, `None` if no model is registered.
    fn model_size_bytes(&self) -> Option<usize>;
}

/// In-memory `ParameterStore`.
#[derive(Debug, Default)]
pub struct MemoryParameterStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParameterStore for MemoryParameterStore {
    fn register_prime(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get_prime(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned().ok_or(StorageError::NotFound)
    }
}

/// `ModelStore` reporting a fixed size.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedModelStore {
    size: Option<usize>,
}

impl FixedModelStore {
    pub fn new(size_bytes: usize) -> Self {
        Self { size: Some(size_bytes) }
    }

    /// A store with no registered model.
    pub fn empty() -> Self {
        Self { size: None }
    }
}

impl ModelStore for FixedModelStore {
    fn model_size_bytes(&self) -> Option<usize> {
        self.size
    }
}
