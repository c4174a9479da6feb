//! Credential lookup
//!
//! Handlers that talk to external services resolve their `credentialId`
//! through a [`CredentialStore`]. The executor itself never reads credentials.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Credential store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_credential_by_id(&self, id: &str) -> Result<Option<Value>, CredentialError>;
}

/// Credentials held in memory, usually loaded from the engine config
#[derive(Clone, Default)]
pub struct InMemoryCredentialStore {
    entries: HashMap<String, Value>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }

    pub fn insert(&mut self, id: impl Into<String>, data: Value) {
        self.entries.insert(id.into(), data);
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Ids only, never the secret material
        f.debug_struct("InMemoryCredentialStore")
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_credential_by_id(&self, id: &str) -> Result<Option<Value>, CredentialError> {
        Ok(self.entries.get(id).cloned())
    }
}
