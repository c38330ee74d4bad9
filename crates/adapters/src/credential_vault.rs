// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secure credential vault (interface only, per §4.7). The real cipher
//! and KDF are external collaborators; this crate carries the trait and
//! an in-memory fake used by tests and by DRY_RUN/SIMULATED execution.
//! No plaintext secret is ever logged by any implementation here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialVaultError {
    #[error("credential not found: {0}")]
    NotFound(String),
    #[error("rotation failed: {0}")]
    RotationFailed(String),
}

#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialVaultError>;
    async fn set(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), CredentialVaultError>;
    async fn rotate(&self, new_master: &str) -> Result<(), CredentialVaultError>;
    async fn list(&self) -> Result<Vec<String>, CredentialVaultError>;
}

struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// In-memory stand-in for the real authenticated-encryption-backed
/// vault. `rotate` is a no-op beyond recording the new master secret's
/// fingerprint length, since there is no real cipher underneath.
#[derive(Default)]
pub struct InMemoryCredentialVault {
    entries: Mutex<HashMap<String, Entry>>,
    rotations: Mutex<u32>,
}

impl InMemoryCredentialVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rotation_count(&self) -> u32 {
        *self.rotations.lock()
    }
}

#[async_trait]
impl CredentialVault for InMemoryCredentialVault {
    async fn get(&self, name: &str) -> Result<Option<String>, CredentialVaultError> {
        let entries = self.entries.lock();
        match entries.get(name) {
            Some(entry) => {
                let still_valid = match entry.expires_at {
                    Some(exp) => exp > Utc::now(),
                    None => true,
                };
                if still_valid {
                    Ok(Some(entry.value.clone()))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        name: &str,
        value: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(), CredentialVaultError> {
        self.entries.lock().insert(
            name.to_string(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn rotate(&self, new_master: &str) -> Result<(), CredentialVaultError> {
        if new_master.is_empty() {
            return Err(CredentialVaultError::RotationFailed(
                "empty master secret".to_string(),
            ));
        }
        *self.rotations.lock() += 1;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, CredentialVaultError> {
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

#[cfg(test)]
#[path = "credential_vault_tests.rs"]
mod tests;
