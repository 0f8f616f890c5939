//! Secret cipher capability
//!
//! The core never implements cryptography. It calls this port to encrypt a
//! plaintext before storage and decrypt a ciphertext on reveal. The
//! production implementation lives in `services::secret_encryption`.

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata about the cipher's current key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_id: String,
    pub algorithm: String,
    pub created_at: DateTime<Utc>,
}

/// Encryption capability for secret values
#[async_trait]
pub trait SecretCipher: Send + Sync {
    /// Encrypt plaintext, returning an opaque ciphertext string
    async fn encrypt(&self, plaintext: &str) -> Result<String>;

    /// Decrypt a ciphertext produced by this cipher. Fails with a cipher
    /// error on malformed or foreign ciphertext.
    async fn decrypt(&self, ciphertext: &str) -> Result<String>;

    /// Rotate the underlying key. Previously encrypted values must be
    /// re-encrypted by the caller to remain decryptable.
    async fn rotate_key(&self) -> Result<bool>;

    /// Describe the current key
    async fn get_key_info(&self) -> Result<KeyInfo>;
}
