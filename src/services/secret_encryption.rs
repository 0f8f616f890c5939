//! Secret encryption service using AES-256-GCM
//!
//! Production implementation of the `SecretCipher` port. Secret values are
//! encrypted at rest with AES-256-GCM using a unique random nonce per value;
//! the ciphertext string is base64 over `nonce || ciphertext || tag`.
//!
//! ## Configuration
//!
//! The master key is loaded from the environment variable
//! `ENVKEEP_SECRET_ENCRYPTION_KEY` (base64-encoded 32-byte key).
//!
//! ## Key rotation
//!
//! `rotate_key` replaces the in-memory key with fresh random material and
//! bumps the key id. Values encrypted under the old key are no longer
//! decryptable; the rotate use case re-encrypts before rotation matters.

use crate::config::CipherConfig;
use crate::errors::{EnvkeepError, Result};
use crate::ports::{KeyInfo, SecretCipher};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::aead::{self, Aad, BoundKey, Nonce, NonceSequence, UnboundKey, AES_256_GCM};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::{Arc, RwLock};
use tracing::{debug, error};
use zeroize::Zeroizing;

/// Size of AES-256-GCM nonce in bytes
const NONCE_SIZE: usize = 12;

/// Size of AES-256-GCM tag in bytes
const TAG_SIZE: usize = 16;

/// Single-use nonce sequence for AES-GCM
struct SingleNonce {
    nonce: Option<[u8; NONCE_SIZE]>,
}

impl SingleNonce {
    fn new(nonce_bytes: [u8; NONCE_SIZE]) -> Self {
        Self { nonce: Some(nonce_bytes) }
    }
}

impl NonceSequence for SingleNonce {
    fn advance(&mut self) -> std::result::Result<Nonce, ring::error::Unspecified> {
        self.nonce.take().map(Nonce::assume_unique_for_key).ok_or(ring::error::Unspecified)
    }
}

struct KeyState {
    key_bytes: Zeroizing<[u8; 32]>,
    key_id: String,
    created_at: DateTime<Utc>,
}

/// AES-256-GCM implementation of the `SecretCipher` port
#[derive(Clone)]
pub struct SecretEncryption {
    state: Arc<RwLock<KeyState>>,
    rng: Arc<SystemRandom>,
}

impl SecretEncryption {
    /// Create a new encryption service from configuration
    pub fn new(config: &CipherConfig) -> Result<Self> {
        let key_bytes =
            base64::engine::general_purpose::STANDARD.decode(&config.master_key_base64).map_err(
                |e| {
                    EnvkeepError::config(format!(
                        "Invalid base64 in ENVKEEP_SECRET_ENCRYPTION_KEY: {}",
                        e
                    ))
                },
            )?;

        if key_bytes.len() != 32 {
            return Err(EnvkeepError::config(format!(
                "ENVKEEP_SECRET_ENCRYPTION_KEY must be 32 bytes (256 bits), got {} bytes",
                key_bytes.len()
            )));
        }

        let mut key_array = Zeroizing::new([0u8; 32]);
        key_array.copy_from_slice(&key_bytes);

        debug!(key_id = %config.key_version, "Secret encryption service initialized");

        Ok(Self {
            state: Arc::new(RwLock::new(KeyState {
                key_bytes: key_array,
                key_id: config.key_version.clone(),
                created_at: Utc::now(),
            })),
            rng: Arc::new(SystemRandom::new()),
        })
    }

    /// Create a development/testing cipher with a fixed key.
    /// WARNING: Only use this for development/testing, never in production!
    pub fn for_testing() -> Self {
        let config = CipherConfig {
            master_key_base64: base64::engine::general_purpose::STANDARD.encode([0x42u8; 32]),
            key_version: "test".to_string(),
        };
        Self::new(&config).expect("test cipher config is valid")
    }

    fn current_key(&self) -> Result<(Zeroizing<[u8; 32]>, String)> {
        let state = self
            .state
            .read()
            .map_err(|_| EnvkeepError::internal("Cipher key lock poisoned"))?;
        Ok((state.key_bytes.clone(), state.key_id.clone()))
    }

    fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let (key_bytes, _) = self.current_key()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        self.rng.fill(&mut nonce_bytes).map_err(|_| {
            error!("Failed to generate random nonce");
            EnvkeepError::cipher("Failed to generate random nonce for encryption")
        })?;

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*key_bytes)
            .map_err(|_| EnvkeepError::cipher("Failed to create encryption key"))?;
        let mut sealing_key = aead::SealingKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut ciphertext = plaintext.to_vec();
        ciphertext.reserve(TAG_SIZE);
        sealing_key
            .seal_in_place_append_tag(Aad::empty(), &mut ciphertext)
            .map_err(|_| EnvkeepError::cipher("Failed to encrypt secret data"))?;

        // Envelope: nonce || ciphertext || tag
        let mut envelope = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        envelope.extend_from_slice(&nonce_bytes);
        envelope.extend_from_slice(&ciphertext);
        Ok(envelope)
    }

    fn decrypt_bytes(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < NONCE_SIZE + TAG_SIZE {
            return Err(EnvkeepError::cipher("Ciphertext too short"));
        }

        let (key_bytes, _) = self.current_key()?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&envelope[..NONCE_SIZE]);

        let unbound_key = UnboundKey::new(&AES_256_GCM, &*key_bytes)
            .map_err(|_| EnvkeepError::cipher("Failed to create decryption key"))?;
        let mut opening_key = aead::OpeningKey::new(unbound_key, SingleNonce::new(nonce_bytes));

        let mut buffer = envelope[NONCE_SIZE..].to_vec();
        let decrypted = opening_key.open_in_place(Aad::empty(), &mut buffer).map_err(|_| {
            error!("Decryption failed, possible tampering or wrong key");
            EnvkeepError::cipher("Failed to decrypt secret data: authentication failed")
        })?;

        Ok(decrypted.to_vec())
    }
}

#[async_trait]
impl SecretCipher for SecretEncryption {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        let envelope = self.encrypt_bytes(plaintext.as_bytes())?;
        Ok(base64::engine::general_purpose::STANDARD.encode(envelope))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let envelope = base64::engine::general_purpose::STANDARD
            .decode(ciphertext)
            .map_err(|_| EnvkeepError::cipher("Ciphertext is not valid base64"))?;
        let plaintext = self.decrypt_bytes(&envelope)?;
        String::from_utf8(plaintext)
            .map_err(|_| EnvkeepError::cipher("Decrypted data is not valid UTF-8"))
    }

    async fn rotate_key(&self) -> Result<bool> {
        let mut new_key = Zeroizing::new([0u8; 32]);
        self.rng
            .fill(&mut *new_key)
            .map_err(|_| EnvkeepError::cipher("Failed to generate rotated key material"))?;

        let mut state = self
            .state
            .write()
            .map_err(|_| EnvkeepError::internal("Cipher key lock poisoned"))?;
        let next_id = format!("{}-r{}", state.key_id, Utc::now().timestamp());
        state.key_bytes = new_key;
        state.key_id = next_id;
        state.created_at = Utc::now();

        debug!(key_id = %state.key_id, "Encryption key rotated");
        Ok(true)
    }

    async fn get_key_info(&self) -> Result<KeyInfo> {
        let state = self
            .state
            .read()
            .map_err(|_| EnvkeepError::internal("Cipher key lock poisoned"))?;
        Ok(KeyInfo {
            key_id: state.key_id.clone(),
            algorithm: "AES-256-GCM".to_string(),
            created_at: state.created_at,
        })
    }
}

impl std::fmt::Debug for SecretEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEncryption").field("key_bytes", &"[REDACTED]").finish()
    }
}
