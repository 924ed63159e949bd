//! Capability interfaces for password fields.
//!
//! Arbor never hashes or encrypts on its own: applications register named
//! providers and the resolver injects them into the password fields that ask
//! for them.

use std::{collections::BTreeMap, fmt, sync::Arc};
use thiserror::Error as ThisError;

///
/// ProviderError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("{provider} provider failed: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    #[must_use]
    pub fn new(provider: &str, message: impl Into<String>) -> Self {
        Self {
            provider: provider.to_string(),
            message: message.into(),
        }
    }
}

///
/// Hasher
/// One-way password hashing.
///

pub trait Hasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, ProviderError>;

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, ProviderError>;

    /// Algorithm version stamped next to every hash this provider produces.
    fn hash_version(&self) -> u32;
}

///
/// Cipher
/// Two-way password encryption.
///

pub trait Cipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, ProviderError>;

    fn decrypt(&self, ciphertext: &str) -> Result<String, ProviderError>;

    /// Algorithm version stamped next to every ciphertext.
    fn cipher_version(&self) -> u32;
}

///
/// ProviderRegistry
///

#[derive(Clone, Default)]
pub struct ProviderRegistry {
    hashers: BTreeMap<String, Arc<dyn Hasher>>,
    ciphers: BTreeMap<String, Arc<dyn Cipher>>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hasher(mut self, name: &str, hasher: impl Hasher + 'static) -> Self {
        self.register_hasher(name, Arc::new(hasher));
        self
    }

    #[must_use]
    pub fn with_cipher(mut self, name: &str, cipher: impl Cipher + 'static) -> Self {
        self.register_cipher(name, Arc::new(cipher));
        self
    }

    pub fn register_hasher(&mut self, name: &str, hasher: Arc<dyn Hasher>) {
        self.hashers.insert(name.to_string(), hasher);
    }

    pub fn register_cipher(&mut self, name: &str, cipher: Arc<dyn Cipher>) {
        self.ciphers.insert(name.to_string(), cipher);
    }

    #[must_use]
    pub fn hasher(&self, name: &str) -> Option<Arc<dyn Hasher>> {
        self.hashers.get(name).cloned()
    }

    #[must_use]
    pub fn cipher(&self, name: &str) -> Option<Arc<dyn Cipher>> {
        self.ciphers.get(name).cloned()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("hashers", &self.hashers.keys().collect::<Vec<_>>())
            .field("ciphers", &self.ciphers.keys().collect::<Vec<_>>())
            .finish()
    }
}

///
/// Providers
/// Providers injected into one resolved password field. Compared and
/// printed by registered name only.
///

#[derive(Clone, Default)]
pub struct Providers {
    hasher: Option<(String, Arc<dyn Hasher>)>,
    cipher: Option<(String, Arc<dyn Cipher>)>,
}

impl Providers {
    pub(crate) fn new(
        hasher: Option<(String, Arc<dyn Hasher>)>,
        cipher: Option<(String, Arc<dyn Cipher>)>,
    ) -> Self {
        Self { hasher, cipher }
    }

    #[must_use]
    pub fn hasher(&self) -> Option<&dyn Hasher> {
        self.hasher.as_ref().map(|(_, h)| h.as_ref())
    }

    #[must_use]
    pub fn cipher(&self) -> Option<&dyn Cipher> {
        self.cipher.as_ref().map(|(_, c)| c.as_ref())
    }

    #[must_use]
    pub fn hasher_name(&self) -> Option<&str> {
        self.hasher.as_ref().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn cipher_name(&self) -> Option<&str> {
        self.cipher.as_ref().map(|(name, _)| name.as_str())
    }
}

impl PartialEq for Providers {
    fn eq(&self, other: &Self) -> bool {
        self.hasher_name() == other.hasher_name() && self.cipher_name() == other.cipher_name()
    }
}

impl Eq for Providers {}

impl fmt::Debug for Providers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Providers")
            .field("hasher", &self.hasher_name())
            .field("cipher", &self.cipher_name())
            .finish()
    }
}
