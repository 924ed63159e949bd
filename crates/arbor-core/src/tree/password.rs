use arbor_schema::provider::{Cipher, Hasher, ProviderError};

///
/// Password1way
///
/// Plaintext and its one-way hash travel separately; either may be absent.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Password1way {
    pub unhashed: Option<String>,
    pub hashed: Option<String>,
    pub hash_version: Option<u32>,
}

impl Password1way {
    #[must_use]
    pub fn plaintext(text: &str) -> Self {
        Self {
            unhashed: Some(text.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn hashed(hash: &str, version: u32) -> Self {
        Self {
            hashed: Some(hash.to_string()),
            hash_version: Some(version),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.unhashed.is_none() && self.hashed.is_none()
    }

    /// Hash the plaintext, keeping it alongside the hash.
    pub fn hash_with(&mut self, hasher: &dyn Hasher) -> Result<(), ProviderError> {
        if let Some(plaintext) = &self.unhashed {
            self.hashed = Some(hasher.hash(plaintext)?);
            self.hash_version = Some(hasher.hash_version());
        }

        Ok(())
    }

    /// Check a candidate against the stored hash. A value with no hash never
    /// verifies.
    pub fn verify_with(&self, hasher: &dyn Hasher, candidate: &str) -> Result<bool, ProviderError> {
        match &self.hashed {
            Some(hashed) => hasher.verify(candidate, hashed),
            None => Ok(false),
        }
    }

    /// Hash and drop the plaintext.
    pub fn seal(&mut self, hasher: &dyn Hasher) -> Result<(), ProviderError> {
        self.hash_with(hasher)?;
        self.unhashed = None;

        Ok(())
    }
}

///
/// Password2way
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Password2way {
    pub unencrypted: Option<String>,
    pub encrypted: Option<String>,
    pub cipher_version: Option<u32>,
}

impl Password2way {
    #[must_use]
    pub fn plaintext(text: &str) -> Self {
        Self {
            unencrypted: Some(text.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn encrypted(ciphertext: &str, version: u32) -> Self {
        Self {
            encrypted: Some(ciphertext.to_string()),
            cipher_version: Some(version),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.unencrypted.is_none() && self.encrypted.is_none()
    }

    pub fn encrypt_with(&mut self, cipher: &dyn Cipher) -> Result<(), ProviderError> {
        if let Some(plaintext) = &self.unencrypted {
            self.encrypted = Some(cipher.encrypt(plaintext)?);
            self.cipher_version = Some(cipher.cipher_version());
        }

        Ok(())
    }

    /// Recover the plaintext, decrypting when only the ciphertext is held.
    pub fn decrypt_with(&self, cipher: &dyn Cipher) -> Result<Option<String>, ProviderError> {
        if let Some(plaintext) = &self.unencrypted {
            return Ok(Some(plaintext.clone()));
        }
        self.encrypted
            .as_deref()
            .map(|ciphertext| cipher.decrypt(ciphertext))
            .transpose()
    }

    pub fn seal(&mut self, cipher: &dyn Cipher) -> Result<(), ProviderError> {
        self.encrypt_with(cipher)?;
        self.unencrypted = None;

        Ok(())
    }
}
