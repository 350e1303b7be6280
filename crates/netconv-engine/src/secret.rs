//! Password protection for the duration of a run.
//!
//! Plaintext passwords are checked by the validator and sealed straight
//! away. The user reconciler unseals them only to build a request body. The
//! session key lives in memory for one run and is never written anywhere.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use netconv_core::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Nonce size for AES-GCM (96 bits / 12 bytes).
const NONCE_SIZE: usize = 12;

/// Ciphertext produced by a [`SecretManager`].
#[derive(Clone, PartialEq, Eq)]
pub struct Sealed(Vec<u8>);

impl Sealed {
    /// Raw `nonce || ciphertext` bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Sealed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sealed([REDACTED; {} bytes])", self.0.len())
    }
}

/// Symmetric protection for secrets held during a run.
pub trait SecretManager: Send + Sync {
    /// Seal a plaintext secret.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if encryption fails.
    fn encrypt(&self, plaintext: &SecretString) -> Result<Sealed>;

    /// Recover the plaintext.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Crypto`] if the ciphertext was not produced by this
    /// manager or has been altered.
    fn decrypt(&self, sealed: &Sealed) -> Result<SecretString>;
}

/// AES-256-GCM with a key generated when the cipher is created.
pub struct SessionCipher {
    cipher: Aes256Gcm,
}

impl SessionCipher {
    /// Generate a fresh session key.
    #[must_use]
    pub fn new() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        Self {
            cipher: Aes256Gcm::new(&key),
        }
    }
}

impl Default for SessionCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionCipher([REDACTED])")
    }
}

impl SecretManager for SessionCipher {
    fn encrypt(&self, plaintext: &SecretString) -> Result<Sealed> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.expose_secret().as_bytes())
            .map_err(|e| Error::Crypto(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(Sealed(sealed))
    }

    fn decrypt(&self, sealed: &Sealed) -> Result<SecretString> {
        if sealed.0.len() <= NONCE_SIZE {
            return Err(Error::Crypto("sealed secret is truncated".to_string()));
        }
        let (nonce, ciphertext) = sealed.0.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| Error::Crypto(format!("decryption failed: {e}")))?;

        String::from_utf8(plaintext)
            .map(SecretString::from)
            .map_err(|e| Error::Crypto(format!("sealed secret is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open() {
        let cipher = SessionCipher::new();
        let sealed = cipher.encrypt(&SecretString::from("Str0ng!Pass")).unwrap();
        assert_eq!(cipher.decrypt(&sealed).unwrap().expose_secret(), "Str0ng!Pass");
    }

    #[test]
    fn nonces_differ_per_call() {
        let cipher = SessionCipher::new();
        let secret = SecretString::from("same");
        assert_ne!(cipher.encrypt(&secret).unwrap(), cipher.encrypt(&secret).unwrap());
    }

    #[test]
    fn other_session_cannot_open() {
        let sealed = SessionCipher::new()
            .encrypt(&SecretString::from("secret"))
            .unwrap();
        assert!(matches!(
            SessionCipher::new().decrypt(&sealed),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn tampering_is_detected() {
        let cipher = SessionCipher::new();
        let mut sealed = cipher.encrypt(&SecretString::from("secret")).unwrap();
        let last = sealed.0.len() - 1;
        sealed.0[last] ^= 0x01;
        assert!(cipher.decrypt(&sealed).is_err());
        assert!(cipher.decrypt(&Sealed(vec![0; 4])).is_err());
    }

    #[test]
    fn debug_redacts() {
        let sealed = SessionCipher::new()
            .encrypt(&SecretString::from("secret"))
            .unwrap();
        assert!(format!("{sealed:?}").contains("REDACTED"));
    }
}
