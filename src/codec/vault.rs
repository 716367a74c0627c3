use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};

use super::Codec;
use crate::{Error, Result, Value};

const NONCE_LEN: usize = 12;

/// Encrypts values at rest with AES-256-GCM.
///
/// Stored values are the 12-byte nonce followed by the ciphertext. The overlay
/// only ever holds plaintext.
pub struct VaultCodec {
    cipher: Aes256Gcm,
}

impl VaultCodec {
    /// Builds a codec from a 32-byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != 32 {
            return Err(Error::Codec("Key must be 32 bytes".to_string()));
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Codec(e.to_string()))?;
        Ok(Self { cipher })
    }
}

impl Codec for VaultCodec {
    fn compress(&self, value: &[u8]) -> Result<Value> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self.cipher.encrypt(&nonce, value).map_err(|e| Error::Codec(e.to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(combined)
    }

    fn decompress(&self, stored: &[u8]) -> Result<Value> {
        if stored.len() < NONCE_LEN {
            return Err(Error::Codec("Ciphertext too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = stored.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| Error::Codec("decryption failed (wrong key or tampered data)".to_string()))
    }
}
