use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use rand_core::RngCore;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("seal failed")]
    Seal,
    #[error("open failed")]
    Open,
    #[error("key must be 32 bytes of base64")]
    InvalidKey,
}

/// Encrypts transcripts before they touch the database. Output is
/// base64(nonce || ciphertext); a fresh nonce per call.
#[derive(Clone)]
pub struct TranscriptCipher {
    cipher: Aes256Gcm,
}

impl TranscriptCipher {
    pub fn from_env() -> Result<Self, CryptoError> {
        let key_b64 = std::env::var("APP_ENC_KEY").map_err(|_| CryptoError::InvalidKey)?;
        let key = general_purpose::STANDARD
            .decode(key_b64)
            .map_err(|_| CryptoError::InvalidKey)?;
        Self::from_key(&key)
    }

    pub fn from_key(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { cipher })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Seal)?;
        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(combined))
    }

    pub fn open(&self, sealed: &str) -> Result<String, CryptoError> {
        let data = general_purpose::STANDARD
            .decode(sealed)
            .map_err(|_| CryptoError::Open)?;
        if data.len() <= NONCE_LEN {
            return Err(CryptoError::Open);
        }
        let (nonce_bytes, ciphertext) = data.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::Open)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let cipher = TranscriptCipher::from_key(&[7u8; 32]).unwrap();
        let sealed = cipher.seal("agent: how are you?").unwrap();
        assert_ne!(sealed, "agent: how are you?");
        assert_eq!(cipher.open(&sealed).unwrap(), "agent: how are you?");
    }

    #[test]
    fn wrong_key_cannot_open() {
        let a = TranscriptCipher::from_key(&[1u8; 32]).unwrap();
        let b = TranscriptCipher::from_key(&[2u8; 32]).unwrap();
        let sealed = a.seal("private").unwrap();
        assert!(matches!(b.open(&sealed), Err(CryptoError::Open)));
    }

    #[test]
    fn short_keys_are_rejected() {
        assert!(matches!(
            TranscriptCipher::from_key(&[0u8; 16]),
            Err(CryptoError::InvalidKey)
        ));
    }
}
