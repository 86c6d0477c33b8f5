//! Signing/verification key material loaded once at process start.
//!
//! The authority holds both halves of an RSA key pair; a process that only
//! verifies can load the public half alone. Key material is immutable after
//! construction.

use jsonwebtoken::{DecodingKey, EncodingKey};

/// RSA key pair for token signing and verification.
///
/// The encoding (private) key is optional: issuance fails with
/// `JwtError::KeyUnavailable` when it is absent, verification always works.
pub struct KeyMaterial {
    encoding: Option<EncodingKey>,
    decoding: DecodingKey,
}

impl KeyMaterial {
    /// Load a full key pair from PEM-encoded RSA keys.
    pub fn from_rsa_pem(private_pem: &[u8], public_pem: &[u8]) -> Result<Self, KeyError> {
        let encoding =
            EncodingKey::from_rsa_pem(private_pem).map_err(KeyError::InvalidPrivateKey)?;
        let decoding = DecodingKey::from_rsa_pem(public_pem).map_err(KeyError::InvalidPublicKey)?;
        Ok(Self {
            encoding: Some(encoding),
            decoding,
        })
    }

    /// Load only the public half. The resulting material can verify tokens
    /// but never sign them.
    pub fn verify_only(public_pem: &[u8]) -> Result<Self, KeyError> {
        let decoding = DecodingKey::from_rsa_pem(public_pem).map_err(KeyError::InvalidPublicKey)?;
        Ok(Self {
            encoding: None,
            decoding,
        })
    }

    /// The signing key, if this process holds one.
    pub fn encoding(&self) -> Option<&EncodingKey> {
        self.encoding.as_ref()
    }

    /// The verification key.
    pub fn decoding(&self) -> &DecodingKey {
        &self.decoding
    }
}

/// Errors when parsing key material.
#[derive(Debug)]
pub enum KeyError {
    /// The private key PEM could not be parsed
    InvalidPrivateKey(jsonwebtoken::errors::Error),
    /// The public key PEM could not be parsed
    InvalidPublicKey(jsonwebtoken::errors::Error),
}

impl std::fmt::Display for KeyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyError::InvalidPrivateKey(e) => write!(f, "Invalid private key: {}", e),
            KeyError::InvalidPublicKey(e) => write!(f, "Invalid public key: {}", e),
        }
    }
}

impl std::error::Error for KeyError {}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &str = include_str!("../tests/keys/test_private.pem");
    const PUBLIC_PEM: &str = include_str!("../tests/keys/test_public.pem");

    #[test]
    fn test_load_key_pair() {
        let keys = KeyMaterial::from_rsa_pem(PRIVATE_PEM.as_bytes(), PUBLIC_PEM.as_bytes())
            .expect("valid test keys");
        assert!(keys.encoding().is_some());
    }

    #[test]
    fn test_verify_only_has_no_signing_key() {
        let keys = KeyMaterial::verify_only(PUBLIC_PEM.as_bytes()).expect("valid public key");
        assert!(keys.encoding().is_none());
    }

    #[test]
    fn test_garbage_pem_rejected() {
        assert!(KeyMaterial::from_rsa_pem(b"not a key", PUBLIC_PEM.as_bytes()).is_err());
        assert!(KeyMaterial::verify_only(b"not a key").is_err());
    }
}
