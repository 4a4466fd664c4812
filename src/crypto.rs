//! Cryptographic primitives for ForgeChain

use crate::blockchain::Sha256Hash;
use crate::error::ChainError;
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{PUBLIC_KEY_SIZE, SECRET_KEY_SIZE},
    ecdsa::{RecoverableSignature, RecoveryId},
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Length of a serialized recoverable signature: 64 compact bytes plus the recovery id.
pub const SIGNATURE_SIZE: usize = 65;

/// Type alias for the derived address, which is a 32-byte hash.
pub type Address = [u8; 32];

/// The all-zero address used as the sender of protocol-issued reward transactions.
pub const ZERO_ADDRESS: Address = [0u8; 32];

/// SHA-256 of arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> Sha256Hash {
    Sha256::digest(data).into()
}

/// Convenience function to create an address from a string (hashes the string).
/// Useful for testing and debugging.
pub fn address_from_string(s: &str) -> Address {
    hash_bytes(s.as_bytes())
}

/// Convert an address to a hex string for display.
pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

/// Convert a hex string to an address.
pub fn address_from_hex(hex_str: &str) -> Result<Address, ChainError> {
    let bytes = hex::decode(hex_str)
        .map_err(|e| ChainError::CryptoError(format!("Invalid hex address: {}", e)))?;
    if bytes.len() != 32 {
        return Err(ChainError::CryptoError(format!(
            "Address must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    bytes
        .try_into()
        .map_err(|_| ChainError::CryptoError("Failed to convert bytes into address".to_string()))
}

/// Derives the address of a public key (SHA-256 of the compressed key).
pub fn address_of(public_key: &PublicKey) -> Address {
    let pubkey_bytes: [u8; PUBLIC_KEY_SIZE] = public_key.serialize();
    hash_bytes(&pubkey_bytes)
}

/// Recoverable ECDSA signature over a 32-byte digest.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Signature(Vec<u8>);

impl Signature {
    /// Signature attached to protocol-issued transactions. It never verifies.
    pub fn placeholder() -> Self {
        Signature(vec![0u8; SIGNATURE_SIZE])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Recovers the signer's address from this signature and the signed digest.
    pub fn recover_address(&self, digest: &Sha256Hash) -> Result<Address, ChainError> {
        if self.0.len() != SIGNATURE_SIZE {
            return Err(ChainError::CryptoError(format!(
                "Signature must be exactly {} bytes, got {}",
                SIGNATURE_SIZE,
                self.0.len()
            )));
        }

        let recovery_id = RecoveryId::from_i32(self.0[64] as i32)
            .map_err(|e| ChainError::CryptoError(format!("Invalid recovery id: {}", e)))?;
        let signature = RecoverableSignature::from_compact(&self.0[..64], recovery_id)
            .map_err(|e| ChainError::CryptoError(format!("Invalid signature: {}", e)))?;

        let message = Message::from_digest(*digest);
        let public_key = SECP256K1_CONTEXT
            .recover_ecdsa(&message, &signature)
            .map_err(|e| ChainError::CryptoError(format!("Public key recovery failed: {}", e)))?;

        Ok(address_of(&public_key))
    }

    /// Checks that this signature over `digest` was produced by the owner of `address`.
    pub fn verify(&self, address: &Address, digest: &Sha256Hash) -> Result<(), ChainError> {
        let signer = self.recover_address(digest)?;
        if &signer != address {
            return Err(ChainError::CryptoError(
                "Signature verification failed".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Result<Self, ChainError> {
        let secret_key = SecretKey::new(&mut OsRng);
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);

        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Creates a KeyPair from raw secret key bytes.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, ChainError> {
        let secret_key = SecretKey::from_slice(bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::CryptoError(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::CryptoError(format!("Invalid secret key bytes: {}", e))
            }
        })?;

        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        Ok(KeyPair {
            secret_key,
            public_key,
        })
    }

    /// Computes the account address (SHA-256 hash of the compressed public key).
    pub fn address(&self) -> Address {
        address_of(&self.public_key)
    }

    /// Signs a 32-byte digest directly, without rehashing it.
    pub fn sign_digest(&self, digest: &Sha256Hash) -> Signature {
        let message = Message::from_digest(*digest);
        let signature = SECP256K1_CONTEXT.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut bytes = Vec::with_capacity(SIGNATURE_SIZE);
        bytes.extend_from_slice(&compact);
        bytes.push(recovery_id.to_i32() as u8);
        Signature(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_generation() {
        let keypair = KeyPair::generate().unwrap();
        let address_bytes = keypair.address();
        assert_eq!(address_bytes.len(), 32);
        assert_eq!(hex::encode(address_bytes).len(), 64);
    }

    #[test]
    fn test_signing_and_recovery() {
        let keypair = KeyPair::generate().unwrap();
        let digest = hash_bytes(b"Hello, ForgeChain!");

        let signature = keypair.sign_digest(&digest);
        assert_eq!(signature.as_bytes().len(), SIGNATURE_SIZE);
        assert_eq!(signature.recover_address(&digest).unwrap(), keypair.address());
        assert!(signature.verify(&keypair.address(), &digest).is_ok());
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let keypair1 = KeyPair::generate().unwrap();
        let keypair2 = KeyPair::generate().unwrap();
        let digest = hash_bytes(b"Test message");

        let signature = keypair1.sign_digest(&digest);
        let result = signature.verify(&keypair2.address(), &digest);
        assert_eq!(
            result.unwrap_err().to_string(),
            "Cryptographic error: Signature verification failed"
        );
    }

    #[test]
    fn test_tampered_digest() {
        let keypair = KeyPair::generate().unwrap();
        let digest = hash_bytes(b"Original message");
        let tampered = hash_bytes(b"Tampered message");

        let signature = keypair.sign_digest(&digest);
        assert!(signature.verify(&keypair.address(), &tampered).is_err());
    }

    #[test]
    fn test_placeholder_never_verifies() {
        let keypair = KeyPair::generate().unwrap();
        let digest = hash_bytes(b"reward");
        assert!(Signature::placeholder()
            .verify(&keypair.address(), &digest)
            .is_err());
    }

    #[test]
    fn test_address_hex_roundtrip_and_length_check() {
        let address = address_from_string("alice");
        assert_eq!(address_from_hex(&address_to_hex(&address)).unwrap(), address);

        let result = address_from_hex("abcd");
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Address must be 32 bytes"));
    }

    #[test]
    fn test_from_secret_bytes_invalid_length() {
        let short_bytes = [0u8; SECRET_KEY_SIZE - 1];
        let result = KeyPair::from_secret_bytes(&short_bytes);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Secret key must be"));
    }
}
