//! Device-login key agreement using P-256 ECDH + AES-256-GCM.
//!
//! The CLI login flow works like this:
//! - The client generates an ephemeral P-256 keypair and sends the
//!   uncompressed public key (`04 || X || Y`, 130 hex chars) in the
//!   authorization URL.
//! - Once the user approves, the platform answers the poll with its own
//!   ephemeral public key, a 12-byte nonce and the bearer token encrypted
//!   under AES-256-GCM (16-byte tag appended to the ciphertext).
//! - The client computes ECDH with its saved private key and uses the raw
//!   32-byte x-coordinate of the shared point as the AES key.
//!
//! Wire parameters (must match the platform):
//! - Curve: NIST P-256
//! - KDF: none, the shared secret is the key
//! - Cipher: AES-256-GCM, 96-bit nonce, 128-bit tag
//!
//! Using raw ECDH output as a symmetric key skips the usual KDF step. The
//! platform defines this format so it cannot be changed client-side; the
//! keypair is single-use and discarded after one exchange.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use p256::{
    ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey,
};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::{CoreError, CoreResult};

/// Nonce size for AES-256-GCM (12 bytes / 96 bits).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size appended to the ciphertext.
pub const TAG_SIZE: usize = 16;

/// Uncompressed SEC1 point size (`04 || X || Y`).
pub const PUBLIC_KEY_SIZE: usize = 65;

/// Private scalar size.
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Ephemeral P-256 keypair for a single device-login exchange.
///
/// The secret scalar zeroizes on drop and never appears in `Debug` output.
pub struct EphemeralKeyPair {
    secret: SecretKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh keypair from the OS random source.
    pub fn generate() -> Self {
        Self {
            secret: SecretKey::random(&mut OsRng),
        }
    }

    /// Restore a keypair from its hex-encoded 32-byte scalar.
    pub fn from_private_key_hex(private_key_hex: &str) -> CoreResult<Self> {
        let bytes = Zeroizing::new(
            hex::decode(private_key_hex.trim())
                .map_err(|_| CoreError::Crypto("private key is not valid hex".to_string()))?,
        );
        if bytes.len() != PRIVATE_KEY_SIZE {
            return Err(CoreError::Crypto(format!(
                "private key must be {PRIVATE_KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let secret = SecretKey::from_slice(&bytes)
            .map_err(|_| CoreError::Crypto("private key is not a valid P-256 scalar".to_string()))?;
        Ok(Self { secret })
    }

    /// Hex-encoded private scalar, for the pending-session file only.
    pub fn private_key_hex(&self) -> Zeroizing<String> {
        let bytes = self.secret.to_bytes();
        Zeroizing::new(hex::encode(bytes.as_slice()))
    }

    /// Uncompressed public key bytes (65 bytes, leading `0x04`).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.secret
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec()
    }

    /// Uncompressed public key as 130 lowercase hex chars.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    /// Raw ECDH shared secret (x-coordinate) with a peer's SEC1 public key.
    fn shared_secret(&self, peer_public_key: &[u8]) -> CoreResult<Zeroizing<[u8; 32]>> {
        let peer = PublicKey::from_sec1_bytes(peer_public_key)
            .map_err(|_| CoreError::Crypto("public key is not a valid P-256 point".to_string()))?;
        let shared = diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes().as_slice());
        Ok(out)
    }
}

impl fmt::Debug for EphemeralKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EphemeralKeyPair")
            .field("public_key", &self.public_key_hex())
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Decrypt the bearer token delivered by the device-login poll.
///
/// # Arguments
/// * `keypair` - The ephemeral keypair saved at session start
/// * `server_public_key_hex` - The platform's ephemeral SEC1 public key
/// * `nonce_hex` - 12-byte nonce
/// * `ciphertext_hex` - ciphertext || tag(16)
///
/// # Returns
/// The UTF-8 token on success. Every failure (bad hex, bad point, wrong
/// nonce length, tag mismatch, non-UTF-8 plaintext) is a `CoreError::Crypto`.
pub fn decrypt_device_token(
    keypair: &EphemeralKeyPair,
    server_public_key_hex: &str,
    nonce_hex: &str,
    ciphertext_hex: &str,
) -> CoreResult<String> {
    let server_public_key = decode_field("public_key", server_public_key_hex)?;
    let nonce = decode_field("nonce", nonce_hex)?;
    let ciphertext = decode_field("access_token", ciphertext_hex)?;

    if nonce.len() != NONCE_SIZE {
        return Err(CoreError::Crypto(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    if ciphertext.len() < TAG_SIZE {
        return Err(CoreError::Crypto(
            "ciphertext shorter than the authentication tag".to_string(),
        ));
    }

    let shared = keypair.shared_secret(&server_public_key)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared.as_slice()));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| CoreError::Crypto("token decryption failed".to_string()))?,
    );

    String::from_utf8(plaintext.to_vec())
        .map_err(|_| CoreError::Crypto("decrypted token is not valid UTF-8".to_string()))
}

fn decode_field(name: &str, value: &str) -> CoreResult<Vec<u8>> {
    hex::decode(value.trim()).map_err(|_| CoreError::Crypto(format!("{name} is not valid hex")))
}

/// Encrypt a token the way the platform does when it answers the poll.
///
/// Only the server side of the flow needs this; the setup tool uses it to
/// drive mock platforms in tests.
pub fn seal_device_token(
    server: &EphemeralKeyPair,
    client_public_key_hex: &str,
    nonce: &[u8; NONCE_SIZE],
    plaintext: &str,
) -> CoreResult<String> {
    let client_public_key = decode_field("public_key", client_public_key_hex)?;
    let shared = server.shared_secret(&client_public_key)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(shared.as_slice()));
    let sealed = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext.as_bytes())
        .map_err(|_| CoreError::Crypto("token encryption failed".to_string()))?;
    Ok(hex::encode(sealed))
}
