//! Confidential envelope: `NONCE (15) || PUBLIC_KEY (32) || CIPHERTEXT`.
//!
//! The authenticated-encryption primitive itself is injected through
//! [`Aead`]; this module only owns the wire layout and key/nonce types.

use rand::RngCore;

use dg_domain::error::{Error, Result};

pub const NONCE_LEN: usize = 15;
pub const KEY_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce(pub [u8; NONCE_LEN]);

impl Nonce {
    /// A fresh random nonce.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(pub [u8; KEY_LEN]);

impl PublicKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        bytes
            .try_into()
            .map(Self)
            .map_err(|_| Error::Format(format!("public key must be {KEY_LEN} bytes, got {}", bytes.len())))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(pub [u8; KEY_LEN]);

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// The key material a confidential caller holds.
#[derive(Debug, Clone)]
pub struct AeadKeys {
    pub peer_public_key: PublicKey,
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

/// Authenticated encryption between two key pairs.
pub trait Aead: Send + Sync {
    fn seal(
        &self,
        nonce: &Nonce,
        plaintext: &[u8],
        associated_data: &[u8],
        peer_public_key: &PublicKey,
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>>;

    fn open(
        &self,
        nonce: &Nonce,
        ciphertext: &[u8],
        associated_data: &[u8],
        peer_public_key: &PublicKey,
        private_key: &PrivateKey,
    ) -> Result<Vec<u8>>;
}

/// An opened envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decryption {
    pub nonce: Nonce,
    pub plaintext: Vec<u8>,
    pub peer_public_key: PublicKey,
}

/// Seal `plaintext` and frame it as `nonce || public_key || ciphertext`.
pub fn encrypt(
    aead: &dyn Aead,
    nonce: &Nonce,
    plaintext: &[u8],
    peer_public_key: &PublicKey,
    public_key: &PublicKey,
    private_key: &PrivateKey,
) -> Result<Vec<u8>> {
    let ciphertext = aead.seal(nonce, plaintext, &[], peer_public_key, private_key)?;
    let mut out = Vec::with_capacity(NONCE_LEN + KEY_LEN + ciphertext.len());
    out.extend_from_slice(&nonce.0);
    out.extend_from_slice(&public_key.0);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Unframe and open an envelope addressed to `private_key`.
pub fn decrypt(aead: &dyn Aead, encryption: &[u8], private_key: &PrivateKey) -> Result<Decryption> {
    let (nonce, peer_public_key, ciphertext) = split_encrypted_payload(encryption)?;
    let plaintext = aead.open(&nonce, ciphertext, &[], &peer_public_key, private_key)?;
    Ok(Decryption {
        nonce,
        plaintext,
        peer_public_key,
    })
}

/// Split an envelope into nonce, sender public key, and ciphertext.
pub fn split_encrypted_payload(encryption: &[u8]) -> Result<(Nonce, PublicKey, &[u8])> {
    if encryption.len() < NONCE_LEN + KEY_LEN {
        return Err(Error::Format(format!(
            "invalid encryption: {} bytes, need at least {}",
            encryption.len(),
            NONCE_LEN + KEY_LEN
        )));
    }
    let (nonce, rest) = encryption.split_at(NONCE_LEN);
    let (public_key, ciphertext) = rest.split_at(KEY_LEN);

    let mut n = [0u8; NONCE_LEN];
    n.copy_from_slice(nonce);
    Ok((Nonce(n), PublicKey::from_slice(public_key)?, ciphertext))
}
