// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Authenticated encryption of bucket slots.

use crate::OramError;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroizing;

/// The size in bytes of an XChaCha20-Poly1305 nonce.
pub const NONCE_SIZE: usize = 24;
/// The size in bytes of a Poly1305 authentication tag.
pub const TAG_SIZE: usize = 16;
/// The size in bytes of an XChaCha20-Poly1305 key.
pub const KEY_SIZE: usize = 32;

/// An authenticated cipher used to seal every slot written to the untrusted store.
///
/// Ciphertext length must depend only on plaintext length,
/// and every call to `encrypt` must use a fresh nonce drawn from `rng`
/// so that re-encrypting the same plaintext never yields the same ciphertext.
pub trait SlotCipher {
    /// The length of the ciphertext produced for a plaintext of `plaintext_len` bytes.
    fn ciphertext_len(&self, plaintext_len: usize) -> usize;

    /// Encrypts `plaintext`, authenticating `associated_data` alongside it.
    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError>;

    /// Decrypts `ciphertext`, failing with `EncryptionError` if it or `associated_data` was modified.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, OramError>;
}

/// XChaCha20-Poly1305 with a random 192-bit nonce prepended to each ciphertext.
pub struct XChaCha20Poly1305Cipher {
    cipher: XChaCha20Poly1305,
}

impl XChaCha20Poly1305Cipher {
    /// Instantiates the cipher from a 256-bit key.
    pub fn new(key: &[u8; KEY_SIZE]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Instantiates the cipher with a fresh key drawn from `rng`.
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut key = Zeroizing::new([0u8; KEY_SIZE]);
        rng.fill_bytes(&mut key[..]);
        Self::new(&key)
    }
}

impl std::fmt::Debug for XChaCha20Poly1305Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XChaCha20Poly1305Cipher").finish_non_exhaustive()
    }
}

impl SlotCipher for XChaCha20Poly1305Cipher {
    fn ciphertext_len(&self, plaintext_len: usize) -> usize {
        NONCE_SIZE + plaintext_len + TAG_SIZE
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, OramError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut nonce);

        let sealed = self
            .cipher
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|_| OramError::EncryptionError)?;

        let mut result = Vec::with_capacity(NONCE_SIZE + sealed.len());
        result.extend_from_slice(&nonce);
        result.extend_from_slice(&sealed);
        Ok(result)
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, OramError> {
        if ciphertext.len() < NONCE_SIZE + TAG_SIZE {
            return Err(OramError::EncryptionError);
        }
        let (nonce, sealed) = ciphertext.split_at(NONCE_SIZE);

        let plaintext = self
            .cipher
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: sealed,
                    aad: associated_data,
                },
            )
            .map_err(|_| OramError::EncryptionError)?;

        Ok(Zeroizing::new(plaintext))
    }
}
