//! RSA padding schemes over SHA-256
//!
//! - OAEP with MGF1-SHA256 and an empty label, for encryption
//! - EMSA-PKCS1-v1_5 with the SHA-256 DigestInfo prefix, for signatures

use crate::error::{CryptoError, Result};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// SHA-256 output length in bytes
pub const HASH_LEN: usize = 32;

/// Bytes OAEP adds to every block: two hashes and two framing bytes.
pub const OAEP_OVERHEAD: usize = 2 * HASH_LEN + 2;

/// DER prefix of a SHA-256 DigestInfo
const SHA256_DIGEST_INFO: [u8; 19] = [
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// MGF1 mask generation: SHA-256 over `seed || counter` until `len` bytes.
pub fn mgf1(seed: &[u8], len: usize) -> Vec<u8> {
    let mut mask = Vec::with_capacity(len + HASH_LEN);
    let mut counter: u32 = 0;
    while mask.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(seed);
        hasher.update(counter.to_be_bytes());
        mask.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    mask.truncate(len);
    mask
}

fn xor_in_place(target: &mut [u8], mask: &[u8]) {
    for (t, m) in target.iter_mut().zip(mask) {
        *t ^= m;
    }
}

/// OAEP-encodes `message` into a `k`-byte block with a fresh random seed
///
/// # Errors
/// `MessageTooLarge` if `message` exceeds `k - 66` bytes.
pub fn oaep_encode(message: &[u8], k: usize) -> Result<Vec<u8>> {
    let mut seed = [0u8; HASH_LEN];
    rand::rng().fill_bytes(&mut seed);
    oaep_encode_with_seed(message, k, &seed)
}

fn oaep_encode_with_seed(message: &[u8], k: usize, seed: &[u8; HASH_LEN]) -> Result<Vec<u8>> {
    let capacity = k.saturating_sub(OAEP_OVERHEAD);
    if message.len() > capacity || k < OAEP_OVERHEAD {
        return Err(CryptoError::MessageTooLarge {
            len: message.len(),
            capacity,
        });
    }

    // DB = lHash || PS || 0x01 || M
    let db_len = k - HASH_LEN - 1;
    let mut db = Vec::with_capacity(db_len);
    db.extend_from_slice(&Sha256::digest(b""));
    db.resize(db_len - message.len() - 1, 0);
    db.push(0x01);
    db.extend_from_slice(message);

    xor_in_place(&mut db, &mgf1(seed, db_len));
    let mut masked_seed = *seed;
    xor_in_place(&mut masked_seed, &mgf1(&db, HASH_LEN));

    let mut em = Vec::with_capacity(k);
    em.push(0x00);
    em.extend_from_slice(&masked_seed);
    em.extend_from_slice(&db);
    Ok(em)
}

/// Reverses [`oaep_encode`] on a `k`-byte block
///
/// # Errors
/// `DecryptionFailure` on any structural mismatch. Every failure reports the
/// same message so the cause is not revealed.
pub fn oaep_decode(em: &[u8], k: usize) -> Result<Vec<u8>> {
    let failure = || CryptoError::DecryptionFailure("OAEP decoding error".into());
    if em.len() != k || k < OAEP_OVERHEAD {
        return Err(failure());
    }

    let (y, rest) = em.split_at(1);
    let (masked_seed, masked_db) = rest.split_at(HASH_LEN);

    let mut seed = masked_seed.to_vec();
    xor_in_place(&mut seed, &mgf1(masked_db, HASH_LEN));
    let mut db = masked_db.to_vec();
    xor_in_place(&mut db, &mgf1(&seed, masked_db.len()));

    let (l_hash, tail) = db.split_at(HASH_LEN);
    let separator = tail.iter().position(|&b| b != 0).ok_or_else(failure)?;

    let valid = y[0] == 0 && l_hash == Sha256::digest(b"").as_slice() && tail[separator] == 0x01;
    if !valid {
        return Err(failure());
    }

    Ok(tail[separator + 1..].to_vec())
}

/// EMSA-PKCS1-v1_5 encoding of SHA-256(`message`) into `k` bytes
///
/// # Errors
/// `MessageTooLarge` if `k` cannot hold the DigestInfo plus 11 framing bytes.
pub fn pkcs1_v15_encode(message: &[u8], k: usize) -> Result<Vec<u8>> {
    let t_len = SHA256_DIGEST_INFO.len() + HASH_LEN;
    if k < t_len + 11 {
        return Err(CryptoError::MessageTooLarge {
            len: t_len + 11,
            capacity: k,
        });
    }

    let mut em = Vec::with_capacity(k);
    em.extend_from_slice(&[0x00, 0x01]);
    em.resize(k - t_len - 1, 0xff);
    em.push(0x00);
    em.extend_from_slice(&SHA256_DIGEST_INFO);
    em.extend_from_slice(&Sha256::digest(message));
    Ok(em)
}
