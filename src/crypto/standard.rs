//! The Standard Security Handler: password validation and file/object key
//! derivation for revisions 2-6 (`spec.md` §4.5). `SecurityHandler::new`
//! always attempts the empty password first (the common case for
//! `Document::open`); `SecurityHandler::try_password` re-attempts with a
//! caller-supplied password, tried as the user password then, on failure,
//! reversed as the owner password (Algorithm 7) — matching `spec.md` §4.5's
//! "two attempts: owner then user".

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256, Sha384, Sha512};

use super::rc4;
use crate::object::ObjRef;

const PAD: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08, 0x2E, 0x2E, 0x00,
    0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("password does not match the owner or user password hash")]
    WrongPassword,
    #[error("ciphertext is not a whole number of AES blocks, or padding is invalid")]
    BadCiphertext,
}

/// Parameters of the `/Encrypt` dictionary needed to re-attempt key
/// derivation against a different password after construction.
#[derive(Debug, Clone)]
struct EncryptParams {
    o: Vec<u8>,
    u: Vec<u8>,
    p: i32,
    id0: Vec<u8>,
    oe: Option<Vec<u8>>,
    ue: Option<Vec<u8>>,
}

/// Everything derived from the `/Encrypt` dictionary plus the first `/ID`
/// element that's needed to decrypt the document's objects.
#[derive(Debug, Clone)]
pub struct SecurityHandler {
    pub revision: u8,
    pub file_key: Vec<u8>,
    pub key_len_bytes: usize,
    pub encrypt_metadata: bool,
    /// Whether `file_key` has actually been validated against `/U`/`/O` (or,
    /// for R5/R6, successfully unwrapped) — `false` means the document is
    /// still locked and object decryption must report `AuthError`
    /// (`spec.md` §4.5 "Failure").
    pub authenticated: bool,
    params: EncryptParams,
}

impl SecurityHandler {
    /// Builds the handler and makes an initial attempt with the empty
    /// password (the common case — most encrypted PDFs use an empty user
    /// password), per Algorithm 2 (R2-R4) or Algorithm 2.A (R5-R6). This
    /// never fails: an unauthenticated handler is still returned so
    /// `Document::open` can succeed and let the caller retry via
    /// `Document::decrypt` (`spec.md` §6 `Document.Decrypt`).
    pub fn new(
        revision: u8,
        o: &[u8],
        u: &[u8],
        p: i32,
        id0: &[u8],
        key_len_bits: u32,
        encrypt_metadata: bool,
        oe: Option<&[u8]>,
        ue: Option<&[u8]>,
    ) -> Self {
        let key_len_bytes = if revision >= 5 { 32 } else { (key_len_bits / 8).max(5) as usize };
        let mut handler = Self {
            revision,
            file_key: Vec::new(),
            key_len_bytes,
            encrypt_metadata,
            authenticated: false,
            params: EncryptParams {
                o: o.to_vec(),
                u: u.to_vec(),
                p,
                id0: id0.to_vec(),
                oe: oe.map(|b| b.to_vec()),
                ue: ue.map(|b| b.to_vec()),
            },
        };
        handler.try_password(&[]);
        handler
    }

    /// Attempts to authenticate with `password`, first as the user password
    /// then, on failure, reversed through Algorithm 7 as the owner password
    /// (`spec.md` §4.5 "two attempts: owner then user"). Updates `file_key`
    /// and `authenticated` on success and returns whether it succeeded;
    /// leaves the handler locked (and returns `false`) otherwise.
    pub fn try_password(&mut self, password: &[u8]) -> bool {
        if self.revision >= 5 {
            let ue = self.params.ue.clone().unwrap_or_default();
            let oe = self.params.oe.clone().unwrap_or_default();
            if let Ok(file_key) = derive_key_r6(password, &self.params.u, &ue, &self.params.o, &oe) {
                self.file_key = file_key;
                self.authenticated = true;
                return true;
            }
            return false;
        }

        let as_user = derive_key_legacy(password, &self.params.o, self.params.p, &self.params.id0, self.revision, self.key_len_bytes, self.encrypt_metadata);
        if verify_user_key(&as_user, &self.params.u, &self.params.id0, self.revision) {
            self.file_key = as_user;
            self.authenticated = true;
            return true;
        }

        let recovered_user_password = recover_user_password(password, &self.params.o, self.revision, self.key_len_bytes);
        let as_owner = derive_key_legacy(&recovered_user_password, &self.params.o, self.params.p, &self.params.id0, self.revision, self.key_len_bytes, self.encrypt_metadata);
        if verify_user_key(&as_owner, &self.params.u, &self.params.id0, self.revision) {
            self.file_key = as_owner;
            self.authenticated = true;
            return true;
        }

        false
    }

    /// Algorithm 1: per-object key = truncated MD5 of file key + low 3
    /// bytes of object number + low 2 bytes of generation (+ "sAlT" for
    /// AES). Revisions 5/6 use the file key directly (`spec.md` §4.5).
    pub fn object_key(&self, obj: ObjRef, aes: bool) -> Vec<u8> {
        if self.revision >= 5 {
            return self.file_key.clone();
        }
        let mut hasher = Md5::new();
        hasher.update(&self.file_key);
        hasher.update(&obj.num.to_le_bytes()[..3]);
        hasher.update(&obj.gen.to_le_bytes()[..2]);
        if aes {
            hasher.update(b"sAlT");
        }
        let digest = hasher.finalize();
        let n = (self.key_len_bytes + 5).min(16);
        digest[..n].to_vec()
    }
}

/// Algorithm 4 (R2) / Algorithm 5 (R≥3): recomputes `/U` from a candidate
/// file key and the first `/ID` entry, comparing against the stored value
/// (only the first 16 bytes are defined for R≥3 — the rest is padding).
fn verify_user_key(file_key: &[u8], u: &[u8], id0: &[u8], revision: u8) -> bool {
    if revision == 2 {
        u.len() >= 32 && rc4::rc4(file_key, &PAD) == u[..32]
    } else {
        if u.len() < 16 {
            return false;
        }
        let mut hasher = Md5::new();
        hasher.update(PAD);
        hasher.update(id0);
        let h = hasher.finalize();
        let mut val = rc4::rc4(file_key, &h);
        for i in 1u8..=19 {
            let key_i: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
            val = rc4::rc4(&key_i, &val);
        }
        val[..16] == u[..16]
    }
}

/// Algorithm 7: recovers the (padded) user password from a candidate owner
/// password and `/O`, so it can be fed back through Algorithm 2 as if it
/// were the user password.
fn recover_user_password(owner_password: &[u8], o: &[u8], revision: u8, key_len_bytes: usize) -> Vec<u8> {
    let mut digest = Md5::digest(padded_password(owner_password)).to_vec();
    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_len_bytes]).to_vec();
        }
    }
    let key = &digest[..key_len_bytes];

    let mut data = o.to_vec();
    if revision == 2 {
        data = rc4::rc4(key, &data);
    } else {
        for i in (0..20u8).rev() {
            let key_i: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            data = rc4::rc4(&key_i, &data);
        }
    }
    data
}

fn derive_key_legacy(password: &[u8], o: &[u8], p: i32, id0: &[u8], revision: u8, key_len_bytes: usize, encrypt_metadata: bool) -> Vec<u8> {
    let mut hasher = Md5::new();
    hasher.update(padded_password(password));
    hasher.update(o);
    hasher.update(p.to_le_bytes());
    hasher.update(id0);
    if revision >= 4 && !encrypt_metadata {
        hasher.update([0xFF, 0xFF, 0xFF, 0xFF]);
    }
    let mut digest = hasher.finalize().to_vec();

    if revision >= 3 {
        for _ in 0..50 {
            digest = Md5::digest(&digest[..key_len_bytes]).to_vec();
        }
    }
    digest.truncate(key_len_bytes);
    digest
}

fn padded_password(password: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let n = password.len().min(32);
    out[..n].copy_from_slice(&password[..n]);
    out[n..].copy_from_slice(&PAD[..32 - n]);
    out
}

/// Algorithm 2.A / 2.B (ISO 32000-2): validates the password against the
/// user (then owner) hash and unwraps the AES-256 file key from `/UE` or
/// `/OE`.
fn derive_key_r6(password: &[u8], u: &[u8], ue: &[u8], o: &[u8], oe: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if u.len() < 48 || o.len() < 48 {
        return Err(DecryptError::WrongPassword);
    }
    let (u_hash, u_validation_salt, u_key_salt) = (&u[0..32], &u[32..40], &u[40..48]);

    let candidate = hardened_hash(password, u_validation_salt, &[]);
    if candidate == u_hash {
        let intermediate = hardened_hash(password, u_key_salt, &[]);
        return Ok(aes_256_cbc_no_padding_decrypt(&intermediate, ue));
    }

    let (o_hash, o_validation_salt, o_key_salt) = (&o[0..32], &o[32..40], &o[40..48]);
    let candidate = hardened_hash(password, o_validation_salt, u);
    if candidate == o_hash {
        let intermediate = hardened_hash(password, o_key_salt, u);
        return Ok(aes_256_cbc_no_padding_decrypt(&intermediate, oe));
    }

    Err(DecryptError::WrongPassword)
}

/// The R6 "hardened" hash (Algorithm 2.B): an initial SHA-256 round, then
/// repeated AES-128-CBC encryption rounds of a 64-times-repeated buffer,
/// re-hashed with SHA-256/384/512 chosen by the last round's output mod 3,
/// until round 64+ and the last output byte is <= round number - 32.
fn hardened_hash(password: &[u8], salt: &[u8], extra: &[u8]) -> Vec<u8> {
    let mut k = {
        let mut h = Sha256::new();
        h.update(password);
        h.update(salt);
        h.update(extra);
        h.finalize().to_vec()
    };

    let mut round = 0usize;
    loop {
        let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + extra.len()));
        for _ in 0..64 {
            k1.extend_from_slice(password);
            k1.extend_from_slice(&k);
            k1.extend_from_slice(extra);
        }

        let key = &k[0..16];
        let iv = &k[16..32];
        let e = aes_128_cbc_no_padding_encrypt(key, iv, &k1);

        let modulus: u32 = e[..16].iter().map(|&b| b as u32).sum::<u32>() % 3;
        k = match modulus {
            0 => Sha256::digest(&e).to_vec(),
            1 => Sha384::digest(&e).to_vec(),
            _ => Sha512::digest(&e).to_vec(),
        };

        round += 1;
        if round >= 64 && (*e.last().unwrap_or(&0) as usize) <= round - 32 {
            break;
        }
    }
    k.truncate(32);
    k
}

fn aes_128_cbc_no_padding_encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> Vec<u8> {
    use aes::cipher::BlockEncryptMut;
    type Enc = cbc::Encryptor<aes::Aes128>;
    let mut buf = data.to_vec();
    let enc = Enc::new_from_slices(key, iv).expect("16-byte key/iv");
    let blocks = buf.chunks_exact_mut(16);
    for block in blocks {
        enc.clone().encrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
    }
    buf
}

fn aes_256_cbc_no_padding_decrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    type Dec = cbc::Decryptor<aes::Aes256>;
    let iv = [0u8; 16];
    let mut buf = data.to_vec();
    let dec = Dec::new_from_slices(key, &iv).expect("32-byte key, 16-byte iv");
    for block in buf.chunks_exact_mut(16) {
        dec.clone().decrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
    }
    buf
}

/// Stream/string decryption: the payload is `IV (16 bytes) || ciphertext`,
/// PKCS#7 padded (`spec.md` §4.5).
pub fn aes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DecryptError> {
    if data.len() < 16 || (data.len() - 16) % 16 != 0 {
        return Err(DecryptError::BadCiphertext);
    }
    let (iv, ciphertext) = data.split_at(16);
    let mut buf = ciphertext.to_vec();
    let result = match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .map_err(|_| DecryptError::BadCiphertext)?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map(|s| s.to_vec()),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .map_err(|_| DecryptError::BadCiphertext)?
            .decrypt_padded_mut::<Pkcs7>(&mut buf)
            .map(|s| s.to_vec()),
        _ => return Err(DecryptError::BadCiphertext),
    };
    result.map_err(|_| DecryptError::BadCiphertext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_key_derivation_is_deterministic() {
        let o = [0x11u8; 32];
        let id0 = b"0123456789abcdef";
        let a = derive_key_legacy(&[], &o, -4, id0, 3, 16, true);
        let b = derive_key_legacy(&[], &o, -4, id0, 3, 16, true);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    fn handler_with_key(file_key: Vec<u8>) -> SecurityHandler {
        SecurityHandler {
            revision: 3,
            file_key,
            key_len_bytes: 16,
            encrypt_metadata: true,
            authenticated: true,
            params: EncryptParams { o: Vec::new(), u: Vec::new(), p: 0, id0: Vec::new(), oe: None, ue: None },
        }
    }

    #[test]
    fn object_key_differs_per_object() {
        let handler = handler_with_key(vec![0xAA; 16]);
        let k1 = handler.object_key(ObjRef::new(1, 0), false);
        let k2 = handler.object_key(ObjRef::new(2, 0), false);
        assert_ne!(k1, k2);
    }

    #[test]
    fn empty_password_authenticates_when_u_matches() {
        let id0 = b"0123456789abcdef";
        let o = [0x11u8; 32];
        let file_key = derive_key_legacy(&[], &o, -4, id0, 3, 16, true);
        let u = {
            let h = Md5::digest([PAD.as_slice(), id0.as_slice()].concat());
            let mut val = rc4::rc4(&file_key, &h);
            for i in 1u8..=19 {
                let key_i: Vec<u8> = file_key.iter().map(|b| b ^ i).collect();
                val = rc4::rc4(&key_i, &val);
            }
            let mut u = val;
            u.extend_from_slice(&[0u8; 16]);
            u
        };
        let handler = SecurityHandler::new(3, &o, &u, -4, id0, 128, true, None, None);
        assert!(handler.authenticated);
        assert_eq!(handler.file_key, file_key);
    }

    #[test]
    fn wrong_password_leaves_handler_unauthenticated() {
        let id0 = b"0123456789abcdef";
        let o = [0x11u8; 32];
        let u = [0x22u8; 32]; // does not correspond to any real password
        let handler = SecurityHandler::new(3, &o, &u, -4, id0, 128, true, None, None);
        assert!(!handler.authenticated);
    }

    #[test]
    fn aes_cbc_round_trip_via_encrypt_helper() {
        let key = [0x42u8; 16];
        let iv = [0u8; 16];
        let plaintext = b"hello world AES!"; // exactly one block
        let ciphertext = aes_128_cbc_no_padding_encrypt(&key, &iv, plaintext);
        let mut payload = iv.to_vec();
        payload.extend_from_slice(&ciphertext);
        // no padding was applied (exact block), so PKCS7-unpad would fail;
        // this only exercises the encrypt/decrypt primitives agree.
        let mut buf = ciphertext.clone();
        let dec = cbc::Decryptor::<aes::Aes128>::new_from_slices(&key, &iv).unwrap();
        for block in buf.chunks_exact_mut(16) {
            use aes::cipher::BlockDecryptMut;
            dec.clone().decrypt_block_mut(aes::cipher::generic_array::GenericArray::from_mut_slice(block));
        }
        assert_eq!(&buf, plaintext);
    }
}
