//! Standard Security Handler: encryption dictionary parsing, key
//! derivation, and per-object RC4/AES decryption (`spec.md` §4.5).

mod rc4;
mod standard;

pub use standard::{DecryptError, SecurityHandler};

use crate::object::ObjRef;

/// The cipher selected for a stream or string, resolved per-object from
/// `/CF` + `/StmF`/`/StrF` (or the single-cipher legacy `/V` 1/2 form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cipher {
    Rc4,
    Aes128,
    Aes256,
    Identity,
}

/// Decrypts `data` belonging to `obj` under the given per-document key and
/// cipher, per `spec.md` §4.5 "Object key derivation".
pub fn decrypt(handler: &SecurityHandler, obj: ObjRef, cipher: Cipher, data: &[u8]) -> Result<Vec<u8>, DecryptError> {
    match cipher {
        Cipher::Identity => Ok(data.to_vec()),
        Cipher::Rc4 => {
            let key = handler.object_key(obj, false);
            Ok(rc4::rc4(&key, data))
        }
        Cipher::Aes128 | Cipher::Aes256 => {
            let key = handler.object_key(obj, true);
            standard::aes_cbc_decrypt(&key, data)
        }
    }
}
