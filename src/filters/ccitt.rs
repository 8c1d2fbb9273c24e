//! `CCITTFaxDecode` parameter parsing. Decoding the fax bitstream itself is
//! out of scope (`spec.md` §9 Open Questions — CCITT/JPEG2000 are treated as
//! an external-codec handoff, same as DCT/JPX); this module only extracts
//! the `/DecodeParms` needed to hand the raw stream to one.

use crate::object::{Dictionary, Object};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcittParams {
    pub k: i64,
    pub columns: u32,
    pub rows: u32,
    pub black_is_1: bool,
    pub encoded_byte_align: bool,
}

impl CcittParams {
    pub fn from_dict(dict: &Dictionary) -> Self {
        Self {
            k: dict.get("K").and_then(|o| o.as_i64()).unwrap_or(0),
            columns: dict.get("Columns").and_then(|o| o.as_i64()).unwrap_or(1728) as u32,
            rows: dict.get("Rows").and_then(|o| o.as_i64()).unwrap_or(0) as u32,
            black_is_1: matches!(dict.get("BlackIs1"), Some(Object::Boolean(true))),
            encoded_byte_align: matches!(dict.get("EncodedByteAlign"), Some(Object::Boolean(true))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let p = CcittParams::from_dict(&Dictionary::new());
        assert_eq!(p.k, 0);
        assert_eq!(p.columns, 1728);
        assert!(!p.black_is_1);
    }
}
