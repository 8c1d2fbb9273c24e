//! `JBIG2Decode` parameter parsing. Like [`super::ccitt`], the bitstream
//! itself is handed to an external codec; this only resolves the optional
//! `/JBIG2Globals` stream reference.

use crate::object::{Dictionary, Object};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jbig2Params {
    pub globals: Option<crate::object::ObjRef>,
}

impl Jbig2Params {
    pub fn from_dict(dict: &Dictionary) -> Self {
        Self { globals: dict.get("JBIG2Globals").and_then(|o| o.as_reference()) }
    }
}
