//! PDF 1.5+ cross-reference streams: a `/Type /XRef` stream object whose
//! decoded payload packs fixed-width binary records (`spec.md` §4.3).

use super::{XrefEntry, XrefTable};
use crate::error::{PdfError, Result, XRefErrorKind};
use crate::filters;
use crate::object::parser::Parser;
use crate::object::{Dictionary, Object};

pub fn parse_xref_stream(buf: &[u8], offset: usize) -> Result<(XrefTable, Dictionary)> {
    let mut p = Parser::at(buf, offset);
    let (_, obj) = p.parse_indirect_object().ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    let stream = match obj {
        Object::Stream(s) => s,
        _ => return Err(PdfError::XRef(XRefErrorKind::BadEntry)),
    };
    let dict = &stream.dict;

    let widths = read_widths(dict)?;
    let size = dict.get("Size").and_then(|o| o.as_i64()).ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    let index = read_index(dict, size);

    let decoded = filters::decode(&stream.raw, dict)?;
    let record_len = widths.0 + widths.1 + widths.2;
    if record_len == 0 {
        return Err(PdfError::XRef(XRefErrorKind::BadEntry));
    }

    let mut table = XrefTable::new();
    let mut cursor = 0usize;
    for (first, count) in index {
        for i in 0..count {
            if cursor + record_len > decoded.len() {
                break;
            }
            let rec = &decoded[cursor..cursor + record_len];
            cursor += record_len;
            let (f1, rest) = rec.split_at(widths.0);
            let (f2, f3) = rest.split_at(widths.1);
            // A zero-width field 1 defaults to type 1 (in-use), per the spec.
            let kind = if widths.0 == 0 { 1 } else { be_uint(f1) };
            let field2 = be_uint(f2);
            let field3 = be_uint(f3);
            let num = (first + i) as u32;
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse { offset: field2 as usize, gen: field3 as u16 },
                2 => XrefEntry::Compressed { stream_obj: field2 as u32, index: field3 as u32 },
                _ => XrefEntry::Free,
            };
            table.set(num, entry);
        }
    }

    Ok((table, dict.clone()))
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn read_widths(dict: &Dictionary) -> Result<(usize, usize, usize)> {
    let arr = dict.get("W").and_then(|o| o.as_array()).ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    if arr.len() != 3 {
        return Err(PdfError::XRef(XRefErrorKind::BadEntry));
    }
    let w = |i: usize| arr[i].as_i64().unwrap_or(0).max(0) as usize;
    Ok((w(0), w(1), w(2)))
}

/// `/Index`, defaulting to `[0 Size]` when absent.
fn read_index(dict: &Dictionary, size: i64) -> Vec<(i64, i64)> {
    match dict.get("Index").and_then(|o| o.as_array()) {
        Some(arr) if arr.len() % 2 == 0 && !arr.is_empty() => arr
            .chunks_exact(2)
            .map(|pair| (pair[0].as_i64().unwrap_or(0), pair[1].as_i64().unwrap_or(0)))
            .collect(),
        _ => vec![(0, size)],
    }
}
