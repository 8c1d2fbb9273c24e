//! Cross-reference resolution: locating `startxref`, walking classic and
//! stream xref sections, merging `Prev` chains, and the linear-scan repair
//! fallback (`spec.md` §4.3).

mod classic;
mod repair;
mod stream;

pub use repair::rebuild_by_scanning;

use std::collections::{HashMap, HashSet};

use crate::error::{PdfError, Result, XRefErrorKind};
use crate::object::parser::Parser;
use crate::object::{Dictionary, Object, ObjRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free,
    InUse { offset: usize, gen: u16 },
    Compressed { stream_obj: u32, index: u32 },
}

/// The effective cross-reference table: the union of every subsection
/// walked from the last `startxref`, following `Prev` chains with newer
/// entries overriding older ones (`spec.md` §3 "XRef table").
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: HashMap<u32, XrefEntry>,
}

impl XrefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, num: u32) -> Option<XrefEntry> {
        self.entries.get(&num).copied()
    }

    /// Merges `other` at *lower* precedence: an object number already
    /// present in `self` is never overwritten (classic PDF `Prev` semantics
    /// — the newest section was inserted first, walking backwards in file
    /// time).
    pub fn merge_lower_precedence(&mut self, other: XrefTable) {
        for (num, entry) in other.entries {
            self.entries.entry(num).or_insert(entry);
        }
    }

    pub fn set(&mut self, num: u32, entry: XrefEntry) {
        self.entries.insert(num, entry);
    }

    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry resolves through a compressed object stream
    /// (PDF 1.5+ cross-reference streams only exist alongside at least one
    /// object stream in practice) — surfaced as `Info().Optimized`
    /// (`spec.md` §6, scenario S2).
    pub fn has_compressed_entries(&self) -> bool {
        self.entries.values().any(|e| matches!(e, XrefEntry::Compressed { .. }))
    }
}

/// Finds `startxref` by scanning backward from EOF within the last 1 KiB
/// window, per `spec.md` §4.3.
pub fn find_startxref(buf: &[u8]) -> Result<usize> {
    let window_start = buf.len().saturating_sub(1024);
    let window = &buf[window_start..];
    let kw_pos = find_last(window, b"startxref").ok_or(XRefErrorKind::MissingStartxref)?;
    let mut p = Parser::at(buf, window_start + kw_pos + b"startxref".len());
    match p.parse_object() {
        Object::Integer(off) if off >= 0 => Ok(off as usize),
        _ => Err(PdfError::XRef(XRefErrorKind::MissingStartxref)),
    }
}

fn find_last(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).rev().find(|&i| &hay[i..i + needle.len()] == needle)
}

/// Result of walking the full `Prev` chain: the merged table plus the final
/// (outermost) trailer dictionary, which carries `Root`/`Info`/`Encrypt`.
pub struct XrefWalk {
    pub table: XrefTable,
    pub trailer: Dictionary,
    pub used_repair: bool,
}

/// Walks the xref chain starting at `startxref`, handling classic tables,
/// xref streams, and the hybrid `XRefStm` trailer key. Falls back to a
/// full-file linear scan on any structural failure.
pub fn resolve_xref(buf: &[u8]) -> Result<XrefWalk> {
    match walk_chain(buf) {
        Ok((table, trailer)) if !table.is_empty() => Ok(XrefWalk { table, trailer, used_repair: false }),
        _ => {
            let (table, trailer) = repair::rebuild_by_scanning(buf)?;
            Ok(XrefWalk { table, trailer, used_repair: true })
        }
    }
}

fn walk_chain(buf: &[u8]) -> Result<(XrefTable, Dictionary)> {
    let start = find_startxref(buf)?;
    if start > buf.len() {
        return Err(PdfError::XRef(XRefErrorKind::BadEntry));
    }

    let mut table = XrefTable::new();
    let mut seen = HashSet::new();
    let mut next = Some(start);
    let mut first_trailer: Option<Dictionary> = None;

    while let Some(offset) = next {
        if offset > buf.len() || !seen.insert(offset) {
            break;
        }
        let (section, trailer) = parse_section_at(buf, offset)?;
        table.merge_lower_precedence(section);

        if let Some(hybrid) = trailer.get("XRefStm").and_then(|o| o.as_i64()) {
            if hybrid >= 0 && (hybrid as usize) < buf.len() && seen.insert(hybrid as usize) {
                if let Ok((hsec, _)) = parse_section_at(buf, hybrid as usize) {
                    table.merge_lower_precedence(hsec);
                }
            }
        }

        if first_trailer.is_none() {
            first_trailer = Some(trailer.clone());
        }

        next = trailer.get("Prev").and_then(|o| o.as_i64()).map(|o| o.max(0) as usize);
    }

    let trailer = first_trailer.ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    Ok((table, trailer))
}

/// Detects whether `offset` begins a classic `xref` table or an indirect
/// xref-stream object, and dispatches accordingly.
fn parse_section_at(buf: &[u8], offset: usize) -> Result<(XrefTable, Dictionary)> {
    if starts_with_xref_keyword(buf, offset) {
        classic::parse_classic_xref(buf, offset)
    } else {
        stream::parse_xref_stream(buf, offset)
    }
}

fn starts_with_xref_keyword(buf: &[u8], offset: usize) -> bool {
    let mut i = offset;
    while i < buf.len() && crate::object::lexer::is_whitespace(buf[i]) {
        i += 1;
    }
    buf[i..].starts_with(b"xref") && !buf[i..].starts_with(b"xrefx")
}

/// Object resolution for a single reference, honoring the precedence rules
/// in `spec.md` §4.3 items 1-6 (cache is the caller's responsibility; this
/// just answers "where do the bytes for (num,gen) live").
pub fn locate(table: &XrefTable, r: ObjRef) -> XrefEntry {
    table.get(r.num).unwrap_or(XrefEntry::Free)
}
