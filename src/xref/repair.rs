//! Repair mode: when `startxref`/`Prev` walking fails or yields nothing
//! usable, rebuild the table by scanning the whole file for `n g obj`
//! headers and the final `trailer` dictionary (`spec.md` §4.3 "Fallback",
//! scenario S6).

use super::{XrefEntry, XrefTable};
use crate::error::{PdfError, Result, XRefErrorKind};
use crate::object::lexer::is_whitespace;
use crate::object::parser::Parser;
use crate::object::{Dictionary, Object};

pub fn rebuild_by_scanning(buf: &[u8]) -> Result<(XrefTable, Dictionary)> {
    let mut table = XrefTable::new();
    let mut i = 0usize;
    while i < buf.len() {
        if let Some((num, gen, obj_start, next)) = match_obj_header(buf, i) {
            table.set(num, XrefEntry::InUse { offset: i, gen });
            i = next.max(obj_start);
        } else {
            i += 1;
        }
    }

    let trailer = find_last_trailer(buf).or_else(|| synthesize_trailer(buf, &table)).ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    Ok((table, trailer))
}

/// Recognizes `<digits> <digits> obj` starting at `pos`, returning the
/// object number, generation, the offset just past `obj`, and a resume
/// point to continue scanning from (so overlapping false positives inside
/// string/stream bodies are merely wasted work, not correctness bugs).
fn match_obj_header(buf: &[u8], pos: usize) -> Option<(u32, u16, usize, usize)> {
    let mut i = pos;
    let num_start = i;
    while i < buf.len() && buf[i].is_ascii_digit() {
        i += 1;
    }
    if i == num_start || i >= buf.len() || !is_whitespace(buf[i]) {
        return None;
    }
    let num: u32 = std::str::from_utf8(&buf[num_start..i]).ok()?.parse().ok()?;
    while i < buf.len() && is_whitespace(buf[i]) {
        i += 1;
    }
    let gen_start = i;
    while i < buf.len() && buf[i].is_ascii_digit() {
        i += 1;
    }
    if i == gen_start {
        return None;
    }
    let gen: u16 = std::str::from_utf8(&buf[gen_start..i]).ok()?.parse().ok()?;
    while i < buf.len() && is_whitespace(buf[i]) {
        i += 1;
    }
    if !buf[i..].starts_with(b"obj") {
        return None;
    }
    i += 3;
    Some((num, gen, pos, i))
}

/// Finds the last `trailer << ... >>` in the file, preferring it over a
/// synthesized one since a real trailer carries `/Encrypt` correctly.
fn find_last_trailer(buf: &[u8]) -> Option<Dictionary> {
    let pos = find_last(buf, b"trailer")?;
    let mut p = Parser::at(buf, pos + b"trailer".len());
    p.parse_object().as_dict().cloned()
}

/// No `trailer` keyword at all (can happen on an xref-stream-only document
/// whose single xref-stream object was itself unparseable): find the
/// highest-numbered `/Type /Catalog` object found during the scan and use
/// it as `/Root`, with `/Size` set to one past the largest object number.
fn synthesize_trailer(buf: &[u8], table: &XrefTable) -> Option<Dictionary> {
    let mut root = None;
    let mut max_num = 0u32;
    for num in table.object_numbers() {
        max_num = max_num.max(num);
        if let Some(XrefEntry::InUse { offset, gen }) = table.get(num) {
            let mut p = Parser::at(buf, offset);
            if let Some((_, obj)) = p.parse_indirect_object() {
                if obj.as_dict().and_then(|d| d.type_name()).as_deref() == Some("Catalog") {
                    root = Some(crate::object::ObjRef::new(num, gen));
                }
            }
        }
    }
    let mut dict = Dictionary::new();
    dict.insert("Size", Object::Integer(max_num as i64 + 1));
    if let Some(r) = root {
        dict.insert("Root", Object::Reference(r));
    }
    Some(dict)
}

fn find_last(hay: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || hay.len() < needle.len() {
        return None;
    }
    (0..=hay.len() - needle.len()).rev().find(|&i| &hay[i..i + needle.len()] == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_objects_and_trailer() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n2 0 obj\n<< /Foo 1 >>\nendobj\ntrailer\n<< /Size 3 /Root 1 0 R >>\n";
        let (table, trailer) = rebuild_by_scanning(data).unwrap();
        assert!(matches!(table.get(1), Some(XrefEntry::InUse { .. })));
        assert!(matches!(table.get(2), Some(XrefEntry::InUse { .. })));
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(crate::object::ObjRef::new(1, 0))));
    }

    #[test]
    fn synthesizes_trailer_when_missing() {
        let data = b"1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let (_, trailer) = rebuild_by_scanning(data).unwrap();
        assert_eq!(trailer.get("Root"), Some(&Object::Reference(crate::object::ObjRef::new(1, 0))));
    }
}
