//! Classic `xref` table parsing: `xref` keyword, subsections, and the
//! trailing `trailer << ... >>` dictionary (`spec.md` §4.3).

use super::{XrefEntry, XrefTable};
use crate::error::{PdfError, Result, XRefErrorKind};
use crate::object::lexer::{is_whitespace, Lexer};
use crate::object::parser::Parser;
use crate::object::{Dictionary, Object};

pub fn parse_classic_xref(buf: &[u8], offset: usize) -> Result<(XrefTable, Dictionary)> {
    let mut lx = Lexer::at(buf, offset);
    lx.skip_trivia();
    if !lx.buf[lx.pos..].starts_with(b"xref") {
        return Err(PdfError::XRef(XRefErrorKind::BadEntry));
    }
    lx.pos += 4;

    let mut table = XrefTable::new();

    loop {
        lx.skip_trivia();
        if lx.buf[lx.pos..].starts_with(b"trailer") {
            lx.pos += 7;
            break;
        }
        let Some((first, count, new_pos)) = parse_subsection_header(lx.buf, lx.pos) else {
            break;
        };
        lx.pos = new_pos;

        for i in 0..count {
            let Some((entry, new_pos)) = parse_entry_line(lx.buf, lx.pos) else {
                return Err(PdfError::XRef(XRefErrorKind::BadEntry));
            };
            lx.pos = new_pos;
            let num = first + i;
            if let XrefEntry::InUse { .. } | XrefEntry::Compressed { .. } = entry {
                table.set(num, entry);
            } else {
                // Free entries are recorded so later merges don't resurrect
                // an object number from an older `Prev` section.
                table.set(num, XrefEntry::Free);
            }
        }
    }

    let mut p = Parser::at(buf, lx.pos);
    let trailer_obj = p.parse_object();
    let trailer = trailer_obj.as_dict().cloned().ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
    Ok((table, trailer))
}

/// Parses `first count` at `pos`, returning the new position (after the
/// trailing EOL of the header line).
fn parse_subsection_header(buf: &[u8], pos: usize) -> Option<(u32, u32, usize)> {
    let mut lx = Lexer::at(buf, pos);
    lx.skip_trivia();
    let start = lx.pos;
    let first = read_uint(buf, &mut lx.pos)?;
    if lx.pos == start {
        return None;
    }
    while lx.pos < buf.len() && buf[lx.pos] == b' ' {
        lx.pos += 1;
    }
    let count = read_uint(buf, &mut lx.pos)?;
    // advance to the start of the first 20-byte entry line
    while lx.pos < buf.len() && is_whitespace(buf[lx.pos]) {
        lx.pos += 1;
    }
    Some((first as u32, count as u32, lx.pos))
}

fn read_uint(buf: &[u8], pos: &mut usize) -> Option<u64> {
    let start = *pos;
    while *pos < buf.len() && buf[*pos].is_ascii_digit() {
        *pos += 1;
    }
    if *pos == start {
        return None;
    }
    std::str::from_utf8(&buf[start..*pos]).ok()?.parse().ok()
}

/// Parses one 20-byte entry `nnnnnnnnnn ggggg [nf] EOL`, tolerating the
/// three permitted EOL spellings and minor width drift seen in the wild.
fn parse_entry_line(buf: &[u8], pos: usize) -> Option<(XrefEntry, usize)> {
    let mut i = pos;
    let offset = read_uint(buf, &mut i)?;
    while i < buf.len() && buf[i] == b' ' {
        i += 1;
    }
    let gen = read_uint(buf, &mut i)?;
    while i < buf.len() && buf[i] == b' ' {
        i += 1;
    }
    let kind = *buf.get(i)?;
    i += 1;
    // consume the two-byte EOL (SP CR / SP LF / CR LF), tolerating a single
    // trailing whitespace byte if the producer only wrote one.
    let mut consumed = 0;
    while i < buf.len() && is_whitespace(buf[i]) && consumed < 2 {
        i += 1;
        consumed += 1;
    }
    let entry = match kind {
        b'n' => XrefEntry::InUse { offset: offset as usize, gen: gen as u16 },
        _ => XrefEntry::Free,
    };
    Some((entry, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_table_and_trailer() {
        let data = b"xref\n0 2\n0000000000 65535 f \n0000000017 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R >>\n";
        let (table, trailer) = parse_classic_xref(data, 0).unwrap();
        assert_eq!(table.get(0), Some(XrefEntry::Free));
        assert_eq!(table.get(1), Some(XrefEntry::InUse { offset: 17, gen: 0 }));
        assert_eq!(trailer.get("Size"), Some(&Object::Integer(2)));
    }

    #[test]
    fn parses_multiple_subsections() {
        let data = b"xref\n0 1\n0000000000 65535 f \n3 1\n0000000100 00000 n \ntrailer\n<< /Size 4 >>\n";
        let (table, _) = parse_classic_xref(data, 0).unwrap();
        assert_eq!(table.get(3), Some(XrefEntry::InUse { offset: 100, gen: 0 }));
    }
}
