//! A minimal indirect-object builder: allocates object numbers, holds a
//! flat object table, and serializes a classic-xref PDF. Grounded in the
//! teacher's `lopdf::Document::new_object_id`/`add_object` builder pattern
//! (`serialize.rs`), adapted to this crate's own [`Object`] model instead of
//! `lopdf`'s.

use std::collections::BTreeMap;

use crate::object::{Dictionary, Name, Object, ObjRef, Stream};

#[derive(Default)]
pub struct LowDocument {
    objects: BTreeMap<u32, Object>,
    next_num: u32,
}

impl LowDocument {
    pub fn new() -> Self {
        Self { objects: BTreeMap::new(), next_num: 1 }
    }

    /// Reserves an object number without content, for building structures
    /// that reference each other before every piece exists (e.g. a page
    /// referencing its not-yet-built Resources dict).
    pub fn reserve(&mut self) -> ObjRef {
        let num = self.next_num;
        self.next_num += 1;
        ObjRef::new(num, 0)
    }

    pub fn set(&mut self, r: ObjRef, obj: Object) {
        self.objects.insert(r.num, obj);
    }

    pub fn add(&mut self, obj: Object) -> ObjRef {
        let r = self.reserve();
        self.set(r, obj);
        r
    }

    pub fn add_stream(&mut self, dict: Dictionary, raw: Vec<u8>) -> ObjRef {
        self.add(Object::Stream(Stream::new(dict, raw)))
    }

    /// Mutable access to an already-set object's dictionary (or a stream's
    /// dictionary), for post-hoc fixups like re-pointing a copied page's
    /// `/Parent` at a freshly built `/Pages` node.
    pub fn dict_mut(&mut self, r: ObjRef) -> Option<&mut Dictionary> {
        self.objects.get_mut(&r.num)?.as_dict_mut()
    }

    /// Serializes every allocated object plus a trailer (`/Root` and
    /// whatever the caller adds via `extra_trailer`) as a classic-xref PDF.
    /// Not byte-preserving with respect to any source document — a fresh
    /// document is always written, per `spec.md` §1 Non-goals.
    pub fn serialize(&self, root: ObjRef, extra_trailer: Dictionary) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n");

        let highest = self.objects.keys().next_back().copied().unwrap_or(0);
        let mut offsets: BTreeMap<u32, usize> = BTreeMap::new();

        for (&num, obj) in &self.objects {
            offsets.insert(num, out.len());
            out.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
            write_object(&mut out, obj);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", highest + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for num in 1..=highest {
            match offsets.get(&num) {
                Some(off) => out.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes()),
                None => out.extend_from_slice(b"0000000000 00000 f \n"),
            }
        }

        let mut trailer = Dictionary::new();
        trailer.insert("Size", Object::Integer(highest as i64 + 1));
        trailer.insert("Root", Object::Reference(root));
        for (k, v) in extra_trailer.iter() {
            trailer.insert(k.clone(), v.clone());
        }

        out.extend_from_slice(b"trailer\n");
        write_object(&mut out, &Object::Dictionary(trailer));
        out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF", xref_offset).as_bytes());
        out
    }
}

fn write_object(out: &mut Vec<u8>, obj: &Object) {
    match obj {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(r) => {
            let text = format!("{}", r);
            if text.contains('.') || text.contains('e') || text.contains('E') {
                out.extend_from_slice(text.as_bytes());
            } else {
                out.extend_from_slice(format!("{}.0", text).as_bytes());
            }
        }
        Object::Name(n) => {
            out.push(b'/');
            write_name_escaped(out, n);
        }
        Object::String(s) => write_string(out, s),
        Object::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
        }
        Object::Dictionary(d) => write_dict(out, d),
        Object::Reference(r) => out.extend_from_slice(format!("{} {} R", r.num, r.gen).as_bytes()),
        Object::Stream(s) => {
            let mut dict = s.dict.clone();
            dict.insert("Length", Object::Integer(s.raw.len() as i64));
            write_dict(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&s.raw);
            out.extend_from_slice(b"\nendstream");
        }
    }
}

fn write_dict(out: &mut Vec<u8>, d: &Dictionary) {
    out.extend_from_slice(b"<< ");
    for (k, v) in d.iter() {
        out.push(b'/');
        write_name_escaped(out, k);
        out.push(b' ');
        write_object(out, v);
        out.push(b' ');
    }
    out.extend_from_slice(b">>");
}

fn write_name_escaped(out: &mut Vec<u8>, n: &Name) {
    for &b in &n.0 {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.') {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &crate::object::PdfString) {
    out.push(b'(');
    for &b in &s.bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            _ => out.push(b),
        }
    }
    out.push(b')');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_object_parser() {
        let mut low = LowDocument::new();
        let pages = low.reserve();
        let catalog = low.add(Object::Dictionary(Dictionary::from_iter([
            (Name::from("Type"), Object::Name("Catalog".into())),
            (Name::from("Pages"), Object::Reference(pages)),
        ])));
        low.set(pages, Object::Dictionary(Dictionary::from_iter([
            (Name::from("Type"), Object::Name("Pages".into())),
            (Name::from("Kids"), Object::Array(vec![])),
            (Name::from("Count"), Object::Integer(0)),
        ])));
        let bytes = low.serialize(catalog, Dictionary::new());

        let doc = crate::document::Document::open(bytes, crate::document::OpenOptions::default()).unwrap();
        assert_eq!(doc.num_pages().unwrap(), 0);
    }
}
