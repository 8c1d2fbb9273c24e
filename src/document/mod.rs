//! The document model: object resolution (including compressed object
//! streams and transparent decryption), the page tree, and the public
//! `Document` handle (`spec.md` §3 "Document", §4 lifecycles, §6).

pub mod catalog;
pub mod metadata;
pub mod page;

use std::cell::RefCell;
use std::collections::HashMap;

use crate::crypto::{self, Cipher, SecurityHandler};
use crate::error::{PdfError, Result, XRefErrorKind};
use crate::filters;
use crate::object::parser::Parser;
use crate::object::{Dictionary, Object, ObjRef};
use crate::xref::{self, XrefEntry, XrefTable};

pub use catalog::Catalog;
pub use metadata::Metadata;
pub use page::Page;

/// Diagnostics collected while opening or walking a document: every
/// recoverable parse/xref/filter hiccup is recorded here instead of
/// aborting, per `spec.md` §4.2 "Recovery" and §7 "recoverable errors".
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    pub messages: Vec<String>,
}

impl Diagnostics {
    pub(crate) fn push(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }
}

/// Options controlling how `Document::open` behaves on malformed or
/// encrypted input.
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub user_password: Vec<u8>,
    pub owner_password: Vec<u8>,
}

pub struct Document {
    buf: Vec<u8>,
    xref: XrefTable,
    trailer: Dictionary,
    security: Option<SecurityHandler>,
    cache: RefCell<HashMap<ObjRef, Object>>,
    pub diagnostics: RefCell<Diagnostics>,
    pub used_repair: bool,
}

impl Document {
    /// Opens a document, resolving the xref chain (falling back to repair
    /// mode) and, if `/Encrypt` is present, attempting the empty password
    /// and then, in order, `options.owner_password` and
    /// `options.user_password` (`spec.md` §4.5 "two attempts: owner then
    /// user"). Opening always succeeds even if none of those unlock the
    /// document — `Info().Encrypted` must be observable before
    /// authentication, and the caller can retry with [`Self::decrypt`]
    /// (`spec.md` §6 `Document.Decrypt`, §8 scenario S3).
    pub fn open(buf: Vec<u8>, options: OpenOptions) -> Result<Self> {
        if !buf.starts_with(b"%PDF-") {
            return Err(PdfError::Parse(crate::error::ParseContext::new(0, "missing %PDF- header")));
        }
        let walk = xref::resolve_xref(&buf)?;
        let mut diagnostics = Diagnostics::default();
        if walk.used_repair {
            diagnostics.push("xref chain unusable, rebuilt by linear scan");
        }

        let mut doc = Document {
            buf,
            xref: walk.table,
            trailer: walk.trailer,
            security: None,
            cache: RefCell::new(HashMap::new()),
            diagnostics: RefCell::new(diagnostics),
            used_repair: walk.used_repair,
        };

        if let Some(encrypt_ref) = doc.trailer.get("Encrypt").cloned() {
            doc.security = Some(doc.build_security_handler(&encrypt_ref, &options)?);
        }

        Ok(doc)
    }

    /// Authenticates against `password`, trying it both as the user
    /// password and (reversed through Algorithm 7) as the owner password
    /// (`spec.md` §6 `Document.Decrypt`). Returns `Ok(())` once the file key
    /// is unlocked — previously-cached objects that failed to decrypt under
    /// the old key were never cached (`Self::resolve` only inserts after a
    /// successful load), so they resolve correctly on the next access
    /// without any explicit invalidation here. Returns `PdfError::Auth` if
    /// `password` doesn't unlock the document, or if the document isn't
    /// encrypted at all.
    pub fn decrypt(&mut self, password: &[u8]) -> Result<()> {
        match &mut self.security {
            Some(handler) if handler.try_password(password) => Ok(()),
            _ => Err(PdfError::Auth),
        }
    }

    fn build_security_handler(&mut self, encrypt_obj: &Object, options: &OpenOptions) -> Result<SecurityHandler> {
        let encrypt_dict = match encrypt_obj {
            Object::Reference(r) => self.resolve(*r)?.as_dict().cloned(),
            Object::Dictionary(d) => Some(d.clone()),
            _ => None,
        }
        .ok_or_else(|| PdfError::Parse(crate::error::ParseContext::new(0, "malformed /Encrypt dictionary")))?;

        let revision = encrypt_dict.get("R").and_then(|o| o.as_i64()).unwrap_or(2) as u8;
        let o = encrypt_dict.get("O").and_then(|o| o.as_str_bytes()).unwrap_or(&[]).to_vec();
        let u = encrypt_dict.get("U").and_then(|o| o.as_str_bytes()).unwrap_or(&[]).to_vec();
        let p = encrypt_dict.get("P").and_then(|o| o.as_i64()).unwrap_or(0) as i32;
        let key_len_bits = encrypt_dict.get("Length").and_then(|o| o.as_i64()).unwrap_or(40) as u32;
        let encrypt_metadata = !matches!(encrypt_dict.get("EncryptMetadata"), Some(Object::Boolean(false)));
        let oe = encrypt_dict.get("OE").and_then(|o| o.as_str_bytes()).map(|b| b.to_vec());
        let ue = encrypt_dict.get("UE").and_then(|o| o.as_str_bytes()).map(|b| b.to_vec());

        let id0 = self
            .trailer
            .get("ID")
            .and_then(|o| o.as_array())
            .and_then(|a| a.first())
            .and_then(|o| o.as_str_bytes())
            .unwrap_or(&[])
            .to_vec();

        // `SecurityHandler::new` already attempted the empty password; try
        // the caller-supplied ones, owner then user, before giving up.
        let mut handler =
            SecurityHandler::new(revision, &o, &u, p, &id0, key_len_bits, encrypt_metadata, oe.as_deref(), ue.as_deref());
        if !handler.authenticated && !options.owner_password.is_empty() {
            handler.try_password(&options.owner_password);
        }
        if !handler.authenticated && !options.user_password.is_empty() {
            handler.try_password(&options.user_password);
        }
        Ok(handler)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Records a recoverable hiccup for `Info`/diagnostic output
    /// (`spec.md` §4.2 "Recovery").
    pub(crate) fn warn(&self, msg: impl Into<String>) {
        self.diagnostics.borrow_mut().push(msg);
    }

    /// The effective PDF version: `/Root/Version` if the catalog overrides
    /// it, else the `%PDF-x.y` header version (`spec.md` §6
    /// `Document.Version()`, §8 scenario S1).
    pub fn version(&self) -> String {
        self.catalog().ok().and_then(|c| c.version_override()).unwrap_or_else(|| header_version(&self.buf))
    }

    /// Whether the xref table resolved through at least one compressed
    /// object stream (`spec.md` §8 scenario S2).
    pub fn is_optimized(&self) -> bool {
        self.xref.has_compressed_entries()
    }

    /// Resolves an indirect reference to its object, following reference
    /// chains, unpacking compressed object streams, decrypting strings and
    /// stream payloads, and caching the result (`spec.md` §4.3 items 1-6).
    pub fn resolve(&self, r: ObjRef) -> Result<Object> {
        if let Some(obj) = self.cache.borrow().get(&r) {
            return Ok(obj.clone());
        }
        let obj = self.load(r)?;
        self.cache.borrow_mut().insert(r, obj.clone());
        Ok(obj)
    }

    /// Like [`Self::resolve`] but follows `Object::Reference` values
    /// transparently, returning the first non-reference object (or `Null`
    /// on a dangling/cyclic chain).
    pub fn deref<'a>(&self, obj: &'a Object) -> Result<std::borrow::Cow<'a, Object>> {
        let mut current = std::borrow::Cow::Borrowed(obj);
        let mut hops = 0;
        while let Object::Reference(r) = current.as_ref() {
            if hops > 64 {
                return Ok(std::borrow::Cow::Owned(Object::Null));
            }
            hops += 1;
            current = std::borrow::Cow::Owned(self.resolve(*r)?);
        }
        Ok(current)
    }

    fn load(&self, r: ObjRef) -> Result<Object> {
        match xref::locate(&self.xref, r) {
            XrefEntry::Free => Ok(Object::Null),
            XrefEntry::InUse { offset, .. } => self.load_direct(offset, r),
            XrefEntry::Compressed { stream_obj, index } => self.load_compressed(stream_obj, index),
        }
    }

    fn load_direct(&self, offset: usize, expected: ObjRef) -> Result<Object> {
        let mut p = Parser::at(&self.buf, offset);
        let (found, mut obj) = p
            .parse_indirect_object()
            .ok_or(PdfError::XRef(XRefErrorKind::ObjectMismatch))?;
        self.drain_recoveries(&mut p);
        if found.num != expected.num {
            return Err(PdfError::XRef(XRefErrorKind::ObjectMismatch));
        }
        if let Some(handler) = &self.security {
            obj = decrypt_object(handler, found, obj)?;
        }
        Ok(obj)
    }

    fn load_compressed(&self, stream_obj: u32, index: u32) -> Result<Object> {
        let container = self.resolve(ObjRef::new(stream_obj, 0))?;
        let stream = container.as_stream().ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
        let n = stream.dict.get("N").and_then(|o| o.as_i64()).unwrap_or(0) as usize;
        let first = stream.dict.get("First").and_then(|o| o.as_i64()).unwrap_or(0) as usize;
        let decoded = filters::decode(&stream.raw, &stream.dict)?;

        let mut header = Parser::new(&decoded);
        let mut offsets = Vec::with_capacity(n);
        for _ in 0..n {
            let num = header.parse_object().as_i64().unwrap_or(0) as u32;
            let off = header.parse_object().as_i64().unwrap_or(0) as usize;
            offsets.push((num, off));
        }
        self.drain_recoveries(&mut header);
        let (_, rel_offset) = *offsets.get(index as usize).ok_or(PdfError::XRef(XRefErrorKind::BadEntry))?;
        let mut body = Parser::at(&decoded, first + rel_offset);
        let obj = body.parse_object();
        self.drain_recoveries(&mut body);
        Ok(obj)
    }

    /// Moves every recoverable hiccup recorded by `p` since it was created
    /// into `self.diagnostics` (`spec.md` §4.2 "Record all recoveries for
    /// diagnostic output").
    fn drain_recoveries(&self, p: &mut Parser<'_>) {
        for rec in p.recoveries.drain(..) {
            self.warn(format!("offset {}: {}", rec.offset, rec.message));
        }
    }

    /// The `/Root` catalog dictionary.
    pub fn catalog(&self) -> Result<Catalog> {
        let root = self
            .trailer
            .get("Root")
            .ok_or_else(|| PdfError::Parse(crate::error::ParseContext::new(0, "trailer missing /Root")))?;
        let dict = self
            .deref(root)?
            .as_dict()
            .cloned()
            .ok_or_else(|| PdfError::Parse(crate::error::ParseContext::new(0, "/Root is not a dictionary")))?;
        Ok(Catalog::new(dict))
    }

    pub fn metadata(&self) -> Metadata {
        let info = self
            .trailer
            .get("Info")
            .and_then(|o| self.deref(o).ok())
            .and_then(|c| c.as_dict().cloned());
        let encrypted = self.trailer.get("Encrypt").is_some();
        Metadata::new(info.unwrap_or_default(), self.version(), self.is_optimized(), encrypted)
    }

    /// Walks the page tree (honoring inherited `/Resources`, `/MediaBox`,
    /// `/CropBox`, `/Rotate`) and returns the flattened page list
    /// (`spec.md` §3 "Page"). The catalog's `/Pages` entry is almost always
    /// an indirect reference, but a direct dictionary is legal too.
    pub fn pages(&self) -> Result<Vec<Page>> {
        let catalog = self.catalog()?;
        let root = catalog
            .pages_root()
            .ok_or_else(|| PdfError::Parse(crate::error::ParseContext::new(0, "catalog missing /Pages")))?;
        let mut out = Vec::new();
        let mut seen = std::collections::HashSet::new();
        match root {
            catalog::PagesRoot::Indirect(r) => {
                page::collect_pages(self, r, page::InheritedAttrs::default(), &mut out, &mut seen)?
            }
            catalog::PagesRoot::Direct(d) => {
                page::collect_pages_from_dict(self, d, page::InheritedAttrs::default(), &mut out, &mut seen, None)?
            }
        }
        Ok(out)
    }

    pub fn num_pages(&self) -> Result<usize> {
        Ok(self.pages()?.len())
    }

    pub(crate) fn raw(&self) -> &[u8] {
        &self.buf
    }

    /// Every object number named by the effective xref table, for callers
    /// (the write path) that need to walk the whole object graph rather than
    /// a single reference chain.
    pub fn object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.xref.object_numbers()
    }
}

/// Parses the `%PDF-x.y` header version (`buf` is known to start with
/// `%PDF-`, checked in `Document::open`).
fn header_version(buf: &[u8]) -> String {
    let rest = &buf[b"%PDF-".len()..];
    let end = rest.iter().position(|&b| b == b'\r' || b == b'\n' || b == b' ').unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

fn decrypt_object(handler: &SecurityHandler, id: ObjRef, obj: Object) -> Result<Object> {
    let cipher = if handler.revision >= 4 { Cipher::Aes128 } else { Cipher::Rc4 };
    match obj {
        Object::String(mut s) => {
            if !handler.authenticated {
                return Err(PdfError::Auth);
            }
            s.bytes = crypto::decrypt(handler, id, cipher, &s.bytes)?;
            Ok(Object::String(s))
        }
        Object::Stream(mut s) => {
            let is_xref_or_metadata_exempt = s.dict.type_name().as_deref() == Some("XRef");
            if !is_xref_or_metadata_exempt {
                if !handler.authenticated {
                    return Err(PdfError::Auth);
                }
                s.raw = crypto::decrypt(handler, id, cipher, &s.raw)?;
            }
            Ok(Object::Stream(s))
        }
        Object::Array(items) => Ok(Object::Array(
            items.into_iter().map(|o| decrypt_object(handler, id, o)).collect::<Result<_>>()?,
        )),
        Object::Dictionary(d) => {
            let mut out = Dictionary::new();
            for (k, v) in d.iter() {
                out.insert(k.clone(), decrypt_object(handler, id, v.clone())?);
            }
            Ok(Object::Dictionary(out))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let body = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n";
        let mut buf = body.to_vec();
        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 4\n0000000000 65535 f \n");
        for off in [9usize, 58, 115] {
            buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        buf.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n");
        buf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        buf.extend_from_slice(b"%%EOF");
        buf
    }

    #[test]
    fn opens_and_counts_pages() {
        let doc = Document::open(minimal_pdf(), OpenOptions::default()).unwrap();
        assert_eq!(doc.num_pages().unwrap(), 1);
        assert!(!doc.used_repair);
    }

    #[test]
    fn falls_back_to_repair_on_garbage_xref() {
        let mut data = minimal_pdf();
        // scramble the `xref` keyword itself so the classic walk fails and
        // `Document::open` has to rebuild the table by linear scan.
        let pos = data.windows(4).position(|w| w == b"xref").unwrap();
        data[pos..pos + 4].copy_from_slice(b"XREF");
        let doc = Document::open(data, OpenOptions::default()).unwrap();
        assert!(doc.used_repair);
        assert_eq!(doc.num_pages().unwrap(), 1);
    }
}
