//! The `/Info` dictionary: title, author, and the other document
//! properties callers typically surface in a UI (`spec.md` §3 "Document").

use crate::object::Dictionary;

#[derive(Debug, Clone, Default)]
pub struct Metadata {
    dict: Dictionary,
    pdf_version: String,
    optimized: bool,
    encrypted: bool,
}

impl Metadata {
    pub fn new(dict: Dictionary, pdf_version: String, optimized: bool, encrypted: bool) -> Self {
        Self { dict, pdf_version, optimized, encrypted }
    }

    /// The effective PDF version: `/Root/Version` if present, else the
    /// `%PDF-x.y` header version (`spec.md` §6 `Document.Version()`).
    pub fn pdf_version(&self) -> &str {
        &self.pdf_version
    }

    /// Whether the xref table resolved through at least one compressed
    /// object stream (`spec.md` §8 scenario S2).
    pub fn optimized(&self) -> bool {
        self.optimized
    }

    /// Whether the trailer carries an `/Encrypt` entry, independent of
    /// whether the supplied password actually unlocked it.
    pub fn encrypted(&self) -> bool {
        self.encrypted
    }

    fn text(&self, key: &str) -> Option<String> {
        self.dict.get(key).and_then(|o| o.as_str_bytes()).map(|bytes| {
            crate::object::PdfString::literal(bytes.to_vec()).to_text_string()
        })
    }

    pub fn title(&self) -> Option<String> {
        self.text("Title")
    }

    pub fn author(&self) -> Option<String> {
        self.text("Author")
    }

    pub fn subject(&self) -> Option<String> {
        self.text("Subject")
    }

    pub fn keywords(&self) -> Option<String> {
        self.text("Keywords")
    }

    pub fn creator(&self) -> Option<String> {
        self.text("Creator")
    }

    pub fn producer(&self) -> Option<String> {
        self.text("Producer")
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }
}
