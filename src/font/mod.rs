//! Font and encoding resolution: deriving, for each character code a
//! content stream can emit, its advance width and its Unicode text
//! (`spec.md` §4.7).

pub mod cmap;
pub mod encoding;
pub mod glyphlist;

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, Object};
use encoding::EncodingTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Simple,
    Type0,
}

/// A resolved font dictionary: enough to go from a content-stream code
/// string to glyph widths and Unicode text, without needing glyph outlines
/// (rasterization is explicitly out of scope, `spec.md` §5 Non-goals).
pub struct Font {
    pub kind: FontKind,
    pub base_font: String,
    pub first_char: i64,
    pub widths: Vec<f64>,
    pub missing_width: f64,
    pub default_width: f64,
    pub encoding: Option<EncodingTable>,
    pub to_unicode: Option<cmap::ToUnicodeCMap>,
    pub cid_to_gid_identity: bool,
}

impl Font {
    /// Builds a [`Font`] from a `/Type /Font` dictionary, resolving
    /// `/Widths` (or the descendant CID font's `/W` array), `/Encoding`
    /// (base encoding + `/Differences`), and `/ToUnicode`.
    pub fn load(doc: &Document, dict: &Dictionary) -> Result<Self> {
        let subtype = dict.get("Subtype").and_then(|o| o.as_name()).map(|n| n.as_str().into_owned());
        let base_font = dict.get("BaseFont").and_then(|o| o.as_name()).map(|n| n.as_str().into_owned()).unwrap_or_default();

        let to_unicode = match dict.get("ToUnicode") {
            Some(Object::Reference(r)) => doc.resolve(*r).ok().and_then(|o| o.as_stream().map(|s| decode_cmap_stream(doc, s))),
            _ => None,
        };

        if subtype.as_deref() == Some("Type0") {
            return Self::load_type0(doc, dict, base_font, to_unicode);
        }

        let first_char = dict.get("FirstChar").and_then(|o| o.as_i64()).unwrap_or(0);
        let widths = dict
            .get("Widths")
            .and_then(|o| o.as_array())
            .map(|a| a.iter().filter_map(|o| o.as_f64()).collect())
            .unwrap_or_default();

        let font_descriptor = dict.get("FontDescriptor").and_then(|o| doc.deref(o).ok()).and_then(|d| d.as_dict().cloned());
        let missing_width = font_descriptor.as_ref().and_then(|d| d.get("MissingWidth")).and_then(|o| o.as_f64()).unwrap_or(0.0);

        let encoding = resolve_simple_encoding(doc, dict, &base_font);

        Ok(Font {
            kind: FontKind::Simple,
            base_font,
            first_char,
            widths,
            missing_width,
            default_width: missing_width,
            encoding: Some(encoding),
            to_unicode,
            cid_to_gid_identity: true,
        })
    }

    fn load_type0(doc: &Document, dict: &Dictionary, base_font: String, to_unicode: Option<cmap::ToUnicodeCMap>) -> Result<Self> {
        let descendant = dict
            .get("DescendantFonts")
            .and_then(|o| o.as_array())
            .and_then(|a| a.first())
            .and_then(|o| doc.deref(o).ok())
            .and_then(|d| d.as_dict().cloned())
            .unwrap_or_default();

        let default_width = descendant.get("DW").and_then(|o| o.as_f64()).unwrap_or(1000.0);
        let widths_by_cid = parse_cid_widths(doc, &descendant);

        let cid_to_gid_identity = match descendant.get("CIDToGIDMap") {
            Some(Object::Name(n)) => n.as_str() == "Identity",
            None => true,
            _ => false, // a stream map: identity assumption doesn't hold, but
                        // glyph id isn't otherwise consumed by this crate.
        };

        Ok(Font {
            kind: FontKind::Type0,
            base_font,
            first_char: 0,
            widths: widths_by_cid,
            missing_width: default_width,
            default_width,
            encoding: None,
            to_unicode,
            cid_to_gid_identity,
        })
    }

    /// The advance width, in 1/1000 text-space units, for a character or
    /// CID code.
    pub fn width_for_code(&self, code: u32) -> f64 {
        match self.kind {
            FontKind::Simple => {
                let idx = code as i64 - self.first_char;
                if idx >= 0 {
                    self.widths.get(idx as usize).copied().unwrap_or(self.missing_width)
                } else {
                    self.missing_width
                }
            }
            FontKind::Type0 => self.widths.get(code as usize).copied().unwrap_or(self.default_width),
        }
    }

    /// Unicode text for one character/CID code: `/ToUnicode` first, then
    /// (for simple fonts) the glyph name via the active encoding and the
    /// AGL.
    pub fn unicode_for_code(&self, code: u32) -> Option<String> {
        if let Some(cmap) = &self.to_unicode {
            if let Some(s) = cmap.lookup(code) {
                return Some(s.to_string());
            }
        }
        if self.kind == FontKind::Simple {
            if let Some(enc) = &self.encoding {
                if let Some(name) = enc.get(code as usize).copied().flatten() {
                    return glyphlist::glyph_name_to_unicode(name).map(|c| c.to_string());
                }
            }
        }
        None
    }

    /// Code-string byte width for splitting content-stream string operands
    /// into individual codes.
    pub fn code_width(&self) -> usize {
        match self.kind {
            FontKind::Simple => 1,
            FontKind::Type0 => self.to_unicode.as_ref().map(|c| c.code_bytes).unwrap_or(2),
        }
    }
}

impl PartialEq for FontKind {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
impl Eq for FontKind {}

fn decode_cmap_stream(doc: &Document, stream: &crate::object::Stream) -> cmap::ToUnicodeCMap {
    let _ = doc;
    match crate::filters::decode(&stream.raw, &stream.dict) {
        Ok(bytes) => cmap::ToUnicodeCMap::parse(&bytes),
        Err(_) => cmap::ToUnicodeCMap::default(),
    }
}

fn resolve_simple_encoding(doc: &Document, dict: &Dictionary, _base_font: &str) -> EncodingTable {
    // Symbolic fonts (Symbol, ZapfDingbats, embedded symbolic TrueType)
    // carry their own built-in encoding that this crate doesn't model;
    // StandardEncoding is the least-wrong default until overridden below.
    let mut table = encoding::standard_encoding();

    match dict.get("Encoding") {
        Some(Object::Name(n)) => {
            table = match n.as_str().as_ref() {
                "WinAnsiEncoding" => encoding::win_ansi_encoding(),
                "MacRomanEncoding" => encoding::mac_roman_encoding(),
                _ => table,
            };
        }
        Some(Object::Reference(r)) => {
            if let Ok(resolved) = doc.resolve(*r) {
                if let Some(d) = resolved.as_dict() {
                    table = apply_encoding_dict(d, table);
                }
            }
        }
        Some(Object::Dictionary(d)) => {
            table = apply_encoding_dict(d, table);
        }
        _ => {}
    }
    table
}

fn apply_encoding_dict(d: &Dictionary, mut table: EncodingTable) -> EncodingTable {
    match d.get("BaseEncoding").and_then(|o| o.as_name()) {
        Some(n) => {
            table = match n.as_str().as_ref() {
                "WinAnsiEncoding" => encoding::win_ansi_encoding(),
                "MacRomanEncoding" => encoding::mac_roman_encoding(),
                _ => table,
            };
        }
        None => {}
    }
    if let Some(diffs) = d.get("Differences").and_then(|o| o.as_array()) {
        encoding::apply_differences(&mut table, diffs);
    }
    table
}

fn parse_cid_widths(doc: &Document, descendant: &Dictionary) -> Vec<f64> {
    let mut out = Vec::new();
    let Some(w) = descendant.get("W").and_then(|o| o.as_array()) else { return out };
    let mut i = 0;
    while i < w.len() {
        let Some(start) = w[i].as_i64() else { break };
        i += 1;
        if i >= w.len() {
            break;
        }
        match &w[i] {
            Object::Array(widths) => {
                for (j, width) in widths.iter().enumerate() {
                    if let Some(width) = width.as_f64() {
                        set_at(&mut out, (start as usize) + j, width);
                    }
                }
                i += 1;
            }
            Object::Reference(r) => {
                if let Ok(resolved) = doc.resolve(*r) {
                    if let Some(widths) = resolved.as_array() {
                        for (j, width) in widths.iter().enumerate() {
                            if let Some(width) = width.as_f64() {
                                set_at(&mut out, (start as usize) + j, width);
                            }
                        }
                    }
                }
                i += 1;
            }
            _ => {
                let Some(end) = w[i].as_i64() else { break };
                i += 1;
                if i >= w.len() {
                    break;
                }
                let Some(width) = w[i].as_f64() else { break };
                for cid in start..=end {
                    set_at(&mut out, cid as usize, width);
                }
                i += 1;
            }
        }
    }
    out
}

fn set_at(v: &mut Vec<f64>, idx: usize, value: f64) {
    if v.len() <= idx {
        v.resize(idx + 1, 0.0);
    }
    v[idx] = value;
}
