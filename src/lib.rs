//! pdfkit: a PDF parsing, text/image extraction, and minimal-write core.
//!
//! This crate owns its own object model end to end (lexer, parser, xref
//! resolver, filter chain, crypto layer, content interpreter, font/encoding
//! resolution, text layout, and image descriptor construction) rather than
//! building on an existing PDF library, so that every layer's recoverable
//! failure can be surfaced as a diagnostic instead of a hard error.

#[macro_use]
extern crate log;

pub mod content;
pub mod crypto;
pub mod data;
pub mod document;
pub mod error;
pub mod filters;
pub mod font;
pub mod image;
pub mod layout;
pub mod object;
pub mod write;

pub use document::{Catalog, Diagnostics, Document, Metadata, OpenOptions, Page};
pub use error::{PdfError, Result};

use std::sync::atomic::{AtomicBool, Ordering};

/// Opens a PDF from an in-memory byte buffer (`spec.md` §6 `Open`).
/// A file-path convenience wrapper lives alongside this for the CLI.
pub fn open(bytes: Vec<u8>, options: OpenOptions) -> Result<Document> {
    Document::open(bytes, options)
}

pub fn open_path(path: impl AsRef<std::path::Path>, options: OpenOptions) -> Result<Document> {
    let bytes = std::fs::read(path)?;
    Document::open(bytes, options)
}

/// Page-range and layout options shared by the extractors (`spec.md` §6).
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub first_page: usize,
    pub last_page: Option<usize>,
    pub layout: layout::LayoutMode,
    pub no_diagonal: bool,
    pub page_break: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { first_page: 1, last_page: None, layout: layout::LayoutMode::default(), no_diagonal: false, page_break: true }
    }
}

/// Walks a page range and interprets each page's content stream, yielding
/// one text string per page (`spec.md` §6 `TextExtractor`).
pub struct TextExtractor<'a> {
    doc: &'a Document,
    options: ExtractOptions,
}

impl<'a> TextExtractor<'a> {
    pub fn new(doc: &'a Document, options: ExtractOptions) -> Self {
        Self { doc, options }
    }

    /// Extracts text for every page in range, already joined per
    /// `page_break`.
    pub fn extract_all(&self) -> Result<String> {
        let never_abort = AtomicBool::new(false);
        let pages = self.doc.pages()?;
        let last = self.options.last_page.unwrap_or(pages.len()).min(pages.len());
        let mut out = Vec::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            if page_num < self.options.first_page || page_num > last {
                continue;
            }
            out.push(self.extract_page(page, &never_abort)?);
        }
        Ok(layout::join_pages(&out, self.options.page_break))
    }

    fn extract_page(&self, page: &document::Page, abort: &dyn content::AbortFlag) -> Result<String> {
        let content_bytes = self.page_content_bytes(page)?;
        let interp = content::Interpreter::new(self.doc);
        let ctm = rotation_matrix(page.rotate, page.media_box);
        let events = interp.run(&content_bytes, &page.resources, ctm, abort)?;
        let layout_opts = layout::TextLayoutOptions { mode: self.options.layout, no_diagonal: self.options.no_diagonal };
        Ok(layout::extract_text(&events.glyphs, &layout_opts))
    }

    fn page_content_bytes(&self, page: &document::Page) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        match page.dict.get("Contents") {
            Some(Object::Reference(r)) => append_stream_bytes(self.doc, &Object::Reference(*r), &mut out)?,
            Some(Object::Array(items)) => {
                for item in items {
                    append_stream_bytes(self.doc, item, &mut out)?;
                    out.push(b'\n');
                }
            }
            _ => {}
        }
        Ok(out)
    }
}

fn append_stream_bytes(doc: &Document, obj: &Object, out: &mut Vec<u8>) -> Result<()> {
    let resolved = doc.deref(obj)?;
    if let Some(stream) = resolved.as_stream() {
        out.extend_from_slice(&filters::decode(&stream.raw, &stream.dict)?);
    }
    Ok(())
}

/// `cm`-equivalent for page rotation: rotates about the media box origin so
/// text extraction sees an upright baseline regardless of `/Rotate`.
fn rotation_matrix(rotate: i64, media_box: [f64; 4]) -> content::graphics_state::Matrix {
    use content::graphics_state::Matrix;
    let (w, h) = (media_box[2] - media_box[0], media_box[3] - media_box[1]);
    match rotate {
        90 => Matrix { a: 0.0, b: 1.0, c: -1.0, d: 0.0, e: h, f: 0.0 },
        180 => Matrix { a: -1.0, b: 0.0, c: 0.0, d: -1.0, e: w, f: h },
        270 => Matrix { a: 0.0, b: -1.0, c: 1.0, d: 0.0, e: 0.0, f: w },
        _ => Matrix::IDENTITY,
    }
}

/// Enumerates and fetches image XObjects on a page range (`spec.md` §6
/// `ImageExtractor`).
pub struct ImageExtractor<'a> {
    doc: &'a Document,
}

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub page_index: usize,
    pub xobject_name: String,
    pub object_ref: object::ObjRef,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    pub fn images(&self, first_page: usize, last_page: usize) -> Result<Vec<ImageInfo>> {
        let pages = self.doc.pages()?;
        let mut out = Vec::new();
        for (idx, page) in pages.iter().enumerate() {
            let page_num = idx + 1;
            if page_num < first_page || page_num > last_page {
                continue;
            }
            let Some(xobjects) = page.resources.get("XObject").and_then(|o| self.doc.deref(o).ok()) else { continue };
            let Some(xobjects) = xobjects.as_dict() else { continue };
            for (name, entry) in xobjects.iter() {
                if let Object::Reference(r) = entry {
                    if let Ok(resolved) = self.doc.resolve(*r) {
                        if resolved.as_stream().map(|s| s.dict.get("Width").is_some()).unwrap_or(false) {
                            out.push(ImageInfo { page_index: page_num, xobject_name: name.as_str().into_owned(), object_ref: *r });
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn descriptor(&self, info: &ImageInfo) -> Result<image::ImageDescriptor> {
        let resolved = self.doc.resolve(info.object_ref)?;
        let stream = resolved.as_stream().ok_or_else(|| {
            PdfError::Parse(error::ParseContext::new(0, "image XObject is not a stream"))
        })?;
        image::describe_image(self.doc, stream, None)
    }
}

/// Extracts interactive form field values (`spec.md` §6 `FormExtractor`).
/// Acro form fields are a flat dictionary walk, not a content-stream
/// concern, so this stays independent of the interpreter.
pub struct FormExtractor<'a> {
    doc: &'a Document,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub name: String,
    pub value: Option<String>,
    pub field_type: Option<String>,
}

impl<'a> FormExtractor<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Self { doc }
    }

    pub fn fields(&self) -> Result<Vec<FormField>> {
        let catalog = self.doc.catalog()?;
        let Some(acro_form) = catalog.dict().get("AcroForm").and_then(|o| self.doc.deref(o).ok()) else {
            return Ok(Vec::new());
        };
        let Some(acro_form) = acro_form.as_dict() else { return Ok(Vec::new()) };
        let Some(fields) = acro_form.get("Fields").and_then(|o| o.as_array()) else { return Ok(Vec::new()) };

        let mut out = Vec::new();
        for f in fields {
            let Ok(resolved) = self.doc.deref(f) else { continue };
            let Some(dict) = resolved.as_dict() else { continue };
            let name = dict.get("T").and_then(|o| o.as_str_bytes()).map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default();
            let value = dict.get("V").and_then(|o| o.as_str_bytes()).map(|b| String::from_utf8_lossy(b).into_owned());
            let field_type = dict.get("FT").and_then(|o| o.as_name()).map(|n| n.as_str().into_owned());
            out.push(FormField { name, value, field_type });
        }
        Ok(out)
    }
}

/// File attachments reachable from `/Names /EmbeddedFiles` (`spec.md` §6
/// `AttachmentList`).
pub fn attachment_list(doc: &Document) -> Result<Vec<String>> {
    let catalog = doc.catalog()?;
    let Some(names) = catalog.dict().get("Names").and_then(|o| doc.deref(o).ok()) else { return Ok(Vec::new()) };
    let Some(names) = names.as_dict() else { return Ok(Vec::new()) };
    let Some(ef_tree) = names.get("EmbeddedFiles").and_then(|o| doc.deref(o).ok()) else { return Ok(Vec::new()) };
    let Some(ef_tree) = ef_tree.as_dict() else { return Ok(Vec::new()) };
    let Some(name_value_pairs) = ef_tree.get("Names").and_then(|o| o.as_array()) else { return Ok(Vec::new()) };

    Ok(name_value_pairs
        .chunks(2)
        .filter_map(|pair| pair.first())
        .filter_map(|o| o.as_str_bytes())
        .map(|b| String::from_utf8_lossy(b).into_owned())
        .collect())
}

/// Digital signature fields present in the AcroForm (validation itself is
/// an external collaborator's job, per `spec.md` §1 Non-goals — this only
/// surfaces the signed byte range and `/Contents`).
pub fn signatures(doc: &Document) -> Result<Vec<SignatureInfo>> {
    let form = FormExtractor::new(doc);
    let catalog = doc.catalog()?;
    let Some(acro_form) = catalog.dict().get("AcroForm").and_then(|o| doc.deref(o).ok()) else { return Ok(Vec::new()) };
    let Some(acro_form) = acro_form.as_dict() else { return Ok(Vec::new()) };
    let Some(fields) = acro_form.get("Fields").and_then(|o| o.as_array()) else { return Ok(Vec::new()) };

    let mut out = Vec::new();
    for f in fields {
        let Ok(resolved) = doc.deref(f) else { continue };
        let Some(dict) = resolved.as_dict() else { continue };
        if dict.get("FT").and_then(|o| o.as_name()).map(|n| n.as_str().into_owned()).as_deref() != Some("Sig") {
            continue;
        }
        let Some(v) = dict.get("V").and_then(|o| doc.deref(o).ok()) else { continue };
        let Some(v) = v.as_dict() else { continue };
        let byte_range = v.get("ByteRange").and_then(|o| o.as_array()).map(|a| a.iter().filter_map(|o| o.as_i64()).collect()).unwrap_or_default();
        out.push(SignatureInfo { byte_range, name: dict.get("T").and_then(|o| o.as_str_bytes()).map(|b| String::from_utf8_lossy(b).into_owned()) });
    }
    let _ = form;
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct SignatureInfo {
    pub name: Option<String>,
    pub byte_range: Vec<i64>,
}

/// Optional-content (layer) groups from `/OCProperties` (`spec.md` §6
/// `Layers`).
pub fn layers(doc: &Document) -> Result<Vec<String>> {
    let catalog = doc.catalog()?;
    let Some(oc_props) = catalog.dict().get("OCProperties").and_then(|o| doc.deref(o).ok()) else { return Ok(Vec::new()) };
    let Some(oc_props) = oc_props.as_dict() else { return Ok(Vec::new()) };
    let Some(ocgs) = oc_props.get("OCGs").and_then(|o| o.as_array()) else { return Ok(Vec::new()) };

    Ok(ocgs
        .iter()
        .filter_map(|o| doc.deref(o).ok())
        .filter_map(|d| d.as_dict().and_then(|d| d.get("Name").and_then(|o| o.as_str_bytes()).map(|b| String::from_utf8_lossy(b).into_owned())))
        .collect())
}

/// The write path: `AddAttachment`, `MergeDocuments`, `ExtractPage`,
/// `WriteToFile` (`spec.md` §6 `Writer`).
pub struct Writer;

impl Writer {
    pub fn add_attachment(doc: &Document, file_name: &str, mime_type: &str, data: &[u8]) -> Result<Vec<u8>> {
        write::add_attachment(doc, file_name, mime_type, data)
    }

    pub fn merge_documents(sources: &[&Document]) -> Result<Vec<u8>> {
        write::merge_documents(sources)
    }

    pub fn extract_page(doc: &Document, page_number: usize) -> Result<Vec<u8>> {
        write::extract_page(doc, page_number)
    }

    pub fn write_to_file(bytes: &[u8], path: &std::path::Path) -> Result<()> {
        write::write_to_file(bytes, path)
    }
}

use object::Object;

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let body = b"%PDF-1.4\n\
1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n\
3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >>\nendobj\n\
4 0 obj\n<< /Length 0 >>\nstream\n\nendstream\nendobj\n";
        let mut buf = body.to_vec();
        let xref_offset = buf.len();
        buf.extend_from_slice(b"xref\n0 5\n0000000000 65535 f \n");
        for off in [9usize, 58, 115, 219] {
            buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        buf.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\nstartxref\n");
        buf.extend_from_slice(format!("{}\n", xref_offset).as_bytes());
        buf.extend_from_slice(b"%%EOF");
        buf
    }

    #[test]
    fn empty_page_extracts_to_empty_string() {
        let doc = open(minimal_pdf(), OpenOptions::default()).unwrap();
        let extractor = TextExtractor::new(&doc, ExtractOptions::default());
        let text = extractor.extract_all().unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn no_attachments_by_default() {
        let doc = open(minimal_pdf(), OpenOptions::default()).unwrap();
        assert!(attachment_list(&doc).unwrap().is_empty());
    }
}
