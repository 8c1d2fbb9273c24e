//! End-to-end scenarios driven entirely through hand-built PDF byte buffers,
//! exercising the public API the way a caller would: `pdfkit::open` followed
//! by extraction or write operations.

use pdfkit::layout::LayoutMode;
use pdfkit::{ExtractOptions, OpenOptions, TextExtractor};

/// Accumulates indirect objects and renders a classic-xref PDF, tracking
/// each object's byte offset as it's appended rather than hardcoding them.
struct PdfBuilder {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfBuilder {
    fn new(header: &[u8]) -> Self {
        Self { buf: header.to_vec(), offsets: vec![0] }
    }

    /// Appends `N 0 obj\n<body>\nendobj\n`, returning its object number.
    fn push(&mut self, body: &[u8]) -> u32 {
        let num = self.offsets.len() as u32;
        self.offsets.push(self.buf.len());
        self.buf.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
        num
    }

    /// Appends a stream object and returns its object number.
    fn push_stream(&mut self, dict_without_length: &str, raw: &[u8]) -> u32 {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict_without_length, raw.len()).into_bytes();
        body.extend_from_slice(raw);
        body.extend_from_slice(b"\nendstream");
        self.push(&body)
    }

    fn finish(mut self, root: u32) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let count = self.offsets.len();
        self.buf.extend_from_slice(format!("xref\n0 {}\n", count).as_bytes());
        self.buf.extend_from_slice(b"0000000000 65535 f \n");
        for &off in &self.offsets[1..] {
            self.buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        self.buf.extend_from_slice(format!("trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF", count, root, xref_offset).as_bytes());
        self.buf
    }

    fn finish_with_trailer_extra(mut self, root: u32, extra: &str) -> Vec<u8> {
        let xref_offset = self.buf.len();
        let count = self.offsets.len();
        self.buf.extend_from_slice(format!("xref\n0 {}\n", count).as_bytes());
        self.buf.extend_from_slice(b"0000000000 65535 f \n");
        for &off in &self.offsets[1..] {
            self.buf.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        self.buf.extend_from_slice(
            format!("trailer\n<< /Size {} /Root {} 0 R {} >>\nstartxref\n{}\n%%EOF", count, root, extra, xref_offset).as_bytes(),
        );
        self.buf
    }
}

fn simple_font_obj(b: &mut PdfBuilder) -> u32 {
    let widths = (0..96).map(|_| "500").collect::<Vec<_>>().join(" ");
    b.push(format!("<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /FirstChar 32 /LastChar 127 /Widths [{widths}] >>").as_bytes())
}

/// S1: a minimal 4-object document opens cleanly via the classic xref path,
/// with no repair needed and exactly one page.
#[test]
fn s1_minimal_document_opens_without_repair() {
    let mut b = PdfBuilder::new(b"%PDF-1.4\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    let _pages = b.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    let _page = b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
    let bytes = b.finish(catalog);

    let doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();
    assert!(!doc.used_repair);
    assert_eq!(doc.num_pages().unwrap(), 1);
}

/// S2: a PDF 1.5 document whose only cross-reference structure is a
/// `/Type /XRef` stream (no classic `xref` table, no classic `trailer`
/// keyword) resolves every object and walks the page tree correctly.
#[test]
fn s2_xref_stream_only_document_resolves_pages() {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut buf = b"%PDF-1.5\n".to_vec();
    let mut offsets = vec![0usize];

    offsets.push(buf.len());
    buf.extend_from_slice(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n");
    offsets.push(buf.len());
    buf.extend_from_slice(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n");
    offsets.push(buf.len());
    buf.extend_from_slice(b"3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>\nendobj\n");

    let xref_obj_offset = buf.len();
    offsets.push(xref_obj_offset);

    // Build the W[1 2 1]-packed records for objects 0..=4 (4 is the xref
    // stream itself), type 0/free for 0, type 1/in-use with a byte offset
    // for the rest.
    let mut records = Vec::new();
    records.push((0u8, 0u32, 65535u32));
    for &off in &offsets[1..] {
        records.push((1, off as u32, 0));
    }
    records.push((1, xref_obj_offset as u32, 0));

    let mut raw = Vec::new();
    for (kind, f2, f3) in records {
        raw.push(kind);
        raw.extend_from_slice(&f2.to_be_bytes()[2..]);
        raw.push(f3 as u8);
    }
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&raw).unwrap();
    let compressed = enc.finish().unwrap();

    buf.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /W [1 2 1] /Size 5 /Root 1 0 R /Filter /FlateDecode /Length {} >>\nstream\n",
            compressed.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&compressed);
    buf.extend_from_slice(b"\nendstream\nendobj\n");
    buf.extend_from_slice(format!("startxref\n{}\n%%EOF", xref_obj_offset).as_bytes());

    let doc = pdfkit::open(buf, OpenOptions::default()).unwrap();
    assert!(!doc.used_repair);
    assert_eq!(doc.num_pages().unwrap(), 1);
    assert_eq!(doc.catalog().unwrap().dict().get("Pages").and_then(|o| o.as_reference()).unwrap().num, 2);
}

/// S3 (`spec.md` §8): an encrypted (`/V 4 /R 4`, AES-128) document with a
/// real owner password `"owner"` and user password `"user"` opens without
/// a password, reports `Info().Encrypted == true`, and refuses to decrypt
/// its content stream (`PdfError::Auth`); after `Document::decrypt(b"user")`
/// it reads back the original plaintext. `/O`, `/U`, the object key, and the
/// ciphertext were precomputed offline against the exact algorithm
/// `crypto::standard` implements (Algorithm 2 legacy key derivation with the
/// 50-round R4 hardening, object key salted with `"sAlT"`, AES-128-CBC/PKCS7
/// with a leading IV).
#[test]
fn s3_encrypted_document_decrypts_content_stream() {
    const ID0: [u8; 16] = [0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F];
    const O: [u8; 32] = [
        0x0B, 0xA3, 0x83, 0x5F, 0x88, 0xF9, 0x03, 0x88, 0xE7, 0x4E, 0x54, 0x58, 0x41, 0x25, 0xCE, 0x14, 0x2B, 0xE0, 0xDE, 0x24, 0xC6, 0xB0,
        0xD3, 0x77, 0x46, 0xE0, 0x75, 0xB8, 0x91, 0x75, 0x66, 0x71,
    ];
    const U: [u8; 32] = [
        0xB5, 0xEE, 0xEE, 0x15, 0xD9, 0x56, 0x1A, 0x1F, 0xAD, 0x6C, 0x9D, 0x5A, 0x19, 0x5D, 0xDE, 0x33, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    const PLAINTEXT: &[u8] = b"BT /F1 12 Tf 72 700 Td (Hi) Tj ET";
    // IV (16 bytes) || AES-128-CBC/PKCS7 ciphertext of PLAINTEXT under the
    // object key for (obj 4, gen 0), itself derived from the legacy
    // Algorithm 2 file key for password="user", O=O, P=-4, ID0=ID0, R=4.
    const PAYLOAD: [u8; 64] = [
        0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0x33, 0xDC, 0x42, 0x82, 0x25, 0xC3, 0xA0,
        0xE8, 0x10, 0x3C, 0x33, 0x72, 0xE1, 0xC0, 0x1A, 0x2D, 0x77, 0xA2, 0x7E, 0x46, 0x12, 0x55, 0xB4, 0xED, 0xEF, 0x95, 0x48, 0x01, 0xC0,
        0x29, 0x98, 0xDC, 0x6F, 0x97, 0x3D, 0x84, 0x6E, 0x15, 0x1E, 0x7A, 0xDA, 0x02, 0x1E, 0x9B, 0xE5, 0x0E, 0xE7, 0xE3, 0x2D,
    ];

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }

    let mut b = PdfBuilder::new(b"%PDF-1.6\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    b.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >>");
    b.push_stream_raw(&PAYLOAD);
    b.push(
        format!(
            "<< /Filter /Standard /V 4 /R 4 /Length 128 /P -4 /O <{}> /U <{}> \
             /CF << /StdCF << /CFM /AESV2 /AuthEvent /DocOpen /Length 16 >> >> /StmF /StdCF /StrF /StdCF >>",
            hex(&O),
            hex(&U)
        )
        .as_bytes(),
    );

    let bytes = b.finish_with_trailer_extra(catalog, &format!("/Encrypt 5 0 R /ID [<{0}> <{0}>]", hex(&ID0)));

    let mut doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();
    assert!(doc.metadata().encrypted());

    let err = doc.resolve(pdfkit::object::ObjRef::new(4, 0)).unwrap_err();
    assert!(matches!(err, pdfkit::PdfError::Auth));

    doc.decrypt(b"user").unwrap();
    let content = doc.resolve(pdfkit::object::ObjRef::new(4, 0)).unwrap();
    let stream = content.as_stream().unwrap();
    assert_eq!(stream.raw, PLAINTEXT);
}

impl PdfBuilder {
    /// Appends a stream object whose `/Length` is fixed up to `raw.len()`
    /// but whose dictionary is otherwise empty, for a stream (like an
    /// encrypted content stream) that only needs `/Length`.
    fn push_stream_raw(&mut self, raw: &[u8]) -> u32 {
        self.push_stream("", raw)
    }
}

/// S4: a Type0/Identity-H CID font whose `/ToUnicode` CMap maps two 2-byte
/// codes to CJK text extracts that text in document order. (A named
/// predefined CMap like `GBK-EUC-H` is not exercised here: this crate only
/// vendors the trivial `Identity-H`/`Identity-V` byte=CID mappings, per
/// `data`'s documented gap — the code-to-CID path under test is the one
/// this crate actually implements.)
#[test]
fn s4_type0_font_extracts_cjk_text_via_tounicode() {
    let mut b = PdfBuilder::new(b"%PDF-1.5\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    b.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 6 0 R >> >> >>");

    let content = b"BT /F1 12 Tf 100 700 Td <D6D0CEC4> Tj ET";
    b.push_stream("", content);

    b.push(b"<< /Type /Font /Subtype /Type0 /BaseFont /STSong /Encoding /Identity-H /DescendantFonts [7 0 R] /ToUnicode 8 0 R >>");

    let to_unicode = b"/CIDInit /ProcSet findresource begin\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n2 beginbfchar\n<D6D0> <4E2D>\n<CEC4> <6587>\nendbfchar\nend";
    b.push_stream("", to_unicode);

    b.push(b"<< /Type /Font /Subtype /CIDFontType2 /BaseFont /STSong /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> /DW 1000 /CIDToGIDMap /Identity >>");

    let bytes = b.finish(catalog);
    let doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();
    let text = TextExtractor::new(&doc, ExtractOptions::default()).extract_all().unwrap();
    assert_eq!(text, "中文");
}

/// S5: two runs of text at the same baseline but far apart on the x axis
/// read back as two separated columns; `-layout` mode pads with enough
/// space to approximate the original column gap instead of collapsing it
/// to one space.
#[test]
fn s5_multi_column_layout_separates_columns() {
    let mut b = PdfBuilder::new(b"%PDF-1.4\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    b.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>");

    let content = b"BT /F1 12 Tf 50 700 Td (Left) Tj ET\nBT /F1 12 Tf 320 700 Td (Right) Tj ET";
    b.push_stream("", content);
    simple_font_obj(&mut b);

    let bytes = b.finish(catalog);
    let doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();

    let physical = TextExtractor::new(&doc, ExtractOptions { layout: LayoutMode::Physical, ..ExtractOptions::default() }).extract_all().unwrap();
    assert_eq!(physical, "Left Right");

    let layout = TextExtractor::new(&doc, ExtractOptions { layout: LayoutMode::Layout, ..ExtractOptions::default() }).extract_all().unwrap();
    assert!(layout.starts_with("Left"));
    assert!(layout.ends_with("Right"));
    assert!(layout.len() > physical.len(), "layout mode should pad the column gap with more than one space");
}

/// S6: a document whose `startxref` offset points at garbage still opens,
/// via the linear-scan repair path, and reports that repair happened.
#[test]
fn s6_wrong_startxref_offset_triggers_repair() {
    let mut b = PdfBuilder::new(b"%PDF-1.4\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    b.push(b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
    let mut bytes = b.finish(catalog);

    // Corrupt the startxref target so the classic walk lands on garbage.
    let pos = bytes.windows(9).position(|w| w == b"startxref").unwrap();
    let garbage = b"startxref\n999999\n";
    bytes.splice(pos..bytes.len(), garbage.iter().copied());
    bytes.extend_from_slice(b"%%EOF");

    let doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();
    assert!(doc.used_repair);
    assert!(!doc.diagnostics.borrow().messages.is_empty());
    assert_eq!(doc.num_pages().unwrap(), 1);
}

/// `Writer::extract_page` / `Writer::merge_documents` round-trip through
/// `pdfkit::open` again, exercising the write path end to end.
#[test]
fn writer_extract_and_merge_round_trip() {
    let mut b = PdfBuilder::new(b"%PDF-1.4\n");
    let catalog = b.push(b"<< /Type /Catalog /Pages 2 0 R >>");
    b.push(b"<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
    b.push(b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
    let bytes = b.finish(catalog);

    let doc = pdfkit::open(bytes, OpenOptions::default()).unwrap();
    assert_eq!(doc.num_pages().unwrap(), 2);

    let extracted = pdfkit::Writer::extract_page(&doc, 2).unwrap();
    let extracted_doc = pdfkit::open(extracted, OpenOptions::default()).unwrap();
    assert_eq!(extracted_doc.num_pages().unwrap(), 1);

    let merged = pdfkit::Writer::merge_documents(&[&doc, &extracted_doc]).unwrap();
    let merged_doc = pdfkit::open(merged, OpenOptions::default()).unwrap();
    assert_eq!(merged_doc.num_pages().unwrap(), 3);
}
