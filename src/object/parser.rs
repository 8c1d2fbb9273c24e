//! Recursive-descent parser building the typed [`Object`] tree from the
//! token stream (`spec.md` §4.2).

use super::lexer::{Keyword, Lexer, Token};
use super::{Dictionary, Name, Object, ObjRef, PdfString, Stream, StringFormat};

/// A recoverable parse event, recorded for diagnostic output rather than
/// aborting the parse (`spec.md` §4.2 "Recovery").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub offset: usize,
    pub message: String,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
    pub recoveries: Vec<Recovery>,
    /// Set when the dictionary just parsed was followed by a `stream`
    /// keyword; consumed by `parse_indirect_object` to slice the payload.
    pending_stream: bool,
}

impl<'a> Parser<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { lexer: Lexer::new(buf), peeked: None, recoveries: Vec::new(), pending_stream: false }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { lexer: Lexer::at(buf, pos), peeked: None, recoveries: Vec::new(), pending_stream: false }
    }

    pub fn pos(&self) -> usize {
        self.lexer.pos
    }

    fn bump(&mut self) -> Token {
        if let Some(t) = self.peeked.take() {
            return t;
        }
        self.lexer.next_token()
    }

    fn peek(&mut self) -> &Token {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token());
        }
        self.peeked.as_ref().unwrap()
    }

    fn record(&mut self, msg: impl Into<String>) {
        self.recoveries.push(Recovery { offset: self.lexer.pos, message: msg.into() });
    }

    /// Parses a single object. Two-integer lookahead disambiguates `n g R`
    /// references from two bare numbers.
    pub fn parse_object(&mut self) -> Object {
        let tok = self.bump();
        self.parse_object_from(tok)
    }

    fn parse_object_from(&mut self, tok: Token) -> Object {
        match tok {
            Token::Integer(i) => self.maybe_reference(i),
            Token::Real(r) => Object::Real(r),
            Token::Name(n) => Object::Name(Name(n)),
            Token::LiteralString(s) => Object::String(PdfString { bytes: s, format: StringFormat::Literal }),
            Token::HexString(s) => Object::String(PdfString { bytes: s, format: StringFormat::Hex }),
            Token::ArrayStart => self.parse_array(),
            Token::DictStart => self.parse_dict_or_stream(),
            Token::Keyword(Keyword::True) => Object::Boolean(true),
            Token::Keyword(Keyword::False) => Object::Boolean(false),
            Token::Keyword(Keyword::Null) => Object::Null,
            Token::Eof => Object::Null,
            other => {
                self.record(format!("unexpected token {other:?} while parsing object"));
                Object::Null
            }
        }
    }

    /// After an integer, look ahead for `g R` to build a [`Object::Reference`].
    fn maybe_reference(&mut self, num_tok: i64) -> Object {
        let save = (self.lexer.pos, self.peeked.clone());
        if let Token::Integer(g) = self.peek().clone() {
            self.bump();
            if matches!(self.peek(), Token::Keyword(Keyword::R)) {
                self.bump();
                if let (Ok(num), Ok(gen)) = (u32::try_from(num_tok), u16::try_from(g)) {
                    return Object::Reference(ObjRef::new(num, gen));
                }
            }
        }
        // not a reference: rewind
        self.lexer.pos = save.0;
        self.peeked = save.1;
        Object::Integer(num_tok)
    }

    fn parse_array(&mut self) -> Object {
        let mut items = Vec::new();
        loop {
            match self.peek().clone() {
                Token::ArrayEnd => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    self.record("unterminated array");
                    break;
                }
                _ => {
                    let tok = self.bump();
                    items.push(self.parse_object_from(tok));
                }
            }
        }
        Object::Array(items)
    }

    fn parse_dict_or_stream(&mut self) -> Object {
        let mut dict = Dictionary::new();
        loop {
            match self.peek().clone() {
                Token::DictEnd => {
                    self.bump();
                    break;
                }
                Token::Name(n) => {
                    self.bump();
                    let value = self.parse_object();
                    dict.insert(Name(n), value);
                }
                Token::Eof => {
                    self.record("unterminated dictionary");
                    break;
                }
                other => {
                    // Recovery: skip to next `>>` at this nesting depth.
                    self.record(format!("malformed dictionary entry, found {other:?}"));
                    self.bump();
                    self.skip_to_dict_end();
                    break;
                }
            }
        }

        if matches!(self.peek(), Token::Keyword(Keyword::Stream)) {
            self.bump();
            let (_payload_start, warned) = self.lexer.skip_stream_eol();
            if warned {
                self.record("stream keyword followed by bare CR");
            }
            self.pending_stream = true;
            Object::Dictionary(dict)
        } else {
            Object::Dictionary(dict)
        }
    }

    fn skip_to_dict_end(&mut self) {
        let mut depth = 1i32;
        loop {
            match self.bump() {
                Token::DictStart => depth += 1,
                Token::DictEnd => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Token::Eof => break,
                _ => {}
            }
        }
    }

    /// Parses `n g obj ... endobj`. When the object is a stream, the raw
    /// payload is sliced using the dictionary's resolved `Length` if it is a
    /// direct integer; an indirect `Length` (or a mismatching one) is left
    /// for the xref resolver to re-slice via [`Self::reslice_stream`], per
    /// `spec.md` §4.1's "scan for endstream" fallback.
    pub fn parse_indirect_object(&mut self) -> Option<(ObjRef, Object)> {
        let num = match self.bump() {
            Token::Integer(i) if i >= 0 => i as u32,
            other => {
                self.record(format!("expected object number, found {other:?}"));
                return None;
            }
        };
        let gen = match self.bump() {
            Token::Integer(i) if i >= 0 => i as u16,
            other => {
                self.record(format!("expected generation number, found {other:?}"));
                return None;
            }
        };
        if !matches!(self.bump(), Token::Keyword(Keyword::Obj)) {
            self.record("expected 'obj' keyword");
            return None;
        }
        self.pending_stream = false;
        let obj = self.parse_object();

        let obj = if self.pending_stream {
            let payload_start = self.lexer.pos;
            let Object::Dictionary(dict) = obj else { unreachable!("pending_stream only set after a dictionary") };
            let length = dict.get("Length").and_then(|o| o.as_i64()).filter(|&l| l >= 0);
            let raw = match length {
                Some(len) if payload_start + len as usize <= self.lexer.buf.len() => {
                    let end = payload_start + len as usize;
                    if self.buf_has_endstream_near(end) {
                        self.lexer.pos = end;
                        self.lexer.buf[payload_start..end].to_vec()
                    } else {
                        self.scan_to_endstream(payload_start)
                    }
                }
                _ => self.scan_to_endstream(payload_start),
            };
            Object::Stream(Stream::new(dict, raw))
        } else {
            obj
        };

        // Consume up to `endobj`, recovering from trailing garbage.
        loop {
            match self.peek().clone() {
                Token::Keyword(Keyword::EndObj) => {
                    self.bump();
                    break;
                }
                Token::Eof => {
                    self.record("missing endobj");
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }

        Some((ObjRef::new(num, gen), obj))
    }

    /// `Length` lied (or was indirect and unresolved at parse time): scan
    /// forward for `endstream`, tolerating trailing whitespace/EOL before it.
    fn scan_to_endstream(&mut self, payload_start: usize) -> Vec<u8> {
        self.record("stream Length mismatch, re-scanning for endstream");
        let buf = self.lexer.buf;
        let needle = b"endstream";
        let mut i = payload_start;
        while i + needle.len() <= buf.len() {
            if &buf[i..i + needle.len()] == needle {
                let mut end = i;
                while end > payload_start && matches!(buf[end - 1], b'\r' | b'\n') {
                    end -= 1;
                }
                self.lexer.pos = i + needle.len();
                return buf[payload_start..end].to_vec();
            }
            i += 1;
        }
        self.lexer.pos = buf.len();
        buf[payload_start..].to_vec()
    }

    fn buf_has_endstream_near(&self, end: usize) -> bool {
        let buf = self.lexer.buf;
        let window_end = (end + 32).min(buf.len());
        if end > window_end {
            return false;
        }
        buf[end..window_end].windows(9).any(|w| w == b"endstream")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_reference() {
        let mut p = Parser::new(b"12 0 R");
        assert_eq!(p.parse_object(), Object::Reference(ObjRef::new(12, 0)));
    }

    #[test]
    fn two_bare_integers_are_not_a_reference() {
        let mut p = Parser::new(b"12 13");
        assert_eq!(p.parse_object(), Object::Integer(12));
    }

    #[test]
    fn parses_nested_dict_and_array() {
        let mut p = Parser::new(b"<< /A [1 2 /B] /C << /D true >> >>");
        let obj = p.parse_object();
        let d = obj.as_dict().unwrap();
        assert_eq!(d.get("A").unwrap().as_array().unwrap().len(), 3);
        assert_eq!(d.get("C").unwrap().as_dict().unwrap().get("D"), Some(&Object::Boolean(true)));
    }

    #[test]
    fn recovers_from_malformed_dict_entry() {
        let mut p = Parser::new(b"<< /A 1 ]] /B 2 >>");
        let obj = p.parse_object();
        assert!(!p.recoveries.is_empty());
        let _ = obj;
    }

    #[test]
    fn parses_indirect_object_and_endobj() {
        let mut p = Parser::new(b"7 0 obj << /Type /Catalog >> endobj");
        let (id, obj) = p.parse_indirect_object().unwrap();
        assert_eq!(id, ObjRef::new(7, 0));
        assert_eq!(obj.as_dict().unwrap().type_name().as_deref(), Some("Catalog"));
    }

    #[test]
    fn parses_stream_with_correct_length() {
        let mut p = Parser::new(b"1 0 obj << /Length 5 >> stream\nhello\nendstream endobj");
        let (id, obj) = p.parse_indirect_object().unwrap();
        assert_eq!(id, ObjRef::new(1, 0));
        assert_eq!(obj.as_stream().unwrap().raw, b"hello");
    }

    #[test]
    fn parses_stream_with_wrong_length_via_rescan() {
        let mut p = Parser::new(b"1 0 obj << /Length 999 >> stream\nhello\nendstream endobj");
        let (_, obj) = p.parse_indirect_object().unwrap();
        assert_eq!(obj.as_stream().unwrap().raw, b"hello");
        assert!(!p.recoveries.is_empty());
    }
}
