//! Byte-level tokenizer for PDF syntax (`spec.md` §4.1).
//!
//! The lexer is restartable from any byte offset: parsing a PDF begins from
//! the tail of the file (the xref table), so every entry point takes an
//! explicit starting offset rather than assuming a forward-only stream.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    LiteralString(Vec<u8>),
    HexString(Vec<u8>),
    ArrayStart,
    ArrayEnd,
    DictStart,
    DictEnd,
    Keyword(Keyword),
    /// Any other alphabetic run: a content-stream operator or an unknown token.
    Operator(String),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    True,
    False,
    Null,
    R,
    Obj,
    EndObj,
    Stream,
    EndStream,
    Xref,
    Trailer,
    StartXref,
}

fn keyword_for(bytes: &[u8]) -> Option<Keyword> {
    Some(match bytes {
        b"true" => Keyword::True,
        b"false" => Keyword::False,
        b"null" => Keyword::Null,
        b"R" => Keyword::R,
        b"obj" => Keyword::Obj,
        b"endobj" => Keyword::EndObj,
        b"stream" => Keyword::Stream,
        b"endstream" => Keyword::EndStream,
        b"xref" => Keyword::Xref,
        b"trailer" => Keyword::Trailer,
        b"startxref" => Keyword::StartXref,
        _ => return None,
    })
}

pub fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// A restartable tokenizer over a random-access byte slice.
pub struct Lexer<'a> {
    pub buf: &'a [u8],
    pub pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Skips whitespace and `%`-to-EOL comments.
    pub fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if is_whitespace(b) => {
                    self.pos += 1;
                }
                Some(b'%') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' || b == b'\r' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Scans the single EOL sequence following the `stream` keyword, per
    /// `spec.md` §4.1: CRLF or LF are accepted; a bare CR is accepted with a
    /// warning (the caller is responsible for surfacing it). Returns the
    /// offset of the first payload byte.
    pub fn skip_stream_eol(&mut self) -> (usize, bool) {
        let mut warned = false;
        match self.peek() {
            Some(b'\r') => {
                self.pos += 1;
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                } else {
                    warned = true;
                }
            }
            Some(b'\n') => {
                self.pos += 1;
            }
            _ => {}
        }
        (self.pos, warned)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let Some(b) = self.peek() else { return Token::Eof };
        match b {
            b'/' => self.read_name(),
            b'(' => self.read_literal_string(),
            b'<' => {
                if self.buf.get(self.pos + 1) == Some(&b'<') {
                    self.pos += 2;
                    Token::DictStart
                } else {
                    self.read_hex_string()
                }
            }
            b'>' => {
                if self.buf.get(self.pos + 1) == Some(&b'>') {
                    self.pos += 2;
                    Token::DictEnd
                } else {
                    self.pos += 1;
                    Token::DictEnd
                }
            }
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number(),
            b if is_regular(b) => self.read_operator(),
            _ => {
                // unrecognized delimiter byte (e.g. stray `{`, `}`): skip it.
                self.pos += 1;
                self.next_token()
            }
        }
    }

    fn read_operator(&mut self) -> Token {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if is_regular(b) {
                self.pos += 1;
            } else {
                break;
            }
        }
        let bytes = &self.buf[start..self.pos];
        if let Some(kw) = keyword_for(bytes) {
            Token::Keyword(kw)
        } else {
            Token::Operator(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        let mut is_real = false;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        while let Some(b) = self.peek() {
            match b {
                b'0'..=b'9' => self.pos += 1,
                b'.' => {
                    is_real = true;
                    self.pos += 1;
                }
                // tolerate a stray second sign (`1-2` style malformed reals seen in the wild)
                b'-' | b'+' if self.pos > start => self.pos += 1,
                _ => break,
            }
        }
        let text = std::str::from_utf8(&self.buf[start..self.pos]).unwrap_or("0");
        if is_real {
            Token::Real(text.parse::<f64>().unwrap_or(0.0))
        } else {
            match text.parse::<i64>() {
                Ok(i) => Token::Integer(i),
                Err(_) => Token::Real(text.parse::<f64>().unwrap_or(0.0)),
            }
        }
    }

    fn read_name(&mut self) -> Token {
        self.pos += 1; // consume '/'
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            if !is_regular(b) {
                break;
            }
            if b == b'#' {
                if let (Some(h1), Some(h2)) = (self.buf.get(self.pos + 1), self.buf.get(self.pos + 2)) {
                    if let (Some(d1), Some(d2)) = (hex_digit(*h1), hex_digit(*h2)) {
                        out.push(d1 * 16 + d2);
                        self.pos += 3;
                        continue;
                    }
                }
            }
            out.push(b);
            self.pos += 1;
        }
        Token::Name(out)
    }

    fn read_literal_string(&mut self) -> Token {
        self.pos += 1; // consume '('
        let mut out = Vec::new();
        let mut depth = 1i32;
        while let Some(b) = self.bump() {
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(b);
                }
                b'\\' => match self.bump() {
                    Some(b'n') => out.push(b'\n'),
                    Some(b'r') => out.push(b'\r'),
                    Some(b't') => out.push(b'\t'),
                    Some(b'b') => out.push(0x08),
                    Some(b'f') => out.push(0x0C),
                    Some(b'(') => out.push(b'('),
                    Some(b')') => out.push(b')'),
                    Some(b'\\') => out.push(b'\\'),
                    Some(b'\r') => {
                        // line continuation; swallow an immediately-following LF too
                        if self.peek() == Some(b'\n') {
                            self.pos += 1;
                        }
                    }
                    Some(b'\n') => {}
                    Some(d @ b'0'..=b'7') => {
                        let mut val = (d - b'0') as u32;
                        for _ in 0..2 {
                            match self.peek() {
                                Some(o @ b'0'..=b'7') => {
                                    val = val * 8 + (o - b'0') as u32;
                                    self.pos += 1;
                                }
                                _ => break,
                            }
                        }
                        out.push((val & 0xFF) as u8);
                    }
                    Some(other) => out.push(other),
                    None => break,
                },
                other => out.push(other),
            }
        }
        Token::LiteralString(out)
    }

    fn read_hex_string(&mut self) -> Token {
        self.pos += 1; // consume '<'
        let mut nibbles = Vec::new();
        while let Some(b) = self.bump() {
            if b == b'>' {
                break;
            }
            if let Some(d) = hex_digit(b) {
                nibbles.push(d);
            }
        }
        if nibbles.len() % 2 == 1 {
            nibbles.push(0);
        }
        let bytes = nibbles.chunks_exact(2).map(|c| (c[0] << 4) | c[1]).collect();
        Token::HexString(bytes)
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &[u8]) -> Vec<Token> {
        let mut lx = Lexer::new(s);
        let mut out = Vec::new();
        loop {
            let t = lx.next_token();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        out
    }

    #[test]
    fn numbers() {
        assert_eq!(tokens(b"123 -45 3.14 -0.5"), vec![
            Token::Integer(123),
            Token::Integer(-45),
            Token::Real(3.14),
            Token::Real(-0.5),
        ]);
    }

    #[test]
    fn name_with_hex_escape() {
        assert_eq!(tokens(b"/Name#20With#23Hash"), vec![Token::Name(b"Name With#Hash".to_vec())]);
    }

    #[test]
    fn literal_string_escapes_and_octal() {
        assert_eq!(tokens(b"(Hi\\there\\050\\051)"), vec![Token::LiteralString(b"Hi\there()".to_vec())]);
    }

    #[test]
    fn hex_string_odd_nibble_padded() {
        assert_eq!(tokens(b"<4E6F7>"), vec![Token::HexString(vec![0x4E, 0x6F, 0x70])]);
    }

    #[test]
    fn dict_and_array_delimiters() {
        assert_eq!(tokens(b"<< /A [1 2] >>"), vec![
            Token::DictStart,
            Token::Name(b"A".to_vec()),
            Token::ArrayStart,
            Token::Integer(1),
            Token::Integer(2),
            Token::ArrayEnd,
            Token::DictEnd,
        ]);
    }

    #[test]
    fn keywords_recognized() {
        assert_eq!(tokens(b"1 0 obj endobj"), vec![
            Token::Integer(1),
            Token::Integer(0),
            Token::Keyword(Keyword::Obj),
            Token::Keyword(Keyword::EndObj),
        ]);
    }

    #[test]
    fn comment_skipped() {
        assert_eq!(tokens(b"1 % a comment\n2"), vec![Token::Integer(1), Token::Integer(2)]);
    }
}
