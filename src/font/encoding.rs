//! The three named simple-font encodings plus `/Differences` overlay
//! (`spec.md` §4.7).

/// 256-entry code -> glyph name table, `None` for unused codes.
pub type EncodingTable = [Option<&'static str>; 256];

pub fn standard_encoding() -> EncodingTable {
    build(ASCII)
}

pub fn win_ansi_encoding() -> EncodingTable {
    let mut table = build(ASCII);
    apply(&mut table, WIN_ANSI_HIGH);
    table
}

pub fn mac_roman_encoding() -> EncodingTable {
    let mut table = build(ASCII);
    apply(&mut table, MAC_ROMAN_HIGH);
    table
}

fn build(pairs: &[(u8, &'static str)]) -> EncodingTable {
    let mut table: EncodingTable = [None; 256];
    apply(&mut table, pairs);
    table
}

fn apply(table: &mut EncodingTable, pairs: &[(u8, &'static str)]) {
    for &(code, name) in pairs {
        table[code as usize] = Some(name);
    }
}

/// Applies a `/Differences` array (alternating code, name, name, name...) on
/// top of a base encoding table. Glyph names are interned for the process
/// lifetime, matching the base tables' `'static` names.
pub fn apply_differences(base: &mut EncodingTable, differences: &[crate::object::Object]) {
    let mut code: usize = 0;
    for item in differences {
        match item {
            crate::object::Object::Integer(n) => code = (*n).max(0) as usize,
            crate::object::Object::Name(n) => {
                if code < 256 {
                    let leaked: &'static str = Box::leak(n.as_str().into_owned().into_boxed_str());
                    base[code] = Some(leaked);
                    code += 1;
                }
            }
            _ => {}
        }
    }
}

// The printable ASCII range (0x20-0x7E) is identical across StandardEncoding,
// WinAnsiEncoding, and MacRomanEncoding; only the high half differs.
const ASCII: &[(u8, &str)] = &[
    (0x20, "space"), (0x21, "exclam"), (0x22, "quotedbl"), (0x23, "numbersign"),
    (0x24, "dollar"), (0x25, "percent"), (0x26, "ampersand"), (0x27, "quotesingle"),
    (0x28, "parenleft"), (0x29, "parenright"), (0x2A, "asterisk"), (0x2B, "plus"),
    (0x2C, "comma"), (0x2D, "hyphen"), (0x2E, "period"), (0x2F, "slash"),
    (0x30, "zero"), (0x31, "one"), (0x32, "two"), (0x33, "three"), (0x34, "four"),
    (0x35, "five"), (0x36, "six"), (0x37, "seven"), (0x38, "eight"), (0x39, "nine"),
    (0x3A, "colon"), (0x3B, "semicolon"), (0x3C, "less"), (0x3D, "equal"),
    (0x3E, "greater"), (0x3F, "question"), (0x40, "at"),
    (0x41, "A"), (0x42, "B"), (0x43, "C"), (0x44, "D"), (0x45, "E"), (0x46, "F"),
    (0x47, "G"), (0x48, "H"), (0x49, "I"), (0x4A, "J"), (0x4B, "K"), (0x4C, "L"),
    (0x4D, "M"), (0x4E, "N"), (0x4F, "O"), (0x50, "P"), (0x51, "Q"), (0x52, "R"),
    (0x53, "S"), (0x54, "T"), (0x55, "U"), (0x56, "V"), (0x57, "W"), (0x58, "X"),
    (0x59, "Y"), (0x5A, "Z"),
    (0x5B, "bracketleft"), (0x5C, "backslash"), (0x5D, "bracketright"),
    (0x5E, "asciicircum"), (0x5F, "underscore"), (0x60, "grave"),
    (0x61, "a"), (0x62, "b"), (0x63, "c"), (0x64, "d"), (0x65, "e"), (0x66, "f"),
    (0x67, "g"), (0x68, "h"), (0x69, "i"), (0x6A, "j"), (0x6B, "k"), (0x6C, "l"),
    (0x6D, "m"), (0x6E, "n"), (0x6F, "o"), (0x70, "p"), (0x71, "q"), (0x72, "r"),
    (0x73, "s"), (0x74, "t"), (0x75, "u"), (0x76, "v"), (0x77, "w"), (0x78, "x"),
    (0x79, "y"), (0x7A, "z"),
    (0x7B, "braceleft"), (0x7C, "bar"), (0x7D, "braceright"), (0x7E, "asciitilde"),
];

const WIN_ANSI_HIGH: &[(u8, &str)] = &[
    (0x91, "quoteleft"), (0x92, "quoteright"), (0x93, "quotedblleft"), (0x94, "quotedblright"),
    (0x95, "bullet"), (0x96, "endash"), (0x97, "emdash"), (0xA0, "space"),
    (0xA9, "copyright"), (0xAE, "registered"), (0xE8, "egrave"), (0xE9, "eacute"),
    (0xE7, "ccedilla"), (0xFC, "udieresis"),
];

const MAC_ROMAN_HIGH: &[(u8, &str)] = &[
    (0x8E, "eacute"), (0x8F, "egrave"), (0xA5, "bullet"), (0xCA, "space"),
    (0xD0, "emdash"), (0xD1, "endash"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_maps_ascii_letters() {
        let enc = standard_encoding();
        assert_eq!(enc[b'A' as usize], Some("A"));
        assert_eq!(enc[b' ' as usize], Some("space"));
    }

    #[test]
    fn win_ansi_adds_high_range() {
        let enc = win_ansi_encoding();
        assert_eq!(enc[0x93], Some("quotedblleft"));
    }

    #[test]
    fn differences_override_base() {
        let mut enc = standard_encoding();
        let diffs = vec![
            crate::object::Object::Integer(65),
            crate::object::Object::Name("Agrave".into()),
        ];
        apply_differences(&mut enc, &diffs);
        assert_eq!(enc[65], Some("Agrave"));
    }
}
