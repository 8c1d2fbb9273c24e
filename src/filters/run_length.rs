//! `RunLengthDecode`: a length byte `0..=127` copies `len+1` literal bytes,
//! `129..=255` repeats the next byte `257-len` times, `128` is EOD
//! (`spec.md` §4.4).

use crate::error::Result;

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            0..=127 => {
                let n = len as usize + 1;
                let end = (i + n).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            128 => break,
            _ => {
                let n = 257 - len as usize;
                if let Some(&b) = data.get(i) {
                    out.extend(std::iter::repeat(b).take(n));
                    i += 1;
                }
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_run() {
        assert_eq!(decode(&[2, b'a', b'b', b'c', 128]).unwrap(), b"abc");
    }

    #[test]
    fn repeat_run() {
        assert_eq!(decode(&[255, b'x', 128]).unwrap(), b"xx");
    }
}
