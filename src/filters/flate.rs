//! `FlateDecode`: zlib-wrapped DEFLATE, via `flate2` (the teacher's own
//! compression dependency).

use crate::error::{PdfError, Result};
use std::io::Read;

pub fn decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut dec = flate2::bufread::ZlibDecoder::new(data);
    match dec.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) => {
            // Some producers write raw DEFLATE without the zlib header.
            out.clear();
            let mut raw = flate2::bufread::DeflateDecoder::new(data);
            raw.read_to_end(&mut out).map_err(|_| PdfError::Filter {
                filter: "FlateDecode".into(),
                offset: 0,
                reason: e.to_string(),
            })?;
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn round_trips_zlib_payload() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"hello flate").unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(decode(&compressed).unwrap(), b"hello flate");
    }
}
