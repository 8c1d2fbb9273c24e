//! `LZWDecode` via the `weezl` crate, honoring `/EarlyChange` (`spec.md`
//! §4.4).

use crate::error::{PdfError, Result};
use weezl::decode::Decoder;
use weezl::BitOrder;

pub fn decode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    let mut decoder = if early_change {
        Decoder::new(BitOrder::Msb, 8)
    } else {
        Decoder::with_tiff_size_switch(BitOrder::Msb, 8)
    };
    decoder.decode(data).map_err(|e| PdfError::Filter {
        filter: "LZWDecode".into(),
        offset: 0,
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use weezl::encode::Encoder;

    #[test]
    fn round_trips() {
        let input = b"TOBEORNOTTOBEORTOBEORNOT".to_vec();
        let mut enc = Encoder::new(BitOrder::Msb, 8);
        let packed = enc.encode(&input).unwrap();
        let out = decode(&packed, true).unwrap();
        assert_eq!(out, input);
    }
}
