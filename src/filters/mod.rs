//! Stream filter chain (`spec.md` §4.4). A filter is a pure byte-sequence
//! transformer; failures carry the offset/reason needed for diagnostics but
//! never panic on malformed input.

mod ascii85;
mod ascii_hex;
mod ccitt;
mod flate;
mod jbig2;
mod lzw;
mod predictor;
mod run_length;

use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Object};

pub use ccitt::CcittParams;
pub use jbig2::Jbig2Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    AsciiHex,
    Ascii85,
    Lzw,
    Flate,
    RunLength,
    CcittFax,
    Jbig2,
    Dct,
    Jpx,
    Crypt,
}

impl Filter {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ASCIIHexDecode" | "AHx" => Filter::AsciiHex,
            "ASCII85Decode" | "A85" => Filter::Ascii85,
            "LZWDecode" | "LZW" => Filter::Lzw,
            "FlateDecode" | "Fl" => Filter::Flate,
            "RunLengthDecode" | "RL" => Filter::RunLength,
            "CCITTFaxDecode" | "CCF" => Filter::CcittFax,
            "JBIG2Decode" => Filter::Jbig2,
            "DCTDecode" | "DCT" => Filter::Dct,
            "JPXDecode" => Filter::Jpx,
            "Crypt" => Filter::Crypt,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::AsciiHex => "ASCIIHexDecode",
            Filter::Ascii85 => "ASCII85Decode",
            Filter::Lzw => "LZWDecode",
            Filter::Flate => "FlateDecode",
            Filter::RunLength => "RunLengthDecode",
            Filter::CcittFax => "CCITTFaxDecode",
            Filter::Jbig2 => "JBIG2Decode",
            Filter::Dct => "DCTDecode",
            Filter::Jpx => "JPXDecode",
            Filter::Crypt => "Crypt",
        }
    }

    /// Whether this filter's output is meant for the core to decode further
    /// (true text/bitmap data) vs. a native codec stream handed unchanged to
    /// an external image pipeline (`spec.md` §4.9).
    pub fn is_image_passthrough(&self) -> bool {
        matches!(self, Filter::Dct | Filter::Jpx | Filter::Jbig2 | Filter::CcittFax)
    }
}

/// Reads the `/Filter` and `/DecodeParms` entries of a stream dictionary
/// into a list of (filter, params) pairs in application order.
pub fn filter_chain(dict: &Dictionary) -> Vec<(Filter, Dictionary)> {
    let filters = match dict.get("Filter") {
        Some(Object::Name(n)) => vec![n.as_str().into_owned()],
        Some(Object::Array(a)) => a.iter().filter_map(|o| o.as_name().map(|n| n.as_str().into_owned())).collect(),
        _ => vec![],
    };
    let parms: Vec<Option<Dictionary>> = match dict.get("DecodeParms").or_else(|| dict.get("DP")) {
        Some(Object::Dictionary(d)) => vec![Some(d.clone())],
        Some(Object::Array(a)) => a
            .iter()
            .map(|o| o.as_dict().cloned())
            .collect(),
        _ => vec![],
    };

    filters
        .into_iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let kind = Filter::from_name(&name)?;
            let parm = parms.get(i).cloned().flatten().unwrap_or_default();
            Some((kind, parm))
        })
        .collect()
}

/// Applies the stream's filter chain to `raw`, stopping at (and returning
/// unchanged) the first filter whose output is an image passthrough format,
/// since those payloads are handed to an external codec rather than decoded
/// further here.
pub fn decode(raw: &[u8], dict: &Dictionary) -> Result<Vec<u8>> {
    let chain = filter_chain(dict);
    let mut data = raw.to_vec();
    for (filter, parms) in chain {
        if filter.is_image_passthrough() || filter == Filter::Crypt {
            break;
        }
        data = apply_one(filter, &data, &parms)?;
    }
    Ok(data)
}

fn apply_one(filter: Filter, data: &[u8], parms: &Dictionary) -> Result<Vec<u8>> {
    let decoded = match filter {
        Filter::AsciiHex => ascii_hex::decode(data),
        Filter::Ascii85 => ascii85::decode(data),
        Filter::Lzw => lzw::decode(data, lzw_early_change(parms)),
        Filter::Flate => flate::decode(data),
        Filter::RunLength => run_length::decode(data),
        Filter::CcittFax | Filter::Jbig2 | Filter::Dct | Filter::Jpx | Filter::Crypt => {
            return Err(PdfError::Filter {
                filter: filter.name().into(),
                offset: 0,
                reason: "passthrough filter reached the decode stage".into(),
            })
        }
    }?;
    predictor::apply(decoded, parms)
}

fn lzw_early_change(parms: &Dictionary) -> bool {
    parms.get("EarlyChange").and_then(|o| o.as_i64()).map(|v| v != 0).unwrap_or(true)
}
