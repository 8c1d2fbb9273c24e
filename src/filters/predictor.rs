//! PNG and TIFF row predictors applied after LZW/Flate decoding
//! (`spec.md` §4.4). `/Predictor` values: 1 = none, 2 = TIFF, 10-15 = PNG
//! (the tag byte prefixed to each row selects the actual PNG filter).

use crate::error::{PdfError, Result};
use crate::object::Dictionary;

pub fn apply(data: Vec<u8>, parms: &Dictionary) -> Result<Vec<u8>> {
    let predictor = parms.get("Predictor").and_then(|o| o.as_i64()).unwrap_or(1);
    if predictor <= 1 {
        return Ok(data);
    }
    let colors = parms.get("Colors").and_then(|o| o.as_i64()).unwrap_or(1).max(1) as usize;
    let bpc = parms.get("BitsPerComponent").and_then(|o| o.as_i64()).unwrap_or(8).max(1) as usize;
    let columns = parms.get("Columns").and_then(|o| o.as_i64()).unwrap_or(1).max(1) as usize;
    let bytes_per_pixel = (colors * bpc + 7) / 8;
    let row_bytes = (colors * bpc * columns + 7) / 8;

    if predictor == 2 {
        return Ok(tiff_predictor(data, bytes_per_pixel, row_bytes));
    }
    png_predictor(data, bytes_per_pixel, row_bytes)
}

fn tiff_predictor(mut data: Vec<u8>, bpp: usize, row_bytes: usize) -> Vec<u8> {
    for row in data.chunks_mut(row_bytes) {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
    data
}

fn png_predictor(data: Vec<u8>, bpp: usize, row_bytes: usize) -> Result<Vec<u8>> {
    let stride = row_bytes + 1;
    if stride == 0 || data.len() % stride != 0 {
        return Err(PdfError::Filter {
            filter: "Predictor".into(),
            offset: 0,
            reason: "PNG-predicted data is not a whole number of tagged rows".into(),
        });
    }
    let mut out = Vec::with_capacity(data.len() / stride * row_bytes);
    let mut prev = vec![0u8; row_bytes];
    for raw_row in data.chunks_exact(stride) {
        let tag = raw_row[0];
        let mut row = raw_row[1..].to_vec();
        for i in 0..row.len() {
            let a = if i >= bpp { row[i - bpp] } else { 0 };
            let b = prev[i];
            let c = if i >= bpp { prev[i - bpp] } else { 0 };
            row[i] = match tag {
                0 => row[i],
                1 => row[i].wrapping_add(a),
                2 => row[i].wrapping_add(b),
                3 => row[i].wrapping_add(((a as u16 + b as u16) / 2) as u8),
                4 => row[i].wrapping_add(paeth(a, b, c)),
                _ => row[i],
            };
        }
        out.extend_from_slice(&row);
        prev = row;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i32 + b as i32 - c as i32;
    let pa = (p - a as i32).abs();
    let pb = (p - b as i32).abs();
    let pc = (p - c as i32).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn parms(predictor: i64, columns: i64) -> Dictionary {
        let mut d = Dictionary::new();
        d.insert("Predictor", Object::Integer(predictor));
        d.insert("Columns", Object::Integer(columns));
        d
    }

    #[test]
    fn no_predictor_passes_through() {
        let d = parms(1, 4);
        assert_eq!(apply(vec![1, 2, 3], &d).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn tiff_predictor_accumulates_per_component() {
        let d = parms(2, 3);
        let data = vec![10, 1, 1, 1];
        // single row of 4 bytes (bpp=1): 10, 11, 12, 13
        assert_eq!(tiff_predictor(data, 1, 4), vec![10, 11, 12, 13]);
    }

    #[test]
    fn png_sub_filter() {
        // tag 1 (Sub), row [5, 2] -> deltas accumulate left to right (bpp=1)
        let data = vec![1, 5, 2];
        let d = parms(10, 2);
        assert_eq!(png_predictor(data, 1, 2).unwrap(), vec![5, 7]);
        let _ = d;
    }
}
