//! Text rendering matrix and glyph-advance computation (`spec.md` §4.6
//! "Text rendering").

use super::graphics_state::Matrix;

/// `Trm = [Tfs*Tz 0; 0 Tfs; 0 Trise] · Tm · CTM`.
pub fn rendering_matrix(font_size: f64, h_scale: f64, rise: f64, tm: &Matrix, ctm: &Matrix) -> Matrix {
    let scale = Matrix { a: font_size * h_scale, b: 0.0, c: 0.0, d: font_size, e: 0.0, f: rise };
    scale.then(tm).then(ctm)
}

/// Advance along the (unscaled) text-space x axis after showing one glyph
/// of width `w` (1/1000 em units) and code `code`, with `is_space`
/// indicating a single-byte 0x20 code (word spacing only applies there,
/// per PDF §9.3.3).
pub fn glyph_advance(w_1000: f64, font_size: f64, char_spacing: f64, word_spacing: f64, h_scale: f64, is_space: bool) -> f64 {
    let base = (w_1000 / 1000.0) * font_size + char_spacing + if is_space { word_spacing } else { 0.0 };
    base * h_scale
}

/// `TJ` numeric adjustment: shifts `Tm` by `-val/1000 · Tfs · Tz` along x.
pub fn tj_adjustment(val: f64, font_size: f64, h_scale: f64) -> f64 {
    -(val / 1000.0) * font_size * h_scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_state_yields_identity_trm_scaled_by_font_size() {
        let trm = rendering_matrix(12.0, 1.0, 0.0, &Matrix::IDENTITY, &Matrix::IDENTITY);
        assert_eq!(trm.a, 12.0);
        assert_eq!(trm.d, 12.0);
    }

    #[test]
    fn word_spacing_only_applies_to_space_code() {
        let with_space = glyph_advance(500.0, 12.0, 0.0, 2.0, 1.0, true);
        let without = glyph_advance(500.0, 12.0, 0.0, 2.0, 1.0, false);
        assert_eq!(with_space - without, 2.0);
    }
}
