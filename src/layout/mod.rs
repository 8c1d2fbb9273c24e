//! Reading-order text extraction over a page's positioned-glyph stream
//! (`spec.md` §4.8).

use crate::content::PositionedGlyph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// Content-stream order, line-clustered, default reading order.
    Physical,
    /// Content-stream order, no sorting at all.
    Raw,
    /// Column-preserving: quantizes x to a grid and pads with spaces.
    Layout,
}

impl Default for LayoutMode {
    fn default() -> Self {
        LayoutMode::Physical
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextLayoutOptions {
    pub mode: LayoutMode,
    /// Drop glyphs whose `Trm` rotation exceeds 10 degrees from axis-aligned.
    pub no_diagonal: bool,
}

struct PlacedGlyph {
    x: f64,
    y: f64,
    advance: f64,
    font_size: f64,
    text: String,
}

/// Extracts one page's text per `spec.md` §4.8's reading-order algorithm.
/// `glyphs` must already be in content-stream emission order.
pub fn extract_text(glyphs: &[PositionedGlyph], options: &TextLayoutOptions) -> String {
    let placed: Vec<PlacedGlyph> = glyphs
        .iter()
        .filter(|g| !options.no_diagonal || !is_rotated(g))
        .map(|g| {
            let (x, y) = g.trm.apply(0.0, 0.0);
            PlacedGlyph { x, y, advance: g.advance, font_size: g.font_size.max(1.0), text: g.unicode.clone().unwrap_or_default() }
        })
        .collect();

    match options.mode {
        LayoutMode::Raw => placed.iter().map(|g| g.text.as_str()).collect(),
        LayoutMode::Physical => render_lines(&placed, false),
        LayoutMode::Layout => render_lines(&placed, true),
    }
}

/// Rotation angle of the 2x2 linear part of `Trm`, in degrees from
/// axis-aligned, via `atan2(b, a)` (the angle the x-basis vector makes with
/// the horizontal).
fn is_rotated(g: &PositionedGlyph) -> bool {
    let angle = g.trm.b.atan2(g.trm.a).to_degrees().abs();
    let angle = angle.min(180.0 - angle);
    angle > 10.0
}

fn render_lines(placed: &[PlacedGlyph], preserve_columns: bool) -> String {
    if placed.is_empty() {
        return String::new();
    }

    let mut lines: Vec<Vec<&PlacedGlyph>> = Vec::new();
    for g in placed {
        match lines.iter_mut().find(|line| {
            let max_fs = line.iter().map(|p| p.font_size).fold(0.0_f64, f64::max).max(g.font_size);
            let baseline = line[0].y;
            (baseline - g.y).abs() < 0.5 * max_fs
        }) {
            Some(line) => line.push(g),
            None => lines.push(vec![g]),
        }
    }

    lines.sort_by(|a, b| {
        let ay = a.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        let by = b.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        by.partial_cmp(&ay).unwrap_or(std::cmp::Ordering::Equal)
    });

    let avg_glyph_width = {
        let total: f64 = placed.iter().map(|p| p.advance.max(0.01)).sum();
        (total / placed.len() as f64).max(1.0)
    };

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut sorted = line.clone();
        sorted.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut cursor_x: Option<f64> = None;
        for g in &sorted {
            if let Some(prev_end) = cursor_x {
                let gap = g.x - prev_end;
                let threshold = 0.3 * g.font_size.max(sorted.first().map(|p| p.font_size).unwrap_or(g.font_size));
                if preserve_columns && gap > 0.0 {
                    let cells = (gap / (0.5 * avg_glyph_width)).round() as usize;
                    out.push_str(&" ".repeat(cells.max(1)));
                } else if gap > threshold {
                    out.push(' ');
                }
            }
            out.push_str(&g.text);
            cursor_x = Some(g.x + g.advance);
        }
    }
    out
}

/// Joins already-extracted per-page text, inserting `\f` between pages
/// unless suppressed (`-nopgbrk`).
pub fn join_pages(pages: &[String], page_break: bool) -> String {
    if page_break {
        pages.join("\x0C")
    } else {
        pages.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::graphics_state::Matrix;

    fn glyph(x: f64, y: f64, advance: f64, text: &str) -> PositionedGlyph {
        PositionedGlyph {
            unicode: Some(text.to_string()),
            advance,
            trm: Matrix { a: 12.0, b: 0.0, c: 0.0, d: 12.0, e: x, f: y },
            font_size: 12.0,
            font_name: "F1".to_string(),
            fill_color: vec![0.0],
        }
    }

    #[test]
    fn single_line_left_to_right_joins_without_extra_spaces() {
        let glyphs = vec![
            glyph(0.0, 700.0, 7.0, "H"),
            glyph(7.0, 700.0, 7.0, "e"),
            glyph(14.0, 700.0, 7.0, "l"),
            glyph(21.0, 700.0, 7.0, "l"),
            glyph(28.0, 700.0, 7.0, "o"),
        ];
        let text = extract_text(&glyphs, &TextLayoutOptions::default());
        assert_eq!(text, "Hello");
    }

    #[test]
    fn large_gap_inserts_space() {
        let glyphs = vec![glyph(0.0, 700.0, 7.0, "A"), glyph(50.0, 700.0, 7.0, "B")];
        let text = extract_text(&glyphs, &TextLayoutOptions::default());
        assert_eq!(text, "A B");
    }

    #[test]
    fn two_columns_same_baseline_separated_by_space() {
        let glyphs = vec![glyph(50.0, 700.0, 7.0, "L"), glyph(320.0, 700.0, 7.0, "R")];
        let text = extract_text(&glyphs, &TextLayoutOptions::default());
        assert_eq!(text, "L R");
    }

    #[test]
    fn raw_mode_preserves_content_stream_order_even_if_out_of_visual_order() {
        let glyphs = vec![glyph(50.0, 700.0, 7.0, "B"), glyph(0.0, 700.0, 7.0, "A")];
        let text = extract_text(&glyphs, &TextLayoutOptions { mode: LayoutMode::Raw, no_diagonal: false });
        assert_eq!(text, "BA");
    }

    #[test]
    fn distinct_lines_sorted_top_to_bottom() {
        let glyphs = vec![glyph(0.0, 600.0, 7.0, "bottom"), glyph(0.0, 700.0, 7.0, "top")];
        let text = extract_text(&glyphs, &TextLayoutOptions::default());
        assert_eq!(text, "top\nbottom");
    }
}
