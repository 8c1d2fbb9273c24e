//! Content-stream operator name constants, grouped as in `spec.md` §4.6.

pub const Q_SAVE: &str = "q";
pub const Q_RESTORE: &str = "Q";
pub const CM: &str = "cm";
pub const LINE_WIDTH: &str = "w";
pub const GS: &str = "gs";

pub const MOVE_TO: &str = "m";
pub const LINE_TO: &str = "l";
pub const CURVE_TO: &str = "c";
pub const CURVE_V: &str = "v";
pub const CURVE_Y: &str = "y";
pub const RECT: &str = "re";
pub const CLOSE_PATH: &str = "h";

pub const STROKE: &str = "S";
pub const CLOSE_STROKE: &str = "s";
pub const FILL: &str = "f";
pub const FILL_COMPAT: &str = "F";
pub const FILL_EO: &str = "f*";
pub const FILL_STROKE: &str = "B";
pub const FILL_STROKE_EO: &str = "B*";
pub const CLOSE_FILL_STROKE: &str = "b";
pub const CLOSE_FILL_STROKE_EO: &str = "b*";
pub const END_PATH: &str = "n";

pub const CLIP: &str = "W";
pub const CLIP_EO: &str = "W*";

pub const BEGIN_TEXT: &str = "BT";
pub const END_TEXT: &str = "ET";

pub const CHAR_SPACE: &str = "Tc";
pub const WORD_SPACE: &str = "Tw";
pub const H_SCALE: &str = "Tz";
pub const LEADING: &str = "TL";
pub const FONT: &str = "Tf";
pub const RENDER_MODE: &str = "Tr";
pub const RISE: &str = "Ts";

pub const TEXT_MOVE: &str = "Td";
pub const TEXT_MOVE_SET_LEADING: &str = "TD";
pub const TEXT_MATRIX: &str = "Tm";
pub const NEXT_LINE: &str = "T*";

pub const SHOW_TEXT: &str = "Tj";
pub const SHOW_TEXT_ARRAY: &str = "TJ";
pub const NEXT_LINE_SHOW: &str = "'";
pub const NEXT_LINE_SHOW_SPACING: &str = "\"";

pub const DO: &str = "Do";
pub const BEGIN_INLINE_IMAGE: &str = "BI";
pub const INLINE_IMAGE_DATA: &str = "ID";
pub const END_INLINE_IMAGE: &str = "EI";

pub const BEGIN_MARKED_CONTENT_PROPS: &str = "BDC";
pub const BEGIN_MARKED_CONTENT: &str = "BMC";
pub const END_MARKED_CONTENT: &str = "EMC";
