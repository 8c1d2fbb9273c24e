//! Image XObject descriptor construction and colorspace resolution
//! (`spec.md` §4.9).

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, Object, Stream};

/// A resolved colorspace. `ICCBased` without a usable `/N` falls back to its
/// `/Alternate` entry, per `spec.md` §4.9; a profile is never applied, only
/// described (`spec.md` §1 Non-goals).
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray,
    CalRgb,
    Lab,
    IccBased { components: u8, alternate: Box<ColorSpace> },
    Indexed { base: Box<ColorSpace>, hival: i64, lookup: Vec<u8> },
    Separation { names: Vec<String>, alternate: Box<ColorSpace> },
    DeviceN { names: Vec<String>, alternate: Box<ColorSpace> },
    Pattern { underlying: Option<Box<ColorSpace>> },
}

impl ColorSpace {
    /// Number of color components a sample in this space carries (the
    /// `Indexed` case reports 1, since samples are palette indices).
    pub fn components(&self) -> u8 {
        match self {
            ColorSpace::DeviceGray | ColorSpace::CalGray => 1,
            ColorSpace::DeviceRgb | ColorSpace::CalRgb | ColorSpace::Lab => 3,
            ColorSpace::DeviceCmyk => 4,
            ColorSpace::IccBased { components, .. } => *components,
            ColorSpace::Indexed { .. } => 1,
            ColorSpace::Separation { .. } => 1,
            ColorSpace::DeviceN { names, .. } => names.len() as u8,
            ColorSpace::Pattern { underlying } => underlying.as_ref().map(|c| c.components()).unwrap_or(1),
        }
    }
}

/// Resolves a `/ColorSpace` entry (a name, or an array for the parameterized
/// families), consulting the page `Resources` `/ColorSpace` dict for named
/// lookups (`spec.md` §4.9).
pub fn resolve_colorspace(doc: &Document, obj: &Object, resources: Option<&Dictionary>) -> Result<ColorSpace> {
    match obj {
        Object::Name(n) => match n.as_str().as_ref() {
            "DeviceGray" | "CalGray" | "G" => Ok(ColorSpace::DeviceGray),
            "DeviceRGB" | "RGB" => Ok(ColorSpace::DeviceRgb),
            "DeviceCMYK" | "CMYK" => Ok(ColorSpace::DeviceCmyk),
            "Pattern" => Ok(ColorSpace::Pattern { underlying: None }),
            other => {
                if let Some(resources) = resources {
                    if let Some(cs_dict) = resources.get("ColorSpace").and_then(|o| doc.deref(o).ok()) {
                        if let Some(entry) = cs_dict.as_dict().and_then(|d| d.get(other)) {
                            let resolved = doc.deref(entry)?;
                            return resolve_colorspace(doc, &resolved, resources);
                        }
                    }
                }
                Ok(ColorSpace::DeviceGray) // unresolvable name: least-surprising default
            }
        },
        Object::Array(items) => resolve_array_colorspace(doc, items, resources),
        Object::Reference(r) => {
            let resolved = doc.resolve(*r)?;
            resolve_colorspace(doc, &resolved, resources)
        }
        _ => Ok(ColorSpace::DeviceGray),
    }
}

fn resolve_array_colorspace(doc: &Document, items: &[Object], resources: Option<&Dictionary>) -> Result<ColorSpace> {
    let Some(family) = items.first().and_then(|o| o.as_name()).map(|n| n.as_str().into_owned()) else {
        return Ok(ColorSpace::DeviceGray);
    };
    match family.as_str() {
        "CalGray" => Ok(ColorSpace::CalGray),
        "CalRGB" => Ok(ColorSpace::CalRgb),
        "Lab" => Ok(ColorSpace::Lab),
        "ICCBased" => {
            let stream = items.get(1).map(|o| doc.deref(o)).transpose()?;
            let dict = stream.as_ref().and_then(|s| s.as_dict());
            let n = dict.and_then(|d| d.get("N")).and_then(|o| o.as_i64()).unwrap_or(3) as u8;
            let alternate = match dict.and_then(|d| d.get("Alternate")) {
                Some(alt) => resolve_colorspace(doc, alt, resources)?,
                None => match n {
                    1 => ColorSpace::DeviceGray,
                    4 => ColorSpace::DeviceCmyk,
                    _ => ColorSpace::DeviceRgb,
                },
            };
            Ok(ColorSpace::IccBased { components: n, alternate: Box::new(alternate) })
        }
        "Indexed" => {
            let base = items.get(1).map(|o| resolve_colorspace(doc, o, resources)).transpose()?.unwrap_or(ColorSpace::DeviceRgb);
            let hival = items.get(2).and_then(|o| o.as_i64()).unwrap_or(0);
            let lookup = match items.get(3) {
                Some(Object::String(s)) => s.bytes.clone(),
                Some(Object::Reference(r)) => match doc.resolve(*r)? {
                    Object::String(s) => s.bytes,
                    Object::Stream(s) => crate::filters::decode(&s.raw, &s.dict).unwrap_or_default(),
                    _ => Vec::new(),
                },
                _ => Vec::new(),
            };
            Ok(ColorSpace::Indexed { base: Box::new(base), hival, lookup })
        }
        "Separation" => {
            let names = vec![items.get(1).and_then(|o| o.as_name()).map(|n| n.as_str().into_owned()).unwrap_or_default()];
            let alternate = items.get(2).map(|o| resolve_colorspace(doc, o, resources)).transpose()?.unwrap_or(ColorSpace::DeviceGray);
            Ok(ColorSpace::Separation { names, alternate: Box::new(alternate) })
        }
        "DeviceN" => {
            let names = items
                .get(1)
                .and_then(|o| o.as_array())
                .map(|a| a.iter().filter_map(|o| o.as_name()).map(|n| n.as_str().into_owned()).collect())
                .unwrap_or_default();
            let alternate = items.get(2).map(|o| resolve_colorspace(doc, o, resources)).transpose()?.unwrap_or(ColorSpace::DeviceGray);
            Ok(ColorSpace::DeviceN { names, alternate: Box::new(alternate) })
        }
        "Pattern" => {
            let underlying = items.get(1).map(|o| resolve_colorspace(doc, o, resources)).transpose()?.map(Box::new);
            Ok(ColorSpace::Pattern { underlying })
        }
        _ => Ok(ColorSpace::DeviceRgb),
    }
}

/// An image's sample geometry and (if not an external-codec format) the
/// fully filter-decoded sample bytes.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub width: i64,
    pub height: i64,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    pub decode: Option<Vec<f64>>,
    pub image_mask: bool,
    pub is_external_codec: bool,
    pub samples: Vec<u8>,
}

/// Builds the descriptor for an Image XObject (or inline image) stream,
/// decoding through the filter chain unless the final filter is an
/// external-codec format (DCT/JPX/JBIG2/CCITT), in which case `samples`
/// carries the still-encoded native bitstream (`spec.md` §4.9).
pub fn describe_image(doc: &Document, stream: &Stream, resources: Option<&Dictionary>) -> Result<ImageDescriptor> {
    let width = stream.dict.get("Width").and_then(|o| o.as_i64()).unwrap_or(0);
    let height = stream.dict.get("Height").and_then(|o| o.as_i64()).unwrap_or(0);
    let bits_per_component = stream.dict.get("BitsPerComponent").and_then(|o| o.as_i64()).unwrap_or(8) as u8;
    let image_mask = matches!(stream.dict.get("ImageMask"), Some(Object::Boolean(true)));
    let decode = stream.dict.get("Decode").and_then(|o| o.as_array()).map(|a| a.iter().filter_map(|o| o.as_f64()).collect());

    let color_space = if image_mask {
        ColorSpace::DeviceGray
    } else {
        match stream.dict.get("ColorSpace") {
            Some(cs) => resolve_colorspace(doc, cs, resources)?,
            None => ColorSpace::DeviceGray,
        }
    };

    let chain = crate::filters::filter_chain(&stream.dict);
    let is_external_codec = chain.last().map(|(f, _)| f.is_image_passthrough()).unwrap_or(false);

    let samples = if is_external_codec {
        stream.raw.clone()
    } else {
        crate::filters::decode(&stream.raw, &stream.dict)?
    };

    Ok(ImageDescriptor { width, height, bits_per_component, color_space, decode, image_mask, is_external_codec, samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> Document {
        let bytes = b"%PDF-1.4\n1 0 obj\n<< >>\nendobj\ntrailer\n<< /Size 1 >>\n".to_vec();
        Document::open(bytes, crate::document::OpenOptions::default()).unwrap()
    }

    #[test]
    fn device_rgb_name_resolves() {
        let doc = empty_doc();
        let cs = resolve_colorspace(&doc, &Object::Name("DeviceRGB".into()), None).unwrap();
        assert_eq!(cs, ColorSpace::DeviceRgb);
        assert_eq!(cs.components(), 3);
    }

    #[test]
    fn indexed_colorspace_reports_one_component() {
        let doc = empty_doc();
        let arr = Object::Array(vec![
            Object::Name("Indexed".into()),
            Object::Name("DeviceRGB".into()),
            Object::Integer(255),
            Object::String(crate::object::PdfString::literal(vec![0, 0, 0, 255, 255, 255])),
        ]);
        let cs = resolve_colorspace(&doc, &arr, None).unwrap();
        assert_eq!(cs.components(), 1);
        match cs {
            ColorSpace::Indexed { hival, lookup, .. } => {
                assert_eq!(hival, 255);
                assert_eq!(lookup.len(), 6);
            }
            _ => panic!("expected Indexed"),
        }
    }

    #[test]
    fn iccbased_falls_back_to_component_count_when_no_alternate() {
        let doc = empty_doc();
        let mut stream_dict = Dictionary::new();
        stream_dict.insert("N", Object::Integer(4));
        let stream = Object::Stream(Stream::new(stream_dict, Vec::new()));
        let arr = vec![Object::Name("ICCBased".into()), stream];
        let cs = resolve_array_colorspace(&doc, &arr, None).unwrap();
        assert_eq!(cs.components(), 4);
    }
}
