//! Page tree walking with attribute inheritance (`spec.md` §3 "Page":
//! `/Resources`, `/MediaBox`, `/CropBox`, and `/Rotate` are inherited down
//! the `/Pages` tree when a leaf doesn't set them itself).

use std::collections::HashSet;

use super::Document;
use crate::error::{PdfError, Result};
use crate::object::{Dictionary, Object, ObjRef};

#[derive(Debug, Clone, Default)]
pub struct InheritedAttrs {
    pub resources: Option<Dictionary>,
    pub media_box: Option<[f64; 4]>,
    pub crop_box: Option<[f64; 4]>,
    pub rotate: Option<i64>,
}

impl InheritedAttrs {
    fn overlay(&self, node: &Dictionary) -> Self {
        Self {
            resources: node.get("Resources").and_then(|o| o.as_dict().cloned()).or_else(|| self.resources.clone()),
            media_box: rect(node.get("MediaBox")).or(self.media_box),
            crop_box: rect(node.get("CropBox")).or(self.crop_box),
            rotate: node.get("Rotate").and_then(|o| o.as_i64()).or(self.rotate),
        }
    }
}

fn rect(obj: Option<&Object>) -> Option<[f64; 4]> {
    let arr = obj?.as_array()?;
    if arr.len() != 4 {
        return None;
    }
    Some([arr[0].as_f64()?, arr[1].as_f64()?, arr[2].as_f64()?, arr[3].as_f64()?])
}

#[derive(Debug, Clone)]
pub struct Page {
    pub object_ref: ObjRef,
    pub dict: Dictionary,
    pub resources: Dictionary,
    pub media_box: [f64; 4],
    pub crop_box: [f64; 4],
    pub rotate: i64,
}

const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

pub(super) fn collect_pages(
    doc: &Document,
    node_ref: ObjRef,
    inherited: InheritedAttrs,
    out: &mut Vec<Page>,
    seen: &mut HashSet<ObjRef>,
) -> Result<()> {
    if !seen.insert(node_ref) {
        doc.warn("cyclic page tree node skipped");
        return Ok(());
    }
    let node = doc
        .resolve(node_ref)?
        .as_dict()
        .cloned()
        .ok_or_else(|| PdfError::Parse(crate::error::ParseContext::new(0, "page tree node is not a dictionary")))?;

    collect_pages_from_dict(doc, node, inherited, out, seen, Some(node_ref))
}

/// Walks a `/Pages`-or-leaf dictionary directly, without requiring it to
/// have come from an indirect reference (the direct-`/Pages`-dictionary
/// case of `Catalog::pages_root`). `self_ref` is `None` for such a root,
/// since it has no object identity to guard against cycles on; its `Kids`
/// entries still do, via the recursive `collect_pages` call.
pub(super) fn collect_pages_from_dict(
    doc: &Document,
    node: Dictionary,
    inherited: InheritedAttrs,
    out: &mut Vec<Page>,
    seen: &mut HashSet<ObjRef>,
    self_ref: Option<ObjRef>,
) -> Result<()> {
    let attrs = inherited.overlay(&node);

    match node.type_name().as_deref() {
        Some("Pages") | None if node.contains_key("Kids") => {
            let kids = node.get("Kids").and_then(|o| o.as_array()).unwrap_or(&[]);
            for kid in kids {
                if let Object::Reference(r) = kid {
                    collect_pages(doc, *r, attrs.clone(), out, seen)?;
                }
            }
        }
        _ => {
            out.push(Page {
                object_ref: self_ref.unwrap_or(ObjRef::new(0, 0)),
                resources: attrs.resources.clone().unwrap_or_default(),
                media_box: attrs.media_box.unwrap_or(DEFAULT_MEDIA_BOX),
                crop_box: attrs.crop_box.or(attrs.media_box).unwrap_or(DEFAULT_MEDIA_BOX),
                rotate: attrs.rotate.unwrap_or(0).rem_euclid(360),
                dict: node,
            });
        }
    }
    Ok(())
}
