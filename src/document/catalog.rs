//! The document catalog (`/Root`): entry point to the page tree, outlines,
//! and named destinations (`spec.md` §3 "Document").

use crate::object::{Dictionary, Object, ObjRef};

#[derive(Debug, Clone)]
pub struct Catalog {
    dict: Dictionary,
}

/// The catalog's `/Pages` entry, before it has been walked. Almost always
/// an indirect reference; a direct dictionary is rare but legal
/// (`spec.md` §3 "Page") and the page walker accepts both, see
/// `page::collect_pages`/`page::collect_pages_from_dict`.
#[derive(Debug, Clone)]
pub enum PagesRoot {
    Indirect(ObjRef),
    Direct(Dictionary),
}

impl Catalog {
    pub fn new(dict: Dictionary) -> Self {
        Self { dict }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// The root `/Pages` node, resolved but not walked.
    pub fn pages_root(&self) -> Option<PagesRoot> {
        match self.dict.get("Pages") {
            Some(Object::Reference(r)) => Some(PagesRoot::Indirect(*r)),
            Some(Object::Dictionary(d)) => Some(PagesRoot::Direct(d.clone())),
            _ => None,
        }
    }

    pub fn version_override(&self) -> Option<String> {
        self.dict.get("Version").and_then(|o| o.as_name()).map(|n| n.as_str().into_owned())
    }
}
