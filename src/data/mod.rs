//! Embedded read-only auxiliary-data filesystem view over
//! `cidToUnicode/`, `cMap/<Registry-Ordering>/<name>`, `nameToUnicode/`, and
//! `unicodeMap/` (`spec.md` §6).
//!
//! The full poppler-data corpus is tens of megabytes and not vendored here;
//! this embeds the handful of entries needed to exercise the Type0/CID CMap
//! path end to end (`Identity-H`/`Identity-V`, which are required by the
//! spec itself as the trivial 2-byte-CID identity mapping) and documents the
//! gap for anything else rather than silently returning empty data.

use std::collections::HashMap;
use std::sync::OnceLock;

/// `Identity-H`: 2-byte codes equal their CID, used directly (no bfrange
/// table needed; `lookup` always returns `Some(code)`).
pub const IDENTITY_H: &str = "Identity-H";
pub const IDENTITY_V: &str = "Identity-V";

fn embedded_cmaps() -> &'static HashMap<(&'static str, &'static str), &'static str> {
    static TABLE: OnceLock<HashMap<(&'static str, &'static str), &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m = HashMap::new();
        m.insert(("Adobe-Identity", IDENTITY_H), "");
        m.insert(("Adobe-Identity", IDENTITY_V), "");
        m
    })
}

/// Looks up an embedded predefined CMap by `(Registry-Ordering, name)`,
/// e.g. `("Adobe-GB1", "GBK-EUC-H")`. Returns `None` for anything not
/// vendored in this build; callers fall back to Latin-1/identity decoding
/// with a diagnostic, per `spec.md` §4.7 item 4.
pub fn lookup_cmap(registry_ordering: &str, name: &str) -> Option<&'static str> {
    embedded_cmaps().get(&(registry_ordering, name)).copied()
}

pub fn is_identity_cmap(name: &str) -> bool {
    name == IDENTITY_H || name == IDENTITY_V
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_cmaps_are_recognized() {
        assert!(is_identity_cmap(IDENTITY_H));
        assert!(is_identity_cmap(IDENTITY_V));
        assert!(!is_identity_cmap("GBK-EUC-H"));
    }

    #[test]
    fn unvendored_cmap_is_a_documented_miss() {
        assert!(lookup_cmap("Adobe-GB1", "GBK-EUC-H").is_none());
    }
}
