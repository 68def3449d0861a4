//! Display-name language selection.

use std::collections::BTreeMap;

use crate::config::LANGUAGE_FALLBACK;

/// Picks the display text for `lang` out of a language-tag to text map.
///
/// An exact tag match wins even when its text is empty. Otherwise the first
/// non-empty entry of [`LANGUAGE_FALLBACK`] is used, and failing that any
/// non-empty entry of the map. An empty map yields an empty string.
pub fn localized_name(lang: &str, names: &BTreeMap<String, String>) -> String {
    if let Some(name) = names.get(lang) {
        return name.clone();
    }

    LANGUAGE_FALLBACK
        .iter()
        .filter_map(|tag| names.get(*tag))
        .find(|name| !name.is_empty())
        .or_else(|| names.values().find(|name| !name.is_empty()))
        .cloned()
        .unwrap_or_default()
}
