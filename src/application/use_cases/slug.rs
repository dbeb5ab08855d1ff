use once_cell::sync::Lazy;
use regex::Regex;

static SEPARATOR_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_]+").unwrap());

static DISALLOWED_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]").unwrap());

static HYPHEN_RUN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Derives the uniqueness key for a taxon name.
///
/// Manual creation and bulk import both go through here, so "Node JS" typed
/// in the admin form and "node  js" in a spreadsheet land on the same slug.
pub fn derive_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let hyphenated = SEPARATOR_PATTERN.replace_all(&lowered, "-");
    let stripped = DISALLOWED_PATTERN.replace_all(&hyphenated, "");
    let collapsed = HYPHEN_RUN_PATTERN.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_string()
}

/// Comparison key for subcategories: trimmed, case-folded.
pub fn subcategory_key(value: &str) -> String {
    value.trim().to_lowercase()
}
