use std::collections::BTreeSet;

/// Aggregate rows in EDGAR sheets that are not countries.
pub const DEFAULT_EXCLUDED: &[&str] = &[
    "GLOBAL TOTAL",
    "WORLD",
    "INTERNATIONAL TRANSPORT",
    "STATISTICAL DIFFERENCE",
    "OTHER",
];

/// Canonical display form of a country name.
///
/// Trims, collapses runs of whitespace and title-cases the result
/// (`"  UNITED   STATES "` → `"United States"`). Returns `None` for blank
/// cells and the `nan` placeholder spreadsheets export for empty strings.
pub fn normalize_country(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || collapsed.eq_ignore_ascii_case("nan") {
        return None;
    }

    let mut out = String::with_capacity(collapsed.len());
    let mut prev_alpha = false;
    for ch in collapsed.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// CountryNormalizer – normalization plus aggregate exclusion
// ---------------------------------------------------------------------------

/// Maps raw sheet cells to canonical country names, dropping aggregates.
#[derive(Debug, Clone)]
pub struct CountryNormalizer {
    /// Upper-cased names to drop.
    excluded: BTreeSet<String>,
}

impl Default for CountryNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_EXCLUDED.iter().copied())
    }
}

impl CountryNormalizer {
    pub fn new<S: AsRef<str>>(excluded: impl IntoIterator<Item = S>) -> Self {
        let excluded = excluded
            .into_iter()
            .filter_map(|name| normalize_country(name.as_ref()))
            .map(|name| name.to_uppercase())
            .collect();
        Self { excluded }
    }

    /// Canonical name, or `None` when blank or excluded.
    pub fn canonical(&self, raw: &str) -> Option<String> {
        let name = normalize_country(raw)?;
        if self.excluded.contains(&name.to_uppercase()) {
            return None;
        }
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_title_case() {
        assert_eq!(normalize_country("UNITED STATES").as_deref(), Some("United States"));
        assert_eq!(normalize_country("  france ").as_deref(), Some("France"));
        assert_eq!(
            normalize_country("Bosnia  and\tHerzegovina").as_deref(),
            Some("Bosnia And Herzegovina")
        );
        assert_eq!(normalize_country("guinea-bissau").as_deref(), Some("Guinea-Bissau"));
    }

    #[test]
    fn test_normalize_blank() {
        assert_eq!(normalize_country(""), None);
        assert_eq!(normalize_country("   "), None);
        assert_eq!(normalize_country("NaN"), None);
    }

    #[test]
    fn test_excludes_aggregates_case_insensitively() {
        let normalizer = CountryNormalizer::default();
        assert_eq!(normalizer.canonical("GLOBAL TOTAL"), None);
        assert_eq!(normalizer.canonical("world"), None);
        assert_eq!(normalizer.canonical("International  Transport"), None);
        assert_eq!(normalizer.canonical("Germany").as_deref(), Some("Germany"));
    }

    #[test]
    fn test_custom_exclusions() {
        let normalizer = CountryNormalizer::new(["EU27"]);
        assert_eq!(normalizer.canonical("eu27"), None);
        assert_eq!(normalizer.canonical("World").as_deref(), Some("World"));
    }
}
