//! Bounded-width column names for formats with short field names.
//!
//! Shapefile attribute tables cap field names at ten bytes. The normalizer
//! truncates each name and, when a truncated name collides with one already
//! assigned, swaps trailing characters for a counter until the name is free.

use std::collections::HashSet;

/// Maximum byte length of a normalized column name.
pub const MAX_COLUMN_NAME_LEN: usize = 10;

/// An order-preserving, bijective mapping from original to normalized names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMapping {
    entries: Vec<(String, String)>,
}

impl ColumnMapping {
    /// The normalized name assigned to `original`.
    pub fn get(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(from, _)| from == original)
            .map(|(_, to)| to.as_str())
    }

    /// Iterate over `(original, normalized)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str()))
    }

    /// Normalized names in input order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, to)| to.as_str())
    }

    /// Number of mapped columns.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when no columns were mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map column names to unique names no longer than [`MAX_COLUMN_NAME_LEN`].
///
/// Names are processed in order. The first name to claim a truncated form
/// keeps it; later collisions receive a numeric suffix that replaces trailing
/// characters, starting at `1`. Truncation respects UTF-8 boundaries, so the
/// limit is measured in bytes.
///
/// # Examples
///
/// ```
/// use osmlayers_core::normalize_column_names;
///
/// let mapping = normalize_column_names(["operator_type", "operator_total", "name"]);
/// assert_eq!(mapping.get("operator_type"), Some("operator_t"));
/// assert_eq!(mapping.get("operator_total"), Some("operator_1"));
/// assert_eq!(mapping.get("name"), Some("name"));
/// ```
pub fn normalize_column_names<I, S>(columns: I) -> ColumnMapping
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();
    for column in columns {
        let original = column.as_ref();
        let truncated = truncate(original, MAX_COLUMN_NAME_LEN);
        let assigned = if used.contains(truncated) {
            disambiguate(truncated, &used)
        } else {
            truncated.to_owned()
        };
        used.insert(assigned.clone());
        entries.push((original.to_owned(), assigned));
    }
    ColumnMapping { entries }
}

fn truncate(name: &str, max_bytes: usize) -> &str {
    let end = name
        .char_indices()
        .map(|(index, ch)| index + ch.len_utf8())
        .take_while(|&end| end <= max_bytes)
        .last()
        .unwrap_or(0);
    name.get(..end).unwrap_or_default()
}

fn disambiguate(base: &str, used: &HashSet<String>) -> String {
    let mut counter: u64 = 1;
    loop {
        let suffix = counter.to_string();
        let stem = truncate(base, MAX_COLUMN_NAME_LEN.saturating_sub(suffix.len()));
        let candidate = format!("{stem}{suffix}");
        if !used.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn assert_valid(mapping: &ColumnMapping) {
        let names: Vec<&str> = mapping.names().collect();
        assert!(names.iter().all(|name| name.len() <= MAX_COLUMN_NAME_LEN));
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique.len(), names.len(), "names must be distinct: {names:?}");
    }

    #[rstest]
    fn keeps_short_distinct_names() {
        let mapping = normalize_column_names(["operator_type", "operator", "name"]);
        assert_valid(&mapping);
        let names: Vec<&str> = mapping.names().collect();
        assert_eq!(names, ["operator_t", "operator", "name"]);
    }

    #[rstest]
    fn later_duplicates_receive_suffixes() {
        let mapping =
            normalize_column_names(["abcdefghijklm", "abcdefghijxyz", "abcdefghij_other"]);
        assert_valid(&mapping);
        let names: Vec<&str> = mapping.names().collect();
        assert_eq!(names, ["abcdefghij", "abcdefghi1", "abcdefghi2"]);
    }

    #[rstest]
    fn suffix_skips_names_already_taken() {
        let mapping = normalize_column_names(["operator_1", "operator_type", "operator_total"]);
        assert_valid(&mapping);
        assert_eq!(mapping.get("operator_1"), Some("operator_1"));
        assert_eq!(mapping.get("operator_type"), Some("operator_t"));
        assert_eq!(mapping.get("operator_total"), Some("operator_2"));
    }

    #[rstest]
    fn counters_grow_into_the_budget() {
        let columns: Vec<String> = (0..12).map(|i| format!("long_column_{i:02}")).collect();
        let mapping = normalize_column_names(&columns);
        assert_valid(&mapping);
        assert_eq!(mapping.get("long_column_11"), Some("long_col11"));
    }

    #[rstest]
    #[case("école_primaire", "école_pri")]
    #[case("name:en", "name:en")]
    fn truncation_respects_char_boundaries(#[case] input: &str, #[case] expected: &str) {
        let mapping = normalize_column_names([input]);
        assert_eq!(mapping.get(input), Some(expected));
    }

    #[rstest]
    fn normalization_is_deterministic() {
        let columns = ["operator:type", "operator_type", "operator", "school:gender"];
        assert_eq!(normalize_column_names(columns), normalize_column_names(columns));
    }
}
