//! Reconcile a feature table with a layer's required attributes.

use crate::table::FeatureTable;

/// Outcome of [`reconcile_schema`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchemaReport {
    /// Required attributes that the table lacked and that were added as
    /// all-null columns.
    pub missing: Vec<String>,
}

impl SchemaReport {
    /// Return `true` when every required attribute was already present.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Ensure `table` has a column for every required attribute.
///
/// Absent attributes are added as null columns and reported. List values are
/// then flattened to comma-separated text so no list cell reaches a writer.
/// Reconciliation never fails.
///
/// # Examples
///
/// ```
/// use osmlayers_core::{Crs, FeatureTable, reconcile_schema};
///
/// let mut table = FeatureTable::new(Crs::WGS84);
/// let report = reconcile_schema(&mut table, &["name", "name:en"]);
/// assert_eq!(report.missing, ["name", "name:en"]);
/// assert!(table.has_column("name:en"));
/// ```
pub fn reconcile_schema(table: &mut FeatureTable, required: &[&str]) -> SchemaReport {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| (*column).to_owned())
        .collect();
    for column in &missing {
        table.add_column(column);
    }
    table.flatten_lists();
    SchemaReport { missing }
}
