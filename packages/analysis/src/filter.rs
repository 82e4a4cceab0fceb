//! Area and intersection-name filtering of the regulation table.

use accident_map_analysis_models::{ColumnMapping, FilterCriteria};
use accident_map_dataset_models::Table;

/// Applies the area and intersection filters to `regulations`.
///
/// Both filters are conjunctive. A filter whose column is not configured or
/// not present in the table is skipped rather than excluding every row.
/// The input table is never modified.
#[must_use]
pub fn filter_regulations(
    regulations: &Table,
    criteria: &FilterCriteria,
    columns: &ColumnMapping,
) -> Table {
    let area = criteria.area.as_deref().and_then(|selector| {
        usable_column(regulations, columns.area.as_deref(), "area").map(|c| (c, selector))
    });

    let needle = criteria.intersection.as_deref().and_then(|substring| {
        usable_column(regulations, columns.intersection_name.as_deref(), "intersection name")
            .map(|c| (c, substring.to_lowercase()))
    });

    let filtered = regulations.filter_rows(|record| {
        let area_ok = area.is_none_or(|(column, selector)| {
            record
                .get(column)
                .is_some_and(|cell| cell.matches_selector(selector))
        });
        let name_ok = needle.as_ref().is_none_or(|(column, needle)| {
            record
                .get(column)
                .is_some_and(|cell| cell.contains_lowercase(needle))
        });
        area_ok && name_ok
    });

    log::debug!(
        "Filtered regulations {} -> {} rows (area={:?}, intersection={:?})",
        regulations.len(),
        filtered.len(),
        criteria.area,
        criteria.intersection
    );

    filtered
}

/// Returns the column name if it is configured and present in the table.
fn usable_column<'a>(table: &Table, column: Option<&'a str>, what: &str) -> Option<&'a str> {
    match column {
        Some(name) if table.has_column(name) => Some(name),
        Some(name) => {
            log::debug!("{what} column '{name}' not in regulation table, skipping filter");
            None
        }
        None => {
            log::debug!("No {what} column configured, skipping filter");
            None
        }
    }
}
