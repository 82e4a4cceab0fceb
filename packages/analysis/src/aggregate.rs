//! Per-intersection accident counts joined onto the regulation table.

use accident_map_analysis_models::{AggregatedRow, AggregatedTable, ColumnMapping};
use accident_map_dataset_models::{Cell, Table};

/// Count assigned to every row when the tables share no join key.
pub const FALLBACK_COUNT: u64 = 1;

/// Picks the first configured join key present in both tables.
#[must_use]
pub fn resolve_join_key<'a>(
    join_keys: &'a [String],
    regulations: &Table,
    accidents: &Table,
) -> Option<&'a str> {
    join_keys
        .iter()
        .find(|key| regulations.has_column(key) && accidents.has_column(key))
        .map(String::as_str)
}

/// Left-joins per-key accident counts onto the filtered regulation rows.
///
/// Every regulation row is kept, in order. Rows whose key has no accidents
/// (or whose key cell is null) get a count of 0. If no configured join key
/// is present in both tables, every row gets [`FALLBACK_COUNT`].
///
/// Coordinates are left unresolved; see [`crate::coordinates::normalize`].
#[must_use]
pub fn aggregate(filtered: &Table, accidents: &Table, columns: &ColumnMapping) -> AggregatedTable {
    let join_key = resolve_join_key(&columns.join_keys, filtered, accidents);

    let counts = join_key.map(|key| accidents.count_by(key));

    match join_key {
        Some(key) => log::debug!("Joining on '{key}'"),
        None => log::debug!(
            "No join key from {:?} shared by both tables, using count {FALLBACK_COUNT}",
            columns.join_keys
        ),
    }

    let rows = filtered
        .records()
        .map(|record| {
            let accident_count = match (join_key, &counts) {
                (Some(key), Some(counts)) => record
                    .get(key)
                    .and_then(Cell::join_key)
                    .and_then(|k| counts.get(&k).copied())
                    .unwrap_or(0),
                _ => FALLBACK_COUNT,
            };

            let mut fields = record.to_ordered();
            fields.set(
                columns.count_column.clone(),
                Cell::Integer(i64::try_from(accident_count).unwrap_or(i64::MAX)),
            );

            AggregatedRow {
                fields,
                accident_count,
                coordinates: None,
            }
        })
        .collect();

    AggregatedTable {
        join_key: join_key.map(str::to_owned),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(columns.iter().map(|c| (*c).to_owned()).collect(), rows)
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_owned())
    }

    fn id_mapping() -> ColumnMapping {
        ColumnMapping {
            join_keys: vec!["id".to_owned()],
            count_column: "accidentCount".to_owned(),
            ..ColumnMapping::default()
        }
    }

    #[test]
    fn counts_accidents_per_key() {
        let regulations = table(
            &["id", "name"],
            vec![
                vec![Cell::Integer(1), text("A")],
                vec![Cell::Integer(2), text("B")],
            ],
        );
        let accidents = table(
            &["id"],
            vec![
                vec![Cell::Integer(1)],
                vec![Cell::Integer(1)],
                vec![Cell::Integer(2)],
            ],
        );

        let result = aggregate(&regulations, &accidents, &id_mapping());

        assert_eq!(result.join_key.as_deref(), Some("id"));
        let json = serde_json::to_string(
            &result.rows.iter().map(|r| &r.fields).collect::<Vec<_>>(),
        )
        .unwrap();
        assert_eq!(
            json,
            r#"[{"id":1,"name":"A","accidentCount":2},{"id":2,"name":"B","accidentCount":1}]"#
        );
    }

    #[test]
    fn unmatched_and_null_keys_count_zero() {
        let regulations = table(
            &["id"],
            vec![vec![Cell::Integer(7)], vec![Cell::Null]],
        );
        let accidents = table(&["id"], vec![vec![Cell::Integer(1)], vec![Cell::Null]]);

        let result = aggregate(&regulations, &accidents, &id_mapping());

        let counts: Vec<u64> = result.rows.iter().map(|r| r.accident_count).collect();
        assert_eq!(counts, [0, 0]);
        assert_eq!(result.rows[0].fields.get("accidentCount"), Some(&Cell::Integer(0)));
    }

    #[test]
    fn float_keys_join_integer_keys() {
        let regulations = table(&["id"], vec![vec![Cell::Integer(3)]]);
        let accidents = table(&["id"], vec![vec![Cell::Float(3.0)], vec![Cell::Float(3.0)]]);
        let result = aggregate(&regulations, &accidents, &id_mapping());
        assert_eq!(result.rows[0].accident_count, 2);
    }

    #[test]
    fn no_shared_key_falls_back_to_one_per_row() {
        let regulations = table(&["id"], vec![vec![Cell::Integer(1)], vec![Cell::Integer(2)]]);
        let accidents = table(&["発生日"], vec![vec![text("2023-01-01")]]);

        let result = aggregate(&regulations, &accidents, &id_mapping());

        assert_eq!(result.join_key, None);
        assert!(result.rows.iter().all(|r| r.accident_count == FALLBACK_COUNT));
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn uses_first_key_present_in_both_tables() {
        let columns = ColumnMapping {
            join_keys: vec!["交差点ID".to_owned(), "交差点名".to_owned()],
            ..ColumnMapping::default()
        };
        let regulations = table(&["交差点名"], vec![vec![text("駅前")], vec![text("本町")]]);
        let accidents = table(
            &["交差点名", "交差点ID"],
            vec![vec![text("駅前"), Cell::Integer(9)]],
        );

        let result = aggregate(&regulations, &accidents, &columns);

        assert_eq!(result.join_key.as_deref(), Some("交差点名"));
        assert_eq!(result.rows[0].accident_count, 1);
        assert_eq!(result.rows[1].accident_count, 0);
    }

    #[test]
    fn existing_count_column_is_replaced_not_duplicated() {
        let regulations = table(&["id", "accidentCount"], vec![vec![Cell::Integer(1), Cell::Null]]);
        let accidents = table(&["id"], vec![vec![Cell::Integer(1)]]);

        let result = aggregate(&regulations, &accidents, &id_mapping());

        let fields = &result.rows[0].fields;
        assert_eq!(fields.keys().collect::<Vec<_>>(), ["id", "accidentCount"]);
        assert_eq!(fields.get("accidentCount"), Some(&Cell::Integer(1)));
    }
}
