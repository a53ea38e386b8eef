use std::collections::HashSet;

use crate::catalog::{ColumnConfig, ColumnType, ColumnsConfig};
use crate::table::Table;

/// Columns with fewer distinct non-missing values than this (and more than one) are `meta`.
pub const META_CARDINALITY_LIMIT: usize = 10;

pub fn classify_cardinality(unique_count: usize) -> ColumnType {
    if unique_count <= 1 {
        ColumnType::Ignore
    } else if unique_count < META_CARDINALITY_LIMIT {
        ColumnType::Meta
    } else {
        ColumnType::Data
    }
}

/// Builds the column metadata of a normalized table.
pub fn classify(table: &Table) -> ColumnsConfig {
    let columns = table
        .headers()
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let mut distinct = HashSet::new();
            let mut empty_values_count = 0u64;

            for cell in table.column(index) {
                match cell {
                    Some(value) => {
                        distinct.insert(value);
                    }
                    None => empty_values_count += 1,
                }
            }

            ColumnConfig {
                header: header.clone(),
                index,
                column_type: classify_cardinality(distinct.len()),
                empty_values_count,
            }
        })
        .collect();

    ColumnsConfig::new(columns)
}
