use crate::catalog::{ColumnsConfig, NewRow, RowColumn};
use crate::error::InsightsError;
use crate::table::DisplayTable;

/// Turns every table row into a persistable row, tagging each cell with its column metadata.
pub fn project_rows(
    table: &DisplayTable,
    columns_config: &ColumnsConfig,
) -> Result<Vec<NewRow>, InsightsError> {
    if table.headers().len() != columns_config.len() {
        return Err(InsightsError::SchemaMismatch {
            message: format!(
                "Table has {} columns but metadata describes {}",
                table.headers().len(),
                columns_config.len()
            ),
        });
    }

    let pairs = table.headers().iter().zip(columns_config.iter());
    for (position, (header, column)) in pairs.enumerate() {
        if column.index != position || &column.header != header {
            return Err(InsightsError::SchemaMismatch {
                message: format!(
                    "Column {} is '{}' in the table but metadata has '{}' at index {}",
                    position, header, column.header, column.index
                ),
            });
        }
    }

    table
        .rows()
        .iter()
        .enumerate()
        .map(|(position, row)| {
            if row.len() != columns_config.len() {
                return Err(InsightsError::SchemaMismatch {
                    message: format!(
                        "Row {} has {} cells but metadata describes {} columns",
                        position + 1,
                        row.len(),
                        columns_config.len()
                    ),
                });
            }

            let columns = row
                .iter()
                .zip(columns_config.iter())
                .map(|(cell, column)| RowColumn {
                    index: column.index,
                    column_type: column.column_type,
                    header: column.header.clone(),
                    input_value: cell.value.clone(),
                    is_missing: cell.is_missing,
                })
                .collect();

            Ok(NewRow {
                row_number: position as u64 + 1,
                columns,
            })
        })
        .collect()
}
