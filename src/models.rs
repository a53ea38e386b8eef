use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::catalog::{ColumnsConfig, FileId, FileRecord, RowColumn, RowRecord, MISSING_SENTINEL};
use crate::error::InsightsError;
use crate::schema::{csv_file_cells, csv_files};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = csv_files)]
#[diesel(primary_key(id))]
pub struct CsvFile {
    pub id: Uuid,
    pub filename: String,
    pub rows_count: i64,
    pub columns_config: serde_json::Value,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = csv_files)]
pub struct NewCsvFile<'a> {
    pub id: &'a Uuid,
    pub filename: &'a str,
    pub rows_count: i64,
    pub columns_config: &'a serde_json::Value,
    pub uploaded_at: DateTime<Utc>,
}

/// One column entry of one persisted row.
#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = csv_file_cells)]
#[diesel(belongs_to(CsvFile, foreign_key = file_id))]
#[diesel(primary_key(file_id, row_number, column_index))]
pub struct CsvFileCell {
    pub file_id: Uuid,
    pub row_number: i64,
    pub column_index: i32,
    pub column_type: String,
    pub header: String,
    /// `None` for a missing cell.
    pub input_value: Option<String>,
}

#[derive(Insertable)]
#[diesel(table_name = csv_file_cells)]
pub struct NewCsvFileCell<'a> {
    pub file_id: Uuid,
    pub row_number: i64,
    pub column_index: i32,
    pub column_type: &'a str,
    pub header: &'a str,
    pub input_value: Option<&'a str>,
}

impl TryFrom<CsvFile> for FileRecord {
    type Error = InsightsError;

    fn try_from(file: CsvFile) -> Result<Self, Self::Error> {
        let columns_config: ColumnsConfig = serde_json::from_value(file.columns_config)?;
        let rows_count = u64::try_from(file.rows_count).map_err(|_| InsightsError::DatabaseError {
            message: format!("Negative rows_count stored for file {}", file.id),
        })?;

        Ok(FileRecord {
            id: FileId::from(file.id),
            filename: file.filename,
            rows_count,
            columns_config,
            uploaded_at: file.uploaded_at,
        })
    }
}

/// Reassembles rows from cells ordered by `(row_number, column_index)`.
pub fn cells_into_rows(
    file_id: FileId,
    cells: Vec<CsvFileCell>,
) -> Result<Vec<RowRecord>, InsightsError> {
    let mut rows: Vec<RowRecord> = Vec::new();

    for cell in cells {
        let row_number = cell.row_number as u64;
        let column = RowColumn {
            index: cell.column_index as usize,
            column_type: cell.column_type.parse()?,
            header: cell.header,
            is_missing: cell.input_value.is_none(),
            input_value: cell
                .input_value
                .unwrap_or_else(|| MISSING_SENTINEL.to_string()),
        };

        match rows.last_mut() {
            Some(row) if row.row_number == row_number => row.columns.push(column),
            _ => rows.push(RowRecord {
                file_id,
                row_number,
                columns: vec![column],
            }),
        }
    }

    Ok(rows)
}
