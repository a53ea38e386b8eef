use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::info;

use crate::catalog::{ColumnFilter, FileId, FileRecord, NewFile, NewRow, RowRecord, ValueTally};
use crate::error::InsightsError;
use crate::store::RowStore;

struct StoredFile {
    record: FileRecord,
    rows: Vec<RowRecord>,
}

/// Row store kept in process memory, used when no database is configured.
#[derive(Default)]
pub struct MemoryRowStore {
    files: RwLock<HashMap<FileId, StoredFile>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn insert_file(
        &self,
        file: NewFile,
        rows: Vec<NewRow>,
    ) -> Result<FileRecord, InsightsError> {
        let file_id = FileId::new_v4();
        let record = FileRecord {
            id: file_id,
            filename: file.filename,
            rows_count: file.rows_count,
            columns_config: file.columns_config,
            uploaded_at: file.uploaded_at,
        };

        let rows = rows
            .into_iter()
            .map(|row| RowRecord {
                file_id,
                row_number: row.row_number,
                columns: row.columns,
            })
            .collect::<Vec<_>>();

        info!(
            "Storing file {} ({}) with {} rows in memory",
            file_id,
            record.filename,
            rows.len()
        );

        self.files.write().await.insert(
            file_id,
            StoredFile {
                record: record.clone(),
                rows,
            },
        );

        Ok(record)
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, InsightsError> {
        let mut files: Vec<FileRecord> = self
            .files
            .read()
            .await
            .values()
            .map(|f| f.record.clone())
            .collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(files)
    }

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, InsightsError> {
        Ok(self
            .files
            .read()
            .await
            .get(&file_id)
            .map(|f| f.record.clone()))
    }

    async fn delete_file(&self, file_id: FileId) -> Result<bool, InsightsError> {
        let removed = self.files.write().await.remove(&file_id);
        if let Some(stored) = &removed {
            info!(
                "Deleted file {} and {} rows from memory",
                file_id,
                stored.rows.len()
            );
        }
        Ok(removed.is_some())
    }

    async fn count_rows(&self, file_id: FileId) -> Result<u64, InsightsError> {
        Ok(self
            .files
            .read()
            .await
            .get(&file_id)
            .map_or(0, |f| f.rows.len() as u64))
    }

    async fn fetch_rows(
        &self,
        file_id: FileId,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<RowRecord>, InsightsError> {
        let files = self.files.read().await;
        let Some(stored) = files.get(&file_id) else {
            return Ok(Vec::new());
        };

        Ok(stored
            .rows
            .iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn count_values(
        &self,
        file_id: FileId,
        filter: &ColumnFilter,
    ) -> Result<Vec<ValueTally>, InsightsError> {
        let files = self.files.read().await;
        let Some(stored) = files.get(&file_id) else {
            return Ok(Vec::new());
        };

        // Keyed like the Postgres GROUP BY; the index rides along from the first cell seen.
        let mut groups: HashMap<(&str, &str), (usize, u64)> = HashMap::new();
        for row in &stored.rows {
            for cell in row
                .columns
                .iter()
                .filter(|c| filter.matches(c.column_type, &c.header))
                .filter(|c| !c.is_missing)
            {
                groups
                    .entry((cell.header.as_str(), cell.input_value.as_str()))
                    .or_insert((cell.index, 0))
                    .1 += 1;
            }
        }

        Ok(groups
            .into_iter()
            .map(|((header, value), (index, count))| ValueTally {
                header: header.to_string(),
                index,
                value: value.to_string(),
                count,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), InsightsError> {
        Ok(())
    }
}
