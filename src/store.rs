use async_trait::async_trait;
use std::sync::Arc;

use crate::catalog::{
    ColumnFilter, ColumnsConfig, FileId, FileRecord, NewFile, NewRow, RowRecord, ValueTally,
};
use crate::error::InsightsError;
use crate::insights::TableSource;

/// Persistence boundary for uploaded files and their rows.
///
/// Implementations must make [`RowStore::insert_file`] all-or-nothing and must
/// not report a successful [`RowStore::delete_file`] while any row of the file
/// survives.
#[async_trait]
pub trait RowStore: Send + Sync {
    async fn insert_file(&self, file: NewFile, rows: Vec<NewRow>)
        -> Result<FileRecord, InsightsError>;

    /// Newest upload first.
    async fn list_files(&self) -> Result<Vec<FileRecord>, InsightsError>;

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, InsightsError>;

    /// Returns `false` when no such file existed.
    async fn delete_file(&self, file_id: FileId) -> Result<bool, InsightsError>;

    async fn count_rows(&self, file_id: FileId) -> Result<u64, InsightsError>;

    /// Rows ordered by `row_number`, skipping the first `skip`.
    async fn fetch_rows(
        &self,
        file_id: FileId,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<RowRecord>, InsightsError>;

    /// Grouped `(header, value)` counts over the file's cells, excluding missing cells.
    async fn count_values(
        &self,
        file_id: FileId,
        filter: &ColumnFilter,
    ) -> Result<Vec<ValueTally>, InsightsError>;

    async fn ping(&self) -> Result<(), InsightsError>;
}

/// A persisted file seen through the aggregation contract.
pub struct StoredTable {
    store: Arc<dyn RowStore>,
    file: FileRecord,
}

impl StoredTable {
    pub async fn open(store: Arc<dyn RowStore>, file_id: FileId) -> Result<Self, InsightsError> {
        let file = store
            .get_file(file_id)
            .await?
            .ok_or_else(|| InsightsError::FileNotFound {
                file_id: file_id.to_string(),
            })?;

        Ok(Self { store, file })
    }

    pub fn file(&self) -> &FileRecord {
        &self.file
    }
}

#[async_trait]
impl TableSource for StoredTable {
    fn reference(&self) -> String {
        self.file.id.to_string()
    }

    async fn rows_count(&self) -> Result<u64, InsightsError> {
        Ok(self.file.rows_count)
    }

    async fn columns_config(&self) -> Result<ColumnsConfig, InsightsError> {
        Ok(self.file.columns_config.clone())
    }

    async fn count_values(&self, filter: &ColumnFilter) -> Result<Vec<ValueTally>, InsightsError> {
        self.store.count_values(self.file.id, filter).await
    }
}
