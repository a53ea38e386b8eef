use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::{FileId, FileRecord, NewFile, RowRecord};
use crate::config::{redact_database_url, ServiceConfig};
use crate::database::PgRowStore;
use crate::error::InsightsError;
use crate::insights::{column_value_counts, file_insights, FileInsights, InMemoryTable};
use crate::memory::MemoryRowStore;
use crate::projector::project_rows;
use crate::prompt::{build_column_prompt, ColumnPrompt};
use crate::source::read_source;
use crate::store::{RowStore, StoredTable};
use crate::table::Table;

const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, PartialEq)]
pub struct RowsPage {
    pub skip: u64,
    pub limit: u64,
    pub rows_count: u64,
    pub rows: Vec<RowRecord>,
}

pub struct InsightsEngine {
    store: Arc<dyn RowStore>,
    config: ServiceConfig,
}

impl InsightsEngine {
    pub fn new(store: Arc<dyn RowStore>, config: ServiceConfig) -> Self {
        Self { store, config }
    }

    /// Connects the row store named by the configuration.
    pub async fn from_config(config: ServiceConfig) -> Result<Self, InsightsError> {
        info!("Initializing Insights Engine");

        let store: Arc<dyn RowStore> = match &config.database_url {
            Some(database_url) => {
                info!(
                    "Using Postgres row store at {}",
                    redact_database_url(database_url)
                );
                Arc::new(
                    PgRowStore::new(
                        database_url,
                        config.database_pool_size,
                        config.delete_retries,
                    )
                    .await?,
                )
            }
            None => {
                warn!("DATABASE_URL is not set, uploads are kept in memory only");
                Arc::new(MemoryRowStore::new())
            }
        };

        info!("Insights Engine initialized successfully");
        Ok(Self::new(store, config))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub async fn upload_csv(
        &self,
        filename: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<FileRecord, InsightsError> {
        if !is_csv_content_type(content_type) {
            return Err(InsightsError::UnsupportedInput {
                message: format!("Only csv files are supported, got '{}'", content_type),
            });
        }
        if filename.trim().is_empty() {
            return Err(InsightsError::UnsupportedInput {
                message: "Filename is required".to_string(),
            });
        }
        if content.len() > self.config.max_upload_bytes {
            return Err(InsightsError::UnsupportedInput {
                message: format!(
                    "Upload of {} bytes exceeds the {} byte limit",
                    content.len(),
                    self.config.max_upload_bytes
                ),
            });
        }

        let table = Table::from_csv_bytes(content)?;
        let profile = InMemoryTable::profile(filename, table);
        let (columns_config, display) = profile.into_parts();
        let rows = project_rows(&display, &columns_config)?;

        let file = NewFile {
            filename: filename.to_string(),
            rows_count: display.rows_count() as u64,
            columns_config,
            uploaded_at: Utc::now(),
        };

        let record = self.store.insert_file(file, rows).await?;
        info!(
            "Uploaded '{}' as {} ({} rows, {} columns)",
            record.filename,
            record.id,
            record.rows_count,
            record.columns_config.len()
        );
        Ok(record)
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, InsightsError> {
        self.store.list_files().await
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<(), InsightsError> {
        let file_id: FileId = file_id.parse()?;

        if !self.store.delete_file(file_id).await? {
            return Err(InsightsError::FileNotFound {
                file_id: file_id.to_string(),
            });
        }

        info!("Deleted file {}", file_id);
        Ok(())
    }

    pub async fn get_rows(
        &self,
        file_id: &str,
        skip: u64,
        limit: Option<u64>,
    ) -> Result<RowsPage, InsightsError> {
        let file_id: FileId = file_id.parse()?;
        self.require_file(file_id).await?;

        let limit = self.config.page_size(limit);
        let rows_count = self.store.count_rows(file_id).await?;
        let rows = self.store.fetch_rows(file_id, skip, limit).await?;

        Ok(RowsPage {
            skip,
            limit,
            rows_count,
            rows,
        })
    }

    pub async fn get_insights(&self, file_id: &str) -> Result<FileInsights, InsightsError> {
        let file_id: FileId = file_id.parse()?;
        let table = StoredTable::open(self.store.clone(), file_id).await?;

        file_insights(&table).await
    }

    pub async fn column_prompt(
        &self,
        file_id: &str,
        column_name: &str,
    ) -> Result<ColumnPrompt, InsightsError> {
        let file_id: FileId = file_id.parse()?;
        let table = StoredTable::open(self.store.clone(), file_id).await?;

        let breakdown = column_value_counts(&table, column_name).await?;

        let file = table.file();
        let other_meta_columns: Vec<String> = file
            .columns_config
            .meta_headers()
            .filter(|header| *header != column_name)
            .map(str::to_string)
            .collect();

        Ok(build_column_prompt(
            &file.filename,
            file.rows_count,
            &breakdown,
            &other_meta_columns,
        ))
    }

    /// Profiles a CSV source in memory without persisting it.
    pub async fn analyze_source(&self, source_path: &str) -> Result<FileInsights, InsightsError> {
        let content = read_source(source_path).await?;
        if content.len() > self.config.max_upload_bytes {
            return Err(InsightsError::UnsupportedInput {
                message: format!(
                    "Source of {} bytes exceeds the {} byte limit",
                    content.len(),
                    self.config.max_upload_bytes
                ),
            });
        }

        let table = Table::from_csv_bytes(&content)?;
        file_insights(&InMemoryTable::profile(source_path, table)).await
    }

    pub async fn health_check(&self) -> Result<(), InsightsError> {
        self.store.ping().await
    }

    async fn require_file(&self, file_id: FileId) -> Result<FileRecord, InsightsError> {
        self.store
            .get_file(file_id)
            .await?
            .ok_or_else(|| InsightsError::FileNotFound {
                file_id: file_id.to_string(),
            })
    }
}

fn is_csv_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(CSV_CONTENT_TYPE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_csv_content_types_only() {
        assert!(is_csv_content_type("text/csv"));
        assert!(is_csv_content_type("Text/CSV; charset=utf-8"));
        assert!(!is_csv_content_type("application/json"));
        assert!(!is_csv_content_type(""));
    }
}
