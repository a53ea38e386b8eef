use async_trait::async_trait;
use diesel::dsl::{count_distinct, count_star, min};
use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::{info, warn};

use crate::catalog::{
    ColumnFilter, ColumnType, FileId, FileRecord, NewFile, NewRow, RowRecord, ValueTally,
};
use crate::error::InsightsError;
use crate::models::*;
use crate::schema::*;
use crate::store::RowStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

// Six bind parameters per cell; Postgres caps a statement at 65535.
const CELL_INSERT_BATCH: usize = 10_000;

#[derive(Clone)]
pub struct PgRowStore {
    pool: Pool<AsyncPgConnection>,
    delete_attempts: u32,
}

impl PgRowStore {
    pub async fn new(
        database_url: &str,
        pool_size: usize,
        delete_attempts: u32,
    ) -> Result<Self, InsightsError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .max_size(pool_size)
            .build()
            .map_err(|e| InsightsError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        Self::run_migrations(database_url).await?;

        Ok(Self {
            pool,
            delete_attempts: delete_attempts.max(1),
        })
    }

    /// diesel_migrations only speaks to a synchronous connection, so this runs on the blocking pool.
    pub async fn run_migrations(database_url: &str) -> Result<(), InsightsError> {
        use diesel::PgConnection;

        let database_url = database_url.to_string();
        tokio::task::spawn_blocking(move || {
            let mut connection = PgConnection::establish(&database_url).map_err(|e| {
                InsightsError::ConfigError {
                    message: format!("Failed to establish connection for migrations: {}", e),
                }
            })?;

            let applied = connection
                .run_pending_migrations(MIGRATIONS)
                .map_err(|e| InsightsError::ConfigError {
                    message: format!("Failed to run migrations: {}", e),
                })?;

            info!("Applied {} pending migrations", applied.len());
            Ok(())
        })
        .await
        .map_err(|e| InsightsError::InternalError {
            message: format!("Migration task failed: {}", e),
        })?
    }

    async fn connection(&self) -> Result<Object<AsyncPgConnection>, InsightsError> {
        self.pool
            .get()
            .await
            .map_err(|e| InsightsError::DatabaseError {
                message: format!("Failed to get database connection: {}", e),
            })
    }

    async fn delete_once(&self, file_id: FileId) -> Result<bool, InsightsError> {
        let mut conn = self.connection().await?;
        let uuid = *file_id.as_uuid();

        conn.transaction::<_, InsightsError, _>(|conn| {
            Box::pin(async move {
                let cells = diesel::delete(
                    csv_file_cells::table.filter(csv_file_cells::file_id.eq(uuid)),
                )
                .execute(conn)
                .await?;

                let files = diesel::delete(csv_files::table.filter(csv_files::id.eq(uuid)))
                    .execute(conn)
                    .await?;

                if files > 0 {
                    info!("Deleted file {} and {} cells", uuid, cells);
                }
                Ok(files > 0)
            })
        })
        .await
    }
}

#[async_trait]
impl RowStore for PgRowStore {
    async fn insert_file(
        &self,
        file: NewFile,
        rows: Vec<NewRow>,
    ) -> Result<FileRecord, InsightsError> {
        let file_id = FileId::new_v4();
        let uuid = *file_id.as_uuid();
        let columns_config = serde_json::to_value(&file.columns_config)?;
        let rows_count = i64::try_from(file.rows_count).map_err(|_| {
            InsightsError::UnsupportedInput {
                message: format!("Too many rows: {}", file.rows_count),
            }
        })?;

        info!(
            "Inserting file {} ({}) with {} rows",
            file_id, file.filename, rows_count
        );

        let new_file = NewCsvFile {
            id: &uuid,
            filename: &file.filename,
            rows_count,
            columns_config: &columns_config,
            uploaded_at: file.uploaded_at,
        };

        let cells: Vec<NewCsvFileCell> = rows
            .iter()
            .flat_map(|row| {
                row.columns.iter().map(move |column| NewCsvFileCell {
                    file_id: uuid,
                    row_number: row.row_number as i64,
                    column_index: column.index as i32,
                    column_type: column.column_type.as_str(),
                    header: &column.header,
                    input_value: (!column.is_missing).then_some(column.input_value.as_str()),
                })
            })
            .collect();

        let mut conn = self.connection().await?;
        conn.transaction::<_, InsightsError, _>(|conn| {
            Box::pin(async move {
                diesel::insert_into(csv_files::table)
                    .values(&new_file)
                    .execute(conn)
                    .await?;

                for batch in cells.chunks(CELL_INSERT_BATCH) {
                    diesel::insert_into(csv_file_cells::table)
                        .values(batch)
                        .execute(conn)
                        .await?;
                }

                Ok(())
            })
        })
        .await?;

        Ok(FileRecord {
            id: file_id,
            filename: file.filename,
            rows_count: file.rows_count,
            columns_config: file.columns_config,
            uploaded_at: file.uploaded_at,
        })
    }

    async fn list_files(&self) -> Result<Vec<FileRecord>, InsightsError> {
        let mut conn = self.connection().await?;

        let files = csv_files::table
            .order(csv_files::uploaded_at.desc())
            .load::<CsvFile>(&mut conn)
            .await?;

        files.into_iter().map(FileRecord::try_from).collect()
    }

    async fn get_file(&self, file_id: FileId) -> Result<Option<FileRecord>, InsightsError> {
        let mut conn = self.connection().await?;

        let file = csv_files::table
            .filter(csv_files::id.eq(file_id.as_uuid()))
            .first::<CsvFile>(&mut conn)
            .await
            .optional()?;

        file.map(FileRecord::try_from).transpose()
    }

    async fn delete_file(&self, file_id: FileId) -> Result<bool, InsightsError> {
        let mut attempt = 1;
        loop {
            match self.delete_once(file_id).await {
                Ok(deleted) => return Ok(deleted),
                Err(e) if attempt < self.delete_attempts => {
                    warn!(
                        "Deleting file {} failed on attempt {}/{}: {}",
                        file_id, attempt, self.delete_attempts, e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn count_rows(&self, file_id: FileId) -> Result<u64, InsightsError> {
        let mut conn = self.connection().await?;

        let count = csv_file_cells::table
            .filter(csv_file_cells::file_id.eq(file_id.as_uuid()))
            .select(count_distinct(csv_file_cells::row_number))
            .get_result::<i64>(&mut conn)
            .await?;

        Ok(count as u64)
    }

    // Row numbers are contiguous from 1, so a page is a row_number range.
    async fn fetch_rows(
        &self,
        file_id: FileId,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<RowRecord>, InsightsError> {
        let first = i64::try_from(skip).unwrap_or(i64::MAX);
        let last = i64::try_from(skip.saturating_add(limit)).unwrap_or(i64::MAX);

        let mut conn = self.connection().await?;
        let cells = csv_file_cells::table
            .filter(csv_file_cells::file_id.eq(file_id.as_uuid()))
            .filter(csv_file_cells::row_number.gt(first))
            .filter(csv_file_cells::row_number.le(last))
            .order((
                csv_file_cells::row_number.asc(),
                csv_file_cells::column_index.asc(),
            ))
            .load::<CsvFileCell>(&mut conn)
            .await?;

        cells_into_rows(file_id, cells)
    }

    async fn count_values(
        &self,
        file_id: FileId,
        filter: &ColumnFilter,
    ) -> Result<Vec<ValueTally>, InsightsError> {
        let mut conn = self.connection().await?;
        let meta_cells = csv_file_cells::table
            .filter(csv_file_cells::file_id.eq(file_id.as_uuid()))
            .filter(csv_file_cells::column_type.eq(ColumnType::Meta.as_str()))
            .filter(csv_file_cells::input_value.is_not_null());

        let grouped: Vec<(String, Option<String>, Option<i32>, i64)> = match filter {
            ColumnFilter::AllMeta => {
                meta_cells
                    .group_by((csv_file_cells::header, csv_file_cells::input_value))
                    .select((
                        csv_file_cells::header,
                        csv_file_cells::input_value,
                        min(csv_file_cells::column_index),
                        count_star(),
                    ))
                    .load(&mut conn)
                    .await?
            }
            ColumnFilter::MetaColumn(name) => {
                meta_cells
                    .filter(csv_file_cells::header.eq(name))
                    .group_by((csv_file_cells::header, csv_file_cells::input_value))
                    .select((
                        csv_file_cells::header,
                        csv_file_cells::input_value,
                        min(csv_file_cells::column_index),
                        count_star(),
                    ))
                    .load(&mut conn)
                    .await?
            }
        };

        Ok(grouped
            .into_iter()
            .filter_map(|(header, value, index, count)| {
                Some(ValueTally {
                    header,
                    index: index.unwrap_or_default() as usize,
                    value: value?,
                    count: count as u64,
                })
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), InsightsError> {
        let mut conn = self.connection().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }
}
