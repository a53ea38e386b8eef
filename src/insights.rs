//! Missing-value and meta value-count reports.
//!
//! Both reports are computed through the [`TableSource`] capability so that an
//! in-memory table and a persisted file go through exactly the same code. A
//! source only has to answer the first grouping stage, counting rows per
//! `(header, value)` pair; regrouping by header and ordering the result happens
//! here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::{ColumnFilter, ColumnType, ColumnsConfig, ValueTally};
use crate::classifier::classify;
use crate::error::InsightsError;
use crate::table::{DisplayTable, Table};

#[async_trait]
pub trait TableSource: Send + Sync {
    /// Identifier used in not-found errors.
    fn reference(&self) -> String;

    async fn rows_count(&self) -> Result<u64, InsightsError>;

    async fn columns_config(&self) -> Result<ColumnsConfig, InsightsError>;

    /// Rows per `(header, value)` over the cells selected by `filter`, missing cells excluded.
    async fn count_values(&self, filter: &ColumnFilter) -> Result<Vec<ValueTally>, InsightsError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MissingValues {
    pub header: String,
    pub column_index: usize,
    pub empty_values_percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetaValueCounts {
    pub header: String,
    pub column_index: usize,
    pub value_counts: Vec<ValueCount>,
}

impl MetaValueCounts {
    pub fn total(&self) -> u64 {
        self.value_counts.iter().map(|v| v.count).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileInsights {
    pub missing_values: Vec<MissingValues>,
    pub meta_value_counts: Vec<MetaValueCounts>,
}

/// `empty / rows * 100`; an empty file reports 0.
pub fn empty_values_percentage(empty_values_count: u64, rows_count: u64) -> f64 {
    if rows_count == 0 {
        return 0.0;
    }
    (empty_values_count as f64 / rows_count as f64) * 100.0
}

pub fn missing_values_report(columns_config: &ColumnsConfig, rows_count: u64) -> Vec<MissingValues> {
    columns_config
        .iter()
        .map(|column| MissingValues {
            header: column.header.clone(),
            column_index: column.index,
            empty_values_percentage: empty_values_percentage(column.empty_values_count, rows_count),
        })
        .collect()
}

/// Second grouping stage: folds `(header, value)` tallies into one breakdown per column.
pub fn regroup_by_header(tallies: Vec<ValueTally>) -> Vec<MetaValueCounts> {
    let mut by_header: HashMap<String, MetaValueCounts> = HashMap::new();

    for tally in tallies {
        by_header
            .entry(tally.header.clone())
            .or_insert_with(|| MetaValueCounts {
                header: tally.header,
                column_index: tally.index,
                value_counts: Vec::new(),
            })
            .value_counts
            .push(ValueCount {
                value: tally.value,
                count: tally.count,
            });
    }

    let mut columns: Vec<MetaValueCounts> = by_header.into_values().collect();
    for column in &mut columns {
        column
            .value_counts
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    }
    columns.sort_by_key(|c| c.column_index);
    columns
}

pub async fn file_insights<S>(source: &S) -> Result<FileInsights, InsightsError>
where
    S: TableSource + ?Sized,
{
    let rows_count = source.rows_count().await?;
    let columns_config = source.columns_config().await?;
    let tallies = source.count_values(&ColumnFilter::AllMeta).await?;

    Ok(FileInsights {
        missing_values: missing_values_report(&columns_config, rows_count),
        meta_value_counts: regroup_by_header(tallies),
    })
}

/// Value counts of a single `meta` column.
///
/// Fails with [`InsightsError::ColumnNotFound`] when the column is absent or is
/// not a `meta` column. A meta column without any non-missing value yields an
/// empty breakdown.
pub async fn column_value_counts<S>(
    source: &S,
    header: &str,
) -> Result<MetaValueCounts, InsightsError>
where
    S: TableSource + ?Sized,
{
    let columns_config = source.columns_config().await?;
    let column = columns_config
        .get(header)
        .filter(|c| c.column_type == ColumnType::Meta)
        .ok_or_else(|| InsightsError::ColumnNotFound {
            file_id: source.reference(),
            column: header.to_string(),
        })?;

    let filter = ColumnFilter::MetaColumn(header.to_string());
    let tallies = source.count_values(&filter).await?;

    Ok(regroup_by_header(tallies)
        .into_iter()
        .next()
        .unwrap_or_else(|| MetaValueCounts {
            header: column.header.clone(),
            column_index: column.index,
            value_counts: Vec::new(),
        }))
}

/// A parsed table profiled without persisting it.
#[derive(Debug, Clone)]
pub struct InMemoryTable {
    name: String,
    columns_config: ColumnsConfig,
    table: DisplayTable,
}

impl InMemoryTable {
    /// Normalizes, classifies and substitutes the sentinel, in that order.
    pub fn profile(name: impl Into<String>, table: Table) -> Self {
        let table = table.normalize();
        let columns_config = classify(&table);

        Self {
            name: name.into(),
            columns_config,
            table: table.into_display(),
        }
    }

    pub fn table(&self) -> &DisplayTable {
        &self.table
    }

    pub fn config(&self) -> &ColumnsConfig {
        &self.columns_config
    }

    pub fn into_parts(self) -> (ColumnsConfig, DisplayTable) {
        (self.columns_config, self.table)
    }
}

#[async_trait]
impl TableSource for InMemoryTable {
    fn reference(&self) -> String {
        self.name.clone()
    }

    async fn rows_count(&self) -> Result<u64, InsightsError> {
        Ok(self.table.rows_count() as u64)
    }

    async fn columns_config(&self) -> Result<ColumnsConfig, InsightsError> {
        Ok(self.columns_config.clone())
    }

    async fn count_values(&self, filter: &ColumnFilter) -> Result<Vec<ValueTally>, InsightsError> {
        let mut counts: HashMap<(usize, &str), u64> = HashMap::new();

        for column in self
            .columns_config
            .iter()
            .filter(|c| filter.matches(c.column_type, &c.header))
        {
            for row in self.table.rows() {
                let cell = &row[column.index];
                if !cell.is_missing {
                    *counts.entry((column.index, cell.value.as_str())).or_insert(0) += 1;
                }
            }
        }

        let headers = self.table.headers();
        Ok(counts
            .into_iter()
            .map(|((index, value), count)| ValueTally {
                header: headers[index].clone(),
                index,
                value: value.to_string(),
                count,
            })
            .collect())
    }
}
