use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::InsightsError;

/// Display string persisted in place of a missing cell.
pub const MISSING_SENTINEL: &str = "no_value";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ColumnType {
    #[serde(rename = "ignore")]
    Ignore,
    #[serde(rename = "meta")]
    Meta,
    #[serde(rename = "data")]
    Data,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Ignore => "ignore",
            ColumnType::Meta => "meta",
            ColumnType::Data => "data",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = InsightsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ignore" => Ok(ColumnType::Ignore),
            "meta" => Ok(ColumnType::Meta),
            "data" => Ok(ColumnType::Data),
            other => Err(InsightsError::InternalError {
                message: format!("Unknown column type: {}", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnConfig {
    pub header: String,
    pub index: usize,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub empty_values_count: u64,
}

/// Per-column metadata of an uploaded table, kept in original column order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ColumnsConfig {
    columns: Vec<ColumnConfig>,
}

impl ColumnsConfig {
    pub fn new(columns: Vec<ColumnConfig>) -> Self {
        Self { columns }
    }

    pub fn get(&self, header: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.header == header)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn meta_headers(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Meta)
            .map(|c| c.header.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for FileId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for FileId {
    type Err = InsightsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim())
            .map(FileId)
            .map_err(|_| InsightsError::InvalidReference {
                value: value.to_string(),
            })
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub id: FileId,
    pub filename: String,
    pub rows_count: u64,
    pub columns_config: ColumnsConfig,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFile {
    pub filename: String,
    pub rows_count: u64,
    pub columns_config: ColumnsConfig,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowColumn {
    pub index: usize,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub header: String,
    pub input_value: String,
    /// Set when `input_value` is the sentinel standing in for a missing cell.
    #[serde(default)]
    pub is_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRow {
    pub row_number: u64,
    pub columns: Vec<RowColumn>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RowRecord {
    pub file_id: FileId,
    pub row_number: u64,
    pub columns: Vec<RowColumn>,
}

/// Which cells a grouped value count runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    AllMeta,
    MetaColumn(String),
}

impl ColumnFilter {
    pub fn matches(&self, column_type: ColumnType, header: &str) -> bool {
        if column_type != ColumnType::Meta {
            return false;
        }
        match self {
            ColumnFilter::AllMeta => true,
            ColumnFilter::MetaColumn(wanted) => wanted == header,
        }
    }
}

/// First grouping stage: how many rows hold `value` in the column `header`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTally {
    pub header: String,
    pub index: usize,
    pub value: String,
    pub count: u64,
}
