use crate::catalog::{ColumnConfig, ColumnType, FileRecord, RowColumn, RowRecord};
use crate::engine::RowsPage;
use crate::insights::{FileInsights, MetaValueCounts, MissingValues, ValueCount};
use crate::prompt::ColumnPrompt;
use crate::proto::insights;

impl From<ColumnType> for insights::ColumnType {
    fn from(domain: ColumnType) -> Self {
        match domain {
            ColumnType::Ignore => insights::ColumnType::Ignore,
            ColumnType::Meta => insights::ColumnType::Meta,
            ColumnType::Data => insights::ColumnType::Data,
        }
    }
}

impl From<ColumnConfig> for insights::ColumnConfig {
    fn from(domain: ColumnConfig) -> Self {
        Self {
            header: domain.header,
            index: domain.index as u32,
            r#type: insights::ColumnType::from(domain.column_type).into(),
            empty_values_count: domain.empty_values_count,
        }
    }
}

impl From<FileRecord> for insights::FileRecord {
    fn from(domain: FileRecord) -> Self {
        Self {
            id: domain.id.to_string(),
            filename: domain.filename,
            rows_count: domain.rows_count,
            columns_config: domain
                .columns_config
                .iter()
                .cloned()
                .map(|c| c.into())
                .collect(),
            uploaded_at: domain.uploaded_at.to_rfc3339(),
        }
    }
}

impl From<RowColumn> for insights::RowColumn {
    fn from(domain: RowColumn) -> Self {
        Self {
            index: domain.index as u32,
            r#type: insights::ColumnType::from(domain.column_type).into(),
            header: domain.header,
            input_value: domain.input_value,
            is_missing: domain.is_missing,
        }
    }
}

impl From<RowRecord> for insights::Row {
    fn from(domain: RowRecord) -> Self {
        Self {
            row_number: domain.row_number,
            columns: domain.columns.into_iter().map(|c| c.into()).collect(),
        }
    }
}

impl From<RowsPage> for insights::GetFileRowsResponse {
    fn from(domain: RowsPage) -> Self {
        Self {
            skip: domain.skip,
            limit: domain.limit,
            rows_count: domain.rows_count,
            rows: domain.rows.into_iter().map(|r| r.into()).collect(),
        }
    }
}

impl From<MissingValues> for insights::MissingValues {
    fn from(domain: MissingValues) -> Self {
        Self {
            header: domain.header,
            column_index: domain.column_index as u32,
            empty_values_percentage: domain.empty_values_percentage,
        }
    }
}

impl From<ValueCount> for insights::ValueCount {
    fn from(domain: ValueCount) -> Self {
        Self {
            value: domain.value,
            count: domain.count,
        }
    }
}

impl From<MetaValueCounts> for insights::MetaValueCounts {
    fn from(domain: MetaValueCounts) -> Self {
        Self {
            header: domain.header,
            column_index: domain.column_index as u32,
            value_counts: domain.value_counts.into_iter().map(|v| v.into()).collect(),
        }
    }
}

impl From<FileInsights> for insights::FileInsights {
    fn from(domain: FileInsights) -> Self {
        Self {
            missing_values: domain.missing_values.into_iter().map(|m| m.into()).collect(),
            meta_value_counts: domain
                .meta_value_counts
                .into_iter()
                .map(|m| m.into())
                .collect(),
        }
    }
}

impl From<ColumnPrompt> for insights::GetColumnPromptResponse {
    fn from(domain: ColumnPrompt) -> Self {
        Self {
            system_message: domain.system_message,
            user_message: domain.user_message,
        }
    }
}
