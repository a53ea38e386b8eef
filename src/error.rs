use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightsError {
    #[error("Invalid file id: {value}")]
    InvalidReference { value: String },

    #[error("File not found: {file_id}")]
    FileNotFound { file_id: String },

    #[error("Column '{column}' not found in file {file_id}")]
    ColumnNotFound { file_id: String, column: String },

    #[error("Source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Schema mismatch: {message}")]
    SchemaMismatch { message: String },

    #[error("Unsupported input: {message}")]
    UnsupportedInput { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("gRPC transport error: {0}")]
    GrpcError(#[from] tonic::transport::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl InsightsError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InsightsError::FileNotFound { .. }
                | InsightsError::ColumnNotFound { .. }
                | InsightsError::SourceNotFound { .. }
        )
    }
}

impl From<std::io::Error> for InsightsError {
    fn from(err: std::io::Error) -> Self {
        InsightsError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for InsightsError {
    fn from(err: diesel::result::Error) -> Self {
        InsightsError::DatabaseError {
            message: err.to_string(),
        }
    }
}

impl From<csv::Error> for InsightsError {
    fn from(err: csv::Error) -> Self {
        InsightsError::UnsupportedInput {
            message: format!("Malformed CSV: {}", err),
        }
    }
}

impl From<object_store::Error> for InsightsError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => InsightsError::SourceNotFound { path },
            other => InsightsError::StorageError {
                message: other.to_string(),
            },
        }
    }
}

impl From<InsightsError> for tonic::Status {
    fn from(err: InsightsError) -> Self {
        match err {
            InsightsError::FileNotFound { .. }
            | InsightsError::ColumnNotFound { .. }
            | InsightsError::SourceNotFound { .. } => tonic::Status::not_found(err.to_string()),
            InsightsError::InvalidReference { .. } | InsightsError::UnsupportedInput { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            }
            InsightsError::ConfigError { .. } => {
                tonic::Status::failed_precondition(err.to_string())
            }
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}
