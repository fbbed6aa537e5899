use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Column '{column}' not found in {table} header")]
    MissingColumnError { table: String, column: String },

    #[error("Cannot parse '{value}' in column '{column}' at row {row}")]
    DataParseError {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Insufficient data for forecasting: need {required} months, got {actual}")]
    InsufficientDataError { required: usize, actual: usize },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Analysis,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::CsvError(_) | EtlError::MissingColumnError { .. } => {
                ErrorCategory::Input
            }
            EtlError::DataParseError { .. } => ErrorCategory::Data,
            EtlError::InsufficientDataError { .. } | EtlError::ProcessingError { .. } => {
                ErrorCategory::Analysis
            }
            EtlError::ZipError(_) | EtlError::SerializationError(_) => ErrorCategory::Output,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::InsufficientDataError { .. } => ErrorSeverity::Medium,
            EtlError::DataParseError { .. }
            | EtlError::ProcessingError { .. }
            | EtlError::MissingColumnError { .. }
            | EtlError::CsvError(_) => ErrorSeverity::High,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            EtlError::IoError(_) | EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::IoError(_) => {
                "Check that the input file exists and the output directory is writable".to_string()
            }
            EtlError::CsvError(_) => {
                "Make sure the input is a delimited text file with a header row".to_string()
            }
            EtlError::MissingColumnError { column, .. } => format!(
                "Map '{}' to an existing header name under [source.columns]",
                column
            ),
            EtlError::DataParseError { column, .. } => {
                format!("Clean the values of column '{}' so they are numeric", column)
            }
            EtlError::InsufficientDataError { required, .. } => format!(
                "Provide at least {} months of history or lower forecast.period",
                required
            ),
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Review the TOML configuration file".to_string()
            }
            EtlError::ZipError(_) | EtlError::SerializationError(_) => {
                "Try disabling compression or check free disk space".to_string()
            }
            EtlError::ProcessingError { .. } => {
                "Inspect the input data for inconsistent values".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read input data: {}", self),
            ErrorCategory::Data => format!("Input data is invalid: {}", self),
            ErrorCategory::Analysis => format!("Analysis could not be completed: {}", self),
            ErrorCategory::Output => format!("Could not write results: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
