use std::fmt;
use thiserror::Error;

/// 題目回應內容的錯誤分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadErrorKind {
    MissingArray,
    MalformedJson,
    SchemaMismatch,
    InvalidField,
}

impl fmt::Display for PayloadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PayloadErrorKind::MissingArray => "missing_array",
            PayloadErrorKind::MalformedJson => "malformed_json",
            PayloadErrorKind::SchemaMismatch => "schema_mismatch",
            PayloadErrorKind::InvalidField => "invalid_field",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{message}")]
    RejectedFile { file_name: String, message: String },

    #[error("Please drop only one file")]
    TooManyFiles { count: usize },

    #[error("No file selected")]
    NoFileSelected,

    #[error("Spreadsheet decode failed: {message}")]
    SpreadsheetDecodeError { message: String },

    // 文件解析錯誤直接顯示底層訊息
    #[error("{message}")]
    DocumentDecodeError { message: String },

    #[error("Server error: {status} {reason}")]
    ServerError { status: u16, reason: String },

    #[error("Question payload rejected ({kind}): {message}")]
    PayloadError {
        kind: PayloadErrorKind,
        message: String,
    },

    #[error("Answer store error: {message}")]
    StoreError { message: String },

    #[error("Unsupported answer store version: {found}")]
    UnsupportedStoreVersion { found: u32 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Operation superseded by a newer request")]
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Decode,
    Network,
    Payload,
    Storage,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InsightError {
    pub fn payload(kind: PayloadErrorKind, message: impl Into<String>) -> Self {
        InsightError::PayloadError {
            kind,
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        InsightError::StoreError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            InsightError::RejectedFile { .. }
            | InsightError::TooManyFiles { .. }
            | InsightError::NoFileSelected => ErrorCategory::Input,
            InsightError::SpreadsheetDecodeError { .. }
            | InsightError::DocumentDecodeError { .. }
            | InsightError::CsvError(_)
            | InsightError::ZipError(_) => ErrorCategory::Decode,
            InsightError::ApiError(_) | InsightError::ServerError { .. } => ErrorCategory::Network,
            InsightError::PayloadError { .. } | InsightError::SerializationError(_) => {
                ErrorCategory::Payload
            }
            InsightError::StoreError { .. } | InsightError::UnsupportedStoreVersion { .. } => {
                ErrorCategory::Storage
            }
            InsightError::ConfigError { .. }
            | InsightError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            InsightError::IoError(_) | InsightError::Superseded => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 被新上傳取代不算失敗
            _ if matches!(self, InsightError::Superseded) => ErrorSeverity::Low,
            ErrorCategory::Input => ErrorSeverity::Low,
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Decode | ErrorCategory::Payload => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// CLI 結束碼；輸入錯誤即使嚴重度低也不算成功
    pub fn exit_code(&self) -> i32 {
        if self.category() == ErrorCategory::Input {
            return 2;
        }
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Choose a single .xlsx/.xls spreadsheet or a .docx document",
            ErrorCategory::Decode => "Check that the file opens in an office suite and is not corrupted",
            ErrorCategory::Network => "Make sure the analysis service is running and reachable, then try again",
            ErrorCategory::Payload => {
                "The analysis service returned an unexpected payload; check the service or switch questions.contract"
            }
            ErrorCategory::Storage => "Inspect or remove the local storage file and retry",
            ErrorCategory::Configuration => "Review the TOML configuration file and CLI flags",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            // 這幾類訊息本身就是給使用者看的
            InsightError::RejectedFile { message, .. } => message.clone(),
            InsightError::DocumentDecodeError { message } => message.clone(),
            InsightError::TooManyFiles { .. } | InsightError::NoFileSelected => self.to_string(),
            _ => format!("{:?} error: {}", self.category(), self),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
