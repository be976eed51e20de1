use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecipeError {
    #[error("Required key '{key}' must be ahead of optional keys!")]
    OrderingViolation { key: String },

    #[error("Duplicate key '{key}' found!")]
    DuplicateKey { key: String },

    #[error("Constructor with {arity} arguments already exists!")]
    DuplicateArity { arity: usize },

    #[error("Key '{key}' does not belong to this schema")]
    UnknownKey { key: String },

    #[error("No constructor accepts {actual} arguments (supported: {supported:?})")]
    ArityNotSupported { actual: usize, supported: Vec<usize> },

    #[error("Constructor expects {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Missing value for required key '{key}' in recipe {recipe}")]
    MissingValue { key: String, recipe: String },

    #[error("Key '{key}' expects {expected}, got {actual}")]
    TypeMismatch {
        key: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid recipe document: {message}")]
    InvalidDocument { message: String },

    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// 結構定義錯誤 (程式撰寫問題)
    Schema,
    /// 配方文件內容錯誤
    Document,
    Config,
    System,
}

impl RecipeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RecipeError::OrderingViolation { .. }
            | RecipeError::DuplicateKey { .. }
            | RecipeError::DuplicateArity { .. }
            | RecipeError::UnknownKey { .. } => ErrorCategory::Schema,
            RecipeError::ArityNotSupported { .. }
            | RecipeError::ArgumentCount { .. }
            | RecipeError::MissingValue { .. }
            | RecipeError::TypeMismatch { .. }
            | RecipeError::InvalidDocument { .. }
            | RecipeError::InvalidIdentifier { .. }
            | RecipeError::SerializationError(_) => ErrorCategory::Document,
            RecipeError::ConfigValidationError { .. }
            | RecipeError::InvalidConfigValueError { .. }
            | RecipeError::MissingConfigError { .. } => ErrorCategory::Config,
            RecipeError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.category() {
            ErrorCategory::Config => 1,
            ErrorCategory::Document => 2,
            ErrorCategory::Schema => 3,
            ErrorCategory::System => 4,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Schema => format!("Schema definition is invalid: {}", self),
            ErrorCategory::Document => format!("Recipe could not be built: {}", self),
            ErrorCategory::Config => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, RecipeError>;
