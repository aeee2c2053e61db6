use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenApiError>;

#[derive(Error, Debug)]
pub enum OpenApiError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("file is {size} bytes, limit is {max}")]
    FileTooLarge { size: u64, max: u64 },

    #[error("document root is not a mapping")]
    NotAMapping,

    #[error("unsupported mapping key: {0}")]
    UnsupportedKey(String),

    #[error("number is not representable in JSON: {0}")]
    NonFiniteNumber(f64),
}
