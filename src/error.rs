use thiserror::Error;

#[derive(Error, Debug)]
pub enum SubwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported subtitle format: {0}")]
    UnsupportedFormat(String),

    /// A `Dialogue:` record that does not split into exactly 10 fields.
    #[error("Malformed dialogue record: expected 10 fields, found {fields}")]
    MalformedRecord { fields: usize },

    #[error("Translation provider error: {0}")]
    TranslationProvider(String),

    #[error("Ledger persistence error: {0}")]
    Persistence(String),

    #[error("Reassembly error: {0}")]
    Reassembly(String),
}

pub type Result<T> = std::result::Result<T, SubwatchError>;
