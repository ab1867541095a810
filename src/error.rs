use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV has no header row")]
    MissingHeader,

    #[error("CSV header has an empty column name at position {0}")]
    EmptyColumn(usize),

    #[error("CSV header repeats column {0:?}")]
    DuplicateColumn(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("No source tables configured")]
    NoSources,

    #[error("Source {0:?} is configured twice")]
    DuplicateSource(String),

    #[error("Invalid table name {0:?}")]
    InvalidTable(String),
}
