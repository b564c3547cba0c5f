/// Errors raised while constructing records and query arguments.
///
/// Loader, persistence and CLI layers wrap these into `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid timestamp '{0}', expected 'YYYY-MM-DD HH:MM'")]
    InvalidTimestamp(String),

    #[error("unknown channel '{0}' (expected one of: self-consumption, export, import, load, production)")]
    UnknownChannel(String),

    #[error("invalid value '{value}' for channel {channel}")]
    InvalidValue { channel: &'static str, value: String },

    #[error("expected {expected} columns, found {found}")]
    ColumnCount { expected: &'static str, found: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
