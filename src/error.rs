//! Error types for the market-data pipeline.

use thiserror::Error;

/// Main error type for market-data operations.
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Underlying file I/O failed; the context names the operation that was
    /// in flight ("File Open Error", "File Write Error").
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// The source header is missing one or more expected column names.
    #[error("Invalid CSV Header. Missing header item(s): {}", missing.join(","))]
    MalformedHeader { missing: Vec<String> },

    /// A cell did not parse into its typed column.
    #[error("field '{column}' could not be parsed from '{raw}': {cause}")]
    FieldParse {
        column: String,
        raw: String,
        cause: String,
    },

    /// A higher timeframe was requested that the series cannot provide,
    /// either because its id column is absent or because the series holds
    /// no completed period of that timeframe.
    #[error("higher timeframe '{timeframe}' cannot be derived from ticker data")]
    MissingHigherTf { timeframe: String },

    #[error("ordering must be 'asc' or 'desc', got '{0}'")]
    InvalidOrdering(String),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl MarketDataError {
    /// File open failure with the conventional context prefix.
    pub fn file_open(source: std::io::Error) -> Self {
        Self::Io {
            context: "File Open Error",
            source,
        }
    }

    /// File write failure with the conventional context prefix.
    pub fn file_write(source: std::io::Error) -> Self {
        Self::Io {
            context: "File Write Error",
            source,
        }
    }

    pub(crate) fn field_parse(
        column: impl Into<String>,
        raw: impl Into<String>,
        cause: impl ToString,
    ) -> Self {
        Self::FieldParse {
            column: column.into(),
            raw: raw.into(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for market-data operations.
pub type Result<T> = std::result::Result<T, MarketDataError>;
