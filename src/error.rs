use thiserror::Error;

/// Text decoding errors, for observation lines, site lines and element sets.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParsingError {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid {field}: \"{content}\"")]
    InvalidField {
        field: &'static str,
        content: String,
    },

    #[error("invalid timestamp \"{0}\"")]
    Timestamp(String),

    #[error("line too short: {0} characters")]
    LineTooShort(usize),

    #[error("unexpected line number: expecting {0}")]
    LineNumber(u8),

    #[error("checksum mismatch: expecting {expected}, got {found}")]
    Checksum { expected: u8, found: u8 },

    #[error("catalog number mismatch between element lines")]
    CatalogNumberMismatch,

    #[error("invalid catalog number field \"{0}\"")]
    CatalogNumber(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Loaders reject the whole input on the first malformed line.
    #[error("line {line}: {error}")]
    Parsing {
        line: usize,
        #[source]
        error: ParsingError,
    },

    /// Decoding error outside of a line oriented loader
    #[error("parsing error: {0}")]
    Parser(#[from] ParsingError),

    /// Loaded measurement file does not contain any measurement.
    #[error("empty dataset")]
    EmptyDataset,

    /// Fitting, RMS and Doppler identification all require
    /// at least one highlighted measurement.
    #[error("no highlighted points")]
    NoHighlightedPoints,

    /// Element set catalog did not contain any entry.
    #[error("empty element set catalog")]
    EmptyCatalog,

    #[error("no elements for catalog number {0}")]
    UnknownCatalogNumber(u32),

    /// Catalog numbers above 339999 cannot be represented in 5 characters.
    #[error("catalog number {0} does not fit the 5 character field")]
    CatalogNumberOverflow(u32),

    /// Site ids must resolve to exactly one record.
    #[error("duplicate site id {0}")]
    DuplicateSite(i32),

    /// Orbit propagator failure (initialization or evaluation).
    #[error("propagator error: {0}")]
    Propagator(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
