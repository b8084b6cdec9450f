//! Error kinds surfaced by the document pipeline.
//!
//! Library code returns [`DocError`] so callers can tell a bad parameter from
//! a broken spreadsheet; the CLI layer wraps everything in `anyhow` with
//! context strings.

use thiserror::Error;

pub type DocResult<T> = std::result::Result<T, DocError>;

#[derive(Debug, Error)]
pub enum DocError {
    /// A file or value required by the operation was not provided.
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// The spreadsheet is unreadable, empty, or lacks an expected sheet or column.
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// A parameter is empty or not a valid integer.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Filtering or filling one of the target tables failed; nothing was written.
    #[error("Failed to assemble table {table}: {source}")]
    AssemblyFailure {
        table: usize,
        #[source]
        source: Box<DocError>,
    },

    /// The template document is not a readable `.docx` package.
    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}

impl DocError {
    pub fn assembly(table: usize, source: DocError) -> Self {
        DocError::AssemblyFailure {
            table,
            source: Box::new(source),
        }
    }
}
