use thiserror::Error;

/// A failure scoped to a single file.
///
/// These are reported with the filename attached and skip only that file;
/// the rest of the batch keeps going.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    #[error("document has no pages")]
    NoPages,

    #[error("bounding-box oracle failed ({status}): {stderr}")]
    OracleFailed { status: String, stderr: String },

    #[error("no HiResBoundingBox line in oracle output")]
    MissingBoundingBox,

    #[error("expected 4 bounding-box values, found {found}")]
    ShortBoundingBox { found: usize },

    #[error("bounding-box value is not numeric: {token:?}")]
    BadBoundingBox { token: String },

    #[error("worker failed: {0}")]
    Worker(String),
}
