pub mod format;
pub mod hash;
pub mod staging;

pub use format::*;
pub use hash::*;
pub use staging::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty upload")]
    Empty,

    #[error("File too large: {size_mb:.1}MB exceeds {max_mb}MB limit")]
    FileTooLarge { size_mb: f64, max_mb: u64 },

    #[error("Not a directory: {0}")]
    NotADirectory(String),
}
