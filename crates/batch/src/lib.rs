//! Batch certificate generation for certkit
//!
//! Takes a template (PDF or image), a set of spreadsheet rows and a
//! render configuration, draws each recipient's name onto a copy of the
//! template and returns everything as a single zip archive.
//!
//! # Example
//!
//! ```no_run
//! use batch::{render_archive, RenderOptions, Row};
//!
//! # fn main() -> batch::Result<()> {
//! let template = std::fs::read("certificate.pdf")?;
//! let rows: Vec<Row> = vec![[("Name".to_string(), "Alice".to_string())]
//!     .into_iter()
//!     .collect()];
//!
//! let archive = render_archive(
//!     &template,
//!     "application/pdf",
//!     &rows,
//!     "Name",
//!     &RenderOptions::default(),
//!     None,
//! )?;
//! std::fs::write("certificates.zip", archive)?;
//! # Ok(())
//! # }
//! ```

pub mod options;
pub mod packager;
pub mod rows;
pub mod slug;

pub use options::{Mode, OutputFormat, RenderOptions, RenderPlan, TemplateKind};
pub use packager::render_archive;
pub use rows::{rows_to_objects, Preview, Row, PREVIEW_SAMPLE_ROWS};
pub use slug::{filename_base, slug};

use thiserror::Error;

/// Errors that can occur during batch generation
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Render error: {0}")]
    RenderError(#[from] render_core::RenderError),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for batch operations
pub type Result<T> = std::result::Result<T, BatchError>;
