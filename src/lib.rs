//! Private working copies of `.docx` templates.
//!
//! A [`TemplateDocument`] copies a template into a temp directory, edits the copy in
//! place and deletes it when released or dropped. The template itself is never written.
//!
//! ```rust,no_run
//! use doc_template::TemplateDocument;
//!
//! # fn main() -> doc_template::Result<()> {
//! let mut doc = TemplateDocument::open("templates/Letter.docx")?;
//! doc.find_and_replace("{Name}", "Alice", false)?;
//! doc.copy_element_after("Item:")?;
//! doc.save_as("output/letter.docx")?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "tokio")]
mod async_io;
pub mod batch;
mod document;
mod error;
mod inspect;
mod package;
mod settings;
mod wordml;

pub use batch::{fill_many, Edit, FillJob};
pub use document::{TemplateDocument, TemplateSource};
pub use error::{Result, TemplateError};
pub use settings::{Settings, TEMP_DIR_ENV};
