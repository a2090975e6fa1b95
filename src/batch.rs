//! Filling one template into many output documents in parallel.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::debug;

use crate::document::TemplateDocument;
use crate::error::Result;
use crate::settings::Settings;

/// A single edit applied to a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Replace {
        find: String,
        replace: String,
        only_first: bool,
    },
    CopyParagraphAfter(String),
}

impl Edit {
    pub fn replace(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self::Replace {
            find: find.into(),
            replace: replace.into(),
            only_first: false,
        }
    }

    pub fn replace_first(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self::Replace {
            find: find.into(),
            replace: replace.into(),
            only_first: true,
        }
    }

    pub fn copy_paragraph_after(starting_text: impl Into<String>) -> Self {
        Self::CopyParagraphAfter(starting_text.into())
    }

    fn apply(&self, doc: &mut TemplateDocument) -> Result<()> {
        match self {
            Self::Replace {
                find,
                replace,
                only_first,
            } => doc.find_and_replace(find, replace, *only_first).map(|_| ()),
            Self::CopyParagraphAfter(text) => doc.copy_element_after(text),
        }
    }
}

/// Edits to apply, in order, and where to save the result.
#[derive(Debug, Clone)]
pub struct FillJob {
    pub output: PathBuf,
    pub edits: Vec<Edit>,
}

impl FillJob {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            output: output.into(),
            edits: Vec::new(),
        }
    }

    pub fn edit(mut self, edit: Edit) -> Self {
        self.edits.push(edit);
        self
    }
}

fn fill_one(template: &Path, job: &FillJob, settings: &Settings) -> Result<PathBuf> {
    let mut doc = TemplateDocument::open_with(template, settings)?;
    for edit in &job.edits {
        edit.apply(&mut doc)?;
    }
    let saved = doc.save_as(&job.output)?;
    doc.release();
    Ok(saved)
}

/// Runs every job against its own working copy of `template`.
///
/// Results come back in job order. A failing job does not stop the others, and
/// every working copy is deleted whether its job succeeded or not.
pub fn fill_many(
    template: impl AsRef<Path>,
    jobs: &[FillJob],
    settings: &Settings,
) -> Vec<Result<PathBuf>> {
    let template = template.as_ref();
    debug!(template = %template.display(), jobs = jobs.len(), "filling template");
    jobs.par_iter()
        .map(|job| fill_one(template, job, settings))
        .collect()
}
