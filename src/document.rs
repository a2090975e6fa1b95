use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::{NamedTempFile, TempPath};
use tracing::{debug, warn};

use crate::error::{IoContext, Result, TemplateError};
use crate::settings::Settings;
use crate::{inspect, package, wordml};

pub(crate) const DEFAULT_EXTENSION: &str = "docx";
pub(crate) const STREAM_PREFIX: &str = "template";

/// Where a working copy came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    Path(PathBuf),
    Stream,
}

/// A private, temporary working copy of a `.docx` template.
///
/// Every mutating call opens the package, edits the main document part and writes it
/// back before returning. The working copy is deleted by [`release`](Self::release)
/// or, failing that, when the handle is dropped.
#[derive(Debug)]
pub struct TemplateDocument {
    source: TemplateSource,
    working: Option<TempPath>,
}

impl TemplateDocument {
    /// Copies the template at `path` into the process-wide temp directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, Settings::global())
    }

    pub fn open_with(path: impl AsRef<Path>, settings: &Settings) -> Result<Self> {
        let source = path.as_ref();
        ensure_template(source)?;

        let mut staged =
            create_working_file(settings, &prefix_for(source), &extension_for(source))?;
        let mut template = File::open(source).at(source)?;
        io::copy(&mut template, staged.as_file_mut()).at(staged.path())?;
        let permissions = template.metadata().at(source)?.permissions();
        staged.as_file().set_permissions(permissions).at(staged.path())?;

        Ok(Self::with_working_copy(
            TemplateSource::Path(source.to_path_buf()),
            staged.into_temp_path(),
        ))
    }

    /// Copies a template read from `reader` into the process-wide temp directory.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        Self::from_reader_with(reader, Settings::global())
    }

    pub fn from_reader_with(mut reader: impl Read, settings: &Settings) -> Result<Self> {
        let mut staged = create_working_file(settings, STREAM_PREFIX, DEFAULT_EXTENSION)?;
        let copied = io::copy(&mut reader, staged.as_file_mut()).at(staged.path())?;
        if copied == 0 {
            return Err(TemplateError::InvalidArgument(
                "Source stream cannot be empty".to_owned(),
            ));
        }
        staged.as_file_mut().flush().at(staged.path())?;

        Ok(Self::with_working_copy(
            TemplateSource::Stream,
            staged.into_temp_path(),
        ))
    }

    pub(crate) fn with_working_copy(source: TemplateSource, working: TempPath) -> Self {
        debug!(source = ?source, working = %working.display(), "created working copy");
        Self {
            source,
            working: Some(working),
        }
    }

    pub fn template_source(&self) -> &TemplateSource {
        &self.source
    }

    /// Path of the working copy, `None` once released.
    pub fn working_path(&self) -> Option<&Path> {
        self.working.as_deref()
    }

    fn working(&self) -> Result<&Path> {
        self.working_path().ok_or(TemplateError::Released)
    }

    /// Replaces `find` with `replace` in every text run containing it.
    ///
    /// With `only_first`, only the first run that contains `find` is changed, though
    /// every occurrence inside that run is. Returns the number of occurrences replaced.
    pub fn find_and_replace(
        &mut self,
        find: &str,
        replace: &str,
        only_first: bool,
    ) -> Result<usize> {
        let path = self.working()?;
        if find.is_empty() {
            return Err(TemplateError::InvalidArgument(
                "phrase to find cannot be empty".to_owned(),
            ));
        }

        let main = package::read_main_part(path)?;
        let replaced = wordml::replace_in_runs(&main.xml, find, replace, only_first)
            .map_err(|e| TemplateError::malformed(path, format!("{}: {e}", main.name)))?;
        if replaced.count > 0 {
            package::replace_part(path, &main.name, &replaced.xml)?;
        }
        debug!(find, count = replaced.count, only_first, "find and replace");
        Ok(replaced.count)
    }

    /// Applies several substitutions, in order, with a single rewrite of the package.
    pub fn find_and_replace_all<F, R>(&mut self, pairs: &[(F, R)]) -> Result<usize>
    where
        F: AsRef<str>,
        R: AsRef<str>,
    {
        let path = self.working()?;
        if pairs.iter().any(|(find, _)| find.as_ref().is_empty()) {
            return Err(TemplateError::InvalidArgument(
                "phrase to find cannot be empty".to_owned(),
            ));
        }

        let main = package::read_main_part(path)?;
        let mut xml = main.xml;
        let mut total = 0;
        for (find, replace) in pairs {
            let replaced = wordml::replace_in_runs(&xml, find.as_ref(), replace.as_ref(), false)
                .map_err(|e| TemplateError::malformed(path, format!("{}: {e}", main.name)))?;
            total += replaced.count;
            xml = replaced.xml;
        }
        if total > 0 {
            package::replace_part(path, &main.name, &xml)?;
        }
        debug!(pairs = pairs.len(), count = total, "find and replace all");
        Ok(total)
    }

    /// Inserts a copy of the first paragraph whose text contains `starting_text`
    /// directly after it.
    pub fn copy_element_after(&mut self, starting_text: &str) -> Result<()> {
        let path = self.working()?;
        if starting_text.is_empty() {
            return Err(TemplateError::InvalidArgument(
                "starting line of paragraph cannot be empty".to_owned(),
            ));
        }

        let main = package::read_main_part(path)?;
        let updated = wordml::duplicate_paragraph(&main.xml, starting_text)
            .map_err(|e| TemplateError::malformed(path, format!("{}: {e}", main.name)))?
            .ok_or_else(|| TemplateError::ParagraphNotFound(starting_text.to_owned()))?;
        package::replace_part(path, &main.name, &updated)?;
        debug!(starting_text, "duplicated paragraph");
        Ok(())
    }

    /// Visible text of each paragraph, body first, then headers and footers.
    pub fn paragraph_texts(&self) -> Result<Vec<String>> {
        inspect::paragraph_texts(self.working()?)
    }

    /// Current package bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let path = self.working()?;
        fs::read(path).at(path)
    }

    /// Copies the working copy to `dest`, creating parent directories as needed.
    pub fn save_as(&self, dest: impl AsRef<Path>) -> Result<PathBuf> {
        let path = self.working()?;
        let dest = dest.as_ref();
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::copy(path, dest).at(dest)?;
        debug!(dest = %dest.display(), "saved working copy");
        Ok(dest.to_path_buf())
    }

    /// Deletes the working copy. Safe to call more than once; never fails.
    pub fn release(&mut self) {
        let Some(working) = self.working.take() else {
            return;
        };
        let shown = working.display().to_string();
        match working.close() {
            Ok(()) => debug!(working = %shown, "released working copy"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(working = %shown, "working copy already removed")
            }
            Err(e) => warn!(working = %shown, error = %e, "failed to delete working copy"),
        }
    }
}

impl Drop for TemplateDocument {
    fn drop(&mut self) {
        self.release();
    }
}

fn ensure_template(source: &Path) -> Result<()> {
    if source.is_file() {
        Ok(())
    } else {
        Err(TemplateError::NotFound(source.to_path_buf()))
    }
}

/// Creates an empty, uniquely named file in the configured temp directory.
pub(crate) fn create_working_file(
    settings: &Settings,
    prefix: &str,
    extension: &str,
) -> Result<NamedTempFile> {
    let dir = settings.temp_dir();
    fs::create_dir_all(dir).at(dir)?;
    tempfile::Builder::new()
        .prefix(&format!("{prefix}-"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)
        .at(dir)
}

pub(crate) fn prefix_for(source: &Path) -> String {
    source
        .file_stem()
        .and_then(OsStr::to_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(STREAM_PREFIX)
        .to_owned()
}

pub(crate) fn extension_for(source: &Path) -> String {
    source
        .extension()
        .and_then(OsStr::to_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_EXTENSION)
        .to_owned()
}
