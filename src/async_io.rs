//! Non-blocking construction of working copies for callers on a tokio runtime.

use std::io;
use std::path::Path;

use tempfile::NamedTempFile;
use tokio::io::{AsyncRead, AsyncWriteExt};

use crate::document::{
    create_working_file, extension_for, prefix_for, TemplateDocument, TemplateSource,
    DEFAULT_EXTENSION, STREAM_PREFIX,
};
use crate::error::{IoContext, Result, TemplateError};
use crate::settings::Settings;

/// Creates the working file on the blocking pool.
async fn create_working_file_async(
    settings: &Settings,
    prefix: String,
    extension: String,
) -> Result<NamedTempFile> {
    let dir = settings.temp_dir().to_path_buf();
    tokio::fs::create_dir_all(&dir).await.at(&dir)?;

    let settings = settings.clone();
    tokio::task::spawn_blocking(move || create_working_file(&settings, &prefix, &extension))
        .await
        .map_err(|e| TemplateError::io(&dir, io::Error::other(e)))?
}

impl TemplateDocument {
    /// Async counterpart of [`TemplateDocument::open`].
    pub async fn open_async(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_async_with(path, Settings::global()).await
    }

    pub async fn open_async_with(path: impl AsRef<Path>, settings: &Settings) -> Result<Self> {
        let source = path.as_ref();
        let is_file = tokio::fs::metadata(source)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(TemplateError::NotFound(source.to_path_buf()));
        }

        let working =
            create_working_file_async(settings, prefix_for(source), extension_for(source))
                .await?
                .into_temp_path();
        // `tokio::fs::copy` also carries the template's permissions over.
        tokio::fs::copy(source, &working).await.at(&working)?;

        Ok(Self::with_working_copy(
            TemplateSource::Path(source.to_path_buf()),
            working,
        ))
    }

    /// Async counterpart of [`TemplateDocument::from_reader`].
    pub async fn from_async_reader<R>(reader: R) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        Self::from_async_reader_with(reader, Settings::global()).await
    }

    pub async fn from_async_reader_with<R>(mut reader: R, settings: &Settings) -> Result<Self>
    where
        R: AsyncRead + Unpin,
    {
        let staged = create_working_file_async(
            settings,
            STREAM_PREFIX.to_owned(),
            DEFAULT_EXTENSION.to_owned(),
        )
        .await?;
        let mut out = tokio::fs::OpenOptions::new()
            .write(true)
            .open(staged.path())
            .await
            .at(staged.path())?;
        let copied = tokio::io::copy(&mut reader, &mut out)
            .await
            .at(staged.path())?;
        if copied == 0 {
            return Err(TemplateError::InvalidArgument(
                "Source stream cannot be empty".to_owned(),
            ));
        }
        out.flush().await.at(staged.path())?;
        drop(out);

        Ok(Self::with_working_copy(
            TemplateSource::Stream,
            staged.into_temp_path(),
        ))
    }
}
