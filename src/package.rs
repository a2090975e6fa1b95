//! Reading and rewriting the ZIP container of a working copy.

use std::fs::{self, File};
use std::io::{BufReader, Read, Write};
use std::path::Path;

use file_format::FileFormat;
use tracing::debug;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{IoContext, Result, TemplateError};

const ROOT_RELS: &str = "_rels/.rels";
const OFFICE_DOCUMENT_REL: &str = "/officeDocument";
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// The main document part of a package.
#[derive(Debug)]
pub(crate) struct MainPart {
    pub(crate) name: String,
    pub(crate) xml: String,
}

type Archive = ZipArchive<BufReader<File>>;

fn open_archive(path: &Path) -> Result<Archive> {
    let file = File::open(path).at(path)?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| zip_error(path, e))
}

fn zip_error(path: &Path, err: ZipError) -> TemplateError {
    match err {
        ZipError::Io(source) => TemplateError::io(path, source),
        ZipError::InvalidArchive(_) => {
            let found = FileFormat::from_file(path)
                .map(|fmt| fmt.name().to_owned())
                .unwrap_or_else(|_| "unknown".to_owned());
            TemplateError::malformed(path, format!("not a word-processing package ({found})"))
        }
        other => TemplateError::malformed(path, other.to_string()),
    }
}

fn read_entry(archive: &mut Archive, path: &Path, name: &str) -> Result<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(zip_error(path, e)),
    };
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).at(path)?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| TemplateError::malformed(path, format!("{name} is not UTF-8: {e}")))
}

/// Target of the package-level `officeDocument` relationship, as a part name.
fn main_part_name(rels_xml: &str) -> std::result::Result<Option<String>, roxmltree::Error> {
    let doc = roxmltree::Document::parse(rels_xml)?;
    let target = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Relationship")
        .filter(|n| n.attribute("TargetMode") != Some("External"))
        .find(|n| {
            n.attribute("Type")
                .is_some_and(|t| t.ends_with(OFFICE_DOCUMENT_REL))
        })
        .and_then(|n| n.attribute("Target"));
    Ok(target.map(|t| t.trim_start_matches('/').to_owned()))
}

/// Locates and reads the main document part.
pub(crate) fn read_main_part(path: &Path) -> Result<MainPart> {
    let mut archive = open_archive(path)?;

    let name = match read_entry(&mut archive, path, ROOT_RELS)? {
        Some(rels) => main_part_name(&rels)
            .map_err(|e| TemplateError::malformed(path, format!("{ROOT_RELS}: {e}")))?
            .ok_or_else(|| TemplateError::malformed(path, "no officeDocument relationship"))?,
        None => DEFAULT_MAIN_PART.to_owned(),
    };

    let xml = read_entry(&mut archive, path, &name)?.ok_or_else(|| {
        TemplateError::malformed(path, format!("main document part {name} is missing"))
    })?;
    debug!(path = %path.display(), part = %name, bytes = xml.len(), "read main document part");
    Ok(MainPart { name, xml })
}

/// Rewrites the package at `path` with `part` replaced by `xml`.
///
/// The new archive is built next to the original and renamed over it, so a failure
/// leaves the previous package intact. Other entries are copied without recompression.
pub(crate) fn replace_part(path: &Path, part: &str, xml: &str) -> Result<()> {
    let mut archive = open_archive(path)?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let staged = tempfile::Builder::new()
        .prefix(".staged-")
        .tempfile_in(dir)
        .at(dir)?;

    let mut writer = ZipWriter::new(staged);
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| zip_error(path, e))?;
        if entry.name() != part {
            writer.raw_copy_file(entry).map_err(|e| zip_error(path, e))?;
            continue;
        }

        let method = match entry.compression() {
            CompressionMethod::Stored => CompressionMethod::Stored,
            _ => CompressionMethod::Deflated,
        };
        let name = entry.name().to_owned();
        drop(entry);
        writer
            .start_file(name, SimpleFileOptions::default().compression_method(method))
            .map_err(|e| zip_error(path, e))?;
        writer.write_all(xml.as_bytes()).at(path)?;
    }

    let staged = writer.finish().map_err(|e| zip_error(path, e))?;
    drop(archive);
    let permissions = fs::metadata(path).at(path)?.permissions();
    staged.as_file().set_permissions(permissions).at(staged.path())?;
    staged.as_file().sync_all().at(staged.path())?;
    staged.persist(path).map_err(|e| TemplateError::io(path, e.error))?;
    debug!(path = %path.display(), part, "rewrote package");
    Ok(())
}
