#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use doc_template::Settings;
use docx_rs::{Docx, Paragraph, Run};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scratch space: a template directory plus an isolated working-copy directory.
pub struct Sandbox {
    pub root: TempDir,
    pub settings: Settings,
}

impl Sandbox {
    pub fn new() -> Self {
        init_tracing();
        let root = tempfile::tempdir().unwrap();
        let settings = Settings::new(root.path().join("Temp"));
        Self { root, settings }
    }

    pub fn write_template(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.root.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn temp_entries(&self) -> usize {
        match std::fs::read_dir(self.settings.temp_dir()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }
}

fn para(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

pub fn pack(docx: Docx) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    docx.build().pack(&mut buf).unwrap();
    buf.into_inner()
}

/// Form with three runs containing "Name", one of them bold.
pub fn employee_form() -> Vec<u8> {
    pack(
        Docx::new()
            .add_paragraph(para("Employee form"))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text("Name").bold())
                    .add_run(Run::new().add_text(": ________")),
            )
            .add_paragraph(para("Address"))
            .add_paragraph(para("Manager Name"))
            .add_paragraph(para("Signed by Name on date"))
            .add_paragraph(para("End of form")),
    )
}

/// One paragraph whose only run holds "Name" twice, followed by another such paragraph.
pub fn repeated_names() -> Vec<u8> {
    pack(
        Docx::new()
            .add_paragraph(para("Name and Name"))
            .add_paragraph(para("Name, Name, Name")),
    )
}

pub fn document_xml(path: &Path) -> String {
    let file = std::fs::File::open(path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .unwrap()
        .read_to_string(&mut xml)
        .unwrap();
    xml
}

fn is_w(node: &roxmltree::Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(W_NS)
}

/// Text of every `w:t`, in document order.
pub fn run_texts(path: &Path) -> Vec<String> {
    let xml = document_xml(path);
    let doc = roxmltree::Document::parse(&xml).unwrap();
    doc.descendants()
        .filter(|n| is_w(n, "t"))
        .map(|n| n.text().unwrap_or_default().to_owned())
        .collect()
}

/// Byte range of the first `w:p` whose text contains `needle`.
pub fn paragraph_range(xml: &str, needle: &str) -> Option<std::ops::Range<usize>> {
    let doc = roxmltree::Document::parse(xml).unwrap();
    let paragraph = doc.descendants().filter(|n| is_w(n, "p")).find(|p| {
        let text: String = p
            .descendants()
            .filter(|n| is_w(n, "t"))
            .filter_map(|n| n.text())
            .collect();
        text.contains(needle)
    })?;
    Some(paragraph.range())
}
