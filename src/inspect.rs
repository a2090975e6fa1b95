//! Read-only text views of a working copy.
//!
//! Body paragraphs come from the same `w:p` walk the editing code uses, so the
//! list lines up with what `copy_element_after` can match. Header and footer
//! parts are never edited and are read through `docx-rs`.

use std::fs;
use std::path::Path;

use docx_rs::{
    read_docx, FooterChild, HeaderChild, Paragraph, StructuredDataTagChild, Table,
    TableCellContent, TableChild, TableRowChild,
};

use crate::error::{IoContext, Result, TemplateError};
use crate::{package, wordml};

/// Body paragraphs in edit order, then header and footer paragraphs.
pub(crate) fn paragraph_texts(path: &Path) -> Result<Vec<String>> {
    let main = package::read_main_part(path)?;
    let mut texts = wordml::paragraph_texts(&main.xml)
        .map_err(|e| TemplateError::malformed(path, format!("{}: {e}", main.name)))?;
    texts.extend(header_footer_texts(&fs::read(path).at(path)?, path)?);
    Ok(texts)
}

fn header_footer_texts(bytes: &[u8], path: &Path) -> Result<Vec<String>> {
    let docx = read_docx(bytes).map_err(|e| TemplateError::malformed(path, e.to_string()))?;
    let section = &docx.document.section_property;

    let mut texts = Vec::new();
    for (_, header) in section.get_headers() {
        walk(&header.children, &mut texts);
    }
    for (_, footer) in section.get_footers() {
        walk(&footer.children, &mut texts);
    }
    Ok(texts)
}

/// The shape shared by header, footer, content-control and table-cell children.
enum Block<'a> {
    Paragraph(&'a Paragraph),
    Table(&'a Table),
    Control(&'a [StructuredDataTagChild]),
    Skip,
}

trait AsBlock {
    fn as_block(&self) -> Block<'_>;
}

impl AsBlock for HeaderChild {
    fn as_block(&self) -> Block<'_> {
        match self {
            HeaderChild::Paragraph(p) => Block::Paragraph(p),
            HeaderChild::Table(t) => Block::Table(t),
            HeaderChild::StructuredDataTag(sdt) => Block::Control(&sdt.children),
        }
    }
}

impl AsBlock for FooterChild {
    fn as_block(&self) -> Block<'_> {
        match self {
            FooterChild::Paragraph(p) => Block::Paragraph(p),
            FooterChild::Table(t) => Block::Table(t),
            FooterChild::StructuredDataTag(sdt) => Block::Control(&sdt.children),
        }
    }
}

impl AsBlock for StructuredDataTagChild {
    fn as_block(&self) -> Block<'_> {
        match self {
            StructuredDataTagChild::Paragraph(p) => Block::Paragraph(p),
            StructuredDataTagChild::Table(t) => Block::Table(t),
            StructuredDataTagChild::StructuredDataTag(sdt) => Block::Control(&sdt.children),
            _ => Block::Skip,
        }
    }
}

impl AsBlock for TableCellContent {
    fn as_block(&self) -> Block<'_> {
        match self {
            TableCellContent::Paragraph(p) => Block::Paragraph(p),
            TableCellContent::Table(t) => Block::Table(t),
            _ => Block::Skip,
        }
    }
}

fn walk<B: AsBlock>(children: &[B], texts: &mut Vec<String>) {
    for child in children {
        match child.as_block() {
            Block::Paragraph(p) => texts.push(p.raw_text()),
            Block::Table(t) => {
                for row in &t.rows {
                    let TableChild::TableRow(row) = row;
                    for cell in &row.cells {
                        let TableRowChild::TableCell(cell) = cell;
                        walk(&cell.children, texts);
                    }
                }
            }
            Block::Control(children) => walk(children, texts),
            Block::Skip => {}
        }
    }
}
