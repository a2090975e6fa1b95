//! Edits on the main document part's XML.
//!
//! The part is parsed with `roxmltree` only to locate nodes; edits are applied as
//! byte-range splices on the original text, so markup outside the edited nodes is
//! written back exactly as it was read.

use std::ops::Range;

use quick_xml::escape::partial_escape;
use roxmltree::{Document, Node};

/// WordprocessingML main namespace.
pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

struct Splice {
    range: Range<usize>,
    text: String,
}

fn apply_splices(xml: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by_key(|s| s.range.start);
    let extra: usize = splices.iter().map(|s| s.text.len()).sum();
    let mut out = String::with_capacity(xml.len() + extra);
    let mut cursor = 0;
    for splice in splices {
        out.push_str(&xml[cursor..splice.range.start]);
        out.push_str(&splice.text);
        cursor = splice.range.end;
    }
    out.push_str(&xml[cursor..]);
    out
}

fn is_w(node: &Node, local: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local
        && node.tag_name().namespace() == Some(W_NS)
}

/// Unescaped text of a `w:t` element.
fn run_text(node: &Node) -> String {
    node.children()
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect()
}

fn paragraph_text(paragraph: &Node) -> String {
    paragraph
        .descendants()
        .filter(|n| is_w(n, "t"))
        .map(|t| run_text(&t))
        .collect()
}

/// Offset of the `>` closing the start tag at the beginning of `raw`.
fn start_tag_end(raw: &str) -> Option<usize> {
    let mut quote = None;
    for (i, b) in raw.bytes().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

struct RunSpan {
    /// Absolute offset of the start tag's `>`.
    open_end: usize,
    /// Absolute range of the element content.
    content: Range<usize>,
}

fn run_span(xml: &str, node: &Node) -> Option<RunSpan> {
    let outer = node.range();
    let raw = &xml[outer.clone()];
    let open_end = start_tag_end(raw)?;
    if raw[..open_end].ends_with('/') {
        return None;
    }
    let close_start = raw.rfind("</")?;
    Some(RunSpan {
        open_end: outer.start + open_end,
        content: outer.start + open_end + 1..outer.start + close_start,
    })
}

fn needs_preserve(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_whitespace())
        || text.ends_with(|c: char| c.is_ascii_whitespace())
}

/// Result of a text substitution pass.
#[derive(Debug)]
pub(crate) struct Replaced {
    pub(crate) xml: String,
    /// Number of substring occurrences replaced.
    pub(crate) count: usize,
}

/// Replaces `find` with `replace` inside every `w:t` that contains it, in document order.
///
/// With `only_first`, stops after the first matching run; every occurrence inside that
/// run is still replaced.
pub(crate) fn replace_in_runs(
    xml: &str,
    find: &str,
    replace: &str,
    only_first: bool,
) -> Result<Replaced, roxmltree::Error> {
    let doc = Document::parse(xml)?;
    let mut splices = Vec::new();
    let mut count = 0;

    for node in doc.descendants().filter(|n| is_w(n, "t")) {
        let text = run_text(&node);
        if !text.contains(find) {
            continue;
        }
        let Some(span) = run_span(xml, &node) else {
            continue;
        };

        count += text.matches(find).count();
        let updated = text.replace(find, replace);
        if needs_preserve(&updated) && node.attribute((XML_NS, "space")) != Some("preserve") {
            splices.push(Splice {
                range: span.open_end..span.open_end,
                text: r#" xml:space="preserve""#.to_owned(),
            });
        }
        splices.push(Splice {
            range: span.content,
            text: partial_escape(updated.as_str()).into_owned(),
        });

        if only_first {
            break;
        }
    }

    let xml = if splices.is_empty() {
        xml.to_owned()
    } else {
        apply_splices(xml, splices)
    };
    Ok(Replaced { xml, count })
}

/// Text of every `w:p`, in the order [`duplicate_paragraph`] visits them.
///
/// A paragraph nested in a text box is listed after its enclosing paragraph, whose
/// text already includes it.
pub(crate) fn paragraph_texts(xml: &str) -> Result<Vec<String>, roxmltree::Error> {
    let doc = Document::parse(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| is_w(n, "p"))
        .map(|p| paragraph_text(&p))
        .collect())
}

/// Inserts a copy of the first `w:p` whose text contains `needle` directly after it.
///
/// Paragraphs are visited in document order, so an enclosing paragraph wins over a
/// paragraph nested in one of its text boxes. Returns `None` when nothing matches.
pub(crate) fn duplicate_paragraph(
    xml: &str,
    needle: &str,
) -> Result<Option<String>, roxmltree::Error> {
    let doc = Document::parse(xml)?;
    let Some(paragraph) = doc
        .descendants()
        .filter(|n| is_w(n, "p"))
        .find(|p| paragraph_text(p).contains(needle))
    else {
        return Ok(None);
    };

    let range = paragraph.range();
    let copy = xml[range.clone()].to_owned();
    Ok(Some(apply_splices(
        xml,
        vec![Splice {
            range: range.end..range.end,
            text: copy,
        }],
    )))
}
