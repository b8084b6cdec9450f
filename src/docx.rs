//! `.docx` template reading and writing.
//!
//! The package is held in memory as its list of ZIP entries. Only the main
//! document part is parsed; every other part is written back unchanged. The
//! tables exposed here are the top-level tables of the document body, in
//! document order.

use std::{
    fs::{self, File},
    io::{BufReader, Cursor, Read, Seek, Write},
    path::Path,
};

use log::debug;

use crate::{
    error::{DocError, DocResult},
    fill::TargetTable,
    xml::{Element, Node, XmlDocument},
};

const DEFAULT_DOCUMENT_PART: &str = "word/document.xml";
const OFFICE_DOCUMENT_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

#[derive(Debug, Clone)]
pub struct TemplateDocument {
    parts: Vec<(String, Vec<u8>)>,
    document_part: String,
    document: XmlDocument,
}

/// Header labels and body size of one template table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub headers: Vec<String>,
    pub body_rows: usize,
}

impl TemplateDocument {
    pub fn open(path: &Path) -> DocResult<Self> {
        if !path.exists() {
            return Err(DocError::MissingInput(format!(
                "template {path:?} does not exist"
            )));
        }
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_bytes(bytes: &[u8]) -> DocResult<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    pub fn from_reader<R: Read + Seek>(reader: R) -> DocResult<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut parts = Vec::with_capacity(archive.len());
        for idx in 0..archive.len() {
            let mut entry = archive.by_index(idx)?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            parts.push((entry.name().to_string(), data));
        }

        let document_part = locate_document_part(&parts)?;
        let raw = parts
            .iter()
            .find(|(name, _)| *name == document_part)
            .map(|(_, data)| data.as_slice())
            .ok_or_else(|| {
                DocError::InvalidTemplate(format!("missing document part '{document_part}'"))
            })?;
        let document = XmlDocument::parse(raw)?;
        if document.root.child("w:body").is_none() {
            return Err(DocError::InvalidTemplate(
                "document part has no body".to_string(),
            ));
        }
        debug!(
            "Opened template with {} part(s); main part '{}'",
            parts.len(),
            document_part
        );

        Ok(Self {
            parts,
            document_part,
            document,
        })
    }

    fn body_tables(&self) -> impl Iterator<Item = &Element> {
        self.document
            .root
            .child("w:body")
            .into_iter()
            .flat_map(|body| body.children_named("w:tbl"))
    }

    pub fn table_count(&self) -> usize {
        self.body_tables().count()
    }

    pub fn summaries(&self) -> Vec<TableSummary> {
        self.body_tables()
            .map(|tbl| TableSummary {
                headers: header_labels_of(tbl),
                body_rows: tbl.children_named("w:tr").count().saturating_sub(1),
            })
            .collect()
    }

    /// Editable views over the body tables, in document order.
    pub fn tables_mut(&mut self) -> Vec<DocxTable<'_>> {
        self.document
            .root
            .child_mut("w:body")
            .into_iter()
            .flat_map(|body| body.children_named_mut("w:tbl"))
            .map(|element| DocxTable { element })
            .collect()
    }

    pub fn write_to<W: Write + Seek>(&self, writer: W) -> DocResult<()> {
        let mut zip = zip::ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        let document_xml = self.document.to_xml_string();
        for (name, data) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            if *name == self.document_part {
                zip.write_all(document_xml.as_bytes())?;
            } else {
                zip.write_all(data)?;
            }
        }
        zip.finish()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> DocResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Writes the package next to `path` first and renames it into place, so
    /// a failed write never leaves a truncated document at `path`.
    pub fn save(&self, path: &Path) -> DocResult<()> {
        let staging = path.with_extension("docx.partial");
        let result = File::create(&staging)
            .map_err(DocError::from)
            .and_then(|file| self.write_to(file));
        if let Err(err) = result {
            let _ = fs::remove_file(&staging);
            return Err(err);
        }
        fs::rename(&staging, path)?;
        Ok(())
    }
}

fn locate_document_part(parts: &[(String, Vec<u8>)]) -> DocResult<String> {
    let Some((_, rels)) = parts.iter().find(|(name, _)| name == "_rels/.rels") else {
        return Ok(DEFAULT_DOCUMENT_PART.to_string());
    };
    let rels = XmlDocument::parse(rels)?;
    let target = rels
        .root
        .children_named("Relationship")
        .find(|rel| rel.attribute("Type").as_deref() == Some(OFFICE_DOCUMENT_REL))
        .and_then(|rel| rel.attribute("Target"))
        .map(|target| target.trim_start_matches('/').to_string());
    Ok(target.unwrap_or_else(|| DEFAULT_DOCUMENT_PART.to_string()))
}

/// An editable table inside a template document.
#[derive(Debug)]
pub struct DocxTable<'a> {
    element: &'a mut Element,
}

impl DocxTable<'_> {
    fn row(&self, idx: usize) -> Option<&Element> {
        self.element.children_named("w:tr").nth(idx)
    }

    fn row_mut(&mut self, idx: usize) -> Option<&mut Element> {
        self.element.children_named_mut("w:tr").nth(idx)
    }

    fn grid_widths(&self) -> Vec<Option<String>> {
        self.element
            .child("w:tblGrid")
            .map(|grid| {
                grid.children_named("w:gridCol")
                    .map(|col| col.attribute("w:w").map(|w| w.into_owned()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn cell_text(&self, row: usize, cell: usize) -> Option<String> {
        self.row(row)
            .and_then(|tr| tr.children_named("w:tc").nth(cell))
            .map(cell_text_of)
    }
}

impl TargetTable for DocxTable<'_> {
    fn header_labels(&self) -> Vec<String> {
        header_labels_of(self.element)
    }

    fn row_count(&self) -> usize {
        self.element.children_named("w:tr").count()
    }

    fn cell_count(&self, row: usize) -> usize {
        self.row(row)
            .map(|tr| tr.children_named("w:tc").count())
            .unwrap_or(0)
    }

    fn append_empty_row(&mut self) {
        let mut widths = self.grid_widths();
        if widths.is_empty() {
            widths = vec![None; self.cell_count(0).max(1)];
        }
        let mut tr = Element::new("w:tr");
        for width in widths {
            let mut tc_pr = Element::new("w:tcPr");
            if let Some(width) = width {
                tc_pr = tc_pr.with_child(
                    Element::new("w:tcW")
                        .with_attribute("w:w", &width)
                        .with_attribute("w:type", "dxa"),
                );
            }
            tr = tr.with_child(
                Element::new("w:tc")
                    .with_child(tc_pr)
                    .with_child(Element::new("w:p")),
            );
        }

        let insert_at = self
            .element
            .children
            .iter()
            .rposition(|node| matches!(node, Node::Element(e) if e.name == "w:tr"))
            .map(|idx| idx + 1)
            .unwrap_or(self.element.children.len());
        self.element.children.insert(insert_at, Node::Element(tr));
    }

    fn clear_body(&mut self) {
        let mut seen_header = false;
        self.element.children.retain(|node| match node {
            Node::Element(e) if e.name == "w:tr" => {
                let keep = !seen_header;
                seen_header = true;
                keep
            }
            _ => true,
        });
    }

    fn set_cell_text(&mut self, row: usize, cell: usize, text: &str) {
        if let Some(tc) = self
            .row_mut(row)
            .and_then(|tr| tr.children_named_mut("w:tc").nth(cell))
        {
            replace_cell_content(tc, text);
        }
    }
}

fn header_labels_of(tbl: &Element) -> Vec<String> {
    tbl.children_named("w:tr")
        .next()
        .map(|tr| {
            tr.children_named("w:tc")
                .map(|tc| cell_text_of(tc).trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn cell_text_of(tc: &Element) -> String {
    tc.children_named("w:p")
        .map(|p| {
            let mut out = String::new();
            collect_run_text(p, &mut out);
            out
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_run_text(element: &Element, out: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:t" => out.push_str(&child.text()),
            "w:tab" => out.push('\t'),
            "w:br" | "w:cr" => out.push('\n'),
            "w:pPr" | "w:rPr" => {}
            _ => collect_run_text(child, out),
        }
    }
}

/// Replaces the content of a cell with a single paragraph holding `text`,
/// keeping the cell properties and the formatting of the first paragraph and
/// run.
fn replace_cell_content(tc: &mut Element, text: &str) {
    let tc_pr = tc.child("w:tcPr").cloned();
    let first_p = tc.child("w:p");
    let p_pr = first_p.and_then(|p| p.child("w:pPr")).cloned();
    let r_pr = first_p
        .and_then(|p| p.child("w:r"))
        .and_then(|r| r.child("w:rPr"))
        .cloned();

    let mut run = Element::new("w:r");
    if let Some(r_pr) = r_pr {
        run = run.with_child(r_pr);
    }
    for (idx, line) in text.split('\n').enumerate() {
        if idx > 0 {
            run = run.with_child(Element::new("w:br"));
        }
        for (segment_idx, segment) in line.split('\t').enumerate() {
            if segment_idx > 0 {
                run = run.with_child(Element::new("w:tab"));
            }
            if !segment.is_empty() {
                let mut t = Element::new("w:t").with_attribute("xml:space", "preserve");
                t.set_text(segment);
                run = run.with_child(t);
            }
        }
    }

    let mut paragraph = Element::new("w:p");
    if let Some(p_pr) = p_pr {
        paragraph = paragraph.with_child(p_pr);
    }
    paragraph = paragraph.with_child(run);

    tc.children.clear();
    if let Some(tc_pr) = tc_pr {
        tc.children.push(Node::Element(tc_pr));
    }
    tc.children.push(Node::Element(paragraph));
}
