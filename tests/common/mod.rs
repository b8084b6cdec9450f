#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use lesson_docs::{docx::TemplateDocument, fill::TargetTable};
use tempfile::{TempDir, tempdir};
use zip::write::SimpleFileOptions;

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }
}

/// One spreadsheet cell in a fixture.
#[derive(Debug, Clone, Copy)]
pub enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Empty,
}

pub use Cell::{Empty, Number, Text};

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn column_letter(mut idx: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (idx % 26) as u8) as char);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    letters.iter().rev().collect()
}

fn worksheet_xml(rows: &[Vec<Cell<'_>>]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, row) in rows.iter().enumerate() {
        xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), r + 1);
            match cell {
                Text(value) => xml.push_str(&format!(
                    r#"<c r="{reference}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    escape(value)
                )),
                Number(value) => {
                    xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#))
                }
                Empty => {}
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

/// Writes a minimal `.xlsx` with one worksheet per `(name, rows)` entry.
pub fn write_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<Cell<'_>>>)]) {
    let file = File::create(path).expect("create xlsx");
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (idx, (name, _)) in sheets.iter().enumerate() {
        let n = idx + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    let package_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

    let mut entries = vec![
        ("[Content_Types].xml".to_string(), content_types),
        ("_rels/.rels".to_string(), package_rels.to_string()),
        ("xl/workbook.xml".to_string(), workbook),
        ("xl/_rels/workbook.xml.rels".to_string(), rels),
    ];
    for (idx, (_, rows)) in sheets.iter().enumerate() {
        entries.push((
            format!("xl/worksheets/sheet{}.xml", idx + 1),
            worksheet_xml(rows),
        ));
    }
    for (name, body) in entries {
        zip.start_file(name, options).expect("start xlsx entry");
        zip.write_all(body.as_bytes()).expect("write xlsx entry");
    }
    zip.finish().expect("finish xlsx");
}

const HEADERS: [&str; 6] = [
    "Ciclo",
    "Ano/Série",
    "Bimestre",
    "Aula",
    "Assunto",
    "Objetivo",
];

fn lesson_row<'a>(
    grade: &'a str,
    lesson: Cell<'a>,
    topic: &'a str,
    goal: &'a str,
) -> Vec<Cell<'a>> {
    vec![
        Text("Anos Iniciais"),
        Text(grade),
        Text("1°"),
        lesson,
        Text(topic),
        Text(goal),
    ]
}

/// Two subjects with a title row above the headers.
pub fn write_lessons_workbook(path: &Path) {
    let header_row = HEADERS.iter().map(|h| Text(h)).collect::<Vec<_>>();
    let matematica = vec![
        vec![Text("Planejamento anual")],
        header_row.clone(),
        lesson_row("3° ano", Number(5.0), "Adição", "Somar parcelas"),
        lesson_row("3° ano", Number(6.0), "Subtração", "Resolver problemas"),
        lesson_row("3° ano", Text("Revisão"), "Revisão geral", "Revisar"),
        lesson_row("3° ano", Number(9.0), "Divisão", "Repartir"),
        lesson_row("4° ano", Number(5.0), "Frações", "Comparar"),
    ];
    let portugues = vec![
        vec![Text("Planejamento anual")],
        header_row,
        lesson_row("3° ano", Number(1.0), "Leitura", "Ler textos curtos"),
        lesson_row("3° ano", Number(2.0), "Escrita", "Produzir bilhetes"),
    ];
    write_xlsx(path, &[("Matemática", matematica), ("Português", portugues)]);
}

fn paragraph(text: &str) -> String {
    if text.is_empty() {
        "<w:p/>".to_string()
    } else {
        format!(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
            escape(text)
        )
    }
}

fn table_xml(rows: &[Vec<&str>]) -> String {
    let columns = rows.first().map(Vec::len).unwrap_or(0);
    let mut xml =
        String::from(r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr><w:tblGrid>"#);
    for _ in 0..columns {
        xml.push_str(r#"<w:gridCol w:w="2000"/>"#);
    }
    xml.push_str("</w:tblGrid>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row {
            xml.push_str(&format!(
                r#"<w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr>{}</w:tc>"#,
                paragraph(cell)
            ));
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

/// Writes a minimal `.docx` whose body holds the given tables, each as rows
/// of cell texts (row 0 is the header row), separated by a paragraph.
pub fn write_docx(path: &Path, tables: &[Vec<Vec<&str>>]) {
    let body = tables
        .iter()
        .map(|rows| table_xml(rows))
        .collect::<Vec<_>>()
        .join(paragraph("Observações").as_str());
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );
    let content_types = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;
    let rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

    let file = File::create(path).expect("create docx");
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", content_types),
        ("_rels/.rels", rels),
        ("word/document.xml", document.as_str()),
    ] {
        zip.start_file(name, options).expect("start docx entry");
        zip.write_all(body.as_bytes()).expect("write docx entry");
    }
    zip.finish().expect("finish docx");
}

/// Template with a primary table (one pre-filled body row whose `Data` cell
/// must survive) and a second table for an additional subject.
pub fn write_lesson_template(path: &Path) {
    write_docx(
        path,
        &[
            vec![vec!["Aula", "assunto", "Data"], vec!["", "", "manter"]],
            vec![vec!["AULA", "Assunto", "Objetivo"]],
        ],
    );
}

/// Cell texts of every table in a saved document, row by row.
pub fn read_docx_tables(path: &Path) -> Vec<Vec<Vec<String>>> {
    let mut document = TemplateDocument::open(path).expect("open docx");
    let tables = document.tables_mut();
    tables
        .iter()
        .map(|table| {
            (0..table.row_count())
                .map(|row| {
                    (0..table.cell_count(row))
                        .map(|cell| table.cell_text(row, cell).unwrap_or_default())
                        .collect()
                })
                .collect()
        })
        .collect()
}
