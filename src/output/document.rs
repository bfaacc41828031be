//! Document Renderer
//!
//! 抽出済みテーブルを、1行1段落のWordprocessingML文書（.docx）として出力する。
//! 各段落には列ごとに太字の `"{列名}: "` ラベルと値が改行区切りで並び、
//! 行と行の間には区切り段落が挿入されます。

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use tracing::debug;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::XlsxDocError;
use crate::output::write_atomically;
use crate::types::ExtractedTable;

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// 値が空の場合に出力する文字列
const MISSING_VALUE: &str = "N/A";

/// 文書の書式設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStyle {
    /// 標準スタイルのフォント名
    /// デフォルト: `Arial`
    pub font_name: String,
    /// 標準スタイルのフォントサイズ（ポイント）
    /// デフォルト: 11
    pub font_size_pt: u32,
    /// 行と行の間に挿入する区切り文字列
    /// デフォルト: `-` を50個
    pub separator: String,
}

impl Default for DocumentStyle {
    fn default() -> Self {
        Self {
            font_name: "Arial".to_string(),
            font_size_pt: 11,
            separator: "-".repeat(50),
        }
    }
}

/// 段落形式の文書レンダラー
#[derive(Debug)]
pub(crate) struct DocumentRenderer<'a> {
    style: &'a DocumentStyle,
}

impl<'a> DocumentRenderer<'a> {
    /// 新しいDocumentRendererインスタンスを生成
    pub fn new(style: &'a DocumentStyle) -> Self {
        Self { style }
    }

    /// テーブルを.docxファイルとして書き込む
    pub fn render(&self, table: &ExtractedTable, output_path: &Path) -> Result<(), XlsxDocError> {
        write_atomically(output_path, |file| self.write_package(table, file))?;
        debug!(
            output = %output_path.display(),
            rows = table.row_count(),
            "wrote document"
        );
        Ok(())
    }

    /// 文書パッケージ（ZIPコンテナ）を書き込む
    pub fn write_package<W: Write + Seek>(
        &self,
        table: &ExtractedTable,
        writer: W,
    ) -> Result<(), XlsxDocError> {
        let document = self.document_xml(table)?;
        let styles = self.styles_xml()?;

        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let parts: [(&str, &[u8]); 5] = [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
            ("word/document.xml", &document),
            ("word/styles.xml", &styles),
        ];

        for (name, content) in parts {
            zip.start_file(name, options)
                .map_err(|e| XlsxDocError::render("Failed to write document part", e))?;
            zip.write_all(content)
                .map_err(|e| XlsxDocError::render("Failed to write document part", e))?;
        }

        zip.finish()
            .map_err(|e| XlsxDocError::render("Failed to finish document", e))?;
        Ok(())
    }

    /// `word/document.xml` を生成
    fn document_xml(&self, table: &ExtractedTable) -> Result<Vec<u8>, XlsxDocError> {
        let mut xml = XmlBuilder::new();
        xml.declaration()?;
        xml.start("w:document", &[("xmlns:w", WORDML_NS)])?;
        xml.start("w:body", &[])?;

        let last = table.row_count().saturating_sub(1);
        for (index, row) in table.rows().iter().enumerate() {
            xml.start("w:p", &[])?;
            for (line, (column, value)) in table.columns().iter().zip(row.iter()).enumerate() {
                if line > 0 {
                    xml.start("w:r", &[])?;
                    xml.empty("w:br")?;
                    xml.end("w:r")?;
                }

                // ラベル（太字）
                xml.start("w:r", &[])?;
                xml.start("w:rPr", &[])?;
                xml.empty("w:b")?;
                xml.end("w:rPr")?;
                xml.text_run(&format!("{}: ", column))?;
                xml.end("w:r")?;

                // 値
                let value = value.trim();
                let value = if value.is_empty() { MISSING_VALUE } else { value };
                xml.start("w:r", &[])?;
                xml.text_run(value)?;
                xml.end("w:r")?;
            }
            xml.end("w:p")?;

            if index < last {
                xml.start("w:p", &[])?;
                xml.start("w:r", &[])?;
                xml.text_run(&self.style.separator)?;
                xml.end("w:r")?;
                xml.end("w:p")?;
            }
        }

        xml.end("w:body")?;
        xml.end("w:document")?;
        Ok(xml.finish())
    }

    /// `word/styles.xml` を生成（標準スタイルのフォントとサイズ）
    fn styles_xml(&self) -> Result<Vec<u8>, XlsxDocError> {
        let font = self.style.font_name.as_str();
        // w:sz は半ポイント単位
        let size = (self.style.font_size_pt * 2).to_string();

        let mut xml = XmlBuilder::new();
        xml.declaration()?;
        xml.start("w:styles", &[("xmlns:w", WORDML_NS)])?;

        xml.start("w:docDefaults", &[])?;
        xml.start("w:rPrDefault", &[])?;
        xml.run_properties(font, &size)?;
        xml.end("w:rPrDefault")?;
        xml.end("w:docDefaults")?;

        xml.start(
            "w:style",
            &[
                ("w:type", "paragraph"),
                ("w:default", "1"),
                ("w:styleId", "Normal"),
            ],
        )?;
        xml.empty_with("w:name", &[("w:val", "Normal")])?;
        xml.run_properties(font, &size)?;
        xml.end("w:style")?;

        xml.end("w:styles")?;
        Ok(xml.finish())
    }
}

/// quick-xmlのWriterに対する薄いヘルパー
struct XmlBuilder {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlBuilder {
    fn new() -> Self {
        Self {
            writer: Writer::new(Cursor::new(Vec::new())),
        }
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), XlsxDocError> {
        self.writer
            .write_event(event)
            .map_err(|e| XlsxDocError::render("Failed to encode document XML", e))
    }

    fn declaration(&mut self) -> Result<(), XlsxDocError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
    }

    fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XlsxDocError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Start(element))
    }

    fn end(&mut self, name: &str) -> Result<(), XlsxDocError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str) -> Result<(), XlsxDocError> {
        self.write(Event::Empty(BytesStart::new(name)))
    }

    fn empty_with(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), XlsxDocError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Empty(element))
    }

    /// 前後の空白を保持するテキスト要素 `<w:t>`
    fn text_run(&mut self, text: &str) -> Result<(), XlsxDocError> {
        self.start("w:t", &[("xml:space", "preserve")])?;
        self.write(Event::Text(BytesText::new(text)))?;
        self.end("w:t")
    }

    fn run_properties(&mut self, font: &str, size: &str) -> Result<(), XlsxDocError> {
        self.start("w:rPr", &[])?;
        self.empty_with(
            "w:rFonts",
            &[
                ("w:ascii", font),
                ("w:hAnsi", font),
                ("w:eastAsia", font),
                ("w:cs", font),
            ],
        )?;
        self.empty_with("w:sz", &[("w:val", size)])?;
        self.empty_with("w:szCs", &[("w:val", size)])?;
        self.end("w:rPr")
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner().into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn sample_table() -> ExtractedTable {
        ExtractedTable::new(
            vec!["Name".to_string(), "Note".to_string()],
            vec![
                vec!["Alice".to_string(), "  <b>&co</b> ".to_string()],
                vec!["Bob".to_string(), "".to_string()],
            ],
        )
    }

    fn read_part(bytes: Vec<u8>, name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut part = archive.by_name(name).unwrap();
        let mut content = String::new();
        part.read_to_string(&mut content).unwrap();
        content
    }

    #[test]
    fn test_package_contains_all_parts() {
        let style = DocumentStyle::default();
        let mut buffer = Cursor::new(Vec::new());
        DocumentRenderer::new(&style)
            .write_package(&sample_table(), &mut buffer)
            .unwrap();

        let archive = zip::ZipArchive::new(Cursor::new(buffer.into_inner())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "word/_rels/document.xml.rels",
            "word/document.xml",
            "word/styles.xml",
        ] {
            assert!(names.contains(&part), "missing part {}", part);
        }
    }

    #[test]
    fn test_document_paragraph_structure() {
        let style = DocumentStyle::default();
        let mut buffer = Cursor::new(Vec::new());
        DocumentRenderer::new(&style)
            .write_package(&sample_table(), &mut buffer)
            .unwrap();
        let xml = read_part(buffer.into_inner(), "word/document.xml");

        // 2行 + 区切り1つ = 3段落
        assert_eq!(xml.matches("<w:p>").count(), 3);
        // 行ごとに2つの太字ラベル
        assert_eq!(xml.matches("<w:b/>").count(), 4);
        // 各行内の改行は列数 - 1
        assert_eq!(xml.matches("<w:br/>").count(), 2);
        assert_eq!(xml.matches(&"-".repeat(50)).count(), 1);
        assert!(xml.contains("Name: "));
        // 値はトリムされ、XMLエスケープされる
        assert!(xml.contains("&lt;b&gt;&amp;co&lt;/b&gt;</w:t>"));
        // 空の値
        assert!(xml.contains(">N/A</w:t>"));
    }

    #[test]
    fn test_styles_use_configured_font() {
        let style = DocumentStyle {
            font_name: "Calibri".to_string(),
            font_size_pt: 12,
            separator: "***".to_string(),
        };
        let mut buffer = Cursor::new(Vec::new());
        DocumentRenderer::new(&style)
            .write_package(&sample_table(), &mut buffer)
            .unwrap();
        let styles = read_part(buffer.into_inner(), "word/styles.xml");
        assert!(styles.contains(r#"w:ascii="Calibri""#));
        assert!(styles.contains(r#"<w:sz w:val="24"/>"#));
        assert!(styles.contains(r#"w:styleId="Normal""#));
    }
}
