//! Markdown Renderer
//!
//! 抽出済みテーブルを一時的なスプレッドシートに書き出し、
//! Markdownコンバーターに通して `.md` ファイルを生成する。

use std::fmt::{self, Write as _};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};
use std::process::Command;

use rust_xlsxwriter::Workbook;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::api::ReadMode;
use crate::error::XlsxDocError;
use crate::formatter::CellFormatter;
use crate::output::write_atomically;
use crate::parser::WorkbookParser;
use crate::security::InputLimits;
use crate::types::ExtractedTable;

/// ファイルをMarkdownテキストに変換するコンバーター
///
/// 外部ツールや独自の変換処理を差し込むための境界です。
pub trait MarkdownConverter: Send + Sync + fmt::Debug {
    /// ファイルを変換してMarkdownテキストを返す
    ///
    /// # 引数
    ///
    /// * `path` - 変換するファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 変換後のMarkdownテキスト
    /// * `Err(XlsxDocError)` - 変換できない場合
    fn convert(&self, path: &Path) -> Result<String, XlsxDocError>;
}

/// calamineでワークブックを読み、シートごとにパイプテーブルを出力するコンバーター
///
/// 出力形式:
///
/// ```text
/// ## Sheet1
/// | Name  | Email         |
/// | ----- | ------------- |
/// | Alice | a@example.com |
/// ```
#[derive(Debug, Clone, Default)]
pub struct WorkbookMarkdownConverter {
    formatter: CellFormatter,
}

impl WorkbookMarkdownConverter {
    /// 新しいWorkbookMarkdownConverterインスタンスを生成
    pub fn new() -> Self {
        Self::default()
    }
}

impl MarkdownConverter for WorkbookMarkdownConverter {
    fn convert(&self, path: &Path) -> Result<String, XlsxDocError> {
        let limits = InputLimits {
            max_input_file_size: u64::MAX,
            ..InputLimits::default()
        };
        let mut parser = WorkbookParser::open(path, &limits)?;

        let mut sections = Vec::new();
        for sheet in parser.sheet_names() {
            let grid = parser.load_grid(&sheet, ReadMode::Value, &self.formatter)?;
            let extent = grid.extent();

            // 行は見かけ上の行数まで、列は実データ範囲まで
            let mut section = format!("## {}\n", sheet);
            if !extent.is_empty() {
                let rows: Vec<Vec<String>> = grid
                    .rows()
                    .iter()
                    .map(|row| {
                        (0..extent.max_used_column as usize)
                            .map(|col| escape_cell(row.get(col).map_or("", String::as_str)))
                            .collect()
                    })
                    .collect();
                section.push_str(&pipe_table(&rows));
            }
            sections.push(section);
        }

        Ok(sections.join("\n"))
    }
}

/// 外部コマンドでファイルを変換するコンバーター
///
/// 変換対象のパスは引数の最後に追加され、標準出力がMarkdownテキストとして扱われます。
#[derive(Debug, Clone)]
pub struct CommandMarkdownConverter {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandMarkdownConverter {
    /// 新しいCommandMarkdownConverterインスタンスを生成
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// パスの前に渡す引数を設定
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for CommandMarkdownConverter {
    fn default() -> Self {
        Self::new("markitdown")
    }
}

impl MarkdownConverter for CommandMarkdownConverter {
    fn convert(&self, path: &Path) -> Result<String, XlsxDocError> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => XlsxDocError::Render(format!(
                    "Markdown converter unavailable: {} was not found",
                    program
                )),
                _ => XlsxDocError::render(&format!("Failed to run {}", program), e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(XlsxDocError::Render(format!(
                "Markdown converter {} failed ({}): {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Markdownテーブルレンダラー
#[derive(Debug)]
pub(crate) struct MarkdownTableRenderer<'a> {
    converter: &'a dyn MarkdownConverter,
}

impl<'a> MarkdownTableRenderer<'a> {
    /// 新しいMarkdownTableRendererインスタンスを生成
    pub fn new(converter: &'a dyn MarkdownConverter) -> Self {
        Self { converter }
    }

    /// テーブルをMarkdownに変換して書き込む
    ///
    /// 一時スプレッドシートは成功・失敗にかかわらず削除されます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 書き込んだMarkdownテキスト
    /// * `Err(XlsxDocError::Render)` - 一時ファイルの作成、変換、書き込みのいずれかが失敗した場合
    pub fn render(&self, table: &ExtractedTable, output_path: &Path) -> Result<String, XlsxDocError> {
        let staging = tempfile::Builder::new()
            .prefix("xlsxdoc_")
            .suffix(".xlsx")
            .tempfile()
            .map_err(|e| XlsxDocError::render("Failed to create staging workbook", e))?;

        write_staging_workbook(table, staging.path())?;
        let markdown = self.converter.convert(staging.path())?;

        write_atomically(output_path, |file| {
            file.write_all(markdown.as_bytes())
                .map_err(|e| XlsxDocError::render("Failed to write Markdown output", e))
        })?;

        debug!(
            output = %output_path.display(),
            rows = table.row_count(),
            converter = ?self.converter,
            "wrote markdown table"
        );
        Ok(markdown)
    }
}

/// 空セルの代わりに書き込む値
///
/// 空文字列のセルは保存されないため、すべて空の行が読み戻せなくなる。
const BLANK_CELL: &str = " ";

/// テーブルをヘッダー行付きの単一シートとして書き出す
fn write_staging_workbook(table: &ExtractedTable, path: &Path) -> Result<(), XlsxDocError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in table.columns().iter().enumerate() {
        let col = column_number(col)?;
        worksheet
            .write_string(0, col, name)
            .map_err(|e| XlsxDocError::render("Failed to write staging workbook", e))?;
    }

    for (row_index, row) in table.rows().iter().enumerate() {
        let row_number = u32::try_from(row_index + 1)
            .map_err(|_| XlsxDocError::Render("Too many rows for staging workbook".to_string()))?;
        for (col, value) in row.iter().enumerate() {
            let value = if value.trim().is_empty() {
                BLANK_CELL
            } else {
                value.as_str()
            };
            worksheet
                .write_string(row_number, column_number(col)?, value)
                .map_err(|e| XlsxDocError::render("Failed to write staging workbook", e))?;
        }
    }

    workbook
        .save(path)
        .map_err(|e| XlsxDocError::render("Failed to save staging workbook", e))
}

fn column_number(index: usize) -> Result<u16, XlsxDocError> {
    u16::try_from(index)
        .map_err(|_| XlsxDocError::Render("Too many columns for staging workbook".to_string()))
}

/// パイプ文字と改行をテーブルセル用にエスケープ
fn escape_cell(value: &str) -> String {
    value
        .trim()
        .replace('|', "\\|")
        .replace("\r\n", "<br>")
        .replace('\n', "<br>")
}

/// 1行目をヘッダーとするパイプテーブルを生成
fn pipe_table(rows: &[Vec<String>]) -> String {
    let columns = rows.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            rows.iter()
                .map(|row| row[col].width())
                .max()
                .unwrap_or(0)
                .max(3)
        })
        .collect();

    let mut out = String::new();
    for (index, row) in rows.iter().enumerate() {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
        if index == 0 {
            let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
            push_row(&mut out, rule.iter().map(String::as_str), &widths);
        }
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    out.push('|');
    for (cell, &width) in cells.zip(widths) {
        let padding = width.saturating_sub(cell.width());
        // Stringへの書き込みは失敗しない
        let _ = write!(out, " {}{} |", cell, " ".repeat(padding));
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell(" a|b "), "a\\|b");
        assert_eq!(escape_cell("line1\nline2\r\nline3"), "line1<br>line2<br>line3");
    }

    #[test]
    fn test_pipe_table_alignment() {
        let rows = vec![
            vec!["Name".to_string(), "Note".to_string()],
            vec!["日本".to_string(), "".to_string()],
        ];
        let table = pipe_table(&rows);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "| Name | Note |");
        assert_eq!(lines[1], "| ---- | ---- |");
        // 全角文字は表示幅2として数える
        assert_eq!(lines[2], "| 日本 |      |");
    }

    #[test]
    fn test_workbook_converter_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.xlsx");
        let table = ExtractedTable::new(
            vec!["Name".to_string(), "Email".to_string()],
            vec![
                vec!["Alice".to_string(), "a@example.com".to_string()],
                vec!["Bob".to_string(), "".to_string()],
            ],
        );
        write_staging_workbook(&table, &path).unwrap();

        let markdown = WorkbookMarkdownConverter::new().convert(&path).unwrap();
        assert!(markdown.starts_with("## Sheet1\n"));
        assert!(markdown.contains("| Name  | Email         |"));
        assert!(markdown.contains("| Alice | a@example.com |"));
        assert!(markdown.contains("| Bob   |               |"));
    }

    #[test]
    fn test_workbook_converter_keeps_trailing_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.xlsx");
        let table = ExtractedTable::new(
            vec!["Name".to_string(), "Notes".to_string()],
            vec![
                vec!["Alice".to_string(), "".to_string()],
                vec!["".to_string(), "".to_string()],
                vec!["".to_string(), "  ".to_string()],
            ],
        );
        write_staging_workbook(&table, &path).unwrap();

        let markdown = WorkbookMarkdownConverter::new().convert(&path).unwrap();
        let lines: Vec<&str> = markdown.lines().filter(|l| l.starts_with('|')).collect();
        // ヘッダー + 区切り + 3行
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "| Alice |       |");
        assert_eq!(lines[3], "|       |       |");
        assert_eq!(lines[4], "|       |       |");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_converter_program_not_executable() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("converter.sh");
        std::fs::write(&program, "#!/bin/sh\necho never\n").unwrap();

        let converter = CommandMarkdownConverter::new(&program);
        match converter.convert(Path::new("input.xlsx")) {
            Err(XlsxDocError::Render(message)) => {
                assert!(message.starts_with("Failed to run"));
                assert!(message.contains("converter.sh"));
            }
            other => panic!("Expected Render error, got {:?}", other),
        }
    }

    #[test]
    fn test_command_converter_missing_program() {
        let converter = CommandMarkdownConverter::new("xlsxdoc-no-such-converter-binary");
        match converter.convert(Path::new("input.xlsx")) {
            Err(XlsxDocError::Render(message)) => assert!(message.contains("unavailable")),
            other => panic!("Expected Render error, got {:?}", other),
        }
    }
}
