//! xlsxdoc - Spreadsheet row extraction engine with DOCX and Markdown export
//!
//! This crate reads XLSX workbooks, resolves the effective extent and header row of a
//! sheet, extracts a cleaned row range for a selection of columns (merged cells expanded,
//! blanks forward-filled) and renders the result as a paragraph-per-row DOCX document
//! or as a Markdown table.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // List sheets and look at the first rows
//!     let sheets = xlsxdoc::list_sheets("contacts.xlsx")?;
//!     let preview = xlsxdoc::preview("contacts.xlsx", &sheets[0], 10)?;
//!     println!("{} data rows", preview.total_data_rows);
//!
//!     // Resolve the header row and export two columns
//!     let headers = xlsxdoc::column_headers("contacts.xlsx", &sheets[0], 1)?;
//!     println!("{:?}", headers);
//!
//!     let rows = xlsxdoc::export_document(
//!         "contacts.xlsx",
//!         "outputs/contacts.docx",
//!         &sheets[0],
//!         &["Name", "Email"],
//!         1,
//!         2,
//!         None,
//!     )?;
//!     println!("exported {} rows", rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxdoc::{ExportFormat, ExportRequest, FillStrategy, HeaderPolicy, ProcessorBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let processor = ProcessorBuilder::new()
//!         .with_header_policy(HeaderPolicy::Skip) // drop blank header cells
//!         .with_fill_strategy(FillStrategy::MergeAware) // expand merged cells only
//!         .with_max_input_file_size(10 * 1024 * 1024)
//!         .build()?;
//!
//!     let request = ExportRequest::new("Sheet1", ["Region", "Owner"], 2, 3).with_data_end_row(40);
//!     let output = xlsxdoc::unique_output_path("outputs", ExportFormat::Markdown.extension());
//!     processor.export("report.xlsx".as_ref(), &output, ExportFormat::Markdown, &request)?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Templates
//!
//! ```rust,no_run
//! use xlsxdoc::{TemplateKind, TemplateSections, UniversalConverter};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = UniversalConverter::new()?;
//!     let sections = TemplateSections {
//!         summary: "Quarterly owners by region".to_string(),
//!         ..TemplateSections::default()
//!     };
//!     let markdown = converter.convert_with_template(
//!         "report.xlsx".as_ref(),
//!         TemplateKind::ExcelList,
//!         &sections,
//!         None,
//!     )?;
//!     println!("{}", markdown);
//!     Ok(())
//! }
//! ```

use std::path::Path;

mod api;
mod builder;
mod error;
mod extent;
mod extract;
mod formatter;
mod grid;
mod header;
mod highlight;
mod output;
mod parser;
mod preview;
mod security;
mod sweeper;
mod template;
mod types;
mod universal;

// 公開API
pub use api::{DateFormat, FillStrategy, HeaderPolicy, PreviewMode, ReadMode};
pub use builder::{ExportRequest, Processor, ProcessorBuilder};
pub use error::XlsxDocError;
pub use extent::{last_used_column, max_used_column, resolve_extent, SheetExtent};
pub use extract::forward_fill;
pub use header::{normalize_header, placeholder_name};
pub use highlight::{table_to_list, Entities, EntityHighlighter, Vocabulary};
pub use output::{
    unique_output_path, CommandMarkdownConverter, DocumentStyle, ExportFormat, MarkdownConverter,
    WorkbookMarkdownConverter,
};
pub use sweeper::{sweep_all, sweep_directory, CleanupSweeper, SweepConfig, SweepReport};
pub use template::{
    extract_variables, inject_variables, predefined_template, render_template, ProcessStep,
    TemplateKind, TemplateSections,
};
pub use types::{ExtractedTable, Preview, RowWindow};
pub use universal::{
    conversion_formats, detect_file, supported_extensions, BatchItem, BatchReport, FileInfo,
    UniversalConverter,
};

/// デフォルト設定のProcessor
fn default_processor() -> Processor {
    Processor::new(builder::ProcessorConfig::default())
}

/// ワークブックのシート名をワークブック内の順序で取得する
///
/// デフォルト設定の[`Processor::list_sheets`]と同じです。
pub fn list_sheets(path: impl AsRef<Path>) -> Result<Vec<String>, XlsxDocError> {
    default_processor().list_sheets(path.as_ref())
}

/// シートの先頭部分を取得する
///
/// `max_rows`は`1..=50`に丸められます。
pub fn preview(
    path: impl AsRef<Path>,
    sheet_name: &str,
    max_rows: usize,
) -> Result<Preview, XlsxDocError> {
    default_processor().preview(path.as_ref(), sheet_name, max_rows)
}

/// ヘッダー行（1始まり）の列名を取得する
pub fn column_headers(
    path: impl AsRef<Path>,
    sheet_name: &str,
    header_row: u32,
) -> Result<Vec<String>, XlsxDocError> {
    default_processor().column_headers(path.as_ref(), sheet_name, header_row)
}

/// 選択列と行範囲を1行1段落の文書（.docx）として出力する
///
/// # 戻り値
///
/// * `Ok(usize)` - 出力した行数
/// * `Err(XlsxDocError)` - 検証、抽出、出力のいずれかに失敗した場合
pub fn export_document<S: AsRef<str>>(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    sheet_name: &str,
    selected_columns: &[S],
    header_row: u32,
    data_start_row: u32,
    data_end_row: Option<u32>,
) -> Result<usize, XlsxDocError> {
    let request = build_request(
        sheet_name,
        selected_columns,
        header_row,
        data_start_row,
        data_end_row,
    );
    default_processor().export_document(path.as_ref(), output_path.as_ref(), &request)
}

/// 選択列と行範囲をMarkdownテーブル（.md）として出力する
///
/// # 戻り値
///
/// * `Ok(usize)` - 出力した行数
/// * `Err(XlsxDocError)` - 検証、抽出、出力のいずれかに失敗した場合
pub fn export_markdown_table<S: AsRef<str>>(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    sheet_name: &str,
    selected_columns: &[S],
    header_row: u32,
    data_start_row: u32,
    data_end_row: Option<u32>,
) -> Result<usize, XlsxDocError> {
    let request = build_request(
        sheet_name,
        selected_columns,
        header_row,
        data_start_row,
        data_end_row,
    );
    default_processor().export_markdown_table(path.as_ref(), output_path.as_ref(), &request)
}

fn build_request<S: AsRef<str>>(
    sheet_name: &str,
    selected_columns: &[S],
    header_row: u32,
    data_start_row: u32,
    data_end_row: Option<u32>,
) -> ExportRequest {
    let mut request = ExportRequest::new(
        sheet_name,
        selected_columns.iter().map(|c| c.as_ref().to_string()),
        header_row,
        data_start_row,
    );
    request.window.data_end_row = data_end_row;
    request
}
