//! Universal Converter
//!
//! スプレッドシート以外も含む各種ファイルをMarkdownに変換し、
//! 強調表示とテンプレートを適用するモジュール。

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::XlsxDocError;
use crate::highlight::EntityHighlighter;
use crate::output::{write_atomically, CommandMarkdownConverter, MarkdownConverter};
use crate::security::SUPPORTED_EXTENSIONS;
use crate::template::{inject_variables, render_template, TemplateKind, TemplateSections};

/// 変換対象として認識する形式（拡張子, 説明, コンバーターが対応しているか）
const SUPPORTED_FORMATS: &[(&str, &str, bool)] = &[
    // 文書
    ("pdf", "Portable Document Format", true),
    ("docx", "Microsoft Word Document", true),
    ("doc", "Microsoft Word Document (Legacy)", true),
    ("txt", "Plain Text File", true),
    ("md", "Markdown File", true),
    // スプレッドシート
    ("xlsx", "Microsoft Excel Workbook", true),
    ("xlsm", "Microsoft Excel Macro-Enabled Workbook", true),
    ("xls", "Microsoft Excel Workbook (Legacy)", true),
    ("csv", "Comma-Separated Values", true),
    // プレゼンテーション
    ("pptx", "Microsoft PowerPoint Presentation", true),
    ("ppt", "Microsoft PowerPoint Presentation (Legacy)", true),
    // データ
    ("json", "JSON Data", true),
    ("xml", "XML Data", true),
    // Web
    ("html", "HyperText Markup Language", true),
    ("htm", "HyperText Markup Language", true),
    // 画像
    ("png", "Portable Network Graphics", true),
    ("jpg", "JPEG Image", true),
    ("jpeg", "JPEG Image", true),
    ("gif", "Graphics Interchange Format", true),
    ("bmp", "Bitmap Image", true),
    ("webp", "WebP Image", true),
    ("svg", "Scalable Vector Graphics", false),
    // ソースコード・ノートブック
    ("ipynb", "Jupyter Notebook", true),
    ("py", "Python Source Code", true),
    ("r", "R Source Code", true),
    ("rmd", "R Markdown", true),
    ("js", "JavaScript Source Code", true),
    ("ts", "TypeScript Source Code", true),
    ("java", "Java Source Code", true),
    ("cpp", "C++ Source Code", true),
    ("c", "C Source Code", true),
    // その他
    ("msg", "Outlook Message", true),
    ("epub", "EPUB eBook", true),
    ("rss", "RSS Feed", true),
];

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// デフォルトの最大ファイルサイズ: 100MiB
const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// 入力ファイルの情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// 拡張子（小文字、ドットなし）
    pub extension: String,
    /// ファイル名
    pub name: String,
    /// 形式の説明
    pub description: String,
    /// ファイルサイズ（バイト）
    pub size: u64,
    /// スプレッドシートかどうか
    pub is_spreadsheet: bool,
    /// コンバーターが対応している形式かどうか
    pub is_converter_supported: bool,
}

fn lookup(extension: &str) -> Option<&'static (&'static str, &'static str, bool)> {
    SUPPORTED_FORMATS.iter().find(|(ext, _, _)| *ext == extension)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

/// ファイルの形式を判定する
///
/// # 戻り値
///
/// * `Ok(FileInfo)` - 認識できる形式の場合
/// * `Err(XlsxDocError::FileAccess)` - ファイルが存在しない、または通常ファイルではない場合
/// * `Err(XlsxDocError::UnsupportedFormat)` - 認識できない拡張子の場合（対応形式の一覧を含む）
pub fn detect_file(path: &Path) -> Result<FileInfo, XlsxDocError> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => XlsxDocError::file_access(path, "file does not exist"),
        _ => XlsxDocError::file_access(path, e.to_string()),
    })?;
    if !metadata.is_file() {
        return Err(XlsxDocError::file_access(path, "not a regular file"));
    }

    let extension = extension_of(path);
    let (_, description, converter_supported) = lookup(&extension).ok_or_else(|| {
        XlsxDocError::UnsupportedFormat(format!(
            "Unsupported format: .{}. Supported formats: {}",
            extension,
            supported_extensions().join(", ")
        ))
    })?;

    Ok(FileInfo {
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        description: description.to_string(),
        size: metadata.len(),
        is_spreadsheet: SPREADSHEET_EXTENSIONS.contains(&extension.as_str()),
        is_converter_supported: *converter_supported,
        extension,
    })
}

/// 認識できる拡張子の一覧（整列済み）
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions: Vec<&'static str> = SUPPORTED_FORMATS.iter().map(|(ext, _, _)| *ext).collect();
    extensions.sort_unstable();
    extensions
}

/// 拡張子ごとに利用できる出力形式
///
/// すべての形式は `markdown` に変換できます。
/// 行抽出に対応したスプレッドシートは `docx` と `markdown_table` にも変換できます。
///
/// # 使用例
///
/// ```rust
/// assert_eq!(xlsxdoc::conversion_formats(".XLSX"), vec!["markdown", "docx", "markdown_table"]);
/// assert_eq!(xlsxdoc::conversion_formats("pdf"), vec!["markdown"]);
/// ```
pub fn conversion_formats(extension: &str) -> Vec<&'static str> {
    let extension = extension.trim_start_matches('.').to_ascii_lowercase();
    let mut formats = vec!["markdown"];
    if SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        formats.extend(["docx", "markdown_table"]);
    }
    formats
}

/// ディレクトリ一括変換の1ファイル分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    /// 入力ファイル名
    pub input: String,
    /// 出力ファイル名（失敗した場合はNone）
    pub output: Option<String>,
    /// 失敗理由
    pub error: Option<String>,
}

/// ディレクトリ一括変換の結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    /// ファイル名順の結果
    pub files: Vec<BatchItem>,
}

/// 汎用コンバーター
///
/// # 使用例
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use xlsxdoc::{CommandMarkdownConverter, UniversalConverter};
///
/// # fn main() -> Result<(), xlsxdoc::XlsxDocError> {
/// let converter = UniversalConverter::new()?
///     .with_max_file_size(20 * 1024 * 1024)
///     .with_converter(Arc::new(CommandMarkdownConverter::new("markitdown")));
/// let markdown = converter.convert_to_markdown("slides.pptx".as_ref(), None)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct UniversalConverter {
    /// 最大ファイルサイズ（バイト）
    max_file_size: u64,
    /// ファイルをMarkdownに変換するコンバーター
    converter: Arc<dyn MarkdownConverter>,
    /// 強調器
    highlighter: EntityHighlighter,
}

impl UniversalConverter {
    /// デフォルト設定で生成（最大100MiB、外部コマンド `markitdown`）
    pub fn new() -> Result<Self, XlsxDocError> {
        Ok(Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            converter: Arc::new(CommandMarkdownConverter::default()),
            highlighter: EntityHighlighter::new()?,
        })
    }

    /// 最大ファイルサイズ（バイト）を指定する
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    /// コンバーターを指定する
    pub fn with_converter(mut self, converter: Arc<dyn MarkdownConverter>) -> Self {
        self.converter = converter;
        self
    }

    /// 強調器を指定する
    pub fn with_highlighter(mut self, highlighter: EntityHighlighter) -> Self {
        self.highlighter = highlighter;
        self
    }

    /// 変換前の検証
    fn validate(&self, path: &Path) -> Result<FileInfo, XlsxDocError> {
        let info = detect_file(path)?;
        if info.size > self.max_file_size {
            return Err(XlsxDocError::UnsupportedFormat(format!(
                "File too large ({:.2} MiB). Maximum: {:.0} MiB",
                info.size as f64 / (1024.0 * 1024.0),
                self.max_file_size as f64 / (1024.0 * 1024.0)
            )));
        }
        if !info.is_converter_supported {
            return Err(XlsxDocError::UnsupportedFormat(format!(
                "No Markdown converter for .{} files",
                info.extension
            )));
        }
        Ok(info)
    }

    fn convert_raw(&self, path: &Path) -> Result<String, XlsxDocError> {
        let info = self.validate(path)?;
        let markdown = self.converter.convert(path)?;
        debug!(
            path = %path.display(),
            extension = %info.extension,
            size = info.size,
            length = markdown.len(),
            "converted file to markdown"
        );
        Ok(markdown)
    }

    /// ファイルをそのままMarkdownに変換する
    ///
    /// # 引数
    ///
    /// * `path` - 入力ファイルのパス
    /// * `output_path` - 指定した場合、結果をこのパスにも書き込む
    pub fn convert_to_markdown(
        &self,
        path: &Path,
        output_path: Option<&Path>,
    ) -> Result<String, XlsxDocError> {
        let markdown = self.convert_raw(path)?;
        write_output(output_path, &markdown)?;
        Ok(markdown)
    }

    /// 変換結果を定義済みテンプレートの本文として組み立てる
    ///
    /// `sections.content` は変換結果で置き換えられます。
    pub fn convert_with_template(
        &self,
        path: &Path,
        kind: TemplateKind,
        sections: &TemplateSections,
        output_path: Option<&Path>,
    ) -> Result<String, XlsxDocError> {
        let raw = self.convert_raw(path)?;
        let sections = TemplateSections {
            content: raw,
            ..sections.clone()
        };
        let markdown = render_template(kind, &sections, &self.highlighter);
        write_output(output_path, &markdown)?;
        Ok(markdown)
    }

    /// 変換結果を強調表示し、独自テンプレートの `<MAIN_CONTENT>` に埋め込む
    pub fn convert_with_custom_template(
        &self,
        path: &Path,
        template: &str,
        variables: &BTreeMap<String, String>,
        output_path: Option<&Path>,
    ) -> Result<String, XlsxDocError> {
        let raw = self.convert_raw(path)?;
        let mut variables = variables.clone();
        variables.insert("MAIN_CONTENT".to_string(), self.highlighter.highlight(&raw));
        let markdown = inject_variables(template, &variables);
        write_output(output_path, &markdown)?;
        Ok(markdown)
    }

    /// ディレクトリ内のファイルを一括でMarkdownに変換する
    ///
    /// 出力ファイル名は `{入力ファイル名の語幹}.md` です。
    /// 1ファイルの失敗で処理全体は中断されません。
    ///
    /// # 引数
    ///
    /// * `input_dir` - 入力ディレクトリ
    /// * `output_dir` - 出力ディレクトリ（なければ作成される）
    /// * `extensions` - 対象とする拡張子（Noneの場合はすべて）
    pub fn convert_directory(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        extensions: Option<&[&str]>,
    ) -> Result<BatchReport, XlsxDocError> {
        if !input_dir.is_dir() {
            return Err(XlsxDocError::file_access(input_dir, "not a directory"));
        }
        std::fs::create_dir_all(output_dir)
            .map_err(|e| XlsxDocError::file_access(output_dir, e.to_string()))?;

        let wanted: Option<Vec<String>> = extensions.map(|exts| {
            exts.iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect()
        });

        let entries = std::fs::read_dir(input_dir)
            .map_err(|e| XlsxDocError::file_access(input_dir, e.to_string()))?;
        let mut inputs: Vec<_> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                wanted
                    .as_ref()
                    .map_or(true, |w| w.contains(&extension_of(path)))
            })
            .collect();
        inputs.sort();

        let files: Vec<BatchItem> = inputs
            .par_iter()
            .map(|path| {
                let input = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let output = format!("{}.md", stem);

                match self.convert_to_markdown(path, Some(&output_dir.join(&output))) {
                    Ok(_) => BatchItem {
                        input,
                        output: Some(output),
                        error: None,
                    },
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "batch conversion failed");
                        BatchItem {
                            input,
                            output: None,
                            error: Some(e.to_string()),
                        }
                    }
                }
            })
            .collect();

        let success = files.iter().filter(|f| f.error.is_none()).count();
        let report = BatchReport {
            total: files.len(),
            success,
            failed: files.len() - success,
            files,
        };
        info!(
            input_dir = %input_dir.display(),
            output_dir = %output_dir.display(),
            total = report.total,
            success = report.success,
            failed = report.failed,
            "batch conversion completed"
        );
        Ok(report)
    }
}

fn write_output(output_path: Option<&Path>, markdown: &str) -> Result<(), XlsxDocError> {
    if let Some(path) = output_path {
        write_atomically(path, |file| {
            file.write_all(markdown.as_bytes())
                .map_err(|e| XlsxDocError::render("Failed to write Markdown output", e))
        })?;
    }
    Ok(())
}
