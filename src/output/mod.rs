//! Output Format Module
//!
//! Strategy Patternによる出力フォーマットの抽象化を提供するモジュール。
//! 出力ファイルは同じディレクトリの一時ファイルに書き込んでから置き換えます。

mod document;
mod markdown;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use tempfile::NamedTempFile;

use crate::error::XlsxDocError;
use crate::types::ExtractedTable;

pub use document::DocumentStyle;
pub(crate) use document::DocumentRenderer;
pub use markdown::{CommandMarkdownConverter, MarkdownConverter, WorkbookMarkdownConverter};
pub(crate) use markdown::MarkdownTableRenderer;

/// エクスポート形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExportFormat {
    /// 1行1段落の文書（.docx）
    Docx,
    /// Markdownテーブル（.md）
    Markdown,
}

impl ExportFormat {
    /// 出力ファイルの拡張子
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Docx => "docx",
            ExportFormat::Markdown => "md",
        }
    }
}

/// 出力レンダラー（Strategy Pattern）
///
/// 各エクスポート形式のレンダラーをenumとして表現します。
pub(crate) enum OutputRenderer<'a> {
    Document(DocumentRenderer<'a>),
    Markdown(MarkdownTableRenderer<'a>),
}

impl OutputRenderer<'_> {
    /// テーブルを出力ファイルに書き込む
    ///
    /// # 引数
    ///
    /// * `table` - 抽出済みテーブル
    /// * `output_path` - 出力先のパス（親ディレクトリがなければ作成される）
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - 出力に成功した場合
    /// * `Err(XlsxDocError::Render)` - 書き込みまたは外部コンバーターが失敗した場合
    pub fn render(&self, table: &ExtractedTable, output_path: &Path) -> Result<(), XlsxDocError> {
        match self {
            OutputRenderer::Document(renderer) => renderer.render(table, output_path),
            OutputRenderer::Markdown(renderer) => renderer.render(table, output_path).map(|_| ()),
        }
    }
}

static OUTPUT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// 衝突しない出力ファイルパスを生成する
///
/// 形式: `output_{YYYYmmdd_HHMMSS}_{マイクロ秒}_{連番}.{拡張子}`
///
/// # 使用例
///
/// ```rust
/// let a = xlsxdoc::unique_output_path("outputs", "docx");
/// let b = xlsxdoc::unique_output_path("outputs", "docx");
/// assert_ne!(a, b);
/// assert!(a.to_string_lossy().ends_with(".docx"));
/// ```
pub fn unique_output_path(dir: impl AsRef<Path>, extension: &str) -> PathBuf {
    let now = Local::now();
    let sequence = OUTPUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    dir.as_ref().join(format!(
        "output_{}_{:06}_{}.{}",
        now.format("%Y%m%d_%H%M%S"),
        now.timestamp_subsec_micros(),
        sequence,
        extension
    ))
}

/// 一時ファイルに書き込んでから出力先に置き換える
///
/// 書き込みが失敗した場合、一時ファイルは削除され、既存の出力ファイルは変更されません。
pub(crate) fn write_atomically<F>(output_path: &Path, write: F) -> Result<(), XlsxDocError>
where
    F: FnOnce(&mut std::fs::File) -> Result<(), XlsxDocError>,
{
    let parent = match output_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)
        .map_err(|e| XlsxDocError::render("Failed to create output directory", e))?;

    let mut temp = NamedTempFile::new_in(&parent)
        .map_err(|e| XlsxDocError::render("Failed to create temporary output file", e))?;
    write(temp.as_file_mut())?;
    temp.as_file_mut()
        .flush()
        .map_err(|e| XlsxDocError::render("Failed to flush output file", e))?;
    temp.persist(output_path)
        .map_err(|e| XlsxDocError::render("Failed to move output file into place", e.error))?;
    Ok(())
}
