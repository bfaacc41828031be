//! Builder Module
//!
//! Fluent Builder APIを提供し、`Processor`インスタンスを段階的に構築する。

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::api::{DateFormat, FillStrategy, HeaderPolicy, PreviewMode, ReadMode};
use crate::error::XlsxDocError;
use crate::extract::{validate_selection, Extractor};
use crate::formatter::{validate_date_format, CellFormatter};
use crate::grid::SheetGrid;
use crate::header::{header_names, HeaderColumn, HeaderResolver};
use crate::output::{
    DocumentRenderer, DocumentStyle, ExportFormat, MarkdownConverter, MarkdownTableRenderer,
    OutputRenderer, WorkbookMarkdownConverter,
};
use crate::parser::WorkbookParser;
use crate::preview::build_preview;
use crate::security::InputLimits;
use crate::types::{ExtractedTable, Preview, RowWindow};

/// 処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ProcessorConfig {
    /// 入力制限
    pub limits: InputLimits,

    /// 空のヘッダーセルの扱い
    pub header_policy: HeaderPolicy,

    /// 空セルの補完方式
    pub fill_strategy: FillStrategy,

    /// プレビューの切り出し方式
    pub preview_mode: PreviewMode,

    /// 日付形式
    pub date_format: DateFormat,

    /// 文書の書式設定
    pub document_style: DocumentStyle,

    /// Markdownテーブルの変換に使用するコンバーター
    pub markdown_converter: Arc<dyn MarkdownConverter>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            limits: InputLimits::default(),
            header_policy: HeaderPolicy::Placeholder,
            fill_strategy: FillStrategy::MergeThenForward,
            preview_mode: PreviewMode::LeadingBlock,
            date_format: DateFormat::Iso8601,
            document_style: DocumentStyle::default(),
            markdown_converter: Arc::new(WorkbookMarkdownConverter::new()),
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `Processor`インスタンスを段階的に構築するためのビルダーです。
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdoc::{FillStrategy, HeaderPolicy, ProcessorBuilder};
///
/// # fn main() -> Result<(), xlsxdoc::XlsxDocError> {
/// let processor = ProcessorBuilder::new()
///     .with_header_policy(HeaderPolicy::Skip)
///     .with_fill_strategy(FillStrategy::ForwardFill)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ProcessorBuilder {
    /// 内部設定（構築中）
    config: ProcessorConfig,
}

impl ProcessorBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 入力ファイルの最大サイズ: 50MiB
    /// - 選択列の最大数: 100
    /// - プレビュー行数の上限: 50
    /// - ヘッダー: 空セルに `Column {i}` を割り当てる
    /// - 補完: 結合セルの展開後に前方補完
    /// - プレビュー: 先頭ウィンドウ内の最後のデータ行まで
    /// - 日付形式: ISO 8601 (YYYY-MM-DD)
    pub fn new() -> Self {
        Self::default()
    }

    /// 入力ファイルの最大サイズ（バイト）を指定する
    pub fn with_max_input_file_size(mut self, bytes: u64) -> Self {
        self.config.limits.max_input_file_size = bytes;
        self
    }

    /// 選択できる列の最大数を指定する
    pub fn with_max_selected_columns(mut self, count: usize) -> Self {
        self.config.limits.max_selected_columns = count;
        self
    }

    /// プレビューで返す行数の上限を指定する
    ///
    /// `preview`に渡された`max_rows`はこの値に丸められます。
    pub fn with_max_preview_rows(mut self, rows: usize) -> Self {
        self.config.limits.max_preview_rows = rows;
        self
    }

    /// 空のヘッダーセルの扱いを指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdoc::{HeaderPolicy, ProcessorBuilder};
    ///
    /// // 空セルを列名から除外する
    /// let builder = ProcessorBuilder::new()
    ///     .with_header_policy(HeaderPolicy::Skip);
    /// ```
    pub fn with_header_policy(mut self, policy: HeaderPolicy) -> Self {
        self.config.header_policy = policy;
        self
    }

    /// 空セルの補完方式を指定する
    pub fn with_fill_strategy(mut self, strategy: FillStrategy) -> Self {
        self.config.fill_strategy = strategy;
        self
    }

    /// プレビューの切り出し方式を指定する
    pub fn with_preview_mode(mut self, mode: PreviewMode) -> Self {
        self.config.preview_mode = mode;
        self
    }

    /// 日付の出力形式を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxdoc::{DateFormat, ProcessorBuilder};
    ///
    /// let builder = ProcessorBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()));
    /// ```
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 文書の書式設定を指定する
    pub fn with_document_style(mut self, style: DocumentStyle) -> Self {
        self.config.document_style = style;
        self
    }

    /// Markdownテーブルの変換に使用するコンバーターを指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use xlsxdoc::{CommandMarkdownConverter, ProcessorBuilder};
    ///
    /// let builder = ProcessorBuilder::new()
    ///     .with_markdown_converter(Arc::new(CommandMarkdownConverter::new("markitdown")));
    /// ```
    pub fn with_markdown_converter(mut self, converter: Arc<dyn MarkdownConverter>) -> Self {
        self.config.markdown_converter = converter;
        self
    }

    /// 設定を検証し、`Processor`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Processor)`: 設定が有効な場合
    /// * `Err(XlsxDocError::Config)`: 上限値が0、またはカスタム日付形式が不正な場合
    pub fn build(self) -> Result<Processor, XlsxDocError> {
        // 1. 上限値の検証
        let limits = &self.config.limits;
        if limits.max_input_file_size == 0 {
            return Err(XlsxDocError::Config(
                "max_input_file_size must be greater than 0".to_string(),
            ));
        }
        if limits.max_selected_columns == 0 {
            return Err(XlsxDocError::Config(
                "max_selected_columns must be greater than 0".to_string(),
            ));
        }
        if limits.max_preview_rows == 0 {
            return Err(XlsxDocError::Config(
                "max_preview_rows must be greater than 0".to_string(),
            ));
        }

        // 2. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            validate_date_format(format_str)?;
        }

        // 3. Processorインスタンス生成
        Ok(Processor::new(self.config))
    }
}

/// エクスポート要求
///
/// シート名、出力する列、行範囲をまとめたものです。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    /// 対象シート名
    pub sheet_name: String,
    /// 出力する列名（この順序で出力される）
    pub selected_columns: Vec<String>,
    /// ヘッダー行とデータ行範囲
    pub window: RowWindow,
}

impl ExportRequest {
    /// 終了行を指定しないエクスポート要求を生成
    ///
    /// # 引数
    ///
    /// * `sheet_name` - 対象シート名
    /// * `selected_columns` - 出力する列名
    /// * `header_row` - ヘッダー行（1始まり）
    /// * `data_start_row` - データ開始行（1始まり）
    pub fn new<I, S>(
        sheet_name: impl Into<String>,
        selected_columns: I,
        header_row: u32,
        data_start_row: u32,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sheet_name: sheet_name.into(),
            selected_columns: selected_columns.into_iter().map(Into::into).collect(),
            window: RowWindow::new(header_row, data_start_row, None),
        }
    }

    /// データ終了行（1始まり、この行を含む）を指定する
    pub fn with_data_end_row(mut self, data_end_row: u32) -> Self {
        self.window.data_end_row = Some(data_end_row);
        self
    }
}

/// 抽出・エクスポート処理のファサード
///
/// 各操作はワークブックを開き、処理が終わると閉じます。
/// 状態を共有しないため、複数スレッドから同時に使用できます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxdoc::{ExportRequest, ProcessorBuilder};
///
/// # fn main() -> Result<(), xlsxdoc::XlsxDocError> {
/// let processor = ProcessorBuilder::new().build()?;
/// let sheets = processor.list_sheets("contacts.xlsx".as_ref())?;
///
/// let request = ExportRequest::new(&sheets[0], ["Name", "Email"], 1, 2);
/// let rows = processor.export_document(
///     "contacts.xlsx".as_ref(),
///     "outputs/contacts.docx".as_ref(),
///     &request,
/// )?;
/// println!("exported {} rows", rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Processor {
    /// 処理設定
    config: ProcessorConfig,

    /// セルフォーマッター
    formatter: CellFormatter,
}

impl Processor {
    pub(crate) fn new(config: ProcessorConfig) -> Self {
        Self {
            formatter: CellFormatter::new(config.date_format.clone()),
            config,
        }
    }

    /// ワークブックのシート名をワークブック内の順序で取得
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - シート名
    /// * `Err(XlsxDocError)` - ファイルの検証または読み込みに失敗した場合
    pub fn list_sheets(&self, path: &Path) -> Result<Vec<String>, XlsxDocError> {
        let parser = WorkbookParser::open(path, &self.config.limits)?;
        Ok(parser.sheet_names())
    }

    /// シートの先頭部分を取得
    ///
    /// # 引数
    ///
    /// * `path` - 入力ファイルのパス
    /// * `sheet_name` - シート名
    /// * `max_rows` - 返す最大行数（`1..=max_preview_rows`に丸められる）
    pub fn preview(
        &self,
        path: &Path,
        sheet_name: &str,
        max_rows: usize,
    ) -> Result<Preview, XlsxDocError> {
        let mut parser = WorkbookParser::open(path, &self.config.limits)?;
        let grid = parser.load_grid(sheet_name, ReadMode::Value, &self.formatter)?;
        let max_rows = max_rows.clamp(1, self.config.limits.max_preview_rows);
        Ok(build_preview(&grid, max_rows, self.config.preview_mode))
    }

    /// ヘッダー行の列名を取得
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 正規化済みの列名（空シートの場合は空）
    /// * `Err(XlsxDocError::InvalidRow)` - ヘッダー行がシートの範囲外の場合
    pub fn column_headers(
        &self,
        path: &Path,
        sheet_name: &str,
        header_row: u32,
    ) -> Result<Vec<String>, XlsxDocError> {
        let mut parser = WorkbookParser::open(path, &self.config.limits)?;
        let grid = parser.load_grid(sheet_name, ReadMode::Value, &self.formatter)?;
        let columns = self.resolve_headers(&mut parser, sheet_name, &grid, header_row)?;
        Ok(header_names(&columns))
    }

    /// 選択列と行範囲を抽出し、補完済みのテーブルを返す
    ///
    /// # 処理フロー
    ///
    /// 1. 入力ファイルの検証とワークブックの読み込み
    /// 2. 選択列と行範囲の検証
    /// 3. シートの読み込み
    /// 4. ヘッダーの解決
    /// 5. 抽出と補完
    pub fn extract(
        &self,
        path: &Path,
        request: &ExportRequest,
    ) -> Result<ExtractedTable, XlsxDocError> {
        let mut parser = WorkbookParser::open(path, &self.config.limits)?;

        validate_selection(
            &request.selected_columns,
            self.config.limits.max_selected_columns,
        )?;
        request.window.validate()?;

        let grid = parser.load_grid(&request.sheet_name, ReadMode::Value, &self.formatter)?;
        let headers = self.resolve_headers(
            &mut parser,
            &request.sheet_name,
            &grid,
            request.window.header_row,
        )?;
        drop(parser);

        Extractor::new(self.config.fill_strategy).extract(
            grid,
            &headers,
            &request.window,
            &request.selected_columns,
        )
    }

    /// テーブルを抽出し、指定した形式で出力する
    ///
    /// # 戻り値
    ///
    /// * `Ok(usize)` - 出力した行数
    /// * `Err(XlsxDocError)` - 抽出または出力に失敗した場合
    pub fn export(
        &self,
        path: &Path,
        output_path: &Path,
        format: ExportFormat,
        request: &ExportRequest,
    ) -> Result<usize, XlsxDocError> {
        let table = self.extract(path, request)?;

        let renderer = match format {
            ExportFormat::Docx => {
                OutputRenderer::Document(DocumentRenderer::new(&self.config.document_style))
            }
            ExportFormat::Markdown => OutputRenderer::Markdown(MarkdownTableRenderer::new(
                self.config.markdown_converter.as_ref(),
            )),
        };
        renderer.render(&table, output_path)?;

        info!(
            input = %path.display(),
            output = %output_path.display(),
            sheet = %request.sheet_name,
            ?format,
            rows = table.row_count(),
            "export completed"
        );
        Ok(table.row_count())
    }

    /// 1行1段落の文書（.docx）として出力する
    pub fn export_document(
        &self,
        path: &Path,
        output_path: &Path,
        request: &ExportRequest,
    ) -> Result<usize, XlsxDocError> {
        self.export(path, output_path, ExportFormat::Docx, request)
    }

    /// Markdownテーブル（.md）として出力する
    pub fn export_markdown_table(
        &self,
        path: &Path,
        output_path: &Path,
        request: &ExportRequest,
    ) -> Result<usize, XlsxDocError> {
        self.export(path, output_path, ExportFormat::Markdown, request)
    }

    /// ヘッダーを解決する（必要な場合のみ数式モードでシートを再読み込み）
    fn resolve_headers(
        &self,
        parser: &mut WorkbookParser,
        sheet_name: &str,
        grid: &SheetGrid,
        header_row: u32,
    ) -> Result<Vec<HeaderColumn>, XlsxDocError> {
        HeaderResolver::new(self.config.header_policy).resolve(
            grid,
            || parser.load_grid(sheet_name, ReadMode::Formula, &self.formatter),
            header_row,
        )
    }
}
