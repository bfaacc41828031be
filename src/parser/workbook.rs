//! Workbook Parser
//!
//! calamineを使用したワークブックアクセスの実装。
//! ワークブックは操作ごとに開かれ、`WorkbookParser`のドロップと同時に閉じられます。

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use calamine::{Dimensions, Reader, Xlsx, XlsxError};
use tracing::debug;

use crate::api::ReadMode;
use crate::error::XlsxDocError;
use crate::formatter::CellFormatter;
use crate::grid::SheetGrid;
use crate::security::{validate_input_file, InputLimits};
use crate::types::{CellCoord, CellRange, MergedRegion};

/// ワークブックパーサー
///
/// calamineのラッパーとして、シート名の列挙とシートグリッドの読み込みを提供します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<BufReader<File>>,
    /// 入力ファイルのパス
    path: PathBuf,
}

impl WorkbookParser {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `path` - 入力ファイルのパス
    /// * `limits` - 入力制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - ワークブックの読み込みに成功した場合
    /// * `Err(XlsxDocError::FileAccess)` - ファイルが存在しない、または検証後に消えた場合
    /// * `Err(XlsxDocError::UnsupportedFormat)` - 拡張子またはサイズが対象外の場合
    /// * `Err(XlsxDocError::CorruptFile)` - calamineがコンテナを解析できない場合
    pub fn open(path: &Path, limits: &InputLimits) -> Result<Self, XlsxDocError> {
        let size = validate_input_file(path, limits.max_input_file_size)?;

        // 検証から読み込みまでの間にファイルが削除される可能性がある
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                XlsxDocError::file_access(path, "file disappeared before it could be read")
            }
            _ => XlsxDocError::file_access(path, e.to_string()),
        })?;

        let workbook = Xlsx::new(BufReader::new(file))?;
        debug!(path = %path.display(), size, "opened workbook");

        Ok(Self {
            workbook,
            path: path.to_path_buf(),
        })
    }

    /// すべてのシート名を取得（ワークブック内の順序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    /// シートが存在することを確認
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - シートが存在する場合
    /// * `Err(XlsxDocError::SheetNotFound)` - シートが存在しない場合（利用可能なシート名を含む）
    pub fn ensure_sheet(&self, sheet_name: &str) -> Result<(), XlsxDocError> {
        let available = self.sheet_names();
        if available.iter().any(|name| name == sheet_name) {
            Ok(())
        } else {
            Err(XlsxDocError::SheetNotFound {
                sheet: sheet_name.to_string(),
                available,
            })
        }
    }

    /// シートをテキストグリッドとして読み込む
    ///
    /// # 引数
    ///
    /// * `sheet_name` - シート名
    /// * `mode` - 読み取りモード
    /// * `formatter` - セル値のテキスト化に使用するフォーマッター
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetGrid)` - 結合セル情報を含むグリッド
    /// * `Err(XlsxDocError)` - シートが存在しない、または解析に失敗した場合
    pub fn load_grid(
        &mut self,
        sheet_name: &str,
        mode: ReadMode,
        formatter: &CellFormatter,
    ) -> Result<SheetGrid, XlsxDocError> {
        self.ensure_sheet(sheet_name)?;

        // 1. キャッシュ値の取得
        let range = self.workbook.worksheet_range(sheet_name)?;
        let mut grid = SheetGrid::from_range(&range, formatter);

        // 2. 数式モードの場合は数式を重ねる
        if mode == ReadMode::Formula {
            let formulas = self.workbook.worksheet_formula(sheet_name)?;
            grid.overlay_formulas(&formulas, formatter);
        }

        // 3. 結合セル範囲の取得
        let merged_regions = self.merged_regions(sheet_name)?;

        debug!(
            path = %self.path.display(),
            sheet = sheet_name,
            ?mode,
            rows = grid.nominal_rows(),
            cols = grid.nominal_cols(),
            merged = merged_regions.len(),
            "loaded sheet grid"
        );

        Ok(grid.with_merged_regions(merged_regions))
    }

    /// シートの結合セル範囲を取得
    ///
    /// 結合セル情報が読めない場合は`CorruptFile`を返します。
    fn merged_regions(&mut self, sheet_name: &str) -> Result<Vec<MergedRegion>, XlsxDocError> {
        self.workbook.load_merged_regions()?;
        let result = self.workbook.worksheet_merge_cells(sheet_name);
        if result.is_none() {
            debug!(
                path = %self.path.display(),
                sheet = sheet_name,
                "sheet has no merged cell metadata"
            );
        }
        to_merged_regions(result)
    }
}

/// calamineの結合セル範囲を変換する
fn to_merged_regions(
    result: Option<Result<Vec<Dimensions>, XlsxError>>,
) -> Result<Vec<MergedRegion>, XlsxDocError> {
    let dimensions = match result {
        Some(result) => result?,
        None => return Ok(Vec::new()),
    };
    Ok(dimensions
        .iter()
        .map(|dims| {
            let start = CellCoord::new(dims.start.0, dims.start.1);
            let end = CellCoord::new(dims.end.0, dims.end.1);
            MergedRegion::new(CellRange::new(start, end))
        })
        .collect())
}

// シート全体の読み込みは実際のXLSXファイルが必要なため、統合テスト（tests/）で検証します。
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_regions_are_converted() {
        let regions = to_merged_regions(Some(Ok(vec![Dimensions::new((1, 0), (2, 1))]))).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].parent, CellCoord::new(1, 0));
        assert_eq!(regions[0].range.end, CellCoord::new(2, 1));
    }

    #[test]
    fn test_missing_merge_metadata_is_empty() {
        assert!(to_merged_regions(None).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_merge_metadata_is_an_error() {
        let err = XlsxError::Io(std::io::Error::other("bad mergeCell ref"));
        match to_merged_regions(Some(Err(err))) {
            Err(XlsxDocError::CorruptFile(inner)) => {
                assert!(inner.to_string().contains("bad mergeCell ref"));
            }
            other => panic!("Expected CorruptFile error, got {:?}", other),
        }
    }
}
