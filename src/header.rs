//! Header Module
//!
//! ヘッダー行から列名を解決するモジュール。
//! キャッシュ値で名前が得られない場合は、数式読み取りモードで再試行します。

use tracing::debug;

use crate::api::HeaderPolicy;
use crate::error::XlsxDocError;
use crate::grid::{is_blank, SheetGrid};

/// 列名を正規化する
///
/// 改行とタブを空白に置き換え、前後の空白を取り除きます。
pub fn normalize_header(raw: &str) -> String {
    raw.replace(['\n', '\t'], " ").trim().to_string()
}

/// 空のヘッダーセルに割り当てる列名（1始まりの列番号）
pub fn placeholder_name(column: usize) -> String {
    format!("Column {}", column)
}

/// 解決済みの列名
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeaderColumn {
    /// シート上の列位置（0始まり）
    pub index: usize,
    /// 正規化済みの列名
    pub name: String,
    /// 空セルに割り当てた名前かどうか
    pub placeholder: bool,
}

/// ヘッダー解決器
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeaderResolver {
    policy: HeaderPolicy,
}

impl HeaderResolver {
    /// 新しいHeaderResolverインスタンスを生成
    pub fn new(policy: HeaderPolicy) -> Self {
        Self { policy }
    }

    /// ヘッダー行の列名を解決する
    ///
    /// # 引数
    ///
    /// * `values` - キャッシュ値で読み込んだグリッド
    /// * `formulas` - 数式読み取りモードのグリッドを読み込む関数（再試行時のみ呼び出される）
    /// * `header_row` - ヘッダー行（1始まり）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<HeaderColumn>)` - 列位置順の列名（空シートの場合は空）
    /// * `Err(XlsxDocError::InvalidRow)` - ヘッダー行がシートの範囲外の場合
    pub fn resolve<F>(
        &self,
        values: &SheetGrid,
        formulas: F,
        header_row: u32,
    ) -> Result<Vec<HeaderColumn>, XlsxDocError>
    where
        F: FnOnce() -> Result<SheetGrid, XlsxDocError>,
    {
        // 1. ヘッダー行の範囲検証
        let total = values.nominal_rows() as u32;
        if header_row == 0 || header_row > total {
            return Err(XlsxDocError::InvalidRow {
                row: header_row,
                total,
            });
        }

        // 2. キャッシュ値での解決
        let primary = self.columns_from(values, header_row);
        if primary.iter().any(|c| !c.placeholder) {
            return Ok(primary);
        }

        // 3. 名前が1つも得られない場合は数式モードで再試行
        let formula_grid = formulas()?;
        let retry = self.columns_from(&formula_grid, header_row);
        debug!(
            header_row,
            primary = primary.len(),
            retry = retry.len(),
            "header row had no names in value mode; retried in formula mode"
        );
        if retry.iter().any(|c| !c.placeholder) {
            return Ok(retry);
        }

        Ok(primary)
    }

    /// グリッドのヘッダー行から列名を読み取る
    fn columns_from(&self, grid: &SheetGrid, header_row: u32) -> Vec<HeaderColumn> {
        let width = grid.extent().max_used_column as usize;
        let row = (header_row - 1) as usize;

        (0..width)
            .filter_map(|index| {
                let raw = grid.cell(row, index);
                if is_blank(raw) {
                    match self.policy {
                        HeaderPolicy::Placeholder => Some(HeaderColumn {
                            index,
                            name: placeholder_name(index + 1),
                            placeholder: true,
                        }),
                        HeaderPolicy::Skip => None,
                    }
                } else {
                    Some(HeaderColumn {
                        index,
                        name: normalize_header(raw),
                        placeholder: false,
                    })
                }
            })
            .collect()
    }
}

/// 列名だけを取り出す
pub(crate) fn header_names(columns: &[HeaderColumn]) -> Vec<String> {
    columns.iter().map(|c| c.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> SheetGrid {
        SheetGrid::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
    }

    fn no_formulas() -> Result<SheetGrid, XlsxDocError> {
        panic!("formula mode must not be consulted")
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Full\nName\t "), "Full Name");
        assert_eq!(normalize_header("Tab\tSeparated"), "Tab Separated");
        assert_eq!(normalize_header("plain"), "plain");
    }

    #[test]
    fn test_placeholder_for_blank_header_cell() {
        let values = grid(&[&["Title"], &["Name", "", "Email"], &["a", "b", "c"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Placeholder);
        let columns = resolver.resolve(&values, no_formulas, 2).unwrap();
        assert_eq!(
            header_names(&columns),
            vec!["Name", "Column 2", "Email"]
        );
        assert!(columns[1].placeholder);
        assert_eq!(columns[2].index, 2);
    }

    #[test]
    fn test_skip_policy_drops_blank_cells() {
        let values = grid(&[&["Name", " ", "Email"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Skip);
        let columns = resolver.resolve(&values, no_formulas, 1).unwrap();
        assert_eq!(header_names(&columns), vec!["Name", "Email"]);
        assert_eq!(columns[1].index, 2);
    }

    #[test]
    fn test_width_follows_whole_sheet_extent() {
        // ヘッダー行より下の行の方が列が多い場合も、最後の使用列まで読む
        let values = grid(&[&["Name"], &["a", "b", "c"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Placeholder);
        let columns = resolver.resolve(&values, no_formulas, 1).unwrap();
        assert_eq!(header_names(&columns), vec!["Name", "Column 2", "Column 3"]);
    }

    #[test]
    fn test_invalid_row() {
        let values = grid(&[&["a"], &["b"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Placeholder);
        match resolver.resolve(&values, no_formulas, 3) {
            Err(XlsxDocError::InvalidRow { row, total }) => {
                assert_eq!(row, 3);
                assert_eq!(total, 2);
            }
            other => panic!("Expected InvalidRow error, got {:?}", other),
        }
        assert!(matches!(
            resolver.resolve(&values, no_formulas, 0),
            Err(XlsxDocError::InvalidRow { row: 0, .. })
        ));
    }

    #[test]
    fn test_formula_mode_retry() {
        let values = grid(&[&["", ""], &["1", "2"]]);
        let formulas = grid(&[&["=Sheet2!A1", "=UPPER(\"id\")"], &["1", "2"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Skip);
        let columns = resolver
            .resolve(&values, || Ok(formulas.clone()), 1)
            .unwrap();
        assert_eq!(
            header_names(&columns),
            vec!["=Sheet2!A1", "=UPPER(\"id\")"]
        );
    }

    #[test]
    fn test_all_placeholders_when_both_modes_are_blank() {
        let values = grid(&[&["", ""], &["1", "2"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Placeholder);
        let columns = resolver
            .resolve(&values, || Ok(grid(&[&["", ""], &["1", "2"]])), 1)
            .unwrap();
        assert_eq!(header_names(&columns), vec!["Column 1", "Column 2"]);

        let resolver = HeaderResolver::new(HeaderPolicy::Skip);
        let columns = resolver
            .resolve(&values, || Ok(grid(&[&["", ""], &["1", "2"]])), 1)
            .unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn test_formula_loader_error_propagates() {
        let values = grid(&[&[""], &["1"]]);
        let resolver = HeaderResolver::new(HeaderPolicy::Placeholder);
        let result = resolver.resolve(
            &values,
            || Err(XlsxDocError::Render("formula read failed".to_string())),
            1,
        );
        assert!(matches!(result, Err(XlsxDocError::Render(_))));
    }
}
