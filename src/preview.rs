//! Preview Module
//!
//! シートの先頭部分をプレビュー用に切り出すモジュール。

use crate::api::PreviewMode;
use crate::extent::last_used_column;
use crate::grid::SheetGrid;
use crate::types::Preview;

/// プレビューを構築する
///
/// すべての行は最後の使用列までの幅に揃えられます。
///
/// # 引数
///
/// * `grid` - キャッシュ値で読み込んだグリッド
/// * `max_rows` - 返す最大行数（呼び出し側で上限に丸め済みであること）
/// * `mode` - 切り出し方式
pub(crate) fn build_preview(grid: &SheetGrid, max_rows: usize, mode: PreviewMode) -> Preview {
    let extent = grid.extent();
    if extent.is_empty() {
        return Preview::empty();
    }

    let width = extent.max_used_column as usize;
    let row_text = |index: usize| -> Vec<String> {
        (0..width).map(|col| grid.cell(index, col).to_string()).collect()
    };
    let has_data = |index: usize| last_used_column(grid.row(index)) > 0;

    let rows = match mode {
        PreviewMode::Window => {
            let scanned = max_rows.min(grid.nominal_rows());
            // 範囲内で最後にデータがある行までに切り詰める
            let last = (0..scanned).rev().find(|&i| has_data(i)).map_or(0, |i| i + 1);
            (0..last).map(row_text).collect()
        }
        PreviewMode::LeadingBlock => {
            let mut rows = Vec::new();
            let mut started = false;
            for index in 0..grid.nominal_rows() {
                if rows.len() >= max_rows {
                    break;
                }
                if has_data(index) {
                    started = true;
                } else if started {
                    break;
                }
                rows.push(row_text(index));
            }
            rows
        }
        PreviewMode::NonBlankRows => (0..grid.nominal_rows())
            .filter(|&i| has_data(i))
            .take(max_rows)
            .map(row_text)
            .collect(),
    };

    Preview {
        rows,
        total_data_rows: extent.last_data_row,
        total_columns: extent.max_used_column,
    }
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

    /// 3行のデータ、2行の空行、1行のデータ
    fn gapped_sheet() -> SheetGrid {
        grid(&[
            &["Name", "Email", ""],
            &["a", "a@example.com"],
            &["b", ""],
            &["", ""],
            &["  ", ""],
            &["c", "c@example.com"],
        ])
    }

    #[test]
    fn test_window_keeps_interior_blank_rows() {
        let preview = build_preview(&gapped_sheet(), 10, PreviewMode::Window);
        assert_eq!(preview.rows.len(), 6);
        assert_eq!(preview.total_data_rows, 6);
        assert_eq!(preview.total_columns, 2);
        assert!(preview.rows.iter().all(|r| r.len() == 2));
    }

    #[test]
    fn test_window_truncates_at_last_data_row_inside_window() {
        let preview = build_preview(&gapped_sheet(), 5, PreviewMode::Window);
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.rows[2], vec!["b", ""]);
        assert_eq!(preview.total_data_rows, 6);
    }

    #[test]
    fn test_leading_block_stops_at_first_gap() {
        let preview = build_preview(&gapped_sheet(), 10, PreviewMode::LeadingBlock);
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.rows[0], vec!["Name", "Email"]);
    }

    #[test]
    fn test_leading_block_keeps_leading_blank_rows() {
        let sheet = grid(&[&[""], &["title"], &["x"], &[""], &["y"]]);
        let preview = build_preview(&sheet, 10, PreviewMode::LeadingBlock);
        assert_eq!(preview.rows.len(), 3);
        assert_eq!(preview.rows[1], vec!["title"]);
    }

    #[test]
    fn test_non_blank_rows_skips_gaps() {
        let preview = build_preview(&gapped_sheet(), 10, PreviewMode::NonBlankRows);
        assert_eq!(preview.rows.len(), 4);
        assert_eq!(preview.rows[3], vec!["c", "c@example.com"]);

        let preview = build_preview(&gapped_sheet(), 2, PreviewMode::NonBlankRows);
        assert_eq!(preview.rows.len(), 2);
    }

    #[test]
    fn test_empty_sheet_preview() {
        let sheet = grid(&[&["", " "], &[""]]);
        for mode in [
            PreviewMode::Window,
            PreviewMode::LeadingBlock,
            PreviewMode::NonBlankRows,
        ] {
            let preview = build_preview(&sheet, 10, mode);
            assert!(preview.rows.is_empty());
            assert_eq!(preview.total_columns, 0);
            assert_eq!(preview.total_data_rows, 0);
        }
    }
}
