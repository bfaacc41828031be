//! Formatter Module
//!
//! セル値のテキスト化を提供するモジュール。
//! 抽出・プレビュー・ヘッダー解決のすべてがこのモジュールを通してセルを文字列に変換します。

use std::fmt::Write as _;

use calamine::{Data, ExcelDateTime};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDateTime, NaiveTime};

use crate::api::DateFormat;
use crate::error::XlsxDocError;

/// セルフォーマッター
///
/// calamineのセル値を下流処理用のテキストに変換します。
#[derive(Debug, Clone)]
pub(crate) struct CellFormatter {
    /// 日付形式
    date_format: DateFormat,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new(date_format: DateFormat) -> Self {
        Self { date_format }
    }

    /// セル値をテキストに変換
    ///
    /// # 引数
    ///
    /// * `cell` - calamineのセル値
    ///
    /// # 戻り値
    ///
    /// テキスト化された値（空セルは空文字列）
    pub fn format_value(&self, cell: &Data) -> String {
        match cell {
            Data::Int(i) => i.to_string(),
            Data::Float(f) => format_number(*f),
            Data::String(s) => s.clone(),
            Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Data::DateTime(dt) => self.format_datetime(dt),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
            Data::Error(e) => e.to_string(),
            Data::Empty => String::new(),
        }
    }

    /// 数式をテキストに変換（`=`を先頭に付与）
    pub fn format_formula(&self, formula: &str) -> String {
        if formula.starts_with('=') {
            formula.to_string()
        } else {
            format!("={}", formula)
        }
    }

    /// 日付・時刻セルをフォーマット
    ///
    /// 期間（duration）として保存されている場合は `H:MM:SS` で出力します。
    /// 日付に変換できない値はシリアル値のまま出力します。
    fn format_datetime(&self, dt: &ExcelDateTime) -> String {
        if dt.is_duration() {
            if let Some(duration) = dt.as_duration() {
                let total = duration.num_seconds();
                return format!(
                    "{}:{:02}:{:02}",
                    total / 3600,
                    (total % 3600) / 60,
                    total % 60
                );
            }
        }

        match dt.as_datetime() {
            Some(datetime) => self.format_naive(datetime),
            None => format_number(dt.as_f64()),
        }
    }

    fn format_naive(&self, datetime: NaiveDateTime) -> String {
        match &self.date_format {
            DateFormat::Iso8601 => iso_datetime(datetime),
            DateFormat::Custom(format_str) => {
                let mut out = String::new();
                match write!(out, "{}", datetime.format(format_str)) {
                    Ok(()) => out,
                    Err(_) => iso_datetime(datetime),
                }
            }
        }
    }
}

impl Default for CellFormatter {
    fn default() -> Self {
        Self::new(DateFormat::Iso8601)
    }
}

fn iso_datetime(datetime: NaiveDateTime) -> String {
    if datetime.time() == NaiveTime::MIN {
        datetime.format("%Y-%m-%d").to_string()
    } else {
        datetime.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// 数値をテキストに変換
///
/// 小数部が0の値は整数表記、それ以外は最短の往復可能表記にします。
fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// カスタム日付形式の検証
///
/// # 戻り値
///
/// * `Ok(())` - chronoが解釈できる書式文字列の場合
/// * `Err(XlsxDocError::Config)` - 空文字列または不正な指定子を含む場合
pub(crate) fn validate_date_format(format_str: &str) -> Result<(), XlsxDocError> {
    if format_str.is_empty() {
        return Err(XlsxDocError::Config(
            "Date format string must not be empty".to_string(),
        ));
    }

    if StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error)) {
        return Err(XlsxDocError::Config(format!(
            "Invalid date format string: '{}'",
            format_str
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_format_scalars() {
        let formatter = CellFormatter::default();
        assert_eq!(formatter.format_value(&Data::Int(42)), "42");
        assert_eq!(formatter.format_value(&Data::Float(3.0)), "3");
        assert_eq!(formatter.format_value(&Data::Float(2.5)), "2.5");
        assert_eq!(formatter.format_value(&Data::Float(-0.125)), "-0.125");
        assert_eq!(formatter.format_value(&Data::Bool(true)), "TRUE");
        assert_eq!(formatter.format_value(&Data::Bool(false)), "FALSE");
        assert_eq!(formatter.format_value(&Data::Empty), "");
    }

    #[test]
    fn test_format_string_is_untouched() {
        let formatter = CellFormatter::default();
        assert_eq!(
            formatter.format_value(&Data::String("  padded\tvalue ".to_string())),
            "  padded\tvalue "
        );
    }

    #[test]
    fn test_format_error_code() {
        let formatter = CellFormatter::default();
        assert_eq!(
            formatter.format_value(&Data::Error(CellErrorType::Div0)),
            "#DIV/0!"
        );
        assert_eq!(formatter.format_value(&Data::Error(CellErrorType::NA)), "#N/A");
    }

    #[test]
    fn test_format_iso_strings_pass_through() {
        let formatter = CellFormatter::default();
        assert_eq!(
            formatter.format_value(&Data::DateTimeIso("2025-01-02T03:04:05".to_string())),
            "2025-01-02T03:04:05"
        );
        assert_eq!(
            formatter.format_value(&Data::DurationIso("PT1H".to_string())),
            "PT1H"
        );
    }

    #[test]
    fn test_format_naive_iso_and_custom() {
        let date = chrono::NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let midnight = date.and_hms_opt(0, 0, 0).unwrap();
        let morning = date.and_hms_opt(9, 30, 15).unwrap();

        let iso = CellFormatter::default();
        assert_eq!(iso.format_naive(midnight), "2025-01-02");
        assert_eq!(iso.format_naive(morning), "2025-01-02 09:30:15");

        let custom = CellFormatter::new(DateFormat::Custom("%d/%m/%Y".to_string()));
        assert_eq!(custom.format_naive(morning), "02/01/2025");
    }

    #[test]
    fn test_format_formula() {
        let formatter = CellFormatter::default();
        assert_eq!(formatter.format_formula("SUM(A1:A3)"), "=SUM(A1:A3)");
        assert_eq!(formatter.format_formula("=A1"), "=A1");
    }

    #[test]
    fn test_validate_date_format() {
        assert!(validate_date_format("%Y-%m-%d").is_ok());
        assert!(validate_date_format("%d/%m/%Y %H:%M").is_ok());
        assert!(matches!(
            validate_date_format(""),
            Err(XlsxDocError::Config(_))
        ));
        assert!(matches!(
            validate_date_format("%Y-%m-%"),
            Err(XlsxDocError::Config(_))
        ));
    }

    // プロパティベーステスト
    #[allow(unused_doc_comments)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[allow(unused_doc_comments)]
        /// 整数値の浮動小数点は小数点なしで出力され、元の値に戻せる
        proptest! {
            #[test]
            fn test_integral_floats_print_as_integers(value in -1_000_000_000i64..1_000_000_000i64) {
                let text = format_number(value as f64);
                prop_assert!(!text.contains('.'));
                prop_assert_eq!(text.parse::<i64>().unwrap(), value);
            }
        }
    }
}
