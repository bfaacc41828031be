//! Parser Module
//!
//! calamineを使用したワークブックアクセスの基礎実装。

mod workbook;

pub(crate) use workbook::WorkbookParser;
