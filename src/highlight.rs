//! Highlight Module
//!
//! ナレッジベース向けMarkdownの強調表示を行うモジュール。
//! 語彙（担当者・操作・対象物）の太字化、識別子行の引用化、
//! 手順・条件分岐の見出し強調を提供します。

use std::collections::BTreeSet;

use regex::Regex;
use serde::Serialize;

use crate::error::XlsxDocError;
use crate::types::ExtractedTable;

/// 値が空の場合に出力する文字列
const MISSING_VALUE: &str = "N/A";

const VARIABLE_LINE: &str = r"^<[A-Z_]+>$";
const EMAIL: &str = r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}";
const URL: &str = r"https?://";
const IDENTIFIER: &str =
    r"\b[A-Z]{1,5}_[A-Z0-9_]{2,}\b|\bHD\s*\d{3,}\b|\b[A-Z]{2,}\s*\d{3,}\b|\b\d{9,}\b";
const STEP_PREFIX: &str = r"^((?:Bước|Step)\s+\d+:)";
const CASE_PREFIX: &str = r"(?i)^((?:Trường\s+hợp|Case)\s+\d+[^:]*:)";
const CONDITION: &str = r"(?i)\b((?:Nếu|If)\s+.+?\s+(?:thì|then))\b";

/// 強調する語彙
///
/// 大文字・小文字を区別せず、単語境界で一致した箇所が太字になります。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    /// 部署・役職などの担当者
    pub actors: Vec<String>,
    /// 操作・状態
    pub actions: Vec<String>,
    /// 文書・ツールなどの対象物
    pub objects: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let owned =
            |terms: &[&str]| -> Vec<String> { terms.iter().map(|t| t.to_string()).collect() };
        Self {
            actors: owned(&[
                "kế toán",
                "nhân sự",
                "truyền thông",
                "partnership",
                "kinh doanh",
                "ban giám đốc",
                "khách hàng",
                "ứng viên",
                "nhân viên",
                "operation",
                "marketing",
                "sales",
                "support",
                "admin",
                "manager",
                "team lead",
                "phòng",
                "bộ phận",
                "hệ thống ai",
                "merchant",
                "partner",
            ]),
            actions: owned(&[
                "phê duyệt",
                "duyệt",
                "từ chối",
                "gửi",
                "nhận",
                "kiểm tra",
                "xác nhận",
                "hoàn thành",
                "bắt đầu",
                "kết thúc",
                "cập nhật",
                "xóa",
                "sửa",
                "tạo",
                "lưu",
                "tải lên",
                "tải xuống",
                "đã hoàn thành",
                "đang treo",
                "chấp nhận",
                "gửi yêu cầu",
                "bấm",
                "nhấp",
                "truy cập",
                "điền",
                "submit",
                "approve",
                "reject",
                "confirm",
                "cancel",
            ]),
            objects: owned(&[
                "biên bản đối soát",
                "hợp đồng",
                "biểu mẫu",
                "báo cáo",
                "màn hình",
                "offer letter",
                "thông báo",
                "form",
                "button",
                "screen",
                "document",
                "report",
                "contract",
                "application",
                "database",
            ]),
        }
    }
}

/// テキストから見つかったエンティティ（グループごとに整列済み、重複なし）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Entities {
    pub actors: Vec<String>,
    pub actions: Vec<String>,
    pub objects: Vec<String>,
    pub identifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Actor,
    Action,
    Object,
}

/// エンティティ強調器
#[derive(Debug, Clone)]
pub struct EntityHighlighter {
    /// (小文字化した語, グループ)
    terms: Vec<(String, Group)>,
    /// すべての語を長い順に並べた選択パターン（語彙が空の場合はNone）
    term_pattern: Option<Regex>,
    variable_line: Regex,
    email: Regex,
    url: Regex,
    identifier: Regex,
    step_prefix: Regex,
    case_prefix: Regex,
    condition: Regex,
}

impl EntityHighlighter {
    /// デフォルト語彙で生成
    pub fn new() -> Result<Self, XlsxDocError> {
        Self::with_vocabulary(Vocabulary::default())
    }

    /// 語彙を指定して生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(EntityHighlighter)` - パターンの構築に成功した場合
    /// * `Err(XlsxDocError::Config)` - パターンを構築できない場合
    pub fn with_vocabulary(vocabulary: Vocabulary) -> Result<Self, XlsxDocError> {
        let mut terms: Vec<(String, Group)> = Vec::new();
        for (group, words) in [
            (Group::Actor, &vocabulary.actors),
            (Group::Action, &vocabulary.actions),
            (Group::Object, &vocabulary.objects),
        ] {
            for word in words {
                let word = word.trim().to_lowercase();
                if !word.is_empty() && !terms.iter().any(|(t, _)| *t == word) {
                    terms.push((word, group));
                }
            }
        }

        // 長い語を優先して一致させる
        let mut alternatives: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
        alternatives.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        let term_pattern = if alternatives.is_empty() {
            None
        } else {
            let bounded: Vec<String> = alternatives.iter().map(|t| bounded_term(t)).collect();
            Some(compile(&format!("(?i){}", bounded.join("|")))?)
        };

        Ok(Self {
            terms,
            term_pattern,
            variable_line: compile(VARIABLE_LINE)?,
            email: compile(EMAIL)?,
            url: compile(URL)?,
            identifier: compile(IDENTIFIER)?,
            step_prefix: compile(STEP_PREFIX)?,
            case_prefix: compile(CASE_PREFIX)?,
            condition: compile(CONDITION)?,
        })
    }

    /// テキストを強調表示する
    ///
    /// 行ごとに次の順で処理します。
    ///
    /// 1. `<VARIABLE>` だけの行、またはメール・URL・識別子を含む行は `> ` 引用にする
    /// 2. `Step N:` / `Case N ...:` の行頭と `If ... then` 節を太字にする
    /// 3. 既存の太字の外側にある語彙を太字にする
    ///
    /// # 使用例
    ///
    /// ```rust
    /// let highlighter = xlsxdoc::EntityHighlighter::new().unwrap();
    /// assert_eq!(
    ///     highlighter.highlight("Step 1: Manager will approve the report"),
    ///     "**Step 1:** **Manager** will **approve** the **report**"
    /// );
    /// assert_eq!(highlighter.highlight("  <SOURCE_URL> "), "> <SOURCE_URL>");
    /// ```
    pub fn highlight(&self, text: &str) -> String {
        text.split('\n')
            .map(|line| self.highlight_line(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn highlight_line(&self, line: &str) -> String {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return line.to_string();
        }

        // テーブル行は引用にしない
        if !trimmed.starts_with('|')
            && (self.variable_line.is_match(trimmed) || self.is_identifier_line(trimmed))
        {
            return format!("> {}", trimmed);
        }

        let line = self.step_prefix.replace(line, "**$1**");
        let line = self.case_prefix.replace(&line, "**$1**");
        let line = self.condition.replace_all(&line, "**$1**");
        self.bold_terms(&line)
    }

    fn is_identifier_line(&self, line: &str) -> bool {
        self.email.is_match(line) || self.url.is_match(line) || self.identifier.is_match(line)
    }

    /// `**` で囲まれていない区間の語彙を太字にする
    fn bold_terms(&self, line: &str) -> String {
        let pattern = match &self.term_pattern {
            Some(pattern) => pattern,
            None => return line.to_string(),
        };

        line.split("**")
            .enumerate()
            .map(|(index, segment)| {
                if index % 2 == 1 {
                    segment.to_string()
                } else {
                    pattern
                        .replace_all(segment, |caps: &regex::Captures<'_>| {
                            format!("**{}**", &caps[0])
                        })
                        .into_owned()
                }
            })
            .collect::<Vec<_>>()
            .join("**")
    }

    /// テキストに含まれる語彙と識別子を取り出す
    pub fn extract_entities(&self, text: &str) -> Entities {
        let mut actors = BTreeSet::new();
        let mut actions = BTreeSet::new();
        let mut objects = BTreeSet::new();

        if let Some(pattern) = &self.term_pattern {
            for found in pattern.find_iter(text) {
                let word = found.as_str().to_lowercase();
                if let Some((term, group)) = self.terms.iter().find(|(t, _)| *t == word) {
                    let bucket = match group {
                        Group::Actor => &mut actors,
                        Group::Action => &mut actions,
                        Group::Object => &mut objects,
                    };
                    bucket.insert(term.clone());
                }
            }
        }

        let identifiers: BTreeSet<String> = self
            .identifier
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        Entities {
            actors: actors.into_iter().collect(),
            actions: actions.into_iter().collect(),
            objects: objects.into_iter().collect(),
            identifiers: identifiers.into_iter().collect(),
        }
    }
}

/// 語の両端が単語文字の場合のみ単語境界を付ける
fn bounded_term(term: &str) -> String {
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let start = if is_word(term.chars().next()) { r"\b" } else { "" };
    let end = if is_word(term.chars().last()) { r"\b" } else { "" };
    format!("{}{}{}", start, regex::escape(term), end)
}

fn compile(pattern: &str) -> Result<Regex, XlsxDocError> {
    Regex::new(pattern).map_err(|e| XlsxDocError::Config(format!("Invalid pattern: {}", e)))
}

/// テーブルを `列名: 値` の行リストに変換する
///
/// 空の値は `N/A` になり、行と行の間には `---` が入ります。
pub fn table_to_list(table: &ExtractedTable) -> String {
    let mut lines = Vec::new();
    let last = table.row_count().saturating_sub(1);
    for (index, record) in table.records().enumerate() {
        for (column, value) in record {
            let value = value.trim();
            let value = if value.is_empty() { MISSING_VALUE } else { value };
            lines.push(format!("{}: {}", column.trim(), value));
        }
        if index < last {
            lines.push("\n---\n".to_string());
        }
    }
    lines.join("\n")
}
