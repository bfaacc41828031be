//! Template Module
//!
//! 変換結果を5部構成（A. 出典 / B. 概要 / C. 要点 / D. 詳細 / E. 本文）の
//! Markdown文書に組み立てるモジュール。

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use crate::highlight::EntityHighlighter;

/// テンプレートの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum TemplateKind {
    /// スプレッドシート・一覧表
    ExcelList,
    /// 一般的な文書
    WordDocument,
    /// 手順書
    Process,
    /// 規程・ポリシー
    Policy,
}

/// 手順の1ステップ
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProcessStep {
    /// ステップ番号
    pub number: u32,
    /// ステップの内容
    pub content: String,
    /// 箇条書きの補足項目
    #[serde(default)]
    pub sub_items: Vec<String>,
}

/// テンプレートの各セクションの内容
///
/// 空のセクションは出力されません。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TemplateSections {
    /// 出典URL
    pub source_url: Option<String>,
    /// 概要
    pub summary: String,
    /// 主要指標（名前, 値）
    pub metrics: Vec<(String, String)>,
    /// 要点
    pub key_points: Vec<String>,
    /// 分析・所見
    pub insights: String,
    /// 詳細な要約
    pub deep_summary: String,
    /// 手順
    pub steps: Vec<ProcessStep>,
    /// 施行日
    pub effective_date: Option<String>,
    /// 規程の詳細
    pub policy_details: String,
    /// 本文（変換結果）
    pub content: String,
}

/// テンプレートを描画する
///
/// 見出しは種類ごとに次のとおりです。
///
/// | 種類 | C | D | E |
/// |------|---|---|---|
/// | `ExcelList` | Key Metrics | Insights | Structured Output |
/// | `WordDocument` | Key Points | Deep Summary | Readability Optimized |
/// | `Process` | Key Points | Process Details | Readability Optimized |
/// | `Policy` | Key Points | Policy Details | Readability Optimized |
///
/// # 引数
///
/// * `kind` - テンプレートの種類
/// * `sections` - 各セクションの内容
/// * `highlighter` - 本文の強調表示に使用する強調器
pub fn render_template(
    kind: TemplateKind,
    sections: &TemplateSections,
    highlighter: &EntityHighlighter,
) -> String {
    let mut out: Vec<String> = Vec::new();

    if let Some(url) = sections.source_url.as_deref().filter(|u| !u.trim().is_empty()) {
        push_section(&mut out, "A. Source", &format!("**Source:** {}", url.trim()));
    }

    let mut summary = Vec::new();
    if kind == TemplateKind::Policy {
        if let Some(date) = sections.effective_date.as_deref().filter(|d| !d.trim().is_empty()) {
            summary.push(format!("**Effective:** {}", date.trim()));
        }
    }
    if !sections.summary.trim().is_empty() {
        summary.push(highlighter.highlight(&sections.summary));
    }
    if !summary.is_empty() {
        push_section(&mut out, "B. Summary Overview", &summary.join("\n\n"));
    }

    match kind {
        TemplateKind::ExcelList => {
            if !sections.metrics.is_empty() {
                let metrics: Vec<String> = sections
                    .metrics
                    .iter()
                    .map(|(name, value)| format!("- **{}:** {}", name, value))
                    .collect();
                push_section(&mut out, "C. Key Metrics", &metrics.join("\n"));
            }
            push_text(&mut out, "D. Insights", &sections.insights, highlighter);
            push_text(&mut out, "E. Structured Output", &sections.content, highlighter);
        }
        TemplateKind::WordDocument => {
            push_points(&mut out, &sections.key_points, highlighter);
            push_text(&mut out, "D. Deep Summary", &sections.deep_summary, highlighter);
            push_text(&mut out, "E. Readability Optimized", &sections.content, highlighter);
        }
        TemplateKind::Process => {
            push_points(&mut out, &sections.key_points, highlighter);
            if !sections.steps.is_empty() {
                let steps: Vec<String> = sections
                    .steps
                    .iter()
                    .map(|step| render_step(step, highlighter))
                    .collect();
                push_section(&mut out, "D. Process Details", &steps.join("\n\n"));
            }
            push_text(&mut out, "E. Readability Optimized", &sections.content, highlighter);
        }
        TemplateKind::Policy => {
            push_points(&mut out, &sections.key_points, highlighter);
            push_text(&mut out, "D. Policy Details", &sections.policy_details, highlighter);
            push_text(&mut out, "E. Readability Optimized", &sections.content, highlighter);
        }
    }

    out.join("\n")
}

fn push_section(out: &mut Vec<String>, title: &str, body: &str) {
    out.push(format!("## {}\n\n{}\n", title, body.trim_end()));
}

fn push_text(out: &mut Vec<String>, title: &str, text: &str, highlighter: &EntityHighlighter) {
    if !text.trim().is_empty() {
        push_section(out, title, &highlighter.highlight(text));
    }
}

fn push_points(out: &mut Vec<String>, points: &[String], highlighter: &EntityHighlighter) {
    let points: Vec<String> = points
        .iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| format!("- {}", highlighter.highlight(p.trim())))
        .collect();
    if !points.is_empty() {
        push_section(out, "C. Key Points", &points.join("\n"));
    }
}

fn render_step(step: &ProcessStep, highlighter: &EntityHighlighter) -> String {
    let mut lines = vec![format!(
        "**Step {}:** {}",
        step.number,
        highlighter.highlight(step.content.trim())
    )];
    lines.extend(
        step.sub_items
            .iter()
            .map(|item| format!("- {}", highlighter.highlight(item.trim()))),
    );
    lines.join("\n")
}

const EXCEL_LIST_TEMPLATE: &str = "## A. Source

**Source:** <SOURCE_URL>

---

## B. Summary Overview

<SUMMARY_CONTENT>

---

## C. Key Metrics

<KEY_METRICS>

---

## D. Insights

<INSIGHTS_CONTENT>

---

## E. Structured Output

<STRUCTURED_CONTENT>
";

const WORD_DOCUMENT_TEMPLATE: &str = "## A. Source

**Source:** <SOURCE_URL>

---

## B. Summary Overview

<SUMMARY_CONTENT>

---

## C. Key Points

<KEY_POINTS>

---

## D. Deep Summary

<DEEP_SUMMARY_CONTENT>

---

## E. Readability Optimized

<MAIN_CONTENT>
";

const PROCESS_TEMPLATE: &str = "## A. Source

**Source:** <SOURCE_URL>

---

## B. Summary Overview

<SUMMARY_CONTENT>

---

## C. Key Points

<KEY_POINTS>

---

## D. Process Details

<PROCESS_STEPS>

---

## E. Readability Optimized

<MAIN_CONTENT>
";

const POLICY_TEMPLATE: &str = "## A. Source

**Source:** <SOURCE_URL>

---

## B. Summary Overview

**Effective:** <EFFECTIVE_DATE>

<SUMMARY_CONTENT>

---

## C. Key Points

<KEY_POINTS>

---

## D. Policy Details

<POLICY_DETAILS>

---

## E. Readability Optimized

<MAIN_CONTENT>
";

/// `<VARIABLE>` 形式のプレースホルダーを含む定義済みテンプレート
pub fn predefined_template(kind: TemplateKind) -> &'static str {
    match kind {
        TemplateKind::ExcelList => EXCEL_LIST_TEMPLATE,
        TemplateKind::WordDocument => WORD_DOCUMENT_TEMPLATE,
        TemplateKind::Process => PROCESS_TEMPLATE,
        TemplateKind::Policy => POLICY_TEMPLATE,
    }
}

/// テンプレートのプレースホルダーに値を埋め込む
///
/// 変数名は大文字に変換して `<NAME>` と照合されます。
/// 対応する値がないプレースホルダーはそのまま残ります。
///
/// # 使用例
///
/// ```rust
/// use std::collections::BTreeMap;
///
/// let mut vars = BTreeMap::new();
/// vars.insert("source_url".to_string(), "https://example.com/a.xlsx".to_string());
/// let out = xlsxdoc::inject_variables("**Source:** <SOURCE_URL> <OTHER>", &vars);
/// assert_eq!(out, "**Source:** https://example.com/a.xlsx <OTHER>");
/// ```
pub fn inject_variables(template: &str, variables: &BTreeMap<String, String>) -> String {
    variables
        .iter()
        .fold(template.to_string(), |acc, (name, value)| {
            acc.replace(&format!("<{}>", name.to_uppercase()), value)
        })
}

/// テンプレート中の変数名を取り出す（整列済み、重複なし）
pub fn extract_variables(template: &str) -> Vec<String> {
    let mut names = BTreeSet::new();
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        let after = &rest[open + 1..];
        match after.find(|c: char| !(c.is_ascii_uppercase() || c == '_')) {
            Some(end) if end > 0 && after[end..].starts_with('>') => {
                names.insert(after[..end].to_string());
                rest = &after[end + 1..];
            }
            _ => rest = after,
        }
    }
    names.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn highlighter() -> EntityHighlighter {
        EntityHighlighter::new().unwrap()
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let out = render_template(
            TemplateKind::ExcelList,
            &TemplateSections::default(),
            &highlighter(),
        );
        assert_eq!(out, "");

        let sections = TemplateSections {
            content: "| a |\n| --- |\n| 1 |".to_string(),
            ..TemplateSections::default()
        };
        let out = render_template(TemplateKind::ExcelList, &sections, &highlighter());
        assert_eq!(out, "## E. Structured Output\n\n| a |\n| --- |\n| 1 |\n");
    }

    #[test]
    fn test_excel_list_layout() {
        let sections = TemplateSections {
            source_url: Some("https://example.com/list.xlsx".to_string()),
            summary: "Contacts per region".to_string(),
            metrics: vec![("Rows".to_string(), "42".to_string())],
            insights: "North has the most".to_string(),
            content: "table".to_string(),
            ..TemplateSections::default()
        };
        let out = render_template(TemplateKind::ExcelList, &sections, &highlighter());
        let headings: Vec<&str> = out.lines().filter(|l| l.starts_with("## ")).collect();
        assert_eq!(
            headings,
            vec![
                "## A. Source",
                "## B. Summary Overview",
                "## C. Key Metrics",
                "## D. Insights",
                "## E. Structured Output",
            ]
        );
        assert!(out.contains("**Source:** https://example.com/list.xlsx"));
        assert!(out.contains("- **Rows:** 42"));
    }

    #[test]
    fn test_process_steps() {
        let sections = TemplateSections {
            steps: vec![
                ProcessStep {
                    number: 1,
                    content: "Manager reviews".to_string(),
                    sub_items: vec!["check totals".to_string()],
                },
                ProcessStep {
                    number: 2,
                    content: "Archive".to_string(),
                    sub_items: vec![],
                },
            ],
            ..TemplateSections::default()
        };
        let out = render_template(TemplateKind::Process, &sections, &highlighter());
        assert_eq!(
            out,
            "## D. Process Details\n\n**Step 1:** **Manager** reviews\n- check totals\n\n**Step 2:** Archive\n"
        );
    }

    #[test]
    fn test_policy_effective_date() {
        let sections = TemplateSections {
            effective_date: Some("2024-01-01".to_string()),
            policy_details: "Travel costs are refunded".to_string(),
            ..TemplateSections::default()
        };
        let out = render_template(TemplateKind::Policy, &sections, &highlighter());
        assert!(out.starts_with("## B. Summary Overview\n\n**Effective:** 2024-01-01\n"));
        assert!(out.contains("## D. Policy Details"));

        // 施行日はPolicy以外では出力しない
        let out = render_template(TemplateKind::WordDocument, &sections, &highlighter());
        assert!(!out.contains("Effective"));
    }

    #[test]
    fn test_sections_from_json() {
        let sections: TemplateSections = serde_json::from_str(
            r#"{"summary": "s", "metrics": [["Rows", "3"]], "steps": [{"number": 1, "content": "c"}]}"#,
        )
        .unwrap();
        assert_eq!(sections.summary, "s");
        assert_eq!(sections.metrics, vec![("Rows".to_string(), "3".to_string())]);
        assert!(sections.steps[0].sub_items.is_empty());
        assert!(sections.source_url.is_none());
    }

    #[test]
    fn test_predefined_templates_variables() {
        assert_eq!(
            extract_variables(predefined_template(TemplateKind::ExcelList)),
            vec![
                "INSIGHTS_CONTENT",
                "KEY_METRICS",
                "SOURCE_URL",
                "STRUCTURED_CONTENT",
                "SUMMARY_CONTENT",
            ]
        );
        assert!(extract_variables(predefined_template(TemplateKind::Policy))
            .contains(&"EFFECTIVE_DATE".to_string()));
        assert!(extract_variables(predefined_template(TemplateKind::Process))
            .contains(&"PROCESS_STEPS".to_string()));
    }

    #[test]
    fn test_extract_variables_ignores_non_placeholders() {
        assert_eq!(
            extract_variables("<A> <b> <A> <> <C_D> a < b > <E"),
            vec!["A", "C_D"]
        );
    }

    #[test]
    fn test_inject_variables_uppercases_names() {
        let mut vars = BTreeMap::new();
        vars.insert("main_content".to_string(), "body".to_string());
        let out = inject_variables(predefined_template(TemplateKind::WordDocument), &vars);
        assert!(out.contains("## E. Readability Optimized\n\nbody\n"));
        assert!(out.contains("<SOURCE_URL>"));
    }
}
