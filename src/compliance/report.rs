//! Compliance report over the classification set
//!
//! Summarizes which tables hold personal data, in which categories, under
//! which legal basis and retention period. Rendered as JSON by serde or as
//! a standalone HTML page.

use crate::audit::SPECIAL_CATEGORY_MARKER;
use crate::privacy::cache::ClassificationMap;
use crate::privacy::types::{FieldClassification, PiiCategory};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// One personal-data column
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReport {
    pub schema_name: String,
    pub column_name: String,
    pub category: PiiCategory,
    pub is_sensitive: bool,
    pub legal_basis_tag: Option<String>,
    pub purpose: Option<String>,
    pub retention_period: Option<String>,
}

impl From<&FieldClassification> for FieldReport {
    fn from(c: &FieldClassification) -> Self {
        Self {
            schema_name: c.schema_name.clone(),
            column_name: c.column_name.clone(),
            category: c.pii_category,
            is_sensitive: c.is_sensitive,
            legal_basis_tag: c.legal_basis_tag.clone(),
            purpose: c.purpose.clone(),
            retention_period: c.retention_period.clone(),
        }
    }
}

/// Personal-data columns of one table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableReport {
    pub table_name: String,
    pub fields: Vec<FieldReport>,
}

/// Report over every classified column
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    /// Classified columns, including NONE
    pub total_fields: usize,
    pub pii_fields: usize,
    pub category_counts: BTreeMap<PiiCategory, usize>,
    /// Sensitive columns as `table.column`, sorted
    pub sensitive_fields: Vec<String>,
    pub tables: Vec<TableReport>,
}

impl ComplianceReport {
    pub fn build(classifications: &ClassificationMap) -> Self {
        let mut category_counts: BTreeMap<PiiCategory, usize> = BTreeMap::new();
        let mut tables: BTreeMap<&str, Vec<FieldReport>> = BTreeMap::new();
        let mut sensitive_fields = Vec::new();

        for classification in classifications.values() {
            *category_counts.entry(classification.pii_category).or_default() += 1;
            if !classification.is_pii() {
                continue;
            }
            if classification.is_sensitive {
                sensitive_fields.push(classification.lookup_key());
            }
            tables
                .entry(classification.table_name.as_str())
                .or_default()
                .push(FieldReport::from(classification));
        }

        sensitive_fields.sort();
        let tables: Vec<TableReport> = tables
            .into_iter()
            .map(|(table_name, mut fields)| {
                fields.sort_by(|a, b| a.column_name.cmp(&b.column_name));
                TableReport {
                    table_name: table_name.to_string(),
                    fields,
                }
            })
            .collect();
        let pii_fields = tables.iter().map(|t| t.fields.len()).sum();

        Self {
            generated_at: Utc::now(),
            total_fields: classifications.len(),
            pii_fields,
            category_counts,
            sensitive_fields,
            tables,
        }
    }

    /// Render a self-contained HTML page
    pub fn render_html(&self) -> String {
        let mut html = String::with_capacity(4096);
        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        html.push_str("<title>Personal Data Inventory</title>\n<style>\n");
        html.push_str("body{font-family:sans-serif;margin:2rem}table{border-collapse:collapse;margin-bottom:2rem}");
        html.push_str("th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}");
        html.push_str("tr.special-category{background:#fde2e2}.marker{color:#b00020;font-weight:bold}\n");
        html.push_str("</style>\n</head>\n<body>\n<h1>Personal Data Inventory</h1>\n");

        let _ = writeln!(
            html,
            "<p>Generated {}. {} of {} classified fields hold personal data; {} are special category.</p>",
            self.generated_at.to_rfc3339(),
            self.pii_fields,
            self.total_fields,
            self.sensitive_fields.len()
        );

        html.push_str("<h2>Categories</h2>\n<ul>\n");
        for (category, count) in &self.category_counts {
            let _ = writeln!(html, "<li>{}: {}</li>", category, count);
        }
        html.push_str("</ul>\n");

        for table in &self.tables {
            let _ = writeln!(html, "<h2>{}</h2>", escape_html(&table.table_name));
            html.push_str("<table>\n<tr><th>Field</th><th>Category</th><th>Legal basis</th><th>Purpose</th><th>Retention</th></tr>\n");
            for field in &table.fields {
                let (class, marker) = if field.is_sensitive {
                    (
                        " class=\"special-category\"",
                        format!(" <span class=\"marker\">{}</span>", SPECIAL_CATEGORY_MARKER),
                    )
                } else {
                    ("", String::new())
                };
                let _ = writeln!(
                    html,
                    "<tr{}><td>{}{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                    class,
                    escape_html(&field.column_name),
                    marker,
                    field.category,
                    escape_html(field.legal_basis_tag.as_deref().unwrap_or("-")),
                    escape_html(field.purpose.as_deref().unwrap_or("-")),
                    escape_html(field.retention_period.as_deref().unwrap_or("-")),
                );
            }
            html.push_str("</table>\n");
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
