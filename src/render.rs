//! Plain-text views for the terminal.

use crate::models::DocumentFilters;
use crate::services::detail_poller::{status_notice, DetailState};
use crate::services::document_list::{parse_timestamp, ListPage};
use crate::types::DocumentRecord;
use crate::upload::CATEGORIES;
use std::fmt::Write as _;

const MISSING: &str = "-";

/// `R$ 1.234,56`
pub fn format_brl(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}R$ {},{}", sign, grouped, frac_part)
}

pub fn format_amount(amount: Option<f64>) -> String {
    amount.map(format_brl).unwrap_or_else(|| MISSING.to_string())
}

/// `dd/mm/yyyy HH:MM:SS`; unparseable input is shown as received.
pub fn format_timestamp(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => MISSING.to_string(),
        Some(s) => parse_timestamp(s)
            .map(|dt| dt.format("%d/%m/%Y %H:%M:%S").to_string())
            .unwrap_or_else(|| s.to_string()),
    }
}

fn or_missing(s: &str) -> &str {
    if s.trim().is_empty() {
        MISSING
    } else {
        s
    }
}

fn id_text(doc: &DocumentRecord) -> String {
    doc.id
        .map(|id| format!("#{}", id))
        .unwrap_or_else(|| MISSING.to_string())
}

/// One row of the list view.
pub fn document_line(doc: &DocumentRecord) -> String {
    format!(
        "{:>6}  {:<19}  {:<28}  {:>16}  {:<12}  {}",
        id_text(doc),
        format_timestamp(doc.reference_date()),
        truncate(or_missing(&doc.supplier), 28),
        format_amount(doc.amount),
        or_missing(&doc.status_label),
        or_missing(&doc.file_name),
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

pub fn render_list(page: &ListPage, filters: &DocumentFilters) -> String {
    let mut out = String::new();
    let tags = filters.tags();
    if !tags.is_empty() {
        let joined: Vec<String> = tags.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "Filters: {}", joined.join(" | "));
    }
    if page.items.is_empty() {
        let _ = writeln!(out, "No documents found.");
    }
    for doc in &page.items {
        let _ = writeln!(out, "{}", document_line(doc));
    }
    let _ = write!(out, "{}", page.summary());
    out
}

pub fn render_document(doc: &DocumentRecord) -> String {
    let rows = [
        ("Document", id_text(doc)),
        ("File", or_missing(&doc.file_name).to_string()),
        ("Status", or_missing(&doc.status_label).to_string()),
        ("Category", or_missing(&doc.category).to_string()),
        ("Submitted", format_timestamp(doc.submitted_at.as_deref())),
        ("Issued", format_timestamp(doc.issued_at.as_deref())),
        ("CNPJ", or_missing(&doc.cnpj).to_string()),
        ("Supplier", or_missing(&doc.supplier).to_string()),
        ("Invoice no.", or_missing(&doc.invoice_number).to_string()),
        ("Amount", format_amount(doc.amount)),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<12} {}", format!("{}:", label), value);
    }
    if let Some(notice) = status_notice(doc) {
        let _ = write!(out, "\n{}", notice);
    }
    out.trim_end().to_string()
}

pub fn render_detail(state: &DetailState) -> String {
    let mut out = String::new();
    if state.loading && state.document.is_none() {
        out.push_str("Loading...");
    }
    if let Some(doc) = &state.document {
        out.push_str(&render_document(doc));
    }
    if let Some(error) = &state.error {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(error);
    }
    out
}

pub fn render_categories() -> String {
    CATEGORIES
        .iter()
        .map(|(slug, label)| format!("{:<28} {}", slug, label))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
