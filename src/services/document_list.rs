//! Client-side filtering, sorting and paging of the document list.

use crate::error::ApiError;
use crate::models::{DocumentFilters, FilterField, PageSize, SortKey};
use crate::normalize::parse_amount;
use crate::types::DocumentRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::future::Future;

/// Anything that can fetch the document list for a filter set.
pub trait DocumentLister {
    fn list_documents(
        &self,
        filters: &DocumentFilters,
    ) -> impl Future<Output = Result<Vec<DocumentRecord>, ApiError>> + Send;
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Parse the date/time shapes the API and the date filters use. Offsets are
/// folded into UTC; zone-less values are taken as-is.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Sort key for dates: milliseconds since epoch, 0 when missing or unparseable.
fn date_millis(doc: &DocumentRecord) -> i64 {
    doc.reference_date()
        .and_then(parse_timestamp)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or(0)
}

/// Case- and accent-insensitive key for supplier ordering.
/// Only Latin-1 accents are folded; other scripts keep codepoint order.
fn collation_key(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

fn compare_suppliers(a: &DocumentRecord, b: &DocumentRecord) -> Ordering {
    collation_key(&a.supplier)
        .cmp(&collation_key(&b.supplier))
        .then_with(|| a.supplier.to_lowercase().cmp(&b.supplier.to_lowercase()))
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn parse_bound(raw: &str) -> Option<f64> {
    parse_amount(&Value::String(raw.to_string()))
}

/// Active filter bounds, parsed once per pass. Inputs that do not parse are ignored.
struct Criteria<'a> {
    filters: &'a DocumentFilters,
    date_from: Option<NaiveDateTime>,
    date_to: Option<NaiveDateTime>,
    amount_min: Option<f64>,
    amount_max: Option<f64>,
}

impl<'a> Criteria<'a> {
    fn new(filters: &'a DocumentFilters) -> Self {
        let date_to = parse_timestamp(&filters.date_to)
            .and_then(|dt| dt.date().and_hms_milli_opt(23, 59, 59, 999));
        Self {
            filters,
            date_from: parse_timestamp(&filters.date_from),
            date_to,
            amount_min: parse_bound(&filters.amount_min),
            amount_max: parse_bound(&filters.amount_max),
        }
    }

    fn matches(&self, doc: &DocumentRecord) -> bool {
        let text_checks = [
            (FilterField::Cnpj, doc.cnpj.as_str()),
            (FilterField::Supplier, doc.supplier.as_str()),
            (FilterField::InvoiceNumber, doc.invoice_number.as_str()),
        ];
        for (field, value) in text_checks {
            let query = self.filters.get(field);
            if !query.is_empty() && !contains_ignore_case(value, query) {
                return false;
            }
        }

        if self.amount_min.is_some() || self.amount_max.is_some() {
            let Some(amount) = doc.amount else {
                return false;
            };
            if self.amount_min.is_some_and(|min| amount < min) {
                return false;
            }
            if self.amount_max.is_some_and(|max| amount > max) {
                return false;
            }
        }

        if self.date_from.is_some() || self.date_to.is_some() {
            let Some(date) = doc.reference_date().and_then(parse_timestamp) else {
                return false;
            };
            if self.date_from.is_some_and(|start| date < start) {
                return false;
            }
            if self.date_to.is_some_and(|end| date > end) {
                return false;
            }
        }

        true
    }
}

/// Records matching every active filter, in their original order.
pub fn filter_documents<'a>(
    documents: &'a [DocumentRecord],
    filters: &DocumentFilters,
) -> Vec<&'a DocumentRecord> {
    let criteria = Criteria::new(filters);
    documents.iter().filter(|d| criteria.matches(d)).collect()
}

/// Stable sort by the given key.
pub fn sort_documents(docs: &mut [&DocumentRecord], key: SortKey) {
    match key {
        SortKey::DateAsc => docs.sort_by_key(|d| date_millis(d)),
        SortKey::DateDesc => docs.sort_by(|a, b| date_millis(b).cmp(&date_millis(a))),
        SortKey::AmountAsc => docs.sort_by(|a, b| {
            a.amount
                .unwrap_or(0.0)
                .total_cmp(&b.amount.unwrap_or(0.0))
        }),
        SortKey::AmountDesc => docs.sort_by(|a, b| {
            b.amount
                .unwrap_or(0.0)
                .total_cmp(&a.amount.unwrap_or(0.0))
        }),
        SortKey::SupplierAsc => docs.sort_by(|a, b| compare_suppliers(a, b)),
        SortKey::SupplierDesc => docs.sort_by(|a, b| compare_suppliers(b, a)),
    }
}

pub fn total_pages(result_count: usize, page_size: PageSize) -> usize {
    result_count.div_ceil(page_size.get()).max(1)
}

/// The visible slice of the list plus the numbers needed to render paging.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<DocumentRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_results: usize,
    pub page_size: usize,
}

impl ListPage {
    pub fn summary(&self) -> String {
        format!(
            "{} result{} · Page {} of {}",
            self.total_results,
            if self.total_results == 1 { "" } else { "s" },
            self.page,
            self.total_pages
        )
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// List state: fetched records plus the applied (debounced) filters, sort and page.
///
/// The current page is kept inside `[1, total_pages]` after every change.
#[derive(Debug, Clone)]
pub struct DocumentListController {
    documents: Vec<DocumentRecord>,
    filters: DocumentFilters,
    sort: SortKey,
    page_size: PageSize,
    page: usize,
}

impl Default for DocumentListController {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            filters: DocumentFilters::default(),
            sort: SortKey::default(),
            page_size: PageSize::default(),
            page: 1,
        }
    }
}

impl DocumentListController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    pub fn filters(&self) -> &DocumentFilters {
        &self.filters
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// Replace the fetched records (a new fetch result replaces the old one wholesale).
    pub fn set_documents(&mut self, documents: Vec<DocumentRecord>) {
        self.documents = documents;
        self.clamp_page();
    }

    /// Apply a debounced filter set. Returns true when it differs from the applied one,
    /// in which case the page goes back to 1 and the caller should refetch.
    pub fn apply_filters(&mut self, filters: DocumentFilters) -> bool {
        if filters == self.filters {
            return false;
        }
        self.filters = filters;
        self.page = 1;
        self.clamp_page();
        true
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
        self.clamp_page();
    }

    /// Go to `page`, clamped into the valid range. Returns the page actually selected.
    pub fn set_page(&mut self, page: usize) -> usize {
        self.page = page;
        self.clamp_page();
        self.page
    }

    pub fn next_page(&mut self) -> usize {
        self.set_page(self.page.saturating_add(1))
    }

    pub fn previous_page(&mut self) -> usize {
        self.set_page(self.page.saturating_sub(1))
    }

    pub fn result_count(&self) -> usize {
        filter_documents(&self.documents, &self.filters).len()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.result_count(), self.page_size)
    }

    fn clamp_page(&mut self) {
        let last = self.total_pages();
        self.page = self.page.clamp(1, last);
    }

    /// Filter, sort and slice the current page.
    pub fn view(&self) -> ListPage {
        let mut visible = filter_documents(&self.documents, &self.filters);
        sort_documents(&mut visible, self.sort);
        let total_results = visible.len();
        let total_pages = total_pages(total_results, self.page_size);
        let page = self.page.clamp(1, total_pages);
        let size = self.page_size.get();
        let items = visible
            .into_iter()
            .skip((page - 1) * size)
            .take(size)
            .cloned()
            .collect();
        ListPage {
            items,
            page,
            total_pages,
            total_results,
            page_size: size,
        }
    }
}
