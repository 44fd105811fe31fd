use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One editable filter input of the document list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    Cnpj,
    Supplier,
    DateFrom,
    DateTo,
    AmountMin,
    AmountMax,
    InvoiceNumber,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        FilterField::Cnpj,
        FilterField::Supplier,
        FilterField::DateFrom,
        FilterField::DateTo,
        FilterField::AmountMin,
        FilterField::AmountMax,
        FilterField::InvoiceNumber,
    ];

    /// Query parameter understood by the documents endpoint.
    pub fn query_key(self) -> &'static str {
        match self {
            FilterField::Cnpj => "cnpj",
            FilterField::Supplier => "fornecedor",
            FilterField::DateFrom => "data_inicio",
            FilterField::DateTo => "data_fim",
            FilterField::AmountMin => "valor_min",
            FilterField::AmountMax => "valor_max",
            FilterField::InvoiceNumber => "numero_nota",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FilterField::Cnpj => "CNPJ",
            FilterField::Supplier => "Supplier",
            FilterField::DateFrom => "Date (from)",
            FilterField::DateTo => "Date (to)",
            FilterField::AmountMin => "Amount (min)",
            FilterField::AmountMax => "Amount (max)",
            FilterField::InvoiceNumber => "Invoice no.",
        }
    }

    fn names(self) -> &'static [&'static str] {
        match self {
            FilterField::Cnpj => &["cnpj"],
            FilterField::Supplier => &["supplier", "fornecedor"],
            FilterField::DateFrom => &["from", "date_from", "data_inicio"],
            FilterField::DateTo => &["to", "date_to", "data_fim"],
            FilterField::AmountMin => &["min", "amount_min", "valor_min"],
            FilterField::AmountMax => &["max", "amount_max", "valor_max"],
            FilterField::InvoiceNumber => &["invoice", "invoice_number", "numero_nota"],
        }
    }
}

impl FromStr for FilterField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        FilterField::ALL
            .into_iter()
            .find(|f| f.names().contains(&key.as_str()))
            .ok_or_else(|| format!("Unknown filter '{}'", s))
    }
}

/// Raw filter inputs as typed by the user. An empty value means the filter is off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFilters {
    pub cnpj: String,
    pub supplier: String,
    /// `YYYY-MM-DD`, inclusive.
    pub date_from: String,
    /// `YYYY-MM-DD`, inclusive through the end of that day.
    pub date_to: String,
    pub amount_min: String,
    pub amount_max: String,
    pub invoice_number: String,
}

impl DocumentFilters {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Cnpj => &self.cnpj,
            FilterField::Supplier => &self.supplier,
            FilterField::DateFrom => &self.date_from,
            FilterField::DateTo => &self.date_to,
            FilterField::AmountMin => &self.amount_min,
            FilterField::AmountMax => &self.amount_max,
            FilterField::InvoiceNumber => &self.invoice_number,
        }
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let slot = match field {
            FilterField::Cnpj => &mut self.cnpj,
            FilterField::Supplier => &mut self.supplier,
            FilterField::DateFrom => &mut self.date_from,
            FilterField::DateTo => &mut self.date_to,
            FilterField::AmountMin => &mut self.amount_min,
            FilterField::AmountMax => &mut self.amount_max,
            FilterField::InvoiceNumber => &mut self.invoice_number,
        };
        *slot = value.into();
    }

    pub fn is_active(&self, field: FilterField) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        FilterField::ALL.iter().all(|f| !self.is_active(*f))
    }

    /// Non-empty filters as server-side query parameters.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        FilterField::ALL
            .iter()
            .filter(|f| self.is_active(**f))
            .map(|f| (f.query_key(), self.get(*f).to_string()))
            .collect()
    }

    /// One removable tag per active filter.
    pub fn tags(&self) -> Vec<FilterTag> {
        FilterField::ALL
            .iter()
            .filter(|f| self.is_active(**f))
            .map(|f| FilterTag {
                field: *f,
                label: f.label(),
                value: self.get(*f).to_string(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterTag {
    pub field: FilterField,
    pub label: &'static str,
    pub value: String,
}

impl fmt::Display for FilterTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    AmountDesc,
    AmountAsc,
    SupplierAsc,
    SupplierDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::DateDesc,
        SortKey::DateAsc,
        SortKey::AmountDesc,
        SortKey::AmountAsc,
        SortKey::SupplierAsc,
        SortKey::SupplierDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::DateDesc => "date_desc",
            SortKey::DateAsc => "date_asc",
            SortKey::AmountDesc => "amount_desc",
            SortKey::AmountAsc => "amount_asc",
            SortKey::SupplierAsc => "supplier_asc",
            SortKey::SupplierDesc => "supplier_desc",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SortKey::DateDesc => "newest first",
            SortKey::DateAsc => "oldest first",
            SortKey::AmountDesc => "highest amount",
            SortKey::AmountAsc => "lowest amount",
            SortKey::SupplierAsc => "supplier A-Z",
            SortKey::SupplierDesc => "supplier Z-A",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace('-', "_");
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_str() == key)
            .ok_or_else(|| {
                let options: Vec<&str> = SortKey::ALL.iter().map(|k| k.as_str()).collect();
                format!("Unknown sort key '{}' (expected one of: {})", s, options.join(", "))
            })
    }
}

/// Allowed page sizes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    Ten,
    Twenty,
    Fifty,
}

impl PageSize {
    pub fn get(self) -> usize {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
        }
    }
}

impl TryFrom<usize> for PageSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            10 => Ok(PageSize::Ten),
            20 => Ok(PageSize::Twenty),
            50 => Ok(PageSize::Fifty),
            other => Err(format!("Page size must be 10, 20 or 50 (got {})", other)),
        }
    }
}

impl FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: usize = s
            .trim()
            .parse()
            .map_err(|_| format!("Invalid page size '{}'", s))?;
        PageSize::try_from(n)
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_params_skip_empty_filters() {
        let mut filters = DocumentFilters::default();
        assert!(filters.query_params().is_empty());
        filters.set(FilterField::Supplier, "acme");
        filters.set(FilterField::DateTo, "2024-05-31");
        assert_eq!(
            filters.query_params(),
            vec![
                ("fornecedor", "acme".to_string()),
                ("data_fim", "2024-05-31".to_string())
            ]
        );
    }

    #[test]
    fn tags_follow_active_filters() {
        let mut filters = DocumentFilters::default();
        filters.set(FilterField::Cnpj, "12.345");
        let tags = filters.tags();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].to_string(), "CNPJ: 12.345");
        filters.set(FilterField::Cnpj, "");
        assert!(filters.is_empty());
    }

    #[test]
    fn parse_field_names() {
        assert_eq!("fornecedor".parse::<FilterField>(), Ok(FilterField::Supplier));
        assert_eq!("amount-min".parse::<FilterField>(), Ok(FilterField::AmountMin));
        assert!("colour".parse::<FilterField>().is_err());
    }

    #[test]
    fn parse_sort_and_page_size() {
        assert_eq!("supplier-desc".parse::<SortKey>(), Ok(SortKey::SupplierDesc));
        assert!("random".parse::<SortKey>().is_err());
        assert_eq!("20".parse::<PageSize>(), Ok(PageSize::Twenty));
        assert!("15".parse::<PageSize>().is_err());
        assert_eq!(PageSize::default().get(), 10);
        assert_eq!(SortKey::default(), SortKey::DateDesc);
    }
}
