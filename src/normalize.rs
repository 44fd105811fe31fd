use crate::types::{DocumentRecord, DocumentStatus};
use serde_json::{Map, Value};

const ID_KEYS: &[&str] = &["id"];
const FILE_NAME_KEYS: &[&str] = &[
    "fileName",
    "file_name",
    "nomeArquivo",
    "nome_arquivo",
    "titulo",
    "title",
];
const STATUS_CODE_KEYS: &[&str] = &["statusCode", "status_code", "status"];
const STATUS_LABEL_KEYS: &[&str] = &["statusLabel", "status_label"];
const RAW_STATUS_KEYS: &[&str] = &["status"];
const CATEGORY_NAME_KEYS: &[&str] = &[
    "category_name",
    "categoryName",
    "categoria_nome",
    "categoriaNome",
];
/// Keys that may hold the category as a nested object, a numeric id or plain text.
const CATEGORY_KEYS: &[&str] = &["category", "categoria"];
const NESTED_CATEGORY_NAME_KEYS: &[&str] = &["name", "nome"];
const ANALYSIS_KEYS: &[&str] = &[
    "analysisResult",
    "analysis_result",
    "analise",
    "resultado_analise",
    "resultado",
];
const ERROR_KEYS: &[&str] = &["errorMessage", "error_message", "erro"];
const SUBMITTED_AT_KEYS: &[&str] = &[
    "submittedAt",
    "submitted_at",
    "enviadoEm",
    "data_envio",
    "uploaded_at",
    "created_at",
    "enviado_em",
];
const ISSUED_AT_KEYS: &[&str] = &["issuedAt", "issued_at", "dataEmissao", "data_emissao"];
const CNPJ_KEYS: &[&str] = &["cnpj"];
const SUPPLIER_KEYS: &[&str] = &["supplier", "fornecedor"];
const INVOICE_NUMBER_KEYS: &[&str] = &[
    "invoiceNumber",
    "invoice_number",
    "numeroNota",
    "numero_nota",
];
const AMOUNT_KEYS: &[&str] = &["amount", "valor"];

pub const UNCATEGORIZED: &str = "Uncategorized";

/// Raw status text (backend codes, native codes, pt-BR labels) -> status.
const STATUS_TABLE: &[(&str, DocumentStatus)] = &[
    ("queued", DocumentStatus::Pending),
    ("done", DocumentStatus::Completed),
    ("error", DocumentStatus::Failed),
    ("pending", DocumentStatus::Pending),
    ("processing", DocumentStatus::Processing),
    ("completed", DocumentStatus::Completed),
    ("failed", DocumentStatus::Failed),
    ("pendente", DocumentStatus::Pending),
    ("na fila", DocumentStatus::Pending),
    ("processando", DocumentStatus::Processing),
    ("concluido", DocumentStatus::Completed),
    ("concluído", DocumentStatus::Completed),
    ("falhou", DocumentStatus::Failed),
    ("erro", DocumentStatus::Failed),
];

/// Text form of a scalar. Objects, arrays and null have none.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First candidate key whose value has non-blank text.
fn first_text(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .filter_map(scalar_text)
        .find(|text| !text.trim().is_empty())
}

fn text_field(record: &Map<String, Value>, keys: &[&str]) -> String {
    first_text(record, keys).unwrap_or_default()
}

fn trimmed_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_text(record, keys).map(|s| s.trim().to_string())
}

/// Map raw status text onto the closed vocabulary; unknown text maps to `None`.
pub fn parse_status(raw: &str) -> Option<DocumentStatus> {
    let key = raw.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    STATUS_TABLE
        .iter()
        .find(|(text, _)| *text == key)
        .map(|(_, status)| *status)
}

/// Permissive number parsing: finite JSON numbers, or numeric strings where a lone
/// comma (no dot present) is the decimal separator.
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            let normalized = if s.contains(',') && !s.contains('.') {
                s.replacen(',', ".", 1)
            } else {
                s.to_string()
            };
            normalized.parse::<f64>().ok().filter(|f| f.is_finite())
        }
        _ => None,
    }
}

fn first_amount(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(parse_amount)
}

fn parse_id(record: &Map<String, Value>) -> Option<i64> {
    ID_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        })
}

/// Category display name: explicit name field, nested object name, numeric id,
/// raw text, then the fallback.
fn resolve_category(record: &Map<String, Value>) -> String {
    if let Some(name) = trimmed_field(record, CATEGORY_NAME_KEYS) {
        return name;
    }
    let nested = CATEGORY_KEYS
        .iter()
        .filter_map(|key| record.get(*key))
        .filter_map(|v| v.as_object())
        .find_map(|obj| trimmed_field(obj, NESTED_CATEGORY_NAME_KEYS));
    if let Some(name) = nested {
        return name;
    }
    for key in CATEGORY_KEYS {
        if let Some(Value::Number(n)) = record.get(*key) {
            return format!("Category #{}", n);
        }
    }
    for key in CATEGORY_KEYS {
        if let Some(Value::String(s)) = record.get(*key) {
            if !s.trim().is_empty() {
                return s.clone();
            }
        }
    }
    UNCATEGORIZED.to_string()
}

/// Turn one loosely-typed API record into a [`DocumentRecord`]. Never fails;
/// anything that is not a JSON object yields an all-default record.
pub fn normalize_document(raw: &Value) -> DocumentRecord {
    let empty = Map::new();
    let record = raw.as_object().unwrap_or(&empty);

    let status_code = first_text(record, STATUS_CODE_KEYS)
        .as_deref()
        .and_then(parse_status);
    let status_label = trimmed_field(record, STATUS_LABEL_KEYS)
        .or_else(|| status_code.map(|s| s.default_label().to_string()))
        .or_else(|| trimmed_field(record, RAW_STATUS_KEYS))
        .unwrap_or_default();

    DocumentRecord {
        id: parse_id(record),
        file_name: text_field(record, FILE_NAME_KEYS),
        status_code,
        status_label,
        category: resolve_category(record),
        analysis_result: text_field(record, ANALYSIS_KEYS),
        error_message: text_field(record, ERROR_KEYS),
        submitted_at: trimmed_field(record, SUBMITTED_AT_KEYS),
        issued_at: trimmed_field(record, ISSUED_AT_KEYS),
        cnpj: text_field(record, CNPJ_KEYS),
        supplier: text_field(record, SUPPLIER_KEYS),
        invoice_number: text_field(record, INVOICE_NUMBER_KEYS),
        amount: first_amount(record, AMOUNT_KEYS),
    }
}

/// Element-wise [`normalize_document`]; non-array input yields no records.
pub fn normalize_documents(raw: &Value) -> Vec<DocumentRecord> {
    raw.as_array()
        .map(|items| items.iter().map(normalize_document).collect())
        .unwrap_or_default()
}

/// List endpoints answer either with a bare array or with `{ "results": [...] }`.
pub fn document_list_payload(body: &Value) -> &Value {
    match body {
        Value::Array(_) => body,
        Value::Object(obj) => obj.get("results").unwrap_or(&Value::Null),
        _ => &Value::Null,
    }
}
