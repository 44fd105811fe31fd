use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Closed status vocabulary of an analysed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub const ALL: [DocumentStatus; 4] = [
        DocumentStatus::Pending,
        DocumentStatus::Processing,
        DocumentStatus::Completed,
        DocumentStatus::Failed,
    ];

    pub fn code(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Label shown when the API sends no label of its own.
    pub fn default_label(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "Pending",
            DocumentStatus::Processing => "Processing",
            DocumentStatus::Completed => "Completed",
            DocumentStatus::Failed => "Failed",
        }
    }

    /// Pending and processing documents are still being analysed.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Normalized client-side view of one submitted document.
///
/// Built fresh from every API response by [`crate::normalize`]; never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub id: Option<i64>,
    pub file_name: String,
    /// `None` serializes as `""` (status not recognised).
    #[serde(with = "status_code")]
    pub status_code: Option<DocumentStatus>,
    pub status_label: String,
    pub category: String,
    pub analysis_result: String,
    pub error_message: String,
    pub submitted_at: Option<String>,
    pub issued_at: Option<String>,
    pub cnpj: String,
    pub supplier: String,
    pub invoice_number: String,
    pub amount: Option<f64>,
}

impl DocumentRecord {
    /// Still pending/processing. Unknown statuses have nothing left to wait for.
    pub fn is_in_progress(&self) -> bool {
        self.status_code.map(|s| !s.is_terminal()).unwrap_or(false)
    }

    /// Issue date when known, else submission date.
    pub fn reference_date(&self) -> Option<&str> {
        self.issued_at
            .as_deref()
            .or(self.submitted_at.as_deref())
    }
}

mod status_code {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<DocumentStatus>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.map(DocumentStatus::code).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DocumentStatus>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(DocumentStatus::ALL
            .into_iter()
            .find(|s| s.code() == raw.trim()))
    }
}

/// Identifier returned by the analysis endpoint for a freshly uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document_id: String,
}
