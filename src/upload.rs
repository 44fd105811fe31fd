use crate::error::UploadError;
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

pub const MAX_UPLOAD_MB: u64 = 50;

/// Category slug sent to the analysis endpoint -> display label.
pub const CATEGORIES: &[(&str, &str)] = &[
    ("medicamentos", "Medicamentos"),
    ("distribuicao_medicamentos", "Distribuição de Medicamentos"),
    ("transplante_capilar", "Transplante Capilar"),
    ("tratamento_capilar", "Tratamento Capilar"),
    ("alimentos", "Alimentos"),
    ("cosmeticos", "Cosméticos"),
    ("veterinario", "Veterinário"),
    ("saneantes", "Saneantes"),
    ("estetica", "Estética"),
    ("dispositivos_medicos", "Dispositivos Médicos"),
    ("insumos_farmaceuticos", "Insumos Farmacêuticos"),
    ("outros", "Outros"),
];

pub fn category_label(slug: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|(s, _)| *s == slug)
        .map(|(_, label)| *label)
}

/// A file that passed local checks and is ready to be sent.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedUpload {
    pub file_name: String,
    pub category: &'static str,
    pub size: u64,
}

/// Category must be one of [`CATEGORIES`]; blank input means none was chosen.
pub fn validate_category(category: &str) -> Result<&'static str, UploadError> {
    let slug = category.trim();
    if slug.is_empty() {
        return Err(UploadError::MissingCategory);
    }
    CATEGORIES
        .iter()
        .map(|(s, _)| *s)
        .find(|s| *s == slug)
        .ok_or_else(|| UploadError::UnknownCategory(slug.to_string()))
}

/// Existence, size limit and `%PDF-` header.
pub fn validate_pdf(path: &Path) -> Result<u64, UploadError> {
    let metadata = fs::metadata(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            UploadError::FileNotFound
        } else {
            UploadError::Io(e)
        }
    })?;
    if !metadata.is_file() {
        return Err(UploadError::FileNotFound);
    }
    if metadata.len() > MAX_UPLOAD_MB * 1024 * 1024 {
        return Err(UploadError::TooLarge {
            max_mb: MAX_UPLOAD_MB,
        });
    }
    let mut f = fs::File::open(path)?;
    let mut header = [0u8; 5];
    let mut read = 0;
    while read < header.len() {
        let n = f.read(&mut header[read..])?;
        if n == 0 {
            break;
        }
        read += n;
    }
    if read < header.len() || &header != b"%PDF-" {
        return Err(UploadError::NotPdf);
    }
    Ok(metadata.len())
}

pub fn validate_upload(path: &Path, category: &str) -> Result<ValidatedUpload, UploadError> {
    let category = validate_category(category)?;
    let size = validate_pdf(path)?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();
    Ok(ValidatedUpload {
        file_name,
        category,
        size,
    })
}
