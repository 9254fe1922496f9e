//! Vérifications locales avant l'envoi d'un levé topographique

use std::path::Path;

use thiserror::Error;

/// Taille maximale acceptée par le backend
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

/// Erreurs de préparation d'un upload
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported file type: {0}. Use: pdf, jpeg, jpg, png")]
    UnsupportedType(String),

    #[error("File is empty")]
    Empty,

    #[error("File is too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },
}

/// Fichier prêt à être envoyé en multipart
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: &'static str,
    pub data: Vec<u8>,
}

/// Type MIME déduit de l'extension (insensible à la casse)
pub fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        _ => None,
    }
}

impl Upload {
    /// Lit et vérifie un fichier local
    pub fn from_path(path: &Path) -> Result<Self, UploadError> {
        let mime = mime_for(path)
            .ok_or_else(|| UploadError::UnsupportedType(path.display().to_string()))?;

        let size = std::fs::metadata(path)?.len();
        check_size(size)?;

        let data = std::fs::read(path)?;
        // Le fichier a pu changer entre metadata() et read()
        check_size(data.len() as u64)?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        tracing::debug!(file = %file_name, mime, size, "Upload ready");
        Ok(Self {
            file_name,
            mime,
            data,
        })
    }
}

fn check_size(size: u64) -> Result<(), UploadError> {
    if size == 0 {
        return Err(UploadError::Empty);
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}
