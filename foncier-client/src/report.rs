//! Enregistrement du rapport PDF

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Nom par défaut du rapport téléchargé
pub const DEFAULT_REPORT_NAME: &str = "rapport_analyse_fonciere.pdf";

/// Écrit le rapport de façon atomique
///
/// Le contenu est écrit dans un fichier temporaire voisin puis renommé : en
/// cas d'échec, aucun fichier partiel ne reste à la destination.
pub fn save_report(path: &Path, pdf: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);

    let written = (|| -> Result<()> {
        let mut file = std::fs::File::create(&tmp)
            .context(format!("Failed to create file: {}", tmp.display()))?;
        file.write_all(pdf)?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
            .context(format!("Failed to move report to {}", path.display()))?;
        Ok(())
    })();

    if written.is_err() {
        std::fs::remove_file(&tmp).ok();
    }
    written?;

    info!(path = %path.display(), size = pdf.len(), "Report saved");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_REPORT_NAME.to_string());
    path.with_file_name(format!(".{}.part", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_report() {
        let dir = std::env::temp_dir().join("foncier_report_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rapport.pdf");

        save_report(&path, b"%PDF-1.4 first").unwrap();
        save_report(&path, b"%PDF-1.4 second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4 second");
        assert!(!temp_sibling(&path).exists());

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_failed_save_leaves_nothing() {
        let path = std::env::temp_dir()
            .join("foncier_missing_dir")
            .join("rapport.pdf");
        assert!(save_report(&path, b"%PDF").is_err());
        assert!(!path.exists());
        assert!(!temp_sibling(&path).exists());
    }
}
