//! Emplacement local du dernier résultat d'analyse
//!
//! Le résultat est écrit à l'issue d'un upload réussi puis relu par les
//! commandes d'affichage. Le payload du backend est écrit tel quel (altitude
//! et champs inconnus compris) et revalidé à chaque lecture : un fichier
//! absent ou corrompu signifie qu'il faut refaire l'upload.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::Analysis;

/// Nom du fichier de résultat dans le répertoire de données
pub const RESULT_FILE: &str = "analysisResult.json";

/// Emplacement unique du résultat courant
#[derive(Debug, Clone)]
pub struct ResultSlot {
    path: PathBuf,
}

impl ResultSlot {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(RESULT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remplace le résultat stocké
    pub fn store(&self, analysis: &Analysis) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .context(format!("Failed to create data dir: {}", dir.display()))?;
        }
        let json =
            serde_json::to_string(&analysis.payload).context("Failed to serialize result")?;
        std::fs::write(&self.path, json)
            .context(format!("Failed to write result: {}", self.path.display()))?;
        debug!(path = %self.path.display(), image_id = %analysis.result.image_id, "Result stored");
        Ok(())
    }

    /// Relit et revalide le résultat stocké
    ///
    /// Retourne `None` si aucun résultat exploitable n'est disponible.
    pub fn load(&self) -> Option<Analysis> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored result");
                return None;
            }
        };
        let payload: Value = match serde_json::from_str(&content) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored result is not JSON");
                return None;
            }
        };
        match Analysis::from_payload(payload) {
            Ok(analysis) => Some(analysis),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Stored result is invalid");
                None
            }
        }
    }
}
