//! Accès au backend HTTP (analyse, rapport, couches, chat)

pub mod client;

pub use client::BackendClient;

use foncier::{validate, AnalysisResult, ValidationError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Erreurs d'appel au backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// Erreur réseau (connexion, timeout, corps illisible)
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Réponse non-2xx
    #[error("Backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Réponse 2xx dont le contenu ne passe pas la validation
    #[error("Invalid backend payload: {0}")]
    Invalid(#[from] ValidationError),

    /// URL de base ou d'endpoint invalide
    #[error("Invalid URL {url}: {reason}")]
    Url { url: String, reason: String },
}

/// Résultat d'analyse validé et payload reçu du backend
///
/// Le modèle ne retient que les champs utiles à la vue (l'altitude des
/// positions et les champs inconnus sont ignorés). Le payload d'origine est
/// conservé pour être stocké et renvoyé tel quel lors de la génération du
/// rapport.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub result: AnalysisResult,
    pub payload: Value,
}

impl Analysis {
    /// Valide un payload ; il n'est conservé que s'il passe la validation
    pub fn from_payload(payload: Value) -> Result<Self, ValidationError> {
        let result = validate::analysis_result(&payload)?;
        Ok(Self { result, payload })
    }
}

/// Corps d'erreur renvoyé par le backend
#[derive(Debug, Default, Deserialize)]
pub struct BackendError {
    pub message: Option<String>,
    pub detail: Option<Value>,
    pub errors: Option<Vec<String>>,
}

impl BackendError {
    /// Premier texte disponible parmi `message`, `detail`, `errors`
    pub fn into_message(self) -> Option<String> {
        if let Some(message) = self.message.filter(|m| !m.is_empty()) {
            return Some(message);
        }
        match self.detail {
            Some(Value::String(s)) if !s.is_empty() => return Some(s),
            Some(Value::String(_)) | Some(Value::Null) | None => {}
            Some(other) => return Some(other.to_string()),
        }
        self.errors
            .filter(|e| !e.is_empty())
            .map(|errors| errors.join("; "))
    }
}
