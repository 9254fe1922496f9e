//! Types d'erreurs pour le crate foncier

use thiserror::Error;

/// Première contrainte violée par un payload d'analyse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// La valeur n'est pas un objet JSON
    #[error("{path}: expected an object")]
    NotAnObject { path: String },

    /// Champ obligatoire absent
    #[error("{path}: missing field")]
    MissingField { path: String },

    /// Champ présent mais du mauvais type
    #[error("{path}: expected {expected}")]
    WrongType {
        path: String,
        expected: &'static str,
    },

    /// Chaîne vide là où un identifiant est attendu
    #[error("{path}: must not be empty")]
    Empty { path: String },

    /// Tag `type` inattendu
    #[error("{path}: unexpected type tag {found:?}, expected {expected}")]
    UnexpectedTag {
        path: String,
        found: String,
        expected: &'static str,
    },

    /// Coordonnées incompatibles avec le type de géométrie
    #[error("{path}: {reason}")]
    InvalidCoordinates { path: String, reason: String },

    /// Compteur de chevauchement négatif ou non entier
    #[error("{path}: overlapping_count must be a non-negative integer")]
    InvalidCount { path: String },
}

impl ValidationError {
    /// Chemin (style JSON pointer) de la valeur fautive
    pub fn path(&self) -> &str {
        match self {
            Self::NotAnObject { path }
            | Self::MissingField { path }
            | Self::WrongType { path, .. }
            | Self::Empty { path }
            | Self::UnexpectedTag { path, .. }
            | Self::InvalidCoordinates { path, .. }
            | Self::InvalidCount { path } => path,
        }
    }

    pub(crate) fn coordinates(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCoordinates {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Erreur de récupération injectée (réseau, statut HTTP, payload invalide...)
pub type FetchError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Erreurs pouvant survenir lors de l'activation d'une couche
#[derive(Debug, Error)]
pub enum LayerError {
    /// Pré-requis manquant (géométrie principale ou centroïde indisponible)
    #[error("Missing prerequisite for layer {key}: {reason}")]
    MissingPrerequisite { key: String, reason: &'static str },

    /// La récupération des données de la couche a échoué
    #[error("Failed to fetch layer {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },

    /// La vue a été fermée, plus aucune mutation n'est acceptée
    #[error("Layer store is closed")]
    Closed,
}

impl LayerError {
    /// Clé de la couche concernée (si applicable)
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingPrerequisite { key, .. } | Self::Fetch { key, .. } => Some(key),
            Self::Closed => None,
        }
    }
}

/// Erreur de lecture d'un résultat d'analyse sérialisé
#[derive(Debug, Error)]
pub enum ParseError {
    /// Texte qui n'est pas du JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON qui ne passe pas la validation
    #[error("Invalid analysis payload: {0}")]
    Invalid(#[from] ValidationError),
}
