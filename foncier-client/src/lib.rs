//! # foncier-client
//!
//! Client du backend de vérification foncière : upload d'un levé, stockage du
//! résultat, vue des résultats avec couches cadastrales, rapport PDF et
//! assistant conversationnel.
//!
//! ## Usage CLI
//!
//! ```bash
//! # Analyse d'un levé topographique
//! foncier analyze ./leve.pdf
//!
//! # Carte des résultats avec deux couches, exportée en GeoJSON
//! foncier render --layer aif --layer parcelles --output carte.geojson
//!
//! # Rapport PDF
//! foncier report --output rapport.pdf
//! ```

pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod export;
pub mod report;
pub mod session;
pub mod storage;
pub mod upload;

pub use api::{Analysis, ApiError, BackendClient};
pub use config::{ClientConfig, MapConfig};
pub use session::{ResultsView, ToggleError};
pub use storage::ResultSlot;
pub use upload::{Upload, UploadError};
