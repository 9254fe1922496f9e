//! # foncier
//!
//! Visualisation des résultats d'analyse foncière : une parcelle géolocalisée
//! par le backend, superposée à des couches cadastrales activables.
//!
//! ## Features
//!
//! - Validation structurelle des payloads d'analyse (GeoJSON + overlaps)
//! - Centroïde approximatif de la parcelle pour les requêtes spatiales
//! - Store de couches visibles, sûr face aux activations concurrentes
//! - Cadrage automatique de la vue avec zoom plancher
//! - Plan de rendu déterministe (fond, parcelle, couches)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use foncier::{validate, LayerStore, Renderer};
//!
//! let result = validate::analysis_result(&payload)?;
//! let store = LayerStore::with_primary(result.geometry.clone());
//! store.activate(&layer, |req| backend.layer_data(req)).await?;
//!
//! let plan = Renderer::default().render(store.primary().as_ref(), &store.snapshot());
//! ```

pub mod centroid;
pub mod error;
pub mod layers;
pub mod palette;
pub mod render;
pub mod summary;
pub mod types;
pub mod validate;
pub mod viewport;

pub use centroid::{parcel_centroid, LatLon};
pub use error::{FetchError, LayerError, ParseError, ValidationError};
pub use layers::{Activation, LayerRequest, LayerSnapshot, LayerStore, SpatialQuery, VisibleLayer};
pub use render::{BaseMap, DrawCall, LayerId, PathStyle, RenderPlan, Renderer};
pub use summary::{AnalysisSummary, ConflictDetail, ParcelStatus};
pub use types::{
    AnalysisResult, Color, Feature, FeatureCollection, Geometry, LayerDescriptor, LayerInfo,
    LayerScope, Overlap, Position,
};
pub use viewport::{AutoFit, AutoFitConfig, Bounds, FitOutcome, MapView, Viewport};

/// Parse et valide une réponse d'analyse JSON
///
/// # Errors
///
/// Retourne une description de l'erreur si le texte n'est pas du JSON ou si
/// le payload ne passe pas la validation.
pub fn parse_analysis_result(json: &str) -> Result<AnalysisResult, ParseError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    Ok(validate::analysis_result(&value)?)
}
