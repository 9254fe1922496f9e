//! Composition du rendu : fond de carte, parcelle, couches visibles
//!
//! Le rendu est une fonction pure de (géométrie principale, snapshot des
//! couches) vers une liste ordonnée d'instructions. Rien n'est conservé d'un
//! appel à l'autre.

use std::sync::Arc;

use serde::Serialize;

use crate::layers::LayerSnapshot;
use crate::types::{Color, FeatureCollection};

/// Style de tracé d'une géométrie
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    pub color: Color,
    pub weight: f64,
    pub fill_color: Color,
    pub fill_opacity: f64,
}

impl PathStyle {
    /// Parcelle principale : couleur d'accent, trait moyen, remplissage léger
    pub const PRIMARY: PathStyle = PathStyle {
        color: Color::ACCENT,
        weight: 3.0,
        fill_color: Color::ACCENT,
        fill_opacity: 0.2,
    };

    /// Couche superposée : trait et remplissage de la couleur de la couche
    pub fn overlay(color: Color) -> Self {
        Self {
            color,
            weight: 2.0,
            fill_color: color,
            fill_opacity: 0.5,
        }
    }
}

/// Fond de carte tuilé
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseMap {
    pub url_template: String,
    pub attribution: String,
}

impl Default for BaseMap {
    fn default() -> Self {
        Self {
            url_template: "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}".to_string(),
            attribution: "Tiles © Esri — Source: Esri, i-cubed, USDA, USGS, AEX, GeoEye, Getmapping, Aerogrid, IGN, IGP, UPR-EGP, and the GIS User Community".to_string(),
        }
    }
}

/// Identifiant d'une couche de rendu
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerId {
    Primary,
    Overlay(String),
}

impl LayerId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Primary => "main-parcel",
            Self::Overlay(key) => key,
        }
    }
}

/// Instruction de rendu
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Tiles(BaseMap),
    Geometry {
        id: LayerId,
        geometry: Arc<FeatureCollection>,
        style: PathStyle,
    },
}

/// Liste ordonnée d'instructions : les suivantes se dessinent par-dessus
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderPlan {
    pub calls: Vec<DrawCall>,
}

impl RenderPlan {
    pub fn iter(&self) -> std::slice::Iter<'_, DrawCall> {
        self.calls.iter()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Identifiants des géométries, dans l'ordre de dessin
    pub fn layer_ids(&self) -> Vec<&LayerId> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DrawCall::Geometry { id, .. } => Some(id),
                DrawCall::Tiles(_) => None,
            })
            .collect()
    }
}

/// Compose le fond, la parcelle principale puis les couches visibles
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    base: BaseMap,
}

impl Renderer {
    pub fn new(base: BaseMap) -> Self {
        Self { base }
    }

    pub fn render(
        &self,
        primary: Option<&Arc<FeatureCollection>>,
        layers: &LayerSnapshot,
    ) -> RenderPlan {
        let mut calls = Vec::with_capacity(layers.len() + 2);
        calls.push(DrawCall::Tiles(self.base.clone()));

        if let Some(primary) = primary {
            calls.push(DrawCall::Geometry {
                id: LayerId::Primary,
                geometry: Arc::clone(primary),
                style: PathStyle::PRIMARY,
            });
        }

        calls.extend(layers.iter().map(|layer| DrawCall::Geometry {
            id: LayerId::Overlay(layer.key.clone()),
            geometry: Arc::clone(&layer.geometry),
            style: PathStyle::overlay(layer.color),
        }));

        tracing::trace!(calls = calls.len(), "Render plan composed");
        RenderPlan { calls }
    }
}
