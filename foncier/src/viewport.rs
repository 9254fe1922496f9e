//! Cadrage automatique de la carte sur la géométrie principale
//!
//! Le cadrage se fait en deux temps : ajustement aux limites de la
//! géométrie (avec une marge en pixels), puis, une fois cet ajustement
//! appliqué, relèvement du zoom à un plancher minimal d'inspection.

use std::f64::consts::PI;
use std::time::Duration;

use blake3::Hasher;
use geo::BoundingRect;
use tracing::debug;

use crate::centroid::LatLon;
use crate::types::{FeatureCollection, Geometry, Position};

/// Taille d'une tuile en pixels (Web Mercator)
const TILE_SIZE: f64 = 256.0;

/// Latitude maximale représentable en Web Mercator
const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Emprise (longitude/latitude)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    /// Emprise serrée de toutes les coordonnées
    ///
    /// `None` si la collection est vide, ou si l'emprise est dégénérée
    /// (aire nulle ou valeurs non finies).
    pub fn of(collection: &FeatureCollection) -> Option<Self> {
        let rect = collection.to_geo().bounding_rect()?;
        let bounds = Self {
            west: rect.min().x,
            south: rect.min().y,
            east: rect.max().x,
            north: rect.max().y,
        };
        bounds.is_valid().then_some(bounds)
    }

    pub fn is_valid(&self) -> bool {
        [self.west, self.south, self.east, self.north]
            .iter()
            .all(|v| v.is_finite())
            && self.east > self.west
            && self.north > self.south
    }
}

/// Carte pilotable par le cadrage automatique
pub trait MapView {
    /// Ajuste centre et zoom pour que l'emprise tienne dans la vue, marge comprise
    fn fit_bounds(&mut self, bounds: &Bounds, padding: f64);

    fn zoom(&self) -> f64;

    /// Change le zoom en conservant le centre
    fn set_zoom(&mut self, zoom: f64);
}

/// Vue Web Mercator (centre, zoom entier, taille en pixels)
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: LatLon,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Viewport {
    pub fn new(center: LatLon, zoom: f64, width: f64, height: f64) -> Self {
        Self {
            center,
            zoom: zoom.clamp(0.0, 20.0),
            width,
            height,
            min_zoom: 0.0,
            max_zoom: 20.0,
        }
    }

    pub fn with_zoom_limits(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom.max(min_zoom);
        self.zoom = self.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    /// Zoom le plus élevé (entier) pour lequel l'emprise tient dans la vue
    pub fn bounds_zoom(&self, bounds: &Bounds, padding: f64) -> f64 {
        let avail_x = (self.width - 2.0 * padding).max(1.0);
        let avail_y = (self.height - 2.0 * padding).max(1.0);

        // Taille de l'emprise en pixels au zoom 0
        let (x0, y0) = project(bounds.north, bounds.west, 0.0);
        let (x1, y1) = project(bounds.south, bounds.east, 0.0);
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();

        let scale = match (dx > 0.0, dy > 0.0) {
            (true, true) => (avail_x / dx).min(avail_y / dy),
            (true, false) => avail_x / dx,
            (false, true) => avail_y / dy,
            (false, false) => return self.max_zoom,
        };

        scale.log2().floor().clamp(self.min_zoom, self.max_zoom)
    }
}

impl MapView for Viewport {
    fn fit_bounds(&mut self, bounds: &Bounds, padding: f64) {
        let zoom = self.bounds_zoom(bounds, padding);

        // Centre pris au milieu de l'emprise projetée, pas au milieu des latitudes
        let (x0, y0) = project(bounds.north, bounds.west, zoom);
        let (x1, y1) = project(bounds.south, bounds.east, zoom);
        self.center = unproject((x0 + x1) / 2.0, (y0 + y1) / 2.0, zoom);
        self.zoom = zoom;
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }
}

/// Projection Web Mercator vers des pixels monde au zoom donné
pub fn project(lat: f64, lon: f64, zoom: f64) -> (f64, f64) {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lon + 180.0) / 360.0 * scale;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * scale;
    (x, y)
}

/// Inverse de [`project`]
pub fn unproject(x: f64, y: f64, zoom: f64) -> LatLon {
    let scale = TILE_SIZE * 2f64.powf(zoom);
    let lon = x / scale * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / scale;
    let lat = n.sinh().atan().to_degrees();
    LatLon { lat, lon }
}

/// Paramètres du cadrage automatique
#[derive(Debug, Clone, PartialEq)]
pub struct AutoFitConfig {
    /// Zoom minimal après cadrage (détail utile pour inspecter une parcelle)
    pub min_zoom: f64,
    /// Marge en pixels autour de l'emprise
    pub padding: f64,
    /// Attente entre l'ajustement et l'application du plancher
    pub settle: Duration,
}

impl Default for AutoFitConfig {
    fn default() -> Self {
        Self {
            min_zoom: 18.0,
            padding: 50.0,
            settle: Duration::from_millis(100),
        }
    }
}

/// Raison pour laquelle aucun cadrage n'a eu lieu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoGeometry,
    DegenerateBounds,
}

/// Résultat d'un cadrage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FitOutcome {
    Skipped(SkipReason),
    /// Géométrie identique à la précédente, vue inchangée
    Unchanged,
    Fitted {
        /// Zoom obtenu par l'ajustement aux limites
        fitted_zoom: f64,
        /// Zoom final (après plancher)
        zoom: f64,
    },
}

/// Cadrage déclenché à chaque changement de géométrie principale
#[derive(Debug, Clone, Default)]
pub struct AutoFit {
    config: AutoFitConfig,
    last: Option<Option<[u8; 32]>>,
}

impl AutoFit {
    pub fn new(config: AutoFitConfig) -> Self {
        Self { config, last: None }
    }

    pub fn config(&self) -> &AutoFitConfig {
        &self.config
    }

    /// Cadre la carte si la géométrie a changé depuis le dernier appel
    pub async fn sync<M: MapView>(
        &mut self,
        geometry: Option<&FeatureCollection>,
        map: &mut M,
    ) -> FitOutcome {
        let current = geometry.map(fingerprint);
        if self.last == Some(current) {
            return FitOutcome::Unchanged;
        }
        self.last = Some(current);
        debug!(
            fingerprint = %current.map(hex::encode).unwrap_or_default(),
            "Primary geometry changed"
        );
        self.fit(geometry, map).await
    }

    /// Cadre la carte sur la géométrie, sans détection de changement
    pub async fn fit<M: MapView>(
        &self,
        geometry: Option<&FeatureCollection>,
        map: &mut M,
    ) -> FitOutcome {
        let Some(geometry) = geometry.filter(|g| !g.is_empty()) else {
            return FitOutcome::Skipped(SkipReason::NoGeometry);
        };
        let Some(bounds) = Bounds::of(geometry) else {
            debug!(features = geometry.len(), "Degenerate bounds, fit skipped");
            return FitOutcome::Skipped(SkipReason::DegenerateBounds);
        };

        map.fit_bounds(&bounds, self.config.padding);
        let fitted_zoom = map.zoom();

        // Le plancher s'applique une fois l'ajustement effectif
        if self.config.settle.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.config.settle).await;
        }

        if map.zoom() < self.config.min_zoom {
            map.set_zoom(self.config.min_zoom);
        }

        let zoom = map.zoom();
        debug!(?bounds, fitted_zoom, zoom, "Viewport fitted");
        FitOutcome::Fitted { fitted_zoom, zoom }
    }
}

/// Empreinte stable d'une collection (coordonnées arrondies à 1e-7)
pub fn fingerprint(collection: &FeatureCollection) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(&(collection.len() as u64).to_le_bytes());
    for feature in &collection.features {
        match &feature.geometry {
            Geometry::Point(p) => {
                hasher.update(b"POINT");
                hash_position(&mut hasher, p);
            }
            Geometry::LineString(line) => {
                hasher.update(b"LINESTRING");
                line.iter().for_each(|p| hash_position(&mut hasher, p));
            }
            Geometry::Polygon(rings) => {
                hasher.update(b"POLYGON");
                hash_rings(&mut hasher, rings);
            }
            Geometry::MultiPolygon(polygons) => {
                hasher.update(b"MULTIPOLYGON");
                for rings in polygons {
                    hasher.update(b"POLY");
                    hash_rings(&mut hasher, rings);
                }
            }
        }
    }
    *hasher.finalize().as_bytes()
}

fn hash_rings(hasher: &mut Hasher, rings: &[Vec<Position>]) {
    for ring in rings {
        hasher.update(b"RING");
        ring.iter().for_each(|p| hash_position(hasher, p));
    }
}

fn hash_position(hasher: &mut Hasher, p: &Position) {
    let x = (p.lon * 10_000_000.0).round() as i64;
    let y = (p.lat * 10_000_000.0).round() as i64;
    hasher.update(&x.to_le_bytes());
    hasher.update(&y.to_le_bytes());
}
