//! Types de données pour le crate foncier
//!
//! Ces types ne dérivent volontairement pas `Deserialize` : un payload
//! provenant du backend ou du stockage local doit passer par
//! [`crate::validate`] pour être construit.

use std::fmt;
use std::str::FromStr;

use geo::{Coord, LineString, MultiPolygon, Point, Polygon};
use serde::ser::{SerializeSeq, SerializeStruct};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Valeur de la propriété `type` qui désigne le contour de la parcelle
pub const PARCEL_BOUNDARY: &str = "parcel_boundary";

/// Nombre minimal de positions d'un anneau fermé (2 sommets + fermeture)
pub const MIN_RING_POSITIONS: usize = 3;

/// Position GeoJSON (longitude, latitude)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl From<Position> for Coord {
    fn from(p: Position) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.lon)?;
        seq.serialize_element(&self.lat)?;
        seq.end()
    }
}

/// Type de géométrie supporté
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
    MultiPolygon,
}

impl FromStr for GeometryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(Self::Point),
            "LineString" => Ok(Self::LineString),
            "Polygon" => Ok(Self::Polygon),
            "MultiPolygon" => Ok(Self::MultiPolygon),
            _ => Err(format!("Unsupported geometry type: {}", s)),
        }
    }
}

/// Géométrie GeoJSON, une variante par type avec la profondeur de coordonnées associée
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    /// Anneaux : le premier est l'anneau extérieur, les suivants des trous
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    /// Anneau extérieur du premier polygone (None pour Point et LineString)
    pub fn outer_ring(&self) -> Option<&[Position]> {
        match self {
            Self::Polygon(rings) => rings.first().map(Vec::as_slice),
            Self::MultiPolygon(polygons) => polygons
                .first()
                .and_then(|rings| rings.first())
                .map(Vec::as_slice),
            Self::Point(_) | Self::LineString(_) => None,
        }
    }

    /// Conversion vers les types `geo`
    pub fn to_geo(&self) -> geo::Geometry {
        match self {
            Self::Point(p) => geo::Geometry::Point(Point::from(Coord::from(*p))),
            Self::LineString(line) => geo::Geometry::LineString(to_line_string(line)),
            Self::Polygon(rings) => geo::Geometry::Polygon(to_polygon(rings)),
            Self::MultiPolygon(polygons) => geo::Geometry::MultiPolygon(MultiPolygon::new(
                polygons.iter().map(|rings| to_polygon(rings)).collect(),
            )),
        }
    }
}

fn to_line_string(positions: &[Position]) -> LineString {
    LineString::new(positions.iter().copied().map(Coord::from).collect())
}

fn to_polygon(rings: &[Vec<Position>]) -> Polygon {
    let mut iter = rings.iter();
    let exterior = iter
        .next()
        .map(|r| to_line_string(r))
        .unwrap_or_else(|| LineString::new(Vec::new()));
    Polygon::new(exterior, iter.map(|r| to_line_string(r)).collect())
}

/// Une feature GeoJSON
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            properties: Map::new(),
        }
    }

    /// Ajoute une propriété (builder)
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Vrai si la feature est marquée comme contour de parcelle
    pub fn is_parcel_boundary(&self) -> bool {
        self.properties.get("type").and_then(Value::as_str) == Some(PARCEL_BOUNDARY)
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Feature", 3)?;
        s.serialize_field("type", "Feature")?;
        s.serialize_field("geometry", &self.geometry)?;
        s.serialize_field("properties", &self.properties)?;
        s.end()
    }
}

/// Collection ordonnée de features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Feature marquée `properties.type == "parcel_boundary"`
    pub fn parcel_boundary(&self) -> Option<&Feature> {
        self.features.iter().find(|f| f.is_parcel_boundary())
    }

    pub fn to_geo(&self) -> geo::GeometryCollection {
        geo::GeometryCollection::new_from(
            self.features.iter().map(|f| f.geometry.to_geo()).collect(),
        )
    }
}

impl Serialize for FeatureCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("FeatureCollection", 2)?;
        s.serialize_field("type", "FeatureCollection")?;
        s.serialize_field("features", &self.features)?;
        s.end()
    }
}

/// Conflit entre la parcelle et une couche cadastrale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overlap {
    pub layer_name: String,
    pub overlapping_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Résultat d'une analyse (upload → géolocalisation → superpositions)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub image_id: String,
    /// Géométrie principale, conventionnellement un contour de parcelle
    #[serde(rename = "geojson")]
    pub geometry: FeatureCollection,
    pub overlaps: Vec<Overlap>,
}

/// Entrée du catalogue renvoyé par `GET /layers/info`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerInfo {
    pub key: String,
    pub name: String,
}

/// Couleur RGB (`#rrggbb`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    /// Bleu d'accent de la parcelle principale
    pub const ACCENT: Color = Color(0x3388ff);
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xff_ffff)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("Invalid color: {}. Expected #rrggbb", s))?;
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("Invalid color: {}. Expected #rrggbb", s));
        }
        u32::from_str_radix(hex, 16)
            .map(Color)
            .map_err(|_| format!("Invalid color: {}. Expected #rrggbb", s))
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Portée spatiale d'une couche
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LayerScope {
    /// Couche chargée en entier
    #[default]
    Global,
    /// Couche interrogée autour du centroïde de la parcelle
    AroundParcel { radius_m: f64 },
}

/// Couche affichable : catalogue + couleur attribuée pour la session
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub key: String,
    pub name: String,
    pub color: Color,
    pub scope: LayerScope,
}

impl LayerDescriptor {
    pub fn new(key: impl Into<String>, name: impl Into<String>, color: Color) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            color,
            scope: LayerScope::Global,
        }
    }

    pub fn scoped(mut self, radius_m: f64) -> Self {
        self.scope = LayerScope::AroundParcel { radius_m };
        self
    }
}
