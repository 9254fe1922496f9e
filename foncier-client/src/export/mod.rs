//! Module d'export du plan de rendu

pub mod geojson;

pub use geojson::export_plan;
