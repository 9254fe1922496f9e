//! Validation structurelle des payloads d'analyse
//!
//! Chaque fonction vérifie une valeur JSON arbitraire et, si elle est
//! conforme, construit le type correspondant. La vérification s'arrête à la
//! première contrainte violée : un payload invalide n'est jamais partiellement
//! utilisé.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::types::{
    AnalysisResult, Feature, FeatureCollection, Geometry, GeometryKind, Overlap, Position,
    MIN_RING_POSITIONS,
};

/// Valide une réponse d'analyse complète
///
/// Ordre des vérifications :
/// 1. objet non nul
/// 2. `image_id` chaîne non vide
/// 3. `geojson` (alias `geometry`) FeatureCollection valide
/// 4. `overlaps` tableau d'overlaps valides
pub fn analysis_result(value: &Value) -> Result<AnalysisResult, ValidationError> {
    let result = check_analysis_result(value);
    match &result {
        Ok(r) => tracing::debug!(
            image_id = %r.image_id,
            features = r.geometry.len(),
            overlaps = r.overlaps.len(),
            "Analysis payload accepted"
        ),
        Err(e) => tracing::warn!(path = e.path(), error = %e, "Analysis payload rejected"),
    }
    result
}

fn check_analysis_result(value: &Value) -> Result<AnalysisResult, ValidationError> {
    let obj = object(value, "")?;

    let image_id = non_empty_str(obj, "image_id", "")?;

    let (field, geom_value) = match obj.get("geojson") {
        Some(v) => ("geojson", v),
        None => match obj.get("geometry") {
            Some(v) => ("geometry", v),
            None => return Err(missing("/geojson")),
        },
    };
    let geometry = collection_at(geom_value, &format!("/{}", field))?;

    let overlaps_value = obj.get("overlaps").ok_or_else(|| missing("/overlaps"))?;
    let items = overlaps_value.as_array().ok_or_else(|| ValidationError::WrongType {
        path: "/overlaps".to_string(),
        expected: "an array",
    })?;
    let overlaps = items
        .iter()
        .enumerate()
        .map(|(i, v)| overlap_at(v, &format!("/overlaps/{}", i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AnalysisResult {
        image_id: image_id.to_string(),
        geometry,
        overlaps,
    })
}

/// Valide une FeatureCollection (géométrie principale ou données de couche)
pub fn feature_collection(value: &Value) -> Result<FeatureCollection, ValidationError> {
    collection_at(value, "")
}

/// Valide un overlap isolé
pub fn overlap(value: &Value) -> Result<Overlap, ValidationError> {
    overlap_at(value, "")
}

fn collection_at(value: &Value, path: &str) -> Result<FeatureCollection, ValidationError> {
    let obj = object(value, path)?;
    expect_tag(obj, path, "FeatureCollection")?;

    let features_path = format!("{}/features", path);
    let items = obj
        .get("features")
        .ok_or_else(|| missing(&features_path))?
        .as_array()
        .ok_or_else(|| ValidationError::WrongType {
            path: features_path.clone(),
            expected: "an array",
        })?;

    let features = items
        .iter()
        .enumerate()
        .map(|(i, v)| feature_at(v, &format!("{}/{}", features_path, i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FeatureCollection::new(features))
}

fn feature_at(value: &Value, path: &str) -> Result<Feature, ValidationError> {
    let obj = object(value, path)?;
    expect_tag(obj, path, "Feature")?;

    let geom_path = format!("{}/geometry", path);
    let geometry = geometry_at(obj.get("geometry").ok_or_else(|| missing(&geom_path))?, &geom_path)?;

    let props_path = format!("{}/properties", path);
    let properties = obj
        .get("properties")
        .ok_or_else(|| missing(&props_path))?
        .as_object()
        .ok_or_else(|| ValidationError::WrongType {
            path: props_path,
            expected: "an object",
        })?
        .clone();

    Ok(Feature {
        geometry,
        properties,
    })
}

fn geometry_at(value: &Value, path: &str) -> Result<Geometry, ValidationError> {
    let obj = object(value, path)?;

    let type_path = format!("{}/type", path);
    let tag = obj
        .get("type")
        .ok_or_else(|| missing(&type_path))?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            path: type_path.clone(),
            expected: "a string",
        })?;
    let kind: GeometryKind = tag.parse().map_err(|_| ValidationError::UnexpectedTag {
        path: type_path,
        found: tag.to_string(),
        expected: "Point, LineString, Polygon or MultiPolygon",
    })?;

    let coords_path = format!("{}/coordinates", path);
    let coords = obj.get("coordinates").ok_or_else(|| missing(&coords_path))?;

    let geometry = match kind {
        GeometryKind::Point => Geometry::Point(position(coords, &coords_path)?),
        GeometryKind::LineString => Geometry::LineString(line(coords, &coords_path, 2)?),
        GeometryKind::Polygon => Geometry::Polygon(polygon(coords, &coords_path)?),
        GeometryKind::MultiPolygon => {
            let items = array(coords, &coords_path)?;
            if items.is_empty() {
                return Err(ValidationError::coordinates(
                    coords_path,
                    "MultiPolygon needs at least one polygon",
                ));
            }
            let polygons = items
                .iter()
                .enumerate()
                .map(|(i, v)| polygon(v, &format!("{}/{}", coords_path, i)))
                .collect::<Result<Vec<_>, _>>()?;
            Geometry::MultiPolygon(polygons)
        }
    };

    Ok(geometry)
}

fn polygon(value: &Value, path: &str) -> Result<Vec<Vec<Position>>, ValidationError> {
    let items = array(value, path)?;
    if items.is_empty() {
        return Err(ValidationError::coordinates(
            path,
            "Polygon needs at least one ring",
        ));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, v)| ring(v, &format!("{}/{}", path, i)))
        .collect()
}

fn ring(value: &Value, path: &str) -> Result<Vec<Position>, ValidationError> {
    let positions = line(value, path, MIN_RING_POSITIONS)?;
    if positions[0] != positions[positions.len() - 1] {
        return Err(ValidationError::coordinates(path, "ring is not closed"));
    }
    Ok(positions)
}

fn line(value: &Value, path: &str, min_len: usize) -> Result<Vec<Position>, ValidationError> {
    let items = array(value, path)?;
    if items.len() < min_len {
        return Err(ValidationError::coordinates(
            path,
            format!("expected at least {} positions, got {}", min_len, items.len()),
        ));
    }
    items
        .iter()
        .enumerate()
        .map(|(i, v)| position(v, &format!("{}/{}", path, i)))
        .collect()
}

fn position(value: &Value, path: &str) -> Result<Position, ValidationError> {
    let items = array(value, path)?;
    if items.len() < 2 {
        return Err(ValidationError::coordinates(
            path,
            "a position needs at least two numbers",
        ));
    }
    let mut numbers = Vec::with_capacity(items.len());
    for item in items {
        match item.as_f64() {
            Some(n) if n.is_finite() => numbers.push(n),
            _ => {
                return Err(ValidationError::coordinates(
                    path,
                    "a position must only contain finite numbers",
                ))
            }
        }
    }
    Ok(Position::new(numbers[0], numbers[1]))
}

fn overlap_at(value: &Value, path: &str) -> Result<Overlap, ValidationError> {
    let obj = object(value, path)?;
    let layer_name = non_empty_str(obj, "layer_name", path)?;

    let count_path = format!("{}/overlapping_count", path);
    let count = obj.get("overlapping_count").ok_or_else(|| missing(&count_path))?;
    let overlapping_count = non_negative_integer(count).ok_or(ValidationError::InvalidCount {
        path: count_path,
    })?;

    Ok(Overlap {
        layer_name: layer_name.to_string(),
        overlapping_count,
        details: obj.get("details").filter(|v| !v.is_null()).cloned(),
    })
}

/// Entier positif ou nul ; `3.0` est accepté, `-1` et `2.5` ne le sont pas
fn non_negative_integer(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 {
        Some(f as u64)
    } else {
        None
    }
}

fn object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| ValidationError::NotAnObject {
        path: display_path(path),
    })
}

fn array<'a>(value: &'a Value, path: &str) -> Result<&'a Vec<Value>, ValidationError> {
    value.as_array().ok_or_else(|| ValidationError::WrongType {
        path: display_path(path),
        expected: "an array",
    })
}

fn non_empty_str<'a>(
    obj: &'a Map<String, Value>,
    field: &str,
    parent: &str,
) -> Result<&'a str, ValidationError> {
    let path = format!("{}/{}", parent, field);
    let s = obj
        .get(field)
        .ok_or_else(|| missing(&path))?
        .as_str()
        .ok_or_else(|| ValidationError::WrongType {
            path: path.clone(),
            expected: "a string",
        })?;
    if s.is_empty() {
        return Err(ValidationError::Empty { path });
    }
    Ok(s)
}

fn expect_tag(
    obj: &Map<String, Value>,
    path: &str,
    expected: &'static str,
) -> Result<(), ValidationError> {
    let type_path = format!("{}/type", path);
    match obj.get("type") {
        None => Err(missing(&type_path)),
        Some(Value::String(s)) if s == expected => Ok(()),
        Some(other) => Err(ValidationError::UnexpectedTag {
            path: type_path,
            found: other.as_str().map_or_else(|| other.to_string(), str::to_string),
            expected,
        }),
    }
}

fn missing(path: &str) -> ValidationError {
    ValidationError::MissingField {
        path: path.to_string(),
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}
