//! Export du plan de rendu en GeoJSON (géométries écrites avec geozero)
//!
//! Chaque feature porte les propriétés simplestyle de sa couche (`stroke`,
//! `stroke-width`, `fill`, `fill-opacity`) et l'identifiant de couche dans
//! `layer`. Le fond de carte est un membre `tiles` de la collection.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use foncier::{BaseMap, DrawCall, Feature, LayerId, PathStyle, RenderPlan};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use serde_json::{json, Value};

/// Propriétés réservées au style, jamais recopiées depuis la feature source
const STYLE_KEYS: [&str; 5] = ["layer", "stroke", "stroke-width", "fill", "fill-opacity"];

/// Exporte le plan de rendu dans un fichier GeoJSON
pub fn export_plan(plan: &RenderPlan, output_path: &Path) -> Result<()> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    write_plan(&mut writer, plan)?;
    writer.flush()?;

    tracing::info!(path = %output_path.display(), calls = plan.len(), "Render plan exported");
    Ok(())
}

/// Écrit le plan en FeatureCollection, dans l'ordre de dessin
pub fn write_plan<W: Write>(writer: &mut W, plan: &RenderPlan) -> Result<()> {
    write!(writer, r#"{{"type":"FeatureCollection""#)?;

    if let Some(base) = plan.iter().find_map(|c| match c {
        DrawCall::Tiles(base) => Some(base),
        DrawCall::Geometry { .. } => None,
    }) {
        write!(writer, r#","tiles":{}"#, tiles_member(base))?;
    }

    write!(writer, r#","features":["#)?;
    let mut first = true;
    for call in plan.iter() {
        let DrawCall::Geometry { id, geometry, style } = call else {
            continue;
        };
        for feature in &geometry.features {
            if !first {
                write!(writer, ",")?;
            }
            first = false;
            write_feature(writer, id, style, feature)?;
        }
    }
    write!(writer, "]}}")?;

    Ok(())
}

fn tiles_member(base: &BaseMap) -> Value {
    json!({ "url": base.url_template, "attribution": base.attribution })
}

/// Écrit une feature stylée
fn write_feature<W: Write>(
    writer: &mut W,
    id: &LayerId,
    style: &PathStyle,
    feature: &Feature,
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    feature.geometry.to_geo().process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    let mut properties = style_properties(id, style);
    for (key, value) in &feature.properties {
        if !STYLE_KEYS.contains(&key.as_str()) {
            properties.insert(key.clone(), value.clone());
        }
    }
    write!(writer, r#","properties":"#)?;
    serde_json::to_writer(&mut *writer, &properties)?;
    write!(writer, "}}")?;

    Ok(())
}

fn style_properties(id: &LayerId, style: &PathStyle) -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    properties.insert("layer".into(), id.as_str().into());
    properties.insert("stroke".into(), style.color.to_string().into());
    properties.insert("stroke-width".into(), style.weight.into());
    properties.insert("fill".into(), style.fill_color.to_string().into());
    properties.insert("fill-opacity".into(), style.fill_opacity.into());
    properties
}
