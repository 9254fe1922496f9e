//! Attribution des couleurs de couches
//!
//! Une couleur aléatoire par couche, tirée une fois au chargement du
//! catalogue. Le générateur est injecté : `StdRng::seed_from_u64` rend les
//! couleurs reproductibles dans les tests.

use std::collections::HashMap;

use rand::Rng;

use crate::types::{Color, LayerDescriptor, LayerInfo, LayerScope};

/// Tire une couleur uniforme dans `#000000..=#ffffff`
pub fn random_color<R: Rng>(rng: &mut R) -> Color {
    Color(rng.random_range(0..=0xff_ffff))
}

/// Construit les descripteurs de couches à partir du catalogue backend
///
/// `scoped` associe une clé de couche au rayon (mètres) de la requête
/// spatiale autour de la parcelle. Les doublons de clé sont ignorés (la
/// première occurrence est conservée).
pub fn assign_colors<R: Rng>(
    catalog: &[LayerInfo],
    scoped: &HashMap<String, f64>,
    rng: &mut R,
) -> Vec<LayerDescriptor> {
    let mut seen = std::collections::HashSet::new();
    let mut layers = Vec::with_capacity(catalog.len());

    for info in catalog {
        if !seen.insert(info.key.as_str()) {
            tracing::warn!(key = %info.key, "Duplicate layer key in catalog, ignored");
            continue;
        }
        let scope = scoped
            .get(&info.key)
            .map_or(LayerScope::Global, |&radius_m| LayerScope::AroundParcel { radius_m });
        layers.push(LayerDescriptor {
            key: info.key.clone(),
            name: info.name.clone(),
            color: random_color(rng),
            scope,
        });
    }

    layers
}
