//! Couches visibles superposées à la parcelle
//!
//! Le store associe une clé de couche à sa géométrie récupérée et à sa
//! couleur. Seuls [`LayerStore::activate`] et [`LayerStore::deactivate`]
//! le modifient ; le rendu lit un [`LayerSnapshot`].
//!
//! Chaque activation reçoit un numéro de génération à son lancement. Quand la
//! récupération se termine, le résultat n'est inséré que si aucune activation
//! ou désactivation plus récente n'a eu lieu pour la même clé : la dernière
//! activation lancée gagne, et une récupération obsolète ne peut pas
//! ressusciter une couche désactivée.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::centroid::parcel_centroid;
use crate::error::{FetchError, LayerError};
use crate::types::{Color, FeatureCollection, LayerDescriptor, LayerScope};

/// Paramètres d'une requête spatiale autour de la parcelle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialQuery {
    pub lat: f64,
    pub lon: f64,
    pub radius_m: f64,
}

/// Requête transmise à la capacité de récupération injectée
#[derive(Debug, Clone, PartialEq)]
pub struct LayerRequest {
    pub key: String,
    pub near: Option<SpatialQuery>,
}

impl LayerRequest {
    /// Paramètres de query string (`lat`, `lon`, `radius`) pour les couches spatiales
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self.near {
            Some(q) => vec![
                ("lat", q.lat.to_string()),
                ("lon", q.lon.to_string()),
                ("radius", q.radius_m.to_string()),
            ],
            None => Vec::new(),
        }
    }
}

/// Couche affichée
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleLayer {
    pub key: String,
    pub geometry: Arc<FeatureCollection>,
    pub color: Color,
    pub scope: LayerScope,
}

/// Vue en lecture seule des couches visibles, dans l'ordre d'insertion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerSnapshot {
    entries: Vec<VisibleLayer>,
}

impl LayerSnapshot {
    pub fn iter(&self) -> std::slice::Iter<'_, VisibleLayer> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&VisibleLayer> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a LayerSnapshot {
    type Item = &'a VisibleLayer;
    type IntoIter = std::slice::Iter<'a, VisibleLayer>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Issue d'une activation réussie côté récupération
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Le résultat a été inséré (ou a remplacé l'entrée existante)
    Applied,
    /// Une activation ou désactivation plus récente a eu lieu, résultat ignoré
    Superseded,
}

/// Dernière opération lancée pour une clé
#[derive(Debug, Clone, Copy)]
struct Generation {
    id: u64,
    /// Requête dérivée de la géométrie principale courante
    scoped: bool,
}

#[derive(Debug, Default)]
struct Inner {
    primary: Option<Arc<FeatureCollection>>,
    entries: Vec<VisibleLayer>,
    generations: HashMap<String, Generation>,
    next_generation: u64,
    closed: bool,
}

impl Inner {
    fn bump(&mut self, key: &str, scoped: bool) -> u64 {
        self.next_generation += 1;
        let id = self.next_generation;
        self.generations
            .insert(key.to_string(), Generation { id, scoped });
        id
    }

    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.generations.get(key).map(|g| g.id) == Some(generation)
    }
}

/// Store des couches visibles, partagé par référence entre activations concurrentes
#[derive(Debug, Default)]
pub struct LayerStore {
    inner: Mutex<Inner>,
}

impl LayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store initialisé avec la géométrie principale
    pub fn with_primary(primary: FeatureCollection) -> Self {
        let store = Self::new();
        store.lock().primary = Some(Arc::new(primary));
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn primary(&self) -> Option<Arc<FeatureCollection>> {
        self.lock().primary.clone()
    }

    /// Remplace la géométrie principale
    ///
    /// Les couches spatiales ont été interrogées autour de l'ancien centroïde :
    /// elles sont retirées et leurs récupérations en cours deviennent obsolètes.
    /// Les clés des entrées retirées sont retournées.
    pub fn set_primary(&self, primary: Option<FeatureCollection>) -> Vec<String> {
        let mut inner = self.lock();
        inner.primary = primary.map(Arc::new);

        // Entrées affichées et récupérations en cours interrogées autour de
        // l'ancien centroïde
        let mut invalidated: Vec<String> = inner
            .generations
            .iter()
            .filter(|(_, g)| g.scoped)
            .map(|(key, _)| key.clone())
            .collect();
        invalidated.sort();
        for key in &invalidated {
            inner.bump(key, false);
        }

        let stale: Vec<String> = inner
            .entries
            .iter()
            .filter(|e| matches!(e.scope, LayerScope::AroundParcel { .. }))
            .map(|e| e.key.clone())
            .collect();
        inner
            .entries
            .retain(|e| !matches!(e.scope, LayerScope::AroundParcel { .. }));

        if !invalidated.is_empty() {
            debug!(
                evicted = ?stale,
                invalidated = ?invalidated,
                "Primary geometry changed, scoped layers evicted"
            );
        }
        stale
    }

    /// Active une couche : résout la requête, récupère la géométrie, l'insère
    ///
    /// Le store n'est jamais modifié en cas d'échec (pré-requis manquant ou
    /// récupération en erreur).
    pub async fn activate<F, Fut, E>(
        &self,
        layer: &LayerDescriptor,
        fetch: F,
    ) -> Result<Activation, LayerError>
    where
        F: FnOnce(LayerRequest) -> Fut,
        Fut: Future<Output = Result<FeatureCollection, E>>,
        E: Into<FetchError>,
    {
        let (request, generation) = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(LayerError::Closed);
            }
            let request = resolve_request(layer, inner.primary.as_deref())?;
            let scoped = request.near.is_some();
            (request, inner.bump(&layer.key, scoped))
        };

        debug!(key = %layer.key, generation, near = ?request.near, "Activating layer");
        let fetched = fetch(request).await;

        let mut inner = self.lock();
        if inner.closed {
            debug!(key = %layer.key, generation, "Store closed, fetch result discarded");
            return Err(LayerError::Closed);
        }

        let geometry = fetched.map_err(|e| LayerError::Fetch {
            key: layer.key.clone(),
            source: e.into(),
        })?;

        if !inner.is_current(&layer.key, generation) {
            warn!(key = %layer.key, generation, "Superseded layer fetch discarded");
            return Ok(Activation::Superseded);
        }

        let entry = VisibleLayer {
            key: layer.key.clone(),
            geometry: Arc::new(geometry),
            color: layer.color,
            scope: layer.scope,
        };
        match inner.entries.iter_mut().find(|e| e.key == layer.key) {
            Some(existing) => *existing = entry,
            None => inner.entries.push(entry),
        }

        debug!(key = %layer.key, generation, visible = inner.entries.len(), "Layer activated");
        Ok(Activation::Applied)
    }

    /// Retire une couche ; sans effet si elle n'est pas affichée
    ///
    /// Toute activation en cours pour cette clé devient obsolète. Retourne
    /// vrai si une entrée a été retirée.
    pub fn deactivate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.bump(key, false);

        let before = inner.entries.len();
        inner.entries.retain(|e| e.key != key);
        let removed = inner.entries.len() != before;

        debug!(key, removed, "Layer deactivated");
        removed
    }

    /// Copie de l'état courant pour le rendu
    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            entries: self.lock().entries.clone(),
        }
    }

    /// Ferme la vue : les entrées sont détruites et toute récupération qui se
    /// termine ensuite est ignorée
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.entries.clear();
        debug!("Layer store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// Calcule la requête de récupération d'une couche
fn resolve_request(
    layer: &LayerDescriptor,
    primary: Option<&FeatureCollection>,
) -> Result<LayerRequest, LayerError> {
    let near = match layer.scope {
        LayerScope::Global => None,
        LayerScope::AroundParcel { radius_m } => {
            let primary = primary.ok_or_else(|| LayerError::MissingPrerequisite {
                key: layer.key.clone(),
                reason: "primary parcel geometry is not loaded",
            })?;
            let center =
                parcel_centroid(Some(primary)).ok_or_else(|| LayerError::MissingPrerequisite {
                    key: layer.key.clone(),
                    reason: "parcel centroid is unavailable",
                })?;
            Some(SpatialQuery {
                lat: center.lat,
                lon: center.lon,
                radius_m,
            })
        }
    };

    Ok(LayerRequest {
        key: layer.key.clone(),
        near,
    })
}
