//! Vue des résultats : parcelle, couches activables, cadrage et rendu
//!
//! La vue possède son store de couches. Les activations peuvent être lancées
//! en parallèle (`&self`), le cadrage demande un accès exclusif à la vue.

use std::future::Future;

use foncier::palette::assign_colors;
use foncier::{
    Activation, AnalysisResult, AnalysisSummary, AutoFit, FeatureCollection, FetchError,
    FitOutcome, LayerDescriptor, LayerError, LayerInfo, LayerRequest, LayerStore, RenderPlan,
    Renderer, Viewport,
};
use futures::future::join_all;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::BackendClient;
use crate::config::MapConfig;

/// Erreurs de bascule d'une couche
#[derive(Debug, Error)]
pub enum ToggleError {
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),

    #[error(transparent)]
    Layer(#[from] LayerError),
}

/// État de la vue des résultats
#[derive(Debug)]
pub struct ResultsView {
    result: AnalysisResult,
    summary: AnalysisSummary,
    layers: Vec<LayerDescriptor>,
    store: LayerStore,
    auto_fit: AutoFit,
    viewport: Viewport,
    renderer: Renderer,
}

impl ResultsView {
    /// Ouvre la vue sur un résultat validé et le catalogue des couches
    pub fn open<R: Rng>(
        result: AnalysisResult,
        catalog: &[LayerInfo],
        config: &MapConfig,
        rng: &mut R,
    ) -> Self {
        let layers = assign_colors(catalog, &config.scoped_layers, rng);
        let summary = AnalysisSummary::from_result(&result);
        info!(
            image_id = %result.image_id,
            status = %summary.status,
            layers = layers.len(),
            "Results view opened"
        );

        Self {
            store: LayerStore::with_primary(result.geometry.clone()),
            summary,
            layers,
            result,
            auto_fit: AutoFit::new(config.auto_fit()),
            viewport: config.viewport(),
            renderer: Renderer::new(config.base_map()),
        }
    }

    pub fn result(&self) -> &AnalysisResult {
        &self.result
    }

    pub fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }

    pub fn layer(&self, key: &str) -> Option<&LayerDescriptor> {
        self.layers.iter().find(|l| l.key == key)
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn store(&self) -> &LayerStore {
        &self.store
    }

    /// Remplace le résultat affiché
    ///
    /// Les couches spatiales sont retirées ; le prochain `fit` recadre.
    pub fn replace_result(&mut self, result: AnalysisResult) -> Vec<String> {
        let evicted = self.store.set_primary(Some(result.geometry.clone()));
        self.summary = AnalysisSummary::from_result(&result);
        self.result = result;
        evicted
    }

    /// Cadre la vue si la géométrie principale a changé
    pub async fn fit(&mut self) -> FitOutcome {
        let primary = self.store.primary();
        self.auto_fit
            .sync(primary.as_deref(), &mut self.viewport)
            .await
    }

    /// Affiche ou masque une couche du catalogue
    ///
    /// Masquer retourne `Ok(None)`, y compris pour une couche déjà masquée.
    pub async fn toggle<F, Fut, E>(
        &self,
        key: &str,
        visible: bool,
        fetch: F,
    ) -> Result<Option<Activation>, ToggleError>
    where
        F: FnOnce(LayerRequest) -> Fut,
        Fut: Future<Output = Result<FeatureCollection, E>>,
        E: Into<FetchError>,
    {
        let layer = self
            .layer(key)
            .ok_or_else(|| ToggleError::UnknownLayer(key.to_string()))?;

        if !visible {
            self.store.deactivate(key);
            return Ok(None);
        }

        Ok(Some(self.store.activate(layer, fetch).await?))
    }

    /// Affiche plusieurs couches en parallèle depuis le backend
    ///
    /// Chaque échec est rapporté sans interrompre les autres activations.
    pub async fn show_layers(
        &self,
        client: &BackendClient,
        keys: &[String],
    ) -> Vec<(String, Result<Option<Activation>, ToggleError>)> {
        let tasks = keys.iter().map(|key| async move {
            let outcome = self
                .toggle(key, true, |request| client.layer_data(request))
                .await;
            if let Err(e) = &outcome {
                warn!(key = %key, error = %e, "Layer could not be shown");
            }
            (key.clone(), outcome)
        });
        join_all(tasks).await
    }

    /// Plan de rendu de l'état courant
    pub fn render(&self) -> RenderPlan {
        self.renderer
            .render(self.store.primary().as_ref(), &self.store.snapshot())
    }

    /// Quitte la vue : les récupérations encore en cours seront ignorées
    pub fn close(&self) {
        debug!(image_id = %self.result.image_id, "Results view closed");
        self.store.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foncier::{validate, Feature, Geometry, LayerId, LayerScope, Position};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn result(image_id: &str, lon: f64) -> AnalysisResult {
        let payload = json!({
            "image_id": image_id,
            "geojson": {
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[
                            [lon, 6.3703], [lon + 0.0008, 6.3703],
                            [lon + 0.0008, 6.3710], [lon, 6.3710], [lon, 6.3703]
                        ]]
                    },
                    "properties": { "type": "parcel_boundary" }
                }]
            },
            "overlaps": [
                { "layer_name": "Titres Fonciers", "overlapping_count": 1 },
                { "layer_name": "Aires protégées", "overlapping_count": 0 }
            ]
        });
        validate::analysis_result(&payload).unwrap()
    }

    fn catalog() -> Vec<LayerInfo> {
        vec![
            LayerInfo { key: "aif".into(), name: "Titres Fonciers".into() },
            LayerInfo { key: "parcelles".into(), name: "Parcelles".into() },
        ]
    }

    fn view() -> ResultsView {
        let mut config = MapConfig::default();
        config.settle_ms = 0;
        ResultsView::open(
            result("leve-1", 2.3912),
            &catalog(),
            &config,
            &mut StdRng::seed_from_u64(7),
        )
    }

    fn layer_data() -> FeatureCollection {
        FeatureCollection::new(vec![Feature::new(Geometry::Point(Position::new(2.3915, 6.3705)))])
    }

    #[test]
    fn test_open_builds_summary_and_layers() {
        let view = view();
        assert_eq!(view.summary().details.len(), 1);
        assert_eq!(view.layers().len(), 2);
        assert!(matches!(
            view.layer("parcelles").unwrap().scope,
            LayerScope::AroundParcel { radius_m } if radius_m == 1000.0
        ));
        assert_eq!(view.render().layer_ids(), vec![&LayerId::Primary]);
    }

    #[tokio::test]
    async fn test_fit_applies_zoom_floor_once() {
        let mut view = view();
        match view.fit().await {
            FitOutcome::Fitted { zoom, .. } => assert!(zoom >= 18.0),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(view.fit().await, FitOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_toggle_on_and_off() {
        let view = view();

        let outcome = view
            .toggle("parcelles", true, |request| async move {
                assert!(request.near.is_some());
                Ok::<_, FetchError>(layer_data())
            })
            .await
            .unwrap();
        assert_eq!(outcome, Some(Activation::Applied));
        assert_eq!(view.render().len(), 3);

        let outcome = view
            .toggle("parcelles", false, |_| async { Ok::<_, FetchError>(layer_data()) })
            .await
            .unwrap();
        assert_eq!(outcome, None);
        assert_eq!(view.render().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_layer_and_fetch_failure() {
        let view = view();

        let err = view
            .toggle("inconnue", true, |_| async { Ok::<_, FetchError>(layer_data()) })
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::UnknownLayer(_)));

        let err = view
            .toggle("aif", true, |_| async {
                Err::<FeatureCollection, FetchError>("HTTP 500".into())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::Layer(LayerError::Fetch { .. })));
        assert!(view.store().snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_replace_result_evicts_scoped_layers_and_refits() {
        let mut view = view();
        view.fit().await;
        for key in ["aif", "parcelles"] {
            view.toggle(key, true, |_| async { Ok::<_, FetchError>(layer_data()) })
                .await
                .unwrap();
        }

        let evicted = view.replace_result(result("leve-2", 2.4000));
        assert_eq!(evicted, vec!["parcelles".to_string()]);
        assert_eq!(view.store().snapshot().keys().collect::<Vec<_>>(), vec!["aif"]);
        assert!(matches!(view.fit().await, FitOutcome::Fitted { .. }));
        assert_eq!(view.result().image_id, "leve-2");
    }

    #[tokio::test]
    async fn test_closed_view_rejects_activation() {
        let view = view();
        view.close();
        let err = view
            .toggle("aif", true, |_| async { Ok::<_, FetchError>(layer_data()) })
            .await
            .unwrap_err();
        assert!(matches!(err, ToggleError::Layer(LayerError::Closed)));
    }
}
