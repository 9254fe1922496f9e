//! Tests d'intégration sur des payloads d'analyse réalistes

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use foncier::palette::assign_colors;
use foncier::{
    parse_analysis_result, Activation, AutoFit, AutoFitConfig, DrawCall, FeatureCollection,
    FetchError, FitOutcome, LatLon, LayerId, LayerInfo, LayerStore, ParcelStatus, Renderer,
    Viewport,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fixtures(prefix: &str) -> Vec<PathBuf> {
    let pattern = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{}_*.json", prefix));
    glob::glob(&pattern.to_string_lossy())
        .unwrap()
        .filter_map(|e| e.ok())
        .collect()
}

fn load(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn test_valid_fixtures_pass() {
    let files = fixtures("valid");
    assert!(!files.is_empty(), "No valid fixtures found");

    for path in files {
        let json = std::fs::read_to_string(&path).unwrap();
        if let Err(e) = parse_analysis_result(&json) {
            panic!("{} should pass: {}", path.display(), e);
        }
    }
}

#[test]
fn test_invalid_fixtures_fail() {
    let files = fixtures("invalid");
    assert!(!files.is_empty(), "No invalid fixtures found");

    for path in files {
        let json = std::fs::read_to_string(&path).unwrap();
        assert!(
            parse_analysis_result(&json).is_err(),
            "{} should fail",
            path.display()
        );
    }
}

#[tokio::test]
async fn test_results_view_with_two_conflicts() {
    let result = parse_analysis_result(&load("valid_conflicts.json")).unwrap();

    // Statut et détails
    let summary = foncier::AnalysisSummary::from_result(&result);
    assert_eq!(summary.status, ParcelStatus::ConflictsDetected);
    let details: Vec<(&str, u64)> = summary
        .details
        .iter()
        .map(|d| (d.layer_name.as_str(), d.overlapping_count))
        .collect();
    assert_eq!(details, vec![("Titres Fonciers", 1), ("Aires protégées", 1)]);

    // Catalogue et couleurs reproductibles
    let catalog = vec![
        LayerInfo { key: "aif".into(), name: "Titres Fonciers".into() },
        LayerInfo { key: "parcelles".into(), name: "Parcelles voisines".into() },
    ];
    let scoped: HashMap<String, f64> = [("parcelles".to_string(), 1000.0)].into_iter().collect();
    let layers = assign_colors(&catalog, &scoped, &mut StdRng::seed_from_u64(42));

    // Activation des deux couches en parallèle
    let store = LayerStore::with_primary(result.geometry.clone());
    let fetch = |req: foncier::LayerRequest| async move {
        if req.key == "parcelles" {
            let near = req.near.expect("scoped layer needs a center");
            assert!((near.lat - 6.37065).abs() < 1e-9);
            assert!((near.lon - 2.3916).abs() < 1e-9);
            assert_eq!(near.radius_m, 1000.0);
        }
        Ok::<_, FetchError>(FeatureCollection::default())
    };
    let (a, b) = tokio::join!(store.activate(&layers[0], fetch), store.activate(&layers[1], fetch));
    assert_eq!(a.unwrap(), Activation::Applied);
    assert_eq!(b.unwrap(), Activation::Applied);

    // Rendu : fond, parcelle, puis couches dans l'ordre d'insertion
    let plan = Renderer::default().render(store.primary().as_ref(), &store.snapshot());
    assert!(matches!(plan.calls[0], DrawCall::Tiles(_)));
    assert_eq!(plan.layer_ids()[0], &LayerId::Primary);
    assert_eq!(plan.layer_ids().len(), 3);

    // Cadrage
    let mut map = Viewport::new(LatLon { lat: 9.3077, lon: 2.3158 }, 8.0, 800.0, 600.0);
    let mut fit = AutoFit::new(AutoFitConfig {
        settle: Duration::ZERO,
        ..AutoFitConfig::default()
    });
    let outcome = fit.sync(Some(&result.geometry), &mut map).await;
    assert!(matches!(outcome, FitOutcome::Fitted { zoom, .. } if zoom >= 18.0));
    assert!((map.center.lon - 2.3916).abs() < 1e-6);
    assert_eq!(fit.sync(Some(&result.geometry), &mut map).await, FitOutcome::Unchanged);
}

#[test]
fn test_clean_fixture_status() {
    let result = parse_analysis_result(&load("valid_clean.json")).unwrap();
    let summary = foncier::AnalysisSummary::from_result(&result);
    assert_eq!(summary.status, ParcelStatus::Clean);
    assert!(summary.details.is_empty());
}

#[test]
fn test_multipolygon_fixture_centroid() {
    let result = parse_analysis_result(&load("valid_multipolygon.json")).unwrap();
    let center = foncier::parcel_centroid(Some(&result.geometry)).unwrap();
    assert!((center.lat - 6.0005).abs() < 1e-9);
    assert!((center.lon - 2.0005).abs() < 1e-9);
}
