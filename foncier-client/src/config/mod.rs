//! Configuration du client

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use foncier::{AutoFitConfig, BaseMap, LatLon, Viewport};

/// Configuration de la carte des résultats
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    /// Zoom plancher après cadrage
    pub min_zoom: f64,

    /// Zoom maximal des tuiles
    pub max_zoom: f64,

    /// Marge en pixels autour de la parcelle
    #[serde(default = "default_padding")]
    pub padding: f64,

    /// Délai (ms) avant d'appliquer le zoom plancher
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Taille de la vue en pixels
    pub width: f64,
    pub height: f64,

    /// Centre initial [lat, lon]
    pub center: [f64; 2],

    /// Zoom initial
    pub zoom: f64,

    pub tiles: TilesConfig,

    /// Couches interrogées autour de la parcelle : clé → rayon en mètres
    #[serde(default)]
    pub scoped_layers: HashMap<String, f64>,
}

/// Fond de carte
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TilesConfig {
    pub url: String,
    pub attribution: String,
}

fn default_padding() -> f64 {
    50.0
}

fn default_settle_ms() -> u64 {
    100
}

impl MapConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_json::from_str(&content).context("Failed to parse config JSON")?;
        config.check()
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "default" => Self::load_embedded(include_str!("presets/default.json")),
            "osm" => Self::load_embedded(include_str!("presets/osm.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: default, osm", preset),
        }
    }

    /// Preset si le nom est connu, sinon chemin vers un fichier JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        match spec {
            "default" | "osm" => Self::from_preset(spec),
            path => Self::load(Path::new(path)),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse embedded config")?;
        config.check()
    }

    fn check(self) -> Result<Self> {
        let numbers = [
            ("min_zoom", self.min_zoom),
            ("max_zoom", self.max_zoom),
            ("zoom", self.zoom),
            ("padding", self.padding),
            ("width", self.width),
            ("height", self.height),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{} must be a finite non-negative number, got {}", name, value);
            }
        }
        if !self.center.iter().all(|c| c.is_finite()) {
            anyhow::bail!("center must be finite, got {:?}", self.center);
        }
        if let Some((key, radius)) = self
            .scoped_layers
            .iter()
            .find(|(_, r)| !r.is_finite() || **r <= 0.0)
        {
            anyhow::bail!("Radius for scoped layer {} must be positive, got {}", key, radius);
        }
        if self.max_zoom < self.min_zoom {
            anyhow::bail!(
                "max_zoom ({}) must not be below min_zoom ({})",
                self.max_zoom,
                self.min_zoom
            );
        }
        if self.width <= 2.0 * self.padding || self.height <= 2.0 * self.padding {
            anyhow::bail!(
                "Viewport {}x{} is too small for a {}px padding",
                self.width,
                self.height,
                self.padding
            );
        }
        Ok(self)
    }

    pub fn auto_fit(&self) -> AutoFitConfig {
        AutoFitConfig {
            min_zoom: self.min_zoom,
            padding: self.padding,
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    /// Vue initiale (avant cadrage)
    pub fn viewport(&self) -> Viewport {
        Viewport::new(
            LatLon {
                lat: self.center[0],
                lon: self.center[1],
            },
            self.zoom,
            self.width,
            self.height,
        )
        .with_zoom_limits(0.0, self.max_zoom)
    }

    pub fn base_map(&self) -> BaseMap {
        BaseMap {
            url_template: self.tiles.url.clone(),
            attribution: self.tiles.attribution.clone(),
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            min_zoom: 18.0,
            max_zoom: 20.0,
            padding: default_padding(),
            settle_ms: default_settle_ms(),
            width: 800.0,
            height: 600.0,
            center: [9.3077, 2.3158],
            zoom: 8.0,
            tiles: TilesConfig {
                url: BaseMap::default().url_template,
                attribution: BaseMap::default().attribution,
            },
            scoped_layers: [("parcelles".to_string(), 1000.0)].into_iter().collect(),
        }
    }
}

/// Connexion au backend et stockage local
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_url: String,
    pub chat_url: String,
    pub data_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5001".into(),
            chat_url: "http://localhost:5001".into(),
            data_dir: PathBuf::from(".foncier"),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let api_url = std::env::var("FONCIER_API_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "http://localhost:5001".into());
        Self {
            chat_url: std::env::var("FONCIER_CHAT_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| api_url.clone()),
            api_url,
            data_dir: std::env::var("FONCIER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".foncier")),
            timeout: std::env::var("FONCIER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(60)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_load() {
        let config = MapConfig::from_preset("default").unwrap();
        assert_eq!(config.min_zoom, 18.0);
        assert_eq!(config.scoped_layers.get("parcelles"), Some(&1000.0));
        assert!(MapConfig::from_preset("osm").is_ok());
        assert!(MapConfig::from_preset("unknown").is_err());
    }

    #[test]
    fn test_default_matches_preset() {
        let preset = MapConfig::from_preset("default").unwrap();
        let default = MapConfig::default();
        assert_eq!(preset.auto_fit(), default.auto_fit());
        assert_eq!(preset.base_map(), default.base_map());
    }

    #[test]
    fn test_rejects_inverted_zoom_limits() {
        let mut config = MapConfig::default();
        config.max_zoom = 17.0;
        assert!(config.check().is_err());
    }

    #[test]
    fn test_rejects_non_finite_numbers() {
        let mut config = MapConfig::default();
        config.zoom = f64::NAN;
        assert!(config.check().is_err());

        let mut config = MapConfig::default();
        config.min_zoom = f64::NAN;
        assert!(config.check().is_err());

        let mut config = MapConfig::default();
        config.max_zoom = f64::INFINITY;
        assert!(config.check().is_err());

        let mut config = MapConfig::default();
        config.center = [f64::NAN, 2.3];
        assert!(config.check().is_err());
    }

    #[test]
    fn test_rejects_non_positive_radius() {
        for radius in [0.0, -500.0, f64::NAN] {
            let mut config = MapConfig::default();
            config.scoped_layers.insert("parcelles".into(), radius);
            assert!(config.check().is_err(), "radius {} accepted", radius);
        }

        let mut config = MapConfig::default();
        config.scoped_layers.insert("parcelles".into(), 250.0);
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("foncier_map_config_test.json");
        let mut config = MapConfig::default();
        config.min_zoom = 16.0;
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        let loaded = MapConfig::resolve(path.to_str().unwrap()).unwrap();
        assert_eq!(loaded.min_zoom, 16.0);

        std::fs::remove_file(path).ok();
    }
}
