//! Définition et implémentation des commandes CLI
//!
//! - `analyze` : envoie un levé, stocke le résultat
//! - `show` : résumé du résultat stocké
//! - `layers` : catalogue des couches et couleurs attribuées
//! - `render` : cadrage + couches demandées → GeoJSON stylé
//! - `report` : télécharge le rapport PDF
//! - `chat` : question à l'assistant

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use foncier::palette::assign_colors;
use foncier::{AnalysisSummary, FitOutcome, LayerScope};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::api::{Analysis, BackendClient};
use crate::chat::{clean_reply, prepare_message, ERROR_REPLY, FALLBACK_REPLY};
use crate::config::{ClientConfig, MapConfig};
use crate::export::export_plan;
use crate::report::{save_report, DEFAULT_REPORT_NAME};
use crate::session::ResultsView;
use crate::storage::ResultSlot;
use crate::upload::Upload;

#[derive(Subcommand)]
pub enum Commands {
    /// Upload a survey (pdf, jpeg, png) and store the analysis result
    Analyze {
        /// Path to the survey file
        file: PathBuf,
    },

    /// Show the summary of the stored analysis result
    Show,

    /// List available layers with their assigned colors
    Layers {
        /// Map config preset (default/osm) or path to a JSON config
        #[arg(long, default_value = "default")]
        map_config: String,

        /// Seed for color assignment (reproducible colors)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Fit the map on the stored parcel, overlay layers and export the render plan
    Render {
        /// Layer key to overlay (repeatable)
        #[arg(short, long = "layer")]
        layers: Vec<String>,

        /// Output GeoJSON file
        #[arg(short, long, default_value = "render.geojson")]
        output: PathBuf,

        /// Map config preset (default/osm) or path to a JSON config
        #[arg(long, default_value = "default")]
        map_config: String,

        /// Seed for color assignment (reproducible colors)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Download the PDF report of the stored analysis result
    Report {
        /// Output PDF file
        #[arg(short, long, default_value = DEFAULT_REPORT_NAME)]
        output: PathBuf,
    },

    /// Ask the land assistant a question
    Chat {
        /// Question text
        #[arg(required = true)]
        message: Vec<String>,
    },
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Analyse stockée, ou erreur invitant à refaire l'upload
fn stored_analysis(config: &ClientConfig) -> Result<Analysis> {
    let slot = ResultSlot::new(&config.data_dir);
    slot.load().with_context(|| {
        format!(
            "No valid analysis result in {}. Run `foncier analyze <file>` first",
            slot.path().display()
        )
    })
}

fn print_summary(summary: &AnalysisSummary) {
    println!("=== Analyse {} ===", summary.image_id);
    println!("{}", summary);
}

/// Exécute la commande analyze
pub async fn cmd_analyze(config: &ClientConfig, file: &Path) -> Result<()> {
    let upload = Upload::from_path(file)
        .context(format!("Cannot upload {}", file.display()))?;

    let client = BackendClient::new(config)?;
    let analysis = client.analyze(&upload).await.context("Analysis failed")?;

    let slot = ResultSlot::new(&config.data_dir);
    slot.store(&analysis)?;
    info!(image_id = %analysis.result.image_id, path = %slot.path().display(), "Analysis stored");

    print_summary(&AnalysisSummary::from_result(&analysis.result));
    Ok(())
}

/// Exécute la commande show
pub fn cmd_show(config: &ClientConfig) -> Result<()> {
    let analysis = stored_analysis(config)?;
    print_summary(&AnalysisSummary::from_result(&analysis.result));
    Ok(())
}

/// Exécute la commande layers
pub async fn cmd_layers(config: &ClientConfig, map_config: &str, seed: Option<u64>) -> Result<()> {
    let map = MapConfig::resolve(map_config)?;
    let client = BackendClient::new(config)?;
    let catalog = client.layers_info().await.context("Failed to load layer catalog")?;

    let layers = assign_colors(&catalog, &map.scoped_layers, &mut rng(seed));
    println!("=== Layers ({}) ===", layers.len());
    for layer in &layers {
        let scope = match layer.scope {
            LayerScope::Global => String::new(),
            LayerScope::AroundParcel { radius_m } => format!(" (rayon {} m)", radius_m),
        };
        println!("  {} {:<20} {}{}", layer.color, layer.key, layer.name, scope);
    }
    Ok(())
}

/// Exécute la commande render
pub async fn cmd_render(
    config: &ClientConfig,
    layers: &[String],
    output: &Path,
    map_config: &str,
    seed: Option<u64>,
) -> Result<()> {
    let map = MapConfig::resolve(map_config)?;
    let analysis = stored_analysis(config)?;
    let client = BackendClient::new(config)?;

    let catalog = if layers.is_empty() {
        Vec::new()
    } else {
        client.layers_info().await.context("Failed to load layer catalog")?
    };

    let mut view = ResultsView::open(analysis.result, &catalog, &map, &mut rng(seed));
    match view.fit().await {
        FitOutcome::Fitted { fitted_zoom, zoom } => {
            let center = view.viewport().center;
            println!(
                "Viewport: center {:.6}, {:.6} zoom {} (fit {})",
                center.lat, center.lon, zoom, fitted_zoom
            );
        }
        FitOutcome::Skipped(reason) => warn!(?reason, "Viewport not fitted"),
        FitOutcome::Unchanged => {}
    }

    let mut failed = 0usize;
    for (key, outcome) in view.show_layers(&client, layers).await {
        match outcome {
            Ok(_) => println!("  + {}", key),
            Err(e) => {
                failed += 1;
                println!("  ! {}: {}", key, e);
            }
        }
    }

    let plan = view.render();
    view.close();
    export_plan(&plan, output)?;

    println!(
        "Render plan: {} draw calls → {}",
        plan.len(),
        output.display()
    );
    if failed > 0 {
        warn!(failed, "Some layers could not be shown");
    }
    Ok(())
}

/// Exécute la commande report
pub async fn cmd_report(config: &ClientConfig, output: &Path) -> Result<()> {
    let analysis = stored_analysis(config)?;
    let client = BackendClient::new(config)?;

    let pdf = client
        .generate_report(&analysis)
        .await
        .context("Report generation failed")?;
    save_report(output, &pdf)?;

    println!("Report saved: {}", output.display());
    Ok(())
}

/// Exécute la commande chat
///
/// Les erreurs du backend ne font pas échouer la commande : un message
/// d'excuse est affiché à la place.
pub async fn cmd_chat(config: &ClientConfig, message: &str) -> Result<()> {
    let Some(message) = prepare_message(message) else {
        anyhow::bail!("Empty message");
    };
    let client = BackendClient::new(config)?;

    let reply = match client.chat(message).await {
        Ok(Some(reply)) => clean_reply(&reply),
        Ok(None) => FALLBACK_REPLY.to_string(),
        Err(e) => {
            warn!(error = %e, "Chat request failed");
            ERROR_REPLY.to_string()
        }
    };

    println!("{}", reply);
    Ok(())
}
