//! Point d'entrée CLI pour foncier

use anyhow::Result;
use clap::Parser;
use tracing::{debug, Level};
use tracing_subscriber::{fmt, EnvFilter};

use foncier_client::cli::{self, Commands};
use foncier_client::ClientConfig;

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Vérifier un levé topographique et visualiser les conflits fonciers
#[derive(Parser)]
#[command(name = "foncier")]
#[command(author, version)]
#[command(about = "Analyse foncière d'un levé topographique et carte des conflits")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    let config = ClientConfig::from_env();
    debug!(api = %config.api_url, data_dir = %config.data_dir.display(), "Client config");

    match cli.command {
        Commands::Analyze { file } => cli::cmd_analyze(&config, &file).await?,
        Commands::Show => cli::cmd_show(&config)?,
        Commands::Layers { map_config, seed } => {
            cli::cmd_layers(&config, &map_config, seed).await?
        }
        Commands::Render {
            layers,
            output,
            map_config,
            seed,
        } => cli::cmd_render(&config, &layers, &output, &map_config, seed).await?,
        Commands::Report { output } => cli::cmd_report(&config, &output).await?,
        Commands::Chat { message } => cli::cmd_chat(&config, &message.join(" ")).await?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
