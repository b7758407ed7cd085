//! Spellcast replay runner.
//!
//! Feeds a recorded tick script through the casting engine and prints each
//! event as an s-expression, one per line.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use spellcast::cast::{loader, CastConfig, CastCoordinator, TemplateLibrary};
use spellcast::replay::{self, Script};

#[derive(Parser, Debug)]
#[command(name = "spellcast", about = "Replay hand-tracking scripts through the spell matcher")]
struct Cli {
    /// Tick script to replay
    #[arg(long)]
    script: Option<PathBuf>,

    /// Template library file (default: builtin catalog)
    #[arg(long)]
    templates: Option<PathBuf>,

    /// Tick length for frames without :dt
    #[arg(long, default_value_t = 11.1)]
    dt_ms: f64,

    /// Print the final engine status after the replay
    #[arg(long)]
    status: bool,

    /// Show version and exit
    #[arg(long)]
    version: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("spellcast {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spellcast=info".into()),
        )
        .init();

    let Some(script_path) = cli.script else {
        anyhow::bail!("no script given; pass --script FILE");
    };

    let library = match &cli.templates {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading templates {}", path.display()))?;
            loader::library_from_str(&raw)
                .with_context(|| format!("loading templates {}", path.display()))?
        }
        None => TemplateLibrary::builtin(),
    };

    let raw = std::fs::read_to_string(&script_path)
        .with_context(|| format!("reading script {}", script_path.display()))?;
    let script = Script::parse(&raw)
        .with_context(|| format!("parsing script {}", script_path.display()))?;

    let mut config = CastConfig::default();
    script.apply_config(&mut config);
    info!(
        "replaying {} ticks from {}",
        script.tick_count(),
        script_path.display()
    );

    let mut coordinator = CastCoordinator::new(library, config);
    for event in replay::run(&mut coordinator, &script, cli.dt_ms) {
        println!("{}", event.to_sexp());
    }

    if cli.status {
        println!("{}", coordinator.status_sexp());
        println!("{}", coordinator.config.config_sexp());
    }
    Ok(())
}
