use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ip_core::config::PlayerConfig;
use ip_core::traits::{FrameSink, ZoomControl};
use ip_player::{ImagePlayer, Session};
use ip_render::{DeviceSink, DirectorySink, MemoryZoom, SysfsZoom};

pub mod cli;
pub mod script;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config, puis les overrides CLI
    let mut config = resolve_config(&cli)?;
    if let Some((w, h)) = cli.surface {
        config.surface_width = w;
        config.surface_height = h;
    }
    if let Some(device) = &cli.device {
        config.device_path.clone_from(device);
    }
    config.clamp_all();

    // 4. Commandes : script d'abord, puis la ligne de commande
    let mut commands = Vec::new();
    if let Some(path) = &cli.script {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        commands.extend(
            script::parse_script(&text).with_context(|| format!("Script {}", path.display()))?,
        );
    }
    for line in &cli.commands {
        if let Some(cmd) = script::parse_line(line)? {
            commands.push(cmd);
        }
    }
    if commands.is_empty() {
        anyhow::bail!("Aucune commande. Exemple : imageplayer init \"source photo.jpg\" start");
    }

    // 5. Session et lecteur
    let (sink, zoom) = outputs(&config, cli.out_dir.clone());
    log::info!("sink {}, surface {}×{}", sink.name(), config.surface_width, config.surface_height);
    let mut player = ImagePlayer::new(Session::from_config(config, sink, zoom));

    // 6. Exécution
    let mut failed = 0usize;
    for cmd in &commands {
        let code = script::execute(&mut player, cmd);
        println!("{cmd:?} → {code}");
        if !code.is_ok() {
            failed += 1;
        }
    }
    drop(player);

    if failed > 0 {
        anyhow::bail!("{failed} commande(s) en échec sur {}", commands.len());
    }
    Ok(())
}

/// Device node and sysfs zoom, or a PNG directory with an in-memory zoom.
fn outputs(
    config: &PlayerConfig,
    out_dir: Option<PathBuf>,
) -> (Box<dyn FrameSink>, Box<dyn ZoomControl>) {
    match out_dir {
        Some(dir) => (
            Box::new(DirectorySink::new(dir)),
            Box::new(MemoryZoom::new(config.zoom_baseline)),
        ),
        None => (
            Box::new(DeviceSink::new(&config.device_path)),
            Box::new(SysfsZoom::new(&config.zoom_path, &config.axis_path)),
        ),
    }
}

fn resolve_config(cli: &cli::Cli) -> Result<PlayerConfig> {
    if cli.config.exists() {
        ip_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(PlayerConfig::default())
    }
}
