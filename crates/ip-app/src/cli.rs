use std::path::PathBuf;

use clap::Parser;

/// imageplayer : affiche, transforme et anime des images sur le plan vidéo.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Nœud du périphérique d'affichage (remplace display.device_path).
    #[arg(long)]
    pub device: Option<String>,

    /// Écrire les frames en PNG dans ce dossier au lieu du périphérique.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Taille de la surface, `LARGEURxHAUTEUR`.
    #[arg(long, value_parser = parse_surface)]
    pub surface: Option<(u32, u32)>,

    /// Fichier de commandes, une par ligne.
    #[arg(long)]
    pub script: Option<PathBuf>,

    /// Commandes exécutées après le script, ex. `"source a.png"` `start`.
    #[arg(trailing_var_arg = true)]
    pub commands: Vec<String>,
}

/// Parse `1920x1080`.
///
/// # Errors
/// Missing separator or non-numeric side.
pub fn parse_surface(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("taille attendue LARGEURxHAUTEUR : {s}"))?;
    let side = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("côté invalide {v:?} : {e}"))
    };
    Ok((side(w)?, side(h)?))
}
