use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::frame::{CropRect, LayerFormat, SURFACE_MAX_HEIGHT, SURFACE_MAX_WIDTH, SurfaceTarget};

/// Configuration complète du lecteur d'images.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use ip_core::config::PlayerConfig;
/// let config = PlayerConfig::default();
/// assert_eq!(config.frame_interval_ms, 100);
/// assert_eq!(config.surface().width, 3840);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PlayerConfig {
    // === Affichage ===
    /// Largeur de la surface [1, 3840].
    pub surface_width: u32,
    /// Hauteur de la surface [1, 2160].
    pub surface_height: u32,
    /// Format des frames envoyées au périphérique.
    pub layer_format: LayerFormat,
    /// Nœud du périphérique d'affichage.
    pub device_path: String,

    // === Décodage ===
    /// Dimension maximale (largeur ou hauteur) d'une image décodée.
    pub max_picture_size: u32,
    /// Paramètres appliqués juste après le décodage.
    pub initial: InitialParams,

    // === Animation ===
    /// Intervalle entre deux frames animées, en millisecondes [10, 10000].
    pub frame_interval_ms: u64,

    // === Zoom matériel ===
    /// Fichier sysfs du zoom.
    pub zoom_path: String,
    /// Fichier sysfs de l'axe du plan vidéo.
    pub axis_path: String,
    /// Zoom minimal en pourcent.
    pub zoom_min: u32,
    /// Zoom maximal en pourcent.
    pub zoom_max: u32,
    /// Zoom neutre, rétabli à chaque `post`.
    pub zoom_baseline: u32,
}

/// Transformation appliquée à chaque image fraîchement décodée.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InitialParams {
    /// Rotation en degrés.
    pub degrees: f32,
    /// Facteur d'échelle horizontal.
    pub scale_x: f32,
    /// Facteur d'échelle vertical.
    pub scale_y: f32,
    /// Recadrage optionnel, appliqué après rotation/échelle.
    #[serde(default)]
    pub crop: Option<CropRect>,
}

impl Default for InitialParams {
    fn default() -> Self {
        Self {
            degrees: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            crop: None,
        }
    }
}

impl InitialParams {
    /// True when rotate+scale would be a no-op.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.degrees == 0.0 && self.scale_x == 1.0 && self.scale_y == 1.0
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            surface_width: SURFACE_MAX_WIDTH,
            surface_height: SURFACE_MAX_HEIGHT,
            layer_format: LayerFormat::Rgba,
            device_path: "/dev/picdec".into(),
            max_picture_size: 8000,
            initial: InitialParams::default(),
            frame_interval_ms: 100,
            zoom_path: "/sys/class/video/zoom".into(),
            axis_path: "/sys/class/video/axis".into(),
            zoom_min: 26,
            zoom_max: 300,
            zoom_baseline: 100,
        }
    }
}

impl PlayerConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.surface_width = self.surface_width.clamp(1, SURFACE_MAX_WIDTH);
        self.surface_height = self.surface_height.clamp(1, SURFACE_MAX_HEIGHT);
        self.max_picture_size = self.max_picture_size.clamp(1, 32_768);
        self.frame_interval_ms = self.frame_interval_ms.clamp(10, 10_000);
        self.zoom_min = self.zoom_min.clamp(1, 100);
        self.zoom_max = self.zoom_max.clamp(100, 1000);
        self.zoom_baseline = self.zoom_baseline.clamp(self.zoom_min, self.zoom_max);
        if !self.initial.scale_x.is_finite() || self.initial.scale_x <= 0.0 {
            self.initial.scale_x = 1.0;
        }
        if !self.initial.scale_y.is_finite() || self.initial.scale_y <= 0.0 {
            self.initial.scale_y = 1.0;
        }
        self.initial.scale_x = self.initial.scale_x.min(16.0);
        self.initial.scale_y = self.initial.scale_y.min(16.0);
        if !self.initial.degrees.is_finite() {
            self.initial.degrees = 0.0;
        }
    }

    /// Surface d'affichage configurée.
    #[must_use]
    pub fn surface(&self) -> SurfaceTarget {
        SurfaceTarget::new(self.surface_width, self.surface_height)
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    display: DisplaySection,
    #[serde(default)]
    decode: DecodeSection,
    #[serde(default)]
    movie: MovieSection,
    #[serde(default)]
    zoom: ZoomSection,
}

/// Display section of the TOML config, all fields optional for partial override.
#[derive(Deserialize, Default)]
struct DisplaySection {
    surface_width: Option<u32>,
    surface_height: Option<u32>,
    layer_format: Option<LayerFormat>,
    device_path: Option<String>,
}

#[derive(Deserialize, Default)]
struct DecodeSection {
    max_picture_size: Option<u32>,
    degrees: Option<f32>,
    scale_x: Option<f32>,
    scale_y: Option<f32>,
    crop: Option<CropRect>,
}

#[derive(Deserialize, Default)]
struct MovieSection {
    frame_interval_ms: Option<u64>,
}

#[derive(Deserialize, Default)]
struct ZoomSection {
    path: Option<String>,
    axis_path: Option<String>,
    min: Option<u32>,
    max: Option<u32>,
    baseline: Option<u32>,
}

/// Charge la configuration depuis un fichier TOML.
///
/// Les champs absents gardent leur valeur par défaut ; les valeurs hors
/// plage sont ramenées dans leurs bornes.
///
/// # Errors
/// Retourne une erreur si le fichier est illisible ou le TOML invalide.
///
/// # Example
/// ```no_run
/// use ip_core::config::load_config;
/// let config = load_config(std::path::Path::new("config/default.toml")).unwrap();
/// println!("{}×{}", config.surface_width, config.surface_height);
/// ```
pub fn load_config(path: &Path) -> Result<PlayerConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Erreur de parsing TOML dans {}", path.display()))
}

/// Parse a TOML document into a config, merged over the defaults.
///
/// # Errors
/// Invalid TOML or mistyped field.
pub fn parse_config(content: &str) -> Result<PlayerConfig> {
    let file: ConfigFile = toml::from_str(content)?;
    let mut config = PlayerConfig::default();

    let d = file.display;
    if let Some(v) = d.surface_width {
        config.surface_width = v;
    }
    if let Some(v) = d.surface_height {
        config.surface_height = v;
    }
    if let Some(v) = d.layer_format {
        config.layer_format = v;
    }
    if let Some(v) = d.device_path {
        config.device_path = v;
    }

    let dec = file.decode;
    if let Some(v) = dec.max_picture_size {
        config.max_picture_size = v;
    }
    if let Some(v) = dec.degrees {
        config.initial.degrees = v;
    }
    if let Some(v) = dec.scale_x {
        config.initial.scale_x = v;
    }
    if let Some(v) = dec.scale_y {
        config.initial.scale_y = v;
    }
    if dec.crop.is_some() {
        config.initial.crop = dec.crop;
    }

    if let Some(v) = file.movie.frame_interval_ms {
        config.frame_interval_ms = v;
    }

    let z = file.zoom;
    if let Some(v) = z.path {
        config.zoom_path = v;
    }
    if let Some(v) = z.axis_path {
        config.axis_path = v;
    }
    if let Some(v) = z.min {
        config.zoom_min = v;
    }
    if let Some(v) = z.max {
        config.zoom_max = v;
    }
    if let Some(v) = z.baseline {
        config.zoom_baseline = v;
    }

    config.clamp_all();
    log::debug!(
        "config: surface {}×{}, layer {:?}, interval {} ms",
        config.surface_width,
        config.surface_height,
        config.layer_format,
        config.frame_interval_ms
    );
    Ok(config)
}
