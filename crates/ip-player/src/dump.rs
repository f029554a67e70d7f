use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use ip_core::{Bitmap, SurfaceTarget};
use ip_source::Loaded;
use serde::Serialize;

use crate::error::PlayerError;
use crate::session::Session;

/// Animation part of a [`DumpReport`].
#[derive(Clone, Debug, Serialize)]
pub struct MovieReport {
    pub frames: usize,
    pub index: usize,
    pub scale: f32,
    pub degrees: f32,
}

/// State of a session, as written by [`Session::dump`].
#[derive(Clone, Debug, Serialize)]
pub struct DumpReport {
    pub sink: &'static str,
    pub sink_ready: bool,
    pub source: Option<String>,
    pub width: u32,
    pub height: u32,
    pub sample_size: u32,
    pub surface: SurfaceTarget,
    pub image: Option<(u32, u32)>,
    pub buffer: Option<(u32, u32)>,
    pub degrees: f32,
    pub step: f32,
    pub direction: String,
    pub pan_offset: (i32, i32),
    pub movie: Option<MovieReport>,
    /// Bitmaps written next to the report.
    pub files: Vec<PathBuf>,
}

impl DumpReport {
    /// Report as pretty-printed JSON.
    ///
    /// # Errors
    /// Serialization failure.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for DumpReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "sink: {} (prêt: {})", self.sink, self.sink_ready)?;
        writeln!(f, "source: {}", self.source.as_deref().unwrap_or("-"))?;
        writeln!(f, "taille: {}×{}", self.width, self.height)?;
        writeln!(
            f,
            "sample: {}, surface: {}×{}",
            self.sample_size, self.surface.width, self.surface.height
        )?;
        if let Some((w, h)) = self.buffer {
            writeln!(f, "buffer: {w}×{h}")?;
        }
        writeln!(
            f,
            "rotation: {}°, échelle: {} ({}), pan: {:?}",
            self.degrees, self.step, self.direction, self.pan_offset
        )?;
        if let Some(m) = &self.movie {
            writeln!(
                f,
                "animation: frame {}/{}, ×{}, {}°",
                m.index, m.frames, m.scale, m.degrees
            )?;
        }
        for file in &self.files {
            writeln!(f, "écrit: {}", file.display())?;
        }
        Ok(())
    }
}

/// `prefix` with `suffix` appended to its last component.
fn suffixed(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn write_bitmap(bitmap: &Bitmap, path: &Path, format: ImageFormat) -> Result<(), PlayerError> {
    let (w, h) = bitmap.dimensions();
    let mut img = RgbaImage::new(w, h);
    let mut row = vec![[0u8; 4]; w as usize];
    for (y, dst) in (0..h).zip(img.chunks_exact_mut(w as usize * 4)) {
        bitmap.read_row_rgba(y, &mut row);
        for (d, s) in dst.chunks_exact_mut(4).zip(&row) {
            d.copy_from_slice(s);
        }
    }
    img.save_with_format(path, format)
        .map_err(|e| PlayerError::Dump(format!("{} : {e}", path.display())))
}

impl Session {
    /// Write the session state and its bitmaps under `prefix`.
    ///
    /// Files: `<prefix>` (prepared image, BMP), `<prefix>_buf.bmp`,
    /// `<prefix>_rotate.bmp`, `<prefix>_scale.bmp` and `<prefix>_movie.png`
    /// (last animation frame), each only when the bitmap exists.
    ///
    /// # Errors
    /// A bitmap could not be written.
    pub fn dump(&self, prefix: &Path) -> Result<DumpReport, PlayerError> {
        let mut files = Vec::new();
        let buffer = match self.buffer() {
            Some(Loaded::Still(b)) => Some(b),
            _ => None,
        };
        let bitmaps = [
            (self.image(), prefix.to_path_buf(), ImageFormat::Bmp),
            (buffer, suffixed(prefix, "_buf.bmp"), ImageFormat::Bmp),
            (self.state().rotated(), suffixed(prefix, "_rotate.bmp"), ImageFormat::Bmp),
            (self.state().scaled(), suffixed(prefix, "_scale.bmp"), ImageFormat::Bmp),
            (
                self.movie().and_then(|m| m.last_frame()),
                suffixed(prefix, "_movie.png"),
                ImageFormat::Png,
            ),
        ];
        for (bitmap, path, format) in bitmaps {
            if let Some(bitmap) = bitmap {
                write_bitmap(bitmap, &path, format)?;
                files.push(path);
            }
        }

        let (width, height) = self.probe().map_or((0, 0), |p| (p.width, p.height));
        let state = self.state();
        let report = DumpReport {
            sink: self.dispatcher().sink_name(),
            sink_ready: self.dispatcher().is_ready(),
            source: self.source().map(ToString::to_string),
            width,
            height,
            sample_size: self.sample_size(),
            surface: self.surface(),
            image: self.image().map(Bitmap::dimensions),
            buffer: self.buffer().map(Loaded::dimensions),
            degrees: state.degrees(),
            step: state.step(),
            direction: format!("{:?}", state.direction()),
            pan_offset: state.pan().offset,
            movie: self.movie().map(|m| MovieReport {
                frames: m.frame_count(),
                index: m.index(),
                scale: m.scale(),
                degrees: m.degrees(),
            }),
            files,
        };
        log::info!("dump {} : {} fichiers", prefix.display(), report.files.len());
        Ok(report)
    }
}
