use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use ip_core::traits::ZoomControl;

/// Texte écrit dans le nœud d'axe pour revenir au plein écran.
pub const AXIS_RESET: &str = "0 0 0 0";

/// Hardware zoom through two sysfs text nodes.
pub struct SysfsZoom {
    zoom_path: PathBuf,
    axis_path: PathBuf,
}

impl SysfsZoom {
    #[must_use]
    pub fn new(zoom_path: impl Into<PathBuf>, axis_path: impl Into<PathBuf>) -> Self {
        Self {
            zoom_path: zoom_path.into(),
            axis_path: axis_path.into(),
        }
    }
}

impl ZoomControl for SysfsZoom {
    fn read_zoom(&mut self) -> io::Result<u32> {
        let text = fs::read_to_string(&self.zoom_path)?;
        text.trim().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("zoom illisible {:?} : {e}", text.trim()),
            )
        })
    }

    fn write_zoom(&mut self, percent: u32) -> io::Result<()> {
        fs::write(&self.zoom_path, percent.to_string())
    }

    fn reset_axis(&mut self) -> io::Result<()> {
        fs::write(&self.axis_path, AXIS_RESET)
    }
}

/// State of a [`MemoryZoom`].
#[derive(Debug, Default)]
pub struct ZoomLog {
    /// Current percentage.
    pub value: u32,
    /// Every written value, in order.
    pub writes: Vec<u32>,
    /// Number of axis resets.
    pub axis_resets: usize,
    /// When set, every call fails.
    pub offline: bool,
}

/// In-memory zoom channel, for hosts without sysfs and for tests.
#[derive(Clone)]
pub struct MemoryZoom {
    log: Arc<Mutex<ZoomLog>>,
}

impl Default for MemoryZoom {
    fn default() -> Self {
        Self::new(100)
    }
}

impl MemoryZoom {
    #[must_use]
    pub fn new(value: u32) -> Self {
        Self {
            log: Arc::new(Mutex::new(ZoomLog {
                value,
                ..ZoomLog::default()
            })),
        }
    }

    #[must_use]
    pub fn log(&self) -> Arc<Mutex<ZoomLog>> {
        Arc::clone(&self.log)
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut ZoomLog) -> R) -> io::Result<R> {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        if log.offline {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "zoom hors ligne"));
        }
        Ok(f(&mut log))
    }
}

impl ZoomControl for MemoryZoom {
    fn read_zoom(&mut self) -> io::Result<u32> {
        self.with_log(|l| l.value)
    }

    fn write_zoom(&mut self, percent: u32) -> io::Result<()> {
        self.with_log(|l| {
            l.value = percent;
            l.writes.push(percent);
        })
    }

    fn reset_axis(&mut self) -> io::Result<()> {
        self.with_log(|l| l.axis_resets += 1)
    }
}
