use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use image::{ImageFormat, RgbImage, RgbaImage};
use ip_core::traits::FrameSink;
use ip_core::{FrameInfo, LayerFormat, SinkError};

/// Magic of the frame header written to the device node.
const FRAME_MAGIC: &[u8; 4] = b"PICD";

/// Display device node (`/dev/picdec`).
///
/// `render` writes a 20-byte header (magic, format code, width, height,
/// stride, little-endian) followed by the pixels at the start of the node;
/// `post` flushes it.
pub struct DeviceSink {
    path: PathBuf,
    file: Option<File>,
    posted: u64,
}

impl DeviceSink {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
            posted: 0,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames posted since the sink was created.
    #[must_use]
    pub fn posted(&self) -> u64 {
        self.posted
    }
}

/// Header preceding the pixels on the device node.
#[must_use]
pub fn frame_header(frame: &FrameInfo<'_>) -> [u8; 20] {
    let mut h = [0u8; 20];
    h[..4].copy_from_slice(FRAME_MAGIC);
    h[4..8].copy_from_slice(&frame.format.code().to_le_bytes());
    h[8..12].copy_from_slice(&frame.width.to_le_bytes());
    h[12..16].copy_from_slice(&frame.height.to_le_bytes());
    h[16..20].copy_from_slice(&(frame.stride as u32).to_le_bytes());
    h
}

impl FrameSink for DeviceSink {
    fn open(&mut self) -> Result<(), SinkError> {
        if self.file.is_none() {
            let file = OpenOptions::new().read(true).write(true).open(&self.path)?;
            log::info!("périphérique ouvert : {}", self.path.display());
            self.file = Some(file);
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn render(&mut self, frame: &FrameInfo<'_>) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::NotReady)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&frame_header(frame))?;
        file.write_all(frame.data)?;
        Ok(())
    }

    fn post(&mut self) -> Result<(), SinkError> {
        let file = self.file.as_mut().ok_or(SinkError::NotReady)?;
        file.flush()?;
        self.posted += 1;
        Ok(())
    }

    fn close(&mut self) {
        if self.file.take().is_some() {
            log::info!("périphérique fermé : {}", self.path.display());
        }
    }

    fn name(&self) -> &'static str {
        "device"
    }
}

/// Frame kept between `render` and `post`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedFrame {
    pub format: LayerFormat,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    pub data: Vec<u8>,
}

impl RecordedFrame {
    fn capture(frame: &FrameInfo<'_>) -> Self {
        Self {
            format: frame.format,
            width: frame.width,
            height: frame.height,
            stride: frame.stride,
            data: frame.data.to_vec(),
        }
    }
}

/// Writes every posted frame into a directory, as PNG (RGB/RGBA) or raw
/// `.yuyv` files named `frame_00000.*`.
pub struct DirectorySink {
    dir: PathBuf,
    open: bool,
    pending: Option<RecordedFrame>,
    seq: u64,
}

impl DirectorySink {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            open: false,
            pending: None,
            seq: 0,
        }
    }

    fn write_frame(&self, frame: &RecordedFrame) -> Result<PathBuf, SinkError> {
        let stem = format!("frame_{:05}", self.seq);
        let tight = |bpp: usize| -> Vec<u8> {
            let row = frame.width as usize * bpp;
            frame
                .data
                .chunks_exact(frame.stride)
                .flat_map(|r| &r[..row])
                .copied()
                .collect()
        };
        let encode = |e: image::ImageError| SinkError::Encode(e.to_string());
        let mismatch = || SinkError::Encode(format!("taille incohérente {}×{}", frame.width, frame.height));
        match frame.format {
            LayerFormat::Rgb => {
                let path = self.dir.join(format!("{stem}.png"));
                RgbImage::from_raw(frame.width, frame.height, tight(3))
                    .ok_or_else(mismatch)?
                    .save_with_format(&path, ImageFormat::Png)
                    .map_err(encode)?;
                Ok(path)
            }
            LayerFormat::Rgba | LayerFormat::Argb => {
                let path = self.dir.join(format!("{stem}.png"));
                RgbaImage::from_raw(frame.width, frame.height, tight(4))
                    .ok_or_else(mismatch)?
                    .save_with_format(&path, ImageFormat::Png)
                    .map_err(encode)?;
                Ok(path)
            }
            LayerFormat::Yuyv => {
                let path = self.dir.join(format!("{stem}.yuyv"));
                fs::write(&path, &frame.data)?;
                Ok(path)
            }
        }
    }
}

impl FrameSink for DirectorySink {
    fn open(&mut self) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn render(&mut self, frame: &FrameInfo<'_>) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotReady);
        }
        self.pending = Some(RecordedFrame::capture(frame));
        Ok(())
    }

    fn post(&mut self) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotReady);
        }
        let Some(frame) = self.pending.as_ref() else {
            log::debug!("post sans frame rendue");
            return Ok(());
        };
        let path = self.write_frame(frame)?;
        log::debug!("frame écrite : {}", path.display());
        self.seq += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.pending = None;
    }

    fn name(&self) -> &'static str {
        "directory"
    }
}

/// What a [`MemorySink`] has seen, shared with the test or host.
#[derive(Debug, Default)]
pub struct SinkLog {
    /// Number of successful `open` calls.
    pub opens: usize,
    /// Every rendered frame, in order.
    pub rendered: Vec<RecordedFrame>,
    /// Number of `post` calls.
    pub posts: usize,
    /// When set, `open` fails.
    pub refuse_open: bool,
}

impl SinkLog {
    /// Last rendered frame.
    #[must_use]
    pub fn last(&self) -> Option<&RecordedFrame> {
        self.rendered.last()
    }
}

/// Sink recording every frame in memory.
///
/// # Example
/// ```
/// use ip_core::traits::FrameSink;
/// use ip_core::{FrameInfo, LayerFormat};
/// use ip_render::MemorySink;
/// let mut sink = MemorySink::new();
/// let log = sink.log();
/// sink.open().unwrap();
/// let px = [0u8; 3];
/// let frame = FrameInfo { data: &px, format: LayerFormat::Rgb, width: 1, height: 1, stride: 3, rotate: 0 };
/// sink.render(&frame).unwrap();
/// sink.post().unwrap();
/// assert_eq!(log.lock().unwrap().posts, 1);
/// ```
#[derive(Clone, Default)]
pub struct MemorySink {
    log: Arc<Mutex<SinkLog>>,
    open: bool,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle on the record.
    #[must_use]
    pub fn log(&self) -> Arc<Mutex<SinkLog>> {
        Arc::clone(&self.log)
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut SinkLog) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut log)
    }
}

impl FrameSink for MemorySink {
    fn open(&mut self) -> Result<(), SinkError> {
        let refused = self.with_log(|l| {
            if !l.refuse_open {
                l.opens += 1;
            }
            l.refuse_open
        });
        if refused {
            return Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "périphérique absent",
            )));
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn render(&mut self, frame: &FrameInfo<'_>) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotReady);
        }
        self.with_log(|l| l.rendered.push(RecordedFrame::capture(frame)));
        Ok(())
    }

    fn post(&mut self) -> Result<(), SinkError> {
        if !self.open {
            return Err(SinkError::NotReady);
        }
        self.with_log(|l| l.posts += 1);
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
