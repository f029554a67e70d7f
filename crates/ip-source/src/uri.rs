use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SourceError;

/// Extensions décodables comme image fixe.
const PHOTO_EXTS: &[&str] = &["bmp", "png", "jpg", "jpeg", "mpo", "gif", "ico", "wbmp"];

/// Kind of media, decided from the extension of a URI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    /// Single frame image.
    Still,
    /// Possibly animated (GIF); falls back to `Still` with one frame.
    Movie,
    /// TIFF, accepted on its extension alone.
    Tiff,
}

impl MediaKind {
    /// Classify a URI or path from its extension.
    ///
    /// Matching ignores case and any query string after the extension.
    ///
    /// # Example
    /// ```
    /// use ip_source::uri::MediaKind;
    /// assert_eq!(MediaKind::classify("http://h/a.PNG?x=1"), Some(MediaKind::Still));
    /// assert_eq!(MediaKind::classify("/sdcard/anim.gif"), Some(MediaKind::Movie));
    /// assert_eq!(MediaKind::classify("scan.tiff"), Some(MediaKind::Tiff));
    /// assert_eq!(MediaKind::classify("clip.mp4"), None);
    /// ```
    #[must_use]
    pub fn classify(uri: &str) -> Option<Self> {
        let ext = extension(uri)?.to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Some(Self::Movie),
            "tif" | "tiff" => Some(Self::Tiff),
            e if PHOTO_EXTS.contains(&e) => Some(Self::Still),
            _ => None,
        }
    }

    /// Kind from a sniffed stream format, for sources without a name.
    #[must_use]
    pub fn from_format(format: image::ImageFormat) -> Option<Self> {
        use image::ImageFormat;
        match format {
            ImageFormat::Gif => Some(Self::Movie),
            ImageFormat::Tiff => Some(Self::Tiff),
            ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Bmp | ImageFormat::Ico => {
                Some(Self::Still)
            }
            _ => None,
        }
    }
}

/// Extension of the last path segment, query string removed.
fn extension(uri: &str) -> Option<&str> {
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    let name = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}

/// Lecture d'une ressource distante (HTTP), injectée par l'hôte.
pub trait RemoteFetcher: Send + Sync {
    /// Download the whole resource.
    ///
    /// # Errors
    /// Network or protocol failure.
    fn fetch(&self, url: &str) -> io::Result<Vec<u8>>;
}

/// Where the encoded image comes from.
#[derive(Clone)]
pub enum DataSource {
    /// Local file.
    File(PathBuf),
    /// `http://` or `https://` resource.
    Url(String),
    /// Encoded bytes already in memory, with an optional name for the extension.
    Memory {
        /// Nom d'origine, pour la classification.
        name: Option<String>,
        /// Flux encodé.
        bytes: Arc<[u8]>,
    },
    /// Open descriptor, read back through `/proc/self/fd`.
    Fd {
        /// Numéro du descripteur.
        fd: i32,
        /// Target of the descriptor link, when it could be resolved.
        target: Option<PathBuf>,
    },
}

impl DataSource {
    /// Parse a `file://`, `http(s)://` URI or a plain path.
    ///
    /// # Errors
    /// `InvalidUri` for an empty string or another scheme.
    ///
    /// # Example
    /// ```
    /// use ip_source::DataSource;
    /// assert!(matches!(DataSource::parse("file:///a.png").unwrap(), DataSource::File(_)));
    /// assert!(matches!(DataSource::parse("HTTPS://h/a.jpg").unwrap(), DataSource::Url(_)));
    /// assert!(DataSource::parse("ftp://h/a.jpg").is_err());
    /// ```
    pub fn parse(uri: &str) -> Result<Self, SourceError> {
        let uri = uri.trim();
        if uri.is_empty() {
            return Err(SourceError::InvalidUri(String::new()));
        }
        let lower = uri.to_ascii_lowercase();
        if let Some(rest) = strip_scheme(uri, &lower, "file://") {
            return Ok(Self::File(PathBuf::from(rest)));
        }
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(Self::Url(uri.to_owned()));
        }
        if lower.contains("://") {
            return Err(SourceError::InvalidUri(uri.to_owned()));
        }
        Ok(Self::File(PathBuf::from(uri)))
    }

    /// Source backed by an open file descriptor.
    #[must_use]
    pub fn from_fd(fd: i32) -> Self {
        let target = std::fs::read_link(fd_link(fd)).ok();
        if target.is_none() {
            log::warn!("fd {fd} : lien /proc introuvable");
        }
        Self::Fd { fd, target }
    }

    /// Source backed by an in-memory encoded stream.
    #[must_use]
    pub fn from_memory(name: Option<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::Memory {
            name,
            bytes: bytes.into(),
        }
    }

    /// Name used to classify the source, if it has one.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self {
            Self::File(p) => Some(p.to_string_lossy().into_owned()),
            Self::Url(u) => Some(u.clone()),
            Self::Memory { name, .. } => name.clone(),
            Self::Fd { target, .. } => target.as_ref().map(|p| p.to_string_lossy().into_owned()),
        }
    }

    /// Kind from the source name; `None` when unnamed or unrecognised.
    #[must_use]
    pub fn kind(&self) -> Option<MediaKind> {
        self.name().as_deref().and_then(MediaKind::classify)
    }

    /// Read the whole encoded stream.
    ///
    /// # Errors
    /// `NoFetcher` for a URL without fetcher, `Io` on read failure.
    pub fn read(&self, fetcher: Option<&dyn RemoteFetcher>) -> Result<Arc<[u8]>, SourceError> {
        match self {
            Self::File(path) => read_path(path),
            Self::Fd { fd, .. } => read_path(&fd_link(*fd)),
            Self::Memory { bytes, .. } => Ok(Arc::clone(bytes)),
            Self::Url(url) => {
                let fetcher = fetcher.ok_or_else(|| SourceError::NoFetcher(url.clone()))?;
                fetcher
                    .fetch(url)
                    .map(Arc::from)
                    .map_err(|source| SourceError::Io {
                        path: PathBuf::from(url),
                        source,
                    })
            }
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
            Self::Memory { name, bytes } => match name {
                Some(n) => write!(f, "mem:{n} ({} octets)", bytes.len()),
                None => write!(f, "mem ({} octets)", bytes.len()),
            },
            Self::Fd { fd, target } => match target {
                Some(t) => write!(f, "fd:{fd} -> {}", t.display()),
                None => write!(f, "fd:{fd}"),
            },
        }
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataSource({self})")
    }
}

fn strip_scheme<'a>(uri: &'a str, lower: &str, scheme: &str) -> Option<&'a str> {
    lower.starts_with(scheme).then(|| &uri[scheme.len()..])
}

fn fd_link(fd: i32) -> PathBuf {
    PathBuf::from(format!("/proc/self/fd/{fd}"))
}

fn read_path(path: &Path) -> Result<Arc<[u8]>, SourceError> {
    std::fs::read(path)
        .map(Arc::from)
        .map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
}
