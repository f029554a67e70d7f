use std::io;

use crate::bitmap::Bitmap;
use crate::error::{DecodeError, SinkError};
use crate::frame::FrameInfo;

/// Destination des frames converties : le périphérique d'affichage.
///
/// Implémenté par : `DeviceSink`, `DirectorySink`, `MemorySink`.
///
/// # Example
/// ```
/// use ip_core::traits::FrameSink;
/// use ip_core::{FrameInfo, SinkError};
///
/// struct NullSink;
/// impl FrameSink for NullSink {
///     fn open(&mut self) -> Result<(), SinkError> { Ok(()) }
///     fn is_open(&self) -> bool { true }
///     fn render(&mut self, _frame: &FrameInfo<'_>) -> Result<(), SinkError> { Ok(()) }
///     fn post(&mut self) -> Result<(), SinkError> { Ok(()) }
///     fn close(&mut self) {}
///     fn name(&self) -> &'static str { "null" }
/// }
/// ```
pub trait FrameSink: Send {
    /// Ouvre le périphérique. Idempotent.
    ///
    /// # Errors
    /// Device node missing or not writable.
    fn open(&mut self) -> Result<(), SinkError>;

    /// True once `open` has succeeded.
    fn is_open(&self) -> bool;

    /// Copie la frame dans le tampon d'affichage.
    ///
    /// # Errors
    /// `SinkError::NotReady` si le périphérique n'est pas ouvert.
    fn render(&mut self, frame: &FrameInfo<'_>) -> Result<(), SinkError>;

    /// Rend visible la dernière frame copiée.
    ///
    /// # Errors
    /// `SinkError::NotReady` si le périphérique n'est pas ouvert.
    fn post(&mut self) -> Result<(), SinkError>;

    /// Ferme le périphérique ; `render` et `post` renvoient ensuite `NotReady`.
    fn close(&mut self);

    /// Nom lisible pour les journaux et le dump.
    fn name(&self) -> &'static str;
}

/// Canal de zoom matériel du plan vidéo (pourcentage, 100 = neutre).
///
/// # Example
/// ```
/// use ip_core::traits::ZoomControl;
///
/// struct Fixed(u32);
/// impl ZoomControl for Fixed {
///     fn read_zoom(&mut self) -> std::io::Result<u32> { Ok(self.0) }
///     fn write_zoom(&mut self, percent: u32) -> std::io::Result<()> { self.0 = percent; Ok(()) }
///     fn reset_axis(&mut self) -> std::io::Result<()> { Ok(()) }
/// }
/// let mut z = Fixed(100);
/// z.write_zoom(150).unwrap();
/// assert_eq!(z.read_zoom().unwrap(), 150);
/// ```
pub trait ZoomControl: Send {
    /// Current zoom percentage.
    ///
    /// # Errors
    /// I/O failure or unparsable content.
    fn read_zoom(&mut self) -> io::Result<u32>;

    /// Set the zoom percentage.
    ///
    /// # Errors
    /// I/O failure.
    fn write_zoom(&mut self, percent: u32) -> io::Result<()>;

    /// Reset the video layer axis to the full screen.
    ///
    /// # Errors
    /// I/O failure.
    fn reset_axis(&mut self) -> io::Result<()>;
}

/// Décodeur d'images encodées.
pub trait ImageDecoder: Send + Sync {
    /// Dimensions of the encoded image, without decoding the pixels.
    ///
    /// # Errors
    /// Unsupported or corrupt stream.
    fn probe(&self, bytes: &[u8]) -> Result<(u32, u32), DecodeError>;

    /// Decode the first (or only) frame.
    ///
    /// # Errors
    /// Unsupported or corrupt stream, allocation failure.
    fn decode(&self, bytes: &[u8]) -> Result<Bitmap, DecodeError>;

    /// Decode every frame of an animated stream, in display order.
    ///
    /// # Errors
    /// Unsupported or corrupt stream, allocation failure.
    fn decode_frames(&self, bytes: &[u8]) -> Result<Vec<Bitmap>, DecodeError>;

    /// Nom lisible pour les journaux.
    fn name(&self) -> &'static str;
}
