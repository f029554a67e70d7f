use ip_core::ResultCode;
use ip_render::RenderError;
use ip_source::SourceError;
use ip_transform::TransformError;
use thiserror::Error;

/// Errors raised by a session command.
///
/// Every variant collapses to a [`ResultCode`] at the session boundary.
#[derive(Error, Debug)]
pub enum PlayerError {
    /// No data source set.
    #[error("Aucune source de données")]
    NoSource,

    /// Command needs a prepared image.
    #[error("Aucune image préparée")]
    NoImage,

    /// No bitmap to crop, or nothing buffered.
    #[error("Aucun bitmap disponible")]
    NoBitmap,

    /// Command needs the display device.
    #[error("Périphérique d'affichage non initialisé")]
    NotReady,

    /// Probed image above the size ceiling.
    #[error("Image trop grande : {width}×{height} (max {max})")]
    TooLarge {
        /// Probed width.
        width: u32,
        /// Probed height.
        height: u32,
        /// Configured ceiling.
        max: u32,
    },

    /// Decoding failed after a successful probe.
    #[error("Décodage impossible : {0}")]
    Decode(SourceError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Dump file could not be written.
    #[error("Écriture du dump impossible : {0}")]
    Dump(String),
}

impl PlayerError {
    /// Result code returned to the client.
    ///
    /// # Example
    /// ```
    /// use ip_core::ResultCode;
    /// use ip_player::PlayerError;
    /// assert_eq!(PlayerError::NoSource.result_code(), ResultCode::ErrBadValue);
    /// ```
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::NoSource | Self::NoBitmap | Self::NotReady | Self::Dump(_) => ResultCode::ErrBadValue,
            Self::NoImage => ResultCode::ErrInvalidOperation,
            Self::TooLarge { .. } => ResultCode::ErrNoMemory,
            Self::Decode(e) => match e.result_code() {
                ResultCode::ErrNoMemory => ResultCode::ErrNoMemory,
                _ => ResultCode::ErrDecoder,
            },
            Self::Source(e) => e.result_code(),
            Self::Transform(e) => e.result_code(),
            Self::Render(e) => e.result_code(),
        }
    }
}
