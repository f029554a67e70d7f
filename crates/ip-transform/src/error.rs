use ip_core::{CoreError, CropRect, ResultCode};
use thiserror::Error;

/// Errors from the transform pipeline.
///
/// A failed operation never mutates the caller's bitmaps or state.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Computed destination has a non-positive side.
    #[error("Dimensions de destination invalides : {width}×{height}")]
    EmptyResult {
        /// Computed width.
        width: i64,
        /// Computed height.
        height: i64,
    },

    /// Scale factor not finite or not positive.
    #[error("Facteur d'échelle invalide : {0}")]
    InvalidScale(f32),

    /// Rotation angle not finite.
    #[error("Angle de rotation invalide : {0}")]
    InvalidAngle(f32),

    /// Pan offset not finite.
    #[error("Déplacement invalide : {0}")]
    InvalidOffset(f32),

    /// Scale factor, or cumulative scale, above 16.
    #[error("Facteur d'échelle hors limites : {0} (max 16)")]
    ScaleOutOfRange(f32),

    /// Crop rectangle not inside the bitmap.
    #[error("Rectangle de recadrage invalide : {0:?}")]
    InvalidCrop(CropRect),

    /// Translate requested before any scale produced a bitmap.
    #[error("Aucune image agrandie à déplacer")]
    NoScaledImage,

    /// Translate along axes where the image fits the surface.
    #[error("Aucune marge de déplacement sur cet axe")]
    NoPanMargin,

    /// Resampler rejected the buffers.
    #[error("Rééchantillonnage impossible : {0}")]
    Resample(String),

    /// Bitmap construction or allocation failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl TransformError {
    /// Session result code for this failure.
    ///
    /// # Example
    /// ```
    /// use ip_transform::TransformError;
    /// use ip_core::ResultCode;
    /// assert_eq!(TransformError::ScaleOutOfRange(32.0).result_code(), ResultCode::ErrInvalidOperation);
    /// ```
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidScale(_)
            | Self::InvalidAngle(_)
            | Self::InvalidOffset(_)
            | Self::InvalidCrop(_) => ResultCode::ErrParameter,
            Self::Core(CoreError::OutOfMemory { .. }) => ResultCode::ErrNoMemory,
            Self::EmptyResult { .. } | Self::Resample(_) => ResultCode::ErrDecoder,
            Self::ScaleOutOfRange(_) | Self::NoScaledImage | Self::NoPanMargin | Self::Core(_) => {
                ResultCode::ErrInvalidOperation
            }
        }
    }
}
