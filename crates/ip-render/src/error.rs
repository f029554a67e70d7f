use std::io;

use ip_core::{CoreError, CropRect, ResultCode, SinkError};
use thiserror::Error;

/// Errors from the render dispatcher.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The display device could not be opened.
    #[error("Ouverture du périphérique impossible : {0}")]
    Open(SinkError),

    /// Render or post rejected by the sink.
    #[error(transparent)]
    Sink(#[from] SinkError),

    /// Zoom channel unreadable or unwritable.
    #[error("Canal de zoom inaccessible : {0}")]
    Zoom(io::Error),

    /// Zoom factor not finite or not positive.
    #[error("Facteur de zoom invalide : {0}")]
    InvalidZoom(f32),

    /// Rectangle outside the bitmap.
    #[error("Rectangle invalide : {0:?}")]
    InvalidRect(CropRect),

    /// Conversion buffer allocation failure.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RenderError {
    /// Session result code for this error.
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::Open(_) => ResultCode::ErrOpenSysfs,
            Self::Sink(_) => ResultCode::ErrBadValue,
            Self::Zoom(_) => ResultCode::ErrInvalidOperation,
            Self::InvalidZoom(_) | Self::InvalidRect(_) => ResultCode::ErrParameter,
            Self::Core(CoreError::OutOfMemory { .. }) => ResultCode::ErrNoMemory,
            Self::Core(_) => ResultCode::ErrBadValue,
        }
    }
}
