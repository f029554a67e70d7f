use std::io;
use std::path::PathBuf;

use ip_core::{DecodeError, ResultCode};
use thiserror::Error;

/// Errors from opening, probing or decoding a data source.
#[derive(Error, Debug)]
pub enum SourceError {
    /// URI scheme not understood.
    #[error("URI invalide : {0}")]
    InvalidUri(String),

    /// Extension or stream rejected by the codec.
    #[error("Format non supporté : {0}")]
    Unsupported(String),

    /// Remote URI without a fetcher to read it.
    #[error("Aucun client HTTP pour {0}")]
    NoFetcher(String),

    /// The stream could not be read.
    #[error("Lecture impossible de {path} : {source}")]
    Io {
        /// File, descriptor link or URL being read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Decoder failure.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl SourceError {
    /// Session result code for this error.
    #[must_use]
    pub fn result_code(&self) -> ResultCode {
        match self {
            Self::InvalidUri(_) | Self::Unsupported(_) => ResultCode::ErrInvalidOperation,
            Self::NoFetcher(_) => ResultCode::ErrParameter,
            Self::Io { .. } => ResultCode::ErrBadValue,
            Self::Decode(DecodeError::TooLarge { .. }) => ResultCode::ErrNoMemory,
            Self::Decode(DecodeError::Bitmap(ip_core::CoreError::OutOfMemory { .. })) => {
                ResultCode::ErrNoMemory
            }
            Self::Decode(_) => ResultCode::ErrDecoder,
        }
    }
}
