use thiserror::Error;

/// Errors originating from the core value types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Invalid width/height dimensions.
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// Row stride shorter than `width × bytes_per_pixel`.
    #[error("Stride trop petit : {stride} < {min}")]
    StrideTooSmall {
        /// Stride supplied by the caller.
        stride: usize,
        /// Minimum stride for the format and width.
        min: usize,
    },

    /// Pixel buffer shorter than `stride × height`.
    #[error("Buffer trop petit : {len} < {required}")]
    BufferTooSmall {
        /// Length of the supplied buffer.
        len: usize,
        /// Bytes required by the geometry.
        required: usize,
    },

    /// Pixel buffer allocation failed.
    #[error("Allocation impossible : {bytes} octets")]
    OutOfMemory {
        /// Size of the failed allocation.
        bytes: usize,
    },

    /// Format without a conversion routine.
    #[error("Format non supporté : {format}")]
    UnsupportedFormat {
        /// The format that is unsupported.
        format: String,
    },

    /// Sub-rectangle not fully contained in the bitmap.
    #[error("Rectangle hors limites : ({x}, {y}) {width}×{height}")]
    SubsetOutOfBounds {
        /// Left edge.
        x: i32,
        /// Top edge.
        y: i32,
        /// Rectangle width.
        width: i32,
        /// Rectangle height.
        height: i32,
    },
}

/// Errors reported by an image decoder.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The stream is not in a format the codec understands.
    #[error("Format d'image non supporté : {0}")]
    Unsupported(String),

    /// The stream is truncated or corrupt.
    #[error("Flux d'image corrompu : {0}")]
    Corrupt(String),

    /// Decoded image exceeds the pixel-dimension ceiling.
    #[error("Image trop grande : {width}×{height} (max {max})")]
    TooLarge {
        /// Decoded width.
        width: u32,
        /// Decoded height.
        height: u32,
        /// Configured ceiling.
        max: u32,
    },

    /// The decoded pixels could not be wrapped in a bitmap.
    #[error(transparent)]
    Bitmap(#[from] CoreError),
}

/// Errors reported by a frame sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink has not been opened.
    #[error("Le périphérique d'affichage n'est pas prêt")]
    NotReady,

    /// Underlying device or file I/O failure.
    #[error("Erreur d'E/S du périphérique : {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding failure (directory sinks).
    #[error("Encodage de la frame impossible : {0}")]
    Encode(String),
}
