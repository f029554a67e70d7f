use ip_core::Bitmap;

/// Decoded frames of an animated image, stepped in display order.
///
/// The index wraps modulo the frame count.
///
/// # Example
/// ```
/// use ip_core::{AlphaType, Bitmap};
/// use ip_source::Movie;
/// let f = |v| Bitmap::from_rgba8(1, 1, AlphaType::Opaque, vec![v; 4]).unwrap();
/// let mut movie = Movie::new(vec![f(1), f(2)]).unwrap();
/// assert_eq!(movie.advance().data()[0], 1);
/// assert_eq!(movie.advance().data()[0], 2);
/// assert_eq!(movie.advance().data()[0], 1);
/// ```
#[derive(Clone, Debug)]
pub struct Movie {
    frames: Vec<Bitmap>,
    index: usize,
}

impl Movie {
    /// `None` unless there are at least two frames.
    #[must_use]
    pub fn new(frames: Vec<Bitmap>) -> Option<Self> {
        (frames.len() > 1).then_some(Self { frames, index: 0 })
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Index of the frame returned by the next [`Movie::advance`].
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Frame at the current index, without stepping.
    #[must_use]
    pub fn current(&self) -> &Bitmap {
        &self.frames[self.index % self.frames.len()]
    }

    /// Return the current frame and step to the next one.
    pub fn advance(&mut self) -> &Bitmap {
        let i = self.index % self.frames.len();
        self.index = (i + 1) % self.frames.len();
        &self.frames[i]
    }

    /// Back to the first frame.
    pub fn rewind(&mut self) {
        self.index = 0;
    }

    /// Dimensions of the logical screen.
    #[must_use]
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }
}
