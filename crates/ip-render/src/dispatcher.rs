use ip_core::bitmap::alloc_zeroed;
use ip_core::config::PlayerConfig;
use ip_core::traits::{FrameSink, ZoomControl};
use ip_core::{Bitmap, CropRect, FrameInfo, LayerFormat, SinkError};

use crate::error::RenderError;
use crate::layout::convert;

/// Côté de la frame vide postée par `init`.
const BLANK_SIDE: u32 = 100;

/// Result of a hardware zoom request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoomOutcome {
    /// Zoom set to this percentage.
    Set(u32),
    /// Saturated at the maximum.
    Max,
    /// Saturated at the minimum.
    Min,
}

/// Converts bitmaps to the layer format and drives the sink and zoom channel.
pub struct Dispatcher {
    sink: Box<dyn FrameSink>,
    zoom: Box<dyn ZoomControl>,
    format: LayerFormat,
    zoom_min: u32,
    zoom_max: u32,
    zoom_baseline: u32,
}

impl Dispatcher {
    /// Dispatcher with the default zoom bounds (26, 300, baseline 100).
    #[must_use]
    pub fn new(sink: Box<dyn FrameSink>, zoom: Box<dyn ZoomControl>, format: LayerFormat) -> Self {
        Self {
            sink,
            zoom,
            format,
            zoom_min: 26,
            zoom_max: 300,
            zoom_baseline: 100,
        }
    }

    /// Dispatcher using the format and zoom bounds of `config`.
    #[must_use]
    pub fn from_config(
        sink: Box<dyn FrameSink>,
        zoom: Box<dyn ZoomControl>,
        config: &PlayerConfig,
    ) -> Self {
        Self {
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            zoom_baseline: config.zoom_baseline,
            ..Self::new(sink, zoom, config.layer_format)
        }
    }

    #[must_use]
    pub fn format(&self) -> LayerFormat {
        self.format
    }

    pub fn set_format(&mut self, format: LayerFormat) {
        self.format = format;
    }

    #[must_use]
    pub fn sink_name(&self) -> &'static str {
        self.sink.name()
    }

    /// True once the sink is open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.sink.is_open()
    }

    /// Ouvre le périphérique et affiche une frame noire.
    ///
    /// The video axis is reset first; a failing axis node is only logged.
    /// The blank frame is posted without touching the zoom.
    ///
    /// # Errors
    /// [`RenderError::Open`] when the sink cannot be opened.
    pub fn init(&mut self) -> Result<(), RenderError> {
        if let Err(e) = self.zoom.reset_axis() {
            log::warn!("remise à zéro de l'axe impossible : {e}");
        }
        self.sink.open().map_err(RenderError::Open)?;

        let stride = LayerFormat::Rgb.bytes_per_pixel() * BLANK_SIDE as usize;
        let blank = alloc_zeroed(stride * BLANK_SIDE as usize)?;
        self.sink.render(&FrameInfo {
            data: &blank,
            format: LayerFormat::Rgb,
            width: BLANK_SIDE,
            height: BLANK_SIDE,
            stride,
            rotate: 0,
        })?;
        self.sink.post()?;
        log::info!("init : sink {} prêt", self.sink.name());
        Ok(())
    }

    /// Convert `bitmap` to the configured layer format and hand it to the sink.
    ///
    /// # Errors
    /// Sink not open, allocation or sink failure.
    pub fn render(&mut self, bitmap: &Bitmap) -> Result<(), RenderError> {
        self.render_as(bitmap, self.format)
    }

    /// Same as [`Self::render`] with an explicit format.
    ///
    /// `Argb` frames are accepted and dropped.
    ///
    /// # Errors
    /// Sink not open, allocation or sink failure.
    pub fn render_as(&mut self, bitmap: &Bitmap, format: LayerFormat) -> Result<(), RenderError> {
        if !self.sink.is_open() {
            return Err(SinkError::NotReady.into());
        }
        let Some(frame) = convert(bitmap, format)? else {
            log::debug!("format {format:?} non rendu");
            return Ok(());
        };
        log::debug!("render {:?} {}×{}", frame.format, frame.width, frame.height);
        self.sink.render(&frame.frame_info())?;
        Ok(())
    }

    /// Render the `rect` part of `bitmap` as RGB24.
    ///
    /// # Errors
    /// [`RenderError::InvalidRect`] when `rect` is not inside the bitmap.
    pub fn render_rect(&mut self, bitmap: &Bitmap, rect: CropRect) -> Result<(), RenderError> {
        if !rect.is_inside(bitmap.width(), bitmap.height()) {
            return Err(RenderError::InvalidRect(rect));
        }
        let sub = bitmap.extract_subset(rect.x, rect.y, rect.width, rect.height)?;
        self.render_as(&sub, LayerFormat::Rgb)
    }

    /// Present the last rendered frame, zoom back to the baseline first.
    ///
    /// # Errors
    /// Sink not open or sink failure.
    pub fn post(&mut self) -> Result<(), RenderError> {
        if !self.sink.is_open() {
            return Err(SinkError::NotReady.into());
        }
        if let Err(e) = self.reset_zoom() {
            log::warn!("{e}");
        }
        self.post_raw()
    }

    /// Present the last rendered frame, zoom untouched.
    ///
    /// # Errors
    /// Sink not open or sink failure.
    pub fn post_raw(&mut self) -> Result<(), RenderError> {
        self.sink.post()?;
        Ok(())
    }

    /// Render then post.
    ///
    /// # Errors
    /// See [`Self::render`] and [`Self::post`].
    pub fn show(&mut self, bitmap: &Bitmap) -> Result<(), RenderError> {
        self.render(bitmap)?;
        self.post()
    }

    /// Multiplie le zoom matériel courant par `factor`.
    ///
    /// The product is truncated to an integer percentage and saturated to
    /// `[zoom_min, zoom_max]`; the saturated bound is written.
    ///
    /// # Errors
    /// Invalid factor, unreadable or unwritable zoom channel.
    ///
    /// # Example
    /// ```
    /// use ip_core::LayerFormat;
    /// use ip_render::{Dispatcher, MemorySink, MemoryZoom, ZoomOutcome};
    /// let mut d = Dispatcher::new(Box::new(MemorySink::new()), Box::new(MemoryZoom::new(100)), LayerFormat::Rgba);
    /// assert_eq!(d.scale_hw(1.5).unwrap(), ZoomOutcome::Set(150));
    /// assert_eq!(d.scale_hw(4.0).unwrap(), ZoomOutcome::Max);
    /// ```
    pub fn scale_hw(&mut self, factor: f32) -> Result<ZoomOutcome, RenderError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(RenderError::InvalidZoom(factor));
        }
        let current = self.zoom.read_zoom().map_err(RenderError::Zoom)?;
        let wanted = (factor * current as f32) as u32;
        let (value, outcome) = if wanted > self.zoom_max {
            (self.zoom_max, ZoomOutcome::Max)
        } else if wanted < self.zoom_min {
            (self.zoom_min, ZoomOutcome::Min)
        } else {
            (wanted, ZoomOutcome::Set(wanted))
        };
        log::debug!("zoom {current} ×{factor} → {value}");
        self.zoom.write_zoom(value).map_err(RenderError::Zoom)?;
        Ok(outcome)
    }

    /// Write the baseline zoom.
    ///
    /// # Errors
    /// Unwritable zoom channel.
    pub fn reset_zoom(&mut self) -> Result<(), RenderError> {
        self.zoom
            .write_zoom(self.zoom_baseline)
            .map_err(RenderError::Zoom)
    }

    /// Close the sink.
    pub fn close(&mut self) {
        self.sink.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::zoom::MemoryZoom;
    use ip_core::{AlphaType, ResultCode};

    fn dispatcher(format: LayerFormat) -> (Dispatcher, MemorySink, MemoryZoom) {
        let sink = MemorySink::new();
        let zoom = MemoryZoom::new(100);
        let d = Dispatcher::new(Box::new(sink.clone()), Box::new(zoom.clone()), format);
        (d, sink, zoom)
    }

    fn solid(w: u32, h: u32) -> Bitmap {
        Bitmap::from_rgba8(w, h, AlphaType::Opaque, [7, 8, 9, 255].repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn init_posts_a_blank_rgb_frame() {
        let (mut d, sink, zoom) = dispatcher(LayerFormat::Rgba);
        d.init().unwrap();
        let log = sink.log();
        let log = log.lock().unwrap();
        let frame = log.last().unwrap();
        assert_eq!((frame.format, frame.width, frame.height), (LayerFormat::Rgb, 100, 100));
        assert!(frame.data.iter().all(|&b| b == 0));
        assert_eq!(log.posts, 1);
        let z = zoom.log();
        let z = z.lock().unwrap();
        assert_eq!(z.axis_resets, 1);
        assert!(z.writes.is_empty());
    }

    #[test]
    fn init_failure_maps_to_open_sysfs() {
        let (mut d, sink, _) = dispatcher(LayerFormat::Rgba);
        sink.log().lock().unwrap().refuse_open = true;
        let err = d.init().unwrap_err();
        assert_eq!(err.result_code(), ResultCode::ErrOpenSysfs);
    }

    #[test]
    fn render_before_init_is_not_ready() {
        let (mut d, _, _) = dispatcher(LayerFormat::Rgba);
        let err = d.render(&solid(2, 2)).unwrap_err();
        assert_eq!(err.result_code(), ResultCode::ErrBadValue);
    }

    #[test]
    fn post_resets_zoom_to_baseline() {
        let (mut d, _, zoom) = dispatcher(LayerFormat::Rgba);
        d.init().unwrap();
        d.scale_hw(2.0).unwrap();
        d.show(&solid(3, 2)).unwrap();
        assert_eq!(zoom.log().lock().unwrap().writes, [200, 100]);
    }

    #[test]
    fn argb_is_silently_dropped() {
        let (mut d, sink, _) = dispatcher(LayerFormat::Argb);
        d.init().unwrap();
        d.render(&solid(3, 2)).unwrap();
        assert_eq!(sink.log().lock().unwrap().rendered.len(), 1);
    }

    #[test]
    fn render_rect_is_rgb() {
        let (mut d, sink, _) = dispatcher(LayerFormat::Rgba);
        d.init().unwrap();
        d.render_rect(&solid(10, 10), CropRect::new(2, 3, 4, 5)).unwrap();
        let log = sink.log();
        let log = log.lock().unwrap();
        let f = log.last().unwrap();
        assert_eq!((f.format, f.width, f.height), (LayerFormat::Rgb, 4, 5));
        assert_eq!(&f.data[..3], &[7, 8, 9]);
        drop(log);
        let err = d.render_rect(&solid(10, 10), CropRect::new(8, 0, 4, 4)).unwrap_err();
        assert_eq!(err.result_code(), ResultCode::ErrParameter);
    }

    #[test]
    fn hw_scale_saturates() {
        let (mut d, _, zoom) = dispatcher(LayerFormat::Rgba);
        assert_eq!(d.scale_hw(0.1).unwrap(), ZoomOutcome::Min);
        assert_eq!(zoom.log().lock().unwrap().value, 26);
        assert_eq!(d.scale_hw(2.0).unwrap(), ZoomOutcome::Set(52));
        assert!(matches!(d.scale_hw(f32::NAN), Err(RenderError::InvalidZoom(_))));
        zoom.log().lock().unwrap().offline = true;
        assert_eq!(
            d.scale_hw(1.0).unwrap_err().result_code(),
            ResultCode::ErrInvalidOperation
        );
    }

    #[test]
    fn close_makes_the_sink_unready() {
        let (mut d, _, _) = dispatcher(LayerFormat::Rgb);
        d.init().unwrap();
        d.close();
        assert!(!d.is_ready());
        assert!(d.post().is_err());
    }
}
