use std::sync::Arc;
use std::time::Duration;

use ip_core::config::PlayerConfig;
use ip_core::traits::{FrameSink, ZoomControl};
use ip_core::{Bitmap, CropRect, ResultCode, SurfaceTarget};
use ip_render::{Dispatcher, ZoomOutcome};
use ip_source::{DataSource, ImageCodec, Loaded, Loader, Movie, Probe};
use ip_transform::fit::crop_to_surface;
use ip_transform::geometry::{rotate, scale, scaled_size};
use ip_transform::step::check_scale;
use ip_transform::{Placement, TransformState, Update, fill_surface, scale_step};

use crate::error::PlayerError;

/// Animated image being played, with its per-frame transform.
#[derive(Debug)]
pub struct MoviePlayback {
    movie: Movie,
    scale: f32,
    degrees: f32,
    reset_zoom: bool,
    last: Option<Bitmap>,
}

impl MoviePlayback {
    fn new(movie: Movie) -> Self {
        Self {
            movie,
            scale: 1.0,
            degrees: 0.0,
            reset_zoom: false,
            last: None,
        }
    }

    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.movie.frame_count()
    }

    /// Index of the next frame to show.
    #[must_use]
    pub fn index(&self) -> usize {
        self.movie.index()
    }

    /// Scale applied to every frame.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Rotation applied to every frame, in degrees.
    #[must_use]
    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    /// Last frame handed to the sink, after its transform.
    #[must_use]
    pub fn last_frame(&self) -> Option<&Bitmap> {
        self.last.as_ref()
    }
}

/// One image-player session.
///
/// Holds the data source, the prepared bitmap, the side buffer of
/// `prepare_buf`, the transform state and the animation being played.
/// Every command returns a [`ResultCode`]; a failed command leaves the
/// session as it was.
///
/// # Example
/// ```
/// use ip_core::ResultCode;
/// use ip_core::config::PlayerConfig;
/// use ip_player::Session;
/// use ip_render::{MemorySink, MemoryZoom};
/// let mut session = Session::from_config(
///     PlayerConfig::default(),
///     Box::new(MemorySink::new()),
///     Box::new(MemoryZoom::default()),
/// );
/// assert_eq!(session.init(), ResultCode::Ok);
/// assert_eq!(session.prepare(), ResultCode::ErrBadValue);
/// ```
pub struct Session {
    config: PlayerConfig,
    loader: Loader,
    dispatcher: Dispatcher,
    surface: SurfaceTarget,
    sample_size: u32,
    source: Option<DataSource>,
    probe: Option<Probe>,
    image: Option<Bitmap>,
    buffer: Option<Loaded>,
    movie: Option<MoviePlayback>,
    state: TransformState,
}

impl Session {
    #[must_use]
    pub fn new(config: PlayerConfig, loader: Loader, dispatcher: Dispatcher) -> Self {
        Self {
            surface: config.surface(),
            config,
            loader,
            dispatcher,
            sample_size: 1,
            source: None,
            probe: None,
            image: None,
            buffer: None,
            movie: None,
            state: TransformState::new(),
        }
    }

    /// Session with the `image` codec, the configured size ceiling and
    /// initial parameters, driving `sink` and `zoom`.
    #[must_use]
    pub fn from_config(
        config: PlayerConfig,
        sink: Box<dyn FrameSink>,
        zoom: Box<dyn ZoomControl>,
    ) -> Self {
        let loader = Loader::new(ImageCodec::new(config.max_picture_size))
            .with_initial(config.initial.clone());
        let dispatcher = Dispatcher::from_config(sink, zoom, &config);
        Self::new(config, loader, dispatcher)
    }

    /// Run `command` and collapse its outcome to a result code.
    fn run(
        &mut self,
        name: &str,
        command: impl FnOnce(&mut Self) -> Result<ResultCode, PlayerError>,
    ) -> ResultCode {
        match command(self) {
            Ok(code) => {
                log::debug!("{name} → {code}");
                code
            }
            Err(e) => {
                let code = e.result_code();
                log::error!("{name} : {e} → {code}");
                code
            }
        }
    }

    // === Accessors ===

    #[must_use]
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Delay between two animation frames.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.config.frame_interval_ms)
    }

    #[must_use]
    pub fn surface(&self) -> SurfaceTarget {
        self.surface
    }

    #[must_use]
    pub fn sample_size(&self) -> u32 {
        self.sample_size
    }

    #[must_use]
    pub fn source(&self) -> Option<&DataSource> {
        self.source.as_ref()
    }

    /// Dimensions read by the last successful `set_data_source`.
    #[must_use]
    pub fn probe(&self) -> Option<Probe> {
        self.probe
    }

    /// Prepared bitmap, fit to the surface.
    #[must_use]
    pub fn image(&self) -> Option<&Bitmap> {
        self.image.as_ref()
    }

    /// Side buffer filled by `prepare_buf`.
    #[must_use]
    pub fn buffer(&self) -> Option<&Loaded> {
        self.buffer.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> &TransformState {
        &self.state
    }

    #[must_use]
    pub fn movie(&self) -> Option<&MoviePlayback> {
        self.movie.as_ref()
    }

    /// True while an animated image is loaded.
    #[must_use]
    pub fn is_movie(&self) -> bool {
        self.movie.is_some()
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // === Commands ===

    /// Open the display device and show a blank frame.
    pub fn init(&mut self) -> ResultCode {
        self.run("init", |s| {
            s.dispatcher.init()?;
            Ok(ResultCode::Ok)
        })
    }

    /// Select a `file://`, `http(s)://` URI or a plain path.
    ///
    /// The stream is probed; an unreadable or unsupported one is rejected
    /// and no source is kept.
    pub fn set_data_source(&mut self, uri: &str) -> ResultCode {
        self.run("set_data_source", |s| {
            let source = DataSource::parse(uri)?;
            s.attach(source)
        })
    }

    /// Select an open file descriptor.
    pub fn set_data_source_fd(&mut self, fd: i32) -> ResultCode {
        self.run("set_data_source_fd", |s| s.attach(DataSource::from_fd(fd)))
    }

    /// Select an in-memory encoded image; `name` carries its extension.
    pub fn set_data_source_memory(&mut self, name: Option<String>, bytes: impl Into<Arc<[u8]>>) -> ResultCode {
        let source = DataSource::from_memory(name, bytes);
        self.run("set_data_source_memory", |s| s.attach(source))
    }

    fn attach(&mut self, source: DataSource) -> Result<ResultCode, PlayerError> {
        self.image = None;
        self.movie = None;
        self.source = None;
        self.probe = None;
        self.state.reset();

        let probe = self.loader.probe(&source)?;
        log::info!("source {source} : {}×{} {:?}", probe.width, probe.height, probe.kind);
        self.source = Some(source);
        self.probe = Some(probe);
        Ok(ResultCode::Ok)
    }

    /// Set the decode sample size and the display surface (clamped to 4K).
    pub fn set_sample_surface_size(&mut self, sample: u32, width: u32, height: u32) -> ResultCode {
        self.sample_size = sample.max(1);
        self.surface = SurfaceTarget::new(width, height);
        log::debug!("surface {}×{}, sample {}", self.surface.width, self.surface.height, self.sample_size);
        ResultCode::Ok
    }

    /// Rotate the prepared image; scale and pan are reset.
    ///
    /// For an animation, sets the per-frame rotation and cancels its scale.
    pub fn set_rotate(&mut self, degrees: f32, auto_crop: bool) -> ResultCode {
        self.run("set_rotate", |s| {
            if let Some(movie) = s.movie.as_mut() {
                if !degrees.is_finite() {
                    return Err(ip_transform::TransformError::InvalidAngle(degrees).into());
                }
                movie.scale = 1.0;
                movie.degrees = degrees;
                movie.reset_zoom = true;
                return Ok(ResultCode::Ok);
            }
            let image = s.image.as_ref().ok_or(PlayerError::NoImage)?;
            let update = s.state.set_rotation(image, degrees, auto_crop, s.surface)?;
            s.present(update)
        })
    }

    /// Multiply the current scale by `(sx, sy)`.
    ///
    /// For an animation, multiplies the per-frame scale by `sx`.
    pub fn set_scale(&mut self, sx: f32, sy: f32, auto_crop: bool) -> ResultCode {
        self.run("set_scale", |s| {
            check_scale(sx)?;
            check_scale(sy)?;
            if let Some(movie) = s.movie.as_mut() {
                let next = movie.scale * sx;
                check_scale(next)?;
                movie.scale = next;
                s.state.reset_pan();
                return Ok(ResultCode::Ok);
            }
            let image = s.image.as_ref().ok_or(PlayerError::NoImage)?;
            let update = s.state.apply_relative_scale(image, sx, sy, auto_crop, s.surface)?;
            s.present(update)
        })
    }

    /// Multiply the hardware zoom by `factor`.
    ///
    /// `OkScaleMax` / `OkScaleMin` when the zoom saturated.
    pub fn set_hw_scale(&mut self, factor: f32) -> ResultCode {
        self.run("set_hw_scale", |s| {
            s.state.reset_pan();
            Ok(match s.dispatcher.scale_hw(factor)? {
                ZoomOutcome::Set(_) => ResultCode::Ok,
                ZoomOutcome::Max => ResultCode::OkScaleMax,
                ZoomOutcome::Min => ResultCode::OkScaleMin,
            })
        })
    }

    /// Pan the scaled image by `(tx, ty)` pixels. Ignored for animations.
    pub fn set_translate(&mut self, tx: f32, ty: f32) -> ResultCode {
        self.run("set_translate", |s| {
            if s.movie.is_some() {
                return Ok(ResultCode::Ok);
            }
            let image = s.image.as_ref().ok_or(PlayerError::NoImage)?;
            let update = s.state.apply_relative_translate(image, tx, ty, s.surface)?;
            s.present(update)
        })
    }

    /// Rotate and scale the prepared image in one pass, from identity.
    pub fn set_rotate_scale(&mut self, degrees: f32, sx: f32, sy: f32, auto_crop: bool) -> ResultCode {
        self.run("set_rotate_scale", |s| {
            check_scale(sx)?;
            check_scale(sy)?;
            if let Some(movie) = s.movie.as_mut() {
                if !degrees.is_finite() {
                    return Err(ip_transform::TransformError::InvalidAngle(degrees).into());
                }
                movie.degrees = degrees;
                movie.scale = sx;
                return Ok(ResultCode::Ok);
            }
            let image = s.image.as_ref().ok_or(PlayerError::NoImage)?;
            let update = s
                .state
                .set_rotation_and_scale(image, degrees, sx, sy, auto_crop, s.surface)?;
            s.present(update)
        })
    }

    /// Show the `(x, y, width, height)` part of the prepared image as RGB24.
    pub fn set_crop_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> ResultCode {
        self.run("set_crop_rect", |s| {
            let image = s.image.as_ref().ok_or(PlayerError::NoBitmap)?;
            s.dispatcher.render_rect(image, CropRect::new(x, y, width, height))?;
            s.dispatcher.post()?;
            Ok(ResultCode::Ok)
        })
    }

    /// Decode the source, fit it to the surface and render it (not posted).
    ///
    /// An animation switches the session to movie mode instead.
    pub fn prepare(&mut self) -> ResultCode {
        self.run("prepare", Self::prepare_inner)
    }

    fn prepare_inner(&mut self) -> Result<ResultCode, PlayerError> {
        let source = self.source.as_ref().ok_or(PlayerError::NoSource)?;
        if let Some(p) = self.probe {
            self.check_size(p.width, p.height)?;
        }
        match self.loader.load(source).map_err(PlayerError::Decode)? {
            Loaded::Movie(movie) => {
                log::info!("prepare : animation de {} frames", movie.frame_count());
                self.image = None;
                self.state.reset();
                self.movie = Some(MoviePlayback::new(movie));
                Ok(ResultCode::Ok)
            }
            Loaded::Still(bitmap) => {
                if !self.dispatcher.is_ready() {
                    return Err(PlayerError::NotReady);
                }
                let fitted = fill_surface(&bitmap, self.surface)?.unwrap_or(bitmap);
                self.dispatcher.render(&fitted)?;
                self.image = Some(fitted);
                self.movie = None;
                self.state.reset();
                Ok(ResultCode::Ok)
            }
        }
    }

    fn check_size(&self, width: u32, height: u32) -> Result<(), PlayerError> {
        let max = self.config.max_picture_size;
        if width > max || height > max {
            return Err(PlayerError::TooLarge { width, height, max });
        }
        Ok(())
    }

    /// Post the prepared image. Animations are shown by the worker.
    pub fn show(&mut self) -> ResultCode {
        self.run("show", |s| {
            if s.movie.is_some() {
                return Ok(ResultCode::Ok);
            }
            if s.image.is_none() {
                return Err(PlayerError::NoImage);
            }
            s.dispatcher.post()?;
            Ok(ResultCode::Ok)
        })
    }

    /// `prepare` then `show`.
    pub fn start(&mut self) -> ResultCode {
        let code = self.prepare();
        if !code.is_ok() {
            return code;
        }
        self.show()
    }

    /// Decode `uri` into the side buffer, fit to the surface.
    pub fn prepare_buf(&mut self, uri: &str) -> ResultCode {
        self.run("prepare_buf", |s| {
            s.buffer = None;
            let source = DataSource::parse(uri)?;
            let probe = s.loader.probe(&source)?;
            s.check_size(probe.width, probe.height)?;
            let loaded = match s.loader.load(&source).map_err(PlayerError::Decode)? {
                Loaded::Still(bitmap) => {
                    Loaded::Still(fill_surface(&bitmap, s.surface)?.unwrap_or(bitmap))
                }
                movie @ Loaded::Movie(_) => movie,
            };
            log::info!("prepare_buf {source} : {:?}", loaded.dimensions());
            s.buffer = Some(loaded);
            Ok(ResultCode::Ok)
        })
    }

    /// Make the side buffer current and show it.
    ///
    /// A buffered animation switches the session to movie mode; the worker
    /// takes over from there.
    pub fn show_buf(&mut self) -> ResultCode {
        self.run("show_buf", |s| {
            if !s.dispatcher.is_ready() {
                return Err(PlayerError::NotReady);
            }
            match s.buffer.as_ref().ok_or(PlayerError::NoBitmap)? {
                Loaded::Movie(movie) => {
                    let mut movie = movie.clone();
                    movie.rewind();
                    s.image = None;
                    s.state.reset();
                    s.movie = Some(MoviePlayback::new(movie));
                }
                Loaded::Still(bitmap) => {
                    s.dispatcher.show(bitmap)?;
                    s.image = Some(bitmap.clone());
                    s.movie = None;
                    s.state.reset();
                }
            }
            Ok(ResultCode::Ok)
        })
    }

    /// Drop every bitmap, reset the zoom and close the device.
    pub fn release(&mut self) -> ResultCode {
        self.source = None;
        self.probe = None;
        self.image = None;
        self.buffer = None;
        self.movie = None;
        self.state.reset();
        if let Err(e) = self.dispatcher.reset_zoom() {
            log::warn!("release : {e}");
        }
        self.dispatcher.close();
        log::info!("session libérée");
        ResultCode::Ok
    }

    /// Render and post the next animation frame.
    ///
    /// The frame is fit to the surface, scaled (stepwise when the result
    /// exceeds the surface), rotated, then posted without touching the zoom,
    /// except once after a rotation change.
    pub fn movie_tick(&mut self) -> ResultCode {
        self.run("movie_tick", Self::movie_frame)
    }

    fn movie_frame(&mut self) -> Result<ResultCode, PlayerError> {
        let surface = self.surface;
        let playback = self.movie.as_mut().ok_or(PlayerError::NoImage)?;
        let frame = playback.movie.advance();
        let mut out = match fill_surface(frame, surface)? {
            Some(fitted) => fitted,
            None => frame.clone(),
        };

        let k = playback.scale;
        if k != 1.0 {
            let (w, h) = scaled_size(out.width(), out.height(), k, k)?;
            out = if surface.fits(w, h) {
                scale(&out, k, k)?
            } else {
                scale_step(&out, k, surface, Placement::Center)?.bitmap
            };
        }
        if playback.degrees != 0.0 {
            out = crop_to_surface(rotate(&out, playback.degrees)?, surface)?;
        }

        self.dispatcher.render(&out)?;
        if playback.reset_zoom {
            if let Err(e) = self.dispatcher.reset_zoom() {
                log::warn!("{e}");
            }
            playback.reset_zoom = false;
        }
        self.dispatcher.post_raw()?;
        playback.last = Some(out);
        Ok(ResultCode::Ok)
    }

    /// Show what a state update produced.
    fn present(&mut self, update: Update) -> Result<ResultCode, PlayerError> {
        match update {
            Update::Transient(bitmap) => self.dispatcher.show(&bitmap)?,
            Update::Rotated | Update::Scaled => {
                if let Some(bitmap) = self.state.displayed() {
                    self.dispatcher.show(bitmap)?;
                }
            }
            Update::Unchanged => {}
        }
        Ok(ResultCode::Ok)
    }
}
