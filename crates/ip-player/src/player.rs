use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ip_core::ResultCode;

use crate::dump::DumpReport;
use crate::error::PlayerError;
use crate::session::Session;
use crate::worker::MovieWorker;

/// Image player: one [`Session`] behind a mutex, plus the animation worker.
///
/// Commands that replace the displayed content stop and join the worker
/// before touching the session; transform commands on an animation only
/// adjust its per-frame parameters and let it run.
pub struct ImagePlayer {
    session: Arc<Mutex<Session>>,
    worker: Option<MovieWorker>,
}

impl ImagePlayer {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            worker: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read access to the session, worker paused for the duration.
    pub fn with_session<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        f(&*self.lock())
    }

    /// True while the animation worker runs.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn stop_movie(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }

    /// Start the worker if the session holds an animation.
    fn play_if_movie(&mut self, code: ResultCode) -> ResultCode {
        if !code.is_ok() {
            return code;
        }
        let interval = {
            let session = self.lock();
            if !session.is_movie() {
                return code;
            }
            session.frame_interval()
        };
        self.stop_movie();
        match MovieWorker::spawn(Arc::clone(&self.session), interval) {
            Ok(worker) => {
                self.worker = Some(worker);
                code
            }
            Err(e) => {
                log::error!("thread d'animation impossible : {e}");
                ResultCode::ErrInvalidOperation
            }
        }
    }

    /// Run a command that replaces the displayed content.
    fn exclusive(&mut self, f: impl FnOnce(&mut Session) -> ResultCode) -> ResultCode {
        self.stop_movie();
        f(&mut *self.lock())
    }

    pub fn init(&mut self) -> ResultCode {
        self.exclusive(Session::init)
    }

    pub fn set_data_source(&mut self, uri: &str) -> ResultCode {
        self.exclusive(|s| s.set_data_source(uri))
    }

    pub fn set_data_source_fd(&mut self, fd: i32) -> ResultCode {
        self.exclusive(|s| s.set_data_source_fd(fd))
    }

    pub fn set_data_source_memory(&mut self, name: Option<String>, bytes: Vec<u8>) -> ResultCode {
        self.exclusive(|s| s.set_data_source_memory(name, bytes))
    }

    pub fn set_sample_surface_size(&mut self, sample: u32, width: u32, height: u32) -> ResultCode {
        self.lock().set_sample_surface_size(sample, width, height)
    }

    pub fn set_rotate(&mut self, degrees: f32, auto_crop: bool) -> ResultCode {
        self.lock().set_rotate(degrees, auto_crop)
    }

    pub fn set_scale(&mut self, sx: f32, sy: f32, auto_crop: bool) -> ResultCode {
        self.lock().set_scale(sx, sy, auto_crop)
    }

    pub fn set_hw_scale(&mut self, factor: f32) -> ResultCode {
        self.lock().set_hw_scale(factor)
    }

    pub fn set_translate(&mut self, tx: f32, ty: f32) -> ResultCode {
        self.lock().set_translate(tx, ty)
    }

    pub fn set_rotate_scale(&mut self, degrees: f32, sx: f32, sy: f32, auto_crop: bool) -> ResultCode {
        self.lock().set_rotate_scale(degrees, sx, sy, auto_crop)
    }

    pub fn set_crop_rect(&mut self, x: i32, y: i32, width: i32, height: i32) -> ResultCode {
        self.exclusive(|s| s.set_crop_rect(x, y, width, height))
    }

    pub fn prepare(&mut self) -> ResultCode {
        self.exclusive(Session::prepare)
    }

    /// Post the prepared image, or start playing the animation.
    pub fn show(&mut self) -> ResultCode {
        let code = self.exclusive(Session::show);
        self.play_if_movie(code)
    }

    pub fn start(&mut self) -> ResultCode {
        let code = self.exclusive(Session::start);
        self.play_if_movie(code)
    }

    pub fn prepare_buf(&mut self, uri: &str) -> ResultCode {
        self.exclusive(|s| s.prepare_buf(uri))
    }

    pub fn show_buf(&mut self) -> ResultCode {
        let code = self.exclusive(Session::show_buf);
        self.play_if_movie(code)
    }

    /// Stop the animation, free every bitmap, close the device.
    pub fn release(&mut self) -> ResultCode {
        self.exclusive(Session::release)
    }

    /// See [`Session::dump`].
    ///
    /// # Errors
    /// A bitmap could not be written.
    pub fn dump(&self, prefix: &Path) -> Result<DumpReport, PlayerError> {
        self.lock().dump(prefix)
    }
}

impl Drop for ImagePlayer {
    fn drop(&mut self) {
        self.stop_movie();
    }
}
