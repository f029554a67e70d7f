use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender};
use ip_core::ResultCode;

use crate::session::Session;

/// Commandes envoyées au thread d'animation.
#[derive(Debug, Clone, Copy)]
pub enum MovieCommand {
    /// Arrêter après la frame en cours.
    Quit,
}

/// Thread stepping the session's animation.
pub struct MovieWorker {
    cmd_tx: Sender<MovieCommand>,
    handle: JoinHandle<()>,
}

impl MovieWorker {
    /// Spawne le thread `ip-movie`.
    ///
    /// A frame is shown right away, then one every `interval`.
    ///
    /// # Errors
    /// The thread could not be spawned.
    pub fn spawn(session: Arc<Mutex<Session>>, interval: Duration) -> io::Result<Self> {
        let (cmd_tx, cmd_rx) = flume::bounded(1);
        let handle = thread::Builder::new()
            .name("ip-movie".to_string())
            .spawn(move || movie_loop(&session, &cmd_rx, interval))?;
        log::debug!("thread d'animation démarré ({interval:?})");
        Ok(Self { cmd_tx, handle })
    }

    /// True once the loop has returned on its own.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the loop to stop and wait for it.
    ///
    /// Blocks at most one frame.
    pub fn stop(self) {
        let _ = self.cmd_tx.send(MovieCommand::Quit);
        if self.handle.join().is_err() {
            log::error!("le thread d'animation a paniqué");
        }
        log::debug!("thread d'animation arrêté");
    }
}

fn movie_loop(session: &Mutex<Session>, cmd_rx: &Receiver<MovieCommand>, interval: Duration) {
    loop {
        {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            if !session.is_movie() {
                log::debug!("plus d'animation, fin du thread");
                return;
            }
            let code = session.movie_tick();
            if code != ResultCode::Ok {
                log::warn!("frame d'animation non affichée : {code}");
            }
        }
        match cmd_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(MovieCommand::Quit) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
