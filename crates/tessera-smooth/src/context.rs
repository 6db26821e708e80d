//! Serialized callback execution.
//!
//! A [`CallbackContext`] is the sending half handed to asynchronous work; the
//! [`CallbackLoop`] is driven by the player's control task and runs posted
//! callbacks one at a time, in posting order. Everything executed through it
//! is serialized with the player's own control operations.

use tokio::sync::mpsc;
use tracing::trace;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Handle for posting callbacks onto a [`CallbackLoop`].
#[derive(Clone, Debug)]
pub struct CallbackContext {
    tx: mpsc::UnboundedSender<Callback>,
}

/// Executes callbacks posted through its [`CallbackContext`]s.
#[derive(Debug)]
pub struct CallbackLoop {
    rx: mpsc::UnboundedReceiver<Callback>,
}

impl CallbackContext {
    /// Create a context and the loop that drives it.
    pub fn new() -> (CallbackContext, CallbackLoop) {
        let (tx, rx) = mpsc::unbounded_channel();
        (CallbackContext { tx }, CallbackLoop { rx })
    }

    /// Post `callback` for execution on the loop.
    ///
    /// Returns `false` if the loop is gone; the callback is then dropped unexecuted.
    pub fn post<F>(&self, callback: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(callback)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl CallbackLoop {
    /// Wait for the next callback and run it.
    ///
    /// Returns `false` once every context is dropped and the queue is empty.
    pub async fn turn(&mut self) -> bool {
        match self.rx.recv().await {
            Some(callback) => {
                trace!("running posted callback");
                callback();
                true
            }
            None => false,
        }
    }

    /// Run callbacks that are already queued without waiting. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.try_recv() {
            callback();
            ran += 1;
        }
        ran
    }

    /// Run callbacks until every context is dropped.
    pub async fn run(mut self) {
        while self.turn().await {}
    }
}
