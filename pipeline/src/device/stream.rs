use std::{
    fmt,
    thread::{self, JoinHandle},
};

use log::{debug, error};
use tokio::sync::{mpsc, oneshot};

use super::Placement;
use crate::{PipelineErr, Result};

type Job = Box<dyn FnOnce() -> Result<()> + Send + 'static>;

enum Command {
    Run(Job),
    Fence(oneshot::Sender<Option<String>>),
}

/// An ordered queue of commands executed asynchronously from the host.
///
/// Commands submitted to the same stream run one after the other in
/// submission order. Commands on different streams may overlap.
///
/// The first failing command poisons the stream: every later command is
/// skipped and every later `wait` reports that failure.
///
/// Dropping the stream drains the queue and joins its thread.
pub struct Stream {
    id: usize,
    placement: Placement,
    tx: Option<mpsc::UnboundedSender<Command>>,
    handle: Option<JoinHandle<()>>,
}

impl Stream {
    /// Creates a new stream bound to a device.
    ///
    /// # Arguments
    /// * `id` - Identifier used for the thread name and observability.
    /// * `placement` - The device the stream issues work on.
    ///
    /// # Returns
    /// A new `Stream` or an io error if its thread couldn't be spawned.
    pub fn new(id: usize, placement: Placement) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = thread::Builder::new()
            .name(format!("stream-{id}"))
            .spawn(move || drain(id, rx))?;

        debug!(stream = id; "stream created on {placement:?}");

        Ok(Self {
            id,
            placement,
            tx: Some(tx),
            handle: Some(handle),
        })
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Enqueues `job` and returns immediately.
    ///
    /// # Returns
    /// An error if the stream's thread is gone.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        self.send(Command::Run(Box::new(job)))
    }

    /// Blocks until every command submitted so far has run.
    ///
    /// # Returns
    /// The failure that poisoned the stream, if any.
    pub fn wait(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Fence(ack_tx))?;

        match ack_rx.blocking_recv() {
            Ok(None) => Ok(()),
            Ok(Some(msg)) => Err(PipelineErr::Stream {
                stream: self.id,
                msg,
            }),
            Err(_) => Err(PipelineErr::StreamClosed { stream: self.id }),
        }
    }

    fn send(&self, cmd: Command) -> Result<()> {
        let closed = PipelineErr::StreamClosed { stream: self.id };
        let tx = self.tx.as_ref().ok_or(closed)?;
        tx.send(cmd)
            .map_err(|_| PipelineErr::StreamClosed { stream: self.id })
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("id", &self.id)
            .field("placement", &self.placement)
            .finish()
    }
}

impl Drop for Stream {
    fn drop(&mut self) {
        // Closing the queue lets the thread run what is left and exit.
        self.tx.take();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(stream = self.id; "stream thread panicked");
            }
        }
    }
}

fn drain(id: usize, mut rx: mpsc::UnboundedReceiver<Command>) {
    let mut failure: Option<String> = None;

    while let Some(cmd) = rx.blocking_recv() {
        match cmd {
            Command::Run(job) => {
                if failure.is_some() {
                    continue;
                }

                if let Err(e) = job() {
                    error!(stream = id; "command failed: {e}");
                    failure = Some(e.to_string());
                }
            }
            Command::Fence(ack) => {
                // The waiter may have given up, nothing to do then.
                let _ = ack.send(failure.clone());
            }
        }
    }

    debug!(stream = id; "stream drained");
}
