//! Request channel - Hands resize requests to a background worker
//!
//! The UI submits requests through [`ResizeChannel::submit`] and polls
//! [`ResizeChannel::try_recv`] for replies. A single worker thread runs the
//! requests one at a time, so two writes into the destination folder never
//! overlap.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread;

use uuid::Uuid;

use crate::file_ops::Filesystem;
use crate::resizer::{
    ResizeError, ResizeOrchestrator, ResizeOutcome, ResizePrimitive, ResizeRequest,
};

/// Requests that may wait behind the one being processed
pub const QUEUE_CAPACITY: usize = 4;

/// Inbound message, UI to worker
#[derive(Debug)]
pub enum ResizeMessage {
    Resize(ResizeRequest),
}

/// Outbound message, worker to UI
#[derive(Debug)]
pub struct ResizeReply {
    pub id: Uuid,
    pub image_path: PathBuf,
    pub outcome: Result<ResizeOutcome, ResizeError>,
}

impl ResizeReply {
    pub fn is_done(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// UI-side handle of the request channel
pub struct ResizeChannel {
    sender: SyncSender<ResizeMessage>,
    replies: Receiver<ResizeReply>,
    /// Output paths queued or in flight
    pending: Arc<Mutex<HashSet<PathBuf>>>,
    destination_folder: PathBuf,
}

impl ResizeChannel {
    /// Start the worker thread. `notify` runs after every reply is sent.
    pub fn spawn<P, F, N>(
        orchestrator: ResizeOrchestrator<P, F>,
        destination_folder: PathBuf,
        notify: N,
    ) -> Self
    where
        P: ResizePrimitive + 'static,
        F: Filesystem + 'static,
        N: Fn() + Send + 'static,
    {
        let (sender, inbox) = mpsc::sync_channel(QUEUE_CAPACITY);
        let (reply_tx, replies) = mpsc::channel();
        let pending = Arc::new(Mutex::new(HashSet::new()));
        let worker_pending = Arc::clone(&pending);

        thread::spawn(move || {
            while let Ok(message) = inbox.recv() {
                let ResizeMessage::Resize(request) = message;
                log::debug!("Worker picked up request {}", request.id);

                let outcome = orchestrator.resize(&request);

                if let Ok(output) = request.output_path() {
                    if let Ok(mut guard) = worker_pending.lock() {
                        guard.remove(&output);
                    }
                }

                let reply = ResizeReply {
                    id: request.id,
                    image_path: request.image_path,
                    outcome,
                };
                if reply_tx.send(reply).is_err() {
                    break;
                }
                notify();
            }
            log::debug!("Resize worker stopped");
        });

        Self {
            sender,
            replies,
            pending,
            destination_folder,
        }
    }

    pub fn destination_folder(&self) -> &Path {
        &self.destination_folder
    }

    /// Queue a request. The destination folder is always replaced with the
    /// channel's own.
    pub fn submit(&self, request: ResizeRequest) -> Result<Uuid, ResizeError> {
        let request = request.with_destination(self.destination_folder.clone());
        let output = request.output_path()?;
        let id = request.id;

        let mut pending = self.pending.lock().map_err(|_| ResizeError::Disconnected)?;
        if pending.contains(&output) {
            return Err(ResizeError::AlreadyPending(output));
        }

        match self.sender.try_send(ResizeMessage::Resize(request)) {
            Ok(()) => {
                pending.insert(output);
                log::debug!("Queued request {}", id);
                Ok(id)
            }
            Err(TrySendError::Full(_)) => Err(ResizeError::Busy),
            Err(TrySendError::Disconnected(_)) => Err(ResizeError::Disconnected),
        }
    }

    /// Next reply, if one has arrived
    pub fn try_recv(&self) -> Option<ResizeReply> {
        match self.replies.try_recv() {
            Ok(reply) => Some(reply),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::warn!("Resize worker disconnected");
                None
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }
}
