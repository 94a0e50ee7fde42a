//! The shared document store seam.
//!
//! Rooms live in an external real-time document store. Implementations only
//! need to support whole-document reads, a merge-write of the file tree
//! field, and a subscription that pushes snapshots as the document changes.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::room::{FileTree, Room, RoomEvent, RoomId};

/// Errors from document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The room document does not exist.
    #[error("room not found: {0}")]
    NotFound(RoomId),

    /// A room with this id already exists.
    #[error("room already exists: {0}")]
    AlreadyExists(RoomId),

    /// Transport failure talking to the store.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error status.
    #[error("store error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A document could not be encoded or decoded.
    #[error("malformed room document: {0}")]
    Malformed(String),

    /// Local I/O failure (file-backed stores).
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A live subscription to one room document.
///
/// Events arrive in the order the store produced them and are never
/// dropped for a slow reader. Dropping the subscription closes the channel,
/// which tells the producer to stop.
pub struct RoomSubscription {
    rx: mpsc::UnboundedReceiver<StoreResult<RoomEvent>>,
}

/// Producer half of a [`RoomSubscription`].
pub type EventSender = mpsc::UnboundedSender<StoreResult<RoomEvent>>;

impl RoomSubscription {
    /// Creates a subscription together with the sender a producer feeds.
    pub fn channel() -> (EventSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Waits for the next event. `None` means the producer has gone away.
    pub async fn recv(&mut self) -> Option<StoreResult<RoomEvent>> {
        self.rx.recv().await
    }

    /// Returns an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<StoreResult<RoomEvent>> {
        self.rx.try_recv().ok()
    }
}

impl Stream for RoomSubscription {
    type Item = StoreResult<RoomEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl std::fmt::Debug for RoomSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSubscription").finish_non_exhaustive()
    }
}

/// A remote (or local) store holding room documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a room once. `Ok(None)` when the document does not exist.
    async fn fetch(&self, room_id: &RoomId) -> StoreResult<Option<Room>>;

    /// Creates a new room document. Fails with `AlreadyExists` instead of
    /// overwriting an existing one.
    async fn create(&self, room: &Room) -> StoreResult<()>;

    /// Overwrites the file tree field of an existing room, leaving the rest
    /// of the document untouched.
    async fn write_file_tree(&self, room_id: &RoomId, tree: &FileTree) -> StoreResult<()>;

    /// Subscribes to snapshots of a room. The current state is delivered
    /// first, followed by one event per observed change.
    async fn subscribe(&self, room_id: &RoomId) -> StoreResult<RoomSubscription>;
}
