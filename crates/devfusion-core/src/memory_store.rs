//! In-process document store.
//!
//! Every write fans out a snapshot to each live subscriber of the room, in
//! write order. Used by tests and by the `memory` backend.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use devfusion_proto::{
    DocumentStore, EventSender, FileTree, Room, RoomEvent, RoomId, RoomSubscription, StoreError,
    StoreResult,
};
use tracing::trace;

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomId, Room>,
    subscribers: HashMap<RoomId, Vec<EventSender>>,
}

impl Inner {
    fn publish(&mut self, room_id: &RoomId) {
        let Some(room) = self.rooms.get(room_id) else {
            return;
        };
        if let Some(subs) = self.subscribers.get_mut(room_id) {
            // A send only fails once the subscription has been dropped.
            subs.retain(|tx| tx.send(Ok(RoomEvent::Snapshot(room.clone()))).is_ok());
            trace!(room_id = %room_id, subscribers = subs.len(), "Published snapshot");
        }
    }
}

/// A `DocumentStore` that lives entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Every update completes under the lock, so a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Removes a room, notifying subscribers that it is gone.
    pub fn remove(&self, room_id: &RoomId) -> Option<Room> {
        let mut inner = self.lock();
        let removed = inner.rooms.remove(room_id);
        if let Some(subs) = inner.subscribers.remove(room_id) {
            for tx in subs {
                let _ = tx.send(Ok(RoomEvent::Missing));
            }
        }
        removed
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, room_id: &RoomId) -> StoreResult<Option<Room>> {
        Ok(self.lock().rooms.get(room_id).cloned())
    }

    async fn create(&self, room: &Room) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.rooms.contains_key(&room.id) {
            return Err(StoreError::AlreadyExists(room.id.clone()));
        }
        inner.rooms.insert(room.id.clone(), room.clone());
        inner.publish(&room.id);
        Ok(())
    }

    async fn write_file_tree(&self, room_id: &RoomId, tree: &FileTree) -> StoreResult<()> {
        let mut inner = self.lock();
        let room = inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| StoreError::NotFound(room_id.clone()))?;
        room.file_tree = tree.clone();
        inner.publish(room_id);
        Ok(())
    }

    async fn subscribe(&self, room_id: &RoomId) -> StoreResult<RoomSubscription> {
        let (tx, subscription) = RoomSubscription::channel();
        let mut inner = self.lock();
        let initial = match inner.rooms.get(room_id) {
            Some(room) => RoomEvent::Snapshot(room.clone()),
            None => RoomEvent::Missing,
        };
        let exists = matches!(initial, RoomEvent::Snapshot(_));
        // The receiver is still in hand, so this send cannot fail.
        let _ = tx.send(Ok(initial));
        if exists {
            inner.subscribers.entry(room_id.clone()).or_default().push(tx);
        }
        Ok(subscription)
    }
}
