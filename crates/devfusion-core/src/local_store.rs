//! File-backed document store.
//!
//! Each room is one JSON document at `<dir>/<room_id>.json`, in the same
//! shape the remote store uses. Subscriptions poll the file and emit a
//! snapshot whenever its contents change, so several processes sharing the
//! directory see each other's writes.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use devfusion_proto::{
    DocumentStore, FileTree, Room, RoomId, RoomSubscription, StoreError, StoreResult,
};

use crate::poller::spawn_poller;

/// A `DocumentStore` over a directory of JSON files.
#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
    poll_interval: Duration,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            dir: dir.into(),
            poll_interval,
        }
    }

    fn path_for(&self, room_id: &RoomId) -> PathBuf {
        self.dir.join(format!("{room_id}.json"))
    }

    async fn read_raw(path: &Path) -> StoreResult<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn decode(room_id: &RoomId, raw: &str) -> StoreResult<Room> {
        let mut room: Room =
            serde_json::from_str(raw).map_err(|e| StoreError::Malformed(e.to_string()))?;
        room.id = room_id.clone();
        Ok(room)
    }

    async fn write_room(&self, room: &Room) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let body =
            serde_json::to_string_pretty(room).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let path = self.path_for(&room.id);
        let dir = self.dir.clone();
        // Pollers must never see a half-written file. Every write gets its
        // own temp file next to the target, then renames over it.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(body.as_bytes())?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("write task failed: {e}")))??;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn fetch(&self, room_id: &RoomId) -> StoreResult<Option<Room>> {
        match Self::read_raw(&self.path_for(room_id)).await? {
            Some(raw) => Self::decode(room_id, &raw).map(Some),
            None => Ok(None),
        }
    }

    async fn create(&self, room: &Room) -> StoreResult<()> {
        if tokio::fs::try_exists(self.path_for(&room.id)).await? {
            return Err(StoreError::AlreadyExists(room.id.clone()));
        }
        self.write_room(room).await
    }

    async fn write_file_tree(&self, room_id: &RoomId, tree: &FileTree) -> StoreResult<()> {
        let mut room = self
            .fetch(room_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(room_id.clone()))?;
        room.file_tree = tree.clone();
        self.write_room(&room).await
    }

    async fn subscribe(&self, room_id: &RoomId) -> StoreResult<RoomSubscription> {
        let path = self.path_for(room_id);
        let id = room_id.clone();
        let fetch = move || {
            let path = path.clone();
            let id = id.clone();
            async move {
                // The raw file text doubles as the version tag.
                match Self::read_raw(&path).await? {
                    Some(raw) => Self::decode(&id, &raw).map(|room| Some((raw, room))),
                    None => Ok(None),
                }
            }
        };
        Ok(spawn_poller(room_id.clone(), self.poll_interval, fetch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devfusion_proto::{FileEntry, FileId, RoomEvent};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalStore {
        LocalStore::new(dir.path().join("rooms"), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let room = Room::new("r1".parse().unwrap(), "Write tests");
        store.create(&room).await.unwrap();

        let loaded = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(loaded, room);
        assert!(dir.path().join("rooms/r1.json").exists());
    }

    #[tokio::test]
    async fn create_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let room = Room::new("r1".parse().unwrap(), "a");
        store.create(&room).await.unwrap();
        assert!(matches!(
            store.create(&room).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn write_file_tree_keeps_objective() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let room = Room::new("r1".parse().unwrap(), "Keep me");
        store.create(&room).await.unwrap();

        let tree: FileTree = [FileEntry::file(FileId::generate(), "a.js", "1")]
            .into_iter()
            .collect();
        store.write_file_tree(&room.id, &tree).await.unwrap();

        let loaded = store.fetch(&room.id).await.unwrap().unwrap();
        assert_eq!(loaded.objective, "Keep me");
        assert_eq!(loaded.file_tree, tree);
    }

    #[tokio::test]
    async fn subscription_reports_changes_and_deletion() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let room = Room::new("r1".parse().unwrap(), "watch");
        store.create(&room).await.unwrap();
        let mut sub = store.subscribe(&room.id).await.unwrap();

        assert!(matches!(
            sub.recv().await,
            Some(Ok(RoomEvent::Snapshot(_)))
        ));

        let tree: FileTree = [FileEntry::file(FileId::generate(), "b.py", "")]
            .into_iter()
            .collect();
        store.write_file_tree(&room.id, &tree).await.unwrap();
        let Some(Ok(RoomEvent::Snapshot(updated))) = sub.recv().await else {
            panic!("expected updated snapshot");
        };
        assert_eq!(updated.file_tree, tree);

        std::fs::remove_file(dir.path().join("rooms/r1.json")).unwrap();
        assert!(matches!(sub.recv().await, Some(Ok(RoomEvent::Missing))));
    }

    #[tokio::test]
    async fn subscribing_to_unknown_room_reports_missing() {
        let dir = TempDir::new().unwrap();
        let mut sub = store(&dir).subscribe(&"ghost".parse().unwrap()).await.unwrap();
        assert!(matches!(sub.recv().await, Some(Ok(RoomEvent::Missing))));
    }

    #[tokio::test]
    async fn concurrent_writes_leave_one_complete_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let room = Room::new("r1".parse().unwrap(), "race");
        store.create(&room).await.unwrap();

        let trees: Vec<FileTree> = (0..8)
            .map(|n| {
                [FileEntry::file(FileId::generate(), format!("f{n}.js"), "x".repeat(4096))]
                    .into_iter()
                    .collect()
            })
            .collect();
        let writes = trees.iter().map(|tree| store.write_file_tree(&room.id, tree));
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let loaded = store.fetch(&room.id).await.unwrap().unwrap();
        assert!(trees.contains(&loaded.file_tree));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("rooms"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("r1.json")]);
    }
}
