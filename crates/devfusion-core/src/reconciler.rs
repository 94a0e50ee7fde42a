//! File tree reconciliation between local edits and remote snapshots.
//!
//! The reconciler holds the last snapshot of a room plus the editor's
//! selection. Local operations mutate the tree and hand back the complete
//! new tree, which the caller writes to the store. Remote snapshots replace
//! the local tree wholesale; the store decides ordering.
//!
//! # Invariants
//! - The active id, when set, names a `file` entry present in the tree.
//! - An edit that leaves content unchanged produces no write. This absorbs
//!   the editor's change callback that fires right after a snapshot lands.

use devfusion_proto::{FileEntry, FileId, FileTree, Room, RoomEvent, RoomId};
use thiserror::Error;
use tracing::debug;

use crate::language::comment_prefix;

/// Errors from local file tree operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// No snapshot has been received yet.
    #[error("room has not loaded yet")]
    NotLoaded,

    /// The room document was deleted remotely.
    #[error("room was closed")]
    Closed,

    #[error("no file is open")]
    NoActiveFile,

    #[error("no such entry: {0}")]
    NotFound(String),

    #[error("'{0}' matches more than one entry; use its id")]
    Ambiguous(String),

    #[error("'{0}' is a folder")]
    NotAFile(FileId),

    #[error("parent '{0}' is not a folder")]
    ParentNotFolder(FileId),

    #[error("name must not be blank")]
    BlankName,
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// What a remote event did to local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// First snapshot received.
    Loaded,
    /// A later snapshot replaced the tree.
    Updated {
        /// Set when the active file was removed by someone else.
        active_removed: bool,
    },
    /// Snapshot matched what we already held.
    Unchanged,
    /// The document no longer exists.
    Closed,
}

/// Result of editing the active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Content changed; persist this tree.
    Changed(FileTree),
    /// Content matched the snapshot just applied.
    Echo,
    /// Content matched the current tree.
    Unchanged,
}

/// In-memory file tree plus editor selection for one room.
///
/// Cloning takes a checkpoint that can be put back if a write fails.
#[derive(Debug, Clone)]
pub struct Reconciler {
    room_id: RoomId,
    room: Option<Room>,
    active: Option<FileId>,
    closed: bool,
    /// Set by `apply_remote`, consumed by the next edit.
    remote_applied: bool,
}

impl Reconciler {
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            room: None,
            active: None,
            closed: false,
            remote_applied: false,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn active_id(&self) -> Option<&FileId> {
        self.active.as_ref()
    }

    pub fn active_file(&self) -> Option<&FileEntry> {
        let id = self.active.as_ref()?;
        self.room.as_ref()?.file_tree.get(id)
    }

    /// Merges a remote event into local state.
    pub fn apply_remote(&mut self, event: RoomEvent) -> RemoteOutcome {
        let mut snapshot = match event {
            RoomEvent::Snapshot(room) => room,
            RoomEvent::Missing => {
                self.closed = true;
                self.active = None;
                return RemoteOutcome::Closed;
            }
        };
        snapshot.id = self.room_id.clone();
        self.closed = false;

        let first = self.room.is_none();
        if !first && self.room.as_ref() == Some(&snapshot) {
            return RemoteOutcome::Unchanged;
        }

        let active_removed = self
            .active
            .as_ref()
            .is_some_and(|id| !snapshot.file_tree.get(id).is_some_and(FileEntry::is_file));
        if active_removed {
            debug!(room_id = %self.room_id, "Active file removed remotely");
            self.active = None;
        }
        if self.active.is_none() {
            self.active = snapshot.file_tree.first_file().map(|f| f.id.clone());
        }

        self.room = Some(snapshot);
        self.remote_applied = true;

        if first {
            RemoteOutcome::Loaded
        } else {
            RemoteOutcome::Updated { active_removed }
        }
    }

    fn tree(&self) -> ReconcileResult<&FileTree> {
        if self.closed {
            return Err(ReconcileError::Closed);
        }
        self.room
            .as_ref()
            .map(|room| &room.file_tree)
            .ok_or(ReconcileError::NotLoaded)
    }

    fn tree_mut(&mut self) -> ReconcileResult<&mut FileTree> {
        if self.closed {
            return Err(ReconcileError::Closed);
        }
        self.room
            .as_mut()
            .map(|room| &mut room.file_tree)
            .ok_or(ReconcileError::NotLoaded)
    }

    /// Finds an entry by id, falling back to a unique name match.
    pub fn resolve(&self, query: &str) -> ReconcileResult<FileId> {
        let tree = self.tree()?;
        if let Some(entry) = tree.iter().find(|e| e.id.as_str() == query) {
            return Ok(entry.id.clone());
        }
        let mut by_name = tree.iter().filter(|e| e.name == query);
        match (by_name.next(), by_name.next()) {
            (Some(entry), None) => Ok(entry.id.clone()),
            (Some(_), Some(_)) => Err(ReconcileError::Ambiguous(query.to_string())),
            (None, _) => Err(ReconcileError::NotFound(query.to_string())),
        }
    }

    /// Makes `id` the active file.
    pub fn select(&mut self, id: &FileId) -> ReconcileResult<&FileEntry> {
        let entry = self
            .tree()?
            .get(id)
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;
        if !entry.is_file() {
            return Err(ReconcileError::NotAFile(id.clone()));
        }
        self.active = Some(id.clone());
        self.active_file().ok_or(ReconcileError::NoActiveFile)
    }

    /// Replaces the active file's content.
    pub fn edit_active(&mut self, content: &str) -> ReconcileResult<EditOutcome> {
        self.tree()?;
        let echo = std::mem::take(&mut self.remote_applied);
        let id = self.active.clone().ok_or(ReconcileError::NoActiveFile)?;
        let tree = self.tree_mut()?;
        let entry = tree
            .get_mut(&id)
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;

        if entry.text() == content {
            return Ok(if echo {
                EditOutcome::Echo
            } else {
                EditOutcome::Unchanged
            });
        }
        entry.content = Some(content.to_string());
        Ok(EditOutcome::Changed(tree.clone()))
    }

    fn check_parent(&self, parent: Option<&FileId>) -> ReconcileResult<()> {
        let Some(parent) = parent else {
            return Ok(());
        };
        match self.tree()?.get(parent) {
            Some(entry) if entry.is_folder() => Ok(()),
            Some(_) => Err(ReconcileError::ParentNotFolder(parent.clone())),
            None => Err(ReconcileError::NotFound(parent.to_string())),
        }
    }

    /// Creates a file seeded with a comment naming it, and opens it.
    pub fn create_file(
        &mut self,
        name: &str,
        parent: Option<FileId>,
    ) -> ReconcileResult<(FileId, FileTree)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconcileError::BlankName);
        }
        self.check_parent(parent.as_ref())?;

        let id = FileId::generate();
        let seed = format!("{} {}\n", comment_prefix(name), name);
        let mut entry = FileEntry::file(id.clone(), name, seed);
        entry.parent_id = parent;

        let tree = self.tree_mut()?;
        tree.insert(entry);
        let tree = tree.clone();
        self.active = Some(id.clone());
        Ok((id, tree))
    }

    /// Creates an empty folder.
    pub fn create_folder(
        &mut self,
        name: &str,
        parent: Option<FileId>,
    ) -> ReconcileResult<(FileId, FileTree)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconcileError::BlankName);
        }
        self.check_parent(parent.as_ref())?;

        let id = FileId::generate();
        let mut entry = FileEntry::folder(id.clone(), name);
        entry.parent_id = parent;

        let tree = self.tree_mut()?;
        tree.insert(entry);
        Ok((id, tree.clone()))
    }

    pub fn rename(&mut self, id: &FileId, name: &str) -> ReconcileResult<FileTree> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReconcileError::BlankName);
        }
        let tree = self.tree_mut()?;
        let entry = tree
            .get_mut(id)
            .ok_or_else(|| ReconcileError::NotFound(id.to_string()))?;
        entry.name = name.to_string();
        Ok(tree.clone())
    }

    /// Deletes an entry and everything nested under it.
    pub fn delete(&mut self, id: &FileId) -> ReconcileResult<FileTree> {
        let tree = self.tree_mut()?;
        if !tree.contains(id) {
            return Err(ReconcileError::NotFound(id.to_string()));
        }
        let doomed = tree.subtree_ids(id);
        for entry_id in &doomed {
            tree.remove(entry_id);
        }
        let tree = tree.clone();

        if self.active.as_ref().is_some_and(|a| doomed.contains(a)) {
            self.active = None;
        }
        Ok(tree)
    }
}
