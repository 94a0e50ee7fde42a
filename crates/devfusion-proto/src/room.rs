//! Room documents and their file trees.
//!
//! A room is a single document in the shared store. Its key is the room id;
//! the document body carries the objective and the file tree. Entries in the
//! tree are keyed by their own id, so ids are unique within a room.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors from parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    /// Identifier was blank.
    #[error("identifier must not be empty")]
    Empty,

    /// Identifier contains a path separator, which the store uses for nesting.
    #[error("identifier must not contain '/': {0}")]
    InvalidChar(String),
}

fn validate_id(raw: &str) -> Result<String, IdError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty);
    }
    if trimmed.contains('/') {
        return Err(IdError::InvalidChar(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Identifier of a room document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Generates a fresh random room id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_id(s).map(Self)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an entry in a room's file tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Generates a fresh random file id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for FileId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_id(s).map(Self)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a file tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    File,
    Folder,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::File => write!(f, "file"),
            FileKind::Folder => write!(f, "folder"),
        }
    }
}

/// A single file or folder in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub id: FileId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    /// Source text. Only files carry content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Containing folder, or `None` for top-level entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<FileId>,
}

impl FileEntry {
    /// Creates a file entry with the given content.
    pub fn file(id: FileId, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: FileKind::File,
            content: Some(content.into()),
            parent_id: None,
        }
    }

    /// Creates an empty folder entry.
    pub fn folder(id: FileId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: FileKind::Folder,
            content: None,
            parent_id: None,
        }
    }

    /// Places the entry under a folder.
    pub fn with_parent(mut self, parent: FileId) -> Self {
        self.parent_id = Some(parent);
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_folder(&self) -> bool {
        self.kind == FileKind::Folder
    }

    /// Content of a file, or the empty string for folders and blank files.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// The file tree of a room, keyed by entry id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileTree(BTreeMap<FileId, FileEntry>);

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &FileId) -> Option<&FileEntry> {
        self.0.get(id)
    }

    pub fn get_mut(&mut self, id: &FileId) -> Option<&mut FileEntry> {
        self.0.get_mut(id)
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.0.contains_key(id)
    }

    /// Inserts an entry under its own id, returning the entry it replaced.
    pub fn insert(&mut self, entry: FileEntry) -> Option<FileEntry> {
        self.0.insert(entry.id.clone(), entry)
    }

    pub fn remove(&mut self, id: &FileId) -> Option<FileEntry> {
        self.0.remove(id)
    }

    /// Iterates entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &FileEntry> {
        self.0.values()
    }

    /// The first `file` entry in id order.
    pub fn first_file(&self) -> Option<&FileEntry> {
        self.iter().find(|entry| entry.is_file())
    }

    /// Direct children of `parent` (`None` selects top-level entries).
    pub fn children_of<'a>(
        &'a self,
        parent: Option<&'a FileId>,
    ) -> impl Iterator<Item = &'a FileEntry> + 'a {
        self.iter()
            .filter(move |entry| entry.parent_id.as_ref() == parent)
    }

    /// Ids of `root` and every entry nested below it.
    ///
    /// Parent links come from a shared document and may form cycles, so
    /// each id is visited at most once.
    pub fn subtree_ids(&self, root: &FileId) -> Vec<FileId> {
        let mut seen = BTreeSet::from([root.clone()]);
        let mut collected = vec![root.clone()];
        let mut cursor = 0;
        while cursor < collected.len() {
            let current = collected[cursor].clone();
            for entry in self.children_of(Some(&current)) {
                if seen.insert(entry.id.clone()) {
                    collected.push(entry.id.clone());
                }
            }
            cursor += 1;
        }
        collected
    }
}

impl FromIterator<FileEntry> for FileTree {
    fn from_iter<T: IntoIterator<Item = FileEntry>>(iter: T) -> Self {
        Self(iter.into_iter().map(|e| (e.id.clone(), e)).collect())
    }
}

/// A shared room document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    /// Document key; never stored inside the document body.
    #[serde(skip)]
    pub id: RoomId,
    #[serde(default)]
    pub objective: String,
    #[serde(default)]
    pub file_tree: FileTree,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Room {
    /// Creates an empty room stamped with the current time.
    pub fn new(id: RoomId, objective: impl Into<String>) -> Self {
        Self {
            id,
            objective: objective.into(),
            file_tree: FileTree::new(),
            created_at: Some(Utc::now()),
        }
    }
}

/// Event delivered by a room subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Current state of the room document.
    Snapshot(Room),
    /// The document does not exist (or was deleted).
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> FileId {
        s.parse().unwrap()
    }

    #[test]
    fn room_id_rejects_blank_and_slash() {
        assert_eq!("  ".parse::<RoomId>(), Err(IdError::Empty));
        assert!(matches!(
            "rooms/abc".parse::<RoomId>(),
            Err(IdError::InvalidChar(_))
        ));
        assert_eq!(" abc ".parse::<RoomId>().unwrap().as_str(), "abc");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(FileId::generate(), FileId::generate());
        assert_ne!(RoomId::generate(), RoomId::generate());
    }

    #[test]
    fn room_document_uses_camel_case_and_type_key() {
        let mut room = Room::new("r1".parse().unwrap(), "Build a parser");
        room.created_at = None;
        room.file_tree
            .insert(FileEntry::file(id("a"), "main.js", "// main.js\n"));

        let value = serde_json::to_value(&room).unwrap();
        assert_eq!(value["objective"], "Build a parser");
        assert_eq!(value["fileTree"]["a"]["type"], "file");
        assert_eq!(value["fileTree"]["a"]["content"], "// main.js\n");
        assert!(value.get("id").is_none());
        assert!(value["fileTree"]["a"].get("parentId").is_none());
    }

    #[test]
    fn room_document_tolerates_missing_fields() {
        let room: Room = serde_json::from_str(
            r#"{"fileTree":{"f1":{"id":"f1","name":"docs","type":"folder"}}}"#,
        )
        .unwrap();
        assert_eq!(room.objective, "");
        let folder = room.file_tree.get(&id("f1")).unwrap();
        assert!(folder.is_folder());
        assert_eq!(folder.text(), "");
    }

    #[test]
    fn first_file_skips_folders() {
        let tree: FileTree = [
            FileEntry::folder(id("a"), "src"),
            FileEntry::file(id("b"), "main.py", "print(1)"),
            FileEntry::file(id("c"), "util.py", ""),
        ]
        .into_iter()
        .collect();

        assert_eq!(tree.first_file().unwrap().id, id("b"));
    }

    #[test]
    fn subtree_ids_follow_parent_links() {
        let tree: FileTree = [
            FileEntry::folder(id("src"), "src"),
            FileEntry::folder(id("lib"), "lib").with_parent(id("src")),
            FileEntry::file(id("x"), "x.rs", "").with_parent(id("lib")),
            FileEntry::file(id("y"), "y.rs", ""),
        ]
        .into_iter()
        .collect();

        let mut ids = tree.subtree_ids(&id("src"));
        ids.sort();
        assert_eq!(ids, vec![id("lib"), id("src"), id("x")]);
        assert_eq!(tree.children_of(None).count(), 2);
    }

    #[test]
    fn subtree_ids_stop_at_parent_cycles() {
        let tree: FileTree = [
            FileEntry::folder(id("self"), "loop").with_parent(id("self")),
            FileEntry::folder(id("a"), "a").with_parent(id("b")),
            FileEntry::folder(id("b"), "b").with_parent(id("a")),
            FileEntry::file(id("x"), "x.rs", "").with_parent(id("b")),
        ]
        .into_iter()
        .collect();

        assert_eq!(tree.subtree_ids(&id("self")), vec![id("self")]);
        let mut ids = tree.subtree_ids(&id("a"));
        ids.sort();
        assert_eq!(ids, vec![id("a"), id("b"), id("x")]);
    }
}
