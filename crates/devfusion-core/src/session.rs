//! Room sessions: a subscription to one room plus the local reconciler.
//!
//! Every local mutation is applied to the reconciler first and then written
//! to the store as a full file tree. A failed write puts the reconciler back
//! as it was, so local state never holds a change the store has not seen.
//! Remote snapshots arriving afterwards replace local state, so the store
//! remains the single source of truth.

use std::sync::Arc;

use devfusion_proto::{
    CodeRunner, DocumentStore, FileEntry, FileId, FileTree, LanguageModel, ModelError, Room,
    RoomEvent, RoomId, RoomSubscription, RunError, RunOutput, RunRequest, StoreError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assist::{AssistIntent, assist};
use crate::language::{extension, language_for};
use crate::reconciler::{EditOutcome, ReconcileError, Reconciler, RemoteOutcome};

/// Errors from room session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Room not found.")]
    RoomNotFound(RoomId),

    #[error("room subscription ended")]
    SubscriptionEnded,

    #[error("Execution for .{0} files is not supported yet.")]
    UnsupportedLanguage(String),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error("AI Error: {0}")]
    Model(#[from] ModelError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Result of an assistant action on the active file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistOutcome {
    /// The reply was written into the file.
    Applied { file_id: FileId },
    /// The reply changed nothing in the file.
    NoChange,
    /// The reply is a report for the user.
    Report { title: &'static str, text: String },
}

/// Creates a new, empty room and returns it.
pub async fn create_room(store: &dyn DocumentStore, objective: &str) -> SessionResult<Room> {
    let room = Room::new(RoomId::generate(), objective.trim());
    store.create(&room).await?;
    info!(room_id = %room.id, "Room created");
    Ok(room)
}

/// A live editing session on one room.
pub struct RoomSession {
    store: Arc<dyn DocumentStore>,
    subscription: RoomSubscription,
    reconciler: Reconciler,
}

impl RoomSession {
    /// Subscribes to `room_id` and waits for its first snapshot.
    pub async fn open(store: Arc<dyn DocumentStore>, room_id: RoomId) -> SessionResult<Self> {
        let subscription = store.subscribe(&room_id).await?;
        let mut session = Self {
            store,
            subscription,
            reconciler: Reconciler::new(room_id.clone()),
        };

        match session.sync().await? {
            RemoteOutcome::Closed => {
                warn!(room_id = %room_id, "Room not found");
                Err(SessionError::RoomNotFound(room_id))
            }
            _ => {
                info!(
                    room_id = %room_id,
                    entries = session.file_tree().map_or(0, FileTree::len),
                    "Joined room"
                );
                Ok(session)
            }
        }
    }

    pub fn room_id(&self) -> &RoomId {
        self.reconciler.room_id()
    }

    pub fn room(&self) -> Option<&Room> {
        self.reconciler.room()
    }

    pub fn file_tree(&self) -> Option<&FileTree> {
        self.room().map(|room| &room.file_tree)
    }

    pub fn active_file(&self) -> Option<&FileEntry> {
        self.reconciler.active_file()
    }

    pub fn is_closed(&self) -> bool {
        self.reconciler.is_closed()
    }

    fn merge(&mut self, event: RoomEvent) -> RemoteOutcome {
        let outcome = self.reconciler.apply_remote(event);
        debug!(room_id = %self.room_id(), ?outcome, "Merged remote event");
        outcome
    }

    /// Waits for the next remote event and merges it.
    pub async fn sync(&mut self) -> SessionResult<RemoteOutcome> {
        match self.subscription.recv().await {
            Some(Ok(event)) => Ok(self.merge(event)),
            Some(Err(e)) => Err(e.into()),
            None => Err(SessionError::SubscriptionEnded),
        }
    }

    /// Merges events that have already arrived, without waiting.
    pub fn try_sync(&mut self) -> SessionResult<Vec<RemoteOutcome>> {
        let mut outcomes = Vec::new();
        while let Some(event) = self.subscription.try_recv() {
            outcomes.push(self.merge(event?));
        }
        Ok(outcomes)
    }

    /// Writes `tree`, restoring `saved` if the store rejects it.
    async fn persist(&mut self, saved: Reconciler, tree: &FileTree) -> SessionResult<()> {
        if let Err(e) = self.store.write_file_tree(self.room_id(), tree).await {
            warn!(room_id = %self.room_id(), error = %e, "File tree write failed; local change reverted");
            self.reconciler = saved;
            return Err(e.into());
        }
        debug!(room_id = %self.room_id(), entries = tree.len(), "File tree written");
        Ok(())
    }

    /// Looks up an entry by id or unique name.
    pub fn resolve(&self, query: &str) -> SessionResult<FileId> {
        Ok(self.reconciler.resolve(query)?)
    }

    /// Opens a file by id or unique name.
    pub fn select(&mut self, query: &str) -> SessionResult<&FileEntry> {
        let id = self.reconciler.resolve(query)?;
        Ok(self.reconciler.select(&id)?)
    }

    /// Replaces the active file's content. Returns whether anything was written.
    pub async fn edit_active(&mut self, content: &str) -> SessionResult<bool> {
        let saved = self.reconciler.clone();
        match self.reconciler.edit_active(content)? {
            EditOutcome::Changed(tree) => {
                self.persist(saved, &tree).await?;
                Ok(true)
            }
            EditOutcome::Echo | EditOutcome::Unchanged => Ok(false),
        }
    }

    pub async fn create_file(&mut self, name: &str, parent: Option<FileId>) -> SessionResult<FileId> {
        let saved = self.reconciler.clone();
        let (id, tree) = self.reconciler.create_file(name, parent)?;
        self.persist(saved, &tree).await?;
        info!(room_id = %self.room_id(), file_id = %id, file_name = name, "File created");
        Ok(id)
    }

    pub async fn create_folder(
        &mut self,
        name: &str,
        parent: Option<FileId>,
    ) -> SessionResult<FileId> {
        let saved = self.reconciler.clone();
        let (id, tree) = self.reconciler.create_folder(name, parent)?;
        self.persist(saved, &tree).await?;
        info!(room_id = %self.room_id(), file_id = %id, folder_name = name, "Folder created");
        Ok(id)
    }

    pub async fn rename(&mut self, id: &FileId, name: &str) -> SessionResult<()> {
        let saved = self.reconciler.clone();
        let tree = self.reconciler.rename(id, name)?;
        self.persist(saved, &tree).await
    }

    pub async fn delete(&mut self, id: &FileId) -> SessionResult<()> {
        let saved = self.reconciler.clone();
        let tree = self.reconciler.delete(id)?;
        self.persist(saved, &tree).await?;
        info!(room_id = %self.room_id(), file_id = %id, "Entry deleted");
        Ok(())
    }

    /// Executes the active file on the remote runner.
    pub async fn run_active(
        &self,
        runner: &dyn CodeRunner,
        stdin: Option<String>,
    ) -> SessionResult<RunOutput> {
        let file = self
            .reconciler
            .active_file()
            .ok_or(ReconcileError::NoActiveFile)?;
        let language = language_for(&file.name)
            .ok_or_else(|| SessionError::UnsupportedLanguage(extension(&file.name).to_string()))?;

        info!(
            room_id = %self.room_id(),
            file = %file.name,
            language = language.name,
            "Running file"
        );
        let request = RunRequest {
            source: file.text().to_string(),
            language: language.id,
            stdin,
        };
        let output = runner.run(&request).await?;
        debug!(status = %output.status.description, "Run finished");
        Ok(output)
    }

    /// Runs an assistant action over the active file.
    pub async fn assist(
        &mut self,
        model: &dyn LanguageModel,
        intent: AssistIntent,
    ) -> SessionResult<AssistOutcome> {
        let file = self
            .reconciler
            .active_file()
            .ok_or(ReconcileError::NoActiveFile)?;
        let file_id = file.id.clone();
        let original = file.text().to_string();

        let reply = assist(model, intent, &original).await?;
        if !intent.edits_file() {
            return Ok(AssistOutcome::Report {
                title: intent.report_title(),
                text: reply,
            });
        }
        let updated = if intent == AssistIntent::Complete {
            format!("{original}{reply}")
        } else {
            reply
        };

        // The reply may have raced a remote change of selection.
        if self.reconciler.active_id() != Some(&file_id) {
            self.reconciler.select(&file_id)?;
        }
        if self.edit_active(&updated).await? {
            Ok(AssistOutcome::Applied { file_id })
        } else {
            Ok(AssistOutcome::NoChange)
        }
    }
}

impl std::fmt::Debug for RoomSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomSession")
            .field("reconciler", &self.reconciler)
            .finish_non_exhaustive()
    }
}
