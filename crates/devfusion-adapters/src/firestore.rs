//! Firestore REST document store.
//!
//! Rooms are documents in a collection (`rooms` by default). Writes from the
//! editor only ever touch the `fileTree` field, using an update mask so
//! concurrent changes to other fields survive. Firestore's push listeners
//! are not exposed over REST, so subscriptions poll the document and emit
//! when its `updateTime` moves.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use devfusion_core::StoreConfig;
use devfusion_core::poller::{Polled, spawn_poller};
use devfusion_proto::{
    DocumentStore, FileTree, Room, RoomId, RoomSubscription, StoreError, StoreResult,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::firestore_value::{decode_fields, encode, encode_fields};

/// Firestore error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: FirestoreError,
}

#[derive(Debug, Deserialize)]
struct FirestoreError {
    message: String,
}

/// A document as returned by the REST API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    #[serde(default)]
    fields: Option<Value>,
    update_time: Option<String>,
}

/// `DocumentStore` backed by Cloud Firestore.
#[derive(Debug, Clone)]
pub struct FirestoreStore {
    client: reqwest::Client,
    /// `.../projects/{p}/databases/(default)/documents`
    documents_url: String,
    collection: String,
    api_key: Option<String>,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Creates a store for `project_id` using the given settings.
    pub fn new(
        config: &StoreConfig,
        project_id: &str,
        api_key: Option<String>,
    ) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(client, config, project_id, api_key))
    }

    /// Creates a store with a custom HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        config: &StoreConfig,
        project_id: &str,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            documents_url: format!(
                "{}/projects/{}/databases/(default)/documents",
                config.base_url.trim_end_matches('/'),
                project_id
            ),
            collection: config.collection.clone(),
            api_key,
            poll_interval: config.poll_interval(),
        }
    }

    fn document_url(&self, room_id: &RoomId) -> String {
        format!("{}/{}/{}", self.documents_url, self.collection, room_id)
    }

    fn with_key(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        self.with_key(request)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    async fn api_error(response: reqwest::Response) -> StoreError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        StoreError::Api { status, message }
    }

    fn decode_room(room_id: &RoomId, doc: Document) -> StoreResult<Room> {
        let plain = match doc.fields {
            Some(fields) => decode_fields(&fields).map_err(StoreError::Malformed)?,
            None => json!({}),
        };
        let mut room: Room =
            serde_json::from_value(plain).map_err(|e| StoreError::Malformed(e.to_string()))?;
        room.id = room_id.clone();
        Ok(room)
    }

    async fn get_document(&self, room_id: &RoomId) -> StoreResult<Option<Document>> {
        let response = self.send(self.client.get(self.document_url(room_id))).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<Document>()
                .await
                .map(Some)
                .map_err(|e| StoreError::Malformed(e.to_string())),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn poll(&self, room_id: &RoomId) -> StoreResult<Polled> {
        let Some(mut doc) = self.get_document(room_id).await? else {
            return Ok(None);
        };
        let version = doc.update_time.take().unwrap_or_default();
        Ok(Some((version, Self::decode_room(room_id, doc)?)))
    }
}

/// Encodes a room document, with `createdAt` as a native timestamp.
fn room_fields(room: &Room) -> StoreResult<Value> {
    let mut map = match serde_json::to_value(room) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(StoreError::Malformed(format!(
                "expected an object, got {other}"
            )));
        }
        Err(e) => return Err(StoreError::Malformed(e.to_string())),
    };
    map.remove("createdAt");
    let mut fields = encode_fields(&map);
    if let (Some(created_at), Some(fields)) = (room.created_at, fields.as_object_mut()) {
        fields.insert(
            "createdAt".to_string(),
            json!({ "timestampValue": created_at.to_rfc3339_opts(SecondsFormat::Micros, true) }),
        );
    }
    Ok(fields)
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn fetch(&self, room_id: &RoomId) -> StoreResult<Option<Room>> {
        match self.get_document(room_id).await? {
            Some(doc) => Self::decode_room(room_id, doc).map(Some),
            None => Ok(None),
        }
    }

    async fn create(&self, room: &Room) -> StoreResult<()> {
        let url = format!("{}/{}", self.documents_url, self.collection);
        let body = json!({ "fields": room_fields(room)? });
        let request = self
            .client
            .post(url)
            .query(&[("documentId", room.id.as_str())])
            .json(&body);

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::AlreadyExists(room.id.clone())),
            status if status.is_success() => {
                debug!(room_id = %room.id, "Firestore room document created");
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn write_file_tree(&self, room_id: &RoomId, tree: &FileTree) -> StoreResult<()> {
        let tree_value =
            serde_json::to_value(tree).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let body = json!({ "fields": { "fileTree": encode(&tree_value) } });
        let request = self
            .client
            .patch(self.document_url(room_id))
            .query(&[
                ("updateMask.fieldPaths", "fileTree"),
                ("currentDocument.exists", "true"),
            ])
            .json(&body);

        let response = self.send(request).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StoreError::NotFound(room_id.clone())),
            status if status.is_success() => {
                debug!(room_id = %room_id, entries = tree.len(), "Firestore file tree written");
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn subscribe(&self, room_id: &RoomId) -> StoreResult<RoomSubscription> {
        let store = self.clone();
        let id = room_id.clone();
        let fetch = move || {
            let store = store.clone();
            let id = id.clone();
            async move { store.poll(&id).await }
        };
        Ok(spawn_poller(room_id.clone(), self.poll_interval, fetch))
    }
}
