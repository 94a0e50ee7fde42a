//! Polling subscriptions for stores without a push channel.

use std::future::Future;
use std::time::Duration;

use devfusion_proto::{Room, RoomEvent, RoomId, RoomSubscription, StoreResult};
use tracing::{debug, warn};

/// One poll result: a version tag plus the document, or `None` if missing.
pub type Polled = Option<(String, Room)>;

/// Spawns a task that calls `fetch` every `interval` and forwards changes.
///
/// A snapshot is emitted whenever the version tag differs from the previous
/// poll. A missing document emits `RoomEvent::Missing` and ends the
/// subscription. Fetch errors are forwarded and polling continues. The task
/// stops as soon as the subscription is dropped.
pub fn spawn_poller<F, Fut>(room_id: RoomId, interval: Duration, mut fetch: F) -> RoomSubscription
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = StoreResult<Polled>> + Send + 'static,
{
    let (tx, subscription) = RoomSubscription::channel();

    tokio::spawn(async move {
        let mut last_version: Option<String> = None;
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if tx.is_closed() {
                break;
            }
            match fetch().await {
                Ok(Some((version, room))) => {
                    if last_version.as_deref() == Some(version.as_str()) {
                        continue;
                    }
                    last_version = Some(version);
                    if tx.send(Ok(RoomEvent::Snapshot(room))).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = tx.send(Ok(RoomEvent::Missing));
                    break;
                }
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "Room poll failed");
                    if tx.send(Err(e)).is_err() {
                        break;
                    }
                }
            }
        }
        debug!(room_id = %room_id, "Room poller stopped");
    });

    subscription
}

#[cfg(test)]
mod tests {
    use super::*;
    use devfusion_proto::StoreError;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn emits_only_on_version_change_then_missing() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut sub = spawn_poller("r".parse().unwrap(), Duration::from_millis(1), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let version = match n {
                    0 | 1 => "v1",
                    2 => "v2",
                    _ => return Ok::<Polled, StoreError>(None),
                };
                let room = Room {
                    objective: version.to_string(),
                    ..Room::default()
                };
                Ok::<Polled, StoreError>(Some((version.to_string(), room)))
            }
        });

        let Some(Ok(RoomEvent::Snapshot(first))) = sub.recv().await else {
            panic!("expected first snapshot");
        };
        assert_eq!(first.objective, "v1");
        let Some(Ok(RoomEvent::Snapshot(second))) = sub.recv().await else {
            panic!("expected second snapshot");
        };
        assert_eq!(second.objective, "v2");
        assert!(matches!(sub.recv().await, Some(Ok(RoomEvent::Missing))));
        assert!(sub.recv().await.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn errors_are_forwarded_and_polling_continues() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut sub = spawn_poller("r".parse().unwrap(), Duration::from_millis(1), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(StoreError::Unavailable("timeout".to_string()))
                } else {
                    Ok::<Polled, StoreError>(None)
                }
            }
        });

        assert!(matches!(
            sub.recv().await,
            Some(Err(StoreError::Unavailable(_)))
        ));
        assert!(matches!(sub.recv().await, Some(Ok(RoomEvent::Missing))));
    }
}
