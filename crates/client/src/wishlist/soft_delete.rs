//! Soft deletion with an undo window.
//!
//! Removing an entry hides it locally at once but defers the remote delete
//! behind a grace window. Undo within the window cancels the pending
//! delete and returns the entry with its original position; once the
//! window fires, the delete is final and undo is rejected.
//!
//! The tombstone map is shared with the fire tasks: a task takes its
//! tombstone back out before deleting remotely, so an undo that lost the
//! race observes an empty slot instead of resurrecting a deleted entry.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{AppError, Result};

/// How long a staged deletion stays undoable.
pub const UNDO_WINDOW: Duration = Duration::from_millis(4000);

/// Outcome of a fired (non-undone) deletion.
#[derive(Debug)]
pub enum UndoEvent<K, V> {
    /// The remote delete landed; the entry is gone for good.
    Deleted { key: K },
    /// The remote delete failed; the entry is returned so the caller can
    /// restore it.
    DeleteFailed {
        key: K,
        value: V,
        index: usize,
        error: AppError,
    },
}

/// Performs the remote side of a fired deletion.
pub trait TombstoneDeleter<K>: Send + Sync + 'static {
    /// Delete the entry remotely.
    fn delete(&self, key: K) -> impl Future<Output = Result<()>> + Send;
}

struct Tombstone<V> {
    value: V,
    index: usize,
}

/// Per-key deferred deletion over a [`TombstoneDeleter`].
pub struct SoftDelete<K, V, D> {
    deleter: Arc<D>,
    window: Duration,
    tombstones: Arc<Mutex<HashMap<K, Tombstone<V>>>>,
    timers: HashMap<K, JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<UndoEvent<K, V>>,
}

impl<K, V, D> SoftDelete<K, V, D>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Send + 'static,
    D: TombstoneDeleter<K>,
{
    /// Create the engine and the receiving end of its outcome channel.
    #[must_use]
    pub fn new(deleter: Arc<D>) -> (Self, mpsc::UnboundedReceiver<UndoEvent<K, V>>) {
        Self::with_window(deleter, UNDO_WINDOW)
    }

    /// Like [`SoftDelete::new`] with an explicit undo window.
    #[must_use]
    pub fn with_window(
        deleter: Arc<D>,
        window: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<UndoEvent<K, V>>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                deleter,
                window,
                tombstones: Arc::new(Mutex::new(HashMap::new())),
                timers: HashMap::new(),
                events_tx,
            },
            events_rx,
        )
    }

    /// Stage a deletion. `index` is the entry's position before removal,
    /// used to restore ordering on undo.
    ///
    /// Staging a key that is already staged restarts its window with the
    /// new value.
    pub fn stage(&mut self, key: K, value: V, index: usize) {
        debug!(%key, index, "staging deletion");
        if let Some(previous) = self.timers.remove(&key) {
            previous.abort();
        }
        if let Ok(mut map) = self.tombstones.lock() {
            map.insert(key.clone(), Tombstone { value, index });
        }

        let deleter = Arc::clone(&self.deleter);
        let tombstones = Arc::clone(&self.tombstones);
        let events_tx = self.events_tx.clone();
        let window = self.window;
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;

            // Take the tombstone back before touching the network; an undo
            // arriving after this point finds nothing and is rejected.
            let taken = tombstones
                .lock()
                .ok()
                .and_then(|mut map| map.remove(&task_key));
            let Some(tombstone) = taken else {
                return;
            };

            let event = match deleter.delete(task_key.clone()).await {
                Ok(()) => UndoEvent::Deleted { key: task_key },
                Err(error) => UndoEvent::DeleteFailed {
                    key: task_key,
                    value: tombstone.value,
                    index: tombstone.index,
                    error,
                },
            };
            let _ = events_tx.send(event);
        });

        self.timers.insert(key, handle);
    }

    /// Cancel a staged deletion, returning the entry and its original
    /// position.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotPending`] if the key has no staged deletion,
    /// including when its window already fired.
    pub fn undo(&mut self, key: &K) -> Result<(V, usize)> {
        if let Some(handle) = self.timers.remove(key) {
            handle.abort();
        }
        let tombstone = self
            .tombstones
            .lock()
            .ok()
            .and_then(|mut map| map.remove(key))
            .ok_or_else(|| AppError::NotPending(key.to_string()))?;
        debug!(%key, "deletion undone");
        Ok((tombstone.value, tombstone.index))
    }

    /// Whether a deletion is currently staged for the key.
    #[must_use]
    pub fn is_pending(&self, key: &K) -> bool {
        self.tombstones
            .lock()
            .map(|map| map.contains_key(key))
            .unwrap_or(false)
    }

    /// Abandon every staged deletion without firing the remote deletes.
    pub fn clear_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
        if let Ok(mut map) = self.tombstones.lock() {
            map.clear();
        }
    }
}

impl<K, V, D> Drop for SoftDelete<K, V, D> {
    fn drop(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct RecordingDeleter {
        deleted: Mutex<Vec<String>>,
        fail: AtomicBool,
    }

    impl RecordingDeleter {
        fn deleted(&self) -> Vec<String> {
            self.deleted.lock().expect("lock").clone()
        }
    }

    impl TombstoneDeleter<String> for RecordingDeleter {
        async fn delete(&self, key: String) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::NotAuthenticated);
            }
            self.deleted.lock().expect("lock").push(key);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_fires_after_window() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (mut sd, mut events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 42u32, 0);
        tokio::time::sleep(Duration::from_millis(4100)).await;

        assert_eq!(deleter.deleted(), ["p1"]);
        let event = events.recv().await.expect("event");
        assert!(matches!(event, UndoEvent::Deleted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_within_window_cancels_delete() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (mut sd, _events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 42u32, 3);
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let (value, index) = sd.undo(&"p1".to_string()).expect("undo");
        assert_eq!((value, index), (42, 3));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(deleter.deleted().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_undo_after_window_is_rejected() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (mut sd, _events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 42u32, 0);
        tokio::time::sleep(Duration::from_millis(4100)).await;

        let err = sd.undo(&"p1".to_string()).expect_err("too late");
        assert!(matches!(err, AppError::NotPending(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delete_returns_value_on_event_channel() {
        let deleter = Arc::new(RecordingDeleter::default());
        deleter.fail.store(true, Ordering::SeqCst);
        let (mut sd, mut events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 42u32, 1);
        tokio::time::sleep(Duration::from_millis(4100)).await;

        let event = events.recv().await.expect("event");
        match event {
            UndoEvent::DeleteFailed { value, index, .. } => {
                assert_eq!((value, index), (42, 1));
            }
            UndoEvent::Deleted { .. } => panic!("delete should have failed"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_abandons_staged_deletes() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (mut sd, _events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 1u32, 0);
        sd.stage("p2".to_string(), 2u32, 1);
        sd.clear_all();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(deleter.deleted().is_empty());
        assert!(!sd.is_pending(&"p1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restage_restarts_the_window() {
        let deleter = Arc::new(RecordingDeleter::default());
        let (mut sd, _events) = SoftDelete::new(Arc::clone(&deleter));

        sd.stage("p1".to_string(), 1u32, 0);
        tokio::time::sleep(Duration::from_millis(3000)).await;
        sd.stage("p1".to_string(), 2u32, 0);
        tokio::time::sleep(Duration::from_millis(3000)).await;

        // 6 seconds after the first stage, but only 3 after the restage.
        assert!(deleter.deleted().is_empty());
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(deleter.deleted(), ["p1"]);
    }
}
