//! Debounced write scheduling for cart mutations.
//!
//! Each line item key gets its own quiet-period timer: a new edit for a key
//! cancels that key's waiting timer and starts a fresh one, so a burst of
//! edits to one line collapses into a single remote write carrying the last
//! value, while edits to different lines never delay each other. A write
//! whose quiet period has already elapsed is on the wire and always runs to
//! completion.
//!
//! Outcomes are reported on an event channel rather than returned to the
//! caller, because by the time a write completes the caller has moved on.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use thriftr_core::{CartItem, LineItemKey};

use crate::error::AppError;

/// How long a key must stay quiet before its write fires.
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Outcome of one attempted remote write.
#[derive(Debug)]
pub enum SyncEvent {
    /// The write landed; the remote now carries this quantity for the key.
    Confirmed { key: LineItemKey, quantity: u32 },
    /// The write failed; local state still carries the user's intent.
    WriteFailed { key: LineItemKey, error: AppError },
}

/// Applies one line's final state to the remote cart.
pub trait CartSyncer: Send + Sync + 'static {
    /// Write the item's quantity remotely. Quantity 0 means remove the line.
    fn apply(&self, item: CartItem) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// One key's scheduled write: its timer task, plus a flag flipped the
/// moment the quiet period elapses and the network call is dispatched.
struct PendingWrite {
    handle: JoinHandle<()>,
    dispatched: Arc<AtomicBool>,
}

impl PendingWrite {
    /// Abort the timer if it has not dispatched yet. A call already on the
    /// wire runs to completion and reports on the event channel.
    fn cancel(self) {
        if !self.dispatched.load(Ordering::SeqCst) {
            self.handle.abort();
        }
    }
}

/// Per-key debounced scheduler over a [`CartSyncer`].
pub struct DebouncedSync<S> {
    syncer: Arc<S>,
    quiet_period: Duration,
    timers: HashMap<LineItemKey, PendingWrite>,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
}

impl<S: CartSyncer> DebouncedSync<S> {
    /// Create a scheduler and the receiving end of its outcome channel.
    #[must_use]
    pub fn new(syncer: Arc<S>) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        Self::with_quiet_period(syncer, QUIET_PERIOD)
    }

    /// Like [`DebouncedSync::new`] with an explicit quiet period.
    #[must_use]
    pub fn with_quiet_period(
        syncer: Arc<S>,
        quiet_period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            Self {
                syncer,
                quiet_period,
                timers: HashMap::new(),
                events_tx,
            },
            events_rx,
        )
    }

    /// Schedule a debounced write for the item's key.
    ///
    /// A timer still in its quiet period for the same key is cancelled
    /// first; one that has already dispatched its network call runs to
    /// completion alongside the new timer.
    pub fn schedule(&mut self, item: CartItem) {
        let key = item.key();
        debug!(%key, quantity = item.quantity, "scheduling debounced cart write");
        self.spawn(key, item, self.quiet_period);
    }

    /// Schedule a write for the item's key with no quiet period.
    ///
    /// Used for removals, which should reach the remote promptly.
    pub fn schedule_immediate(&mut self, item: CartItem) {
        let key = item.key();
        debug!(%key, "scheduling immediate cart write");
        self.spawn(key, item, Duration::ZERO);
    }

    /// Cancel every timer still in its quiet period. Calls already on the
    /// wire, and confirmed state written remotely, are unaffected.
    pub fn cancel_all(&mut self) {
        for (_, pending) in self.timers.drain() {
            pending.cancel();
        }
    }

    /// Number of keys with a write still pending.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.timers
            .values()
            .filter(|p| !p.handle.is_finished())
            .count()
    }

    fn spawn(&mut self, key: LineItemKey, item: CartItem, delay: Duration) {
        if let Some(previous) = self.timers.remove(&key) {
            previous.cancel();
        }

        let syncer = Arc::clone(&self.syncer);
        let events_tx = self.events_tx.clone();
        let task_key = key.clone();
        let dispatched = Arc::new(AtomicBool::new(false));
        let task_dispatched = Arc::clone(&dispatched);

        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task_dispatched.store(true, Ordering::SeqCst);
            let quantity = item.quantity;
            let event = match syncer.apply(item).await {
                Ok(()) => SyncEvent::Confirmed {
                    key: task_key,
                    quantity,
                },
                Err(error) => SyncEvent::WriteFailed {
                    key: task_key,
                    error,
                },
            };
            // Receiver gone means the session is shutting down.
            let _ = events_tx.send(event);
        });

        self.timers.insert(key, PendingWrite { handle, dispatched });
    }
}

impl<S> Drop for DebouncedSync<S> {
    fn drop(&mut self) {
        for (_, pending) in self.timers.drain() {
            pending.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use thriftr_core::ProductId;

    #[derive(Default)]
    struct RecordingSyncer {
        applied: Mutex<Vec<CartItem>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingSyncer {
        fn applied(&self) -> Vec<CartItem> {
            self.applied.lock().expect("lock").clone()
        }
    }

    impl CartSyncer for RecordingSyncer {
        async fn apply(&self, item: CartItem) -> Result<(), AppError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(AppError::NotAuthenticated);
            }
            self.applied.lock().expect("lock").push(item);
            Ok(())
        }
    }

    fn item(product: &str, size: Option<&str>, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(product),
            quantity,
            selected_size: size.map(str::to_string),
            selected_color: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_to_one_write() {
        let syncer = Arc::new(RecordingSyncer::default());
        let (mut sync, mut events) = DebouncedSync::new(Arc::clone(&syncer));

        for quantity in [1, 5, 3, 7] {
            sync.schedule(item("p1", Some("M"), quantity));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        let applied = syncer.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied.first().map(|i| i.quantity), Some(7));

        let event = events.recv().await.expect("event");
        assert!(matches!(event, SyncEvent::Confirmed { quantity: 7, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_keys_do_not_interfere() {
        let syncer = Arc::new(RecordingSyncer::default());
        let (mut sync, _events) = DebouncedSync::new(Arc::clone(&syncer));

        sync.schedule(item("p1", Some("M"), 2));
        tokio::time::sleep(Duration::from_millis(400)).await;
        // Editing another line must not reset p1's timer.
        sync.schedule(item("p2", None, 1));
        tokio::time::sleep(Duration::from_millis(150)).await;

        let applied = syncer.applied();
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied.first().map(|i| i.product_id.as_str()),
            Some("p1")
        );

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(syncer.applied().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_write_skips_quiet_period() {
        let syncer = Arc::new(RecordingSyncer::default());
        let (mut sync, mut events) = DebouncedSync::new(Arc::clone(&syncer));

        sync.schedule_immediate(item("p1", None, 0));
        let event = events.recv().await.expect("event");
        assert!(matches!(event, SyncEvent::Confirmed { quantity: 0, .. }));
    }

    /// Records each applied quantity only after a simulated network delay.
    #[derive(Default)]
    struct SlowSyncer {
        applied: Mutex<Vec<u32>>,
    }

    impl CartSyncer for SlowSyncer {
        async fn apply(&self, item: CartItem) -> Result<(), AppError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.applied.lock().expect("lock").push(item.quantity);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_lets_a_dispatched_call_finish() {
        let syncer = Arc::new(SlowSyncer::default());
        let (mut sync, mut events) = DebouncedSync::new(Arc::clone(&syncer));

        sync.schedule(item("p1", None, 1));
        // Past the quiet period: the first write is on the wire.
        tokio::time::sleep(Duration::from_millis(600)).await;
        sync.schedule(item("p1", None, 2));
        tokio::time::sleep(Duration::from_secs(3)).await;

        // Both writes completed, in order, and both were confirmed.
        assert_eq!(*syncer.applied.lock().expect("lock"), [1, 2]);
        for quantity in [1, 2] {
            let event = events.recv().await.expect("event");
            assert!(matches!(
                event,
                SyncEvent::Confirmed { quantity: q, .. } if q == quantity
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_suppresses_pending_writes() {
        let syncer = Arc::new(RecordingSyncer::default());
        let (mut sync, _events) = DebouncedSync::new(Arc::clone(&syncer));

        sync.schedule(item("p1", None, 3));
        sync.schedule(item("p2", None, 1));
        sync.cancel_all();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(syncer.applied().is_empty());
        assert_eq!(sync.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_reports_on_event_channel() {
        let syncer = Arc::new(RecordingSyncer::default());
        syncer
            .fail
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let (mut sync, mut events) = DebouncedSync::new(Arc::clone(&syncer));

        sync.schedule(item("p1", None, 3));
        tokio::time::sleep(Duration::from_millis(600)).await;

        let event = events.recv().await.expect("event");
        assert!(matches!(event, SyncEvent::WriteFailed { .. }));
    }
}
