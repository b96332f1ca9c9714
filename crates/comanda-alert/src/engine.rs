//! Repeating alert for pending orders.
//!
//! Provides:
//! - `AlertEngine`: Starts and owns the pulse loop
//! - `AlertSink` / `PendingSource`: Seams to the signal output and the
//!   live order counts
//! - `AlertConfig`: Pulse cadence configuration
//!
//! The loop pulses once immediately, then re-reads the live pending
//! count every interval and stops itself when the count reaches zero;
//! `evaluate()` also wakes it early once the last pending order clears.
//! `evaluate()` is cheap and safe to call after every order mutation:
//! it only spawns a loop when none is running.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default pulse interval: 1 second.
pub const ALERT_INTERVAL_MS: u64 = 1_000;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the alert pulse cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertConfig {
    /// Interval between pulses in milliseconds.
    /// Default: 1,000 ms (1 second)
    pub interval_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            interval_ms: ALERT_INTERVAL_MS,
        }
    }
}

impl AlertConfig {
    /// Create a configuration with a custom interval.
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self { interval_ms }
    }
}

// ============================================================================
// Seams
// ============================================================================

/// Sink the engine pulses while orders are pending.
///
/// Implemented by whatever carries the operator-facing signal
/// (terminal bell, buzzer relay).
pub trait AlertSink: Send + Sync {
    /// Emit one alert pulse.
    fn pulse(&self);
}

/// Source of the live pending-order count.
pub trait PendingSource: Send + Sync {
    /// Number of orders currently pending.
    fn pending_count(&self) -> usize;
}

/// Arc wrapper for AlertSink trait objects.
pub type DynAlertSink = Arc<dyn AlertSink>;

/// Arc wrapper for PendingSource trait objects.
pub type DynPendingSource = Arc<dyn PendingSource>;

// ============================================================================
// AlertEngine
// ============================================================================

/// Owns the repeating alert loop for pending orders.
///
/// At most one loop task runs at a time. The loop exits when the
/// pending count drops to zero, either woken early by `evaluate()` or
/// at its next tick; `evaluate()` restarts it when new pending orders
/// appear.
pub struct AlertEngine {
    source: DynPendingSource,
    sink: DynAlertSink,
    interval: Duration,
    running: Arc<AtomicBool>,
    recheck: Arc<Notify>,
    shutdown: CancellationToken,
    task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl AlertEngine {
    /// Create an engine over the given count source and signal sink.
    pub fn new(source: DynPendingSource, sink: DynAlertSink, config: AlertConfig) -> Self {
        Self {
            source,
            sink,
            interval: Duration::from_millis(config.interval_ms),
            running: Arc::new(AtomicBool::new(false)),
            recheck: Arc::new(Notify::new()),
            shutdown: CancellationToken::new(),
            task: parking_lot::Mutex::new(None),
        }
    }

    /// Re-check whether the alert loop should be running.
    ///
    /// Call after every order mutation. Starts the loop when orders
    /// are pending and none is running; wakes the running loop to
    /// stop when the count has dropped to zero.
    pub fn evaluate(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        if self.source.pending_count() == 0 {
            // Wake a running loop so it stops now instead of on its
            // next tick.
            if self.running.load(Ordering::SeqCst) {
                self.recheck.notify_one();
            }
            return;
        }
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        let worker = AlertLoop {
            source: self.source.clone(),
            sink: self.sink.clone(),
            interval: self.interval,
            running: self.running.clone(),
            recheck: self.recheck.clone(),
            shutdown: self.shutdown.clone(),
        };
        *self.task.lock() = Some(tokio::spawn(worker.run()));
    }

    /// Whether the pulse loop is currently running.
    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the loop and wait for it to finish.
    ///
    /// After this returns no further pulses are emitted, and later
    /// `evaluate()` calls are ignored.
    pub async fn teardown(&self) {
        self.shutdown.cancel();
        let task = self.task.lock().take();
        if let Some(task) = task {
            if task.await.is_err() {
                warn!("Alert loop ended abnormally during teardown");
            }
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

/// The spawned pulse loop.
struct AlertLoop {
    source: DynPendingSource,
    sink: DynAlertSink,
    interval: Duration,
    running: Arc<AtomicBool>,
    recheck: Arc<Notify>,
    shutdown: CancellationToken,
}

impl AlertLoop {
    async fn run(self) {
        debug!(
            interval_ms = self.interval.as_millis() as u64,
            "Alert loop started"
        );

        loop {
            self.sink.pulse();

            let mut ticker = tokio::time::interval(self.interval);
            // Consume the immediate first tick so pulses stay on cadence.
            ticker.tick().await;

            loop {
                // Wakes from evaluate() re-check the count without
                // pulsing; pulses stay on the tick cadence.
                let on_cadence = tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        debug!("Alert loop cancelled");
                        return;
                    }
                    _ = self.recheck.notified() => false,
                    _ = ticker.tick() => true,
                };
                if self.source.pending_count() == 0 {
                    break;
                }
                if on_cadence {
                    self.sink.pulse();
                }
            }

            // Exit handshake: clear the flag first, then re-check the
            // count. A mutation landing between the zero reading and
            // the clear either sees the flag still set (and this loop
            // re-arms below) or restarts the engine itself.
            self.running.store(false, Ordering::SeqCst);
            if self.source.pending_count() > 0
                && self
                    .running
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                continue;
            }

            debug!("Alert loop stopped, no orders pending");
            return;
        }
    }
}

// ============================================================================
// Test doubles
// ============================================================================

/// Mock alert sink for testing. Counts pulses.
pub struct MockAlertSink {
    pulses: AtomicUsize,
}

impl MockAlertSink {
    /// Create a new mock sink.
    pub fn new() -> Self {
        Self {
            pulses: AtomicUsize::new(0),
        }
    }

    /// Number of pulses emitted so far.
    pub fn get_pulse_count(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl Default for MockAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for MockAlertSink {
    fn pulse(&self) {
        self.pulses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock pending source for testing. Returns a settable count.
pub struct MockPendingSource {
    count: AtomicUsize,
}

impl MockPendingSource {
    /// Create a mock reporting the given count.
    pub fn new(count: usize) -> Self {
        Self {
            count: AtomicUsize::new(count),
        }
    }

    /// Change the reported count.
    pub fn set_count(&self, count: usize) {
        self.count.store(count, Ordering::SeqCst);
    }
}

impl PendingSource for MockPendingSource {
    fn pending_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Tests
// ============================================================================
