//! Background reclamation of expired cache entries.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use roster_core::error::{Result, RosterError};

/// Periodic task that runs a sweep closure until stopped.
///
/// The first sweep happens one full period after spawning. Stopping is
/// signalled through a watch channel; a sweep already in progress runs to
/// completion before the task exits. Dropping the sweeper also signals it.
pub struct Sweeper {
    period: Duration,
    shutdown_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawns the sweep loop on the current Tokio runtime.
    ///
    /// Fails with [`RosterError::Config`] when the period is zero or no
    /// runtime is available.
    pub fn spawn<F>(period: Duration, sweep: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        if period.is_zero() {
            return Err(RosterError::Config("sweep period must be greater than zero".into()));
        }
        let runtime = Handle::try_current().map_err(|e| {
            RosterError::Config(format!("cache sweeper requires a Tokio runtime: {}", e))
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let first_tick = Instant::now() + period;
        let handle = runtime.spawn(run(first_tick, period, shutdown_rx, sweep));

        Ok(Self {
            period,
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Interval between sweeps.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Asks the loop to exit without waiting for it.
    pub fn signal(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Signals the loop and waits for it to exit. Later calls return immediately.
    pub async fn stop(&self) {
        self.signal();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Cache sweeper did not exit cleanly");
            }
        }
    }

    /// Returns true while the loop task is alive.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.signal();
    }
}

async fn run<F>(
    first_tick: Instant,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut sweep: F,
) where
    F: FnMut(),
{
    let mut ticker = interval_at(first_tick, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_ms = period.as_millis() as u64, "Cache sweeper started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown_rx.changed() => {
                // A dropped sender counts as shutdown.
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                debug!("Cache sweep tick");
                sweep();
            }
        }
    }

    info!("Cache sweeper stopped");
}
