// Rotation clock: drives one rotation per segment period and never lets two overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, warn};

use crate::fetcher::SegmentSource;
use crate::rotation::{RotationController, RotationOutcome};

pub type SharedController<S> = Arc<Mutex<RotationController<S>>>;

/// Periodic driver for a [`RotationController`].
///
/// Each tick tries to take the controller lock without waiting. If the previous
/// rotation still holds it, the tick is dropped, so a stalled upstream delays the
/// stream instead of stacking rotations.
pub struct RotationService<S> {
    controller: SharedController<S>,
    period: Duration,
    token: CancellationToken,
    tasks: TaskTracker,
}

impl<S: SegmentSource + 'static> RotationService<S> {
    pub fn new(controller: RotationController<S>, period: Duration) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
            period,
            token: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn controller(&self) -> &SharedController<S> {
        &self.controller
    }

    /// Start one rotation in the background unless another is still running.
    pub fn trigger(&self) -> Option<JoinHandle<RotationOutcome>> {
        match self.controller.clone().try_lock_owned() {
            Ok(mut controller) => Some(
                self.tasks
                    .spawn(async move { controller.rotate().await }.in_current_span()),
            ),
            Err(_) => {
                warn!("Previous rotation still in progress, skipping tick");
                None
            }
        }
    }

    /// Tick until cancelled, then wait for the in-flight rotation to finish.
    ///
    /// The first tick fires one period after the call.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = self.period.as_millis() as u64, "Rotation clock started");

        loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => {
                    debug!("Rotation clock cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.trigger();
                }
            }
        }

        self.tasks.close();
        self.tasks.wait().await;
        info!("Rotation clock stopped");
    }

    /// Run the clock on its own task.
    pub fn start(self) -> RotationHandle<S> {
        let token = self.token.clone();
        let controller = self.controller.clone();
        let join = tokio::spawn(async move { self.run().await }.in_current_span());
        RotationHandle {
            token,
            controller,
            join,
        }
    }
}

pub struct RotationHandle<S> {
    token: CancellationToken,
    controller: SharedController<S>,
    join: JoinHandle<()>,
}

impl<S> RotationHandle<S> {
    pub fn controller(&self) -> &SharedController<S> {
        &self.controller
    }

    /// Stop ticking and wait until no rotation is in flight.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            warn!(error = %e, "Rotation clock task ended abnormally");
        }
    }
}
