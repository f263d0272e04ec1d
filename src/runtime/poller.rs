use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::BranchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// One reconciliation pass against the backend.
#[async_trait]
pub trait BackgroundCheck: Send + Sync + 'static {
    /// Returns whether the check re-hydrated anything.
    async fn check_background_jobs(&self) -> Result<bool, BranchError>;
}

/// Polls a [`BackgroundCheck`] on a fixed interval while the host view is
/// hidden.
///
/// The first tick lands one full interval after hiding and missed ticks are
/// skipped. Becoming visible stops the interval and runs exactly one check.
/// Dropping the poller stops any running interval.
pub struct VisibilityPoller<C: BackgroundCheck> {
    check: Arc<C>,
    interval: Duration,
    visibility: Visibility,
    task: Option<JoinHandle<()>>,
}

impl<C: BackgroundCheck> VisibilityPoller<C> {
    /// Starts in [`Visibility::Visible`] with no interval running. A zero
    /// interval falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn new(check: Arc<C>, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!(
                default_ms = DEFAULT_POLL_INTERVAL.as_millis() as u64,
                "zero poll interval; using default"
            );
            DEFAULT_POLL_INTERVAL
        } else {
            interval
        };
        Self {
            check,
            interval,
            visibility: Visibility::Visible,
            task: None,
        }
    }

    #[must_use]
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Applies a visibility change. Repeating the current state is a no-op.
    pub async fn set_visibility(&mut self, visibility: Visibility) {
        if visibility == self.visibility {
            return;
        }
        self.visibility = visibility;

        match visibility {
            Visibility::Hidden => self.start_polling(),
            Visibility::Visible => {
                self.stop_polling();
                run_check(self.check.as_ref()).await;
            }
        }
    }

    fn start_polling(&mut self) {
        self.stop_polling();

        let check = Arc::clone(&self.check);
        let period = self.interval;
        debug!(interval_ms = period.as_millis() as u64, "view hidden; polling background jobs");
        self.task = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                run_check(check.as_ref()).await;
            }
        }));
    }

    fn stop_polling(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<C: BackgroundCheck> Drop for VisibilityPoller<C> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn run_check<C: BackgroundCheck + ?Sized>(check: &C) {
    match check.check_background_jobs().await {
        Ok(true) => debug!("background job detected; session re-hydrated"),
        Ok(false) => {}
        Err(error) => warn!(%error, "background job check failed"),
    }
}
