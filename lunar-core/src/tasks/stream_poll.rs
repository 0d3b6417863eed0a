// ========================================================
// File: lunar-core/src/tasks/stream_poll.rs
// ========================================================
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::services::stream_poller::{PollOutcome, StreamPoller};

/// Spawns the liveness loop for one watched channel.
///
/// Polls once immediately, then every `period`. Each tick is awaited before the
/// next can start, and late ticks are skipped rather than bunched. When
/// `shutdown` fires the poller's refresh timer is stopped and the task ends.
pub fn spawn_stream_poll_task(
    poller: StreamPoller,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let platform = poller.platform();
        info!("Starting {platform} stream poller; checking every {}s", period.as_secs());

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let outcome = poller.poll_tick().await;
                    if outcome != PollOutcome::StayedOffline {
                        debug!("{platform} poll => {outcome:?}");
                    }
                }
            }
        }

        poller.stop().await;
        info!("{platform} stream poller stopped");
    })
}
