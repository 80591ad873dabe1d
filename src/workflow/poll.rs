//! Bounded, cancellable snapshot polling.

// crates.io
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
// self
use crate::{
	_prelude::*,
	auth::{SessionFileId, SessionId},
	error::WorkflowError,
	studio::{SnapshotStatus, StudioApi},
};

const DEFAULT_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_SECS: u64 = 30 * 60;

/// Pace and bounds of the snapshot status loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
	/// Wait between two status calls.
	pub interval: StdDuration,
	/// Maximum number of status calls; unbounded when `None`.
	pub max_attempts: Option<u32>,
	/// Maximum time spent polling; unbounded when `None`.
	pub max_duration: Option<StdDuration>,
}
impl Default for PollPolicy {
	fn default() -> Self {
		Self {
			interval: StdDuration::from_secs(DEFAULT_INTERVAL_SECS),
			max_attempts: None,
			max_duration: Some(StdDuration::from_secs(DEFAULT_MAX_SECS)),
		}
	}
}

/// Polls the snapshot of `file` until it completes and returns its one-time download URL.
///
/// A failed status call aborts immediately. The wait between calls ends early with
/// [`WorkflowError::Cancelled`] once `cancel` fires.
pub async fn poll_snapshot(
	api: &dyn StudioApi,
	session: &SessionId,
	file: SessionFileId,
	policy: &PollPolicy,
	cancel: &CancellationToken,
) -> Result<String> {
	let started = Instant::now();
	let mut attempts = 0_u32;

	loop {
		attempts += 1;

		let snapshot = api.snapshot_status(session, file).await?;

		tracing::info!(%session, %file, attempts, status = ?snapshot.status, "polled snapshot");

		match snapshot.status {
			SnapshotStatus::Complete =>
				return snapshot
					.download_url
					.filter(|url| !url.is_empty())
					.ok_or_else(|| WorkflowError::MissingDownloadUrl.into()),
			SnapshotStatus::Error => return Err(WorkflowError::SnapshotFailed.into()),
			SnapshotStatus::Pending => (),
		}

		if policy.max_attempts.is_some_and(|max| attempts >= max)
			|| policy.max_duration.is_some_and(|max| started.elapsed() + policy.interval > max)
		{
			return Err(WorkflowError::PollExhausted { attempts }.into());
		}

		tokio::select! {
			_ = cancel.cancelled() => return Err(WorkflowError::Cancelled.into()),
			_ = time::sleep(policy.interval) => (),
		}
	}
}
