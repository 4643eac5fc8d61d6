use std::time::Duration;

use tokio::time::Instant;

use crate::rm::{FinalStatus, JobClient, JobId, JobState};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Monitoring cadence and the wall-clock deadline after which the job is
/// forcibly killed.
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub deadline: Instant,
}

impl MonitorConfig {
    /// Deadline is measured from the client's start, not from the first poll.
    pub fn new(client_start: Instant, timeout: Duration) -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: client_start + timeout,
        }
    }
}

/// Polls the job until it reaches a terminal state or the deadline passes.
///
/// Returns `Ok(true)` iff the job finished with a SUCCEEDED final status.
/// When the deadline is crossed while the job is still non-terminal, a single
/// best-effort kill is issued and the loop never polls again. The terminal
/// check runs before the deadline check, so a job that finishes exactly at
/// the deadline is reported by its true status.
pub async fn monitor_job(
    rm: &mut dyn JobClient,
    job_id: &JobId,
    config: &MonitorConfig,
) -> crate::Result<bool> {
    loop {
        // Check the job status every poll interval; the sleep is the only
        // suspension point besides the manager calls themselves.
        tokio::time::sleep(config.poll_interval).await;

        match rm.job_report(job_id).await {
            Ok(report) => match (report.state, report.final_status) {
                (JobState::Finished, FinalStatus::Succeeded) => {
                    log::info!("Job {job_id} has completed successfully");
                    return Ok(true);
                }
                (JobState::Finished, status) => {
                    log::info!("Job {job_id} finished unsuccessfully: final status {status:?}");
                    return Ok(false);
                }
                (state @ (JobState::Killed | JobState::Failed), status) => {
                    log::info!(
                        "Job {job_id} did not finish: state {state:?}, final status {status:?}"
                    );
                    return Ok(false);
                }
                _ => {}
            },
            Err(error) => {
                // A failed poll is a missed tick, not a failure of the job.
                log::warn!("Could not fetch the report of job {job_id}: {error}");
            }
        }

        if Instant::now() >= config.deadline {
            log::warn!("Job {job_id} reached the client timeout, killing it");
            if let Err(error) = rm.kill_job(job_id).await {
                log::error!("Failed to kill job {job_id}: {error}");
            }
            return Ok(false);
        }
    }
}
