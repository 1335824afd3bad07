use anyhow::Result;
use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::state::AppState;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub reset_tokens: u64,
    pub refresh_tokens: u64,
    pub rate_limit_windows: usize,
}

/// Removes expired reset and refresh tokens plus stale rate-limit windows.
/// Failures are logged so one bad step does not stop the others.
pub async fn run_cleanup(state: &AppState) -> CleanupReport {
    let mut report = CleanupReport::default();

    match state.password_reset_service.cleanup_expired_tokens().await {
        Ok(removed) => report.reset_tokens = removed,
        Err(err) => tracing::error!(error = %err, "Failed to clean up password reset tokens"),
    }

    match state.refresh_token_repository.delete_expired(Utc::now()).await {
        Ok(removed) => report.refresh_tokens = removed,
        Err(err) => tracing::error!(error = %err, "Failed to clean up refresh tokens"),
    }

    report.rate_limit_windows = state.rate_limiter.prune();

    tracing::info!(
        reset_tokens = report.reset_tokens,
        refresh_tokens = report.refresh_tokens,
        rate_limit_windows = report.rate_limit_windows,
        "Cleanup finished"
    );
    report
}

/// Starts the scheduler running `run_cleanup` on `config.cleanup_cron`.
pub async fn start_cleanup_scheduler(state: AppState) -> Result<JobScheduler> {
    let sched = JobScheduler::new().await?;
    let cron_expr = state.config.cleanup_cron.clone();

    let job = Job::new_async(cron_expr.as_str(), move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            run_cleanup(&state).await;
        })
    })?;

    sched.add(job).await?;
    sched.start().await?;

    tracing::info!(cron = %cron_expr, "Cleanup scheduler running");
    Ok(sched)
}
