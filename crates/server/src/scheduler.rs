//! Daily refresh scheduler.
//!
//! Sleeps until the configured local hour, fires a scheduled (non-forced)
//! refresh, and repeats. The coordinator's TTL gate makes a tick that lands
//! shortly after another refresh a no-op, and its exclusivity guard drops a
//! tick that races one; this task only has to keep time.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime, NaiveTime};

use regcache_core::registry::{RefreshCoordinator, RefreshKind, RefreshOutcome};

pub async fn run(coordinator: Arc<RefreshCoordinator>, refresh_hour: u32) {
    loop {
        let wait = until_next_run(Local::now().naive_local(), refresh_hour);
        tracing::debug!(seconds = wait.as_secs(), "scheduler sleeping until next refresh window");
        tokio::time::sleep(wait).await;

        match coordinator.refresh(RefreshKind::Scheduled).await {
            Ok(RefreshOutcome::Refreshed { entries }) => {
                tracing::info!(entries, "scheduled refresh complete");
            }
            Ok(RefreshOutcome::Fresh) => {
                tracing::debug!("scheduled refresh skipped; snapshot still fresh");
            }
            Ok(RefreshOutcome::AlreadyRefreshing) => {
                tracing::debug!("scheduled refresh skipped; another refresh in flight");
            }
            Err(e) => {
                tracing::error!(error = %e, "scheduled refresh failed; previous snapshot stays live");
            }
        }
    }
}

/// Time to sleep from `now` until the next occurrence of `hour`:00 local.
fn until_next_run(now: NaiveDateTime, hour: u32) -> Duration {
    let target_time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    let mut target = now.date().and_time(target_time);
    if target <= now {
        target += chrono::Duration::days(1);
    }
    (target - now).to_std().unwrap_or(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_before_window_waits_until_today() {
        assert_eq!(until_next_run(at(2, 0), 3), Duration::from_secs(3600));
        assert_eq!(until_next_run(at(0, 30), 3), Duration::from_secs(2 * 3600 + 1800));
    }

    #[test]
    fn test_after_window_waits_until_tomorrow() {
        assert_eq!(until_next_run(at(4, 0), 3), Duration::from_secs(23 * 3600));
    }

    #[test]
    fn test_exactly_on_window_waits_a_full_day() {
        assert_eq!(until_next_run(at(3, 0), 3), Duration::from_secs(24 * 3600));
    }

    #[test]
    fn test_out_of_range_hour_is_clamped() {
        assert_eq!(until_next_run(at(22, 0), 99), Duration::from_secs(3600));
    }
}
