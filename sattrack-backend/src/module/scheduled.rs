///! Scheduled task manager - periodic background work
///!
///! Currently one task: refreshing the TLE catalog on a fixed interval,
///! aligned to multiples of the interval since 00:00 UTC.

use super::tle::TleCatalogManager;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(60);
const REFRESH_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration for scheduled tasks
#[derive(Debug, Clone)]
pub struct ScheduledTaskConfig {
    /// Interval for catalog refreshes (in minutes)
    pub refresh_interval_minutes: u32,

    /// Perform a refresh immediately on start
    pub perform_initial_refresh: bool,
}

impl Default for ScheduledTaskConfig {
    fn default() -> Self {
        Self {
            refresh_interval_minutes: 360,
            perform_initial_refresh: true,
        }
    }
}

/// Scheduled task manager
pub struct ScheduledTaskManager {
    config: ScheduledTaskConfig,
    catalog_manager: Arc<TleCatalogManager>,
    task_handles: Vec<JoinHandle<()>>,
}

impl ScheduledTaskManager {
    /// Create a new scheduled task manager
    pub fn new(config: ScheduledTaskConfig, catalog_manager: Arc<TleCatalogManager>) -> Self {
        Self {
            config,
            catalog_manager,
            task_handles: Vec::new(),
        }
    }

    /// Start all scheduled tasks
    pub fn start_all(&mut self) {
        tracing::info!("Starting scheduled task manager...");

        let refresh_handle = self.start_refresh_task();
        self.task_handles.push(refresh_handle);

        tracing::info!(
            "Started {} scheduled tasks (TLE refresh every {} min)",
            self.task_handles.len(),
            self.config.refresh_interval_minutes
        );
    }

    fn start_refresh_task(&self) -> JoinHandle<()> {
        let manager = self.catalog_manager.clone();
        let interval_minutes = self.config.refresh_interval_minutes;
        let perform_initial = self.config.perform_initial_refresh;

        tracing::info!(
            "Scheduling TLE refresh task (interval: {} minutes, initial: {})",
            interval_minutes,
            perform_initial
        );

        tokio::spawn(async move {
            if perform_initial {
                tracing::info!("Performing initial TLE refresh...");
                Self::refresh_with_retries(&manager).await;
            }

            Self::refresh_loop(manager, interval_minutes).await;
        })
    }

    async fn refresh_loop(manager: Arc<TleCatalogManager>, interval_minutes: u32) {
        loop {
            let now = Utc::now();
            let next_trigger = calculate_next_refresh_time(now, interval_minutes);
            let sleep_duration = (next_trigger - now)
                .to_std()
                .unwrap_or(Duration::from_secs(60));

            tracing::info!(
                "Next TLE refresh at: {} (in {:.1} min)",
                next_trigger.format("%Y-%m-%d %H:%M:%S UTC"),
                sleep_duration.as_secs_f64() / 60.0
            );

            tokio::time::sleep(sleep_duration).await;
            Self::refresh_with_retries(&manager).await;
        }
    }

    async fn refresh_with_retries(manager: &Arc<TleCatalogManager>) {
        for attempt in 1..=MAX_RETRIES {
            match Self::run_refresh(manager).await {
                Ok(()) => break,
                Err(e) if attempt < MAX_RETRIES => {
                    tracing::warn!(
                        "TLE refresh failed (attempt {}/{}): {:#}. Retrying in {}s...",
                        attempt,
                        MAX_RETRIES,
                        e,
                        RETRY_DELAY.as_secs()
                    );
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    tracing::error!("TLE refresh failed after {} attempts: {:#}", MAX_RETRIES, e);
                }
            }
        }
    }

    /// Run a single refresh, bounded by a timeout
    async fn run_refresh(manager: &Arc<TleCatalogManager>) -> anyhow::Result<()> {
        match tokio::time::timeout(REFRESH_TIMEOUT, manager.refresh()).await {
            Ok(result) => result.map(|_| ()),
            Err(_) => {
                anyhow::bail!("TLE refresh timed out after {} seconds", REFRESH_TIMEOUT.as_secs());
            }
        }
    }

    /// Gracefully shutdown all tasks
    pub async fn shutdown(self) {
        tracing::info!("Shutting down scheduled task manager...");

        for handle in self.task_handles {
            handle.abort();
        }

        tracing::info!("All scheduled tasks stopped");
    }
}

/// Next multiple of the interval, counted from 00:00 UTC of the current day
pub fn calculate_next_refresh_time(now: DateTime<Utc>, interval_minutes: u32) -> DateTime<Utc> {
    let interval_seconds = i64::from(interval_minutes.max(1)) * 60;
    let seconds = now.timestamp();
    let day_start = seconds - seconds.rem_euclid(86_400);
    let slots_elapsed = (seconds - day_start) / interval_seconds;
    let next = day_start + (slots_elapsed + 1) * interval_seconds;

    DateTime::from_timestamp(next, 0)
        .unwrap_or_else(|| now + chrono::Duration::seconds(interval_seconds))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TleConfig;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn test_calculate_next_refresh_time() {
        // 10:00 with a 6 hour interval -> 12:00
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 0).unwrap();
        let next = calculate_next_refresh_time(now, 360);
        assert_eq!((next.hour(), next.minute()), (12, 0));

        // Exactly on a boundary -> the following one
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let next = calculate_next_refresh_time(now, 360);
        assert_eq!(next.hour(), 18);

        // 10:50 with 15 minutes -> 11:00
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 10, 50, 30).unwrap();
        let next = calculate_next_refresh_time(now, 15);
        assert_eq!((next.hour(), next.minute(), next.second()), (11, 0, 0));
    }

    #[test]
    fn test_next_refresh_rolls_over_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 23, 30, 0).unwrap();
        let next = calculate_next_refresh_time(now, 360);
        assert_eq!(next.day(), 11);
        assert_eq!((next.hour(), next.minute()), (0, 0));

        // 7 hours does not divide a day; the last slot is at 21:00
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 20, 0, 0).unwrap();
        assert_eq!(calculate_next_refresh_time(now, 420).hour(), 21);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 10, 0, 30).unwrap();
        let next = calculate_next_refresh_time(now, 0);
        assert_eq!((next.hour(), next.minute(), next.second()), (10, 1, 0));
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let config = TleConfig {
            cache_dir: std::env::temp_dir()
                .join("sattrack_scheduled_test")
                .to_string_lossy()
                .to_string(),
            ..TleConfig::default()
        };
        let manager = TleCatalogManager::new(&config).unwrap();
        let mut tasks = ScheduledTaskManager::new(
            ScheduledTaskConfig {
                refresh_interval_minutes: 60,
                perform_initial_refresh: false,
            },
            manager,
        );

        tasks.start_all();
        assert_eq!(tasks.task_handles.len(), 1);
        tasks.shutdown().await;
    }
}
