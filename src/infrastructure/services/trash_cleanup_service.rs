use std::sync::Arc;
use std::time::Duration;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::application::dtos::trash_dto::PurgeSummary;
use crate::application::ports::trash_ports::TrashUseCase;
use crate::common::errors::{DomainError, Result};

/// Servicio que purga periódicamente las entradas de la papelera más antiguas que la retención
pub struct TrashCleanupService {
    trash_service: Arc<dyn TrashUseCase>,
    retention_days: u32,
    interval: Duration,
}

impl TrashCleanupService {
    pub fn new(
        trash_service: Arc<dyn TrashUseCase>,
        retention_days: u32,
        interval: Duration,
    ) -> Self {
        Self {
            trash_service,
            retention_days,
            interval,
        }
    }

    /// Spawns the purge loop; the first pass runs immediately
    #[instrument(skip(self))]
    pub fn start_cleanup_job(&self) -> JoinHandle<()> {
        let trash_service = self.trash_service.clone();
        let retention_days = self.retention_days;
        let interval_duration = self.interval;

        info!(
            "Starting trash cleanup job: retention {} days, interval {:?}",
            retention_days, interval_duration
        );

        tokio::spawn(async move {
            let mut interval = time::interval(interval_duration);

            loop {
                // Primera ejecución inmediata
                interval.tick().await;
                debug!("Running scheduled trash cleanup");

                if let Err(e) = Self::cleanup_expired_entries(trash_service.clone(), retention_days).await {
                    error!("Scheduled trash cleanup failed: {:?}", e);
                }
            }
        })
    }

    /// Single purge pass
    #[instrument(skip(trash_service))]
    pub async fn cleanup_expired_entries(
        trash_service: Arc<dyn TrashUseCase>,
        retention_days: u32,
    ) -> Result<PurgeSummary> {
        let cutoff = chrono::Duration::try_days(i64::from(retention_days))
            .and_then(|retention| Utc::now().checked_sub_signed(retention))
            .ok_or_else(|| {
                DomainError::validation_error(
                    "TrashConfig",
                    format!("Retention of {} days is out of range", retention_days),
                )
            })?;
        debug!("Purging trash entries deleted before {}", cutoff);

        let summary = trash_service.purge_older_than(cutoff).await?;
        if summary.removed > 0 {
            info!("Trash cleanup removed {} expired entries", summary.removed);
        }
        Ok(summary)
    }
}
