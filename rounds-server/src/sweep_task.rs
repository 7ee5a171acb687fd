//! Background recurrence sweep. Runs on a fixed interval; the store's
//! uniqueness constraint makes overlapping passes (including the manual
//! endpoint) converge on the same instances.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use rounds_core::InspectionService;

pub fn spawn_sweep_task(
    service: Arc<InspectionService>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick fires immediately; that doubles as the startup sweep.
        loop {
            ticker.tick().await;
            match service.scheduler().run_sweep(Utc::now()).await {
                Ok(outcome) => {
                    if outcome.created.is_empty()
                        && outcome.failures.is_empty()
                    {
                        continue;
                    }
                    info!(
                        created = outcome.created.len(),
                        unassigned = outcome.unassigned.len(),
                        failures = outcome.failures.len(),
                        "recurrence sweep finished"
                    );
                    for failure in &outcome.failures {
                        warn!(
                            template_id = %failure.template_id,
                            department_id = %failure.department_id,
                            error = %failure.error,
                            "sweep pair failed"
                        );
                    }
                }
                Err(err) => warn!(error = %err, "recurrence sweep failed"),
            }
        }
    })
}
