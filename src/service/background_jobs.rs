// service/background_jobs.rs
use std::sync::Arc;

use tokio::time::{interval, Duration};

use crate::{db::paymentdb::PaymentExt, AppState};

/// Payments still pending after this many minutes get reconciled against
/// the gateway directly, in case their webhook was lost.
const STALE_PAYMENT_MINUTES: i64 = 30;
const RECONCILIATION_BATCH: i64 = 20;

/// Start the background sweep that re-checks stale pending payments. Uses
/// the same completion handlers as the webhook path, so a lost event heals
/// into the identical end state.
pub async fn start_payment_reconciliation_job(app_state: Arc<AppState>) {
    let mut interval = interval(Duration::from_secs(600)); // Run every 10 minutes

    loop {
        interval.tick().await;

        let stale = match app_state
            .db_client
            .get_stale_pending_payments(STALE_PAYMENT_MINUTES, RECONCILIATION_BATCH)
            .await
        {
            Ok(stale) => stale,
            Err(e) => {
                tracing::error!("Payment reconciliation sweep failed to query: {}", e);
                continue;
            }
        };

        if stale.is_empty() {
            continue;
        }

        tracing::info!("Reconciling {} stale pending payments", stale.len());

        for payment in stale {
            match app_state.webhook_service.check_payment_status(payment.id).await {
                Ok(updated) => {
                    if updated.status != payment.status {
                        tracing::info!(
                            "Reconciliation moved payment {} to {:?}",
                            updated.id,
                            updated.status
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("Reconciliation failed for payment {}: {}", payment.id, e);
                }
            }
        }
    }
}
